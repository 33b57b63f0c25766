//! Doublures partagées par les tests : runtime enregistreur et service
//! scriptable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;

use crate::devices::{UpnpDevice, VDirContent};
use crate::runtime::{DeviceEventHandler, RuntimeError, SubscriptionRequest, UpnpRuntime};
use crate::services::UpnpService;

/// Jeu de fichiers minimal valide pour construire un device.
pub(crate) fn test_files() -> HashMap<String, VDirContent> {
    let mut files = HashMap::new();
    files.insert(
        "web/upnp/description.xml".to_string(),
        VDirContent::new(
            r#"<?xml version="1.0"?><root xmlns="urn:schemas-upnp-org:device-1-0"/>"#,
            "text/xml",
        ),
    );
    files
}

/// Construit un device hors registre global, pour des tests isolés.
pub(crate) fn new_test_device(udn: &str, runtime: Arc<MockRuntime>) -> Arc<UpnpDevice> {
    UpnpDevice::build(udn, &test_files(), runtime).unwrap()
}

/// Runtime de test : enregistre tous les appels, ne parle à aucun
/// réseau.
pub(crate) struct MockRuntime {
    usable: bool,
    fail_registration: AtomicBool,
    installed_handlers: AtomicUsize,
    advertisements: AtomicUsize,
    registered: Mutex<Vec<String>>,
    files: Mutex<Vec<(String, String)>>,
    subscriptions: Mutex<Vec<(String, Vec<String>, Vec<String>)>>,
    notifies: Mutex<Vec<(String, Vec<String>, Vec<String>)>>,
}

impl MockRuntime {
    pub(crate) fn new() -> Self {
        Self {
            usable: true,
            fail_registration: AtomicBool::new(false),
            installed_handlers: AtomicUsize::new(0),
            advertisements: AtomicUsize::new(0),
            registered: Mutex::new(Vec::new()),
            files: Mutex::new(Vec::new()),
            subscriptions: Mutex::new(Vec::new()),
            notifies: Mutex::new(Vec::new()),
        }
    }

    /// Un runtime dont l'initialisation a échoué.
    pub(crate) fn unusable() -> Self {
        Self {
            usable: false,
            ..Self::new()
        }
    }

    /// Fait échouer les prochains enregistrements de root device.
    pub(crate) fn fail_registration(&self) {
        self.fail_registration.store(true, Ordering::SeqCst);
    }

    pub(crate) fn installed_handlers(&self) -> usize {
        self.installed_handlers.load(Ordering::SeqCst)
    }

    pub(crate) fn advertisements(&self) -> usize {
        self.advertisements.load(Ordering::SeqCst)
    }

    pub(crate) fn registered_devices(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    /// (répertoire, nom) des fichiers confiés au serveur statique.
    pub(crate) fn static_files(&self) -> Vec<(String, String)> {
        self.files.lock().unwrap().clone()
    }

    /// (SID, noms, valeurs) des abonnements acceptés.
    pub(crate) fn subscriptions(&self) -> Vec<(String, Vec<String>, Vec<String>)> {
        self.subscriptions.lock().unwrap().clone()
    }

    /// (serviceId, noms, valeurs) des notifications poussées.
    pub(crate) fn notifies(&self) -> Vec<(String, Vec<String>, Vec<String>)> {
        self.notifies.lock().unwrap().clone()
    }
}

#[async_trait]
impl UpnpRuntime for MockRuntime {
    fn ok(&self) -> bool {
        self.usable
    }

    fn register_root_device(
        &self,
        device_id: &str,
        _description: &str,
    ) -> Result<(), RuntimeError> {
        if self.fail_registration.load(Ordering::SeqCst) {
            return Err(RuntimeError::Transport("registration refused".to_string()));
        }
        self.registered.lock().unwrap().push(device_id.to_string());
        Ok(())
    }

    fn unregister_root_device(&self, device_id: &str) {
        self.registered.lock().unwrap().retain(|id| id != device_id);
    }

    fn send_advertisement(&self, _device_id: &str, _expire_secs: u32) -> Result<(), RuntimeError> {
        self.advertisements.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn add_file(&self, dir: &str, name: &str, _content: &str, _mimetype: &str) {
        self.files
            .lock()
            .unwrap()
            .push((dir.to_string(), name.to_string()));
    }

    fn install_handler(&self, _handler: Arc<dyn DeviceEventHandler>) {
        self.installed_handlers.fetch_add(1, Ordering::SeqCst);
    }

    async fn accept_subscription(
        &self,
        request: &SubscriptionRequest,
        names: &[String],
        values: &[String],
    ) -> Result<(), RuntimeError> {
        self.subscriptions.lock().unwrap().push((
            request.subscription_id.clone(),
            names.to_vec(),
            values.to_vec(),
        ));
        Ok(())
    }

    async fn notify(
        &self,
        _device_id: &str,
        service_id: &str,
        names: &[String],
        values: &[String],
    ) -> Result<(), RuntimeError> {
        self.notifies.lock().unwrap().push((
            service_id.to_string(),
            names.to_vec(),
            values.to_vec(),
        ));
        Ok(())
    }
}

/// Service scriptable : état complet fixé par le test, changements
/// incrémentaux empilés puis drainés au premier polling.
pub(crate) struct StubService {
    service_type: String,
    service_id: String,
    state: Mutex<Vec<(String, String)>>,
    pending: Mutex<Vec<(String, String)>>,
    force_all_calls: AtomicUsize,
}

impl StubService {
    pub(crate) const ID_AVT: &'static str = "urn:upnp-org:serviceId:AVTransport";
    pub(crate) const ID_RCS: &'static str = "urn:upnp-org:serviceId:RenderingControl";

    pub(crate) fn new(kind: &str) -> Self {
        Self {
            service_type: format!("urn:schemas-upnp-org:service:{}:1", kind),
            service_id: format!("urn:upnp-org:serviceId:{}", kind),
            state: Mutex::new(Vec::new()),
            pending: Mutex::new(Vec::new()),
            force_all_calls: AtomicUsize::new(0),
        }
    }

    /// Fixe l'état complet, sans changement incrémental en attente.
    pub(crate) fn set_state(&self, pairs: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        state.clear();
        state.extend(
            pairs
                .iter()
                .map(|(n, v)| (n.to_string(), v.to_string())),
        );
    }

    /// Enregistre un changement, rapporté au prochain polling
    /// incrémental.
    pub(crate) fn push_change(&self, name: &str, value: &str) {
        self.pending
            .lock()
            .unwrap()
            .push((name.to_string(), value.to_string()));
        let mut state = self.state.lock().unwrap();
        state.retain(|(n, _)| n != name);
        state.push((name.to_string(), value.to_string()));
    }

    /// Nombre de lectures d'état complet subies.
    pub(crate) fn force_all_calls(&self) -> usize {
        self.force_all_calls.load(Ordering::SeqCst)
    }
}

impl UpnpService for StubService {
    fn service_type(&self) -> &str {
        &self.service_type
    }

    fn service_id(&self) -> &str {
        &self.service_id
    }

    fn event_data(&self, all: bool) -> (Vec<String>, Vec<String>) {
        let pairs: Vec<(String, String)> = if all {
            self.force_all_calls.fetch_add(1, Ordering::SeqCst);
            self.pending.lock().unwrap().clear();
            self.state.lock().unwrap().clone()
        } else {
            std::mem::take(&mut *self.pending.lock().unwrap())
        };
        pairs.into_iter().unzip()
    }
}
