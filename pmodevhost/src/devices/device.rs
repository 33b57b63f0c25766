//! Implémentation de l'hôte de device UPnP.
//!
//! Un [`UpnpDevice`] possède les enregistrements de ses services, sa
//! table de dispatch d'actions et l'état de contrôle de sa boucle
//! d'événements. Il implémente les trois handlers d'événements
//! entrants (action, query de variable, abonnement) et le chemin de
//! notification sortant.
//!
//! # Discipline de verrouillage
//!
//! Le verrou du device protège la map des services, la liste ordonnée
//! des serviceIds et la table de dispatch. Il est tenu pendant les
//! recherches et mutations de tables, mais TOUJOURS relâché avant
//! d'appeler le runtime (notify, accept_subscription) : les données
//! sont copiées, le verrou rendu, puis l'appel sortant est fait. Le
//! signal de réveil de la boucle est volontairement indépendant de ce
//! verrou, ce qui casse le cycle d'ordre entre le thread de dispatch
//! et la boucle d'événements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tracing::{debug, error, info};

use crate::devices::{DeviceError, registry};
use crate::runtime::{
    ActionRequest, DeviceEvent, DispatchResult, SubscriptionRequest, UpnpRuntime, UpnpStatus,
    VariableQuery,
};
use crate::services::UpnpService;
use crate::soap::{SoapIncoming, SoapOutgoing, error_codes, xml_quote};

/// Handler d'action : consomme les arguments décodés, remplit la
/// réponse, rend un statut. Le dernier enregistrement pour une clé
/// (action, service) donnée gagne.
pub type SoapHandler = Arc<dyn Fn(&SoapIncoming, &mut SoapOutgoing) -> UpnpStatus + Send + Sync>;

/// Une ressource servie par le device : contenu et type MIME.
#[derive(Debug, Clone)]
pub struct VDirContent {
    /// Contenu du fichier
    pub content: String,
    /// Type MIME (ex: "text/xml")
    pub mimetype: String,
}

impl VDirContent {
    /// Crée une ressource.
    pub fn new(content: &str, mimetype: &str) -> Self {
        Self {
            content: content.to_string(),
            mimetype: mimetype.to_string(),
        }
    }
}

/// Tables protégées par le verrou du device.
struct DeviceState {
    /// serviceId → service
    services: HashMap<String, Arc<dyn UpnpService>>,

    /// serviceIds dans l'ordre d'enregistrement, qui définit l'ordre
    /// de polling de la boucle d'événements
    service_ids: Vec<String>,

    /// (nom d'action + serviceId) → handler
    calls: HashMap<String, SoapHandler>,
}

/// Un root device UPnP hébergé.
///
/// Créé une fois par root device ; sa destruction le retire du
/// registre global et le désenregistre du runtime. Les services sont
/// fournis par l'application hôte, qui doit les faire survivre au
/// device.
///
/// # Cycle de vie
///
/// 1. Construction via [`new`](Self::new) (description.xml requise)
/// 2. Enregistrement des services avec [`add_service`](Self::add_service)
///    puis des actions avec [`add_action_mapping`](Self::add_action_mapping)
/// 3. Démarrage de la boucle avec [`event_loop`](Self::event_loop)
///
/// L'enregistrement doit être terminé avant le démarrage de la boucle :
/// aucune garantie n'est donnée si les deux se chevauchent.
pub struct UpnpDevice {
    device_id: String,
    description: String,
    runtime: Arc<dyn UpnpRuntime>,

    /// Verrou du device (tables de services et de dispatch)
    state: Mutex<DeviceState>,

    /// Demande de sortie de la boucle d'événements
    exit_flag: AtomicBool,

    /// Signal de réveil de la boucle, indépendant du verrou du device
    wake: Notify,
}

impl std::fmt::Debug for UpnpDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("UpnpDevice")
            .field("device_id", &self.device_id)
            .field("services", &state.service_ids)
            .field("actions", &state.calls.len())
            .finish()
    }
}

impl UpnpDevice {
    /// Crée un device et l'enregistre dans le registre global.
    ///
    /// # Arguments
    ///
    /// * `device_id` - UDN, unique parmi les devices vivants
    /// * `files` - Chemin logique → ressource ; doit contenir une
    ///   entrée résolvable en `description.xml`
    /// * `runtime` - La couche réseau collaboratrice
    ///
    /// Les fichiers autres que la description sont confiés au serveur
    /// statique du runtime. La description elle-même est retenue : le
    /// runtime en sert sa propre copie après y avoir injecté l'élément
    /// URLBase.
    ///
    /// # Errors
    ///
    /// [`DeviceError::RuntimeUnusable`] si le runtime n'est pas
    /// initialisé, [`DeviceError::NoDescription`] si aucune entrée
    /// `description.xml` n'est trouvée. Dans les deux cas aucun device
    /// n'est enregistré.
    pub fn new(
        device_id: &str,
        files: &HashMap<String, VDirContent>,
        runtime: Arc<dyn UpnpRuntime>,
    ) -> Result<Arc<Self>, DeviceError> {
        let device = Self::build(device_id, files, runtime)?;
        registry().register(&device);
        Ok(device)
    }

    /// Construction sans insertion dans le registre global.
    pub(crate) fn build(
        device_id: &str,
        files: &HashMap<String, VDirContent>,
        runtime: Arc<dyn UpnpRuntime>,
    ) -> Result<Arc<Self>, DeviceError> {
        if !runtime.ok() {
            error!("❌ can't get UPnP runtime");
            return Err(DeviceError::RuntimeUnusable);
        }

        let description = files
            .iter()
            .find(|(path, _)| path_simple(path) == "description.xml")
            .map(|(_, content)| content.content.clone())
            .ok_or_else(|| {
                error!("❌ no description.xml found in device files");
                DeviceError::NoDescription
            })?;

        for (path, file) in files {
            // description.xml sera servie par le runtime depuis /,
            // après insertion de l'élément URLBase : ne pas servir
            // notre version depuis le répertoire virtuel
            if path_simple(path) != "description.xml" {
                runtime.add_file(path_father(path), path_simple(path), &file.content,
                    &file.mimetype);
            }
        }

        Ok(Arc::new(Self {
            device_id: device_id.to_string(),
            description,
            runtime,
            state: Mutex::new(DeviceState {
                services: HashMap::new(),
                service_ids: Vec::new(),
                calls: HashMap::new(),
            }),
            exit_flag: AtomicBool::new(false),
            wake: Notify::new(),
        }))
    }

    /// Retourne l'UDN du device.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Document de description du device.
    pub(crate) fn description(&self) -> &str {
        &self.description
    }

    /// Runtime collaborateur du device.
    pub(crate) fn runtime(&self) -> &Arc<dyn UpnpRuntime> {
        &self.runtime
    }

    /// Ajoute un service au device.
    ///
    /// L'ordre des appels définit l'ordre de polling de la boucle
    /// d'événements. À faire avant d'enregistrer les actions du
    /// service, et avant de démarrer la boucle.
    pub fn add_service(&self, service: Arc<dyn UpnpService>, service_id: &str) {
        let mut state = self.state.lock().unwrap();
        state
            .services
            .insert(service_id.to_string(), Arc::clone(&service));
        state.service_ids.push(service_id.to_string());
    }

    /// Associe un handler à une action d'un service.
    ///
    /// La clé est (nom d'action + serviceId) ; un enregistrement
    /// ultérieur pour la même clé remplace le précédent.
    pub fn add_action_mapping(
        &self,
        service: &dyn UpnpService,
        action_name: &str,
        handler: SoapHandler,
    ) {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .insert(format!("{}{}", action_name, service.service_id()), handler);
    }

    /// Traite un événement entrant livré par le registre.
    pub async fn handle_event(&self, event: DeviceEvent) -> DispatchResult {
        match event {
            DeviceEvent::Action(request) => self.handle_action(&request),
            DeviceEvent::VariableQuery(query) => self.handle_variable_query(&query),
            DeviceEvent::Subscription(request) => self.handle_subscription(&request).await,
        }
    }

    /// Dispatch d'une invocation d'action.
    ///
    /// Échelle d'échec : service inconnu, action inconnue ou document
    /// d'arguments indécodable rendent paramètre-invalide, jamais une
    /// interruption du processus. Un statut d'échec du handler est
    /// propagé tel quel, sans document de réponse.
    fn handle_action(&self, request: &ActionRequest) -> DispatchResult {
        debug!(
            "UPNP_CONTROL_ACTION_REQUEST: {} for {}",
            request.action_name, request.service_id
        );

        // Copier le type de service et le handler sous le verrou, puis
        // le rendre : le handler tourne hors verrou, et le
        // dernier-enregistré-gagne est préservé parce que la copie est
        // prise sous le même verrou que add_action_mapping
        let (service_type, handler) = {
            let state = self.state.lock().unwrap();

            let Some(service) = state.services.get(&request.service_id) else {
                error!("bad serviceID: {}", request.service_id);
                return DispatchResult::status(UpnpStatus::InvalidParam);
            };

            let key = format!("{}{}", request.action_name, request.service_id);
            let Some(handler) = state.calls.get(&key) else {
                info!("no such action: {}", request.action_name);
                return DispatchResult::status(UpnpStatus::InvalidParam);
            };

            (service.service_type().to_string(), Arc::clone(handler))
        };

        let incoming = match SoapIncoming::decode(&request.action_name, &request.arguments) {
            Ok(incoming) => incoming,
            Err(e) => {
                error!("error decoding action call arguments: {}", e);
                return DispatchResult::status(UpnpStatus::InvalidParam);
            }
        };

        let mut outgoing = SoapOutgoing::new(&service_type, &request.action_name);
        let status = handler(&incoming, &mut outgoing);
        if !status.is_success() {
            error!("❌ action failed: {}", incoming.name());
            return DispatchResult::status(status);
        }

        DispatchResult::success(outgoing.build_soap_body(true))
    }

    /// Query directe de variable, dépréciée depuis UPnP arch v1 : on ne
    /// devrait jamais en recevoir.
    fn handle_variable_query(&self, query: &VariableQuery) -> DispatchResult {
        debug!("UPNP_CONTROL_GET_VAR_REQUEST?: {}", query.variable_name);
        DispatchResult::status(UpnpStatus::InvalidParam)
    }

    /// Acceptation d'un abonnement : l'état complet du service est lu
    /// sous le verrou du device, le verrou rendu, puis l'état échappé
    /// est livré au runtime.
    async fn handle_subscription(&self, request: &SubscriptionRequest) -> DispatchResult {
        debug!("UPNP_EVENT_SUBSCRIPTION_REQUEST: {}", request.service_id);

        let (names, values) = {
            let state = self.state.lock().unwrap();
            let Some(service) = state.services.get(&request.service_id) else {
                error!("bad serviceID: {}", request.service_id);
                return DispatchResult::status(UpnpStatus::InvalidParam);
            };
            service.event_data(true)
        };

        let Some(qvalues) = quoted_values(&names, &values) else {
            return DispatchResult::status(UpnpStatus::InvalidParam);
        };

        match self
            .runtime
            .accept_subscription(request, &names, &qvalues)
            .await
        {
            Ok(()) => DispatchResult::status(UpnpStatus::Success),
            Err(e) => {
                error!("accept_subscription failed: {}", e);
                DispatchResult::status(UpnpStatus::ActionFailed(error_codes::ACTION_FAILED))
            }
        }
    }

    /// Pousse une notification pour un service.
    ///
    /// Sans effet si `names` est vide. Un échec de transport est
    /// journalisé sans retry : le prochain broadcast d'état complet
    /// resynchronisera les abonnés.
    pub async fn notify_event(&self, service_id: &str, names: &[String], values: &[String]) {
        debug!(
            "notify_event {} {}",
            service_id,
            names.first().map(String::as_str).unwrap_or("<empty>")
        );
        if names.is_empty() {
            return;
        }
        let Some(qvalues) = quoted_values(names, values) else {
            return;
        };

        if let Err(e) = self
            .runtime
            .notify(&self.device_id, service_id, names, &qvalues)
            .await
        {
            error!("notify failed for {}: {}", service_id, e);
        }
    }

    /// serviceIds dans l'ordre d'enregistrement.
    pub(crate) fn service_ids(&self) -> Vec<String> {
        self.state.lock().unwrap().service_ids.clone()
    }

    /// État d'événement d'un service, lu sous le verrou du device.
    pub(crate) fn service_event_data(
        &self,
        service_id: &str,
        all: bool,
    ) -> Option<(Vec<String>, Vec<String>)> {
        let state = self.state.lock().unwrap();
        state.services.get(service_id).map(|s| s.event_data(all))
    }

    /// Réveille la boucle d'événements avant son échéance.
    ///
    /// Appelable depuis un handler d'action tenant le verrou du
    /// device : le signal ne prend aucun verrou, il n'y a pas d'ordre
    /// à inverser.
    pub fn loop_wakeup(&self) {
        self.wake.notify_one();
    }

    /// Demande la sortie de la boucle d'événements.
    ///
    /// Coopératif : la boucle observe le drapeau à son prochain réveil,
    /// au plus tard une période de polling plus tard.
    pub fn should_exit(&self) {
        self.exit_flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    pub(crate) fn exit_requested(&self) -> bool {
        self.exit_flag.load(Ordering::SeqCst)
    }

    pub(crate) fn wake_signal(&self) -> &Notify {
        &self.wake
    }
}

impl Drop for UpnpDevice {
    fn drop(&mut self) {
        self.runtime.unregister_root_device(&self.device_id);
        registry().unregister(&self.device_id);
    }
}

/// Échappe les valeurs pour le runtime ; `None` (journalisé) si les
/// listes n'ont pas la même longueur.
fn quoted_values(names: &[String], values: &[String]) -> Option<Vec<String>> {
    if names.len() != values.len() {
        error!(
            "quoted_values: bad sizes ({} names, {} values)",
            names.len(),
            values.len()
        );
        return None;
    }
    Some(values.iter().map(|v| xml_quote(v)).collect())
}

/// Dernier composant d'un chemin logique.
fn path_simple(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Chemin privé de son dernier composant.
fn path_father(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(i) => &path[..i],
        None => "",
    }
}
