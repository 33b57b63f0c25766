//! Registre global des devices hébergés.
//!
//! Le runtime livre tous ses événements entrants par un unique
//! callback partagé ; ce module maintient la map UDN → device qui
//! permet de retrouver l'instance visée. Le verrou du registre n'est
//! tenu que le temps de l'opération sur la map, jamais pendant le
//! traitement au niveau device.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{error, warn};

use crate::devices::UpnpDevice;
use crate::runtime::{DeviceEvent, DeviceEventHandler, DispatchResult, UpnpStatus};

static REGISTRY: Lazy<Arc<DeviceRegistry>> = Lazy::new(|| Arc::new(DeviceRegistry::new()));

/// Retourne le registre global du processus.
pub fn registry() -> &'static Arc<DeviceRegistry> {
    &REGISTRY
}

struct RegistryState {
    /// Références non possédantes : le device possède sa propre durée
    /// de vie et se retire du registre à sa destruction
    devices: HashMap<String, Weak<UpnpDevice>>,

    /// Le callback partagé du runtime a déjà été armé
    armed: bool,
}

/// Registre UDN → device, à portée processus.
///
/// L'enregistrement du premier device arme le handler partagé auprès
/// de son runtime (idempotent : les enregistrements suivants ne
/// réarment pas). Les entrées sont des références faibles : une entrée
/// dont le device a disparu est purgée à la volée.
pub struct DeviceRegistry {
    state: Mutex<RegistryState>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceRegistry {
    /// Crée un registre vide.
    ///
    /// Les devices passent par le registre global ([`registry`]) ; ce
    /// constructeur sert surtout aux tests.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                devices: HashMap::new(),
                armed: false,
            }),
        }
    }

    /// Enregistre un device sous son UDN.
    ///
    /// Au premier enregistrement, arme le handler d'événements partagé
    /// auprès du runtime du device.
    pub fn register(self: &Arc<Self>, device: &Arc<UpnpDevice>) {
        let udn = device.device_id().to_string();
        let mut state = self.state.lock().unwrap();

        if !state.armed {
            device
                .runtime()
                .install_handler(Arc::clone(self) as Arc<dyn DeviceEventHandler>);
            state.armed = true;
        }

        if let Some(old) = state.devices.get(&udn) {
            if old.upgrade().is_some() {
                warn!("device {} already registered, replacing entry", udn);
            }
        }
        state.devices.insert(udn, Arc::downgrade(device));
    }

    /// Retire l'entrée d'un device.
    pub fn unregister(&self, udn: &str) {
        let mut state = self.state.lock().unwrap();
        state.devices.remove(udn);
    }

    /// Retrouve un device vivant par son UDN.
    pub fn find(&self, udn: &str) -> Option<Arc<UpnpDevice>> {
        let mut state = self.state.lock().unwrap();
        match state.devices.get(udn).and_then(Weak::upgrade) {
            Some(device) => Some(device),
            None => {
                // Purge une éventuelle entrée morte
                state.devices.remove(udn);
                None
            }
        }
    }

    /// Nombre d'entrées vivantes.
    pub fn count(&self) -> usize {
        let state = self.state.lock().unwrap();
        state
            .devices
            .values()
            .filter(|w| w.upgrade().is_some())
            .count()
    }
}

#[async_trait]
impl DeviceEventHandler for DeviceRegistry {
    /// Callback partagé : route l'événement vers le device visé.
    ///
    /// Un UDN inconnu n'est jamais fatal : l'événement est journalisé
    /// et le runtime reçoit un statut paramètre-invalide.
    async fn handle_event(&self, event: DeviceEvent) -> DispatchResult {
        let device = self.find(event.device_udn());
        match device {
            Some(device) => device.handle_event(event).await,
            None => {
                error!("❌ device not found: [{}]", event.device_udn());
                DispatchResult::status(UpnpStatus::InvalidParam)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::VariableQuery;
    use crate::test_support::{MockRuntime, new_test_device};

    #[tokio::test]
    async fn test_register_find_unregister() {
        let registry = Arc::new(DeviceRegistry::new());
        let runtime = Arc::new(MockRuntime::new());
        let device = new_test_device("uuid:registry-test-1", runtime);

        registry.register(&device);
        assert_eq!(registry.count(), 1);
        assert!(registry.find("uuid:registry-test-1").is_some());

        registry.unregister("uuid:registry-test-1");
        assert!(registry.find("uuid:registry-test-1").is_none());
        assert_eq!(registry.count(), 0);
    }

    #[tokio::test]
    async fn test_arming_is_idempotent() {
        let registry = Arc::new(DeviceRegistry::new());
        let runtime = Arc::new(MockRuntime::new());
        let first = new_test_device("uuid:registry-arm-1", runtime.clone());
        let second = new_test_device("uuid:registry-arm-2", runtime.clone());

        registry.register(&first);
        registry.register(&second);

        // Armé une seule fois, au premier enregistrement
        assert_eq!(runtime.installed_handlers(), 1);
    }

    #[tokio::test]
    async fn test_dropped_device_entry_is_dead() {
        let registry = Arc::new(DeviceRegistry::new());
        let runtime = Arc::new(MockRuntime::new());
        let device = new_test_device("uuid:registry-drop-1", runtime);

        registry.register(&device);
        drop(device);

        // Référence faible : le registre ne maintient pas le device en vie
        assert!(registry.find("uuid:registry-drop-1").is_none());
    }

    #[tokio::test]
    async fn test_unknown_udn_is_invalid_param() {
        let registry = Arc::new(DeviceRegistry::new());
        let result = registry
            .handle_event(DeviceEvent::VariableQuery(VariableQuery {
                device_udn: "uuid:nobody-home".to_string(),
                variable_name: "TransportState".to_string(),
            }))
            .await;
        assert_eq!(result.status, UpnpStatus::InvalidParam);
    }
}
