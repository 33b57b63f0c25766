//! # Couture vers le runtime UPnP externe
//!
//! Le "runtime" est la couche réseau collaboratrice : enregistrement
//! des root devices, annonce SSDP, service des fichiers statiques,
//! acceptation des abonnements et transport des notifications. Ce
//! crate ne l'implémente pas ; il le consomme au travers du trait
//! [`UpnpRuntime`] fourni par l'application hôte.
//!
//! Dans l'autre sens, le runtime livre ses événements entrants
//! (requête d'action, query de variable, demande d'abonnement) par un
//! unique callback partagé : le handler [`DeviceEventHandler`] armé
//! lors du premier enregistrement de device, qui route par UDN via le
//! registre global.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use xmltree::Element;

/// Durée de validité des annonces SSDP, en secondes.
pub const EXPIRE_SECS: u32 = 3600;

/// Erreurs remontées par le runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Le runtime n'a pas pu démarrer ou s'initialiser
    #[error("runtime initialization failed: {0}")]
    Init(String),

    /// Échec de transport (notify, abonnement, annonce)
    #[error("transport error: {0}")]
    Transport(String),
}

/// Statut d'une opération de dispatch, rendu au runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpnpStatus {
    /// Opération réussie
    Success,

    /// Paramètre invalide : device, service ou action inconnus,
    /// document malformé
    InvalidParam,

    /// Échec d'exécution, avec un code d'erreur UPnP (401, 402, 501,
    /// 600…605)
    ActionFailed(u16),
}

impl UpnpStatus {
    /// Vrai pour [`UpnpStatus::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, UpnpStatus::Success)
    }
}

/// Requête d'invocation d'action entrante.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    /// UDN du device visé
    pub device_udn: String,
    /// Identifiant du service visé
    pub service_id: String,
    /// Nom de l'action
    pub action_name: String,
    /// Document d'arguments sérialisé
    pub arguments: String,
}

/// Query directe d'une variable d'état (dépréciée, UPnP arch v1).
#[derive(Debug, Clone)]
pub struct VariableQuery {
    /// UDN du device visé
    pub device_udn: String,
    /// Nom de la variable demandée
    pub variable_name: String,
}

/// Demande d'abonnement aux événements d'un service.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    /// UDN du device visé
    pub device_udn: String,
    /// Identifiant du service visé
    pub service_id: String,
    /// Identifiant d'abonnement alloué par le runtime (SID)
    pub subscription_id: String,
}

/// Un événement entrant livré par le callback partagé du runtime.
#[derive(Debug, Clone)]
pub enum DeviceEvent {
    /// Invocation d'action
    Action(ActionRequest),
    /// Query de variable (dépréciée)
    VariableQuery(VariableQuery),
    /// Demande d'abonnement
    Subscription(SubscriptionRequest),
}

impl DeviceEvent {
    /// UDN du device visé par l'événement, clé de routage du registre.
    pub fn device_udn(&self) -> &str {
        match self {
            DeviceEvent::Action(r) => &r.device_udn,
            DeviceEvent::VariableQuery(q) => &q.device_udn,
            DeviceEvent::Subscription(r) => &r.device_udn,
        }
    }
}

/// Résultat d'un dispatch rendu au runtime.
#[derive(Debug)]
pub struct DispatchResult {
    /// Statut de l'opération
    pub status: UpnpStatus,
    /// Document de réponse, seulement pour une action réussie
    pub response: Option<Element>,
}

impl DispatchResult {
    /// Résultat sans document de réponse.
    pub fn status(status: UpnpStatus) -> Self {
        Self {
            status,
            response: None,
        }
    }

    /// Résultat d'action réussie, avec son document de réponse.
    pub fn success(response: Element) -> Self {
        Self {
            status: UpnpStatus::Success,
            response: Some(response),
        }
    }
}

/// Handler des événements entrants, armé auprès du runtime.
///
/// Le registre global de devices l'implémente : le runtime ne connaît
/// qu'un seul handler pour tous les devices hébergés.
#[async_trait]
pub trait DeviceEventHandler: Send + Sync {
    /// Traite un événement entrant et rend son résultat au runtime.
    async fn handle_event(&self, event: DeviceEvent) -> DispatchResult;
}

/// Primitives du runtime UPnP consommées par l'hôte de devices.
///
/// L'application hôte en fournit une implémentation (libupnp-like,
/// serveur HTTP maison, ou mock de test). Toutes les méthodes doivent
/// être utilisables depuis n'importe quel thread.
#[async_trait]
pub trait UpnpRuntime: Send + Sync {
    /// Vrai si le runtime est initialisé et utilisable.
    ///
    /// Interrogé à la construction d'un device : un runtime
    /// inutilisable rend la construction fatale.
    fn ok(&self) -> bool;

    /// Enregistre un root device et commence à servir sa description.
    ///
    /// Le runtime calcule et injecte l'élément URLBase dans le
    /// document de description, c'est pourquoi il en sert sa propre
    /// copie.
    fn register_root_device(&self, device_id: &str, description: &str)
    -> Result<(), RuntimeError>;

    /// Désenregistre un root device.
    fn unregister_root_device(&self, device_id: &str);

    /// Émet une annonce de découverte avec l'expiration donnée.
    fn send_advertisement(&self, device_id: &str, expire_secs: u32) -> Result<(), RuntimeError>;

    /// Confie une ressource statique au serveur de fichiers.
    fn add_file(&self, dir: &str, name: &str, content: &str, mimetype: &str);

    /// Arme le callback partagé des événements entrants.
    ///
    /// Appelé une seule fois, lors du premier enregistrement de device
    /// dans le registre.
    fn install_handler(&self, handler: Arc<dyn DeviceEventHandler>);

    /// Accepte un abonnement en lui livrant l'état complet initial.
    ///
    /// # Arguments
    ///
    /// * `request` - La demande d'abonnement (UDN, serviceId, SID)
    /// * `names` - Noms des variables
    /// * `values` - Valeurs, déjà échappées XML
    async fn accept_subscription(
        &self,
        request: &SubscriptionRequest,
        names: &[String],
        values: &[String],
    ) -> Result<(), RuntimeError>;

    /// Pousse une notification d'événement aux abonnés d'un service.
    ///
    /// Les valeurs sont déjà échappées XML. Un échec est non fatal :
    /// le prochain broadcast d'état complet resynchronisera les
    /// abonnés.
    async fn notify(
        &self,
        device_id: &str,
        service_id: &str,
        names: &[String],
        values: &[String],
    ) -> Result<(), RuntimeError>;
}
