//! # pmodevhost - Socle d'hébergement de devices UPnP
//!
//! Ce crate implémente la moitié applicative d'un hôte de devices UPnP :
//! le dispatch des invocations d'actions, le marshaling SOAP des
//! arguments, la prise en charge des abonnements aux événements et la
//! boucle périodique qui interroge les services et pousse les
//! notifications.
//!
//! ## Architecture
//!
//! - [`soap`] : encodage/décodage des documents SOAP (arguments,
//!   réponses, propertyset) et échappement XML
//! - [`services`] : contrat de capacité [`UpnpService`] et listener
//!   optionnel [`VarEventReporter`]
//! - [`devices`] : l'hôte [`UpnpDevice`] et le registre global des
//!   devices, point d'entrée du callback partagé du runtime
//! - [`eventloop`] : boucle d'événements périodique par device, avec
//!   coalescence des réveils anticipés
//! - [`runtime`] : la couche réseau collaboratrice (SSDP, HTTP,
//!   transport des notifications), vue comme un trait objet
//!
//! Le runtime (découverte, serveur HTTP, envoi effectif des NOTIFY)
//! n'est PAS implémenté ici : l'application hôte fournit un
//! [`UpnpRuntime`] et ce crate s'occupe uniquement du substrat
//! dispatch/marshaling/eventing sur lequel se branche la logique
//! métier.

pub mod devices;
pub mod eventloop;
pub mod runtime;
pub mod services;
pub mod soap;

pub use devices::{DeviceError, DeviceRegistry, SoapHandler, UpnpDevice, VDirContent, registry};
pub use eventloop::WakeupFilter;
pub use runtime::{
    ActionRequest, DeviceEvent, DeviceEventHandler, DispatchResult, RuntimeError,
    SubscriptionRequest, UpnpRuntime, UpnpStatus, VariableQuery,
};
pub use services::{UpnpService, VarEventReporter};
pub use soap::{SoapError, SoapIncoming, SoapOutgoing, xml_quote, xml_unquote};

#[cfg(test)]
pub(crate) mod test_support;
