//! # Hébergement des devices UPnP
//!
//! - [`UpnpDevice`] : un root device hébergé, ses services, sa table
//!   de dispatch d'actions et l'état de sa boucle d'événements
//! - [`DeviceRegistry`] : le registre global UDN → device, point de
//!   routage du callback partagé du runtime

mod device;
mod errors;
mod registry;

pub use device::{SoapHandler, UpnpDevice, VDirContent};
pub use errors::DeviceError;
pub use registry::{DeviceRegistry, registry};
