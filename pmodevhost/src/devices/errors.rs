//! Erreurs relatives aux devices UPnP.

use thiserror::Error;

/// Erreurs de construction et d'exploitation d'un device.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Aucune entrée description.xml dans les fichiers fournis
    #[error("no description.xml found in device files")]
    NoDescription,

    /// Le runtime n'est pas utilisable
    #[error("UPnP runtime is not initialized")]
    RuntimeUnusable,

    /// Erreur remontée par le runtime
    #[error("runtime error: {0}")]
    Runtime(#[from] crate::runtime::RuntimeError),
}
