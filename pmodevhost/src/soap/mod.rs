//! # Module SOAP - marshaling des arguments UPnP
//!
//! Ce module implémente la forme "SOAP-lite" utilisée par le contrôle
//! UPnP : décodage d'un document d'arguments entrant vers une map
//! nom→valeur, construction d'un document de réponse ordonné, et
//! échappement XML limité aux cinq entités prédéfinies.
//!
//! ## Fonctionnalités
//!
//! - ✅ Décodage des appels d'action ([`SoapIncoming`])
//! - ✅ Construction des réponses d'action ([`SoapOutgoing`])
//! - ✅ Décodage des payloads d'événements ([`decode_property_set`])
//! - ✅ Échappement/déséchappement XML ([`xml_quote`], [`xml_unquote`])
//!
//! Aucune conversion de type implicite n'est faite au décodage : les
//! accesseurs typés de [`SoapIncoming`] sont explicites. De même, la
//! construction de réponse n'échappe PAS les valeurs : un appelant qui
//! veut des chevrons ou des esperluettes littéraux dans la sortie doit
//! les pré-échapper avec [`xml_quote`].

mod incoming;
mod outgoing;
mod propertyset;
mod quote;

pub use incoming::SoapIncoming;
pub use outgoing::SoapOutgoing;
pub use propertyset::decode_property_set;
pub use quote::{i2s, xml_quote, xml_unquote};

use thiserror::Error;

/// Erreurs de marshaling SOAP.
#[derive(Debug, Error)]
pub enum SoapError {
    /// Document XML invalide (ou vide : pas de nœud racine)
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    /// Erreur de sérialisation XML
    #[error("XML write error: {0}")]
    Write(#[from] xmltree::Error),

    /// Argument absent de la map décodée
    #[error("missing argument '{0}'")]
    MissingArgument(String),

    /// Argument présent mais vide, là où une valeur est requise
    #[error("empty value for argument '{0}'")]
    EmptyValue(String),

    /// Valeur booléenne hors du jeu de tokens reconnu
    #[error("unrecognized boolean value '{1}' for argument '{0}'")]
    BadBoolean(String, String),

    /// Wrapper de propriété sans élément variable dans un propertyset
    #[error("malformed property wrapper at index {0}")]
    MalformedProperty(usize),
}

/// Codes d'erreur SOAP UPnP standards
pub mod error_codes {
    /// Action invalide
    pub const INVALID_ACTION: u16 = 401;

    /// Arguments invalides
    pub const INVALID_ARGS: u16 = 402;

    /// Action échouée
    pub const ACTION_FAILED: u16 = 501;

    /// Valeur d'argument invalide
    pub const ARGUMENT_VALUE_INVALID: u16 = 600;

    /// Valeur d'argument hors limites
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u16 = 601;

    /// Action optionnelle non implémentée
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: u16 = 602;

    /// Mémoire insuffisante
    pub const OUT_OF_MEMORY: u16 = 603;

    /// Intervention humaine requise
    pub const HUMAN_INTERVENTION_REQUIRED: u16 = 604;

    /// Argument chaîne trop long
    pub const STRING_ARGUMENT_TOO_LONG: u16 = 605;
}
