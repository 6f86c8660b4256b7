//! Gestion des erreurs pour le client TR-064

use std::fmt;

use thiserror::Error;

use crate::transport::TransportError;
use crate::xml::{extract_insensitive, take_param};

/// Type Result personnalisé pour pmotr064
pub type Result<T> = std::result::Result<T, Tr064Error>;

/// Erreurs possibles lors d'un appel d'action TR-064
#[derive(Error, Debug)]
pub enum Tr064Error {
    /// Description de l'équipement inutilisable
    #[error("Device description error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Service absent de la table découverte
    #[error("Service {0} is not exposed by the device")]
    UnknownService(String),

    /// L'équipement n'a renvoyé ni nonce ni realm
    #[error("{service}#{action}: device returned no usable challenge (HTTP status {status})")]
    Challenge {
        service: String,
        action: String,
        status: u16,
    },

    /// Jeton demandé avant toute négociation
    #[error("Authentication token requested before any challenge was received")]
    NotChallenged,

    /// Credentials refusés, y compris après la relance
    #[error("{service}#{action}: authentication failed (HTTP status {status})")]
    AuthenticationFailed {
        service: String,
        action: String,
        status: u16,
    },

    /// L'action a été refusée par l'équipement
    #[error("{service}#{action} failed with HTTP status {status}{}", fault_suffix(.fault))]
    ActionFailed {
        service: String,
        action: String,
        status: u16,
        fault: Option<UpnpFault>,
    },

    /// Erreur réseau, remontée telle quelle
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Erreur de configuration (anyhow)
    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),
}

impl Tr064Error {
    pub fn unknown_service(service: &str) -> Self {
        Tr064Error::UnknownService(service.to_string())
    }

    pub fn challenge(service: &str, action: &str, status: u16) -> Self {
        Tr064Error::Challenge {
            service: service.to_string(),
            action: action.to_string(),
            status,
        }
    }

    pub fn authentication_failed(service: &str, action: &str, status: u16) -> Self {
        Tr064Error::AuthenticationFailed {
            service: service.to_string(),
            action: action.to_string(),
            status,
        }
    }

    /// Vérifie si l'erreur provient d'un refus d'authentification
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self,
            Tr064Error::AuthenticationFailed { .. } | Tr064Error::Challenge { .. }
        )
    }
}

/// Erreurs de lecture du document de description (`tr64desc.xml`)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("no <service> entry with a controlURL found in device description")]
    NoServices,

    #[error("device description lists more than {limit} services")]
    TooManyServices { limit: usize },

    #[error("fetching {url} returned HTTP status {status}")]
    DescriptionStatus { url: String, status: u16 },
}

/// Erreur UPnP extraite d'un SOAP Fault (`<UPnPError>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpFault {
    pub error_code: u32,
    pub error_description: String,
}

impl UpnpFault {
    /// Extrait `<UPnPError>` d'un SOAP Fault, si présent et lisible
    pub fn parse(body: &str) -> Option<Self> {
        let upnp_error = extract_insensitive(body, "UPnPError")?;
        let error_code = take_param(upnp_error, "errorCode")?.trim().parse::<u32>().ok()?;
        let error_description = take_param(upnp_error, "errorDescription")
            .map(|d| d.trim().to_string())
            .unwrap_or_default();

        Some(UpnpFault {
            error_code,
            error_description,
        })
    }
}

impl fmt::Display for UpnpFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPnP error {}: {}", self.error_code, self.error_description)
    }
}

fn fault_suffix(fault: &Option<UpnpFault>) -> String {
    match fault {
        Some(fault) => format!(" ({fault})"),
        None => String::new(),
    }
}
