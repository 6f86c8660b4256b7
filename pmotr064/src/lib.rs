//! # pmotr064 - Client TR-064 (SOAP) pour équipements réseau
//!
//! Cette crate permet d'invoquer des actions TR-064 sur des équipements
//! embarqués (routeurs Fritz!Box, prises connectées, passerelles DECT...).
//!
//! ## Vue d'ensemble
//!
//! - Découverte des services via le document de description (`/tr64desc.xml`)
//! - Authentification digest SOAP par challenge nonce/realm
//! - Construction et envoi des enveloppes d'action
//! - Relance unique sur refus d'authentification
//! - Extraction tolérante des valeurs de retour
//!
//! ## Architecture
//!
//! - [`Tr064Client`] : orchestre découverte, authentification et envoi
//! - [`ServiceTable`] : services découverts et leurs URL de contrôle
//! - [`AuthSession`] : état nonce/realm/secret d'un client
//! - [`soap`] : construction des enveloppes
//! - [`xml`] : extraction ciblée de balises (pas un parser XML)
//! - [`Transport`] / [`HashPrimitive`] : points de substitution (HTTP, MD5)
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use pmotr064::{ActionOptions, DeviceEndpoint, Tr064Client};
//!
//! fn main() -> pmotr064::Result<()> {
//!     let endpoint = DeviceEndpoint::new("192.168.178.1", 49000, "admin", "password");
//!     let client = Tr064Client::new(endpoint);
//!
//!     let response = client.action(
//!         "urn:dslforum-org:service:WLANConfiguration:1",
//!         "GetGenericAssociatedDeviceInfo",
//!         ActionOptions::new().param("NewAssociatedDeviceIndex", 1),
//!     )?;
//!
//!     if let Some(mac) = response.get("NewAssociatedDeviceMACAddress") {
//!         println!("First WLAN client: {mac}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod auth;
pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod hash;
pub mod services;
pub mod soap;
pub mod transport;
pub mod xml;

pub use action::{ActionOptions, ActionRequest, ActionResponse};
pub use auth::{AuthSession, AuthToken, Challenge};
pub use client::Tr064Client;
pub use config::{ClientSettings, DeviceSettings, Tr064Config};
pub use endpoint::DeviceEndpoint;
pub use error::{DiscoveryError, Result, Tr064Error, UpnpFault};
pub use hash::{HashPrimitive, Md5Hash};
pub use services::ServiceTable;
pub use transport::{Transport, TransportError, TransportResponse, UreqTransport};
