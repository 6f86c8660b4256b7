//! Table des services découverts dans `tr64desc.xml`
//!
//! Chaque bloc `<service>` du document de description fournit un
//! `serviceType`, un `serviceId` et un `controlURL`. La table associe le type
//! (et l'identifiant s'il diffère) au chemin de contrôle.

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result, Tr064Error};
use crate::xml::{extract_all, take_param};

/// Services exposés par l'équipement, dans l'ordre du document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceTable {
    entries: IndexMap<String, String>,
    services: usize,
}

impl ServiceTable {
    /// Construit la table depuis le document de description.
    ///
    /// `max_services` borne le nombre de blocs `<service>` acceptés ; le
    /// dépassement est une erreur, jamais une troncature.
    pub fn build(
        description: &str,
        max_services: Option<usize>,
    ) -> std::result::Result<Self, DiscoveryError> {
        let mut table = ServiceTable::default();

        for block in extract_all(description, "service", false) {
            let Some(control_url) = take_param(block, "controlURL").map(str::trim) else {
                debug!("Skipping <service> block without controlURL");
                continue;
            };

            let service_type = take_param(block, "serviceType").map(str::trim);
            let service_id = take_param(block, "serviceId").map(str::trim);

            let Some(primary) = service_type.or(service_id).filter(|s| !s.is_empty()) else {
                debug!(control_url = %control_url, "Skipping <service> block without serviceType/serviceId");
                continue;
            };

            if let Some(limit) = max_services {
                if table.services >= limit {
                    return Err(DiscoveryError::TooManyServices { limit });
                }
            }

            table.services += 1;
            table.insert(primary, control_url);
            if let Some(id) = service_id.filter(|id| !id.is_empty() && *id != primary) {
                table.insert(id, control_url);
            }
        }

        if table.entries.is_empty() {
            return Err(DiscoveryError::NoServices);
        }

        debug!(services = table.services, "Device description parsed");
        Ok(table)
    }

    fn insert(&mut self, key: &str, control_url: &str) {
        if let Some(existing) = self.entries.get(key) {
            if existing != control_url {
                warn!(
                    service = %key,
                    kept = %existing,
                    ignored = %control_url,
                    "Duplicate service entry in device description, keeping the first one"
                );
            }
            return;
        }
        self.entries.insert(key.to_string(), control_url.to_string());
    }

    /// Chemin de contrôle d'un service (`serviceType` ou `serviceId`)
    pub fn resolve(&self, service: &str) -> Result<&str> {
        self.entries
            .get(service)
            .map(String::as_str)
            .ok_or_else(|| Tr064Error::unknown_service(service))
    }

    pub fn contains(&self, service: &str) -> bool {
        self.entries.contains_key(service)
    }

    /// Paires (clé, controlURL), alias `serviceId` compris
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Nombre de blocs `<service>` retenus
    pub fn len(&self) -> usize {
        self.services
    }

    pub fn is_empty(&self) -> bool {
        self.services == 0
    }
}
