//! Requêtes et réponses d'action TR-064

use crate::xml::{extract, take_param};

/// Action à invoquer : service, nom, paramètres ordonnés
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    pub service: String,
    pub action: String,
    /// Paramètres (nom, valeur), insérés dans l'enveloppe dans cet ordre
    pub params: Vec<(String, String)>,
}

impl ActionRequest {
    pub fn new(service: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            action: action.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(mut self, params: Vec<(String, String)>) -> Self {
        self.params = params;
        self
    }

    /// Valeur de l'en-tête SOAPAction : "urn:service#Action"
    pub fn soap_action(&self) -> String {
        format!("{}#{}", self.service, self.action)
    }
}

/// Options d'un appel d'action.
///
/// - `params` : aucun par défaut
/// - `retry_on_auth_failure` : `true` par défaut (une seule relance)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionOptions {
    pub params: Vec<(String, String)>,
    pub retry_on_auth_failure: bool,
}

impl Default for ActionOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            retry_on_auth_failure: true,
        }
    }
}

impl ActionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un paramètre à la suite des précédents
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((name.into(), value.to_string()));
        self
    }

    pub fn retry_on_auth_failure(mut self, retry: bool) -> Self {
        self.retry_on_auth_failure = retry;
        self
    }
}

/// Réponse brute d'une action, avec extraction à la demande
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionResponse {
    pub status: u16,
    pub raw_body: String,
}

impl ActionResponse {
    pub fn new(status: u16, raw_body: impl Into<String>) -> Self {
        Self {
            status,
            raw_body: raw_body.into(),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw_body
    }

    /// Contenu de `<s:Body>` s'il est présent
    pub fn body(&self) -> Option<&str> {
        extract(&self.raw_body, "s:Body", false)
    }

    /// Valeur d'un paramètre de sortie (casse exacte, puis insensible).
    ///
    /// La recherche porte sur le corps SOAP s'il existe, sinon sur le document entier.
    pub fn get(&self, name: &str) -> Option<&str> {
        take_param(self.scope(), name)
    }

    /// Valeur d'un paramètre de sortie, casse exacte uniquement
    pub fn get_case_sensitive(&self, name: &str) -> Option<&str> {
        extract(self.scope(), name, true)
    }

    /// Plusieurs paramètres de sortie, dans l'ordre demandé
    pub fn values(&self, names: &[&str]) -> Vec<Option<&str>> {
        names.iter().map(|name| self.get(name)).collect()
    }

    fn scope(&self) -> &str {
        self.body().unwrap_or(&self.raw_body)
    }
}
