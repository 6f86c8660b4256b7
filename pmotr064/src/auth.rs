//! Authentification digest SOAP (nonce/realm) des équipements TR-064
//!
//! Le secret `md5(user:realm:password)` ne dépend que des credentials et du
//! realm : il est calculé une fois et gardé jusqu'à un changement de realm.
//! Le jeton `md5(secret:nonce)` est dérivé à chaque requête à partir du
//! nonce courant.
//!
//! Chaque réponse de l'équipement peut porter le challenge suivant
//! (`NextChallenge`, `Challenge`) : [`AuthSession::absorb`] le mémorise.
//! Après un refus, le nonce rejeté est invalidé et ne sera plus accepté.
//!
//! Le premier nonce est obtenu par une requête fixe en lecture seule
//! (`DeviceInfo:1#GetInfo`), jamais par l'action de l'appelant : une action
//! exécutée par l'équipement lors de cet échange le serait deux fois.

use std::fmt;

use tracing::{debug, info};

use crate::action::ActionRequest;
use crate::endpoint::DeviceEndpoint;
use crate::error::{Result, Tr064Error};
use crate::hash::HashPrimitive;
use crate::services::ServiceTable;
use crate::soap::{AuthBlock, build_envelope};
use crate::transport::Transport;
use crate::xml::{extract, take_param};

/// Statut d'authentification renvoyé par l'équipement après un refus
pub const STATUS_UNAUTHENTICATED: &str = "Unauthenticated";

/// Service interrogé pour obtenir un challenge (obligatoire en TR-064)
pub const CHALLENGE_SERVICE: &str = "urn:dslforum-org:service:DeviceInfo:1";

/// Action sans paramètre ni effet de bord envoyée avec `InitChallenge`
pub const CHALLENGE_ACTION: &str = "GetInfo";

/// Jeton d'authentification pour une seule enveloppe
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub realm: String,
    pub nonce: String,
    /// `md5(secret:nonce)` en hexadécimal
    pub response: String,
    pub user_id: String,
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

/// Données de challenge lues dans une réponse
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Challenge {
    pub nonce: Option<String>,
    pub realm: Option<String>,
    pub status: Option<String>,
}

impl Challenge {
    /// Lit `Nonce`, `Realm` et `Status` dans `<s:Header>`, ou dans tout le
    /// document s'il n'y a pas d'en-tête.
    pub fn parse(body: &str) -> Self {
        let scope = extract(body, "s:Header", false).unwrap_or(body);
        let field = |name: &str| {
            take_param(scope, name)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            nonce: field("Nonce"),
            realm: field("Realm"),
            status: field("Status"),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status.as_deref() == Some(STATUS_UNAUTHENTICATED)
    }
}

/// État d'authentification d'un client, vide à la création
#[derive(Default)]
pub struct AuthSession {
    realm: Option<String>,
    nonce: Option<String>,
    secret: Option<String>,
    stale_nonce: Option<String>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("realm", &self.realm)
            .field("nonce", &self.nonce)
            .field("has_secret", &self.secret.is_some())
            .finish()
    }
}

impl AuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn realm(&self) -> Option<&str> {
        self.realm.as_deref()
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    /// Un jeton peut être dérivé (nonce et realm connus)
    pub fn has_nonce(&self) -> bool {
        self.nonce.is_some() && self.realm.is_some()
    }

    /// Mémorise le challenge porté par une réponse.
    ///
    /// Un nouveau realm efface le secret en cache. Un nonce identique à celui
    /// qui vient d'être refusé est ignoré. Renvoie `true` si un nonce neuf a
    /// été retenu.
    pub fn absorb(&mut self, challenge: &Challenge) -> bool {
        if let Some(realm) = &challenge.realm {
            if self.realm.as_ref() != Some(realm) {
                debug!(realm = %realm, "New authentication realm");
                self.realm = Some(realm.clone());
                self.secret = None;
            }
        }

        let Some(nonce) = &challenge.nonce else {
            return false;
        };

        if self.stale_nonce.as_ref() == Some(nonce) {
            debug!("Ignoring nonce already rejected by the device");
            return false;
        }

        self.nonce = Some(nonce.clone());
        true
    }

    /// Obtient un nonce si aucun n'est en cache.
    ///
    /// Envoie `DeviceInfo:1#GetInfo` avec un en-tête `InitChallenge` ; la
    /// réponse doit porter un nonce et un realm.
    pub fn ensure_nonce<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        endpoint: &DeviceEndpoint,
        services: &ServiceTable,
        escape_values: bool,
    ) -> Result<()> {
        if self.has_nonce() {
            return Ok(());
        }

        let request = ActionRequest::new(CHALLENGE_SERVICE, CHALLENGE_ACTION);
        let url = endpoint.url_for(services.resolve(CHALLENGE_SERVICE)?);
        info!(url = %url, "Requesting authentication challenge");

        let init = AuthBlock::InitChallenge {
            user_id: endpoint.username(),
        };
        let envelope = build_envelope(&request, Some(&init), escape_values);
        let response = transport.send(&url, &envelope, &request.soap_action())?;

        self.absorb(&Challenge::parse(&response.body));

        if !self.has_nonce() {
            return Err(Tr064Error::challenge(
                &request.service,
                &request.action,
                response.status,
            ));
        }

        Ok(())
    }

    /// `md5(username:realm:password)`, calculé une fois par realm
    pub fn secret_hash<H: HashPrimitive + ?Sized>(
        &mut self,
        endpoint: &DeviceEndpoint,
        hasher: &H,
    ) -> Result<String> {
        let realm = self.realm.as_deref().ok_or(Tr064Error::NotChallenged)?;

        if let Some(secret) = &self.secret {
            return Ok(secret.clone());
        }

        let credentials = format!("{}:{}:{}", endpoint.username(), realm, endpoint.password());
        let secret = hasher.digest_hex(credentials.as_bytes());
        self.secret = Some(secret.clone());
        Ok(secret)
    }

    /// Jeton `md5(secret:nonce)` pour le nonce courant
    pub fn derive_token<H: HashPrimitive + ?Sized>(
        &mut self,
        endpoint: &DeviceEndpoint,
        hasher: &H,
    ) -> Result<AuthToken> {
        let nonce = self.nonce.clone().ok_or(Tr064Error::NotChallenged)?;
        let secret = self.secret_hash(endpoint, hasher)?;
        let response = hasher.digest_hex(format!("{secret}:{nonce}").as_bytes());

        Ok(AuthToken {
            realm: self.realm.clone().unwrap_or_default(),
            nonce,
            response,
            user_id: endpoint.username().to_string(),
        })
    }

    /// Oublie le nonce après un refus ; realm et secret sont conservés
    pub fn invalidate_nonce(&mut self) {
        if let Some(nonce) = self.nonce.take() {
            self.stale_nonce = Some(nonce);
        }
    }
}
