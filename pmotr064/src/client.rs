use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::action::{ActionOptions, ActionRequest, ActionResponse};
use crate::auth::{AuthSession, Challenge};
use crate::config::{ClientSettings, Tr064Config};
use crate::endpoint::DeviceEndpoint;
use crate::error::{DiscoveryError, Result, Tr064Error, UpnpFault};
use crate::hash::{HashPrimitive, Md5Hash};
use crate::services::ServiceTable;
use crate::soap::{AuthBlock, build_envelope};
use crate::transport::{Transport, TransportResponse, UreqTransport};

/// Client TR-064 pour un équipement.
///
/// La table des services est construite au premier appel (ou par
/// [`Tr064Client::init`]) puis ne change plus. La session d'authentification
/// est protégée par un verrou tenu pendant tout un appel d'action : les
/// appels concurrents sur un même client sont sérialisés.
pub struct Tr064Client<T = UreqTransport, H = Md5Hash>
where
    T: Transport,
    H: HashPrimitive,
{
    endpoint: DeviceEndpoint,
    settings: ClientSettings,
    transport: T,
    hasher: H,
    services: OnceCell<ServiceTable>,
    session: Mutex<AuthSession>,
}

impl Tr064Client {
    /// Client HTTP par défaut (`ureq`, timeout de la configuration par défaut)
    pub fn new(endpoint: DeviceEndpoint) -> Self {
        let settings = ClientSettings::default();
        let transport = UreqTransport::new(settings.timeout());
        Tr064Client::with_transport(endpoint, transport).with_settings(settings)
    }

    pub fn from_config(config: &Tr064Config) -> Self {
        let transport = UreqTransport::new(config.client.timeout());
        Tr064Client::with_transport(config.endpoint(), transport)
            .with_settings(config.client.clone())
    }

    /// Charge la configuration (fichier optionnel + environnement) puis construit le client
    pub fn from_config_file(path: Option<&std::path::Path>) -> Result<Self> {
        let config = Tr064Config::load(path)?;
        Ok(Self::from_config(&config))
    }
}

impl<T: Transport> Tr064Client<T, Md5Hash> {
    pub fn with_transport(endpoint: DeviceEndpoint, transport: T) -> Self {
        Self {
            endpoint,
            settings: ClientSettings::default(),
            transport,
            hasher: Md5Hash,
            services: OnceCell::new(),
            session: Mutex::new(AuthSession::new()),
        }
    }
}

impl<T: Transport, H: HashPrimitive> Tr064Client<T, H> {
    pub fn with_settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_hasher<H2: HashPrimitive>(self, hasher: H2) -> Tr064Client<T, H2> {
        Tr064Client {
            endpoint: self.endpoint,
            settings: self.settings,
            transport: self.transport,
            hasher,
            services: self.services,
            session: self.session,
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Lance la découverte des services si elle n'a pas encore réussi
    pub fn init(&self) -> Result<&ServiceTable> {
        self.services.get_or_try_init(|| self.discover())
    }

    /// Table des services (découverte au besoin)
    pub fn services(&self) -> Result<&ServiceTable> {
        self.init()
    }

    fn discover(&self) -> Result<ServiceTable> {
        let url = self.endpoint.url_for(&self.settings.description_path);
        info!(url = %url, "Fetching device description");

        let response = self.transport.fetch(&url)?;
        if !response.is_success() {
            return Err(DiscoveryError::DescriptionStatus {
                url,
                status: response.status,
            }
            .into());
        }

        let table = ServiceTable::build(&response.body, self.settings.max_services)?;
        info!(services = table.len(), "Device services discovered");
        Ok(table)
    }

    /// Invoque `action` sur `service`.
    ///
    /// Un refus d'authentification (HTTP 401 ou statut `Unauthenticated`)
    /// entraîne au plus une relance avec un nonce neuf, si
    /// `options.retry_on_auth_failure` est vrai.
    pub fn action(
        &self,
        service: &str,
        action: &str,
        options: ActionOptions,
    ) -> Result<ActionResponse> {
        let services = self.services()?;
        let url = self.endpoint.url_for(services.resolve(service)?);
        let request = ActionRequest::new(service, action).with_params(options.params);
        let soap_action = request.soap_action();
        let escape = self.settings.escape_params;

        let mut session = self.session.lock();
        session.ensure_nonce(&self.transport, &self.endpoint, services, escape)?;

        let mut retried = false;
        loop {
            let token = session.derive_token(&self.endpoint, &self.hasher)?;
            let envelope = build_envelope(&request, Some(&AuthBlock::ClientAuth(&token)), escape);

            debug!(service = %service, action = %action, retried, "Sending SOAP action");
            let response = self.transport.send(&url, &envelope, &soap_action)?;

            let challenge = Challenge::parse(&response.body);
            let rejected = response.is_unauthorized() || challenge.is_unauthenticated();
            if rejected {
                session.invalidate_nonce();
            }
            session.absorb(&challenge);

            if !rejected {
                return into_action_response(&request, response);
            }

            if retried || !options.retry_on_auth_failure {
                warn!(
                    service = %service,
                    action = %action,
                    status = response.status,
                    "Authentication rejected by device"
                );
                return Err(Tr064Error::authentication_failed(
                    service,
                    action,
                    response.status,
                ));
            }

            info!(
                service = %service,
                action = %action,
                status = response.status,
                "Authentication rejected, retrying once with a fresh nonce"
            );
            retried = true;
            session.ensure_nonce(&self.transport, &self.endpoint, services, escape)?;
        }
    }
}

fn into_action_response(
    request: &ActionRequest,
    response: TransportResponse,
) -> Result<ActionResponse> {
    if response.is_success() {
        return Ok(ActionResponse::new(response.status, response.body));
    }

    let fault = UpnpFault::parse(&response.body);
    warn!(
        service = %request.service,
        action = %request.action,
        status = response.status,
        fault = ?fault,
        "SOAP action failed"
    );

    Err(Tr064Error::ActionFailed {
        service: request.service.clone(),
        action: request.action.clone(),
        status: response.status,
        fault,
    })
}
