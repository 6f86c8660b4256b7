//! Construction des enveloppes SOAP d'action TR-064
//!
//! Les balises et namespaces sont des constantes du protocole, reproduites
//! à l'identique pour rester compatibles avec les équipements réels.

use std::borrow::Cow;

use quick_xml::escape::partial_escape;

use crate::action::ActionRequest;
use crate::auth::AuthToken;

/// Début fixe de toute enveloppe
pub const ENVELOPE_START: &str = r#"<?xml version="1.0"?><s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#;

/// Namespace de l'authentification digest SOAP
pub const AUTH_NAMESPACE: &str = "http://soap-authentication.org/digest/2001/10/";

/// Bloc d'authentification placé dans `<s:Header>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBlock<'a> {
    /// Premier contact : demande un challenge pour cet utilisateur
    InitChallenge { user_id: &'a str },
    /// Réponse au challenge courant
    ClientAuth(&'a AuthToken),
}

/// Construit l'enveloppe d'une action.
///
/// Sans `auth`, aucun `<s:Header>` n'est émis. Avec `escape_values`, les
/// caractères `&`, `<` et `>` des valeurs de paramètres sont échappés ;
/// sinon les valeurs sont insérées telles quelles.
pub fn build_envelope(
    request: &ActionRequest,
    auth: Option<&AuthBlock<'_>>,
    escape_values: bool,
) -> String {
    let mut xml = String::with_capacity(512);
    xml.push_str(ENVELOPE_START);

    if let Some(block) = auth {
        xml.push_str(&auth_header(block));
    }

    xml.push_str(&format!(
        "<s:Body><u:{action} xmlns:u=\"{service}\">",
        action = request.action,
        service = request.service
    ));

    for (name, value) in &request.params {
        let value: Cow<str> = if escape_values {
            partial_escape(value)
        } else {
            Cow::Borrowed(value.as_str())
        };
        xml.push_str(&format!("<{name}>{value}</{name}>"));
    }

    xml.push_str(&format!("</u:{}></s:Body></s:Envelope>", request.action));
    xml
}

fn auth_header(block: &AuthBlock<'_>) -> String {
    match block {
        AuthBlock::InitChallenge { user_id } => format!(
            "<s:Header><h:InitChallenge xmlns:h=\"{AUTH_NAMESPACE}\" s:mustUnderstand=\"1\">\
             <UserID>{user_id}</UserID></h:InitChallenge></s:Header>",
            user_id = partial_escape(*user_id)
        ),
        AuthBlock::ClientAuth(token) => format!(
            "<s:Header><h:ClientAuth xmlns:h=\"{AUTH_NAMESPACE}\" s:mustUnderstand=\"1\">\
             <Nonce>{nonce}</Nonce><Auth>{auth}</Auth><UserID>{user_id}</UserID>\
             <Realm>{realm}</Realm></h:ClientAuth></s:Header>",
            nonce = token.nonce,
            auth = token.response,
            user_id = partial_escape(&token.user_id),
            realm = token.realm
        ),
    }
}
