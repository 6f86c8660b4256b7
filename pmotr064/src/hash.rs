//! Primitive de hachage utilisée par l'authentification digest TR-064
//!
//! Le protocole impose un digest 128 bits (MD5) encodé en hexadécimal
//! minuscule. Le trait permet de substituer l'implémentation dans les tests.

use md5::{Digest, Md5};

/// Calcule le digest hexadécimal (32 caractères, minuscules) d'une suite d'octets
pub trait HashPrimitive: Send + Sync {
    fn digest_hex(&self, bytes: &[u8]) -> String;
}

/// Implémentation MD5 par défaut
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hash;

impl HashPrimitive for Md5Hash {
    fn digest_hex(&self, bytes: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }
}
