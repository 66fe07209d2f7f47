//! Authentication scrambles.
//!
//! Two server plugins are supported:
//! - `mysql_native_password`: `SHA1(password) XOR SHA1(seed + SHA1(SHA1(password)))`
//! - `caching_sha2_password`: fast path
//!   `XOR(SHA256(password), SHA256(SHA256(SHA256(password)) + seed))`,
//!   with an RSA-encrypted fallback when the server has no cached entry
//!
//! Any other plugin name is rejected up front. In particular the password
//! is never sent in the clear, so `mysql_clear_password` requests fail
//! rather than downgrade.

use sha1::Sha1;
use sha2::{Digest, Sha256};

use rand::rngs::OsRng;

use rsa::RsaPublicKey;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;

use tinysql_core::Result;
use tinysql_core::error::{ConnectionError, ConnectionErrorKind, Error};

/// Well-known authentication plugin names.
pub mod plugins {
    /// SHA1-based authentication (pre-8.0 default)
    pub const MYSQL_NATIVE_PASSWORD: &str = "mysql_native_password";
    /// SHA256-based authentication (MySQL 8.0+ default)
    pub const CACHING_SHA2_PASSWORD: &str = "caching_sha2_password";
}

/// Status bytes in the caching_sha2_password sub-protocol.
pub mod caching_sha2 {
    /// Client asks the server for its RSA public key
    pub const REQUEST_PUBLIC_KEY: u8 = 0x02;
    /// Server found a cached entry; an OK packet follows
    pub const FAST_AUTH_SUCCESS: u8 = 0x03;
    /// Server needs the full exchange (RSA or a secure channel)
    pub const PERFORM_FULL_AUTH: u8 = 0x04;
}

/// Does this client implement the named plugin?
pub fn is_supported(plugin: &str) -> bool {
    matches!(
        plugin,
        plugins::MYSQL_NATIVE_PASSWORD | plugins::CACHING_SHA2_PASSWORD
    )
}

/// Compute the scramble for the named plugin, or fail for plugins this
/// client does not implement.
pub fn initial_response(plugin: &str, password: &str, seed: &[u8]) -> Result<Vec<u8>> {
    match plugin {
        plugins::MYSQL_NATIVE_PASSWORD => Ok(scramble_native(password, seed)),
        plugins::CACHING_SHA2_PASSWORD => Ok(scramble_sha2(password, seed)),
        other => Err(unsupported_plugin(other)),
    }
}

pub(crate) fn unsupported_plugin(plugin: &str) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::UnsupportedAuth,
        message: format!("server requested unsupported auth plugin '{plugin}'"),
        source: None,
    })
}

/// mysql_native_password scramble.
///
/// Produces 20 bytes, or nothing for an empty password.
pub fn scramble_native(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }
    // Servers send a 20-byte scramble, sometimes with a trailing NUL.
    let seed = seed.get(..20).unwrap_or(seed);

    let stage1: [u8; 20] = Sha1::digest(password.as_bytes()).into();
    let stage2: [u8; 20] = Sha1::digest(stage1).into();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let mask: [u8; 20] = hasher.finalize().into();

    stage1.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect()
}

/// caching_sha2_password fast-path scramble.
///
/// Produces 32 bytes, or nothing for an empty password.
pub fn scramble_sha2(password: &str, seed: &[u8]) -> Vec<u8> {
    if password.is_empty() {
        return vec![];
    }
    // Strip the trailing NUL the server appends to the 20-byte scramble.
    let seed = if seed.len() == 21 && seed.last() == Some(&0) {
        &seed[..20]
    } else {
        seed
    };

    let hash: [u8; 32] = Sha256::digest(password.as_bytes()).into();
    let hash_hash: [u8; 32] = Sha256::digest(hash).into();

    let mut hasher = Sha256::new();
    hasher.update(hash_hash);
    hasher.update(seed);
    let mask: [u8; 32] = hasher.finalize().into();

    hash.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect()
}

/// Encrypt the password for the caching_sha2_password full exchange.
///
/// The NUL-terminated password is XORed with the seed (repeating it as
/// needed) and encrypted with the server's public key using OAEP, as
/// MySQL 8.0.5+ expects.
pub fn encrypt_password(password: &str, seed: &[u8], public_key_pem: &[u8]) -> Result<Vec<u8>> {
    if seed.is_empty() {
        return Err(auth_error("empty auth seed for RSA password exchange"));
    }

    let mut buf = password.as_bytes().to_vec();
    buf.push(0);
    for (i, b) in buf.iter_mut().enumerate() {
        *b ^= seed[i % seed.len()];
    }

    let pem = std::str::from_utf8(public_key_pem)
        .map_err(|e| auth_error(format!("server public key is not valid PEM: {e}")))?;
    // Servers differ on the PEM encoding; accept both.
    let key = RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| auth_error(format!("failed to parse server public key: {e}")))?;

    key.encrypt(&mut OsRng, rsa::Oaep::new::<Sha1>(), &buf)
        .map_err(|e| auth_error(format!("RSA password encryption failed: {e}")))
}

pub(crate) fn auth_error(msg: impl Into<String>) -> Error {
    Error::Connection(ConnectionError {
        kind: ConnectionErrorKind::Authentication,
        message: msg.into(),
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_scramble_empty_password() {
        assert!(scramble_native("", &[0; 20]).is_empty());
    }

    #[test]
    fn native_scramble_shape() {
        let seed = [
            0x3d, 0x4c, 0x5e, 0x2f, 0x1a, 0x0b, 0x7c, 0x8d, 0x9e, 0xaf, 0x10, 0x21, 0x32, 0x43,
            0x54, 0x65, 0x76, 0x87, 0x98, 0xa9,
        ];
        let response = scramble_native("mypassword", &seed);
        assert_eq!(response.len(), 20);
        assert_eq!(response, scramble_native("mypassword", &seed));
        assert_ne!(response, scramble_native("otherpassword", &seed));
    }

    #[test]
    fn native_scramble_is_reversible_to_stage1() {
        // response XOR SHA1(seed + SHA1(SHA1(pw))) must equal SHA1(pw),
        // which is what the server verifies.
        let seed = [7u8; 20];
        let response = scramble_native("secret", &seed);

        let stage1: [u8; 20] = Sha1::digest(b"secret").into();
        let stage2: [u8; 20] = Sha1::digest(stage1).into();
        let mut hasher = Sha1::new();
        hasher.update(seed);
        hasher.update(stage2);
        let mask: [u8; 20] = hasher.finalize().into();

        let recovered: Vec<u8> = response.iter().zip(mask.iter()).map(|(a, b)| a ^ b).collect();
        assert_eq!(recovered, stage1.to_vec());
    }

    #[test]
    fn sha2_scramble_shape() {
        let response = scramble_sha2("secret", &[0; 20]);
        assert_eq!(response.len(), 32);
        assert_eq!(response, scramble_sha2("secret", &[0; 20]));
    }

    #[test]
    fn sha2_scramble_ignores_trailing_nul() {
        let mut seed = vec![5u8; 20];
        let plain = scramble_sha2("secret", &seed);
        seed.push(0);
        assert_eq!(scramble_sha2("secret", &seed), plain);
    }

    #[test]
    fn sha2_scramble_empty_password() {
        assert!(scramble_sha2("", &[0; 20]).is_empty());
    }

    #[test]
    fn unknown_plugin_is_a_hard_error() {
        let err = initial_response("mysql_clear_password", "pw", &[0; 20]).unwrap_err();
        match err {
            Error::Connection(c) => {
                assert_eq!(c.kind, ConnectionErrorKind::UnsupportedAuth);
            }
            other => panic!("expected connection error, got {other}"),
        }
    }

    #[test]
    fn supported_plugins() {
        assert!(is_supported(plugins::MYSQL_NATIVE_PASSWORD));
        assert!(is_supported(plugins::CACHING_SHA2_PASSWORD));
        assert!(!is_supported("sha256_password"));
        assert!(!is_supported("mysql_clear_password"));
    }

    #[test]
    fn rsa_exchange_rejects_empty_seed() {
        assert!(encrypt_password("pw", &[], b"not a key").is_err());
    }
}
