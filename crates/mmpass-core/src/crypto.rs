//! Key derivation and field-level encryption.
//!
//! A master passphrase plus a random salt is stretched with
//! PBKDF2-HMAC-SHA256 into a 32-byte key, which drives AES-256-GCM over
//! self-contained tokens. This layer is independent of the container's
//! own encryption; see [`crate::session::Session`] for how it is scoped
//! to an unlocked session.
//!
//! Token layout (base64url, no padding):
//!   [ 1-byte version | 8-byte unix timestamp (BE) | 12-byte nonce |
//!     32-byte key-commitment tag | ciphertext + tag ]
//! The version/timestamp header is authenticated as associated data.
//! AES-GCM alone does not commit to its key, so the token also carries
//! an HMAC-SHA256 tag over the header and nonce under the cipher key,
//! verified before decryption; a token can only authenticate under the
//! one key that produced it.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Utc;
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, StoreError};

/// Length of the derived key in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// Length of the random salt in bytes.
pub const SALT_LEN: usize = 16;

/// PBKDF2 iteration count.
pub const PBKDF2_ROUNDS: u32 = 480_000;

/// Sentinel returned by [`decrypt`] when a token fails authentication or
/// is malformed. Callers that need a hard failure must check for it
/// explicitly; a vault-viewing UI would rather display this marker than
/// crash on one corrupt field.
pub const DECRYPT_FAILED: &str = "[decryption error]";

const NONCE_LEN: usize = 12;
const HEADER_LEN: usize = 9;
const COMMIT_LEN: usize = 32;
const TOKEN_VERSION: u8 = 1;
const COMMIT_CONTEXT: &[u8] = b"mmpass-key-commitment-v1";

type HmacSha256 = Hmac<Sha256>;

/// A derived symmetric key, zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_LEN]);

impl CipherKey {
    fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Derive a cipher key from a passphrase and salt.
///
/// Deterministic: the same passphrase and salt always produce the same
/// key. Errors on an empty passphrase or salt.
pub fn derive_key(passphrase: &str, salt: &[u8]) -> Result<CipherKey> {
    if passphrase.is_empty() {
        return Err(StoreError::KeyDerivation(
            "passphrase must not be empty".to_string(),
        ));
    }
    if salt.is_empty() {
        return Err(StoreError::KeyDerivation(
            "salt must not be empty".to_string(),
        ));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, PBKDF2_ROUNDS, &mut key);
    Ok(CipherKey(key))
}

/// Generate a cryptographically secure random salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Encrypt a string payload into a self-contained token.
///
/// Caller contract: an empty plaintext maps to an empty token. This is a
/// deliberate simplification for optional fields, not a general rule.
pub fn encrypt(key: &CipherKey, plaintext: &str) -> Result<String> {
    if plaintext.is_empty() {
        return Ok(String::new());
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|e| StoreError::Crypto(format!("invalid key length: {e}")))?;

    let mut header = [0u8; HEADER_LEN];
    header[0] = TOKEN_VERSION;
    header[1..].copy_from_slice(&Utc::now().timestamp().to_be_bytes());

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let commit = commitment(key, &header, &nonce)?;
    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext.as_bytes(),
                aad: &header,
            },
        )
        .map_err(|e| StoreError::Crypto(format!("encryption error: {e}")))?;

    let mut token =
        Vec::with_capacity(HEADER_LEN + NONCE_LEN + COMMIT_LEN + ciphertext.len());
    token.extend_from_slice(&header);
    token.extend_from_slice(&nonce);
    token.extend_from_slice(&commit);
    token.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(token))
}

/// Key-commitment tag over the token header and nonce.
///
/// AES-GCM does not bind its ciphertext to the key, so each token also
/// carries this HMAC-SHA256 tag; verification must happen before the
/// AEAD open.
fn commitment(key: &CipherKey, header: &[u8], nonce: &[u8]) -> Result<[u8; COMMIT_LEN]> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes())
        .map_err(|e| StoreError::Crypto(format!("invalid commitment key: {e}")))?;
    mac.update(COMMIT_CONTEXT);
    mac.update(header);
    mac.update(nonce);
    Ok(mac.finalize().into_bytes().into())
}

/// Decrypt a token produced by [`encrypt`].
///
/// Never fails: an empty token yields an empty string, and any malformed
/// or tampered token yields the [`DECRYPT_FAILED`] sentinel.
pub fn decrypt(key: &CipherKey, token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    try_decrypt(key, token).unwrap_or_else(|| DECRYPT_FAILED.to_string())
}

fn try_decrypt(key: &CipherKey, token: &str) -> Option<String> {
    let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
    if raw.len() < HEADER_LEN + NONCE_LEN + COMMIT_LEN || raw[0] != TOKEN_VERSION {
        return None;
    }

    let (header, rest) = raw.split_at(HEADER_LEN);
    let (nonce, rest) = rest.split_at(NONCE_LEN);
    let (commit, ciphertext) = rest.split_at(COMMIT_LEN);

    // Constant-time check that the token was made under this key.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key.as_bytes()).ok()?;
    mac.update(COMMIT_CONTEXT);
    mac.update(header);
    mac.update(nonce);
    mac.verify_slice(commit).ok()?;

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes()).ok()?;
    let plaintext = cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .ok()?;

    String::from_utf8(plaintext).ok()
}
