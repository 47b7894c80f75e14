//! Unlocked-session lifecycle.
//!
//! A [`Session`] ties the vault store and the derived field cipher key
//! to the lifetime of an unlocked session: both are dropped (and the key
//! zeroized) on [`Session::lock`]. The passphrase itself is never
//! retained past the unlock call.

use std::path::{Path, PathBuf};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

use crate::crypto::{self, CipherKey};
use crate::error::{Result, StoreError};
use crate::store::VaultStore;

/// Config key under which the field-cipher salt is persisted.
pub const CIPHER_SALT_CONFIG_KEY: &str = "cipher_salt";

/// Session state for one vault file.
pub struct Session {
    path: PathBuf,
    store: Option<VaultStore>,
    cipher: Option<CipherKey>,
}

impl Session {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            store: None,
            cipher: None,
        }
    }

    /// Whether a vault file exists at this session's path.
    pub fn is_initialized(&self) -> bool {
        self.path.exists()
    }

    pub fn is_unlocked(&self) -> bool {
        self.store.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create a fresh vault and leave the session unlocked.
    pub fn create_vault(&mut self, passphrase: &str) -> Result<()> {
        let mut store = VaultStore::create(&self.path, passphrase)?;
        let cipher = derive_session_cipher(&mut store, passphrase)?;
        self.store = Some(store);
        self.cipher = Some(cipher);
        Ok(())
    }

    /// Unlock the vault. Returns `Ok(false)` for a wrong passphrase so a
    /// login flow can retry; every other failure is a hard error.
    pub fn unlock(&mut self, passphrase: &str) -> Result<bool> {
        match VaultStore::unlock(&self.path, passphrase) {
            Ok(mut store) => {
                let cipher = derive_session_cipher(&mut store, passphrase)?;
                self.store = Some(store);
                self.cipher = Some(cipher);
                Ok(true)
            }
            Err(StoreError::InvalidPassphrase) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Discard the store and key material. The cipher key zeroizes on
    /// drop; nothing derived from the passphrase survives the lock.
    pub fn lock(&mut self) {
        self.store = None;
        self.cipher = None;
        tracing::debug!("session locked");
    }

    pub fn store(&self) -> Result<&VaultStore> {
        self.store.as_ref().ok_or(StoreError::Locked)
    }

    pub fn store_mut(&mut self) -> Result<&mut VaultStore> {
        self.store.as_mut().ok_or(StoreError::Locked)
    }

    /// Encrypt a payload under the session cipher key.
    ///
    /// Opt-in defense-in-depth on top of the container's own encryption;
    /// the store does not apply it to regular fields.
    pub fn seal(&self, plaintext: &str) -> Result<String> {
        let key = self.cipher.as_ref().ok_or(StoreError::Locked)?;
        crypto::encrypt(key, plaintext)
    }

    /// Decrypt a payload sealed by [`Session::seal`]. Failures degrade to
    /// the [`crypto::DECRYPT_FAILED`] sentinel rather than erroring.
    pub fn open_sealed(&self, token: &str) -> Result<String> {
        let key = self.cipher.as_ref().ok_or(StoreError::Locked)?;
        Ok(crypto::decrypt(key, token))
    }
}

/// Fetch or lazily create the persisted cipher salt, then derive the
/// session key from it and the passphrase.
fn derive_session_cipher(store: &mut VaultStore, passphrase: &str) -> Result<CipherKey> {
    let salt = match store.get_config(CIPHER_SALT_CONFIG_KEY) {
        Some(encoded) => URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| StoreError::Crypto("stored cipher salt is not valid base64".to_string()))?,
        None => {
            let salt = crypto::generate_salt();
            store.set_config(CIPHER_SALT_CONFIG_KEY, &URL_SAFE_NO_PAD.encode(salt))?;
            salt.to_vec()
        }
    };
    crypto::derive_key(passphrase, &salt)
}
