//! Error types for vault operations.
//!
//! Write-path failures always surface as a typed error; read-path lookups
//! degrade to `Option`/empty results instead (see the individual store
//! methods). Error messages never carry secret material.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the vault store, session, and crypto layers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vault is locked - unlock with the master passphrase first")]
    Locked,

    #[error("invalid master passphrase or unreadable vault")]
    InvalidPassphrase,

    #[error("vault file not found: {0}")]
    VaultNotFound(PathBuf),

    #[error("vault file already exists: {0}")]
    VaultExists(PathBuf),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("config key {0:?} collides with a reserved entry field")]
    ReservedConfigKey(String),

    #[error("key derivation error: {0}")]
    KeyDerivation(String),

    #[error("encryption error: {0}")]
    Crypto(String),

    #[error("container error: {0}")]
    Container(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
