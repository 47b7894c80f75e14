//! Core vault store and crypto layer for mmpass.
//!
//! This crate provides everything below the presentation boundary: the
//! credential store over a KeePass container, the passphrase-derived
//! field cipher, search/filter semantics, the unlocked-session
//! lifecycle, and bulk import.

pub mod crypto;
pub mod error;
pub mod filter;
pub mod generate;
pub mod import;
pub mod models;
pub mod session;
pub mod store;

pub use error::{Result, StoreError};
pub use filter::EntryFilter;
pub use import::{import_records, ImportRecord};
pub use models::{Entry, EntryDraft, EntryPatch, EntryState};
pub use session::Session;
pub use store::VaultStore;
