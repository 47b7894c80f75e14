//! Bulk import of credential records.
//!
//! Rows come from an external tabular source already parsed by the
//! caller (the CLI reads JSON; CSV parsing is a collaborator concern).
//! Each accepted row goes through [`VaultStore::add_entry`] and inherits
//! its validation and title derivation.

use std::fmt;

use serde::Deserialize;

use crate::models::EntryDraft;
use crate::store::VaultStore;

/// One row of an import source. Only the password is required; a row
/// without one is skipped.
#[derive(Clone, Default, Deserialize)]
pub struct ImportRecord {
    #[serde(default)]
    pub username: String,
    pub password: Option<String>,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default, alias = "is_favorite")]
    pub favorite: bool,
}

impl fmt::Debug for ImportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImportRecord")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("website", &self.website)
            .field("notes", &self.notes)
            .field("favorite", &self.favorite)
            .finish()
    }
}

/// Import rows into the store, returning the number of entries created.
///
/// Partial success is expected: a row lacking a password, or one the
/// store rejects, aborts only that row and does not count toward the
/// tally.
pub fn import_records<I>(store: &mut VaultStore, rows: I) -> usize
where
    I: IntoIterator<Item = ImportRecord>,
{
    let mut count = 0;
    for row in rows {
        let Some(password) = row.password else {
            tracing::debug!("skipping import row without a password field");
            continue;
        };
        let draft = EntryDraft {
            username: row.username,
            password,
            website: row.website,
            notes: row.notes,
            is_favorite: row.favorite,
        };
        match store.add_entry(draft) {
            Ok(_) => count += 1,
            Err(err) => tracing::warn!(error = %err, "skipping import row rejected by the store"),
        }
    }
    count
}
