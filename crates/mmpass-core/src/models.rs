//! Shared data types for the vault.

use std::fmt;

use chrono::NaiveDateTime;

/// Tag marking an entry as a favorite. Its presence in the tag set is the
/// sole favorite indicator; no separate flag is persisted.
pub const FAVORITE_TAG: &str = "favorite";

/// Title of the reserved entry that persists configuration values.
/// Entries with this title are excluded from every listing and search.
pub const CONFIG_ENTRY_TITLE: &str = "MMPasswd_Config";

/// Name of the group holding the config entry.
pub const META_GROUP_NAME: &str = "Meta";

/// Name of the group holding soft-deleted entries. An entry is considered
/// deleted when any of its ancestor groups carries this name.
pub const RECYCLE_BIN_NAME: &str = "Recycle Bin";

const TITLE_PLACEHOLDER: &str = "No Title";

/// A credential record, converted out of the underlying container.
#[derive(Clone, Default)]
pub struct Entry {
    /// Container UUID, stable across moves and renames.
    pub id: String,
    /// Display label, kept in sync with `website`/`username` on mutation.
    pub title: String,
    pub username: String,
    pub password: String,
    pub website: String,
    pub notes: String,
    pub is_favorite: bool,
    /// Creation timestamp, immutable after creation.
    pub created: Option<NaiveDateTime>,
}

// Passwords must never leak through logs or error output.
impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("website", &self.website)
            .field("notes", &self.notes)
            .field("is_favorite", &self.is_favorite)
            .field("created", &self.created)
            .finish()
    }
}

/// Fields for creating a new entry.
#[derive(Clone, Default)]
pub struct EntryDraft {
    pub username: String,
    pub password: String,
    pub website: String,
    pub notes: String,
    pub is_favorite: bool,
}

impl fmt::Debug for EntryDraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryDraft")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("website", &self.website)
            .field("notes", &self.notes)
            .field("is_favorite", &self.is_favorite)
            .finish()
    }
}

/// Partial update for an existing entry. Only the fields that are `Some`
/// are applied; favorite toggling adds or removes the [`FAVORITE_TAG`]
/// without replacing the rest of the tag set.
#[derive(Clone, Default)]
pub struct EntryPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub is_favorite: Option<bool>,
}

impl fmt::Debug for EntryPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPatch")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("website", &self.website)
            .field("notes", &self.notes)
            .field("is_favorite", &self.is_favorite)
            .finish()
    }
}

/// Lifecycle state of an entry, derived from its position in the group
/// tree. A purged entry no longer exists, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// In the root tree, outside the Recycle Bin.
    Active,
    /// Inside the Recycle Bin subtree.
    Deleted,
}

/// Display-title rule: website when non-empty, else username, else a
/// placeholder. Re-applied whenever either source field changes.
pub fn derive_title(website: &str, username: &str) -> String {
    if !website.is_empty() {
        website.to_string()
    } else if !username.is_empty() {
        username.to_string()
    } else {
        TITLE_PLACEHOLDER.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_website() {
        assert_eq!(derive_title("example.com", "alice"), "example.com");
    }

    #[test]
    fn title_falls_back_to_username() {
        assert_eq!(derive_title("", "alice"), "alice");
    }

    #[test]
    fn title_placeholder_when_both_empty() {
        assert_eq!(derive_title("", ""), TITLE_PLACEHOLDER);
    }

    #[test]
    fn entry_debug_redacts_password() {
        let entry = Entry {
            password: "hunter2".to_string(),
            ..Entry::default()
        };
        let rendered = format!("{entry:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn patch_debug_redacts_password() {
        let patch = EntryPatch {
            password: Some("hunter2".to_string()),
            ..EntryPatch::default()
        };
        let rendered = format!("{patch:?}");
        assert!(!rendered.contains("hunter2"));
    }
}
