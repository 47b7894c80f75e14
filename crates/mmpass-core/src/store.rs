//! Vault operations over the KeePass container.
//!
//! `VaultStore` wraps a [`keepass::Database`] and layers the credential
//! semantics on top of its group tree: CRUD by UUID, tag-based
//! favoriting, soft delete by relocation into the Recycle Bin group,
//! and configuration values persisted as custom fields on a reserved
//! entry in the Meta group.
//!
//! Every mutating operation saves the container before returning
//! (write-through), so a call that returned success is durable.

use std::fs::File;
use std::path::{Path, PathBuf};

use keepass::config::DatabaseConfig;
use keepass::db::{Entry as KpEntry, Group as KpGroup, Node, Value};
use keepass::{Database, DatabaseKey};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::filter::{self, EntryFilter};
use crate::models::{
    derive_title, Entry, EntryDraft, EntryPatch, EntryState, CONFIG_ENTRY_TITLE, FAVORITE_TAG,
    META_GROUP_NAME, RECYCLE_BIN_NAME,
};

const TITLE_FIELD: &str = "Title";
const USERNAME_FIELD: &str = "UserName";
const PASSWORD_FIELD: &str = "Password";
const URL_FIELD: &str = "URL";
const NOTES_FIELD: &str = "Notes";

/// Standard kdbx fields that config keys must not collide with.
const RESERVED_FIELDS: &[&str] = &[
    TITLE_FIELD,
    USERNAME_FIELD,
    PASSWORD_FIELD,
    URL_FIELD,
    NOTES_FIELD,
];

/// An unlocked vault.
pub struct VaultStore {
    db: Database,
    path: PathBuf,
    key: DatabaseKey,
}

impl VaultStore {
    /// Create a new vault file at `path`, protected by `passphrase`.
    ///
    /// Fails with [`StoreError::VaultExists`] if the file already exists.
    pub fn create(path: impl AsRef<Path>, passphrase: &str) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            return Err(StoreError::VaultExists(path.to_path_buf()));
        }
        if passphrase.is_empty() {
            return Err(StoreError::MissingField("passphrase"));
        }

        let store = Self {
            db: Database::new(DatabaseConfig::default()),
            path: path.to_path_buf(),
            key: DatabaseKey::new().with_password(passphrase),
        };
        store.save()?;
        tracing::info!(path = %path.display(), "created new vault");
        Ok(store)
    }

    /// Open and unlock an existing vault.
    ///
    /// A missing file maps to [`StoreError::VaultNotFound`]; a wrong
    /// passphrase or unreadable container maps to
    /// [`StoreError::InvalidPassphrase`] without detail, so nothing about
    /// the container's content leaks before authentication.
    pub fn unlock(path: impl AsRef<Path>, passphrase: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(StoreError::VaultNotFound(path.to_path_buf()));
        }

        let key = DatabaseKey::new().with_password(passphrase);
        let db = Database::open(&mut File::open(path)?, key.clone()).map_err(|err| {
            tracing::debug!(error = %err, "container rejected unlock");
            StoreError::InvalidPassphrase
        })?;

        Ok(Self {
            db,
            path: path.to_path_buf(),
            key,
        })
    }

    /// Path of the underlying vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the container to disk.
    pub fn save(&self) -> Result<()> {
        let mut file = File::create(&self.path)?;
        self.db
            .save(&mut file, self.key.clone())
            .map_err(|e| StoreError::Container(e.to_string()))?;
        Ok(())
    }

    // --- Entry management ---

    /// Create an entry under the root group and save.
    ///
    /// The title is derived from website/username. Rejects an empty
    /// password; every other field may be empty.
    pub fn add_entry(&mut self, draft: EntryDraft) -> Result<Entry> {
        if draft.password.is_empty() {
            return Err(StoreError::MissingField("password"));
        }

        let mut entry = KpEntry::new();
        entry.fields.insert(
            TITLE_FIELD.to_string(),
            Value::Unprotected(derive_title(&draft.website, &draft.username)),
        );
        entry.fields.insert(
            USERNAME_FIELD.to_string(),
            Value::Unprotected(draft.username),
        );
        entry.fields.insert(
            PASSWORD_FIELD.to_string(),
            Value::Protected(draft.password.as_bytes().into()),
        );
        entry
            .fields
            .insert(URL_FIELD.to_string(), Value::Unprotected(draft.website));
        entry
            .fields
            .insert(NOTES_FIELD.to_string(), Value::Unprotected(draft.notes));
        if draft.is_favorite {
            entry.tags.push(FAVORITE_TAG.to_string());
        }

        let id = entry.uuid.to_string();
        self.db.root.children.push(Node::Entry(entry));
        self.save()?;

        self.get_entry(&id)
            .ok_or_else(|| StoreError::Container("entry missing after save".to_string()))
    }

    /// Point lookup by id. Returns `None` for malformed or unknown ids;
    /// never fails on caller-supplied input.
    pub fn get_entry(&self, id: &str) -> Option<Entry> {
        let uuid = Uuid::parse_str(id).ok()?;
        find_entry(&self.db.root, &uuid).map(convert_entry)
    }

    /// Apply a partial update, re-deriving the title when website or
    /// username is touched. A no-op when `id` does not resolve.
    pub fn update_entry(&mut self, id: &str, patch: EntryPatch) -> Result<()> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(());
        };
        if apply_patch(&mut self.db.root, &uuid, &patch) {
            self.save()?;
        }
        Ok(())
    }

    /// Delete an entry. With `soft` it is relocated into the Recycle Bin
    /// group (created on first use); otherwise it is permanently removed.
    /// A no-op when `id` does not resolve.
    pub fn delete_entry(&mut self, id: &str, soft: bool) -> Result<()> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(());
        };
        let Some(entry) = take_entry(&mut self.db.root, &uuid) else {
            return Ok(());
        };

        if soft {
            let bin_uuid = {
                let bin = ensure_top_group(&mut self.db.root, RECYCLE_BIN_NAME);
                bin.children.push(Node::Entry(entry));
                bin.uuid
            };
            // Mark the bin in the container metadata so other KeePass
            // clients recognize it.
            if self.db.meta.recyclebin_uuid.is_none() {
                self.db.meta.recyclebin_uuid = Some(bin_uuid);
                self.db.meta.recyclebin_enabled = Some(true);
            }
        }
        self.save()
    }

    /// Move a soft-deleted entry back into the root group.
    ///
    /// The original parent group is not tracked, so restore always
    /// targets the root; this is a known simplification. A no-op when
    /// `id` does not resolve or the entry is already active.
    pub fn restore_entry(&mut self, id: &str) -> Result<()> {
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(());
        };
        if entry_state(&self.db.root, &uuid, false) != Some(EntryState::Deleted) {
            return Ok(());
        }
        let Some(entry) = take_entry(&mut self.db.root, &uuid) else {
            return Ok(());
        };
        self.db.root.children.push(Node::Entry(entry));
        self.save()
    }

    /// List entries for a filter and optional query, ordered per the
    /// website/username rule. The config entry never appears.
    pub fn list_entries(&self, filter: EntryFilter, query: Option<&str>) -> Vec<Entry> {
        let mut all = Vec::new();
        collect_entries(&self.db.root, false, &mut all);
        filter::apply(all, filter, query)
    }

    // --- Configuration persistence ---

    /// Write a config value onto the reserved config entry, creating the
    /// Meta group and the entry on first use.
    pub fn set_config(&mut self, key: &str, value: &str) -> Result<()> {
        if RESERVED_FIELDS.contains(&key) {
            return Err(StoreError::ReservedConfigKey(key.to_string()));
        }

        let meta = ensure_top_group(&mut self.db.root, META_GROUP_NAME);
        let idx = meta.children.iter().position(
            |node| matches!(node, Node::Entry(e) if e.get_title() == Some(CONFIG_ENTRY_TITLE)),
        );
        let idx = match idx {
            Some(idx) => idx,
            None => {
                let mut entry = KpEntry::new();
                entry.fields.insert(
                    TITLE_FIELD.to_string(),
                    Value::Unprotected(CONFIG_ENTRY_TITLE.to_string()),
                );
                meta.children.push(Node::Entry(entry));
                meta.children.len() - 1
            }
        };
        if let Node::Entry(entry) = &mut meta.children[idx] {
            entry
                .fields
                .insert(key.to_string(), Value::Unprotected(value.to_string()));
        }
        self.save()
    }

    /// Read a config value. `None` when the Meta group, the config entry,
    /// or the key does not exist.
    pub fn get_config(&self, key: &str) -> Option<String> {
        if RESERVED_FIELDS.contains(&key) {
            return None;
        }
        let meta = find_top_group(&self.db.root, META_GROUP_NAME)?;
        meta.children.iter().find_map(|node| match node {
            Node::Entry(e) if e.get_title() == Some(CONFIG_ENTRY_TITLE) => {
                e.get(key).map(str::to_string)
            }
            _ => None,
        })
    }

    /// Read a config value, falling back to `default` when absent.
    pub fn get_config_or(&self, key: &str, default: &str) -> String {
        self.get_config(key)
            .unwrap_or_else(|| default.to_string())
    }
}

/// Convert a kdbx entry into the vault model.
fn convert_entry(ke: &KpEntry) -> Entry {
    Entry {
        id: ke.uuid.to_string(),
        title: ke.get_title().unwrap_or_default().to_string(),
        username: ke.get_username().unwrap_or_default().to_string(),
        password: ke.get_password().unwrap_or_default().to_string(),
        website: ke.get_url().unwrap_or_default().to_string(),
        notes: ke.get(NOTES_FIELD).unwrap_or_default().to_string(),
        is_favorite: ke.tags.iter().any(|t| t == FAVORITE_TAG),
        created: ke.times.get_creation().cloned(),
    }
}

fn find_entry<'a>(group: &'a KpGroup, uuid: &Uuid) -> Option<&'a KpEntry> {
    for node in &group.children {
        match node {
            Node::Entry(e) if e.uuid == *uuid => return Some(e),
            Node::Group(g) => {
                if let Some(entry) = find_entry(g, uuid) {
                    return Some(entry);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walk the tree and report the lifecycle state of an entry, carrying
/// down whether any ancestor is the Recycle Bin.
fn entry_state(group: &KpGroup, uuid: &Uuid, in_bin: bool) -> Option<EntryState> {
    for node in &group.children {
        match node {
            Node::Entry(e) if e.uuid == *uuid => {
                return Some(if in_bin {
                    EntryState::Deleted
                } else {
                    EntryState::Active
                });
            }
            Node::Group(g) => {
                let inside = in_bin || g.name == RECYCLE_BIN_NAME;
                if let Some(state) = entry_state(g, uuid, inside) {
                    return Some(state);
                }
            }
            _ => {}
        }
    }
    None
}

fn collect_entries(group: &KpGroup, in_bin: bool, out: &mut Vec<(Entry, EntryState)>) {
    for node in &group.children {
        match node {
            Node::Entry(e) => {
                let state = if in_bin {
                    EntryState::Deleted
                } else {
                    EntryState::Active
                };
                out.push((convert_entry(e), state));
            }
            Node::Group(g) => {
                collect_entries(g, in_bin || g.name == RECYCLE_BIN_NAME, out);
            }
        }
    }
}

/// Apply a patch to the matching entry anywhere in the tree. Returns
/// whether an entry was found and updated.
fn apply_patch(group: &mut KpGroup, uuid: &Uuid, patch: &EntryPatch) -> bool {
    for node in &mut group.children {
        match node {
            Node::Entry(e) if e.uuid == *uuid => {
                if let Some(website) = &patch.website {
                    e.fields
                        .insert(URL_FIELD.to_string(), Value::Unprotected(website.clone()));
                }
                if let Some(username) = &patch.username {
                    e.fields.insert(
                        USERNAME_FIELD.to_string(),
                        Value::Unprotected(username.clone()),
                    );
                }
                if let Some(password) = &patch.password {
                    e.fields.insert(
                        PASSWORD_FIELD.to_string(),
                        Value::Protected(password.as_bytes().into()),
                    );
                }
                if let Some(notes) = &patch.notes {
                    e.fields
                        .insert(NOTES_FIELD.to_string(), Value::Unprotected(notes.clone()));
                }

                // Title stays in sync with its source fields.
                if patch.website.is_some() || patch.username.is_some() {
                    let title = derive_title(
                        e.get_url().unwrap_or_default(),
                        e.get_username().unwrap_or_default(),
                    );
                    e.fields
                        .insert(TITLE_FIELD.to_string(), Value::Unprotected(title));
                }

                if let Some(favorite) = patch.is_favorite {
                    let tagged = e.tags.iter().any(|t| t == FAVORITE_TAG);
                    if favorite && !tagged {
                        e.tags.push(FAVORITE_TAG.to_string());
                    } else if !favorite && tagged {
                        e.tags.retain(|t| t != FAVORITE_TAG);
                    }
                }
                return true;
            }
            Node::Group(g) => {
                if apply_patch(g, uuid, patch) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

/// Detach the matching entry from wherever it lives in the tree.
fn take_entry(group: &mut KpGroup, uuid: &Uuid) -> Option<KpEntry> {
    let idx = group
        .children
        .iter()
        .position(|node| matches!(node, Node::Entry(e) if e.uuid == *uuid));
    if let Some(idx) = idx {
        match group.children.remove(idx) {
            Node::Entry(e) => return Some(e),
            _ => unreachable!(),
        }
    }
    for node in &mut group.children {
        if let Node::Group(g) = node {
            if let Some(entry) = take_entry(g, uuid) {
                return Some(entry);
            }
        }
    }
    None
}

fn find_top_group<'a>(root: &'a KpGroup, name: &str) -> Option<&'a KpGroup> {
    root.children.iter().find_map(|node| match node {
        Node::Group(g) if g.name == name => Some(g),
        _ => None,
    })
}

/// Find or create a group directly under the root.
fn ensure_top_group<'a>(root: &'a mut KpGroup, name: &str) -> &'a mut KpGroup {
    let idx = root
        .children
        .iter()
        .position(|node| matches!(node, Node::Group(g) if g.name == name));
    let idx = match idx {
        Some(idx) => idx,
        None => {
            root.children.push(Node::Group(KpGroup::new(name)));
            root.children.len() - 1
        }
    };
    match &mut root.children[idx] {
        Node::Group(g) => g,
        _ => unreachable!(),
    }
}
