//! Pure search and filter semantics over a set of entries.
//!
//! No mutation, no persistence: [`apply`] is a total function of the
//! entry set, the filter, and an optional query. The store gathers
//! `(Entry, EntryState)` pairs from the tree and hands them here.

use std::str::FromStr;

use crate::models::{Entry, EntryState, CONFIG_ENTRY_TITLE};

/// Which slice of the vault a listing shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryFilter {
    /// Every active entry.
    #[default]
    All,
    /// Active entries carrying the favorite tag.
    Favorites,
    /// Entries inside the Recycle Bin.
    Deleted,
}

impl FromStr for EntryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "favorites" => Ok(Self::Favorites),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!(
                "unknown filter {other:?} (expected all, favorites, or deleted)"
            )),
        }
    }
}

/// Filter, query, and order a set of entries.
///
/// The config entry is excluded for every filter/query combination. The
/// query is a case-insensitive substring match against website OR
/// username. Results are ordered ascending, case-insensitively, by
/// website when non-empty, else username.
pub fn apply(
    entries: Vec<(Entry, EntryState)>,
    filter: EntryFilter,
    query: Option<&str>,
) -> Vec<Entry> {
    let needle = query.map(str::to_lowercase);

    let mut result: Vec<Entry> = entries
        .into_iter()
        .filter(|(entry, state)| {
            if entry.title == CONFIG_ENTRY_TITLE {
                return false;
            }
            match filter {
                EntryFilter::All => *state == EntryState::Active,
                EntryFilter::Favorites => *state == EntryState::Active && entry.is_favorite,
                EntryFilter::Deleted => *state == EntryState::Deleted,
            }
        })
        .map(|(entry, _)| entry)
        .collect();

    if let Some(needle) = &needle {
        result.retain(|entry| {
            entry.website.to_lowercase().contains(needle)
                || entry.username.to_lowercase().contains(needle)
        });
    }

    result.sort_by_cached_key(sort_key);
    result
}

fn sort_key(entry: &Entry) -> String {
    if entry.website.is_empty() {
        entry.username.to_lowercase()
    } else {
        entry.website.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(username: &str, website: &str, favorite: bool) -> Entry {
        Entry {
            id: format!("{username}@{website}"),
            title: crate::models::derive_title(website, username),
            username: username.to_string(),
            website: website.to_string(),
            is_favorite: favorite,
            ..Entry::default()
        }
    }

    fn active(e: Entry) -> (Entry, EntryState) {
        (e, EntryState::Active)
    }

    fn deleted(e: Entry) -> (Entry, EntryState) {
        (e, EntryState::Deleted)
    }

    #[test]
    fn empty_set_is_total() {
        assert!(apply(Vec::new(), EntryFilter::All, Some("query")).is_empty());
        assert!(apply(Vec::new(), EntryFilter::Deleted, None).is_empty());
    }

    #[test]
    fn all_excludes_deleted() {
        let entries = vec![
            active(entry("alice", "a.example", false)),
            deleted(entry("bob", "b.example", false)),
        ];
        let shown = apply(entries, EntryFilter::All, None);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].username, "alice");
    }

    #[test]
    fn deleted_excludes_active() {
        let entries = vec![
            active(entry("alice", "a.example", false)),
            deleted(entry("bob", "b.example", false)),
        ];
        let shown = apply(entries, EntryFilter::Deleted, None);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].username, "bob");
    }

    #[test]
    fn favorites_requires_tag_and_active_state() {
        let entries = vec![
            active(entry("alice", "a.example", true)),
            active(entry("bob", "b.example", false)),
            deleted(entry("carol", "c.example", true)),
        ];
        let shown = apply(entries, EntryFilter::Favorites, None);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].username, "alice");
    }

    #[test]
    fn query_matches_website_or_username_case_insensitively() {
        let entries = vec![
            active(entry("Alice", "GitHub.com", false)),
            active(entry("bob", "gitlab.com", false)),
            active(entry("carol", "example.org", false)),
        ];
        let shown = apply(entries, EntryFilter::All, Some("GIT"));
        assert_eq!(shown.len(), 2);

        let entries = vec![
            active(entry("Alice", "", false)),
            active(entry("bob", "example.org", false)),
        ];
        let shown = apply(entries, EntryFilter::All, Some("ali"));
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].username, "Alice");
    }

    #[test]
    fn query_applies_on_top_of_filter() {
        let entries = vec![
            deleted(entry("alice", "github.com", false)),
            deleted(entry("bob", "example.org", false)),
        ];
        let shown = apply(entries, EntryFilter::Deleted, Some("github"));
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].username, "alice");
    }

    #[test]
    fn ordering_is_website_else_username_case_insensitive() {
        let entries = vec![
            active(entry("zeta", "", false)),
            active(entry("whoever", "Beta.example", false)),
            active(entry("Alpha", "", false)),
        ];
        let shown = apply(entries, EntryFilter::All, None);
        let keys: Vec<&str> = shown.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "Beta.example", "zeta"]);
    }

    #[test]
    fn config_entry_is_always_excluded() {
        let mut config = entry("", "", false);
        config.title = CONFIG_ENTRY_TITLE.to_string();
        let entries = vec![active(config.clone()), deleted(config)];
        assert!(apply(entries.clone(), EntryFilter::All, None).is_empty());
        assert!(apply(entries.clone(), EntryFilter::Deleted, None).is_empty());
        assert!(apply(entries, EntryFilter::Favorites, None).is_empty());
    }

    #[test]
    fn filter_parses_from_str() {
        assert_eq!("all".parse::<EntryFilter>().unwrap(), EntryFilter::All);
        assert_eq!(
            "favorites".parse::<EntryFilter>().unwrap(),
            EntryFilter::Favorites
        );
        assert_eq!(
            "deleted".parse::<EntryFilter>().unwrap(),
            EntryFilter::Deleted
        );
        assert!("trash".parse::<EntryFilter>().is_err());
    }
}
