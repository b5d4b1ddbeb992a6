//! Property-based tests for the snippet contract.
//!
//! Uses proptest to verify invariants across random inputs:
//! - Re-adding tags is a no-op
//! - Adding and then removing the same tags restores the original list
//! - Toggling the favourite flag twice is the identity
//! - Search terms match literally, wildcards included
//! - Title and language form a unique key

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use snipster::storage::{InMemoryBackend, SqliteBackend, merge_tags, parse_tags};
use snipster::{Error, Language, NewSnippet, SnippetRepository};

fn language() -> impl Strategy<Value = Language> {
    prop::sample::select(Language::ALL.to_vec())
}

fn tag_list() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z][a-z0-9-]{0,8}", 0..6)
}

fn as_refs(tags: &[String]) -> Vec<&str> {
    tags.iter().map(String::as_str).collect()
}

// ============================================================================
// Tag merging
// ============================================================================

proptest! {
    /// Property: merging the same tags a second time changes nothing.
    #[test]
    fn prop_tag_add_is_idempotent(
        stored in tag_list(),
        added in tag_list(),
        sort in any::<bool>(),
    ) {
        let stored = merge_tags(None, &as_refs(&stored), false, sort);
        let once = merge_tags(stored.as_deref(), &as_refs(&added), false, sort);
        let twice = merge_tags(once.as_deref(), &as_refs(&added), false, sort);
        prop_assert_eq!(once, twice);
    }

    /// Property: adding tags that are not yet present and then removing them
    /// restores the original tag string, including "no tags".
    #[test]
    fn prop_tag_add_then_remove_restores(
        stored in tag_list(),
        added in tag_list(),
    ) {
        let original = merge_tags(None, &as_refs(&stored), false, true);
        let fresh: Vec<&str> = added
            .iter()
            .map(String::as_str)
            .filter(|t| !stored.iter().any(|s| s == t))
            .collect();

        let merged = merge_tags(original.as_deref(), &fresh, false, true);
        let restored = merge_tags(merged.as_deref(), &fresh, true, true);
        prop_assert_eq!(restored, original);
    }

    /// Property: the merged list never holds duplicates or blank tags.
    #[test]
    fn prop_merged_tags_are_unique(
        added in prop::collection::vec("[a-c ]{0,3}", 0..10),
        sort in any::<bool>(),
    ) {
        let merged = merge_tags(None, &as_refs(&added), false, sort);
        let tags = parse_tags(merged.as_deref());

        let mut deduped = tags.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), tags.len());
        prop_assert!(tags.iter().all(|t| !t.is_empty() && t.trim() == t));
        if merged.is_some() {
            prop_assert!(!tags.is_empty());
        }
    }
}

// ============================================================================
// Repository invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: toggling the favourite flag twice leaves it unchanged.
    #[test]
    fn prop_favourite_toggle_twice_is_identity(
        title in "[A-Za-z]{3,20}",
        lang in language(),
        start in any::<bool>(),
    ) {
        let repo = InMemoryBackend::new();
        let snippet = repo.add(NewSnippet::new(title, "pass", lang).unwrap()).unwrap();
        if start {
            repo.toggle_favourite(snippet.id).unwrap();
        }

        let first = repo.toggle_favourite(snippet.id).unwrap();
        let second = repo.toggle_favourite(snippet.id).unwrap();
        prop_assert_eq!(first, !start);
        prop_assert_eq!(second, start);
        prop_assert_eq!(repo.get(snippet.id).unwrap().unwrap().favorite, start);
    }

    /// Property: a term made of wildcard characters only matches snippets
    /// that contain it literally, in `SQLite` and in memory alike.
    #[test]
    fn prop_wildcards_match_literally(
        needle in "[%_\\\\]{1,3}",
        filler in "[a-z]{1,4}[a-z ]{2,8}",
    ) {
        let sql = SqliteBackend::in_memory().unwrap();
        let memory = InMemoryBackend::new();
        let repos: [&dyn SnippetRepository; 2] = [&sql, &memory];

        for repo in repos {
            repo.add(NewSnippet::new("Plain", filler.clone(), Language::Python).unwrap())
                .unwrap();
            let holder = repo
                .add(
                    NewSnippet::new("Holder", format!("{filler}{needle}"), Language::Python)
                        .unwrap(),
                )
                .unwrap();

            let hits = repo.search(&needle, None).unwrap();
            prop_assert_eq!(hits.len(), 1);
            prop_assert_eq!(hits[0].id, holder.id);
        }
    }

    /// Property: a second snippet with the same title and language is always
    /// rejected, while any other language is accepted.
    #[test]
    fn prop_title_and_language_are_unique(
        title in "[A-Za-z ]{3,20}",
        lang in language(),
        other in language(),
    ) {
        prop_assume!(title.trim().chars().count() >= 3);
        let repo = InMemoryBackend::new();
        repo.add(NewSnippet::new(title.clone(), "pass", lang).unwrap()).unwrap();

        let again = repo.add(NewSnippet::new(title.clone(), "other", lang).unwrap());
        let is_duplicate = matches!(again, Err(Error::Duplicate { .. }));
        prop_assert!(is_duplicate);

        let different = repo.add(NewSnippet::new(title, "pass", other).unwrap());
        prop_assert_eq!(different.is_ok(), other != lang);
        prop_assert_eq!(repo.count().unwrap(), if other == lang { 1 } else { 2 });
    }
}
