//! Tag list merging shared by all backends.
//!
//! Tags are stored as a single string joined with [`TAG_SEPARATOR`]. An empty
//! list is stored as "no tags" (`None`), so adding and then removing the same
//! tags restores an untagged snippet exactly.

/// Separator between stored tags.
pub const TAG_SEPARATOR: &str = ", ";

/// Splits a stored tag string into its non-empty tokens, in stored order.
#[must_use]
pub fn parse_tags(stored: Option<&str>) -> Vec<String> {
    stored
        .unwrap_or_default()
        .split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Merges `tags` into (or removes them from) a stored tag string.
///
/// - `remove == false`: each trimmed, non-empty tag is appended unless already
///   present, so re-adding is a no-op.
/// - `remove == true`: the first occurrence of each tag is removed; missing tags
///   are ignored.
/// - `sort == true`: the result is sorted lexicographically, otherwise merge
///   order is kept.
///
/// Returns `None` when the resulting list is empty.
///
/// # Examples
///
/// ```
/// use snipster::storage::merge_tags;
///
/// let merged = merge_tags(None, &["python", "basics"], false, true);
/// assert_eq!(merged.as_deref(), Some("basics, python"));
///
/// let merged = merge_tags(merged.as_deref(), &["python"], true, true);
/// assert_eq!(merged.as_deref(), Some("basics"));
/// ```
#[must_use]
pub fn merge_tags(stored: Option<&str>, tags: &[&str], remove: bool, sort: bool) -> Option<String> {
    let mut current = parse_tags(stored);

    for tag in tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        let position = current.iter().position(|t| t == tag);
        match (remove, position) {
            (false, None) => current.push(tag.to_string()),
            (true, Some(idx)) => {
                current.remove(idx);
            },
            _ => {},
        }
    }

    if sort {
        current.sort();
    }

    if current.is_empty() {
        None
    } else {
        Some(current.join(TAG_SEPARATOR))
    }
}

/// Splits comma separated user input (`"a,b, c"`) into tags.
#[must_use]
pub fn split_tag_input(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags_empty() {
        assert!(parse_tags(None).is_empty());
        assert!(parse_tags(Some("")).is_empty());
    }

    #[test]
    fn test_parse_tags_keeps_order() {
        assert_eq!(parse_tags(Some("zeta, alpha")), vec!["zeta", "alpha"]);
    }

    #[test]
    fn test_merge_appends_new_tags_in_order() {
        let merged = merge_tags(Some("zeta"), &["beta", "alpha"], false, false);
        assert_eq!(merged.as_deref(), Some("zeta, beta, alpha"));
    }

    #[test]
    fn test_merge_sorts() {
        let merged = merge_tags(Some("zeta"), &["beta", "alpha"], false, true);
        assert_eq!(merged.as_deref(), Some("alpha, beta, zeta"));
    }

    #[test]
    fn test_merge_deduplicates() {
        let merged = merge_tags(Some("a, b"), &["b", " a ", "c", "c"], false, false);
        assert_eq!(merged.as_deref(), Some("a, b, c"));
    }

    #[test]
    fn test_remove_missing_tag_is_noop() {
        let merged = merge_tags(Some("a, b"), &["x"], true, false);
        assert_eq!(merged.as_deref(), Some("a, b"));
    }

    #[test]
    fn test_remove_last_tag_clears() {
        assert_eq!(merge_tags(Some("a"), &["a"], true, true), None);
    }

    #[test]
    fn test_blank_tags_ignored() {
        assert_eq!(merge_tags(None, &["", "  "], false, true), None);
    }

    #[test]
    fn test_split_tag_input() {
        assert_eq!(split_tag_input("a,b, c ,,"), vec!["a", "b", "c"]);
    }
}
