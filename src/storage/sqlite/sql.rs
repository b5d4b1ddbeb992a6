//! SQL helper functions for the `SQLite` backend.

/// Escapes SQL LIKE wildcards in a string to make them literal.
///
/// `%` and `_` are LIKE wildcards and `\` is the escape character used in
/// `LIKE ... ESCAPE '\'`, so all three are prefixed with a backslash.
///
/// # Examples
///
/// ```
/// use snipster::storage::sqlite::escape_like_wildcards;
///
/// assert_eq!(escape_like_wildcards("100%"), "100\\%");
/// assert_eq!(escape_like_wildcards("user_name"), "user\\_name");
/// assert_eq!(escape_like_wildcards("path\\file"), "path\\\\file");
/// ```
#[must_use]
pub fn escape_like_wildcards(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            },
            _ => result.push(c),
        }
    }
    result
}

/// Builds a `%term%` substring pattern with the term's wildcards escaped.
#[must_use]
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like_wildcards(term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_plain() {
        assert_eq!(escape_like_wildcards("hello"), "hello");
        assert_eq!(escape_like_wildcards(""), "");
    }

    #[test]
    fn test_escape_mixed() {
        assert_eq!(escape_like_wildcards("%_\\"), "\\%\\_\\\\");
    }

    #[test]
    fn test_contains_pattern() {
        assert_eq!(contains_pattern("50%"), "%50\\%%");
    }
}
