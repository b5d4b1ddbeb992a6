//! Snippet commands.

use super::{emit, render};
use crate::models::{Language, NewSnippet, SnippetId};
use crate::storage::{SnippetRepository, split_tag_input};
use crate::{Error, Result};
use std::io::Write;

/// Arguments of `snipster add`.
#[derive(Debug, Clone)]
pub struct AddArgs {
    /// Title, at least three characters.
    pub title: String,
    /// Code body.
    pub code: String,
    /// Optional description.
    pub description: Option<String>,
    /// Language name or alias.
    pub language: String,
    /// Comma separated tags.
    pub tags: Option<String>,
}

/// Snippet commands bound to a repository and an output stream.
pub struct SnippetCommands<'a> {
    repo: &'a dyn SnippetRepository,
    out: &'a mut dyn Write,
}

impl<'a> SnippetCommands<'a> {
    /// Creates the command set.
    pub fn new(repo: &'a dyn SnippetRepository, out: &'a mut dyn Write) -> Self {
        Self { repo, out }
    }

    /// Adds a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown language or invalid
    /// fields and [`Error::Duplicate`] if the title exists for the language.
    pub fn add(&mut self, args: AddArgs) -> Result<()> {
        let language = parse_language(&args.language)?;
        let mut snippet = NewSnippet::new(args.title, args.code, language)?;
        if let Some(description) = args.description {
            snippet = snippet.with_description(description);
        }
        if let Some(tags) = args.tags {
            snippet = snippet.with_tags(split_tag_input(&tags).join(crate::storage::TAG_SEPARATOR));
        }

        let created = self.repo.add(snippet)?;
        emit(
            self.out,
            render::success(format!("Snippet '{}' added with id {}", created.title, created.id)),
        )
    }

    /// Lists every snippet.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the snippets cannot be read.
    pub fn list(&mut self) -> Result<()> {
        let snippets = self.repo.list()?;
        if snippets.is_empty() {
            return emit(self.out, render::notice("No snippets found"));
        }
        emit(self.out, render::snippet_table(&snippets))
    }

    /// Shows one snippet, including its full code.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub fn get(&mut self, id: i64) -> Result<()> {
        let snippet = self
            .repo
            .get(SnippetId::new(id))?
            .ok_or(Error::NotFound { entity: "snippet", id })?;

        emit(self.out, render::snippet_table(std::slice::from_ref(&snippet)))?;
        emit(self.out, "")?;
        emit(self.out, &snippet.code)
    }

    /// Deletes a snippet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub fn delete(&mut self, id: i64) -> Result<()> {
        self.repo.delete(SnippetId::new(id))?;
        emit(self.out, render::success(format!("Snippet '{id}' deleted")))
    }

    /// Searches snippets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown language filter.
    pub fn search(&mut self, term: &str, language: Option<&str>) -> Result<()> {
        let language = language.map(parse_language).transpose()?;
        let matches = self.repo.search(term, language)?;

        if matches.is_empty() {
            let message = match language {
                Some(language) => {
                    format!("No matches found for term '{term}' and language '{language}'")
                },
                None => format!("No matches found for term '{term}'"),
            };
            return emit(self.out, render::notice(message));
        }
        emit(self.out, render::snippet_table(&matches))
    }

    /// Toggles the favourite flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub fn favourite(&mut self, id: i64) -> Result<()> {
        let favorite = self.repo.toggle_favourite(SnippetId::new(id))?;
        let action = if favorite { "favourited" } else { "unfavourited" };
        emit(self.out, render::success(format!("Snippet '{id}' {action}")))
    }

    /// Adds or removes comma separated tags.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is unknown.
    pub fn tags(&mut self, id: i64, input: &str, remove: bool, sort: bool) -> Result<()> {
        let tags = split_tag_input(input);
        let refs: Vec<&str> = tags.iter().map(String::as_str).collect();
        let updated = self.repo.tags(SnippetId::new(id), &refs, remove, sort)?;

        let action = if remove { "removed from" } else { "added to" };
        emit(
            self.out,
            render::success(format!(
                "Tags {action} snippet '{id}': {}",
                updated.tags.as_deref().unwrap_or("-")
            )),
        )
    }
}

fn parse_language(name: &str) -> Result<Language> {
    Language::parse(name).ok_or_else(|| {
        let valid: Vec<&str> = Language::ALL.iter().map(Language::as_str).collect();
        Error::InvalidInput(format!(
            "unsupported language '{name}' (valid: {})",
            valid.join(", ")
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;

    fn add_args(title: &str, language: &str) -> AddArgs {
        AddArgs {
            title: title.to_string(),
            code: "print('hi')".to_string(),
            description: None,
            language: language.to_string(),
            tags: Some("b, a,,".to_string()),
        }
    }

    fn run<F>(repo: &InMemoryBackend, f: F) -> (Result<()>, String)
    where
        F: FnOnce(&mut SnippetCommands<'_>) -> Result<()>,
    {
        let mut buf = Vec::new();
        let result = f(&mut SnippetCommands::new(repo, &mut buf));
        (result, String::from_utf8(buf).unwrap())
    }

    #[test]
    fn test_add_normalizes_tags() {
        let repo = InMemoryBackend::new();
        let (result, out) = run(&repo, |c| c.add(add_args("Hello", "py")));

        result.unwrap();
        assert!(out.contains("Snippet 'Hello' added with id 1"));
        let stored = repo.get(SnippetId::new(1)).unwrap().unwrap();
        assert_eq!(stored.tags.as_deref(), Some("b, a"));
        assert_eq!(stored.language, Language::Python);
    }

    #[test]
    fn test_add_rejects_unknown_language() {
        let repo = InMemoryBackend::new();
        let (result, _) = run(&repo, |c| c.add(add_args("Hello", "cobol")));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("valid: Python, JavaScript, TypeScript"));
    }

    #[test]
    fn test_get_missing_is_error() {
        let repo = InMemoryBackend::new();
        let (result, out) = run(&repo, |c| c.get(3));
        assert!(matches!(result, Err(Error::NotFound { id: 3, .. })));
        assert!(out.is_empty());
    }

    #[test]
    fn test_search_without_matches_is_not_an_error() {
        let repo = InMemoryBackend::new();
        let (result, out) = run(&repo, |c| c.search("nothing", Some("js")));
        result.unwrap();
        assert!(out.contains("No matches found for term 'nothing' and language 'JavaScript'"));
    }

    #[test]
    fn test_favourite_and_tags() {
        let repo = InMemoryBackend::new();
        run(&repo, |c| c.add(add_args("Hello", "python"))).0.unwrap();

        let (_, out) = run(&repo, |c| c.favourite(1));
        assert!(out.contains("favourited"));

        let (_, out) = run(&repo, |c| c.tags(1, "c, a", false, true));
        assert!(out.contains("a, b, c"));

        let (_, out) = run(&repo, |c| c.tags(1, "b", true, true));
        assert!(out.contains("a, c"));
    }

    #[test]
    fn test_delete_twice() {
        let repo = InMemoryBackend::new();
        run(&repo, |c| c.add(add_args("Hello", "python"))).0.unwrap();
        run(&repo, |c| c.delete(1)).0.unwrap();
        let (result, _) = run(&repo, |c| c.delete(1));
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }
}
