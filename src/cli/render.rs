//! Terminal rendering for CLI output.
//!
//! Styles are applied through `console`, which drops them when the stream is
//! not a terminal, so the rendered strings are plain text under tests and
//! pipes.

use crate::models::{Gist, GistStatus, Snippet};
use console::{Alignment, Style, measure_text_width, pad_str, truncate_str};
use std::fmt::Display;

const CODE_WIDTH: usize = 40;
const TITLE_WIDTH: usize = 30;

/// A `✓` line for completed commands.
pub fn success(message: impl Display) -> String {
    format!(
        "{} {}",
        Style::new().green().bold().apply_to("✓"),
        Style::new().green().apply_to(message)
    )
}

/// A `✗` line for failed commands, written to stderr by the binary.
pub fn error_line(message: impl Display) -> String {
    format!(
        "{} {}",
        Style::new().red().bold().apply_to("✗"),
        Style::new().red().bold().apply_to(message)
    )
}

/// A yellow informational line.
pub fn notice(message: impl Display) -> String {
    Style::new().yellow().apply_to(message).to_string()
}

/// Renders snippets as an aligned table.
pub fn snippet_table(snippets: &[Snippet]) -> String {
    let header = [
        "ID",
        "Title",
        "Code",
        "Description",
        "Language",
        "Tags",
        "Fav",
        "Created",
    ];
    let rows: Vec<Vec<String>> = snippets
        .iter()
        .map(|s| {
            vec![
                s.id.to_string(),
                truncate_str(&s.title, TITLE_WIDTH, "…").into_owned(),
                truncate_str(&one_line(&s.code), CODE_WIDTH, "…").into_owned(),
                s.description.clone().unwrap_or_else(|| "-".to_string()),
                s.language.to_string(),
                s.tags.clone().unwrap_or_else(|| "-".to_string()),
                if s.favorite { "★" } else { "" }.to_string(),
                s.created_at.format("%Y-%m-%d").to_string(),
            ]
        })
        .collect();

    let styles = [
        Style::new().cyan(),
        Style::new().magenta(),
        Style::new().magenta(),
        Style::new().dim(),
        Style::new().blue(),
        Style::new().yellow(),
        Style::new().red(),
        Style::new().green(),
    ];
    table(&header, &rows, &styles)
}

/// Renders gist records as an aligned table.
pub fn gist_table(gists: &[Gist]) -> String {
    let header = ["Snippet", "Gist", "URL", "Public", "Status", "Verified"];
    let rows: Vec<Vec<String>> = gists
        .iter()
        .map(|g| {
            vec![
                g.snippet_id.to_string(),
                g.gist_id.clone(),
                g.gist_url.clone(),
                if g.is_public { "yes" } else { "no" }.to_string(),
                g.status.to_string(),
                g.verified_at
                    .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string()),
            ]
        })
        .collect();

    let styles = [
        Style::new().cyan(),
        Style::new().magenta(),
        Style::new().underlined(),
        Style::new(),
        Style::new().blue(),
        Style::new().green(),
    ];
    table(&header, &rows, &styles)
}

/// Renders a single gist as `key: value` lines.
pub fn gist_details(gist: &Gist) -> String {
    let status = match gist.status {
        GistStatus::Active => Style::new().green(),
        GistStatus::DeletedOnRemote => Style::new().red(),
        GistStatus::Unknown => Style::new().yellow(),
    };
    let key = Style::new().bold();
    [
        format!("{} {}", key.apply_to("Snippet:"), gist.snippet_id),
        format!("{} {}", key.apply_to("Gist:"), gist.gist_id),
        format!("{} {}", key.apply_to("URL:"), gist.gist_url),
        format!("{} {}", key.apply_to("Public:"), gist.is_public),
        format!("{} {}", key.apply_to("Status:"), status.apply_to(gist.status)),
        format!(
            "{} {}",
            key.apply_to("Verified:"),
            gist.verified_at
                .map_or_else(|| "-".to_string(), |t| t.to_rfc3339())
        ),
    ]
    .join("\n")
}

fn one_line(code: &str) -> String {
    code.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn table<const N: usize>(header: &[&str; N], rows: &[Vec<String>], styles: &[Style; N]) -> String {
    let mut widths: Vec<usize> = header.iter().map(|h| measure_text_width(h)).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(measure_text_width(cell));
        }
    }

    let bold = Style::new().bold();
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(
        header
            .iter()
            .zip(&widths)
            .map(|(h, w)| bold.apply_to(pad_str(h, *w, Alignment::Left, None)).to_string())
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string(),
    );
    lines.push(
        widths
            .iter()
            .map(|w| "─".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    for row in rows {
        lines.push(
            row.iter()
                .zip(&widths)
                .zip(styles)
                .map(|((cell, w), style)| {
                    style
                        .apply_to(pad_str(cell, *w, Alignment::Left, None))
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string(),
        );
    }
    lines.join("\n")
}
