//! CLI command implementations.
//!
//! The binary parses arguments with `clap` and dispatches here. Every command
//! writes its normal output to the supplied writer and returns an error for
//! the binary to print as a `✗` line.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `add` | Add a snippet |
//! | `list` | List all snippets |
//! | `get` | Show one snippet |
//! | `delete` | Delete a snippet |
//! | `search` | Search title, code and description |
//! | `favourite` | Toggle the favourite flag |
//! | `tags` | Add or remove tags |
//! | `gist` | Publish, inspect, list and delete gists |
//! | `config` | Show the effective configuration |
//!
//! # Example Usage
//!
//! ```bash
//! snipster add --title "Loop" --code "for i in range(3): print(i)" --tags basics
//! snipster search range --language python
//! snipster tags 1 "loops, python"
//! snipster gist create 1 --private
//! ```

mod config;
mod gists;
pub mod render;
mod snippets;

pub use config::show_config;
pub use gists::GistCommand;
pub use snippets::{AddArgs, SnippetCommands};

use crate::{Error, Result};
use std::io::Write;

/// Writes one line of command output.
fn emit(out: &mut dyn Write, line: impl AsRef<str>) -> Result<()> {
    writeln!(out, "{}", line.as_ref()).map_err(|e| Error::operation("write_output", e))
}
