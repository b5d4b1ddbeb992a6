//! Binary entry point for snipster.
//!
//! This binary provides the CLI and the HTTP server for the snippet manager.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use snipster::cli::{AddArgs, GistCommand, SnippetCommands, render, show_config};
use snipster::observability::{self, InitOptions};
use snipster::{
    BackendType, Error, GistService, GitHubGistClient, Result, SnipsterConfig, Storage,
    StorageFactory,
};

/// Snipster - a code snippet manager with GitHub gist mirroring.
#[derive(Parser)]
#[command(name = "snipster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Storage backend: sql, memory, or json.
    #[arg(short, long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Add a snippet.
    Add {
        /// Snippet title (at least three characters).
        #[arg(short, long)]
        title: String,

        /// Code body, or `-` to read it from stdin.
        #[arg(long)]
        code: String,

        /// Optional description.
        #[arg(short, long)]
        description: Option<String>,

        /// Language: Python, JavaScript, or TypeScript.
        #[arg(short, long, default_value = "python")]
        language: String,

        /// Comma separated tags.
        #[arg(long)]
        tags: Option<String>,
    },

    /// List snippets.
    List,

    /// Show a snippet.
    Get {
        /// Snippet id.
        id: i64,
    },

    /// Delete a snippet.
    Delete {
        /// Snippet id.
        id: i64,
    },

    /// Search title, code and description.
    Search {
        /// Substring to look for (case-insensitive).
        term: String,

        /// Restrict to one language.
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Toggle the favourite flag of a snippet.
    #[command(alias = "toggle-favourite")]
    Favourite {
        /// Snippet id.
        id: i64,
    },

    /// Add or remove comma separated tags.
    Tags {
        /// Snippet id.
        id: i64,

        /// Tags, e.g. "loops, python".
        tags: String,

        /// Remove the tags instead of adding them.
        #[arg(long)]
        remove: bool,

        /// Keep insertion order instead of sorting.
        #[arg(long)]
        no_sort: bool,
    },

    /// Manage GitHub gists.
    Gist {
        #[command(subcommand)]
        action: GistAction,
    },

    /// Run the HTTP API.
    Serve {
        /// Bind address.
        #[arg(long)]
        host: Option<String>,

        /// Bind port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage configuration.
    Config {
        /// Show current configuration.
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Gist subcommands.
#[derive(Subcommand)]
enum GistAction {
    /// Publish a snippet as a gist.
    Create {
        /// Snippet id.
        snippet_id: i64,

        /// Create a secret gist.
        #[arg(long)]
        private: bool,
    },

    /// Show the gist of a snippet, verifying it on GitHub.
    Get {
        /// Snippet id.
        snippet_id: i64,
    },

    /// List gists, verifying each on GitHub.
    List,

    /// Delete the gist of a snippet.
    Delete {
        /// Snippet id.
        snippet_id: i64,
    },
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "snipster", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", render::error_line(format!("Failed to load configuration: {e}")));
            return ExitCode::FAILURE;
        },
    };

    let serving = matches!(cli.command, Commands::Serve { .. });
    let _observability = match observability::init(
        &config.logging,
        &config.metrics,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: serving,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("{}", render::error_line(format!("Failed to initialize logging: {e}")));
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("{}", render::error_line(&e));
            ExitCode::FAILURE
        },
    }
}

/// Loads configuration and applies the global `--backend` flag.
fn load_config(cli: &Cli) -> Result<SnipsterConfig> {
    let config = SnipsterConfig::load(cli.config.as_deref())?;
    match cli.backend.as_deref() {
        Some(name) => Ok(config.with_backend(name.parse::<BackendType>()?)),
        None => Ok(config),
    }
}

/// Runs the selected command.
fn run_command(command: Commands, config: SnipsterConfig) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Add {
            title,
            code,
            description,
            language,
            tags,
        } => {
            let storage = StorageFactory::create(&config)?;
            let code = if code == "-" { read_stdin()? } else { code };
            SnippetCommands::new(storage.snippets.as_ref(), &mut out).add(AddArgs {
                title,
                code,
                description,
                language,
                tags,
            })
        },
        Commands::List => snippets(&config, &mut out, |c| c.list()),
        Commands::Get { id } => snippets(&config, &mut out, |c| c.get(id)),
        Commands::Delete { id } => snippets(&config, &mut out, |c| c.delete(id)),
        Commands::Search { term, language } => {
            snippets(&config, &mut out, |c| c.search(&term, language.as_deref()))
        },
        Commands::Favourite { id } => snippets(&config, &mut out, |c| c.favourite(id)),
        Commands::Tags {
            id,
            tags,
            remove,
            no_sort,
        } => snippets(&config, &mut out, |c| c.tags(id, &tags, remove, !no_sort)),
        Commands::Gist { action } => cmd_gist(&config, action, &mut out),
        Commands::Serve { host, port } => {
            drop(out);
            cmd_serve(config, host, port)
        },
        Commands::Config { show } => {
            if show {
                show_config(&config, &mut out)
            } else {
                writeln!(out, "Use --show to display the current configuration.")
                    .map_err(|e| Error::operation("write_output", e))
            }
        },
        Commands::Completions { .. } => Ok(()),
    }
}

fn snippets<F>(config: &SnipsterConfig, out: &mut dyn Write, f: F) -> Result<()>
where
    F: FnOnce(&mut SnippetCommands<'_>) -> Result<()>,
{
    let storage = StorageFactory::create(config)?;
    f(&mut SnippetCommands::new(storage.snippets.as_ref(), out))
}

fn gist_service(config: &SnipsterConfig, storage: &Storage) -> GistService {
    GistService::new(storage, Arc::new(GitHubGistClient::from_config(&config.gist)))
}

fn cmd_gist(config: &SnipsterConfig, action: GistAction, out: &mut dyn Write) -> Result<()> {
    let storage = StorageFactory::create(config)?;
    let service = gist_service(config, &storage);
    let mut command = GistCommand::new(&service, out);

    match action {
        GistAction::Create {
            snippet_id,
            private,
        } => command.create(snippet_id, !private),
        GistAction::Get { snippet_id } => command.get(snippet_id),
        GistAction::List => command.list(),
        GistAction::Delete { snippet_id } => command.delete(snippet_id),
    }
}

#[cfg(feature = "http")]
fn cmd_serve(mut config: SnipsterConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    use snipster::http::{AppState, serve};

    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let storage = StorageFactory::create(&config)?;
    let state = AppState::new(
        Arc::clone(&storage.snippets),
        gist_service(&config, &storage),
    );
    serve(&config.server, state)
}

#[cfg(not(feature = "http"))]
fn cmd_serve(_config: SnipsterConfig, _host: Option<String>, _port: Option<u16>) -> Result<()> {
    Err(Error::operation("serve", "snipster was built without the `http` feature"))
}

fn read_stdin() -> Result<String> {
    let mut code = String::new();
    io::stdin()
        .read_to_string(&mut code)
        .map_err(|e| Error::operation("read_stdin", e))?;
    Ok(code)
}
