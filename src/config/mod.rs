//! Configuration management.
//!
//! Settings are layered: built-in defaults, then an optional TOML file, then
//! `SNIPSTER_*` environment variables, then command-line flags (applied by the
//! caller).
//!
//! ```toml
//! backend = "sql"
//! data_dir = "/var/lib/snipster"
//!
//! [gist]
//! api_url = "https://api.github.com/gists"
//! timeout_ms = 30000
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [server]
//! port = 8000
//! ```

use crate::gist::GistHttpConfig;
use crate::storage::BackendType;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration.
#[derive(Debug, Clone)]
pub struct SnipsterConfig {
    /// Directory holding the database and JSON lines logs.
    pub data_dir: PathBuf,
    /// Storage backend.
    pub backend: BackendType,
    /// Explicit `SQLite` file, overriding `data_dir/snippets.db`.
    pub database_path: Option<PathBuf>,
    /// Explicit log directory, overriding `data_dir/jsonl`.
    pub json_dir: Option<PathBuf>,
    /// Gist API settings.
    pub gist: GistConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Prometheus exporter settings.
    pub metrics: MetricsConfig,
    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Gist API settings.
#[derive(Debug, Clone)]
pub struct GistConfig {
    /// Gists collection URL.
    pub api_url: String,
    /// Access token, required for create and delete.
    pub token: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for GistConfig {
    fn default() -> Self {
        let http = GistHttpConfig::default();
        Self {
            api_url: crate::gist::GitHubGistClient::DEFAULT_API_URL.to_string(),
            token: None,
            timeout_ms: http.timeout_ms,
            connect_timeout_ms: http.connect_timeout_ms,
        }
    }
}

impl GistConfig {
    /// Returns the HTTP timeouts as a client config.
    #[must_use]
    pub const fn http(&self) -> GistHttpConfig {
        GistHttpConfig {
            timeout_ms: self.timeout_ms,
            connect_timeout_ms: self.connect_timeout_ms,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format name. Anything but `json` is pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `snipster=debug`. `RUST_LOG` wins.
    pub level: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Append logs to this file instead of stderr.
    pub file: Option<PathBuf>,
}

/// Prometheus exporter settings.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Whether the exporter is installed.
    pub enabled: bool,
    /// Listener port for `serve`.
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

/// Configuration file structure (TOML).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Storage backend identifier.
    pub backend: Option<String>,
    /// `SQLite` file path.
    pub database_path: Option<String>,
    /// JSON lines directory.
    pub json_dir: Option<String>,
    /// Gist section.
    pub gist: Option<ConfigFileGist>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
}

/// `[gist]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileGist {
    /// Gists collection URL.
    pub api_url: Option<String>,
    /// Access token.
    pub token: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// `[logging]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// `[metrics]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileMetrics {
    /// Whether the exporter is installed.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

/// `[server]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileServer {
    /// Bind address.
    pub host: Option<String>,
    /// Bind port.
    pub port: Option<u16>,
}

impl Default for SnipsterConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            backend: BackendType::default(),
            database_path: None,
            json_dir: None,
            gist: GistConfig::default(),
            logging: LoggingConfig::default(),
            metrics: MetricsConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "snipster")
        .map_or_else(|| PathBuf::from(".snipster"), |dirs| dirs.data_dir().to_path_buf())
}

impl SnipsterConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration the way the binary does.
    ///
    /// Uses `path` if given, else `SNIPSTER_CONFIG_PATH`, else the default
    /// location. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file in use cannot be read or parsed,
    /// or if an environment variable holds an invalid value.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("SNIPSTER_CONFIG_PATH").map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default()?,
        };
        config.apply_env_overrides()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidInput(format!("cannot read config {}: {e}", path.display()))
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::InvalidInput(format!("cannot parse config {}: {e}", path.display()))
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir, then `~/.config/snipster/config.toml`.
    /// Returns defaults if neither exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the first existing file cannot be read or parsed,
    /// or names an unknown backend.
    pub fn load_default() -> Result<Self> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Ok(Self::default());
        };

        Self::load_first_existing(&[
            base_dirs.config_dir().join("snipster").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("snipster")
                .join("config.toml"),
        ])
    }

    fn load_first_existing(candidates: &[PathBuf]) -> Result<Self> {
        match candidates.iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::load_from_file(path)
            },
            None => Ok(Self::default()),
        }
    }

    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(backend) = file.backend {
            config.backend = backend.parse()?;
        }
        config.database_path = file.database_path.map(PathBuf::from);
        config.json_dir = file.json_dir.map(PathBuf::from);

        if let Some(gist) = file.gist {
            if let Some(api_url) = gist.api_url {
                config.gist.api_url = api_url;
            }
            config.gist.token = gist.token.map(SecretString::from);
            if let Some(v) = gist.timeout_ms {
                config.gist.timeout_ms = v;
            }
            if let Some(v) = gist.connect_timeout_ms {
                config.gist.connect_timeout_ms = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }
        if let Some(metrics) = file.metrics {
            if let Some(v) = metrics.enabled {
                config.metrics.enabled = v;
            }
            if let Some(v) = metrics.port {
                config.metrics.port = v;
            }
        }
        if let Some(server) = file.server {
            if let Some(host) = server.host {
                config.server.host = host;
            }
            if let Some(port) = server.port {
                config.server.port = port;
            }
        }

        Ok(config)
    }

    /// Applies `SNIPSTER_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBackend`] if `SNIPSTER_BACKEND` names an unknown
    /// backend, or [`Error::InvalidInput`] for an unparsable number.
    pub fn apply_env_overrides(self) -> Result<Self> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides read through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`apply_env_overrides`](Self::apply_env_overrides).
    pub fn apply_env_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SNIPSTER_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = var("SNIPSTER_BACKEND") {
            self.backend = v.parse()?;
        }
        if let Some(v) = var("SNIPSTER_DATABASE_PATH") {
            self.database_path = Some(PathBuf::from(v));
        }
        if let Some(v) = var("SNIPSTER_JSON_DIR") {
            self.json_dir = Some(PathBuf::from(v));
        }

        if let Some(v) = var("SNIPSTER_GIST_API_URL") {
            self.gist.api_url = v;
        }
        if let Some(token) = ["SNIPSTER_GITHUB_TOKEN", "GITHUB_TOKEN", "GH_TOKEN"]
            .into_iter()
            .find_map(&var)
        {
            self.gist.token = Some(SecretString::from(token));
        }
        if let Some(v) = var("SNIPSTER_GIST_TIMEOUT_MS") {
            self.gist.timeout_ms = parse_number("SNIPSTER_GIST_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = var("SNIPSTER_GIST_CONNECT_TIMEOUT_MS") {
            self.gist.connect_timeout_ms = parse_number("SNIPSTER_GIST_CONNECT_TIMEOUT_MS", &v)?;
        }

        if let Some(v) = var("SNIPSTER_LOG_LEVEL") {
            self.logging.level = Some(v);
        }
        if let Some(v) = var("SNIPSTER_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Some(v) = var("SNIPSTER_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }

        if let Some(v) = var("SNIPSTER_METRICS_ENABLED") {
            self.metrics.enabled = parse_bool(&v);
        }
        if let Some(v) = var("SNIPSTER_METRICS_PORT") {
            self.metrics.port = parse_number("SNIPSTER_METRICS_PORT", &v)?;
        }
        if let Some(v) = var("SNIPSTER_HOST") {
            self.server.host = v;
        }
        if let Some(v) = var("SNIPSTER_PORT") {
            self.server.port = parse_number("SNIPSTER_PORT", &v)?;
        }

        Ok(self)
    }

    /// Returns the `SQLite` database file.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("snippets.db"))
    }

    /// Returns the JSON lines log directory.
    #[must_use]
    pub fn json_dir(&self) -> PathBuf {
        self.json_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("jsonl"))
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendType) -> Self {
        self.backend = backend;
        self
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SnipsterConfig::default();
        assert_eq!(config.backend, BackendType::Sql);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(!config.metrics.enabled);
        assert!(config.gist.token.is_none());
        assert_eq!(config.database_path(), config.data_dir.join("snippets.db"));
        assert_eq!(config.json_dir(), config.data_dir.join("jsonl"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
backend = "json"
data_dir = "/tmp/snips"

[gist]
api_url = "http://localhost:9999/gists"
token = "t0k"

[logging]
format = "json"

[server]
port = 9001
"#,
        )
        .unwrap();

        let config = SnipsterConfig::load_from_file(&path).unwrap();
        assert_eq!(config.backend, BackendType::Json);
        assert_eq!(config.json_dir(), PathBuf::from("/tmp/snips/jsonl"));
        assert_eq!(config.gist.api_url, "http://localhost:9999/gists");
        assert_eq!(config.gist.token.unwrap().expose_secret(), "t0k");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 9001);
    }

    #[test]
    fn test_load_from_file_rejects_unknown_backend() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"mongo\"\n").unwrap();

        let err = SnipsterConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, Error::UnknownBackend(ref name) if name == "mongo"));
    }

    #[test]
    fn test_default_location_with_unknown_backend_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"mongo\"\n").unwrap();

        let candidates = [dir.path().join("missing.toml"), path];
        let err = SnipsterConfig::load_first_existing(&candidates).unwrap_err();
        assert!(matches!(err, Error::UnknownBackend(ref name) if name == "mongo"));
    }

    #[test]
    fn test_default_location_falls_through_to_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "backend = \"memory\"\n").unwrap();

        let candidates = [dir.path().join("missing.toml"), path];
        let config = SnipsterConfig::load_first_existing(&candidates).unwrap();
        assert_eq!(config.backend, BackendType::Memory);
    }

    #[test]
    fn test_default_location_without_files_is_default() {
        let dir = TempDir::new().unwrap();
        let config = SnipsterConfig::load_first_existing(&[dir.path().join("none.toml")]).unwrap();
        assert_eq!(config.backend, BackendType::Sql);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = SnipsterConfig::load_from_file(Path::new("/nonexistent/snipster.toml"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_env_overrides() {
        let config = SnipsterConfig::default()
            .apply_env_overrides_from(env(&[
                ("SNIPSTER_BACKEND", "memory"),
                ("SNIPSTER_DATABASE_PATH", "/data/x.db"),
                ("GITHUB_TOKEN", "from-gh"),
                ("SNIPSTER_PORT", "8080"),
                ("SNIPSTER_METRICS_ENABLED", "yes"),
            ]))
            .unwrap();

        assert_eq!(config.backend, BackendType::Memory);
        assert_eq!(config.database_path(), PathBuf::from("/data/x.db"));
        assert_eq!(config.gist.token.unwrap().expose_secret(), "from-gh");
        assert_eq!(config.server.port, 8080);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_env_token_precedence() {
        let config = SnipsterConfig::default()
            .apply_env_overrides_from(env(&[
                ("GITHUB_TOKEN", "generic"),
                ("SNIPSTER_GITHUB_TOKEN", "specific"),
            ]))
            .unwrap();
        assert_eq!(config.gist.token.unwrap().expose_secret(), "specific");
    }

    #[test]
    fn test_env_unknown_backend_is_error() {
        let err = SnipsterConfig::default()
            .apply_env_overrides_from(env(&[("SNIPSTER_BACKEND", "redis")]))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownBackend(_)));
    }

    #[test]
    fn test_env_bad_port() {
        let err = SnipsterConfig::default()
            .apply_env_overrides_from(env(&[("SNIPSTER_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("SNIPSTER_PORT"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let config = SnipsterConfig::default()
            .apply_env_overrides_from(env(&[("SNIPSTER_BACKEND", "  ")]))
            .unwrap();
        assert_eq!(config.backend, BackendType::Sql);
    }
}
