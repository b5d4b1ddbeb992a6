//! `snipster config --show`.

use super::emit;
use crate::Result;
use crate::config::{LogFormat, SnipsterConfig};
use console::Style;
use std::io::Write;

/// Prints the effective configuration. The gist token is never printed.
///
/// # Errors
///
/// Returns an error only if writing the output fails.
pub fn show_config(config: &SnipsterConfig, out: &mut dyn Write) -> Result<()> {
    let heading = Style::new().bold().underlined();
    let key = Style::new().cyan();
    let line = |k: &str, v: String| format!("  {} {v}", key.apply_to(format!("{k}:")));

    let lines = [
        heading.apply_to("Storage").to_string(),
        line("Backend", config.backend.to_string()),
        line("Data directory", config.data_dir.display().to_string()),
        line("Database", config.database_path().display().to_string()),
        line("JSON lines", config.json_dir().display().to_string()),
        String::new(),
        heading.apply_to("Gist").to_string(),
        line("API URL", config.gist.api_url.clone()),
        line(
            "Token",
            if config.gist.token.is_some() { "configured" } else { "not set" }.to_string(),
        ),
        line("Timeout", format!("{} ms", config.gist.timeout_ms)),
        line("Connect timeout", format!("{} ms", config.gist.connect_timeout_ms)),
        String::new(),
        heading.apply_to("Logging").to_string(),
        line(
            "Level",
            config.logging.level.clone().unwrap_or_else(|| "(default)".to_string()),
        ),
        line(
            "Format",
            match config.logging.format {
                LogFormat::Pretty => "pretty",
                LogFormat::Json => "json",
            }
            .to_string(),
        ),
        line(
            "File",
            config
                .logging
                .file
                .as_ref()
                .map_or_else(|| "(stderr)".to_string(), |p| p.display().to_string()),
        ),
        String::new(),
        heading.apply_to("Server").to_string(),
        line("Address", format!("{}:{}", config.server.host, config.server.port)),
        line(
            "Metrics",
            if config.metrics.enabled {
                format!("enabled on port {}", config.metrics.port)
            } else {
                "disabled".to_string()
            },
        ),
    ];

    for text in lines {
        emit(out, text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    #[test]
    fn test_show_config_hides_token() {
        let mut config = SnipsterConfig::default().with_data_dir("/srv/snips");
        config.gist.token = Some(SecretString::from("ghp_secret"));

        let mut buf = Vec::new();
        show_config(&config, &mut buf).unwrap();
        let out = String::from_utf8(buf).unwrap();

        assert!(out.contains("Backend: sql"));
        assert!(out.contains("/srv/snips/snippets.db"));
        assert!(out.contains("Token: configured"));
        assert!(!out.contains("ghp_secret"));
    }
}
