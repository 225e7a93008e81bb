use super::AppConfig;
use crate::errors::Error;
use std::fs;
use std::path::Path;

use tracing::info;

/// Loads and parses the application configuration from a YAML or TOML file
///
/// # Arguments
///
/// * `file_path` - Path to a `.yaml`, `.yml` or `.toml` file
///
/// # Returns
///
/// * `Result<AppConfig, Error>` - The parsed and validated configuration
///
/// # Errors
///
/// Returns an error if:
/// * The file cannot be read
/// * The extension is not recognized
/// * The content cannot be parsed into an AppConfig or fails validation
pub fn load_config(file_path: &Path) -> Result<AppConfig, Error> {
    let raw = fs::read_to_string(file_path)?;
    let extension = file_path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let config = parse_config(&raw, extension)?;
    info!("Loaded configuration from {}", file_path.display());
    Ok(config)
}

/// Parses configuration text in the format named by `extension`
pub fn parse_config(raw: &str, extension: &str) -> Result<AppConfig, Error> {
    let config: AppConfig = match extension.to_ascii_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?,
        "toml" => toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?,
        other => {
            return Err(Error::Config(format!(
                "unsupported configuration format '{}'",
                other
            )))
        }
    };
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbedderProvider;
    use tempfile::TempDir;

    #[test]
    fn parses_partial_yaml_with_defaults() {
        let config = parse_config(
            "database_path: /var/lib/orchestrator.db\nembedder:\n  provider: openai\n  dimension: 1536\n",
            "yaml",
        )
        .unwrap();
        assert_eq!(config.database_path, "/var/lib/orchestrator.db");
        assert_eq!(config.embedder.provider, EmbedderProvider::Openai);
        assert_eq!(config.embedder.dimension, 1536);
        assert_eq!(config.step_cost, 0.01);
    }

    #[test]
    fn parses_toml() {
        let config = parse_config(
            "step_cost = 0.5\n[rate_limit]\nper_user = 3\nwindow = \"10s\"\n",
            "toml",
        )
        .unwrap();
        assert_eq!(config.step_cost, 0.5);
        assert_eq!(config.rate_limit.per_user, 3);
        assert_eq!(config.rate_limit.per_task, 30);
    }

    #[test]
    fn rejects_unknown_format_and_invalid_values() {
        assert!(matches!(parse_config("{}", "json"), Err(Error::Config(_))));
        assert!(matches!(
            parse_config("step_cost: -2", "yaml"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orchestrator.yml");
        std::fs::write(&path, "index_path: /tmp/idx\n").unwrap();
        assert_eq!(load_config(&path).unwrap().index_path, "/tmp/idx");
    }
}
