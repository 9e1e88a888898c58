//! Configuration file loader for the `.hivekit/` directory.

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::HivekitConfig;
use std::path::Path;
use tracing::debug;

/// Loads configuration from `<root>/.hivekit/config.toml`.
///
/// # Arguments
///
/// * `root` - Project root containing the `.hivekit/` folder
///
/// # Returns
///
/// The parsed configuration. A missing `.hivekit/` directory or a missing
/// `config.toml` yields the default configuration rather than an error.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - The file exists but cannot be read
/// - The file is not valid TOML
/// - A value is out of range (`factor < 1.0`, `max_iterations == 0`, empty
///   log filter)
///
/// # Example
///
/// ```rust,no_run
/// use hk_core::config::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Retrying up to {} times", config.retry.max_retries);
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<HivekitConfig> {
    let config_path = root.join(".hivekit").join("config.toml");

    if !config_path.exists() {
        debug!(path = %config_path.display(), "No config file, using defaults");
        return Ok(HivekitConfig::default());
    }

    load_config_file(&config_path).await
}

/// Loads and validates a single TOML configuration file.
pub async fn load_config_file(config_path: &Path) -> ConfigResult<HivekitConfig> {
    let content =
        tokio::fs::read_to_string(config_path)
            .await
            .map_err(|source| ConfigError::FileRead {
                path: config_path.to_path_buf(),
                source,
            })?;

    let config: HivekitConfig =
        toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
            path: config_path.to_path_buf(),
            source,
        })?;

    validate(&config, config_path)?;
    debug!(path = %config_path.display(), "Loaded config");
    Ok(config)
}

fn validate(config: &HivekitConfig, path: &Path) -> ConfigResult<()> {
    let invalid = |reason: &str| ConfigError::InvalidConfig {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    if config.retry.factor.is_nan() || config.retry.factor < 1.0 {
        return Err(invalid("retry.factor must be at least 1.0"));
    }
    if config.agent.max_iterations == 0 {
        return Err(invalid("agent.max_iterations must be greater than 0"));
    }
    if config.logging.filter.trim().is_empty() {
        return Err(invalid("logging.filter must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_load_config_full() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let hk_dir = root.join(".hivekit");
        fs::create_dir_all(&hk_dir).expect("Failed to create .hivekit");

        let config_toml = r#"
[retry]
max_retries = 2
factor = 3.0
base_delay_ms = 250

[run]
timeout_ms = 5000

[agent]
max_iterations = 4
max_retries_per_step = 1
total_max_retries = 6

[logging]
filter = "hk_core=debug"
"#;
        fs::write(hk_dir.join("config.toml"), config_toml).expect("Failed to write config.toml");

        let config = load_config(root).await.expect("Failed to load config");
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.factor, 3.0);
        assert_eq!(config.run.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.agent.max_iterations, 4);
        assert_eq!(config.agent.max_retries_per_step, 1);
        assert_eq!(config.agent.total_max_retries, 6);
        assert_eq!(config.logging.filter, "hk_core=debug");

        let options = config.retry.to_options();
        assert_eq!(options.retries, 2);
        assert_eq!(options.delay_for_attempt(2), Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().expect("Failed to create temp dir");
        let config = load_config(dir.path())
            .await
            .expect("Should handle missing .hivekit");
        assert_eq!(config, HivekitConfig::default());
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.agent.total_max_retries, 20);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.run.timeout(), None);
    }

    #[tokio::test]
    async fn test_load_config_partial() {
        let dir = tempdir().expect("Failed to create temp dir");
        let hk_dir = dir.path().join(".hivekit");
        fs::create_dir_all(&hk_dir).expect("Failed to create .hivekit");
        fs::write(hk_dir.join("config.toml"), "[agent]\ntotal_max_retries = 2\n")
            .expect("Failed to write config.toml");

        let config = load_config(dir.path())
            .await
            .expect("Should handle partial config");
        assert_eq!(config.agent.total_max_retries, 2);
        assert_eq!(config.agent.max_retries_per_step, 3);
        assert_eq!(config.retry, Default::default());
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().expect("Failed to create temp dir");
        let hk_dir = dir.path().join(".hivekit");
        fs::create_dir_all(&hk_dir).expect("Failed to create .hivekit");
        fs::write(hk_dir.join("config.toml"), "retry = [invalid toml")
            .expect("Failed to write config.toml");

        let result = load_config(dir.path()).await;
        if let Err(ConfigError::TomlParse { path, .. }) = result {
            assert!(path.ends_with("config.toml"));
        } else {
            panic!("Expected TomlParse error");
        }
    }

    #[tokio::test]
    async fn test_load_config_rejects_out_of_range_values() {
        let dir = tempdir().expect("Failed to create temp dir");
        let hk_dir = dir.path().join(".hivekit");
        fs::create_dir_all(&hk_dir).expect("Failed to create .hivekit");

        for (content, needle) in [
            ("[retry]\nfactor = 0.5\n", "retry.factor"),
            ("[agent]\nmax_iterations = 0\n", "max_iterations"),
            ("[logging]\nfilter = \"  \"\n", "logging.filter"),
        ] {
            fs::write(hk_dir.join("config.toml"), content).expect("Failed to write config.toml");
            match load_config(dir.path()).await {
                Err(ConfigError::InvalidConfig { reason, .. }) => {
                    assert!(reason.contains(needle), "{reason} should mention {needle}")
                }
                other => panic!("Expected InvalidConfig, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_config_error_converts_to_validation_error() {
        let dir = tempdir().expect("Failed to create temp dir");
        let error = load_config_file(&dir.path().join("missing.toml"))
            .await
            .unwrap_err();
        assert!(matches!(error, ConfigError::FileRead { .. }));

        let framework: crate::errors::FrameworkError = error.into();
        assert!(framework.is_fatal());
        assert!(framework.context().contains_key("path"));
    }
}
