// Configuration loader
// Loads settings from ~/.nrepl-bridge/config.toml, then the environment

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{CONFIG_DIR, CONFIG_FILE, URL_ENV_VAR};
use super::settings::ReplConfig;

/// Default config file location, if a home directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load configuration.
///
/// An explicit `path` must exist. Without one, the default file is used when
/// present and built-in defaults otherwise. `NREPL_BRIDGE_URL` overrides the
/// file's `url`.
pub fn load_config(path: Option<&Path>) -> Result<ReplConfig> {
    let config = match path {
        Some(path) => load_config_from_file(path)?,
        None => match default_config_path() {
            Some(default) if default.exists() => load_config_from_file(&default)?,
            _ => ReplConfig::default(),
        },
    };

    let config = apply_env_overrides(config, |key| std::env::var(key).ok());

    config
        .validate()
        .context("Configuration validation failed")?;

    Ok(config)
}

pub fn load_config_from_file(path: &Path) -> Result<ReplConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Apply environment overrides using `lookup` to read variables.
pub fn apply_env_overrides(
    mut config: ReplConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> ReplConfig {
    if let Some(url) = lookup(URL_ENV_VAR) {
        if !url.trim().is_empty() {
            config.url = url.trim().to_string();
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "url = \"nrepl://127.0.0.1:9999\"").unwrap();
        writeln!(file, "greeting_enabled = false").unwrap();

        let config = load_config_from_file(file.path()).unwrap();
        assert_eq!(config.url, "nrepl://127.0.0.1:9999");
        assert!(!config.greeting_enabled);
        assert!(config.handshake);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("nope.toml").as_path())).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "url = [").unwrap();
        assert!(load_config_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_overrides_url() {
        let config = apply_env_overrides(ReplConfig::default(), |key| {
            (key == URL_ENV_VAR).then(|| " nrepl://remote:1234 ".to_string())
        });
        assert_eq!(config.url, "nrepl://remote:1234");
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config = apply_env_overrides(ReplConfig::default(), |_| Some(String::new()));
        assert_eq!(config.url, ReplConfig::default().url);
    }
}
