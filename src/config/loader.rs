use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::types::ScopeboxConfig;
use crate::error::{Result, ScopeboxError};

/// Get the default configuration file path
pub fn get_config_path() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "scopebox", "scopebox") {
        proj_dirs.config_dir().join("config.toml")
    } else {
        // Fallback to home directory
        dirs_fallback().join(".scopebox").join("config.toml")
    }
}

fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(config_path: Option<&Path>) -> Result<ScopeboxConfig> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(get_config_path);

    if !path.exists() {
        // An explicitly requested file must exist
        if config_path.is_some() {
            return Err(ScopeboxError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }
        return Ok(ScopeboxConfig::default());
    }

    let content = std::fs::read_to_string(&path)?;
    let config: ScopeboxConfig =
        toml::from_str(&content).map_err(|e| ScopeboxError::TomlParse(e.to_string()))?;

    debug!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::SandboxKind;

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sandbox]\ndefault_kind = \"proxy\"\ndevelopment = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.sandbox.default_kind, SandboxKind::Proxy);
        assert!(config.sandbox.development);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ScopeboxError::ConfigNotFound { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[sandbox\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ScopeboxError::TomlParse(_))
        ));
    }
}
