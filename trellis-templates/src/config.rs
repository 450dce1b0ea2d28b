//! `trellis.toml` configuration.
//!
//! ```toml
//! [site]
//! root = "src"
//!
//! [templates]
//! includes = "_includes"
//! autoescape = true
//! attr-filter = "attr"
//! ```
//!
//! Every key is optional. A relative `site.root` is resolved against the
//! directory containing the config file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "trellis.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub site: SiteConfig,
    pub templates: TemplatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SiteConfig {
    /// Source directory site-relative paths resolve against.
    pub root: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct TemplatesConfig {
    /// Includes directory, site-relative.
    pub includes: String,

    /// Tera autoescaping for `.html`, `.htm` and `.xml` templates.
    pub autoescape: bool,

    /// Name the attribute filter is registered under. Empty disables it.
    pub attr_filter: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            includes: "_includes".to_string(),
            autoescape: true,
            attr_filter: "attr".to_string(),
        }
    }
}

impl Config {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.site.root.is_relative() {
            if let Some(dir) = path.parent() {
                config.site.root = dir.join(&config.site.root);
            }
        }
        Ok(config)
    }

    /// Load a config file, falling back to defaults when it is missing or
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.is_file() {
            tracing::debug!(?path, "No config file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::debug!(?path, "Loaded config");
                config
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.site.root, PathBuf::from("."));
        assert_eq!(config.templates.includes, "_includes");
        assert!(config.templates.autoescape);
        assert_eq!(config.templates.attr_filter, "attr");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[site]
root = "/srv/site"

[templates]
includes = "_partials"
autoescape = false
attr-filter = "attrs"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.site.root, PathBuf::from("/srv/site"));
        assert_eq!(config.templates.includes, "_partials");
        assert!(!config.templates.autoescape);
        assert_eq!(config.templates.attr_filter, "attrs");
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str("[templates]\nautoescape = false\n").unwrap();
        assert_eq!(config.templates.includes, "_includes");
        assert!(!config.templates.autoescape);
        assert_eq!(config.site.root, PathBuf::from("."));
    }

    #[test]
    fn test_load_resolves_relative_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[site]\nroot = \"src\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.site.root, dir.path().join("src"));
    }

    #[test]
    fn test_load_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[templates\nincludes = 1").unwrap();

        assert!(matches!(Config::load(&path), Err(ConfigError::Parse { .. })));
        assert_eq!(Config::load_or_default(&path).templates.includes, "_includes");
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join("absent.toml"));
        assert_eq!(config.site.root, PathBuf::from("."));
    }
}
