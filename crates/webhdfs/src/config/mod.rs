//! Configuration loading, validation and alias lookup.

mod types;
mod validation;

pub use types::*;

use crate::error::{HdfsError, Result};
use std::path::{Path, PathBuf};

/// Environment variable naming an alternate config file location.
pub const CONFIG_ENV_VAR: &str = "WEBHDFS_CONFIG";

const DEFAULT_FILE_NAME: &str = ".webhdfs.yaml";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }

    /// Resolve the config file location: an explicit path wins, then the
    /// `WEBHDFS_CONFIG` environment variable, then `~/.webhdfs.yaml`.
    pub fn locate(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(DEFAULT_FILE_NAME))
            .ok_or_else(|| {
                HdfsError::Config(format!(
                    "cannot determine home directory; pass --config or set {}",
                    CONFIG_ENV_VAR
                ))
            })
    }

    /// Look up an alias: the explicit name if given, else `default_alias`,
    /// else the sole alias when exactly one is defined.
    pub fn alias(&self, name: Option<&str>) -> Result<&AliasConfig> {
        let name = match name {
            Some(name) => name,
            None => match &self.default_alias {
                Some(name) => name.as_str(),
                None => {
                    // Unambiguous when exactly one alias exists.
                    let mut values = self.aliases.values();
                    return match (values.next(), values.next()) {
                        (Some(sole), None) => Ok(sole),
                        _ => Err(HdfsError::Config(
                            "no alias given and no default_alias configured".into(),
                        )),
                    };
                }
            },
        };
        self.aliases
            .get(name)
            .ok_or_else(|| HdfsError::Config(format!("alias '{}' not found in config", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
default_alias: prod
aliases:
  prod:
    endpoints:
      - "http://namenode1:9870"
      - "http://namenode2:9870"
    auth:
      scheme: user
      name: hadoop
    root: /user/hadoop
  dev:
    endpoints:
      - "http://localhost:9870"
transfer:
  chunk_size: 131072
  workers: 4
"#;

    #[test]
    fn test_from_yaml() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.aliases.len(), 2);
        assert_eq!(config.transfer.get_chunk_size(), 131072);
        assert_eq!(config.transfer.get_workers(), 4);

        let prod = config.alias(Some("prod")).unwrap();
        assert_eq!(prod.endpoints.len(), 2);
        assert_eq!(prod.root.as_deref(), Some("/user/hadoop"));
        assert_eq!(
            prod.auth,
            AuthConfig::User {
                name: "hadoop".to_string()
            }
        );
    }

    #[test]
    fn test_default_alias_lookup() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let alias = config.alias(None).unwrap();
        assert_eq!(alias.endpoints[0], "http://namenode1:9870");
    }

    #[test]
    fn test_sole_alias_is_implicit_default() {
        let yaml = r#"
aliases:
  only:
    endpoints: ["http://localhost:9870"]
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.alias(None).is_ok());
    }

    #[test]
    fn test_unknown_alias() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert!(config.alias(Some("staging")).is_err());
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let dev = config.alias(Some("dev")).unwrap();
        assert_eq!(dev.auth, AuthConfig::None);
        assert_eq!(dev.get_connect_timeout_secs(), 30);
        assert_eq!(dev.get_read_timeout_secs(), 60);
    }
}
