//! Configuration validation.

use super::{AuthConfig, Config};
use crate::error::{HdfsError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.aliases.is_empty() {
        return Err(HdfsError::Config(
            "at least one alias must be defined".into(),
        ));
    }

    if let Some(ref name) = config.default_alias {
        if !config.aliases.contains_key(name) {
            return Err(HdfsError::Config(format!(
                "default_alias '{}' is not a defined alias",
                name
            )));
        }
    }

    for (name, alias) in &config.aliases {
        if alias.endpoints.is_empty() {
            return Err(HdfsError::Config(format!(
                "alias '{}' must list at least one endpoint",
                name
            )));
        }
        for endpoint in &alias.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(HdfsError::Config(format!(
                    "alias '{}': endpoint '{}' must start with http:// or https://",
                    name, endpoint
                )));
            }
            if endpoint.ends_with('/') {
                return Err(HdfsError::Config(format!(
                    "alias '{}': endpoint '{}' must not end with a slash",
                    name, endpoint
                )));
            }
        }
        match &alias.auth {
            AuthConfig::User { name: user } if user.is_empty() => {
                return Err(HdfsError::Config(format!(
                    "alias '{}': auth.name must not be empty",
                    name
                )));
            }
            AuthConfig::Token { token } if token.is_empty() => {
                return Err(HdfsError::Config(format!(
                    "alias '{}': auth.token must not be empty",
                    name
                )));
            }
            _ => {}
        }
        // Timeouts - only check if explicitly set
        if let Some(0) = alias.connect_timeout_secs {
            return Err(HdfsError::Config(format!(
                "alias '{}': connect_timeout_secs must be at least 1",
                name
            )));
        }
        if let Some(0) = alias.read_timeout_secs {
            return Err(HdfsError::Config(format!(
                "alias '{}': read_timeout_secs must be at least 1",
                name
            )));
        }
    }

    if let Some(0) = config.transfer.chunk_size {
        return Err(HdfsError::Config(
            "transfer.chunk_size must be at least 1".into(),
        ));
    }

    Ok(())
}
