//! Configuration type definitions for cluster aliases and transfer tuning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Alias used when the caller does not name one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_alias: Option<String>,

    /// Named cluster definitions.
    pub aliases: BTreeMap<String, AliasConfig>,

    /// Bulk transfer tuning.
    #[serde(default)]
    pub transfer: TransferTuning,
}

/// One named cluster: its endpoints and how to authenticate against them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Ordered namenode base URLs, e.g. `http://namenode1:9870`. Tried in
    /// rotation order when an endpoint fails.
    pub endpoints: Vec<String>,

    /// Authentication parameters (default: none).
    #[serde(default)]
    pub auth: AuthConfig,

    /// Root for relative remote paths. Discovered via the server's home
    /// directory when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// User to proxy as on every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Connect timeout in seconds (default: 30).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Response read timeout in seconds (default: 60).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
}

impl AliasConfig {
    pub fn get_connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs.unwrap_or(30)
    }

    pub fn get_read_timeout_secs(&self) -> u64 {
        self.read_timeout_secs.unwrap_or(60)
    }
}

/// Authentication scheme for an alias.
///
/// The set of schemes is closed: adding one means adding a variant here and
/// teaching [`crate::client::ClientBuilder`] how to decorate requests with it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication parameters.
    #[default]
    None,

    /// Pseudo authentication: send a user name with every request.
    User { name: String },

    /// Delegation token authentication.
    Token { token: String },
}

/// Bulk transfer tuning.
/// Fields use Option<T> to distinguish "not set" (use the default) from
/// "explicitly set" (use the provided value).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TransferTuning {
    /// Bytes per transfer chunk (default: 65536).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,

    /// Worker count for bulk transfers; 0 means one worker per file
    /// (default: 1, sequential).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl TransferTuning {
    pub fn get_chunk_size(&self) -> usize {
        self.chunk_size.unwrap_or(64 * 1024)
    }

    pub fn get_workers(&self) -> usize {
        self.workers.unwrap_or(1)
    }
}
