//! WebHDFS client: construction, authentication, and the typed REST surface.
//!
//! A [`Client`] owns an ordered endpoint list with a shared rotation cursor,
//! a [`Transport`], and the credentials to decorate every request with. The
//! typed operations below are thin wrappers over the dispatcher; all of them
//! run their path arguments through [`Client::resolve`] first, so relative
//! paths and `#LATEST` markers work uniformly.

mod dispatch;
mod resolve;

use std::fmt;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;

use crate::config::{AuthConfig, Config};
use crate::error::{HdfsError, Result};
use crate::transport::{Method, Transport, UreqTransport};

use dispatch::{ApiCall, Dispatched, EndpointRotator};
pub(crate) use resolve::normalize;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_READ_TIMEOUT_SECS: u64 = 60;

/// Request authentication, applied as query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Auth {
    /// No authentication parameters.
    #[default]
    None,
    /// Pseudo authentication: adds `user.name`.
    User(String),
    /// Delegation token: adds `delegation`.
    Token(String),
}

/// A WebHDFS client bound to one cluster.
///
/// `Client` is `Send + Sync`; bulk transfer workers share one instance by
/// reference. The only interior state is the endpoint rotation cursor and
/// the memoized root, both behind their own locks.
pub struct Client {
    rotator: EndpointRotator,
    transport: Box<dyn Transport>,
    auth: Auth,
    proxy_user: Option<String>,
    configured_root: Option<String>,
    root: Mutex<Option<String>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("auth", &self.auth)
            .field("proxy_user", &self.proxy_user)
            .field("configured_root", &self.configured_root)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
pub struct ClientBuilder {
    endpoints: Vec<String>,
    auth: Auth,
    root: Option<String>,
    proxy_user: Option<String>,
    connect_timeout: Duration,
    read_timeout: Duration,
    transport: Option<Box<dyn Transport>>,
}

impl ClientBuilder {
    pub fn auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    /// Root for relative paths. An absolute root is used as-is; a relative
    /// one is joined under the remote home directory on first use.
    pub fn root(mut self, root: impl Into<String>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// User to impersonate (`doas`) on every request.
    pub fn proxy_user(mut self, user: impl Into<String>) -> Self {
        self.proxy_user = Some(user.into());
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Replace the HTTP transport. Tests inject scripted transports here.
    pub fn transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client> {
        if self.endpoints.is_empty() {
            return Err(HdfsError::Config(
                "at least one endpoint is required".into(),
            ));
        }
        let endpoints: Vec<String> = self
            .endpoints
            .into_iter()
            .map(|e| e.trim_end_matches('/').to_string())
            .collect();
        let transport = match self.transport {
            Some(transport) => transport,
            None => Box::new(UreqTransport::new(self.connect_timeout, self.read_timeout)),
        };
        Ok(Client {
            rotator: EndpointRotator::new(endpoints),
            transport,
            auth: self.auth,
            proxy_user: self.proxy_user,
            configured_root: self.root,
            root: Mutex::new(None),
        })
    }
}

impl Client {
    pub fn builder(endpoints: Vec<String>) -> ClientBuilder {
        ClientBuilder {
            endpoints,
            auth: Auth::None,
            root: None,
            proxy_user: None,
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            read_timeout: Duration::from_secs(DEFAULT_READ_TIMEOUT_SECS),
            transport: None,
        }
    }

    /// Build a client from a configuration alias (the named one, else the
    /// config's default).
    pub fn from_config(config: &Config, alias: Option<&str>) -> Result<Client> {
        let alias = config.alias(alias)?;
        let auth = match &alias.auth {
            AuthConfig::None => Auth::None,
            AuthConfig::User { name } => Auth::User(name.clone()),
            AuthConfig::Token { token } => Auth::Token(token.clone()),
        };
        let mut builder = Client::builder(alias.endpoints.clone())
            .auth(auth)
            .connect_timeout(Duration::from_secs(alias.get_connect_timeout_secs()))
            .read_timeout(Duration::from_secs(alias.get_read_timeout_secs()));
        if let Some(root) = &alias.root {
            builder = builder.root(root);
        }
        if let Some(proxy) = &alias.proxy {
            builder = builder.proxy_user(proxy);
        }
        builder.build()
    }
}

// ===== Wire envelope types =====

/// Entry type in a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FileType {
    File,
    Directory,
}

/// Metadata for one file or directory.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Entry name relative to the listed directory. Empty when the status
    /// describes the queried path itself.
    #[serde(default)]
    pub path_suffix: String,
    pub r#type: FileType,
    #[serde(default)]
    pub length: u64,
    /// Milliseconds since the epoch.
    #[serde(default)]
    pub modification_time: i64,
    #[serde(default)]
    pub access_time: i64,
    #[serde(default)]
    pub block_size: u64,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub permission: String,
    #[serde(default)]
    pub replication: u32,
}

impl FileStatus {
    pub fn is_dir(&self) -> bool {
        self.r#type == FileType::Directory
    }
}

/// Recursive size and count summary of a subtree.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSummary {
    pub directory_count: u64,
    pub file_count: u64,
    pub length: u64,
    #[serde(default)]
    pub quota: i64,
    #[serde(default)]
    pub space_consumed: u64,
    #[serde(default)]
    pub space_quota: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChecksum {
    pub algorithm: String,
    pub bytes: String,
    pub length: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclStatus {
    pub owner: String,
    pub group: String,
    #[serde(default)]
    pub entries: Vec<String>,
    #[serde(default)]
    pub sticky_bit: bool,
    #[serde(default)]
    pub permission: String,
}

#[derive(Debug, Deserialize)]
struct FileStatusEnvelope {
    #[serde(rename = "FileStatus")]
    file_status: FileStatus,
}

#[derive(Debug, Deserialize)]
struct FileStatusesEnvelope {
    #[serde(rename = "FileStatuses")]
    file_statuses: FileStatusesInner,
}

#[derive(Debug, Deserialize)]
struct FileStatusesInner {
    #[serde(rename = "FileStatus")]
    file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
struct BooleanEnvelope {
    boolean: bool,
}

#[derive(Debug, Deserialize)]
struct PathEnvelope {
    #[serde(rename = "Path")]
    path: String,
}

#[derive(Debug, Deserialize)]
struct ContentSummaryEnvelope {
    #[serde(rename = "ContentSummary")]
    content_summary: ContentSummary,
}

#[derive(Debug, Deserialize)]
struct FileChecksumEnvelope {
    #[serde(rename = "FileChecksum")]
    file_checksum: FileChecksum,
}

#[derive(Debug, Deserialize)]
struct AclStatusEnvelope {
    #[serde(rename = "AclStatus")]
    acl_status: AclStatus,
}

// ===== Typed operations =====

impl Client {
    /// The remote home directory of the authenticated user.
    pub fn get_home_directory(&self) -> Result<String> {
        let call = ApiCall::new(Method::Get, "GETHOMEDIRECTORY", "/");
        Ok(self.dispatch(&call)?.into_json::<PathEnvelope>()?.path)
    }

    /// Metadata for a path. Raises if it does not exist.
    pub fn status(&self, path: &str) -> Result<FileStatus> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Get, "GETFILESTATUS", path);
        Ok(self
            .dispatch(&call)?
            .into_json::<FileStatusEnvelope>()?
            .file_status)
    }

    /// Metadata for a path, or `None` if it does not exist.
    pub fn status_opt(&self, path: &str) -> Result<Option<FileStatus>> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Get, "GETFILESTATUS", path);
        match self.dispatch_non_strict(&call)? {
            Dispatched::Success(response) => Ok(Some(
                response.into_json::<FileStatusEnvelope>()?.file_status,
            )),
            Dispatched::Failure { status: 404, .. } => Ok(None),
            Dispatched::Failure { error, .. } => Err(error),
        }
    }

    /// Names of a directory's entries, in listing order. Raises when the
    /// path is a plain file.
    pub fn list(&self, path: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(path)?;
        let entries = self.list_status_abs(&resolved)?;
        if entries.len() == 1 && entries[0].path_suffix.is_empty() {
            return Err(HdfsError::operation(format!(
                "'{}' is not a directory",
                resolved
            )));
        }
        Ok(entries.into_iter().map(|e| e.path_suffix).collect())
    }

    /// Full status entries of a directory's children. Listing a plain file
    /// yields a single entry with an empty name.
    pub fn list_status(&self, path: &str) -> Result<Vec<FileStatus>> {
        let resolved = self.resolve(path)?;
        self.list_status_abs(&resolved)
    }

    /// `LISTSTATUS` on an already-resolved path. Marker expansion calls this
    /// with intermediate prefixes, so it must not resolve again.
    pub(crate) fn list_status_abs(&self, path: &str) -> Result<Vec<FileStatus>> {
        let call = ApiCall::new(Method::Get, "LISTSTATUS", path);
        let envelope: FileStatusesEnvelope = self.dispatch(&call)?.into_json()?;
        Ok(envelope.file_statuses.file_status)
    }

    /// Recursive byte/file/directory counts for a subtree.
    pub fn content(&self, path: &str) -> Result<ContentSummary> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Get, "GETCONTENTSUMMARY", path);
        Ok(self
            .dispatch(&call)?
            .into_json::<ContentSummaryEnvelope>()?
            .content_summary)
    }

    pub fn checksum(&self, path: &str) -> Result<FileChecksum> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Get, "GETFILECHECKSUM", path);
        Ok(self
            .dispatch(&call)?
            .into_json::<FileChecksumEnvelope>()?
            .file_checksum)
    }

    /// Stream a file's contents, optionally from `offset` and capped at
    /// `length` bytes.
    pub fn open(
        &self,
        path: &str,
        offset: Option<u64>,
        length: Option<u64>,
    ) -> Result<Box<dyn Read>> {
        let path = self.resolve(path)?;
        let mut call = ApiCall::new(Method::Get, "OPEN", path);
        if let Some(offset) = offset {
            call = call.param("offset", offset.to_string());
        }
        if let Some(length) = length {
            call = call.param("length", length.to_string());
        }
        Ok(self.dispatch(&call)?.body)
    }

    /// Write a file. Missing parent directories are created by the server.
    pub fn create(&self, path: &str, data: &[u8], overwrite: bool) -> Result<()> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Put, "CREATE", path)
            .param("overwrite", overwrite.to_string())
            .body(data);
        self.dispatch(&call)?;
        Ok(())
    }

    /// Append to an existing file.
    pub fn append(&self, path: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Post, "APPEND", path).body(data);
        self.dispatch(&call)?;
        Ok(())
    }

    pub fn mkdirs(&self, path: &str) -> Result<bool> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Put, "MKDIRS", path);
        Ok(self.dispatch(&call)?.into_json::<BooleanEnvelope>()?.boolean)
    }

    /// Delete a path. Returns `false` when it did not exist.
    pub fn delete(&self, path: &str, recursive: bool) -> Result<bool> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Delete, "DELETE", path)
            .param("recursive", recursive.to_string());
        Ok(self.dispatch(&call)?.into_json::<BooleanEnvelope>()?.boolean)
    }

    /// Move `src` to `dst`. The remote reports refusals (existing target,
    /// missing parent) as a `false` return, not an error.
    pub fn rename(&self, src: &str, dst: &str) -> Result<bool> {
        let src = self.resolve(src)?;
        let dst = self.resolve(dst)?;
        let call = ApiCall::new(Method::Put, "RENAME", src).param("destination", dst);
        Ok(self.dispatch(&call)?.into_json::<BooleanEnvelope>()?.boolean)
    }

    pub fn set_owner(&self, path: &str, owner: Option<&str>, group: Option<&str>) -> Result<()> {
        let path = self.resolve(path)?;
        let mut call = ApiCall::new(Method::Put, "SETOWNER", path);
        if let Some(owner) = owner {
            call = call.param("owner", owner);
        }
        if let Some(group) = group {
            call = call.param("group", group);
        }
        self.dispatch(&call)?;
        Ok(())
    }

    /// Set permissions from an octal string such as `"755"`.
    pub fn set_permission(&self, path: &str, permission: &str) -> Result<()> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Put, "SETPERMISSION", path).param("permission", permission);
        self.dispatch(&call)?;
        Ok(())
    }

    /// Set modification and/or access time, in milliseconds since the epoch.
    pub fn set_times(
        &self,
        path: &str,
        modification_time: Option<i64>,
        access_time: Option<i64>,
    ) -> Result<()> {
        let path = self.resolve(path)?;
        let mut call = ApiCall::new(Method::Put, "SETTIMES", path);
        if let Some(mtime) = modification_time {
            call = call.param("modificationtime", mtime.to_string());
        }
        if let Some(atime) = access_time {
            call = call.param("accesstime", atime.to_string());
        }
        self.dispatch(&call)?;
        Ok(())
    }

    pub fn set_replication(&self, path: &str, replication: u16) -> Result<bool> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Put, "SETREPLICATION", path)
            .param("replication", replication.to_string());
        Ok(self.dispatch(&call)?.into_json::<BooleanEnvelope>()?.boolean)
    }

    /// Replace a path's ACL with an aclspec such as
    /// `"user::rwx,user=alice:r--,group::r--,other::---"`.
    pub fn set_acl(&self, path: &str, aclspec: &str) -> Result<()> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Put, "SETACL", path).param("aclspec", aclspec);
        self.dispatch(&call)?;
        Ok(())
    }

    pub fn get_acl_status(&self, path: &str) -> Result<AclStatus> {
        let path = self.resolve(path)?;
        let call = ApiCall::new(Method::Get, "GETACLSTATUS", path);
        Ok(self
            .dispatch(&call)?
            .into_json::<AclStatusEnvelope>()?
            .acl_status)
    }
}
