//! Test doubles for the HTTP layer.
//!
//! [`ScriptedTransport`] replays canned outcomes per endpoint and is what the
//! dispatcher tests use to simulate dead hosts and standbys. [`FakeRemote`]
//! is a small in-memory filesystem that interprets the `op=` parameter, so
//! operation and transfer tests can run end-to-end without a cluster.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use percent_encoding::percent_decode_str;

use crate::error::{HdfsError, Result};
use crate::transport::{ApiRequest, RawResponse, Transport};

// ===== ScriptedTransport =====

pub(crate) enum FakeOutcome {
    ConnRefused,
    Status(u16, String),
}

/// Replays scripted outcomes per endpoint, recording every request URL.
#[derive(Clone, Default)]
pub(crate) struct ScriptedTransport {
    inner: Arc<Mutex<ScriptState>>,
}

#[derive(Default)]
struct ScriptState {
    outcomes: HashMap<String, VecDeque<FakeOutcome>>,
    requests: Vec<String>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue the next outcome for requests hitting `endpoint`.
    pub(crate) fn on(&self, endpoint: &str, outcome: FakeOutcome) {
        self.inner
            .lock()
            .unwrap()
            .outcomes
            .entry(endpoint.to_string())
            .or_default()
            .push_back(outcome);
    }

    /// Every URL issued so far, in order.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.inner.lock().unwrap().requests.clone()
    }
}

impl Transport for ScriptedTransport {
    fn issue(&self, req: ApiRequest<'_>) -> Result<RawResponse> {
        let mut state = self.inner.lock().unwrap();
        state.requests.push(req.url.clone());
        let outcome = state
            .outcomes
            .get_mut(req.endpoint)
            .and_then(|queue| queue.pop_front());
        match outcome {
            Some(FakeOutcome::ConnRefused) => {
                Err(HdfsError::connection(req.endpoint, "connection refused"))
            }
            Some(FakeOutcome::Status(status, body)) => Ok(RawResponse {
                status,
                body: Box::new(Cursor::new(body.into_bytes())),
            }),
            None => panic!("no scripted outcome for {} ({})", req.endpoint, req.url),
        }
    }
}

// ===== FakeRemote =====

#[derive(Clone)]
enum Node {
    File { data: Vec<u8>, mtime: i64 },
    Dir { mtime: i64 },
}

struct RemoteState {
    nodes: BTreeMap<String, Node>,
    fail_creates: Vec<String>,
    fail_opens: Vec<String>,
    requests: Vec<String>,
    clock: i64,
}

/// In-memory remote filesystem speaking the client's wire protocol.
#[derive(Clone)]
pub(crate) struct FakeRemote {
    state: Arc<Mutex<RemoteState>>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir { mtime: 0 });
        Self {
            state: Arc::new(Mutex::new(RemoteState {
                nodes,
                fail_creates: Vec::new(),
                fail_opens: Vec::new(),
                requests: Vec::new(),
                clock: 1_000,
            })),
        }
    }

    /// Seed a file, creating parent directories.
    pub(crate) fn insert_file(&self, path: &str, data: &[u8]) {
        let mut state = self.state.lock().unwrap();
        state.create_file(path, data.to_vec());
    }

    /// Seed a directory, creating parents.
    pub(crate) fn insert_dir(&self, path: &str) {
        let mut state = self.state.lock().unwrap();
        state.ensure_parents(path);
        if !state.nodes.contains_key(path) {
            let mtime = state.tick();
            state.nodes.insert(path.to_string(), Node::Dir { mtime });
        }
    }

    pub(crate) fn file_content(&self, path: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        match state.nodes.get(path) {
            Some(Node::File { data, .. }) => Some(data.clone()),
            _ => None,
        }
    }

    pub(crate) fn exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().nodes.contains_key(path)
    }

    /// All node paths, sorted. Handy for asserting no staging leftovers.
    pub(crate) fn paths(&self) -> Vec<String> {
        self.state.lock().unwrap().nodes.keys().cloned().collect()
    }

    /// Make every CREATE whose path contains `needle` fail with a server
    /// error. Substring matching lets tests target staging paths whose
    /// timestamp suffix they cannot predict.
    pub(crate) fn fail_create_on(&self, needle: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_creates
            .push(needle.to_string());
    }

    /// Make every OPEN whose path contains `needle` fail with a server error.
    pub(crate) fn fail_open_on(&self, needle: &str) {
        self.state
            .lock()
            .unwrap()
            .fail_opens
            .push(needle.to_string());
    }

    /// `"OP /path"` entries in request order.
    pub(crate) fn request_log(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Transport for FakeRemote {
    fn issue(&self, req: ApiRequest<'_>) -> Result<RawResponse> {
        let (path, params) = parse_url(&req.url);
        let op = params.get("op").cloned().unwrap_or_default();
        let body = req.body.map(|b| b.to_vec()).unwrap_or_default();

        let mut state = self.state.lock().unwrap();
        state.requests.push(format!("{} {}", op, path));
        match op.as_str() {
            "GETHOMEDIRECTORY" => json_response(200, r#"{"Path":"/user/test"}"#.to_string()),
            "GETFILESTATUS" => state.get_file_status(&path),
            "LISTSTATUS" => state.list_status(&path),
            "GETCONTENTSUMMARY" => state.content_summary(&path),
            "OPEN" => {
                let offset = params.get("offset").and_then(|v| v.parse().ok()).unwrap_or(0);
                let length = params.get("length").and_then(|v| v.parse().ok());
                state.open(&path, offset, length)
            }
            "CREATE" => {
                let overwrite = params.get("overwrite").map(|v| v == "true").unwrap_or(false);
                state.create(&path, body, overwrite)
            }
            "APPEND" => state.append(&path, body),
            "MKDIRS" => state.mkdirs(&path),
            "DELETE" => {
                let recursive = params.get("recursive").map(|v| v == "true").unwrap_or(false);
                state.delete(&path, recursive)
            }
            "RENAME" => {
                let destination = params.get("destination").cloned().unwrap_or_default();
                state.rename(&path, &destination)
            }
            other => remote_error(400, "UnsupportedOperationException", other),
        }
    }
}

impl RemoteState {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }

    fn ensure_parents(&mut self, path: &str) {
        let mut parent = parent_of(path);
        let mut missing = Vec::new();
        while !self.nodes.contains_key(&parent) {
            missing.push(parent.clone());
            parent = parent_of(&parent);
        }
        for dir in missing {
            let mtime = self.tick();
            self.nodes.insert(dir, Node::Dir { mtime });
        }
    }

    fn create_file(&mut self, path: &str, data: Vec<u8>) {
        self.ensure_parents(path);
        let mtime = self.tick();
        self.nodes.insert(path.to_string(), Node::File { data, mtime });
    }

    fn children_of(&self, path: &str) -> Vec<(String, &Node)> {
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        self.nodes
            .iter()
            .filter(|(key, _)| {
                key.len() > prefix.len()
                    && key.starts_with(&prefix)
                    && !key[prefix.len()..].contains('/')
            })
            .map(|(key, node)| (key[prefix.len()..].to_string(), node))
            .collect()
    }

    fn get_file_status(&self, path: &str) -> Result<RawResponse> {
        match self.nodes.get(path) {
            Some(node) => json_response(
                200,
                format!(r#"{{"FileStatus":{}}}"#, status_entry("", node)),
            ),
            None => not_found(path),
        }
    }

    fn list_status(&self, path: &str) -> Result<RawResponse> {
        let rows = match self.nodes.get(path) {
            None => return not_found(path),
            Some(node @ Node::File { .. }) => vec![status_entry("", node)],
            Some(Node::Dir { .. }) => self
                .children_of(path)
                .iter()
                .map(|(name, node)| status_entry(name, node))
                .collect(),
        };
        json_response(
            200,
            format!(
                r#"{{"FileStatuses":{{"FileStatus":[{}]}}}}"#,
                rows.join(",")
            ),
        )
    }

    fn content_summary(&self, path: &str) -> Result<RawResponse> {
        if !self.nodes.contains_key(path) {
            return not_found(path);
        }
        let prefix = if path == "/" {
            "/".to_string()
        } else {
            format!("{}/", path)
        };
        let mut length = 0u64;
        let mut files = 0u64;
        let mut dirs = 0u64;
        for (key, node) in &self.nodes {
            if key != path && !key.starts_with(&prefix) {
                continue;
            }
            match node {
                Node::File { data, .. } => {
                    files += 1;
                    length += data.len() as u64;
                }
                Node::Dir { .. } => dirs += 1,
            }
        }
        json_response(
            200,
            format!(
                r#"{{"ContentSummary":{{"directoryCount":{},"fileCount":{},"length":{},"quota":-1,"spaceConsumed":{},"spaceQuota":-1}}}}"#,
                dirs, files, length, length
            ),
        )
    }

    fn open(&self, path: &str, offset: usize, length: Option<usize>) -> Result<RawResponse> {
        if self.fail_opens.iter().any(|needle| path.contains(needle)) {
            return remote_error(500, "IOException", "injected open failure");
        }
        match self.nodes.get(path) {
            None => not_found(path),
            Some(Node::Dir { .. }) => {
                remote_error(400, "InvalidRequestException", &format!("{} is a directory", path))
            }
            Some(Node::File { data, .. }) => {
                let start = offset.min(data.len());
                let end = match length {
                    Some(n) => (start + n).min(data.len()),
                    None => data.len(),
                };
                Ok(RawResponse {
                    status: 200,
                    body: Box::new(Cursor::new(data[start..end].to_vec())),
                })
            }
        }
    }

    fn create(&mut self, path: &str, data: Vec<u8>, overwrite: bool) -> Result<RawResponse> {
        if self.fail_creates.iter().any(|needle| path.contains(needle)) {
            return remote_error(500, "IOException", "injected create failure");
        }
        if matches!(self.nodes.get(path), Some(Node::Dir { .. })) {
            return remote_error(
                403,
                "FileAlreadyExistsException",
                &format!("{} is a directory", path),
            );
        }
        if matches!(self.nodes.get(path), Some(Node::File { .. })) && !overwrite {
            return remote_error(
                403,
                "FileAlreadyExistsException",
                &format!("{} already exists", path),
            );
        }
        self.create_file(path, data);
        json_response(201, String::new())
    }

    fn append(&mut self, path: &str, data: Vec<u8>) -> Result<RawResponse> {
        let mtime = self.tick();
        match self.nodes.get_mut(path) {
            Some(Node::File { data: existing, mtime: m }) => {
                existing.extend_from_slice(&data);
                *m = mtime;
                json_response(200, String::new())
            }
            Some(Node::Dir { .. }) => {
                remote_error(400, "InvalidRequestException", &format!("{} is a directory", path))
            }
            None => not_found(path),
        }
    }

    fn mkdirs(&mut self, path: &str) -> Result<RawResponse> {
        if matches!(self.nodes.get(path), Some(Node::File { .. })) {
            return remote_error(
                403,
                "ParentNotDirectoryException",
                &format!("{} is a file", path),
            );
        }
        self.ensure_parents(path);
        if !self.nodes.contains_key(path) {
            let mtime = self.tick();
            self.nodes.insert(path.to_string(), Node::Dir { mtime });
        }
        json_response(200, r#"{"boolean":true}"#.to_string())
    }

    fn delete(&mut self, path: &str, recursive: bool) -> Result<RawResponse> {
        if path == "/" {
            return remote_error(403, "IOException", "cannot delete root");
        }
        if !self.nodes.contains_key(path) {
            return json_response(200, r#"{"boolean":false}"#.to_string());
        }
        let prefix = format!("{}/", path);
        let has_children = self.nodes.keys().any(|key| key.starts_with(&prefix));
        if has_children && !recursive {
            return remote_error(
                403,
                "PathIsNotEmptyDirectoryException",
                &format!("{} is non empty", path),
            );
        }
        self.nodes
            .retain(|key, _| key != path && !key.starts_with(&prefix));
        json_response(200, r#"{"boolean":true}"#.to_string())
    }

    fn rename(&mut self, src: &str, dst: &str) -> Result<RawResponse> {
        let moved = self.try_rename(src, dst);
        json_response(200, format!(r#"{{"boolean":{}}}"#, moved))
    }

    fn try_rename(&mut self, src: &str, dst: &str) -> bool {
        if src == "/" || !self.nodes.contains_key(src) || self.nodes.contains_key(dst) {
            return false;
        }
        if !matches!(self.nodes.get(&parent_of(dst)), Some(Node::Dir { .. })) {
            return false;
        }
        let src_prefix = format!("{}/", src);
        let subtree: Vec<(String, Node)> = self
            .nodes
            .iter()
            .filter(|(key, _)| key.as_str() == src || key.starts_with(&src_prefix))
            .map(|(key, node)| (key.clone(), node.clone()))
            .collect();
        for (key, node) in subtree {
            self.nodes.remove(&key);
            let renamed = format!("{}{}", dst, &key[src.len()..]);
            self.nodes.insert(renamed, node);
        }
        true
    }
}

// ===== helpers =====

fn parse_url(url: &str) -> (String, HashMap<String, String>) {
    let after = url.splitn(2, "/webhdfs/v1").nth(1).unwrap_or("");
    let (raw_path, raw_query) = match after.split_once('?') {
        Some((path, query)) => (path, query),
        None => (after, ""),
    };
    let path = percent_decode_str(raw_path).decode_utf8_lossy().to_string();
    let path = if path.is_empty() { "/".to_string() } else { path };
    let mut params = HashMap::new();
    for pair in raw_query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params.insert(
            key.to_string(),
            percent_decode_str(value).decode_utf8_lossy().to_string(),
        );
    }
    (path, params)
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn status_entry(name: &str, node: &Node) -> String {
    let (kind, length, mtime, permission, replication) = match node {
        Node::File { data, mtime } => ("FILE", data.len() as u64, *mtime, "644", 3),
        Node::Dir { mtime } => ("DIRECTORY", 0, *mtime, "755", 0),
    };
    format!(
        r#"{{"pathSuffix":"{}","type":"{}","length":{},"modificationTime":{},"accessTime":0,"blockSize":134217728,"owner":"test","group":"supergroup","permission":"{}","replication":{}}}"#,
        name, kind, length, mtime, permission, replication
    )
}

fn json_response(status: u16, body: String) -> Result<RawResponse> {
    Ok(RawResponse {
        status,
        body: Box::new(Cursor::new(body.into_bytes())),
    })
}

fn remote_error(status: u16, exception: &str, message: &str) -> Result<RawResponse> {
    json_response(
        status,
        format!(
            r#"{{"RemoteException":{{"exception":"{}","message":"{}"}}}}"#,
            exception, message
        ),
    )
}

fn not_found(path: &str) -> Result<RawResponse> {
    remote_error(
        404,
        "FileNotFoundException",
        &format!("File does not exist: {}", path),
    )
}
