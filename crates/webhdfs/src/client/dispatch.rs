//! Operation dispatch with endpoint failover.
//!
//! Every remote call funnels through [`Client::dispatch`]: build the request
//! URL for the current endpoint, send it, classify the outcome, and either
//! return, rotate to the next endpoint, or raise. The rotation cursor lives
//! on the client and persists across calls, so once a standby is skipped the
//! following calls start at the endpoint that last answered.

use std::collections::HashSet;
use std::sync::Mutex;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{Auth, Client};
use crate::error::{HdfsError, Result};
use crate::transport::{ApiRequest, Method, RawResponse};

/// Characters escaped in the path portion of a request URL. `/` is kept so
/// the path retains its structure on the wire.
const PATH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Characters escaped in query parameter values.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Ordered endpoint list plus the shared rotation cursor.
///
/// The cursor always names the endpoint the next call should try first. It
/// only moves on success, so every thread keeps benefiting from a completed
/// failover instead of rediscovering the dead hosts.
pub(crate) struct EndpointRotator {
    endpoints: Vec<String>,
    cursor: Mutex<usize>,
}

impl EndpointRotator {
    pub(crate) fn new(endpoints: Vec<String>) -> Self {
        Self {
            endpoints,
            cursor: Mutex::new(0),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Next endpoint at or after the cursor that the current call has not
    /// tried yet, or `None` once the attempted set covers all of them.
    pub(crate) fn next_untried(&self, attempted: &HashSet<usize>) -> Option<(usize, String)> {
        let start = *self.cursor.lock().unwrap();
        let len = self.endpoints.len();
        (0..len)
            .map(|offset| (start + offset) % len)
            .find(|index| !attempted.contains(index))
            .map(|index| (index, self.endpoints[index].clone()))
    }

    /// Park the cursor on the endpoint that just served a successful call.
    pub(crate) fn mark_success(&self, index: usize) {
        *self.cursor.lock().unwrap() = index;
    }
}

/// One logical API operation, before an endpoint is chosen.
#[derive(Debug)]
pub(crate) struct ApiCall<'a> {
    pub method: Method,
    pub op: &'static str,
    pub path: String,
    params: Vec<(&'static str, String)>,
    body: Option<&'a [u8]>,
}

impl<'a> ApiCall<'a> {
    pub(crate) fn new(method: Method, op: &'static str, path: impl Into<String>) -> Self {
        Self {
            method,
            op,
            path: path.into(),
            params: Vec::new(),
            body: None,
        }
    }

    pub(crate) fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.params.push((key, value.into()));
        self
    }

    pub(crate) fn body(mut self, data: &'a [u8]) -> Self {
        self.body = Some(data);
        self
    }
}

/// Outcome of a non-strict dispatch: either a 2xx response, or the failed
/// response together with its classified error.
#[derive(Debug)]
pub(crate) enum Dispatched {
    Success(RawResponse),
    Failure {
        error: HdfsError,
        status: u16,
        body: Vec<u8>,
    },
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionEnvelope {
    #[serde(rename = "RemoteException")]
    remote_exception: RemoteExceptionBody,
}

#[derive(Debug, Deserialize)]
struct RemoteExceptionBody {
    exception: String,
    message: String,
}

/// Turn a non-2xx response into a typed error.
///
/// 401 is a credential problem and gets its own variant so the dispatcher
/// never retries it. Anything else is expected to carry the protocol's
/// `RemoteException` JSON payload; responses that do not parse keep the raw
/// body text as the message.
fn classify_failure(endpoint: &str, status: u16, body: &[u8]) -> HdfsError {
    if status == 401 {
        return HdfsError::AuthFailure {
            endpoint: endpoint.to_string(),
        };
    }
    match serde_json::from_slice::<RemoteExceptionEnvelope>(body) {
        Ok(envelope) => HdfsError::remote(
            status,
            envelope.remote_exception.exception,
            envelope.remote_exception.message,
        ),
        Err(_) => {
            let text = String::from_utf8_lossy(body);
            let text = text.trim();
            let message = if text.is_empty() {
                format!("server returned HTTP {}", status)
            } else {
                text.to_string()
            };
            HdfsError::remote(status, "HttpError", message)
        }
    }
}

impl Client {
    /// Issue one API operation, failing over across endpoints. Raises on any
    /// non-retriable failure.
    pub(crate) fn dispatch(&self, call: &ApiCall<'_>) -> Result<RawResponse> {
        match self.dispatch_inner(call, true)? {
            Dispatched::Success(response) => Ok(response),
            // Unreachable in strict mode; kept total for the type.
            Dispatched::Failure { error, .. } => Err(error),
        }
    }

    /// Like [`Client::dispatch`], but a fatal remote error is handed back as
    /// a [`Dispatched::Failure`] instead of raised. Connection and
    /// standby failures still rotate, and endpoint exhaustion still raises.
    pub(crate) fn dispatch_non_strict(&self, call: &ApiCall<'_>) -> Result<Dispatched> {
        self.dispatch_inner(call, false)
    }

    fn dispatch_inner(&self, call: &ApiCall<'_>, strict: bool) -> Result<Dispatched> {
        let mut attempted: HashSet<usize> = HashSet::new();
        let mut last_error: Option<HdfsError> = None;

        while let Some((index, endpoint)) = self.rotator.next_untried(&attempted) {
            debug!("{} {} via {}", call.op, call.path, endpoint);
            let request = ApiRequest {
                method: call.method,
                endpoint: &endpoint,
                url: self.build_url(&endpoint, call),
                body: call.body,
            };
            match self.transport.issue(request) {
                Ok(response) if response.is_success() => {
                    self.rotator.mark_success(index);
                    return Ok(Dispatched::Success(response));
                }
                Ok(response) => {
                    let status = response.status;
                    let body = response.into_bytes()?;
                    let error = classify_failure(&endpoint, status, &body);
                    if error.is_retriable() {
                        debug!("Endpoint {} not usable ({}), rotating", endpoint, error);
                        attempted.insert(index);
                        last_error = Some(error);
                        continue;
                    }
                    if !strict {
                        return Ok(Dispatched::Failure {
                            error,
                            status,
                            body,
                        });
                    }
                    return Err(error);
                }
                Err(error) => {
                    debug!("Endpoint {} unreachable ({}), rotating", endpoint, error);
                    attempted.insert(index);
                    last_error = Some(error);
                }
            }
        }

        if self.rotator.len() > 1 {
            warn!(
                "No endpoint out of {} answered for {}",
                self.rotator.len(),
                call.op
            );
        }
        Err(last_error
            .unwrap_or_else(|| HdfsError::operation(format!("no endpoints configured for {}", call.op))))
    }

    /// `<endpoint>/webhdfs/v1<path>?op=<OP>&<params>` with auth parameters
    /// appended last.
    fn build_url(&self, endpoint: &str, call: &ApiCall<'_>) -> String {
        let mut url = format!(
            "{}/webhdfs/v1{}?op={}",
            endpoint,
            utf8_percent_encode(&call.path, PATH_ENCODE_SET),
            call.op
        );
        for (key, value) in &call.params {
            push_param(&mut url, key, value);
        }
        match &self.auth {
            Auth::None => {}
            Auth::User(name) => push_param(&mut url, "user.name", name),
            Auth::Token(token) => push_param(&mut url, "delegation", token),
        }
        if let Some(proxy) = &self.proxy_user {
            push_param(&mut url, "doas", proxy);
        }
        url
    }
}

fn push_param(url: &mut String, key: &str, value: &str) {
    url.push('&');
    url.push_str(key);
    url.push('=');
    url.push_str(&utf8_percent_encode(value, QUERY_ENCODE_SET).to_string());
}
