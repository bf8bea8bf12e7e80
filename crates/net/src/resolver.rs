//! Ordered network path resolution.
//!
//! A logical request is attempted over each configured [`NetworkPath`] in
//! declared order. Transport errors and responses rejected by the caller's
//! [`AcceptPolicy`] move on to the next path; the first accepted response
//! wins. Nothing is cached between calls.

use std::fmt;
use std::sync::Arc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::transport::{HttpResponse, HttpTransport, LogicalRequest};

/// Characters left unescaped, matching JavaScript's `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// One physical route to a target URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NetworkPath {
    /// Target URL sent unmodified.
    Direct,
    /// Target URL percent-encoded and appended to `prefix`,
    /// e.g. `https://relay.example/raw?url=`.
    Relay { prefix: String },
}

impl NetworkPath {
    pub fn relay(prefix: impl Into<String>) -> Self {
        Self::Relay {
            prefix: prefix.into(),
        }
    }

    /// Rewrites a logical request into the physical request for this path.
    pub fn apply(&self, request: &LogicalRequest) -> LogicalRequest {
        match self {
            Self::Direct => request.clone(),
            Self::Relay { prefix } => {
                let mut physical = request.clone();
                physical.url = format!(
                    "{prefix}{}",
                    utf8_percent_encode(&request.url, URI_COMPONENT)
                );
                physical
            }
        }
    }

    /// Short label for logs and diagnostics.
    pub fn label(&self) -> String {
        match self {
            Self::Direct => "direct".into(),
            Self::Relay { prefix } => {
                let host = prefix
                    .split("://")
                    .nth(1)
                    .unwrap_or(prefix.as_str())
                    .split(['/', '?'])
                    .next()
                    .unwrap_or_default();
                format!("relay:{host}")
            }
        }
    }
}

/// Ordered list of paths the resolver tries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub paths: Vec<NetworkPath>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            paths: vec![
                NetworkPath::Direct,
                NetworkPath::relay("https://corsproxy.io/?"),
                NetworkPath::relay("https://api.allorigins.win/raw?url="),
            ],
        }
    }
}

/// Why a returned response was not accepted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("non-success status")]
    Status,

    #[error("markup content type")]
    Markup,

    #[error("payload too small ({len} <= {min} bytes)")]
    TooSmall { len: usize, min: usize },

    #[error("{0}")]
    Other(String),
}

impl Rejection {
    /// True for rejections produced by content sanity checks rather than
    /// by the HTTP status line.
    pub fn is_content(&self) -> bool {
        matches!(self, Self::Markup | Self::TooSmall { .. })
    }
}

type Validator<'a> = dyn Fn(&HttpResponse) -> Result<(), Rejection> + Send + Sync + 'a;

/// Decides whether a response returned over a path ends resolution.
#[derive(Clone, Copy)]
pub enum AcceptPolicy<'a> {
    /// Any response the transport returned is accepted for inspection.
    AnyResponse,
    /// Only 2xx responses are accepted.
    SuccessOnly,
    /// Caller-supplied check, applied to every path's response.
    Custom(&'a Validator<'a>),
}

impl AcceptPolicy<'_> {
    fn check(&self, resp: &HttpResponse) -> Result<(), Rejection> {
        match self {
            Self::AnyResponse => Ok(()),
            Self::SuccessOnly => {
                if resp.is_success() {
                    Ok(())
                } else {
                    Err(Rejection::Status)
                }
            }
            Self::Custom(check) => check(resp),
        }
    }
}

/// What happened on one path.
#[derive(Debug, Clone, PartialEq)]
pub enum PathOutcome {
    /// The transport raised before a response arrived.
    Transport(String),
    /// A response arrived but the policy rejected it.
    Rejected { status: u16, reason: Rejection },
}

/// Diagnostic record of one path attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PathAttempt {
    pub path: String,
    pub outcome: PathOutcome,
}

/// Every configured path failed.
#[derive(Debug, Clone, thiserror::Error)]
#[error("all network paths failed for {url}: {}", describe_attempts(.attempts))]
pub struct NetworkFailure {
    pub url: String,
    pub attempts: Vec<PathAttempt>,
    /// The last response that was received and rejected, if any.
    pub last_response: Option<HttpResponse>,
}

impl NetworkFailure {
    /// Status of the last rejected response.
    pub fn last_status(&self) -> Option<u16> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            PathOutcome::Rejected { status, .. } => Some(*status),
            PathOutcome::Transport(_) => None,
        })
    }

    /// Message of the last transport error.
    pub fn last_error(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            PathOutcome::Transport(e) => Some(e.as_str()),
            PathOutcome::Rejected { .. } => None,
        })
    }

    /// True when every path returned a response that failed a content check.
    pub fn all_content_rejections(&self) -> bool {
        !self.attempts.is_empty()
            && self.attempts.iter().all(|a| {
                matches!(&a.outcome, PathOutcome::Rejected { reason, .. } if reason.is_content())
            })
    }

    /// True when no path produced any HTTP response.
    pub fn transport_only(&self) -> bool {
        self.attempts
            .iter()
            .all(|a| matches!(a.outcome, PathOutcome::Transport(_)))
    }
}

fn describe_attempts(attempts: &[PathAttempt]) -> String {
    attempts
        .iter()
        .map(|a| match &a.outcome {
            PathOutcome::Transport(e) => format!("{}: {e}", a.path),
            PathOutcome::Rejected { status, reason } => format!("{}: {status} {reason}", a.path),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Stateless multi-path resolver.
#[derive(Clone)]
pub struct Resolver {
    transport: Arc<dyn HttpTransport>,
    paths: Vec<NetworkPath>,
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("paths", &self.paths)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Creates a resolver. An empty path list falls back to direct only.
    pub fn new(transport: Arc<dyn HttpTransport>, config: &ResolverConfig) -> Self {
        let paths = if config.paths.is_empty() {
            vec![NetworkPath::Direct]
        } else {
            config.paths.clone()
        };
        Self { transport, paths }
    }

    pub fn paths(&self) -> &[NetworkPath] {
        &self.paths
    }

    /// Tries each path in order and returns the first accepted response.
    pub async fn resolve(
        &self,
        request: &LogicalRequest,
        policy: AcceptPolicy<'_>,
    ) -> Result<HttpResponse, NetworkFailure> {
        let mut attempts = Vec::with_capacity(self.paths.len());
        let mut last_response = None;

        for path in &self.paths {
            let label = path.label();
            let physical = path.apply(request);

            match self.transport.send(physical).await {
                Ok(resp) => match policy.check(&resp) {
                    Ok(()) => {
                        debug!(
                            path = %label,
                            url = %request.url,
                            status = resp.status,
                            "path accepted"
                        );
                        return Ok(resp);
                    }
                    Err(reason) => {
                        debug!(
                            path = %label,
                            url = %request.url,
                            status = resp.status,
                            reason = %reason,
                            "path response rejected"
                        );
                        attempts.push(PathAttempt {
                            path: label,
                            outcome: PathOutcome::Rejected {
                                status: resp.status,
                                reason,
                            },
                        });
                        last_response = Some(resp);
                    }
                },
                Err(e) => {
                    debug!(path = %label, url = %request.url, error = %e, "path transport failed");
                    attempts.push(PathAttempt {
                        path: label,
                        outcome: PathOutcome::Transport(e.to_string()),
                    });
                }
            }
        }

        let failure = NetworkFailure {
            url: request.url.clone(),
            attempts,
            last_response,
        };
        warn!(url = %request.url, "{failure}");
        Err(failure)
    }
}
