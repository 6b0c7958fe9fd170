//! Failure classification for data-fetching errors.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Markers that identify "no response was received at all".
const NETWORK_FAILURE_MARKERS: &[&str] = &[
    "NETWORK_ERROR",
    "ERR_NETWORK",
    "ERR_INTERNET_DISCONNECTED",
    "ERR_CONNECTION_REFUSED",
    "ERR_CONNECTION_RESET",
    "ERR_CONNECTION_CLOSED",
    "ERR_NAME_NOT_RESOLVED",
    "ECONNREFUSED",
    "NetworkError",
    "Failed to fetch",
    "Network request failed",
];

/// Error as reported by the external fetch layer.
///
/// `ERR_NETWORK` also covers `ERR_NETWORK_CHANGED` and
/// `ERR_NETWORK_ACCESS_DENIED` because markers match as substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    /// HTTP-style status, present whenever a response was received.
    #[serde(alias = "statusCode")]
    pub status: Option<u16>,
    /// Machine-readable error code (e.g. `NETWORK_ERROR`).
    pub code: Option<String>,
    pub message: Option<String>,
}

impl QueryError {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn class(&self) -> FailureClass {
        FailureClass::classify(self)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.code, &self.message) {
            (Some(status), _, Some(msg)) => write!(f, "status {}: {}", status, msg),
            (Some(status), _, None) => write!(f, "status {}", status),
            (None, Some(code), Some(msg)) => write!(f, "{}: {}", code, msg),
            (None, Some(code), None) => f.write_str(code),
            (None, None, Some(msg)) => f.write_str(msg),
            (None, None, None) => f.write_str("unknown error"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Coarse failure class driving retry and poll decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// No response at all: offline, refused, DNS failure.
    NetworkUnreachable,
    /// A response with a failure status was received.
    ServerRejected,
    Other,
}

impl FailureClass {
    pub fn classify(error: &QueryError) -> Self {
        if error.status.is_some() {
            return FailureClass::ServerRejected;
        }
        let matches = |text: &Option<String>| {
            text.as_deref()
                .map(|t| NETWORK_FAILURE_MARKERS.iter().any(|m| t.contains(m)))
                .unwrap_or(false)
        };
        if matches(&error.code) || matches(&error.message) {
            FailureClass::NetworkUnreachable
        } else {
            FailureClass::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::NetworkUnreachable => "network_unreachable",
            FailureClass::ServerRejected => "server_rejected",
            FailureClass::Other => "other",
        }
    }
}
