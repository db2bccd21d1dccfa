//! Error taxonomy of the query engine
//!
//! Endpoint-local kinds (`ClientError`, `ServerError`, `Decode`) only drive
//! endpoint fallback and never reach check routines. Everything else is fatal
//! for the query and ends up as an UNKNOWN contribution.

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// Network-level failure (connect, timeout, redirect loop)
    #[error("{0}")]
    Transport(String),

    #[error("HTTP error {status} from {path}")]
    ClientError { status: u16, path: String },

    #[error("HTTP server error {status} from {path}")]
    ServerError { status: u16, path: String },

    #[error("Unreadable response from {path}: {reason}")]
    Decode { path: String, reason: String },

    /// The device dropped the session; recoverable once by logging in again
    #[error("Not authorized")]
    AuthorizationExpired,

    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("Admin has already logged in from another host")]
    SessionConflict,

    #[error("No endpoint satisfied query {query} ({attempts} candidates tried)")]
    NoEndpointSatisfied { query: String, attempts: usize },

    #[error("{0}")]
    UnparseableMetric(String),

    #[error("Session store error: {0}")]
    Storage(#[from] std::io::Error),
}

impl CheckError {
    /// Failures that are specific to one endpoint variant, so another
    /// candidate may still answer
    pub fn is_endpoint_local(&self) -> bool {
        matches!(
            self,
            CheckError::ClientError { .. } | CheckError::ServerError { .. } | CheckError::Decode { .. }
        )
    }

    pub fn unparseable(message: impl Into<String>) -> Self {
        CheckError::UnparseableMetric(message.into())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
