pub mod sanitize;
pub mod risk;
pub mod classify;
pub mod retry;
pub mod source;
pub mod fetch;
pub mod orchestrator;

pub use sanitize::*;
pub use risk::*;
pub use classify::*;
pub use retry::*;
pub use source::*;
pub use fetch::*;
pub use orchestrator::*;

use thiserror::Error;

/// Failure of a single page request against the upstream API.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    #[error("Upstream is not reachable at {0}")]
    Connection(String),

    #[error("HTTP transport error: {0}")]
    Transport(String),

    #[error("Upstream returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("Malformed page body: {0}")]
    Decode(String),
}

impl FetchError {
    /// HTTP status carried by this error, if the request got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Timeouts, refused connections, and broken bodies: the request never completed.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            FetchError::Timeout(_) | FetchError::Connection(_) | FetchError::Transport(_)
        )
    }
}
