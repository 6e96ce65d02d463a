//! Error taxonomy for the Salesforce sign-in and query flow.
//!
//! Every failure a request can hit ends up as one of these variants. The web
//! layer maps them to an HTTP status; nothing here is retried and nothing is
//! fatal to the server process.

use serde::Deserialize;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Bad client credentials, an expired or invalid token, or an OAuth denial.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Salesforce could not be reached, or the request timed out.
    #[error("could not reach Salesforce: {0}")]
    Transport(#[from] reqwest::Error),

    /// Salesforce answered with a body we could not make sense of.
    #[error("unexpected response from Salesforce: {0}")]
    Protocol(String),

    /// The SOQL statement was rejected.
    #[error("{message}")]
    Query {
        message: String,
        error_code: Option<String>,
    },

    /// Any other non-success status from Salesforce.
    #[error("Salesforce returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the caller should sign in again.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Auth(_))
    }

    /// True for failures where a recent cached payload is still a useful answer.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(_) | Error::Protocol(_) => true,
            Error::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Transport(e) if e.is_timeout())
    }
}

/// One entry of the error array Salesforce returns from its REST endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub message: String,
    #[serde(rename = "errorCode")]
    pub error_code: Option<String>,
}

/// Extracts the first `message`/`errorCode` pair from a REST error body.
///
/// Salesforce returns `[{"message": "...", "errorCode": "..."}]`. When the body
/// has any other shape the raw text is used as the message.
pub fn parse_api_error(body: &str) -> (String, Option<String>) {
    match serde_json::from_str::<Vec<ApiErrorBody>>(body) {
        Ok(mut errors) if !errors.is_empty() => {
            let first = errors.swap_remove(0);
            (first.message, first.error_code)
        }
        _ => (body.to_string(), None),
    }
}
