use thiserror::Error;

/// Failures a single submission can end in.
///
/// Every variant is terminal for its own submission only; the form stays
/// usable for the next one.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalyzeError {
    /// Non-2xx response. `message` is the body's `error` member, or the
    /// status text when the body had none.
    #[error("server returned {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server message or status text.
        message: String,
    },
    /// Non-2xx response whose body was not JSON.
    #[error("server returned {status} with a non-JSON body")]
    MalformedErrorBody {
        /// HTTP status code.
        status: u16,
        /// Transport status text.
        status_text: String,
    },
    /// The request never completed.
    #[error("connection to {endpoint} failed: {reason}")]
    Connection {
        /// Transport failure description.
        reason: String,
        /// Endpoint the request targeted.
        endpoint: String,
    },
    /// 2xx response without a usable `results` payload.
    #[error("malformed success response: {reason}")]
    MalformedSuccess {
        /// What was wrong with the body.
        reason: String,
    },
}

impl AnalyzeError {
    /// Text shown in the error panel.
    #[must_use]
    pub fn user_message(&self, guidance: &str) -> String {
        match self {
            Self::Server { status, message } => with_guidance(
                format!("Error {status}: {message}."),
                guidance,
            ),
            Self::MalformedErrorBody {
                status,
                status_text,
            } => with_guidance(format!("Error {status}: {status_text}."), guidance),
            Self::Connection { reason, endpoint } => format!(
                "Connection error: {reason}. Make sure the analysis server is running at {endpoint}"
            ),
            Self::MalformedSuccess { reason } => {
                format!("Unexpected response from the analysis server: {reason}.")
            }
        }
    }

    /// HTTP status attached to the failure, if one was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } | Self::MalformedErrorBody { status, .. } => Some(*status),
            Self::Connection { .. } | Self::MalformedSuccess { .. } => None,
        }
    }

    /// Stable label used in logs and events.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Server { .. } => "server",
            Self::MalformedErrorBody { .. } => "malformed_error_body",
            Self::Connection { .. } => "connection",
            Self::MalformedSuccess { .. } => "malformed_success",
        }
    }
}

fn with_guidance(head: String, guidance: &str) -> String {
    let guidance = guidance.trim();
    if guidance.is_empty() {
        head
    } else {
        format!("{head} {guidance}")
    }
}
