use thiserror::Error;

/// Top-level error type for the `jenkinsfly-api` crate.
///
/// Authentication rejections are kept apart from every other failure so
/// callers can show the server's response body next to the message.
/// `jenkinsfly-core` maps these into connectivity diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The server rejected the credentials or the crumb (HTTP 401/403).
    ///
    /// `body` carries the raw response page, which Jenkins fills with an
    /// HTML explanation worth showing to the user.
    #[error("{message}")]
    Authentication {
        message: String,
        body: Option<String>,
    },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Server ──────────────────────────────────────────────────────
    /// Any other non-success status from the server.
    #[error("Jenkins returned HTTP {status}")]
    Http { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the server refused the supplied credentials.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The raw response body attached to an authentication rejection.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Authentication { body, .. } => body.as_deref(),
            _ => None,
        }
    }
}
