// ── Connectivity checks ──
//
// The reconciler never talks HTTP itself. It hands an `AuthRequest` to a
// `ConnectivityChecker` and classifies what comes back into one of three
// outcomes. `JenkinsConnectivity` is the production checker.

use std::future::Future;

use secrecy::SecretString;
use thiserror::Error;
use tracing::debug;
use url::Url;

use jenkinsfly_api::{JenkinsClient, TransportConfig};

use crate::JenkinsVersion;

/// Everything needed for one authentication round-trip, already resolved
/// from the form and the stored credentials.
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub crumb_data: String,
    pub version: JenkinsVersion,
}

/// Why a connectivity check failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectivityError {
    /// The server refused the credentials. `body` is the server's
    /// explanation, when it sent one.
    #[error("{message}")]
    Authentication {
        message: String,
        body: Option<String>,
    },

    /// Anything else: unreachable host, TLS, unexpected status.
    #[error("{message}")]
    Other { message: String },
}

impl From<jenkinsfly_api::Error> for ConnectivityError {
    fn from(err: jenkinsfly_api::Error) -> Self {
        match err {
            jenkinsfly_api::Error::Authentication { message, body } => {
                ConnectivityError::Authentication { message, body }
            }
            other => ConnectivityError::Other {
                message: other.to_string(),
            },
        }
    }
}

/// Performs the network round-trip that validates a URL/credential pair.
pub trait ConnectivityChecker: Send + Sync + 'static {
    fn authenticate(
        &self,
        request: &AuthRequest,
    ) -> impl Future<Output = Result<(), ConnectivityError>> + Send;
}

/// Checks connectivity against a real Jenkins server.
pub struct JenkinsConnectivity {
    client: JenkinsClient,
}

impl JenkinsConnectivity {
    pub fn new(transport: &TransportConfig) -> Result<Self, ConnectivityError> {
        Ok(Self {
            client: JenkinsClient::new(transport)?,
        })
    }

    pub fn with_client(client: JenkinsClient) -> Self {
        Self { client }
    }
}

impl ConnectivityChecker for JenkinsConnectivity {
    async fn authenticate(&self, request: &AuthRequest) -> Result<(), ConnectivityError> {
        let info = self
            .client
            .authenticate(
                &request.url,
                &request.username,
                &request.password,
                &request.crumb_data,
                request.version,
            )
            .await?;
        debug!(server_version = ?info.version, "connectivity check passed");
        Ok(())
    }
}

// ── Outcome classification ──────────────────────────────────────────

/// The three ways a connection test can end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionOutcome {
    Success,
    AuthenticationFailed {
        message: String,
        body: Option<String>,
    },
    Failed {
        message: String,
    },
}

impl From<Result<(), ConnectivityError>> for ConnectionOutcome {
    fn from(result: Result<(), ConnectivityError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(ConnectivityError::Authentication { message, body }) => {
                Self::AuthenticationFailed { message, body }
            }
            Err(ConnectivityError::Other { message }) => Self::Failed { message },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTone {
    Positive,
    Negative,
}

/// What the form shows next to the test button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionFeedback {
    pub tone: FeedbackTone,
    pub text: String,
    pub outcome: ConnectionOutcome,
}

impl ConnectionFeedback {
    pub fn from_outcome(outcome: ConnectionOutcome) -> Self {
        let (tone, text) = match &outcome {
            ConnectionOutcome::Success => (FeedbackTone::Positive, "Successful".to_owned()),
            ConnectionOutcome::AuthenticationFailed { message, .. }
            | ConnectionOutcome::Failed { message } => {
                (FeedbackTone::Negative, format!("[Fail] {message}"))
            }
        };
        Self {
            tone,
            text,
            outcome,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == ConnectionOutcome::Success
    }

    /// The server's response body, for an authentication failure that
    /// came with a non-blank one.
    pub fn diagnostic(&self) -> Option<&str> {
        match &self.outcome {
            ConnectionOutcome::AuthenticationFailed {
                body: Some(body), ..
            } if !body.trim().is_empty() => Some(body),
            _ => None,
        }
    }
}
