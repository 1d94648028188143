//! Settings reconciliation between a settings form and persisted Jenkins
//! settings.
//!
//! The crate keeps three views consistent: the values a user is editing
//! ([`FormState`]), the persisted records ([`AppSettings`] for the whole
//! application, [`CredentialSettings`] per project), and the server's
//! verdict on a URL/credential pair.
//!
//! - **[`reconciler`]**: `load`, `is_modified`, `apply`, and connection
//!   tests. `apply` is all-or-nothing behind [`validate`] and forgets
//!   favorites and the last selected view when the server changes.
//!
//! - **[`ConnectivityChecker`]**: The seam to the network.
//!   [`JenkinsConnectivity`] is the `jenkinsfly-api` backed implementation;
//!   tests substitute their own.
//!
//! - **[`ConnectionTester`]**: Runs a check on a tokio task and posts the
//!   [`ConnectionEvent`] back over an `mpsc` channel. Results that arrive
//!   after the tester is closed or dropped are discarded.

pub mod connectivity;
pub mod form;
pub mod reconciler;
pub mod settings;
pub mod tester;
pub mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use connectivity::{
    AuthRequest, ConnectionFeedback, ConnectionOutcome, ConnectivityChecker, ConnectivityError,
    FeedbackTone, JenkinsConnectivity,
};
pub use form::{FormState, InputRejected, NumericInput};
pub use reconciler::{
    ApplyReport, SettingsReconciler, apply, deliver_connection_outcome, is_modified, load,
    prepare_connection_test,
};
pub use settings::{AppSettings, CredentialSettings, DEFAULT_SERVER_URL, DEFAULT_SUFFIX, FavoriteJob};
pub use tester::{ConnectionEvent, ConnectionTester};
pub use validation::{Field, FieldError, UnknownField, ValidationErrors, is_well_formed_url, validate};

pub use jenkinsfly_api::{JenkinsVersion, TlsMode, TransportConfig};
