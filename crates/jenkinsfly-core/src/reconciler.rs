// ── Settings reconciliation ──
//
// Keeps three things consistent: the form the user is editing, the two
// persisted records, and the server's verdict on the credentials.
//
//   load    persisted -> form
//   apply   form -> persisted, all-or-nothing behind `validate`
//   test    form -> checker -> feedback (+ password confirmed on the form)
//
// The pure steps are free functions. `SettingsReconciler` adds the
// checker for the one step that needs the network.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};
use url::Url;

use crate::connectivity::{AuthRequest, ConnectionFeedback, ConnectionOutcome, ConnectivityChecker};
use crate::form::FormState;
use crate::settings::{AppSettings, CredentialSettings};
use crate::tester::{ConnectionEvent, ConnectionTester};
use crate::validation::{self, FieldError, ValidationErrors};

/// What a successful `apply` changed, for callers that persist or report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// The server URL changed; favorites and the last view were dropped.
    pub server_changed: bool,
    /// A newly typed password was written to the credential record.
    pub password_changed: bool,
}

/// Populate a fresh form from the persisted records.
///
/// The stored password is copied only when a username is stored too. The
/// password counts as unmodified right after loading, so `apply` can tell
/// an untouched field from a retyped one.
pub fn load(app: &AppSettings, creds: &CredentialSettings) -> FormState {
    FormState::from_settings(app, creds)
}

/// Whether the form differs from what is persisted.
///
/// The protocol version and the cached server selections are not part
/// of the comparison.
pub fn is_modified(form: &FormState, app: &AppSettings, creds: &CredentialSettings) -> bool {
    let credential_modified = creds.username != form.username || form.is_password_modified();

    let status_filter_modified = form.display_success_or_stable != app.display_success_or_stable
        || form.display_unstable_or_fail != app.display_unstable_or_fail
        || form.display_aborted != app.display_aborted
        || app.jobs_filter_pattern != form.jobs_filter_pattern;

    app.server_url != form.server_url
        || app.build_delay != form.build_delay()
        || app.job_refresh_period != form.job_refresh_period()
        || app.rss_refresh_period != form.rss_refresh_period()
        || creds.crumb_data != form.crumb_data
        || credential_modified
        || status_filter_modified
        || app.suffix != form.suffix
}

/// Commit the form into the persisted records.
///
/// Validation runs first; on failure neither record is touched. Pointing
/// at a different server drops the favorites and last-selected view
/// before the new URL is written. The password is only written when it
/// was edited, and the form's password counts as unmodified afterwards.
pub fn apply(
    form: &mut FormState,
    app: &mut AppSettings,
    creds: &mut CredentialSettings,
) -> Result<ApplyReport, ValidationErrors> {
    validation::validate(form, creds)?;

    let server_changed = app.server_url != form.server_url;
    if server_changed {
        info!(
            from = %app.server_url,
            to = %form.server_url,
            favorites = creds.favorite_jobs.len(),
            "server changed; forgetting favorites and last selected view"
        );
        creds.forget_server_selections();
    }

    app.server_url.clone_from(&form.server_url);
    app.build_delay = form.build_delay();
    app.job_refresh_period = form.job_refresh_period();
    app.rss_refresh_period = form.rss_refresh_period();
    creds.crumb_data.clone_from(&form.crumb_data);

    app.display_success_or_stable = form.display_success_or_stable;
    app.display_unstable_or_fail = form.display_unstable_or_fail;
    app.display_aborted = form.display_aborted;
    app.suffix.clone_from(&form.suffix);

    if form.username.trim().is_empty() {
        form.username.clear();
        creds.username.clear();
    } else {
        creds.username.clone_from(&form.username);
    }

    let password_changed = form.is_password_modified();
    if password_changed {
        creds.password = form.password().clone();
    }
    form.mark_password_clean();

    let version = form.effective_version();
    creds.version = version;
    form.version = Some(version);

    app.jobs_filter_pattern.clone_from(&form.jobs_filter_pattern);

    debug!(server_changed, password_changed, "settings applied");
    Ok(ApplyReport {
        server_changed,
        password_changed,
    })
}

/// Validate the form and resolve what a connection test should send.
///
/// A password typed since the last load wins; otherwise the stored one
/// is used.
pub fn prepare_connection_test(
    form: &FormState,
    creds: &CredentialSettings,
) -> Result<AuthRequest, ValidationErrors> {
    validation::validate(form, creds)?;

    let raw_url = form.server_url.trim();
    let url = Url::parse(raw_url)
        .map_err(|_| ValidationErrors::single(FieldError::malformed_url(raw_url)))?;

    let password = if form.is_password_modified() {
        form.password().clone()
    } else {
        creds.password.clone()
    };

    Ok(AuthRequest {
        url,
        username: form.username.clone(),
        password,
        crumb_data: form.crumb_data.clone(),
        version: form.effective_version(),
    })
}

/// Turn a finished check into feedback for the form.
///
/// On success the password that was sent is written into the form, so
/// the field shows what the server accepted. The modified flag is left
/// as it was: only `apply` persists.
pub fn deliver_connection_outcome(
    form: &mut FormState,
    request: &AuthRequest,
    outcome: ConnectionOutcome,
) -> ConnectionFeedback {
    if outcome == ConnectionOutcome::Success {
        form.confirm_password(request.password.clone());
    }
    ConnectionFeedback::from_outcome(outcome)
}

/// Runs connection tests for a form through a [`ConnectivityChecker`].
pub struct SettingsReconciler<C> {
    checker: Arc<C>,
}

impl<C: ConnectivityChecker> SettingsReconciler<C> {
    pub fn new(checker: C) -> Self {
        Self {
            checker: Arc::new(checker),
        }
    }

    pub fn from_shared(checker: Arc<C>) -> Self {
        Self { checker }
    }

    pub fn checker(&self) -> &Arc<C> {
        &self.checker
    }

    /// Validate, check connectivity, and deliver the result, in place.
    ///
    /// Fails only when the form is invalid; connectivity problems are
    /// reported through the returned feedback.
    pub async fn test_connection(
        &self,
        form: &mut FormState,
        creds: &CredentialSettings,
    ) -> Result<ConnectionFeedback, ValidationErrors> {
        let request = prepare_connection_test(form, creds)?;
        let outcome = ConnectionOutcome::from(self.checker.authenticate(&request).await);
        Ok(deliver_connection_outcome(form, &request, outcome))
    }

    /// A tester that runs checks off the caller's task and reports back
    /// through `events`.
    pub fn tester(&self, events: UnboundedSender<ConnectionEvent>) -> ConnectionTester<C> {
        ConnectionTester::new(Arc::clone(&self.checker), events)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use pretty_assertions::assert_eq;
    use secrecy::{ExposeSecret, SecretString};

    use super::*;
    use crate::connectivity::{ConnectivityError, FeedbackTone};
    use crate::settings::FavoriteJob;
    use crate::validation::Field;
    use crate::JenkinsVersion;

    /// Checker that answers with a canned result and records requests.
    pub(crate) struct FakeChecker {
        result: Result<(), ConnectivityError>,
        pub(crate) seen: Mutex<Vec<AuthRequest>>,
    }

    impl FakeChecker {
        pub(crate) fn answering(result: Result<(), ConnectivityError>) -> Self {
            Self {
                result,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl ConnectivityChecker for FakeChecker {
        async fn authenticate(&self, request: &AuthRequest) -> Result<(), ConnectivityError> {
            self.seen.lock().unwrap().push(request.clone());
            self.result.clone()
        }
    }

    fn persisted() -> (AppSettings, CredentialSettings) {
        let app = AppSettings {
            server_url: "http://a/".into(),
            build_delay: 5,
            job_refresh_period: 10,
            rss_refresh_period: 15,
            display_success_or_stable: true,
            display_unstable_or_fail: false,
            display_aborted: true,
            suffix: ".diff".into(),
            jobs_filter_pattern: "^release-.*".into(),
        };
        let creds = CredentialSettings {
            username: "alice".into(),
            password: SecretString::from("stored".to_owned()),
            crumb_data: "crumb".into(),
            version: JenkinsVersion::Version1,
            favorite_jobs: vec![FavoriteJob {
                name: "job1".into(),
                url: "http://a/job/job1/".into(),
            }],
            last_selected_view: Some("All".into()),
        };
        (app, creds)
    }

    // ── load / is_modified ──────────────────────────────────────────

    #[test]
    fn load_copies_every_field() {
        let (app, creds) = persisted();
        let form = load(&app, &creds);

        assert_eq!(form.server_url, "http://a/");
        assert_eq!(form.build_delay(), 5);
        assert_eq!(form.job_refresh_period(), 10);
        assert_eq!(form.rss_refresh_period(), 15);
        assert!(form.display_success_or_stable);
        assert!(!form.display_unstable_or_fail);
        assert!(form.display_aborted);
        assert_eq!(form.suffix, ".diff");
        assert_eq!(form.jobs_filter_pattern, "^release-.*");
        assert_eq!(form.username, "alice");
        assert_eq!(form.crumb_data, "crumb");
        assert_eq!(form.version, Some(JenkinsVersion::Version1));
        assert_eq!(form.password().expose_secret(), "stored");
        assert!(!form.is_password_modified());
    }

    #[test]
    fn load_skips_password_without_username() {
        let (app, mut creds) = persisted();
        creds.username.clear();
        let form = load(&app, &creds);
        assert!(!form.has_password());
        assert!(!form.is_password_modified());
    }

    #[test]
    fn not_modified_right_after_load() {
        let (app, creds) = persisted();
        assert!(!is_modified(&load(&app, &creds), &app, &creds));

        let (app, creds) = (AppSettings::default(), CredentialSettings::default());
        assert!(!is_modified(&load(&app, &creds), &app, &creds));
    }

    #[test]
    fn each_tracked_field_counts_as_modified() {
        let (app, creds) = persisted();
        let edits: Vec<fn(&mut FormState)> = vec![
            |f: &mut FormState| f.server_url = "http://b/".into(),
            |f: &mut FormState| f.build_delay.set_text("6").unwrap(),
            |f: &mut FormState| f.job_refresh_period.set_text("").unwrap(),
            |f: &mut FormState| f.rss_refresh_period.set_text("1").unwrap(),
            |f: &mut FormState| f.crumb_data = "other".into(),
            |f: &mut FormState| f.suffix = ".patch".into(),
            |f: &mut FormState| f.jobs_filter_pattern = ".*".into(),
            |f: &mut FormState| f.username = "bob".into(),
            |f: &mut FormState| f.edit_password("stored"),
            |f: &mut FormState| f.display_success_or_stable = false,
            |f: &mut FormState| f.display_unstable_or_fail = true,
            |f: &mut FormState| f.display_aborted = false,
        ];
        for (i, edit) in edits.into_iter().enumerate() {
            let mut form = load(&app, &creds);
            edit(&mut form);
            assert!(is_modified(&form, &app, &creds), "edit #{i} not detected");
        }
    }

    #[test]
    fn version_alone_is_not_tracked() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.version = Some(JenkinsVersion::Version2);
        assert!(!is_modified(&form, &app, &creds));
    }

    // ── apply ───────────────────────────────────────────────────────

    #[test]
    fn apply_commits_and_clears_modified() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.build_delay.set_text("30").unwrap();
        form.suffix = ".patch".into();
        form.display_aborted = false;
        form.edit_password("new-secret");

        let report = apply(&mut form, &mut app, &mut creds).unwrap();

        assert_eq!(
            report,
            ApplyReport {
                server_changed: false,
                password_changed: true
            }
        );
        assert_eq!(app.build_delay, 30);
        assert_eq!(app.suffix, ".patch");
        assert!(!app.display_aborted);
        assert_eq!(creds.password.expose_secret(), "new-secret");
        assert!(!form.is_password_modified());
        assert!(!is_modified(&form, &app, &creds));
    }

    #[test]
    fn apply_rejects_invalid_form_without_touching_settings() {
        let (mut app, mut creds) = persisted();
        let before_app = app.clone();
        let mut form = load(&app, &creds);
        form.server_url = "not a url".into();
        form.suffix = ".changed".into();
        form.edit_password("typed");

        let err = apply(&mut form, &mut app, &mut creds).unwrap_err();

        assert_eq!(err.first().field, Field::ServerUrl);
        assert_eq!(app, before_app);
        assert_eq!(creds.password.expose_secret(), "stored");
        assert_eq!(creds.favorite_jobs.len(), 1);
        assert!(form.is_password_modified());
    }

    #[test]
    fn cleared_password_is_rejected_and_nothing_is_stored() {
        let (mut app, mut creds) = persisted();
        let before_app = app.clone();
        let mut form = load(&app, &creds);
        form.edit_password("");

        let err = apply(&mut form, &mut app, &mut creds).unwrap_err();

        assert_eq!(err.first().field, Field::Password);
        assert_eq!(err.to_string(), "'password' must be set");
        assert_eq!(app, before_app);
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password.expose_secret(), "stored");
        assert!(form.is_password_modified());
    }

    #[test]
    fn changing_server_clears_favorites_and_view() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.server_url = "http://b/".into();

        let report = apply(&mut form, &mut app, &mut creds).unwrap();

        assert!(report.server_changed);
        assert_eq!(app.server_url, "http://b/");
        assert!(creds.favorite_jobs.is_empty());
        assert_eq!(creds.last_selected_view, None);
    }

    #[test]
    fn same_server_keeps_favorites_and_view() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.crumb_data = "fresh".into();

        let report = apply(&mut form, &mut app, &mut creds).unwrap();

        assert!(!report.server_changed);
        assert_eq!(creds.favorite_jobs.len(), 1);
        assert_eq!(creds.last_selected_view.as_deref(), Some("All"));
        assert_eq!(creds.crumb_data, "fresh");
    }

    #[test]
    fn untouched_password_is_not_rewritten() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.confirm_password(SecretString::from("shown-only".to_owned()));

        let report = apply(&mut form, &mut app, &mut creds).unwrap();

        assert!(!report.password_changed);
        assert_eq!(creds.password.expose_secret(), "stored");
    }

    #[test]
    fn blank_username_is_normalized() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.username = "   ".into();

        apply(&mut form, &mut app, &mut creds).unwrap();

        assert_eq!(creds.username, "");
        assert!(!is_modified(&form, &app, &creds));
    }

    #[test]
    fn unselected_version_commits_as_version2() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.version = None;

        apply(&mut form, &mut app, &mut creds).unwrap();

        assert_eq!(creds.version, JenkinsVersion::Version2);
        assert_eq!(form.version, Some(JenkinsVersion::Version2));
    }

    #[test]
    fn blank_numeric_fields_commit_as_zero() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.build_delay.set_text("").unwrap();
        form.rss_refresh_period.set_text("42").unwrap();

        apply(&mut form, &mut app, &mut creds).unwrap();

        assert_eq!(app.build_delay, 0);
        assert_eq!(app.rss_refresh_period, 42);
    }

    // ── connection test ─────────────────────────────────────────────

    #[tokio::test]
    async fn successful_test_confirms_stored_password() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.confirm_password(SecretString::from(String::new()));
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Ok(())));

        let feedback = reconciler.test_connection(&mut form, &creds).await.unwrap();

        assert_eq!(feedback.tone, FeedbackTone::Positive);
        assert_eq!(feedback.text, "Successful");
        assert_eq!(form.password().expose_secret(), "stored");
        assert!(!form.is_password_modified());

        let seen = reconciler.checker().seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].username, "alice");
        assert_eq!(seen[0].password.expose_secret(), "stored");
        assert_eq!(seen[0].crumb_data, "crumb");
        assert_eq!(seen[0].version, JenkinsVersion::Version1);
        assert_eq!(seen[0].url.as_str(), "http://a/");
    }

    #[tokio::test]
    async fn successful_test_keeps_dirty_flag() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.edit_password("typed");
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Ok(())));

        reconciler.test_connection(&mut form, &creds).await.unwrap();

        assert!(form.is_password_modified());
        assert_eq!(form.password().expose_secret(), "typed");
        let seen = reconciler.checker().seen.lock().unwrap();
        assert_eq!(seen[0].password.expose_secret(), "typed");
    }

    #[tokio::test]
    async fn unselected_version_tests_as_version2() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.version = None;
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Ok(())));

        reconciler.test_connection(&mut form, &creds).await.unwrap();

        let seen = reconciler.checker().seen.lock().unwrap();
        assert_eq!(seen[0].version, JenkinsVersion::Version2);
    }

    #[tokio::test]
    async fn auth_failure_reports_body() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.edit_password("wrong");
        let reconciler =
            SettingsReconciler::new(FakeChecker::answering(Err(ConnectivityError::Authentication {
                message: "Unauthorized (HTTP 401)".into(),
                body: Some("<h1>Invalid</h1>".into()),
            })));

        let feedback = reconciler.test_connection(&mut form, &creds).await.unwrap();

        assert_eq!(feedback.tone, FeedbackTone::Negative);
        assert_eq!(feedback.text, "[Fail] Unauthorized (HTTP 401)");
        assert_eq!(feedback.diagnostic(), Some("<h1>Invalid</h1>"));
        assert_eq!(form.password().expose_secret(), "wrong");
    }

    #[tokio::test]
    async fn generic_failure_has_no_body() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Err(
            ConnectivityError::Other {
                message: "connection refused".into(),
            },
        )));

        let feedback = reconciler.test_connection(&mut form, &creds).await.unwrap();

        assert_eq!(feedback.text, "[Fail] connection refused");
        assert_eq!(feedback.diagnostic(), None);
        assert!(!feedback.is_success());
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_checker() {
        let (app, creds) = persisted();
        let mut form = load(&app, &creds);
        form.server_url = String::new();
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Ok(())));

        let err = reconciler.test_connection(&mut form, &creds).await.unwrap_err();

        assert_eq!(err.first().message, "'server_url' must be set");
        assert!(reconciler.checker().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn connection_test_does_not_block_apply() {
        let (mut app, mut creds) = persisted();
        let mut form = load(&app, &creds);
        form.server_url = "http://unreachable.invalid/".into();
        let reconciler = SettingsReconciler::new(FakeChecker::answering(Err(
            ConnectivityError::Other {
                message: "dns error".into(),
            },
        )));

        let feedback = reconciler.test_connection(&mut form, &creds).await.unwrap();
        assert!(!feedback.is_success());

        apply(&mut form, &mut app, &mut creds).unwrap();
        assert_eq!(app.server_url, "http://unreachable.invalid/");
    }
}
