// ── Live form state ──
//
// The values a user is editing, before they are committed. Plain text
// fields are public; the password and the numeric inputs are guarded so
// the dirty flag and the digit filter cannot be bypassed.

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::JenkinsVersion;
use crate::settings::{AppSettings, CredentialSettings};
use crate::validation::Field;

/// An edit refused by input filtering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{text}' is not {expected}")]
pub struct InputRejected {
    pub text: String,
    pub expected: &'static str,
}

impl InputRejected {
    fn new(text: &str, expected: &'static str) -> Self {
        Self {
            text: text.to_owned(),
            expected,
        }
    }
}

/// A text input that only ever holds a non-negative `u32`, or nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NumericInput(String);

impl NumericInput {
    /// Replace the text. Anything other than ASCII digits, or a number
    /// too large for `u32`, is refused and the input keeps its old text.
    /// Surrounding whitespace is ignored.
    pub fn set_text(&mut self, text: &str) -> Result<(), InputRejected> {
        let trimmed = text.trim();
        if !trimmed.is_empty()
            && (!trimmed.bytes().all(|b| b.is_ascii_digit()) || trimmed.parse::<u32>().is_err())
        {
            return Err(InputRejected::new(text, "a whole number"));
        }
        trimmed.clone_into(&mut self.0);
        Ok(())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// Numeric value; blank reads as 0.
    pub fn value(&self) -> u32 {
        self.0.parse().unwrap_or(0)
    }
}

impl From<u32> for NumericInput {
    fn from(value: u32) -> Self {
        Self(value.to_string())
    }
}

/// Whether the password input was touched since the last load or apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum PasswordState {
    #[default]
    Clean,
    Dirty,
}

/// Everything the settings form shows.
#[derive(Debug, Clone)]
pub struct FormState {
    pub server_url: String,
    pub username: String,
    pub crumb_data: String,
    pub build_delay: NumericInput,
    pub job_refresh_period: NumericInput,
    pub rss_refresh_period: NumericInput,
    pub display_success_or_stable: bool,
    pub display_unstable_or_fail: bool,
    pub display_aborted: bool,
    pub suffix: String,
    pub jobs_filter_pattern: String,
    /// Radio selection. `None` until one of the two is picked.
    pub version: Option<JenkinsVersion>,
    password: SecretString,
    password_state: PasswordState,
    /// Bumped on every password edit; lets late results spot a retype.
    password_edits: u64,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            username: String::new(),
            crumb_data: String::new(),
            build_delay: NumericInput::default(),
            job_refresh_period: NumericInput::default(),
            rss_refresh_period: NumericInput::default(),
            display_success_or_stable: false,
            display_unstable_or_fail: false,
            display_aborted: false,
            suffix: String::new(),
            jobs_filter_pattern: String::new(),
            version: None,
            password: SecretString::from(String::new()),
            password_state: PasswordState::Clean,
            password_edits: 0,
        }
    }
}

impl FormState {
    /// A form showing the persisted values. The stored password is only
    /// shown when a username is stored alongside it.
    pub(crate) fn from_settings(app: &AppSettings, creds: &CredentialSettings) -> Self {
        let password = if creds.username.trim().is_empty() {
            SecretString::from(String::new())
        } else {
            creds.password.clone()
        };
        Self {
            server_url: app.server_url.clone(),
            username: creds.username.clone(),
            crumb_data: creds.crumb_data.clone(),
            build_delay: NumericInput::from(app.build_delay),
            job_refresh_period: NumericInput::from(app.job_refresh_period),
            rss_refresh_period: NumericInput::from(app.rss_refresh_period),
            display_success_or_stable: app.display_success_or_stable,
            display_unstable_or_fail: app.display_unstable_or_fail,
            display_aborted: app.display_aborted,
            suffix: app.suffix.clone(),
            jobs_filter_pattern: app.jobs_filter_pattern.clone(),
            version: Some(creds.version),
            password,
            password_state: PasswordState::Clean,
            password_edits: 0,
        }
    }

    pub fn build_delay(&self) -> u32 {
        self.build_delay.value()
    }

    pub fn job_refresh_period(&self) -> u32 {
        self.job_refresh_period.value()
    }

    pub fn rss_refresh_period(&self) -> u32 {
        self.rss_refresh_period.value()
    }

    /// The dialect a commit will store: an unselected radio group counts
    /// as 2.x.
    pub fn effective_version(&self) -> JenkinsVersion {
        self.version.unwrap_or(JenkinsVersion::Version2)
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Whether the password field holds a non-blank value.
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().trim().is_empty()
    }

    /// A user edit of the password field. Marks the password as modified.
    pub fn edit_password(&mut self, value: impl Into<String>) {
        self.password = SecretString::from(value.into());
        self.password_state = PasswordState::Dirty;
        self.password_edits = self.password_edits.wrapping_add(1);
    }

    pub(crate) fn password_edits(&self) -> u64 {
        self.password_edits
    }

    pub fn is_password_modified(&self) -> bool {
        self.password_state == PasswordState::Dirty
    }

    /// Show a password that a connection test just proved. Leaves the
    /// modified flag alone.
    pub(crate) fn confirm_password(&mut self, value: SecretString) {
        self.password = value;
    }

    pub(crate) fn mark_password_clean(&mut self) {
        self.password_state = PasswordState::Clean;
    }

    /// Type `text` into `field`, applying the same filtering an input
    /// widget would. A refused edit leaves the form unchanged.
    pub fn set_text(&mut self, field: Field, text: &str) -> Result<(), InputRejected> {
        match field {
            Field::ServerUrl => text.clone_into(&mut self.server_url),
            Field::Username => text.clone_into(&mut self.username),
            Field::Password => self.edit_password(text),
            Field::CrumbData => text.clone_into(&mut self.crumb_data),
            Field::BuildDelay => self.build_delay.set_text(text)?,
            Field::JobRefreshPeriod => self.job_refresh_period.set_text(text)?,
            Field::RssRefreshPeriod => self.rss_refresh_period.set_text(text)?,
            Field::Suffix => text.clone_into(&mut self.suffix),
            Field::JobsFilterPattern => text.clone_into(&mut self.jobs_filter_pattern),
            Field::Version => {
                let version = text
                    .trim()
                    .parse()
                    .map_err(|_| InputRejected::new(text, "version1 or version2"))?;
                self.version = Some(version);
            }
            Field::DisplaySuccessOrStable => self.display_success_or_stable = parse_flag(text)?,
            Field::DisplayUnstableOrFail => self.display_unstable_or_fail = parse_flag(text)?,
            Field::DisplayAborted => self.display_aborted = parse_flag(text)?,
        }
        Ok(())
    }
}

fn parse_flag(text: &str) -> Result<bool, InputRejected> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(InputRejected::new(text, "true or false")),
    }
}
