// ── Form validation ──
//
// Every rule runs on every pass; violations are collected in rule order
// rather than stopping at the first one.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use url::Url;

use crate::form::FormState;
use crate::settings::CredentialSettings;

/// A form field an error can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ServerUrl,
    Username,
    Password,
    CrumbData,
    BuildDelay,
    JobRefreshPeriod,
    RssRefreshPeriod,
    Suffix,
    JobsFilterPattern,
    Version,
    DisplaySuccessOrStable,
    DisplayUnstableOrFail,
    DisplayAborted,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Self::ServerUrl,
        Self::Username,
        Self::Password,
        Self::CrumbData,
        Self::BuildDelay,
        Self::JobRefreshPeriod,
        Self::RssRefreshPeriod,
        Self::Suffix,
        Self::JobsFilterPattern,
        Self::Version,
        Self::DisplaySuccessOrStable,
        Self::DisplayUnstableOrFail,
        Self::DisplayAborted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerUrl => "server_url",
            Self::Username => "username",
            Self::Password => "password",
            Self::CrumbData => "crumb_data",
            Self::BuildDelay => "build_delay",
            Self::JobRefreshPeriod => "job_refresh_period",
            Self::RssRefreshPeriod => "rss_refresh_period",
            Self::Suffix => "suffix",
            Self::JobsFilterPattern => "jobs_filter_pattern",
            Self::Version => "version",
            Self::DisplaySuccessOrStable => "display_success_or_stable",
            Self::DisplayUnstableOrFail => "display_unstable_or_fail",
            Self::DisplayAborted => "display_aborted",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown field name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    /// Accepts the canonical snake_case name or its kebab-case spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == normalized)
            .ok_or_else(|| UnknownField(s.to_owned()))
    }
}

/// One violated rule, scoped to the field the user has to fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub(crate) fn malformed_url(url: &str) -> Self {
        Self {
            field: Field::ServerUrl,
            message: format!("URL '{url}' is malformed"),
        }
    }

    fn must_be_set(field: Field) -> Self {
        Self {
            field,
            message: format!("'{field}' must be set"),
        }
    }
}

/// Non-empty, ordered list of violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", self.first().message)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub(crate) fn single(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    /// The error surfaced when only one can be shown.
    pub fn first(&self) -> &FieldError {
        // Only built from a non-empty list in `validate`.
        &self.errors[0]
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// The error reported against `field`, if any.
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}

/// Whether `text` is an absolute URL with both a scheme and a host.
pub fn is_well_formed_url(text: &str) -> bool {
    Url::parse(text.trim()).is_ok_and(|u| u.has_host() && !u.cannot_be_a_base())
}

/// Check the form against every rule.
///
/// `stored` supplies the previously persisted password: a username with
/// an untouched password field is acceptable when one is on file. Once
/// the field is edited only the typed value counts.
pub fn validate(form: &FormState, stored: &CredentialSettings) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    let url = form.server_url.trim();
    if url.is_empty() {
        errors.push(FieldError::must_be_set(Field::ServerUrl));
    } else if !is_well_formed_url(url) {
        errors.push(FieldError::malformed_url(url));
    }

    if !form.username.trim().is_empty() {
        let available = if form.is_password_modified() {
            form.has_password()
        } else {
            stored.has_password()
        };
        if !available {
            errors.push(FieldError::must_be_set(Field::Password));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors { errors })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::SecretString;

    use super::*;

    fn form(url: &str, username: &str) -> FormState {
        let mut form = FormState::default();
        form.server_url = url.into();
        form.username = username.into();
        form
    }

    fn stored_with_password(pw: &str) -> CredentialSettings {
        CredentialSettings {
            password: SecretString::from(pw.to_owned()),
            ..CredentialSettings::default()
        }
    }

    #[test]
    fn accepts_anonymous_valid_url() {
        let f = form("http://ci.example.com:8080/", "");
        assert_eq!(validate(&f, &CredentialSettings::default()), Ok(()));
    }

    #[test]
    fn blank_url_only_reports_must_be_set() {
        let f = form("   ", "");
        let err = validate(&f, &CredentialSettings::default()).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.first().field, Field::ServerUrl);
        assert_eq!(err.first().message, "'server_url' must be set");
    }

    #[test]
    fn malformed_urls_are_rejected() {
        for url in ["ci.example.com", "http://", "mailto:ops@example.com", "not a url"] {
            let f = form(url, "");
            let err = validate(&f, &CredentialSettings::default()).unwrap_err();
            assert_eq!(err.first().field, Field::ServerUrl, "{url}");
            assert!(err.first().message.contains("is malformed"), "{url}");
        }
    }

    #[test]
    fn username_without_any_password_fails_on_password_field() {
        let f = form("http://ci/", "alice");
        let err = validate(&f, &CredentialSettings::default()).unwrap_err();
        assert_eq!(err.first().field, Field::Password);
        assert_eq!(err.to_string(), "'password' must be set");
    }

    #[test]
    fn username_with_typed_password_passes() {
        let mut f = form("http://ci/", "alice");
        f.edit_password("pw");
        assert_eq!(validate(&f, &CredentialSettings::default()), Ok(()));
    }

    #[test]
    fn username_with_stored_password_passes() {
        let f = form("http://ci/", "alice");
        assert_eq!(validate(&f, &stored_with_password("pw")), Ok(()));
    }

    #[test]
    fn typed_blank_password_fails_without_stored_one() {
        let mut f = form("http://ci/", "alice");
        f.edit_password("  ");
        let err = validate(&f, &CredentialSettings::default()).unwrap_err();
        assert!(err.for_field(Field::Password).is_some());
    }

    #[test]
    fn cleared_password_fails_even_with_stored_one() {
        let mut f = form("http://ci/", "alice");
        f.edit_password("");
        let err = validate(&f, &stored_with_password("pw")).unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.first().field, Field::Password);
        assert_eq!(err.to_string(), "'password' must be set");
    }

    #[test]
    fn blank_username_with_password_passes() {
        let mut f = form("http://ci/", "");
        f.edit_password("pw");
        assert_eq!(validate(&f, &CredentialSettings::default()), Ok(()));
    }

    #[test]
    fn field_names_parse_both_spellings() {
        assert_eq!("server_url".parse::<Field>(), Ok(Field::ServerUrl));
        assert_eq!("jobs-filter-pattern".parse::<Field>(), Ok(Field::JobsFilterPattern));
        assert_eq!(
            "colour".parse::<Field>(),
            Err(UnknownField("colour".into()))
        );
    }

    #[test]
    fn collects_every_violation_in_order() {
        let f = form("", "alice");
        let err = validate(&f, &CredentialSettings::default()).unwrap_err();
        let fields: Vec<Field> = err.errors().iter().map(|e| e.field).collect();
        assert_eq!(fields, vec![Field::ServerUrl, Field::Password]);
        assert_eq!(err.to_string(), "'server_url' must be set");
    }
}
