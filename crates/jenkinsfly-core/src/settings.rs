// ── Persisted settings records ──
//
// Two records with different scopes: `AppSettings` is shared by every
// project, `CredentialSettings` belongs to one project and holds the
// identity used against the server plus selections cached for that
// server. They never share a type. Reading and writing them to disk is
// the config crate's job.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::JenkinsVersion;

/// Server URL used until the user configures one.
pub const DEFAULT_SERVER_URL: &str = "http://dummyjenkinsserver";

/// Suffix used until the user configures one.
pub const DEFAULT_SUFFIX: &str = ".txt";

/// Application-scope settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Jenkins root URL.
    pub server_url: String,
    /// Quiet period (seconds) requested when triggering a build.
    pub build_delay: u32,
    /// Minutes between job list refreshes. 0 = never.
    pub job_refresh_period: u32,
    /// Minutes between build event refreshes. 0 = never.
    pub rss_refresh_period: u32,
    pub display_success_or_stable: bool,
    pub display_unstable_or_fail: bool,
    pub display_aborted: bool,
    /// Suffix appended to uploaded patch names.
    pub suffix: String,
    /// Regular expression restricting which jobs are listed.
    pub jobs_filter_pattern: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            build_delay: 0,
            job_refresh_period: 0,
            rss_refresh_period: 0,
            display_success_or_stable: true,
            display_unstable_or_fail: true,
            display_aborted: true,
            suffix: DEFAULT_SUFFIX.into(),
            jobs_filter_pattern: String::new(),
        }
    }
}

/// A job the user pinned for quick access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteJob {
    pub name: String,
    pub url: String,
}

/// Credential-scope settings for one project.
///
/// `favorite_jobs` and `last_selected_view` only make sense for the
/// server they were picked on.
#[derive(Debug, Clone)]
pub struct CredentialSettings {
    pub username: String,
    /// Empty when no password is stored.
    pub password: SecretString,
    pub crumb_data: String,
    pub version: JenkinsVersion,
    pub favorite_jobs: Vec<FavoriteJob>,
    pub last_selected_view: Option<String>,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: SecretString::from(String::new()),
            crumb_data: String::new(),
            version: JenkinsVersion::default(),
            favorite_jobs: Vec::new(),
            last_selected_view: None,
        }
    }
}

impl CredentialSettings {
    /// Whether a non-blank password is stored.
    pub fn has_password(&self) -> bool {
        !self.password.expose_secret().trim().is_empty()
    }

    /// Whether `name` is already a favorite.
    pub fn is_favorite(&self, name: &str) -> bool {
        self.favorite_jobs.iter().any(|j| j.name == name)
    }

    /// Pin a job. Returns `false` if it was already pinned.
    pub fn add_favorite(&mut self, job: FavoriteJob) -> bool {
        if self.is_favorite(&job.name) {
            return false;
        }
        self.favorite_jobs.push(job);
        true
    }

    /// Unpin a job by name. Returns `false` if it was not pinned.
    pub fn remove_favorite(&mut self, name: &str) -> bool {
        let before = self.favorite_jobs.len();
        self.favorite_jobs.retain(|j| j.name != name);
        self.favorite_jobs.len() != before
    }

    /// Drop every selection tied to the current server.
    pub(crate) fn forget_server_selections(&mut self) {
        self.favorite_jobs.clear();
        self.last_selected_view = None;
    }
}
