//! Durable storage for jenkinsfly settings.
//!
//! One TOML file holds the application-scope record under `[app]` and one
//! credential-scope record per project under `[projects.<name>]`.
//! Passwords live in the system keyring, with a plaintext fallback in
//! the project section.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use jenkinsfly_core::{AppSettings, CredentialSettings, FavoriteJob, JenkinsVersion};

/// Keyring service all jenkinsfly secrets are filed under.
const KEYRING_SERVICE: &str = "jenkinsfly";

/// Project used when neither the file nor the caller names one.
pub const DEFAULT_PROJECT: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown project '{project}'")]
    UnknownProject { project: String },

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("failed to serialize settings: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("settings loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML layout ─────────────────────────────────────────────────────

/// The whole settings file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SettingsFile {
    /// Project used when `--project` is not given.
    pub default_project: Option<String>,

    /// Application-scope settings.
    #[serde(default)]
    pub app: AppSettings,

    /// Credential-scope settings, keyed by project name.
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectSection>,
}

impl Default for SettingsFile {
    fn default() -> Self {
        Self {
            default_project: Some(DEFAULT_PROJECT.into()),
            app: AppSettings::default(),
            projects: BTreeMap::new(),
        }
    }
}

/// One `[projects.<name>]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectSection {
    pub username: String,
    pub crumb_data: String,
    pub version: JenkinsVersion,
    pub last_selected_view: Option<String>,

    /// Plaintext password (prefer the keyring).
    pub password: Option<String>,

    pub favorite_jobs: Vec<FavoriteJob>,
}

/// Where `store_password` puts a secret.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PasswordStorage {
    #[default]
    Keyring,
    Plaintext,
}

// ── File path ───────────────────────────────────────────────────────

/// Resolve the settings file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "jenkinsfly", "jenkinsfly").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("jenkinsfly");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Load / save ─────────────────────────────────────────────────────

/// Load the settings file layered over defaults and `JENKINSFLY_*`
/// environment overrides (`__` separates nesting levels, e.g.
/// `JENKINSFLY_APP__SUFFIX`). A missing file yields the defaults.
pub fn load_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(SettingsFile::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("JENKINSFLY_").split("__").ignore(&["config"]));

    let file: SettingsFile = figment.extract()?;
    debug!(path = %path.display(), projects = file.projects.len(), "settings loaded");
    Ok(file)
}

/// Serialize to TOML and write `path`, creating parent directories.
pub fn save_file(path: &Path, file: &SettingsFile) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(file)?;
    std::fs::write(path, toml_str)?;
    debug!(path = %path.display(), "settings saved");
    Ok(())
}

// ── Records ─────────────────────────────────────────────────────────

impl SettingsFile {
    /// The explicit choice, else the file's default, else `default`.
    pub fn active_project(&self, explicit: Option<&str>) -> String {
        explicit
            .or(self.default_project.as_deref())
            .unwrap_or(DEFAULT_PROJECT)
            .to_owned()
    }

    pub fn project_names(&self) -> impl Iterator<Item = &str> {
        self.projects.keys().map(String::as_str)
    }

    /// Make `project` the default. It must already exist.
    pub fn set_default_project(&mut self, project: &str) -> Result<(), ConfigError> {
        if !self.projects.contains_key(project) {
            return Err(ConfigError::UnknownProject {
                project: project.into(),
            });
        }
        self.default_project = Some(project.into());
        Ok(())
    }

    pub fn app_settings(&self) -> AppSettings {
        self.app.clone()
    }

    /// Credential record for `project`, with the password resolved from
    /// the keyring first and the plaintext field second. A project with
    /// no section reads as the defaults.
    pub fn credential_settings(&self, project: &str) -> CredentialSettings {
        let Some(section) = self.projects.get(project) else {
            return CredentialSettings::default();
        };
        CredentialSettings {
            username: section.username.clone(),
            password: resolve_password(project, section),
            crumb_data: section.crumb_data.clone(),
            version: section.version,
            favorite_jobs: section.favorite_jobs.clone(),
            last_selected_view: section.last_selected_view.clone(),
        }
    }

    pub fn put_app_settings(&mut self, app: &AppSettings) {
        self.app = app.clone();
    }

    /// Write every credential field except the password into the
    /// project's section, creating it if needed.
    pub fn put_credential_settings(&mut self, project: &str, creds: &CredentialSettings) {
        let section = self.projects.entry(project.to_owned()).or_default();
        section.username.clone_from(&creds.username);
        section.crumb_data.clone_from(&creds.crumb_data);
        section.version = creds.version;
        section.favorite_jobs.clone_from(&creds.favorite_jobs);
        section.last_selected_view.clone_from(&creds.last_selected_view);
    }

    /// Persist `password` for `project`. The other location is cleared
    /// so it cannot shadow the new value. A blank password clears both.
    pub fn store_password(
        &mut self,
        project: &str,
        password: &SecretString,
        storage: PasswordStorage,
    ) -> Result<(), ConfigError> {
        let section = self.projects.entry(project.to_owned()).or_default();
        let value = password.expose_secret();

        if value.trim().is_empty() {
            section.password = None;
            forget_keyring_password(project);
            return Ok(());
        }

        match storage {
            PasswordStorage::Keyring => {
                keyring_entry(project)?.set_password(value)?;
                section.password = None;
                debug!(project, "password stored in keyring");
            }
            PasswordStorage::Plaintext => {
                section.password = Some(value.to_owned());
                forget_keyring_password(project);
                warn!(project, "password stored in plaintext");
            }
        }
        Ok(())
    }
}

// ── Keyring ─────────────────────────────────────────────────────────

fn keyring_entry(project: &str) -> Result<keyring::Entry, keyring::Error> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{project}/password"))
}

fn resolve_password(project: &str, section: &ProjectSection) -> SecretString {
    // 1. System keyring
    if let Ok(entry) = keyring_entry(project) {
        if let Ok(pw) = entry.get_password() {
            return SecretString::from(pw);
        }
    }

    // 2. Plaintext in the settings file
    SecretString::from(section.password.clone().unwrap_or_default())
}

fn forget_keyring_password(project: &str) {
    match keyring_entry(project).and_then(|entry| entry.delete_credential()) {
        Ok(()) | Err(keyring::Error::NoEntry) => {}
        Err(err) => debug!(project, error = %err, "could not clear keyring password"),
    }
}
