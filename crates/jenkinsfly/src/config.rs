//! CLI configuration: a thin session over `jenkinsfly_config`.
//!
//! Resolves the settings file and active project from `GlobalOpts`, and
//! writes back whatever `apply` committed.

use std::path::PathBuf;
use std::time::Duration;

use jenkinsfly_config::{PasswordStorage, SettingsFile, config_path, load_file, save_file};
use jenkinsfly_core::{
    AppSettings, ApplyReport, CredentialSettings, FormState, TlsMode, TransportConfig,
};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The settings file plus both records of the active project.
pub struct Session {
    pub path: PathBuf,
    pub file: SettingsFile,
    pub project: String,
    pub app: AppSettings,
    pub creds: CredentialSettings,
}

impl Session {
    pub fn open(global: &GlobalOpts) -> Result<Self, CliError> {
        let path = global.config.clone().unwrap_or_else(config_path);
        let file = load_file(&path)?;
        let project = file.active_project(global.project.as_deref());
        let app = file.app_settings();
        let creds = file.credential_settings(&project);
        tracing::debug!(path = %path.display(), project, "settings session opened");
        Ok(Self {
            path,
            file,
            project,
            app,
            creds,
        })
    }

    /// A fresh form showing the persisted settings.
    pub fn form(&self) -> FormState {
        jenkinsfly_core::load(&self.app, &self.creds)
    }

    /// Commit `form` and write the file. Nothing is written when
    /// validation fails.
    pub fn apply(
        &mut self,
        form: &mut FormState,
        storage: PasswordStorage,
    ) -> Result<ApplyReport, CliError> {
        let report = jenkinsfly_core::apply(form, &mut self.app, &mut self.creds)?;
        self.file.put_app_settings(&self.app);
        self.file.put_credential_settings(&self.project, &self.creds);
        if report.password_changed {
            self.file
                .store_password(&self.project, &self.creds.password, storage)?;
        }
        save_file(&self.path, &self.file)?;
        Ok(report)
    }

    /// Write the credential record as-is (favorites, last view).
    pub fn save_credentials(&mut self) -> Result<(), CliError> {
        self.file.put_credential_settings(&self.project, &self.creds);
        save_file(&self.path, &self.file)?;
        Ok(())
    }

    /// Whether the active project has a plaintext password in the file.
    pub fn has_plaintext_password(&self) -> bool {
        self.file
            .projects
            .get(&self.project)
            .is_some_and(|p| p.password.is_some())
    }
}

/// Transport settings from the global TLS and timeout flags.
pub fn transport(global: &GlobalOpts) -> TransportConfig {
    let tls = if global.insecure {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = global.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };
    TransportConfig {
        tls,
        timeout: Duration::from_secs(global.timeout),
        ..TransportConfig::default()
    }
}
