//! Config subcommand handlers.
//!
//! Every write goes through the same round-trip: load a form from the
//! persisted settings, edit it, then `apply`, which validates before
//! anything is saved.

use std::io::BufRead;

use dialoguer::{Confirm, Input, Select};
use serde::Serialize;
use tabled::Tabled;
use tokio::sync::mpsc;

use jenkinsfly_config::PasswordStorage;
use jenkinsfly_core::{
    AppSettings, ConnectionFeedback, ConnectionOutcome, Field, FavoriteJob, FormState,
    JenkinsConnectivity, JenkinsVersion, SettingsReconciler, is_modified,
};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::commands::util::{available_list, prompt_err, spinner};
use crate::config::{self, Session};
use crate::error::CliError;
use crate::output;

// ── Views ───────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SettingsView<'a> {
    settings_file: String,
    project: &'a str,
    app: &'a AppSettings,
    credentials: CredentialView<'a>,
}

/// Credential record with secrets masked.
#[derive(Serialize)]
struct CredentialView<'a> {
    username: &'a str,
    password: &'static str,
    password_storage: &'static str,
    crumb_data: &'static str,
    version: JenkinsVersion,
    last_selected_view: Option<&'a str>,
    favorite_jobs: &'a [FavoriteJob],
}

fn mask(present: bool) -> &'static str {
    if present { "****" } else { "" }
}

fn settings_view(session: &Session) -> SettingsView<'_> {
    let creds = &session.creds;
    let password_storage = if !creds.has_password() {
        "none"
    } else if session.has_plaintext_password() {
        "plaintext"
    } else {
        "keyring"
    };
    SettingsView {
        settings_file: session.path.display().to_string(),
        project: &session.project,
        app: &session.app,
        credentials: CredentialView {
            username: &creds.username,
            password: mask(creds.has_password()),
            password_storage,
            crumb_data: mask(!creds.crumb_data.is_empty()),
            version: creds.version,
            last_selected_view: creds.last_selected_view.as_deref(),
            favorite_jobs: &creds.favorite_jobs,
        },
    }
}

/// TOML-like detail view for table output.
fn format_settings(view: &SettingsView<'_>) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let app = view.app;
    let creds = &view.credentials;

    let _ = writeln!(out, "# {}", view.settings_file);
    let _ = writeln!(out, "[app]");
    let _ = writeln!(out, "server_url = \"{}\"", app.server_url);
    let _ = writeln!(out, "build_delay = {}", app.build_delay);
    let _ = writeln!(out, "job_refresh_period = {}", app.job_refresh_period);
    let _ = writeln!(out, "rss_refresh_period = {}", app.rss_refresh_period);
    let _ = writeln!(out, "display_success_or_stable = {}", app.display_success_or_stable);
    let _ = writeln!(out, "display_unstable_or_fail = {}", app.display_unstable_or_fail);
    let _ = writeln!(out, "display_aborted = {}", app.display_aborted);
    let _ = writeln!(out, "suffix = \"{}\"", app.suffix);
    let _ = writeln!(out, "jobs_filter_pattern = \"{}\"", app.jobs_filter_pattern);

    let _ = writeln!(out);
    let _ = writeln!(out, "[projects.{}]", view.project);
    let _ = writeln!(out, "username = \"{}\"", creds.username);
    let _ = writeln!(
        out,
        "password = \"{}\"  # {}",
        creds.password, creds.password_storage
    );
    let _ = writeln!(out, "crumb_data = \"{}\"", creds.crumb_data);
    let _ = writeln!(out, "version = \"{}\"", creds.version);
    if let Some(view_name) = creds.last_selected_view {
        let _ = writeln!(out, "last_selected_view = \"{view_name}\"");
    }
    for job in creds.favorite_jobs {
        let _ = writeln!(out, "favorite = \"{}\"  # {}", job.name, job.url);
    }

    out
}

#[derive(Serialize)]
struct ProjectView {
    name: String,
    username: String,
    version: JenkinsVersion,
    favorites: usize,
    default: bool,
}

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "Project")]
    name: String,
    #[tabled(rename = "Username")]
    username: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Favorites")]
    favorites: usize,
    #[tabled(rename = "Default")]
    default: String,
}

// ── Connection test ─────────────────────────────────────────────────

/// Run a connection test on a background task and wait for its result.
async fn run_connection_test(
    session: &Session,
    form: &mut FormState,
    global: &GlobalOpts,
) -> Result<ConnectionFeedback, CliError> {
    let url = form.server_url.trim().to_owned();
    let checker =
        JenkinsConnectivity::new(&config::transport(global)).map_err(|e| {
            CliError::ConnectionFailed {
                url: url.clone(),
                message: e.to_string(),
            }
        })?;
    let reconciler = SettingsReconciler::new(checker);
    let (tx, mut rx) = mpsc::unbounded_channel();
    let tester = reconciler.tester(tx);

    let _task = tester.start(form, &session.creds)?;
    let progress = spinner(format!("Connecting to {url}"), global.quiet);
    let event = rx.recv().await;
    progress.finish_and_clear();

    let event = event.ok_or_else(|| CliError::ConnectionFailed {
        url,
        message: "connection test ended without a result".into(),
    })?;
    Ok(event.deliver(form))
}

/// Print the verdict and the server's explanation, if any.
fn print_feedback(feedback: &ConnectionFeedback, global: &GlobalOpts) {
    let color = output::should_color(&global.color);
    output::print_output(&output::render_feedback(feedback, color), global.quiet);
    if let Some(body) = feedback.diagnostic() {
        eprintln!("\nServer response:\n{body}");
    }
}

fn feedback_to_result(
    feedback: ConnectionFeedback,
    session: &Session,
    url: &str,
) -> Result<(), CliError> {
    match feedback.outcome {
        ConnectionOutcome::Success => Ok(()),
        ConnectionOutcome::AuthenticationFailed { message, .. } => Err(CliError::AuthFailed {
            message,
            project: session.project.clone(),
        }),
        ConnectionOutcome::Failed { message } => Err(CliError::ConnectionFailed {
            url: url.to_owned(),
            message,
        }),
    }
}

// ── Prompts ─────────────────────────────────────────────────────────

fn current_text(form: &FormState, field: Field) -> String {
    match field {
        Field::ServerUrl => form.server_url.clone(),
        Field::Username => form.username.clone(),
        Field::CrumbData => form.crumb_data.clone(),
        Field::BuildDelay => form.build_delay.text().to_owned(),
        Field::JobRefreshPeriod => form.job_refresh_period.text().to_owned(),
        Field::RssRefreshPeriod => form.rss_refresh_period.text().to_owned(),
        Field::Suffix => form.suffix.clone(),
        Field::JobsFilterPattern => form.jobs_filter_pattern.clone(),
        Field::Version => form.effective_version().to_string(),
        Field::DisplaySuccessOrStable => form.display_success_or_stable.to_string(),
        Field::DisplayUnstableOrFail => form.display_unstable_or_fail.to_string(),
        Field::DisplayAborted => form.display_aborted.to_string(),
        Field::Password => String::new(),
    }
}

/// Prompt for a text field, refusing input the form would refuse.
fn prompt_text(form: &mut FormState, field: Field, label: &str) -> Result<(), CliError> {
    let probe = form.clone();
    let value: String = Input::new()
        .with_prompt(label)
        .with_initial_text(current_text(form, field))
        .allow_empty(true)
        .validate_with(move |input: &String| -> Result<(), String> {
            probe
                .clone()
                .set_text(field, input)
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;
    form.set_text(field, &value)
        .map_err(|e| CliError::invalid_input(field.as_str(), &e))
}

fn prompt_flag(current: bool, label: &str) -> Result<bool, CliError> {
    Confirm::new()
        .with_prompt(label)
        .default(current)
        .interact()
        .map_err(prompt_err)
}

fn prompt_version(form: &mut FormState) -> Result<(), CliError> {
    let choices = &["Jenkins 1.x (.crumb header)", "Jenkins 2.x (Jenkins-Crumb header)"];
    let default = match form.version {
        Some(JenkinsVersion::Version1) => 0,
        Some(JenkinsVersion::Version2) | None => 1,
    };
    let selection = Select::new()
        .with_prompt("Server version")
        .items(choices)
        .default(default)
        .interact()
        .map_err(prompt_err)?;
    form.version = Some(if selection == 0 {
        JenkinsVersion::Version1
    } else {
        JenkinsVersion::Version2
    });
    Ok(())
}

fn prompt_password(form: &mut FormState) -> Result<(), CliError> {
    let change = !form.has_password()
        || prompt_flag(false, "A password is stored. Change it?")?;
    if change {
        let pw = rpassword::prompt_password("Password or API token: ").map_err(prompt_err)?;
        form.edit_password(pw);
    }
    Ok(())
}

fn prompt_storage() -> Result<PasswordStorage, CliError> {
    let choices = &[
        "Store in system keyring (recommended)",
        "Save to settings file (plaintext)",
    ];
    let selection = Select::new()
        .with_prompt("Where to store the password?")
        .items(choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    Ok(if selection == 0 {
        PasswordStorage::Keyring
    } else {
        PasswordStorage::Plaintext
    })
}

fn read_password_stdin() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

fn report_server_change(server_changed: bool) {
    if server_changed {
        eprintln!("  Server changed: favorites and last selected view were cleared");
    }
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive walk through every field ──────────────
        ConfigCommand::Init => {
            let mut session = Session::open(global)?;
            eprintln!("jenkinsfly settings wizard");
            eprintln!("   Settings file: {}", session.path.display());
            eprintln!("   Project: {}\n", session.project);

            let mut form = session.form();
            prompt_text(&mut form, Field::ServerUrl, "Jenkins URL")?;
            prompt_text(&mut form, Field::Username, "Username (blank for anonymous)")?;
            if !form.username.trim().is_empty() {
                prompt_password(&mut form)?;
            }
            prompt_text(&mut form, Field::CrumbData, "Crumb (blank if CSRF protection is off)")?;
            prompt_version(&mut form)?;
            prompt_text(&mut form, Field::BuildDelay, "Build delay (seconds)")?;
            prompt_text(&mut form, Field::JobRefreshPeriod, "Job refresh period (minutes, 0 = off)")?;
            prompt_text(&mut form, Field::RssRefreshPeriod, "Build event refresh period (minutes, 0 = off)")?;
            form.display_success_or_stable =
                prompt_flag(form.display_success_or_stable, "Show successful/stable builds?")?;
            form.display_unstable_or_fail =
                prompt_flag(form.display_unstable_or_fail, "Show unstable/failed builds?")?;
            form.display_aborted = prompt_flag(form.display_aborted, "Show aborted builds?")?;
            prompt_text(&mut form, Field::Suffix, "Patch suffix")?;
            prompt_text(&mut form, Field::JobsFilterPattern, "Job filter pattern (regex)")?;

            if is_modified(&form, &session.app, &session.creds) {
                eprintln!("\n   Settings changed.");
            } else {
                eprintln!("\n   No changes to the stored settings.");
            }

            jenkinsfly_core::validate(&form, &session.creds)?;
            if prompt_flag(true, "Test the connection now?")? {
                let feedback = run_connection_test(&session, &mut form, global).await?;
                print_feedback(&feedback, global);
            }

            let storage = if form.is_password_modified() {
                prompt_storage()?
            } else {
                PasswordStorage::default()
            };
            let report = session.apply(&mut form, storage)?;

            eprintln!("\n✓ Settings written to {}", session.path.display());
            eprintln!("  Active project: {}", session.project);
            report_server_change(report.server_changed);
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let session = Session::open(global)?;
            let view = settings_view(&session);
            let out = output::render_single(&global.output, &view, format_settings, |v| {
                v.project.to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Set <key> <value> ───────────────────────────────────────
        ConfigCommand::Set { key, value } => {
            let field: Field = key.parse().map_err(|e| CliError::InvalidInput {
                key: key.clone(),
                reason: format!(
                    "{e}. Valid keys: {}",
                    Field::ALL
                        .iter()
                        .filter(|f| **f != Field::Password)
                        .map(|f| f.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })?;
            if field == Field::Password {
                return Err(CliError::InvalidInput {
                    key,
                    reason: "use `jenkinsfly config set-password` instead".into(),
                });
            }

            let mut session = Session::open(global)?;
            let mut form = session.form();
            form.set_text(field, &value)
                .map_err(|e| CliError::invalid_input(&key, &e))?;

            let report = session.apply(&mut form, PasswordStorage::default())?;
            if !global.quiet {
                eprintln!("✓ Set {field} on project '{}'", session.project);
                report_server_change(report.server_changed);
            }
            Ok(())
        }

        // ── SetPassword ─────────────────────────────────────────────
        ConfigCommand::SetPassword {
            plaintext,
            password_stdin,
        } => {
            let mut session = Session::open(global)?;
            let password = if password_stdin {
                read_password_stdin()?
            } else {
                rpassword::prompt_password("Password or API token: ").map_err(prompt_err)?
            };
            if password.trim().is_empty() {
                return Err(CliError::InvalidInput {
                    key: "password".into(),
                    reason: "password cannot be empty".into(),
                });
            }

            let storage = if plaintext {
                PasswordStorage::Plaintext
            } else {
                PasswordStorage::Keyring
            };
            let mut form = session.form();
            form.edit_password(password);
            session.apply(&mut form, storage)?;

            if !global.quiet {
                let place = match storage {
                    PasswordStorage::Keyring => "system keyring",
                    PasswordStorage::Plaintext => "settings file",
                };
                eprintln!("✓ Password stored in {place} for project '{}'", session.project);
            }
            Ok(())
        }

        // ── Test ────────────────────────────────────────────────────
        ConfigCommand::Test => {
            let session = Session::open(global)?;
            let mut form = session.form();
            let url = form.server_url.trim().to_owned();
            let feedback = run_connection_test(&session, &mut form, global).await?;
            print_feedback(&feedback, global);
            feedback_to_result(feedback, &session, &url)
        }

        // ── Projects ────────────────────────────────────────────────
        ConfigCommand::Projects => {
            let session = Session::open(global)?;
            let default = session.file.active_project(None);
            if session.file.projects.is_empty() {
                eprintln!("No projects configured. Run: jenkinsfly config init");
                return Ok(());
            }
            let projects: Vec<ProjectView> = session
                .file
                .projects
                .iter()
                .map(|(name, section)| ProjectView {
                    name: name.clone(),
                    username: section.username.clone(),
                    version: section.version,
                    favorites: section.favorite_jobs.len(),
                    default: *name == default,
                })
                .collect();
            let out = output::render_list(
                &global.output,
                &projects,
                |p| ProjectRow {
                    name: p.name.clone(),
                    username: p.username.clone(),
                    version: p.version.to_string(),
                    favorites: p.favorites,
                    default: if p.default { "*".into() } else { String::new() },
                },
                |p| p.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut session = Session::open(global)?;
            if session.file.set_default_project(&name).is_err() {
                return Err(CliError::ProjectNotFound {
                    available: available_list(session.file.project_names()),
                    name,
                });
            }
            jenkinsfly_config::save_file(&session.path, &session.file)?;
            if !global.quiet {
                eprintln!("✓ Default project set to '{name}'");
            }
            Ok(())
        }
    }
}
