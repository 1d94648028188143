//! Clap derive structures for the `jenkinsfly` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// jenkinsfly -- manage Jenkins connection settings from the command line
#[derive(Debug, Parser)]
#[command(
    name = "jenkinsfly",
    version,
    about = "Manage Jenkins server settings from the command line",
    long_about = "Edit, validate, and test the settings used to talk to a Jenkins server.\n\n\
        Application settings are shared; credentials, favorites, and the last\n\
        selected view are kept per project.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Project whose credentials to use
    #[arg(long, short = 'p', env = "JENKINSFLY_PROJECT", global = true)]
    pub project: Option<String>,

    /// Settings file (defaults to the platform config directory)
    #[arg(long, env = "JENKINSFLY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "JENKINSFLY_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "JENKINSFLY_INSECURE", global = true)]
    pub insecure: bool,

    /// PEM file with an extra CA certificate to trust
    #[arg(long, env = "JENKINSFLY_CA_CERT", global = true, conflicts_with = "insecure")]
    pub ca_cert: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, env = "JENKINSFLY_TIMEOUT", default_value = "30", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Edit, validate, and test settings
    #[command(alias = "cfg")]
    Config(ConfigArgs),

    /// Manage favorite jobs of the active project
    #[command(alias = "fav")]
    Favorites(FavoritesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Walk through every setting interactively
    Init,

    /// Display the settings of the active project
    Show,

    /// Set one setting, validating before saving
    Set {
        /// Setting name (e.g. server_url, build_delay, display-aborted)
        key: String,

        /// Value to set
        value: String,
    },

    /// Store the password of the active project
    SetPassword {
        /// Save to the settings file instead of the system keyring
        #[arg(long)]
        plaintext: bool,

        /// Read the password from stdin instead of prompting
        #[arg(long)]
        password_stdin: bool,
    },

    /// Check that the server accepts the stored settings
    Test,

    /// List configured projects
    Projects,

    /// Set the default project
    Use {
        /// Project name to set as default
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FAVORITES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FavoritesArgs {
    #[command(subcommand)]
    pub command: FavoritesCommand,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesCommand {
    /// List favorite jobs
    #[command(alias = "ls")]
    List,

    /// Pin a job
    Add {
        /// Job name
        name: String,

        /// Job URL (defaults to <server_url>/job/<name>/)
        #[arg(long)]
        url: Option<String>,
    },

    /// Unpin a job
    #[command(alias = "rm")]
    Remove {
        /// Job name
        name: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
