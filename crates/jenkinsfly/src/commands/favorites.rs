//! Favorites subcommand handlers.
//!
//! Favorites belong to the active project and are only meaningful for the
//! server they were pinned on; changing `server_url` clears them.

use tabled::Tabled;

use jenkinsfly_core::FavoriteJob;

use crate::cli::{FavoritesArgs, FavoritesCommand, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct FavoriteRow {
    #[tabled(rename = "Job")]
    name: String,
    #[tabled(rename = "URL")]
    url: String,
}

/// `<server>/job/<name>/`, the Jenkins job page.
fn default_job_url(server_url: &str, name: &str) -> String {
    format!("{}/job/{name}/", server_url.trim_end_matches('/'))
}

pub fn handle(args: FavoritesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut session = Session::open(global)?;

    match args.command {
        FavoritesCommand::List => {
            let out = output::render_list(
                &global.output,
                &session.creds.favorite_jobs,
                |j: &FavoriteJob| FavoriteRow {
                    name: j.name.clone(),
                    url: j.url.clone(),
                },
                |j| j.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        FavoritesCommand::Add { name, url } => {
            let url = url.unwrap_or_else(|| default_job_url(&session.app.server_url, &name));
            if !session.creds.add_favorite(FavoriteJob {
                name: name.clone(),
                url,
            }) {
                return Err(CliError::FavoriteExists { name });
            }
            session.save_credentials()?;
            if !global.quiet {
                eprintln!("✓ Pinned '{name}' in project '{}'", session.project);
            }
            Ok(())
        }

        FavoritesCommand::Remove { name } => {
            if !session.creds.remove_favorite(&name) {
                return Err(CliError::FavoriteNotFound { name });
            }
            session.save_credentials()?;
            if !global.quiet {
                eprintln!("✓ Unpinned '{name}' in project '{}'", session.project);
            }
            Ok(())
        }
    }
}
