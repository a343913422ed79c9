//! Directory commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_entity::directory::Directory;

use super::AppServices;
use crate::output::{self, OutputFormat};

/// Arguments for directory commands
#[derive(Debug, Args)]
pub struct DirArgs {
    /// Directory subcommand
    #[command(subcommand)]
    pub command: DirCommand,
}

/// Directory subcommands
#[derive(Debug, Subcommand)]
pub enum DirCommand {
    /// Create a directory and any missing parents
    Create {
        /// Logical path, e.g. /docs/2024
        path: String,
    },
    /// Move a directory tree to the trash and drop its rows
    Delete {
        /// Logical path
        path: String,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
    /// Move a directory tree to a new path
    Rename {
        /// Current logical path
        from: String,
        /// New logical path
        to: String,
    },
    /// List every known directory
    List,
}

/// Directory display row for table output
#[derive(Debug, Serialize, Tabled)]
struct DirectoryRow {
    /// Directory ID
    id: String,
    /// Logical path
    path: String,
    /// Created at
    created_at: String,
}

impl From<&Directory> for DirectoryRow {
    fn from(d: &Directory) -> Self {
        Self {
            id: d.id.to_string(),
            path: d.path.clone(),
            created_at: d.created_at.format("%Y-%m-%d %H:%M").to_string(),
        }
    }
}

/// Execute directory commands
pub async fn execute(
    args: &DirArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = AppServices::connect(config).await?;
    let directories = services.gateway.directories();

    match &args.command {
        DirCommand::Create { path } => match directories.create_if_absent(path).await? {
            Some(dir) => output::print_item(&DirectoryRow::from(&dir), format),
            None => output::print_warning("The root directory always exists."),
        },
        DirCommand::Delete { path, force } => {
            if !force {
                let confirm = dialoguer::Confirm::new()
                    .with_prompt(format!(
                        "Move '{path}' and everything below it to the trash?"
                    ))
                    .default(false)
                    .interact()
                    .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

                if !confirm {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let deletion = directories.delete(path).await?;
            output::print_success(&format!("Deleted '{}'", deletion.path));
            match &deletion.trashed_to {
                Some(dest) => output::print_kv("Trashed to", &dest.display().to_string()),
                None => output::print_warning("Nothing was on disk; only rows were removed."),
            }
            if let Some(dest) = &deletion.trashed_files_to {
                output::print_kv("Trashed files moved to", &dest.display().to_string());
            }
            output::print_kv("Files removed", &deletion.summary.files_removed.to_string());
            output::print_kv(
                "Directories removed",
                &deletion.summary.directories_removed.to_string(),
            );
        }
        DirCommand::Rename { from, to } => {
            let summary = directories.rename(from, to).await?;
            output::print_success(&format!("Renamed '{from}' to '{to}'"));
            output::print_kv("Files moved", &summary.files_moved.to_string());
            output::print_kv("Directories moved", &summary.directories_moved.to_string());
        }
        DirCommand::List => {
            let dirs = directories.list().await?;
            let rows: Vec<DirectoryRow> = dirs.iter().map(DirectoryRow::from).collect();
            output::print_list(&rows, format);
        }
    }

    Ok(())
}
