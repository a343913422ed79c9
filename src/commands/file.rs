//! File commands: upload, trash, restore, inspect and download.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_core::traits::storage::Filesystem;
use cloudbox_core::types::FileId;
use cloudbox_entity::file::{File, FileKey};
use cloudbox_storage::{LocalFileBlob, LocalFilesystem};

use super::AppServices;
use crate::output::{self, OutputFormat};

/// Arguments for file commands
#[derive(Debug, Args)]
pub struct FileArgs {
    /// File subcommand
    #[command(subcommand)]
    pub command: FileCommand,
}

/// File subcommands
#[derive(Debug, Subcommand)]
pub enum FileCommand {
    /// Upload a local file to a logical path such as /docs/report.pdf
    Upload {
        /// Local file to read
        source: PathBuf,
        /// Logical destination
        dest: String,
    },
    /// Move a file to the trash
    Delete {
        /// Logical path of the file
        path: String,
    },
    /// Bring a trashed file back
    Restore {
        /// Logical path the file was deleted from
        path: String,
    },
    /// Show a file by id
    Info {
        /// File ID
        id: FileId,
    },
    /// List active files in a directory
    List {
        /// Logical directory path, e.g. /docs
        path: String,
    },
    /// Copy a file's bytes to a local path
    Download {
        /// File ID
        id: FileId,
        /// Local output path
        #[arg(short, long)]
        out: PathBuf,
    },
}

/// File display row for table output
#[derive(Debug, Serialize, Tabled)]
struct FileRow {
    /// File ID
    id: String,
    /// Logical path
    path: String,
    /// State
    state: String,
    /// Uploaded at
    created_at: String,
    /// Trashed at
    deleted_at: String,
}

impl From<&File> for FileRow {
    fn from(f: &File) -> Self {
        Self {
            id: f.id.to_string(),
            path: f.key().to_string(),
            state: f.state.to_string(),
            created_at: f.created_at.format("%Y-%m-%d %H:%M").to_string(),
            deleted_at: f
                .deleted_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Execute file commands
pub async fn execute(
    args: &FileArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = AppServices::connect(config).await?;
    let gateway = &services.gateway;

    match &args.command {
        FileCommand::Upload { source, dest } => {
            let key = parse_key(dest)?;
            let mut blob = LocalFileBlob::new(source.clone()).await?;
            let file = gateway.upload(&key, &mut blob).await?;
            output::print_item(&FileRow::from(&file), format);
        }
        FileCommand::Delete { path } => {
            let file = gateway.delete(&parse_key(path)?).await?;
            output::print_success(&format!("Moved '{}' to the trash", file.key()));
        }
        FileCommand::Restore { path } => {
            let file = gateway.restore(&parse_key(path)?).await?;
            output::print_success(&format!("Restored '{}'", file.key()));
        }
        FileCommand::Info { id } => {
            let file = gateway.files().get_file(*id).await?;
            output::print_item(&FileRow::from(&file), format);
        }
        FileCommand::List { path } => {
            let files = gateway.files().list_files(path).await?;
            let rows: Vec<FileRow> = files.iter().map(FileRow::from).collect();
            output::print_list(&rows, format);
        }
        FileCommand::Download { id, out } => {
            let (file, stream) = gateway.files().open_file(*id).await?;
            let fs = LocalFilesystem::new();
            let mut sink = fs.create(out).await?;
            let written = fs.copy(&mut sink, stream).await?;
            output::print_success(&format!(
                "Wrote {written} bytes of '{}' to {}",
                file.key(),
                out.display()
            ));
        }
    }

    Ok(())
}

/// Split `/docs/report.pdf` into its directory, base name and extension.
fn parse_key(logical: &str) -> Result<FileKey, AppError> {
    let (path, name) = logical
        .rsplit_once('/')
        .ok_or_else(|| AppError::validation(format!("'{logical}' must start with '/'")))?;
    let (file_name, extension) = name.rsplit_once('.').ok_or_else(|| {
        AppError::invalid_field("extension", format!("'{name}' has no extension"))
    })?;
    Ok(FileKey::new(file_name, extension, path))
}
