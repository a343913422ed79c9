//! Orphan audit command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use cloudbox_core::config::AppConfig;
use cloudbox_core::error::AppError;
use cloudbox_service::ReconcileReport;

use super::AppServices;
use crate::output::{self, OutputFormat};

/// Arguments for the reconcile command
#[derive(Debug, Args)]
pub struct ReconcileArgs {
    /// Exit with an error when anything disagrees
    #[arg(long)]
    pub strict: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct FindingRow {
    kind: &'static str,
    path: String,
}

fn findings(report: &ReconcileReport) -> Vec<FindingRow> {
    let mut rows = Vec::with_capacity(report.len());
    let mut push = |kind, path: String| rows.push(FindingRow { kind, path });
    for p in &report.untracked_files {
        push("untracked file", p.display().to_string());
    }
    for k in &report.missing_files {
        push("missing file", k.to_string());
    }
    for p in &report.untracked_trash {
        push("untracked trash", p.display().to_string());
    }
    for k in &report.missing_trash {
        push("missing trash", k.to_string());
    }
    for d in &report.untracked_directories {
        push("untracked directory", d.clone());
    }
    for d in &report.missing_directories {
        push("missing directory", d.clone());
    }
    rows
}

/// Execute the reconcile command
pub async fn execute(
    args: &ReconcileArgs,
    config: &AppConfig,
    format: OutputFormat,
) -> Result<(), AppError> {
    let services = AppServices::connect(config).await?;
    let report = services.reconciler.reconcile_orphans().await?;

    if !report.deleted_directory_files.is_empty() {
        output::print_kv(
            "Purgeable files",
            &report.deleted_directory_files.len().to_string(),
        );
    }
    if report.is_clean() {
        output::print_success("Filesystem and metadata agree.");
        return Ok(());
    }

    output::print_list(&findings(&report), format);
    if args.strict {
        return Err(AppError::conflict(format!(
            "{} disagreement(s) between filesystem and metadata",
            report.len()
        )));
    }
    Ok(())
}
