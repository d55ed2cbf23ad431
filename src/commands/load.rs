use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::LoadArgs;
use crate::model::{FileOutcome, LoadCounts, LoadPaths, LoadRunManifest};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub mod report;
pub mod store;


const MANIFEST_VERSION: u32 = 1;
const REPORT_EXTENSIONS: [&str; 2] = ["xls", "xlsx"];

pub fn run(args: LoadArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("run-{}", utc_compact_string(started_ts));

    let (entry_count, reports) = discover_reports(&args.inbox_dir)?;
    if entry_count == 0 {
        info!(inbox = %args.inbox_dir.display(), "there are no files to load");
        return Ok(());
    }

    info!(
        inbox = %args.inbox_dir.display(),
        run_id = %run_id,
        reports = reports.len(),
        "starting load"
    );

    ensure_directory(&args.processed_dir)?;

    let mut outcomes = Vec::with_capacity(reports.len());
    for path in &reports {
        outcomes.push(process_report(path, &args)?);
    }

    let counts = LoadCounts {
        files_seen: reports.len(),
        files_loaded: outcomes
            .iter()
            .filter(|outcome| outcome.status == "loaded")
            .count(),
        files_failed: outcomes
            .iter()
            .filter(|outcome| outcome.status == "failed")
            .count(),
        rows_inserted: outcomes.iter().map(|outcome| outcome.rows_inserted).sum(),
    };

    let manifest = LoadRunManifest {
        manifest_version: MANIFEST_VERSION,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        paths: LoadPaths {
            inbox_dir: args.inbox_dir.display().to_string(),
            processed_dir: args.processed_dir.display().to_string(),
            db_path: args.db_path.display().to_string(),
            error_log: args.error_log.display().to_string(),
        },
        counts,
        files: outcomes,
    };

    let manifest_path = args
        .manifest_dir
        .join(format!("load_run_{}.json", utc_compact_string(started_ts)));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(path = %manifest_path.display(), "wrote load run manifest");
    info!(
        loaded = manifest.counts.files_loaded,
        failed = manifest.counts.files_failed,
        rows = manifest.counts.rows_inserted,
        "load completed"
    );

    Ok(())
}

/// Enumerates the inbox, returning the total entry count alongside the
/// recognized report paths sorted by filename. Directory-listing order is
/// not stable across platforms, so the sort keeps runs reproducible.
pub(crate) fn discover_reports(inbox_dir: &Path) -> Result<(usize, Vec<PathBuf>)> {
    let mut entry_count = 0;
    let mut reports = Vec::new();

    let entries = fs::read_dir(inbox_dir)
        .with_context(|| format!("failed to read {}", inbox_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", inbox_dir.display()))?;
        entry_count += 1;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_report = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                REPORT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            })
            .unwrap_or(false);

        if is_report {
            reports.push(path);
        }
    }

    reports.sort();
    Ok((entry_count, reports))
}

/// Loads one report and relocates or logs it. Per-file failures are
/// captured in the returned outcome; only driver-level I/O failures
/// (relocation, error-log append) abort the batch.
fn process_report(path: &Path, args: &LoadArgs) -> Result<FileOutcome> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

    info!(file = %filename, "loading report");

    match load_report(path, &args.db_path) {
        Ok(store::AppendOutcome::Committed {
            before,
            after,
            inserted,
        }) => {
            let sha256 = sha256_file(path)?;
            let destination = args.processed_dir.join(&filename);
            fs::rename(path, &destination).with_context(|| {
                format!(
                    "failed to move {} to {}",
                    path.display(),
                    destination.display()
                )
            })?;
            info!(file = %filename, before, after, rows = inserted, "report loaded and relocated");

            Ok(FileOutcome {
                filename,
                sha256: Some(sha256),
                status: "loaded".to_string(),
                rows_inserted: inserted,
                error: None,
            })
        }
        Ok(store::AppendOutcome::VerificationMismatch {
            before,
            after,
            expected,
        }) => {
            warn!(file = %filename, before, after, expected, "row count mismatch, leaving report in inbox");
            append_error_line(&args.error_log, &filename)?;

            Ok(FileOutcome {
                filename,
                sha256: None,
                status: "failed".to_string(),
                rows_inserted: 0,
                error: Some(format!("expected {expected} rows but have {after}")),
            })
        }
        Err(err) => {
            warn!(file = %filename, error = %err, "failed to load report, leaving in inbox");
            append_error_line(&args.error_log, &filename)?;

            Ok(FileOutcome {
                filename,
                sha256: None,
                status: "failed".to_string(),
                rows_inserted: 0,
                error: Some(format!("{err:#}")),
            })
        }
    }
}

fn load_report(path: &Path, db_path: &Path) -> Result<store::AppendOutcome> {
    let records = report::read_report(path)
        .with_context(|| format!("failed to read report {}", path.display()))?;

    // One store connection per report, dropped on every exit path.
    let mut connection = store::open_store(db_path)?;
    store::append_records(&mut connection, &records)
}

fn append_error_line(error_log: &Path, filename: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(error_log)
        .with_context(|| format!("failed to open error log {}", error_log.display()))?;
    writeln!(file, "{filename}")
        .with_context(|| format!("failed to append to error log {}", error_log.display()))?;
    Ok(())
}
