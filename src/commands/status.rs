use std::fs;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::load;
use crate::commands::load::store;

pub fn run(args: StatusArgs) -> Result<()> {
    info!(inbox = %args.inbox_dir.display(), "status requested");

    if args.inbox_dir.exists() {
        let (entry_count, reports) = load::discover_reports(&args.inbox_dir)?;
        info!(
            entries = entry_count,
            pending_reports = reports.len(),
            "inbox status"
        );
    } else {
        warn!(path = %args.inbox_dir.display(), "inbox directory missing");
    }

    if args.db_path.exists() {
        let connection = store::open_store(&args.db_path)?;
        let rows = store::table_row_count(&connection)?;
        info!(path = %args.db_path.display(), rows, "database status");
    } else {
        warn!(path = %args.db_path.display(), "database file missing");
    }

    if args.error_log.exists() {
        let raw = fs::read_to_string(&args.error_log)
            .with_context(|| format!("failed to read {}", args.error_log.display()))?;
        let failed_files = raw.lines().filter(|line| !line.trim().is_empty()).count();
        info!(path = %args.error_log.display(), failed_files, "error log status");
    } else {
        info!(path = %args.error_log.display(), "no failures recorded");
    }

    Ok(())
}
