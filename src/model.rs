use serde::Serialize;

/// One call-detail event, mapped positionally from the 14-column report.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub start: String,
    pub duration: i64,
    pub customer: String,
    pub direction: String,
    pub first_routing: String,
    pub first_queue: String,
    pub disposition: String,
    pub wait: i64,
    pub self_service: i64,
    pub active: i64,
    pub on_hold: i64,
    pub contact_id: i64,
    pub source: String,
    pub agent: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub filename: String,
    pub sha256: Option<String>,
    pub status: String,
    pub rows_inserted: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadCounts {
    pub files_seen: usize,
    pub files_loaded: usize,
    pub files_failed: usize,
    pub rows_inserted: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadPaths {
    pub inbox_dir: String,
    pub processed_dir: String,
    pub db_path: String,
    pub error_log: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub started_at: String,
    pub updated_at: String,
    pub paths: LoadPaths,
    pub counts: LoadCounts,
    pub files: Vec<FileOutcome>,
}
