use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use thiserror::Error;

use crate::model::CallRecord;

/// Fixed positional layout of the exported report.
pub const COLUMN_COUNT: usize = 14;
const HEADER_ROWS: usize = 13;
const FOOTER_ROWS: usize = 2;

const START_COLUMN: usize = 0;
const DURATION_COLUMN: usize = 1;
const DISPOSITION_COLUMN: usize = 6;
const WAIT_COLUMN: usize = 7;
const SELF_SERVICE_COLUMN: usize = 8;
const ACTIVE_COLUMN: usize = 9;
const ON_HOLD_COLUMN: usize = 10;
const CONTACT_ID_COLUMN: usize = 11;

#[derive(Debug, Error)]
#[error("malformed time field: {0:?}")]
pub struct TimeFormatError(pub String);

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to open workbook")]
    Workbook(#[from] calamine::Error),

    #[error("workbook has no sheets")]
    NoSheet,

    #[error("report has {rows} rows, expected at least {minimum} for headers and footers")]
    TooShort { rows: usize, minimum: usize },

    #[error("report has {found} columns, expected {expected}")]
    ColumnCount { found: usize, expected: usize },

    #[error("bad time field at row {row}, column {column}")]
    TimeFormat {
        row: usize,
        column: usize,
        #[source]
        source: TimeFormatError,
    },

    #[error("unreadable cell at row {row}, column {column}: {value}")]
    Cell {
        row: usize,
        column: usize,
        value: String,
    },

    #[error("row {row} has a blank disposition and no earlier value to inherit")]
    LeadingBlankDisposition { row: usize },
}

/// Converts an `H:MM:SS` string into elapsed seconds.
///
/// The legacy loader multiplied hours by 360; that was a transcription
/// defect and the conventional 3600 is used here.
pub fn parse_clock_seconds(value: &str) -> Result<i64, TimeFormatError> {
    let mut fields = value.trim().split(':');
    let mut parts = [0_i64; 3];

    for slot in parts.iter_mut() {
        let field = fields
            .next()
            .ok_or_else(|| TimeFormatError(value.to_string()))?;
        *slot = field
            .parse()
            .map_err(|_| TimeFormatError(value.to_string()))?;
    }

    if fields.next().is_some() {
        return Err(TimeFormatError(value.to_string()));
    }

    let [hours, minutes, seconds] = parts;
    Ok(hours * 3600 + minutes * 60 + seconds)
}

/// Replaces each blank with the most recent non-blank value above it.
/// Merged cells in the export leave every row after the first blank.
pub fn forward_fill(values: &mut [Option<String>]) {
    let mut last: Option<String> = None;

    for slot in values.iter_mut() {
        match slot {
            Some(value) => last = Some(value.clone()),
            None => slot.clone_from(&last),
        }
    }
}

/// Reads one exported report into ordered call records.
///
/// Skips the fixed header and footer rows, maps the remaining rows by
/// column position, converts the clock-formatted columns to seconds, and
/// forward-fills the disposition column. A leading blank disposition has
/// nothing to inherit and rejects the whole file.
pub fn read_report(path: &Path) -> Result<Vec<CallRecord>, ReportError> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .ok_or(ReportError::NoSheet)?
        .clone();
    let range = workbook.worksheet_range(&sheet_name)?;

    let rows: Vec<_> = range.rows().collect();
    let minimum = HEADER_ROWS + FOOTER_ROWS;
    if rows.len() < minimum {
        return Err(ReportError::TooShort {
            rows: rows.len(),
            minimum,
        });
    }

    let data_rows = &rows[HEADER_ROWS..rows.len() - FOOTER_ROWS];
    if !data_rows.is_empty() && range.width() != COLUMN_COUNT {
        return Err(ReportError::ColumnCount {
            found: range.width(),
            expected: COLUMN_COUNT,
        });
    }

    let mut dispositions = Vec::with_capacity(data_rows.len());
    for (offset, row) in data_rows.iter().enumerate() {
        dispositions.push(optional_text(row, offset + HEADER_ROWS, DISPOSITION_COLUMN)?);
    }
    forward_fill(&mut dispositions);

    let mut records = Vec::with_capacity(data_rows.len());
    for (offset, (row, disposition)) in data_rows.iter().zip(&dispositions).enumerate() {
        let row_index = offset + HEADER_ROWS;
        let disposition = disposition
            .clone()
            .ok_or(ReportError::LeadingBlankDisposition { row: row_index })?;

        records.push(CallRecord {
            start: start_text(row, row_index)?,
            duration: time_seconds(row, row_index, DURATION_COLUMN)?,
            customer: text(row, row_index, 2)?,
            direction: text(row, row_index, 3)?,
            first_routing: text(row, row_index, 4)?,
            first_queue: text(row, row_index, 5)?,
            disposition,
            wait: time_seconds(row, row_index, WAIT_COLUMN)?,
            self_service: time_seconds(row, row_index, SELF_SERVICE_COLUMN)?,
            active: time_seconds(row, row_index, ACTIVE_COLUMN)?,
            on_hold: time_seconds(row, row_index, ON_HOLD_COLUMN)?,
            contact_id: integer(row, row_index, CONTACT_ID_COLUMN)?,
            source: text(row, row_index, 12)?,
            agent: text(row, row_index, 13)?,
        });
    }

    Ok(records)
}

fn text(row: &[Data], row_index: usize, column: usize) -> Result<String, ReportError> {
    match &row[column] {
        Data::Empty => Ok(String::new()),
        Data::String(value) => Ok(value.trim().to_string()),
        Data::Int(value) => Ok(value.to_string()),
        Data::Float(value) => Ok(value.to_string()),
        other => Err(cell_error(row_index, column, other)),
    }
}

fn optional_text(
    row: &[Data],
    row_index: usize,
    column: usize,
) -> Result<Option<String>, ReportError> {
    let value = text(row, row_index, column)?;
    Ok(if value.is_empty() { None } else { Some(value) })
}

fn start_text(row: &[Data], row_index: usize) -> Result<String, ReportError> {
    match &row[START_COLUMN] {
        Data::String(value) => Ok(value.trim().to_string()),
        Data::DateTimeIso(value) => Ok(value.trim().to_string()),
        Data::DateTime(stamp) => stamp
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .ok_or_else(|| cell_error(row_index, START_COLUMN, &row[START_COLUMN])),
        other => Err(cell_error(row_index, START_COLUMN, other)),
    }
}

fn time_seconds(row: &[Data], row_index: usize, column: usize) -> Result<i64, ReportError> {
    match &row[column] {
        Data::String(value) => {
            parse_clock_seconds(value).map_err(|source| ReportError::TimeFormat {
                row: row_index,
                column,
                source,
            })
        }
        // Excel sometimes types clock strings as native durations.
        Data::DateTime(stamp) => stamp
            .as_duration()
            .map(|duration| duration.num_seconds())
            .ok_or_else(|| cell_error(row_index, column, &row[column])),
        other => Err(cell_error(row_index, column, other)),
    }
}

fn integer(row: &[Data], row_index: usize, column: usize) -> Result<i64, ReportError> {
    match &row[column] {
        Data::Int(value) => Ok(*value),
        Data::Float(value) if value.fract() == 0.0 => Ok(*value as i64),
        Data::String(value) => value
            .trim()
            .parse()
            .map_err(|_| cell_error(row_index, column, &row[column])),
        other => Err(cell_error(row_index, column, other)),
    }
}

fn cell_error(row_index: usize, column: usize, value: &Data) -> ReportError {
    ReportError::Cell {
        row: row_index,
        column,
        value: format!("{value:?}"),
    }
}
