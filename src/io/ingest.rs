//! Trace CSV ingest.
//!
//! Input format is deliberately simple: two numeric columns `x,y`.
//!
//! - an optional non-numeric header row is skipped
//! - blank lines are ignored
//! - any other malformed row aborts the ingest with its line number (exit code 2)
//! - an input with no data rows is exit code 3

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::domain::Trace;
use crate::error::AppError;
use crate::math::db_to_linear_all;

/// Ingested trace plus where it came from.
#[derive(Debug, Clone)]
pub struct IngestedTrace {
    pub trace: Trace,
    /// Header names, when the first row was a header.
    pub header: Option<(String, String)>,
    pub rows_read: usize,
}

/// Load an `x,y` trace from a CSV file.
///
/// With `y_in_db`, the y column is converted from dB to linear power.
pub fn load_trace(path: &Path, y_in_db: bool) -> Result<IngestedTrace, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let mut ingested = read_trace(file).map_err(|e| AppError::new(e.exit_code(), format!("{}: {e}", path.display())))?;
    if y_in_db {
        ingested.trace.y = db_to_linear_all(&ingested.trace.y);
    }
    debug!(path = %path.display(), rows = ingested.rows_read, "loaded trace");
    Ok(ingested)
}

/// Parse an `x,y` trace from any reader.
pub fn read_trace<R: Read>(reader: R) -> Result<IngestedTrace, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut x = Vec::new();
    let mut y = Vec::new();
    let mut header = None;
    let mut rows_read = 0usize;

    for result in reader.records() {
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error: {e}")))?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(rows_read + 1);

        if is_blank(&record) {
            continue;
        }
        rows_read += 1;

        match parse_row(&record) {
            Ok((xi, yi)) => {
                x.push(xi);
                y.push(yi);
            }
            Err(_) if x.is_empty() && header.is_none() && looks_like_header(&record) => {
                header = Some((
                    normalize_header_name(record.get(0).unwrap_or_default()),
                    normalize_header_name(record.get(1).unwrap_or_default()),
                ));
            }
            Err(message) => {
                return Err(AppError::new(2, format!("line {line}: {message}")));
            }
        }
    }

    if x.is_empty() {
        return Err(AppError::new(3, "No data rows found in trace CSV."));
    }
    if record_count_is_suspicious(x.len()) {
        warn!(rows = x.len(), "very short trace; fits may be underdetermined");
    }

    let trace = Trace::new(x, y)?;
    Ok(IngestedTrace {
        trace,
        header,
        rows_read,
    })
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|f| f.is_empty())
}

fn parse_row(record: &StringRecord) -> Result<(f64, f64), String> {
    if record.len() < 2 {
        return Err(format!("expected 2 columns, found {}", record.len()));
    }
    if record.len() > 2 && record.iter().skip(2).any(|f| !f.is_empty()) {
        return Err(format!("expected 2 columns, found {}", record.len()));
    }
    let x = parse_f64(&record[0]).ok_or_else(|| format!("invalid x value '{}'", &record[0]))?;
    let y = parse_f64(&record[1]).ok_or_else(|| format!("invalid y value '{}'", &record[1]))?;
    Ok((x, y))
}

fn parse_f64(field: &str) -> Option<f64> {
    let v: f64 = normalize_header_name(field).parse().ok()?;
    v.is_finite().then_some(v)
}

/// A header has exactly two non-numeric, non-empty fields.
fn looks_like_header(record: &StringRecord) -> bool {
    record.len() >= 2
        && record
            .iter()
            .take(2)
            .all(|f| !f.is_empty() && normalize_header_name(f).parse::<f64>().is_err())
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes start with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_string()
}

fn record_count_is_suspicious(n: usize) -> bool {
    n < crate::domain::TripletParams::LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_plain_numeric_rows() {
        let data = "0.0,1.0\n0.5,2.0\n1.0,3.5\n";
        let t = read_trace(data.as_bytes()).unwrap();
        assert_eq!(t.trace.x, vec![0.0, 0.5, 1.0]);
        assert_eq!(t.trace.y, vec![1.0, 2.0, 3.5]);
        assert!(t.header.is_none());
        assert_eq!(t.rows_read, 3);
    }

    #[test]
    fn skips_header_and_blank_lines() {
        let data = "\u{feff}freq , power\n0,1\n\n  \n1,2\n";
        let t = read_trace(data.as_bytes()).unwrap();
        assert_eq!(t.trace.len(), 2);
        assert_eq!(t.header, Some(("freq".to_string(), "power".to_string())));
    }

    #[test]
    fn malformed_row_reports_line_number() {
        let data = "x,y\n0,1\n1,abc\n2,3\n";
        let err = read_trace(data.as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn header_only_is_no_data() {
        let err = read_trace("x,y\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn extra_columns_are_rejected() {
        let err = read_trace("0,1,2\n".as_bytes()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let err = read_trace("0,1\n1,NaN\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
