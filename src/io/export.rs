//! Export traces and derived series to CSV.
//!
//! The output is meant to be easy to load in spreadsheets or plotting scripts:
//! one `x` column followed by `y0, y1, ...`.

use std::fs::File;
use std::path::Path;

use crate::error::AppError;

/// Write `x` and any number of y series as columns of a CSV file.
pub fn write_xy_csv(path: &Path, x: &[f64], ys: &[&[f64]]) -> Result<(), AppError> {
    if let Some((i, y)) = ys.iter().enumerate().find(|(_, y)| y.len() != x.len()) {
        return Err(AppError::new(
            2,
            format!("Series y{i} has {} samples but x has {}", y.len(), x.len()),
        ));
    }

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    let mut header = vec!["x".to_string()];
    header.extend((0..ys.len()).map(|i| format!("y{i}")));
    writer
        .write_record(&header)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for (row, &xi) in x.iter().enumerate() {
        let mut record = Vec::with_capacity(ys.len() + 1);
        record.push(xi.to_string());
        record.extend(ys.iter().map(|y| y[row].to_string()));
        writer
            .write_record(&record)
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row {row}: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV '{}': {e}", path.display())))?;
    Ok(())
}
