use std::path::{Path, PathBuf};

use calamine::{open_workbook, DataType, Reader, Xlsx};
use tracing::{debug, info};

use crate::domain::error::{AppError, Result};

/// Convert the first worksheet of an XLSX workbook into a CSV file next to it
/// (`<stem>.csv`) and remove the workbook. Returns the CSV path.
pub fn convert_xlsx_to_csv(xlsx_path: &Path) -> Result<PathBuf> {
    let csv_path = xlsx_path.with_extension("csv");
    let rows = read_first_sheet(xlsx_path)?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&csv_path)
        .map_err(|e| {
            AppError::IoError(format!(
                "Failed to create CSV file {}: {}",
                csv_path.display(),
                e
            ))
        })?;

    for row in &rows {
        writer.write_record(row)?;
    }
    writer.flush()?;

    std::fs::remove_file(xlsx_path).map_err(|e| {
        AppError::IoError(format!(
            "Failed to remove converted workbook {}: {}",
            xlsx_path.display(),
            e
        ))
    })?;

    info!(
        xlsx = %xlsx_path.display(),
        csv = %csv_path.display(),
        rows = rows.len(),
        "Excel converted to CSV"
    );
    Ok(csv_path)
}

/// Read every row of the first worksheet as display strings
pub fn read_first_sheet(xlsx_path: &Path) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = open_workbook(xlsx_path).map_err(|e| {
        AppError::ParseError(format!(
            "Failed to open Excel file {}: {}",
            xlsx_path.display(),
            e
        ))
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?
        .map_err(|e| AppError::ParseError(format!("Failed to read Excel range: {}", e)))?;

    let rows: Vec<Vec<String>> = range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| {
                    cell.as_string()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| format!("{}", cell))
                })
                .collect()
        })
        .collect();

    debug!(path = %xlsx_path.display(), rows = rows.len(), "Read Excel worksheet");
    Ok(rows)
}
