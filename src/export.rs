//! Tabular export and read-back of scraped records.
//!
//! Each source's records are written to one CSV file named after the source
//! tag (`smbc.csv`, `smbc-wiki.csv`, ...). The search aggregator reads those
//! same files back to mine query terms, so the file naming here is a
//! contract, not a convenience.

use crate::record::ComicRecord;
use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A row as read back from a previously exported CSV.
///
/// Only the columns the query-synthesis step needs are retained; any other
/// columns in the file are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportedRow {
    pub url: String,
    #[serde(default)]
    pub page_title: Option<String>,
}

/// Writes records to `<output_dir>/<source_name>.csv` and returns the path.
///
/// Column order follows the record schema. An empty record list still
/// produces the file (and a warning), so downstream consumers can
/// distinguish "ran and found nothing" from "never ran".
pub fn save_records(
    records: &[ComicRecord],
    output_dir: &Path,
    source_name: &str,
) -> Result<PathBuf> {
    if records.is_empty() {
        tracing::warn!("No comic data for source '{}'; writing empty export", source_name);
    }

    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(format!("{}.csv", source_name));

    let mut writer = csv::Writer::from_path(&path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    tracing::info!("Saved {} rows to {}", records.len(), path.display());
    Ok(path)
}

/// Reads a previously exported CSV back into rows.
pub fn read_export(path: &Path) -> Result<Vec<ExportedRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_records() -> Vec<ComicRecord> {
        vec![
            ComicRecord::new("https://www.smbc-comics.com/comic/2025-09-13", "2025-09-13", Source::Smbc)
                .unwrap()
                .with_date(NaiveDate::from_ymd_opt(2025, 9, 13))
                .with_page_title(Some("Saturday Morning Breakfast Cereal - Physics".to_string()))
                .with_hover_text(Some("the hover".to_string())),
            ComicRecord::new("https://www.smbc-comics.com/comic/2025-09-14", "2025-09-14", Source::Smbc)
                .unwrap()
                .with_date(NaiveDate::from_ymd_opt(2025, 9, 14)),
        ]
    }

    #[test]
    fn test_save_and_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = save_records(&sample_records(), dir.path(), "smbc").unwrap();
        assert_eq!(path, dir.path().join("smbc.csv"));

        let rows = read_export(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url, "https://www.smbc-comics.com/comic/2025-09-13");
        assert_eq!(
            rows[0].page_title.as_deref(),
            Some("Saturday Morning Breakfast Cereal - Physics")
        );
        assert!(rows[1].page_title.is_none());
    }

    #[test]
    fn test_empty_export_writes_header_only_file() {
        let dir = TempDir::new().unwrap();
        let path = save_records(&[], dir.path(), "ohnorobot").unwrap();
        let rows = read_export(&path).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_read_export_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        assert!(read_export(&dir.path().join("nope.csv")).is_err());
    }
}
