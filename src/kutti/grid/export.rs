//! CSV export of the currently filtered rows.
//!
//! Header row is the column labels. Cell values are the raw field values,
//! not the rendered ones, quoted only when they contain a delimiter, quote
//! or line break (doubling inner quotes).

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use super::column::ColumnDescriptor;
use crate::error::{KuttiError, Result};
use crate::model::{field_text, Record};

pub fn to_csv(columns: &[ColumnDescriptor], rows: &[&Record]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(columns.iter().map(|c| c.label.as_str()))?;
    for row in rows {
        writer.write_record(columns.iter().map(|c| field_text(row, &c.key)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| KuttiError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| KuttiError::Validation(e.to_string()))
}

/// `Children Overview` on 2024-05-01 becomes `children_overview_2024-05-01.csv`.
pub fn export_filename(title: &str, date: NaiveDate) -> String {
    let slug = title
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    let slug = if slug.is_empty() {
        "export".to_string()
    } else {
        slug
    };
    format!("{}_{}.csv", slug, date.format("%Y-%m-%d"))
}

pub fn write_csv(dir: &Path, filename: &str, contents: &str) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let path = dir.join(filename);
    fs::write(&path, contents)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("name", "Name"),
            ColumnDescriptor::new("notes", "Notes"),
        ]
    }

    #[test]
    fn header_is_labels_and_plain_values_stay_unquoted() {
        let row = json!({"name": "Maria", "notes": "ok"})
            .as_object()
            .unwrap()
            .clone();
        let csv = to_csv(&columns(), &[&row]).unwrap();
        assert_eq!(csv, "Name,Notes\nMaria,ok\n");
    }

    #[test]
    fn commas_and_quotes_survive_a_round_trip() {
        let tricky = "Rossi, \"Nina\" and co";
        let row = json!({"name": tricky, "notes": null})
            .as_object()
            .unwrap()
            .clone();
        let csv = to_csv(&columns(), &[&row]).unwrap();
        assert!(csv.contains("\"Rossi, \"\"Nina\"\" and co\""));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], tricky);
        assert_eq!(&record[1], "");
    }

    #[test]
    fn filename_uses_title_and_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(
            export_filename("Children  Overview", date),
            "children_overview_2024-05-01.csv"
        );
        assert_eq!(export_filename("  ", date), "export_2024-05-01.csv");
    }

    #[test]
    fn write_csv_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out");
        let path = write_csv(&target, "x.csv", "a\n").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a\n");
    }
}
