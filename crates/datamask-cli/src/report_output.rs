//! Rendering and exporting scan reports

use datamask_pii::{AtomicWriter, Error, Report, Result};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Report document written by `--as-json` and `--export-json`
#[derive(Debug, Serialize)]
pub struct ReportDocument<'a> {
    pub file: &'a str,
    pub columns: &'a Report,
}

impl<'a> ReportDocument<'a> {
    pub fn new(file: &'a str, columns: &'a Report) -> Self {
        Self { file, columns }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Human-readable summary, one line per column with hits
pub fn write_summary<W: Write>(out: &mut W, report: &Report) -> io::Result<()> {
    if report.is_empty() {
        return writeln!(out, "No PII patterns detected.");
    }

    writeln!(out, "PII detected in {} column(s):", report.columns().len())?;
    for (column, counts) in report.columns() {
        let summary = counts
            .iter()
            .map(|(category, count)| format!("{}={}", category, count))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "- {}: {}", column, summary)?;
    }
    Ok(())
}

/// Write the report document as pretty JSON
pub fn export_json(path: &Path, document: &ReportDocument<'_>) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(document)?;
    data.push(b'\n');
    AtomicWriter::replace(path, &data)
}

/// Write `column,type,count` rows
pub fn export_csv(path: &Path, report: &Report) -> Result<()> {
    let mut writer = csv::Writer::from_writer(AtomicWriter::new(path)?);
    for row in report.rows() {
        writer
            .serialize(&row)
            .map_err(|e| Error::InvalidTable(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?
        .commit()
}
