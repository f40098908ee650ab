//! Chunked scanning and masking
//!
//! Both entry points consume an iterator of row chunks and hold at most one
//! chunk at a time. A whole table is simply a single chunk.

use crate::detector::Detector;
use crate::error::Result;
use crate::masker::Masker;
use crate::report::{Report, ReportBuilder};
use crate::table::{Column, Table, TableSink};
use serde::Serialize;
use tracing::{debug, info};

/// Totals for one masking run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaskSummary {
    /// Chunks written to the sink
    pub chunks: usize,

    /// Rows written to the sink
    pub rows: usize,

    /// Cells whose value was replaced
    pub cells_masked: usize,
}

/// Scan every column of every chunk and merge the counts
///
/// The report is identical to scanning the concatenated table in one go.
/// The first chunk error aborts the scan.
pub fn scan<I>(detector: &Detector, chunks: I) -> Result<Report>
where
    I: IntoIterator<Item = Result<Table>>,
{
    let mut builder = ReportBuilder::new();
    let mut rows = 0;

    for (index, chunk) in chunks.into_iter().enumerate() {
        let chunk = chunk?;
        debug!(chunk = index, rows = chunk.row_count(), "Scanning chunk");
        rows += chunk.row_count();
        scan_chunk(detector, &chunk, &mut builder);
    }

    let report = builder.finish();
    info!(
        rows,
        columns_with_pii = report.columns().len(),
        hits = report.total(),
        "Scan complete"
    );
    Ok(report)
}

/// Scan an in-memory table
pub fn scan_table(detector: &Detector, table: &Table) -> Report {
    let mut builder = ReportBuilder::new();
    scan_chunk(detector, table, &mut builder);
    builder.finish()
}

fn scan_chunk(detector: &Detector, chunk: &Table, builder: &mut ReportBuilder) {
    for column in chunk.columns() {
        let counts = detector.detect_series(&column.values);
        builder.add(&column.name, &counts);
    }
}

/// Mask every chunk and hand it to the sink before reading the next one
///
/// The sink sees `first == true` exactly once, for the first chunk, and
/// `finish` is called after the last chunk.
pub fn mask<I, S>(masker: &mut Masker<'_>, chunks: I, sink: &mut S) -> Result<MaskSummary>
where
    I: IntoIterator<Item = Result<Table>>,
    S: TableSink + ?Sized,
{
    let mut summary = MaskSummary::default();

    for chunk in chunks {
        let chunk = chunk?;
        let (masked, cells_masked) = mask_chunk(masker, &chunk)?;

        sink.write_chunk(&masked, summary.chunks == 0)?;

        debug!(
            chunk = summary.chunks,
            rows = masked.row_count(),
            cells_masked,
            "Masked chunk"
        );
        summary.chunks += 1;
        summary.rows += masked.row_count();
        summary.cells_masked += cells_masked;
    }

    sink.finish()?;

    info!(
        chunks = summary.chunks,
        rows = summary.rows,
        cells_masked = summary.cells_masked,
        "Masking complete"
    );
    Ok(summary)
}

/// Mask an in-memory table
pub fn mask_table(masker: &mut Masker<'_>, table: &Table) -> Result<Table> {
    mask_chunk(masker, table).map(|(masked, _)| masked)
}

fn mask_chunk(masker: &mut Masker<'_>, chunk: &Table) -> Result<(Table, usize)> {
    let mut changed = 0;
    let mut columns = Vec::with_capacity(chunk.columns().len());

    for column in chunk.columns() {
        let values = column
            .values
            .iter()
            .map(|value| {
                let masked = masker.mask_cell(value, Some(&column.name));
                if masked != *value {
                    changed += 1;
                }
                masked
            })
            .collect();
        columns.push(Column::new(column.name.clone(), values));
    }

    Ok((Table::from_columns(columns)?, changed))
}
