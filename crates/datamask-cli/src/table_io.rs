//! Reading and writing tables on disk
//!
//! Supported formats are chosen by file extension: CSV, JSON (an array of
//! record objects), JSON Lines (one record object per line) and XLSX (first
//! worksheet). Readers hand out row chunks; sinks write through an
//! [`AtomicWriter`] so the target only changes once the whole run has
//! succeeded.

use calamine::{Data, Reader, open_workbook_auto};
use datamask_pii::{AtomicWriter, Cell, Error, MemorySink, Result, Table, TableSink};
use rust_xlsxwriter::{Workbook, XlsxError};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Lines, Write};
use std::path::Path;
use tracing::{debug, warn};

/// On-disk table format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Json,
    JsonLines,
    Xlsx,
}

impl TableFormat {
    /// Detect the format from the file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("csv") => Ok(TableFormat::Csv),
            Some("json") => Ok(TableFormat::Json),
            Some("jsonl") | Some("ndjson") => Ok(TableFormat::JsonLines),
            Some("xlsx") => Ok(TableFormat::Xlsx),
            _ => Err(Error::UnsupportedFormat(format!(
                "unsupported file type for {}",
                path.display()
            ))),
        }
    }

    /// Whether the reader can stream bounded row chunks
    pub fn supports_chunks(&self) -> bool {
        matches!(self, TableFormat::Csv | TableFormat::JsonLines)
    }
}

/// Boxed stream of row chunks
pub type Chunks = Box<dyn Iterator<Item = Result<Table>>>;

/// Open `path` as a stream of chunks of at most `chunksize` rows
///
/// `None` reads the table as a single chunk. JSON arrays and workbooks are
/// always read whole.
pub fn read_chunks(path: &Path, format: TableFormat, chunksize: Option<usize>) -> Result<Chunks> {
    let chunksize = chunksize.filter(|n| *n > 0);

    if chunksize.is_some() && !format.supports_chunks() {
        warn!(
            "Chunked reading is not available for {:?} input, reading {} whole",
            format,
            path.display()
        );
    }

    match format {
        TableFormat::Csv => {
            let reader = CsvChunks::open(path, chunksize.unwrap_or(usize::MAX))?;
            Ok(Box::new(reader))
        }
        TableFormat::JsonLines => {
            let reader = JsonLinesChunks::open(path, chunksize.unwrap_or(usize::MAX))?;
            Ok(Box::new(reader))
        }
        TableFormat::Json => Ok(Box::new(std::iter::once(read_json(path)))),
        TableFormat::Xlsx => Ok(Box::new(std::iter::once(read_xlsx(path)))),
    }
}

/// Read the whole table at `path`
#[cfg(test)]
pub fn read_table(path: &Path, format: TableFormat) -> Result<Table> {
    let mut table = Table::new();
    for chunk in read_chunks(path, format, None)? {
        table.extend(chunk?)?;
    }
    Ok(table)
}

fn csv_error(e: csv::Error) -> Error {
    if e.is_io_error() {
        Error::Io(io::Error::from(e))
    } else {
        Error::InvalidTable(e.to_string())
    }
}

fn csv_cell(field: &str) -> Cell {
    if field.is_empty() {
        Cell::Null
    } else {
        Cell::Text(field.to_string())
    }
}

/// Row chunks of a CSV file
///
/// Short rows are padded with nulls. An input without data rows still
/// yields one empty chunk, so a sink writes the header.
pub struct CsvChunks {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    chunksize: usize,
    emitted: bool,
    done: bool,
}

impl CsvChunks {
    pub fn open(path: &Path, chunksize: usize) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        let headers = reader
            .headers()
            .map_err(csv_error)?
            .iter()
            .map(String::from)
            .collect();

        Ok(Self {
            reader,
            headers,
            chunksize,
            emitted: false,
            done: false,
        })
    }

    fn read_chunk(&mut self) -> Result<Vec<Vec<Cell>>> {
        let mut rows = Vec::new();
        let mut record = csv::StringRecord::new();

        while rows.len() < self.chunksize {
            if !self.reader.read_record(&mut record).map_err(csv_error)? {
                self.done = true;
                break;
            }
            rows.push(record.iter().map(csv_cell).collect());
        }
        Ok(rows)
    }
}

impl Iterator for CsvChunks {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rows = match self.read_chunk() {
            Ok(rows) => rows,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if rows.is_empty() && self.emitted {
            return None;
        }
        self.emitted = true;
        debug!(rows = rows.len(), "Read CSV chunk");
        Some(Table::from_rows(self.headers.clone(), rows))
    }
}

/// Append keys not seen before, keeping first-seen order
fn collect_keys(headers: &mut Vec<String>, record: &Map<String, Value>) {
    for key in record.keys() {
        if !headers.contains(key) {
            headers.push(key.clone());
        }
    }
}

/// Build a table with the given columns; missing keys read as null
fn records_to_table(headers: Vec<String>, records: Vec<Map<String, Value>>) -> Result<Table> {
    let rows: Vec<Vec<Cell>> = records
        .into_iter()
        .map(|mut record| {
            headers
                .iter()
                .map(|key| record.remove(key).map_or(Cell::Null, Cell::from_json))
                .collect()
        })
        .collect();

    Table::from_rows(headers, rows)
}

fn into_record(value: Value, position: usize) -> Result<Map<String, Value>> {
    match value {
        Value::Object(record) => Ok(record),
        other => Err(Error::InvalidTable(format!(
            "record {} is not an object: {}",
            position, other
        ))),
    }
}

fn read_json(path: &Path) -> Result<Table> {
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;

    let Value::Array(items) = value else {
        return Err(Error::InvalidTable(format!(
            "{} does not contain an array of records",
            path.display()
        )));
    };

    let records = items
        .into_iter()
        .enumerate()
        .map(|(i, item)| into_record(item, i))
        .collect::<Result<Vec<_>>>()?;

    let mut headers = Vec::new();
    for record in &records {
        collect_keys(&mut headers, record);
    }
    records_to_table(headers, records)
}

/// Row chunks of a JSON Lines file; blank lines are skipped
///
/// Opening makes one pass over the file to collect every key, so each chunk
/// carries the full column set in first-seen order.
pub struct JsonLinesChunks {
    lines: Lines<BufReader<File>>,
    headers: Vec<String>,
    line_number: usize,
    chunksize: usize,
    emitted: bool,
    done: bool,
}

impl JsonLinesChunks {
    pub fn open(path: &Path, chunksize: usize) -> Result<Self> {
        let mut headers = Vec::new();
        for (index, line) in BufReader::new(File::open(path)?).lines().enumerate() {
            if let Some(record) = parse_line(&line?, index + 1)? {
                collect_keys(&mut headers, &record);
            }
        }

        Ok(Self {
            lines: BufReader::new(File::open(path)?).lines(),
            headers,
            line_number: 0,
            chunksize,
            emitted: false,
            done: false,
        })
    }

    fn read_chunk(&mut self) -> Result<Vec<Map<String, Value>>> {
        let mut records = Vec::new();

        while records.len() < self.chunksize {
            let Some(line) = self.lines.next() else {
                self.done = true;
                break;
            };
            self.line_number += 1;
            if let Some(record) = parse_line(&line?, self.line_number)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

fn parse_line(line: &str, line_number: usize) -> Result<Option<Map<String, Value>>> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let value: Value = serde_json::from_str(line)?;
    into_record(value, line_number).map(Some)
}

impl Iterator for JsonLinesChunks {
    type Item = Result<Table>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let records = match self.read_chunk() {
            Ok(records) => records,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if records.is_empty() && self.emitted {
            return None;
        }
        self.emitted = true;
        debug!(rows = records.len(), "Read JSON Lines chunk");
        Some(records_to_table(self.headers.clone(), records))
    }
}

fn xlsx_read_error(e: calamine::Error) -> Error {
    Error::InvalidTable(format!("unreadable workbook: {}", e))
}

fn xlsx_write_error(e: XlsxError) -> Error {
    Error::InvalidTable(format!("cannot write workbook: {}", e))
}

fn xlsx_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Null,
        Data::Int(i) => Cell::Integer(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.is_empty() => Cell::Null,
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Read the first worksheet; its first row is the header
fn read_xlsx(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).map_err(xlsx_read_error)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::InvalidTable(format!("{} has no worksheets", path.display())))?
        .map_err(xlsx_read_error)?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::new());
    };

    let headers = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Data::Empty => format!("Unnamed: {}", i),
            other => other.to_string(),
        })
        .collect();
    let rows: Vec<Vec<Cell>> = rows.map(|row| row.iter().map(xlsx_cell).collect()).collect();

    debug!(rows = rows.len(), "Read worksheet");
    Table::from_rows(headers, rows)
}

/// Open a sink writing `format` to `path`
pub fn create_sink(path: &Path, format: TableFormat) -> Result<Box<dyn TableSink>> {
    let out = AtomicWriter::new(path)?;
    Ok(match format {
        TableFormat::Csv => Box::new(CsvSink::new(out)),
        TableFormat::Json => Box::new(JsonSink::new(out)),
        TableFormat::JsonLines => Box::new(JsonLinesSink::new(out)),
        TableFormat::Xlsx => Box::new(XlsxSink::new(out)),
    })
}

fn already_finished() -> Error {
    Error::Io(io::Error::other("sink already finished"))
}

/// CSV output; the header is written with the first chunk
///
/// Later chunks may omit header columns, which are written empty. A column
/// missing from the header cannot be added once it is written.
pub struct CsvSink {
    writer: Option<csv::Writer<AtomicWriter>>,
    headers: Vec<String>,
}

impl CsvSink {
    pub fn new(out: AtomicWriter) -> Self {
        Self {
            writer: Some(csv::Writer::from_writer(out)),
            headers: Vec::new(),
        }
    }
}

impl TableSink for CsvSink {
    fn write_chunk(&mut self, chunk: &Table, first: bool) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(already_finished)?;

        if first {
            self.headers = chunk.column_names().map(String::from).collect();
            if !self.headers.is_empty() {
                writer.write_record(&self.headers).map_err(csv_error)?;
            }
        }

        if let Some(extra) = chunk
            .column_names()
            .find(|name| !self.headers.iter().any(|h| h == name))
        {
            return Err(Error::InvalidTable(format!(
                "column '{}' is not in the CSV header",
                extra
            )));
        }

        let columns: Vec<_> = self.headers.iter().map(|h| chunk.column(h)).collect();
        for row in 0..chunk.row_count() {
            let fields = columns.iter().map(|column| {
                column.map_or_else(String::new, |c| c.values[row].as_text().into_owned())
            });
            writer.write_record(fields).map_err(csv_error)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let writer = self.writer.take().ok_or_else(already_finished)?;
        let out = writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        out.commit()
    }
}

/// Write one record object, keeping the column order
fn write_record<W: Write>(out: &mut W, names: &[&str], row: &[&Cell]) -> Result<()> {
    out.write_all(b"{")?;
    for (i, (name, cell)) in names.iter().zip(row).enumerate() {
        if i > 0 {
            out.write_all(b",")?;
        }
        serde_json::to_writer(&mut *out, name)?;
        out.write_all(b":")?;
        serde_json::to_writer(&mut *out, &cell.to_json())?;
    }
    out.write_all(b"}")?;
    Ok(())
}

/// JSON output streamed as a single array of records
pub struct JsonSink {
    out: Option<AtomicWriter>,
    records: usize,
}

impl JsonSink {
    pub fn new(out: AtomicWriter) -> Self {
        Self {
            out: Some(out),
            records: 0,
        }
    }
}

impl TableSink for JsonSink {
    fn write_chunk(&mut self, chunk: &Table, _first: bool) -> Result<()> {
        let out = self.out.as_mut().ok_or_else(already_finished)?;
        let names: Vec<&str> = chunk.column_names().collect();

        for row in chunk.rows() {
            out.write_all(if self.records == 0 { b"[" } else { b"," })?;
            write_record(out, &names, &row)?;
            self.records += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let mut out = self.out.take().ok_or_else(already_finished)?;
        if self.records == 0 {
            out.write_all(b"[")?;
        }
        out.write_all(b"]\n")?;
        out.commit()
    }
}

/// JSON Lines output, one record per line
pub struct JsonLinesSink {
    out: Option<AtomicWriter>,
}

impl JsonLinesSink {
    pub fn new(out: AtomicWriter) -> Self {
        Self { out: Some(out) }
    }
}

impl TableSink for JsonLinesSink {
    fn write_chunk(&mut self, chunk: &Table, _first: bool) -> Result<()> {
        let out = self.out.as_mut().ok_or_else(already_finished)?;
        let names: Vec<&str> = chunk.column_names().collect();

        for row in chunk.rows() {
            write_record(out, &names, &row)?;
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.take().ok_or_else(already_finished)?.commit()
    }
}

/// XLSX output
///
/// A workbook is written in one piece, so chunks are collected in memory
/// until `finish`.
pub struct XlsxSink {
    out: Option<AtomicWriter>,
    rows: MemorySink,
}

impl XlsxSink {
    pub fn new(out: AtomicWriter) -> Self {
        Self {
            out: Some(out),
            rows: MemorySink::new(),
        }
    }
}

impl TableSink for XlsxSink {
    fn write_chunk(&mut self, chunk: &Table, first: bool) -> Result<()> {
        if self.out.is_none() {
            return Err(already_finished());
        }
        self.rows.write_chunk(chunk, first)
    }

    fn finish(&mut self) -> Result<()> {
        let mut out = self.out.take().ok_or_else(already_finished)?;
        let table = std::mem::take(&mut self.rows).into_table();
        out.write_all(&workbook_bytes(&table)?)?;
        out.commit()
    }
}

fn workbook_bytes(table: &Table) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, name) in table.column_names().enumerate() {
        sheet
            .write_string(0, sheet_column(col)?, name)
            .map_err(xlsx_write_error)?;
    }

    for (index, cells) in table.rows().enumerate() {
        let row = u32::try_from(index + 1)
            .map_err(|_| Error::InvalidTable("too many rows for a worksheet".to_string()))?;
        for (col, cell) in cells.into_iter().enumerate() {
            let col = sheet_column(col)?;
            match cell {
                Cell::Null => continue,
                Cell::Bool(b) => sheet.write_boolean(row, col, *b),
                Cell::Integer(i) => sheet.write_number(row, col, *i as f64),
                Cell::Float(f) => sheet.write_number(row, col, *f),
                other => sheet.write_string(row, col, &*other.as_text()),
            }
            .map_err(xlsx_write_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_write_error)
}

fn sheet_column(index: usize) -> Result<u16> {
    u16::try_from(index)
        .map_err(|_| Error::InvalidTable("too many columns for a worksheet".to_string()))
}
