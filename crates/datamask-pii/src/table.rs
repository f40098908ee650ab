//! Tabular data model shared by the engine and the table I/O adapters

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A single table value
///
/// Any cell can be stringified; detection and masking always work on the
/// textual form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    /// Missing value
    Null,

    Bool(bool),

    Integer(i64),

    Float(f64),

    Text(String),

    /// Nested structure (arrays, objects) kept as-is
    Json(serde_json::Value),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Textual form used for detection; null becomes the empty string
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Cell::Null => Cow::Borrowed(""),
            Cell::Text(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Convert a JSON value, mapping scalars onto the dedicated variants
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Cell::Null,
            serde_json::Value::Bool(b) => Cell::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n
                    .as_f64()
                    .map(Cell::Float)
                    .unwrap_or_else(|| Cell::Json(serde_json::Value::Number(n))),
            },
            serde_json::Value::String(s) => Cell::Text(s),
            other => Cell::Json(other),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Cell::Null => serde_json::Value::Null,
            Cell::Bool(b) => serde_json::Value::Bool(*b),
            Cell::Integer(i) => serde_json::Value::from(*i),
            Cell::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Cell::Text(s) => serde_json::Value::String(s.clone()),
            Cell::Json(v) => v.clone(),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Integer(i) => write!(f, "{}", i),
            Cell::Float(x) => write!(f, "{}", x),
            Cell::Text(s) => f.write_str(s),
            Cell::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Cell::Null)
    }
}

/// A named column of cells
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A set of equally long named columns
///
/// Used both for whole tables and for row chunks of a larger table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, rejecting ragged input and duplicate names
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Build a table from a header and row-major values
    ///
    /// Short rows are padded with nulls; rows longer than the header are
    /// rejected.
    pub fn from_rows<I>(headers: Vec<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<Cell>>,
    {
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::new()))
            .collect();

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() > columns.len() {
                return Err(Error::InvalidTable(format!(
                    "row {} has {} values but the header has {} columns",
                    index,
                    row.len(),
                    columns.len()
                )));
            }
            let mut values = row.into_iter();
            for column in columns.iter_mut() {
                column.values.push(values.next().unwrap_or(Cell::Null));
            }
        }

        Self::from_columns(columns)
    }

    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.columns.iter().any(|c| c.name == column.name) {
            return Err(Error::InvalidTable(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if let Some(first) = self.columns.first()
            && first.values.len() != column.values.len()
        {
            return Err(Error::InvalidTable(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.values.len(),
                first.values.len()
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// Row-major view, one vector of borrowed cells per row
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count()).map(move |row| {
            self.columns
                .iter()
                .map(|column| &column.values[row])
                .collect()
        })
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Append the rows of another table with the same columns
    pub fn extend(&mut self, other: Table) -> Result<()> {
        if self.columns.is_empty() {
            *self = other;
            return Ok(());
        }
        if !self.column_names().eq(other.column_names()) {
            return Err(Error::InvalidTable(
                "cannot append a chunk with different columns".to_string(),
            ));
        }
        for (column, incoming) in self.columns.iter_mut().zip(other.columns) {
            column.values.extend(incoming.values);
        }
        Ok(())
    }
}

/// Destination for masked chunks
pub trait TableSink {
    /// Append one chunk; `first` is true only for the first chunk of a run
    fn write_chunk(&mut self, chunk: &Table, first: bool) -> Result<()>;

    /// Called once after the last chunk
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that collects every chunk into a single in-memory table
#[derive(Debug, Default)]
pub struct MemorySink {
    table: Table,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_table(self) -> Table {
        self.table
    }
}

impl TableSink for MemorySink {
    fn write_chunk(&mut self, chunk: &Table, first: bool) -> Result<()> {
        if first {
            self.table = chunk.clone();
            Ok(())
        } else {
            self.table.extend(chunk.clone())
        }
    }
}
