//! Scan reports

use crate::category::PiiCategory;
use crate::detector::CategoryCounts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-column PII hit counts
///
/// Only columns with at least one hit appear, and within a column only
/// categories with at least one hit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report {
    columns: BTreeMap<String, CategoryCounts>,
}

/// One flattened report entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    pub column: String,
    #[serde(rename = "type")]
    pub category: PiiCategory,
    pub count: usize,
}

impl Report {
    pub fn columns(&self) -> &BTreeMap<String, CategoryCounts> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&CategoryCounts> {
        self.columns.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Total hits across all columns and categories
    pub fn total(&self) -> usize {
        self.columns.values().flat_map(|counts| counts.values()).sum()
    }

    /// Flatten to (column, category, count) rows
    pub fn rows(&self) -> Vec<ReportRow> {
        self.columns
            .iter()
            .flat_map(|(column, counts)| {
                counts.iter().map(move |(category, count)| ReportRow {
                    column: column.clone(),
                    category: *category,
                    count: *count,
                })
            })
            .collect()
    }

    /// Add another report's counts into this one
    pub fn merge(&mut self, other: Report) {
        for (column, counts) in other.columns {
            let entry = self.columns.entry(column).or_default();
            for (category, count) in counts {
                *entry.entry(category).or_insert(0) += count;
            }
        }
    }
}

/// Running totals fed one partial count map at a time
///
/// Merging is plain addition per (column, category), so the result does
/// not depend on how the input was split.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    totals: BTreeMap<String, CategoryCounts>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, column: &str, counts: &CategoryCounts) {
        let entry = self.totals.entry(column.to_string()).or_default();
        for (category, count) in counts {
            *entry.entry(*category).or_insert(0) += count;
        }
    }

    /// Drop zero counts and columns without hits
    pub fn finish(self) -> Report {
        let columns = self
            .totals
            .into_iter()
            .filter_map(|(column, counts)| {
                let hits: CategoryCounts =
                    counts.into_iter().filter(|(_, count)| *count > 0).collect();
                (!hits.is_empty()).then_some((column, hits))
            })
            .collect();

        Report { columns }
    }
}
