//! datamask PII Detection and Masking
//!
//! This crate provides the detection-and-masking engine for tabular data:
//! - Email, phone, credit card, SSN, IPv4/IPv6 and IBAN detection
//! - Checksum validation (Luhn, IBAN mod-97, strict IPv6 parsing)
//! - Per-cell masking strategies (redact, hash, tokenize, partial, null)
//! - A persistent token store for stable pseudonyms
//! - Chunked scanning and masking with bounded memory

pub mod aggregator;
pub mod category;
pub mod detector;
pub mod error;
pub mod masker;
pub mod patterns;
pub mod report;
pub mod rules;
pub mod storage;
pub mod table;
pub mod token_store;
pub mod validator;

pub use aggregator::{MaskSummary, mask, mask_table, scan, scan_table};
pub use category::PiiCategory;
pub use detector::{CategoryCounts, Detector};
pub use error::{Error, Result};
pub use masker::{Masker, REDACTED};
pub use patterns::PatternRegistry;
pub use report::{Report, ReportBuilder, ReportRow};
pub use rules::{ColumnConfig, ColumnRule, OptionsConfig, RuleConfig, RuleSet, Strategy};
pub use storage::AtomicWriter;
pub use table::{Cell, Column, MemorySink, Table, TableSink};
pub use token_store::TokenStore;
