//! Masking rules
//!
//! [`RuleConfig`] mirrors the on-disk rules document and is deliberately
//! permissive: unknown keys are ignored and every field has a default.
//! [`RuleSet`] is the resolved, immutable form handed to the detector and
//! the masker for one run.

use crate::category::PiiCategory;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Number of trailing characters `partial` keeps when not configured
pub const DEFAULT_PARTIAL_KEEP_LAST: usize = 4;

/// Token store location when not configured
pub const DEFAULT_TOKEN_STORE: &str = ".tokens.json";

/// Prefix of detector toggle keys, e.g. `enable_email`
const DETECTOR_TOGGLE_PREFIX: &str = "enable_";

/// Masking strategy applied to a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Replace with a fixed marker
    Redact,

    /// Replace with the hex SHA-256 digest
    Hash,

    /// Replace with a stable token from the token store
    Tokenize,

    /// Keep the last N characters, mask the rest
    Partial,

    /// Replace with an empty value
    Null,
}

impl Strategy {
    /// Resolve a configured strategy name
    ///
    /// Unknown names fall back to [`Strategy::Redact`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "redact" => Strategy::Redact,
            "hash" => Strategy::Hash,
            "tokenize" => Strategy::Tokenize,
            "partial" => Strategy::Partial,
            "null" => Strategy::Null,
            other => {
                warn!("Unknown masking strategy '{}', using redact", other);
                Strategy::Redact
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Redact => "redact",
            Strategy::Hash => "hash",
            Strategy::Tokenize => "tokenize",
            Strategy::Partial => "partial",
            Strategy::Null => "null",
        }
    }
}

/// Parsed rules document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Category name (or `default`) to strategy name
    #[serde(default)]
    pub strategies: BTreeMap<String, String>,

    /// Per-column overrides
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnConfig>,

    /// Free-form options
    #[serde(default)]
    pub options: OptionsConfig,

    /// Detector toggles keyed `enable_<category>`
    #[serde(default)]
    pub detectors: BTreeMap<String, serde_json::Value>,
}

/// Per-column override as written in the rules document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnConfig {
    /// Strategy applied to every non-null cell of the column
    #[serde(default)]
    pub strategy: Option<String>,
}

/// Options section of the rules document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionsConfig {
    /// Characters kept by the `partial` strategy (default 4)
    #[serde(default)]
    pub partial_keep_last: Option<usize>,

    /// Token store file (default `.tokens.json`)
    #[serde(default)]
    pub token_store: Option<PathBuf>,

    /// Any other options, kept verbatim
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Resolved per-column override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRule {
    pub strategy: Option<Strategy>,
}

/// Resolved rule set for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    strategies: BTreeMap<PiiCategory, Strategy>,
    default_strategy: Strategy,
    columns: HashMap<String, ColumnRule>,
    partial_keep_last: usize,
    token_store: Option<PathBuf>,
    options: BTreeMap<String, serde_json::Value>,
    enabled: BTreeSet<PiiCategory>,
}

impl Default for RuleSet {
    fn default() -> Self {
        let strategies = BTreeMap::from([
            (PiiCategory::Email, Strategy::Redact),
            (PiiCategory::Phone, Strategy::Redact),
            (PiiCategory::CreditCard, Strategy::Tokenize),
            (PiiCategory::Ssn, Strategy::Tokenize),
            (PiiCategory::Ipv4, Strategy::Redact),
        ]);

        Self {
            strategies,
            default_strategy: Strategy::Redact,
            columns: HashMap::new(),
            partial_keep_last: DEFAULT_PARTIAL_KEEP_LAST,
            token_store: None,
            options: BTreeMap::new(),
            enabled: PiiCategory::ALL.into_iter().collect(),
        }
    }
}

impl RuleSet {
    /// Resolve a parsed rules document on top of the defaults
    pub fn from_config(config: RuleConfig) -> Self {
        let mut rules = Self::default();

        for (key, name) in &config.strategies {
            let strategy = Strategy::from_name(name);
            if key == "default" {
                rules.default_strategy = strategy;
                continue;
            }
            match key.parse::<PiiCategory>() {
                Ok(category) => {
                    rules.strategies.insert(category, strategy);
                }
                Err(_) => debug!("Ignoring strategy for unknown category '{}'", key),
            }
        }

        for (column, column_config) in config.columns {
            let strategy = column_config.strategy.as_deref().map(Strategy::from_name);
            rules.columns.insert(column, ColumnRule { strategy });
        }

        if let Some(keep) = config.options.partial_keep_last {
            rules.partial_keep_last = keep;
        }
        rules.token_store = config.options.token_store;
        rules.options = config.options.extra;

        for (key, value) in &config.detectors {
            let name = key.strip_prefix(DETECTOR_TOGGLE_PREFIX).unwrap_or(key);
            let Ok(category) = name.parse::<PiiCategory>() else {
                warn!("Ignoring toggle for unknown detector '{}'", key);
                continue;
            };
            // Only an explicit `true` keeps a detector on
            if value.as_bool() == Some(true) {
                rules.enabled.insert(category);
            } else {
                rules.enabled.remove(&category);
            }
        }

        debug!(
            enabled = ?rules.enabled,
            column_overrides = rules.columns.len(),
            "Resolved rule set"
        );

        rules
    }

    /// Explicit strategy for a category, if one is configured
    pub fn strategy_for(&self, category: PiiCategory) -> Option<Strategy> {
        self.strategies.get(&category).copied()
    }

    /// Strategy used when no hit category has an explicit entry
    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Fixed strategy for a column, if one is configured
    pub fn column_strategy(&self, column: &str) -> Option<Strategy> {
        self.columns.get(column).and_then(|rule| rule.strategy)
    }

    pub fn partial_keep_last(&self) -> usize {
        self.partial_keep_last
    }

    /// Configured token store path, or `.tokens.json`
    pub fn token_store_path(&self) -> PathBuf {
        self.token_store
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_STORE))
    }

    /// Option not covered by a typed field
    pub fn option(&self, key: &str) -> Option<&serde_json::Value> {
        self.options.get(key)
    }

    pub fn is_enabled(&self, category: PiiCategory) -> bool {
        self.enabled.contains(&category)
    }

    /// Enabled categories in registry order
    pub fn enabled_categories(&self) -> impl Iterator<Item = PiiCategory> + '_ {
        self.enabled.iter().copied()
    }

    pub fn with_strategy(mut self, category: PiiCategory, strategy: Strategy) -> Self {
        self.strategies.insert(category, strategy);
        self
    }

    pub fn without_strategy(mut self, category: PiiCategory) -> Self {
        self.strategies.remove(&category);
        self
    }

    pub fn with_default_strategy(mut self, strategy: Strategy) -> Self {
        self.default_strategy = strategy;
        self
    }

    pub fn with_column_strategy(mut self, column: impl Into<String>, strategy: Strategy) -> Self {
        self.columns.insert(
            column.into(),
            ColumnRule {
                strategy: Some(strategy),
            },
        );
        self
    }

    pub fn with_partial_keep_last(mut self, keep: usize) -> Self {
        self.partial_keep_last = keep;
        self
    }

    pub fn with_token_store(mut self, path: impl AsRef<Path>) -> Self {
        self.token_store = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn enable(mut self, category: PiiCategory) -> Self {
        self.enabled.insert(category);
        self
    }

    pub fn disable(mut self, category: PiiCategory) -> Self {
        self.enabled.remove(&category);
        self
    }
}

#[cfg(test)]
mod tests;
