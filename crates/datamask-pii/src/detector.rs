//! PII detection over cells and columns

use crate::category::PiiCategory;
use crate::error::Result;
use crate::patterns::PatternRegistry;
use crate::rules::RuleSet;
use crate::table::Cell;
use crate::validator;
use regex::Regex;
use std::collections::BTreeMap;

/// Per-category hit counts, iterated in registry order
pub type CategoryCounts = BTreeMap<PiiCategory, usize>;

/// Regex detector with checksum post-validation
///
/// Only categories enabled at construction are ever matched or counted.
#[derive(Debug, Clone)]
pub struct Detector {
    registry: PatternRegistry,
}

impl Detector {
    /// Create a detector for the categories enabled in the rule set
    pub fn new(rules: &RuleSet) -> Result<Self> {
        Self::with_categories(rules.enabled_categories())
    }

    /// Create a detector for an explicit set of categories
    pub fn with_categories<I>(categories: I) -> Result<Self>
    where
        I: IntoIterator<Item = PiiCategory>,
    {
        Ok(Self {
            registry: PatternRegistry::new(categories)?,
        })
    }

    /// Enabled categories in registry order
    pub fn categories(&self) -> impl Iterator<Item = PiiCategory> + '_ {
        self.registry.categories()
    }

    /// Categories the cell matches, in registry order
    pub fn detect_cell(&self, value: &Cell) -> Vec<PiiCategory> {
        self.detect_text(&value.as_text())
    }

    /// Categories the text matches, in registry order
    pub fn detect_text(&self, text: &str) -> Vec<PiiCategory> {
        self.registry
            .iter()
            .filter(|(category, regex)| Self::matches(*category, regex, text))
            .map(|(category, _)| category)
            .collect()
    }

    /// Count, per enabled category, how many values contain a validated hit
    ///
    /// Every enabled category is present in the result, zero or not, so
    /// partial results from different chunks merge over the same keys.
    pub fn detect_series<'a, I>(&self, values: I) -> CategoryCounts
    where
        I: IntoIterator<Item = &'a Cell>,
    {
        let mut counts: CategoryCounts = self.categories().map(|c| (c, 0)).collect();

        for value in values {
            for category in self.detect_cell(value) {
                *counts.entry(category).or_insert(0) += 1;
            }
        }

        counts
    }

    /// A first-match hit, then the category's validator over the whole text
    fn matches(category: PiiCategory, regex: &Regex, text: &str) -> bool {
        if !regex.is_match(text) {
            return false;
        }
        match category {
            PiiCategory::CreditCard => validator::luhn_valid(text),
            PiiCategory::Ipv6 => validator::ipv6_valid(text),
            PiiCategory::Iban => validator::iban_valid(text),
            PiiCategory::Email | PiiCategory::Phone | PiiCategory::Ssn | PiiCategory::Ipv4 => true,
        }
    }
}
