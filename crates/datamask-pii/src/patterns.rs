//! Regex patterns for each PII category

use crate::category::PiiCategory;
use regex::Regex;

const EMAIL: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";

// (555) 123-4567, 555-123-4567, +1 555 123 4567
const PHONE: &str = r"\b(?:\+?\d{1,3}[\s-]?)?(?:\(?\d{3}\)?[\s-]?)?\d{3}[\s-]?\d{4}\b";

// 13-19 digits with optional spaces/dashes; Luhn decides the rest
const CREDIT_CARD: &str = r"\b(?:\d[ -]*?){13,19}\b";

const SSN: &str = r"\b\d{3}-?\d{2}-?\d{4}\b";

const IPV4: &str =
    r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\b";

// Full form, trailing `::`, leading `::` and one inner `::`; strict parsing follows
const IPV6: &str = concat!(
    r"\b(?:[A-Fa-f0-9]{1,4}:){7}[A-Fa-f0-9]{1,4}\b|",
    r"\b(?:[A-Fa-f0-9]{1,4}:){1,7}:\b|",
    r"\b:(?::[A-Fa-f0-9]{1,4}){1,7}\b|",
    r"\b(?:[A-Fa-f0-9]{1,4}:){1,6}:(?:[A-Fa-f0-9]{1,4})\b",
);

const IBAN: &str = r"\b[A-Z]{2}[0-9]{2}[A-Z0-9]{10,30}\b";

/// Source expression for a category
pub fn pattern_for(category: PiiCategory) -> &'static str {
    match category {
        PiiCategory::Email => EMAIL,
        PiiCategory::Phone => PHONE,
        PiiCategory::CreditCard => CREDIT_CARD,
        PiiCategory::Ssn => SSN,
        PiiCategory::Ipv4 => IPV4,
        PiiCategory::Ipv6 => IPV6,
        PiiCategory::Iban => IBAN,
    }
}

/// Compiled matchers for the enabled categories, kept in registry order
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    entries: Vec<(PiiCategory, Regex)>,
}

impl PatternRegistry {
    /// Compile the pattern of every enabled category
    ///
    /// Categories are stored in registry order regardless of the order
    /// they are given in.
    pub fn new<I>(enabled: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = PiiCategory>,
    {
        let mut categories: Vec<PiiCategory> = enabled.into_iter().collect();
        categories.sort();
        categories.dedup();

        let entries = categories
            .into_iter()
            .map(|category| Ok((category, Regex::new(pattern_for(category))?)))
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { entries })
    }

    /// Registry with every known category
    pub fn all() -> Result<Self, regex::Error> {
        Self::new(PiiCategory::ALL)
    }

    /// Enabled categories in registry order
    pub fn categories(&self) -> impl Iterator<Item = PiiCategory> + '_ {
        self.entries.iter().map(|(category, _)| *category)
    }

    /// Iterate over (category, matcher) pairs in registry order
    pub fn iter(&self) -> impl Iterator<Item = (PiiCategory, &Regex)> {
        self.entries.iter().map(|(category, regex)| (*category, regex))
    }

    /// Whether the category is part of this registry
    pub fn contains(&self, category: PiiCategory) -> bool {
        self.entries.iter().any(|(c, _)| *c == category)
    }

    /// First-match test; false for categories outside the registry
    pub fn search(&self, category: PiiCategory, text: &str) -> bool {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .is_some_and(|(_, regex)| regex.is_match(text))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
