//! Per-cell masking

use crate::detector::Detector;
use crate::error::Result;
use crate::rules::{RuleSet, Strategy};
use crate::table::Cell;
use crate::token_store::TokenStore;
use sha2::{Digest, Sha256};

/// Replacement written by the `redact` strategy
pub const REDACTED: &str = "[REDACTED]";

const MASK_CHAR: char = '*';

/// Decides and applies the masking strategy for single cells
///
/// The rule set and token store are borrowed for the duration of a run.
pub struct Masker<'a> {
    rules: &'a RuleSet,
    detector: Detector,
    tokens: &'a mut TokenStore,
}

impl<'a> Masker<'a> {
    /// Create a masker whose detector covers the rule set's enabled categories
    pub fn new(rules: &'a RuleSet, tokens: &'a mut TokenStore) -> Result<Self> {
        Ok(Self {
            rules,
            detector: Detector::new(rules)?,
            tokens,
        })
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    /// Mask one cell
    ///
    /// Resolution order: null passes through; a column override applies
    /// unconditionally; otherwise values without a hit come back
    /// untouched, and the first hit category (registry order) with an
    /// explicit strategy decides, falling back to the default strategy.
    pub fn mask_cell(&mut self, value: &Cell, column: Option<&str>) -> Cell {
        if value.is_null() {
            return value.clone();
        }

        let text = value.as_text();

        if let Some(strategy) = column.and_then(|c| self.rules.column_strategy(c)) {
            return Cell::Text(self.apply(&text, strategy));
        }

        let hits = self.detector.detect_text(&text);
        if hits.is_empty() {
            return value.clone();
        }

        let strategy = hits
            .iter()
            .find_map(|category| self.rules.strategy_for(*category))
            .unwrap_or_else(|| self.rules.default_strategy());

        Cell::Text(self.apply(&text, strategy))
    }

    /// Apply a strategy to a stringified value
    pub fn apply(&mut self, text: &str, strategy: Strategy) -> String {
        match strategy {
            Strategy::Redact => REDACTED.to_string(),
            Strategy::Hash => hash(text),
            Strategy::Tokenize => self.tokens.tokenize(text),
            Strategy::Partial => partial(text, self.rules.partial_keep_last()),
            Strategy::Null => String::new(),
        }
    }
}

/// Lowercase hex SHA-256 of the text
fn hash(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Keep the last `keep_last` characters; mask everything when the text is
/// not longer than that
fn partial(text: &str, keep_last: usize) -> String {
    let len = text.chars().count();
    if len <= keep_last {
        return MASK_CHAR.to_string().repeat(len);
    }

    let mask_len = len - keep_last;
    text.chars()
        .enumerate()
        .map(|(i, c)| if i < mask_len { MASK_CHAR } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::PiiCategory;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: TokenStore,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let store = TokenStore::open(dir.path().join("tokens.json"));
        Fixture { _dir: dir, store }
    }

    fn mask(rules: &RuleSet, store: &mut TokenStore, value: &str, column: Option<&str>) -> Cell {
        let mut masker = Masker::new(rules, store).unwrap();
        masker.mask_cell(&Cell::from(value), column)
    }

    #[test]
    fn test_non_pii_unchanged() {
        let mut fx = fixture();
        let rules = RuleSet::default();
        assert_eq!(
            mask(&rules, &mut fx.store, "Hello World", None),
            Cell::from("Hello World")
        );
    }

    #[test]
    fn test_non_pii_keeps_cell_type() {
        let mut fx = fixture();
        let rules = RuleSet::default();
        let mut masker = Masker::new(&rules, &mut fx.store).unwrap();
        assert_eq!(masker.mask_cell(&Cell::Integer(42), None), Cell::Integer(42));
        assert_eq!(masker.mask_cell(&Cell::Bool(false), None), Cell::Bool(false));
    }

    #[test]
    fn test_null_passes_through_even_with_column_override() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_column_strategy("ssn", Strategy::Redact);
        let mut masker = Masker::new(&rules, &mut fx.store).unwrap();
        assert_eq!(masker.mask_cell(&Cell::Null, Some("ssn")), Cell::Null);
    }

    #[test]
    fn test_default_email_redacted() {
        let mut fx = fixture();
        let rules = RuleSet::default();
        assert_eq!(
            mask(&rules, &mut fx.store, "alice@example.com", None),
            Cell::from(REDACTED)
        );
    }

    #[test]
    fn test_hash_strategy() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_strategy(PiiCategory::Email, Strategy::Hash);
        let out = mask(&rules, &mut fx.store, "alice@example.com", None);

        let Cell::Text(out) = out else {
            panic!("expected text");
        };
        assert_eq!(out.len(), 64);
        assert_ne!(out, "alice@example.com");
        assert_eq!(out, hash("alice@example.com"));
    }

    #[test]
    fn test_tokenize_strategy_stable() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_strategy(PiiCategory::Email, Strategy::Tokenize);
        let mut masker = Masker::new(&rules, &mut fx.store).unwrap();

        let first = masker.mask_cell(&Cell::from("alice@example.com"), None);
        let second = masker.mask_cell(&Cell::from("alice@example.com"), None);

        assert_eq!(first, second);
        assert!(first.as_text().starts_with("TOK-"));
    }

    #[test]
    fn test_partial_strategy() {
        let mut fx = fixture();
        let rules = RuleSet::default()
            .with_strategy(PiiCategory::Phone, Strategy::Partial)
            .with_partial_keep_last(4);
        assert_eq!(
            mask(&rules, &mut fx.store, "202-555-0133", None),
            Cell::from("********0133")
        );
    }

    #[test]
    fn test_partial_short_value_fully_masked() {
        assert_eq!(partial("abcd", 4), "****");
        assert_eq!(partial("abc", 4), "***");
        assert_eq!(partial("", 4), "");
        assert_eq!(partial("abcdef", 0), "******");
        assert_eq!(partial("héllo wörld", 3), "********rld");
    }

    #[test]
    fn test_null_strategy() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_strategy(PiiCategory::Ipv4, Strategy::Null);
        assert_eq!(
            mask(&rules, &mut fx.store, "10.0.0.1", None),
            Cell::from("")
        );
    }

    #[test]
    fn test_column_strategy_overrides() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_column_strategy("ssn", Strategy::Tokenize);
        let out = mask(&rules, &mut fx.store, "123-45-6789", Some("ssn"));
        assert!(out.as_text().starts_with("TOK-"));
    }

    #[test]
    fn test_column_override_applies_to_non_pii() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_column_strategy("name", Strategy::Redact);
        assert_eq!(
            mask(&rules, &mut fx.store, "Alice", Some("name")),
            Cell::from(REDACTED)
        );
        // Other columns are unaffected
        assert_eq!(
            mask(&rules, &mut fx.store, "Alice", Some("nickname")),
            Cell::from("Alice")
        );
    }

    #[test]
    fn test_column_override_beats_category_strategy() {
        let mut fx = fixture();
        let rules = RuleSet::default()
            .with_strategy(PiiCategory::Email, Strategy::Hash)
            .with_column_strategy("contact", Strategy::Null);
        assert_eq!(
            mask(&rules, &mut fx.store, "alice@example.com", Some("contact")),
            Cell::from("")
        );
    }

    #[test]
    fn test_first_explicit_category_wins_over_default() {
        let mut fx = fixture();
        // Matches ipv6 then iban; only iban has an entry
        let value = "2001:0db8:85a3:0000:0000:8a2e:0370:7334 GB82WEST12345698765432";
        let rules = RuleSet::default()
            .with_strategy(PiiCategory::Iban, Strategy::Hash)
            .with_default_strategy(Strategy::Null);

        assert_eq!(
            mask(&rules, &mut fx.store, value, None),
            Cell::Text(hash(value))
        );
    }

    #[test]
    fn test_registry_order_decides_between_explicit_entries() {
        let mut fx = fixture();
        // Matches phone and credit_card; phone comes first
        let rules = RuleSet::default();
        assert_eq!(
            mask(&rules, &mut fx.store, "4111 1111 1111 1111", None),
            Cell::from(REDACTED)
        );

        let rules = RuleSet::default().without_strategy(PiiCategory::Phone);
        let out = mask(&rules, &mut fx.store, "4111 1111 1111 1111", None);
        assert!(out.as_text().starts_with("TOK-"));
    }

    #[test]
    fn test_default_strategy_when_no_entry() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_default_strategy(Strategy::Partial);
        assert_eq!(
            mask(&rules, &mut fx.store, "GB82WEST12345698765432", None),
            Cell::from("******************5432")
        );
    }

    #[test]
    fn test_credit_card_luhn_valid_only() {
        let mut fx = fixture();
        let rules = RuleSet::default();
        assert_ne!(
            mask(&rules, &mut fx.store, "4111 1111 1111 1111", None),
            Cell::from("4111 1111 1111 1111")
        );
        assert_eq!(
            mask(&rules, &mut fx.store, "1234567890123456", None),
            Cell::from("1234567890123456")
        );
    }

    #[test]
    fn test_card_with_extra_digits_in_cell_left_alone() {
        let mut fx = fixture();
        let rules = RuleSet::default();
        let value = "Card 4111111111111111 exp 1225";
        assert_eq!(mask(&rules, &mut fx.store, value, None), Cell::from(value));
        assert!(fx.store.is_empty());
    }

    #[test]
    fn test_ipv6_and_iban_masking() {
        let mut fx = fixture();
        let rules = RuleSet::default();

        let ip = "2001:0db8:85a3:0000:0000:8a2e:0370:7334";
        assert_ne!(mask(&rules, &mut fx.store, ip, None), Cell::from(ip));
        let bad_ip = "2001:0db8:85a3:0000:0000:8a2e:0370:ZZZZ";
        assert_eq!(mask(&rules, &mut fx.store, bad_ip, None), Cell::from(bad_ip));

        let iban = "GB82WEST12345698765432";
        assert_ne!(mask(&rules, &mut fx.store, iban, None), Cell::from(iban));
        let bad_iban = "GB00WEST12345698765432";
        assert_eq!(mask(&rules, &mut fx.store, bad_iban, None), Cell::from(bad_iban));
    }

    #[test]
    fn test_disabled_category_not_masked() {
        let mut fx = fixture();
        let rules = RuleSet::default().disable(PiiCategory::Email);
        assert_eq!(
            mask(&rules, &mut fx.store, "alice@example.com", None),
            Cell::from("alice@example.com")
        );
    }

    #[test]
    fn test_non_text_cells_are_stringified_when_masked() {
        let mut fx = fixture();
        let rules = RuleSet::default().with_column_strategy("id", Strategy::Partial);
        let mut masker = Masker::new(&rules, &mut fx.store).unwrap();
        assert_eq!(
            masker.mask_cell(&Cell::Integer(123456), Some("id")),
            Cell::from("**3456")
        );
    }
}
