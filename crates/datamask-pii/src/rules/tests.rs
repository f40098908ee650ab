//! Tests for rule resolution

use super::*;

fn from_yaml(doc: &str) -> RuleSet {
    let config: RuleConfig = serde_yaml::from_str(doc).unwrap();
    RuleSet::from_config(config)
}

#[test]
fn test_default_rules() {
    let rules = RuleSet::default();

    assert_eq!(rules.strategy_for(PiiCategory::Email), Some(Strategy::Redact));
    assert_eq!(rules.strategy_for(PiiCategory::Phone), Some(Strategy::Redact));
    assert_eq!(
        rules.strategy_for(PiiCategory::CreditCard),
        Some(Strategy::Tokenize)
    );
    assert_eq!(rules.strategy_for(PiiCategory::Ssn), Some(Strategy::Tokenize));
    assert_eq!(rules.strategy_for(PiiCategory::Ipv4), Some(Strategy::Redact));
    assert_eq!(rules.strategy_for(PiiCategory::Ipv6), None);
    assert_eq!(rules.strategy_for(PiiCategory::Iban), None);
    assert_eq!(rules.default_strategy(), Strategy::Redact);
    assert_eq!(rules.partial_keep_last(), 4);
    assert_eq!(rules.token_store_path(), PathBuf::from(".tokens.json"));
    assert_eq!(
        rules.enabled_categories().collect::<Vec<_>>(),
        PiiCategory::ALL.to_vec()
    );
    assert_eq!(rules.column_strategy("anything"), None);
}

#[test]
fn test_empty_config_equals_defaults() {
    assert_eq!(RuleSet::from_config(RuleConfig::default()), RuleSet::default());
    assert_eq!(from_yaml("version: 1"), RuleSet::default());
}

#[test]
fn test_strategy_overrides() {
    let rules = from_yaml(
        r#"
strategies:
  email: hash
  iban: partial
  default: "null"
  nickname: tokenize
"#,
    );

    assert_eq!(rules.strategy_for(PiiCategory::Email), Some(Strategy::Hash));
    assert_eq!(rules.strategy_for(PiiCategory::Iban), Some(Strategy::Partial));
    assert_eq!(rules.strategy_for(PiiCategory::Phone), Some(Strategy::Redact));
    assert_eq!(rules.default_strategy(), Strategy::Null);
}

#[test]
fn test_unknown_strategy_name_falls_back_to_redact() {
    assert_eq!(Strategy::from_name("scramble"), Strategy::Redact);
    let rules = from_yaml("strategies:\n  ssn: scramble\n");
    assert_eq!(rules.strategy_for(PiiCategory::Ssn), Some(Strategy::Redact));
}

#[test]
fn test_column_overrides() {
    let rules = from_yaml(
        r#"
columns:
  ssn:
    strategy: tokenize
  notes: {}
"#,
    );

    assert_eq!(rules.column_strategy("ssn"), Some(Strategy::Tokenize));
    assert_eq!(rules.column_strategy("notes"), None);
    assert_eq!(rules.column_strategy("email"), None);
}

#[test]
fn test_options() {
    let rules = from_yaml(
        r#"
options:
  partial_keep_last: 2
  token_store: /tmp/tokens.json
  salt: pepper
"#,
    );

    assert_eq!(rules.partial_keep_last(), 2);
    assert_eq!(rules.token_store_path(), PathBuf::from("/tmp/tokens.json"));
    assert_eq!(
        rules.option("salt"),
        Some(&serde_json::Value::String("pepper".to_string()))
    );
    assert_eq!(rules.option("missing"), None);
}

#[test]
fn test_detector_toggles() {
    let rules = from_yaml(
        r#"
detectors:
  enable_email: false
  enable_iban: "yes"
  enable_phone: true
  enable_passport: false
"#,
    );

    assert!(!rules.is_enabled(PiiCategory::Email));
    // Anything but an explicit `true` disables
    assert!(!rules.is_enabled(PiiCategory::Iban));
    assert!(rules.is_enabled(PiiCategory::Phone));
    assert!(rules.is_enabled(PiiCategory::Ssn));
}

#[test]
fn test_json_config() {
    let config: RuleConfig = serde_json::from_str(
        r#"{"strategies": {"phone": "partial"}, "detectors": {"enable_ipv4": false}, "extra": 1}"#,
    )
    .unwrap();
    let rules = RuleSet::from_config(config);

    assert_eq!(rules.strategy_for(PiiCategory::Phone), Some(Strategy::Partial));
    assert!(!rules.is_enabled(PiiCategory::Ipv4));
}

#[test]
fn test_builders() {
    let rules = RuleSet::default()
        .with_strategy(PiiCategory::Ipv6, Strategy::Hash)
        .without_strategy(PiiCategory::Phone)
        .with_default_strategy(Strategy::Partial)
        .with_column_strategy("card", Strategy::Null)
        .with_partial_keep_last(6)
        .with_token_store("tokens.json")
        .disable(PiiCategory::Email)
        .disable(PiiCategory::Iban)
        .enable(PiiCategory::Iban);

    assert_eq!(rules.strategy_for(PiiCategory::Ipv6), Some(Strategy::Hash));
    assert_eq!(rules.strategy_for(PiiCategory::Phone), None);
    assert_eq!(rules.default_strategy(), Strategy::Partial);
    assert_eq!(rules.column_strategy("card"), Some(Strategy::Null));
    assert_eq!(rules.partial_keep_last(), 6);
    assert_eq!(rules.token_store_path(), PathBuf::from("tokens.json"));
    assert!(!rules.is_enabled(PiiCategory::Email));
    assert!(rules.is_enabled(PiiCategory::Iban));
}

#[test]
fn test_strategy_serialization() {
    for strategy in [
        Strategy::Redact,
        Strategy::Hash,
        Strategy::Tokenize,
        Strategy::Partial,
        Strategy::Null,
    ] {
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(json, format!("\"{}\"", strategy.as_str()));
        assert_eq!(Strategy::from_name(strategy.as_str()), strategy);
    }
}
