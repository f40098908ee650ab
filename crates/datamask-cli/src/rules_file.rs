//! Rules file loading

use datamask_pii::{Error, Result, RuleConfig, RuleSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

/// Load and resolve the rules at `path`, or the defaults without one
///
/// `.toml` files are read as TOML; anything else goes through the YAML
/// parser, which also takes JSON. An empty document means defaults.
pub fn load_rules(path: Option<&Path>) -> Result<RuleSet> {
    let Some(path) = path else {
        debug!("No rules file given, using defaults");
        return Ok(RuleSet::default());
    };

    let path = expand_path(path);
    let contents = fs::read_to_string(&path).map_err(|e| {
        Error::Config(format!("failed to read rules file {}: {}", path.display(), e))
    })?;

    let config = parse_rules(&path, &contents)?;
    info!("Loaded rules from {}", path.display());
    Ok(RuleSet::from_config(config))
}

fn parse_rules(path: &Path, contents: &str) -> Result<RuleConfig> {
    if contents.trim().is_empty() {
        return Ok(RuleConfig::default());
    }

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_ascii_lowercase);

    let parsed = match extension.as_deref() {
        Some("toml") => toml::from_str(contents).map_err(|e| e.to_string()),
        _ => serde_yaml::from_str(contents).map_err(|e| e.to_string()),
    };

    parsed.map_err(|e| Error::Config(format!("invalid rules file {}: {}", path.display(), e)))
}
