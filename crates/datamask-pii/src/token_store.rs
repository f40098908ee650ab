//! Persistent token store for the `tokenize` strategy
//!
//! Maps `tok::<original value>` to `TOK-` followed by the first 8 hex
//! characters of the value's SHA-256 digest. The truncated digest is not
//! globally unique: two different values may share a token. That trade-off
//! keeps tokens short and is accepted.
//!
//! The backing file is a flat JSON object. It is read once on open and
//! rewritten atomically after every new token, so a token is durable
//! before [`TokenStore::tokenize`] returns.

use crate::storage::AtomicWriter;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const KEY_PREFIX: &str = "tok::";
const TOKEN_PREFIX: &str = "TOK-";
const TOKEN_HEX_LEN: usize = 8;

/// File-backed map from original values to stable tokens
#[derive(Debug)]
pub struct TokenStore {
    path: PathBuf,
    tokens: BTreeMap<String, String>,
}

impl TokenStore {
    /// Open the store at `path`
    ///
    /// A missing, unreadable or corrupt file yields an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let tokens = Self::load(&path);
        debug!("Opened token store {:?} with {} tokens", path, tokens.len());
        Self { path, tokens }
    }

    fn load(path: &Path) -> BTreeMap<String, String> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read token store {:?}: {}", path, e);
                return BTreeMap::new();
            }
        };

        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Ignoring corrupt token store {:?}: {}", path, e);
            BTreeMap::new()
        })
    }

    /// Stable token for `value`, created and persisted on first use
    pub fn tokenize(&mut self, value: &str) -> String {
        let key = format!("{}{}", KEY_PREFIX, value);

        if let Some(token) = self.tokens.get(&key) {
            return token.clone();
        }

        let token = derive_token(value);
        self.tokens.insert(key, token.clone());
        self.save();
        token
    }

    /// Token previously issued for `value`, without creating one
    pub fn get(&self, value: &str) -> Option<&str> {
        self.tokens
            .get(&format!("{}{}", KEY_PREFIX, value))
            .map(String::as_str)
    }

    /// Rewrite the backing file; failures are logged and swallowed
    pub fn save(&self) {
        let result = serde_json::to_vec_pretty(&self.tokens)
            .map_err(crate::Error::from)
            .and_then(|data| AtomicWriter::replace(&self.path, &data));

        if let Err(e) = result {
            warn!("Failed to persist token store {:?}: {}", self.path, e);
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// `TOK-` plus the first 8 hex characters of SHA-256(value)
pub fn derive_token(value: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(value.as_bytes()));
    format!("{}{}", TOKEN_PREFIX, &digest[..TOKEN_HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_token_format() {
        let token = derive_token("alice@example.com");
        assert!(token.starts_with("TOK-"));
        assert_eq!(token.len(), 12);
        assert!(token[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_known_digest_prefix() {
        // sha256("abc") = ba7816bf...
        assert_eq!(derive_token("abc"), "TOK-ba7816bf");
    }

    #[test]
    fn test_tokenize_is_stable_within_store() {
        let dir = TempDir::new().unwrap();
        let mut store = TokenStore::open(dir.path().join("tokens.json"));

        let first = store.tokenize("123-45-6789");
        let second = store.tokenize("123-45-6789");

        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
        assert_ne!(first, store.tokenize("987-65-4321"));
    }

    #[test]
    fn test_tokens_survive_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        let token = TokenStore::open(&path).tokenize("alice@example.com");

        let mut reopened = TokenStore::open(&path);
        assert_eq!(reopened.get("alice@example.com"), Some(token.as_str()));
        assert_eq!(reopened.tokenize("alice@example.com"), token);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");

        let token = TokenStore::open(&path).tokenize("value");

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk.get("tok::value"), Some(&token));
    }

    #[test]
    fn test_stored_token_wins_over_derivation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"tok::alice": "TOK-custom01"}"#).unwrap();

        let mut store = TokenStore::open(&path);
        assert_eq!(store.tokenize("alice"), "TOK-custom01");
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "not json at all").unwrap();

        let mut store = TokenStore::open(&path);
        assert!(store.is_empty());

        let token = store.tokenize("bob");
        assert_eq!(token, derive_token("bob"));
        assert_eq!(TokenStore::open(&path).get("bob"), Some(token.as_str()));
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be replaced by a file
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let mut store = TokenStore::open(&path);
        let token = store.tokenize("carol");

        assert_eq!(token, derive_token("carol"));
        assert_eq!(store.tokenize("carol"), token);
    }
}
