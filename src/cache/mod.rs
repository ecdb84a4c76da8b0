//! On-disk cache of extracted artifacts.
//!
//! One pretty-printed JSON file per [`CacheKey`] under the cache directory.
//! Writes go through [`crate::fs::atomic_write`], so a reader never observes a
//! partially written file and concurrent writers to the same key leave one of
//! their values intact.

mod key;

pub use key::{CacheKey, normalize_subject};

use crate::error::{RelayError, Result};
use crate::fs::atomic_write;
use serde_json::Value;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ArtifactCache {
    dir: PathBuf,
}

impl ArtifactCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// The cached document, or `None` when the key has never been stored.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Value>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(RelayError::CacheError(format!(
                    "failed to read cache entry '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        let value = serde_json::from_str(&content).map_err(|e| {
            RelayError::CacheError(format!(
                "cache entry '{}' is not valid JSON: {}",
                path.display(),
                e
            ))
        })?;
        debug!(key = %key, "cache hit");
        Ok(Some(value))
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn put(&self, key: &CacheKey, value: &Value) -> Result<PathBuf> {
        let path = self.path_for(key);
        let mut content = serde_json::to_string_pretty(value)
            .map_err(|e| RelayError::CacheError(format!("failed to serialize artifact: {}", e)))?;
        content.push('\n');
        atomic_write(&path, content.as_bytes())?;
        debug!(key = %key, path = %path.display(), "artifact stored");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn key() -> CacheKey {
        CacheKey::new("plan", "https://github.com/acme/widgets", Some("7")).unwrap()
    }

    #[test]
    fn test_get_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path().join("cache"));
        assert_eq!(cache.get(&key()).unwrap(), None);
    }

    #[test]
    fn test_put_then_get() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path().join("cache"));
        let doc = json!({"steps": ["a", "b"]});

        let path = cache.put(&key(), &doc).unwrap();

        assert_eq!(path, temp.path().join("cache").join("plan_acme_widgets_7.json"));
        assert_eq!(cache.get(&key()).unwrap(), Some(doc));
    }

    #[test]
    fn test_put_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let doc = json!([1, 2, 3]);

        cache.put(&key(), &doc).unwrap();
        let first = fs::read(cache.path_for(&key())).unwrap();
        cache.put(&key(), &doc).unwrap();
        let second = fs::read(cache.path_for(&key())).unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.get(&key()).unwrap(), Some(doc));
    }

    #[test]
    fn test_corrupt_entry_is_a_cache_error() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        fs::write(cache.path_for(&key()), "{truncated").unwrap();

        let err = cache.get(&key()).unwrap_err();
        assert!(matches!(err, RelayError::CacheError(_)));
    }

    #[test]
    fn test_concurrent_puts_leave_one_value() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let docs: Vec<Value> = (0..8).map(|i| json!({"writer": i})).collect();

        std::thread::scope(|s| {
            for doc in &docs {
                let cache = &cache;
                s.spawn(move || cache.put(&key(), doc).unwrap());
            }
        });

        let stored = cache.get(&key()).unwrap().unwrap();
        assert!(docs.contains(&stored));
    }

    #[test]
    fn test_concurrent_puts_to_distinct_keys_keep_both() {
        let temp = TempDir::new().unwrap();
        let cache = ArtifactCache::new(temp.path());
        let keys: Vec<CacheKey> = (1..=2)
            .map(|i| CacheKey::new("plan", "acme/w", Some(&i.to_string())).unwrap())
            .collect();

        for round in 0..20 {
            std::thread::scope(|s| {
                for (i, key) in keys.iter().enumerate() {
                    let cache = &cache;
                    s.spawn(move || cache.put(key, &json!({"item": i, "round": round})).unwrap());
                }
            });

            for (i, key) in keys.iter().enumerate() {
                assert_eq!(
                    cache.get(key).unwrap(),
                    Some(json!({"item": i, "round": round}))
                );
            }
        }
        assert_eq!(keys[0].to_string(), "plan_acme_w_1");
        assert_eq!(keys[1].to_string(), "plan_acme_w_2");
    }
}
