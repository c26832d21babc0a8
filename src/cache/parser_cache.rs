//! Content-addressed cache of per-file parse results.
//!
//! Entries are keyed by `"<parser_type>:<relative path>"` and stay valid only
//! while both the file's modification time and its SHA-256 digest match what
//! was recorded. The whole cache is one JSON document, loaded once and saved
//! once per run; concurrent writers from other processes are not supported.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, trace, warn};

use crate::error::{CacheError, Error, IoError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub mtime: f64,
    pub result: Vec<Value>,
    pub cached_at: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub invalidations: usize,
}

pub struct ParserResultCache {
    cache_file: PathBuf,
    project_root: PathBuf,
    entries: BTreeMap<String, CacheEntry>,
    stats: CacheStats,
    dirty: bool,
}

impl ParserResultCache {
    /// Opens the cache stored at `cache_file`. A missing or unreadable
    /// document yields an empty cache.
    pub fn load(cache_file: impl Into<PathBuf>, project_root: impl Into<PathBuf>) -> Self {
        let cache_file = cache_file.into();
        let entries = match fs::read_to_string(&cache_file) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, CacheEntry>>(&content) {
                Ok(entries) => {
                    debug!(path = %cache_file.display(), entries = entries.len(), "loaded parser cache");
                    entries
                }
                Err(e) => {
                    warn!(path = %cache_file.display(), error = %e, "corrupt parser cache, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                warn!(path = %cache_file.display(), error = %e, "cannot read parser cache, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            cache_file,
            project_root: project_root.into(),
            entries,
            stats: CacheStats::default(),
            dirty: false,
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Cache key for `file` parsed by `parser_type`.
    pub fn cache_key(&self, file: &Path, parser_type: &str) -> String {
        let relative = file
            .strip_prefix(&self.project_root)
            .ok()
            .map(Path::to_path_buf)
            .or_else(|| {
                let root = self.project_root.canonicalize().ok()?;
                let file = file.canonicalize().ok()?;
                file.strip_prefix(root).ok().map(Path::to_path_buf)
            })
            .unwrap_or_else(|| file.to_path_buf());
        format!("{parser_type}:{}", normalize_path(&relative))
    }

    /// Returns a copy of the cached result if `file` is unchanged since it
    /// was stored. A stale entry is removed.
    pub fn get_cached_result(&mut self, file: &Path, parser_type: &str) -> Option<Vec<Value>> {
        let key = self.cache_key(file, parser_type);
        let Some(entry) = self.entries.get(&key) else {
            self.stats.misses += 1;
            return None;
        };

        let mtime = match modification_time(file) {
            Ok(mtime) => mtime,
            Err(e) => {
                debug!(key = %key, error = %e, "cached file unavailable");
                self.stats.misses += 1;
                return None;
            }
        };
        if entry.mtime != mtime {
            trace!(key = %key, "modification time changed");
            self.invalidate_key(&key);
            return None;
        }

        let hash = match content_hash(file) {
            Ok(hash) => hash,
            Err(e) => {
                debug!(key = %key, error = %e, "cannot hash cached file");
                self.stats.misses += 1;
                return None;
            }
        };
        if entry.hash != hash {
            trace!(key = %key, "content hash changed");
            self.invalidate_key(&key);
            return None;
        }

        self.stats.hits += 1;
        Some(entry.result.clone())
    }

    /// Records `result` for `file`, stamped with its current mtime and hash.
    pub fn set_cached_result(
        &mut self,
        file: &Path,
        parser_type: &str,
        result: Vec<Value>,
    ) -> Result<(), IoError> {
        let mtime = modification_time(file)?;
        let hash = content_hash(file)?;
        let key = self.cache_key(file, parser_type);

        trace!(key = %key, items = result.len(), "caching parse result");
        self.entries.insert(
            key,
            CacheEntry {
                hash,
                mtime,
                result,
                cached_at: Utc::now().to_rfc3339(),
            },
        );
        self.dirty = true;
        Ok(())
    }

    pub fn get_cached_as<T: DeserializeOwned>(
        &mut self,
        file: &Path,
        parser_type: &str,
    ) -> Result<Option<Vec<T>>, CacheError> {
        let Some(values) = self.get_cached_result(file, parser_type) else {
            return Ok(None);
        };
        values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map(Some)
            .map_err(|e| CacheError::deserialize(self.cache_key(file, parser_type), e.to_string()))
    }

    pub fn set_cached_as<T: Serialize>(
        &mut self,
        file: &Path,
        parser_type: &str,
        result: &[T],
    ) -> Result<(), Error> {
        let values = result
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<Value>, _>>()
            .map_err(|e| CacheError::Serialize(e.to_string()))?;
        self.set_cached_result(file, parser_type, values)?;
        Ok(())
    }

    /// Drops the entry for one parser, or every parser when `None`.
    pub fn invalidate(&mut self, file: &Path, parser_type: Option<&str>) {
        match parser_type {
            Some(parser_type) => {
                let key = self.cache_key(file, parser_type);
                self.invalidate_key(&key);
            }
            None => {
                let suffix = self.cache_key(file, "");
                let stale: Vec<String> = self
                    .entries
                    .keys()
                    .filter(|key| key.ends_with(&suffix) && key[..key.len() - suffix.len()].find(':').is_none())
                    .cloned()
                    .collect();
                for key in stale {
                    self.invalidate_key(&key);
                }
            }
        }
    }

    /// Removes entries whose file no longer exists under the project root.
    pub fn prune_missing(&mut self) -> usize {
        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|key| {
                key.split_once(':')
                    .map(|(_, relative)| !self.project_root.join(relative).exists())
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        let removed = stale.len();
        for key in stale {
            self.invalidate_key(&key);
        }
        if removed > 0 {
            debug!(removed, "pruned parser cache entries for missing files");
        }
        removed
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Writes the document if anything changed since it was loaded.
    pub fn save(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.cache_file.parent() {
            fs::create_dir_all(parent).map_err(|e| CacheError::write(parent, e))?;
        }

        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CacheError::Serialize(e.to_string()))?;

        let staging = self.cache_file.with_extension("json.tmp");
        fs::write(&staging, content).map_err(|e| CacheError::write(&staging, e))?;
        fs::rename(&staging, &self.cache_file).map_err(|e| CacheError::write(&self.cache_file, e))?;

        debug!(path = %self.cache_file.display(), entries = self.entries.len(), "saved parser cache");
        self.dirty = false;
        Ok(())
    }

    fn invalidate_key(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.stats.invalidations += 1;
            self.stats.misses += 1;
            self.dirty = true;
        }
    }
}

fn modification_time(file: &Path) -> Result<f64, IoError> {
    let metadata = fs::metadata(file).map_err(|e| IoError::metadata_error(file, e))?;
    let modified = metadata
        .modified()
        .map_err(|e| IoError::metadata_error(file, e))?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0))
}

fn content_hash(file: &Path) -> Result<String, IoError> {
    let bytes = fs::read(file).map_err(|e| IoError::read_error(file, e))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Forward-slash form of `path`. Absolute paths keep their leading `/` so
/// files outside the project root never share a key with files inside it.
fn normalize_path(path: &Path) -> String {
    let mut anchor = String::new();
    let mut parts = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => anchor.push_str(&prefix.as_os_str().to_string_lossy()),
            Component::RootDir => anchor.push('/'),
            Component::CurDir => {}
            Component::ParentDir => parts.push("..".to_string()),
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
        }
    }
    anchor + &parts.join("/")
}
