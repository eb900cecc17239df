//! Resolution cache
//!
//! Memoizes complete render outputs keyed by request tuple and context
//! content. Entries expire after a TTL: an expired entry is evicted when a
//! lookup finds it and on every insert. Everything is dropped when the
//! template store is reloaded.

use crate::context::RenderContext;
use crate::request::{RenderOutput, ResolutionRequest};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Display;

/// Stable hash of `(platform, documentType, techStack, strictness, context)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(request: &ResolutionRequest, context: &RenderContext) -> Self {
        let strictness = request.strictness.to_string();
        let fingerprint = context.fingerprint();
        let mut hasher = Sha256::new();
        for part in [
            &request.platform,
            &request.document_type,
            &request.tech_stack,
            &strictness,
            &fingerprint,
        ] {
            hasher.update(part.len().to_le_bytes());
            hasher.update(part.as_bytes());
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub output: RenderOutput,
    pub created_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(output: RenderOutput, ttl: Duration) -> Self {
        Self { output, created_at: Utc::now(), ttl }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
}

/// Thread-safe map from [`CacheKey`] to rendered output.
#[derive(Debug)]
pub struct ResolutionCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    ttl: Duration,
}

impl ResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { entries: RwLock::new(HashMap::new()), ttl }
    }

    pub fn with_ttl_secs(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        Self::new(ttl)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached output unless it is missing or expired.
    /// An expired entry is removed.
    pub fn get(&self, key: &CacheKey) -> Option<RenderOutput> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.output.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write();
        // Another caller may have replaced it between the two locks.
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.output.clone()),
            Some(_) => {
                debug!("Evicting expired cache entry {key}");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Stores `output` under `key`, evicting every expired entry first.
    pub fn put(&self, key: CacheKey, output: RenderOutput) {
        let mut entries = self.entries.write();
        let purged = retain_live(&mut entries);
        if purged > 0 {
            debug!("Evicted {purged} expired cache entries");
        }
        entries.insert(key, CacheEntry::new(output, self.ttl));
    }

    pub fn insert(&self, key: CacheKey, entry: CacheEntry) {
        self.entries.write().insert(key, entry);
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries.write();
        debug!("Invalidating {} cache entries", entries.len());
        entries.clear();
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        retain_live(&mut self.entries.write())
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        CacheStats {
            entries: entries.len(),
            expired: entries.values().filter(|entry| entry.is_expired()).count(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn retain_live(entries: &mut HashMap<CacheKey, CacheEntry>) -> usize {
    let now = Utc::now();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_expired_at(now));
    before - entries.len()
}
