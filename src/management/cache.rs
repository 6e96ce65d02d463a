use std::{collections::HashSet, time::Duration, time::Instant};

use moka::{Expiry, future::Cache};
use serde_json::Value;

use crate::warning;

/// Upper bound on cached payloads across all sessions.
pub const MAX_ENTRIES: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _created_at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// In-memory cache of API payloads with a per-entry time to live.
///
/// Keys are namespaced by session id (see [`ResponseCache::key`]) so one
/// session never reads another session's data.
#[derive(Clone)]
pub struct ResponseCache {
    entries: Cache<String, Entry>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .support_invalidation_closures()
            .build();
        Self { entries }
    }

    pub fn key(session_id: &str, name: &str) -> String {
        format!("{session_id}:{name}")
    }

    /// Returns the value under `key` unless it has expired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).await.map(|entry| entry.value)
    }

    pub async fn set(&self, key: &str, value: Value, ttl: Duration) {
        self.entries
            .insert(key.to_string(), Entry { value, ttl })
            .await;
    }

    /// Drops every entry belonging to a session.
    pub fn invalidate_session(&self, session_id: &str) {
        self.invalidate_sessions(std::iter::once(session_id.to_string()));
    }

    /// Drops every entry belonging to any of the given sessions.
    pub fn invalidate_sessions<I>(&self, session_ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        let ids: HashSet<String> = session_ids.into_iter().collect();
        if ids.is_empty() {
            return;
        }

        let result = self.entries.invalidate_entries_if(move |key, _| {
            key.split_once(':')
                .is_some_and(|(session_id, _)| ids.contains(session_id))
        });
        if let Err(e) = result {
            warning!("Cannot drop cached entries: {}", e);
        }
    }

    /// Applies pending evictions and returns the number of live entries.
    pub async fn len(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
