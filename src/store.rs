use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;

use crate::models::{ClickEvent, LinkMeta, LinkRecord};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("shortcode already exists: {0}")]
    AlreadyExists(String),
    #[error("shortcode not found: {0}")]
    NotFound(String),
}

/// Thread-safe in-memory mapping shortcode -> link record.
///
/// Backed by a DashMap: inserting a key holds the write lock of one shard
/// for the check and the insert, so two racing inserts of the same code
/// cannot both win. Appending a click holds the same shard lock while it
/// pushes the event and bumps the counter, so readers never see one without
/// the other. Unrelated codes usually live in other shards and are not
/// blocked.
///
/// Expired records stay in the map and keep their code reserved.
#[derive(Clone, Debug)]
pub struct LinkStore {
    inner: Arc<DashMap<String, LinkRecord>>,
}

impl LinkStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Claim `record.shortcode`, failing if any record (live or expired) holds it.
    pub fn insert(&self, record: LinkRecord) -> Result<(), StoreError> {
        match self.inner.entry(record.shortcode.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists(record.shortcode)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// Metadata of the record under `code`. Does not touch the click history,
    /// so the cost and the time spent holding the shard lock stay flat as a
    /// link collects clicks.
    pub fn lookup_meta(&self, code: &str) -> Result<LinkMeta, StoreError> {
        self.inner
            .get(code)
            .map(|r| r.value().meta())
            .ok_or_else(|| StoreError::NotFound(code.to_owned()))
    }

    /// Full snapshot of the record stored under `code`, click history included.
    pub fn lookup(&self, code: &str) -> Result<LinkRecord, StoreError> {
        self.inner
            .get(code)
            .map(|r| r.value().clone())
            .ok_or_else(|| StoreError::NotFound(code.to_owned()))
    }

    /// Append `event` and advance the counter in one step.
    pub fn append_click(&self, code: &str, event: ClickEvent) -> Result<(), StoreError> {
        let mut record = self
            .inner
            .get_mut(code)
            .ok_or_else(|| StoreError::NotFound(code.to_owned()))?;
        record.clicks.push(event);
        record.click_count += 1;
        Ok(())
    }

    /// Drop every record whose expiry lies strictly before `now`.
    /// Returns how many were removed. Never called by the link service itself.
    pub fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let before = self.inner.len();
        self.inner.retain(|_, record| !record.is_expired(now));
        before.saturating_sub(self.inner.len())
    }

    /// Number of records currently stored, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Default for LinkStore {
    fn default() -> Self {
        Self::new()
    }
}
