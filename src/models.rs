use chrono::{DateTime, Utc};
use serde::Serialize;

pub const UNKNOWN: &str = "Unknown";
pub const DIRECT: &str = "Direct";

/// A shortened link and its click history.
///
/// Only `click_count` and `clicks` ever change after creation, and only
/// through [`crate::store::LinkStore::append_click`].
#[derive(Debug, Clone, PartialEq)]
pub struct LinkRecord {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
    pub click_count: u64,
    pub clicks: Vec<ClickEvent>,
}

impl LinkRecord {
    pub fn new(
        shortcode: impl Into<String>,
        original_url: impl Into<String>,
        created_at: DateTime<Utc>,
        expiry_at: DateTime<Utc>,
    ) -> Self {
        Self {
            shortcode: shortcode.into(),
            original_url: original_url.into(),
            created_at,
            expiry_at,
            click_count: 0,
            clicks: Vec::new(),
        }
    }

    /// Live up to and including `expiry_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_at
    }

    /// The immutable part of the record, without the click history.
    pub fn meta(&self) -> LinkMeta {
        LinkMeta {
            shortcode: self.shortcode.clone(),
            original_url: self.original_url.clone(),
            created_at: self.created_at,
            expiry_at: self.expiry_at,
        }
    }
}

/// What redirects and expiry checks need from a record. Cheap to copy
/// regardless of how many clicks the link has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkMeta {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
}

impl LinkMeta {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_at
    }
}

/// A single recorded redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickEvent {
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
    pub referer: String,
    pub ip: String,
    pub location: String,
}

/// Request metadata as seen by the HTTP layer. Any field may be missing.
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ip: Option<String>,
    pub location: Option<String>,
}

/// Externally visible statistics for one link.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkStats {
    pub shortcode: String,
    pub original_url: String,
    pub created_at: DateTime<Utc>,
    pub expiry_at: DateTime<Utc>,
    pub click_count: u64,
    pub clicks: Vec<ClickEvent>,
    pub summary: StatsSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSummary {
    pub unique_ips: u64,
    pub top_referers: Vec<BreakdownRow>,
    pub top_browsers: Vec<BreakdownRow>,
}

/// One row of a "top N" breakdown: value, occurrences, share of all clicks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownRow {
    pub name: String,
    pub count: u64,
    pub percent: u64,
}
