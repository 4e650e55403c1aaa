use chrono::{DateTime, Utc};

use crate::{
    models::{ClickContext, ClickEvent, DIRECT, UNKNOWN},
    store::{LinkStore, StoreError},
};

/// Applies clicks to the store. Whether a click should happen at all
/// (unknown or expired code) is decided by the caller.
#[derive(Clone, Debug)]
pub struct ClickRecorder {
    store: LinkStore,
}

impl ClickRecorder {
    pub fn new(store: LinkStore) -> Self {
        Self { store }
    }

    pub fn record(&self, code: &str, event: ClickEvent) -> Result<(), StoreError> {
        self.store.append_click(code, event)
    }
}

/// Build a click event, substituting sentinels for anything missing or blank.
pub fn build_event(ctx: ClickContext, timestamp: DateTime<Utc>) -> ClickEvent {
    ClickEvent {
        timestamp,
        user_agent: or_sentinel(ctx.user_agent, UNKNOWN),
        referer: or_sentinel(ctx.referer, DIRECT),
        ip: or_sentinel(ctx.ip, UNKNOWN),
        location: or_sentinel(ctx.location, UNKNOWN),
    }
}

fn or_sentinel(value: Option<String>, sentinel: &str) -> String {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| sentinel.to_owned())
}
