use std::collections::{HashMap, HashSet};

use woothee::parser::Parser;

use crate::{
    models::{BreakdownRow, ClickEvent, LinkRecord, LinkStats, StatsSummary, UNKNOWN},
    store::{LinkStore, StoreError},
};

const TOP_N: usize = 10;

/// Read-only projection of link records into [`LinkStats`].
/// Does not check expiry.
#[derive(Clone, Debug)]
pub struct StatsReader {
    store: LinkStore,
}

impl StatsReader {
    pub fn new(store: LinkStore) -> Self {
        Self { store }
    }

    pub fn view(&self, code: &str) -> Result<LinkStats, StoreError> {
        self.store.lookup(code).map(project)
    }
}

pub fn project(record: LinkRecord) -> LinkStats {
    let summary = summarize(&record.clicks);
    LinkStats {
        shortcode: record.shortcode,
        original_url: record.original_url,
        created_at: record.created_at,
        expiry_at: record.expiry_at,
        click_count: record.click_count,
        clicks: record.clicks,
        summary,
    }
}

fn summarize(clicks: &[ClickEvent]) -> StatsSummary {
    let total = clicks.len() as u64;

    let unique_ips = clicks
        .iter()
        .map(|c| c.ip.as_str())
        .filter(|ip| *ip != UNKNOWN)
        .collect::<HashSet<_>>()
        .len() as u64;

    let top_referers = with_pct(
        count_field(clicks.iter().map(|c| Some(c.referer.clone()))),
        total,
    );

    let parser = Parser::new();
    let top_browsers = with_pct(
        count_field(clicks.iter().map(|c| browser_name(&parser, &c.user_agent))),
        total,
    );

    StatsSummary {
        unique_ips,
        top_referers,
        top_browsers,
    }
}

fn browser_name(parser: &Parser, user_agent: &str) -> Option<String> {
    if user_agent == UNKNOWN {
        return None;
    }
    parser
        .parse(user_agent)
        .map(|result| result.name)
        .filter(|name| !name.is_empty() && *name != "UNKNOWN")
        .map(str::to_owned)
}

/// Tally each present value, most frequent first (ties by name), top 10.
fn count_field(iter: impl Iterator<Item = Option<String>>) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for val in iter.flatten() {
        *counts.entry(val).or_insert(0) += 1;
    }
    let mut sorted: Vec<(String, u64)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted.truncate(TOP_N);
    sorted
}

fn with_pct(items: Vec<(String, u64)>, total: u64) -> Vec<BreakdownRow> {
    items
        .into_iter()
        .map(|(name, count)| BreakdownRow {
            name,
            count,
            percent: if total > 0 { count * 100 / total } else { 0 },
        })
        .collect()
}
