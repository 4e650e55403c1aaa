use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use url::Url;

use crate::{
    audit::{AuditLog, Package},
    clock::{Clock, SystemClock},
    error::{LinkError, Result},
    models::{ClickContext, LinkMeta, LinkRecord, LinkStats},
    recorder::{self, ClickRecorder},
    shortcode::{self, CodeGenerator, RandomCodeGenerator},
    stats::StatsReader,
    store::{LinkStore, StoreError},
};

pub const DEFAULT_VALIDITY_MINUTES: i64 = 30;
pub const MAX_VALIDITY_MINUTES: i64 = 1440;
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Parameters of a create call as received from the caller.
#[derive(Debug, Clone, Default)]
pub struct CreateLink {
    pub url: String,
    pub validity_minutes: Option<i64>,
    pub shortcode: Option<String>,
}

/// The three operations callers invoke on short links: create, resolve, stats.
///
/// Expiry is judged on every call against the injected clock; nothing is
/// ever marked expired or removed here.
#[derive(Clone)]
pub struct LinkService {
    store: LinkStore,
    recorder: ClickRecorder,
    stats: StatsReader,
    generator: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    audit: AuditLog,
    default_validity_minutes: i64,
    max_attempts: u32,
}

impl LinkService {
    pub fn new(store: LinkStore) -> Self {
        Self {
            recorder: ClickRecorder::new(store.clone()),
            stats: StatsReader::new(store.clone()),
            store,
            generator: Arc::new(RandomCodeGenerator::default()),
            clock: Arc::new(SystemClock),
            audit: AuditLog::default(),
            default_validity_minutes: DEFAULT_VALIDITY_MINUTES,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn CodeGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_default_validity(mut self, minutes: i64) -> Self {
        self.default_validity_minutes = minutes;
        self
    }

    /// At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn store(&self) -> &LinkStore {
        &self.store
    }

    // ── Create ─────────────────────────────────────────────────────────────

    pub fn create(&self, req: CreateLink) -> Result<LinkRecord> {
        self.audit
            .info(Package::Controller, "Create URL request received");

        if req.url.trim().is_empty() {
            self.audit.warn(Package::Controller, "Missing URL in request");
            return Err(LinkError::InvalidUrl(req.url));
        }
        if !is_valid_url(&req.url) {
            self.audit.warn(Package::Controller, "Invalid URL format");
            return Err(LinkError::InvalidUrl(req.url));
        }

        let validity = req
            .validity_minutes
            .filter(|v| *v > 0)
            .unwrap_or(self.default_validity_minutes);
        if !(1..=MAX_VALIDITY_MINUTES).contains(&validity) {
            self.audit.warn(Package::Controller, "Invalid validity period");
            return Err(LinkError::InvalidValidity(validity));
        }

        let created_at = self.clock.now();
        let expiry_at = created_at + Duration::minutes(validity);

        let record = match req.shortcode {
            Some(code) => self.claim(code, req.url, created_at, expiry_at)?,
            None => self.allocate(req.url, created_at, expiry_at)?,
        };

        self.audit.info(
            Package::Service,
            format!("URL created: {}", record.shortcode),
        );
        Ok(record)
    }

    /// Insert under a caller-chosen code. Never substitutes another code.
    fn claim(
        &self,
        code: String,
        url: String,
        created_at: DateTime<Utc>,
        expiry_at: DateTime<Utc>,
    ) -> Result<LinkRecord> {
        if !shortcode::is_valid(&code) {
            self.audit.warn(Package::Controller, "Invalid custom shortcode");
            return Err(LinkError::InvalidShortcode(code));
        }

        let record = LinkRecord::new(code, url, created_at, expiry_at);
        match self.store.insert(record.clone()) {
            Ok(()) => Ok(record),
            Err(_) => {
                self.audit.warn(Package::Controller, "Shortcode already exists");
                Err(LinkError::CodeTaken(record.shortcode))
            }
        }
    }

    /// Insert under generated codes, retrying collisions up to `max_attempts`.
    fn allocate(
        &self,
        url: String,
        created_at: DateTime<Utc>,
        expiry_at: DateTime<Utc>,
    ) -> Result<LinkRecord> {
        for attempt in 1..=self.max_attempts {
            let record = LinkRecord::new(self.generator.generate(), url.clone(), created_at, expiry_at);
            match self.store.insert(record.clone()) {
                Ok(()) => return Ok(record),
                Err(_) => {
                    self.audit.debug(
                        Package::Service,
                        format!("Shortcode collision, attempt {attempt}"),
                    );
                }
            }
        }

        self.audit
            .error(Package::Service, "Shortcode allocation exhausted");
        Err(LinkError::AllocationExhausted(self.max_attempts))
    }

    // ── Resolve ────────────────────────────────────────────────────────────

    /// Return the target of `code` and record the click described by `ctx`.
    ///
    /// The clock is read once: the same instant decides expiry and stamps
    /// the click, so no recorded click lies after `expiry_at`.
    pub fn resolve(&self, code: &str, ctx: ClickContext) -> Result<String> {
        self.audit
            .info(Package::Controller, format!("Redirect: {code}"));

        let now = self.clock.now();
        let meta = self.live_meta(
            code,
            now,
            "Redirect failed - not found",
            "Redirect failed - expired",
        )?;
        self.recorder
            .record(code, recorder::build_event(ctx, now))
            .map_err(|e| self.unknown(e, "Redirect failed - not found"))?;

        self.audit
            .info(Package::Service, format!("Successful redirect: {code}"));
        Ok(meta.original_url)
    }

    // ── Stats ──────────────────────────────────────────────────────────────

    pub fn stats(&self, code: &str) -> Result<LinkStats> {
        self.audit
            .info(Package::Controller, format!("Stats request: {code}"));

        self.live_meta(code, self.clock.now(), "Shortcode not found", "Shortcode expired")?;
        let stats = self
            .stats
            .view(code)
            .map_err(|e| self.unknown(e, "Shortcode not found"))?;

        self.audit
            .info(Package::Controller, format!("Stats retrieved: {code}"));
        Ok(stats)
    }

    // ── Helpers ────────────────────────────────────────────────────────────

    /// Metadata of `code`, rejected when missing or past its expiry at `now`.
    fn live_meta(
        &self,
        code: &str,
        now: DateTime<Utc>,
        not_found: &str,
        expired: &str,
    ) -> Result<LinkMeta> {
        let meta = self
            .store
            .lookup_meta(code)
            .map_err(|e| self.unknown(e, not_found))?;

        if meta.is_expired(now) {
            self.audit.warn(Package::Controller, expired);
            return Err(LinkError::Expired(code.to_owned()));
        }
        Ok(meta)
    }

    fn unknown(&self, err: StoreError, message: &str) -> LinkError {
        self.audit.warn(Package::Controller, message);
        match err {
            StoreError::NotFound(code) | StoreError::AlreadyExists(code) => {
                LinkError::UnknownCode(code)
            }
        }
    }
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(candidate: &str) -> bool {
    match Url::parse(candidate.trim()) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}
