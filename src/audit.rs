use serde::Serialize;
use std::{sync::Arc, time::Duration};

const MAX_MESSAGE_LEN: usize = 48;
const TRUNCATED_LEN: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    Controller,
    Service,
}

/// One audit line as shipped to the remote log collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditRecord {
    pub stack: &'static str,
    pub level: Level,
    pub package: Package,
    pub message: String,
}

impl AuditRecord {
    pub fn new(level: Level, package: Package, message: impl Into<String>) -> Self {
        Self {
            stack: "backend",
            level,
            package,
            message: truncate(message.into()),
        }
    }
}

/// Cut messages over 48 chars down to 45 plus an ellipsis.
fn truncate(message: String) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        return message;
    }
    let mut short: String = message.chars().take(TRUNCATED_LEN).collect();
    short.push_str("...");
    short
}

/// Destination for audit records. Emitting must never fail or block the caller.
pub trait AuditSink: Send + Sync + 'static {
    fn emit(&self, record: AuditRecord);
}

/// Writes audit records to the local `tracing` subscriber only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn emit(&self, record: AuditRecord) {
        trace_record(&record);
    }
}

fn trace_record(record: &AuditRecord) {
    let package = record.package;
    match record.level {
        Level::Debug => tracing::debug!(?package, "{}", record.message),
        Level::Info => tracing::info!(?package, "{}", record.message),
        Level::Warn => tracing::warn!(?package, "{}", record.message),
        Level::Error => tracing::error!(?package, "{}", record.message),
    }
}

/// Ships audit records to a remote collector over HTTP, best effort.
///
/// Each record is traced locally first, then POSTed from a spawned task so
/// the operation that produced it never waits on the network.
#[derive(Clone, Debug)]
pub struct RemoteSink {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl RemoteSink {
    pub fn new(endpoint: String, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    async fn send(&self, record: AuditRecord) {
        let mut req = self.client.post(&self.endpoint).json(&record);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        match req.send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => {
                tracing::warn!("audit sink rejected record: HTTP {}", resp.status());
            }
            Err(e) => {
                tracing::debug!("audit sink unreachable at {}: {}", self.endpoint, e);
            }
        }
    }
}

impl AuditSink for RemoteSink {
    fn emit(&self, record: AuditRecord) {
        trace_record(&record);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime, audit record not shipped");
            return;
        };

        let sink = self.clone();
        handle.spawn(async move {
            sink.send(record).await;
        });
    }
}

/// Convenience wrapper the link service logs through.
#[derive(Clone)]
pub struct AuditLog {
    sink: Arc<dyn AuditSink>,
}

impl AuditLog {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    pub fn debug(&self, package: Package, message: impl Into<String>) {
        self.sink.emit(AuditRecord::new(Level::Debug, package, message));
    }

    pub fn info(&self, package: Package, message: impl Into<String>) {
        self.sink.emit(AuditRecord::new(Level::Info, package, message));
    }

    pub fn warn(&self, package: Package, message: impl Into<String>) {
        self.sink.emit(AuditRecord::new(Level::Warn, package, message));
    }

    pub fn error(&self, package: Package, message: impl Into<String>) {
        self.sink.emit(AuditRecord::new(Level::Error, package, message));
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Arc::new(TracingSink))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::{header, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    struct Captured {
        authorization: Option<String>,
        body: Value,
    }

    /// Serve a log collector on an ephemeral port that answers every POST
    /// with `status` and hands what it received to the returned channel.
    async fn collector(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Captured>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/logs",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let tx = tx.clone();
                async move {
                    let authorization = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    let _ = tx.send(Captured {
                        authorization,
                        body,
                    });
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/logs"), rx)
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<Captured>) -> Captured {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("collector received nothing")
            .expect("collector channel closed")
    }

    #[tokio::test]
    async fn emit_ships_record_with_bearer_token() {
        let (endpoint, mut rx) = collector(StatusCode::OK).await;
        let sink = RemoteSink::new(endpoint, Some("secret".into()), Duration::from_secs(2)).unwrap();

        sink.emit(AuditRecord::new(Level::Warn, Package::Controller, "Shortcode expired"));

        let captured = next(&mut rx).await;
        assert_eq!(captured.authorization.as_deref(), Some("Bearer secret"));
        assert_eq!(
            captured.body,
            json!({
                "stack": "backend",
                "level": "warn",
                "package": "controller",
                "message": "Shortcode expired",
            })
        );
    }

    #[tokio::test]
    async fn rejected_record_is_dropped_quietly() {
        let (endpoint, mut rx) = collector(StatusCode::INTERNAL_SERVER_ERROR).await;
        let sink = RemoteSink::new(endpoint, None, Duration::from_secs(2)).unwrap();

        let long = format!("Successful redirect: {}", "x".repeat(60));
        sink.send(AuditRecord::new(Level::Info, Package::Service, long))
            .await;

        let captured = next(&mut rx).await;
        assert_eq!(captured.authorization, None);
        assert_eq!(captured.body["level"], "info");
        assert_eq!(captured.body["package"], "service");
        let message = captured.body["message"].as_str().unwrap();
        assert_eq!(message.chars().count(), 48);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn short_messages_are_kept() {
        let record = AuditRecord::new(Level::Info, Package::Service, "URL created: abc123");
        assert_eq!(record.message, "URL created: abc123");

        let exact = "x".repeat(MAX_MESSAGE_LEN);
        assert_eq!(truncate(exact.clone()), exact);
    }

    #[test]
    fn long_messages_are_truncated() {
        let long = "y".repeat(80);
        let cut = truncate(long);
        assert_eq!(cut.chars().count(), 48);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let long = "é".repeat(60);
        let cut = truncate(long);
        assert_eq!(cut.chars().count(), 48);
    }

    #[test]
    fn record_serializes_lowercase() {
        let record = AuditRecord::new(Level::Warn, Package::Controller, "Shortcode expired");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "stack": "backend",
                "level": "warn",
                "package": "controller",
                "message": "Shortcode expired",
            })
        );

        let debug = AuditRecord::new(Level::Debug, Package::Service, "Shortcode collision, attempt 1");
        assert_eq!(serde_json::to_value(&debug).unwrap()["level"], "debug");
    }

    #[test]
    fn remote_sink_without_runtime_does_not_panic() {
        let sink = RemoteSink::new(
            "http://127.0.0.1:9/logs".into(),
            Some("token".into()),
            Duration::from_millis(50),
        )
        .unwrap();
        sink.emit(AuditRecord::new(Level::Info, Package::Service, "hello"));
    }

    #[tokio::test]
    async fn remote_sink_failure_is_swallowed() {
        // Port 9 (discard) is closed on test machines; the send fails quietly.
        let sink = RemoteSink::new(
            "http://127.0.0.1:9/logs".into(),
            None,
            Duration::from_millis(50),
        )
        .unwrap();
        sink.send(AuditRecord::new(Level::Error, Package::Service, "boom"))
            .await;
    }
}
