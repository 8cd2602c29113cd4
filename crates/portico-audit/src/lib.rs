use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self as tokio_time, MissedTickBehavior};
use tracing::warn;

/// Captured request/response bodies are cut at this many bytes.
pub const BODY_CAPTURE_LIMIT: usize = 1024;

/// One proxied request, as shipped to the log store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub trace_id: String,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub client_ip: String,
    pub user_agent: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub request_body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub response_body: String,
    pub latency_ms: u64,
}

/// Lossy-decodes a body and cuts it at [`BODY_CAPTURE_LIMIT`] bytes, on a
/// char boundary.
pub fn truncate_body(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    if text.len() <= BODY_CAPTURE_LIMIT {
        return text.into_owned();
    }
    let mut cut = BODY_CAPTURE_LIMIT;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...(truncated)", &text[..cut])
}

pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

pub type SharedAuditSink = Arc<dyn AuditSink>;

#[derive(Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _entry: AuditEntry) {}
}

/// Sink end of an [`AuditBus`]. Drops entries when the channel is full.
#[derive(Clone)]
pub struct BusAuditSink {
    tx: mpsc::Sender<AuditEntry>,
}

impl BusAuditSink {
    pub fn new(bus: &AuditBus) -> Self {
        Self {
            tx: bus.tx.clone(),
        }
    }
}

impl AuditSink for BusAuditSink {
    fn record(&self, entry: AuditEntry) {
        let _ = self.tx.try_send(entry);
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("log store transport: {0}")]
    Transport(String),
    #[error("log store rejected batch: status {0}")]
    Status(u16),
}

#[async_trait]
pub trait AuditShipper: Send + Sync {
    async fn ship(&self, entries: &[AuditEntry]) -> Result<(), ShipError>;
}

#[derive(Debug, Clone)]
pub struct AuditBusConfig {
    pub capacity: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
}

impl Default for AuditBusConfig {
    fn default() -> Self {
        Self {
            capacity: 4096,
            batch_size: 64,
            flush_interval: Duration::from_millis(500),
        }
    }
}

/// Bounded channel draining into a shipper task. Ship failures are logged and
/// the batch dropped; the request path never waits on the log store.
pub struct AuditBus {
    pub tx: mpsc::Sender<AuditEntry>,
    _handle: JoinHandle<()>,
}

impl AuditBus {
    pub fn spawn(shipper: Arc<dyn AuditShipper>, config: AuditBusConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.capacity);
        let handle = tokio::spawn(entry_writer(
            shipper,
            rx,
            config.batch_size,
            config.flush_interval,
        ));
        Self {
            tx,
            _handle: handle,
        }
    }
}

async fn entry_writer(
    shipper: Arc<dyn AuditShipper>,
    mut rx: mpsc::Receiver<AuditEntry>,
    batch_size: usize,
    flush_interval: Duration,
) {
    let mut buffer = Vec::with_capacity(batch_size);
    let mut ticker = tokio_time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            Some(entry) = rx.recv() => {
                buffer.push(entry);
                if buffer.len() >= batch_size {
                    flush(shipper.as_ref(), &mut buffer).await;
                }
            }
            _ = ticker.tick() => {
                if !buffer.is_empty() {
                    flush(shipper.as_ref(), &mut buffer).await;
                }
            }
            else => {
                if !buffer.is_empty() {
                    flush(shipper.as_ref(), &mut buffer).await;
                }
                break;
            }
        }
    }
}

async fn flush(shipper: &dyn AuditShipper, buffer: &mut Vec<AuditEntry>) {
    if let Err(err) = shipper.ship(buffer).await {
        warn!(error = %err, dropped = buffer.len(), "audit ship failed");
    }
    buffer.clear();
}

/// Ships batches as ndjson to `{url}/{index}/_bulk` (Elasticsearch bulk
/// convention).
pub struct HttpAuditShipper {
    bulk_url: String,
    index: String,
    client: wreq::Client,
}

impl HttpAuditShipper {
    pub fn new(url: &str, index: &str) -> Result<Self, wreq::Error> {
        let client = wreq::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            bulk_url: format!("{}/{}/_bulk", url.trim_end_matches('/'), index),
            index: index.to_string(),
            client,
        })
    }
}

#[async_trait]
impl AuditShipper for HttpAuditShipper {
    async fn ship(&self, entries: &[AuditEntry]) -> Result<(), ShipError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut body = String::new();
        for entry in entries {
            body.push_str(&serde_json::to_string(
                &serde_json::json!({ "index": { "_index": self.index } }),
            )?);
            body.push('\n');
            body.push_str(&serde_json::to_string(entry)?);
            body.push('\n');
        }
        let resp = self
            .client
            .post(&self.bulk_url)
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|err| ShipError::Transport(err.to_string()))?;
        let status = resp.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(ShipError::Status(status));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn entry(trace_id: &str) -> AuditEntry {
        AuditEntry {
            timestamp: OffsetDateTime::UNIX_EPOCH,
            trace_id: trace_id.to_string(),
            method: "GET".to_string(),
            path: "/driver/drivers".to_string(),
            status_code: 200,
            client_ip: "10.0.0.1".to_string(),
            user_agent: "curl/8".to_string(),
            request_body: String::new(),
            response_body: "[]".to_string(),
            latency_ms: 12,
        }
    }

    #[test]
    fn short_bodies_pass_through() {
        assert_eq!(truncate_body(b"hello"), "hello");
        assert_eq!(truncate_body(b""), "");
    }

    #[test]
    fn long_bodies_are_cut_with_a_marker() {
        let raw = vec![b'x'; BODY_CAPTURE_LIMIT + 100];
        let out = truncate_body(&raw);
        assert!(out.ends_with("...(truncated)"));
        assert_eq!(out.len(), BODY_CAPTURE_LIMIT + "...(truncated)".len());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // 4-byte scalar repeated across the cut point.
        let raw = "🦀".repeat(BODY_CAPTURE_LIMIT);
        let out = truncate_body(raw.as_bytes());
        assert!(out.ends_with("...(truncated)"));
        assert!(out.len() <= BODY_CAPTURE_LIMIT + "...(truncated)".len());
    }

    #[test]
    fn entries_serialize_with_camel_case_keys() {
        let json = serde_json::to_value(entry("t-1")).unwrap();
        assert_eq!(json["traceId"], "t-1");
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["clientIp"], "10.0.0.1");
        assert_eq!(json["latencyMs"], 12);
        // Empty request body is omitted entirely.
        assert!(json.get("requestBody").is_none());
        assert_eq!(json["responseBody"], "[]");
    }

    struct RecordingShipper {
        batches: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl AuditShipper for RecordingShipper {
        async fn ship(&self, entries: &[AuditEntry]) -> Result<(), ShipError> {
            self.batches.lock().unwrap().push(entries.len());
            Ok(())
        }
    }

    #[tokio::test]
    async fn bus_flushes_on_batch_size() {
        let shipper = Arc::new(RecordingShipper {
            batches: Mutex::new(Vec::new()),
        });
        let bus = AuditBus::spawn(
            shipper.clone(),
            AuditBusConfig {
                capacity: 16,
                batch_size: 2,
                flush_interval: Duration::from_secs(60),
            },
        );
        let sink = BusAuditSink::new(&bus);
        sink.record(entry("a"));
        sink.record(entry("b"));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(shipper.batches.lock().unwrap().as_slice(), &[2]);
    }

    #[tokio::test]
    async fn bus_flushes_on_interval() {
        let shipper = Arc::new(RecordingShipper {
            batches: Mutex::new(Vec::new()),
        });
        let bus = AuditBus::spawn(
            shipper.clone(),
            AuditBusConfig {
                capacity: 16,
                batch_size: 100,
                flush_interval: Duration::from_millis(20),
            },
        );
        let sink = BusAuditSink::new(&bus);
        sink.record(entry("a"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(shipper.batches.lock().unwrap().as_slice(), &[1]);
    }
}
