//! UDP receive/batch/flush/cleanup loop.
//!
//! Ports `apps/syslog/src/syslog/collector.py`'s `SyslogCollector` semantics: mutex-protected
//! in-memory buffer flushed at 100 events or every 5 seconds (whichever first), a periodic
//! circular-buffer cleanup every 5 minutes, and re-queue-at-front on flush failure capped at
//! 10x the batch size.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;

use crate::bus::BusClient;
use crate::db::SyslogRepo;

use super::parser::parse_syslog_message;
use super::SyslogEvent;

const BATCH_SIZE: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const BUFFER_CHECK_INTERVAL: Duration = Duration::from_secs(300);
const REQUEUE_CAP_MULTIPLIER: usize = 10;

pub struct SyslogIngestor {
    socket: UdpSocket,
    db: SyslogRepo,
    bus: Arc<BusClient>,
    buffer: Mutex<VecDeque<SyslogEvent>>,
    dropped_events: AtomicU64,
}

impl SyslogIngestor {
    pub async fn bind(addr: SocketAddr, db: SyslogRepo, bus: Arc<BusClient>) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(SyslogIngestor {
            socket,
            db,
            bus,
            buffer: Mutex::new(VecDeque::new()),
            dropped_events: AtomicU64::new(0),
        })
    }

    /// Total events discarded at the buffer edge (requeue capped at 10x batch size) since bind.
    /// Part of the external contract — surfaced by callers that expose process metrics.
    pub fn dropped_event_count(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Runs the receive loop, plus the periodic flush and cleanup tasks, until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: tokio_util::sync::CancellationToken) {
        let flush_task = {
            let this = self.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(FLUSH_INTERVAL);
                loop {
                    tokio::select! {
                        _ = interval.tick() => this.flush().await,
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        let cleanup_task = {
            let this = self.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(BUFFER_CHECK_INTERVAL);
                loop {
                    tokio::select! {
                        _ = interval.tick() => this.manage_buffer_size().await,
                        _ = cancel.cancelled() => break,
                    }
                }
            })
        };

        let mut buf = vec![0u8; 65535];
        loop {
            tokio::select! {
                recv = self.socket.recv_from(&mut buf) => {
                    match recv {
                        Ok((n, addr)) => self.process_datagram(&buf[..n], addr).await,
                        Err(e) => tracing::error!(error = %e, "UDP receive error"),
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }

        self.flush().await;
        let _ = flush_task.await;
        let _ = cleanup_task.await;
    }

    async fn process_datagram(&self, data: &[u8], addr: SocketAddr) {
        let raw_message = String::from_utf8_lossy(data).trim().to_string();
        let parsed = parse_syslog_message(&raw_message);
        let event = SyslogEvent::from_parsed(addr.ip(), chrono::Utc::now(), parsed);

        let should_flush = {
            let mut buffer = self.buffer.lock().await;
            buffer.push_back(event.clone());
            buffer.len() >= BATCH_SIZE
        };
        if should_flush {
            self.flush().await;
        }

        self.publish(&event).await;
    }

    async fn publish(&self, event: &SyslogEvent) {
        let payload = match serde_json::to_vec(&event.to_json()) {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize syslog event for publish");
                return;
            }
        };
        if let Err(e) = self.bus.publish_syslog_event(payload.clone()).await {
            tracing::error!(error = %e, "failed to publish syslog event");
        }
        if event.is_alertable() {
            if let Err(e) = self.bus.publish_syslog_alert(event.severity, payload).await {
                tracing::error!(error = %e, "failed to publish syslog alert");
            }
        }
    }

    pub async fn flush(&self) {
        let events: Vec<SyslogEvent> = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            buffer.drain(..).collect()
        };

        match self.flush_events(&events).await {
            Ok(()) => tracing::debug!(count = events.len(), "flushed syslog events"),
            Err(e) => {
                tracing::error!(error = %e, count = events.len(), "failed to flush syslog events");
                let mut buffer = self.buffer.lock().await;
                let cap = BATCH_SIZE * REQUEUE_CAP_MULTIPLIER;
                if buffer.len() < cap {
                    for event in events.into_iter().rev() {
                        buffer.push_front(event);
                    }
                } else {
                    let dropped = events.len() as u64;
                    let total_dropped = self.dropped_events.fetch_add(dropped, Ordering::Relaxed) + dropped;
                    tracing::warn!(
                        dropped,
                        total_dropped,
                        buffer_len = buffer.len(),
                        cap,
                        "syslog buffer at capacity, dropping events that failed to flush"
                    );
                }
            }
        }
    }

    async fn flush_events(&self, events: &[SyslogEvent]) -> Result<(), crate::error::DbError> {
        use std::collections::BTreeMap;
        let mut source_ids: BTreeMap<String, uuid::Uuid> = BTreeMap::new();

        for event in events {
            let ip = event.source_ip.to_string();
            if source_ids.contains_key(&ip) {
                continue;
            }
            let source_id = self
                .db
                .get_or_create_source(&ip, event.hostname.as_deref(), event.device_type)
                .await?;
            source_ids.insert(ip, source_id);
        }

        // Sequential awaits over a pooled connection rather than a single batch insert;
        // deadpool-postgres has no direct COPY/batch helper, so each row goes individually.
        for event in events {
            insert_event(&self.db, event, source_ids.get(&event.source_ip.to_string()).copied()).await?;
        }

        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for event in events {
            *counts.entry(event.source_ip.to_string()).or_insert(0) += 1;
        }
        for (ip, count) in counts {
            if let Some(&source_id) = source_ids.get(&ip) {
                self.db.bump_source_stats(source_id, count).await?;
            }
        }

        Ok(())
    }

    async fn manage_buffer_size(&self) {
        let settings = match self.db.read_buffer_settings().await {
            Ok(Some(s)) => s,
            Ok(None) => return,
            Err(e) => {
                tracing::error!(error = %e, "failed to read buffer settings");
                return;
            }
        };

        let current_size = match self.db.current_events_table_size().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "failed to compute events table size");
                return;
            }
        };

        if let Err(e) = self.db.record_buffer_size(current_size).await {
            tracing::error!(error = %e, "failed to record buffer size");
        }

        let threshold_bytes =
            (settings.max_size_bytes as f64) * (settings.cleanup_threshold_percent as f64) / 100.0;

        if (current_size as f64) > threshold_bytes {
            tracing::warn!(
                current_size_gb = current_size as f64 / 1_073_741_824.0,
                threshold_gb = threshold_bytes / 1_073_741_824.0,
                "syslog buffer threshold exceeded, cleaning up"
            );
            match self.db.cleanup_old_events(settings.retention_days).await {
                Ok(deleted) => tracing::info!(deleted, "syslog buffer cleanup completed"),
                Err(e) => tracing::error!(error = %e, "syslog buffer cleanup failed"),
            }
        }
    }
}

async fn insert_event(
    db: &SyslogRepo,
    event: &SyslogEvent,
    _source_id: Option<uuid::Uuid>,
) -> Result<(), crate::error::DbError> {
    // Delegated through SyslogRepo's connection pool; kept as a free function so the per-row
    // insert statement lives next to the batch orchestration that calls it.
    db.insert_event(event).await
}
