//! NATS bus client: subjects, the `NPM_METRICS` JetStream stream, and durable pull consumers.
//!
//! `npm.metrics.*`/`npm.devices.status`/`npm.interfaces.status`/`npm.poll.request` are
//! JetStream-published and flow through the `NPM_METRICS` stream; `syslog.events`,
//! `syslog.alerts.*`, and `shared.alerts.npm` are plain core-NATS publishes, never durable.

use std::time::Duration;

use async_nats::jetstream::{self, consumer::pull::Config as PullConfig, stream::Config as StreamConfig};
use async_nats::Client;

use crate::error::BusError;

pub const SUBJECT_SYSLOG_EVENTS: &str = "syslog.events";
pub const SUBJECT_DEVICE_STATUS: &str = "npm.devices.status";
pub const SUBJECT_INTERFACE_STATUS: &str = "npm.interfaces.status";
pub const SUBJECT_POLL_REQUEST: &str = "npm.poll.request";
pub const SUBJECT_ALERT: &str = "shared.alerts.npm";

pub const STREAM_NAME: &str = "NPM_METRICS";
pub const CONSUMER_POLL_WORKER: &str = "npm-poll-worker";
pub const CONSUMER_STATUS_HANDLER: &str = "npm-status-handler";

pub fn syslog_alert_subject(severity: u8) -> String {
    format!("syslog.alerts.{severity}")
}

pub fn metrics_subject(metric_type: &str) -> String {
    format!("npm.metrics.{metric_type}")
}

/// A connected bus client wrapping both the core NATS connection and its JetStream context.
pub struct BusClient {
    client: Client,
    js: jetstream::Context,
}

impl BusClient {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Connect(e.to_string()))?;
        let js = jetstream::new(client.clone());
        Ok(BusClient { client, js })
    }

    /// Idempotently ensures the `NPM_METRICS` stream and its two durable pull consumers exist.
    /// Syslog subjects are plain core-NATS (see `publish_syslog_event`/`publish_syslog_alert`)
    /// and are never part of this stream's subject list.
    pub async fn ensure_topology(&self) -> Result<(), BusError> {
        let stream_config = StreamConfig {
            name: STREAM_NAME.to_string(),
            subjects: vec![
                "npm.metrics.>".to_string(),
                SUBJECT_DEVICE_STATUS.to_string(),
                SUBJECT_INTERFACE_STATUS.to_string(),
                SUBJECT_POLL_REQUEST.to_string(),
            ],
            retention: jetstream::stream::RetentionPolicy::Limits,
            max_messages: 1_000_000,
            max_bytes: 2 * 1024 * 1024 * 1024,
            max_age: Duration::from_secs(3600),
            ..Default::default()
        };

        let stream = self
            .js
            .get_or_create_stream(stream_config)
            .await
            .map_err(|e| BusError::Stream(e.to_string()))?;

        for (name, filter_subject) in [
            (CONSUMER_POLL_WORKER, SUBJECT_POLL_REQUEST),
            (CONSUMER_STATUS_HANDLER, SUBJECT_DEVICE_STATUS),
        ] {
            let consumer_config = PullConfig {
                durable_name: Some(name.to_string()),
                filter_subject: filter_subject.to_string(),
                deliver_policy: jetstream::consumer::DeliverPolicy::All,
                ack_policy: jetstream::consumer::AckPolicy::Explicit,
                max_deliver: 3,
                ack_wait: Duration::from_secs(60),
                ..Default::default()
            };
            stream
                .get_or_create_consumer(name, consumer_config)
                .await
                .map_err(|e| BusError::Stream(e.to_string()))?;
        }

        Ok(())
    }

    pub async fn publish_metrics(&self, metric_type: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.js
            .publish(metrics_subject(metric_type), payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }

    /// Plain core-NATS publish, matching the Python collector's `self.nats.publish(...)` — syslog
    /// events are never routed through JetStream.
    pub async fn publish_syslog_event(&self, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(SUBJECT_SYSLOG_EVENTS, payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }

    pub async fn publish_syslog_alert(&self, severity: u8, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(syslog_alert_subject(severity), payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }

    pub async fn publish_device_status(&self, payload: Vec<u8>) -> Result<(), BusError> {
        self.js
            .publish(SUBJECT_DEVICE_STATUS, payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }

    /// `shared.alerts.npm` uses plain core-NATS publish, not JetStream — matching the Python's
    /// `self.nc.publish` (vs `js.publish`) for this one subject.
    pub async fn publish_alert(&self, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .publish(SUBJECT_ALERT, payload.into())
            .await
            .map_err(|e| BusError::Publish(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syslog_alert_subject_embeds_severity() {
        assert_eq!(syslog_alert_subject(3), "syslog.alerts.3");
    }

    #[test]
    fn metrics_subject_embeds_type() {
        assert_eq!(metrics_subject("device"), "npm.metrics.device");
    }
}
