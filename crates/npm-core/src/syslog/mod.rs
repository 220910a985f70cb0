//! Syslog ingestion pipeline: parsing, classification (folded into `parser`), and the
//! UDP-receive/batch/flush/circular-buffer-cleanup ingestor loop.

pub mod ingestor;
pub mod parser;

use std::collections::BTreeMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use parser::ParsedSyslogMessage;

/// One ingested syslog event, ready for batch insert and NATS publish.
#[derive(Debug, Clone)]
pub struct SyslogEvent {
    pub id: Uuid,
    pub source_ip: IpAddr,
    pub received_at: DateTime<Utc>,
    pub facility: u8,
    pub severity: u8,
    pub version: u32,
    pub timestamp: Option<DateTime<Utc>>,
    pub hostname: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
    pub structured_data: Option<BTreeMap<String, BTreeMap<String, String>>>,
    pub message: String,
    pub device_type: Option<&'static str>,
    pub event_type: Option<&'static str>,
    pub raw_message: String,
}

impl SyslogEvent {
    pub fn from_parsed(source_ip: IpAddr, received_at: DateTime<Utc>, parsed: ParsedSyslogMessage) -> Self {
        SyslogEvent {
            id: Uuid::new_v4(),
            source_ip,
            received_at,
            facility: parsed.facility,
            severity: parsed.severity,
            version: parsed.version,
            timestamp: parsed.timestamp,
            hostname: parsed.hostname,
            app_name: parsed.app_name,
            proc_id: parsed.proc_id,
            msg_id: parsed.msg_id,
            structured_data: parsed.structured_data,
            message: parsed.message,
            device_type: parsed.device_type,
            event_type: parsed.event_type,
            raw_message: parsed.raw_message,
        }
    }

    /// JSON shape published to the bus — same field set as the row, with datetimes as ISO-8601
    /// (matching the Python collector's `_publish_to_nats` pre-serialization step).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "source_ip": self.source_ip.to_string(),
            "received_at": self.received_at.to_rfc3339(),
            "facility": self.facility,
            "severity": self.severity,
            "version": self.version,
            "timestamp": self.timestamp.map(|t| t.to_rfc3339()),
            "hostname": self.hostname,
            "app_name": self.app_name,
            "proc_id": self.proc_id,
            "msg_id": self.msg_id,
            "structured_data": self.structured_data,
            "message": self.message,
            "device_type": self.device_type,
            "event_type": self.event_type,
            "raw_message": self.raw_message,
        })
    }

    /// Critical-and-above alerting threshold (spec §4.3 / RFC 5424 severity scale).
    pub fn is_alertable(&self) -> bool {
        self.severity <= 3
    }
}
