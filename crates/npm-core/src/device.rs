//! The relational data model: devices, SNMPv3 credentials, and metric rows.
//!
//! Optional fields are `Option<T>`, never a stringly-typed map — every record crossing a
//! component boundary is a named struct with explicit fields.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::vendor::VendorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SecurityLevel {
    NoAuthNoPriv,
    AuthNoPriv,
    AuthPriv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthProtocol {
    Sha,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrivProtocol {
    Aes128,
    Aes192,
    Aes256,
    None,
}

/// An SNMPv3 USM credential. Auth/priv passwords are stored encrypted at rest and decrypted
/// only immediately before constructing a session (`crypto::decrypt`); plaintext is never
/// logged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snmpv3Credential {
    pub id: Uuid,
    pub username: String,
    pub security_level: SecurityLevel,
    pub auth_protocol: AuthProtocol,
    pub priv_protocol: PrivProtocol,
    pub context_name: Option<String>,
    /// `iv_hex:tag_hex:ciphertext_hex`, see `crypto`.
    pub auth_password_encrypted: Option<String>,
    pub priv_password_encrypted: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub name: String,
    pub ip_address: String,
    pub vendor: VendorKind,
    pub snmp_port: u16,
    pub poll_icmp: bool,
    pub poll_snmp: bool,
    pub is_active: bool,
    pub credential_id: Option<Uuid>,
    pub last_poll: Option<DateTime<Utc>>,
    pub last_icmp_poll: Option<DateTime<Utc>>,
    pub last_snmp_poll: Option<DateTime<Utc>>,
    pub status: LinkStatus,
    pub icmp_status: LinkStatus,
    pub snmp_status: LinkStatus,
}

impl Default for Device {
    fn default() -> Self {
        Device {
            id: Uuid::nil(),
            name: String::new(),
            ip_address: String::new(),
            vendor: VendorKind::Generic,
            snmp_port: 161,
            poll_icmp: true,
            poll_snmp: true,
            is_active: true,
            credential_id: None,
            last_poll: None,
            last_icmp_poll: None,
            last_snmp_poll: None,
            status: LinkStatus::Unknown,
            icmp_status: LinkStatus::Unknown,
            snmp_status: LinkStatus::Unknown,
        }
    }
}

/// One point-in-time poll result for a device. Append-only: a new row is inserted on every
/// successful poll, never updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceMetrics {
    pub device_id: Uuid,
    pub timestamp: DateTime<Utc>,

    pub icmp_reachable: Option<bool>,
    pub icmp_latency_ms: Option<f64>,
    pub icmp_packet_loss_pct: Option<f64>,

    pub cpu_utilization: Option<f64>,
    pub memory_utilization_pct: Option<f64>,
    pub memory_total_bytes: Option<u64>,
    pub memory_used_bytes: Option<u64>,
    pub disk_utilization_pct: Option<f64>,
    pub disk_total_bytes: Option<u64>,
    pub disk_used_bytes: Option<u64>,
    pub swap_utilization_pct: Option<f64>,
    pub swap_total_bytes: Option<u64>,
    pub swap_used_bytes: Option<u64>,
    pub uptime_seconds: Option<u64>,

    pub interface_count: u32,
    pub interfaces_up: u32,
    pub interfaces_down: u32,
    pub total_in_octets: u64,
    pub total_out_octets: u64,
    pub total_in_errors: u64,
    pub total_out_errors: u64,

    /// Vendor-specific service-name -> up/down (currently populated for `sophos`).
    pub services_status: BTreeMap<String, bool>,

    pub is_available: bool,
}

impl DeviceMetrics {
    pub fn new(device_id: Uuid, timestamp: DateTime<Utc>) -> Self {
        DeviceMetrics {
            device_id,
            timestamp,
            icmp_reachable: None,
            icmp_latency_ms: None,
            icmp_packet_loss_pct: None,
            cpu_utilization: None,
            memory_utilization_pct: None,
            memory_total_bytes: None,
            memory_used_bytes: None,
            disk_utilization_pct: None,
            disk_total_bytes: None,
            disk_used_bytes: None,
            swap_utilization_pct: None,
            swap_total_bytes: None,
            swap_used_bytes: None,
            uptime_seconds: None,
            interface_count: 0,
            interfaces_up: 0,
            interfaces_down: 0,
            total_in_octets: 0,
            total_out_octets: 0,
            total_in_errors: 0,
            total_out_errors: 0,
            services_status: BTreeMap::new(),
            is_available: false,
        }
    }

    /// `is_available = icmp_reachable || uptime_seconds > 0` (spec §4.2 availability rule).
    pub fn recompute_availability(&mut self) {
        let icmp_up = self.icmp_reachable.unwrap_or(false);
        let snmp_up = self.uptime_seconds.unwrap_or(0) > 0;
        self.is_available = icmp_up || snmp_up;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMetrics {
    pub device_id: Uuid,
    pub if_index: i64,
    pub timestamp: DateTime<Utc>,
    pub admin_status: LinkStatus,
    pub oper_status: LinkStatus,
    pub in_octets: Option<u64>,
    pub out_octets: Option<u64>,
    pub in_errors: Option<u64>,
    pub out_errors: Option<u64>,
    pub in_discards: Option<u64>,
    pub out_discards: Option<u64>,
    pub speed_mbps: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDimension {
    pub device_id: Uuid,
    pub if_index: i64,
    pub name: String,
    pub speed_mbps: Option<u64>,
    pub admin_status: LinkStatus,
    pub oper_status: LinkStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_true_when_icmp_reachable_even_without_snmp() {
        let mut m = DeviceMetrics::new(Uuid::nil(), Utc::now());
        m.icmp_reachable = Some(true);
        m.recompute_availability();
        assert!(m.is_available);
    }

    #[test]
    fn availability_true_when_uptime_positive_even_without_icmp() {
        let mut m = DeviceMetrics::new(Uuid::nil(), Utc::now());
        m.icmp_reachable = Some(false);
        m.uptime_seconds = Some(3600);
        m.recompute_availability();
        assert!(m.is_available);
    }

    #[test]
    fn availability_false_when_neither() {
        let mut m = DeviceMetrics::new(Uuid::nil(), Utc::now());
        m.icmp_reachable = Some(false);
        m.uptime_seconds = Some(0);
        m.recompute_availability();
        assert!(!m.is_available);
    }
}
