//! Repositories over the contractual relational schema (spec §6): `npm.*`, `syslog.*`, `stig.*`.
//!
//! `tokio-postgres` + `deadpool-postgres` rather than a synchronous Postgres client, since every
//! daemon here is async end-to-end.

use chrono::{DateTime, Utc};
use deadpool_postgres::{Config, Pool, Runtime};
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::device::{Device, DeviceMetrics, InterfaceDimension, InterfaceMetrics, LinkStatus, Snmpv3Credential};
use crate::error::DbError;

pub fn build_pool(database_url: &str, pool_size: usize) -> Result<Pool, DbError> {
    let mut cfg = Config::new();
    cfg.url = Some(database_url.to_string());
    cfg.pool = Some(deadpool_postgres::PoolConfig::new(pool_size));
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| DbError::Pool(e.to_string()))
}

fn link_status_str(s: LinkStatus) -> &'static str {
    match s {
        LinkStatus::Up => "up",
        LinkStatus::Down => "down",
        LinkStatus::Unknown => "unknown",
    }
}

fn link_status_from_str(s: &str) -> LinkStatus {
    match s {
        "up" => LinkStatus::Up,
        "down" => LinkStatus::Down,
        _ => LinkStatus::Unknown,
    }
}

/// `npm.devices`, `npm.snmpv3_credentials`, `npm.interfaces`.
pub struct DeviceRepo {
    pool: Pool,
}

impl DeviceRepo {
    pub fn new(pool: Pool) -> Self {
        DeviceRepo { pool }
    }

    /// Up to `limit` active devices ordered by `last_poll` ascending, nulls first — new devices
    /// are polled before ones with a recent poll (spec §4.1).
    pub async fn fetch_poll_batch(&self, limit: i64) -> Result<Vec<Device>, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let rows = conn
            .query(
                "SELECT id, name, ip_address, vendor, snmp_port, poll_icmp, poll_snmp, \
                 is_active, credential_id, last_poll, last_icmp_poll, last_snmp_poll, \
                 status, icmp_status, snmp_status \
                 FROM npm.devices \
                 WHERE is_active = true \
                 ORDER BY last_poll ASC NULLS FIRST \
                 LIMIT $1",
                &[&limit],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(rows
            .iter()
            .map(|row| Device {
                id: row.get("id"),
                name: row.get("name"),
                ip_address: row.get("ip_address"),
                vendor: crate::vendor::VendorKind::normalize(row.get("vendor")),
                snmp_port: row.get::<_, i32>("snmp_port") as u16,
                poll_icmp: row.get("poll_icmp"),
                poll_snmp: row.get("poll_snmp"),
                is_active: row.get("is_active"),
                credential_id: row.get("credential_id"),
                last_poll: row.get("last_poll"),
                last_icmp_poll: row.get("last_icmp_poll"),
                last_snmp_poll: row.get("last_snmp_poll"),
                status: link_status_from_str(row.get("status")),
                icmp_status: link_status_from_str(row.get("icmp_status")),
                snmp_status: link_status_from_str(row.get("snmp_status")),
            })
            .collect())
    }

    pub async fn get_credential(&self, id: Uuid) -> Result<Option<Snmpv3Credential>, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let row = conn
            .query_opt(
                "SELECT id, username, security_level, auth_protocol, priv_protocol, \
                 context_name, auth_password_encrypted, priv_password_encrypted \
                 FROM npm.snmpv3_credentials WHERE id = $1",
                &[&id],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(row.map(|row| Snmpv3Credential {
            id: row.get("id"),
            username: row.get("username"),
            security_level: serde_json::from_value(row.get::<_, serde_json::Value>("security_level"))
                .unwrap_or(crate::device::SecurityLevel::NoAuthNoPriv),
            auth_protocol: serde_json::from_value(row.get::<_, serde_json::Value>("auth_protocol"))
                .unwrap_or(crate::device::AuthProtocol::None),
            priv_protocol: serde_json::from_value(row.get::<_, serde_json::Value>("priv_protocol"))
                .unwrap_or(crate::device::PrivProtocol::None),
            context_name: row.get("context_name"),
            auth_password_encrypted: row.get("auth_password_encrypted"),
            priv_password_encrypted: row.get("priv_password_encrypted"),
        }))
    }

    pub async fn update_device_status(
        &self,
        device_id: Uuid,
        status: LinkStatus,
        icmp_status: LinkStatus,
        snmp_status: LinkStatus,
        polled_icmp: bool,
        polled_snmp: bool,
        now: DateTime<Utc>,
    ) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "UPDATE npm.devices SET status = $1, icmp_status = $2, snmp_status = $3, \
             last_poll = $4, \
             last_icmp_poll = CASE WHEN $5 THEN $4 ELSE last_icmp_poll END, \
             last_snmp_poll = CASE WHEN $6 THEN $4 ELSE last_snmp_poll END \
             WHERE id = $7",
            &[
                &link_status_str(status),
                &link_status_str(icmp_status),
                &link_status_str(snmp_status),
                &now,
                &polled_icmp,
                &polled_snmp,
                &device_id,
            ],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Upserts an interface's dimension row by `(device_id, if_index)`.
    pub async fn upsert_interface(&self, dim: &InterfaceDimension) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "INSERT INTO npm.interfaces (device_id, if_index, name, speed_mbps, admin_status, \
             oper_status, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (device_id, if_index) DO UPDATE SET \
             name = EXCLUDED.name, speed_mbps = EXCLUDED.speed_mbps, \
             admin_status = EXCLUDED.admin_status, oper_status = EXCLUDED.oper_status, \
             updated_at = EXCLUDED.updated_at",
            &[
                &dim.device_id,
                &dim.if_index,
                &dim.name,
                &dim.speed_mbps.map(|v| v as i64),
                &link_status_str(dim.admin_status),
                &link_status_str(dim.oper_status),
                &dim.updated_at,
            ],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

/// `npm.device_metrics`, `npm.interface_metrics`.
pub struct MetricsRepo {
    pool: Pool,
}

impl MetricsRepo {
    pub fn new(pool: Pool) -> Self {
        MetricsRepo { pool }
    }

    pub async fn insert_device_metrics(&self, m: &DeviceMetrics) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let services_json = serde_json::to_value(&m.services_status).unwrap_or(serde_json::Value::Null);
        conn.execute(
            "INSERT INTO npm.device_metrics ( \
                device_id, timestamp, icmp_reachable, icmp_latency_ms, icmp_packet_loss_pct, \
                cpu_utilization, memory_utilization_pct, memory_total_bytes, memory_used_bytes, \
                disk_utilization_pct, disk_total_bytes, disk_used_bytes, swap_utilization_pct, \
                swap_total_bytes, swap_used_bytes, uptime_seconds, interface_count, \
                interfaces_up, interfaces_down, total_in_octets, total_out_octets, \
                total_in_errors, total_out_errors, services_status, is_available \
             ) VALUES ( \
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                $18, $19, $20, $21, $22, $23, $24, $25)",
            &[
                &m.device_id,
                &m.timestamp,
                &m.icmp_reachable,
                &m.icmp_latency_ms,
                &m.icmp_packet_loss_pct,
                &m.cpu_utilization,
                &m.memory_utilization_pct,
                &m.memory_total_bytes.map(|v| v as i64),
                &m.memory_used_bytes.map(|v| v as i64),
                &m.disk_utilization_pct,
                &m.disk_total_bytes.map(|v| v as i64),
                &m.disk_used_bytes.map(|v| v as i64),
                &m.swap_utilization_pct,
                &m.swap_total_bytes.map(|v| v as i64),
                &m.swap_used_bytes.map(|v| v as i64),
                &m.uptime_seconds.map(|v| v as i64),
                &(m.interface_count as i32),
                &(m.interfaces_up as i32),
                &(m.interfaces_down as i32),
                &(m.total_in_octets as i64),
                &(m.total_out_octets as i64),
                &(m.total_in_errors as i64),
                &(m.total_out_errors as i64),
                &services_json,
                &m.is_available,
            ],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn insert_interface_metrics(&self, m: &InterfaceMetrics) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "INSERT INTO npm.interface_metrics ( \
                device_id, if_index, timestamp, admin_status, oper_status, in_octets, \
                out_octets, in_errors, out_errors, in_discards, out_discards, speed_mbps \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
            &[
                &m.device_id,
                &m.if_index,
                &m.timestamp,
                &link_status_str(m.admin_status),
                &link_status_str(m.oper_status),
                &m.in_octets.map(|v| v as i64),
                &m.out_octets.map(|v| v as i64),
                &m.in_errors.map(|v| v as i64),
                &m.out_errors.map(|v| v as i64),
                &m.in_discards.map(|v| v as i64),
                &m.out_discards.map(|v| v as i64),
                &m.speed_mbps.map(|v| v as i64),
            ],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}

/// `syslog.sources`, `syslog.events`, `syslog.buffer_settings`.
pub struct SyslogRepo {
    pool: Pool,
}

pub struct BufferSettings {
    pub max_size_bytes: i64,
    pub cleanup_threshold_percent: i32,
    pub retention_days: i32,
}

impl SyslogRepo {
    pub fn new(pool: Pool) -> Self {
        SyslogRepo { pool }
    }

    /// Finds the source row for `ip`, creating one (hostname falling back to the IP) if absent.
    pub async fn get_or_create_source(
        &self,
        ip: &str,
        hostname: Option<&str>,
        device_type: Option<&str>,
    ) -> Result<Uuid, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        if let Some(row) = conn
            .query_opt("SELECT id FROM syslog.sources WHERE ip_address = $1::inet", &[&ip])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?
        {
            return Ok(row.get("id"));
        }

        let name = hostname.unwrap_or(ip);
        let row = conn
            .query_one(
                "INSERT INTO syslog.sources (name, ip_address, hostname, device_type) \
                 VALUES ($1, $2::inet, $3, $4) \
                 ON CONFLICT (ip_address) DO UPDATE SET updated_at = NOW() \
                 RETURNING id",
                &[&name, &ip, &hostname, &device_type],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(row.get("id"))
    }

    pub async fn bump_source_stats(&self, source_id: Uuid, count: i64) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "UPDATE syslog.sources SET events_received = events_received + $1, \
             last_event_at = NOW() WHERE id = $2",
            &[&count, &source_id],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn read_buffer_settings(&self) -> Result<Option<BufferSettings>, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let row = conn
            .query_opt(
                "SELECT max_size_bytes, cleanup_threshold_percent, retention_days \
                 FROM syslog.buffer_settings WHERE id = 1",
                &[],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(row.map(|row| BufferSettings {
            max_size_bytes: row.get("max_size_bytes"),
            cleanup_threshold_percent: row.get("cleanup_threshold_percent"),
            retention_days: row.get("retention_days"),
        }))
    }

    pub async fn current_events_table_size(&self) -> Result<i64, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let row = conn
            .query_one("SELECT pg_total_relation_size('syslog.events') AS size", &[])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(row.get("size"))
    }

    pub async fn record_buffer_size(&self, current_size_bytes: i64) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "UPDATE syslog.buffer_settings SET current_size_bytes = $1, updated_at = NOW() \
             WHERE id = 1",
            &[&current_size_bytes],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Inserts one ingested event row into `syslog.events`.
    pub async fn insert_event(&self, event: &crate::syslog::SyslogEvent) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let structured_data = serde_json::to_value(&event.structured_data).unwrap_or(serde_json::Value::Null);
        let source_ip = event.source_ip.to_string();
        conn.execute(
            "INSERT INTO syslog.events ( \
                id, source_ip, received_at, facility, severity, version, event_timestamp, \
                hostname, app_name, proc_id, msg_id, structured_data, message, device_type, \
                event_type, raw_message \
             ) VALUES ($1, $2::inet, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            &[
                &event.id,
                &source_ip,
                &event.received_at,
                &(event.facility as i16),
                &(event.severity as i16),
                &(event.version as i32),
                &event.timestamp,
                &event.hostname,
                &event.app_name,
                &event.proc_id,
                &event.msg_id,
                &structured_data,
                &event.message,
                &event.device_type,
                &event.event_type,
                &event.raw_message,
            ],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    /// Deletes rows older than `retention_days` OR the oldest 100,000 rows (union, per spec
    /// §4.3), then stamps `last_cleanup_at`.
    pub async fn cleanup_old_events(&self, retention_days: i32) -> Result<u64, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let deleted = conn
            .execute(
                "DELETE FROM syslog.events \
                 WHERE received_at < NOW() - ($1 || ' days')::interval \
                 OR id IN ( \
                    SELECT id FROM syslog.events ORDER BY received_at ASC LIMIT 100000 \
                 )",
                &[&retention_days.to_string()],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;

        conn.execute(
            "UPDATE syslog.buffer_settings SET last_cleanup_at = NOW() WHERE id = 1",
            &[],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(deleted)
    }
}

/// `stig.targets`, `stig.audit_jobs`, `stig.audit_results`, `stig.definitions`.
pub struct StigRepo {
    pool: Pool,
}

impl StigRepo {
    pub fn new(pool: Pool) -> Self {
        StigRepo { pool }
    }

    /// Finds or registers a `stig.targets` row by name, so repeat `npm-stigctl evaluate` runs
    /// against the same config path accumulate audit history under one target instead of
    /// fanning out duplicate rows.
    pub async fn get_or_create_target(
        &self,
        name: &str,
        ip_address: &str,
        platform: &str,
        connection_type: &str,
    ) -> Result<Uuid, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        if let Some(row) = conn
            .query_opt("SELECT id FROM stig.targets WHERE name = $1", &[&name])
            .await
            .map_err(|e| DbError::Query(e.to_string()))?
        {
            return Ok(row.get("id"));
        }

        let row = conn
            .query_one(
                "INSERT INTO stig.targets (name, ip_address, platform, connection_type, is_active) \
                 VALUES ($1, $2, $3, $4, true) \
                 ON CONFLICT (name) DO UPDATE SET updated_at = NOW() \
                 RETURNING id",
                &[&name, &ip_address, &platform, &connection_type],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(row.get("id"))
    }

    pub async fn record_audit_job(&self, target_id: Uuid, started_at: DateTime<Utc>) -> Result<Uuid, DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        let row = conn
            .query_one(
                "INSERT INTO stig.audit_jobs (target_id, started_at, status) \
                 VALUES ($1, $2, 'running') RETURNING id",
                &[&target_id, &started_at],
            )
            .await
            .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(row.get("id"))
    }

    pub async fn record_audit_result(
        &self,
        job_id: Uuid,
        rule_id: &str,
        outcome: &str,
        finding: &str,
    ) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "INSERT INTO stig.audit_results (job_id, rule_id, outcome, finding) \
             VALUES ($1, $2, $3, $4)",
            &[&job_id, &rule_id, &outcome, &finding],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }

    pub async fn complete_audit_job(&self, job_id: Uuid, completed_at: DateTime<Utc>) -> Result<(), DbError> {
        let conn = self.pool.get().await.map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            "UPDATE stig.audit_jobs SET status = 'completed', completed_at = $1 WHERE id = $2",
            &[&completed_at, &job_id],
        )
        .await
        .map_err(|e| DbError::Query(e.to_string()))?;
        Ok(())
    }
}
