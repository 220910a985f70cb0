//! Per-device poll orchestration: ICMP, SNMPv3 scalar reads, interface walk, vendor-specific
//! service status, persistence, and fan-out — the exact step order of spec §4.2's responsibility
//! list (ICMP, uptime, CPU, memory, interface count, disk, interface walk, Sophos services,
//! metrics insert, status update).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use npm_core::bus::BusClient;
use npm_core::db::{DeviceRepo, MetricsRepo};
use npm_core::device::{Device, DeviceMetrics, InterfaceDimension, InterfaceMetrics, LinkStatus};
use npm_core::snmp::Snmpv3Session;
use npm_core::vendor::{self, DiskSpec, MemorySpec, VendorProfile};
use npm_core::{icmp, metrics as metrics_fmt, snmp};

/// Interface rows are capped per poll, matching the walk's own `max_rows` bound (spec §4.2:
/// "the ifTable walk is capped, never unbounded").
const MAX_INTERFACES: usize = 512;

pub struct PollContext {
    pub credential_secret: String,
    pub device_repo: Arc<DeviceRepo>,
    pub metrics_repo: Arc<MetricsRepo>,
    pub bus: Arc<BusClient>,
    pub http: reqwest::Client,
    pub victoria_url: String,
}

/// Polls one device end to end and returns the final device status, for cycle-summary logging.
pub async fn poll_device(ctx: Arc<PollContext>, device: Device) -> LinkStatus {
    let now = Utc::now();
    let mut m = DeviceMetrics::new(device.id, now);
    let mut metrics_body = String::new();

    let mut icmp_status = LinkStatus::Unknown;
    if device.poll_icmp {
        match icmp::ping(&device.ip_address).await {
            Ok(result) => {
                m.icmp_reachable = Some(result.reachable);
                m.icmp_latency_ms = result.avg_latency_ms;
                m.icmp_packet_loss_pct = Some(result.packet_loss_pct);
                icmp_status = if result.reachable { LinkStatus::Up } else { LinkStatus::Down };
            }
            Err(e) => {
                tracing::warn!(device = %device.name, error = %e, "ping subprocess failed to spawn");
            }
        }
    }

    let mut snmp_status = LinkStatus::Unknown;
    if device.poll_snmp {
        match poll_snmp(&ctx, &device, &mut m, &mut metrics_body).await {
            Ok(()) => snmp_status = LinkStatus::Up,
            Err(e) => {
                tracing::warn!(device = %device.name, error = %e, "SNMP poll failed");
                snmp_status = LinkStatus::Down;
            }
        }
    }

    m.recompute_availability();
    let status = if m.is_available { LinkStatus::Up } else { LinkStatus::Down };

    metrics_body.push_str(&metrics_fmt::format_device_metrics(&device.name, &m));

    if let Err(e) = ctx.metrics_repo.insert_device_metrics(&m).await {
        tracing::error!(device = %device.name, error = %e, "failed to persist device metrics");
    }

    if let Err(e) = ctx
        .device_repo
        .update_device_status(device.id, status, icmp_status, snmp_status, device.poll_icmp, device.poll_snmp, now)
        .await
    {
        tracing::error!(device = %device.name, error = %e, "failed to update device status");
    }

    if !metrics_body.is_empty() {
        metrics_fmt::push(&ctx.http, &ctx.victoria_url, metrics_body).await;
    }

    let payload = serde_json::json!({
        "device_id": device.id,
        "device_name": device.name,
        "status": status,
        "is_available": m.is_available,
        "timestamp": now,
    });
    if let Ok(bytes) = serde_json::to_vec(&payload) {
        if let Err(e) = ctx.bus.publish_device_status(bytes).await {
            tracing::warn!(device = %device.name, error = %e, "failed to publish device status");
        }
    }

    status
}

/// Opens an SNMPv3 session and performs the ordered scalar/table reads of spec §4.2 steps 2-7,
/// filling `m` in place. An `Err` here means the whole SNMP leg failed (no credential, decrypt
/// failure, transport error) — partial field population on an `Ok` is expected and not an error.
async fn poll_snmp(ctx: &PollContext, device: &Device, m: &mut DeviceMetrics, metrics_body: &mut String) -> Result<(), String> {
    let credential_id = device.credential_id.ok_or_else(|| "device has no assigned credential".to_string())?;
    let credential = ctx
        .device_repo
        .get_credential(credential_id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| "credential row not found".to_string())?;

    let mut session = snmp::open_session(&device.ip_address, device.snmp_port, &ctx.credential_secret, &credential)
        .await
        .map_err(|e| e.to_string())?;

    let profile = device.vendor.profile();

    // Step 2: uptime.
    if let Ok(Some(v)) = session.get(vendor::SYS_UP_TIME).await {
        if let Some(ticks) = v.as_i64() {
            m.uptime_seconds = Some((ticks / 100).max(0) as u64);
        }
    }

    // Step 3: CPU, first vendor OID that resolves to a plausible 0-100 percent.
    for oid in profile.cpu_oids {
        if let Ok(Some(v)) = session.get(oid).await {
            if let Some(n) = v.as_i64() {
                if (0..=100).contains(&n) {
                    m.cpu_utilization = Some(n as f64);
                    break;
                }
            }
        }
    }

    // Step 4: memory.
    read_memory(&mut session, profile, m).await;

    // Step 5: interface count.
    if let Ok(Some(v)) = session.get(vendor::IF_NUMBER).await {
        if let Some(n) = v.as_i64() {
            m.interface_count = n.max(0) as u32;
        }
    }

    // Step 6: disk.
    read_disk(&mut session, profile, m).await;

    // Step 7: interface table walk.
    read_interfaces(&mut session, device, m, ctx, metrics_body).await;

    // Step 8 (vendor-specific): Sophos service status table.
    if !profile.service_status_oids.is_empty() {
        let mut services = BTreeMap::new();
        for (oid, name) in profile.service_status_oids {
            if let Ok(Some(v)) = session.get(oid).await {
                let up = if let Some(n) = v.as_i64() {
                    n == 1
                } else {
                    v.as_str_lossy().map(|s| vendor::sophos_service_up(&s)).unwrap_or(false)
                };
                services.insert(name.to_string(), up);
            }
        }
        m.services_status = services;
    }

    Ok(())
}

async fn read_memory(session: &mut Snmpv3Session, profile: &VendorProfile, m: &mut DeviceMetrics) {
    match profile.memory {
        MemorySpec::UsedPercent(oid) => {
            if let Ok(Some(v)) = session.get(oid).await {
                if let Some(n) = v.as_i64() {
                    m.memory_utilization_pct = Some(n as f64);
                }
            }
        }
        MemorySpec::UsedFreePair { used, free } => {
            let used_val = session.get(used).await.ok().flatten().and_then(|v| v.as_i64());
            let free_val = session.get(free).await.ok().flatten().and_then(|v| v.as_i64());
            if let (Some(u), Some(f)) = (used_val, free_val) {
                let total = u + f;
                m.memory_total_bytes = Some(total.max(0) as u64);
                m.memory_used_bytes = Some(u.max(0) as u64);
                if total > 0 {
                    m.memory_utilization_pct = Some(u as f64 / total as f64 * 100.0);
                }
            }
        }
        MemorySpec::TotalKib(oid) => {
            if let Ok(Some(v)) = session.get(oid).await {
                if let Some(kib) = v.as_i64() {
                    m.memory_total_bytes = Some((kib.max(0) as u64) * 1024);
                }
            }
        }
    }
}

async fn read_disk(session: &mut Snmpv3Session, profile: &VendorProfile, m: &mut DeviceMetrics) {
    match profile.disk {
        DiskSpec::PercentAndCapacityMib { percent, capacity_mib } => {
            if let Ok(Some(v)) = session.get(percent).await {
                if let Some(n) = v.as_i64() {
                    m.disk_utilization_pct = Some(n as f64);
                }
            }
            if let Ok(Some(v)) = session.get(capacity_mib).await {
                if let Some(mib) = v.as_i64() {
                    m.disk_total_bytes = Some((mib.max(0) as u64) * 1024 * 1024);
                }
            }
        }
        DiskSpec::GenericHrStorageTable => {
            let descrs = session.walk(vendor::HR_STORAGE_DESCR, MAX_INTERFACES).await.unwrap_or_default();
            let Some((first_oid, _descr)) = descrs
                .into_iter()
                .find(|(_, v)| v.as_str_lossy().map(|s| s.to_lowercase().contains('/') || s.to_lowercase().contains("disk")).unwrap_or(false))
            else {
                return;
            };
            let Some(index) = first_oid.rsplit('.').next() else { return };

            let alloc_units = session.get(&format!("{}.{}", vendor::HR_STORAGE_ALLOC_UNITS, index)).await.ok().flatten().and_then(|v| v.as_i64());
            let size = session.get(&format!("{}.{}", vendor::HR_STORAGE_SIZE, index)).await.ok().flatten().and_then(|v| v.as_i64());
            let used = session.get(&format!("{}.{}", vendor::HR_STORAGE_USED, index)).await.ok().flatten().and_then(|v| v.as_i64());

            if let (Some(units), Some(size), Some(used)) = (alloc_units, size, used) {
                let total_bytes = (size.max(0) as u64) * (units.max(0) as u64);
                let used_bytes = (used.max(0) as u64) * (units.max(0) as u64);
                m.disk_total_bytes = Some(total_bytes);
                m.disk_used_bytes = Some(used_bytes);
                if total_bytes > 0 {
                    m.disk_utilization_pct = Some(used_bytes as f64 / total_bytes as f64 * 100.0);
                }
            }
        }
    }
}

async fn read_interfaces(
    session: &mut Snmpv3Session,
    device: &Device,
    m: &mut DeviceMetrics,
    ctx: &PollContext,
    metrics_body: &mut String,
) {
    let names = session.walk(vendor::IF_TABLE_DESCR, MAX_INTERFACES).await.unwrap_or_default();

    for (oid, name_value) in names {
        let Some(if_index) = oid.rsplit('.').next().and_then(|s| s.parse::<i64>().ok()) else { continue };
        let name = name_value.as_str_lossy().unwrap_or_default();

        let admin = get_status(session, vendor::IF_TABLE_ADMIN_STATUS, if_index).await;
        let oper = get_status(session, vendor::IF_TABLE_OPER_STATUS, if_index).await;

        // Prefer ifXTable's Mbps-scaled ifHighSpeed over legacy ifSpeed÷1e6.
        let speed = match get_scalar(session, vendor::IFX_TABLE_HIGH_SPEED, if_index).await {
            Some(mbps) => Some(mbps.max(0) as u64),
            None => get_scalar(session, vendor::IF_TABLE_SPEED, if_index).await.map(|bps| (bps.max(0) as u64) / 1_000_000),
        };

        // Prefer ifXTable's 64-bit ifHC*Octets over the legacy 32-bit ifTable counters.
        let in_octets = read_octets(session, vendor::IFX_TABLE_HC_IN_OCTETS, vendor::IF_TABLE_IN_OCTETS, if_index).await;
        let out_octets = read_octets(session, vendor::IFX_TABLE_HC_OUT_OCTETS, vendor::IF_TABLE_OUT_OCTETS, if_index).await;
        let in_errors = get_scalar(session, vendor::IF_TABLE_IN_ERRORS, if_index).await.map(|v| v.max(0) as u64);
        let out_errors = get_scalar(session, vendor::IF_TABLE_OUT_ERRORS, if_index).await.map(|v| v.max(0) as u64);
        let in_discards = get_scalar(session, vendor::IF_TABLE_IN_DISCARDS, if_index).await.map(|v| v.max(0) as u64);
        let out_discards = get_scalar(session, vendor::IF_TABLE_OUT_DISCARDS, if_index).await.map(|v| v.max(0) as u64);

        if matches!(oper, LinkStatus::Up) {
            m.interfaces_up += 1;
        } else {
            m.interfaces_down += 1;
        }
        m.total_in_octets += in_octets.unwrap_or(0);
        m.total_out_octets += out_octets.unwrap_or(0);
        m.total_in_errors += in_errors.unwrap_or(0);
        m.total_out_errors += out_errors.unwrap_or(0);

        let dim = InterfaceDimension {
            device_id: device.id,
            if_index,
            name: name.clone(),
            speed_mbps: speed,
            admin_status: admin,
            oper_status: oper,
            updated_at: Utc::now(),
        };
        if let Err(e) = ctx.device_repo.upsert_interface(&dim).await {
            tracing::error!(device = %device.name, if_index, error = %e, "failed to upsert interface dimension");
        }

        let im = InterfaceMetrics {
            device_id: device.id,
            if_index,
            timestamp: Utc::now(),
            admin_status: admin,
            oper_status: oper,
            in_octets,
            out_octets,
            in_errors,
            out_errors,
            in_discards,
            out_discards,
            speed_mbps: speed,
        };
        metrics_body.push_str(&metrics_fmt::format_interface_metrics(device.id, &device.name, &name, &im));

        if let Err(e) = ctx.metrics_repo.insert_interface_metrics(&im).await {
            tracing::error!(device = %device.name, if_index, error = %e, "failed to persist interface metrics");
        }
    }
}

async fn get_scalar(session: &mut Snmpv3Session, base_oid: &str, if_index: i64) -> Option<i64> {
    session.get(&format!("{base_oid}.{if_index}")).await.ok().flatten().and_then(|v| v.as_i64())
}

/// Reads a 64-bit `ifXTable` octet counter, falling back to its 32-bit `ifTable` counterpart
/// when the agent doesn't expose the HC column (spec §4.2 step 5).
async fn read_octets(session: &mut Snmpv3Session, hc_oid: &str, legacy_oid: &str, if_index: i64) -> Option<u64> {
    match get_scalar(session, hc_oid, if_index).await {
        Some(v) => Some(v.max(0) as u64),
        None => get_scalar(session, legacy_oid, if_index).await.map(|v| v.max(0) as u64),
    }
}

/// IF-MIB status columns: `1` is up, everything else (down/testing/unknown/dormant/
/// notPresent/lowerLayerDown) is treated as down for the link-status rollup.
async fn get_status(session: &mut Snmpv3Session, base_oid: &str, if_index: i64) -> LinkStatus {
    match get_scalar(session, base_oid, if_index).await {
        Some(1) => LinkStatus::Up,
        Some(_) => LinkStatus::Down,
        None => LinkStatus::Unknown,
    }
}
