//! Prometheus line-protocol formatting and push client for the metrics sink.
//!
//! Ports `push_device_metrics`/`push_interface_metrics` from the original Python
//! `apps/npm/src/npm/services/metrics.py`: same metric names, same label sets, same
//! unix-millis timestamp convention, same "log and swallow" failure policy.

use uuid::Uuid;

use crate::device::{DeviceMetrics, InterfaceMetrics};

const INGEST_PATH: &str = "/api/v1/import/prometheus";
const PUSH_TIMEOUT_SECS: u64 = 30;

/// Escapes a label value per the Prometheus exposition format (backslash, quote, newline).
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn line(metric: &str, labels: &[(&str, &str)], value: f64, timestamp_ms: i64) -> String {
    let label_str = labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{}\"", escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!("{metric}{{{label_str}}} {value} {timestamp_ms}\n")
}

/// Formats one device's scalar metrics as Prometheus exposition lines.
pub fn format_device_metrics(device_name: &str, m: &DeviceMetrics) -> String {
    let device_id = m.device_id.to_string();
    let labels: Vec<(&str, &str)> = vec![("device_id", &device_id), ("device_name", device_name)];
    let ts = m.timestamp.timestamp_millis();

    let mut out = String::new();
    if let Some(cpu) = m.cpu_utilization {
        out.push_str(&line("npm_device_cpu_utilization", &labels, cpu, ts));
    }
    if let Some(mem) = m.memory_utilization_pct {
        out.push_str(&line("npm_device_memory_utilization", &labels, mem, ts));
    }
    if let Some(uptime) = m.uptime_seconds {
        out.push_str(&line("npm_device_uptime_seconds", &labels, uptime as f64, ts));
    }
    out.push_str(&line("npm_device_interfaces_total", &labels, m.interface_count as f64, ts));
    out.push_str(&line("npm_device_interfaces_up", &labels, m.interfaces_up as f64, ts));
    out.push_str(&line("npm_device_interfaces_down", &labels, m.interfaces_down as f64, ts));
    out
}

/// Formats one interface's metrics as Prometheus exposition lines.
pub fn format_interface_metrics(
    device_id: Uuid,
    device_name: &str,
    interface_name: &str,
    m: &InterfaceMetrics,
) -> String {
    let device_id_str = device_id.to_string();
    let interface_id = format!("{device_id}:{}", m.if_index);
    let labels: Vec<(&str, &str)> = vec![
        ("interface_id", &interface_id),
        ("device_id", &device_id_str),
        ("interface_name", interface_name),
    ];
    let _ = device_name;
    let ts = m.timestamp.timestamp_millis();

    let mut out = String::new();
    if let Some(v) = m.in_octets {
        out.push_str(&line("npm_interface_in_octets", &labels, v as f64, ts));
    }
    if let Some(v) = m.out_octets {
        out.push_str(&line("npm_interface_out_octets", &labels, v as f64, ts));
    }
    if let Some(v) = m.in_errors {
        out.push_str(&line("npm_interface_in_errors", &labels, v as f64, ts));
    }
    if let Some(v) = m.out_errors {
        out.push_str(&line("npm_interface_out_errors", &labels, v as f64, ts));
    }
    if let (Some(in_octets), Some(speed)) = (m.in_octets, m.speed_mbps) {
        if speed > 0 {
            let bits_per_sec_capacity = speed as f64 * 1_000_000.0;
            let util = (in_octets as f64 * 8.0) / bits_per_sec_capacity * 100.0;
            out.push_str(&line("npm_interface_in_utilization", &labels, util, ts));
        }
    }
    if let (Some(out_octets), Some(speed)) = (m.out_octets, m.speed_mbps) {
        if speed > 0 {
            let bits_per_sec_capacity = speed as f64 * 1_000_000.0;
            let util = (out_octets as f64 * 8.0) / bits_per_sec_capacity * 100.0;
            out.push_str(&line("npm_interface_out_utilization", &labels, util, ts));
        }
    }
    out
}

/// Pushes pre-formatted Prometheus exposition text to a VictoriaMetrics-compatible ingest
/// endpoint. Failures are logged at `warn` and swallowed — a missed push is superseded by the
/// next poll cycle, per the persistence failure taxonomy.
pub async fn push(client: &reqwest::Client, base_url: &str, body: String) {
    if body.is_empty() {
        return;
    }
    let url = format!("{}{}", base_url.trim_end_matches('/'), INGEST_PATH);
    let result = client
        .post(&url)
        .header("Content-Type", "text/plain")
        .timeout(std::time::Duration::from_secs(PUSH_TIMEOUT_SECS))
        .body(body)
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {}
        Ok(resp) => {
            tracing::warn!(status = %resp.status(), url = %url, "metrics push rejected");
        }
        Err(e) => {
            tracing::warn!(error = %e, url = %url, "metrics push failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn formats_device_metrics_with_labels_and_timestamp() {
        let mut m = DeviceMetrics::new(Uuid::nil(), Utc::now());
        m.cpu_utilization = Some(42.0);
        m.memory_utilization_pct = Some(20.0);
        m.uptime_seconds = Some(3600);
        m.interface_count = 1;
        m.interfaces_up = 1;

        let out = format_device_metrics("router1", &m);
        assert!(out.contains("npm_device_cpu_utilization{"));
        assert!(out.contains("device_name=\"router1\""));
        assert!(out.contains("42"));
    }

    #[test]
    fn skips_absent_scalar_metrics() {
        let m = DeviceMetrics::new(Uuid::nil(), Utc::now());
        let out = format_device_metrics("router1", &m);
        assert!(!out.contains("npm_device_cpu_utilization"));
        assert!(out.contains("npm_device_interfaces_total"));
    }

    #[test]
    fn escapes_label_values() {
        assert_eq!(escape_label("a\"b"), "a\\\"b");
        assert_eq!(escape_label("line\nbreak"), "line\\nbreak");
    }
}
