//! Subprocess-based ICMP reachability check.
//!
//! Shells out to the system `ping` binary rather than raw sockets (spec §9 explicitly endorses
//! this as more portable and avoiding elevated-privilege requirements), and parses both the
//! POSIX and Windows output dialects.

use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::error::IcmpError;

const PING_COUNT: u32 = 3;
const PER_ECHO_TIMEOUT_SECS: u32 = 2;
/// Overall subprocess budget: a little more than `count * per-echo timeout` to leave room for
/// process startup and DNS resolution delays the ping binary itself doesn't bound.
const OVERALL_TIMEOUT: Duration = Duration::from_secs((PING_COUNT * PER_ECHO_TIMEOUT_SECS + 5) as u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcmpResult {
    pub reachable: bool,
    pub avg_latency_ms: Option<f64>,
    pub packet_loss_pct: f64,
}

impl IcmpResult {
    fn unreachable() -> Self {
        IcmpResult { reachable: false, avg_latency_ms: None, packet_loss_pct: 100.0 }
    }
}

/// Runs `ping -c 3 -W 2 <ip>` (POSIX) or `ping -n 3 -w 2000 <ip>` (Windows) and parses the
/// result. Never returns `Err` for an unreachable or timed-out target — only for the ping
/// binary itself failing to spawn (spec §8: "must return reachable=false... not raise").
pub async fn ping(target: &str) -> Result<IcmpResult, IcmpError> {
    let mut cmd = build_command(target);

    let output = match timeout(OVERALL_TIMEOUT, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(IcmpError::Spawn(e)),
        Err(_) => return Ok(IcmpResult::unreachable()),
    };

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_ping_output(&stdout))
}

#[cfg(unix)]
fn build_command(target: &str) -> Command {
    let mut cmd = Command::new("ping");
    cmd.args([
        "-c",
        &PING_COUNT.to_string(),
        "-W",
        &PER_ECHO_TIMEOUT_SECS.to_string(),
        target,
    ]);
    cmd
}

#[cfg(windows)]
fn build_command(target: &str) -> Command {
    let mut cmd = Command::new("ping");
    cmd.args([
        "-n",
        &PING_COUNT.to_string(),
        "-w",
        &(PER_ECHO_TIMEOUT_SECS * 1000).to_string(),
        target,
    ]);
    cmd
}

/// Parses either dialect; any shape that doesn't match is treated as unreachable, never an
/// error, per the boundary-behavior test in spec §8.
fn parse_ping_output(stdout: &str) -> IcmpResult {
    if let Some(result) = parse_posix(stdout) {
        return result;
    }
    if let Some(result) = parse_windows(stdout) {
        return result;
    }
    IcmpResult::unreachable()
}

/// POSIX `ping` summary lines look like:
///   `3 packets transmitted, 3 received, 0% packet loss, time 2003ms`
///   `rtt min/avg/max/mdev = 1.234/2.345/3.456/0.123 ms`
fn parse_posix(stdout: &str) -> Option<IcmpResult> {
    let loss_line = stdout.lines().find(|l| l.contains("packet loss"))?;
    let loss_pct = extract_before(loss_line, "% packet loss")?.parse::<f64>().ok()?;

    if loss_pct >= 100.0 {
        return Some(IcmpResult { reachable: false, avg_latency_ms: None, packet_loss_pct: 100.0 });
    }

    let avg_latency_ms = stdout
        .lines()
        .find(|l| l.contains("min/avg/max") || l.contains("min/avg/max/mdev"))
        .and_then(|l| l.split('=').nth(1))
        .and_then(|rhs| rhs.split_whitespace().next())
        .and_then(|nums| nums.split('/').nth(1))
        .and_then(|s| s.parse::<f64>().ok());

    Some(IcmpResult { reachable: true, avg_latency_ms, packet_loss_pct: loss_pct })
}

/// Windows `ping` summary lines look like:
///   `    Packets: Sent = 3, Received = 3, Lost = 0 (0% loss),`
///   `    Minimum = 1ms, Maximum = 3ms, Average = 2ms`
fn parse_windows(stdout: &str) -> Option<IcmpResult> {
    let loss_line = stdout.lines().find(|l| l.contains("% loss"))?;
    let loss_pct = extract_between(loss_line, "(", "% loss")?.parse::<f64>().ok()?;

    if loss_pct >= 100.0 {
        return Some(IcmpResult { reachable: false, avg_latency_ms: None, packet_loss_pct: 100.0 });
    }

    let avg_latency_ms = stdout
        .lines()
        .find(|l| l.contains("Average ="))
        .and_then(|l| l.split("Average =").nth(1))
        .and_then(|s| s.trim().trim_end_matches("ms").parse::<f64>().ok());

    Some(IcmpResult { reachable: true, avg_latency_ms, packet_loss_pct: loss_pct })
}

fn extract_before<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let idx = line.find(marker)?;
    let head = &line[..idx];
    head.rsplit(|c: char| !c.is_ascii_digit() && c != '.').next()
}

fn extract_between<'a>(line: &'a str, start: &str, end: &str) -> Option<&'a str> {
    let after_start = &line[line.find(start)? + start.len()..];
    let end_idx = after_start.find(end)?;
    Some(&after_start[..end_idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_posix_successful_ping() {
        let output = "PING 10.0.0.1 (10.0.0.1): 56 data bytes\n\
             --- 10.0.0.1 ping statistics ---\n\
             3 packets transmitted, 3 received, 0% packet loss, time 2003ms\n\
             rtt min/avg/max/mdev = 1.234/2.500/3.456/0.123 ms\n";
        let result = parse_ping_output(output);
        assert!(result.reachable);
        assert_eq!(result.packet_loss_pct, 0.0);
        assert_eq!(result.avg_latency_ms, Some(2.500));
    }

    #[test]
    fn parses_posix_total_loss() {
        let output = "--- 10.0.0.1 ping statistics ---\n\
             3 packets transmitted, 0 received, 100% packet loss, time 2003ms\n";
        let result = parse_ping_output(output);
        assert!(!result.reachable);
        assert_eq!(result.packet_loss_pct, 100.0);
        assert_eq!(result.avg_latency_ms, None);
    }

    #[test]
    fn parses_windows_successful_ping() {
        let output = "Pinging 10.0.0.1 with 32 bytes of data:\n\
             Reply from 10.0.0.1: bytes=32 time=2ms TTL=64\n\
             Ping statistics for 10.0.0.1:\n\
             Packets: Sent = 3, Received = 3, Lost = 0 (0% loss),\n\
             Approximate round trip times in milli-seconds:\n\
             Minimum = 1ms, Maximum = 3ms, Average = 2ms\n";
        let result = parse_ping_output(output);
        assert!(result.reachable);
        assert_eq!(result.packet_loss_pct, 0.0);
        assert_eq!(result.avg_latency_ms, Some(2.0));
    }

    #[test]
    fn unparseable_output_is_treated_as_unreachable() {
        let result = parse_ping_output("garbage, not ping output at all");
        assert!(!result.reachable);
        assert_eq!(result.packet_loss_pct, 100.0);
    }
}
