//! JunOS brace-nested configuration parser.
//!
//! Ports `examples/original_source/apps/stig/src/stig/collectors/juniper_stig_checker.py`'s
//! `JuniperConfigParser` line-for-line: a section-name stack tracked by brace depth, a map of
//! `section_path -> joined raw text` for the pattern-matching fallback handler, and live field
//! extraction into a flat config struct as each line is seen.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct JunosConfig {
    pub hostname: Option<String>,
    pub version: Option<String>,
    pub raw_content: String,

    pub login_banner: Option<String>,
    pub login_retry_options: BTreeMap<String, String>,

    pub ssh_root_login_deny: Option<bool>,
    pub ssh_protocol_version: Option<String>,
    pub ssh_ciphers: Option<String>,
    pub ssh_macs: Option<String>,

    pub syslog_hosts: Vec<String>,
    pub security_log_configured: bool,
    pub security_log_streams: Vec<String>,

    pub ntp_servers: Vec<String>,
    pub ntp_authentication: bool,

    pub authentication_order: Vec<String>,
    pub tacplus_servers: Vec<String>,
    pub radius_servers: Vec<String>,

    pub snmp_communities: Vec<String>,
    pub snmpv3_usm_configured: bool,
    pub snmpv3_auth_sha: bool,
    pub snmpv3_auth_md5: bool,
    pub snmpv3_privacy_aes: bool,
    pub snmpv3_privacy_des: bool,

    pub security_zones: BTreeMap<String, Option<String>>,
    pub security_policy_default_deny: bool,
    pub security_policy_default_permit: bool,
    pub security_policy_actions: Vec<String>,
    pub security_screen_ids_enabled: bool,

    pub security_ike_configured: bool,
    pub security_ipsec_configured: bool,
    pub security_idp_active_policy: Option<String>,
    pub security_idp_configured: bool,

    pub firewall_filter_logging: bool,

    /// `section_path -> joined raw lines`, used by the pattern-matching fallback handler.
    pub sections: BTreeMap<String, String>,
}

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"host-name\s+(\S+)").unwrap());
static LOGIN_MESSAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"message\s+"([^"]+)""#).unwrap());
static SYSLOG_HOST_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"host\s+(\S+)").unwrap());
static NTP_SERVER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"server\s+(\S+)").unwrap());
static AUTH_ORDER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"authentication-order\s+\[(.*?)\]").unwrap());
static ZONE_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"security-zone\s+(\S+)").unwrap());
static IP_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+\.\d+").unwrap());

/// Parses raw JunOS `set`-style configuration text into a [`JunosConfig`].
pub fn parse(content: &str) -> JunosConfig {
    let mut config = JunosConfig {
        raw_content: content.to_string(),
        ..Default::default()
    };

    let mut stack: Vec<String> = Vec::new();
    let mut section_lines: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for line in content.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        if let Some(name) = stripped.strip_suffix('{') {
            stack.push(name.trim().to_string());
            section_lines.entry(stack.join(" > ")).or_default();
            continue;
        }

        if stripped == "}" {
            if !stack.is_empty() {
                let path = stack.join(" > ");
                if let Some(lines) = section_lines.get(&path) {
                    config.sections.insert(path, lines.join("\n"));
                }
                stack.pop();
            }
            continue;
        }

        if !stack.is_empty() {
            let path = stack.join(" > ");
            section_lines.entry(path).or_default().push(stripped.to_string());
        }

        let path_lower = stack.join(" > ").to_lowercase();
        parse_line(&mut config, stripped, &path_lower, &stack);
    }

    config
}

fn clean(line: &str) -> &str {
    line.trim_end_matches(';').trim()
}

fn parse_line(config: &mut JunosConfig, line: &str, path: &str, stack: &[String]) {
    let clean_line = clean(line);

    if path.contains("system") {
        parse_system(config, clean_line, path);
    }
    if path.contains("security") {
        parse_security(config, clean_line, path, stack);
    }
    if path.contains("snmp") || line.starts_with("snmp") {
        parse_snmp(config, clean_line, path);
    }
    if path.contains("firewall") {
        parse_firewall(config, clean_line, path);
    }
}

fn parse_system(config: &mut JunosConfig, line: &str, path: &str) {
    if line.contains("host-name") {
        if let Some(caps) = HOSTNAME_RE.captures(line) {
            config.hostname = Some(caps[1].to_string());
        }
    }
    if line.starts_with("version") {
        config.version = line.split_whitespace().last().map(String::from);
    }

    if path.contains("login") {
        if path.contains("retry-options") {
            insert_key_value(line, &mut config.login_retry_options);
        } else if line.contains("message") {
            if let Some(caps) = LOGIN_MESSAGE_RE.captures(line) {
                config.login_banner = Some(caps[1].to_string());
            }
        }
    }

    if path.contains("services") {
        if path.contains("ssh") {
            if line.contains("root-login") {
                config.ssh_root_login_deny = Some(line.contains("deny"));
            }
            if line.contains("protocol-version") {
                config.ssh_protocol_version = line.split_whitespace().last().map(String::from);
            }
            if line.contains("ciphers") {
                config.ssh_ciphers = line.split_whitespace().last().map(String::from);
            }
            if line.contains("macs") {
                config.ssh_macs = line.split_whitespace().last().map(String::from);
            }
        }
    }

    if path.contains("syslog") {
        if line.contains("host") {
            if let Some(caps) = SYSLOG_HOST_RE.captures(line) {
                config.syslog_hosts.push(caps[1].to_string());
            }
        }
    }

    if path.contains("ntp") {
        if line.contains("server") {
            if let Some(caps) = NTP_SERVER_RE.captures(line) {
                config.ntp_servers.push(caps[1].to_string());
            }
        }
        if line.contains("authentication-key") {
            config.ntp_authentication = true;
        }
    }

    if line.contains("authentication-order") {
        if let Some(caps) = AUTH_ORDER_RE.captures(line) {
            config.authentication_order = caps[1].split_whitespace().map(String::from).collect();
        }
    }

    if path.contains("tacplus-server") {
        if let Some(first) = line.split_whitespace().next() {
            if IP_PREFIX_RE.is_match(first) {
                config.tacplus_servers.push(first.to_string());
            }
        }
    }

    if path.contains("radius-server") {
        if let Some(first) = line.split_whitespace().next() {
            if IP_PREFIX_RE.is_match(first) {
                config.radius_servers.push(first.to_string());
            }
        }
    }
}

fn parse_security(config: &mut JunosConfig, line: &str, path: &str, _stack: &[String]) {
    if path.contains("security > log") {
        config.security_log_configured = true;
        if path.contains("stream") {
            config.security_log_streams.push(line.to_string());
        }
    }

    if path.contains("screen") && path.contains("ids-option") {
        config.security_screen_ids_enabled = true;
    }

    if path.contains("policies") {
        if path.contains("default-policy") {
            if line.contains("deny-all") {
                config.security_policy_default_deny = true;
            } else if line.contains("permit-all") {
                config.security_policy_default_permit = true;
            }
        }
        if line.contains("then log") || line.contains("then permit") || line.contains("then deny") {
            config.security_policy_actions.push(line.to_string());
        }
    }

    if path.contains("zones") && path.contains("security-zone") {
        if let Some(caps) = ZONE_NAME_RE.captures(path) {
            let zone = caps[1].to_string();
            let entry = config.security_zones.entry(zone).or_insert(None);
            if line.contains("screen") {
                *entry = line.split_whitespace().last().map(String::from);
            }
        }
    }

    if path.contains("ike") {
        config.security_ike_configured = true;
    }
    if path.contains("ipsec") {
        config.security_ipsec_configured = true;
    }
    if path.contains("idp") {
        config.security_idp_configured = true;
        if line.contains("active-policy") {
            config.security_idp_active_policy = line.split_whitespace().last().map(String::from);
        }
    }
}

fn parse_snmp(config: &mut JunosConfig, line: &str, path: &str) {
    if line.contains("community") {
        if let Some(rest) = line.split("community").nth(1) {
            if let Some(community) = rest.split_whitespace().next() {
                config.snmp_communities.push(community.trim_matches('"').to_string());
            }
        }
    }

    if path.contains("v3") {
        if path.contains("usm") {
            config.snmpv3_usm_configured = true;
        }
        if line.contains("authentication-sha") || line.contains("authentication-sha256") {
            config.snmpv3_auth_sha = true;
        }
        if line.contains("authentication-md5") {
            config.snmpv3_auth_md5 = true;
        }
        if line.contains("privacy-aes") || line.contains("privacy-aes256") {
            config.snmpv3_privacy_aes = true;
        }
        if line.contains("privacy-des") {
            config.snmpv3_privacy_des = true;
        }
    }
}

fn parse_firewall(config: &mut JunosConfig, line: &str, path: &str) {
    if path.contains("filter") && path.contains("term") && (line.contains("log") || line.contains("syslog")) {
        config.firewall_filter_logging = true;
    }
}

fn insert_key_value(line: &str, target: &mut BTreeMap<String, String>) {
    let mut parts = line.splitn(2, char::is_whitespace);
    match (parts.next(), parts.next()) {
        (Some(key), Some(value)) => {
            target.insert(key.replace('-', "_"), value.trim_end_matches(';').trim().to_string());
        }
        (Some(key), None) if !key.is_empty() => {
            target.insert(key.replace('-', "_"), "true".to_string());
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
system {
    host-name srx-edge-01;
    login {
        message "Authorized use only";
        retry-options {
            tries-before-disconnect 3;
            lockout-period 15;
        }
    }
    services {
        ssh {
            root-login deny;
            protocol-version v2;
        }
    }
    syslog {
        host 10.0.0.5;
    }
    ntp {
        server 10.0.0.1;
        authentication-key 5;
    }
    authentication-order [ tacplus password ];
}
security {
    log {
        mode stream;
    }
    policies {
        default-policy {
            deny-all;
        }
    }
}
snmp {
    v3 {
        usm {
            local-engine {
                user admin {
                    authentication-sha;
                    privacy-aes256;
                }
            }
        }
    }
}
"#;

    #[test]
    fn extracts_hostname_and_banner() {
        let cfg = parse(SAMPLE);
        assert_eq!(cfg.hostname.as_deref(), Some("srx-edge-01"));
        assert_eq!(cfg.login_banner.as_deref(), Some("Authorized use only"));
    }

    #[test]
    fn extracts_ssh_and_syslog_and_ntp() {
        let cfg = parse(SAMPLE);
        assert_eq!(cfg.ssh_root_login_deny, Some(true));
        assert_eq!(cfg.ssh_protocol_version.as_deref(), Some("v2"));
        assert_eq!(cfg.syslog_hosts, vec!["10.0.0.5".to_string()]);
        assert_eq!(cfg.ntp_servers, vec!["10.0.0.1".to_string()]);
        assert!(cfg.ntp_authentication);
    }

    #[test]
    fn extracts_authentication_order_and_default_deny() {
        let cfg = parse(SAMPLE);
        assert_eq!(cfg.authentication_order, vec!["tacplus".to_string(), "password".to_string()]);
        assert!(cfg.security_policy_default_deny);
    }

    #[test]
    fn extracts_snmpv3_usm_flags() {
        let cfg = parse(SAMPLE);
        assert!(cfg.snmpv3_usm_configured);
        assert!(cfg.snmpv3_auth_sha);
        assert!(cfg.snmpv3_privacy_aes);
        assert!(!cfg.snmpv3_auth_md5);
    }
}
