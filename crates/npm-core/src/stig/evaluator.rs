//! STIG rule evaluator: category dispatch and the twelve canonical check handlers.
//!
//! Ports `juniper_stig_checker.py`'s `JuniperSTIGEvaluator._determine_category`/`_run_check` and
//! each `_check_*` handler's affirmative/negative indicator text. The handler registry is a
//! priority-ordered `Vec<Box<dyn StigCheck>>`, first match wins, same as the Python's `if/elif`
//! chain in `_run_check`.

use super::junos_config::JunosConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StigCategory {
    Alg,
    Ndm,
    Vpn,
    Idps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    NotApplicable,
    NotReviewed,
}

/// One canonical STIG check handler, matched by title/check-text keywords.
pub trait StigCheck: Send + Sync {
    fn id(&self) -> &'static str;
    fn matches(&self, title_lower: &str, check_lower: &str) -> bool;
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String);
}

/// Priority-ordered handler list — mirrors the exact `if/elif` order in `_run_check`.
pub fn all_checks() -> Vec<Box<dyn StigCheck>> {
    vec![
        Box::new(SshCheck),
        Box::new(SnmpCheck),
        Box::new(NtpCheck),
        Box::new(LoggingCheck),
        Box::new(AuthenticationCheck),
        Box::new(SecurityScreenCheck),
        Box::new(SecurityPolicyCheck),
        Box::new(SessionTimeoutCheck),
        Box::new(VpnCheck),
        Box::new(IdpCheck),
        Box::new(BannerCheck),
        Box::new(PasswordPolicyCheck),
    ]
}

/// Determines the STIG category for a rule from its title/check text, per
/// `_determine_category`'s keyword sets (VPN, then IDPS, then NDM, default ALG).
pub fn determine_category(title: &str, check_text: &str) -> StigCategory {
    let title_lower = title.to_lowercase();
    let check_lower = check_text.to_lowercase();
    let hay = format!("{title_lower} {check_lower}");

    if ["vpn", "ike", "ipsec", "tunnel", "certificate"].iter().any(|kw| hay.contains(kw)) {
        return StigCategory::Vpn;
    }
    if ["idp", "ids", "intrusion", "attack signature"].iter().any(|kw| hay.contains(kw)) {
        return StigCategory::Idps;
    }
    if [
        "snmp", "ssh", "ntp", "syslog", "logging", "authentication", "password", "account",
        "session", "banner", "management",
    ]
    .iter()
    .any(|kw| hay.contains(kw))
    {
        return StigCategory::Ndm;
    }
    StigCategory::Alg
}

/// Evaluates one STIG rule against a parsed config: title-keyword handlers run first (in
/// `all_checks()`'s priority order), then a category-based fallback to VPN/IDP, then banner and
/// password-policy handlers, and finally pattern-matching against the fix text — the exact
/// `if/elif` chain from `_run_check`.
pub fn evaluate_rule(config: &JunosConfig, title: &str, check_text: &str, fix_text: &str) -> (CheckStatus, String) {
    let title_lower = title.to_lowercase();
    let check_lower = check_text.to_lowercase();

    // Title-keyword handlers, in the same priority order as `_run_check`'s `if/elif` chain
    // (everything before the category-based VPN/IDPS fallback).
    let title_ordered: [Box<dyn StigCheck>; 8] = [
        Box::new(SshCheck),
        Box::new(SnmpCheck),
        Box::new(NtpCheck),
        Box::new(LoggingCheck),
        Box::new(AuthenticationCheck),
        Box::new(SecurityScreenCheck),
        Box::new(SecurityPolicyCheck),
        Box::new(SessionTimeoutCheck),
    ];
    for check in title_ordered {
        if check.matches(&title_lower, &check_lower) {
            return check.evaluate(config, title);
        }
    }

    match determine_category(title, check_text) {
        StigCategory::Vpn => return VpnCheck.evaluate(config, title),
        StigCategory::Idps => return IdpCheck.evaluate(config, title),
        StigCategory::Ndm | StigCategory::Alg => {}
    }

    if BannerCheck.matches(&title_lower, &check_lower) {
        return BannerCheck.evaluate(config, title);
    }
    if PasswordPolicyCheck.matches(&title_lower, &check_lower) {
        return PasswordPolicyCheck.evaluate(config, title);
    }

    check_by_pattern(config, fix_text)
}

fn raw_lower(config: &JunosConfig) -> String {
    config.raw_content.to_lowercase()
}

struct SshCheck;
impl StigCheck for SshCheck {
    fn id(&self) -> &'static str {
        "ssh"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("ssh") || title_lower.contains("sshv2")
    }
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String) {
        let title_lower = title.to_lowercase();
        let mut findings = Vec::new();
        let raw = raw_lower(config);

        if config.ssh_protocol_version.is_none()
            && config.ssh_root_login_deny.is_none()
            && !raw.contains("ssh")
        {
            return (CheckStatus::Fail, "SSH service not configured".to_string());
        }

        if title_lower.contains("v2") || title_lower.contains("version 2") || title_lower.contains("sshv2") {
            match config.ssh_protocol_version.as_deref() {
                Some(v) if v.to_lowercase().contains("v2") || v.contains('2') => {
                    findings.push("SSH Protocol Version: v2 \u{2713}".to_string());
                }
                other => {
                    findings.push(format!(
                        "SSH Protocol Version: {}",
                        other.unwrap_or("not explicitly set")
                    ));
                    if !raw.contains("protocol-version") {
                        findings.push("Note: JunOS defaults to SSHv2".to_string());
                    }
                }
            }
        }

        let mut failed = false;
        if title_lower.contains("root") {
            if config.ssh_root_login_deny == Some(true) {
                findings.push("SSH root-login: deny \u{2713}".to_string());
            } else if raw.contains("root-login deny") {
                findings.push("SSH root-login deny found in config \u{2713}".to_string());
            } else {
                findings.push("SSH root-login is not set to deny".to_string());
                failed = true;
            }
        }

        if title_lower.contains("fips") || title_lower.contains("cipher") {
            if config.ssh_ciphers.as_deref().unwrap_or("").to_lowercase().contains("aes256") || raw.contains("aes256") {
                findings.push("SSH ciphers include AES256 \u{2713}".to_string());
            }
            if config.ssh_macs.as_deref().unwrap_or("").to_lowercase().contains("sha2") || raw.contains("sha2") {
                findings.push("SSH MACs include SHA2 \u{2713}".to_string());
            }
        }

        if failed {
            (CheckStatus::Fail, findings.join("\n"))
        } else if findings.is_empty() {
            (CheckStatus::Pass, "SSH configuration appears compliant".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct SnmpCheck;
impl StigCheck for SnmpCheck {
    fn id(&self) -> &'static str {
        "snmp"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("snmp")
    }
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String) {
        let title_lower = title.to_lowercase();
        let mut findings = Vec::new();
        let mut failed = false;
        let raw = raw_lower(config);

        if title_lower.contains("v3") || title_lower.contains("snmpv3") {
            if config.snmpv3_usm_configured {
                findings.push("SNMPv3 USM is configured \u{2713}".to_string());
                if config.snmpv3_auth_sha {
                    findings.push("SNMPv3 uses SHA authentication \u{2713}".to_string());
                } else if config.snmpv3_auth_md5 {
                    findings.push("SNMPv3 uses MD5 (should use SHA)".to_string());
                    failed = true;
                }
                if config.snmpv3_privacy_aes {
                    findings.push("SNMPv3 uses AES privacy \u{2713}".to_string());
                } else if config.snmpv3_privacy_des {
                    findings.push("SNMPv3 uses DES (should use AES)".to_string());
                    failed = true;
                }
            } else if raw.contains("snmp v3") {
                findings.push("SNMPv3 configuration found in config".to_string());
            } else {
                findings.push("SNMPv3 not configured".to_string());
                failed = true;
            }
        }

        if !config.snmp_communities.is_empty() {
            findings.push(format!(
                "WARNING: SNMP community strings found (v1/v2c): {} communities",
                config.snmp_communities.len()
            ));
            if title_lower.contains("v3") {
                failed = true;
            }
        }

        if failed {
            (CheckStatus::Fail, findings.join("\n"))
        } else if findings.is_empty() {
            (CheckStatus::Pass, "SNMP configuration not detected (may be disabled)".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct NtpCheck;
impl StigCheck for NtpCheck {
    fn id(&self) -> &'static str {
        "ntp"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("ntp") || title_lower.contains("time")
    }
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String) {
        let title_lower = title.to_lowercase();
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if !config.ntp_servers.is_empty() {
            findings.push(format!("NTP servers configured: {} \u{2713}", config.ntp_servers.join(", ")));
        } else if raw.contains("ntp") && raw.contains("server") {
            findings.push("NTP server configuration found in config \u{2713}".to_string());
        } else {
            return (CheckStatus::Fail, "No NTP servers configured".to_string());
        }

        if title_lower.contains("authenticat") {
            if config.ntp_authentication {
                findings.push("NTP authentication is configured \u{2713}".to_string());
            } else if raw.contains("authentication-key") {
                findings.push("NTP authentication-key found in config \u{2713}".to_string());
            } else {
                findings.push("NTP authentication not explicitly configured".to_string());
            }
        }

        (CheckStatus::Pass, findings.join("\n"))
    }
}

struct LoggingCheck;
impl StigCheck for LoggingCheck {
    fn id(&self) -> &'static str {
        "logging"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("log") || title_lower.contains("syslog") || title_lower.contains("audit")
    }
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String) {
        let title_lower = title.to_lowercase();
        let raw = raw_lower(config);
        let mut findings = Vec::new();
        let mut failed = false;

        if !config.syslog_hosts.is_empty() {
            findings.push(format!("Syslog servers configured: {} \u{2713}", config.syslog_hosts.join(", ")));
        } else if raw.contains("syslog") && raw.contains("host") {
            findings.push("Syslog host configuration found in config \u{2713}".to_string());
        } else {
            findings.push("No remote syslog servers configured".to_string());
            if title_lower.contains("centralized") || title_lower.contains("remote") {
                failed = true;
            }
        }

        if config.security_log_configured {
            findings.push("Security logging is configured \u{2713}".to_string());
            if !config.security_log_streams.is_empty() {
                findings.push(format!(
                    "Security log streams configured: {} \u{2713}",
                    config.security_log_streams.len()
                ));
            }
        } else if raw.contains("security log") {
            findings.push("Security log configuration found in config \u{2713}".to_string());
        }

        if title_lower.contains("policy") || title_lower.contains("firewall") {
            let log_actions = config.security_policy_actions.iter().filter(|a| a.to_lowercase().contains("log")).count();
            if log_actions > 0 {
                findings.push(format!("Policy logging actions found: {log_actions} \u{2713}"));
            }
            if raw.contains("then log") {
                findings.push("Policy 'then log' statements found in config \u{2713}".to_string());
            }
        }

        if failed {
            (CheckStatus::Fail, findings.join("\n"))
        } else if findings.is_empty() {
            (CheckStatus::Pass, "Logging configuration review needed".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct AuthenticationCheck;
impl StigCheck for AuthenticationCheck {
    fn id(&self) -> &'static str {
        "authentication"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("authentication") || title_lower.contains("tacacs") || title_lower.contains("radius")
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if !config.authentication_order.is_empty() {
            findings.push(format!("Authentication order: {} \u{2713}", config.authentication_order.join(" ")));
        } else if raw.contains("authentication-order") {
            findings.push("Authentication order configured \u{2713}".to_string());
        }

        if !config.tacplus_servers.is_empty() {
            findings.push(format!("TACACS+ servers: {} \u{2713}", config.tacplus_servers.join(", ")));
        } else if raw.contains("tacplus") {
            findings.push("TACACS+ configuration found \u{2713}".to_string());
        }

        if !config.radius_servers.is_empty() {
            findings.push(format!("RADIUS servers: {} \u{2713}", config.radius_servers.join(", ")));
        } else if raw.contains("radius") {
            findings.push("RADIUS configuration found \u{2713}".to_string());
        }

        if findings.is_empty() {
            (CheckStatus::Fail, "No centralized authentication configured".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct SecurityScreenCheck;
impl StigCheck for SecurityScreenCheck {
    fn id(&self) -> &'static str {
        "security_screen"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("screen") || (title_lower.contains("protect") && title_lower.contains("attack"))
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if config.security_screen_ids_enabled {
            findings.push("Security screen IDS option configured \u{2713}".to_string());
        }

        const PROTECTIONS: &[(&str, &str)] = &[
            ("syn-flood", "SYN flood protection"),
            ("ping-death", "Ping of death protection"),
            ("land", "LAND attack protection"),
            ("tear-drop", "Teardrop protection"),
            ("spoofing", "IP spoofing protection"),
            ("source-route", "Source route protection"),
            ("winnuke", "WinNuke protection"),
        ];
        for (pattern, name) in PROTECTIONS {
            if raw.contains(pattern) {
                findings.push(format!("{name} \u{2713}"));
            }
        }

        for (zone, screen) in &config.security_zones {
            if let Some(screen) = screen {
                findings.push(format!("Screen applied to zone '{zone}': {screen} \u{2713}"));
            }
        }

        if findings.is_empty() {
            if raw.contains("screen") && raw.contains("ids-option") {
                findings.push("Security screen configuration found in config".to_string());
            } else {
                return (CheckStatus::Fail, "No security screens configured".to_string());
            }
        }

        (CheckStatus::Pass, findings.join("\n"))
    }
}

struct SecurityPolicyCheck;
impl StigCheck for SecurityPolicyCheck {
    fn id(&self) -> &'static str {
        "security_policy"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("policy") || title_lower.contains("zone")
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if config.security_policy_default_deny {
            findings.push("Default policy: deny-all \u{2713}".to_string());
        } else if raw.contains("default-policy") && raw.contains("deny-all") {
            findings.push("Default deny-all policy found \u{2713}".to_string());
        } else if raw.contains("default-policy") && raw.contains("permit-all") {
            findings.push("WARNING: Default permit-all policy found".to_string());
            return (CheckStatus::Fail, findings.join("\n"));
        }

        if !config.security_zones.is_empty() {
            let names: Vec<&str> = config.security_zones.keys().map(String::as_str).collect();
            findings.push(format!("Security zones configured: {} \u{2713}", names.join(", ")));
        } else if raw.contains("security-zone") {
            findings.push("Security zones found in config \u{2713}".to_string());
        }

        if raw.contains("from-zone") && raw.contains("to-zone") {
            findings.push("Zone-to-zone policies configured \u{2713}".to_string());
        }

        if findings.is_empty() {
            (CheckStatus::NotReviewed, "Security policy configuration needs manual review".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct SessionTimeoutCheck;
impl StigCheck for SessionTimeoutCheck {
    fn id(&self) -> &'static str {
        "session_timeout"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("timeout") || title_lower.contains("idle") || title_lower.contains("session")
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if let Some(pos) = raw.find("idle-timeout") {
            if let Some(minutes) = raw[pos..].split_whitespace().nth(1).and_then(|s| s.parse::<u32>().ok()) {
                findings.push(format!("Idle timeout configured: {minutes} minutes"));
                if minutes <= 10 {
                    findings.push("Timeout is 10 minutes or less \u{2713}".to_string());
                } else {
                    findings.push("WARNING: Timeout exceeds 10 minutes".to_string());
                }
            }
        }

        if raw.contains("cli idle-timeout") {
            findings.push("CLI idle-timeout configured \u{2713}".to_string());
        }

        if findings.is_empty() {
            (CheckStatus::Fail, "No session timeout configuration found".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct VpnCheck;
impl StigCheck for VpnCheck {
    fn id(&self) -> &'static str {
        "vpn"
    }
    fn matches(&self, _title_lower: &str, _check_lower: &str) -> bool {
        false // only reached via category fallback, see evaluate_rule's category-based dispatch below
    }
    fn evaluate(&self, config: &JunosConfig, title: &str) -> (CheckStatus, String) {
        let title_lower = title.to_lowercase();
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if config.security_ike_configured {
            if title_lower.contains("aes256") || title_lower.contains("encryption") {
                if raw.contains("aes256") || raw.contains("aes-256") {
                    findings.push("IKE AES-256 encryption found \u{2713}".to_string());
                }
            }
            if title_lower.contains("diffie-hellman") || title_lower.contains("group") {
                if raw.contains("group14") || raw.contains("group19") || raw.contains("group20") {
                    findings.push("Strong DH group configured \u{2713}".to_string());
                }
            }
            findings.push("IKE configuration found \u{2713}".to_string());
        } else if raw.contains("ike") {
            findings.push("IKE configuration found in config".to_string());
        }

        if config.security_ipsec_configured {
            findings.push("IPsec configuration found \u{2713}".to_string());
        } else if raw.contains("ipsec") {
            findings.push("IPsec configuration found in config".to_string());
        }

        if findings.is_empty() {
            (CheckStatus::NotApplicable, "VPN not configured on this device".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

struct IdpCheck;
impl StigCheck for IdpCheck {
    fn id(&self) -> &'static str {
        "idp"
    }
    fn matches(&self, _title_lower: &str, _check_lower: &str) -> bool {
        false // category fallback only, same as VpnCheck
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if config.security_idp_configured {
            if let Some(policy) = &config.security_idp_active_policy {
                findings.push(format!("IDP active policy: {policy} \u{2713}"));
            }
            findings.push("IDP configuration found \u{2713}".to_string());
        } else if raw.contains("idp") {
            findings.push("IDP configuration found in config".to_string());
        } else {
            return (CheckStatus::NotApplicable, "IDP not configured on this device".to_string());
        }

        (CheckStatus::Pass, findings.join("\n"))
    }
}

struct BannerCheck;
impl StigCheck for BannerCheck {
    fn id(&self) -> &'static str {
        "banner"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("banner")
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        if let Some(banner) = &config.login_banner {
            let snippet: String = banner.chars().take(100).collect();
            (CheckStatus::Pass, format!("Login banner configured: '{snippet}...'"))
        } else if raw.contains("message") && raw.contains("login") {
            (CheckStatus::Pass, "Login message/banner found in config \u{2713}".to_string())
        } else {
            (CheckStatus::Fail, "No login banner configured".to_string())
        }
    }
}

struct PasswordPolicyCheck;
impl StigCheck for PasswordPolicyCheck {
    fn id(&self) -> &'static str {
        "password_policy"
    }
    fn matches(&self, title_lower: &str, _check_lower: &str) -> bool {
        title_lower.contains("password") || title_lower.contains("lockout") || title_lower.contains("brute")
    }
    fn evaluate(&self, config: &JunosConfig, _title: &str) -> (CheckStatus, String) {
        let raw = raw_lower(config);
        let mut findings = Vec::new();

        if !config.login_retry_options.is_empty() {
            findings.push("Login retry options configured \u{2713}".to_string());
            if config.login_retry_options.contains_key("lockout_period") || raw.contains("lockout-period") {
                findings.push("Account lockout period configured \u{2713}".to_string());
            }
        }
        if raw.contains("retry-options") {
            findings.push("Retry options found in config \u{2713}".to_string());
        }
        if raw.contains("backoff") {
            findings.push("Login backoff configured \u{2713}".to_string());
        }

        if findings.is_empty() {
            (CheckStatus::Fail, "No password/lockout policy found".to_string())
        } else {
            (CheckStatus::Pass, findings.join("\n"))
        }
    }
}

/// Fallback: extracts `set ...` fix-text patterns and checks whether the raw config contains
/// them, matching `_check_by_pattern`'s best-effort heuristic.
fn check_by_pattern(config: &JunosConfig, fix_text: &str) -> (CheckStatus, String) {
    let raw = raw_lower(config);
    let mut findings = Vec::new();

    for line in fix_text.to_lowercase().lines() {
        let Some(rest) = line.trim().strip_prefix("set ") else { continue };
        let words: Vec<&str> = rest.split_whitespace().take(3).collect();
        if words.is_empty() {
            continue;
        }
        let pattern = words.join(" ");
        if raw.contains(&pattern) {
            findings.push(format!("Pattern found: {pattern}... \u{2713}"));
        }
        if findings.len() >= 5 {
            break;
        }
    }

    if findings.is_empty() {
        (CheckStatus::NotReviewed, "Manual review required - automated check not available for this rule".to_string())
    } else {
        (CheckStatus::Pass, findings.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stig::junos_config;

    #[test]
    fn determine_category_prioritizes_vpn_over_ndm() {
        assert_eq!(determine_category("IKE tunnel encryption", "uses ssh"), StigCategory::Vpn);
    }

    #[test]
    fn determine_category_defaults_to_alg() {
        assert_eq!(determine_category("Default firewall policy", ""), StigCategory::Alg);
    }

    #[test]
    fn ssh_check_fails_when_root_login_not_denied() {
        let config = junos_config::parse("system { services { ssh { protocol-version v2; } } }");
        let (status, _) = evaluate_rule(&config, "SSHv2 root login must be denied", "check ssh", "set ssh");
        assert_eq!(status, CheckStatus::Fail);
    }

    #[test]
    fn ssh_check_passes_when_root_login_denied() {
        let config = junos_config::parse("system { services { ssh { root-login deny; protocol-version v2; } } }");
        let (status, _) = evaluate_rule(&config, "SSHv2 root login must be denied", "check ssh", "set ssh");
        assert_eq!(status, CheckStatus::Pass);
    }

    #[test]
    fn ntp_check_fails_without_servers() {
        let config = junos_config::parse("system { host-name r1; }");
        let (status, _) = evaluate_rule(&config, "NTP must be configured", "", "");
        assert_eq!(status, CheckStatus::Fail);
    }

    #[test]
    fn vpn_falls_back_to_not_applicable_when_unconfigured() {
        let config = junos_config::parse("system { host-name r1; }");
        assert_eq!(determine_category("VPN tunnel encryption required", ""), StigCategory::Vpn);
        let (status, _) = VpnCheck.evaluate(&config, "VPN tunnel encryption required");
        assert_eq!(status, CheckStatus::NotApplicable);
    }
}
