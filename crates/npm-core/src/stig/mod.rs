//! STIG compliance engine: ZIP+XCCDF library indexing, JunOS configuration parsing, and rule
//! evaluation against a parsed configuration.

pub mod evaluator;
pub mod indexer;
pub mod junos_config;
pub mod xccdf;

use indexer::StigRule;

/// One evaluated rule outcome, ready for `stig.audit_results` insertion.
#[derive(Debug, Clone)]
pub struct AuditResult {
    pub rule_id: String,
    pub title: String,
    pub severity: String,
    pub status: evaluator::CheckStatus,
    pub finding: String,
}

/// Parses `config_text` once and evaluates every rule in `rules` against it, matching
/// `analyze_juniper_config`'s parse-once-evaluate-many shape.
pub fn audit_config(config_text: &str, rules: &[StigRule]) -> Vec<AuditResult> {
    let config = junos_config::parse(config_text);

    rules
        .iter()
        .map(|rule| {
            let (status, finding) = evaluator::evaluate_rule(&config, &rule.title, &rule.check_text, &rule.fix_text);
            AuditResult {
                rule_id: rule.vuln_id.clone(),
                title: rule.title.clone(),
                severity: rule.severity.clone(),
                status,
                finding,
            }
        })
        .collect()
}

pub fn status_str(status: evaluator::CheckStatus) -> &'static str {
    match status {
        evaluator::CheckStatus::Pass => "pass",
        evaluator::CheckStatus::Fail => "fail",
        evaluator::CheckStatus::NotApplicable => "not_applicable",
        evaluator::CheckStatus::NotReviewed => "not_reviewed",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn audit_config_evaluates_every_rule() {
        let config_text = "system { services { ssh { root-login deny; protocol-version v2; } } }";
        let rules = vec![StigRule {
            vuln_id: "V-1".to_string(),
            rule_id: "SV-1r1_rule".to_string(),
            title: "SSHv2 root login must be denied".to_string(),
            severity: "high".to_string(),
            check_text: "check ssh root login".to_string(),
            fix_text: "set system services ssh root-login deny".to_string(),
            ccis: BTreeSet::new(),
        }];

        let results = audit_config(config_text, &rules);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, evaluator::CheckStatus::Pass);
        assert_eq!(status_str(results[0].status), "pass");
    }
}
