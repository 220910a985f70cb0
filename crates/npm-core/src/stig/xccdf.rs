//! XCCDF benchmark XML parsing.
//!
//! DISA STIG/SRG ZIPs carry one XCCDF XML document per benchmark: a `Benchmark` root with
//! `title`/`version`/`plain-text id="release-info"`, and a flat sequence of `Group` elements each
//! wrapping one `Rule` (id, title, severity attribute, description, `check/check-content`,
//! `fixtext`, and zero or more `ident system="...cci..."` CCI references). This streams the
//! document with `quick-xml` rather than building a DOM, the way a one-pass scan over a
//! multi-megabyte benchmark should.

use std::collections::BTreeSet;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::indexer::{StigEntry, StigRule, StigType};
use crate::error::StigError;

/// Parses a full XCCDF `Benchmark` document into its [`StigEntry`] metadata plus every
/// contained [`StigRule`].
pub fn parse_benchmark(xml: &str, zip_filename: String, xccdf_path: String) -> Result<(StigEntry, Vec<StigRule>), StigError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut benchmark_id = String::new();
    let mut title = String::new();
    let mut version = String::new();
    let mut release: i64 = 0;

    let mut rules = Vec::new();
    let mut in_rule = false;
    let mut current: Option<RuleBuilder> = None;
    let mut text_target: Option<TextTarget> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(|e| StigError::Xml(e.to_string()))? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) => {
                let name = local_name(e.name().as_ref());
                match name.as_str() {
                    "Benchmark" => {
                        for attr in e.attributes().flatten() {
                            if local_name(attr.key.as_ref()) == "id" {
                                benchmark_id = attr.unescape_value().unwrap_or_default().to_string();
                            }
                        }
                    }
                    "Rule" => {
                        in_rule = true;
                        let mut rule_id = String::new();
                        let mut severity = "medium".to_string();
                        for attr in e.attributes().flatten() {
                            match local_name(attr.key.as_ref()).as_str() {
                                "id" => rule_id = attr.unescape_value().unwrap_or_default().to_string(),
                                "severity" => severity = attr.unescape_value().unwrap_or_default().to_string(),
                                _ => {}
                            }
                        }
                        current = Some(RuleBuilder { rule_id, severity, ..Default::default() });
                    }
                    "title" if !in_rule && title.is_empty() => {
                        text_target = Some(TextTarget::BenchmarkTitle);
                    }
                    "title" if in_rule => text_target = Some(TextTarget::RuleTitle),
                    "version" if !in_rule => text_target = Some(TextTarget::Version),
                    "check-content" if in_rule => text_target = Some(TextTarget::CheckContent),
                    "fixtext" if in_rule => text_target = Some(TextTarget::FixText),
                    "ident" if in_rule => {
                        let is_cci = e
                            .attributes()
                            .flatten()
                            .any(|a| local_name(a.key.as_ref()) == "system" && a.unescape_value().unwrap_or_default().to_lowercase().contains("cci"));
                        if is_cci {
                            text_target = Some(TextTarget::Cci);
                        }
                    }
                    "plain-text" => {
                        let is_release_info = e.attributes().flatten().any(|a| {
                            local_name(a.key.as_ref()) == "id"
                                && a.unescape_value().unwrap_or_default() == "release-info"
                        });
                        if is_release_info {
                            text_target = Some(TextTarget::ReleaseInfo);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(e) => {
                if let Some(target) = &text_target {
                    let text = e.unescape().unwrap_or_default().to_string();
                    match target {
                        TextTarget::BenchmarkTitle => title = text,
                        TextTarget::Version => version = text,
                        TextTarget::ReleaseInfo => release = parse_release(&text),
                        TextTarget::RuleTitle => {
                            if let Some(r) = current.as_mut() {
                                r.title = text;
                            }
                        }
                        TextTarget::CheckContent => {
                            if let Some(r) = current.as_mut() {
                                r.check_text.push_str(&text);
                            }
                        }
                        TextTarget::FixText => {
                            if let Some(r) = current.as_mut() {
                                r.fix_text.push_str(&text);
                            }
                        }
                        TextTarget::Cci => {
                            if let Some(r) = current.as_mut() {
                                r.ccis.insert(text);
                            }
                        }
                    }
                }
            }
            Event::End(e) => {
                let name = local_name(e.name().as_ref());
                if name == "Rule" {
                    if let Some(builder) = current.take() {
                        rules.push(builder.finish());
                    }
                    in_rule = false;
                }
                text_target = None;
            }
            _ => {}
        }
        buf.clear();
    }

    if benchmark_id.is_empty() {
        return Err(StigError::Xml("Benchmark element missing id attribute".to_string()));
    }

    let mut high_count = 0;
    let mut medium_count = 0;
    let mut low_count = 0;
    let mut all_ccis = BTreeSet::new();
    for rule in &rules {
        match rule.severity.as_str() {
            "high" => high_count += 1,
            "low" => low_count += 1,
            _ => medium_count += 1,
        }
        all_ccis.extend(rule.ccis.iter().cloned());
    }

    let stig_type = if benchmark_id.to_uppercase().contains("SRG") { StigType::Srg } else { StigType::Stig };

    let entry = StigEntry {
        benchmark_id,
        title,
        version,
        release,
        zip_filename,
        xccdf_path,
        stig_type,
        description: String::new(),
        rules_count: rules.len(),
        high_count,
        medium_count,
        low_count,
        platforms: Vec::new(),
        ccis: all_ccis,
    };

    Ok((entry, rules))
}

#[derive(Default)]
struct RuleBuilder {
    rule_id: String,
    title: String,
    severity: String,
    check_text: String,
    fix_text: String,
    ccis: BTreeSet<String>,
}

impl RuleBuilder {
    fn finish(self) -> StigRule {
        let vuln_id = self.rule_id.split('_').next().unwrap_or(&self.rule_id).to_string();
        StigRule {
            vuln_id,
            rule_id: self.rule_id,
            title: self.title,
            severity: self.severity,
            check_text: self.check_text,
            fix_text: self.fix_text,
            ccis: self.ccis,
        }
    }
}

enum TextTarget {
    BenchmarkTitle,
    Version,
    ReleaseInfo,
    RuleTitle,
    CheckContent,
    FixText,
    Cci,
}

fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    s.rsplit(':').next().unwrap_or(&s).to_string()
}

/// Extracts the release number from XCCDF's free-text `release-info` string, e.g.
/// `"Release: 6 Benchmark Date: 26 Jan 2024"` -> `6`.
fn parse_release(text: &str) -> i64 {
    let Some(pos) = text.find("Release:") else { return 0 };
    text[pos + "Release:".len()..]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Benchmark xmlns="http://checklists.nist.gov/xccdf/1.2" id="JUNIPER_SRX_STIG">
  <title>Juniper SRX Services Gateway Security Technical Implementation Guide</title>
  <plain-text id="release-info">Release: 6 Benchmark Date: 26 Jan 2024</plain-text>
  <version>2</version>
  <Group id="V-214518">
    <Rule id="SV-214518r997541_rule" severity="high">
      <title>SSH must be limited to FIPS-validated algorithms.</title>
      <check>
        <check-content>Verify SSH is configured to use FIPS-validated ciphers.</check-content>
      </check>
      <fixtext>Set system services ssh ciphers to FIPS-approved values.</fixtext>
      <ident system="http://cyber.mil/cci">CCI-000803</ident>
    </Rule>
  </Group>
</Benchmark>"#;

    #[test]
    fn parses_benchmark_metadata() {
        let (entry, rules) = parse_benchmark(SAMPLE, "juniper_srx.zip".to_string(), "xccdf.xml".to_string()).unwrap();
        assert_eq!(entry.benchmark_id, "JUNIPER_SRX_STIG");
        assert_eq!(entry.version, "2");
        assert_eq!(entry.release, 6);
        assert_eq!(entry.rules_count, 1);
        assert_eq!(entry.high_count, 1);
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn parses_rule_fields_and_cci() {
        let (_, rules) = parse_benchmark(SAMPLE, "juniper_srx.zip".to_string(), "xccdf.xml".to_string()).unwrap();
        let rule = &rules[0];
        assert_eq!(rule.vuln_id, "SV-214518r997541");
        assert!(rule.title.contains("FIPS-validated"));
        assert!(rule.check_text.contains("FIPS-validated ciphers"));
        assert!(rule.ccis.contains("CCI-000803"));
    }

    #[test]
    fn missing_benchmark_id_is_an_error() {
        let bad = r#"<Benchmark><title>No id</title></Benchmark>"#;
        assert!(parse_benchmark(bad, "x.zip".to_string(), "x.xml".to_string()).is_err());
    }
}
