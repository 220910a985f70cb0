//! STIG library indexer: scans a directory of ZIP+XCCDF archives, classifies each by platform,
//! and persists/loads the catalogue as a JSON cache.
//!
//! Ports `apps/stig/src/stig/library/{indexer,catalog}.py`'s `STIGLibraryIndexer`/`STIGCatalog`:
//! glob for `*.zip`, parse the XCCDF member inside each, classify platform by keyword, index by
//! platform for lookup, and cache the whole catalogue to `stig_library_index.json`.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::StigError;

pub const CACHE_FILENAME: &str = "stig_library_index.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    CiscoIos,
    CiscoNxos,
    JuniperJunos,
    JuniperSrx,
    AristaEos,
    HpProcurve,
    PaloAlto,
    Fortinet,
    F5Bigip,
    Linux,
    Windows,
    Other,
}

/// Keyword -> platforms, checked against the lowercased benchmark id / title. Ported from
/// `PLATFORM_MAPPINGS`, trimmed to the network-device platforms this catalogue targets.
const PLATFORM_MAPPINGS: &[(&str, &[Platform])] = &[
    ("cisco_ios-xe", &[Platform::CiscoIos]),
    ("cisco_ios-xr", &[Platform::CiscoIos]),
    ("cisco_ios", &[Platform::CiscoIos]),
    ("cisco_nx-os", &[Platform::CiscoNxos]),
    ("cisco_nxos", &[Platform::CiscoNxos]),
    ("cisco_asa", &[Platform::CiscoIos]),
    ("arista_eos", &[Platform::AristaEos]),
    ("arista", &[Platform::AristaEos]),
    ("hp_procurve", &[Platform::HpProcurve]),
    ("hp_flexfabric", &[Platform::HpProcurve]),
    ("juniper_srx", &[Platform::JuniperSrx]),
    ("juniper_router", &[Platform::JuniperJunos]),
    ("juniper_ex", &[Platform::JuniperJunos]),
    ("juniper", &[Platform::JuniperJunos]),
    ("paloalto", &[Platform::PaloAlto]),
    ("palo_alto", &[Platform::PaloAlto]),
    ("fortigate", &[Platform::Fortinet]),
    ("fortinet", &[Platform::Fortinet]),
    ("f5_big-ip", &[Platform::F5Bigip]),
    ("big-ip", &[Platform::F5Bigip]),
    ("rhel", &[Platform::Linux]),
    ("ubuntu", &[Platform::Linux]),
    ("red_hat", &[Platform::Linux]),
    ("windows", &[Platform::Windows]),
    ("microsoft", &[Platform::Windows]),
];

fn classify_platforms(benchmark_id: &str, title: &str) -> Vec<Platform> {
    let hay = format!("{} {}", benchmark_id.to_lowercase(), title.to_lowercase());
    let mut found = BTreeSet::new();
    for (keyword, platforms) in PLATFORM_MAPPINGS {
        if hay.contains(keyword) {
            found.extend(platforms.iter().copied());
        }
    }
    if found.is_empty() {
        vec![Platform::Other]
    } else {
        found.into_iter().collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StigType {
    Stig,
    Srg,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StigRule {
    pub vuln_id: String,
    pub rule_id: String,
    pub title: String,
    pub severity: String,
    pub check_text: String,
    pub fix_text: String,
    pub ccis: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StigEntry {
    pub benchmark_id: String,
    pub title: String,
    pub version: String,
    pub release: i64,
    pub zip_filename: String,
    pub xccdf_path: String,
    pub stig_type: StigType,
    pub description: String,
    pub rules_count: usize,
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub platforms: Vec<Platform>,
    pub ccis: BTreeSet<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StigCatalog {
    entries: BTreeMap<String, StigEntry>,
}

impl StigCatalog {
    pub fn entries(&self) -> impl Iterator<Item = &StigEntry> {
        self.entries.values()
    }

    pub fn get(&self, benchmark_id: &str) -> Option<&StigEntry> {
        self.entries.get(benchmark_id)
    }

    pub fn add_entry(&mut self, entry: StigEntry) {
        self.entries.insert(entry.benchmark_id.clone(), entry);
    }

    pub fn by_platform(&self, platform: Platform) -> Vec<&StigEntry> {
        self.entries.values().filter(|e| e.platforms.contains(&platform)).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Scans `library_path` for `*.zip` files, parses each one's XCCDF member into a [`StigEntry`] +
/// its [`StigRule`]s, and returns the populated catalogue plus rules keyed by benchmark ID.
pub fn scan(library_path: &Path) -> Result<(StigCatalog, BTreeMap<String, Vec<StigRule>>), StigError> {
    let mut catalog = StigCatalog::default();
    let mut rules_by_benchmark = BTreeMap::new();

    for zip_path in find_zip_files(library_path)? {
        match parse_zip(&zip_path) {
            Ok((mut entry, rules)) => {
                entry.platforms = classify_platforms(&entry.benchmark_id, &entry.title);
                rules_by_benchmark.insert(entry.benchmark_id.clone(), rules);
                catalog.add_entry(entry);
            }
            Err(e) => {
                tracing::warn!(file = %zip_path.display(), error = %e, "failed to parse STIG zip");
            }
        }
    }

    Ok((catalog, rules_by_benchmark))
}

fn find_zip_files(library_path: &Path) -> Result<Vec<PathBuf>, StigError> {
    let mut found = Vec::new();
    visit(library_path, &mut found)?;
    Ok(found)
}

fn visit(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), StigError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            visit(&path, found)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some("zip") {
            found.push(path);
        }
    }
    Ok(())
}

/// Opens a STIG ZIP, finds its XCCDF XML member (suffix `xccdf.xml`, or `_STIG_*.xml`), and
/// parses benchmark metadata + rules from it.
pub fn parse_zip(zip_path: &Path) -> Result<(StigEntry, Vec<StigRule>), StigError> {
    let file = std::fs::File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| StigError::Zip(e.to_string()))?;

    let xccdf_index = (0..archive.len())
        .find(|&i| {
            archive
                .by_index(i)
                .ok()
                .map(|f| {
                    let name = f.name().to_lowercase();
                    name.ends_with("xccdf.xml") || name.contains("_stig_")
                })
                .unwrap_or(false)
        })
        .ok_or_else(|| StigError::Zip("no XCCDF XML member found".to_string()))?;

    let mut xccdf_file = archive.by_index(xccdf_index).map_err(|e| StigError::Zip(e.to_string()))?;
    let xccdf_path = xccdf_file.name().to_string();
    let mut xml = String::new();
    xccdf_file.read_to_string(&mut xml).map_err(|e| StigError::Zip(e.to_string()))?;
    drop(xccdf_file);

    let zip_filename = zip_path.file_name().and_then(|n| n.to_str()).unwrap_or_default().to_string();
    super::xccdf::parse_benchmark(&xml, zip_filename, xccdf_path)
}

pub fn cache_path(library_path: &Path) -> PathBuf {
    library_path.join(CACHE_FILENAME)
}

pub fn save_cache(library_path: &Path, catalog: &StigCatalog) -> Result<(), StigError> {
    let json = serde_json::to_string_pretty(catalog).map_err(|e| StigError::Cache(e.to_string()))?;
    std::fs::write(cache_path(library_path), json)?;
    Ok(())
}

pub fn load_cache(library_path: &Path) -> Result<Option<StigCatalog>, StigError> {
    let path = cache_path(library_path);
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let catalog = serde_json::from_str(&data).map_err(|e| StigError::Cache(e.to_string()))?;
    Ok(Some(catalog))
}

/// Loads the cached catalogue if present, otherwise scans `library_path` and writes a fresh
/// cache — matching `get_or_scan`'s cache-first behavior.
pub fn get_or_scan(library_path: &Path, force_rescan: bool) -> Result<StigCatalog, StigError> {
    if !force_rescan {
        if let Some(catalog) = load_cache(library_path)? {
            return Ok(catalog);
        }
    }
    let (catalog, _rules) = scan(library_path)?;
    save_cache(library_path, &catalog)?;
    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_juniper_srx_over_generic_juniper() {
        let platforms = classify_platforms("JUNIPER_SRX_STIG", "Juniper SRX Services Gateway STIG");
        assert!(platforms.contains(&Platform::JuniperSrx));
    }

    #[test]
    fn classifies_cisco_ios_xe() {
        let platforms = classify_platforms("CISCO_IOS-XE_STIG", "Cisco IOS-XE Router STIG");
        assert!(platforms.contains(&Platform::CiscoIos));
    }

    #[test]
    fn unrecognized_benchmark_classifies_as_other() {
        let platforms = classify_platforms("SOME_UNKNOWN_DEVICE", "Unknown Device STIG");
        assert_eq!(platforms, vec![Platform::Other]);
    }

    #[test]
    fn catalog_indexes_by_platform() {
        let mut catalog = StigCatalog::default();
        catalog.add_entry(StigEntry {
            benchmark_id: "JUNIPER_SRX_STIG".to_string(),
            title: "Juniper SRX STIG".to_string(),
            version: "1".to_string(),
            release: 1,
            zip_filename: "juniper_srx.zip".to_string(),
            xccdf_path: "xccdf.xml".to_string(),
            stig_type: StigType::Stig,
            description: String::new(),
            rules_count: 1,
            high_count: 0,
            medium_count: 1,
            low_count: 0,
            platforms: vec![Platform::JuniperSrx],
            ccis: BTreeSet::new(),
        });
        assert_eq!(catalog.by_platform(Platform::JuniperSrx).len(), 1);
        assert_eq!(catalog.by_platform(Platform::CiscoIos).len(), 0);
    }
}
