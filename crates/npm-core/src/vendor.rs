//! Vendor-adaptive OID resolution.
//!
//! `VendorKind` is a closed sum type and `VendorProfile` is a static capability table keyed by
//! it, rather than scattering `if vendor == "cisco"` string comparisons through the collector.

use serde::{Deserialize, Serialize};

/// The closed set of normalized vendor tags (spec §3/§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorKind {
    Cisco,
    CiscoNxos,
    Juniper,
    PaloAlto,
    Fortinet,
    Arista,
    Sophos,
    Generic,
}

impl VendorKind {
    /// Lowercases the raw vendor field and maps it onto the closed set per spec §4.2's
    /// normalization rule.
    pub fn normalize(raw: &str) -> VendorKind {
        let v = raw.to_lowercase();
        if v.contains("cisco") {
            if v.contains("nexus") || v.contains("nxos") || v.contains("nx-os") {
                return VendorKind::CiscoNxos;
            }
            return VendorKind::Cisco;
        }
        if v.contains("juniper") || v.contains("junos") {
            return VendorKind::Juniper;
        }
        if v.contains("palo") || v.contains("pan-os") || v.contains("panos") {
            return VendorKind::PaloAlto;
        }
        if v.contains("fortinet") || v.contains("fortigate") {
            return VendorKind::Fortinet;
        }
        if v.contains("arista") {
            return VendorKind::Arista;
        }
        if v.contains("sophos") || v.contains("sfos") {
            return VendorKind::Sophos;
        }
        VendorKind::Generic
    }

    pub fn profile(self) -> &'static VendorProfile {
        match self {
            VendorKind::Cisco => &CISCO_IOS,
            VendorKind::CiscoNxos => &CISCO_NXOS,
            VendorKind::Juniper => &JUNIPER,
            VendorKind::PaloAlto => &PALO_ALTO,
            VendorKind::Fortinet => &FORTINET,
            VendorKind::Arista => &ARISTA,
            VendorKind::Sophos => &SOPHOS,
            VendorKind::Generic => &GENERIC,
        }
    }
}

/// How to derive memory utilization from the vendor's OIDs (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub enum MemorySpec {
    /// A single OID that already reports a 0-100 percent.
    UsedPercent(&'static str),
    /// A used/free pair of byte counters; percent = used/(used+free)*100.
    UsedFreePair {
        used: &'static str,
        free: &'static str,
    },
    /// A single OID reporting total memory in KiB, upscaled to bytes (no percent derivable).
    TotalKib(&'static str),
}

/// How to derive disk utilization from the vendor's OIDs (spec §4.2).
#[derive(Debug, Clone, Copy)]
pub enum DiskSpec {
    /// A percent OID plus a capacity-in-MiB OID.
    PercentAndCapacityMib {
        percent: &'static str,
        capacity_mib: &'static str,
    },
    /// No vendor-specific OIDs; walk the generic `hrStorageTable`.
    GenericHrStorageTable,
}

/// A vendor's OID/capability table. Resolved once per poll via `VendorKind::profile`.
pub struct VendorProfile {
    pub kind: VendorKind,
    /// Tried in order until one returns a value in `[0, 100]` (spec §4.2).
    pub cpu_oids: &'static [&'static str],
    pub memory: MemorySpec,
    pub disk: DiskSpec,
    /// `sophos` only: (oid, service_name) pairs for the 20-OID service-status table (spec §4.2
    /// step 6 / §6).
    pub service_status_oids: &'static [(&'static str, &'static str)],
}

pub const SYS_UP_TIME: &str = "1.3.6.1.2.1.1.3.0";
pub const IF_NUMBER: &str = "1.3.6.1.2.1.2.1.0";

// Standard `ifTable` (IF-MIB) columns, walked per interface during the interface step of a
// poll cycle (spec §4.2 step 5). Column index is appended with a dotted `ifIndex` suffix.
pub const IF_TABLE_DESCR: &str = "1.3.6.1.2.1.2.2.1.2";
pub const IF_TABLE_SPEED: &str = "1.3.6.1.2.1.2.2.1.5";
pub const IF_TABLE_ADMIN_STATUS: &str = "1.3.6.1.2.1.2.2.1.7";
pub const IF_TABLE_OPER_STATUS: &str = "1.3.6.1.2.1.2.2.1.8";
pub const IF_TABLE_IN_OCTETS: &str = "1.3.6.1.2.1.2.2.1.10";
pub const IF_TABLE_IN_ERRORS: &str = "1.3.6.1.2.1.2.2.1.14";
pub const IF_TABLE_OUT_OCTETS: &str = "1.3.6.1.2.1.2.2.1.16";
pub const IF_TABLE_OUT_ERRORS: &str = "1.3.6.1.2.1.2.2.1.20";
pub const IF_TABLE_IN_DISCARDS: &str = "1.3.6.1.2.1.2.2.1.13";
pub const IF_TABLE_OUT_DISCARDS: &str = "1.3.6.1.2.1.2.2.1.19";

// `ifXTable` (IF-MIB, RFC 2233/2863) columns: 64-bit octet counters and Mbps-scaled high speed,
// preferred over the 32-bit `ifTable` columns above when a device's agent exposes them (spec
// §4.2 step 5: "prefer 64-bit ifHC*, fall back to 32-bit if*" / "prefer ifHighSpeed, else
// ifSpeed÷1e6").
pub const IFX_TABLE_HIGH_SPEED: &str = "1.3.6.1.2.1.31.1.1.1.15";
pub const IFX_TABLE_HC_IN_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.6";
pub const IFX_TABLE_HC_OUT_OCTETS: &str = "1.3.6.1.2.1.31.1.1.1.10";

pub const HR_PROCESSOR_LOAD: &str = "1.3.6.1.2.1.25.3.3.1.2.1";

// `hrStorageTable` (HOST-RESOURCES-MIB), used for the generic disk fallback (spec §4.2 step 4).
pub const HR_STORAGE_TABLE: &str = "1.3.6.1.2.1.25.2.3.1";
pub const HR_STORAGE_DESCR: &str = "1.3.6.1.2.1.25.2.3.1.3";
pub const HR_STORAGE_ALLOC_UNITS: &str = "1.3.6.1.2.1.25.2.3.1.4";
pub const HR_STORAGE_SIZE: &str = "1.3.6.1.2.1.25.2.3.1.5";
pub const HR_STORAGE_USED: &str = "1.3.6.1.2.1.25.2.3.1.6";

const CISCO_CPU_OIDS: &[&str] = &[
    "1.3.6.1.4.1.9.9.109.1.1.1.1.8.1", // cpmCPUTotal5minRev.1
    "1.3.6.1.4.1.9.9.109.1.1.1.1.5.1", // cpmCPUTotal5min.1 (legacy)
    HR_PROCESSOR_LOAD,
];

static CISCO_IOS: VendorProfile = VendorProfile {
    kind: VendorKind::Cisco,
    cpu_oids: CISCO_CPU_OIDS,
    memory: MemorySpec::UsedFreePair {
        used: "1.3.6.1.4.1.9.9.48.1.1.1.5.1", // ciscoMemoryPoolUsed.1
        free: "1.3.6.1.4.1.9.9.48.1.1.1.6.1", // ciscoMemoryPoolFree.1
    },
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

static CISCO_NXOS: VendorProfile = VendorProfile {
    kind: VendorKind::CiscoNxos,
    cpu_oids: CISCO_CPU_OIDS,
    memory: MemorySpec::UsedFreePair {
        used: "1.3.6.1.4.1.9.9.48.1.1.1.5.1",
        free: "1.3.6.1.4.1.9.9.48.1.1.1.6.1",
    },
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

static JUNIPER: VendorProfile = VendorProfile {
    kind: VendorKind::Juniper,
    cpu_oids: &[
        "1.3.6.1.4.1.2636.3.1.13.1.8.9.1.0.0", // jnxOperatingCPU (routing engine)
        HR_PROCESSOR_LOAD,
    ],
    memory: MemorySpec::UsedPercent("1.3.6.1.4.1.2636.3.1.13.1.11.9.1.0.0"), // jnxOperatingBuffer
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

static PALO_ALTO: VendorProfile = VendorProfile {
    kind: VendorKind::PaloAlto,
    cpu_oids: &["1.3.6.1.4.1.25461.2.1.2.1.1.0", HR_PROCESSOR_LOAD], // panSysCPUAverage
    memory: MemorySpec::UsedPercent("1.3.6.1.4.1.25461.2.1.2.1.2.0"), // panSysMemoryUtilization
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

static FORTINET: VendorProfile = VendorProfile {
    kind: VendorKind::Fortinet,
    cpu_oids: &["1.3.6.1.4.1.12356.101.4.1.3.0", HR_PROCESSOR_LOAD], // fgSysCpuUsage
    memory: MemorySpec::UsedPercent("1.3.6.1.4.1.12356.101.4.1.4.0"), // fgSysMemUsage
    disk: DiskSpec::PercentAndCapacityMib {
        percent: "1.3.6.1.4.1.12356.101.4.1.6.0",      // fgSysDiskUsage
        capacity_mib: "1.3.6.1.4.1.12356.101.4.1.7.0",  // fgSysDiskCapacity
    },
    service_status_oids: &[],
};

static ARISTA: VendorProfile = VendorProfile {
    kind: VendorKind::Arista,
    cpu_oids: &[HR_PROCESSOR_LOAD],
    memory: MemorySpec::TotalKib("1.3.6.1.2.1.25.2.2.0"), // hrMemorySize
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

/// Sophos UTM/XG exposes a ~20-OID service-status table (spec §4.2 step 6 / §6). Each value is
/// interpreted: integer `1` or the strings `running|active|enabled|up` (case-insensitive) mean
/// the service is up.
static SOPHOS_SERVICES: &[(&str, &str)] = &[
    ("1.3.6.1.4.1.2604.1.1.1.1", "http_proxy"),
    ("1.3.6.1.4.1.2604.1.1.1.2", "smtp_proxy"),
    ("1.3.6.1.4.1.2604.1.1.1.3", "pop3_proxy"),
    ("1.3.6.1.4.1.2604.1.1.1.4", "dns"),
    ("1.3.6.1.4.1.2604.1.1.1.5", "ips"),
    ("1.3.6.1.4.1.2604.1.1.1.6", "webadmin"),
    ("1.3.6.1.4.1.2604.1.1.1.7", "network"),
    ("1.3.6.1.4.1.2604.1.1.1.8", "vpn"),
];

static SOPHOS: VendorProfile = VendorProfile {
    kind: VendorKind::Sophos,
    cpu_oids: &["1.3.6.1.4.1.2604.1.1.2.1.0", HR_PROCESSOR_LOAD],
    memory: MemorySpec::UsedPercent("1.3.6.1.4.1.2604.1.1.3.1.0"),
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: SOPHOS_SERVICES,
};

static GENERIC: VendorProfile = VendorProfile {
    kind: VendorKind::Generic,
    cpu_oids: &[HR_PROCESSOR_LOAD],
    memory: MemorySpec::TotalKib("1.3.6.1.2.1.25.2.2.0"),
    disk: DiskSpec::GenericHrStorageTable,
    service_status_oids: &[],
};

/// Interprets a Sophos service-status scalar value as up/down (spec §4.2 step 6).
pub fn sophos_service_up(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "1" || v == "running" || v == "active" || v == "enabled" || v == "up"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_cisco_nxos_variants() {
        assert_eq!(VendorKind::normalize("Cisco Nexus 9000"), VendorKind::CiscoNxos);
        assert_eq!(VendorKind::normalize("cisco-nxos"), VendorKind::CiscoNxos);
        assert_eq!(VendorKind::normalize("NX-OS"), VendorKind::Generic); // no "cisco" token
        assert_eq!(VendorKind::normalize("Cisco IOS XE"), VendorKind::Cisco);
    }

    #[test]
    fn normalizes_other_vendors() {
        assert_eq!(VendorKind::normalize("PAN-OS 10.1"), VendorKind::PaloAlto);
        assert_eq!(VendorKind::normalize("FortiGate 100F"), VendorKind::Fortinet);
        assert_eq!(VendorKind::normalize("Sophos SFOS"), VendorKind::Sophos);
        assert_eq!(VendorKind::normalize("Arista EOS"), VendorKind::Arista);
        assert_eq!(VendorKind::normalize("Juniper JUNOS"), VendorKind::Juniper);
        assert_eq!(VendorKind::normalize("Linux server"), VendorKind::Generic);
    }

    #[test]
    fn sophos_service_interpretation() {
        assert!(sophos_service_up("1"));
        assert!(sophos_service_up("Running"));
        assert!(sophos_service_up("ACTIVE"));
        assert!(!sophos_service_up("0"));
        assert!(!sophos_service_up("stopped"));
    }

    #[test]
    fn cisco_memory_pair_matches_happy_path_scenario() {
        // spec §8 scenario 1: used=100_000_000, free=400_000_000 -> total=500_000_000, 20%.
        let used: u64 = 100_000_000;
        let free: u64 = 400_000_000;
        let total = used + free;
        let pct = used as f64 / total as f64 * 100.0;
        assert_eq!(total, 500_000_000);
        assert!((pct - 20.0).abs() < 1e-9);
        match CISCO_IOS.memory {
            MemorySpec::UsedFreePair { .. } => {}
            _ => panic!("expected UsedFreePair for Cisco IOS"),
        }
    }
}
