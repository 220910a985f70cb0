//! Per-subsystem error types.
//!
//! No `thiserror`, no `anyhow`: each fallible subsystem gets a small `Debug`-derived enum with a
//! hand-written `Display` and `Error` impl, matching the rest of the codebase.

use std::fmt;

#[derive(Debug)]
pub enum CryptoError {
    /// Ciphertext did not split into exactly iv:tag:ciphertext.
    MalformedCiphertext,
    /// A hex field failed to decode.
    InvalidHex(String),
    /// AEAD encryption or decryption failed (wrong key, tampered ciphertext).
    AeadFailure,
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::MalformedCiphertext => write!(f, "ciphertext is not iv:tag:data"),
            CryptoError::InvalidHex(field) => write!(f, "invalid hex in {field}"),
            CryptoError::AeadFailure => write!(f, "AEAD operation failed"),
        }
    }
}

impl std::error::Error for CryptoError {}

#[derive(Debug)]
pub enum SnmpError {
    /// No response within timeout after all retries.
    Timeout,
    /// Transport-level I/O error.
    Io(std::io::Error),
    /// BER decoding failed.
    Decode(String),
    /// Agent returned an SNMP error-status in the response PDU.
    AgentError { status: i64, index: i64 },
    /// USM authentication failed (bad auth key / tampered message).
    AuthFailure,
    /// Credential was not usable (decrypt failure, unsupported protocol combination).
    Credential(String),
}

impl fmt::Display for SnmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnmpError::Timeout => write!(f, "SNMP request timed out"),
            SnmpError::Io(e) => write!(f, "SNMP I/O error: {e}"),
            SnmpError::Decode(msg) => write!(f, "SNMP decode error: {msg}"),
            SnmpError::AgentError { status, index } => {
                write!(f, "SNMP agent error status={status} index={index}")
            }
            SnmpError::AuthFailure => write!(f, "SNMPv3 USM authentication failed"),
            SnmpError::Credential(msg) => write!(f, "SNMPv3 credential error: {msg}"),
        }
    }
}

impl std::error::Error for SnmpError {}

impl From<std::io::Error> for SnmpError {
    fn from(e: std::io::Error) -> Self {
        SnmpError::Io(e)
    }
}

#[derive(Debug)]
pub enum IcmpError {
    /// The `ping` binary could not be spawned at all.
    Spawn(std::io::Error),
}

impl fmt::Display for IcmpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IcmpError::Spawn(e) => write!(f, "failed to spawn ping: {e}"),
        }
    }
}

impl std::error::Error for IcmpError {}

#[derive(Debug)]
pub enum StigError {
    Io(std::io::Error),
    Zip(String),
    Xml(String),
    Cache(String),
}

impl fmt::Display for StigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StigError::Io(e) => write!(f, "STIG I/O error: {e}"),
            StigError::Zip(msg) => write!(f, "STIG zip error: {msg}"),
            StigError::Xml(msg) => write!(f, "STIG XCCDF parse error: {msg}"),
            StigError::Cache(msg) => write!(f, "STIG index cache error: {msg}"),
        }
    }
}

impl std::error::Error for StigError {}

impl From<std::io::Error> for StigError {
    fn from(e: std::io::Error) -> Self {
        StigError::Io(e)
    }
}

#[derive(Debug)]
pub enum DbError {
    Pool(String),
    Query(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Pool(msg) => write!(f, "database pool error: {msg}"),
            DbError::Query(msg) => write!(f, "database query error: {msg}"),
        }
    }
}

impl std::error::Error for DbError {}

#[derive(Debug)]
pub enum BusError {
    Connect(String),
    Publish(String),
    Stream(String),
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusError::Connect(msg) => write!(f, "NATS connect error: {msg}"),
            BusError::Publish(msg) => write!(f, "NATS publish error: {msg}"),
            BusError::Stream(msg) => write!(f, "NATS stream/consumer error: {msg}"),
        }
    }
}

impl std::error::Error for BusError {}
