//! Minimal BER/DER codec for the SNMP PDU subset used by this collector.
//!
//! Covers the universal types (`INTEGER`, `OCTET STRING`, `NULL`, `OBJECT IDENTIFIER`,
//! `SEQUENCE`), the SNMP application types (`IpAddress`, `Counter32`, `Gauge32`, `TimeTicks`,
//! `Opaque`, `Counter64`), and the varbind exception values (`noSuchObject`, `noSuchInstance`,
//! `endOfMibView`). No attempt is made at a general ASN.1 library — only what SNMPv3 GET/GETNEXT
//! traffic actually uses.

use crate::error::SnmpError;

pub const TAG_INTEGER: u8 = 0x02;
pub const TAG_OCTET_STRING: u8 = 0x04;
pub const TAG_NULL: u8 = 0x05;
pub const TAG_OID: u8 = 0x06;
pub const TAG_SEQUENCE: u8 = 0x30;

pub const TAG_IP_ADDRESS: u8 = 0x40;
pub const TAG_COUNTER32: u8 = 0x41;
pub const TAG_GAUGE32: u8 = 0x42;
pub const TAG_TIME_TICKS: u8 = 0x43;
pub const TAG_OPAQUE: u8 = 0x44;
pub const TAG_COUNTER64: u8 = 0x46;

pub const TAG_NO_SUCH_OBJECT: u8 = 0x80;
pub const TAG_NO_SUCH_INSTANCE: u8 = 0x81;
pub const TAG_END_OF_MIB_VIEW: u8 = 0x82;

pub const TAG_GET_REQUEST: u8 = 0xA0;
pub const TAG_GET_NEXT_REQUEST: u8 = 0xA1;
pub const TAG_GET_RESPONSE: u8 = 0xA2;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    OctetString(Vec<u8>),
    Null,
    Oid(Vec<u32>),
    Sequence(Vec<Value>),
    /// A tagged constructed value whose tag isn't `SEQUENCE` (e.g. a PDU: `0xA0`..`0xA2`).
    Tagged(u8, Vec<Value>),
    IpAddress([u8; 4]),
    Counter32(u32),
    Gauge32(u32),
    TimeTicks(u32),
    Opaque(Vec<u8>),
    Counter64(u64),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl Value {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v as i64),
            Value::Counter64(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_str_lossy(&self) -> Option<String> {
        match self {
            Value::OctetString(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}

/// Encodes a BER length. Short form for <128, long form otherwise.
fn encode_len(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let first_nonzero = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len() - 1);
        let significant = &bytes[first_nonzero..];
        out.push(0x80 | significant.len() as u8);
        out.extend_from_slice(significant);
    }
}

fn encode_tlv(tag: u8, content: &[u8], out: &mut Vec<u8>) {
    out.push(tag);
    encode_len(content.len(), out);
    out.extend_from_slice(content);
}

/// Minimal-length two's-complement encoding, as BER INTEGER requires.
fn encode_signed_int(value: i64, out: &mut Vec<u8>) {
    let mut bytes = value.to_be_bytes().to_vec();
    while bytes.len() > 1 {
        let (b0, b1) = (bytes[0], bytes[1]);
        let redundant_zero = b0 == 0x00 && b1 & 0x80 == 0;
        let redundant_ff = b0 == 0xFF && b1 & 0x80 != 0;
        if redundant_zero || redundant_ff {
            bytes.remove(0);
        } else {
            break;
        }
    }
    out.extend_from_slice(&bytes);
}

/// Encodes an unsigned value with a leading 0x00 pad if the high bit would otherwise make it
/// look negative (used for the OCTET-STRING-like application types that are really unsigned
/// integers: Counter32, Gauge32, TimeTicks, Counter64).
fn encode_unsigned_int(value: u64, out: &mut Vec<u8>) {
    let full = value.to_be_bytes();
    let first_nonzero = full.iter().position(|b| *b != 0);
    let mut bytes = match first_nonzero {
        Some(idx) => full[idx..].to_vec(),
        None => vec![0u8],
    };
    if bytes[0] & 0x80 != 0 {
        bytes.insert(0, 0);
    }
    out.extend_from_slice(&bytes);
}

fn encode_oid(arcs: &[u32], out: &mut Vec<u8>) {
    assert!(arcs.len() >= 2, "OID must have at least two arcs");
    let mut content = Vec::new();
    content.push((arcs[0] * 40 + arcs[1]) as u8);
    for &arc in &arcs[2..] {
        let mut chunks = Vec::new();
        let mut v = arc;
        chunks.push((v & 0x7F) as u8);
        v >>= 7;
        while v > 0 {
            chunks.push(((v & 0x7F) as u8) | 0x80);
            v >>= 7;
        }
        chunks.reverse();
        content.extend_from_slice(&chunks);
    }
    encode_tlv(TAG_OID, &content, out);
}

pub fn encode(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Integer(v) => {
            let mut content = Vec::new();
            encode_signed_int(*v, &mut content);
            encode_tlv(TAG_INTEGER, &content, out);
        }
        Value::OctetString(bytes) => encode_tlv(TAG_OCTET_STRING, bytes, out),
        Value::Null => encode_tlv(TAG_NULL, &[], out),
        Value::Oid(arcs) => encode_oid(arcs, out),
        Value::Sequence(items) => {
            let mut content = Vec::new();
            for item in items {
                encode_into(item, &mut content);
            }
            encode_tlv(TAG_SEQUENCE, &content, out);
        }
        Value::Tagged(tag, items) => {
            let mut content = Vec::new();
            for item in items {
                encode_into(item, &mut content);
            }
            encode_tlv(*tag, &content, out);
        }
        Value::IpAddress(octets) => encode_tlv(TAG_IP_ADDRESS, octets, out),
        Value::Counter32(v) => {
            let mut content = Vec::new();
            encode_unsigned_int(*v as u64, &mut content);
            encode_tlv(TAG_COUNTER32, &content, out);
        }
        Value::Gauge32(v) => {
            let mut content = Vec::new();
            encode_unsigned_int(*v as u64, &mut content);
            encode_tlv(TAG_GAUGE32, &content, out);
        }
        Value::TimeTicks(v) => {
            let mut content = Vec::new();
            encode_unsigned_int(*v as u64, &mut content);
            encode_tlv(TAG_TIME_TICKS, &content, out);
        }
        Value::Opaque(bytes) => encode_tlv(TAG_OPAQUE, bytes, out),
        Value::Counter64(v) => {
            let mut content = Vec::new();
            encode_unsigned_int(*v, &mut content);
            encode_tlv(TAG_COUNTER64, &content, out);
        }
        Value::NoSuchObject => encode_tlv(TAG_NO_SUCH_OBJECT, &[], out),
        Value::NoSuchInstance => encode_tlv(TAG_NO_SUCH_INSTANCE, &[], out),
        Value::EndOfMibView => encode_tlv(TAG_END_OF_MIB_VIEW, &[], out),
    }
}

fn decode_len(input: &[u8]) -> Result<(usize, &[u8]), SnmpError> {
    let (&first, rest) = input
        .split_first()
        .ok_or_else(|| SnmpError::Decode("truncated length".into()))?;
    if first & 0x80 == 0 {
        return Ok((first as usize, rest));
    }
    let n = (first & 0x7F) as usize;
    if rest.len() < n {
        return Err(SnmpError::Decode("truncated long-form length".into()));
    }
    let mut len = 0usize;
    for &b in &rest[..n] {
        len = (len << 8) | b as usize;
    }
    Ok((len, &rest[n..]))
}

fn decode_oid(content: &[u8]) -> Result<Vec<u32>, SnmpError> {
    if content.is_empty() {
        return Ok(vec![]);
    }
    let mut arcs = Vec::new();
    let first = content[0];
    arcs.push((first / 40) as u32);
    arcs.push((first % 40) as u32);
    let mut value: u32 = 0;
    for &b in &content[1..] {
        value = (value << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            arcs.push(value);
            value = 0;
        }
    }
    Ok(arcs)
}

fn decode_unsigned(content: &[u8]) -> u64 {
    let mut v: u64 = 0;
    for &b in content {
        v = (v << 8) | b as u64;
    }
    v
}

fn decode_signed(content: &[u8]) -> i64 {
    if content.is_empty() {
        return 0;
    }
    let negative = content[0] & 0x80 != 0;
    let mut v: i64 = if negative { -1 } else { 0 };
    for &b in content {
        v = (v << 8) | b as i64;
    }
    v
}

/// Decodes one TLV, returning the value and the remaining bytes after it.
pub fn decode(input: &[u8]) -> Result<(Value, &[u8]), SnmpError> {
    let (&tag, rest) = input
        .split_first()
        .ok_or_else(|| SnmpError::Decode("truncated tag".into()))?;
    let (len, rest) = decode_len(rest)?;
    if rest.len() < len {
        return Err(SnmpError::Decode("truncated content".into()));
    }
    let (content, remainder) = rest.split_at(len);

    let value = match tag {
        TAG_INTEGER => Value::Integer(decode_signed(content)),
        TAG_OCTET_STRING => Value::OctetString(content.to_vec()),
        TAG_NULL => Value::Null,
        TAG_OID => Value::Oid(decode_oid(content)?),
        TAG_SEQUENCE => Value::Sequence(decode_all(content)?),
        TAG_IP_ADDRESS => {
            let mut octets = [0u8; 4];
            if content.len() == 4 {
                octets.copy_from_slice(content);
            }
            Value::IpAddress(octets)
        }
        TAG_COUNTER32 => Value::Counter32(decode_unsigned(content) as u32),
        TAG_GAUGE32 => Value::Gauge32(decode_unsigned(content) as u32),
        TAG_TIME_TICKS => Value::TimeTicks(decode_unsigned(content) as u32),
        TAG_OPAQUE => Value::Opaque(content.to_vec()),
        TAG_COUNTER64 => Value::Counter64(decode_unsigned(content)),
        TAG_NO_SUCH_OBJECT => Value::NoSuchObject,
        TAG_NO_SUCH_INSTANCE => Value::NoSuchInstance,
        TAG_END_OF_MIB_VIEW => Value::EndOfMibView,
        t if t & 0x20 != 0 => Value::Tagged(t, decode_all(content)?),
        t => return Err(SnmpError::Decode(format!("unsupported tag 0x{t:02x}"))),
    };

    Ok((value, remainder))
}

/// Decodes every TLV in `input` until exhausted (used for SEQUENCE/PDU contents).
pub fn decode_all(mut input: &[u8]) -> Result<Vec<Value>, SnmpError> {
    let mut items = Vec::new();
    while !input.is_empty() {
        let (value, rest) = decode(input)?;
        items.push(value);
        input = rest;
    }
    Ok(items)
}

pub fn parse_oid(dotted: &str) -> Vec<u32> {
    dotted
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().expect("OID constants are well-formed"))
        .collect()
}

pub fn oid_to_string(arcs: &[u32]) -> String {
    arcs.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// True if `candidate` is equal to or a descendant of `root` — used to terminate a WALK.
pub fn is_descendant_or_equal(root: &[u32], candidate: &[u32]) -> bool {
    candidate.len() >= root.len() && candidate[..root.len()] == *root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_integer() {
        for v in [0i64, 1, -1, 127, 128, -128, -129, 1_000_000, -1_000_000] {
            let enc = encode(&Value::Integer(v));
            let (dec, rest) = decode(&enc).unwrap();
            assert!(rest.is_empty());
            assert_eq!(dec, Value::Integer(v));
        }
    }

    #[test]
    fn round_trips_oid() {
        let oid = parse_oid("1.3.6.1.2.1.1.3.0");
        let enc = encode(&Value::Oid(oid.clone()));
        let (dec, _) = decode(&enc).unwrap();
        assert_eq!(dec, Value::Oid(oid));
    }

    #[test]
    fn round_trips_counter64() {
        let enc = encode(&Value::Counter64(u64::MAX));
        let (dec, _) = decode(&enc).unwrap();
        assert_eq!(dec, Value::Counter64(u64::MAX));
    }

    #[test]
    fn round_trips_sequence_of_mixed_values() {
        let seq = Value::Sequence(vec![
            Value::Integer(42),
            Value::OctetString(b"public".to_vec()),
            Value::Null,
        ]);
        let enc = encode(&seq);
        let (dec, _) = decode(&enc).unwrap();
        assert_eq!(dec, seq);
    }

    #[test]
    fn descendant_check_terminates_walk() {
        let root = parse_oid("1.3.6.1.2.1.2.2.1.2");
        let inside = parse_oid("1.3.6.1.2.1.2.2.1.2.1");
        let outside = parse_oid("1.3.6.1.2.1.2.2.1.3");
        assert!(is_descendant_or_equal(&root, &root));
        assert!(is_descendant_or_equal(&root, &inside));
        assert!(!is_descendant_or_equal(&root, &outside));
    }

    #[test]
    fn exception_values_round_trip() {
        for v in [Value::NoSuchObject, Value::NoSuchInstance, Value::EndOfMibView] {
            let enc = encode(&v);
            let (dec, _) = decode(&enc).unwrap();
            assert_eq!(dec, v);
            assert!(dec.is_exception());
        }
    }
}
