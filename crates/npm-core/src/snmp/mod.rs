//! SNMPv3 collection stack: BER codec, USM security, and the async transport/session.

pub mod ber;
pub mod transport;
pub mod usm;

use std::net::{SocketAddr, ToSocketAddrs};

use crate::device::Snmpv3Credential;
use crate::error::SnmpError;

pub use transport::Snmpv3Session;

/// Decrypts the credential's stored passwords and opens a session against `host:port`.
///
/// `secret` is the process-wide key used by [`crate::crypto`]; decrypt failures are surfaced as
/// [`SnmpError::Credential`] rather than panicking, since a bad credential is an operational
/// condition (rotated secret, corrupted row), not a programming error.
pub async fn open_session(
    host: &str,
    port: u16,
    secret: &str,
    credential: &Snmpv3Credential,
) -> Result<Snmpv3Session, SnmpError> {
    let addr: SocketAddr = (host, port)
        .to_socket_addrs()
        .map_err(SnmpError::Io)?
        .next()
        .ok_or_else(|| SnmpError::Credential(format!("could not resolve {host}")))?;

    let auth_password = credential
        .auth_password_encrypted
        .as_deref()
        .map(|ct| crate::crypto::decrypt(secret, ct))
        .transpose()
        .map_err(|e| SnmpError::Credential(format!("auth password decrypt failed: {e}")))?;

    let priv_password = credential
        .priv_password_encrypted
        .as_deref()
        .map(|ct| crate::crypto::decrypt(secret, ct))
        .transpose()
        .map_err(|e| SnmpError::Credential(format!("priv password decrypt failed: {e}")))?;

    Snmpv3Session::connect(
        addr,
        credential,
        auth_password.as_deref(),
        priv_password.as_deref(),
    )
    .await
}
