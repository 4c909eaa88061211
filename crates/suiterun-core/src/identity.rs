//! Test identifiers
//!
//! A test's identifier is the first 16 bytes of the SHA-1 digest of its
//! UTF-16LE encoded dotted name, laid out as a little-endian GUID. External
//! tooling keys a test's history on it, so it depends on the name only.
//! Execution identifiers are random and distinguish repeated runs.

use sha1::{Digest, Sha1};
use uuid::Uuid;

/// Stable identifier for a test name
pub fn test_id(name: &str) -> Uuid {
    let encoded: Vec<u8> = name.encode_utf16().flat_map(u16::to_le_bytes).collect();
    let digest = Sha1::digest(&encoded);

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes_le(bytes)
}

/// Fresh identifier for one execution of a test (or one run)
pub fn execution_id() -> Uuid {
    Uuid::new_v4()
}
