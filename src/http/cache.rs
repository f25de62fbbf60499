//! HTTP cache validation module
//!
//! Provides content validators (`ETag` values) and conditional request checks.

use std::hash::Hasher;
use std::io::{self, Read};

/// Marker appended to a sidecar validator when its content is served decoded
pub const DECODED_MARKER: char = 'U';

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1 hasher
///
/// Stable across processes and platforms, unlike `DefaultHasher`, so a
/// validator survives restarts as long as the content does not change.
#[derive(Debug, Clone, Copy)]
pub struct Fnv64(u64);

impl Default for Fnv64 {
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for Fnv64 {
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.0 = self.0.wrapping_mul(FNV_PRIME);
            self.0 ^= u64::from(*byte);
        }
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Hash a whole stream
///
/// # Returns
/// The validator string and the number of bytes read
pub fn hash_stream(reader: &mut dyn Read) -> io::Result<(String, u64)> {
    let mut hasher = Fnv64::default();
    let mut buf = [0u8; 8192];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.write(&buf[..n]);
        total += n as u64;
    }

    Ok((to_base36(hasher.finish()), total))
}

/// Validator for in-memory content
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = Fnv64::default();
    hasher.write(content);
    to_base36(hasher.finish())
}

/// Validator used when a sidecar is decoded before sending
pub fn decoded_etag(sidecar_hash: &str) -> String {
    format!("{sidecar_hash}{DECODED_MARKER}")
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Validators are opaque tokens here, only exact equality counts.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|client_etag| client_etag == etag)
}

/// Lower-case base-36 rendering of a 64-bit value
fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if value == 0 {
        return "0".to_string();
    }

    let mut out = Vec::with_capacity(13);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}
