//! Maps an arbitrary structured key to a stable 128-bit identifier, rendered
//! as lowercase hex in the canonical `8-4-4-4-12` dashed form, via the same
//! blake3-based content-addressing technique used elsewhere for hashing
//! data blocks.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::codec::Codec;
use crate::error::{Result, WriteCause};
use crate::value::StoreValue;

/// Regex matching the canonical dashed-hex fingerprint shape. Enumeration
/// relies on exactly this shape to tell structured files apart from
/// everything else in the store folder, including `B_`-prefixed binary
/// records.
pub static FINGERPRINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$",
    )
    .expect("fingerprint regex is valid")
});

/// Prefix marking a binary blob record.
pub const BINARY_PREFIX: &str = "B_";

/// Suffix marking a side file used by the atomic write protocol.
pub const SIDE_FILE_SUFFIX: &str = ".new";

/// Stable 128-bit digest of a logical key, rendered as canonical dashed hex.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    /// Hash an arbitrary key value, encoding it through the store's codec
    /// first so that two keys equal in the data-model sense (not reference
    /// sense) always fingerprint identically.
    pub fn of(key: &StoreValue, codec: &dyn Codec) -> Result<Self> {
        let bytes = codec
            .encode_key(key)
            .map_err(|err| crate::error::StoreError::write("<fingerprint>", WriteCause::Codec(err.to_string())))?;
        Ok(Self::of_bytes(&bytes))
    }

    /// Hash raw bytes directly (used internally and by tests).
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let hash = blake3::hash(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&hash.as_bytes()[..16]);
        Self(out)
    }

    /// Recover the fingerprint a canonical dashed-hex file name encodes.
    /// Used by enumeration to acquire the same per-key lock a concurrent
    /// writer would hold for that file, rather than hashing the name text
    /// itself (which would produce an unrelated fingerprint).
    pub fn parse(rendered: &str) -> Option<Self> {
        let mut out = [0u8; 16];
        let mut nibbles = rendered.chars().filter(|c| *c != '-');
        for byte in out.iter_mut() {
            let hi = nibbles.next()?.to_digit(16)?;
            let lo = nibbles.next()?.to_digit(16)?;
            *byte = ((hi << 4) | lo) as u8;
        }
        if nibbles.next().is_some() {
            return None;
        }
        Some(Self(out))
    }

    /// The bare filename of the structured record for this fingerprint.
    pub fn structured_file_name(&self) -> String {
        self.to_string()
    }

    /// The bare filename of the binary record for this fingerprint.
    pub fn binary_file_name(&self) -> String {
        format!("{BINARY_PREFIX}{self}")
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[0], b[1], b[2], b[3],
            b[4], b[5],
            b[6], b[7],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15],
        )
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}
