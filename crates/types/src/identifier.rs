//! 128-bit opaque identifiers for requesters, requests and resources.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::RequestError;

/// A 128-bit identifier with a version-4 UUID layout.
///
/// Renders as 32 lowercase hex digits with no separators. Parses from that
/// form, from the hyphenated UUID form, and from base64 (as carried by
/// rosbridge JSON messages).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier([u8; 16]);

impl Identifier {
    /// Size of an identifier in bytes.
    pub const BYTES: usize = 16;

    /// Generate a fresh random identifier.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self::from_rng(&mut rand::thread_rng())
    }

    /// Generate an identifier from the given RNG.
    ///
    /// Used by the simulation to get reproducible identifiers from a seed.
    pub fn from_rng(rng: &mut impl Rng) -> Self {
        let mut bytes: [u8; 16] = rng.gen();
        // RFC 4122 version 4, variant 1
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        Self(bytes)
    }

    /// Wrap raw identifier bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Build an identifier from a byte slice, which must be exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RequestError> {
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| RequestError::InvalidIdentifier(format!("{} bytes", bytes.len())))?;
        Ok(Self(arr))
    }

    /// Parse an identifier from hyphenated hex, plain hex or base64 text.
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        let stripped: String = text.chars().filter(|c| *c != '-').collect();
        if stripped.len() == 32 && (text.len() == 32 || is_hyphenated(text)) {
            let mut bytes = [0u8; 16];
            hex::decode_to_slice(&stripped, &mut bytes)
                .map_err(|_| RequestError::InvalidIdentifier(text.to_string()))?;
            return Ok(Self(bytes));
        }

        let decoded = BASE64
            .decode(text)
            .map_err(|_| RequestError::InvalidIdentifier(text.to_string()))?;
        if decoded.len() != Self::BYTES {
            return Err(RequestError::InvalidIdentifier(text.to_string()));
        }
        Self::from_slice(&decoded)
    }

    /// Canonical rendering: lowercase hex, no separators.
    pub fn render(&self) -> String {
        hex::encode(self.0)
    }

    /// Hyphenated 8-4-4-4-12 rendering.
    pub fn to_hyphenated(&self) -> String {
        let hex = self.render();
        format!(
            "{}-{}-{}-{}-{}",
            &hex[0..8],
            &hex[8..12],
            &hex[12..16],
            &hex[16..20],
            &hex[20..32]
        )
    }

    /// Standard base64 rendering of the raw bytes.
    pub fn to_base64(&self) -> String {
        BASE64.encode(self.0)
    }

    /// The fixed-length wire form.
    pub fn to_wire_bytes(self) -> [u8; 16] {
        self.0
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

fn is_hyphenated(text: &str) -> bool {
    let groups: Vec<usize> = text.split('-').map(str::len).collect();
    groups == [8, 4, 4, 4, 12]
}

impl FromStr for Identifier {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.render();
        write!(f, "Identifier({}..)", &hex[..8])
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
