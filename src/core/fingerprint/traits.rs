//! Fingerprint value type and the pluggable hashing strategy trait.

use super::decode::normalize;
use crate::error::ValidationError;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// A canonical perceptual fingerprint: fixed-width lowercase hex.
///
/// Construction always lowercases, so two fingerprints of the same hash
/// compare equal as strings regardless of how they were written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Encode raw hash bytes as lowercase hex
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|b| format!("{:02x}", b)).collect())
    }

    /// Parse a hex fingerprint of any width, canonicalizing to lowercase
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyFingerprint);
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::NotHex {
                value: trimmed.to_string(),
            });
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    /// Parse and require an exact width in hex characters
    pub fn parse_with_width(value: &str, expected: usize) -> Result<Self, ValidationError> {
        let fingerprint = Self::parse(value)?;
        if fingerprint.width() != expected {
            return Err(ValidationError::WrongWidth {
                value: fingerprint.0,
                expected,
                actual: value.trim().len(),
            });
        }
        Ok(fingerprint)
    }

    /// The hex string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Width in hex characters
    pub fn width(&self) -> usize {
        self.0.len()
    }

    /// Hamming distance to another fingerprint.
    ///
    /// Nibbles present in only one of the two count as fully different,
    /// so fingerprints of unequal width never compare as close.
    pub fn distance(&self, other: &Self) -> u32 {
        let shared: u32 = self
            .nibbles()
            .zip(other.nibbles())
            .map(|(a, b)| (a ^ b).count_ones())
            .sum();
        let unmatched = self.width().abs_diff(other.width()) as u32 * 4;
        shared + unmatched
    }

    fn nibbles(&self) -> impl Iterator<Item = u8> + '_ {
        // Construction guarantees every char is a hex digit.
        self.0
            .chars()
            .map(|c| c.to_digit(16).unwrap_or(0) as u8)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Available fingerprint algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    /// Perceptual Hash (pHash) - DCT-based, robust to re-encoding and resizing
    Perceptual,
    /// Difference Hash (dHash) - brightness gradients between neighbours
    Difference,
    /// Average Hash (aHash) - brightness against the mean, fastest
    Average,
}

impl AlgorithmKind {
    /// Get a human-readable description of the algorithm
    pub fn description(&self) -> &'static str {
        match self {
            AlgorithmKind::Perceptual => {
                "Perceptual Hash (pHash) - DCT-based, robust to compression and resizing"
            }
            AlgorithmKind::Difference => {
                "Difference Hash (dHash) - Compares brightness gradients between pixels"
            }
            AlgorithmKind::Average => {
                "Average Hash (aHash) - Fast comparison based on average brightness"
            }
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlgorithmKind::Perceptual => write!(f, "pHash"),
            AlgorithmKind::Difference => write!(f, "dHash"),
            AlgorithmKind::Average => write!(f, "aHash"),
        }
    }
}

/// Number of hex characters produced by a square hash of `hash_size` bits per side
pub fn fingerprint_width(hash_size: u32) -> usize {
    let bits = (hash_size * hash_size) as usize;
    bits.div_ceil(8) * 2
}

/// A pluggable hashing transform.
///
/// Implementations must be deterministic and must only ever see RGB8
/// pixels; `fingerprint_image` performs that normalization.
pub trait FingerprintStrategy: Send + Sync {
    /// Hash an image that is already normalized to RGB8
    fn hash_rgb(&self, image: &DynamicImage) -> Fingerprint;

    /// Get the algorithm kind
    fn kind(&self) -> AlgorithmKind;

    /// Bits per side of the square hash
    fn hash_size(&self) -> u32;

    /// Normalize the color model, then hash
    fn fingerprint_image(&self, image: &DynamicImage) -> Fingerprint {
        self.hash_rgb(&normalize(image))
    }

    /// Fixed fingerprint width in hex characters
    fn fingerprint_width(&self) -> usize {
        fingerprint_width(self.hash_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_bytes_is_lowercase_hex() {
        let fingerprint = Fingerprint::from_bytes(&[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(fingerprint.as_str(), "deadbeef");
    }

    #[test]
    fn parse_canonicalizes_case() {
        let fingerprint = Fingerprint::parse("9A65659A9A65659A").unwrap();
        assert_eq!(fingerprint.as_str(), "9a65659a9a65659a");
    }

    #[test]
    fn parse_rejects_empty_and_non_hex() {
        assert_eq!(Fingerprint::parse("  "), Err(ValidationError::EmptyFingerprint));
        assert!(matches!(
            Fingerprint::parse("9a65659a9a65659z"),
            Err(ValidationError::NotHex { .. })
        ));
    }

    #[test]
    fn parse_with_width_rejects_short_values() {
        let result = Fingerprint::parse_with_width("9a65", 16);
        assert!(matches!(
            result,
            Err(ValidationError::WrongWidth {
                expected: 16,
                actual: 4,
                ..
            })
        ));
    }

    #[test]
    fn distance_to_self_is_zero() {
        let fingerprint = Fingerprint::parse("cb2434dbcb2434db").unwrap();
        assert_eq!(fingerprint.distance(&fingerprint), 0);
    }

    #[test]
    fn distance_counts_differing_bits() {
        let a = Fingerprint::parse("ff").unwrap();
        let b = Fingerprint::parse("00").unwrap();
        let c = Fingerprint::parse("fe").unwrap();

        assert_eq!(a.distance(&b), 8);
        assert_eq!(a.distance(&c), 1);
        assert_eq!(b.distance(&a), 8);
    }

    #[test]
    fn unequal_widths_are_far_apart() {
        let a = Fingerprint::parse("ffff").unwrap();
        let b = Fingerprint::parse("ff").unwrap();
        assert_eq!(a.distance(&b), 8);
    }

    #[test]
    fn width_follows_hash_size() {
        assert_eq!(fingerprint_width(8), 16);
        assert_eq!(fingerprint_width(16), 64);
        assert_eq!(fingerprint_width(2), 2);
    }

    #[test]
    fn serde_round_trip_lowercases() {
        let fingerprint: Fingerprint = serde_json::from_str("\"ABCDEF1234567890\"").unwrap();
        assert_eq!(fingerprint.as_str(), "abcdef1234567890");
        assert_eq!(
            serde_json::to_string(&fingerprint).unwrap(),
            "\"abcdef1234567890\""
        );
    }

    #[test]
    fn algorithm_kind_display() {
        assert_eq!(AlgorithmKind::Perceptual.to_string(), "pHash");
        assert_eq!(AlgorithmKind::Difference.to_string(), "dHash");
        assert_eq!(AlgorithmKind::Average.to_string(), "aHash");
    }
}
