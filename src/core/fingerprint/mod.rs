//! # Fingerprint Module
//!
//! Turns raw image bytes into canonical perceptual fingerprints.
//!
//! ## Supported Algorithms
//! - **pHash (Perceptual Hash)** - DCT-based, the default
//! - **dHash (Difference Hash)** - gradient-based
//! - **aHash (Average Hash)** - mean-based, fastest
//!
//! ## How It Works
//! 1. Decode bytes (zune-jpeg for JPEG, image crate otherwise)
//! 2. Normalize the color model to RGB8
//! 3. Hash with the configured strategy
//! 4. Encode as fixed-width lowercase hex
//!
//! ## Example
//! ```rust,ignore
//! use creative_ghost_finder::core::fingerprint::{AlgorithmKind, FingerprintConfig};
//!
//! let generator = FingerprintConfig::new()
//!     .algorithm(AlgorithmKind::Perceptual)
//!     .hash_size(8)
//!     .build()?;
//!
//! let record = generator.fingerprint_asset(asset)?;
//! ```

mod algorithms;
pub mod decode;
mod traits;

pub use algorithms::{AverageStrategy, DifferenceStrategy, PerceptualStrategy};
pub use decode::{normalize, FastDecoder};
pub use traits::{fingerprint_width, AlgorithmKind, Fingerprint, FingerprintStrategy};

use crate::core::source::ImageAsset;
use crate::core::store::FingerprintRecord;
use crate::error::{ConfigurationError, DecodeError};

/// Default bits per side; 8x8 gives the 16-character fingerprints
pub const DEFAULT_HASH_SIZE: u32 = 8;

/// Configuration builder for fingerprint generators
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    /// Bits per side of the square hash
    hash_size: u32,
    /// Algorithm to use
    algorithm: AlgorithmKind,
}

impl FingerprintConfig {
    /// Create a new configuration with defaults (pHash, 8x8)
    pub fn new() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            algorithm: AlgorithmKind::Perceptual,
        }
    }

    /// Set the hash size (bits per side, even, 2-32)
    ///
    /// Every dataset compared in one run must use the same size.
    pub fn hash_size(mut self, size: u32) -> Self {
        self.hash_size = size;
        self
    }

    /// Set the algorithm
    pub fn algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Fingerprint width in hex characters for this configuration
    pub fn fingerprint_width(&self) -> usize {
        fingerprint_width(self.hash_size)
    }

    /// Build the generator
    pub fn build(self) -> Result<FingerprintGenerator, ConfigurationError> {
        validate_hash_size(self.hash_size)?;

        let strategy: Box<dyn FingerprintStrategy> = match self.algorithm {
            AlgorithmKind::Perceptual => Box::new(PerceptualStrategy::new(self.hash_size)),
            AlgorithmKind::Difference => Box::new(DifferenceStrategy::new(self.hash_size)),
            AlgorithmKind::Average => Box::new(AverageStrategy::new(self.hash_size)),
        };

        Ok(FingerprintGenerator::new(strategy))
    }
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject hash sizes the strategies cannot produce a stable width for
pub fn validate_hash_size(hash_size: u32) -> Result<(), ConfigurationError> {
    if !(2..=32).contains(&hash_size) || hash_size % 2 != 0 {
        return Err(ConfigurationError::InvalidHashSize { value: hash_size });
    }
    Ok(())
}

/// Decodes, normalizes and hashes image assets
pub struct FingerprintGenerator {
    strategy: Box<dyn FingerprintStrategy>,
}

impl FingerprintGenerator {
    /// Wrap a strategy
    pub fn new(strategy: Box<dyn FingerprintStrategy>) -> Self {
        Self { strategy }
    }

    /// The hashing strategy in use
    pub fn kind(&self) -> AlgorithmKind {
        self.strategy.kind()
    }

    /// Fixed fingerprint width in hex characters
    pub fn fingerprint_width(&self) -> usize {
        self.strategy.fingerprint_width()
    }

    /// Fingerprint raw bytes. `identity` labels decode errors.
    pub fn fingerprint_bytes(&self, identity: &str, bytes: &[u8]) -> Result<Fingerprint, DecodeError> {
        let image = FastDecoder::decode(identity, bytes)?;
        Ok(self.strategy.fingerprint_image(&image))
    }

    /// Consume a fetched asset and produce its record.
    ///
    /// The pixel data is dropped here; only identity, fingerprint and
    /// listing metadata survive.
    pub fn fingerprint_asset(&self, asset: ImageAsset) -> Result<FingerprintRecord, DecodeError> {
        let ImageAsset { asset, bytes } = asset;
        let fingerprint = self.fingerprint_bytes(&asset.identity, &bytes)?;
        Ok(FingerprintRecord::new(asset.identity, fingerprint, asset.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::{AssetLocator, AssetRef};
    use crate::core::store::Metadata;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(ImageBuffer::from_fn(48, 48, |x, y| {
            Rgb([(x * 5) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        }));
        let mut bytes = Cursor::new(Vec::new());
        image.write_to(&mut bytes, ImageFormat::Png).unwrap();
        bytes.into_inner()
    }

    fn asset(identity: &str, bytes: Vec<u8>) -> ImageAsset {
        let mut metadata = Metadata::new();
        metadata.insert("file_size".to_string(), bytes.len().to_string());
        ImageAsset {
            asset: AssetRef::new(identity, AssetLocator::Remote(format!("https://example.com/{}", identity)))
                .with_metadata(metadata),
            bytes,
        }
    }

    #[test]
    fn config_defaults_to_phash_8x8() {
        let config = FingerprintConfig::new();
        assert_eq!(config.algorithm, AlgorithmKind::Perceptual);
        assert_eq!(config.fingerprint_width(), 16);
    }

    #[test]
    fn config_builder_works() {
        let config = FingerprintConfig::new()
            .algorithm(AlgorithmKind::Difference)
            .hash_size(16);

        assert_eq!(config.algorithm, AlgorithmKind::Difference);
        assert_eq!(config.fingerprint_width(), 64);
    }

    #[test]
    fn invalid_hash_size_is_rejected() {
        assert!(FingerprintConfig::new().hash_size(7).build().is_err());
        assert!(FingerprintConfig::new().hash_size(0).build().is_err());
        assert!(FingerprintConfig::new().hash_size(64).build().is_err());
    }

    #[test]
    fn fingerprint_asset_keeps_identity_and_metadata() {
        let generator = FingerprintConfig::new().build().unwrap();
        let record = generator
            .fingerprint_asset(asset("ad_creative_1.png", png_bytes()))
            .unwrap();

        assert_eq!(record.identity(), "ad_creative_1.png");
        assert_eq!(record.fingerprint().width(), 16);
        assert!(record.metadata().contains_key("file_size"));
    }

    #[test]
    fn same_bytes_give_same_fingerprint() {
        let generator = FingerprintConfig::new().build().unwrap();
        let bytes = png_bytes();

        let a = generator.fingerprint_bytes("a", &bytes).unwrap();
        let b = generator.fingerprint_bytes("b", &bytes).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn every_algorithm_honours_the_width() {
        for algorithm in [
            AlgorithmKind::Perceptual,
            AlgorithmKind::Difference,
            AlgorithmKind::Average,
        ] {
            let generator = FingerprintConfig::new().algorithm(algorithm).build().unwrap();
            let fingerprint = generator.fingerprint_bytes("x", &png_bytes()).unwrap();
            assert_eq!(fingerprint.width(), generator.fingerprint_width(), "{}", algorithm);
        }
    }

    #[test]
    fn corrupt_bytes_fail_without_panicking() {
        let generator = FingerprintConfig::new().build().unwrap();
        let result = generator.fingerprint_asset(asset("broken.jpg", b"not an image".to_vec()));
        assert!(result.is_err());
    }
}
