//! Average Hash (aHash) implementation.
//!
//! aHash downscales to grayscale and sets one bit per pixel brighter than
//! the mean.

use super::super::traits::{AlgorithmKind, Fingerprint, FingerprintStrategy};
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// Average Hash (aHash) strategy
pub struct AverageStrategy {
    hash_size: u32,
    hasher: image_hasher::Hasher,
}

impl AverageStrategy {
    /// Create a new aHash strategy with `hash_size` bits per side
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .to_hasher();

        Self { hash_size, hasher }
    }
}

impl FingerprintStrategy for AverageStrategy {
    fn hash_rgb(&self, image: &DynamicImage) -> Fingerprint {
        Fingerprint::from_bytes(self.hasher.hash_image(image).as_bytes())
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Average
    }

    fn hash_size(&self) -> u32 {
        self.hash_size
    }
}
