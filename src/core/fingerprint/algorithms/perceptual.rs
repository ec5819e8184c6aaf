//! Perceptual Hash (pHash) implementation.
//!
//! pHash runs a Discrete Cosine Transform over a downscaled grayscale copy
//! and keeps the low-frequency coefficients, which makes it tolerant of:
//! - Scaling
//! - Recompression (platform thumbnails are re-encoded JPEGs)
//! - Brightness/contrast changes
//!
//! The DCT and bit extraction come from the image_hasher crate.

use super::super::traits::{AlgorithmKind, Fingerprint, FingerprintStrategy};
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// Perceptual Hash (pHash) using DCT preprocessing and a mean threshold
pub struct PerceptualStrategy {
    hash_size: u32,
    hasher: image_hasher::Hasher,
}

impl PerceptualStrategy {
    /// Create a new pHash strategy with `hash_size` bits per side
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Mean)
            .preproc_dct()
            .to_hasher();

        Self { hash_size, hasher }
    }
}

impl FingerprintStrategy for PerceptualStrategy {
    fn hash_rgb(&self, image: &DynamicImage) -> Fingerprint {
        Fingerprint::from_bytes(self.hasher.hash_image(image).as_bytes())
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Perceptual
    }

    fn hash_size(&self) -> u32 {
        self.hash_size
    }
}
