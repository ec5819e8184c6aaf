//! Difference Hash (dHash) implementation.
//!
//! dHash compares each pixel of a downscaled grayscale copy with its
//! neighbour and keeps one bit per comparison, capturing the brightness
//! gradient of the layout.

use super::super::traits::{AlgorithmKind, Fingerprint, FingerprintStrategy};
use image::DynamicImage;
use image_hasher::{HashAlg, HasherConfig as ImageHasherConfig};

/// Difference Hash (dHash) strategy
pub struct DifferenceStrategy {
    hash_size: u32,
    hasher: image_hasher::Hasher,
}

impl DifferenceStrategy {
    /// Create a new dHash strategy with `hash_size` bits per side
    pub fn new(hash_size: u32) -> Self {
        let hasher = ImageHasherConfig::new()
            .hash_size(hash_size, hash_size)
            .hash_alg(HashAlg::Gradient)
            .to_hasher();

        Self { hash_size, hasher }
    }
}

impl FingerprintStrategy for DifferenceStrategy {
    fn hash_rgb(&self, image: &DynamicImage) -> Fingerprint {
        Fingerprint::from_bytes(self.hasher.hash_image(image).as_bytes())
    }

    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::Difference
    }

    fn hash_size(&self) -> u32 {
        self.hash_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn horizontal_gradient(reverse: bool) -> DynamicImage {
        let img = ImageBuffer::from_fn(90, 90, |x, _| {
            let v = if reverse { 255 - (x * 2) as u8 } else { (x * 2) as u8 };
            Rgb([v, v, v])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn deterministic_for_same_pixels() {
        let strategy = DifferenceStrategy::new(8);
        let image = horizontal_gradient(false);
        assert_eq!(
            strategy.fingerprint_image(&image),
            strategy.fingerprint_image(&image)
        );
    }

    #[test]
    fn opposite_gradients_are_far_apart() {
        let strategy = DifferenceStrategy::new(8);
        let forward = strategy.fingerprint_image(&horizontal_gradient(false));
        let backward = strategy.fingerprint_image(&horizontal_gradient(true));
        assert!(forward.distance(&backward) > 32);
    }

    #[test]
    fn kind_returns_difference() {
        assert_eq!(DifferenceStrategy::new(8).kind(), AlgorithmKind::Difference);
    }
}
