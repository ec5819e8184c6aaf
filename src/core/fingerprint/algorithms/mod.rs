//! Fingerprint algorithm implementations.

mod average;
mod difference;
mod perceptual;

pub use average::AverageStrategy;
pub use difference::DifferenceStrategy;
pub use perceptual::PerceptualStrategy;
