//! Trait definitions for matching strategies.

/// Decides whether a reference fingerprint counts as a match
pub trait MatchStrategy: Send + Sync {
    /// Largest Hamming distance still accepted
    fn max_distance(&self) -> u32;

    /// Whether a candidate at this distance is a match
    fn accepts(&self, distance: u32) -> bool {
        distance <= self.max_distance()
    }

    /// Human-readable description of the strategy
    fn description(&self) -> String;
}

/// Fingerprints must be identical
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactMatch;

impl MatchStrategy for ExactMatch {
    fn max_distance(&self) -> u32 {
        0
    }

    fn description(&self) -> String {
        "Exact match: fingerprints must be identical".to_string()
    }
}

/// Fingerprints within `max_distance` bits of each other match
#[derive(Debug, Clone, Copy)]
pub struct HammingThreshold {
    max_distance: u32,
}

impl HammingThreshold {
    pub fn new(max_distance: u32) -> Self {
        Self { max_distance }
    }
}

impl MatchStrategy for HammingThreshold {
    fn max_distance(&self) -> u32 {
        self.max_distance
    }

    fn description(&self) -> String {
        format!(
            "Hamming threshold: fingerprints within {} bits match",
            self.max_distance
        )
    }
}

/// Exact matching for 0, a Hamming threshold otherwise
pub fn strategy_for(max_distance: u32) -> Box<dyn MatchStrategy> {
    if max_distance == 0 {
        Box::new(ExactMatch)
    } else {
        Box::new(HammingThreshold::new(max_distance))
    }
}
