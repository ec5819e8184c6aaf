//! Meta and Google Ads listed together into one dataset.

use super::{AssetListing, AssetRef, AssetSource, SourceKind};
use crate::error::{ConfigurationError, FetchError, SourceError};
use std::time::Duration;

/// Several ad platforms fingerprinted as one run.
///
/// Assets are routed back to the platform that listed them through their
/// `platform` metadata column.
pub struct AdPlatformsSource {
    platforms: Vec<Box<dyn AssetSource>>,
}

impl AdPlatformsSource {
    /// Combine platform sources. Each must be an ad platform and appear once.
    pub fn new(platforms: Vec<Box<dyn AssetSource>>) -> Result<Self, ConfigurationError> {
        if platforms.is_empty() {
            return Err(ConfigurationError::InvalidOption(
                "at least one ad platform is required".to_string(),
            ));
        }

        let mut seen = Vec::new();
        for source in &platforms {
            let kind = source.kind();
            let label = kind.platform_label().ok_or_else(|| {
                ConfigurationError::InvalidOption(format!("{} is not an ad platform", kind))
            })?;
            if seen.contains(&label) {
                return Err(ConfigurationError::InvalidOption(format!(
                    "{} was given more than once",
                    kind
                )));
            }
            seen.push(label);
        }

        Ok(Self { platforms })
    }

    fn owner(&self, asset: &AssetRef) -> Option<&dyn AssetSource> {
        let platform = asset.metadata.get("platform")?;
        self.platforms
            .iter()
            .find(|s| s.kind().platform_label() == Some(platform.as_str()))
            .map(|s| &**s)
    }
}

impl AssetSource for AdPlatformsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::AdPlatforms
    }

    fn locator(&self) -> String {
        self.platforms
            .iter()
            .map(|s| format!("{} {}", s.kind(), s.locator()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        let mut combined = AssetListing::default();
        for source in &self.platforms {
            let listing = source.list_assets()?;
            combined.assets.extend(listing.assets);
            combined.skipped.extend(listing.skipped);
        }
        Ok(combined)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        match self.owner(asset) {
            Some(source) => source.fetch(asset),
            None => Err(FetchError::UnknownPlatform {
                identity: asset.identity.clone(),
                platform: asset.metadata.get("platform").cloned().unwrap_or_default(),
            }),
        }
    }

    fn request_interval(&self) -> Duration {
        self.platforms
            .iter()
            .map(|s| s.request_interval())
            .max()
            .unwrap_or(Duration::ZERO)
    }
}
