//! Google Ads image assets (Google Ads REST search).

use super::http::{decode_embedded, validate_url, HttpFetcher};
use super::{
    AssetListing, AssetLocator, AssetRef, AssetSource, GoogleAdsCredentials, SkipReason, SourceKind,
};
use crate::error::{FetchError, SourceError};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

const ADS_API: &str = "https://googleads.googleapis.com/v17";
const SERVICE: &str = "Google Ads";

/// Written to the `platform` column
const PLATFORM: &str = "Google";

const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

const IMAGE_ASSET_QUERY: &str = "SELECT ad_group_ad.ad.id, ad_group_ad.ad.name, \
     asset.id, asset.name, asset.image_asset.full_size.url, asset.image_asset.data \
     FROM ad_group_ad_asset_view \
     WHERE asset.type = 'IMAGE'";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchPage {
    #[serde(default)]
    pub results: Vec<SearchRow>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchRow {
    pub ad_group_ad: AdGroupAd,
    #[serde(default)]
    pub asset: Asset,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AdGroupAd {
    pub ad: Ad,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Ad {
    /// int64 ids arrive as strings
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Asset {
    pub id: Option<String>,
    pub name: Option<String>,
    pub image_asset: Option<ImageAssetData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImageAssetData {
    pub full_size: Option<ImageDimension>,
    /// Base64 image bytes
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ImageDimension {
    pub url: Option<String>,
}

impl SearchRow {
    fn into_asset(self) -> Result<AssetRef, SkipReason> {
        let ad_id = self.ad_group_ad.ad.id;
        let ad_name = self
            .ad_group_ad
            .ad
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Ad {}", ad_id));
        let asset_id = self.asset.id.unwrap_or_default();
        let asset_name = self
            .asset
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Asset {}", asset_id));

        let (data, url) = match self.asset.image_asset {
            Some(image) => (
                image.data.filter(|d| !d.trim().is_empty()),
                image.full_size.and_then(|f| f.url).filter(|u| !u.trim().is_empty()),
            ),
            None => (None, None),
        };

        let (locator, image_source) = match (data, url) {
            (Some(data), fallback) => (
                AssetLocator::Embedded {
                    data,
                    fallback_url: fallback,
                },
                "base64",
            ),
            (None, Some(url)) => {
                let valid = validate_url(&url).ok_or(SkipReason::InvalidUrl { url })?;
                (AssetLocator::Remote(valid.to_string()), "url")
            }
            (None, None) => return Err(SkipReason::NoImage),
        };

        Ok(AssetRef::new(ad_id, locator)
            .with_display_name(ad_name.clone())
            .with_meta("platform", PLATFORM)
            .with_meta("creative_name", ad_name)
            .with_meta("asset_id", asset_id)
            .with_meta("asset_name", asset_name)
            .with_meta("image_source", image_source))
    }
}

/// Customer ids are used without dashes
pub fn normalize_customer_id(raw: &str) -> String {
    raw.trim().replace('-', "")
}

/// Lists image assets attached to ads of one customer account
pub struct GoogleAdsSource {
    customer_id: String,
    credentials: GoogleAdsCredentials,
    http: HttpFetcher,
}

impl GoogleAdsSource {
    pub fn new(customer_id: &str, credentials: GoogleAdsCredentials) -> Result<Self, SourceError> {
        Ok(Self {
            customer_id: normalize_customer_id(customer_id),
            credentials,
            http: HttpFetcher::new()?,
        })
    }

    fn search_body(page_token: Option<&str>) -> serde_json::Value {
        let mut body = json!({ "query": IMAGE_ASSET_QUERY });
        if let Some(token) = page_token {
            body["pageToken"] = json!(token);
        }
        body
    }
}

fn collect_page(listing: &mut AssetListing, rows: Vec<SearchRow>) {
    for row in rows {
        let id = row.ad_group_ad.ad.id.clone();
        match row.into_asset() {
            Ok(asset) => listing.assets.push(asset),
            Err(reason) => {
                tracing::debug!(ad = %id, %reason, "Skipping ad");
                listing.skip(id, reason)
            }
        }
    }
}

impl AssetSource for GoogleAdsSource {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleAds
    }

    fn locator(&self) -> String {
        format!("customer {}", self.customer_id)
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        let url = format!("{}/customers/{}/googleAds:search", ADS_API, self.customer_id);
        let bearer = format!("Bearer {}", self.credentials.access_token.secret());

        let mut headers = vec![
            ("Authorization", bearer.as_str()),
            ("developer-token", self.credentials.developer_token.secret()),
        ];
        if let Some(login) = self.credentials.login_customer_id.as_deref() {
            headers.push(("login-customer-id", login));
        }

        let mut listing = AssetListing::default();
        let mut page_token: Option<String> = None;

        loop {
            let body = Self::search_body(page_token.as_deref());
            let page: SearchPage = self.http.post_json(SERVICE, &url, &body, &headers)?;

            page_token = page.next_page_token.filter(|t| !t.is_empty());
            collect_page(&mut listing, page.results);

            if page_token.is_none() {
                break;
            }
        }

        tracing::info!(
            customer = %self.customer_id,
            assets = listing.assets.len(),
            skipped = listing.skipped.len(),
            "Listed Google Ads image assets"
        );

        Ok(listing)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        match &asset.locator {
            AssetLocator::Embedded { data, fallback_url } => {
                match (decode_embedded(&asset.identity, data), fallback_url) {
                    (Ok(bytes), _) => Ok(bytes),
                    (Err(e), Some(url)) => {
                        tracing::debug!(ad = %asset.identity, error = %e, "Falling back to image URL");
                        self.http.get_bytes(url, None)
                    }
                    (Err(e), None) => Err(e),
                }
            }
            AssetLocator::Remote(url) => self.http.get_bytes(url, None),
            other => Err(FetchError::InvalidUrl {
                identity: asset.identity.clone(),
                url: format!("{:?}", other),
            }),
        }
    }

    fn request_interval(&self) -> Duration {
        REQUEST_INTERVAL
    }
}
