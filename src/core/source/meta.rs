//! Meta ad account creatives (Graph API).

use super::http::{validate_url, HttpFetcher};
use super::{AssetListing, AssetLocator, AssetRef, AssetSource, MetaCredentials, SkipReason, SourceKind};
use crate::error::{FetchError, SourceError};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

const GRAPH_API: &str = "https://graph.facebook.com/v19.0";
const SERVICE: &str = "Meta";

/// Written to the `platform` column
const PLATFORM: &str = "Meta";

/// Pause between thumbnail downloads on one worker
const REQUEST_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Deserialize)]
pub(crate) struct CreativePage {
    #[serde(default)]
    pub data: Vec<Creative>,
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Paging {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Creative {
    pub id: String,
    pub name: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl Creative {
    fn into_asset(self) -> Result<AssetRef, SkipReason> {
        let thumbnail = self
            .thumbnail_url
            .filter(|u| !u.trim().is_empty())
            .ok_or(SkipReason::NoImage)?;
        let url = validate_url(&thumbnail).ok_or_else(|| SkipReason::InvalidUrl {
            url: thumbnail.clone(),
        })?;
        let name = self
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| "Unnamed Creative".to_string());

        Ok(AssetRef::new(self.id, AssetLocator::Remote(url.to_string()))
            .with_display_name(name.clone())
            .with_meta("platform", PLATFORM)
            .with_meta("creative_name", name)
            .with_meta("thumbnail_url", thumbnail))
    }
}

/// Normalise an account id to the `act_` form the Graph API expects
pub fn normalize_account_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("act_") {
        trimmed.to_string()
    } else {
        format!("act_{}", trimmed)
    }
}

/// Cursor link with any echoed `access_token` removed; the token travels as a header
fn next_page_url(raw: &str) -> Option<Url> {
    let mut url = Url::parse(raw).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "access_token")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(url)
}

/// Lists ad creatives of one ad account and downloads their thumbnails
pub struct MetaSource {
    account_id: String,
    credentials: MetaCredentials,
    http: HttpFetcher,
}

impl MetaSource {
    pub fn new(account_id: &str, credentials: MetaCredentials) -> Result<Self, SourceError> {
        Ok(Self {
            account_id: normalize_account_id(account_id),
            credentials,
            http: HttpFetcher::new()?,
        })
    }

    fn first_page_url(&self) -> Result<Url, SourceError> {
        Url::parse_with_params(
            &format!("{}/{}/adcreatives", GRAPH_API, self.account_id),
            &[
                ("fields", "id,name,thumbnail_url"),
                ("limit", "1000"),
            ],
        )
        .map_err(|e| SourceError::ListingFailed {
            source_name: SERVICE.to_string(),
            reason: e.to_string(),
        })
    }
}

fn collect_page(listing: &mut AssetListing, creatives: Vec<Creative>) {
    for creative in creatives {
        let id = creative.id.clone();
        match creative.into_asset() {
            Ok(asset) => listing.assets.push(asset),
            Err(reason) => {
                tracing::debug!(creative = %id, %reason, "Skipping creative");
                listing.skip(id, reason)
            }
        }
    }
}

impl AssetSource for MetaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Meta
    }

    fn locator(&self) -> String {
        self.account_id.clone()
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        let mut listing = AssetListing::default();
        let token = self.credentials.access_token.secret();
        let mut next = Some(self.first_page_url()?);

        while let Some(url) = next {
            let page: CreativePage = self.http.get_json(SERVICE, url.as_str(), Some(token))?;
            next = page
                .paging
                .and_then(|p| p.next)
                .and_then(|raw| next_page_url(&raw));
            collect_page(&mut listing, page.data);
        }

        tracing::info!(
            account = %self.account_id,
            assets = listing.assets.len(),
            skipped = listing.skipped.len(),
            "Listed Meta creatives"
        );

        Ok(listing)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        match &asset.locator {
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
