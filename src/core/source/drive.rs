//! Google Drive folder source (Drive v3 REST).

use super::http::HttpFetcher;
use super::{
    AssetListing, AssetLocator, AssetRef, AssetSource, DriveCredentials, ImageFilter, SkipReason,
    SourceKind,
};
use crate::error::{FetchError, SourceError};
use serde::Deserialize;
use url::Url;

const DRIVE_API: &str = "https://www.googleapis.com/drive/v3";
const SERVICE: &str = "Google Drive";
const LIST_FIELDS: &str = "nextPageToken,files(id,name,mimeType,size,webViewLink)";

/// One page of `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
    pub next_page_token: Option<String>,
}

/// A Drive file entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    /// int64 values arrive as strings
    pub size: Option<String>,
    pub web_view_link: Option<String>,
}

impl DriveFile {
    fn into_asset(self) -> Result<AssetRef, SkipReason> {
        if !ImageFilter::is_image_mime(&self.mime_type) {
            return Err(SkipReason::NotAnImage {
                detail: self.mime_type,
            });
        }

        Ok(AssetRef::new(self.name, AssetLocator::DriveFile(self.id.clone()))
            .with_meta("file_id", self.id)
            .with_meta("file_size", self.size.unwrap_or_else(|| "0".to_string()))
            .with_meta("web_link", self.web_view_link.unwrap_or_default()))
    }
}

/// Lists and downloads the images directly inside one Drive folder
pub struct DriveSource {
    folder_id: String,
    credentials: DriveCredentials,
    http: HttpFetcher,
}

impl DriveSource {
    pub fn new(folder_id: impl Into<String>, credentials: DriveCredentials) -> Result<Self, SourceError> {
        Ok(Self {
            folder_id: folder_id.into(),
            credentials,
            http: HttpFetcher::new()?,
        })
    }

    fn list_url(&self, page_token: Option<&str>) -> Result<Url, SourceError> {
        let query = format!("'{}' in parents and trashed=false", self.folder_id);
        let mut params = vec![
            ("q", query.as_str()),
            ("fields", LIST_FIELDS),
            ("pageSize", "1000"),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token));
        }

        Url::parse_with_params(&format!("{}/files", DRIVE_API), &params).map_err(|e| {
            SourceError::ListingFailed {
                source_name: SERVICE.to_string(),
                reason: e.to_string(),
            }
        })
    }
}

/// Split a page of files into assets and skipped entries
fn collect_page(listing: &mut AssetListing, page: FileList) {
    for file in page.files {
        let name = file.name.clone();
        match file.into_asset() {
            Ok(asset) => listing.assets.push(asset),
            Err(reason) => listing.skip(name, reason),
        }
    }
}

impl AssetSource for DriveSource {
    fn kind(&self) -> SourceKind {
        SourceKind::GoogleDrive
    }

    fn locator(&self) -> String {
        format!("folder {}", self.folder_id)
    }

    fn list_assets(&self) -> Result<AssetListing, SourceError> {
        let mut listing = AssetListing::default();
        let mut page_token: Option<String> = None;

        loop {
            let url = self.list_url(page_token.as_deref())?;
            let page: FileList =
                self.http
                    .get_json(SERVICE, url.as_str(), Some(self.credentials.token.secret()))?;

            page_token = page.next_page_token.clone();
            collect_page(&mut listing, page);

            if page_token.is_none() {
                break;
            }
        }

        tracing::info!(
            folder = %self.folder_id,
            assets = listing.assets.len(),
            skipped = listing.skipped.len(),
            "Listed Google Drive folder"
        );

        Ok(listing)
    }

    fn fetch(&self, asset: &AssetRef) -> Result<Vec<u8>, FetchError> {
        match &asset.locator {
            AssetLocator::DriveFile(id) => {
                let url = format!("{}/files/{}?alt=media", DRIVE_API, id);
                self.http
                    .get_bytes(&url, Some(self.credentials.token.secret()))
            }
            AssetLocator::Remote(url) => self.http.get_bytes(url, None),
            other => Err(FetchError::InvalidUrl {
                identity: asset.identity.clone(),
                url: format!("{:?}", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "nextPageToken": "token-2",
        "files": [
            {"id": "1AbC", "name": "banner.png", "mimeType": "image/png", "size": "20480",
             "webViewLink": "https://drive.google.com/file/d/1AbC/view"},
            {"id": "2DeF", "name": "brief.pdf", "mimeType": "application/pdf", "size": "1000"},
            {"id": "3GhI", "name": "logo.svg", "mimeType": "image/svg+xml"},
            {"id": "4JkL", "name": "hero.jpg", "mimeType": "image/jpeg"}
        ]
    }"#;

    #[test]
    fn parses_files_list_page() {
        let page: FileList = serde_json::from_str(PAGE).unwrap();
        assert_eq!(page.next_page_token.as_deref(), Some("token-2"));
        assert_eq!(page.files.len(), 4);
        assert_eq!(page.files[0].size.as_deref(), Some("20480"));
    }

    #[test]
    fn last_page_has_no_token_and_may_have_no_files() {
        let page: FileList = serde_json::from_str("{}").unwrap();
        assert!(page.next_page_token.is_none());
        assert!(page.files.is_empty());
    }

    #[test]
    fn non_images_are_skipped_with_mime_type() {
        let mut listing = AssetListing::default();
        collect_page(&mut listing, serde_json::from_str(PAGE).unwrap());

        let names: Vec<_> = listing.assets.iter().map(|a| a.identity.as_str()).collect();
        assert_eq!(names, vec!["banner.png", "hero.jpg"]);

        assert_eq!(listing.skipped.len(), 2);
        assert_eq!(
            listing.skipped[0].reason,
            SkipReason::NotAnImage {
                detail: "application/pdf".to_string()
            }
        );
    }

    #[test]
    fn assets_carry_drive_metadata() {
        let mut listing = AssetListing::default();
        collect_page(&mut listing, serde_json::from_str(PAGE).unwrap());

        let banner = &listing.assets[0];
        assert_eq!(banner.locator, AssetLocator::DriveFile("1AbC".to_string()));
        assert_eq!(banner.metadata["file_id"], "1AbC");
        assert_eq!(banner.metadata["file_size"], "20480");

        let hero = &listing.assets[1];
        assert_eq!(hero.metadata["file_size"], "0");
        assert_eq!(hero.metadata["web_link"], "");
    }

    #[test]
    fn list_url_quotes_folder_and_pages() {
        let source = DriveSource::new(
            "folder123",
            DriveCredentials::from_lookup(|_| Some("t".to_string())).unwrap(),
        )
        .unwrap();

        let first = source.list_url(None).unwrap();
        let query: Vec<(String, String)> = first.query_pairs().into_owned().collect();
        assert!(query.contains(&(
            "q".to_string(),
            "'folder123' in parents and trashed=false".to_string()
        )));
        assert!(!query.iter().any(|(k, _)| k == "pageToken"));

        let next = source.list_url(Some("abc")).unwrap();
        assert!(next
            .query_pairs()
            .any(|(k, v)| k == "pageToken" && v == "abc"));
    }
}
