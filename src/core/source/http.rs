//! Blocking HTTP client shared by the cloud sources.

use crate::error::{AuthError, FetchError, SourceError};
use base64::Engine;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Some CDNs refuse requests without a browser-like agent
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Thin wrapper over a reqwest blocking client
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a client with the default timeout and user agent
    pub fn new() -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::ListingFailed {
                source_name: "HTTP client".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// GET a JSON document during listing
    pub fn get_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        bearer: Option<&str>,
    ) -> Result<T, SourceError> {
        let mut request = self.client.get(url).header("Accept", "application/json");
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        Self::send_json(service, request)
    }

    /// POST a JSON body during listing
    pub fn post_json<T: DeserializeOwned>(
        &self,
        service: &str,
        url: &str,
        body: &serde_json::Value,
        headers: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        Self::send_json(service, request)
    }

    fn send_json<T: DeserializeOwned>(service: &str, request: RequestBuilder) -> Result<T, SourceError> {
        let listing_failed = |reason: String| SourceError::ListingFailed {
            source_name: service.to_string(),
            reason,
        };

        let response = request
            .send()
            .map_err(|e| listing_failed(e.without_url().to_string()))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AuthError::Rejected {
                service: service.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(listing_failed(format!(
                "HTTP {}: {}",
                status,
                if snippet.is_empty() {
                    status.canonical_reason().unwrap_or("Unknown").to_string()
                } else {
                    snippet
                }
            )));
        }

        response
            .json::<T>()
            .map_err(|e| listing_failed(format!("unexpected response: {}", e.without_url())))
    }

    /// Download raw bytes for one asset
    pub fn get_bytes(&self, url: &str, bearer: Option<&str>) -> Result<Vec<u8>, FetchError> {
        let mut request = self.client.get(url);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|e| FetchError::Network {
            url: url.to_string(),
            reason: e.without_url().to_string(),
        })?;

        Self::read_bytes(url, response)
    }

    fn read_bytes(url: &str, response: Response) -> Result<Vec<u8>, FetchError> {
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::Network {
                url: url.to_string(),
                reason: e.without_url().to_string(),
            })
    }
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(raw: &str) -> Option<Url> {
    let url = Url::parse(raw.trim()).ok()?;
    let web = matches!(url.scheme(), "http" | "https");
    (web && url.host_str().is_some()).then_some(url)
}

/// Decode base64 image data delivered inline by an API
pub fn decode_embedded(identity: &str, data: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data.trim())
        .map_err(|e| FetchError::Embedded {
            identity: identity.to_string(),
            reason: e.to_string(),
        })?;

    if bytes.is_empty() {
        return Err(FetchError::Embedded {
            identity: identity.to_string(),
            reason: "no data".to_string(),
        });
    }
    Ok(bytes)
}
