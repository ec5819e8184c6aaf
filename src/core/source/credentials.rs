//! Per-run credentials for the cloud sources.
//!
//! Built explicitly from the environment (or a token file) and handed to the
//! adapter that needs them. Nothing here is global.

use crate::error::AuthError;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub const DRIVE_TOKEN_VAR: &str = "GOOGLE_DRIVE_ACCESS_TOKEN";
pub const META_TOKEN_VAR: &str = "META_ACCESS_TOKEN";
pub const GOOGLE_ADS_TOKEN_VAR: &str = "GOOGLE_ADS_ACCESS_TOKEN";
pub const GOOGLE_ADS_DEVELOPER_TOKEN_VAR: &str = "GOOGLE_ADS_DEVELOPER_TOKEN";
pub const GOOGLE_ADS_LOGIN_CUSTOMER_VAR: &str = "GOOGLE_ADS_LOGIN_CUSTOMER_ID";

/// A bearer token. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccessToken(***)")
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String, AuthError> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AuthError::MissingVariable {
            name: name.to_string(),
        })
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_lookup(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[derive(Deserialize)]
struct TokenFile {
    token: Option<String>,
    access_token: Option<String>,
}

/// Google Drive read access
#[derive(Debug, Clone)]
pub struct DriveCredentials {
    pub token: AccessToken,
}

impl DriveCredentials {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        Ok(Self {
            token: AccessToken::new(required(&lookup, DRIVE_TOKEN_VAR)?),
        })
    }

    /// Read a saved OAuth token (`{"token": ...}` or `{"access_token": ...}`)
    pub fn from_token_file(path: &Path) -> Result<Self, AuthError> {
        let token_error = |reason: String| AuthError::TokenFile {
            path: path.to_path_buf(),
            reason,
        };

        let raw = std::fs::read_to_string(path).map_err(|e| token_error(e.to_string()))?;
        let parsed: TokenFile = serde_json::from_str(&raw).map_err(|e| token_error(e.to_string()))?;
        let token = parsed
            .token
            .or(parsed.access_token)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| token_error("no 'token' or 'access_token' field".to_string()))?;

        Ok(Self {
            token: AccessToken::new(token.trim()),
        })
    }
}

/// Meta Graph API access
#[derive(Debug, Clone)]
pub struct MetaCredentials {
    pub access_token: AccessToken,
}

impl MetaCredentials {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        Ok(Self {
            access_token: AccessToken::new(required(&lookup, META_TOKEN_VAR)?),
        })
    }
}

/// Google Ads API access
#[derive(Debug, Clone)]
pub struct GoogleAdsCredentials {
    pub access_token: AccessToken,
    pub developer_token: AccessToken,
    /// Manager account id, digits only
    pub login_customer_id: Option<String>,
}

impl GoogleAdsCredentials {
    pub fn from_env() -> Result<Self, AuthError> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuthError> {
        Ok(Self {
            access_token: AccessToken::new(required(&lookup, GOOGLE_ADS_TOKEN_VAR)?),
            developer_token: AccessToken::new(required(&lookup, GOOGLE_ADS_DEVELOPER_TOKEN_VAR)?),
            login_customer_id: optional(&lookup, GOOGLE_ADS_LOGIN_CUSTOMER_VAR)
                .map(|id| id.replace('-', "")),
        })
    }
}
