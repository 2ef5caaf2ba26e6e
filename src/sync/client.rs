//! Per-unit members API client
//!
//! ## API Reference
//!
//! Endpoint: `GET {base}/members?page=<n>&take=<size>&status=<partition>&showMemberships=<bool>`
//! Auth: `Authorization: Basic base64(tenantKey:secretToken)`
//! Returns: JSON array of member objects. No total-count header is relied on;
//! the paginator stops on a short page.
//!
//! Clients bind their local address to `0.0.0.0`, so requests only ever go
//! out over IPv4. The upstream is unreliable over IPv6.

use super::credentials::UnitCredential;
use super::error::{ClientError, FetchError};
use super::types::RawMember;
use crate::config::ApiConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

/// Source of member pages for one unit
#[async_trait]
pub trait MemberSource: Send + Sync {
    /// Fetch one page (1-based) of members in a status partition
    async fn fetch_page(
        &self,
        status: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<RawMember>, FetchError>;
}

/// Builds a `MemberSource` bound to one unit's credentials
pub trait SourceFactory: Send + Sync {
    fn build_source(&self, credential: &UnitCredential) -> Result<Arc<dyn MemberSource>, ClientError>;
}

/// Encode `tenantKey:secretToken` into a Basic authorization value
pub fn basic_auth_value(credential: &UnitCredential) -> String {
    let raw = format!("{}:{}", credential.tenant_key, credential.secret_token);
    format!("Basic {}", general_purpose::STANDARD.encode(raw))
}

/// Authenticated HTTP client for one unit
pub struct UnitApiClient {
    unit_id: String,
    http: reqwest::Client,
    members_url: String,
    timeout: Duration,
    show_memberships: bool,
}

impl UnitApiClient {
    pub fn unit_id(&self) -> &str {
        &self.unit_id
    }
}

#[async_trait]
impl MemberSource for UnitApiClient {
    async fn fetch_page(
        &self,
        status: &str,
        page: u32,
        page_size: usize,
    ) -> Result<Vec<RawMember>, FetchError> {
        let response = self
            .http
            .get(&self.members_url)
            .query(&[
                ("page", page.to_string()),
                ("take", page_size.to_string()),
                ("status", status.to_string()),
                ("showMemberships", self.show_memberships.to_string()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        let status_code = response.status();
        if !status_code.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http {
                status: status_code.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest(e, self.timeout))?;

        serde_json::from_slice(&body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

/// Builds `UnitApiClient`s from credentials and shared API settings
#[derive(Debug, Clone)]
pub struct UnitApiClientFactory {
    config: ApiConfig,
}

impl UnitApiClientFactory {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }

    pub fn build_client(&self, credential: &UnitCredential) -> Result<UnitApiClient, ClientError> {
        let base = self.config.base_url.trim_end_matches('/');
        if !base.starts_with("http://") && !base.starts_with("https://") {
            return Err(ClientError::InvalidBaseUrl(self.config.base_url.clone()));
        }

        let mut auth = HeaderValue::from_str(&basic_auth_value(credential))
            .map_err(|e| ClientError::InvalidHeader(e.to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.config.request_timeout)
            .local_address(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
            .build()?;

        log::debug!("🔌 Built API client for unit {} ({})", credential.unit_id, base);

        Ok(UnitApiClient {
            unit_id: credential.unit_id.clone(),
            http,
            members_url: format!("{}/members", base),
            timeout: self.config.request_timeout,
            show_memberships: self.config.show_memberships,
        })
    }
}

impl SourceFactory for UnitApiClientFactory {
    fn build_source(&self, credential: &UnitCredential) -> Result<Arc<dyn MemberSource>, ClientError> {
        Ok(Arc::new(self.build_client(credential)?))
    }
}
