use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::fetcher::PageSource;
use crate::model::FeatureCollection;

pub const AUTH_PATH: &str = "/api/v1/user/authentication";
pub const SEARCH_PATH: &str = "/api/v1/resource/search";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build HTTP client: {source}")]
    Build {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Search filters as the service names them. Empty values are never sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub country: Option<String>,
    pub disease: Option<String>,
    pub species: Option<String>,
    pub feed: Option<String>,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub id: Option<String>,
    pub regex: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl QueryParams {
    /// Filter pairs, without paging parameters. Values go out as given.
    pub fn filters(&self) -> Vec<(&'static str, String)> {
        let fields = [
            ("start", &self.start),
            ("end", &self.end),
            ("country", &self.country),
            ("disease", &self.disease),
            ("species", &self.species),
            ("feed", &self.feed),
            ("description", &self.description),
            ("diagnosis", &self.diagnosis),
            ("id", &self.id),
        ];
        let mut out: Vec<(&'static str, String)> = fields
            .into_iter()
            .filter_map(|(k, v)| {
                v.as_deref()
                    .filter(|v| !v.is_empty())
                    .map(|v| (k, v.to_string()))
            })
            .collect();
        if self.regex {
            out.push(("regex", "true".to_string()));
        }
        out
    }
}

/// One page request as the fetch loop issues it.
#[derive(Clone, Debug, PartialEq)]
pub struct PageRequest {
    pub filters: Vec<(&'static str, String)>,
    pub offset: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthToken {
    token: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    #[serde(rename = "authToken")]
    auth_token: AuthToken,
}

#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: String,
}

#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            proxy: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

fn build_http_client(options: &ClientOptions) -> Result<reqwest::Client, ClientError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_static(concat!("alertmap/", env!("CARGO_PKG_VERSION"))),
    );
    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(options.timeout_seconds));
    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy_cfg = reqwest::Proxy::all(proxy).map_err(|e| ClientError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy_cfg);
    }
    builder.build().map_err(|e| ClientError::Build { source: e })
}

impl SearchClient {
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(options)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Exchanges Basic credentials for an opaque API token.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, ClientError> {
        let url = format!("{}{}", self.base_url, AUTH_PATH);
        let response = self
            .http
            .get(&url)
            .basic_auth(username, Some(password))
            .send()
            .await
            .map_err(|e| ClientError::Request {
                url: url.clone(),
                source: e,
            })?;
        let response = reject_on_error(response).await?;
        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Decode { url, source: e })?;
        info!(user = username, "logged in");
        self.token = Some(body.auth_token.token.clone());
        Ok(body.auth_token.token)
    }

    pub async fn search_page(&self, request: &PageRequest) -> Result<FeatureCollection, ClientError> {
        let url = format!("{}{}", self.base_url, SEARCH_PATH);
        let mut query: Vec<(&str, String)> = request
            .filters
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        query.push(("offset", request.offset.to_string()));
        if let Some(limit) = request.limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(token) = self.token.as_deref() {
            query.push(("token", token.to_string()));
        }
        query.push(("geoJSON", "1".to_string()));

        debug!(offset = request.offset, limit = ?request.limit, "requesting page");
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ClientError::Request {
                url: url.clone(),
                source: e,
            })?;
        let response = reject_on_error(response).await?;
        response
            .json::<FeatureCollection>()
            .await
            .map_err(|e| ClientError::Decode { url, source: e })
    }
}

async fn reject_on_error(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServerMessage>(&text)
        .map(|m| m.message)
        .unwrap_or_else(|_| format!("server responded with HTTP {}", status.as_u16()));
    Err(ClientError::Rejected {
        status: status.as_u16(),
        message,
    })
}

impl PageSource for SearchClient {
    type Error = ClientError;

    async fn fetch_page(&self, request: &PageRequest) -> Result<FeatureCollection, Self::Error> {
        self.search_page(request).await
    }
}
