use std::time::Duration;

use indicatif::ProgressBar;
use thiserror::Error;
use tokio::time::Instant;
use tracing::info;

use crate::aggregate;
use crate::client::{ClientError, ClientOptions, QueryParams, SearchClient};
use crate::config::DEFAULT_URL;
use crate::fetcher::{self, FetchError, SearchGeneration};
use crate::selection::ViewState;
use crate::utils;

#[derive(Clone, Debug)]
pub struct Options {
    pub url: String,
    pub token: Option<String>,
    pub timeout_seconds: u64,
    pub proxy: Option<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            token: None,
            timeout_seconds: 30,
            proxy: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    #[error("invalid {field} '{value}': {message}")]
    InvalidParam {
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("username and password are both required")]
    MissingCredentials,

    #[error("not logged in (run the login command first)")]
    NotLoggedIn,

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("search {generation} was superseded before its results arrived")]
    Superseded { generation: u64 },
}

#[derive(Clone, Debug)]
pub struct SearchResult {
    pub started_at: Instant,
    pub elapsed: Duration,
    pub pages: usize,
    pub state: ViewState,
}

#[derive(Clone, Debug)]
pub struct Runner {
    options: Options,
    client: SearchClient,
    generations: SearchGeneration,
}

impl Runner {
    pub fn new(mut options: Options) -> Result<Self, RunnerError> {
        options.url = options.url.trim().trim_end_matches('/').to_string();
        if reqwest::Url::parse(&options.url).is_err() {
            return Err(RunnerError::InvalidUrl { url: options.url });
        }
        let client_options = ClientOptions {
            timeout_seconds: options.timeout_seconds,
            proxy: options.proxy.clone(),
        };
        let mut client = SearchClient::new(&options.url, &client_options)?;
        if let Some(token) = options.token.as_deref().filter(|t| !t.is_empty()) {
            client = client.with_token(token);
        }
        Ok(Self {
            options,
            client,
            generations: SearchGeneration::new(),
        })
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn generations(&self) -> &SearchGeneration {
        &self.generations
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<String, RunnerError> {
        if username.is_empty() || password.is_empty() {
            return Err(RunnerError::MissingCredentials);
        }
        let token = self.client.login(username, password).await?;
        self.options.token = Some(token.clone());
        Ok(token)
    }

    pub async fn search(&self, params: &QueryParams) -> Result<SearchResult, RunnerError> {
        self.search_with_progress(params, &ProgressBar::hidden()).await
    }

    pub async fn search_with_progress(
        &self,
        params: &QueryParams,
        pb: &ProgressBar,
    ) -> Result<SearchResult, RunnerError> {
        validate_params(params)?;
        if self.client.token().is_none() {
            return Err(RunnerError::NotLoggedIn);
        }
        let started_at = Instant::now();
        let generation = self.generations.begin();
        info!(generation, limit = ?params.limit, "search started");

        let fetched = fetcher::fetch_all(&self.client, params, generation, pb).await?;
        let pages = fetched.pages;
        let (records, points) = aggregate::aggregate(fetched.features);

        let mut state = ViewState::new();
        if !state.load(&self.generations, fetched.generation, records, points) {
            return Err(RunnerError::Superseded { generation });
        }
        let elapsed = started_at.elapsed();
        info!(
            generation,
            results = state.records().len(),
            points = state.points().len(),
            pages,
            elapsed_ms = elapsed.as_millis() as u64,
            "search finished"
        );
        Ok(SearchResult {
            started_at,
            elapsed,
            pages,
            state,
        })
    }
}

pub fn validate_params(params: &QueryParams) -> Result<(), RunnerError> {
    for (field, value) in [("start", &params.start), ("end", &params.end)] {
        if let Some(raw) = value.as_deref().filter(|v| !v.trim().is_empty()) {
            utils::validate_date(raw).map_err(|message| RunnerError::InvalidParam {
                field,
                value: raw.to_string(),
                message,
            })?;
        }
    }
    Ok(())
}
