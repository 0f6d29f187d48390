use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{debug, warn};

use crate::client::{PageRequest, QueryParams};
use crate::model::{Feature, FeatureCollection};

/// Records requested per page so a single request never overloads the server.
pub const PAGE_SIZE: u64 = 5000;

/// Anything that can serve one page of search results.
#[allow(async_fn_in_trait)]
pub trait PageSource {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn fetch_page(&self, request: &PageRequest) -> Result<FeatureCollection, Self::Error>;
}

#[derive(Debug, Error)]
#[error("failed to get any results (page at offset {offset}): {source}")]
pub struct FetchError {
    pub offset: u64,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

/// How many results the caller wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Limit {
    /// One request, the server picks the page length.
    ServerDefault,
    /// Keep paging until the server runs dry.
    All,
    AtMost(u64),
}

impl Limit {
    pub fn from_param(limit: Option<u64>) -> Self {
        match limit {
            None => Limit::ServerDefault,
            Some(0) => Limit::All,
            Some(n) => Limit::AtMost(n),
        }
    }

    fn request_limit(self, accumulated: u64) -> Option<u64> {
        match self {
            Limit::ServerDefault => None,
            Limit::All => Some(PAGE_SIZE),
            Limit::AtMost(n) => Some(PAGE_SIZE.min(n.saturating_sub(accumulated))),
        }
    }

    fn satisfied_by(self, accumulated: u64) -> bool {
        match self {
            Limit::AtMost(n) => accumulated >= n,
            _ => false,
        }
    }
}

/// Monotonic search counter. A result is only applied while its generation is
/// still the current one.
#[derive(Clone, Debug, Default)]
pub struct SearchGeneration(Arc<AtomicU64>);

impl SearchGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new search and returns its tag.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

#[derive(Clone, Debug)]
pub struct FetchOutcome {
    pub generation: u64,
    pub features: Vec<Feature>,
    pub pages: usize,
}

/// Pages through the search endpoint until the limit or the end of data.
pub async fn fetch_all<S: PageSource>(
    source: &S,
    params: &QueryParams,
    generation: u64,
    pb: &ProgressBar,
) -> Result<FetchOutcome, FetchError> {
    let limit = Limit::from_param(params.limit);
    let filters = params.filters();
    let mut offset = params.offset.unwrap_or(0);
    let mut features: Vec<Feature> = Vec::new();
    let mut pages = 0usize;

    loop {
        let request = PageRequest {
            filters: filters.clone(),
            offset,
            limit: limit.request_limit(features.len() as u64),
        };
        let page = match source.fetch_page(&request).await {
            Ok(page) => page,
            Err(e) => {
                warn!(offset, error = %e, "page fetch failed, dropping partial results");
                return Err(FetchError {
                    offset,
                    source: Box::new(e),
                });
            }
        };
        pages += 1;
        let received = page.features.len() as u64;
        features.extend(page.features);
        offset += PAGE_SIZE;
        pb.inc(1);
        pb.set_message(format!("{} alerts", features.len()));
        debug!(pages, received, total = features.len(), "page received");

        if received != PAGE_SIZE || limit.satisfied_by(features.len() as u64) {
            break;
        }
    }

    if let Limit::AtMost(n) = limit {
        features.truncate(n as usize);
    }
    Ok(FetchOutcome {
        generation,
        features,
        pages,
    })
}
