use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::domain::Page;
use crate::error::HarvestError;

pub const LATEST_PATH: &str = "/maps/latest";
pub const SORT_LAST_PUBLISHED: &str = "LAST_PUBLISHED";

/// Query parameters for one `/maps/latest` request.
///
/// Advancing the cursor produces a new value via [`PageQuery::with_before`];
/// nothing is mutated between iterations.
#[derive(Debug, Clone)]
pub struct PageQuery {
    pub before: String,
    pub auto_mapper: bool,
    pub sort: &'static str,
}

impl PageQuery {
    pub fn new(before: String) -> Self {
        Self {
            before,
            auto_mapper: false,
            sort: SORT_LAST_PUBLISHED,
        }
    }

    pub fn with_before(self, before: String) -> Self {
        Self { before, ..self }
    }

    pub fn as_pairs(&self) -> [(&'static str, String); 3] {
        [
            ("before", self.before.clone()),
            ("auto_mapper", self.auto_mapper.to_string()),
            ("sort", self.sort.to_string()),
        ]
    }
}

pub trait FeedClient: Send + Sync {
    fn latest_page(&self, query: &PageQuery) -> Result<Page, HarvestError>;
    fn fetch_payload(&self, url: &str) -> Result<Box<dyn Read>, HarvestError>;
}

#[derive(Clone)]
pub struct BeatSaverClient {
    client: Client,
    base_url: String,
}

impl BeatSaverClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bs-harvest/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HarvestError::FeedHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

impl FeedClient for BeatSaverClient {
    fn latest_page(&self, query: &PageQuery) -> Result<Page, HarvestError> {
        let url = format!("{}{}", self.base_url, LATEST_PATH);
        let response = self
            .client
            .get(&url)
            .query(&query.as_pairs())
            .send()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "feed request failed".to_string());
            return Err(HarvestError::FeedStatus { status, message });
        }
        response
            .json::<Page>()
            .map_err(|err| HarvestError::FeedHttp(err.to_string()))
    }

    fn fetch_payload(&self, url: &str) -> Result<Box<dyn Read>, HarvestError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HarvestError::PayloadHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "payload request failed".to_string());
            return Err(HarvestError::PayloadStatus { status, message });
        }
        Ok(Box::new(response))
    }
}
