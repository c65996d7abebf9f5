//! Document fetching.
//!
//! The crawler only needs "URL in, document text out". [`Fetcher`] is that
//! seam; [`HttpFetcher`] is the production implementation and
//! [`StaticFetcher`] serves a fixed set of documents from memory.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::config::HttpConfig;
use crate::error::FetchError;

/// Retrieves the text of a document by URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches documents over HTTP(S) with `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Serves documents from an in-memory map and records every request.
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `body` as the document at `url`.
    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.documents.insert(url.into(), body.into());
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.documents.insert(url.into(), body.into());
    }

    /// How many times `url` has been requested.
    pub fn request_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .map(|r| r.iter().filter(|u| u.as_str() == url).count())
            .unwrap_or(0)
    }

    /// Every requested URL, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.to_string()))
    }
}
