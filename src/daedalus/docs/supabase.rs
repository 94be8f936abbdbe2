// SPDX-License-Identifier: MIT

//! Supabase (PostgREST) page index
//!
//! Crawled pages live in a `site_pages` table, one row per chunk; the page
//! list is the distinct set of their urls for a given source tag.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::collections::BTreeSet;

use super::DocumentationSource;
use crate::adk::error::DaedalusError;

pub const DEFAULT_SOURCE: &str = "pydantic_ai_docs";

#[derive(Debug, Deserialize)]
struct PageRow {
    url: String,
}

pub struct SupabaseDocs {
    client: Client,
    base_url: Url,
    service_key: String,
    source: String,
}

impl SupabaseDocs {
    pub fn new(base_url: &str, service_key: String) -> Result<Self, DaedalusError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| DaedalusError::config(format!("Invalid Supabase URL {}: {}", base_url, e)))?;
        // `join` keeps the base path only up to its last slash
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            service_key,
            source: DEFAULT_SOURCE.to_string(),
        })
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    fn query_url(&self) -> Result<Url, DaedalusError> {
        let mut url = self
            .base_url
            .join("rest/v1/site_pages")
            .map_err(|e| DaedalusError::config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("select", "url")
            .append_pair("metadata->>source", &format!("eq.{}", self.source));
        Ok(url)
    }

    /// Distinct urls, sorted
    fn distinct_urls(rows: Vec<PageRow>) -> Vec<String> {
        rows.into_iter()
            .map(|r| r.url)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[async_trait]
impl DocumentationSource for SupabaseDocs {
    async fn list_documentation_pages(&self) -> Result<Vec<String>, DaedalusError> {
        let url = self.query_url()?;
        log::debug!("Listing documentation pages from {}", url);

        let resp = self
            .client
            .get(url)
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| DaedalusError::docs(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(DaedalusError::docs(format!(
                "Supabase API error {}: {}",
                status, text
            )));
        }

        let rows: Vec<PageRow> = resp
            .json()
            .await
            .map_err(|e| DaedalusError::docs(format!("Invalid response format: {}", e)))?;

        let pages = Self::distinct_urls(rows);
        log::info!("Found {} documentation pages", pages.len());
        Ok(pages)
    }
}
