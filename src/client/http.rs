use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::patch::{build_patch, target_document};
use super::types::{Item, MetadataEdit, ModifyBody, ModifyResponse, SearchResults};
use super::ArchiveClient;
use crate::config::ArchiveConfig;
use crate::error::{IafsError, Result};

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    identifier: String,
}

/// [`ArchiveClient`] backed by the archive's metadata and advanced-search HTTP APIs.
pub struct HttpArchiveClient {
    http: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
    search_rows: u32,
}

impl HttpArchiveClient {
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        let base = config.get_base_url();
        let base_url = Url::parse(&base)
            .map_err(|e| IafsError::Config(format!("Invalid base_url '{}': {}", base, e)))?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.get_timeout_secs()))
            .user_agent(concat!("iafs/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(HttpArchiveClient {
            http,
            base_url,
            credentials: config.credentials(),
            search_rows: config.get_search_rows(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                IafsError::Config(format!("Invalid base_url '{}': cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn get_item(&self, identifier: &str) -> Result<Item> {
        let url = self.endpoint(&["metadata", identifier])?;
        tracing::debug!("GET {}", url);

        let raw: Value = self.http.get(url).send()?.error_for_status()?.json()?;
        Item::from_json(identifier, raw)
    }

    fn search_items(&self, query: &str) -> Result<SearchResults> {
        let url = self.endpoint(&["advancedsearch.php"])?;
        let rows = self.search_rows.to_string();
        tracing::debug!("GET {} q={:?} rows={}", url, query, rows);

        let envelope: SearchEnvelope = self
            .http
            .get(url)
            .query(&[
                ("q", query),
                ("fl[]", "identifier"),
                ("rows", rows.as_str()),
                ("page", "1"),
                ("output", "json"),
            ])
            .send()?
            .error_for_status()?
            .json()?;

        Ok(SearchResults::new(
            envelope
                .response
                .docs
                .into_iter()
                .map(|doc| doc.identifier)
                .collect(),
        ))
    }

    fn modify_metadata(&self, item: &Item, edit: &MetadataEdit) -> Result<ModifyResponse> {
        let url = self.endpoint(&["metadata", &item.identifier])?;
        let target = edit.target();
        let current = target_document(item, target);
        let patch = build_patch(&current, &edit.fields, edit.append);

        let mut form: Vec<(&str, String)> = vec![
            ("-target", target.to_string()),
            ("-patch", serde_json::to_string(&patch)?),
        ];
        if let Some(priority) = edit.priority {
            form.push(("priority", priority.to_string()));
        }
        if let Some((access, secret)) = &self.credentials {
            form.push(("access", access.clone()));
            form.push(("secret", secret.clone()));
        }

        tracing::debug!("POST {} target={} patch={}", url, target, patch);
        let response = self.http.post(url).form(&form).send()?;
        let status = response.status().as_u16();
        let text = response.text()?;

        let body = serde_json::from_str::<ModifyBody>(&text).unwrap_or_else(|_| ModifyBody {
            success: false,
            log: None,
            error: Some(text.trim().to_string()),
        });

        Ok(ModifyResponse { status, body })
    }
}
