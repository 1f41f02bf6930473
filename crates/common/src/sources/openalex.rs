//! OpenAlex citation source client
//!
//! HTTP client for the OpenAlex works API implementing [`CitationSource`].
//! Citation queries resolve the work's OpenAlex ID first, then filter the
//! works listing by `cites:` (forward) or the `referenced_works` IDs
//! (backward). Requests carry a per-request timeout and bounded retries
//! with exponential backoff.

use super::{CitationSource, Work};
use crate::config::CitationSourceConfig;
use crate::doi::normalize_doi;
use crate::errors::{DiffusionError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

/// Batch size for pipe-joined OpenAlex filters
const FILTER_BATCH_SIZE: usize = 50;

/// OpenAlex-backed citation source
pub struct OpenAlexClient {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
    max_retries: u32,
    page_size: usize,
}

#[derive(Deserialize)]
struct ListResponse {
    results: Vec<ApiWork>,
}

#[derive(Deserialize)]
struct ApiWork {
    id: String,
    doi: Option<String>,
    display_name: Option<String>,
    publication_year: Option<i32>,
    #[serde(default)]
    cited_by_count: u32,
    #[serde(default)]
    authorships: Vec<Authorship>,
    primary_location: Option<Location>,
    open_access: Option<OpenAccess>,
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
    #[serde(default)]
    referenced_works: Vec<String>,
}

#[derive(Deserialize)]
struct Authorship {
    author: Option<Author>,
}

#[derive(Deserialize)]
struct Author {
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct Location {
    source: Option<LocationSource>,
}

#[derive(Deserialize)]
struct LocationSource {
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct OpenAccess {
    oa_url: Option<String>,
}

impl ApiWork {
    /// Convert to a [`Work`]; returns None for records without a DOI
    fn into_work(self) -> Option<Work> {
        let doi = normalize_doi(self.doi.as_deref()?);
        if doi.is_empty() {
            return None;
        }

        Some(Work {
            doi,
            title: self.display_name.unwrap_or_else(|| "Untitled".to_string()),
            year: self.publication_year,
            authors: self
                .authorships
                .into_iter()
                .filter_map(|a| a.author.and_then(|a| a.display_name))
                .collect(),
            venue: self
                .primary_location
                .and_then(|l| l.source)
                .and_then(|s| s.display_name),
            cited_by_count: self.cited_by_count,
            abstract_text: self.abstract_inverted_index.map(reconstruct_abstract),
            open_access_url: self.open_access.and_then(|oa| oa.oa_url),
        })
    }
}

/// Rebuild abstract text from OpenAlex's inverted index representation
fn reconstruct_abstract(index: HashMap<String, Vec<usize>>) -> String {
    let mut positions: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, posns)| posns.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positions.sort_unstable_by_key(|&(p, _)| p);
    positions
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

impl OpenAlexClient {
    /// Create a new client from configuration
    pub fn new(config: &CitationSourceConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            mailto: config.mailto.clone(),
            max_retries: config.max_retries,
            page_size: config.page_size,
        })
    }

    fn with_mailto(&self, url: String) -> String {
        match &self.mailto {
            Some(mailto) => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}mailto={}", url, sep, mailto)
            }
            None => url,
        }
    }

    /// GET with retry and exponential backoff
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_millis(200 * (2_u64.pow(attempt - 1)));
                tokio::time::sleep(delay).await;
            }

            let result = async {
                let response = self.client.get(url).send().await?;
                let response = response.error_for_status()?;
                response.json::<T>().await
            }
            .await;

            match result {
                Ok(parsed) => return Ok(parsed),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %e,
                        "OpenAlex request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.map(DiffusionError::from).unwrap_or_else(|| {
            DiffusionError::ExternalFetch {
                doi: String::new(),
                message: "Unknown error after retries".to_string(),
            }
        }))
    }

    /// Fetch a single work record by DOI
    async fn get_work(&self, doi: &str) -> Result<ApiWork> {
        let url = self.with_mailto(format!(
            "{}/works/https://doi.org/{}",
            self.base_url,
            normalize_doi(doi)
        ));
        self.get_json(&url).await
    }

    /// Fetch works matching a pipe-joined filter value, chunked to respect
    /// OpenAlex filter-length limits
    async fn get_filtered(&self, filter_key: &str, values: &[String]) -> Result<Vec<Work>> {
        let mut works = Vec::new();

        for chunk in values.chunks(FILTER_BATCH_SIZE) {
            let url = self.with_mailto(format!(
                "{}/works?filter={}:{}&per-page={}",
                self.base_url,
                filter_key,
                chunk.join("|"),
                self.page_size
            ));
            let response: ListResponse = self.get_json(&url).await?;
            works.extend(response.results.into_iter().filter_map(ApiWork::into_work));
        }

        Ok(works)
    }
}

#[async_trait]
impl CitationSource for OpenAlexClient {
    async fn get_forward_citations(&self, doi: &str) -> Result<Vec<Work>> {
        let work = self.get_work(doi).await?;
        let url = self.with_mailto(format!(
            "{}/works?filter=cites:{}&per-page={}",
            self.base_url,
            work.id.rsplit('/').next().unwrap_or(&work.id),
            self.page_size
        ));
        let response: ListResponse = self.get_json(&url).await?;
        Ok(response.results.into_iter().filter_map(ApiWork::into_work).collect())
    }

    async fn get_backward_citations(&self, doi: &str) -> Result<Vec<Work>> {
        let work = self.get_work(doi).await?;
        if work.referenced_works.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = work
            .referenced_works
            .iter()
            .map(|id| id.rsplit('/').next().unwrap_or(id).to_string())
            .collect();
        self.get_filtered("openalex", &ids).await
    }

    async fn get_works_by_dois(&self, dois: &[String]) -> Result<Vec<Work>> {
        if dois.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<String> = dois.iter().map(|d| normalize_doi(d)).collect();
        self.get_filtered("doi", &values).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconstruct_abstract() {
        let mut index = HashMap::new();
        index.insert("citation".to_string(), vec![0]);
        index.insert("networks".to_string(), vec![1, 3]);
        index.insert("of".to_string(), vec![2]);

        assert_eq!(
            reconstruct_abstract(index),
            "citation networks of networks"
        );
    }

    #[test]
    fn test_api_work_without_doi_skipped() {
        let work = ApiWork {
            id: "https://openalex.org/W1".to_string(),
            doi: None,
            display_name: Some("No DOI".to_string()),
            publication_year: Some(2020),
            cited_by_count: 5,
            authorships: vec![],
            primary_location: None,
            open_access: None,
            abstract_inverted_index: None,
            referenced_works: vec![],
        };
        assert!(work.into_work().is_none());
    }

    #[test]
    fn test_mailto_appended() {
        let config = CitationSourceConfig {
            mailto: Some("team@example.org".to_string()),
            ..Default::default()
        };
        let client = OpenAlexClient::new(&config).expect("client");
        let url = client.with_mailto("https://api.openalex.org/works?filter=x".to_string());
        assert!(url.ends_with("&mailto=team@example.org"));
    }
}
