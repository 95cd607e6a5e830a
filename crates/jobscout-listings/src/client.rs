//! Listings API client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use jobscout_core::config::ListingsConfig;
use jobscout_core::error::{JobscoutError, Result};
use jobscout_core::types::{SearchParams, Vacancy};

/// The API rejects larger pages.
const MAX_PER_PAGE: u32 = 100;
/// The API rejects longer recency windows.
const MAX_PERIOD_DAYS: u32 = 30;

/// One page of search results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub items: Vec<Vacancy>,
    /// Total matched count; may exceed `items.len()`.
    #[serde(default)]
    pub found: u32,
}

/// A node of the hierarchical area tree.
///
/// The API encodes ids as strings; they are parsed to integers when the
/// area index is built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaNode {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub areas: Vec<AreaNode>,
}

/// Interface to the remote vacancy source.
///
/// The chat engine only depends on this trait; [`ListingsClient`] is
/// the production implementation.
#[async_trait]
pub trait VacancySource: Send + Sync {
    /// Parameterized vacancy search.
    async fn search(&self, params: &SearchParams) -> Result<SearchPage>;

    /// Full record for a single vacancy.
    async fn vacancy(&self, id: &str) -> Result<Vacancy>;

    /// The full hierarchical area tree.
    async fn areas(&self) -> Result<Vec<AreaNode>>;
}

/// reqwest-backed listings API client.
pub struct ListingsClient {
    http: reqwest::Client,
    base_url: String,
}

impl ListingsClient {
    /// Build a client with the configured base URL and timeout.
    pub fn new(config: &ListingsConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| JobscoutError::Listings(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn query_pairs(params: &SearchParams) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("per_page", params.per_page.min(MAX_PER_PAGE).to_string()),
            ("page", params.page.to_string()),
            ("period", params.period.min(MAX_PERIOD_DAYS).to_string()),
        ];
        if let Some(ref text) = params.text {
            if !text.is_empty() {
                pairs.push(("text", text.clone()));
            }
        }
        if let Some(area) = params.area {
            pairs.push(("area", area.to_string()));
        }
        if let Some(salary) = params.salary {
            pairs.push(("salary", salary.to_string()));
        }
        if params.only_with_salary {
            pairs.push(("only_with_salary", "true".to_string()));
        }
        if let Some(experience) = params.experience {
            pairs.push(("experience", experience.as_code().to_string()));
        }
        if let Some(schedule) = params.schedule {
            pairs.push(("schedule", schedule.as_code().to_string()));
        }
        if let Some(employment) = params.employment {
            pairs.push(("employment", employment.as_code().to_string()));
        }
        pairs
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        query: &[(&'static str, String)],
    ) -> Result<T> {
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| JobscoutError::Listings(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(JobscoutError::NotFound(format!("resource at {}", url)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, status = %status, "Listings API returned an error");
            return Err(JobscoutError::Listings(format!(
                "HTTP {} from {}: {}",
                status, url, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| JobscoutError::Decode(format!("listings response from {}: {}", url, e)))
    }
}

#[async_trait]
impl VacancySource for ListingsClient {
    async fn search(&self, params: &SearchParams) -> Result<SearchPage> {
        let url = format!("{}/vacancies", self.base_url);
        let query = Self::query_pairs(params);
        debug!(url = %url, ?query, "Searching vacancies");

        let page: SearchPage = self.get_json(url, &query).await?;
        info!(
            found = page.found,
            retrieved = page.items.len(),
            "Vacancy search completed"
        );
        Ok(page)
    }

    async fn vacancy(&self, id: &str) -> Result<Vacancy> {
        let url = format!("{}/vacancies/{}", self.base_url, id);
        debug!(url = %url, "Fetching vacancy");
        self.get_json(url, &[]).await
    }

    async fn areas(&self) -> Result<Vec<AreaNode>> {
        let url = format!("{}/areas", self.base_url);
        debug!(url = %url, "Fetching area tree");
        self.get_json(url, &[]).await
    }
}
