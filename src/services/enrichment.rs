//! Third-party business data lookup used to backfill a new business.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{BusinessInput, EnrichmentResult};

/// HTTP connect timeout for enrichment calls.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// HTTP total timeout for enrichment calls.
const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Plain-text business identity sent to the lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentQuery {
    pub name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl From<&BusinessInput> for EnrichmentQuery {
    fn from(input: &BusinessInput) -> Self {
        Self {
            name: input.name.clone(),
            address: input.mailing_address.clone(),
            city: input.mailing_city.clone(),
            state: input.mailing_state.clone(),
            zip: input.mailing_zip.clone(),
        }
    }
}

#[async_trait]
pub trait EnrichmentLookup: Send + Sync {
    async fn lookup_business_data(&self, query: &EnrichmentQuery) -> AppResult<EnrichmentResult>;
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default, alias = "registeredAddress")]
    registered_address: Option<String>,
    #[serde(default, alias = "employeeCount", alias = "num_employees")]
    employee_count: Option<i32>,
}

/// Enrichment over HTTP: `POST {base_url}/lookup` with the query as JSON.
#[derive(Clone)]
pub struct HttpEnrichmentClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpEnrichmentClient {
    pub fn new(base_url: &str) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Storage(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[async_trait]
impl EnrichmentLookup for HttpEnrichmentClient {
    async fn lookup_business_data(&self, query: &EnrichmentQuery) -> AppResult<EnrichmentResult> {
        let url = format!("{}/lookup", self.base_url);
        debug!("Enrichment lookup for business '{}'", query.name);

        let response = self
            .http_client
            .post(&url)
            .json(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Storage(format!("Enrichment lookup failed: {}", e)))?;

        let body: LookupResponse = response
            .json()
            .await
            .map_err(|e| AppError::Storage(format!("Invalid enrichment response: {}", e)))?;

        Ok(EnrichmentResult {
            registered_address: body.registered_address.filter(|a| !a.trim().is_empty()),
            employee_count: body.employee_count,
        })
    }
}
