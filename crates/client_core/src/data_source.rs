use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::{AggregateStats, RegistrationRecord, SortOrder},
    protocol::{RegistrationCountsResponse, RegistrationListResponse},
};
use tracing::debug;

use crate::error::RetrievalError;

/// One settled retrieval: the canonical record list plus the aggregate
/// counters that belong with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<RegistrationRecord>,
    pub stats: AggregateStats,
}

/// Where records and counts come from. The two concrete implementations
/// differ in who aggregates and who sorts; everything downstream of the
/// trait is identical.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, sort: SortOrder) -> Result<FetchOutcome, RetrievalError>;
}

/// Which aggregation variant of the service this deployment talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AggregationMode {
    /// One call for the raw list; counts and ordering computed locally.
    #[default]
    Client,
    /// Paired calls for precomputed counts and a pre-sorted list.
    Server,
}

impl std::str::FromStr for AggregationMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(format!(
                "unknown aggregation mode '{raw}', expected client or server"
            )),
        }
    }
}

/// Build the data source matching the configured aggregation variant. The
/// caller supplies the HTTP client so deployment concerns like request
/// timeouts are configured in one place.
pub fn source_for(mode: AggregationMode, http: Client, base_url: &str) -> Arc<dyn DataSource> {
    match mode {
        AggregationMode::Client => {
            Arc::new(ClientAggregatedSource::with_http_client(http, base_url))
        }
        AggregationMode::Server => {
            Arc::new(ServerAggregatedSource::with_http_client(http, base_url))
        }
    }
}

fn normalized_base(raw: impl Into<String>) -> String {
    let raw = raw.into();
    raw.trim_end_matches('/').to_string()
}

async fn get_json<T: serde::de::DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> Result<T, RetrievalError> {
    let body = request.send().await?.error_for_status()?.bytes().await?;
    let value: serde_json::Value =
        serde_json::from_slice(&body).map_err(|err| RetrievalError::Payload(err.to_string()))?;
    // individual fields may be absent, but the top level must be an object
    if !value.is_object() {
        return Err(RetrievalError::Payload(format!(
            "expected a JSON object, got {value}"
        )));
    }
    serde_json::from_value(value).map_err(|err| RetrievalError::Payload(err.to_string()))
}

/// Variant that pulls the whole record list in one call and aggregates
/// locally: counts by exact type match, ordering by a stable local sort on
/// `created_at`.
pub struct ClientAggregatedSource {
    http: Client,
    base_url: String,
}

impl ClientAggregatedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalized_base(base_url),
        }
    }
}

#[async_trait]
impl DataSource for ClientAggregatedSource {
    async fn fetch(&self, sort: SortOrder) -> Result<FetchOutcome, RetrievalError> {
        let response: RegistrationListResponse =
            get_json(self.http.get(format!("{}/registrations", self.base_url))).await?;

        let mut records: Vec<RegistrationRecord> = response
            .data
            .into_iter()
            .map(|payload| payload.into_record())
            .collect();
        let stats = AggregateStats::tally(&records);

        // stable sorts, so equal timestamps keep their served order
        match sort {
            SortOrder::Ascending => records.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Descending => records.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        }

        debug!(
            count = records.len(),
            sort = sort.as_query_value(),
            "registrations: client-side aggregation complete"
        );
        Ok(FetchOutcome { records, stats })
    }
}

/// Variant that trusts the service for both numbers and ordering: counts and
/// the pre-sorted list are fetched concurrently and paired. If either call
/// fails the whole retrieval fails.
pub struct ServerAggregatedSource {
    http: Client,
    base_url: String,
}

impl ServerAggregatedSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http_client(Client::new(), base_url)
    }

    pub fn with_http_client(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: normalized_base(base_url),
        }
    }

    async fn fetch_counts(&self) -> Result<RegistrationCountsResponse, RetrievalError> {
        get_json(self.http.get(format!("{}/counts", self.base_url))).await
    }

    async fn fetch_sorted(&self, sort: SortOrder) -> Result<RegistrationListResponse, RetrievalError> {
        get_json(
            self.http
                .get(format!("{}/registrations", self.base_url))
                .query(&[("sort", sort.as_query_value())]),
        )
        .await
    }
}

#[async_trait]
impl DataSource for ServerAggregatedSource {
    async fn fetch(&self, sort: SortOrder) -> Result<FetchOutcome, RetrievalError> {
        let (counts, list) = tokio::try_join!(self.fetch_counts(), self.fetch_sorted(sort))?;

        let records: Vec<RegistrationRecord> = list
            .data
            .into_iter()
            .map(|payload| payload.into_record())
            .collect();

        debug!(
            count = records.len(),
            reported_total = counts.total,
            "registrations: server-side aggregation paired"
        );
        Ok(FetchOutcome {
            records,
            stats: counts.into(),
        })
    }
}

#[cfg(test)]
#[path = "tests/data_source_tests.rs"]
mod tests;
