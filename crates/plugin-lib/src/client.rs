//! HTTP client for the Kubecost cost-model API
//!
//! Composes window resolution, selector mapping, URL building and response
//! normalization into the three operations the plugin exposes. Each call is
//! a single round trip: failures are returned as-is and never retried.

use crate::aggregate::project;
use crate::allocation::{decode_allocation_response, normalize, AllocationResponse};
use crate::config::PluginConfig;
use crate::error::{CostError, Result};
use crate::models::{NormalizedCostResponse, PredictionRequest, PredictionResult, ProjectedCost};
use crate::query::{build_allocation_url, build_prediction_url, AllocationQuery};
use crate::selector::map_selector;
use crate::window::{WindowResolver, WindowSpec};
use anyhow::Context;
use chrono::{Duration, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// Trailing period used for projections
const PROJECTION_DAYS: i64 = 30;

const JSON_CONTENT_TYPE: &str = "application/json";
const YAML_CONTENT_TYPE: &str = "application/yaml";

/// Kubecost API client
///
/// Owns one connection pool for its whole lifetime. Cloning is cheap and
/// clones share the pool, so a single instance can serve concurrent calls.
#[derive(Clone)]
pub struct KubecostClient {
    config: Arc<PluginConfig>,
    http: Client,
    windows: WindowResolver,
}

impl KubecostClient {
    /// Build a client and its HTTP transport
    pub fn new(config: PluginConfig) -> anyhow::Result<Self> {
        let mut builder = Client::builder().danger_accept_invalid_certs(config.tls_skip_verify);
        // Zero disables the deadline
        if !config.timeout.is_zero() {
            builder = builder.timeout(config.timeout);
        }
        let http = builder.build().context("Failed to create HTTP client")?;

        let windows = WindowResolver::new(config.default_window.clone());

        Ok(Self {
            config: Arc::new(config),
            http,
            windows,
        })
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Costs for `selector` over `window`, one point per allocation entry
    pub async fn fetch_actual_cost(
        &self,
        selector: &str,
        window: &WindowSpec,
    ) -> Result<NormalizedCostResponse> {
        let window = self.windows.resolve(window)?;
        let filter = map_selector(selector);
        if filter.is_empty() {
            debug!(selector = %selector, "Selector produced no filters, querying all allocations");
        }

        self.allocation(&AllocationQuery::new(window).with_filter(filter))
            .await
    }

    /// Monthly projection from the trailing 30 days of `selector`'s costs
    pub async fn fetch_projected_cost(&self, selector: &str) -> Result<ProjectedCost> {
        let end = Utc::now();
        let start = end - Duration::days(PROJECTION_DAYS);

        let actual = self
            .fetch_actual_cost(selector, &WindowSpec::between(start, end))
            .await?;

        Ok(project(&actual.items))
    }

    /// Run an allocation query and normalize the result
    pub async fn allocation(&self, query: &AllocationQuery) -> Result<NormalizedCostResponse> {
        let detailed = self.detailed_allocation(query).await?;
        Ok(normalize(&detailed))
    }

    /// Run an allocation query and return the backend payload unflattened
    pub async fn detailed_allocation(&self, query: &AllocationQuery) -> Result<AllocationResponse> {
        let url = build_allocation_url(&self.config.base_url, query)?;

        let response = self
            .authorize(self.http.get(url.clone()))
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .send()
            .await?;

        let body = success_body(&url, response).await?;
        let decoded = decode_allocation_response(&body).map_err(|e| {
            warn!(url = %url, error = %e, "Rejected allocation response");
            e
        })?;

        debug!(
            url = %url,
            periods = decoded.data.len(),
            entries = decoded.entries().count(),
            items = decoded.items().len(),
            "Fetched allocation"
        );

        Ok(decoded)
    }

    /// Ask the backend what a workload spec would cost
    ///
    /// The spec is sent verbatim; it is labelled JSON when it parses as
    /// JSON and YAML otherwise. The returned figures are not interpreted.
    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        let request = self.with_prediction_defaults(request);
        let url = build_prediction_url(&self.config.base_url, &request)?;

        let response = self
            .authorize(self.http.post(url.clone()))
            .header(CONTENT_TYPE, spec_content_type(&request.workload_spec))
            .header(ACCEPT, JSON_CONTENT_TYPE)
            .body(request.workload_spec.clone())
            .send()
            .await?;

        let body = success_body(&url, response).await?;
        let result: PredictionResult = serde_json::from_str(&body)?;

        debug!(
            url = %url,
            cluster_id = %request.cluster_id,
            cost_change = %result.cost_change,
            "Fetched spec cost prediction"
        );

        Ok(result)
    }

    /// Fill each empty request field from configuration independently
    pub fn with_prediction_defaults(&self, request: &PredictionRequest) -> PredictionRequest {
        let or_default = |value: &str, default: &str| {
            if value.is_empty() {
                default.to_string()
            } else {
                value.to_string()
            }
        };

        PredictionRequest {
            cluster_id: or_default(&request.cluster_id, &self.config.cluster_id),
            default_namespace: or_default(
                &request.default_namespace,
                &self.config.default_namespace,
            ),
            window: or_default(&request.window, &self.config.prediction_window),
            no_usage: request.no_usage,
            workload_spec: request.workload_spec.clone(),
        }
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.config.api_token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.api_token)
        }
    }
}

/// Read the body of a 2xx response; anything else becomes `BackendHttp`
async fn success_body(url: &Url, response: Response) -> Result<String> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(url = %url, status = status.as_u16(), "Kubecost API returned an error status");
        return Err(CostError::BackendHttp {
            status: status.as_u16(),
            body,
        });
    }

    Ok(response.text().await?)
}

/// Content type for a workload spec: JSON if it parses, YAML otherwise
pub fn spec_content_type(spec: &str) -> &'static str {
    if serde_json::from_str::<serde::de::IgnoredAny>(spec).is_ok() {
        JSON_CONTENT_TYPE
    } else {
        YAML_CONTENT_TYPE
    }
}
