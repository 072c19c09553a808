//! CostSource RPC service backed by the Kubecost client
//!
//! Each RPC maps onto one client operation. Metrics and request logs are
//! recorded here so the client itself stays free of shared state.

use crate::aggregate::DEFAULT_CURRENCY;
use crate::client::KubecostClient;
use crate::error::CostError;
use crate::health::{components, HealthRegistry};
use crate::models::{CostPoint, PredictionRequest};
use crate::observability::{PluginMetrics, StructuredLogger};
use crate::proto::{
    ActualCostResult, CostSource, GetActualCostRequest, GetActualCostResponse,
    GetPricingSpecRequest, GetPricingSpecResponse, GetProjectedCostRequest,
    GetProjectedCostResponse, NameRequest, NameResponse, PredictSpecCostRequest,
    PredictSpecCostResponse, PricingSpec, ResourceDescriptor, SupportsRequest, SupportsResponse,
};
use crate::selector::{map_selector, selector_for, ResourceKind};
use crate::window::WindowSpec;
use async_trait::async_trait;
use chrono::DateTime;
use std::collections::HashMap;
use std::time::Instant;
use tonic::{Request, Response, Status};
use tracing::warn;

/// Name reported by the `Name` RPC and stamped on every result
pub const PLUGIN_NAME: &str = "kubecost";

const PRICING_PROVIDER: &str = "kubernetes";
const PRICING_BILLING_MODE: &str = "per_day";

/// Descriptor tag holding the resource's namespace
pub const TAG_NAMESPACE: &str = "namespace";
/// Descriptor tag holding the resource's own name
pub const TAG_NAME: &str = "name";

impl From<CostError> for Status {
    fn from(err: CostError) -> Self {
        let message = err.to_string();
        match err {
            CostError::InvalidWindowFormat(_) => Status::invalid_argument(message),
            CostError::InvalidBaseUrl { .. } => Status::failed_precondition(message),
            CostError::BackendHttp { .. } => Status::unavailable(message),
            CostError::BackendApplication { .. } | CostError::Decode(_) => {
                Status::internal(message)
            }
            CostError::Transport(ref e) if e.is_timeout() => Status::deadline_exceeded(message),
            CostError::Transport(_) => Status::unavailable(message),
        }
    }
}

/// gRPC-facing service; clone freely, clones share the client's pool
#[derive(Clone)]
pub struct CostSourceService {
    client: KubecostClient,
    metrics: PluginMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl CostSourceService {
    pub fn new(client: KubecostClient, metrics: PluginMetrics, health: HealthRegistry) -> Self {
        Self {
            client,
            metrics,
            health,
            logger: StructuredLogger::new(PLUGIN_NAME),
        }
    }

    /// Record latency, backend health and, on failure, the error kind
    async fn finish<T>(
        &self,
        method: &str,
        resource: &str,
        started: Instant,
        result: crate::error::Result<T>,
        count: impl FnOnce(&T) -> usize,
    ) -> Result<T, Status> {
        let elapsed = started.elapsed();
        self.metrics.observe_rpc(method, elapsed);

        match result {
            Ok(value) => {
                self.health.set_healthy(components::KUBECOST_API).await;
                self.logger
                    .log_request(method, resource, elapsed, count(&value));
                Ok(value)
            }
            Err(err) => {
                self.report_backend_failure(&err).await;
                self.metrics.inc_rpc_error(method, err.kind());
                self.logger
                    .log_request_failure(method, resource, err.kind(), &err.to_string());
                Err(err.into())
            }
        }
    }

    /// Caller mistakes leave backend health alone
    async fn report_backend_failure(&self, err: &CostError) {
        match err {
            CostError::InvalidWindowFormat(_) => {}
            CostError::InvalidBaseUrl { .. } => {
                self.health
                    .set_unhealthy(components::KUBECOST_API, err.to_string())
                    .await
            }
            _ => {
                self.health
                    .set_degraded(components::KUBECOST_API, err.to_string())
                    .await
            }
        }
    }
}

#[async_trait]
impl CostSource for CostSourceService {
    async fn name(&self, _request: Request<NameRequest>) -> Result<Response<NameResponse>, Status> {
        Ok(Response::new(NameResponse {
            name: PLUGIN_NAME.to_string(),
        }))
    }

    async fn supports(
        &self,
        request: Request<SupportsRequest>,
    ) -> Result<Response<SupportsResponse>, Status> {
        let resource_type = request
            .into_inner()
            .resource
            .map(|r| r.resource_type)
            .unwrap_or_default();

        let response = match ResourceKind::from_resource_type(&resource_type) {
            Some(_) => SupportsResponse {
                supported: true,
                reason: String::new(),
            },
            None => SupportsResponse {
                supported: false,
                reason: format!("unsupported resource type {:?}", resource_type),
            },
        };

        Ok(Response::new(response))
    }

    async fn get_actual_cost(
        &self,
        request: Request<GetActualCostRequest>,
    ) -> Result<Response<GetActualCostResponse>, Status> {
        const METHOD: &str = "GetActualCost";
        let started = Instant::now();
        let req = request.into_inner();

        let window = WindowSpec::range(req.start, req.end);
        let result = self
            .client
            .fetch_actual_cost(&req.resource_id, &window)
            .await
            .map(|resp| resp.items.iter().map(actual_cost_result).collect::<Vec<_>>());

        let results = self
            .finish(METHOD, &req.resource_id, started, result, Vec::len)
            .await?;
        self.metrics.add_cost_points(results.len());

        Ok(Response::new(GetActualCostResponse { results }))
    }

    async fn get_projected_cost(
        &self,
        request: Request<GetProjectedCostRequest>,
    ) -> Result<Response<GetProjectedCostResponse>, Status> {
        const METHOD: &str = "GetProjectedCost";
        let started = Instant::now();

        let resource = request
            .into_inner()
            .resource
            .ok_or_else(|| Status::invalid_argument("resource descriptor is required"))?;
        let selector = selector_from_descriptor(&resource);

        let result = self.client.fetch_projected_cost(&selector).await;
        let projection = self
            .finish(METHOD, &selector, started, result, |_| 1)
            .await?;

        Ok(Response::new(GetProjectedCostResponse {
            unit_price: projection.unit_price,
            currency: projection.currency,
            cost_per_month: projection.cost_per_month,
            billing_detail: projection.billing_detail,
        }))
    }

    async fn get_pricing_spec(
        &self,
        request: Request<GetPricingSpecRequest>,
    ) -> Result<Response<GetPricingSpecResponse>, Status> {
        let resource = request.into_inner().resource.unwrap_or_default();

        Ok(Response::new(GetPricingSpecResponse {
            spec: Some(pricing_spec(&resource)),
        }))
    }

    async fn predict_spec_cost(
        &self,
        request: Request<PredictSpecCostRequest>,
    ) -> Result<Response<PredictSpecCostResponse>, Status> {
        const METHOD: &str = "PredictSpecCost";
        let started = Instant::now();
        let req = request.into_inner();

        let prediction = PredictionRequest {
            cluster_id: req.cluster_id,
            default_namespace: req.default_namespace,
            window: req.window,
            no_usage: req.no_usage,
            workload_spec: req.workload_spec,
        };
        let resource = prediction.cluster_id.clone();

        let result = self.client.predict(&prediction).await;
        let predicted = self
            .finish(METHOD, &resource, started, result, |_| 1)
            .await?;

        Ok(Response::new(PredictSpecCostResponse {
            cost_before: predicted.cost_before,
            cost_after: predicted.cost_after,
            cost_change: predicted.cost_change,
        }))
    }
}

/// Selector for a host resource descriptor
///
/// The kind comes from the `k8s-<kind>` resource type and identifiers from
/// the `namespace` and `name` tags. Anything unrecognised yields a selector
/// that maps to no filters, matching how malformed selectors are treated.
pub fn selector_from_descriptor(resource: &ResourceDescriptor) -> String {
    let tag = |key: &str| descriptor_tag(resource, key);

    let selector = match ResourceKind::from_resource_type(&resource.resource_type) {
        Some(kind @ (ResourceKind::Namespace | ResourceKind::Node)) => {
            let name = match (kind, tag(TAG_NAME)) {
                (ResourceKind::Namespace, "") => tag(TAG_NAMESPACE),
                (_, name) => name,
            };
            selector_for(kind, &[name])
        }
        Some(kind) => selector_for(kind, &[tag(TAG_NAMESPACE), tag(TAG_NAME)]),
        None => String::new(),
    };

    if map_selector(&selector).is_empty() {
        warn!(
            resource_type = %resource.resource_type,
            selector = %selector,
            "Resource descriptor does not narrow the query, projecting all allocations"
        );
    }

    selector
}

fn descriptor_tag<'a>(resource: &'a ResourceDescriptor, key: &str) -> &'a str {
    resource.tags.get(key).map(String::as_str).unwrap_or("")
}

/// Synthetic pricing description; Kubecost exposes no list prices
pub fn pricing_spec(resource: &ResourceDescriptor) -> PricingSpec {
    PricingSpec {
        provider: PRICING_PROVIDER.to_string(),
        resource_type: resource.resource_type.clone(),
        sku: resource.sku.clone(),
        region: resource.region.clone(),
        billing_mode: PRICING_BILLING_MODE.to_string(),
        rate_per_unit: 0.0,
        currency: DEFAULT_CURRENCY.to_string(),
        description: format!(
            "Kubecost-derived projection for {}",
            resource.resource_type
        ),
        plugin_metadata: HashMap::from([("source".to_string(), PLUGIN_NAME.to_string())]),
    }
}

fn actual_cost_result(point: &CostPoint) -> ActualCostResult {
    ActualCostResult {
        timestamp: point_timestamp(&point.start),
        cost: point.total_cost,
        usage_amount: 0.0,
        usage_unit: String::new(),
        source: PLUGIN_NAME.to_string(),
    }
}

/// Parse an RFC3339 period start; `None` when the backend sent something else
fn point_timestamp(start: &str) -> Option<prost_types::Timestamp> {
    let parsed = DateTime::parse_from_rfc3339(start).ok()?;
    Some(prost_types::Timestamp {
        seconds: parsed.timestamp(),
        nanos: parsed.timestamp_subsec_nanos() as i32,
    })
}
