//! Canonical cost records returned by the plugin

use serde::{Deserialize, Serialize};

/// Cost of one allocation over one period
///
/// `total_cost` is authoritative. The category fields are informational and
/// need not add up to it: load-balancer, shared and external costs have no
/// category of their own here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostPoint {
    pub start: String,
    pub end: String,
    pub total_cost: f64,
    pub cpu_cost: f64,
    pub ram_cost: f64,
    pub gpu_cost: f64,
    pub pv_cost: f64,
    pub network_cost: f64,
}

/// Cost points in the order the backend returned them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCostResponse {
    pub items: Vec<CostPoint>,
}

impl NormalizedCostResponse {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_cost(&self) -> f64 {
        self.items.iter().map(|p| p.total_cost).sum()
    }
}

/// Monthly extrapolation of observed daily cost
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedCost {
    /// Average cost per observed period
    pub unit_price: f64,
    pub currency: String,
    pub cost_per_month: f64,
    /// How the figure was derived; empty when there was nothing to average
    pub billing_detail: String,
}

/// What-if request for the backend's spec-cost prediction
///
/// Empty `cluster_id`, `default_namespace` and `window` are filled from
/// configuration by the client, each on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    #[serde(rename = "clusterID")]
    pub cluster_id: String,
    pub default_namespace: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub window: String,
    #[serde(default)]
    pub no_usage: bool,
    /// YAML or JSON workload manifest, sent as-is
    pub workload_spec: String,
}

/// Backend's before/after/delta figures, kept as the text it sent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    #[serde(default)]
    pub cost_before: String,
    #[serde(default)]
    pub cost_after: String,
    #[serde(default)]
    pub cost_change: String,
}
