//! Backend URL construction
//!
//! Query parameters are appended in sorted key order so the same query
//! always encodes to the same URL.

use crate::error::{CostError, Result};
use crate::models::PredictionRequest;
use crate::selector::AllocationFilterSet;
use url::Url;

/// Allocation endpoint path
pub const ALLOCATION_PATH: &str = "/model/allocation";
/// Spec-cost prediction endpoint path
pub const PREDICTION_PATH: &str = "/model/prediction/speccost";

/// One allocation request: a window, optional filters, optional aggregation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationQuery {
    /// `"<start>,<end>"` or a shorthand such as `"30d"`
    pub window: String,
    pub filter: AllocationFilterSet,
    /// e.g. `["namespace", "controller"]`
    pub aggregate_by: Vec<String>,
}

impl AllocationQuery {
    pub fn new(window: impl Into<String>) -> Self {
        Self {
            window: window.into(),
            ..Default::default()
        }
    }

    pub fn with_filter(mut self, filter: AllocationFilterSet) -> Self {
        self.filter = filter;
        self
    }

    pub fn aggregate(mut self, keys: &[&str]) -> Self {
        self.aggregate_by = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

fn parse_base(base_url: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|source| CostError::InvalidBaseUrl {
        url: base_url.to_string(),
        source,
    })?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// Encode filters as `key:"value"` terms joined by `+`
pub fn encode_filter(filter: &AllocationFilterSet) -> String {
    filter
        .iter()
        .map(|(k, v)| format!("{}:\"{}\"", k, v))
        .collect::<Vec<_>>()
        .join("+")
}

/// Build the allocation URL for `query` against `base_url`
///
/// Accumulation and idle allocation are always disabled so the backend
/// returns one set of entries per period without synthetic idle rows.
pub fn build_allocation_url(base_url: &str, query: &AllocationQuery) -> Result<Url> {
    let mut url = parse_base(base_url, ALLOCATION_PATH)?;

    {
        let mut params = url.query_pairs_mut();
        params.append_pair("accumulate", "false");
        if !query.aggregate_by.is_empty() {
            params.append_pair("aggregate", &query.aggregate_by.join(","));
        }
        if !query.filter.is_empty() {
            params.append_pair("filter", &encode_filter(&query.filter));
        }
        params.append_pair("idle", "false");
        params.append_pair("shareIdle", "false");
        params.append_pair("window", &query.window);
    }

    Ok(url)
}

/// Build the spec-cost prediction URL
///
/// `clusterID` and `defaultNamespace` are always sent; `window` and
/// `noUsage` only when set.
pub fn build_prediction_url(base_url: &str, request: &PredictionRequest) -> Result<Url> {
    let mut url = parse_base(base_url, PREDICTION_PATH)?;

    {
        let mut params = url.query_pairs_mut();
        params.append_pair("clusterID", &request.cluster_id);
        params.append_pair("defaultNamespace", &request.default_namespace);
        if request.no_usage {
            params.append_pair("noUsage", "true");
        }
        if !request.window.is_empty() {
            params.append_pair("window", &request.window);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn params(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_window_round_trips_verbatim() {
        for window in ["30d", "2024-01-01T00:00:00Z,2024-01-31T23:59:59Z", "1h30m"] {
            let url =
                build_allocation_url("http://localhost:9090", &AllocationQuery::new(window))
                    .unwrap();
            assert_eq!(url.path(), ALLOCATION_PATH);
            assert_eq!(params(&url).get("window").map(String::as_str), Some(window));
        }
    }

    #[test]
    fn test_fixed_policy_parameters() {
        let url =
            build_allocation_url("http://localhost:9090", &AllocationQuery::new("7d")).unwrap();
        let params = params(&url);
        assert_eq!(params["accumulate"], "false");
        assert_eq!(params["idle"], "false");
        assert_eq!(params["shareIdle"], "false");
        assert!(!params.contains_key("filter"));
        assert!(!params.contains_key("aggregate"));
    }

    #[test]
    fn test_filter_terms_are_encoded() {
        let filter = AllocationFilterSet::new()
            .with("namespace", "default")
            .with("pod", "test-pod");
        let query = AllocationQuery::new("30d").with_filter(filter);
        let url = build_allocation_url("http://localhost:9090", &query).unwrap();

        let params = params(&url);
        let terms: Vec<&str> = params["filter"].split('+').collect();
        assert_eq!(terms.len(), 2);
        assert!(terms.contains(&"namespace:\"default\""));
        assert!(terms.contains(&"pod:\"test-pod\""));
    }

    #[test]
    fn test_aggregate_keys_joined_with_comma() {
        let query = AllocationQuery::new("30d").aggregate(&["namespace", "controller"]);
        let url = build_allocation_url("http://localhost:9090", &query).unwrap();
        assert_eq!(params(&url)["aggregate"], "namespace,controller");
    }

    #[test]
    fn test_base_path_and_query_are_replaced() {
        let url = build_allocation_url(
            "https://kubecost.example.com/some/prefix?stale=1",
            &AllocationQuery::new("1d"),
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("kubecost.example.com"));
        assert_eq!(url.path(), ALLOCATION_PATH);
        assert!(!params(&url).contains_key("stale"));
    }

    #[test]
    fn test_encoding_is_stable() {
        let query = AllocationQuery::new("30d").with_filter(
            AllocationFilterSet::new()
                .with("pod", "b")
                .with("namespace", "a"),
        );
        let first = build_allocation_url("http://localhost:9090", &query).unwrap();
        let second = build_allocation_url("http://localhost:9090", &query).unwrap();
        assert_eq!(first.as_str(), second.as_str());
    }

    #[test]
    fn test_invalid_base_url() {
        for base in ["", "not a url", "://missing-scheme"] {
            assert!(matches!(
                build_allocation_url(base, &AllocationQuery::new("30d")),
                Err(CostError::InvalidBaseUrl { .. })
            ));
        }
    }

    #[test]
    fn test_prediction_url_parameters() {
        let request = PredictionRequest {
            cluster_id: "cluster-one".to_string(),
            default_namespace: "default".to_string(),
            window: "2d".to_string(),
            no_usage: true,
            workload_spec: String::new(),
        };
        let url = build_prediction_url("http://localhost:9090", &request).unwrap();
        let params = params(&url);

        assert_eq!(url.path(), PREDICTION_PATH);
        assert_eq!(params["clusterID"], "cluster-one");
        assert_eq!(params["defaultNamespace"], "default");
        assert_eq!(params["window"], "2d");
        assert_eq!(params["noUsage"], "true");
    }

    #[test]
    fn test_prediction_url_omits_optional_parameters() {
        let request = PredictionRequest {
            cluster_id: "c".to_string(),
            default_namespace: "ns".to_string(),
            ..Default::default()
        };
        let url = build_prediction_url("http://localhost:9090", &request).unwrap();
        let params = params(&url);
        assert!(!params.contains_key("window"));
        assert!(!params.contains_key("noUsage"));
    }
}
