//! Allocation API payloads and their normalization
//!
//! The backend wraps allocations as `data: [ { <name>: <entry>, ... }, ... ]`,
//! one object per period. Entry names carry no information we need, so each
//! period object is decoded straight into a list of entries in document
//! order and the names are dropped.
//!
//! Some deployments answer with a flat `{"items": [...]}` list instead and
//! carry no envelope code. Both shapes normalize to the same cost points.

use crate::error::{CostError, Result};
use crate::models::{CostPoint, NormalizedCostResponse};
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Application-level success code in the response envelope
pub const SUCCESS_CODE: i64 = 200;

/// Full response envelope of `/model/allocation`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllocationResponse {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    /// One list of entries per period
    #[serde(default, deserialize_with = "entries_by_period")]
    pub data: Vec<Vec<AllocationEntry>>,
    /// Flat point list, present instead of `data` on some deployments
    #[serde(default)]
    pub items: Option<Vec<AllocationItem>>,
}

impl AllocationResponse {
    /// Fail with [`CostError::BackendApplication`] unless `code` is 200
    ///
    /// A flat `items` body without a code is accepted as is.
    pub fn ensure_success(self) -> Result<Self> {
        match self.code {
            Some(SUCCESS_CODE) => Ok(self),
            None if self.items.is_some() => Ok(self),
            code => Err(CostError::BackendApplication {
                code: code.unwrap_or_default(),
                message: self.message,
            }),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &AllocationEntry> {
        self.data.iter().flatten()
    }

    pub fn items(&self) -> &[AllocationItem] {
        self.items.as_deref().unwrap_or_default()
    }
}

/// One point of the flat `items` shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocationItem {
    pub start: String,
    pub end: String,
    pub cost: f64,
    pub cpu_cost: f64,
    pub ram_cost: f64,
    pub gpu_cost: f64,
    pub pvc_cost: f64,
    pub network_cost: f64,
}

impl AllocationItem {
    pub fn to_cost_point(&self) -> CostPoint {
        CostPoint {
            start: self.start.clone(),
            end: self.end.clone(),
            total_cost: self.cost,
            cpu_cost: self.cpu_cost,
            ram_cost: self.ram_cost,
            gpu_cost: self.gpu_cost,
            pv_cost: self.pvc_cost,
            network_cost: self.network_cost,
        }
    }
}

/// One allocation as reported by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocationEntry {
    pub name: String,
    pub properties: AllocationProperties,
    pub window: AllocationWindow,
    pub start: String,
    pub end: String,
    pub minutes: f64,
    pub cpu_cores: f64,
    pub cpu_core_hours: f64,
    pub cpu_cost: f64,
    pub cpu_efficiency: f64,
    pub gpu_count: f64,
    pub gpu_hours: f64,
    pub gpu_cost: f64,
    pub network_cost: f64,
    pub load_balancer_cost: f64,
    pub pv_cost: f64,
    pub ram_bytes: f64,
    pub ram_byte_hours: f64,
    pub ram_cost: f64,
    pub ram_efficiency: f64,
    pub shared_cost: f64,
    pub external_cost: f64,
    pub total_cost: f64,
    pub total_efficiency: f64,
}

impl AllocationEntry {
    /// Period bounds, preferring the top-level fields over `window`
    pub fn period(&self) -> (&str, &str) {
        let start = if self.start.is_empty() {
            &self.window.start
        } else {
            &self.start
        };
        let end = if self.end.is_empty() {
            &self.window.end
        } else {
            &self.end
        };
        (start, end)
    }

    pub fn to_cost_point(&self) -> CostPoint {
        let (start, end) = self.period();
        CostPoint {
            start: start.to_string(),
            end: end.to_string(),
            total_cost: self.total_cost,
            cpu_cost: self.cpu_cost,
            ram_cost: self.ram_cost,
            gpu_cost: self.gpu_cost,
            pv_cost: self.pv_cost,
            network_cost: self.network_cost,
        }
    }
}

/// Kubernetes metadata attached to an allocation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AllocationProperties {
    pub cluster: String,
    pub node: String,
    pub container: String,
    pub controller: String,
    pub controller_kind: String,
    pub namespace: String,
    pub pod: String,
    pub services: Vec<String>,
    pub labels: HashMap<String, String>,
    pub annotations: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationWindow {
    pub start: String,
    pub end: String,
}

/// Decode a raw allocation body and check the envelope code
pub fn decode_allocation_response(body: &str) -> Result<AllocationResponse> {
    let response: AllocationResponse = serde_json::from_str(body)?;
    response.ensure_success()
}

/// Flatten every period's entries, then any flat items, into cost points
pub fn normalize(response: &AllocationResponse) -> NormalizedCostResponse {
    let nested = response.entries().map(AllocationEntry::to_cost_point);
    let flat = response.items().iter().map(AllocationItem::to_cost_point);

    NormalizedCostResponse {
        items: nested.chain(flat).collect(),
    }
}

/// `data` may be `null`, and individual entries may be `null` too
fn entries_by_period<'de, D>(deserializer: D) -> std::result::Result<Vec<Vec<AllocationEntry>>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Periods;

    impl<'de> Visitor<'de> for Periods {
        type Value = Vec<Vec<AllocationEntry>>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a list of allocation maps")
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: SeqAccess<'de>,
        {
            let mut periods = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(Period(entries)) = seq.next_element()? {
                periods.push(entries);
            }
            Ok(periods)
        }
    }

    deserializer.deserialize_any(Periods)
}

/// One period object, keys discarded
struct Period(Vec<AllocationEntry>);

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PeriodVisitor;

        impl<'de> Visitor<'de> for PeriodVisitor {
            type Value = Period;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of allocation name to allocation")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(Period(Vec::new()))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((IgnoredAny, entry)) =
                    map.next_entry::<IgnoredAny, Option<AllocationEntry>>()?
                {
                    if let Some(entry) = entry {
                        entries.push(entry);
                    }
                }
                Ok(Period(entries))
            }
        }

        deserializer.deserialize_any(PeriodVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_DAYS: &str = r#"{
        "code": 200,
        "status": "success",
        "data": [
            {
                "default/web": {
                    "name": "default/web",
                    "properties": {"namespace": "default", "pod": "web", "labels": {"app": "web"}},
                    "start": "2024-01-01T00:00:00Z",
                    "end": "2024-01-02T00:00:00Z",
                    "cpuCost": 1.5,
                    "ramCost": 0.75,
                    "gpuCost": 0.0,
                    "pvCost": 0.25,
                    "networkCost": 0.1,
                    "loadBalancerCost": 2.0,
                    "totalCost": 4.6
                },
                "default/api": {
                    "name": "default/api",
                    "window": {"start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z"},
                    "totalCost": 3.0
                }
            },
            {
                "default/web": {
                    "name": "default/web",
                    "start": "2024-01-02T00:00:00Z",
                    "end": "2024-01-03T00:00:00Z",
                    "totalCost": 5.0
                }
            }
        ]
    }"#;

    #[test]
    fn test_decode_keeps_period_structure() {
        let response = decode_allocation_response(TWO_DAYS).unwrap();
        assert_eq!(response.status, "success");
        assert_eq!(response.data.len(), 2);
        assert_eq!(response.data[0].len(), 2);
        assert_eq!(response.data[1].len(), 1);
    }

    #[test]
    fn test_normalize_emits_one_point_per_entry() {
        let response = decode_allocation_response(TWO_DAYS).unwrap();
        let normalized = normalize(&response);
        assert_eq!(normalized.len(), 3);

        let mut totals: Vec<f64> = normalized.items[..2].iter().map(|p| p.total_cost).collect();
        totals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(totals, vec![3.0, 4.6]);

        // Periods stay in backend order
        assert_eq!(normalized.items[2].start, "2024-01-02T00:00:00Z");
        assert_eq!(normalized.items[2].total_cost, 5.0);
    }

    #[test]
    fn test_total_cost_is_not_recomputed() {
        let response = decode_allocation_response(TWO_DAYS).unwrap();
        let web = normalize(&response)
            .items
            .into_iter()
            .find(|p| p.cpu_cost == 1.5)
            .unwrap();
        assert_eq!(web.total_cost, 4.6);
        assert_eq!(web.ram_cost, 0.75);
        assert_eq!(web.pv_cost, 0.25);
        assert_eq!(web.network_cost, 0.1);
        let categories = web.cpu_cost + web.ram_cost + web.gpu_cost + web.pv_cost + web.network_cost;
        assert!(categories < web.total_cost);
    }

    #[test]
    fn test_window_fallback_when_direct_fields_empty() {
        let response = decode_allocation_response(TWO_DAYS).unwrap();
        let api = normalize(&response)
            .items
            .into_iter()
            .find(|p| p.total_cost == 3.0)
            .unwrap();
        assert_eq!(api.start, "2024-01-01T00:00:00Z");
        assert_eq!(api.end, "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_direct_fields_win_over_window() {
        let entry = AllocationEntry {
            start: "direct-start".to_string(),
            end: String::new(),
            window: AllocationWindow {
                start: "window-start".to_string(),
                end: "window-end".to_string(),
            },
            ..Default::default()
        };
        assert_eq!(entry.period(), ("direct-start", "window-end"));
    }

    #[test]
    fn test_n_entries_yield_n_points() {
        let mut period = serde_json::Map::new();
        for i in 0..25 {
            period.insert(
                format!("ns/pod-{}", i),
                serde_json::json!({ "totalCost": i as f64 * 1.25 }),
            );
        }
        let body = serde_json::json!({ "code": 200, "data": [period] }).to_string();
        let normalized = normalize(&decode_allocation_response(&body).unwrap());

        assert_eq!(normalized.len(), 25);
        let mut totals: Vec<f64> = normalized.items.iter().map(|p| p.total_cost).collect();
        totals.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f64> = (0..25).map(|i| i as f64 * 1.25).collect();
        assert_eq!(totals, expected);
    }

    #[test]
    fn test_application_error_code() {
        let body = r#"{"code": 500, "status": "error", "message": "query failed", "data": null}"#;
        match decode_allocation_response(body) {
            Err(CostError::BackendApplication { code, message }) => {
                assert_eq!(code, 500);
                assert_eq!(message, "query failed");
            }
            other => panic!("expected BackendApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_flat_items_without_code() {
        let body = r#"{"items": [
            {"start": "2024-01-01T00:00:00Z", "end": "2024-01-02T00:00:00Z", "cost": 5.0, "cpuCost": 2.0, "pvcCost": 0.5},
            {"start": "2024-01-02T00:00:00Z", "end": "2024-01-03T00:00:00Z", "cost": 7.0}
        ]}"#;
        let normalized = normalize(&decode_allocation_response(body).unwrap());

        assert_eq!(normalized.len(), 2);
        let first = &normalized.items[0];
        assert_eq!(first.start, "2024-01-01T00:00:00Z");
        assert_eq!(first.total_cost, 5.0);
        assert_eq!(first.cpu_cost, 2.0);
        assert_eq!(first.pv_cost, 0.5);
        assert_eq!(normalized.items[1].total_cost, 7.0);
    }

    #[test]
    fn test_missing_code_without_items_fails() {
        match decode_allocation_response(r#"{"data": []}"#) {
            Err(CostError::BackendApplication { code, .. }) => assert_eq!(code, 0),
            other => panic!("expected BackendApplication, got {:?}", other),
        }
    }

    #[test]
    fn test_null_data_and_entries() {
        let body = r#"{"code": 200, "data": [null, {"x": null, "y": {"totalCost": 1.0}}]}"#;
        let normalized = normalize(&decode_allocation_response(body).unwrap());
        assert_eq!(normalized.len(), 1);

        let body = r#"{"code": 200, "status": "success", "data": null}"#;
        assert!(normalize(&decode_allocation_response(body).unwrap()).is_empty());
    }

    #[test]
    fn test_malformed_body_is_decode_error() {
        assert!(matches!(
            decode_allocation_response("<html>oops</html>"),
            Err(CostError::Decode(_))
        ));
        assert!(matches!(
            decode_allocation_response(r#"{"code": 200, "data": {"not": "a list"}}"#),
            Err(CostError::Decode(_))
        ));
    }
}
