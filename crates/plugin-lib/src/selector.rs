//! Resource selector parsing
//!
//! Callers name a Kubernetes resource with a slash-delimited key whose
//! first segment is the kind: `namespace/<ns>`, `pod/<ns>/<pod>`,
//! `controller/<ns>/<controller>` or `node/<node>`.
//!
//! Parsing is deliberately permissive. An unknown kind or a key with too
//! few segments maps to an empty filter set, which the backend treats as
//! "every allocation". This broadens the query rather than rejecting it;
//! keep that in mind before relying on totals for a malformed selector.

use std::collections::BTreeMap;
use std::fmt;

/// Filter key for the namespace dimension
pub const FILTER_NAMESPACE: &str = "namespace";
/// Filter key for the pod dimension
pub const FILTER_POD: &str = "pod";
/// Filter key for the controller dimension
pub const FILTER_CONTROLLER: &str = "controller";
/// Filter key for the node dimension
pub const FILTER_NODE: &str = "node";

/// Resource kinds the plugin knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    Pod,
    Controller,
    Node,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Namespace,
        ResourceKind::Pod,
        ResourceKind::Controller,
        ResourceKind::Node,
    ];

    /// Selector prefix, e.g. `"pod"`
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Pod => "pod",
            ResourceKind::Controller => "controller",
            ResourceKind::Node => "node",
        }
    }

    /// Resource type as reported by the plugin host, e.g. `"k8s-pod"`
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "k8s-namespace",
            ResourceKind::Pod => "k8s-pod",
            ResourceKind::Controller => "k8s-controller",
            ResourceKind::Node => "k8s-node",
        }
    }

    /// Look up a kind by its selector prefix
    pub fn from_selector_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == prefix)
    }

    /// Look up a kind by its host resource type
    pub fn from_resource_type(resource_type: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.resource_type() == resource_type)
    }

    /// Number of slash-separated segments a selector of this kind needs
    fn required_segments(&self) -> usize {
        match self {
            ResourceKind::Namespace | ResourceKind::Node => 2,
            ResourceKind::Pod | ResourceKind::Controller => 3,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend filter dimensions, one value per key
///
/// Keys iterate in sorted order so encoded queries are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationFilterSet {
    entries: BTreeMap<String, String>,
}

impl AllocationFilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a filter; empty keys are ignored
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.entries.insert(key, value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AllocationFilterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

/// Map a selector such as `"pod/default/web-0"` to backend filters
pub fn map_selector(selector: &str) -> AllocationFilterSet {
    let parts: Vec<&str> = selector.split('/').collect();

    let kind = match parts.first().and_then(|p| ResourceKind::from_selector_prefix(p)) {
        Some(kind) if parts.len() >= kind.required_segments() => kind,
        _ => return AllocationFilterSet::new(),
    };

    match kind {
        ResourceKind::Namespace => AllocationFilterSet::new().with(FILTER_NAMESPACE, parts[1]),
        ResourceKind::Pod => AllocationFilterSet::new()
            .with(FILTER_NAMESPACE, parts[1])
            .with(FILTER_POD, parts[2]),
        ResourceKind::Controller => AllocationFilterSet::new()
            .with(FILTER_NAMESPACE, parts[1])
            .with(FILTER_CONTROLLER, parts[2]),
        ResourceKind::Node => AllocationFilterSet::new().with(FILTER_NODE, parts[1]),
    }
}

/// Build a selector from a kind and its positional identifiers
pub fn selector_for(kind: ResourceKind, ids: &[&str]) -> String {
    std::iter::once(kind.as_str())
        .chain(ids.iter().copied())
        .collect::<Vec<_>>()
        .join("/")
}
