//! Plugin configuration
//!
//! Values come from `KUBECOST_*` environment variables and an optional
//! YAML file. File values take precedence over the environment, and a
//! missing file is not an error. File keys may be snake_case or the
//! camelCase used by earlier plugin config files (`baseUrl`, `apiToken`).

use crate::window::{parse_duration, DEFAULT_WINDOW};
use anyhow::{Context, Result};
use ::config::{Environment, File, FileFormat, Source};
use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tracing::warn;

/// Prefix for environment overrides, e.g. `KUBECOST_BASE_URL`
pub const ENV_PREFIX: &str = "KUBECOST";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection and default-value settings for the Kubecost client
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PluginConfig {
    /// Kubecost API root, e.g. `http://kubecost-cost-analyzer:9090`
    #[serde(default)]
    pub base_url: String,

    /// Bearer token; no auth header is sent when empty
    #[serde(default)]
    pub api_token: String,

    /// Window used when a caller gives none
    #[serde(default = "default_window")]
    pub default_window: String,

    /// Per-request timeout; zero means no timeout
    #[serde(default = "default_timeout", deserialize_with = "deserialize_timeout")]
    pub timeout: Duration,

    #[serde(default)]
    pub tls_skip_verify: bool,

    /// Cluster used for predictions when the request leaves it empty
    #[serde(default = "default_cluster_id")]
    pub cluster_id: String,

    /// Namespace used for predictions when the request leaves it empty
    #[serde(default = "default_namespace")]
    pub default_namespace: String,

    /// Prediction window used when the request leaves it empty
    #[serde(default = "default_prediction_window")]
    pub prediction_window: String,
}

fn default_window() -> String {
    DEFAULT_WINDOW.to_string()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_cluster_id() -> String {
    "cluster-one".to_string()
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_prediction_window() -> String {
    "2d".to_string()
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: String::new(),
            default_window: default_window(),
            timeout: default_timeout(),
            tls_skip_verify: false,
            cluster_id: default_cluster_id(),
            default_namespace: default_namespace(),
            prediction_window: default_prediction_window(),
        }
    }
}

impl PluginConfig {
    /// Config for a given backend with everything else defaulted
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Load from the process environment and an optional YAML file
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_from(path, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load using an explicit environment source
    pub fn load_from(path: Option<&str>, env: Environment) -> Result<Self> {
        let mut builder = ::config::Config::builder().add_source(env);

        if let Some(path) = path.filter(|p| !p.is_empty()) {
            let file = ::config::Config::builder()
                .add_source(File::new(path, FileFormat::Yaml).required(false))
                .build()
                .with_context(|| format!("Failed to read config file {}", path))?
                .collect()
                .with_context(|| format!("Failed to read config file {}", path))?;

            for (key, value) in file {
                builder = builder
                    .set_override(canonical_key(&key), value)
                    .context("Failed to apply config file")?;
            }
        }

        let settings = builder.build().context("Failed to read configuration")?;
        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

/// Map camelCase file keys onto field names; unknown keys pass through
fn canonical_key(key: &str) -> String {
    let field = match key.to_ascii_lowercase().as_str() {
        "baseurl" => "base_url",
        "apitoken" => "api_token",
        "defaultwindow" => "default_window",
        "tlsskipverify" => "tls_skip_verify",
        "clusterid" => "cluster_id",
        "defaultnamespace" => "default_namespace",
        "predictionwindow" => "prediction_window",
        _ => return key.to_string(),
    };
    field.to_string()
}

/// Timeouts are duration strings (`"30s"`, `"1m30s"`) or whole seconds
fn deserialize_timeout<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimeout {
        Seconds(u64),
        Text(String),
    }

    let timeout = match RawTimeout::deserialize(deserializer)? {
        RawTimeout::Seconds(secs) => Some(Duration::from_secs(secs)),
        RawTimeout::Text(text) => match text.trim().parse::<u64>() {
            Ok(secs) => Some(Duration::from_secs(secs)),
            Err(_) => parse_duration(&text).and_then(|d| d.to_std().ok()),
        },
    };

    Ok(timeout.unwrap_or_else(|| {
        warn!(
            default_secs = DEFAULT_TIMEOUT.as_secs(),
            "Invalid timeout in configuration, using default"
        );
        DEFAULT_TIMEOUT
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let cfg = PluginConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(cfg, PluginConfig::default());
        assert_eq!(cfg.default_window, "30d");
        assert_eq!(cfg.timeout, Duration::from_secs(15));
        assert_eq!(cfg.cluster_id, "cluster-one");
        assert_eq!(cfg.default_namespace, "default");
        assert_eq!(cfg.prediction_window, "2d");
        assert!(!cfg.tls_skip_verify);
    }

    #[test]
    fn test_environment_only() {
        let cfg = PluginConfig::load_from(
            None,
            env(&[
                ("KUBECOST_BASE_URL", "http://env-test:9090"),
                ("KUBECOST_API_TOKEN", "env-token"),
                ("KUBECOST_DEFAULT_WINDOW", "7d"),
                ("KUBECOST_TIMEOUT", "60s"),
                ("KUBECOST_TLS_SKIP_VERIFY", "true"),
                ("KUBECOST_CLUSTER_ID", "prod"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.base_url, "http://env-test:9090");
        assert_eq!(cfg.api_token, "env-token");
        assert_eq!(cfg.default_window, "7d");
        assert_eq!(cfg.timeout, Duration::from_secs(60));
        assert!(cfg.tls_skip_verify);
        assert_eq!(cfg.cluster_id, "prod");
        assert_eq!(cfg.default_namespace, "default");
    }

    #[test]
    fn test_invalid_timeout_falls_back_to_default() {
        let cfg =
            PluginConfig::load_from(None, env(&[("KUBECOST_TIMEOUT", "soon")])).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(15));

        let cfg = PluginConfig::load_from(None, env(&[("KUBECOST_TIMEOUT", "-5s")])).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_file_overrides_environment() {
        let file = yaml_file(
            "base_url: http://file-test:9090\n\
             api_token: file-token\n\
             timeout: 1m30s\n\
             prediction_window: 7d\n",
        );

        let cfg = PluginConfig::load_from(
            file.path().to_str(),
            env(&[
                ("KUBECOST_BASE_URL", "http://env-test:9090"),
                ("KUBECOST_DEFAULT_WINDOW", "14d"),
            ]),
        )
        .unwrap();

        assert_eq!(cfg.base_url, "http://file-test:9090");
        assert_eq!(cfg.api_token, "file-token");
        assert_eq!(cfg.default_window, "14d");
        assert_eq!(cfg.timeout, Duration::from_secs(90));
        assert_eq!(cfg.prediction_window, "7d");
    }

    #[test]
    fn test_missing_file_uses_environment() {
        let cfg = PluginConfig::load_from(
            Some("/nonexistent/kubecost-config.yaml"),
            env(&[("KUBECOST_BASE_URL", "http://env-test:9090")]),
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://env-test:9090");
    }

    #[test]
    fn test_timeout_seconds_from_environment() {
        let cfg = PluginConfig::load_from(None, env(&[("KUBECOST_TIMEOUT", "45")])).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(45));
    }

    #[test]
    fn test_camel_case_file_keys() {
        let file = yaml_file(
            "baseUrl: http://camel:9090\n\
             apiToken: camel-token\n\
             defaultWindow: 7d\n\
             tlsSkipVerify: true\n\
             timeout: 20s\n",
        );

        let cfg = PluginConfig::load_from(
            file.path().to_str(),
            env(&[
                ("KUBECOST_BASE_URL", "http://env-test:9090"),
                ("KUBECOST_CLUSTER_ID", "prod"),
            ]),
        )
        .unwrap();
        assert_eq!(cfg.base_url, "http://camel:9090");
        assert_eq!(cfg.api_token, "camel-token");
        assert_eq!(cfg.default_window, "7d");
        assert!(cfg.tls_skip_verify);
        assert_eq!(cfg.timeout, Duration::from_secs(20));
        assert_eq!(cfg.cluster_id, "prod");
    }

    #[test]
    fn test_canonical_key() {
        assert_eq!(canonical_key("baseUrl"), "base_url");
        assert_eq!(canonical_key("tlsskipverify"), "tls_skip_verify");
        assert_eq!(canonical_key("base_url"), "base_url");
        assert_eq!(canonical_key("timeout"), "timeout");
    }

    #[test]
    fn test_zero_timeout_is_kept() {
        let cfg = PluginConfig::load_from(None, env(&[("KUBECOST_TIMEOUT", "0s")])).unwrap();
        assert!(cfg.timeout.is_zero());
    }

    #[test]
    fn test_timeout_as_whole_seconds() {
        let file = yaml_file("timeout: 45\n");
        let cfg = PluginConfig::load_from(file.path().to_str(), env(&[])).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(45));
    }
}
