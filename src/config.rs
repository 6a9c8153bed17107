//! Configuration management for the provider monitor

use crate::provider::{LOCAL_PROVIDERS, ProviderProbeTarget};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Local providers to probe, resolved once at startup
    pub providers: Vec<ProviderProbeTarget>,

    /// Per-request timeout for every probe
    pub probe_timeout: Duration,

    /// Period between refresh cycles
    pub refresh_interval: Duration,

    /// GitHub `owner/repo` hosting the version manifest
    pub manifest_repository: String,

    /// Branch the version manifest is read from
    pub manifest_branch: String,

    /// Optional JSON file with API configuration and interaction history
    pub usage_context_path: Option<String>,

    /// Address the status API listens on
    pub bind_address: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: LOCAL_PROVIDERS
                .iter()
                .map(|name| ProviderProbeTarget::new(*name, None))
                .collect(),
            probe_timeout: Duration::from_millis(5000),
            refresh_interval: Duration::from_secs(30),
            manifest_repository: "cline/cline".to_string(),
            manifest_branch: "main".to_string(),
            usage_context_path: None,
            bind_address: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        for target in config.providers.iter_mut() {
            let prefix = target.name.to_uppercase();

            target.base_url = lookup(&format!("{}_API_BASE_URL", prefix))
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty());

            if let Some(enabled) = lookup(&format!("{}_ENABLED", prefix)) {
                target.enabled = parse_flag(&enabled);
            }
        }

        if let Some(timeout) = lookup("PROBE_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                config.probe_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(interval) = lookup("REFRESH_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.refresh_interval = Duration::from_secs(seconds);
            }
        }

        if let Some(repository) = lookup("VERSION_MANIFEST_REPOSITORY") {
            config.manifest_repository = repository;
        }

        if let Some(branch) = lookup("VERSION_MANIFEST_BRANCH") {
            config.manifest_branch = branch;
        }

        if let Some(path) = lookup("USAGE_CONTEXT_PATH") {
            if !path.trim().is_empty() {
                config.usage_context_path = Some(path);
            }
        }

        if let Some(bind) = lookup("BIND_ADDRESS") {
            config.bind_address = bind;
        }

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.providers.is_empty() {
            return Err("at least one provider must be configured".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }

        if self.refresh_interval.is_zero() {
            return Err("refresh_interval must be greater than 0".to_string());
        }

        if self.refresh_interval <= self.probe_timeout {
            return Err("refresh_interval must exceed probe_timeout".to_string());
        }

        if !self.manifest_repository.contains('/') {
            return Err("manifest_repository must look like owner/repo".to_string());
        }

        if self.manifest_branch.is_empty() {
            return Err("manifest_branch cannot be empty".to_string());
        }

        if self.bind_address.is_empty() {
            return Err("bind_address cannot be empty".to_string());
        }

        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None);

        assert_eq!(config.probe_timeout, Duration::from_millis(5000));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.providers.len(), 3);
        assert!(config.providers.iter().all(|p| p.base_url.is_none()));
        assert!(config.providers.iter().all(|p| p.enabled && p.is_local));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_urls_keyed_by_uppercased_name() {
        let config = Config::from_lookup(lookup_from(&[
            ("OLLAMA_API_BASE_URL", "http://localhost:11434"),
            ("LMSTUDIO_API_BASE_URL", "  http://localhost:1234  "),
            ("OPENAILIKE_API_BASE_URL", ""),
            ("LMSTUDIO_ENABLED", "false"),
        ]));

        let by_name: HashMap<_, _> = config
            .providers
            .iter()
            .map(|p| (p.name.as_str(), p))
            .collect();

        assert_eq!(
            by_name["Ollama"].base_url.as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(
            by_name["LMStudio"].base_url.as_deref(),
            Some("http://localhost:1234")
        );
        assert!(by_name["OpenAILike"].base_url.is_none());
        assert!(!by_name["LMStudio"].enabled);
        assert!(by_name["Ollama"].enabled);
    }

    #[test]
    fn test_numeric_overrides_and_garbage() {
        let config = Config::from_lookup(lookup_from(&[
            ("PROBE_TIMEOUT_MS", "250"),
            ("REFRESH_INTERVAL_SECONDS", "not-a-number"),
        ]));

        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_validation_rejects_interval_not_exceeding_timeout() {
        let mut config = Config::default();
        config.refresh_interval = Duration::from_secs(5);
        assert!(config.validate().is_err());

        config.refresh_interval = Duration::from_secs(6);
        assert!(config.validate().is_ok());

        config.manifest_repository = "no-slash".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_flag_parsing() {
        assert!(!parse_flag("OFF"));
        assert!(!parse_flag("0"));
        assert!(parse_flag("true"));
        assert!(parse_flag("yes"));
    }
}
