//! Comparison of the running version against the published manifest

use crate::config::Config;
use crate::errors::{MonitorError, Result};
use reqwest::Client;
use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info};

const MANIFEST_HOST: &str = "https://raw.githubusercontent.com";

pub fn manifest_url(repository: &str, branch: &str) -> String {
    format!("{}/{}/{}/package.json", MANIFEST_HOST, repository, branch)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionReport {
    pub current: String,
    pub latest: String,
    pub update_available: bool,
}

impl std::fmt::Display for VersionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.update_available {
            write!(f, "Update available: {} -> {}", self.current, self.latest)
        } else {
            write!(f, "Up to date ({}, latest {})", self.current, self.latest)
        }
    }
}

/// Fetches the remote manifest once per call
#[derive(Debug, Clone)]
pub struct VersionChecker {
    client: Client,
    manifest_url: String,
    timeout: Duration,
}

impl VersionChecker {
    pub fn new(client: Client, manifest_url: String, timeout: Duration) -> Self {
        Self {
            client,
            manifest_url,
            timeout,
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            manifest_url(&config.manifest_repository, &config.manifest_branch),
            config.probe_timeout,
        )
    }

    /// Latest version string published in the manifest
    pub async fn fetch_latest(&self) -> Result<String> {
        debug!("Fetching version manifest from {}", self.manifest_url);

        let manifest = timeout(self.timeout, self.fetch_manifest())
            .await
            .map_err(|_| MonitorError::Timeout)??;

        manifest["version"]
            .as_str()
            .map(|v| v.to_string())
            .ok_or_else(|| MonitorError::Manifest("manifest has no version field".to_string()))
    }

    async fn fetch_manifest(&self) -> Result<Value> {
        let response = self
            .client
            .get(&self.manifest_url)
            .send()
            .await
            .map_err(MonitorError::Http)?;

        if !response.status().is_success() {
            return Err(MonitorError::Manifest(format!(
                "manifest request failed with status: {}",
                response.status()
            )));
        }

        response.json().await.map_err(MonitorError::Http)
    }

    pub async fn check(&self, current: &str) -> Result<VersionReport> {
        let latest = self.fetch_latest().await?;
        let report = compare_versions(current, &latest)?;
        info!("{}", report);
        Ok(report)
    }
}

pub fn compare_versions(current: &str, latest: &str) -> Result<VersionReport> {
    let current_version = parse_version(current)?;
    let latest_version = parse_version(latest)?;

    Ok(VersionReport {
        current: current_version.to_string(),
        latest: latest_version.to_string(),
        update_available: latest_version > current_version,
    })
}

fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.trim();
    Ok(Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn checker(server: &MockServer) -> VersionChecker {
        VersionChecker::new(
            Client::new(),
            format!("{}/package.json", server.uri()),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_manifest_url() {
        assert_eq!(
            manifest_url("cline/cline", "main"),
            "https://raw.githubusercontent.com/cline/cline/main/package.json"
        );
    }

    #[test]
    fn test_compare_versions() {
        assert!(compare_versions("0.1.0", "0.2.0").unwrap().update_available);
        assert!(!compare_versions("v1.2.3", "1.2.3").unwrap().update_available);
        assert!(!compare_versions("2.0.0", "1.9.9").unwrap().update_available);
        assert!(compare_versions("1.0.0-beta.1", "1.0.0").unwrap().update_available);
        assert!(matches!(
            compare_versions("1.0", "1.0.0"),
            Err(MonitorError::Version(_))
        ));
    }

    #[tokio::test]
    async fn test_check_against_remote_manifest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"name": "ext", "version": "3.4.0"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let report = checker(&server).check("3.3.1").await.unwrap();

        assert_eq!(report.latest, "3.4.0");
        assert!(report.update_available);
        assert_eq!(report.to_string(), "Update available: 3.3.1 -> 3.4.0");
    }

    #[tokio::test]
    async fn test_manifest_without_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "ext"})))
            .mount(&server)
            .await;

        let result = checker(&server).fetch_latest().await;
        assert!(matches!(result, Err(MonitorError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_slow_manifest_body_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"version": "9.9.9"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let checker = VersionChecker::new(
            Client::new(),
            format!("{}/package.json", server.uri()),
            Duration::from_millis(100),
        );

        let result = checker.fetch_latest().await;
        assert!(matches!(result, Err(MonitorError::Timeout)));
    }

    #[tokio::test]
    async fn test_manifest_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = checker(&server).check("1.0.0").await;
        assert!(matches!(result, Err(MonitorError::Manifest(_))));
    }
}
