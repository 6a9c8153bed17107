//! Reachability probes for locally-hosted model servers
//!
//! Two strategies exist. Servers that announce themselves on their root URL
//! (Ollama answers `GET /` with a plain-text banner) get a banner probe first;
//! when that probe fails for any reason other than a timeout, the generic
//! probe runs as a fallback. The generic probe hits `/api/health` and the
//! OpenAI-compatible models listing concurrently and reports the server as
//! running when either answers with a 2xx status.

use crate::errors::{MonitorError, Result};
use crate::provider::{NO_URL_CONFIGURED, ProviderStatus, RunningState};
use crate::transport::{ProbeResponse, ProbeTransport};

use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

/// Body text Ollama serves on its root URL
pub const OLLAMA_BANNER: &str = "Ollama is running";

const BANNER_ACCEPT: &str = "text/plain,application/json";
const JSON_ACCEPT: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStrategy {
    /// Root URL banner check, falling back to `Generic`
    Banner,
    /// Concurrent health and models-listing check
    Generic,
}

impl ProbeStrategy {
    pub fn for_provider(name: &str) -> Self {
        if name.eq_ignore_ascii_case("ollama") {
            ProbeStrategy::Banner
        } else {
            ProbeStrategy::Generic
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum ProbeOutcome {
    Running,
    Stopped(Option<String>),
}

/// Health check URLs tried by the generic probe
pub fn candidate_urls(base_url: &str) -> [String; 2] {
    let base = base_url.trim_end_matches('/');
    let models = if base.ends_with("/v1") {
        format!("{}/models", base)
    } else {
        format!("{}/v1/models", base)
    };

    [format!("{}/api/health", base), models]
}

/// Runs single-endpoint probes with a per-request timeout
#[derive(Clone)]
pub struct Prober {
    transport: Arc<dyn ProbeTransport>,
    timeout: Duration,
}

impl Prober {
    pub fn new(transport: Arc<dyn ProbeTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    /// Probe one provider endpoint.
    ///
    /// Never fails: every problem, including a panic inside the probe, is
    /// folded into the returned status. The
    /// status always has `enabled = false`; callers overlay the configured
    /// flag.
    pub async fn probe_endpoint(&self, url: Option<&str>, name: &str) -> ProviderStatus {
        let Some(url) = url else {
            return ProviderStatus {
                name: name.to_string(),
                enabled: false,
                is_local: true,
                is_running: RunningState::Stopped,
                error: Some(NO_URL_CONFIGURED.to_string()),
                last_checked: Utc::now(),
                response_time: None,
                url: None,
            };
        };

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.probe_url(url, name))
            .catch_unwind()
            .await;
        let elapsed = started.elapsed().as_millis() as u64;

        let (is_running, error) = match outcome {
            Ok(ProbeOutcome::Running) => (RunningState::Running, None),
            Ok(ProbeOutcome::Stopped(error)) => (RunningState::Stopped, error),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Probe of {} at {} failed unexpectedly: {}", name, url, message);
                (RunningState::Stopped, Some(message))
            }
        };

        debug!("Probed {} at {} in {}ms: {}", name, url, elapsed, is_running);

        ProviderStatus {
            name: name.to_string(),
            enabled: false,
            is_local: true,
            is_running,
            error,
            last_checked: Utc::now(),
            response_time: Some(elapsed),
            url: Some(url.to_string()),
        }
    }

    async fn probe_url(&self, url: &str, name: &str) -> ProbeOutcome {
        if ProbeStrategy::for_provider(name) == ProbeStrategy::Banner {
            match self.timed_get(url, BANNER_ACCEPT, true).await {
                Ok(response) if response.body.contains(OLLAMA_BANNER) => {
                    return ProbeOutcome::Running;
                }
                Ok(response) => {
                    debug!(
                        "{} banner missing (status {}), trying generic probe",
                        name, response.status
                    );
                }
                Err(MonitorError::Timeout) => {
                    return ProbeOutcome::Stopped(Some(MonitorError::Timeout.to_string()));
                }
                Err(e) => {
                    debug!("{} banner probe failed, trying generic probe: {}", name, e);
                }
            }
        }

        if self.generic_probe(url).await {
            ProbeOutcome::Running
        } else {
            ProbeOutcome::Stopped(None)
        }
    }

    /// True when any candidate URL answers 2xx. Every candidate failure,
    /// including a URL that cannot be requested, counts as a negative.
    async fn generic_probe(&self, url: &str) -> bool {
        let candidates = candidate_urls(url);
        let results = join_all(
            candidates
                .iter()
                .map(|candidate| self.timed_get(candidate, JSON_ACCEPT, false)),
        )
        .await;

        let mut running = false;
        for (candidate, result) in candidates.iter().zip(results) {
            match result {
                Ok(response) if response.is_success() => running = true,
                Ok(response) => debug!("{} answered {}", candidate, response.status),
                Err(e) => debug!("{} unreachable: {}", candidate, e),
            }
        }

        running
    }

    async fn timed_get(&self, url: &str, accept: &str, with_body: bool) -> Result<ProbeResponse> {
        match timeout(self.timeout, self.transport.get(url, accept, with_body)).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "probe panicked".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedTransport};
    use super::*;
    use crate::transport::HttpTransport;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_millis(5000);

    fn scripted(transport: ScriptedTransport) -> (Prober, Arc<ScriptedTransport>) {
        let transport = Arc::new(transport);
        (Prober::new(transport.clone(), TIMEOUT), transport)
    }

    #[test]
    fn test_candidate_urls() {
        assert_eq!(
            candidate_urls("http://localhost:1234"),
            [
                "http://localhost:1234/api/health".to_string(),
                "http://localhost:1234/v1/models".to_string()
            ]
        );
        assert_eq!(
            candidate_urls("http://localhost:1234/v1/"),
            [
                "http://localhost:1234/v1/api/health".to_string(),
                "http://localhost:1234/v1/models".to_string()
            ]
        );
    }

    #[test]
    fn test_strategy_selection_is_case_insensitive() {
        assert_eq!(ProbeStrategy::for_provider("OLLAMA"), ProbeStrategy::Banner);
        assert_eq!(ProbeStrategy::for_provider("ollama"), ProbeStrategy::Banner);
        assert_eq!(ProbeStrategy::for_provider("LMStudio"), ProbeStrategy::Generic);
    }

    #[tokio::test]
    async fn test_missing_url_short_circuits() {
        let (prober, transport) = scripted(ScriptedTransport::new());

        let status = prober.probe_endpoint(None, "OpenAILike").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert_eq!(status.error.as_deref(), Some(NO_URL_CONFIGURED));
        assert!(!status.enabled);
        assert!(status.url.is_none());
        assert!(status.response_time.is_none());
        assert!(transport.called().is_empty());
    }

    #[tokio::test]
    async fn test_banner_probe_reports_running() {
        let (prober, transport) = scripted(
            ScriptedTransport::new().on("http://localhost:11434", Reply::Respond(200, "Ollama is running")),
        );

        let status = prober
            .probe_endpoint(Some("http://localhost:11434"), "Ollama")
            .await;

        assert_eq!(status.is_running, RunningState::Running);
        assert!(status.error.is_none());
        assert!(status.response_time.is_some());
        assert!(!status.enabled);

        let calls = transport.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "text/plain,application/json");
    }

    #[tokio::test(start_paused = true)]
    async fn test_banner_probe_timeout_does_not_fall_back() {
        let (prober, transport) =
            scripted(ScriptedTransport::new().on("http://localhost:11434", Reply::Hang));

        let started = Instant::now();
        let status = prober
            .probe_endpoint(Some("http://localhost:11434"), "Ollama")
            .await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert_eq!(status.error.as_deref(), Some("Connection timeout"));
        assert!(started.elapsed() >= TIMEOUT);
        assert_eq!(transport.called().len(), 1);
    }

    #[tokio::test]
    async fn test_banner_failure_falls_back_to_generic() {
        let (prober, transport) = scripted(
            ScriptedTransport::new()
                .on("http://localhost:11434", Reply::Refused)
                .on("http://localhost:11434/v1/models", Reply::Respond(200, "")),
        );

        let status = prober
            .probe_endpoint(Some("http://localhost:11434"), "Ollama")
            .await;

        assert_eq!(status.is_running, RunningState::Running);
        assert!(status.error.is_none());
        assert_eq!(
            transport.called(),
            vec![
                "http://localhost:11434".to_string(),
                "http://localhost:11434/api/health".to_string(),
                "http://localhost:11434/v1/models".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_banner_missing_falls_back_to_generic() {
        let (prober, _) = scripted(
            ScriptedTransport::new()
                .on("http://localhost:11434", Reply::Respond(200, "something else"))
                .on("http://localhost:11434/api/health", Reply::Respond(404, "")),
        );

        let status = prober
            .probe_endpoint(Some("http://localhost:11434"), "Ollama")
            .await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert!(status.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_probe_never_hangs() {
        let (prober, _) = scripted(
            ScriptedTransport::new()
                .on("http://localhost:1234/api/health", Reply::Hang)
                .on("http://localhost:1234/v1/models", Reply::Hang),
        );

        let started = Instant::now();
        let status = prober
            .probe_endpoint(Some("http://localhost:1234"), "LMStudio")
            .await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert!(status.error.is_none());
        let elapsed = started.elapsed();
        assert!(elapsed >= TIMEOUT);
        assert!(elapsed < TIMEOUT * 2, "candidates must run concurrently");
    }

    #[tokio::test(start_paused = true)]
    async fn test_generic_probe_any_success_wins() {
        let (prober, _) = scripted(
            ScriptedTransport::new()
                .on("http://localhost:1234/api/health", Reply::Hang)
                .on(
                    "http://localhost:1234/v1/models",
                    Reply::Delayed(Duration::from_millis(200), 200),
                ),
        );

        let status = prober
            .probe_endpoint(Some("http://localhost:1234"), "LMStudio")
            .await;

        assert_eq!(status.is_running, RunningState::Running);
        // Join-all: the hanging candidate is waited out to its timeout.
        let elapsed = status.response_time.unwrap();
        assert!((5000..5100).contains(&elapsed));
    }

    #[tokio::test]
    async fn test_unconstructable_request_is_a_silent_negative() {
        let (prober, _) = scripted(
            ScriptedTransport::new()
                .on("garbage/api/health", Reply::Invalid)
                .on("garbage/v1/models", Reply::Invalid),
        );

        let status = prober.probe_endpoint(Some("garbage"), "OpenAILike").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert!(status.error.is_none());
        assert!(status.response_time.is_some());
        assert_eq!(status.url.as_deref(), Some("garbage"));
    }

    #[tokio::test]
    async fn test_malformed_url_over_http_has_no_error_text() {
        let prober = Prober::new(Arc::new(HttpTransport::new().unwrap()), TIMEOUT);

        let status = prober.probe_endpoint(Some("not a url"), "LMStudio").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_panic_inside_probe_becomes_error_text() {
        let (prober, _) = scripted(
            ScriptedTransport::new().on("http://boom/api/health", Reply::Panic),
        );

        let status = prober.probe_endpoint(Some("http://boom"), "LMStudio").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert_eq!(
            status.error.as_deref(),
            Some("scripted transport panic for http://boom/api/health")
        );
        assert!(status.response_time.is_some());
    }

    #[tokio::test]
    async fn test_ollama_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Ollama is running"))
            .mount(&server)
            .await;

        let prober = Prober::new(Arc::new(HttpTransport::new().unwrap()), TIMEOUT);
        let status = prober.probe_endpoint(Some(&server.uri()), "Ollama").await;

        assert_eq!(status.is_running, RunningState::Running);
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_lmstudio_non_success_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let prober = Prober::new(Arc::new(HttpTransport::new().unwrap()), TIMEOUT);
        let status = prober.probe_endpoint(Some(&server.uri()), "LMStudio").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert_eq!(status.error, None);
    }

    #[tokio::test]
    async fn test_v1_base_uses_models_suffix_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[]}"#))
            .mount(&server)
            .await;

        let prober = Prober::new(Arc::new(HttpTransport::new().unwrap()), TIMEOUT);
        let base = format!("{}/v1", server.uri());
        let status = prober.probe_endpoint(Some(&base), "OpenAILike").await;

        assert_eq!(status.is_running, RunningState::Running);
    }

    #[tokio::test]
    async fn test_slow_server_times_out_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let prober = Prober::new(
            Arc::new(HttpTransport::new().unwrap()),
            Duration::from_millis(100),
        );
        let status = prober.probe_endpoint(Some(&server.uri()), "LMStudio").await;

        assert_eq!(status.is_running, RunningState::Stopped);
        assert!(status.response_time.unwrap() < 2000);
    }
}
