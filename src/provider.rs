//! Provider probe targets, status records and their formatting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Locally-hosted model servers the monitor knows how to probe
pub const LOCAL_PROVIDERS: &[&str] = &["Ollama", "LMStudio", "OpenAILike"];

/// Error text for a target without a base URL
pub const NO_URL_CONFIGURED: &str = "No URL configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderProbeTarget {
    pub name: String,
    pub base_url: Option<String>,
    pub is_local: bool,
    /// Whether the provider is turned on in settings
    pub enabled: bool,
}

impl ProviderProbeTarget {
    pub fn new(name: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            base_url,
            is_local: true,
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Tri-state reachability, serialized as `true` / `false` / `null`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum RunningState {
    Running,
    Stopped,
    Unknown,
}

impl From<Option<bool>> for RunningState {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => RunningState::Running,
            Some(false) => RunningState::Stopped,
            None => RunningState::Unknown,
        }
    }
}

impl From<RunningState> for Option<bool> {
    fn from(state: RunningState) -> Self {
        match state {
            RunningState::Running => Some(true),
            RunningState::Stopped => Some(false),
            RunningState::Unknown => None,
        }
    }
}

impl From<bool> for RunningState {
    fn from(running: bool) -> Self {
        if running {
            RunningState::Running
        } else {
            RunningState::Stopped
        }
    }
}

impl std::fmt::Display for RunningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunningState::Running => write!(f, "running"),
            RunningState::Stopped => write!(f, "stopped"),
            RunningState::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderStatus {
    pub name: String,
    pub enabled: bool,
    pub is_local: bool,
    pub is_running: RunningState,
    pub error: Option<String>,
    pub last_checked: DateTime<Utc>,
    pub response_time: Option<u64>,
    pub url: Option<String>,
}

impl ProviderStatus {
    /// Placeholder shown before the first cycle completes
    pub fn pending(target: &ProviderProbeTarget) -> Self {
        Self {
            name: target.name.clone(),
            enabled: target.enabled,
            is_local: target.is_local,
            is_running: RunningState::Unknown,
            error: None,
            last_checked: Utc::now(),
            response_time: None,
            url: target.base_url.clone(),
        }
    }

    /// Display colour of the status dot
    pub fn indicator(&self) -> &'static str {
        match self.is_running {
            RunningState::Running => "green",
            RunningState::Stopped => "red",
            RunningState::Unknown => "gray",
        }
    }

    fn symbol(&self) -> char {
        match self.is_running {
            RunningState::Running => '●',
            RunningState::Stopped => '○',
            RunningState::Unknown => '?',
        }
    }
}

/// The published status collection of one complete cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub cycle_id: Uuid,
    pub completed_at: Option<DateTime<Utc>>,
    pub statuses: Vec<ProviderStatus>,
}

impl StatusSnapshot {
    pub fn pending(targets: &[ProviderProbeTarget]) -> Self {
        Self {
            cycle_id: Uuid::nil(),
            completed_at: None,
            statuses: targets.iter().map(ProviderStatus::pending).collect(),
        }
    }

    pub fn completed(statuses: Vec<ProviderStatus>) -> Self {
        Self {
            cycle_id: Uuid::new_v4(),
            completed_at: Some(Utc::now()),
            statuses,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.completed_at.is_none()
    }

    pub fn summary(&self) -> StatusSummary {
        StatusSummary::from_statuses(&self.statuses)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total: usize,
    pub enabled: usize,
    pub running: usize,
    pub stopped: usize,
    pub unknown: usize,
}

impl StatusSummary {
    pub fn from_statuses(statuses: &[ProviderStatus]) -> Self {
        let mut summary = StatusSummary {
            total: statuses.len(),
            ..Default::default()
        };

        for status in statuses {
            if status.enabled {
                summary.enabled += 1;
            }
            match status.is_running {
                RunningState::Running => summary.running += 1,
                RunningState::Stopped => summary.stopped += 1,
                RunningState::Unknown => summary.unknown += 1,
            }
        }

        summary
    }
}

impl std::fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} running ({} enabled, {} stopped, {} unknown)",
            self.running, self.total, self.enabled, self.stopped, self.unknown
        )
    }
}

/// Render statuses as one aligned line per provider
pub fn format_status_table(statuses: &[ProviderStatus]) -> String {
    let name_width = statuses
        .iter()
        .map(|s| s.name.len())
        .max()
        .unwrap_or(0);

    let mut out = String::new();
    for status in statuses {
        let url = status.url.as_deref().unwrap_or("-");
        let latency = status
            .response_time
            .map(|ms| format!("{}ms", ms))
            .unwrap_or_else(|| "-".to_string());
        let enabled = if status.enabled { "" } else { " [disabled]" };

        let _ = write!(
            out,
            "{} {:<width$}  {:<7}  {:>7}  {}{}",
            status.symbol(),
            status.name,
            status.is_running.to_string(),
            latency,
            url,
            enabled,
            width = name_width
        );
        if let Some(error) = &status.error {
            let _ = write!(out, "  ({})", error);
        }
        out.push('\n');
    }
    out
}
