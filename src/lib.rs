//! Local Model Provider Diagnostics
//!
//! This library checks reachability of locally-hosted model servers on a
//! fixed schedule and gathers the surrounding diagnostics (system details,
//! API usage, version status) used when filing bug reports.

pub mod config;
pub mod errors;
pub mod monitor;
pub mod probe;
pub mod provider;
pub mod report;
pub mod server;
pub mod system_info;
pub mod transport;
pub mod usage;
pub mod version;

pub use config::Config;
pub use errors::{MonitorError, Result};
pub use monitor::{ProviderMonitor, RefreshOutcome};
pub use probe::Prober;
pub use provider::{ProviderProbeTarget, ProviderStatus, RunningState, StatusSnapshot, StatusSummary};
pub use report::{IssueForm, IssueKind, IssueReport};
pub use system_info::SystemInfo;
pub use usage::{UsageContext, UsageMetrics};
pub use version::{VersionChecker, VersionReport};
