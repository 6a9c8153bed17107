//! Host and runtime details included in diagnostics output

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::env;
use sysinfo::System;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    pub os: String,
    pub os_version: Option<String>,
    pub arch: String,
    pub cpu_count: usize,
    /// Total physical memory in bytes
    pub total_memory: u64,
    pub app_name: String,
    pub app_version: String,
    pub hostname: Option<String>,
    pub locale: Option<String>,
    pub collected_at: DateTime<Utc>,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self::collect_with(|key| env::var(key).ok())
    }

    /// Collect host details from the OS; `lookup` only resolves the locale
    pub fn collect_with<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let system = System::new_all();

        let locale = ["LC_ALL", "LANG"]
            .iter()
            .filter_map(|key| lookup(*key))
            .find(|value| !value.trim().is_empty());

        Self {
            os: System::name().unwrap_or_else(|| env::consts::OS.to_string()),
            os_version: System::long_os_version(),
            arch: env::consts::ARCH.to_string(),
            cpu_count: system.cpus().len().max(1),
            total_memory: system.total_memory(),
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            hostname: System::host_name(),
            locale,
            collected_at: Utc::now(),
        }
    }

    /// Markdown bullet list used in issue reports
    pub fn to_markdown(&self) -> String {
        let os = match &self.os_version {
            Some(version) => version.clone(),
            None => self.os.clone(),
        };

        let mut lines = vec![
            format!("- **OS**: {}", os),
            format!("- **Architecture**: {}", self.arch),
            format!("- **CPUs**: {}", self.cpu_count),
            format!("- **Memory**: {} MiB", self.total_memory / (1024 * 1024)),
            format!("- **Version**: {} {}", self.app_name, self.app_version),
        ];
        if let Some(locale) = &self.locale {
            lines.push(format!("- **Locale**: {}", locale));
        }
        lines.push(format!("- **Collected**: {}", self.collected_at.to_rfc3339()));
        lines.join("\n")
    }
}
