//! API usage metrics derived from the interaction history

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Record type carrying per-request token accounting
pub const API_REQUEST_STARTED: &str = "api_req_started";

/// Active API configuration. Credentials are never read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfiguration {
    pub api_provider: Option<String>,
    pub api_model_id: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub ts: i64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub say: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Read-only view of configuration and history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageContext {
    pub api_configuration: ApiConfiguration,
    pub messages: Vec<InteractionRecord>,
}

impl UsageContext {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn metrics(&self) -> UsageMetrics {
        UsageMetrics::from_records(&self.messages)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiRequestInfo {
    tokens_in: Option<u64>,
    tokens_out: Option<u64>,
    cache_writes: Option<u64>,
    cache_reads: Option<u64>,
    cost: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetrics {
    pub api_requests: usize,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub total_cache_writes: u64,
    pub total_cache_reads: u64,
    pub total_cost: f64,
    /// Tokens in the most recent request's context window
    pub context_tokens: u64,
}

impl UsageMetrics {
    pub fn from_records(records: &[InteractionRecord]) -> Self {
        let mut metrics = UsageMetrics::default();

        for record in records {
            if record.say.as_deref() != Some(API_REQUEST_STARTED) {
                continue;
            }
            let Some(text) = record.text.as_deref() else {
                continue;
            };
            let info: ApiRequestInfo = match serde_json::from_str(text) {
                Ok(info) => info,
                Err(e) => {
                    debug!("Skipping malformed API request record at {}: {}", record.ts, e);
                    continue;
                }
            };

            let tokens_in = info.tokens_in.unwrap_or(0);
            let tokens_out = info.tokens_out.unwrap_or(0);
            let cache_writes = info.cache_writes.unwrap_or(0);
            let cache_reads = info.cache_reads.unwrap_or(0);

            metrics.api_requests += 1;
            metrics.total_tokens_in = metrics.total_tokens_in.saturating_add(tokens_in);
            metrics.total_tokens_out = metrics.total_tokens_out.saturating_add(tokens_out);
            metrics.total_cache_writes = metrics.total_cache_writes.saturating_add(cache_writes);
            metrics.total_cache_reads = metrics.total_cache_reads.saturating_add(cache_reads);
            metrics.total_cost += info.cost.unwrap_or(0.0);
            metrics.context_tokens = tokens_in
                .saturating_add(tokens_out)
                .saturating_add(cache_writes)
                .saturating_add(cache_reads);
        }

        metrics
    }

    pub fn to_markdown(&self) -> String {
        [
            format!("- **API requests**: {}", self.api_requests),
            format!(
                "- **Tokens**: {} in / {} out",
                self.total_tokens_in, self.total_tokens_out
            ),
            format!(
                "- **Cache**: {} writes / {} reads",
                self.total_cache_writes, self.total_cache_reads
            ),
            format!("- **Context tokens**: {}", self.context_tokens),
            format!("- **Cost**: ${:.4}", self.total_cost),
        ]
        .join("\n")
    }
}
