//! Bug report / pull request form and its Markdown export

use crate::errors::{MonitorError, Result};
use crate::provider::{ProviderStatus, format_status_table};
use crate::system_info::SystemInfo;
use crate::usage::UsageMetrics;

use arboard::Clipboard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum IssueKind {
    #[value(name = "bug")]
    BugReport,
    #[value(name = "pr")]
    PullRequest,
}

impl std::fmt::Display for IssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueKind::BugReport => write!(f, "Bug Report"),
            IssueKind::PullRequest => write!(f, "Pull Request"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueField {
    Title,
    Description,
    StepsToReproduce,
    ExpectedBehavior,
    ActualBehavior,
    Branch,
    Changes,
    TestingNotes,
}

impl IssueField {
    pub fn label(&self) -> &'static str {
        match self {
            IssueField::Title => "Title",
            IssueField::Description => "Description",
            IssueField::StepsToReproduce => "Steps to Reproduce",
            IssueField::ExpectedBehavior => "Expected Behavior",
            IssueField::ActualBehavior => "Actual Behavior",
            IssueField::Branch => "Branch",
            IssueField::Changes => "Changes",
            IssueField::TestingNotes => "Testing",
        }
    }
}

impl FromStr for IssueField {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "title" => Ok(IssueField::Title),
            "description" => Ok(IssueField::Description),
            "steps" | "stepstoreproduce" => Ok(IssueField::StepsToReproduce),
            "expected" | "expectedbehavior" => Ok(IssueField::ExpectedBehavior),
            "actual" | "actualbehavior" => Ok(IssueField::ActualBehavior),
            "branch" => Ok(IssueField::Branch),
            "changes" => Ok(IssueField::Changes),
            "testing" | "testingnotes" => Ok(IssueField::TestingNotes),
            other => Err(MonitorError::Report(format!("unknown form field: {}", other))),
        }
    }
}

/// Form state as the user fills it in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueForm {
    pub kind: IssueKind,
    pub title: String,
    pub description: String,
    pub steps_to_reproduce: String,
    pub expected_behavior: String,
    pub actual_behavior: String,
    pub branch: String,
    pub changes: String,
    pub testing_notes: String,
}

impl IssueForm {
    pub fn new(kind: IssueKind) -> Self {
        Self {
            kind,
            title: String::new(),
            description: String::new(),
            steps_to_reproduce: String::new(),
            expected_behavior: String::new(),
            actual_behavior: String::new(),
            branch: String::new(),
            changes: String::new(),
            testing_notes: String::new(),
        }
    }

    pub fn set_field(&mut self, field: IssueField, value: impl Into<String>) {
        let value = value.into();
        match field {
            IssueField::Title => self.title = value,
            IssueField::Description => self.description = value,
            IssueField::StepsToReproduce => self.steps_to_reproduce = value,
            IssueField::ExpectedBehavior => self.expected_behavior = value,
            IssueField::ActualBehavior => self.actual_behavior = value,
            IssueField::Branch => self.branch = value,
            IssueField::Changes => self.changes = value,
            IssueField::TestingNotes => self.testing_notes = value,
        }
    }

    pub fn field(&self, field: IssueField) -> &str {
        match field {
            IssueField::Title => &self.title,
            IssueField::Description => &self.description,
            IssueField::StepsToReproduce => &self.steps_to_reproduce,
            IssueField::ExpectedBehavior => &self.expected_behavior,
            IssueField::ActualBehavior => &self.actual_behavior,
            IssueField::Branch => &self.branch,
            IssueField::Changes => &self.changes,
            IssueField::TestingNotes => &self.testing_notes,
        }
    }

    /// Clear every field, keeping the form kind
    pub fn reset(&mut self) {
        *self = IssueForm::new(self.kind);
    }

    fn required_fields(&self) -> &'static [IssueField] {
        match self.kind {
            IssueKind::BugReport => &[IssueField::Title, IssueField::Description],
            IssueKind::PullRequest => &[
                IssueField::Title,
                IssueField::Description,
                IssueField::Changes,
            ],
        }
    }

    /// Sections rendered for this kind, in order (title excluded)
    fn sections(&self) -> &'static [IssueField] {
        match self.kind {
            IssueKind::BugReport => &[
                IssueField::Description,
                IssueField::StepsToReproduce,
                IssueField::ExpectedBehavior,
                IssueField::ActualBehavior,
            ],
            IssueKind::PullRequest => &[
                IssueField::Description,
                IssueField::Branch,
                IssueField::Changes,
                IssueField::TestingNotes,
            ],
        }
    }

    pub fn missing_fields(&self) -> Vec<IssueField> {
        self.required_fields()
            .iter()
            .copied()
            .filter(|field| self.field(*field).trim().is_empty())
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            return Ok(());
        }

        let labels: Vec<&str> = missing.iter().map(|f| f.label()).collect();
        Err(MonitorError::Report(format!(
            "missing required fields: {}",
            labels.join(", ")
        )))
    }
}

/// A validated form plus the diagnostics attached to it
#[derive(Debug, Clone, Serialize)]
pub struct IssueReport {
    pub report_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub form: IssueForm,
    pub system: SystemInfo,
    pub providers: Vec<ProviderStatus>,
    pub usage: Option<UsageMetrics>,
}

impl IssueReport {
    pub fn new(
        form: IssueForm,
        system: SystemInfo,
        providers: Vec<ProviderStatus>,
        usage: Option<UsageMetrics>,
    ) -> Result<Self> {
        form.validate()?;

        Ok(Self {
            report_id: Uuid::new_v4(),
            created_at: Utc::now(),
            form,
            system,
            providers,
            usage,
        })
    }

    pub fn render_markdown(&self) -> String {
        let mut out = format!("# [{}] {}\n", self.form.kind, self.form.title.trim());

        for field in self.form.sections() {
            let value = self.form.field(*field).trim();
            if value.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {}\n\n{}\n", field.label(), value));
        }

        out.push_str(&format!("\n## System Information\n\n{}\n", self.system.to_markdown()));

        if !self.providers.is_empty() {
            out.push_str(&format!(
                "\n## Local Providers\n\n```\n{}```\n",
                format_status_table(&self.providers)
            ));
        }

        if let Some(usage) = &self.usage {
            out.push_str(&format!("\n## API Usage\n\n{}\n", usage.to_markdown()));
        }

        out.push_str(&format!("\n<sub>report {}</sub>\n", self.report_id));
        out
    }

    pub fn export(&self, sink: &dyn ClipboardSink) -> Result<()> {
        sink.write_text(&self.render_markdown())?;
        info!("Exported {} {} via {}", self.form.kind, self.report_id, sink.name());
        Ok(())
    }

    /// Export to `primary`, switching to `fallback` when no clipboard is available
    pub fn export_or_fallback(
        &self,
        primary: &dyn ClipboardSink,
        fallback: &dyn ClipboardSink,
    ) -> Result<()> {
        match self.export(primary) {
            Err(MonitorError::Clipboard(e)) => {
                warn!("Clipboard unavailable ({}), writing report to {}", e, fallback.name());
                self.export(fallback)
            }
            other => other,
        }
    }
}

/// Destination for copied report text
pub trait ClipboardSink: Send + Sync {
    fn name(&self) -> &str;
    fn write_text(&self, text: &str) -> Result<()>;
}

/// The system clipboard
pub struct ArboardSink;

impl ClipboardSink for ArboardSink {
    fn name(&self) -> &str {
        "clipboard"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(text)?;
        Ok(())
    }
}

pub struct StdoutSink;

impl ClipboardSink for StdoutSink {
    fn name(&self) -> &str {
        "stdout"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }
}

pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ClipboardSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn write_text(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
