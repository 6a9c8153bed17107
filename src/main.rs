//! Local Model Provider Diagnostics Binary

use clap::{Parser, Subcommand, ValueEnum};
use provider_diagnostics::report::{ArboardSink, FileSink, IssueField, StdoutSink};
use provider_diagnostics::provider::format_status_table;
use provider_diagnostics::transport::HttpTransport;
use provider_diagnostics::{
    Config, IssueForm, IssueKind, IssueReport, MonitorError, ProviderMonitor, RefreshOutcome,
    Result, StatusSnapshot, SystemInfo, UsageContext, UsageMetrics, VersionChecker, server,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Debug, Parser)]
#[command(name = "provider_diagnostics", version, about = "Local model provider diagnostics")]
struct Cli {
    /// Log output format (logs go to stderr)
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value = "json", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe every provider once and print the result
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Keep probing on the refresh interval and print each cycle
    Watch,
    /// Run the monitor behind the JSON status API
    Serve {
        #[arg(long, env = "BIND_ADDRESS")]
        bind: Option<String>,
    },
    /// Compare this build with the published version manifest
    Version,
    /// Print system information and API usage metrics
    Info {
        #[arg(long, env = "USAGE_CONTEXT_PATH")]
        usage_file: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Build a bug report or pull request description
    Report {
        #[arg(long, value_enum, default_value = "bug")]
        kind: IssueKind,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        steps: Option<String>,
        #[arg(long)]
        expected: Option<String>,
        #[arg(long)]
        actual: Option<String>,
        #[arg(long)]
        branch: Option<String>,
        #[arg(long)]
        changes: Option<String>,
        #[arg(long)]
        testing: Option<String>,
        #[arg(long, env = "USAGE_CONTEXT_PATH")]
        usage_file: Option<PathBuf>,
        /// Write the report to a file instead of the clipboard
        #[arg(long, conflicts_with = "stdout")]
        output: Option<PathBuf>,
        /// Print the report instead of copying it to the clipboard
        #[arg(long)]
        stdout: bool,
        /// Leave provider statuses out of the report
        #[arg(long)]
        skip_probe: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    initialize_tracing(cli.log_format);

    info!("Starting provider diagnostics v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli.command, config).await {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, mut config: Config) -> Result<()> {
    match command {
        Command::Check { json } => {
            let monitor = ProviderMonitor::from_config(&config)?;
            let snapshot = checked_snapshot(&monitor).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print!("{}", format_status_table(&snapshot.statuses));
                println!("{}", snapshot.summary());
            }
        }
        Command::Watch => {
            let monitor = ProviderMonitor::from_config(&config)?;
            let mut updates = monitor.subscribe();
            monitor.start()?;

            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let snapshot = updates.borrow_and_update().clone();
                        print!("{}", format_status_table(&snapshot.statuses));
                        println!("{}\n", snapshot.summary());
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Shutting down provider monitor");
                        break;
                    }
                }
            }

            monitor.stop();
        }
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }

            let monitor = Arc::new(ProviderMonitor::from_config(&config)?);
            monitor.start()?;

            let served = server::run_server(Arc::clone(&monitor), &config.bind_address).await;
            monitor.stop();
            served?;
        }
        Command::Version => {
            let transport = HttpTransport::new()?;
            let checker = VersionChecker::from_config(transport.client().clone(), &config);
            let report = checker.check(env!("CARGO_PKG_VERSION")).await?;
            println!("{}", report);
        }
        Command::Info { usage_file, json } => {
            let system = SystemInfo::collect();
            let usage = load_usage(usage_file, &config).await?;

            if json {
                let body = serde_json::json!({ "system": system, "usage": usage });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                println!("{}", system.to_markdown());
                if let Some(usage) = usage {
                    println!("{}", usage.to_markdown());
                }
            }
        }
        Command::Report {
            kind,
            title,
            description,
            steps,
            expected,
            actual,
            branch,
            changes,
            testing,
            usage_file,
            output,
            stdout,
            skip_probe,
        } => {
            let mut form = IssueForm::new(kind);
            form.set_field(IssueField::Title, title);
            form.set_field(IssueField::Description, description);

            let optional = [
                (IssueField::StepsToReproduce, steps),
                (IssueField::ExpectedBehavior, expected),
                (IssueField::ActualBehavior, actual),
                (IssueField::Branch, branch),
                (IssueField::Changes, changes),
                (IssueField::TestingNotes, testing),
            ];
            for (field, value) in optional {
                if let Some(value) = value {
                    form.set_field(field, value);
                }
            }

            let providers = if skip_probe {
                Vec::new()
            } else {
                let monitor = ProviderMonitor::from_config(&config)?;
                checked_snapshot(&monitor).await?.statuses
            };

            let usage = load_usage(usage_file, &config).await?;
            let report = IssueReport::new(form, SystemInfo::collect(), providers, usage)?;

            match output {
                Some(path) => report.export(&FileSink::new(path))?,
                None if stdout => report.export(&StdoutSink)?,
                None => report.export_or_fallback(&ArboardSink, &StdoutSink)?,
            }
        }
    }

    Ok(())
}

/// Run one cycle and return its snapshot, failing if the cycle did not publish
async fn checked_snapshot(monitor: &ProviderMonitor) -> Result<StatusSnapshot> {
    match monitor.refresh_all_statuses().await {
        RefreshOutcome::Completed(_) => Ok(monitor.snapshot()),
        outcome => Err(MonitorError::Other(format!(
            "provider refresh did not complete: {:?}",
            outcome
        ))),
    }
}

async fn load_usage(path: Option<PathBuf>, config: &Config) -> Result<Option<UsageMetrics>> {
    let path = path.or_else(|| config.usage_context_path.clone().map(PathBuf::from));

    match path {
        Some(path) => {
            let context = UsageContext::load(&path).await.map_err(|e| {
                MonitorError::Other(format!("Failed to load usage context {}: {}", path.display(), e))
            })?;
            Ok(Some(context.metrics()))
        }
        None => Ok(None),
    }
}

/// Initialize structured logging
fn initialize_tracing(format: LogFormat) {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter_layer);

    match format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false);
            registry.with(fmt_layer).init();
        }
    }
}
