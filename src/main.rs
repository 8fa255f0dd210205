use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use paycoord::application::coordinator::TransactionCoordinator;
use paycoord::config::{CoordinatorConfig, HttpGatewayConfig};
use paycoord::domain::ports::{OrderGatewayBox, TransactionJournal, TransactionJournalBox};
use paycoord::domain::transaction::ApprovalOutcome;
use paycoord::infrastructure::http_gateway::HttpOrderGateway;
use paycoord::infrastructure::in_memory::InMemoryJournal;
use paycoord::infrastructure::reporters::RecordingReporter;
use paycoord::infrastructure::scripted::{FixedApprovalHandoff, ScriptedOrderGateway};
use paycoord::interfaces::csv::outcome_writer::OutcomeWriter;
use paycoord::interfaces::csv::request_reader::RequestReader;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Approval {
    Approve,
    Cancel,
    Timeout,
}

impl From<Approval> for ApprovalOutcome {
    fn from(approval: Approval) -> Self {
        match approval {
            Approval::Approve => ApprovalOutcome::Approved,
            Approval::Cancel => ApprovalOutcome::Cancelled,
            Approval::Timeout => ApprovalOutcome::TimedOut,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input CSV of payment requests (attempt, amount, currency)
    input: PathBuf,

    /// How the simulated payer answers every approval prompt
    #[arg(long, value_enum, default_value_t = Approval::Approve)]
    approval: Approval,

    /// Delay before the simulated payer answers, in milliseconds
    #[arg(long)]
    approval_delay_ms: Option<u64>,

    /// Provider base URL (overrides PAYCOORD_PROVIDER_URL). Without either, a
    /// built-in simulated provider is used.
    #[arg(long)]
    provider_url: Option<String>,

    /// Bearer token for the provider (overrides PAYCOORD_ACCESS_TOKEN)
    #[arg(long)]
    access_token: Option<String>,

    /// Response delay of the simulated provider, in milliseconds
    #[arg(long)]
    provider_latency_ms: Option<u64>,

    /// Path to a persistent journal (optional). If provided, uses RocksDB.
    #[arg(long)]
    journal_path: Option<PathBuf>,

    /// Bound on each provider call, in milliseconds
    #[arg(long)]
    gateway_timeout_ms: Option<u64>,

    /// Bound on the approval wait, in milliseconds
    #[arg(long)]
    approval_timeout_ms: Option<u64>,
}

/// Environment settings first, command-line flags on top.
fn provider_config(cli: &Cli, config: &CoordinatorConfig) -> Option<HttpGatewayConfig> {
    let mut http = match (&cli.provider_url, HttpGatewayConfig::from_env()) {
        (Some(url), Some(env)) => HttpGatewayConfig {
            base_url: url.clone(),
            ..env
        },
        (Some(url), None) => HttpGatewayConfig::new(url.clone(), ""),
        (None, env) => env?,
    };
    if let Some(token) = &cli.access_token {
        http.access_token = token.clone();
    }
    http.timeout = config.gateway_timeout;
    Some(http)
}

fn open_journal(path: Option<PathBuf>) -> Result<TransactionJournalBox> {
    match path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let journal = paycoord::infrastructure::rocksdb::RocksDbJournal::open(path)
                .into_diagnostic()?;
            Ok(Box::new(journal))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent journal requested via --journal-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory journal."
            );
            Ok(Box::new(InMemoryJournal::new()))
        }
        None => Ok(Box::new(InMemoryJournal::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = CoordinatorConfig::from_env();
    if let Some(ms) = cli.gateway_timeout_ms {
        config.gateway_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = cli.approval_timeout_ms {
        config.approval_timeout = Duration::from_millis(ms);
    }

    let gateway: OrderGatewayBox = match provider_config(&cli, &config) {
        Some(http) => Box::new(HttpOrderGateway::new(http).into_diagnostic()?),
        None => {
            let mut scripted = ScriptedOrderGateway::new();
            if let Some(ms) = cli.provider_latency_ms {
                scripted = scripted.with_delay(Duration::from_millis(ms));
            }
            Box::new(scripted)
        }
    };
    let mut handoff = FixedApprovalHandoff::new(cli.approval.into());
    if let Some(ms) = cli.approval_delay_ms {
        handoff = handoff.with_delay(Duration::from_millis(ms));
    }
    let handoff = Box::new(handoff);
    let journal = open_journal(cli.journal_path)?;

    let coordinator = TransactionCoordinator::new(gateway, handoff, journal, config);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());

    for attempt in reader.attempts() {
        match attempt {
            Ok(attempt) => {
                let attempt_id = attempt.attempt_id.clone();
                let key = attempt.idempotency_key.clone();
                let reporter = RecordingReporter::new();
                coordinator.execute(attempt, &reporter).await;

                let order_id = match coordinator.journal().get(&key).await {
                    Ok(record) => record.and_then(|r| r.order_id),
                    Err(e) => {
                        tracing::warn!(attempt = %attempt_id, "journal lookup failed: {}", e);
                        None
                    }
                };
                for reported in reporter.calls() {
                    writer
                        .write_reported(&attempt_id, &reported, order_id.as_ref())
                        .into_diagnostic()?;
                }
            }
            Err(e) => {
                eprintln!("Error reading payment request: {}", e);
            }
        }
    }
    writer.flush().into_diagnostic()?;

    for record in coordinator.journal().unsettled().await.into_diagnostic()? {
        if let Some(order_id) = &record.order_id {
            eprintln!(
                "Unsettled order {} (attempt {}, state {})",
                order_id, record.attempt_id, record.state
            );
        }
    }

    Ok(())
}
