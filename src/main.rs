use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payflow::application::audit::AuditTrail;
use payflow::application::stages::{StageDeps, register_stages};
use payflow::config::{AckMode, Config};
use payflow::domain::files::Folder;
use payflow::infrastructure::ack_inbox::AckInbox;
use payflow::infrastructure::mock_provider::MockPaymentProvider;
use payflow::pipeline::registry::StepsRegistry;
use payflow::pipeline::runner::Pipeline;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Folder containing the payment CSV files
    folder: PathBuf,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    poll_interval_ms: Option<u64>,

    #[arg(long)]
    poll_max_elapsed_ms: Option<u64>,

    /// Provider calls per second
    #[arg(long)]
    rate_limit: Option<u32>,

    #[arg(long, value_enum)]
    ack_mode: Option<AckMode>,

    /// Recipients the mock provider accepts and then rejects (repeatable)
    #[arg(long)]
    decline: Vec<String>,

    /// Recipients the mock provider refuses at send time (repeatable)
    #[arg(long)]
    refuse: Vec<String>,

    /// Path to persistent database (optional). Records every stage's inputs in RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path).into_diagnostic()?,
            None => Config::default(),
        };
        if let Some(interval) = self.poll_interval_ms {
            config.poll.interval_ms = interval;
        }
        if let Some(max_elapsed) = self.poll_max_elapsed_ms {
            config.poll.max_elapsed_ms = max_elapsed;
        }
        if let Some(rate) = self.rate_limit {
            config.send.rate_limit_per_sec = rate;
        }
        if let Some(mode) = self.ack_mode {
            config.pipeline.ack_mode = mode;
        }
        config.validate().into_diagnostic()?;
        Ok(config)
    }
}

#[cfg(feature = "storage-rocksdb")]
fn audit_trail(db_path: Option<&PathBuf>, auto_persist: bool) -> Result<Option<AuditTrail>> {
    use payflow::infrastructure::rocksdb::RocksDbStore;

    match db_path {
        Some(path) => {
            let store = RocksDbStore::open(path).into_diagnostic()?;
            Ok(Some(AuditTrail::rocksdb(&store)))
        }
        None => Ok(auto_persist.then(AuditTrail::in_memory)),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn audit_trail(db_path: Option<&PathBuf>, auto_persist: bool) -> Result<Option<AuditTrail>> {
    if db_path.is_some() {
        miette::bail!("--db-path requires the `storage-rocksdb` feature");
    }
    Ok(auto_persist.then(AuditTrail::in_memory))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cli = Cli::parse();
    let config = Arc::new(cli.config()?);
    let audit = audit_trail(cli.db_path.as_ref(), config.pipeline.auto_persist)?;

    let inbox = AckInbox::new();
    let mut provider = MockPaymentProvider::new();
    for recipient in &cli.decline {
        provider = provider.decline(recipient);
    }
    for recipient in &cli.refuse {
        provider = provider.refuse(recipient);
    }
    if config.pipeline.ack_mode == AckMode::Receive {
        provider = provider.with_inbox(inbox.clone(), config.poll_interval());
    }

    let registry = StepsRegistry::new();
    register_stages(
        &registry,
        StageDeps::new(Arc::new(provider), inbox, config.clone()),
    )
    .into_diagnostic()?;
    let pipeline = Pipeline::assemble(&registry, &config, audit.as_ref()).into_diagnostic()?;

    let reports = pipeline.run(Folder::new(cli.folder)).await.into_diagnostic()?;

    let stdout = io::stdout();
    let mut writer = csv::Writer::from_writer(stdout.lock());
    writer
        .write_record(["input", "output", "records_written", "failed"])
        .into_diagnostic()?;
    for report in &reports {
        let output = report
            .summary
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        writer
            .write_record([
                report.input.display().to_string(),
                output,
                report.summary.records_written.to_string(),
                report.failed.to_string(),
            ])
            .into_diagnostic()?;
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
