#![allow(dead_code)]

use payflow::application::audit::AuditTrail;
use payflow::application::stages::{StageDeps, register_stages};
use payflow::config::{AckMode, Config};
use payflow::infrastructure::ack_inbox::AckInbox;
use payflow::infrastructure::mock_provider::MockPaymentProvider;
use payflow::pipeline::registry::StepsRegistry;
use payflow::pipeline::runner::Pipeline;
use std::fs::File;
use std::io::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Writes a payment CSV with one row per `(id, recipient, amount)`.
pub fn write_payments(path: &Path, rows: &[(&str, &str, &str)]) -> Result<PathBuf, Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["ID", "Recipient", "Amount", "Currency"])?;
    for (id, recipient, amount) in rows {
        wtr.write_record([*id, *recipient, *amount, "EUR"])?;
    }

    wtr.flush()?;
    Ok(path.to_path_buf())
}

/// Writes `rows` generated payments.
pub fn generate_payments(path: &Path, rows: usize) -> Result<PathBuf, Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["ID", "Recipient", "Amount", "Currency"])?;
    for i in 1..=rows {
        wtr.write_record([
            i.to_string(),
            format!("Recipient {i}"),
            format!("{i}.00"),
            "EUR".to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(path.to_path_buf())
}

/// Output rows of a written file, header excluded.
pub fn read_output(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

/// Fast polling and no retry waits.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.poll.interval_ms = 10;
    config.poll.max_elapsed_ms = 2_000;
    config.send.rate_limit_per_sec = 10_000;
    config.retry.wait_ms = 1;
    config.retry.max_backoff_ms = 5;
    config
}

pub fn build_pipeline(
    config: Config,
    provider: MockPaymentProvider,
    audit: Option<&AuditTrail>,
) -> Pipeline {
    let config = Arc::new(config);
    let inbox = AckInbox::new();
    let provider = if config.pipeline.ack_mode == AckMode::Receive {
        provider.with_inbox(inbox.clone(), Duration::from_millis(5))
    } else {
        provider
    };

    let registry = StepsRegistry::new();
    register_stages(
        &registry,
        StageDeps::new(Arc::new(provider), inbox, config.clone()),
    )
    .unwrap();
    Pipeline::assemble(&registry, &config, audit).unwrap()
}
