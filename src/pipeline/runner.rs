//! Wires the registered stages into the end-to-end payment flow.
//!
//! Files are taken from the folder stage one at a time. Within a file the
//! records stream through every stage concurrently, with up to
//! `max_in_flight` calls outstanding per stage and bounded hops between the
//! streaming stages. A record that fails at any stage is logged, counted and
//! left out of the output file; its siblings carry on.

use super::adapter::StepAdapter;
use super::registry::StepsRegistry;
use super::step::{Cardinality, StepHandle};
use super::transport::{Status, WireStream, hop};
use crate::application::audit::AuditTrail;
use crate::application::stages::ids;
use crate::config::{AckMode, Config, RetryConfig};
use crate::domain::files::{Folder, OutputFileSummary};
use crate::domain::ports::{Repository, RepositoryBox};
use crate::error::{PipelineError, Result};
use crate::interfaces::wire::CsvInputFileMsg;
use crate::mapping::{
    AcknowledgementMapper, FolderMapper, InputFileMapper, Mapper, OutputFileSummaryMapper,
    OutputRecordMapper, PaymentRecordMapper, PaymentStatusMapper,
};
use futures::future;
use futures::stream::StreamExt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

/// Retries calls that failed with a retryable [`Status`], backing off
/// exponentially from `wait` up to `max_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    limit: u32,
    wait: Duration,
    max_backoff: Duration,
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            limit: config.limit,
            wait: Duration::from_millis(config.wait_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
        }
    }
}

impl RetryPolicy {
    pub async fn call<T, F, Fut>(&self, stage: &str, mut op: F) -> std::result::Result<T, Status>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, Status>>,
    {
        let mut attempt = 0;
        let mut wait = self.wait;
        loop {
            match op().await {
                Err(status) if status.retryable && attempt < self.limit => {
                    attempt += 1;
                    warn!(stage, attempt, %status, "retrying call");
                    tokio::time::sleep(wait).await;
                    wait = (wait * 2).min(self.max_backoff);
                }
                outcome => return outcome,
            }
        }
    }
}

/// Outcome of one input file.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub input: PathBuf,
    pub summary: OutputFileSummary,
    /// Records that failed at some stage and were left out of the output.
    pub failed: u64,
}

pub struct Pipeline {
    folder: StepAdapter<FolderMapper, InputFileMapper>,
    input_file: StepAdapter<InputFileMapper, PaymentRecordMapper>,
    send: StepAdapter<PaymentRecordMapper, AcknowledgementMapper>,
    acknowledge: StepAdapter<AcknowledgementMapper, AcknowledgementMapper>,
    resolve: StepAdapter<AcknowledgementMapper, PaymentStatusMapper>,
    assemble: StepAdapter<PaymentStatusMapper, OutputRecordMapper>,
    write: StepAdapter<OutputRecordMapper, OutputFileSummaryMapper>,
    summaries: Option<RepositoryBox<OutputFileSummary>>,
    retry: RetryPolicy,
    max_in_flight: usize,
    channel_capacity: usize,
}

fn expect<I: 'static, O: 'static>(
    registry: &StepsRegistry,
    id: &str,
    cardinality: Cardinality,
) -> Result<StepHandle<I, O>> {
    let handle = registry.resolve::<I, O>(id)?;
    if handle.cardinality() != cardinality {
        return Err(PipelineError::StepTypeMismatch { id: id.to_string() });
    }
    Ok(handle)
}

impl Pipeline {
    /// Resolves every stage from `registry`. With an audit trail, each stage
    /// persists the inputs it processed.
    pub fn assemble(
        registry: &StepsRegistry,
        config: &Config,
        audit: Option<&AuditTrail>,
    ) -> Result<Self> {
        let acknowledge_id = match config.pipeline.ack_mode {
            AckMode::Poll => ids::POLL_ACKNOWLEDGEMENT,
            AckMode::Receive => ids::RECEIVE_ACKNOWLEDGEMENT,
        };

        let mut folder = StepAdapter::new(
            ids::PROCESS_FOLDER,
            expect(registry, ids::PROCESS_FOLDER, Cardinality::OneToMany)?,
            FolderMapper,
            InputFileMapper,
        );
        let mut input_file = StepAdapter::new(
            ids::PROCESS_INPUT_FILE,
            expect(registry, ids::PROCESS_INPUT_FILE, Cardinality::OneToMany)?,
            InputFileMapper,
            PaymentRecordMapper,
        );
        let mut send = StepAdapter::new(
            ids::SEND_PAYMENT,
            expect(registry, ids::SEND_PAYMENT, Cardinality::OneToOne)?,
            PaymentRecordMapper,
            AcknowledgementMapper,
        );
        let mut acknowledge = StepAdapter::new(
            acknowledge_id,
            expect(registry, acknowledge_id, Cardinality::ManyToMany)?,
            AcknowledgementMapper,
            AcknowledgementMapper,
        );
        let mut resolve = StepAdapter::new(
            ids::RESOLVE_STATUS,
            expect(registry, ids::RESOLVE_STATUS, Cardinality::OneToOne)?,
            AcknowledgementMapper,
            PaymentStatusMapper,
        );
        let mut assemble = StepAdapter::new(
            ids::ASSEMBLE_OUTPUT,
            expect(registry, ids::ASSEMBLE_OUTPUT, Cardinality::OneToOne)?,
            PaymentStatusMapper,
            OutputRecordMapper,
        );
        let mut write = StepAdapter::new(
            ids::WRITE_OUTPUT_FILE,
            expect(registry, ids::WRITE_OUTPUT_FILE, Cardinality::ManyToOne)?,
            OutputRecordMapper,
            OutputFileSummaryMapper,
        );

        let mut summaries = None;
        if let Some(audit) = audit {
            folder = folder.with_auto_persist(audit.folders.clone());
            input_file = input_file.with_auto_persist(audit.input_files.clone());
            send = send.with_auto_persist(audit.payment_records.clone());
            acknowledge = acknowledge.with_auto_persist(audit.acknowledgements.clone());
            resolve = resolve.with_auto_persist(audit.acknowledgements.clone());
            assemble = assemble.with_auto_persist(audit.payment_statuses.clone());
            write = write.with_auto_persist(audit.output_records.clone());
            summaries = Some(audit.output_files.clone());
        }

        Ok(Self {
            folder,
            input_file,
            send,
            acknowledge,
            resolve,
            assemble,
            write,
            summaries,
            retry: RetryPolicy::from(&config.retry),
            max_in_flight: config.pipeline.max_in_flight.max(1),
            channel_capacity: config.pipeline.channel_capacity.max(1),
        })
    }

    /// Processes every CSV file in `folder`, one file after the other.
    ///
    /// Fails only when the folder itself cannot be listed or an output file
    /// cannot be written.
    pub async fn run(&self, folder: Folder) -> Result<Vec<FileReport>> {
        info!(folder = %folder.path().display(), "processing folder");
        let mut files = self.folder.server_streaming(FolderMapper.domain_to_wire(folder));
        let mut reports = Vec::new();
        while let Some(file) = files.next().await {
            reports.push(self.run_file(file?).await?);
        }
        Ok(reports)
    }

    async fn run_file(&self, file: CsvInputFileMsg) -> Result<FileReport> {
        let input = PathBuf::from(&file.input_path);
        info!(input = %input.display(), "processing file");
        let failed = Arc::new(AtomicU64::new(0));
        let n = self.max_in_flight;

        let records = drop_failures(
            hop(self.input_file.server_streaming(file), self.channel_capacity),
            self.input_file.name(),
            failed.clone(),
        );

        let send = self.send.clone();
        let retry = self.retry.clone();
        let acks = records
            .map(move |item| {
                let send = send.clone();
                let retry = retry.clone();
                async move {
                    let record = item?;
                    retry
                        .call(send.name(), || send.unary(record.clone()))
                        .await
                }
            })
            .buffered(n)
            .boxed();
        let acks = drop_failures(hop(acks, self.channel_capacity), self.send.name(), failed.clone());

        let settled = drop_failures(
            self.acknowledge.bidi(acks),
            self.acknowledge.name(),
            failed.clone(),
        );

        let resolve = self.resolve.clone();
        let retry = self.retry.clone();
        let statuses = settled
            .map(move |item| {
                let resolve = resolve.clone();
                let retry = retry.clone();
                async move {
                    let ack = item?;
                    retry
                        .call(resolve.name(), || resolve.unary(ack.clone()))
                        .await
                }
            })
            .buffered(n)
            .boxed();
        let statuses = drop_failures(statuses, self.resolve.name(), failed.clone());

        let assemble = self.assemble.clone();
        let outputs = statuses
            .map(move |item| {
                let assemble = assemble.clone();
                async move { assemble.unary(item?).await }
            })
            .buffered(n)
            .boxed();
        let outputs = drop_failures(outputs, self.assemble.name(), failed.clone());

        let summary = self.write.client_streaming(outputs).await?;
        let summary = OutputFileSummaryMapper.wire_to_domain(summary)?;
        if let Some(repository) = &self.summaries {
            repository.save(summary.clone()).await?;
        }

        let failed = failed.load(Ordering::Relaxed);
        info!(
            input = %input.display(),
            records_written = summary.records_written,
            failed,
            "file done"
        );
        Ok(FileReport {
            input,
            summary,
            failed,
        })
    }
}

/// Drops error elements from a stage's output, logging and counting each one.
fn drop_failures<T: Send + 'static>(
    stream: WireStream<T>,
    stage: &str,
    failed: Arc<AtomicU64>,
) -> WireStream<T> {
    let stage: Arc<str> = Arc::from(stage);
    stream
        .filter_map(move |item| {
            let kept = match item {
                Ok(value) => Some(Ok(value)),
                Err(status) => {
                    failed.fetch_add(1, Ordering::Relaxed);
                    error!(stage = %stage, code = %status.code, message = %status.message, "record dropped");
                    None
                }
            };
            future::ready(kept)
        })
        .boxed()
}
