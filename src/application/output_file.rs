use crate::domain::files::{OutputFileSummary, output_path_for};
use crate::domain::payment::OutputRecord;
use crate::error::Result;
use crate::infrastructure::blocking::BlockingPool;
use crate::interfaces::csv::output_writer::OutputWriter;
use crate::pipeline::step::{DomainStream, ManyToOne};
use async_trait::async_trait;
use futures::StreamExt;
use std::fs::File;
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// Writes the records of one input file to its output file.
///
/// The output path is derived from the first record's source file. Records
/// arrive in chunks of at most `batch_size` and each chunk is written and
/// flushed on the blocking pool. Errors in the input stream are logged and
/// skipped.
pub struct WriteOutputFileStep {
    pool: BlockingPool,
    batch_size: usize,
}

impl WriteOutputFileStep {
    pub fn new(pool: BlockingPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl ManyToOne<OutputRecord, OutputFileSummary> for WriteOutputFileStep {
    async fn apply(&self, inputs: DomainStream<OutputRecord>) -> Result<OutputFileSummary> {
        let mut chunks = inputs.ready_chunks(self.batch_size);
        let mut writer: Option<OutputWriter<File>> = None;
        let mut path: Option<PathBuf> = None;
        let mut records_written = 0u64;

        while let Some(chunk) = chunks.next().await {
            let mut batch = Vec::with_capacity(chunk.len());
            for item in chunk {
                match item {
                    Ok(record) => batch.push(record),
                    Err(e) => warn!(error = %e, "skipping record that failed upstream"),
                }
            }
            let Some(first) = batch.first() else {
                continue;
            };

            let current = match writer.take() {
                Some(current) => current,
                None => {
                    let target = output_path_for(&first.source);
                    path = Some(target.clone());
                    self.pool.run(move || OutputWriter::create(&target)).await?
                }
            };

            let written = batch.len() as u64;
            let current = self
                .pool
                .run(move || {
                    let mut current = current;
                    for record in &batch {
                        current.write(record)?;
                    }
                    current.flush()?;
                    Ok(current)
                })
                .await?;
            writer = Some(current);
            records_written += written;
        }

        if let Some(path) = &path {
            debug!(path = %path.display(), records_written, "output file written");
        }
        Ok(OutputFileSummary {
            id: Uuid::new_v4(),
            path,
            records_written,
        })
    }
}
