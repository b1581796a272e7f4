use crate::domain::files::CsvInputFile;
use crate::domain::payment::PaymentRecord;
use crate::infrastructure::blocking::BlockingPool;
use crate::interfaces::csv::payment_reader::PaymentReader;
use crate::pipeline::step::{DomainStream, OneToMany};
use futures::stream::{self, StreamExt};
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

enum ReadState {
    Closed(PathBuf),
    Open(PaymentReader<File>),
    Done,
}

/// Parses an input file into payment records.
///
/// Reads happen on the blocking pool, `batch_size` rows per job, and only when
/// the consumer asks for more. Dropping the stream closes the file.
pub struct ProcessInputFileStep {
    pool: BlockingPool,
    batch_size: usize,
}

impl ProcessInputFileStep {
    pub fn new(pool: BlockingPool, batch_size: usize) -> Self {
        Self {
            pool,
            batch_size: batch_size.max(1),
        }
    }
}

impl OneToMany<CsvInputFile, PaymentRecord> for ProcessInputFileStep {
    fn apply(&self, file: CsvInputFile) -> DomainStream<PaymentRecord> {
        let pool = self.pool.clone();
        let batch_size = self.batch_size;
        debug!(file = %file.source_name(), "parsing input file");

        stream::unfold(ReadState::Closed(file.input().to_path_buf()), move |state| {
            let pool = pool.clone();
            async move {
                let reader = match state {
                    ReadState::Done => return None,
                    ReadState::Open(reader) => reader,
                    ReadState::Closed(path) => {
                        match pool.run(move || PaymentReader::open(&path)).await {
                            Ok(reader) => reader,
                            Err(e) => return Some((vec![Err(e)], ReadState::Done)),
                        }
                    }
                };

                let batch = pool
                    .run(move || {
                        let mut reader = reader;
                        let batch = reader.read_batch(batch_size);
                        Ok((reader, batch))
                    })
                    .await;
                match batch {
                    Ok((_, batch)) if batch.is_empty() => None,
                    Ok((reader, batch)) => Some((batch, ReadState::Open(reader))),
                    Err(e) => Some((vec![Err(e)], ReadState::Done)),
                }
            }
        })
        .flat_map(stream::iter)
        .boxed()
    }
}
