use crate::domain::files::{CsvInputFile, Folder, OutputFileSummary};
use crate::domain::payment::{Acknowledgement, OutputRecord, PaymentRecord, PaymentStatus};
use crate::domain::ports::RepositoryBox;
use crate::infrastructure::in_memory::InMemoryRepository;
use std::sync::Arc;

#[cfg(feature = "storage-rocksdb")]
use crate::infrastructure::rocksdb::RocksDbStore;

/// One repository per entity kind that flows through the pipeline.
#[derive(Clone)]
pub struct AuditTrail {
    pub folders: RepositoryBox<Folder>,
    pub input_files: RepositoryBox<CsvInputFile>,
    pub payment_records: RepositoryBox<PaymentRecord>,
    pub acknowledgements: RepositoryBox<Acknowledgement>,
    pub payment_statuses: RepositoryBox<PaymentStatus>,
    pub output_records: RepositoryBox<OutputRecord>,
    pub output_files: RepositoryBox<OutputFileSummary>,
}

impl AuditTrail {
    pub fn in_memory() -> Self {
        Self {
            folders: Arc::new(InMemoryRepository::<Folder>::new()),
            input_files: Arc::new(InMemoryRepository::<CsvInputFile>::new()),
            payment_records: Arc::new(InMemoryRepository::<PaymentRecord>::new()),
            acknowledgements: Arc::new(InMemoryRepository::<Acknowledgement>::new()),
            payment_statuses: Arc::new(InMemoryRepository::<PaymentStatus>::new()),
            output_records: Arc::new(InMemoryRepository::<OutputRecord>::new()),
            output_files: Arc::new(InMemoryRepository::<OutputFileSummary>::new()),
        }
    }

    #[cfg(feature = "storage-rocksdb")]
    pub fn rocksdb(store: &RocksDbStore) -> Self {
        Self {
            folders: Arc::new(store.repository::<Folder>()),
            input_files: Arc::new(store.repository::<CsvInputFile>()),
            payment_records: Arc::new(store.repository::<PaymentRecord>()),
            acknowledgements: Arc::new(store.repository::<Acknowledgement>()),
            payment_statuses: Arc::new(store.repository::<PaymentStatus>()),
            output_records: Arc::new(store.repository::<OutputRecord>()),
            output_files: Arc::new(store.repository::<OutputFileSummary>()),
        }
    }
}
