use crate::domain::files::{CsvInputFile, Folder, OutputFileSummary};
use crate::domain::payment::{Acknowledgement, OutputRecord, PaymentRecord, PaymentStatus};
use crate::domain::ports::{Entity, Repository};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Column families opened by [`RocksDbStore::open`], one per entity kind.
pub const COLUMN_FAMILIES: [&str; 7] = [
    Folder::KIND,
    CsvInputFile::KIND,
    PaymentRecord::KIND,
    Acknowledgement::KIND,
    PaymentStatus::KIND,
    OutputRecord::KIND,
    OutputFileSummary::KIND,
];

/// A persistent store backed by RocksDB.
///
/// Every entity kind lives in its own column family, keyed by the entity id,
/// with the entity serialized as JSON. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbStore {
    db: Arc<DB>,
}

impl RocksDbStore {
    /// Opens or creates a RocksDB instance at `path`, creating missing column families.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, descriptors).map_err(PipelineError::internal)?;

        Ok(Self { db: Arc::new(db) })
    }

    pub fn repository<T: Entity>(&self) -> RocksDbRepository<T> {
        RocksDbRepository {
            db: self.db.clone(),
            _kind: PhantomData,
        }
    }
}

/// Typed view over one column family of a [`RocksDbStore`].
pub struct RocksDbRepository<T> {
    db: Arc<DB>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for RocksDbRepository<T> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _kind: PhantomData,
        }
    }
}

fn missing_family(kind: &str) -> PipelineError {
    PipelineError::internal(std::io::Error::other(format!(
        "column family {kind} not found"
    )))
}

#[async_trait]
impl<T: Entity> Repository<T> for RocksDbRepository<T> {
    async fn save(&self, entity: T) -> Result<Uuid> {
        let cf = self
            .db
            .cf_handle(T::KIND)
            .ok_or_else(|| missing_family(T::KIND))?;

        let id = entity.id();
        let value = serde_json::to_vec(&entity).map_err(PipelineError::internal)?;
        self.db
            .put_cf(&cf, id.as_bytes(), value)
            .map_err(PipelineError::internal)?;

        Ok(id)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>> {
        let cf = self
            .db
            .cf_handle(T::KIND)
            .ok_or_else(|| missing_family(T::KIND))?;

        match self.db.get_cf(&cf, id.as_bytes()).map_err(PipelineError::internal)? {
            Some(bytes) => {
                let entity = serde_json::from_slice(&bytes).map_err(PipelineError::internal)?;
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Currency};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).expect("Failed to open RocksDB");

        for name in COLUMN_FAMILIES {
            assert!(store.db.cf_handle(name).is_some(), "missing {name}");
        }
    }

    #[tokio::test]
    async fn test_rocksdb_repository() {
        let dir = tempdir().unwrap();
        let store = RocksDbStore::open(dir.path()).unwrap();
        let repo = store.repository::<PaymentRecord>();

        let record = PaymentRecord::new(
            "1",
            "/in/a.csv",
            "Alice",
            Amount::new(dec!(10.50)).unwrap(),
            Currency::new("EUR").unwrap(),
        );
        let id = repo.save(record.clone()).await.unwrap();

        assert_eq!(repo.find_by_id(id).await.unwrap(), Some(record));
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        let folder = Folder::new("/in");
        {
            let store = RocksDbStore::open(dir.path()).unwrap();
            store.repository::<Folder>().save(folder.clone()).await.unwrap();
        }

        let store = RocksDbStore::open(dir.path()).unwrap();
        let found = store.repository::<Folder>().find_by_id(folder.id()).await.unwrap();
        assert_eq!(found, Some(folder));
    }
}
