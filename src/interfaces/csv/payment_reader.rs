use crate::domain::payment::PaymentRecord;
use crate::error::{PipelineError, Result};
use crate::mapping::payment::{PaymentRecordDto, PaymentRecordMapper};
use crate::mapping::{Mapper, parse_currency, parse_decimal};
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One line of an input file, before validation.
#[derive(Debug, Deserialize)]
struct PaymentRow {
    #[serde(rename = "ID", alias = "id", alias = "Id")]
    id: String,
    #[serde(rename = "Recipient", alias = "recipient")]
    recipient: String,
    #[serde(rename = "Amount", alias = "amount")]
    amount: String,
    #[serde(rename = "Currency", alias = "currency")]
    currency: String,
}

/// Reads payment records from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// and validates every row into a [`PaymentRecord`] tagged with its source file.
pub struct PaymentReader<R: Read> {
    reader: csv::Reader<R>,
    source: PathBuf,
}

impl PaymentReader<File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file, path))
    }
}

impl<R: Read> PaymentReader<R> {
    pub fn new(source: R, name: impl Into<PathBuf>) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self {
            reader,
            source: name.into(),
        }
    }

    /// Lazily reads and validates records, one per line.
    pub fn records(&mut self) -> impl Iterator<Item = Result<PaymentRecord>> + '_ {
        let source = self.source.clone();
        self.reader
            .deserialize::<PaymentRow>()
            .map(move |row| to_record(row?, &source))
    }

    /// Reads up to `max` records. An empty batch means the source is exhausted.
    pub fn read_batch(&mut self, max: usize) -> Vec<Result<PaymentRecord>> {
        self.records().take(max).collect()
    }
}

fn to_record(row: PaymentRow, source: &Path) -> Result<PaymentRecord> {
    let dto = PaymentRecordDto {
        id: Uuid::new_v4(),
        csv_id: row.id,
        source: source.to_path_buf(),
        recipient: row.recipient,
        amount: parse_decimal("amount", &row.amount)?,
        currency: parse_currency("currency", &row.currency)?,
    };
    PaymentRecordMapper
        .from_dto(dto)
        .map_err(PipelineError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reader_valid_stream() {
        let data = "ID,Recipient,Amount,Currency\n1, Alice,\"1,000.00\", eur\n\n2,Bob,20.5,USD\n";
        let mut reader = PaymentReader::new(data.as_bytes(), "batch.csv");
        let results: Vec<Result<PaymentRecord>> = reader.records().collect();

        assert_eq!(results.len(), 2);
        let first = results[0].as_ref().unwrap();
        assert_eq!(first.csv_id(), "1");
        assert_eq!(first.recipient(), "Alice");
        assert_eq!(first.amount().value(), dec!(1000.00));
        assert_eq!(first.currency().code(), "EUR");
        assert_eq!(first.source(), Path::new("batch.csv"));
    }

    #[test]
    fn test_reader_malformed_line() {
        let data = "ID,Recipient,Amount,Currency\n1,Alice,-5,EUR\n2,Bob,ten,EUR\n3,Carol,1,EUR";
        let mut reader = PaymentReader::new(data.as_bytes(), "batch.csv");
        let results: Vec<Result<PaymentRecord>> = reader.records().collect();

        assert!(matches!(&results[0], Err(PipelineError::Mapping(e)) if e.field == "amount"));
        assert!(matches!(&results[1], Err(PipelineError::Mapping(e)) if e.field == "amount"));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_read_batch_resumes_where_it_stopped() {
        let data = "ID,Recipient,Amount,Currency\n1,A,1,EUR\n2,B,2,EUR\n3,C,3,EUR\n";
        let mut reader = PaymentReader::new(data.as_bytes(), "batch.csv");

        assert_eq!(reader.read_batch(2).len(), 2);
        let rest = reader.read_batch(2);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].as_ref().unwrap().csv_id(), "3");
        assert!(reader.read_batch(2).is_empty());
    }
}
