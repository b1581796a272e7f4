use crate::domain::payment::OutputRecord;
use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct OutputRow<'a> {
    #[serde(rename = "CSV Id")]
    csv_id: &'a str,
    #[serde(rename = "Recipient")]
    recipient: &'a str,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Currency")]
    currency: &'a str,
    #[serde(rename = "Reference")]
    reference: String,
    #[serde(rename = "Status")]
    status: u32,
    #[serde(rename = "Message")]
    message: &'a str,
    #[serde(rename = "Fee")]
    fee: String,
}

impl<'a> From<&'a OutputRecord> for OutputRow<'a> {
    fn from(record: &'a OutputRecord) -> Self {
        Self {
            csv_id: &record.csv_id,
            recipient: &record.recipient,
            amount: record.amount.to_string(),
            currency: record.currency.code(),
            reference: record.conversation_id.to_string(),
            status: record.status.0,
            message: &record.message,
            fee: format!("{:.2}", record.fee),
        }
    }
}

/// Writes output records as CSV. The header goes out with the first record.
pub struct OutputWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl OutputWriter<File> {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write(&mut self, record: &OutputRecord) -> Result<()> {
        self.writer.serialize(OutputRow::from(record))?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| std::io::Error::other(e.to_string()).into())
    }
}
