//! Wire messages exchanged between stages.
//!
//! Every field is a string or a plain number; an empty string stands for an
//! absent value, as it would in a generated protocol message.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderMsg {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvInputFileMsg {
    pub id: String,
    pub folder: String,
    pub input_path: String,
    pub output_path: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecordMsg {
    pub id: String,
    pub csv_id: String,
    pub source: String,
    pub recipient: String,
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgementMsg {
    pub conversation_id: String,
    pub status: u32,
    pub message: String,
    pub payment_record_id: String,
    pub payment_record: Option<PaymentRecordMsg>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusMsg {
    pub id: String,
    pub reference: String,
    pub fee: String,
    pub message: String,
    pub acknowledgement_id: String,
    pub acknowledgement: Option<AcknowledgementMsg>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecordMsg {
    pub id: String,
    pub csv_id: String,
    pub source: String,
    pub recipient: String,
    pub amount: String,
    pub currency: String,
    pub conversation_id: String,
    pub status: u32,
    pub message: String,
    pub fee: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFileSummaryMsg {
    pub id: String,
    pub path: String,
    pub records_written: u64,
}
