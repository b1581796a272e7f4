use super::money::{Amount, Currency};
use super::ports::Entity;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// One instruction to pay, as parsed from an input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    id: Uuid,
    csv_id: String,
    source: PathBuf,
    recipient: String,
    amount: Amount,
    currency: Currency,
}

impl PaymentRecord {
    pub fn new(
        csv_id: impl Into<String>,
        source: impl Into<PathBuf>,
        recipient: impl Into<String>,
        amount: Amount,
        currency: Currency,
    ) -> Self {
        Self::from_parts(
            Uuid::new_v4(),
            csv_id.into(),
            source.into(),
            recipient.into(),
            amount,
            currency,
        )
    }

    pub(crate) fn from_parts(
        id: Uuid,
        csv_id: String,
        source: PathBuf,
        recipient: String,
        amount: Amount,
        currency: Currency,
    ) -> Self {
        Self {
            id,
            csv_id,
            source,
            recipient,
            amount,
            currency,
        }
    }

    pub fn csv_id(&self) -> &str {
        &self.csv_id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}

impl Entity for PaymentRecord {
    const KIND: &'static str = "payment_records";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for PaymentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PaymentRecord{{id={}, recipient={}, amount={} {}, file={}}}",
            self.csv_id,
            self.recipient,
            self.amount,
            self.currency,
            self.source.display()
        )
    }
}

/// What the send stage hands to the provider. Never persisted.
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub payment_record: PaymentRecord,
    pub endpoint: String,
    pub timeout: Duration,
}

impl SendRequest {
    pub fn for_record(payment_record: PaymentRecord, endpoint: &str, timeout: Duration) -> Self {
        Self {
            payment_record,
            endpoint: endpoint.to_string(),
            timeout,
        }
    }
}

/// Classification of a provider status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Succeeded,
    Failed,
}

/// Numeric status code reported by the payment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    pub const ACCEPTED: Self = Self(1000);
    pub const PROCESSING: Self = Self(1100);
    pub const COMPLETED: Self = Self(2000);
    pub const REJECTED: Self = Self(4000);

    pub fn class(self) -> StatusClass {
        match self.0 {
            2000..=2999 => StatusClass::Succeeded,
            4000..=5999 => StatusClass::Failed,
            _ => StatusClass::Pending,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.class() != StatusClass::Pending
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A status report for one conversation, as returned by a poll or pushed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckUpdate {
    pub conversation_id: Uuid,
    pub status: StatusCode,
    pub message: Option<String>,
}

/// The provider's acknowledgement of a sent payment.
///
/// Carries the originating record so status resolution needs no lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub conversation_id: Uuid,
    pub status: StatusCode,
    /// Never `Some("")`; an empty message is no message.
    pub message: Option<String>,
    pub payment_record: PaymentRecord,
}

impl Acknowledgement {
    pub fn new(conversation_id: Uuid, status: StatusCode, payment_record: PaymentRecord) -> Self {
        Self {
            conversation_id,
            status,
            message: None,
            payment_record,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = non_empty(message.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Refreshes status and message from a newer report of the same conversation.
    pub(crate) fn apply(&mut self, update: AckUpdate) {
        debug_assert_eq!(update.conversation_id, self.conversation_id);
        self.status = update.status;
        if let Some(message) = update.message.and_then(non_empty) {
            self.message = Some(message);
        }
    }
}

fn non_empty(message: String) -> Option<String> {
    (!message.is_empty()).then_some(message)
}

impl Entity for Acknowledgement {
    const KIND: &'static str = "acknowledgements";

    fn id(&self) -> Uuid {
        self.conversation_id
    }
}

/// Provider-side details of a settled conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    pub reference: String,
    pub fee: Decimal,
    pub message: Option<String>,
}

/// The resolved, terminal view of an acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatus {
    id: Uuid,
    reference: String,
    fee: Decimal,
    message: String,
    acknowledgement: Acknowledgement,
}

impl PaymentStatus {
    /// `None` unless `acknowledgement` carries a terminal status.
    pub fn resolve(acknowledgement: Acknowledgement, provider: ProviderStatus) -> Option<Self> {
        if !acknowledgement.is_terminal() {
            return None;
        }
        let message = provider
            .message
            .or_else(|| acknowledgement.message.clone())
            .unwrap_or_default();
        Some(Self::from_parts(
            Uuid::new_v4(),
            provider.reference,
            provider.fee,
            message,
            acknowledgement,
        ))
    }

    pub(crate) fn from_parts(
        id: Uuid,
        reference: String,
        fee: Decimal,
        message: String,
        acknowledgement: Acknowledgement,
    ) -> Self {
        Self {
            id,
            reference,
            fee,
            message,
            acknowledgement,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn fee(&self) -> Decimal {
        self.fee
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn acknowledgement(&self) -> &Acknowledgement {
        &self.acknowledgement
    }

    pub fn outcome(&self) -> StatusClass {
        self.acknowledgement.status.class()
    }
}

impl Entity for PaymentStatus {
    const KIND: &'static str = "payment_statuses";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// One line of an output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub id: Uuid,
    pub csv_id: String,
    pub source: PathBuf,
    pub recipient: String,
    pub amount: Amount,
    pub currency: Currency,
    pub conversation_id: Uuid,
    pub status: StatusCode,
    pub message: String,
    pub fee: Decimal,
}

impl OutputRecord {
    pub fn assemble(status: &PaymentStatus) -> Self {
        let ack = status.acknowledgement();
        let record = &ack.payment_record;
        Self {
            id: Uuid::new_v4(),
            csv_id: record.csv_id().to_string(),
            source: record.source().to_path_buf(),
            recipient: record.recipient().to_string(),
            amount: record.amount(),
            currency: record.currency().clone(),
            conversation_id: ack.conversation_id,
            status: ack.status,
            message: status.message().to_string(),
            fee: status.fee(),
        }
    }
}

impl Entity for OutputRecord {
    const KIND: &'static str = "output_records";

    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> PaymentRecord {
        PaymentRecord::new(
            "1",
            "/in/a.csv",
            "Alice",
            Amount::new(dec!(10)).unwrap(),
            Currency::new("EUR").unwrap(),
        )
    }

    #[test]
    fn test_status_code_classes() {
        assert_eq!(StatusCode::ACCEPTED.class(), StatusClass::Pending);
        assert_eq!(StatusCode::PROCESSING.class(), StatusClass::Pending);
        assert_eq!(StatusCode::COMPLETED.class(), StatusClass::Succeeded);
        assert_eq!(StatusCode::REJECTED.class(), StatusClass::Failed);
        assert_eq!(StatusCode(5001).class(), StatusClass::Failed);
        assert!(!StatusCode(3000).is_terminal());
    }

    #[test]
    fn test_apply_keeps_message_when_update_has_none() {
        let mut ack = Acknowledgement::new(Uuid::new_v4(), StatusCode::ACCEPTED, record())
            .with_message("accepted");
        ack.apply(AckUpdate {
            conversation_id: ack.conversation_id,
            status: StatusCode::PROCESSING,
            message: None,
        });
        assert_eq!(ack.status, StatusCode::PROCESSING);
        assert_eq!(ack.message.as_deref(), Some("accepted"));
    }

    #[test]
    fn test_empty_messages_are_no_message() {
        let mut ack =
            Acknowledgement::new(Uuid::new_v4(), StatusCode::ACCEPTED, record()).with_message("");
        assert_eq!(ack.message, None);

        ack = ack.with_message("accepted");
        ack.apply(AckUpdate {
            conversation_id: ack.conversation_id,
            status: StatusCode::COMPLETED,
            message: Some(String::new()),
        });
        assert_eq!(ack.status, StatusCode::COMPLETED);
        assert_eq!(ack.message.as_deref(), Some("accepted"));
    }

    #[test]
    fn test_resolve_requires_terminal_acknowledgement() {
        let provider = ProviderStatus {
            reference: "101".into(),
            fee: dec!(1.01),
            message: None,
        };
        let pending = Acknowledgement::new(Uuid::new_v4(), StatusCode::ACCEPTED, record());
        assert!(PaymentStatus::resolve(pending, provider.clone()).is_none());

        let done = Acknowledgement::new(Uuid::new_v4(), StatusCode::COMPLETED, record())
            .with_message("settled");
        let status = PaymentStatus::resolve(done, provider).unwrap();
        assert_eq!(status.message(), "settled");
        assert_eq!(status.outcome(), StatusClass::Succeeded);
    }

    #[test]
    fn test_output_record_joins_status_and_record() {
        let ack = Acknowledgement::new(Uuid::new_v4(), StatusCode::COMPLETED, record());
        let conversation_id = ack.conversation_id;
        let status = PaymentStatus::resolve(
            ack,
            ProviderStatus {
                reference: "101".into(),
                fee: dec!(1.01),
                message: Some("Mock response".into()),
            },
        )
        .unwrap();

        let output = OutputRecord::assemble(&status);
        assert_eq!(output.csv_id, "1");
        assert_eq!(output.recipient, "Alice");
        assert_eq!(output.conversation_id, conversation_id);
        assert_eq!(output.status, StatusCode::COMPLETED);
        assert_eq!(output.fee, dec!(1.01));
        assert_eq!(output.message, "Mock response");
    }
}
