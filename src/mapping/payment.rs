use super::{
    Mapper, MappingError, optional_text, parse_currency, parse_decimal, parse_path, parse_uuid,
    path_to_string,
};
use crate::domain::money::{Amount, Currency};
use crate::domain::payment::{
    Acknowledgement, OutputRecord, PaymentRecord, PaymentStatus, StatusCode,
};
use crate::domain::ports::Entity;
use crate::interfaces::wire::{
    AcknowledgementMsg, OutputRecordMsg, PaymentRecordMsg, PaymentStatusMsg,
};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

fn amount(field: &'static str, value: Decimal) -> Result<Amount, MappingError> {
    Amount::new(value).map_err(|reason| MappingError::new(field, reason))
}

fn required_text(field: &'static str, value: String) -> Result<String, MappingError> {
    if value.trim().is_empty() {
        Err(MappingError::missing(field))
    } else {
        Ok(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentRecordDto {
    pub id: Uuid,
    pub csv_id: String,
    pub source: PathBuf,
    pub recipient: String,
    pub amount: Decimal,
    pub currency: Currency,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentRecordMapper;

impl Mapper for PaymentRecordMapper {
    type Wire = PaymentRecordMsg;
    type Dto = PaymentRecordDto;
    type Domain = PaymentRecord;

    fn from_wire(&self, wire: PaymentRecordMsg) -> Result<PaymentRecordDto, MappingError> {
        Ok(PaymentRecordDto {
            id: parse_uuid("id", &wire.id)?,
            csv_id: wire.csv_id,
            source: parse_path("source", &wire.source)?,
            recipient: wire.recipient,
            amount: parse_decimal("amount", &wire.amount)?,
            currency: parse_currency("currency", &wire.currency)?,
        })
    }

    fn to_wire(&self, dto: PaymentRecordDto) -> PaymentRecordMsg {
        PaymentRecordMsg {
            id: dto.id.to_string(),
            csv_id: dto.csv_id,
            source: path_to_string(&dto.source),
            recipient: dto.recipient,
            amount: dto.amount.to_string(),
            currency: dto.currency.to_string(),
        }
    }

    fn from_dto(&self, dto: PaymentRecordDto) -> Result<PaymentRecord, MappingError> {
        Ok(PaymentRecord::from_parts(
            dto.id,
            required_text("csv_id", dto.csv_id)?,
            dto.source,
            required_text("recipient", dto.recipient)?,
            amount("amount", dto.amount)?,
            dto.currency,
        ))
    }

    fn to_dto(&self, domain: PaymentRecord) -> PaymentRecordDto {
        PaymentRecordDto {
            id: domain.id(),
            csv_id: domain.csv_id().to_string(),
            source: domain.source().to_path_buf(),
            recipient: domain.recipient().to_string(),
            amount: domain.amount().value(),
            currency: domain.currency().clone(),
        }
    }
}

/// Transfer form of an acknowledgement.
///
/// `payment_record_id` is always present; the embedded record may be left out
/// by a producer that expects the consumer to resolve it elsewhere, in which
/// case `from_dto` refuses to build a domain value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcknowledgementDto {
    pub conversation_id: Uuid,
    pub status: StatusCode,
    pub message: Option<String>,
    pub payment_record_id: Uuid,
    pub payment_record: Option<PaymentRecordDto>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AcknowledgementMapper;

impl Mapper for AcknowledgementMapper {
    type Wire = AcknowledgementMsg;
    type Dto = AcknowledgementDto;
    type Domain = Acknowledgement;

    fn from_wire(&self, wire: AcknowledgementMsg) -> Result<AcknowledgementDto, MappingError> {
        let payment_record = wire
            .payment_record
            .map(|record| PaymentRecordMapper.from_wire(record))
            .transpose()?;
        Ok(AcknowledgementDto {
            conversation_id: parse_uuid("conversation_id", &wire.conversation_id)?,
            status: StatusCode(wire.status),
            message: optional_text(wire.message),
            payment_record_id: parse_uuid("payment_record_id", &wire.payment_record_id)?,
            payment_record,
        })
    }

    fn to_wire(&self, dto: AcknowledgementDto) -> AcknowledgementMsg {
        AcknowledgementMsg {
            conversation_id: dto.conversation_id.to_string(),
            status: dto.status.0,
            message: dto.message.unwrap_or_default(),
            payment_record_id: dto.payment_record_id.to_string(),
            payment_record: dto
                .payment_record
                .map(|record| PaymentRecordMapper.to_wire(record)),
        }
    }

    fn from_dto(&self, dto: AcknowledgementDto) -> Result<Acknowledgement, MappingError> {
        let record = dto
            .payment_record
            .ok_or(MappingError::missing("payment_record"))?;
        if record.id != dto.payment_record_id {
            return Err(MappingError::new(
                "payment_record_id",
                format!("does not match embedded record {}", record.id),
            ));
        }
        Ok(Acknowledgement {
            conversation_id: dto.conversation_id,
            status: dto.status,
            message: dto.message,
            payment_record: PaymentRecordMapper.from_dto(record)?,
        })
    }

    fn to_dto(&self, domain: Acknowledgement) -> AcknowledgementDto {
        AcknowledgementDto {
            conversation_id: domain.conversation_id,
            status: domain.status,
            message: domain.message,
            payment_record_id: domain.payment_record.id(),
            payment_record: Some(PaymentRecordMapper.to_dto(domain.payment_record)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatusDto {
    pub id: Uuid,
    pub reference: String,
    pub fee: Decimal,
    pub message: String,
    pub acknowledgement_id: Uuid,
    pub acknowledgement: Option<AcknowledgementDto>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PaymentStatusMapper;

impl Mapper for PaymentStatusMapper {
    type Wire = PaymentStatusMsg;
    type Dto = PaymentStatusDto;
    type Domain = PaymentStatus;

    fn from_wire(&self, wire: PaymentStatusMsg) -> Result<PaymentStatusDto, MappingError> {
        let acknowledgement = wire
            .acknowledgement
            .map(|ack| AcknowledgementMapper.from_wire(ack))
            .transpose()?;
        Ok(PaymentStatusDto {
            id: parse_uuid("id", &wire.id)?,
            reference: wire.reference,
            fee: parse_decimal("fee", &wire.fee)?,
            message: wire.message,
            acknowledgement_id: parse_uuid("acknowledgement_id", &wire.acknowledgement_id)?,
            acknowledgement,
        })
    }

    fn to_wire(&self, dto: PaymentStatusDto) -> PaymentStatusMsg {
        PaymentStatusMsg {
            id: dto.id.to_string(),
            reference: dto.reference,
            fee: dto.fee.to_string(),
            message: dto.message,
            acknowledgement_id: dto.acknowledgement_id.to_string(),
            acknowledgement: dto
                .acknowledgement
                .map(|ack| AcknowledgementMapper.to_wire(ack)),
        }
    }

    fn from_dto(&self, dto: PaymentStatusDto) -> Result<PaymentStatus, MappingError> {
        let ack = dto
            .acknowledgement
            .ok_or(MappingError::missing("acknowledgement"))?;
        if ack.conversation_id != dto.acknowledgement_id {
            return Err(MappingError::new(
                "acknowledgement_id",
                format!("does not match embedded acknowledgement {}", ack.conversation_id),
            ));
        }
        if dto.fee.is_sign_negative() {
            return Err(MappingError::new("fee", "fee must not be negative"));
        }
        let acknowledgement = AcknowledgementMapper.from_dto(ack)?;
        if !acknowledgement.is_terminal() {
            return Err(MappingError::new(
                "acknowledgement.status",
                format!("{} is not a terminal status", acknowledgement.status),
            ));
        }
        Ok(PaymentStatus::from_parts(
            dto.id,
            dto.reference,
            dto.fee,
            dto.message,
            acknowledgement,
        ))
    }

    fn to_dto(&self, domain: PaymentStatus) -> PaymentStatusDto {
        PaymentStatusDto {
            id: domain.id(),
            reference: domain.reference().to_string(),
            fee: domain.fee(),
            message: domain.message().to_string(),
            acknowledgement_id: domain.acknowledgement().conversation_id,
            acknowledgement: Some(AcknowledgementMapper.to_dto(domain.acknowledgement().clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecordDto {
    pub id: Uuid,
    pub csv_id: String,
    pub source: PathBuf,
    pub recipient: String,
    pub amount: Decimal,
    pub currency: Currency,
    pub conversation_id: Uuid,
    pub status: StatusCode,
    pub message: String,
    pub fee: Decimal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRecordMapper;

impl Mapper for OutputRecordMapper {
    type Wire = OutputRecordMsg;
    type Dto = OutputRecordDto;
    type Domain = OutputRecord;

    fn from_wire(&self, wire: OutputRecordMsg) -> Result<OutputRecordDto, MappingError> {
        Ok(OutputRecordDto {
            id: parse_uuid("id", &wire.id)?,
            csv_id: wire.csv_id,
            source: parse_path("source", &wire.source)?,
            recipient: wire.recipient,
            amount: parse_decimal("amount", &wire.amount)?,
            currency: parse_currency("currency", &wire.currency)?,
            conversation_id: parse_uuid("conversation_id", &wire.conversation_id)?,
            status: StatusCode(wire.status),
            message: wire.message,
            fee: parse_decimal("fee", &wire.fee)?,
        })
    }

    fn to_wire(&self, dto: OutputRecordDto) -> OutputRecordMsg {
        OutputRecordMsg {
            id: dto.id.to_string(),
            csv_id: dto.csv_id,
            source: path_to_string(&dto.source),
            recipient: dto.recipient,
            amount: dto.amount.to_string(),
            currency: dto.currency.to_string(),
            conversation_id: dto.conversation_id.to_string(),
            status: dto.status.0,
            message: dto.message,
            fee: dto.fee.to_string(),
        }
    }

    fn from_dto(&self, dto: OutputRecordDto) -> Result<OutputRecord, MappingError> {
        if !dto.status.is_terminal() {
            return Err(MappingError::new(
                "status",
                format!("{} is not a terminal status", dto.status),
            ));
        }
        Ok(OutputRecord {
            id: dto.id,
            csv_id: required_text("csv_id", dto.csv_id)?,
            source: dto.source,
            recipient: dto.recipient,
            amount: amount("amount", dto.amount)?,
            currency: dto.currency,
            conversation_id: dto.conversation_id,
            status: dto.status,
            message: dto.message,
            fee: dto.fee,
        })
    }

    fn to_dto(&self, domain: OutputRecord) -> OutputRecordDto {
        OutputRecordDto {
            id: domain.id,
            csv_id: domain.csv_id,
            source: domain.source,
            recipient: domain.recipient,
            amount: domain.amount.value(),
            currency: domain.currency,
            conversation_id: domain.conversation_id,
            status: domain.status,
            message: domain.message,
            fee: domain.fee,
        }
    }
}
