//! Conversions between the wire, transfer and domain representations.
//!
//! Wire messages are plain strings and numbers, the shape a codec would put on
//! the network. Transfer values are typed and validated but still carry
//! back-reference ids. Domain values are what steps operate on. The composite
//! [`Mapper::wire_to_domain`] and [`Mapper::domain_to_wire`] always pass
//! through the transfer value.

pub mod files;
pub mod payment;

use crate::domain::money::Currency;
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

pub use files::{FolderMapper, InputFileMapper, OutputFileSummaryMapper};
pub use payment::{AcknowledgementMapper, OutputRecordMapper, PaymentRecordMapper, PaymentStatusMapper};

/// Malformed wire or transfer data. Never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid field `{field}`: {reason}")]
pub struct MappingError {
    pub field: &'static str,
    pub reason: String,
}

impl MappingError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(field: &'static str) -> Self {
        Self::new(field, "missing")
    }
}

/// Three-way, stateless conversion for one type family.
pub trait Mapper: Clone + Send + Sync + 'static {
    type Wire: Clone + Send + 'static;
    type Dto: Send + 'static;
    type Domain: Send + 'static;

    fn from_wire(&self, wire: Self::Wire) -> Result<Self::Dto, MappingError>;
    fn to_wire(&self, dto: Self::Dto) -> Self::Wire;
    fn from_dto(&self, dto: Self::Dto) -> Result<Self::Domain, MappingError>;
    fn to_dto(&self, domain: Self::Domain) -> Self::Dto;

    fn wire_to_domain(&self, wire: Self::Wire) -> Result<Self::Domain, MappingError> {
        self.from_dto(self.from_wire(wire)?)
    }

    fn domain_to_wire(&self, domain: Self::Domain) -> Self::Wire {
        self.to_wire(self.to_dto(domain))
    }
}

pub(crate) fn parse_uuid(field: &'static str, value: &str) -> Result<Uuid, MappingError> {
    if value.is_empty() {
        return Err(MappingError::missing(field));
    }
    Uuid::parse_str(value).map_err(|e| MappingError::new(field, e.to_string()))
}

/// Accepts plain (`1000.50`) and grouped (`1,000.50`) notations.
pub(crate) fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, MappingError> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return Err(MappingError::missing(field));
    }
    Decimal::from_str(&cleaned).map_err(|e| MappingError::new(field, e.to_string()))
}

pub(crate) fn parse_currency(field: &'static str, value: &str) -> Result<Currency, MappingError> {
    Currency::new(value).map_err(|reason| MappingError::new(field, reason))
}

pub(crate) fn parse_path(field: &'static str, value: &str) -> Result<PathBuf, MappingError> {
    if value.is_empty() {
        return Err(MappingError::missing(field));
    }
    Ok(PathBuf::from(value))
}

pub(crate) fn path_to_string(path: &std::path::Path) -> String {
    path.to_string_lossy().into_owned()
}

pub(crate) fn optional_text(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
