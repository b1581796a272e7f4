use crate::mapping::MappingError;
use crate::pipeline::transport::Status;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Every failure a stage, adapter or collaborator can surface.
///
/// Steps return these typed errors; adapters translate them into a transport
/// [`Status`] before they cross a stage boundary.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("Unknown step: {0}")]
    UnknownStep(String),
    #[error("Step already registered: {0}")]
    DuplicateStep(String),
    #[error("Invalid step identifier: {0:?}")]
    InvalidStepId(String),
    #[error("Step {id} does not implement the requested input/output types")]
    StepTypeMismatch { id: String },
    #[error("Transient transport error: {0}")]
    TransientTransport(String),
    #[error("Conversation {conversation_id} reached no terminal status within {elapsed:?}")]
    PollTimeout {
        conversation_id: Uuid,
        elapsed: Duration,
    },
    #[error("Conversation {conversation_id} has non-terminal status {status}")]
    NotTerminal { conversation_id: Uuid, status: u32 },
    #[error("Payment rejected by provider ({code}): {message}")]
    BusinessRejection { code: u32, message: String },
    #[error("Remote stage failed: {0}")]
    Remote(Status),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl PipelineError {
    /// Whether the calling stage may retry the failed call.
    pub fn is_retryable(&self) -> bool {
        match self {
            PipelineError::TransientTransport(_) => true,
            PipelineError::Remote(status) => status.retryable,
            _ => false,
        }
    }

    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        PipelineError::Internal(Box::new(error))
    }
}

impl From<Status> for PipelineError {
    fn from(status: Status) -> Self {
        PipelineError::Remote(status)
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(error: tokio::task::JoinError) -> Self {
        PipelineError::internal(error)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
