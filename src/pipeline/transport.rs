//! The slice of a streaming RPC transport the pipeline relies on.
//!
//! A stage boundary carries a lazy, pull-based stream of `Result<T, Status>`.
//! End-of-stream is the stream ending; errors travel as [`Status`] elements.
//! [`hop`] moves a stream across a task boundary the way a network hop would,
//! through a bounded buffer that propagates both backpressure and cancellation.

use crate::error::PipelineError;
use futures::future;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tokio::sync::mpsc;

/// Machine-readable error code carried by a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Code {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Unimplemented,
    ResourceExhausted,
    Unavailable,
    DeadlineExceeded,
    Aborted,
    Cancelled,
    Internal,
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Code::InvalidArgument => "INVALID_ARGUMENT",
            Code::NotFound => "NOT_FOUND",
            Code::FailedPrecondition => "FAILED_PRECONDITION",
            Code::Unimplemented => "UNIMPLEMENTED",
            Code::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Code::Unavailable => "UNAVAILABLE",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::Aborted => "ABORTED",
            Code::Cancelled => "CANCELLED",
            Code::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

/// Structured transport error: code, human-readable message and a retry hint.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct Status {
    pub code: Code,
    pub message: String,
    pub retryable: bool,
}

impl Status {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn unimplemented(message: impl Into<String>) -> Self {
        Self::new(Code::Unimplemented, message)
    }
}

impl From<&PipelineError> for Status {
    fn from(error: &PipelineError) -> Self {
        let message = error.to_string();
        match error {
            PipelineError::Mapping(_) | PipelineError::Csv(_) => {
                Status::new(Code::InvalidArgument, message)
            }
            PipelineError::UnknownStep(_)
            | PipelineError::InvalidStepId(_)
            | PipelineError::StepTypeMismatch { .. } => Status::new(Code::Unimplemented, message),
            PipelineError::DuplicateStep(_)
            | PipelineError::Config(_)
            | PipelineError::NotTerminal { .. } => {
                Status::new(Code::FailedPrecondition, message)
            }
            PipelineError::TransientTransport(_) => {
                Status::new(Code::Unavailable, message).retryable(true)
            }
            PipelineError::PollTimeout { .. } => Status::new(Code::DeadlineExceeded, message),
            PipelineError::BusinessRejection { .. } => Status::new(Code::Aborted, message),
            PipelineError::Remote(status) => status.clone(),
            PipelineError::Io(_) | PipelineError::Internal(_) => Status::new(Code::Internal, message),
        }
    }
}

impl From<PipelineError> for Status {
    fn from(error: PipelineError) -> Self {
        Status::from(&error)
    }
}

/// Outbound (or inbound) element stream of one call.
pub type WireStream<T> = BoxStream<'static, Result<T, Status>>;

/// Ends `stream` right after its first error element.
pub fn terminate_on_error<T: Send + 'static>(stream: WireStream<T>) -> WireStream<T> {
    stream
        .scan(false, |failed, item| {
            if *failed {
                return future::ready(None);
            }
            *failed = item.is_err();
            future::ready(Some(item))
        })
        .boxed()
}

/// Moves `stream` behind a bounded channel driven by its own task.
///
/// The pump pauses while the channel is full and stops pulling from `stream`
/// as soon as the receiving side is dropped.
pub fn hop<T: Send + 'static>(mut stream: WireStream<T>, capacity: usize) -> WireStream<T> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                _ = tx.closed() => break,
                item = stream.next() => item,
            };
            let Some(item) = item else { break };
            if tx.send(item).await.is_err() {
                break;
            }
        }
        tracing::trace!("transport hop closed");
    });
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) }).boxed()
}
