//! The four step cardinalities.
//!
//! A step only sees domain values and typed `PipelineError`s. Translation to
//! and from the wire is the adapter's job.

use super::transport::Status;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::sync::Arc;

/// Lazy, pull-based sequence of domain results.
pub type DomainStream<T> = BoxStream<'static, Result<T>>;

/// One input, exactly one asynchronous result.
#[async_trait]
pub trait OneToOne<I, O>: Send + Sync {
    async fn apply(&self, input: I) -> Result<O>;
}

/// One input, a lazy finite sequence of results.
///
/// Dropping the returned stream must stop production.
pub trait OneToMany<I, O>: Send + Sync {
    fn apply(&self, input: I) -> DomainStream<O>;
}

/// A sequence of inputs reduced to one result.
///
/// Never completes if the input sequence never completes.
#[async_trait]
pub trait ManyToOne<I, O>: Send + Sync {
    async fn apply(&self, inputs: DomainStream<I>) -> Result<O>;
}

/// A sequence in, a sequence out, with independent cardinalities.
pub trait ManyToMany<I, O>: Send + Sync {
    fn apply(&self, inputs: DomainStream<I>) -> DomainStream<O>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    /// Whether the step consumes a stream rather than a single request.
    pub fn streams_input(self) -> bool {
        matches!(self, Cardinality::ManyToOne | Cardinality::ManyToMany)
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Cardinality::OneToOne => "one-to-one",
            Cardinality::OneToMany => "one-to-many",
            Cardinality::ManyToOne => "many-to-one",
            Cardinality::ManyToMany => "many-to-many",
        };
        f.write_str(name)
    }
}

/// A shared step instance tagged with its cardinality.
pub enum StepHandle<I, O> {
    OneToOne(Arc<dyn OneToOne<I, O>>),
    OneToMany(Arc<dyn OneToMany<I, O>>),
    ManyToOne(Arc<dyn ManyToOne<I, O>>),
    ManyToMany(Arc<dyn ManyToMany<I, O>>),
}

impl<I, O> StepHandle<I, O> {
    pub fn one_to_one(step: impl OneToOne<I, O> + 'static) -> Self {
        StepHandle::OneToOne(Arc::new(step))
    }

    pub fn one_to_many(step: impl OneToMany<I, O> + 'static) -> Self {
        StepHandle::OneToMany(Arc::new(step))
    }

    pub fn many_to_one(step: impl ManyToOne<I, O> + 'static) -> Self {
        StepHandle::ManyToOne(Arc::new(step))
    }

    pub fn many_to_many(step: impl ManyToMany<I, O> + 'static) -> Self {
        StepHandle::ManyToMany(Arc::new(step))
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            StepHandle::OneToOne(_) => Cardinality::OneToOne,
            StepHandle::OneToMany(_) => Cardinality::OneToMany,
            StepHandle::ManyToOne(_) => Cardinality::ManyToOne,
            StepHandle::ManyToMany(_) => Cardinality::ManyToMany,
        }
    }

    /// Status for a caller that invoked this step with the wrong call shape.
    pub(crate) fn mismatch(&self, called_as: Cardinality) -> Status {
        Status::unimplemented(format!(
            "step is {} but was called as {}",
            self.cardinality(),
            called_as
        ))
    }
}

impl<I, O> Clone for StepHandle<I, O> {
    fn clone(&self) -> Self {
        match self {
            StepHandle::OneToOne(step) => StepHandle::OneToOne(step.clone()),
            StepHandle::OneToMany(step) => StepHandle::OneToMany(step.clone()),
            StepHandle::ManyToOne(step) => StepHandle::ManyToOne(step.clone()),
            StepHandle::ManyToMany(step) => StepHandle::ManyToMany(step.clone()),
        }
    }
}

impl<I, O> fmt::Debug for StepHandle<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StepHandle").field(&self.cardinality()).finish()
    }
}
