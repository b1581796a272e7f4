//! Bridges a [`StepHandle`] to the streaming transport.
//!
//! Inbound wire values are mapped to domain values one at a time, the step runs,
//! and every domain result is mapped back out. Step failures leave the adapter
//! only as [`Status`] values.

use super::step::{Cardinality, DomainStream, StepHandle};
use super::transport::{Status, WireStream, terminate_on_error};
use crate::domain::ports::{Entity, RepositoryBox};
use crate::error::{PipelineError, Result};
use crate::mapping::Mapper;
use futures::future;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// One stage: a step plus the mappers for its inbound and outbound types.
///
/// Cloning is cheap and clones share the step instance.
pub struct StepAdapter<MI, MO>
where
    MI: Mapper,
    MO: Mapper,
    MI::Domain: Entity,
{
    name: Arc<str>,
    step: StepHandle<MI::Domain, MO::Domain>,
    inbound: MI,
    outbound: MO,
    persist: Option<RepositoryBox<MI::Domain>>,
}

impl<MI, MO> Clone for StepAdapter<MI, MO>
where
    MI: Mapper,
    MO: Mapper,
    MI::Domain: Entity,
{
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            step: self.step.clone(),
            inbound: self.inbound.clone(),
            outbound: self.outbound.clone(),
            persist: self.persist.clone(),
        }
    }
}

impl<MI, MO> StepAdapter<MI, MO>
where
    MI: Mapper,
    MO: Mapper,
    MI::Domain: Entity,
{
    pub fn new(
        name: &str,
        step: StepHandle<MI::Domain, MO::Domain>,
        inbound: MI,
        outbound: MO,
    ) -> Self {
        Self {
            name: Arc::from(name),
            step,
            inbound,
            outbound,
            persist: None,
        }
    }

    /// Saves every successfully processed input to `repository`.
    pub fn with_auto_persist(mut self, repository: RepositoryBox<MI::Domain>) -> Self {
        self.persist = Some(repository);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cardinality(&self) -> Cardinality {
        self.step.cardinality()
    }

    /// Unary call for a one-to-one step.
    ///
    /// With auto-persist the input is saved once the step succeeded.
    pub async fn unary(&self, request: MI::Wire) -> std::result::Result<MO::Wire, Status> {
        let StepHandle::OneToOne(step) = &self.step else {
            return Err(self.step.mismatch(Cardinality::OneToOne));
        };
        let input = self
            .inbound
            .wire_to_domain(request)
            .map_err(|e| failure(&self.name, e.into()))?;
        let saved = self.persist.as_ref().map(|_| input.clone());

        let output = step
            .apply(input)
            .await
            .map_err(|e| failure(&self.name, e))?;

        if let Some(input) = saved {
            self.save(input)
                .await
                .map_err(|e| failure(&self.name, e))?;
        }
        Ok(self.outbound.domain_to_wire(output))
    }

    /// Server-streaming call for a one-to-many step.
    ///
    /// The outbound stream ends after the first error. With auto-persist the
    /// input is saved once the step's stream completed without error.
    pub fn server_streaming(&self, request: MI::Wire) -> WireStream<MO::Wire> {
        let StepHandle::OneToMany(step) = &self.step else {
            return single_error(self.step.mismatch(Cardinality::OneToMany));
        };
        let input = match self.inbound.wire_to_domain(request) {
            Ok(input) => input,
            Err(e) => return single_error(failure(&self.name, e.into())),
        };
        let saved = self.persist.clone().map(|repo| (repo, input.clone()));

        let failed = Arc::new(AtomicBool::new(false));
        let seen = failed.clone();
        let outputs = terminate_on_error(self.outbound_stream(step.apply(input)))
            .inspect(move |item| {
                if item.is_err() {
                    seen.store(true, Ordering::Relaxed);
                }
            });

        let name = self.name.clone();
        let tail = stream::once(async move {
            match saved {
                Some((repo, input)) if !failed.load(Ordering::Relaxed) => repo
                    .save(input)
                    .await
                    .err()
                    .map(|e| failure(&name, e)),
                _ => None,
            }
        })
        .filter_map(|error| future::ready(error.map(Err)));

        outputs.chain(tail).boxed()
    }

    /// Client-streaming call for a many-to-one step.
    pub async fn client_streaming(
        &self,
        requests: WireStream<MI::Wire>,
    ) -> std::result::Result<MO::Wire, Status> {
        let StepHandle::ManyToOne(step) = &self.step else {
            return Err(self.step.mismatch(Cardinality::ManyToOne));
        };
        let output = step
            .apply(self.inbound_stream(requests))
            .await
            .map_err(|e| failure(&self.name, e))?;
        Ok(self.outbound.domain_to_wire(output))
    }

    /// Bidirectional call for a many-to-many step.
    ///
    /// Per-item errors are delivered in order and the stream carries on.
    pub fn bidi(&self, requests: WireStream<MI::Wire>) -> WireStream<MO::Wire> {
        let StepHandle::ManyToMany(step) = &self.step else {
            return single_error(self.step.mismatch(Cardinality::ManyToMany));
        };
        self.outbound_stream(step.apply(self.inbound_stream(requests)))
    }

    async fn save(&self, input: MI::Domain) -> Result<()> {
        if let Some(repo) = &self.persist {
            let id = repo.save(input).await?;
            debug!(step = %self.name, %id, kind = <MI::Domain as Entity>::KIND, "persisted input");
        }
        Ok(())
    }

    /// Maps inbound elements lazily; a persisted input is saved as it is consumed.
    fn inbound_stream(&self, requests: WireStream<MI::Wire>) -> DomainStream<MI::Domain> {
        let inbound = self.inbound.clone();
        let mapped = requests.map(move |item| match item {
            Ok(wire) => inbound.wire_to_domain(wire).map_err(PipelineError::from),
            Err(status) => Err(PipelineError::Remote(status)),
        });
        match self.persist.clone() {
            None => mapped.boxed(),
            Some(repo) => mapped
                .then(move |item| {
                    let repo = repo.clone();
                    async move {
                        let input = item?;
                        repo.save(input.clone()).await?;
                        Ok::<_, PipelineError>(input)
                    }
                })
                .boxed(),
        }
    }

    fn outbound_stream(&self, outputs: DomainStream<MO::Domain>) -> WireStream<MO::Wire> {
        let outbound = self.outbound.clone();
        let name = self.name.clone();
        outputs
            .map(move |item| match item {
                Ok(output) => Ok(outbound.domain_to_wire(output)),
                Err(e) => Err(failure(&name, e)),
            })
            .boxed()
    }
}

fn failure(step: &str, error: PipelineError) -> Status {
    debug!(step, %error, "step failed");
    Status::from(error)
}

fn single_error<T: Send + 'static>(status: Status) -> WireStream<T> {
    stream::once(future::ready(Err(status))).boxed()
}
