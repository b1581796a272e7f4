//! Turning an accepted payment into a terminal acknowledgement.
//!
//! Each conversation is driven on its own: a fixed poll interval, a hard
//! deadline measured from the first poll attempt, and no state shared with any
//! other conversation. Polling stops at the first terminal status, at the
//! deadline, or as soon as the consumer drops the stream.

use crate::domain::payment::Acknowledgement;
use crate::domain::ports::PaymentProviderBox;
use crate::error::{PipelineError, Result};
use crate::infrastructure::ack_inbox::AckInbox;
use crate::pipeline::step::{DomainStream, ManyToMany};
use futures::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

/// One observation of a conversation while it is being polled.
#[derive(Debug)]
pub enum PollEvent {
    /// A non-terminal status. Observable, never forwarded downstream.
    Update(Acknowledgement),
    /// The first terminal status. Nothing follows it.
    Terminal(Acknowledgement),
    /// The deadline passed without a terminal status. Nothing follows it.
    Timeout {
        conversation_id: Uuid,
        elapsed: Duration,
    },
    /// The provider failed in a way polling again cannot fix. Nothing follows it.
    Failed(PipelineError),
}

impl PollEvent {
    pub fn is_final(&self) -> bool {
        !matches!(self, PollEvent::Update(_))
    }
}

/// Interval and deadline for status polling, bound to one provider.
#[derive(Clone)]
pub struct PollingProtocol {
    provider: PaymentProviderBox,
    interval: Duration,
    max_elapsed: Duration,
}

struct Conversation {
    protocol: PollingProtocol,
    ack: Acknowledgement,
    started: Instant,
    deadline: Instant,
}

impl Conversation {
    fn timeout(&self) -> PollEvent {
        PollEvent::Timeout {
            conversation_id: self.ack.conversation_id,
            elapsed: self.started.elapsed(),
        }
    }

    async fn next_event(&mut self) -> PollEvent {
        if self.ack.is_terminal() {
            return PollEvent::Terminal(self.ack.clone());
        }
        loop {
            let wake = (Instant::now() + self.protocol.interval).min(self.deadline);
            tokio::time::sleep_until(wake).await;
            if Instant::now() >= self.deadline {
                return self.timeout();
            }

            let poll = self.protocol.provider.poll_status(&self.ack);
            let outcome = match tokio::time::timeout_at(self.deadline, poll).await {
                Ok(outcome) => outcome,
                Err(_) => return self.timeout(),
            };
            match outcome {
                Ok(update) => {
                    self.ack.apply(update);
                    debug!(
                        conversation_id = %self.ack.conversation_id,
                        status = %self.ack.status,
                        "acknowledgement update"
                    );
                    return if self.ack.is_terminal() {
                        PollEvent::Terminal(self.ack.clone())
                    } else {
                        PollEvent::Update(self.ack.clone())
                    };
                }
                Err(e) if e.is_retryable() => {
                    warn!(
                        conversation_id = %self.ack.conversation_id,
                        error = %e,
                        "status poll failed, polling again"
                    );
                }
                Err(e) => return PollEvent::Failed(e),
            }
        }
    }
}

impl PollingProtocol {
    pub fn new(provider: PaymentProviderBox, interval: Duration, max_elapsed: Duration) -> Self {
        Self {
            provider,
            interval,
            max_elapsed,
        }
    }

    /// Every observation of one conversation, ending with its final event.
    ///
    /// An acknowledgement that is already terminal yields it without polling.
    pub fn updates(&self, ack: Acknowledgement) -> BoxStream<'static, PollEvent> {
        let started = Instant::now();
        let conversation = Conversation {
            protocol: self.clone(),
            ack,
            started,
            deadline: started + self.max_elapsed,
        };
        stream::unfold(Some(conversation), |state| async move {
            let mut conversation = state?;
            let event = conversation.next_event().await;
            let next = if event.is_final() {
                None
            } else {
                Some(conversation)
            };
            Some((event, next))
        })
        .boxed()
    }

    /// Polls until the conversation settles; intermediate updates are only logged.
    pub async fn settle(&self, ack: Acknowledgement) -> Result<Acknowledgement> {
        let conversation_id = ack.conversation_id;
        let mut updates = self.updates(ack);
        while let Some(event) = updates.next().await {
            match event {
                PollEvent::Update(_) => continue,
                PollEvent::Terminal(ack) => return Ok(ack),
                PollEvent::Timeout {
                    conversation_id,
                    elapsed,
                } => {
                    return Err(PipelineError::PollTimeout {
                        conversation_id,
                        elapsed,
                    });
                }
                PollEvent::Failed(e) => return Err(e),
            }
        }
        Err(PipelineError::internal(std::io::Error::other(format!(
            "poll stream for {conversation_id} ended without a final event"
        ))))
    }
}

/// Polls each inbound acknowledgement to a terminal status.
///
/// Up to `max_in_flight` conversations are polled at once; results come out
/// in input order. A timed-out conversation becomes an error element and the
/// stream carries on with its siblings.
pub struct PollAcknowledgementStep {
    protocol: PollingProtocol,
    max_in_flight: usize,
}

impl PollAcknowledgementStep {
    pub fn new(protocol: PollingProtocol, max_in_flight: usize) -> Self {
        Self {
            protocol,
            max_in_flight: max_in_flight.max(1),
        }
    }
}

impl ManyToMany<Acknowledgement, Acknowledgement> for PollAcknowledgementStep {
    fn apply(&self, inputs: DomainStream<Acknowledgement>) -> DomainStream<Acknowledgement> {
        let protocol = self.protocol.clone();
        inputs
            .map(move |item| {
                let protocol = protocol.clone();
                async move { protocol.settle(item?).await }
            })
            .buffered(self.max_in_flight)
            .boxed()
    }
}

/// Waits for the provider to push a terminal status for each acknowledgement.
///
/// Same ordering, concurrency and deadline semantics as polling.
pub struct ReceiveAcknowledgementStep {
    inbox: AckInbox,
    max_elapsed: Duration,
    max_in_flight: usize,
}

impl ReceiveAcknowledgementStep {
    pub fn new(inbox: AckInbox, max_elapsed: Duration, max_in_flight: usize) -> Self {
        Self {
            inbox,
            max_elapsed,
            max_in_flight: max_in_flight.max(1),
        }
    }
}

async fn await_terminal(
    inbox: AckInbox,
    mut ack: Acknowledgement,
    max_elapsed: Duration,
) -> Result<Acknowledgement> {
    if ack.is_terminal() {
        return Ok(ack);
    }
    let conversation_id = ack.conversation_id;
    let started = Instant::now();
    let mut updates = inbox.subscribe(conversation_id);
    let _slot = inbox.forget_on_drop(conversation_id);

    let outcome = tokio::time::timeout(max_elapsed, async {
        loop {
            let latest = updates.borrow_and_update().clone();
            if let Some(update) = latest {
                ack.apply(update);
                debug!(%conversation_id, status = %ack.status, "acknowledgement received");
                if ack.is_terminal() {
                    return Ok(());
                }
            }
            if updates.changed().await.is_err() {
                return Err(PipelineError::TransientTransport(format!(
                    "inbox closed for {conversation_id}"
                )));
            }
        }
    })
    .await;

    match outcome {
        Ok(Ok(())) => Ok(ack),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PipelineError::PollTimeout {
            conversation_id,
            elapsed: started.elapsed(),
        }),
    }
}

impl ManyToMany<Acknowledgement, Acknowledgement> for ReceiveAcknowledgementStep {
    fn apply(&self, inputs: DomainStream<Acknowledgement>) -> DomainStream<Acknowledgement> {
        let inbox = self.inbox.clone();
        let max_elapsed = self.max_elapsed;
        inputs
            .map(move |item| {
                let inbox = inbox.clone();
                async move { await_terminal(inbox, item?, max_elapsed).await }
            })
            .buffered(self.max_in_flight)
            .boxed()
    }
}
