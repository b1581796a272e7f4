use super::ack_inbox::AckInbox;
use super::rate_limiter::RateLimiter;
use crate::domain::payment::{
    AckUpdate, Acknowledgement, ProviderStatus, SendRequest, StatusCode,
};
use crate::domain::ports::PaymentProvider;
use crate::error::{PipelineError, Result};
use crate::pipeline::transport::{Code, Status};
use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal_macros::dec;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

struct Conversation {
    polls: u32,
    outcome: StatusCode,
    opened: Instant,
}

/// In-process stand-in for a payment provider.
///
/// Every sent payment is accepted with status 1000 and reports 1100 until it
/// has been polled `settle_after` times, then settles as completed (2000), or
/// rejected (4000) for a declined recipient. Refused recipients fail at send
/// time. With an inbox attached, the same progression is pushed instead.
///
/// A conversation is closed once its outcome has been reported. Conversations
/// older than `expire_after` are swept on the next send.
pub struct MockPaymentProvider {
    conversations: Arc<DashMap<Uuid, Conversation>>,
    settle_after: u32,
    expire_after: Duration,
    refused: HashSet<String>,
    declined: HashSet<String>,
    limiter: Option<RateLimiter>,
    push: Option<(AckInbox, Duration)>,
    polls: AtomicUsize,
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self {
            conversations: Arc::new(DashMap::new()),
            settle_after: 2,
            expire_after: Duration::from_secs(600),
            refused: HashSet::new(),
            declined: HashSet::new(),
            limiter: None,
            push: None,
            polls: AtomicUsize::new(0),
        }
    }

    pub fn settle_after(mut self, polls: u32) -> Self {
        self.settle_after = polls.max(1);
        self
    }

    pub fn expire_after(mut self, age: Duration) -> Self {
        self.expire_after = age;
        self
    }

    /// Payments to `recipient` are refused outright.
    pub fn refuse(mut self, recipient: &str) -> Self {
        self.refused.insert(recipient.to_string());
        self
    }

    /// Payments to `recipient` are accepted and later settle as rejected.
    pub fn decline(mut self, recipient: &str) -> Self {
        self.declined.insert(recipient.to_string());
        self
    }

    /// Sheds calls above `per_sec` with a retryable `RESOURCE_EXHAUSTED`.
    pub fn with_rate_limit(mut self, per_sec: u32) -> Self {
        self.limiter = Some(RateLimiter::per_second(per_sec));
        self
    }

    /// Pushes status updates into `inbox`, one every `delay`.
    pub fn with_inbox(mut self, inbox: AckInbox, delay: Duration) -> Self {
        self.push = Some((inbox, delay));
        self
    }

    /// Number of status polls served so far.
    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn open_conversations(&self) -> usize {
        self.conversations.len()
    }

    fn admit(&self) -> Result<()> {
        match &self.limiter {
            Some(limiter) if !limiter.try_acquire() => Err(PipelineError::Remote(
                Status::new(
                    Code::ResourceExhausted,
                    "Payment service is currently throttled. Please try again later.",
                )
                .retryable(true),
            )),
            _ => Ok(()),
        }
    }

    fn schedule_push(&self, conversation_id: Uuid, outcome: StatusCode) {
        let Some((inbox, delay)) = self.push.clone() else {
            return;
        };
        inbox.open(conversation_id);
        let conversations = self.conversations.clone();
        let steps = self.settle_after;
        tokio::spawn(async move {
            for step in 1..=steps {
                tokio::time::sleep(delay).await;
                let status = if step == steps {
                    outcome
                } else {
                    StatusCode::PROCESSING
                };
                let delivered = inbox.publish(AckUpdate {
                    conversation_id,
                    status,
                    message: None,
                });
                if !delivered {
                    debug!(%conversation_id, "receiver gone, push stopped");
                    break;
                }
            }
            conversations.remove(&conversation_id);
        });
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn send_payment(&self, request: &SendRequest) -> Result<Acknowledgement> {
        self.admit()?;
        let record = &request.payment_record;
        if self.refused.contains(record.recipient()) {
            return Err(PipelineError::BusinessRejection {
                code: StatusCode::REJECTED.0,
                message: format!("recipient {} is not accepted", record.recipient()),
            });
        }

        let outcome = if self.declined.contains(record.recipient()) {
            StatusCode::REJECTED
        } else {
            StatusCode::COMPLETED
        };
        let expire_after = self.expire_after;
        self.conversations
            .retain(|_, conversation| conversation.opened.elapsed() < expire_after);

        let conversation_id = Uuid::new_v4();
        self.conversations.insert(
            conversation_id,
            Conversation {
                polls: 0,
                outcome,
                opened: Instant::now(),
            },
        );
        self.schedule_push(conversation_id, outcome);
        debug!(%conversation_id, endpoint = %request.endpoint, "mock provider accepted payment");

        Ok(
            Acknowledgement::new(conversation_id, StatusCode::ACCEPTED, record.clone())
                .with_message("OK but this is only a test"),
        )
    }

    async fn poll_status(&self, acknowledgement: &Acknowledgement) -> Result<AckUpdate> {
        self.admit()?;
        self.polls.fetch_add(1, Ordering::SeqCst);
        let conversation_id = acknowledgement.conversation_id;
        let (status, message) = {
            let mut conversation =
                self.conversations.get_mut(&conversation_id).ok_or_else(|| {
                    PipelineError::Remote(Status::new(
                        Code::NotFound,
                        format!("unknown conversation {conversation_id}"),
                    ))
                })?;

            conversation.polls += 1;
            if conversation.polls >= self.settle_after {
                let message = match conversation.outcome.0 {
                    2000 => "settled",
                    _ => "declined by provider",
                };
                (conversation.outcome, Some(message.to_string()))
            } else {
                (StatusCode::PROCESSING, None)
            }
        };
        if status.is_terminal() {
            self.conversations.remove(&conversation_id);
        }
        Ok(AckUpdate {
            conversation_id,
            status,
            message,
        })
    }

    async fn payment_status(&self, acknowledgement: &Acknowledgement) -> Result<ProviderStatus> {
        self.admit()?;
        if self.conversations.remove(&acknowledgement.conversation_id).is_some() {
            info!(conversation_id = %acknowledgement.conversation_id, "conversation closed");
        }
        Ok(ProviderStatus {
            reference: "101".to_string(),
            fee: dec!(1.01),
            message: Some("Mock response".to_string()),
        })
    }
}
