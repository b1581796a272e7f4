use crate::domain::payment::{Acknowledgement, PaymentRecord, SendRequest};
use crate::domain::ports::PaymentProviderBox;
use crate::error::{PipelineError, Result};
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::pipeline::step::OneToOne;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sends one payment to the provider.
///
/// Waits for a rate-limiter permit for at most the request timeout, then
/// bounds the provider call by the same timeout. Both waits failing surface
/// as `TransientTransport`, which the caller may retry.
pub struct SendPaymentStep {
    provider: PaymentProviderBox,
    limiter: Arc<RateLimiter>,
    endpoint: String,
    timeout: Duration,
}

impl SendPaymentStep {
    pub fn new(
        provider: PaymentProviderBox,
        limiter: Arc<RateLimiter>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            limiter,
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl OneToOne<PaymentRecord, Acknowledgement> for SendPaymentStep {
    async fn apply(&self, record: PaymentRecord) -> Result<Acknowledgement> {
        let request = SendRequest::for_record(record, &self.endpoint, self.timeout);
        self.limiter.acquire(request.timeout).await?;

        let ack = tokio::time::timeout(request.timeout, self.provider.send_payment(&request))
            .await
            .map_err(|_| {
                PipelineError::TransientTransport(format!(
                    "{} did not answer within {:?}",
                    request.endpoint, request.timeout
                ))
            })??;

        debug!(
            conversation_id = %ack.conversation_id,
            status = %ack.status,
            record = %request.payment_record,
            "payment sent"
        );
        Ok(ack)
    }
}
