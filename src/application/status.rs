use crate::domain::payment::{Acknowledgement, OutputRecord, PaymentStatus, StatusClass};
use crate::domain::ports::PaymentProviderBox;
use crate::error::{PipelineError, Result};
use crate::pipeline::step::OneToOne;
use async_trait::async_trait;
use tracing::{debug, info};

/// Joins a terminal acknowledgement with the provider's reference and fee.
///
/// Terminal failures resolve like successes; only a non-terminal input is an error.
pub struct ResolveStatusStep {
    provider: PaymentProviderBox,
}

impl ResolveStatusStep {
    pub fn new(provider: PaymentProviderBox) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl OneToOne<Acknowledgement, PaymentStatus> for ResolveStatusStep {
    async fn apply(&self, ack: Acknowledgement) -> Result<PaymentStatus> {
        if !ack.is_terminal() {
            return Err(PipelineError::NotTerminal {
                conversation_id: ack.conversation_id,
                status: ack.status.0,
            });
        }
        let details = self.provider.payment_status(&ack).await?;
        let conversation_id = ack.conversation_id;
        let status = PaymentStatus::resolve(ack, details).ok_or(PipelineError::NotTerminal {
            conversation_id,
            status: 0,
        })?;

        match status.outcome() {
            StatusClass::Failed => info!(
                %conversation_id,
                status = %status.acknowledgement().status,
                "payment settled as failed"
            ),
            _ => debug!(%conversation_id, reference = status.reference(), "payment settled"),
        }
        Ok(status)
    }
}

pub struct AssembleOutputStep;

#[async_trait]
impl OneToOne<PaymentStatus, OutputRecord> for AssembleOutputStep {
    async fn apply(&self, status: PaymentStatus) -> Result<OutputRecord> {
        Ok(OutputRecord::assemble(&status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{Amount, Currency};
    use crate::domain::payment::{PaymentRecord, StatusCode};
    use crate::infrastructure::mock_provider::MockPaymentProvider;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn ack(status: StatusCode) -> Acknowledgement {
        let record = PaymentRecord::new(
            "9",
            "/in/a.csv",
            "Alice",
            Amount::new(dec!(42)).unwrap(),
            Currency::new("GBP").unwrap(),
        );
        Acknowledgement::new(Uuid::new_v4(), status, record)
    }

    #[tokio::test]
    async fn test_resolve_and_assemble() {
        let step = ResolveStatusStep::new(Arc::new(MockPaymentProvider::new()));
        let status = step.apply(ack(StatusCode::COMPLETED)).await.unwrap();
        assert_eq!(status.reference(), "101");
        assert_eq!(status.fee(), dec!(1.01));

        let output = AssembleOutputStep.apply(status).await.unwrap();
        assert_eq!(output.csv_id, "9");
        assert_eq!(output.status, StatusCode::COMPLETED);
        assert_eq!(output.message, "Mock response");
    }

    #[tokio::test]
    async fn test_terminal_failure_is_resolved_not_raised() {
        let step = ResolveStatusStep::new(Arc::new(MockPaymentProvider::new()));
        let status = step.apply(ack(StatusCode::REJECTED)).await.unwrap();
        assert_eq!(status.outcome(), StatusClass::Failed);
    }

    #[tokio::test]
    async fn test_pending_acknowledgement_is_rejected() {
        let step = ResolveStatusStep::new(Arc::new(MockPaymentProvider::new()));
        let err = step.apply(ack(StatusCode::PROCESSING)).await.unwrap_err();
        assert!(matches!(err, PipelineError::NotTerminal { status: 1100, .. }));
    }
}
