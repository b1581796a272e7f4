//! Registers the payment stages under their well-known ids.

use super::folder::ProcessFolderStep;
use super::input_file::ProcessInputFileStep;
use super::output_file::WriteOutputFileStep;
use super::polling::{PollAcknowledgementStep, PollingProtocol, ReceiveAcknowledgementStep};
use super::send::SendPaymentStep;
use super::status::{AssembleOutputStep, ResolveStatusStep};
use crate::config::Config;
use crate::domain::files::{CsvInputFile, Folder, OutputFileSummary};
use crate::domain::payment::{Acknowledgement, OutputRecord, PaymentRecord, PaymentStatus};
use crate::domain::ports::PaymentProviderBox;
use crate::error::Result;
use crate::infrastructure::ack_inbox::AckInbox;
use crate::infrastructure::blocking::BlockingPool;
use crate::infrastructure::rate_limiter::RateLimiter;
use crate::pipeline::registry::StepsRegistry;
use crate::pipeline::step::StepHandle;
use std::sync::Arc;

pub mod ids {
    pub const PROCESS_FOLDER: &str = "process-folder";
    pub const PROCESS_INPUT_FILE: &str = "process-input-file";
    pub const SEND_PAYMENT: &str = "send-payment";
    pub const POLL_ACKNOWLEDGEMENT: &str = "poll-acknowledgement";
    pub const RECEIVE_ACKNOWLEDGEMENT: &str = "receive-acknowledgement";
    pub const RESOLVE_STATUS: &str = "resolve-status";
    pub const ASSEMBLE_OUTPUT: &str = "assemble-output";
    pub const WRITE_OUTPUT_FILE: &str = "write-output-file";
}

/// Everything the stage constructors close over.
#[derive(Clone)]
pub struct StageDeps {
    pub provider: PaymentProviderBox,
    pub inbox: AckInbox,
    pub pool: BlockingPool,
    pub config: Arc<Config>,
}

impl StageDeps {
    pub fn new(provider: PaymentProviderBox, inbox: AckInbox, config: Arc<Config>) -> Self {
        Self {
            provider,
            inbox,
            pool: BlockingPool::new(config.pipeline.blocking_workers),
            config,
        }
    }
}

/// Registers every stage. Both acknowledgement stages are registered; the
/// pipeline resolves the one its configuration asks for.
pub fn register_stages(registry: &StepsRegistry, deps: StageDeps) -> Result<()> {
    let batch_size = deps.config.pipeline.batch_size;
    let max_in_flight = deps.config.pipeline.max_in_flight;

    let pool = deps.pool.clone();
    registry.register::<Folder, CsvInputFile, _>(ids::PROCESS_FOLDER, move || {
        Ok(StepHandle::one_to_many(ProcessFolderStep::new(pool.clone())))
    })?;

    let pool = deps.pool.clone();
    registry.register::<CsvInputFile, PaymentRecord, _>(ids::PROCESS_INPUT_FILE, move || {
        Ok(StepHandle::one_to_many(ProcessInputFileStep::new(
            pool.clone(),
            batch_size,
        )))
    })?;

    let provider = deps.provider.clone();
    let config = deps.config.clone();
    registry.register::<PaymentRecord, Acknowledgement, _>(ids::SEND_PAYMENT, move || {
        let limiter = Arc::new(RateLimiter::per_second(config.send.rate_limit_per_sec));
        Ok(StepHandle::one_to_one(SendPaymentStep::new(
            provider.clone(),
            limiter,
            config.send.endpoint.clone(),
            config.send_timeout(),
        )))
    })?;

    let provider = deps.provider.clone();
    let config = deps.config.clone();
    registry.register::<Acknowledgement, Acknowledgement, _>(ids::POLL_ACKNOWLEDGEMENT, move || {
        let protocol = PollingProtocol::new(
            provider.clone(),
            config.poll_interval(),
            config.poll_max_elapsed(),
        );
        Ok(StepHandle::many_to_many(PollAcknowledgementStep::new(
            protocol,
            max_in_flight,
        )))
    })?;

    let inbox = deps.inbox.clone();
    let max_elapsed = deps.config.poll_max_elapsed();
    registry.register::<Acknowledgement, Acknowledgement, _>(
        ids::RECEIVE_ACKNOWLEDGEMENT,
        move || {
            Ok(StepHandle::many_to_many(ReceiveAcknowledgementStep::new(
                inbox.clone(),
                max_elapsed,
                max_in_flight,
            )))
        },
    )?;

    let provider = deps.provider.clone();
    registry.register::<Acknowledgement, PaymentStatus, _>(ids::RESOLVE_STATUS, move || {
        Ok(StepHandle::one_to_one(ResolveStatusStep::new(provider.clone())))
    })?;

    registry.register::<PaymentStatus, OutputRecord, _>(ids::ASSEMBLE_OUTPUT, || {
        Ok(StepHandle::one_to_one(AssembleOutputStep))
    })?;

    let pool = deps.pool;
    registry.register::<OutputRecord, OutputFileSummary, _>(ids::WRITE_OUTPUT_FILE, move || {
        Ok(StepHandle::many_to_one(WriteOutputFileStep::new(
            pool.clone(),
            batch_size,
        )))
    })?;

    Ok(())
}
