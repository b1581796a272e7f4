use crate::error::{PipelineError, Result};
use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Spaces calls evenly at a fixed rate.
///
/// Each permit reserves the next free slot. A caller that would have to wait
/// longer than its timeout gets no slot and leaves the schedule untouched.
#[derive(Debug)]
pub struct RateLimiter {
    period: Duration,
    next_slot: Mutex<Instant>,
}

impl RateLimiter {
    pub fn per_second(calls: u32) -> Self {
        let period = Duration::from_secs(1) / calls.max(1);
        Self {
            period,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    /// Waits for a permit for at most `timeout`.
    pub async fn acquire(&self, timeout: Duration) -> Result<()> {
        let slot = self.reserve(timeout).ok_or_else(|| {
            PipelineError::TransientTransport(format!("throttled: no permit within {timeout:?}"))
        })?;
        tokio::time::sleep_until(slot).await;
        Ok(())
    }

    /// Takes a permit only if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.reserve(Duration::ZERO).is_some()
    }

    fn reserve(&self, timeout: Duration) -> Option<Instant> {
        let now = Instant::now();
        let mut next = self.next_slot.lock();
        let slot = (*next).max(now);
        if slot.duration_since(now) > timeout {
            return None;
        }
        *next = slot + self.period;
        Some(slot)
    }
}
