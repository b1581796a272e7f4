use crate::error::{PipelineError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// A bounded pool for blocking work such as local file I/O.
///
/// Jobs run on tokio's blocking threads, at most `workers` at a time. Waiting
/// jobs are admitted in FIFO order, so callers that submit short jobs share
/// the pool fairly. A job holds its slot until it returns, even when the
/// caller stops waiting for it.
#[derive(Clone)]
pub struct BlockingPool {
    permits: Arc<Semaphore>,
}

impl BlockingPool {
    pub fn new(workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(PipelineError::internal)?;
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        })
        .await?
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_run_returns_job_result() {
        let pool = BlockingPool::new(2);
        assert_eq!(pool.run(|| Ok(21 * 2)).await.unwrap(), 42);

        let err = pool
            .run(|| -> Result<()> { Err(PipelineError::Config("nope".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded() {
        let pool = BlockingPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let jobs = (0..8).map(|_| {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            })
        });
        for job in futures::future::join_all(jobs).await {
            job.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.available(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_job_keeps_its_slot() {
        let pool = BlockingPool::new(1);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let job = |running: Arc<AtomicUsize>, peak: Arc<AtomicUsize>, millis: u64| {
            move || -> Result<()> {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(millis));
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }
        };

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            pool.run(job(running.clone(), peak.clone(), 300)),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(pool.available(), 0);

        pool.run(job(running.clone(), peak.clone(), 10)).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(pool.available(), 1);
    }
}
