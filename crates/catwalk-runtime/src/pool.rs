use catwalk_core::FunctionError;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded pool for running blocking node functions off the cooperative
/// scheduler. A semaphore caps how many blocking jobs are in flight at
/// once; callers suspend until a permit and the job result are available.
///
/// Owned by the `Runtime` and handed in through `RuntimeConfig` sizing,
/// never process-global state.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_workers.max(1))),
        }
    }

    /// Run a blocking job on a worker thread, suspending the caller until
    /// it finishes.
    pub async fn run_blocking<T, F>(&self, job: F) -> Result<T, FunctionError>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FunctionError::Failed("worker pool is closed".into()))?;

        tokio::task::spawn_blocking(move || {
            let result = job();
            drop(permit);
            result
        })
        .await
        .map_err(|e| FunctionError::Failed(format!("blocking worker panicked: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_job_and_returns_result() {
        let pool = WorkerPool::new(2);
        let result = pool.run_blocking(|| 40 + 2).await.unwrap();
        assert_eq!(result, 42);
    }

    #[tokio::test]
    async fn zero_sized_pool_still_gets_one_worker() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.run_blocking(|| 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn panicking_job_surfaces_as_error() {
        let pool = WorkerPool::new(1);
        let result: Result<(), _> = pool.run_blocking(|| panic!("boom")).await;
        assert!(result.is_err());
    }
}
