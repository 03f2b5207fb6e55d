use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fire-and-forget background work. Jobs run to completion and are never
/// aborted; `wait_idle` lets shutdown drain whatever is still in flight.
#[derive(Clone, Default)]
pub struct JobRunner {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl JobRunner {
    pub fn spawn<F>(&self, label: &'static str, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks();
        while let Some(finished) = tasks.try_join_next() {
            if let Err(err) = finished {
                warn!("background job panicked: {err}");
            }
        }

        debug!(job = label, "dispatching background job");
        tasks.spawn(async move {
            job.await;
            debug!(job = label, "background job finished");
        });
    }

    pub async fn wait_idle(&self) {
        loop {
            let mut pending = std::mem::take(&mut *self.tasks());
            if pending.is_empty() {
                return;
            }
            while let Some(finished) = pending.join_next().await {
                if let Err(err) = finished {
                    warn!("background job panicked: {err}");
                }
            }
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;

    #[tokio::test]
    async fn wait_idle_drains_spawned_jobs() {
        let runner = JobRunner::default();
        let done = Arc::new(AtomicUsize::new(0));

        for delay in [30, 10, 20] {
            let done = done.clone();
            runner.spawn("sleepy", async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                done.fetch_add(1, Ordering::SeqCst);
            });
        }

        runner.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn jobs_spawned_while_draining_are_awaited() {
        let runner = JobRunner::default();
        let done = Arc::new(AtomicUsize::new(0));

        let inner_runner = runner.clone();
        let inner_done = done.clone();
        runner.spawn("outer", async move {
            inner_runner.spawn("inner", async move {
                tokio::time::sleep(Duration::from_millis(10)).await;
                inner_done.fetch_add(1, Ordering::SeqCst);
            });
        });

        runner.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn panicking_job_does_not_poison_runner() {
        let runner = JobRunner::default();
        runner.spawn("boom", async { panic!("job failure") });
        runner.wait_idle().await;

        let done = Arc::new(AtomicUsize::new(0));
        let flag = done.clone();
        runner.spawn("after", async move {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        runner.wait_idle().await;
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
