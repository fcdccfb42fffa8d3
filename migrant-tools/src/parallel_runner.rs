use std::collections::BTreeMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use futures::FutureExt;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error};
use crate::helpers::RunningFlag;
use crate::{MigrantToolsError, Result};

/// Runs tasks on at most `max_parallelism` workers.
///
/// Failures do not stop tasks that already run. The first failure closes the runner for
/// new tasks, and [`ParallelRunner::drain`] reports it once every task has settled.
pub struct ParallelRunner<T> {
    permits: Arc<Semaphore>,
    /// A finished task keeps its worker until its result has been collected.
    tasks: JoinSet<(usize, Result<T>, OwnedSemaphorePermit)>,
    next_id: usize,
    errors: BTreeMap<usize, MigrantToolsError>,
    results: Vec<(usize, T)>,
    poll_interval: Duration,
}

impl<T: Send + 'static> ParallelRunner<T> {
    pub fn new(max_parallelism: NonZeroUsize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_parallelism.get())),
            tasks: JoinSet::new(),
            next_id: 0,
            errors: BTreeMap::new(),
            results: Vec::new(),
            poll_interval: Duration::from_millis(100),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn is_accepting(&self) -> bool {
        !self.permits.is_closed()
    }

    /// Stops admitting new tasks. Running tasks are left alone.
    pub fn shutdown(&mut self) {
        self.permits.close();
    }

    /// Waits for a free worker and starts the task on it, returning the task's id.
    ///
    /// Fails with `Cancelled` once the runner has been shut down.
    pub async fn enqueue<F>(&mut self, task: F) -> Result<usize>
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let permit = loop {
            let acquire = self.permits.clone().acquire_owned();
            let finished = tokio::select! {
                permit = acquire => break permit.map_err(|_| MigrantToolsError::Cancelled)?,
                Some(finished) = self.tasks.join_next(), if !self.tasks.is_empty() => finished,
            };
            self.record(finished);
        };

        let id = self.next_id;
        self.next_id += 1;

        self.tasks.spawn(async move {
            let result = match AssertUnwindSafe(task).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(MigrantToolsError::TaskFailed(format!("task {} panicked", id))),
            };
            (id, result, permit)
        });

        debug!("Started task {}", id);
        Ok(id)
    }

    /// Waits for every started task, polling the running flag while waiting.
    ///
    /// Returns the results ordered by task id, or the error of the lowest failing task.
    pub async fn drain(mut self, running: &RunningFlag) -> Result<Vec<(usize, T)>> {
        while !self.tasks.is_empty() {
            match tokio::time::timeout(self.poll_interval, self.tasks.join_next()).await {
                Ok(Some(finished)) => self.record(finished),
                Ok(None) => break,
                Err(_) => {
                    if !running.is_running() && self.is_accepting() {
                        debug!("Stop requested, waiting for {} running tasks", self.tasks.len());
                        self.shutdown();
                    }
                }
            }
        }

        if let Some((_, e)) = self.errors.pop_first() {
            return Err(e);
        }

        self.results.sort_by_key(|(id, _)| *id);
        Ok(self.results)
    }

    fn record(&mut self, finished: std::result::Result<(usize, Result<T>, OwnedSemaphorePermit), JoinError>) {
        match finished {
            Ok((id, Ok(value), _)) => self.results.push((id, value)),
            Ok((id, Err(e), _)) => {
                error!("Task {} failed: {}", id, e);
                self.errors.insert(id, e);
                self.shutdown();
            }
            Err(e) => {
                error!("Task could not be joined: {}", e);
                self.errors.insert(usize::MAX - self.errors.len(), e.into());
                self.shutdown();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn runner<T: Send + 'static>(parallelism: usize) -> ParallelRunner<T> {
        ParallelRunner::new(NonZeroUsize::new(parallelism).unwrap()).with_poll_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn never_exceeds_parallelism() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut runner = runner(3);

        for i in 0..12 {
            let active = active.clone();
            let peak = peak.clone();
            runner
                .enqueue(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, MigrantToolsError>(i)
                })
                .await
                .unwrap();
        }

        let results = runner.drain(&RunningFlag::new()).await.unwrap();
        assert_eq!(results.into_iter().map(|(_, v)| v).collect::<Vec<_>>(), (0..12).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn reports_first_failure_after_all_tasks_settle() {
        let settled = Arc::new(AtomicUsize::new(0));
        let mut runner = runner(5);

        for i in 0..5usize {
            let settled = settled.clone();
            runner
                .enqueue(async move {
                    tokio::time::sleep(Duration::from_millis(20 + 10 * i as u64)).await;
                    settled.fetch_add(1, Ordering::SeqCst);
                    if i == 1 || i == 3 {
                        Err(MigrantToolsError::DatabaseAccess(format!("task {} broke", i)))
                    } else {
                        Ok(i)
                    }
                })
                .await
                .unwrap();
        }

        let result = runner.drain(&RunningFlag::new()).await;
        assert!(matches!(result, Err(MigrantToolsError::DatabaseAccess(msg)) if msg == "task 1 broke"));
        assert_eq!(settled.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn refuses_new_tasks_after_a_failure() {
        let mut runner = runner(1);

        runner.enqueue(async { Err::<(), _>(MigrantToolsError::Cancelled) }).await.unwrap();
        let second = runner.enqueue(async { Ok::<(), MigrantToolsError>(()) }).await;

        assert!(matches!(second, Err(MigrantToolsError::Cancelled)));
        assert!(runner.drain(&RunningFlag::new()).await.is_err());
    }

    async fn explode() -> Result<()> {
        panic!("boom")
    }

    #[tokio::test]
    async fn panics_become_task_failures() {
        let mut runner = runner(2);
        runner.enqueue(explode()).await.unwrap();

        let result: Result<Vec<(usize, ())>> = runner.drain(&RunningFlag::new()).await;
        assert!(matches!(result, Err(MigrantToolsError::TaskFailed(_))));
    }
}
