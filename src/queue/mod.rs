//! Serial Task Queue
//!
//! FIFO runner that executes at most one task body at a time. Submissions go
//! through an unbounded channel to a single drain loop; each submission gets
//! its own [`QueuedTask`] handle that resolves to that task's outcome.
//!
//! ## Guarantees
//!
//! - Task bodies run strictly one at a time, in enqueue order, no matter how
//!   many callers submit concurrently.
//! - A failing (or panicking) task only fails its own handle. The loop keeps
//!   draining.
//! - No priority, cancellation or timeout. Dropping a handle does not stop
//!   the task from running.
//!
//! Queues are independent: two instances drain concurrently.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use futures::FutureExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::types::{RagError, Result};

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Observable queue state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueStatus {
    /// Nothing pending
    Idle,
    /// At least one task is queued or running
    Draining,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Tasks accepted but not yet finished (includes the running one)
    pending: AtomicUsize,
    /// Tasks finished since creation
    completed: AtomicUsize,
}

/// Strictly serial FIFO task runner.
///
/// Must be created inside a Tokio runtime; the drain loop is spawned on
/// construction and exits once every clone of the queue is dropped and the
/// backlog is empty.
#[derive(Clone)]
pub struct TaskQueue {
    name: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
    state: Arc<QueueState>,
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("name", &self.name)
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskQueue {
    pub fn new(name: impl Into<String>) -> Self {
        let name: Arc<str> = Arc::from(name.into());
        let (tx, rx) = mpsc::unbounded_channel();
        let state = Arc::new(QueueState::default());

        tokio::spawn(drain(name.clone(), rx));

        Self { name, tx, state }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Accept a task. It is placed in the queue immediately; the returned
    /// handle resolves once the task has run.
    pub fn enqueue<F, Fut, T>(&self, task: F) -> QueuedTask<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let queue = self.name.clone();
        let state = self.state.clone();

        let job: Job = Box::pin(async move {
            let outcome = AssertUnwindSafe(async move { task().await })
                .catch_unwind()
                .await;

            let result = match outcome {
                Ok(result) => result,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(queue = %queue, "Queued task panicked: {}", message);
                    Err(RagError::queue(
                        queue.as_ref(),
                        format!("task panicked: {}", message),
                    ))
                }
            };

            state.completed.fetch_add(1, Ordering::SeqCst);
            if state.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
                debug!(queue = %queue, "Queue drained");
            }

            // Caller may have dropped its handle; the task still counts as run.
            let _ = done_tx.send(result);
        });

        self.state.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            return QueuedTask::closed(self.name.clone());
        }

        QueuedTask {
            queue: self.name.clone(),
            rx: Some(done_rx),
        }
    }

    /// Tasks accepted but not finished
    pub fn pending(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    /// Tasks finished (successfully or not)
    pub fn completed(&self) -> usize {
        self.state.completed.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> QueueStatus {
        if self.pending() == 0 {
            QueueStatus::Idle
        } else {
            QueueStatus::Draining
        }
    }
}

async fn drain(name: Arc<str>, mut rx: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = rx.recv().await {
        job.await;
    }
    debug!(queue = %name, "Queue closed");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Handle to one queued task's outcome
#[must_use = "the task runs regardless, but its outcome is only observable through the handle"]
pub struct QueuedTask<T> {
    queue: Arc<str>,
    rx: Option<oneshot::Receiver<Result<T>>>,
}

impl<T> QueuedTask<T> {
    fn closed(queue: Arc<str>) -> Self {
        Self { queue, rx: None }
    }
}

impl<T> Future for QueuedTask<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let queue = self.queue.clone();
        let Some(rx) = self.rx.as_mut() else {
            return Poll::Ready(Err(RagError::queue(queue.as_ref(), "queue is closed")));
        };

        match Pin::new(rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RagError::queue(
                queue.as_ref(),
                "task dropped before completion",
            ))),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, event: String) {
        log.lock().unwrap().push(event);
    }

    #[tokio::test]
    async fn test_tasks_run_in_enqueue_order_one_at_a_time() {
        let queue = TaskQueue::new("test");
        let log: Log = Arc::default();

        let handles: Vec<_> = (0..5u64)
            .map(|i| {
                let log = log.clone();
                queue.enqueue(move || async move {
                    record(&log, format!("start {}", i));
                    // Earlier tasks sleep longer; overlap would reorder the log.
                    tokio::time::sleep(Duration::from_millis(25 - i * 5)).await;
                    record(&log, format!("end {}", i));
                    Ok(i)
                })
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        let values: Vec<u64> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2, 3, 4]);

        let expected: Vec<String> = (0..5)
            .flat_map(|i| [format!("start {}", i), format!("end {}", i)])
            .collect();
        assert_eq!(*log.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_failure_is_reported_only_to_its_caller() {
        let queue = TaskQueue::new("test");
        let ran: Log = Arc::default();

        let mut handles = Vec::new();
        for i in 0..4 {
            let ran = ran.clone();
            handles.push(queue.enqueue(move || async move {
                record(&ran, i.to_string());
                if i == 1 {
                    Err(RagError::Config("boom".to_string()))
                } else {
                    Ok(i)
                }
            }));
        }

        let results = futures::future::join_all(handles).await;
        assert!(matches!(results[0], Ok(0)));
        assert!(matches!(results[1], Err(RagError::Config(_))));
        assert!(matches!(results[2], Ok(2)));
        assert!(matches!(results[3], Ok(3)));
        assert_eq!(*ran.lock().unwrap(), vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_panicking_task_does_not_stop_the_queue() {
        let queue = TaskQueue::new("test");

        let first = queue.enqueue(|| async {
            if true {
                panic!("exploded");
            }
            Ok(0)
        });
        let second = queue.enqueue(|| async { Ok(7) });

        let err = first.await.unwrap_err();
        assert!(err.to_string().contains("exploded"));
        assert_eq!(second.await.unwrap(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_never_interleave() {
        let queue = TaskQueue::new("test");
        let log: Log = Arc::default();

        let callers: Vec<_> = (0..4)
            .map(|caller| {
                let queue = queue.clone();
                let log = log.clone();
                tokio::spawn(async move {
                    let mut handles = Vec::new();
                    for n in 0..10 {
                        let log = log.clone();
                        handles.push(queue.enqueue(move || async move {
                            record(&log, format!("start {}-{}", caller, n));
                            tokio::task::yield_now().await;
                            record(&log, format!("end {}-{}", caller, n));
                            Ok(())
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap();
                    }
                })
            })
            .collect();

        for caller in callers {
            caller.await.unwrap();
        }

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 80);
        for pair in log.chunks(2) {
            let started = pair[0].strip_prefix("start ").unwrap();
            let ended = pair[1].strip_prefix("end ").unwrap();
            assert_eq!(started, ended);
        }

        // Each caller's own submissions keep their relative order.
        for caller in 0..4 {
            let prefix = format!("start {}-", caller);
            let order: Vec<usize> = log
                .iter()
                .filter_map(|e| e.strip_prefix(&prefix))
                .map(|n| n.parse().unwrap())
                .collect();
            assert_eq!(order, (0..10).collect::<Vec<_>>());
        }
    }

    #[tokio::test]
    async fn test_status_returns_to_idle_after_drain() {
        let queue = TaskQueue::new("test");
        assert_eq!(queue.status(), QueueStatus::Idle);

        let (release_tx, release_rx) = oneshot::channel::<()>();
        let blocked = queue.enqueue(move || async move {
            let _ = release_rx.await;
            Ok(())
        });
        let next = queue.enqueue(|| async { Ok(()) });

        assert_eq!(queue.status(), QueueStatus::Draining);
        assert_eq!(queue.pending(), 2);

        release_tx.send(()).unwrap();
        blocked.await.unwrap();
        next.await.unwrap();

        assert_eq!(queue.status(), QueueStatus::Idle);
        assert_eq!(queue.completed(), 2);
    }

    #[tokio::test]
    async fn test_independent_queues_run_concurrently() {
        let a = TaskQueue::new("a");
        let b = TaskQueue::new("b");

        // Each task waits for the other queue's task; serial execution across
        // queues would deadlock.
        let (a_tx, a_rx) = oneshot::channel::<()>();
        let (b_tx, b_rx) = oneshot::channel::<()>();

        let first = a.enqueue(move || async move {
            a_tx.send(()).ok();
            b_rx.await.ok();
            Ok("a")
        });
        let second = b.enqueue(move || async move {
            b_tx.send(()).ok();
            a_rx.await.ok();
            Ok("b")
        });

        let (ra, rb) = tokio::time::timeout(Duration::from_secs(5), async {
            futures::join!(first, second)
        })
        .await
        .expect("queues should not block each other");
        assert_eq!(ra.unwrap(), "a");
        assert_eq!(rb.unwrap(), "b");
    }
}
