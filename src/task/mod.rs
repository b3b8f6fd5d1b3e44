// src/task/mod.rs

//! Deferred computations with progress, status, cancellation and composition
//!
//! The producer side of a computation is a [`Promise`]; the consumer side is
//! a cheaply clonable [`Future`]. A running closure reports through a
//! [`Notifier`]: progress counts, a status line, cooperative cancellation
//! checks, and `delegate`, which awaits a subordinate future while mirroring
//! its progress and status into the outer task so composites like
//! fetch-then-checkout present a single stream.
//!
//! Closures run on a process-wide pool of worker threads, never on the
//! caller's thread. Observer notifications for a single future are delivered
//! in the order produced; observers attached after termination receive
//! exactly one terminal notification synchronously on attach.

use crate::error::{Error, Result};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Lifecycle state of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Finished,
    Failed,
    Canceled,
}

/// Events published to task observers
#[derive(Debug, Clone)]
pub enum TaskEvent {
    /// Progress as (current, total) counts; total may be zero when unknown
    Progress { current: u64, total: u64 },
    /// Human-readable status line
    Status(String),
    /// Terminal: the task produced a value
    Finished,
    /// Terminal: the task failed
    Failed(Error),
    /// Terminal: cancellation was observed
    Canceled,
}

impl TaskEvent {
    fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::Finished | TaskEvent::Failed(_) | TaskEvent::Canceled
        )
    }
}

enum Outcome<T> {
    Running,
    Finished(T),
    Failed(Error),
    Canceled,
}

type Observer = Box<dyn FnMut(&TaskEvent) + Send>;

struct Inner<T> {
    outcome: Outcome<T>,
    observers: Vec<Observer>,
    progress: (u64, u64),
    status: String,
}

struct Shared<T> {
    inner: Mutex<Inner<T>>,
    done: Condvar,
    cancel: AtomicBool,
}

impl<T: Clone + Send> Shared<T> {
    fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                outcome: Outcome::Running,
                observers: Vec::new(),
                progress: (0, 0),
                status: String::new(),
            }),
            done: Condvar::new(),
            cancel: AtomicBool::new(false),
        }
    }

    /// Publish one event: update the snapshot under the lock, then invoke
    /// observers outside it. Only the single producing thread publishes, so
    /// per-future ordering is the production order.
    fn publish(&self, event: TaskEvent) {
        let mut taken = {
            let mut inner = self.inner.lock();
            if !matches!(inner.outcome, Outcome::Running) {
                // Already terminal; late producer reports are dropped
                return;
            }
            match &event {
                TaskEvent::Progress { current, total } => inner.progress = (*current, *total),
                TaskEvent::Status(s) => inner.status = s.clone(),
                TaskEvent::Finished | TaskEvent::Failed(_) | TaskEvent::Canceled => {}
            }
            std::mem::take(&mut inner.observers)
        };

        for observer in taken.iter_mut() {
            observer(&event);
        }

        if !event.is_terminal() {
            // Keep observers registered; new subscribers may have appeared
            // in the meantime and must not be displaced.
            let mut inner = self.inner.lock();
            taken.append(&mut inner.observers);
            inner.observers = taken;
        }
    }

    fn terminate(&self, outcome: Outcome<T>, event: TaskEvent) {
        {
            let mut inner = self.inner.lock();
            if !matches!(inner.outcome, Outcome::Running) {
                return;
            }
            inner.outcome = outcome;
        }
        self.publish_terminal(event);
        self.done.notify_all();
    }

    /// Like `publish`, but runs after the outcome slot is set
    fn publish_terminal(&self, event: TaskEvent) {
        let mut taken = {
            let mut inner = self.inner.lock();
            std::mem::take(&mut inner.observers)
        };
        for observer in taken.iter_mut() {
            observer(&event);
        }
        // Terminal: observers are not re-registered; late subscribers get a
        // replay from the stored outcome instead.
    }

    fn snapshot_result(inner: &Inner<T>) -> Option<Result<T>> {
        match &inner.outcome {
            Outcome::Running => None,
            Outcome::Finished(value) => Some(Ok(value.clone())),
            Outcome::Failed(err) => Some(Err(err.clone())),
            Outcome::Canceled => Some(Err(Error::Canceled)),
        }
    }

    fn terminal_event(inner: &Inner<T>) -> Option<TaskEvent> {
        match &inner.outcome {
            Outcome::Running => None,
            Outcome::Finished(_) => Some(TaskEvent::Finished),
            Outcome::Failed(err) => Some(TaskEvent::Failed(err.clone())),
            Outcome::Canceled => Some(TaskEvent::Canceled),
        }
    }
}

/// Sink through which a producer publishes progress and observes cancellation
trait ProgressSink: Send + Sync {
    fn publish_progress(&self, current: u64, total: u64);
    fn publish_status(&self, status: String);
    fn cancel_requested(&self) -> bool;
}

impl<T: Clone + Send> ProgressSink for Shared<T> {
    fn publish_progress(&self, current: u64, total: u64) {
        self.publish(TaskEvent::Progress { current, total });
    }

    fn publish_status(&self, status: String) {
        self.publish(TaskEvent::Status(status));
    }

    fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// In-task reporting API handed to producing closures
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ProgressSink>,
}

impl Notifier {
    /// Report progress as (current, total) counts
    pub fn progress(&self, current: u64, total: u64) {
        self.sink.publish_progress(current, total);
    }

    /// Report a human-readable status line
    pub fn status(&self, status: impl Into<String>) {
        self.sink.publish_status(status.into());
    }

    /// Whether cancellation has been requested for this task
    pub fn canceled(&self) -> bool {
        self.sink.cancel_requested()
    }

    /// Fail with [`Error::Canceled`] when cancellation has been requested
    pub fn check_canceled(&self) -> Result<()> {
        if self.canceled() {
            Err(Error::Canceled)
        } else {
            Ok(())
        }
    }

    /// Await a subordinate future, mirroring its progress and status into
    /// this task
    ///
    /// Cancellation of the outer task is checked on entry, forwarded to the
    /// subordinate while waiting, and rechecked before returning; the
    /// subordinate's failure becomes this task's failure unless the caller
    /// handles the returned error.
    pub fn delegate<U: Clone + Send + 'static>(&self, sub: Future<U>) -> Result<U> {
        self.check_canceled()?;

        let sink = Arc::clone(&self.sink);
        sub.subscribe(move |event| match event {
            TaskEvent::Progress { current, total } => sink.publish_progress(*current, *total),
            TaskEvent::Status(status) => sink.publish_status(status.clone()),
            _ => {}
        });

        let outer = Arc::clone(&self.sink);
        let forward = sub.clone();
        let result = sub.wait_tick(move || {
            if outer.cancel_requested() {
                forward.cancel();
            }
        });

        self.check_canceled()?;
        result
    }
}

/// Consumer handle to an in-flight or completed computation
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone + Send + 'static> Future<T> {
    /// Current lifecycle state
    pub fn state(&self) -> TaskState {
        match self.shared.inner.lock().outcome {
            Outcome::Running => TaskState::Running,
            Outcome::Finished(_) => TaskState::Finished,
            Outcome::Failed(_) => TaskState::Failed,
            Outcome::Canceled => TaskState::Canceled,
        }
    }

    /// Latest progress counts
    pub fn progress(&self) -> (u64, u64) {
        self.shared.inner.lock().progress
    }

    /// Latest status line
    pub fn status(&self) -> String {
        self.shared.inner.lock().status.clone()
    }

    /// Request cooperative cancellation; idempotent
    ///
    /// The producer observes the flag at its next check or progress
    /// boundary; external calls already in flight are not interrupted.
    pub fn cancel(&self) {
        self.shared.cancel.store(true, Ordering::Relaxed);
    }

    /// Attach an observer for this future's events
    ///
    /// If the future already terminated, the observer is invoked once,
    /// synchronously, with the terminal event, and is not retained.
    pub fn subscribe(&self, mut observer: impl FnMut(&TaskEvent) + Send + 'static) {
        let replay = {
            let mut inner = self.shared.inner.lock();
            match Shared::terminal_event(&inner) {
                Some(event) => Some(event),
                None => {
                    inner.observers.push(Box::new(observer));
                    return;
                }
            }
        };
        if let Some(event) = replay {
            observer(&event);
        }
    }

    /// Block the calling thread until termination
    ///
    /// Returns the produced value, or the typed failure ([`Error::Canceled`]
    /// when the task was canceled).
    pub fn wait(&self) -> Result<T> {
        let mut inner = self.shared.inner.lock();
        loop {
            if let Some(result) = Shared::snapshot_result(&inner) {
                return result;
            }
            self.shared.done.wait(&mut inner);
        }
    }

    /// Wait for termination, invoking `on_tick` periodically
    fn wait_tick(&self, mut on_tick: impl FnMut()) -> Result<T> {
        loop {
            {
                let mut inner = self.shared.inner.lock();
                if let Some(result) = Shared::snapshot_result(&inner) {
                    return result;
                }
                let _ = self
                    .shared
                    .done
                    .wait_for(&mut inner, Duration::from_millis(25));
                if let Some(result) = Shared::snapshot_result(&inner) {
                    return result;
                }
            }
            on_tick();
        }
    }

    /// Compose: run `on_value` with this future's value once it finishes
    ///
    /// The continuation runs on the worker that terminates the upstream; an
    /// upstream failure propagates to the returned future unhandled.
    pub fn then<U, F>(&self, on_value: F) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        self.chain(on_value, |err| Err(err))
    }

    /// Compose with an error handler
    ///
    /// `on_error` may recover by returning a value, or rewrite the failure.
    pub fn then_else<U, F, G>(&self, on_value: F, on_error: G) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
        G: FnOnce(Error) -> Result<U> + Send + 'static,
    {
        self.chain(on_value, on_error)
    }

    fn chain<U, F, G>(&self, on_value: F, on_error: G) -> Future<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
        G: FnOnce(Error) -> Result<U> + Send + 'static,
    {
        let (promise, future) = channel::<U>();
        let upstream = self.clone();
        // FnMut observer wrapping a FnOnce continuation: terminal events
        // arrive exactly once per future.
        let mut handlers = Some((on_value, on_error, promise));
        self.subscribe(move |event| {
            if !event.is_terminal() {
                return;
            }
            if let Some((on_value, on_error, promise)) = handlers.take() {
                let result = match upstream.wait() {
                    Ok(value) => on_value(value),
                    Err(err) => on_error(err),
                };
                promise.complete(result);
            }
        });
        future
    }
}

/// Producer handle owning the eventual result slot
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    completed: bool,
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// The in-task reporting API bound to this promise
    pub fn notifier(&self) -> Notifier {
        Notifier {
            sink: Arc::clone(&self.shared) as Arc<dyn ProgressSink>,
        }
    }

    /// Terminate with the closure's result
    ///
    /// `Err(Error::Canceled)` terminates in the canceled state; any other
    /// error terminates as failed.
    pub fn complete(mut self, result: Result<T>) {
        self.completed = true;
        match result {
            Ok(value) => self
                .shared
                .terminate(Outcome::Finished(value), TaskEvent::Finished),
            Err(Error::Canceled) => self.shared.terminate(Outcome::Canceled, TaskEvent::Canceled),
            Err(err) => self
                .shared
                .terminate(Outcome::Failed(err.clone()), TaskEvent::Failed(err)),
        }
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if self.completed {
            return;
        }
        // A promise dropped without completing means the producer vanished
        let failure = Error::Logic("task abandoned its promise".into());
        let mut taken = {
            let mut inner = self.shared.inner.lock();
            if !matches!(inner.outcome, Outcome::Running) {
                return;
            }
            inner.outcome = Outcome::Failed(failure.clone());
            std::mem::take(&mut inner.observers)
        };
        let event = TaskEvent::Failed(failure);
        for observer in taken.iter_mut() {
            observer(&event);
        }
        self.shared.done.notify_all();
    }
}

/// Create an unscheduled promise/future pair
pub fn channel<T: Clone + Send + 'static>() -> (Promise<T>, Future<T>) {
    let shared = Arc::new(Shared::new());
    (
        Promise {
            shared: Arc::clone(&shared),
            completed: false,
        },
        Future { shared },
    )
}

/// Schedule `f` for execution on the worker pool
///
/// The closure always runs on a worker distinct from the caller and receives
/// a [`Notifier`] for reporting. Panics inside the closure surface as
/// [`Error::Logic`].
pub fn spawn<T, F>(f: F) -> Future<T>
where
    T: Clone + Send + 'static,
    F: FnOnce(&Notifier) -> Result<T> + Send + 'static,
{
    let (promise, future) = channel::<T>();
    pool().execute(Box::new(move || {
        let notifier = promise.notifier();
        let result = match catch_unwind(AssertUnwindSafe(|| f(&notifier))) {
            Ok(result) => result,
            Err(_) => Err(Error::Logic("task panicked".into())),
        };
        promise.complete(result);
    }));
    future
}

type Job = Box<dyn FnOnce() + Send>;

struct Pool {
    injector: Sender<Job>,
}

impl Pool {
    fn start(workers: usize) -> Self {
        let (injector, jobs) = unbounded::<Job>();
        for index in 0..workers {
            let jobs = jobs.clone();
            thread::Builder::new()
                .name(format!("ralph-worker-{index}"))
                .spawn(move || {
                    while let Ok(job) = jobs.recv() {
                        job();
                    }
                })
                .expect("failed to spawn worker thread");
        }
        debug!(workers, "task pool started");
        Self { injector }
    }

    fn execute(&self, job: Job) {
        // The channel is unbounded and the workers never drop the receiver
        let _ = self.injector.send(job);
    }
}

/// Process-wide worker pool, started on first use
///
/// A worker blocked in `delegate` keeps its thread, so the pool must stay
/// larger than the deepest delegation chain times the number of chains in
/// flight; install chains run five levels deep at most.
fn pool() -> &'static Pool {
    static POOL: OnceLock<Pool> = OnceLock::new();
    POOL.get_or_init(|| {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Pool::start(cores.saturating_mul(8).max(32))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    #[test]
    fn test_spawn_runs_off_thread() {
        let caller = thread::current().id();
        let future = spawn(move |_n| Ok(thread::current().id()));
        let worker = future.wait().unwrap();
        assert_ne!(caller, worker);
    }

    #[test]
    fn test_wait_returns_value() {
        let future = spawn(|_n| Ok(41 + 1));
        assert_eq!(future.wait().unwrap(), 42);
        assert_eq!(future.state(), TaskState::Finished);
    }

    #[test]
    fn test_wait_rethrows_failure() {
        let future: Future<()> = spawn(|_n| Err(Error::UnknownPackage("ghost".into())));
        assert_eq!(
            future.wait().unwrap_err(),
            Error::UnknownPackage("ghost".into())
        );
        assert_eq!(future.state(), TaskState::Failed);
    }

    #[test]
    fn test_then_composes() {
        let future = spawn(|_n| Ok(2)).then(|n| Ok(n * 21));
        assert_eq!(future.wait().unwrap(), 42);
    }

    #[test]
    fn test_then_propagates_failure() {
        let future = spawn::<i32, _>(|_n| Err(Error::Network("down".into()))).then(|n| Ok(n + 1));
        assert_eq!(future.wait().unwrap_err(), Error::Network("down".into()));
    }

    #[test]
    fn test_then_else_recovers() {
        let future = spawn::<i32, _>(|_n| Err(Error::Network("down".into())))
            .then_else(|n| Ok(n), |_err| Ok(7));
        assert_eq!(future.wait().unwrap(), 7);
    }

    #[test]
    fn test_cancel_is_observed() {
        let (ready_promise, ready) = channel::<()>();
        let future = spawn::<(), _>(move |notifier| {
            ready_promise.complete(Ok(()));
            loop {
                notifier.check_canceled()?;
                thread::sleep(Duration::from_millis(5));
            }
        });
        ready.wait().unwrap();
        future.cancel();
        future.cancel(); // idempotent
        assert_eq!(future.wait().unwrap_err(), Error::Canceled);
        assert_eq!(future.state(), TaskState::Canceled);
    }

    #[test]
    fn test_progress_and_status_snapshots() {
        let future = spawn(|notifier| {
            notifier.status("working");
            notifier.progress(3, 10);
            Ok(())
        });
        future.wait().unwrap();
        assert_eq!(future.progress(), (3, 10));
        assert_eq!(future.status(), "working");
    }

    #[test]
    fn test_late_observer_gets_one_terminal_replay() {
        let future = spawn(|_n| Ok(5));
        future.wait().unwrap();

        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = Arc::clone(&hits);
        future.subscribe(move |event| {
            assert!(matches!(event, TaskEvent::Finished));
            hits_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_events_arrive_in_order() {
        let events = Arc::new(StdMutex::new(Vec::new()));
        let (promise, future) = channel::<()>();

        let log = Arc::clone(&events);
        future.subscribe(move |event| {
            let tag = match event {
                TaskEvent::Status(s) => s.clone(),
                TaskEvent::Progress { current, .. } => format!("p{current}"),
                TaskEvent::Finished => "done".into(),
                other => format!("{other:?}"),
            };
            log.lock().unwrap().push(tag);
        });

        let notifier = promise.notifier();
        notifier.status("a");
        notifier.progress(1, 2);
        notifier.progress(2, 2);
        promise.complete(Ok(()));

        assert_eq!(
            events.lock().unwrap().as_slice(),
            ["a", "p1", "p2", "done"]
        );
    }

    #[test]
    fn test_delegate_mirrors_progress() {
        let future = spawn(|notifier| {
            let sub = spawn(|inner| {
                inner.status("subtask");
                inner.progress(5, 5);
                Ok(9)
            });
            notifier.delegate(sub)
        });
        assert_eq!(future.wait().unwrap(), 9);
        assert_eq!(future.progress(), (5, 5));
        assert_eq!(future.status(), "subtask");
    }

    #[test]
    fn test_delegate_skips_second_phase_after_cancel() {
        let reached_second = Arc::new(AtomicBool::new(false));
        let reached = Arc::clone(&reached_second);

        let (gate_promise, gate) = channel::<()>();
        let gate_inner = gate.clone();

        let future = spawn(move |notifier| {
            // First phase parks until the test has requested cancellation
            let first = spawn(move |_n| {
                gate_inner.wait()?;
                Ok(())
            });
            notifier.delegate(first)?;

            let second = spawn(move |_n| {
                reached.store(true, Ordering::SeqCst);
                Ok(())
            });
            notifier.delegate(second)
        });

        future.cancel();
        gate_promise.complete(Ok(()));

        assert_eq!(future.wait().unwrap_err(), Error::Canceled);
        assert_eq!(future.state(), TaskState::Canceled);
        assert!(!reached_second.load(Ordering::SeqCst));
    }

    #[test]
    fn test_abandoned_promise_fails() {
        let (promise, future) = channel::<()>();
        drop(promise);
        assert!(matches!(future.wait().unwrap_err(), Error::Logic(_)));
    }
}
