//! Background scheduling for credential refresh.

use std::fmt;
use std::fmt::Debug;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use log::debug;

/// A deferred unit of work handed to a scheduler.
pub type RefreshTask = Box<dyn FnOnce() + Send + 'static>;

/// ScheduleRefresh abstracts the background scheduler so cached providers
/// can be driven by a deterministic scheduler in tests.
pub trait ScheduleRefresh: Debug + Send + Sync + 'static {
    /// Run `task` after `delay`, returning a handle that cancels it while
    /// it has not fired yet.
    fn schedule_refresh(&self, delay: Duration, task: RefreshTask) -> ScheduleHandle;
}

/// Handle to a scheduled task.
#[derive(Debug, Clone, Default)]
pub struct ScheduleHandle {
    cancelled: Arc<AtomicBool>,
}

impl ScheduleHandle {
    /// Cancel the task if it has not fired yet. A task that is already
    /// running completes.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether the task was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

struct Entry {
    at: Instant,
    task: RefreshTask,
    handle: ScheduleHandle,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    shutdown: bool,
}

struct Shared {
    state: Mutex<State>,
    cond: Condvar,
}

/// RefreshScheduler runs tasks on one shared worker thread.
///
/// The worker is detached and never blocks process exit. Cloning shares
/// the same worker; create one scheduler per process and [`shutdown`]
/// [`RefreshScheduler::shutdown`] it once when credentials are no longer
/// needed.
#[derive(Clone)]
pub struct RefreshScheduler {
    shared: Arc<Shared>,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshScheduler {
    /// Create a scheduler with its worker thread started.
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            cond: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("credential-refresh".to_string())
            .spawn(move || worker(worker_shared))
            .expect("refresh worker thread must spawn");

        Self { shared }
    }

    /// Stop the worker. Pending tasks are cancelled and dropped; a task
    /// that is already running completes.
    pub fn shutdown(&self) {
        let mut state = self.shared.state.lock().expect("lock poisoned");
        state.shutdown = true;
        for entry in state.entries.drain(..) {
            entry.handle.cancel();
        }
        drop(state);

        self.shared.cond.notify_all();
    }
}

impl ScheduleRefresh for RefreshScheduler {
    fn schedule_refresh(&self, delay: Duration, task: RefreshTask) -> ScheduleHandle {
        let handle = ScheduleHandle::default();

        let mut state = self.shared.state.lock().expect("lock poisoned");
        if state.shutdown {
            debug!("scheduler is shut down, task dropped");
            handle.cancel();
            return handle;
        }
        state.entries.push(Entry {
            at: Instant::now() + delay,
            task,
            handle: handle.clone(),
        });
        drop(state);

        self.shared.cond.notify_one();
        handle
    }
}

impl Debug for RefreshScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock().expect("lock poisoned");
        f.debug_struct("RefreshScheduler")
            .field("pending", &state.entries.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

fn worker(shared: Arc<Shared>) {
    let mut state = shared.state.lock().expect("lock poisoned");
    loop {
        if state.shutdown {
            return;
        }

        let now = Instant::now();
        let mut due = Vec::new();
        let mut i = 0;
        while i < state.entries.len() {
            if state.entries[i].at <= now {
                due.push(state.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }

        // Run due tasks with the lock released so they can schedule
        // follow-ups.
        if !due.is_empty() {
            drop(state);
            for entry in due {
                if !entry.handle.is_cancelled() {
                    (entry.task)();
                }
            }
            state = shared.state.lock().expect("lock poisoned");
            continue;
        }

        state = match state.entries.iter().map(|e| e.at).min() {
            Some(at) => {
                let timeout = at.saturating_duration_since(now);
                shared
                    .cond
                    .wait_timeout(state, timeout)
                    .expect("lock poisoned")
                    .0
            }
            None => shared.cond.wait(state).expect("lock poisoned"),
        };
    }
}
