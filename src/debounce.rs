//! Trailing-edge debounce.
//!
//! Every [`Debouncer::call`] pushes the deadline `delay` into the future; the
//! wrapped function runs once, on the worker thread, after calls stop coming
//! for a full `delay`.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Default)]
struct State {
    deadline: Option<Instant>,
    stopped: bool,
}

#[derive(Default)]
struct Shared {
    state: Mutex<State>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Collapses bursts of calls into a single delayed run of `f`.
///
/// Dropping the debouncer stops the worker; a pending run is discarded.
pub struct Debouncer {
    delay: Duration,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new<F>(delay: Duration, f: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker = {
            let shared = Arc::clone(&shared);
            thread::spawn(move || run(&shared, f))
        };
        Self {
            delay,
            shared,
            worker: Some(worker),
        }
    }

    /// Schedule a run `delay` from now, replacing any pending one.
    pub fn call(&self) {
        self.shared.lock().deadline = Some(Instant::now() + self.delay);
        self.shared.wake.notify_one();
    }

    /// Whether a run is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.shared.lock().deadline.is_some()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.shared.lock().stopped = true;
        self.shared.wake.notify_one();
        let panicked = self
            .worker
            .take()
            .is_some_and(|worker| worker.join().is_err());
        if panicked {
            log::error!("debounced function panicked");
        }
    }
}

fn run(shared: &Shared, mut f: impl FnMut()) {
    let mut state = shared.lock();
    loop {
        if state.stopped {
            return;
        }
        match state.deadline {
            None => {
                state = shared.wake.wait(state).unwrap_or_else(|e| e.into_inner());
            }
            Some(deadline) => {
                let now = Instant::now();
                if now < deadline {
                    state = shared
                        .wake
                        .wait_timeout(state, deadline - now)
                        .map(|(guard, _)| guard)
                        .unwrap_or_else(|e| e.into_inner().0);
                    continue;
                }
                state.deadline = None;
                drop(state);
                f();
                state = shared.lock();
            }
        }
    }
}
