//! Trailing-edge debouncer.
//!
//! Holds at most one pending action. Scheduling a new action replaces the
//! pending one, whatever it was for; only the last action scheduled inside
//! the window runs, once the window has passed without a newer call.
//!
//! Timer tasks carry a generation token and re-check it after sleeping, so a
//! replaced timer that already woke up never runs its stale action.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

type Action = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A single cancellable delayed action, replaced (never stacked) on every
/// [`schedule`](Self::schedule).
pub struct Debouncer<T> {
    delay: Duration,
    state: Arc<Mutex<State<T>>>,
}

struct State<T> {
    generation: u64,
    pending: Option<Pending<T>>,
    /// Timers whose action already started and was then superseded.
    in_flight: Vec<JoinHandle<()>>,
}

struct Pending<T> {
    generation: u64,
    tag: T,
    /// `None` once the timer has taken the action to run it.
    action: Option<Action>,
    timer: JoinHandle<()>,
}

impl<T> std::fmt::Debug for Debouncer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: Arc::new(Mutex::new(State {
                generation: 0,
                pending: None,
                in_flight: Vec::new(),
            })),
        }
    }

    /// Coalescing window.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Run `action` after the window unless another call replaces it first.
    ///
    /// `tag` describes the action and stays readable through
    /// [`pending_tag`](Self::pending_tag) until the action completes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, tag: T, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut state = lock(&self.state);
        state.generation += 1;
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let delay = self.delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let action = {
                let mut state = lock(&shared);
                match state.pending.as_mut() {
                    Some(pending) if pending.generation == generation => pending.action.take(),
                    _ => None,
                }
            };
            let Some(action) = action else {
                return;
            };
            action.await;

            let mut state = lock(&shared);
            if state
                .pending
                .as_ref()
                .is_some_and(|pending| pending.generation == generation)
            {
                state.pending = None;
            }
        });

        let previous = state.pending.replace(Pending {
            generation,
            tag,
            action: Some(Box::pin(action)),
            timer,
        });
        state.in_flight.retain(|handle| !handle.is_finished());
        if let Some(previous) = previous {
            retire(&mut state, previous);
        }
    }

    /// Tag of the scheduled or running action, if any.
    #[must_use]
    pub fn pending_tag(&self) -> Option<T> {
        lock(&self.state)
            .pending
            .as_ref()
            .map(|pending| pending.tag.clone())
    }

    /// Whether an action is scheduled or running.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending.is_some()
    }

    /// Drop the pending action without running it. An action that already
    /// started keeps running.
    pub fn cancel(&self) {
        let mut state = lock(&self.state);
        if let Some(previous) = state.pending.take() {
            retire(&mut state, previous);
        }
    }

    /// Run the pending action now instead of waiting for the window, and
    /// wait for every action that already started.
    pub async fn flush(&self) {
        let (in_flight, pending) = {
            let mut state = lock(&self.state);
            (std::mem::take(&mut state.in_flight), state.pending.take())
        };

        for handle in in_flight {
            let _ = handle.await;
        }

        if let Some(mut pending) = pending {
            match pending.action.take() {
                Some(action) => {
                    pending.timer.abort();
                    action.await;
                }
                None => {
                    let _ = pending.timer.await;
                }
            }
        }
    }
}

/// Stop a superseded timer, or keep tracking it if its action is running.
fn retire<T>(state: &mut State<T>, previous: Pending<T>) {
    if previous.action.is_some() {
        previous.timer.abort();
    } else {
        state.in_flight.push(previous.timer);
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if let Some(pending) = state.pending.take()
            && pending.action.is_some()
        {
            pending.timer.abort();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    use super::*;

    const WINDOW: Duration = Duration::from_millis(300);

    struct Probe {
        runs: AtomicUsize,
        last: AtomicU32,
    }

    impl Probe {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                runs: AtomicUsize::new(0),
                last: AtomicU32::new(0),
            })
        }

        fn action(self: &Arc<Self>, value: u32) -> impl Future<Output = ()> + Send + 'static {
            let probe = Arc::clone(self);
            async move {
                probe.runs.fetch_add(1, Ordering::SeqCst);
                probe.last.store(value, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_rapid_calls_run_only_the_last() {
        let debouncer = Debouncer::new(WINDOW);
        let probe = Probe::new();

        for value in 1..=3 {
            debouncer.schedule(value, probe.action(value));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(probe.runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending_tag(), Some(3));

        tokio::time::sleep(WINDOW).await;
        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert_eq!(probe.last.load(Ordering::SeqCst), 3);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_calls_outside_the_window_each_run() {
        let debouncer = Debouncer::new(WINDOW);
        let probe = Probe::new();

        debouncer.schedule(1, probe.action(1));
        tokio::time::sleep(Duration::from_millis(400)).await;
        debouncer.schedule(2, probe.action(2));
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(probe.runs.load(Ordering::SeqCst), 2);
        assert_eq!(probe.last.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_flush_runs_pending_action_immediately() {
        let debouncer = Debouncer::new(WINDOW);
        let probe = Probe::new();

        debouncer.schedule(7, probe.action(7));
        debouncer.flush().await;
        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());

        // The aborted timer must not run the action a second time.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(probe.runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_cancel_drops_pending_action() {
        let debouncer = Debouncer::new(WINDOW);
        let probe = Probe::new();

        debouncer.schedule(1, probe.action(1));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(probe.runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending_tag(), None);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_flush_with_nothing_pending() {
        let debouncer: Debouncer<u32> = Debouncer::new(WINDOW);
        debouncer.flush().await;
        assert!(!debouncer.is_pending());
    }
}
