//! Arbitration state primitive. Single-process, thread-per-session model:
//! the mutex is a plain `std::sync::Mutex` (every critical section here
//! is short and never crosses an `.await`), and the counting release
//! primitive is a `tokio::sync::Semaphore` — `signal()` is `add_permits`,
//! `wait()` is `acquire()` with the permit immediately forgotten, since
//! this is a one-shot broadcast gate rather than a reusable resource
//! count.

use std::sync::Mutex;
use std::time::Instant;

use tokio::sync::Semaphore;

/// The process-shared round-arbitration fields, guarded by
/// [`ArbitrationState`]'s mutex.
pub struct ArbitrationInner {
    pub playing_total: usize,
    pub in_lobby: usize,
    pub active: usize,
    pub last_arrival_time: Instant,
    pub current_puzzle_index: Option<usize>,
    pub round_started: bool,
    pub round_ended: bool,
    pub winner_id: Option<i32>,
    pub winner_time: Option<Instant>,
}

pub struct ArbitrationState {
    pub capacity: usize,
    inner: Mutex<ArbitrationInner>,
    release: Semaphore,
}

impl ArbitrationState {
    pub fn new(capacity: usize) -> Self {
        ArbitrationState {
            capacity,
            inner: Mutex::new(ArbitrationInner {
                playing_total: 0,
                in_lobby: 0,
                active: 0,
                last_arrival_time: Instant::now(),
                current_puzzle_index: None,
                round_started: false,
                round_ended: false,
                winner_id: None,
                winner_time: None,
            }),
            release: Semaphore::new(0),
        }
    }

    /// Execute `f` under the mutex, then check the arbitration invariants
    /// before returning. A violation must never happen in a correct
    /// build; it is logged and the process aborts.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut ArbitrationInner) -> R) -> R {
        let mut guard = self.inner.lock().unwrap();
        let result = f(&mut guard);
        self.check_invariants(&guard);
        result
    }

    fn check_invariants(&self, inner: &ArbitrationInner) {
        let ok = inner.playing_total <= self.capacity // I1
            && inner.in_lobby + inner.active <= inner.playing_total // I2
            && (!inner.round_ended || inner.round_started); // I3
        if !ok {
            tracing::error!(
                playing_total = inner.playing_total,
                in_lobby = inner.in_lobby,
                active = inner.active,
                round_started = inner.round_started,
                round_ended = inner.round_ended,
                capacity = self.capacity,
                "arbitration invariant violated"
            );
            std::process::abort();
        }
    }

    /// `release.signal()`, repeated `n` times — admits exactly `n` waiters.
    pub fn signal_release(&self, n: usize) {
        self.release.add_permits(n);
    }

    /// `release.wait()` — blocks this session until a signal admits it.
    pub async fn wait_for_release(&self) {
        let permit = self.release.acquire().await.expect("release semaphore never closes");
        permit.forget();
    }
}
