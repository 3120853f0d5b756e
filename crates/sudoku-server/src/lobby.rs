//! Lobby controller. Drives a session's
//! `ADMITTING → WAITING_FOR_REQUEST → IN_LOBBY → PLAYING → LEAVING` state
//! machine against the shared [`ArbitrationState`] and the puzzle store.

use std::sync::Arc;
use std::time::{Duration, Instant};

use sudoku_core::puzzle::PuzzleStore;

use crate::arbitration::{ArbitrationInner, ArbitrationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionRejected;

pub struct Lobby {
    state: Arc<ArbitrationState>,
    puzzles: Arc<PuzzleStore>,
}

impl Lobby {
    pub fn new(state: Arc<ArbitrationState>, puzzles: Arc<PuzzleStore>) -> Self {
        Lobby { state, puzzles }
    }

    /// ADMITTING. On success `playing_total` is incremented.
    pub fn admit(&self) -> Result<(), AdmissionRejected> {
        self.state.with_lock(|inner| {
            if inner.playing_total >= self.state.capacity {
                Err(AdmissionRejected)
            } else {
                inner.playing_total += 1;
                Ok(())
            }
        })
    }

    /// IN_LOBBY. Records arrival and fires the full-lobby release path
    /// when `in_lobby` reaches `CAPACITY` and no round has started yet.
    pub fn enter_lobby(&self) {
        self.state.with_lock(|inner| {
            inner.in_lobby += 1;
            inner.last_arrival_time = Instant::now();
            if inner.in_lobby == self.state.capacity && !inner.round_started {
                let n = self.state.capacity;
                self.publish_and_release(inner, n);
            }
        });
    }

    /// Component H's tick. Fires the timer release path when at least two
    /// sessions are parked, no round has started, and the aggregation
    /// window has elapsed since the last arrival.
    pub fn maybe_fire_aggregation_timer(&self, window: Duration) {
        self.state.with_lock(|inner| {
            if inner.in_lobby >= 2
                && !inner.round_started
                && inner.last_arrival_time.elapsed() >= window
            {
                let n = inner.in_lobby;
                self.publish_and_release(inner, n);
            }
        });
    }

    /// Wait on the release gate. Returns once this session has been
    /// admitted into the running round.
    pub async fn wait_for_release(&self) {
        self.state.wait_for_release().await;
    }

    /// PLAYING. Decrements `in_lobby`, increments `active`, and returns
    /// the puzzle index chosen for this round.
    pub fn enter_play(&self) -> usize {
        self.state.with_lock(|inner| {
            inner.in_lobby -= 1;
            inner.active += 1;
            inner
                .current_puzzle_index
                .expect("round_started implies current_puzzle_index is set")
        })
    }

    /// A session is done with this round's verdict: decrement `active`;
    /// if it reaches zero, clear `round_started` so a later lobby fill or
    /// timer tick can start a fresh round.
    pub fn finish_round(&self) {
        self.state.with_lock(|inner| {
            inner.active = inner.active.saturating_sub(1);
            if inner.active == 0 {
                inner.round_started = false;
            }
        });
    }

    /// LEAVING. `was_active` should be true if the session had already
    /// entered `PLAYING` (and was not already counted out by
    /// [`Lobby::finish_round`]) when it disconnected.
    pub fn leave(&self, was_in_lobby: bool, was_active: bool) {
        self.state.with_lock(|inner| {
            inner.playing_total = inner.playing_total.saturating_sub(1);
            if was_in_lobby {
                inner.in_lobby = inner.in_lobby.saturating_sub(1);
            }
            if was_active {
                inner.active = inner.active.saturating_sub(1);
            }
            if inner.in_lobby == 0 && inner.playing_total == 0 {
                inner.round_started = false;
                inner.round_ended = false;
                inner.active = 0;
                inner.current_puzzle_index = None;
                inner.winner_id = None;
                inner.winner_time = None;
            }
        });
    }

    /// First-writer-wins winner recording. Returns true iff this call is
    /// the one that flips `round_ended`.
    pub fn record_winner_if_first(&self, client_id: i32) -> bool {
        self.state.with_lock(|inner| {
            if !inner.round_ended {
                inner.round_ended = true;
                inner.winner_id = Some(client_id);
                inner.winner_time = Some(Instant::now());
                true
            } else {
                false
            }
        })
    }

    /// Non-blocking poll used between receives while a session awaits a
    /// submission: is the round decided and, if so, in whose favour?
    pub fn round_outcome(&self) -> Option<(bool, i32)> {
        self.state.with_lock(|inner| {
            if inner.round_ended {
                inner.winner_id.map(|w| (true, w))
            } else {
                None
            }
        })
    }

    fn publish_and_release(&self, inner: &mut ArbitrationInner, signal_count: usize) {
        let mut rng = rand::rng();
        let puzzle_index = self.puzzles.pick_random(&mut rng);
        inner.current_puzzle_index = Some(puzzle_index);
        inner.round_started = true;
        inner.round_ended = false;
        inner.winner_id = None;
        inner.winner_time = None;
        self.state.signal_release(signal_count);
    }
}
