//! Parallel backtracking solver. One worker thread per candidate digit
//! at the first empty cell; the first worker to complete
//! a grid wins via a shared stop flag. Workers call back into a
//! [`BlockValidator`] as they cross row-band boundaries, which is how the
//! client-side solver exercises the server's `VALIDATE_BLOCK` protocol
//! while it searches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use rand::seq::SliceRandom;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::board::{block_cells, first_empty, Grid};
use crate::validation::{get_candidates, is_valid_placement};

/// Called by a worker whenever it completes a band of three blocks (on
/// crossing row 3 or row 6) and once more for the final band on success.
/// Implementations typically hold the per-session transport lock while
/// they round-trip the validation.
pub trait BlockValidator: Send + Sync {
    /// Returns true iff every non-zero cell of `block_cells` matches the
    /// server's stored solution for `block_id`.
    fn validate_block(&self, block_id: usize, block_cells: [u8; 9]) -> bool;
}

/// A validator that accepts everything without contacting anything;
/// used by tests and by callers with no live session.
pub struct NullValidator;

impl BlockValidator for NullValidator {
    fn validate_block(&self, _block_id: usize, _block_cells: [u8; 9]) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved(Grid),
    Unsatisfiable,
}

struct SharedState {
    stop: AtomicBool,
    winner: Mutex<Option<Grid>>,
}

/// Run the fan-out search. `seed` should differ across concurrent
/// players (the PID, or a configured client id) so their candidate
/// orderings diverge; `max_workers` is clamped to `1..=9`.
pub fn solve_parallel(
    grid: &Grid,
    seed: u64,
    max_workers: usize,
    validator: Arc<dyn BlockValidator>,
) -> SolveOutcome {
    let Some((r, c)) = first_empty(grid) else {
        return SolveOutcome::Solved(*grid);
    };

    let mut candidates = get_candidates(grid, r, c);
    let mut rng = StdRng::seed_from_u64(seed);
    candidates.shuffle(&mut rng);
    candidates.truncate(max_workers.clamp(1, 9));

    if candidates.is_empty() {
        return SolveOutcome::Unsatisfiable;
    }

    let shared = Arc::new(SharedState {
        stop: AtomicBool::new(false),
        winner: Mutex::new(None),
    });

    thread::scope(|scope| {
        for val in &candidates {
            let shared = Arc::clone(&shared);
            let validator = Arc::clone(&validator);
            let mut worker_grid = *grid;
            worker_grid[r][c] = *val;
            scope.spawn(move || {
                let mut deepest_row_seen = r;
                backtrack(
                    &mut worker_grid,
                    &shared,
                    validator.as_ref(),
                    &mut deepest_row_seen,
                );
            });
        }
    });

    match shared.winner.lock().unwrap().take() {
        Some(solved) => SolveOutcome::Solved(solved),
        None => SolveOutcome::Unsatisfiable,
    }
}

/// Depth-first backtracking with cooperative cancellation. Returns true
/// once this worker has published the winning grid (not necessarily its
/// own recursion's caller — `stop` is the single source of truth).
fn backtrack(
    grid: &mut Grid,
    shared: &SharedState,
    validator: &dyn BlockValidator,
    deepest_row_seen: &mut usize,
) -> bool {
    if shared.stop.load(Ordering::Relaxed) {
        return false;
    }

    let Some((r, c)) = first_empty(grid) else {
        validate_band(grid, 6, validator);
        let mut winner = shared.winner.lock().unwrap();
        if !shared.stop.load(Ordering::Relaxed) {
            shared.stop.store(true, Ordering::Relaxed);
            *winner = Some(*grid);
        }
        return true;
    };

    if r > *deepest_row_seen {
        if *deepest_row_seen < 3 && r >= 3 {
            validate_band(grid, 0, validator);
        }
        if *deepest_row_seen < 6 && r >= 6 {
            validate_band(grid, 3, validator);
        }
        *deepest_row_seen = r;
    }

    for val in 1..=9u8 {
        if shared.stop.load(Ordering::Relaxed) {
            return false;
        }
        if is_valid_placement(grid, r, c, val) {
            grid[r][c] = val;
            if backtrack(grid, shared, validator, deepest_row_seen) {
                return true;
            }
            grid[r][c] = 0;
        }
    }

    false
}

/// Validate the three blocks of the band starting at `first_block`
/// (0, 3, or 6) against the stored solution, via `validator`.
fn validate_band(grid: &Grid, first_block: usize, validator: &dyn BlockValidator) {
    for block_id in first_block..first_block + 3 {
        validator.validate_block(block_id, block_cells(grid, block_id));
    }
}
