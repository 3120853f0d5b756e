//! Puzzle store. Holds the `(id, givens, solution)` triples
//! loaded at startup; immutable and freely shared for the rest of the
//! process lifetime.

use rand::RngExt;
use thiserror::Error;

use crate::board::{grid_from_str, Grid};

/// One loaded puzzle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    pub id: i32,
    pub givens: Grid,
    pub solution: Grid,
}

#[derive(Debug, Error)]
pub enum PuzzleStoreError {
    #[error("puzzle source yielded no valid rows")]
    Empty,
    #[error("failed to read puzzle source: {0}")]
    Io(#[from] std::io::Error),
}

/// Ordered, immutable collection of puzzles.
#[derive(Debug, Clone)]
pub struct PuzzleStore {
    puzzles: Vec<Puzzle>,
}

impl PuzzleStore {
    /// Build a store directly from already-parsed puzzles. Returns
    /// [`PuzzleStoreError::Empty`] if `puzzles` is empty, since an empty
    /// store is a fatal startup condition.
    pub fn new(puzzles: Vec<Puzzle>) -> Result<Self, PuzzleStoreError> {
        if puzzles.is_empty() {
            return Err(PuzzleStoreError::Empty);
        }
        Ok(PuzzleStore { puzzles })
    }

    /// Parse a CSV source where each row is `id,givens,solution` (both
    /// grids 81 characters). Empty lines and malformed rows are skipped;
    /// the caller is expected to log how many rows were dropped by
    /// comparing the input line count against [`PuzzleStore::count`].
    pub fn load_csv(source: &str) -> Result<(Self, usize, usize), PuzzleStoreError> {
        let mut puzzles = Vec::new();
        let mut skipped = 0usize;
        let mut total_rows = 0usize;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(source.as_bytes());

        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            total_rows += 1;

            let parsed = record
                .get(0)
                .and_then(|id| id.trim().parse::<i32>().ok())
                .zip(record.get(1).and_then(|g| grid_from_str(g.trim())))
                .zip(record.get(2).and_then(|s| grid_from_str(s.trim())));

            match parsed {
                Some(((id, givens), solution)) => puzzles.push(Puzzle {
                    id,
                    givens,
                    solution,
                }),
                None => skipped += 1,
            }
        }

        let kept = puzzles.len();
        let store = PuzzleStore::new(puzzles)?;
        Ok((store, kept, total_rows.saturating_sub(kept).max(skipped)))
    }

    pub fn count(&self) -> usize {
        self.puzzles.len()
    }

    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.puzzles.get(index)
    }

    /// Uniformly pick a random puzzle index.
    pub fn pick_random(&self, rng: &mut impl RngExt) -> usize {
        rng.random_range(0..self.puzzles.len())
    }
}
