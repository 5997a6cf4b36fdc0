//! Mastery-Banded Item Selection
//!
//! Picks the next practice item from a pool:
//! - Items already in the session record are never offered again
//! - Low mastery prefers easy items, high mastery prefers hard items,
//!   the middle band draws from every difficulty
//! - A band with no unseen items falls back to the whole unseen set
//! - Ties are broken by an injectable [`TieBreaker`]
//!
//! Complexity: O(|pool|)

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::types::{
    Difficulty, Item, SessionRecord, DEFAULT_EASY_BAND_UPPER, DEFAULT_HARD_BAND_LOWER,
};

// ==================== Difficulty Bands ====================

/// Mastery cut points for difficulty preference
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyBands {
    /// mastery < easy_below → easy
    pub easy_below: f64,
    /// mastery >= hard_from → hard
    pub hard_from: f64,
}

impl Default for DifficultyBands {
    fn default() -> Self {
        Self {
            easy_below: DEFAULT_EASY_BAND_UPPER,
            hard_from: DEFAULT_HARD_BAND_LOWER,
        }
    }
}

impl DifficultyBands {
    /// Preferred difficulty for a mastery value; `None` means any difficulty.
    pub fn preferred(&self, mastery: f64) -> Option<Difficulty> {
        if mastery < self.easy_below {
            Some(Difficulty::Easy)
        } else if mastery >= self.hard_from {
            Some(Difficulty::Hard)
        } else {
            None
        }
    }
}

// ==================== Tie Breaking ====================

/// Strategy for choosing among equally preferred candidates
pub trait TieBreaker {
    /// Pick one of `candidates`; `None` only when `candidates` is empty.
    fn choose<'a>(&mut self, candidates: &[&'a Item]) -> Option<&'a Item>;
}

/// Uniform random choice driven by a seedable RNG
#[derive(Clone, Debug)]
pub struct RandomTieBreaker<R = ChaCha8Rng> {
    rng: R,
}

impl RandomTieBreaker<ChaCha8Rng> {
    /// Reproducible sequence for a fixed seed
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }
}

impl<R: Rng> RandomTieBreaker<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> TieBreaker for RandomTieBreaker<R> {
    fn choose<'a>(&mut self, candidates: &[&'a Item]) -> Option<&'a Item> {
        if candidates.is_empty() {
            return None;
        }
        let index = self.rng.gen_range(0..candidates.len());
        Some(candidates[index])
    }
}

/// Deterministic choice: lexicographically smallest id
#[derive(Clone, Copy, Debug, Default)]
pub struct LowestIdTieBreaker;

impl TieBreaker for LowestIdTieBreaker {
    fn choose<'a>(&mut self, candidates: &[&'a Item]) -> Option<&'a Item> {
        candidates.iter().copied().min_by(|a, b| a.id.cmp(&b.id))
    }
}

impl<T: TieBreaker + ?Sized> TieBreaker for Box<T> {
    fn choose<'a>(&mut self, candidates: &[&'a Item]) -> Option<&'a Item> {
        (**self).choose(candidates)
    }
}

// ==================== Selection ====================

/// Select the next item, or `None` once every pool item has been seen.
///
/// Does not touch `record`; the caller records the item after grading.
pub fn select_next<'a, T>(
    pool: &'a [Item],
    mastery: f64,
    record: &SessionRecord,
    bands: &DifficultyBands,
    tie_breaker: &mut T,
) -> Option<&'a Item>
where
    T: TieBreaker + ?Sized,
{
    let unseen: Vec<&Item> = pool.iter().filter(|item| !record.contains(&item.id)).collect();
    if unseen.is_empty() {
        return None;
    }

    if let Some(difficulty) = bands.preferred(mastery) {
        let matching: Vec<&Item> = unseen
            .iter()
            .copied()
            .filter(|item| item.difficulty == difficulty)
            .collect();
        if !matching.is_empty() {
            return tie_breaker.choose(&matching);
        }
    }

    tie_breaker.choose(&unseen)
}
