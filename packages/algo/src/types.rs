//! Common Types and Constants
//!
//! Shared data structures used across all algorithm modules.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BktError, BktResult};
use crate::sanitize::{require_mastery, require_open_unit};

// ==================== Constants ====================

/// Default P(L0)
pub const DEFAULT_PRIOR_KNOWLEDGE: f64 = 0.1;

/// Default P(T)
pub const DEFAULT_LEARN_RATE: f64 = 0.15;

/// Default P(G)
pub const DEFAULT_GUESS_RATE: f64 = 0.25;

/// Default P(S)
pub const DEFAULT_SLIP_RATE: f64 = 0.1;

/// Mastery at or above which a skill counts as mastered
pub const DEFAULT_MASTERY_THRESHOLD: f64 = 0.8;

/// Graded attempts required before mastery may end a session
pub const DEFAULT_MIN_ATTEMPTS: u32 = 5;

/// Below this mastery, easy items are preferred
pub const DEFAULT_EASY_BAND_UPPER: f64 = 0.3;

/// At or above this mastery, hard items are preferred
pub const DEFAULT_HARD_BAND_LOWER: f64 = 0.7;

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

// ==================== BKT Parameters ====================

/// Calibration for one skill.
///
/// All four values live in the open interval (0, 1). Construction goes
/// through [`BktParameters::new`], so a value of this type is always valid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBktParameters")]
pub struct BktParameters {
    prior_knowledge: f64,
    learn_rate: f64,
    guess_rate: f64,
    slip_rate: f64,
}

#[derive(Deserialize)]
struct RawBktParameters {
    prior_knowledge: f64,
    learn_rate: f64,
    guess_rate: f64,
    slip_rate: f64,
}

impl TryFrom<RawBktParameters> for BktParameters {
    type Error = BktError;

    fn try_from(raw: RawBktParameters) -> Result<Self, Self::Error> {
        Self::new(raw.prior_knowledge, raw.learn_rate, raw.guess_rate, raw.slip_rate)
    }
}

impl BktParameters {
    /// Create validated parameters. Values of exactly 0 or 1 are rejected.
    pub fn new(
        prior_knowledge: f64,
        learn_rate: f64,
        guess_rate: f64,
        slip_rate: f64,
    ) -> BktResult<Self> {
        Ok(Self {
            prior_knowledge: require_open_unit("prior_knowledge", prior_knowledge)?,
            learn_rate: require_open_unit("learn_rate", learn_rate)?,
            guess_rate: require_open_unit("guess_rate", guess_rate)?,
            slip_rate: require_open_unit("slip_rate", slip_rate)?,
        })
    }

    pub fn prior_knowledge(&self) -> f64 {
        self.prior_knowledge
    }

    pub fn learn_rate(&self) -> f64 {
        self.learn_rate
    }

    pub fn guess_rate(&self) -> f64 {
        self.guess_rate
    }

    pub fn slip_rate(&self) -> f64 {
        self.slip_rate
    }

    /// Replace the three learned rates, keeping the prior.
    pub fn with_rates(&self, learn_rate: f64, guess_rate: f64, slip_rate: f64) -> BktResult<Self> {
        Self::new(self.prior_knowledge, learn_rate, guess_rate, slip_rate)
    }

    /// `guess < 1 - slip`: a correct answer is stronger evidence of mastery
    /// than an incorrect one.
    pub fn is_identifiable(&self) -> bool {
        self.guess_rate < 1.0 - self.slip_rate
    }
}

impl Default for BktParameters {
    fn default() -> Self {
        Self {
            prior_knowledge: DEFAULT_PRIOR_KNOWLEDGE,
            learn_rate: DEFAULT_LEARN_RATE,
            guess_rate: DEFAULT_GUESS_RATE,
            slip_rate: DEFAULT_SLIP_RATE,
        }
    }
}

// ==================== Mastery State ====================

/// Durable mastery for one (student, skill) pair
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MasteryState {
    /// Posterior probability of mastery [0, 1]
    pub estimated_mastery: f64,
    /// Graded attempts so far
    pub opportunity_count: u32,
    /// Last mutation (unix millis)
    pub last_updated: i64,
}

impl MasteryState {
    /// First contact with a skill: mastery starts at the prior.
    pub fn initial(params: &BktParameters, now_ms: i64) -> Self {
        Self {
            estimated_mastery: params.prior_knowledge(),
            opportunity_count: 0,
            last_updated: now_ms,
        }
    }

    pub fn validate(&self) -> BktResult<()> {
        require_mastery(self.estimated_mastery).map(|_| ())
    }

    pub fn level(&self) -> MasteryLevel {
        MasteryLevel::from_mastery(self.estimated_mastery)
    }
}

/// Coarse mastery category for display
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasteryLevel {
    Beginner,
    Developing,
    Proficient,
    Mastered,
}

impl MasteryLevel {
    pub fn from_mastery(mastery: f64) -> Self {
        if mastery >= 0.8 {
            MasteryLevel::Mastered
        } else if mastery >= 0.6 {
            MasteryLevel::Proficient
        } else if mastery >= 0.4 {
            MasteryLevel::Developing
        } else {
            MasteryLevel::Beginner
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryLevel::Beginner => "beginner",
            MasteryLevel::Developing => "developing",
            MasteryLevel::Proficient => "proficient",
            MasteryLevel::Mastered => "mastered",
        }
    }
}

// ==================== Items ====================

/// Item difficulty
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown difficulty `{0}`")]
pub struct UnknownDifficulty(pub String);

impl FromStr for Difficulty {
    type Err = UnknownDifficulty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "mid" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(UnknownDifficulty(s.to_string())),
        }
    }
}

/// A practice question as seen by the core. Display content stays with the pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub difficulty: Difficulty,
    pub correct_answer: String,
}

impl Item {
    pub fn new(id: impl Into<String>, difficulty: Difficulty, correct_answer: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            difficulty,
            correct_answer: correct_answer.into(),
        }
    }

    /// Trimmed, ASCII case-insensitive comparison with the correct answer
    pub fn grade(&self, answer: &str) -> bool {
        answer.trim().eq_ignore_ascii_case(self.correct_answer.trim())
    }
}

// ==================== Session Record ====================

/// Item ids already presented in the current session window
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionRecord {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl SessionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an item id; repeated ids are kept once.
    pub fn record(&mut self, item_id: impl Into<String>) -> bool {
        let item_id = item_id.into();
        if self.seen.insert(item_id.clone()) {
            self.order.push(item_id);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.seen.contains(item_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in presentation order
    pub fn ids(&self) -> &[String] {
        &self.order
    }
}

impl<S: Into<String>> FromIterator<S> for SessionRecord {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut record = SessionRecord::new();
        for id in iter {
            record.record(id);
        }
        record
    }
}
