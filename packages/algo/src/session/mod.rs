//! Adaptive Practice Session
//!
//! Per-skill session state machine:
//!
//! ```text
//! AwaitingAnswer --submit--> Grading --update--> SelectingNext --+--> AwaitingAnswer
//!                                                               +--> Complete
//! ```
//!
//! A session completes when mastery reaches the threshold after the minimum
//! number of graded attempts, or when the pool has no unseen items left.
//! The [`MasteryState`] outlives the session; the [`SessionRecord`] does not.

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::estimator;
use crate::selection::{select_next, DifficultyBands, TieBreaker};
use crate::types::{
    BktParameters, Item, MasteryState, SessionRecord, DEFAULT_MASTERY_THRESHOLD,
    DEFAULT_MIN_ATTEMPTS,
};

// ==================== Configuration ====================

/// Termination and selection policy
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Mastery at which the skill counts as mastered
    pub mastery_threshold: f64,
    /// Graded attempts (`opportunity_count`) required before mastery can end a session
    pub min_attempts: u32,
    pub bands: DifficultyBands,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mastery_threshold: DEFAULT_MASTERY_THRESHOLD,
            min_attempts: DEFAULT_MIN_ATTEMPTS,
            bands: DifficultyBands::default(),
        }
    }
}

impl SessionConfig {
    pub fn is_mastered(&self, state: &MasteryState) -> bool {
        state.estimated_mastery >= self.mastery_threshold
            && state.opportunity_count >= self.min_attempts
    }
}

// ==================== Outcomes ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// Mastery threshold reached with the attempt floor met
    Mastered,
    /// No unseen items remain (includes an empty pool)
    PoolExhausted,
}

impl CompletionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompletionReason::Mastered => "mastered",
            CompletionReason::PoolExhausted => "pool_exhausted",
        }
    }
}

/// What the student sees next
#[derive(Clone, Debug, PartialEq)]
pub enum NextStep<'a> {
    Item(&'a Item),
    Complete(CompletionReason),
}

/// The SelectingNext decision shared by in-process sessions and the service layer.
pub fn decide_next<'a, T>(
    pool: &'a [Item],
    state: &MasteryState,
    record: &SessionRecord,
    config: &SessionConfig,
    tie_breaker: &mut T,
) -> NextStep<'a>
where
    T: TieBreaker + ?Sized,
{
    if config.is_mastered(state) {
        return NextStep::Complete(CompletionReason::Mastered);
    }
    match select_next(pool, state.estimated_mastery, record, &config.bands, tie_breaker) {
        Some(item) => NextStep::Item(item),
        None => NextStep::Complete(CompletionReason::PoolExhausted),
    }
}

// ==================== State Machine ====================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingAnswer,
    Grading,
    SelectingNext,
    Complete(CompletionReason),
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::AwaitingAnswer => "awaiting_answer",
            SessionPhase::Grading => "grading",
            SessionPhase::SelectingNext => "selecting_next",
            SessionPhase::Complete(_) => "complete",
        }
    }
}

/// Result of one answered item
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub item_id: String,
    pub is_correct: bool,
    pub mastery: MasteryState,
    /// Next item, or `None` when the session completed
    pub next_item: Option<Item>,
    pub completion: Option<CompletionReason>,
}

/// One practice session over one skill's item pool
pub struct AdaptiveSession<T: TieBreaker> {
    pool: Vec<Item>,
    params: BktParameters,
    config: SessionConfig,
    mastery: MasteryState,
    record: SessionRecord,
    phase: SessionPhase,
    current: Option<Item>,
    tie_breaker: T,
}

impl<T: TieBreaker> AdaptiveSession<T> {
    /// Start a session. `mastery` is the durable state carried over from
    /// earlier sessions; `None` means first contact with the skill.
    pub fn start(
        pool: Vec<Item>,
        params: BktParameters,
        mastery: Option<MasteryState>,
        config: SessionConfig,
        tie_breaker: T,
        now_ms: i64,
    ) -> Result<Self, SessionError> {
        let mastery = mastery.unwrap_or_else(|| MasteryState::initial(&params, now_ms));
        mastery.validate()?;

        let mut session = Self {
            pool,
            params,
            config,
            mastery,
            record: SessionRecord::new(),
            phase: SessionPhase::SelectingNext,
            current: None,
            tie_breaker,
        };
        session.select();
        Ok(session)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.current.as_ref()
    }

    pub fn mastery(&self) -> &MasteryState {
        &self.mastery
    }

    pub fn record(&self) -> &SessionRecord {
        &self.record
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.phase, SessionPhase::Complete(_))
    }

    /// Grade a raw answer against the presented item.
    pub fn submit_answer(&mut self, answer: &str, now_ms: i64) -> Result<StepOutcome, SessionError> {
        let item = self.require_current()?;
        let is_correct = item.grade(answer);
        self.submit_graded(is_correct, now_ms)
    }

    /// Record an already graded answer for the presented item.
    pub fn submit_graded(&mut self, is_correct: bool, now_ms: i64) -> Result<StepOutcome, SessionError> {
        let item_id = self.require_current()?.id.clone();

        // Nothing is mutated until the estimator has succeeded.
        let next_mastery = estimator::apply(&self.mastery, is_correct, &self.params, now_ms)?;

        self.phase = SessionPhase::Grading;
        self.mastery = next_mastery;
        self.record.record(item_id.clone());
        self.current = None;

        self.phase = SessionPhase::SelectingNext;
        self.select();

        Ok(StepOutcome {
            item_id,
            is_correct,
            mastery: self.mastery.clone(),
            next_item: self.current.clone(),
            completion: match self.phase {
                SessionPhase::Complete(reason) => Some(reason),
                _ => None,
            },
        })
    }

    fn require_current(&self) -> Result<&Item, SessionError> {
        match (&self.phase, &self.current) {
            (SessionPhase::AwaitingAnswer, Some(item)) => Ok(item),
            (phase, _) => Err(SessionError::NotAwaitingAnswer {
                phase: phase.as_str(),
            }),
        }
    }

    fn select(&mut self) {
        let next = decide_next(
            &self.pool,
            &self.mastery,
            &self.record,
            &self.config,
            &mut self.tie_breaker,
        );
        match next {
            NextStep::Item(item) => {
                self.current = Some(item.clone());
                self.phase = SessionPhase::AwaitingAnswer;
            }
            NextStep::Complete(reason) => {
                self.current = None;
                self.phase = SessionPhase::Complete(reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BktError;
    use crate::selection::{LowestIdTieBreaker, RandomTieBreaker};
    use crate::types::Difficulty;

    fn pool(n: usize) -> Vec<Item> {
        (0..n)
            .map(|i| {
                let difficulty = match i % 3 {
                    0 => Difficulty::Easy,
                    1 => Difficulty::Medium,
                    _ => Difficulty::Hard,
                };
                Item::new(format!("q{i:02}"), difficulty, format!("answer-{i}"))
            })
            .collect()
    }

    fn worked_params() -> BktParameters {
        BktParameters::new(0.1, 0.3, 0.25, 0.1).unwrap()
    }

    #[test]
    fn test_empty_pool_completes_immediately() {
        let session = AdaptiveSession::start(
            Vec::new(),
            worked_params(),
            None,
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();
        assert_eq!(
            session.phase(),
            SessionPhase::Complete(CompletionReason::PoolExhausted)
        );
        assert!(session.current_item().is_none());
    }

    #[test]
    fn test_start_awaits_answer_with_prior_mastery() {
        let session = AdaptiveSession::start(
            pool(6),
            worked_params(),
            None,
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();
        assert_eq!(session.phase(), SessionPhase::AwaitingAnswer);
        assert_eq!(session.mastery().estimated_mastery, 0.1);
        assert_eq!(session.current_item().unwrap().difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_attempt_floor_delays_completion() {
        let mut session = AdaptiveSession::start(
            pool(20),
            worked_params(),
            None,
            SessionConfig::default(),
            RandomTieBreaker::seeded(5),
            0,
        )
        .unwrap();

        let mut answered = 0;
        while !session.is_complete() {
            let outcome = session.submit_graded(true, answered).unwrap();
            answered += 1;
            if answered < DEFAULT_MIN_ATTEMPTS as i64 {
                assert!(outcome.completion.is_none());
                assert!(outcome.mastery.estimated_mastery > 0.8 || answered < 2);
            }
        }

        assert_eq!(answered, DEFAULT_MIN_ATTEMPTS as i64);
        assert_eq!(
            session.phase(),
            SessionPhase::Complete(CompletionReason::Mastered)
        );
    }

    #[test]
    fn test_pool_exhaustion_completes_session() {
        let mut session = AdaptiveSession::start(
            pool(3),
            worked_params(),
            None,
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();

        for i in 0..3 {
            let outcome = session.submit_graded(false, i).unwrap();
            if i < 2 {
                assert!(outcome.next_item.is_some());
            } else {
                assert_eq!(outcome.completion, Some(CompletionReason::PoolExhausted));
            }
        }
        assert_eq!(session.record().len(), 3);
        assert_eq!(session.mastery().opportunity_count, 3);
    }

    #[test]
    fn test_items_never_repeat_within_session() {
        let mut session = AdaptiveSession::start(
            pool(9),
            worked_params(),
            None,
            SessionConfig {
                min_attempts: 100,
                ..SessionConfig::default()
            },
            RandomTieBreaker::seeded(99),
            0,
        )
        .unwrap();

        let mut ids = Vec::new();
        while let Some(item) = session.current_item() {
            ids.push(item.id.clone());
            let answer = item.correct_answer.clone();
            session.submit_answer(&answer, 0).unwrap();
        }
        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn test_submit_answer_grades_against_item() {
        let mut session = AdaptiveSession::start(
            pool(4),
            worked_params(),
            None,
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();

        let outcome = session.submit_answer("definitely wrong", 10).unwrap();
        assert!(!outcome.is_correct);
        assert_eq!(outcome.item_id, "q00");
        assert_eq!(outcome.mastery.last_updated, 10);
    }

    #[test]
    fn test_submit_after_completion_is_rejected() {
        let mut session = AdaptiveSession::start(
            Vec::new(),
            worked_params(),
            None,
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();
        assert_eq!(
            session.submit_graded(true, 1),
            Err(SessionError::NotAwaitingAnswer { phase: "complete" })
        );
    }

    #[test]
    fn test_carried_mastery_can_complete_at_start() {
        let carried = MasteryState {
            estimated_mastery: 0.93,
            opportunity_count: 12,
            last_updated: 0,
        };
        let session = AdaptiveSession::start(
            pool(5),
            worked_params(),
            Some(carried),
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        )
        .unwrap();
        assert_eq!(
            session.phase(),
            SessionPhase::Complete(CompletionReason::Mastered)
        );
    }

    #[test]
    fn test_corrupted_carried_state_is_rejected() {
        let carried = MasteryState {
            estimated_mastery: 1.7,
            opportunity_count: 2,
            last_updated: 0,
        };
        let result = AdaptiveSession::start(
            pool(5),
            worked_params(),
            Some(carried),
            SessionConfig::default(),
            LowestIdTieBreaker,
            0,
        );
        assert!(matches!(
            result,
            Err(SessionError::Estimator(BktError::InvalidState { .. }))
        ));
    }
}
