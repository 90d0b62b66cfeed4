use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of the quiz. Question numbers are 1-based positions in the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    /// Participants can register; no question is active yet.
    Registration,
    /// A question is open and participants may submit one prediction each.
    Question {
        /// 1-based position of the active question in the bank.
        number: usize,
    },
    /// Predictions for the question have been scored and results are displayed.
    Results {
        /// 1-based position of the scored question in the bank.
        number: usize,
    },
    /// Every question has been played; the final standings are displayed.
    Final,
}

impl QuizPhase {
    /// Question number attached to the phase, if any.
    pub fn question_number(&self) -> Option<usize> {
        match self {
            QuizPhase::Question { number } | QuizPhase::Results { number } => Some(*number),
            QuizPhase::Registration | QuizPhase::Final => None,
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizEvent {
    /// Admin opens the first question.
    StartQuiz,
    /// Admin closes the active question and scores predictions.
    ShowResults,
    /// Admin opens the following question after results.
    NextQuestion,
    /// Admin moves to the final standings after the last question.
    Finish,
    /// Admin wipes the game and returns to registration.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: QuizPhase,
    /// The event that cannot be applied from this phase.
    pub event: QuizEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: QuizPhase,
        /// Current phase.
        actual: QuizPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: QuizPhase,
    /// Phase the state machine will transition to.
    pub to: QuizPhase,
    /// Event that triggered this transition.
    pub event: QuizEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: QuizPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<QuizPhase>,
}

/// State machine driving the quiz rounds.
///
/// The number of questions is fixed at construction so that `NextQuestion` and
/// `Finish` can be guarded without consulting the question bank.
#[derive(Debug, Clone)]
pub struct GameStateMachine {
    phase: QuizPhase,
    version: usize,
    question_count: usize,
    pending: Option<Plan>,
}

impl GameStateMachine {
    /// Create a new state machine in the registration phase.
    pub fn new(question_count: usize) -> Self {
        Self {
            phase: QuizPhase::Registration,
            version: 0,
            question_count,
            pending: None,
        }
    }

    /// Rebuild a state machine from a persisted phase and version.
    ///
    /// Phases referencing a question outside the bank are clamped back to registration.
    pub fn restore(question_count: usize, phase: QuizPhase, version: usize) -> Self {
        let phase = match phase.question_number() {
            Some(number) if number == 0 || number > question_count => QuizPhase::Registration,
            _ => phase,
        };

        Self {
            phase,
            version,
            question_count,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    /// Number of questions the machine was configured with.
    pub fn question_count(&self) -> usize {
        self.question_count
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: QuizEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<QuizPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: QuizEvent) -> Result<QuizPhase, InvalidTransition> {
        let count = self.question_count;
        let next = match (self.phase, event) {
            (QuizPhase::Registration, QuizEvent::StartQuiz) if count > 0 => {
                QuizPhase::Question { number: 1 }
            }
            (QuizPhase::Question { number }, QuizEvent::ShowResults) => {
                QuizPhase::Results { number }
            }
            (QuizPhase::Results { number }, QuizEvent::NextQuestion) if number < count => {
                QuizPhase::Question { number: number + 1 }
            }
            (QuizPhase::Results { number }, QuizEvent::Finish) if number >= count => {
                QuizPhase::Final
            }
            (_, QuizEvent::Reset) => QuizPhase::Registration,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
