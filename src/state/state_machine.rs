use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{SessionEntity, SessionStatus};

/// Lifecycle phases of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Lobby: participants join, the host generates questions.
    Waiting,
    /// Questions are being played; `question_index` is the current one.
    Playing {
        /// Zero-based index of the current question.
        question_index: usize,
    },
    /// Terminal phase.
    Finished,
}

impl SessionPhase {
    /// Persisted status matching this phase.
    pub fn status(self) -> SessionStatus {
        match self {
            SessionPhase::Waiting => SessionStatus::Waiting,
            SessionPhase::Playing { .. } => SessionStatus::Playing,
            SessionPhase::Finished => SessionStatus::Finished,
        }
    }
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host starts the quiz from the lobby.
    Start,
    /// Move past the current question. `question_count` is the size of the question set.
    Advance {
        /// Number of questions stored for the session.
        question_count: usize,
    },
    /// Host stops the quiz early.
    Terminate,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
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
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the session is currently in.
    pub from: SessionPhase,
    /// Phase the session will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version the session must still have in storage for the plan to be committed.
    pub version_expected: u64,
    /// Version number after applying this transition.
    pub version_next: u64,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Per-session state machine rebuilt from the persisted session row.
///
/// The persisted `version` doubles as the optimistic concurrency token: a plan is only
/// committed when storage still holds `version_expected`.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: u64,
    pending: Option<Plan>,
}

impl SessionStateMachine {
    /// Rebuild the machine from a stored session.
    pub fn from_session(session: &SessionEntity) -> Self {
        let phase = match session.status {
            SessionStatus::Waiting => SessionPhase::Waiting,
            SessionStatus::Playing => SessionPhase::Playing {
                question_index: session.current_question_index,
            },
            SessionStatus::Finished => SessionPhase::Finished,
        };
        Self {
            phase,
            version: session.version,
            pending: None,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current version number.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
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
            version_expected: self.version,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition once it has been persisted.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;

        Ok(self.phase)
    }

    /// Drop the pending plan, e.g. when persisting it lost a race.
    pub fn abort(&mut self) {
        self.pending = None;
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Waiting, SessionEvent::Start) => {
                SessionPhase::Playing { question_index: 0 }
            }
            (
                SessionPhase::Playing { question_index },
                SessionEvent::Advance { question_count },
            ) => {
                let next_index = question_index + 1;
                if next_index >= question_count {
                    SessionPhase::Finished
                } else {
                    SessionPhase::Playing {
                        question_index: next_index,
                    }
                }
            }
            (SessionPhase::Waiting | SessionPhase::Playing { .. }, SessionEvent::Terminate) => {
                SessionPhase::Finished
            }
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::state::settings::PartialQuizSettings;

    fn waiting_session() -> SessionEntity {
        let now = SystemTime::now();
        SessionEntity {
            id: Uuid::new_v4(),
            room_code: "ABC123".into(),
            host_id: "host".into(),
            playlist_id: Uuid::new_v4(),
            status: SessionStatus::Waiting,
            current_question_index: 0,
            settings: PartialQuizSettings::default().apply_defaults(),
            version: 0,
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
            stage_started_at: None,
        }
    }

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn new_session_is_waiting() {
        let sm = SessionStateMachine::from_session(&waiting_session());
        assert_eq!(sm.phase(), SessionPhase::Waiting);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn advance_walks_questions_then_finishes() {
        let mut sm = SessionStateMachine::from_session(&waiting_session());
        let advance = SessionEvent::Advance { question_count: 3 };

        assert_eq!(
            apply(&mut sm, SessionEvent::Start),
            SessionPhase::Playing { question_index: 0 }
        );
        assert_eq!(
            apply(&mut sm, advance),
            SessionPhase::Playing { question_index: 1 }
        );
        assert_eq!(
            apply(&mut sm, advance),
            SessionPhase::Playing { question_index: 2 }
        );
        assert_eq!(apply(&mut sm, advance), SessionPhase::Finished);
        assert_eq!(sm.version(), 4);
    }

    #[test]
    fn playing_session_is_rebuilt_at_its_index() {
        let mut session = waiting_session();
        session.status = SessionStatus::Playing;
        session.current_question_index = 4;
        session.version = 7;

        let mut sm = SessionStateMachine::from_session(&session);
        let plan = sm
            .plan(SessionEvent::Advance { question_count: 10 })
            .unwrap();
        assert_eq!(plan.version_expected, 7);
        assert_eq!(plan.version_next, 8);
        assert_eq!(plan.to, SessionPhase::Playing { question_index: 5 });
    }

    #[test]
    fn terminate_from_waiting_and_playing() {
        let mut sm = SessionStateMachine::from_session(&waiting_session());
        assert_eq!(apply(&mut sm, SessionEvent::Terminate), SessionPhase::Finished);

        let mut sm = SessionStateMachine::from_session(&waiting_session());
        apply(&mut sm, SessionEvent::Start);
        assert_eq!(apply(&mut sm, SessionEvent::Terminate), SessionPhase::Finished);
    }

    #[test]
    fn finished_is_terminal() {
        let mut sm = SessionStateMachine::from_session(&waiting_session());
        apply(&mut sm, SessionEvent::Terminate);

        for event in [
            SessionEvent::Start,
            SessionEvent::Advance { question_count: 5 },
            SessionEvent::Terminate,
        ] {
            match sm.plan(event).unwrap_err() {
                PlanError::InvalidTransition(invalid) => {
                    assert_eq!(invalid.from, SessionPhase::Finished);
                    assert_eq!(invalid.event, event);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn cannot_start_twice_or_advance_in_lobby() {
        let mut sm = SessionStateMachine::from_session(&waiting_session());
        assert!(matches!(
            sm.plan(SessionEvent::Advance { question_count: 2 }),
            Err(PlanError::InvalidTransition(_))
        ));

        apply(&mut sm, SessionEvent::Start);
        assert!(matches!(
            sm.plan(SessionEvent::Start),
            Err(PlanError::InvalidTransition(_))
        ));
    }

    #[test]
    fn pending_plan_blocks_new_plans_until_aborted() {
        let mut sm = SessionStateMachine::from_session(&waiting_session());
        let plan = sm.plan(SessionEvent::Start).unwrap();
        assert_eq!(
            sm.plan(SessionEvent::Terminate).unwrap_err(),
            PlanError::AlreadyPending
        );

        sm.abort();
        assert_eq!(sm.apply(plan.id).unwrap_err(), ApplyError::NoPending);
        assert_eq!(sm.phase(), SessionPhase::Waiting);
    }
}
