//! Run state machine. Pure: callers persist the returned state.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{RunState, RunStatus, Stage};

/// Something that happened to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunEvent {
    /// The current stage finished; move to the next one.
    StageSucceeded,
    /// Operator moves the run forward to a specific stage.
    Advance(Stage),
    /// Force DONE/COMPLETED.
    Complete,
    /// Force ERROR/FAILED.
    Fail,
    /// Reset to EXTRACTION/RUNNING.
    Retry,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Run is not running (stage {stage}, status {status})")]
    NotRunning { stage: Stage, status: RunStatus },

    #[error("Cannot move run from {from} to {to}")]
    InvalidTransition { from: Stage, to: Stage },
}

pub fn transition(state: RunState, event: RunEvent) -> Result<RunState, TransitionError> {
    match event {
        RunEvent::StageSucceeded => {
            require_running(state)?;
            let next = state.stage.next().ok_or(TransitionError::InvalidTransition {
                from: state.stage,
                to: state.stage,
            })?;
            Ok(RunState::at(next))
        }
        RunEvent::Advance(target) => {
            require_running(state)?;
            if target == Stage::Error || target.ordinal() <= state.stage.ordinal() {
                return Err(TransitionError::InvalidTransition {
                    from: state.stage,
                    to: target,
                });
            }
            Ok(RunState::at(target))
        }
        RunEvent::Complete => Ok(RunState::at(Stage::Done)),
        RunEvent::Fail => Ok(RunState::at(Stage::Error)),
        RunEvent::Retry => Ok(RunState::INITIAL),
    }
}

fn require_running(state: RunState) -> Result<(), TransitionError> {
    if state.status != RunStatus::Running || state.stage.is_terminal() {
        return Err(TransitionError::NotRunning {
            stage: state.stage,
            status: state.status,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(stage: Stage) -> RunState {
        RunState::at(stage)
    }

    #[test]
    fn stage_success_walks_forward_to_done() {
        let mut state = RunState::INITIAL;
        let mut seen = vec![state.stage];
        while state.status == RunStatus::Running {
            state = transition(state, RunEvent::StageSucceeded).unwrap();
            seen.push(state.stage);
        }
        assert_eq!(
            seen,
            vec![Stage::Extraction, Stage::Normalization, Stage::Prescription, Stage::Done]
        );
        assert_eq!(state.status, RunStatus::Completed);
    }

    #[test]
    fn status_always_matches_stage() {
        let events = [
            RunEvent::StageSucceeded,
            RunEvent::Advance(Stage::Done),
            RunEvent::Complete,
            RunEvent::Fail,
            RunEvent::Retry,
        ];
        let stages = [
            Stage::Extraction,
            Stage::Normalization,
            Stage::Prescription,
            Stage::Done,
            Stage::Error,
        ];
        for stage in stages {
            for event in events {
                if let Ok(next) = transition(RunState::at(stage), event) {
                    assert_eq!(next, RunState::at(next.stage));
                }
            }
        }
    }

    #[test]
    fn success_on_terminal_run_is_rejected() {
        for stage in [Stage::Done, Stage::Error] {
            let err = transition(RunState::at(stage), RunEvent::StageSucceeded).unwrap_err();
            assert!(matches!(err, TransitionError::NotRunning { .. }));
        }
    }

    #[test]
    fn advance_requires_running() {
        let err = transition(RunState::at(Stage::Done), RunEvent::Advance(Stage::Done)).unwrap_err();
        assert!(matches!(err, TransitionError::NotRunning { .. }));
        let err =
            transition(RunState::at(Stage::Error), RunEvent::Advance(Stage::Normalization)).unwrap_err();
        assert!(matches!(err, TransitionError::NotRunning { .. }));
    }

    #[test]
    fn advance_only_moves_forward() {
        let next = transition(running(Stage::Extraction), RunEvent::Advance(Stage::Prescription)).unwrap();
        assert_eq!(next.stage, Stage::Prescription);
        assert_eq!(next.status, RunStatus::Running);

        let back = transition(running(Stage::Prescription), RunEvent::Advance(Stage::Extraction));
        assert!(matches!(back, Err(TransitionError::InvalidTransition { .. })));
        let same = transition(running(Stage::Normalization), RunEvent::Advance(Stage::Normalization));
        assert!(matches!(same, Err(TransitionError::InvalidTransition { .. })));
        let to_error = transition(running(Stage::Normalization), RunEvent::Advance(Stage::Error));
        assert!(matches!(to_error, Err(TransitionError::InvalidTransition { .. })));
    }

    #[test]
    fn advance_to_done_completes() {
        let next = transition(running(Stage::Normalization), RunEvent::Advance(Stage::Done)).unwrap();
        assert_eq!(next.status, RunStatus::Completed);
    }

    #[test]
    fn forced_events_apply_from_any_state() {
        for stage in [Stage::Extraction, Stage::Prescription, Stage::Done, Stage::Error] {
            let state = RunState::at(stage);
            assert_eq!(transition(state, RunEvent::Fail).unwrap(), RunState::at(Stage::Error));
            assert_eq!(transition(state, RunEvent::Complete).unwrap(), RunState::at(Stage::Done));
            assert_eq!(transition(state, RunEvent::Retry).unwrap(), RunState::INITIAL);
        }
    }
}
