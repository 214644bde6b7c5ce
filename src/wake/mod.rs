//! Wake/Rest Controller (C5): a fatigue accumulator gating the scheduler
//! (C6) through a small state machine.
//!
//! Permitted transitions are exactly: Awake→Tiring; Tiring→Resting;
//! Resting→{Dreaming, Awake}; Dreaming→Waking; Waking→Awake. Any other
//! transition is a fault (`WakeError::InvalidTransition`).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeState {
    Awake,
    Tiring,
    Resting,
    Dreaming,
    Waking,
}

impl std::fmt::Display for WakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Awake => write!(f, "awake"),
            Self::Tiring => write!(f, "tiring"),
            Self::Resting => write!(f, "resting"),
            Self::Dreaming => write!(f, "dreaming"),
            Self::Waking => write!(f, "waking"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WakeError {
    #[error("invalid wake-state transition: {from} -> {to}")]
    InvalidTransition { from: WakeState, to: WakeState },
}

#[derive(Debug, Clone, Copy)]
pub struct WakeConfig {
    pub fatigue_high: f32,
    pub fatigue_low: f32,
    pub min_rest_before_dream: Duration,
    pub k_up: f32,
    pub k_down: f32,
}

impl WakeConfig {
    #[must_use]
    pub const fn human() -> Self {
        Self {
            fatigue_high: 0.8,
            fatigue_low: 0.2,
            min_rest_before_dream: Duration::from_secs(60),
            k_up: 0.001,
            k_down: 0.01,
        }
    }

    #[must_use]
    pub const fn fast_test() -> Self {
        Self {
            fatigue_high: 0.8,
            fatigue_low: 0.2,
            min_rest_before_dream: Duration::from_millis(10),
            k_up: 0.1,
            k_down: 0.2,
        }
    }
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self::human()
    }
}

/// A read-only snapshot exposed to observers (`currentState`, `fatigue`,
/// `timeInState`).
#[derive(Debug, Clone, Copy)]
pub struct WakeSnapshot {
    pub state: WakeState,
    pub fatigue: f32,
    pub time_in_state: Duration,
}

/// Owns the fatigue scalar and the wake-state machine. Nothing outside
/// this module mutates `state` or `fatigue` directly.
#[derive(Debug)]
pub struct WakeController {
    config: WakeConfig,
    state: WakeState,
    fatigue: f32,
    time_in_state: Duration,
    rest_accumulated: Duration,
}

impl WakeController {
    #[must_use]
    pub fn new(config: WakeConfig) -> Self {
        Self {
            config,
            state: WakeState::Awake,
            fatigue: 0.0,
            time_in_state: Duration::ZERO,
            rest_accumulated: Duration::ZERO,
        }
    }

    /// Rebuilds a controller from a snapshot's saved state and fatigue
    /// (C9 restore). A restored controller always starts `Awake`
    /// regardless of the saved state: a process restart is itself a
    /// waking event, so mid-rest or mid-dream state is not resumable.
    #[must_use]
    pub fn restore(config: WakeConfig, fatigue: f32) -> Self {
        Self {
            config,
            state: WakeState::Awake,
            fatigue: fatigue.clamp(0.0, 1.0),
            time_in_state: Duration::ZERO,
            rest_accumulated: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> WakeSnapshot {
        WakeSnapshot {
            state: self.state,
            fatigue: self.fatigue,
            time_in_state: self.time_in_state,
        }
    }

    #[must_use]
    pub fn state(&self) -> WakeState {
        self.state
    }

    #[must_use]
    pub fn fatigue(&self) -> f32 {
        self.fatigue
    }

    /// Advances fatigue for one tick of `dt` given the current cognitive
    /// `load` (only meaningful while `Awake`).
    pub fn tick(&mut self, dt: Duration, load: f32) {
        self.time_in_state += dt;
        match self.state {
            WakeState::Awake => {
                self.fatigue = (self.fatigue + self.config.k_up * load * dt.as_secs_f32()).clamp(0.0, 1.0);
            }
            WakeState::Resting | WakeState::Dreaming => {
                self.fatigue = (self.fatigue - self.config.k_down * dt.as_secs_f32()).clamp(0.0, 1.0);
                if self.state == WakeState::Resting {
                    self.rest_accumulated += dt;
                }
            }
            WakeState::Tiring | WakeState::Waking => {}
        }
    }

    /// Whether the gate permits C6 to run a step this boundary. Awake
    /// always may; other states may not (they gate the scheduler off).
    #[must_use]
    pub fn is_runnable(&self) -> bool {
        matches!(self.state, WakeState::Awake)
    }

    fn transition(&mut self, to: WakeState) -> Result<(), WakeError> {
        let allowed = matches!(
            (self.state, to),
            (WakeState::Awake, WakeState::Tiring)
                | (WakeState::Tiring, WakeState::Resting)
                | (WakeState::Resting, WakeState::Dreaming)
                | (WakeState::Resting, WakeState::Awake)
                | (WakeState::Dreaming, WakeState::Waking)
                | (WakeState::Waking, WakeState::Awake)
        );
        if !allowed {
            return Err(WakeError::InvalidTransition { from: self.state, to });
        }
        self.state = to;
        self.time_in_state = Duration::ZERO;
        if to != WakeState::Resting {
            self.rest_accumulated = Duration::ZERO;
        }
        Ok(())
    }

    /// Called by C6 at a step boundary: if fatigue has crossed the high
    /// watermark, begins the Awake -> Tiring transition.
    pub fn maybe_begin_tiring(&mut self) -> Result<bool, WakeError> {
        if self.state == WakeState::Awake && self.fatigue >= self.config.fatigue_high {
            self.transition(WakeState::Tiring)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Called once the in-flight C6 step has fully completed; the
    /// controller never preempts mid-step.
    pub fn complete_tiring_to_resting(&mut self) -> Result<(), WakeError> {
        if self.state == WakeState::Tiring {
            self.transition(WakeState::Resting)?;
        }
        Ok(())
    }

    /// Whether enough rest has accumulated and the consolidator's single
    /// lock can be acquired (caller supplies `consolidator_available`).
    #[must_use]
    pub fn ready_to_dream(&self, consolidator_available: bool) -> bool {
        self.state == WakeState::Resting
            && self.rest_accumulated >= self.config.min_rest_before_dream
            && consolidator_available
    }

    pub fn begin_dreaming(&mut self) -> Result<(), WakeError> {
        self.transition(WakeState::Dreaming)
    }

    pub fn dream_completed(&mut self) -> Result<(), WakeError> {
        self.transition(WakeState::Waking)
    }

    /// Direct Resting -> Awake path when no consolidation was needed.
    pub fn skip_dream_if_rested(&mut self) -> Result<bool, WakeError> {
        if self.state == WakeState::Resting && self.fatigue <= self.config.fatigue_low {
            self.transition(WakeState::Awake)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Called once all C6 workers have observed the new gate.
    pub fn finish_waking(&mut self) -> Result<(), WakeError> {
        self.transition(WakeState::Awake)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_applies_saved_fatigue_and_resets_to_awake() {
        let controller = WakeController::restore(WakeConfig::fast_test(), 0.6);
        assert_eq!(controller.state(), WakeState::Awake);
        assert!((controller.fatigue() - 0.6).abs() < f32::EPSILON);
    }

    #[test]
    fn fatigue_increases_while_awake_and_decreases_while_resting() {
        let mut controller = WakeController::new(WakeConfig::fast_test());
        controller.tick(Duration::from_secs(1), 1.0);
        assert!(controller.fatigue() > 0.0);

        controller.fatigue = 0.5;
        controller.state = WakeState::Resting;
        let before = controller.fatigue();
        controller.tick(Duration::from_secs(1), 0.0);
        assert!(controller.fatigue() < before);
    }

    #[test]
    fn full_transition_cycle_follows_the_permitted_path() {
        let mut controller = WakeController::new(WakeConfig::fast_test());
        controller.fatigue = 0.9;
        assert!(controller.maybe_begin_tiring().unwrap());
        assert_eq!(controller.state(), WakeState::Tiring);

        controller.complete_tiring_to_resting().unwrap();
        assert_eq!(controller.state(), WakeState::Resting);

        controller.rest_accumulated = Duration::from_secs(100);
        assert!(controller.ready_to_dream(true));

        controller.begin_dreaming().unwrap();
        assert_eq!(controller.state(), WakeState::Dreaming);

        controller.dream_completed().unwrap();
        assert_eq!(controller.state(), WakeState::Waking);

        controller.finish_waking().unwrap();
        assert_eq!(controller.state(), WakeState::Awake);
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let mut controller = WakeController::new(WakeConfig::fast_test());
        let err = controller.transition(WakeState::Dreaming).unwrap_err();
        assert!(matches!(err, WakeError::InvalidTransition { .. }));
    }

    #[test]
    fn resting_can_skip_directly_to_awake_when_fatigue_is_low() {
        let mut controller = WakeController::new(WakeConfig::fast_test());
        controller.state = WakeState::Resting;
        controller.fatigue = 0.1;
        assert!(controller.skip_dream_if_rested().unwrap());
        assert_eq!(controller.state(), WakeState::Awake);
    }

    #[test]
    fn gate_only_permits_running_while_awake() {
        let mut controller = WakeController::new(WakeConfig::fast_test());
        assert!(controller.is_runnable());
        controller.state = WakeState::Resting;
        assert!(!controller.is_runnable());
    }
}
