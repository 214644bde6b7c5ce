//! Opponent-Process Regulator (C10): balances exploration/exploitation
//! and four other axes from read-only signals derived from C2, C5, C6.
//!
//! Other components may read opponent state; only this module writes it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    ExploreExploit,
    BreadthDepth,
    StabilityFlexibility,
    SpeedAccuracy,
    ApproachAvoid,
}

impl Axis {
    pub const ALL: [Axis; 5] = [
        Axis::ExploreExploit,
        Axis::BreadthDepth,
        Axis::StabilityFlexibility,
        Axis::SpeedAccuracy,
        Axis::ApproachAvoid,
    ];
}

/// `balance` is a weighted running mean bounded by its inputs; `stability`
/// is `1 - |delta balance|` smoothed over a window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OpponentPair {
    pub axis: Axis,
    pub balance: f32,
    pub stability: f32,
}

impl OpponentPair {
    #[must_use]
    pub const fn neutral(axis: Axis) -> Self {
        Self { axis, balance: 0.0, stability: 1.0 }
    }
}

/// Signals read from C2/C5/C6 at the end of a cycle, one per axis input.
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleSignals {
    pub pattern_diversity: f32,
    pub cycle_completion_success: f32,
    pub fatigue_trend: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct OpponentConfig {
    pub alpha: f32,
    pub stability_window: usize,
}

impl OpponentConfig {
    #[must_use]
    pub const fn human() -> Self {
        Self { alpha: 0.1, stability_window: 10 }
    }
}

impl Default for OpponentConfig {
    fn default() -> Self {
        Self::human()
    }
}

#[derive(Debug)]
pub struct OpponentRegulator {
    config: OpponentConfig,
    pairs: [OpponentPair; 5],
    recent_deltas: [std::collections::VecDeque<f32>; 5],
}

impl OpponentRegulator {
    #[must_use]
    pub fn new(config: OpponentConfig) -> Self {
        Self {
            config,
            pairs: Axis::ALL.map(OpponentPair::neutral),
            recent_deltas: Axis::ALL.map(|_| std::collections::VecDeque::new()),
        }
    }

    #[must_use]
    pub fn pairs(&self) -> &[OpponentPair; 5] {
        &self.pairs
    }

    /// Rebuilds a regulator from a snapshot's saved pairs (C9 restore).
    /// Stability windows start fresh; only the running balances persist.
    #[must_use]
    pub fn restore(config: OpponentConfig, pairs: Vec<OpponentPair>) -> Self {
        let mut regulator = Self::new(config);
        for pair in pairs {
            let idx = axis_index(pair.axis);
            regulator.pairs[idx] = pair;
        }
        regulator
    }

    #[must_use]
    pub fn get(&self, axis: Axis) -> OpponentPair {
        self.pairs[axis_index(axis)]
    }

    /// Updates every axis's balance from the cycle's observed signals.
    /// Each axis derives its raw input differently from the same three
    /// signals, per the axis's semantics.
    pub fn update_on_cycle_end(&mut self, signals: CycleSignals) {
        let raw_inputs = [
            signals.pattern_diversity * 2.0 - 1.0,
            signals.pattern_diversity - signals.cycle_completion_success,
            1.0 - signals.fatigue_trend.abs() * 2.0,
            signals.cycle_completion_success * 2.0 - 1.0,
            -signals.fatigue_trend,
        ];

        for (i, raw) in raw_inputs.into_iter().enumerate() {
            let bounded = raw.clamp(-1.0, 1.0);
            let pair = &mut self.pairs[i];
            let previous_balance = pair.balance;
            pair.balance = (pair.balance * (1.0 - self.config.alpha) + bounded * self.config.alpha).clamp(-1.0, 1.0);

            let delta = (pair.balance - previous_balance).abs();
            let window = &mut self.recent_deltas[i];
            window.push_back(delta);
            if window.len() > self.config.stability_window {
                window.pop_front();
            }
            let mean_delta: f32 = window.iter().sum::<f32>() / window.len() as f32;
            pair.stability = (1.0 - mean_delta).clamp(0.0, 1.0);
        }
    }
}

fn axis_index(axis: Axis) -> usize {
    Axis::ALL.iter().position(|a| *a == axis).expect("Axis::ALL is exhaustive")
}
