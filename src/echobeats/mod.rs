//! Echobeats Scheduler (C6): drives the 12-step, 3-stream cycle.
//!
//! Owns no long-term state itself; it is handed mutable borrows of C2, C3
//! and C5 for the duration of a cycle and orchestrates calls into C7.
//! Everything else (rest/dream handoff, snapshotting, job dispatch) lives
//! one layer up, in the process that constructs the scheduler.

mod schedule;

pub use schedule::streams_for_step;

use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::clock::Context;
use crate::core::types::{InferenceRequest, StreamId, ThoughtSource, ThoughtType, Thought, StepType};
use crate::engine::{EngineError, InferenceEngine};
use crate::episodic::{EpisodicBuffer, EpisodicMemory};
use crate::identity::Identity;
use crate::memory::{MemoryStore, NodeKind};
use crate::wake::WakeController;

/// Default token budget per step request; the reference `MockEngine`
/// treats this as an upper bound, not a target.
const DEFAULT_MAX_TOKENS: u32 = 64;

/// Load published to C5 per completed step, before scaling by the
/// fraction of the token budget actually produced.
const BASE_LOAD_PER_STEP: f32 = 0.01;

#[derive(Debug, Clone, Copy)]
pub struct EchobeatsConfig {
    pub cycle_deadline: Duration,
    pub step_deadline: Duration,
    pub consolidation_threshold: f32,
    pub rhythm_enabled: bool,
}

impl EchobeatsConfig {
    #[must_use]
    pub const fn human() -> Self {
        Self {
            cycle_deadline: Duration::from_secs(5),
            step_deadline: Duration::from_millis(400),
            consolidation_threshold: 0.6,
            rhythm_enabled: true,
        }
    }

    #[must_use]
    pub const fn fast_test() -> Self {
        Self {
            cycle_deadline: Duration::from_millis(500),
            step_deadline: Duration::from_millis(50),
            consolidation_threshold: 0.6,
            rhythm_enabled: false,
        }
    }
}

impl Default for EchobeatsConfig {
    fn default() -> Self {
        Self::human()
    }
}

/// Adaptive-rhythm phase: modulates the inter-step period without
/// affecting the 12-step ordering itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RhythmPhase {
    Focus,
    Explore,
    Integrate,
    Rest,
}

impl RhythmPhase {
    /// Multiplicative factor applied to the base inter-step period, in
    /// `[0.5, 3.0]`.
    #[must_use]
    pub const fn period_multiplier(self) -> f32 {
        match self {
            Self::Focus => 0.5,
            Self::Explore => 1.0,
            Self::Integrate => 1.5,
            Self::Rest => 3.0,
        }
    }

    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Focus => Self::Explore,
            Self::Explore => Self::Integrate,
            Self::Integrate => Self::Rest,
            Self::Rest => Self::Focus,
        }
    }
}

/// Time-based rotation through `RhythmPhase`; transitions never touch
/// step ordering, only the multiplier the caller applies to its own
/// inter-step sleep.
#[derive(Debug)]
pub struct RhythmController {
    phase: RhythmPhase,
    phase_duration: Duration,
    entered_at: Instant,
}

impl RhythmController {
    #[must_use]
    pub fn new(phase_duration: Duration) -> Self {
        Self {
            phase: RhythmPhase::Focus,
            phase_duration,
            entered_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn phase(&self) -> RhythmPhase {
        self.phase
    }

    /// Advances the phase if this one has run its full duration.
    pub fn tick(&mut self) {
        if self.entered_at.elapsed() >= self.phase_duration {
            self.phase = self.phase.next();
            self.entered_at = Instant::now();
        }
    }
}

/// Outcome of a single stream's step execution, collected into the
/// cycle's fixed-length slot array.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    Completed { stream_id: StreamId, importance: f32 },
    Failed { stream_id: StreamId, error: String },
    SkippedCooldown { stream_id: StreamId },
}

/// Summary of one completed (or partially completed) cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub cycle: u64,
    pub steps_run: u32,
    pub thoughts_produced: u32,
    pub memory_nodes_created: u32,
    pub streams_entering_cooldown: Vec<StreamId>,
    pub outcomes: Vec<StepOutcome>,
    /// Set when the cycle stopped early because C1's cancellation token
    /// fired mid-cycle.
    pub cancelled: bool,
    /// Set when the cycle stopped early because C5's gate closed
    /// (fatigue crossed the high watermark).
    pub gated: bool,
}

fn thought_type_for(step_type: StepType) -> ThoughtType {
    match step_type {
        StepType::RelevanceRealization => ThoughtType::MetaCognitive,
        StepType::AffordanceInteraction => ThoughtType::Perception,
        StepType::SalienceSimulation => ThoughtType::Imagination,
    }
}

/// Orchestrates the 12-step loop over three engines, one per stream.
///
/// The three `Box<dyn InferenceEngine>` slots are indexed by
/// `StreamId::slot()` and never swapped between streams at runtime.
pub struct EchobeatsScheduler {
    config: EchobeatsConfig,
    engines: [Box<dyn InferenceEngine>; 3],
    cooldown_active: [bool; 3],
    cycle_count: u64,
}

impl EchobeatsScheduler {
    #[must_use]
    pub fn new(config: EchobeatsConfig, engines: [Box<dyn InferenceEngine>; 3]) -> Self {
        Self {
            config,
            engines,
            cooldown_active: [false; 3],
            cycle_count: 0,
        }
    }

    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    #[must_use]
    pub fn is_in_cooldown(&self, stream_id: StreamId) -> bool {
        self.cooldown_active[stream_id.slot()]
    }

    /// Runs one full 12-step cycle. `ctx` should carry the cycle-level
    /// deadline; step deadlines are derived from it.
    pub async fn run_cycle(
        &mut self,
        ctx: &Context,
        episodic: &mut EpisodicBuffer,
        memory: &mut MemoryStore,
        wake: &mut WakeController,
        identity: &mut Identity,
    ) -> CycleReport {
        let cycle = self.cycle_count;
        self.cycle_count += 1;

        let cooldown_this_cycle = self.cooldown_active;
        self.cooldown_active = [false; 3];
        let mut consecutive_failures = [0u32; 3];

        let mut report = CycleReport { cycle, ..CycleReport::default() };

        for step in 1..=12u8 {
            if ctx.is_cancelled() {
                report.cancelled = true;
                break;
            }
            if !wake.is_runnable() {
                report.gated = true;
                break;
            }

            let runnable: Vec<StreamId> = streams_for_step(step)
                .into_iter()
                .filter(|s| !cooldown_this_cycle[s.slot()])
                .collect();
            if runnable.is_empty() {
                continue;
            }

            let step_ctx = ctx.derive(self.config.step_deadline);
            let step_started = Instant::now();

            let calls = runnable.iter().map(|&stream_id| {
                let prompt = format!("cycle {cycle} step {step} stream {stream_id}");
                let request = InferenceRequest::new(step, stream_id, prompt, DEFAULT_MAX_TOKENS);
                let engine = &self.engines[stream_id.slot()];
                let step_ctx = &step_ctx;
                async move {
                    if !request.is_well_formed() {
                        tracing::warn!("request for step {step} stream {stream_id} failed the well-formedness invariant, skipping engine call");
                        let result = Err(EngineError::ResourceUnavailable(
                            "request failed the (step, streamId) well-formedness invariant".to_string(),
                        ));
                        return (stream_id, request, result);
                    }
                    let result = engine.generate(step_ctx, &request).await;
                    (stream_id, request, result)
                }
            });
            let results = join_all(calls).await;

            let mut step_load = 0.0f32;
            for (stream_id, request, result) in results {
                let slot = stream_id.slot();
                match result {
                    Ok(response) => {
                        consecutive_failures[slot] = 0;
                        let fraction = response.tokens.len() as f32 / request.max_tokens.max(1) as f32;
                        step_load += BASE_LOAD_PER_STEP * fraction.clamp(0.0, 1.0);

                        let thought = Thought::new(
                            response.output.clone(),
                            thought_type_for(request.step_type),
                            ThoughtSource::Internal,
                            fraction,
                            0.0,
                        );
                        episodic.push(
                            EpisodicMemory::new(thought.content.clone(), thought.importance, thought.valence)
                                .with_tag(stream_id.to_string()),
                        );
                        report.thoughts_produced += 1;

                        if thought.importance >= self.config.consolidation_threshold {
                            identity.integrate(&thought);
                            if memory.add_node(NodeKind::Episodic, thought.content, None).is_ok() {
                                report.memory_nodes_created += 1;
                            }
                        }
                        report.outcomes.push(StepOutcome::Completed { stream_id, importance: thought.importance });
                    }
                    Err(error) => {
                        consecutive_failures[slot] += 1;
                        report.outcomes.push(StepOutcome::Failed { stream_id, error: error.to_string() });
                        if consecutive_failures[slot] >= 3 {
                            self.cooldown_active[slot] = true;
                            report.streams_entering_cooldown.push(stream_id);
                        }
                    }
                }
            }

            for stream_id in StreamId::ALL {
                if cooldown_this_cycle[stream_id.slot()] && streams_for_step(step).contains(&stream_id) {
                    report.outcomes.push(StepOutcome::SkippedCooldown { stream_id });
                }
            }

            wake.tick(step_started.elapsed(), step_load);
            report.steps_run += 1;

            if wake.maybe_begin_tiring().expect("Awake -> Tiring is always a valid transition") {
                wake.complete_tiring_to_resting().expect("Tiring -> Resting is always valid once the in-flight step is done");
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockEngine;
    use crate::memory::MemoryConfig;
    use crate::wake::WakeConfig;

    fn scheduler(config: EchobeatsConfig) -> EchobeatsScheduler {
        EchobeatsScheduler::new(
            config,
            [Box::new(MockEngine::new()), Box::new(MockEngine::new()), Box::new(MockEngine::new())],
        )
    }

    #[tokio::test]
    async fn run_cycle_executes_all_twelve_steps_and_produces_thoughts() {
        let mut sched = scheduler(EchobeatsConfig::fast_test());
        let mut episodic = EpisodicBuffer::new(64);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut wake = WakeController::new(WakeConfig::fast_test());
        let mut identity = Identity::new("test", 8);
        let ctx = Context::with_timeout(Duration::from_secs(5));

        let report = sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;

        assert_eq!(report.steps_run, 12);
        assert!(!report.cancelled);
        assert!(!report.gated);
        // 5 (alpha) + 4 (beta) + 5 (gamma) engine calls under the reference policy.
        assert_eq!(report.thoughts_produced, 14);
        assert_eq!(episodic.len(), 14);
    }

    #[tokio::test]
    async fn cycle_count_increments_across_calls() {
        let mut sched = scheduler(EchobeatsConfig::fast_test());
        let mut episodic = EpisodicBuffer::new(64);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut wake = WakeController::new(WakeConfig::fast_test());
        let mut identity = Identity::new("test", 8);
        let ctx = Context::with_timeout(Duration::from_secs(5));

        sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;
        sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;

        assert_eq!(sched.cycle_count(), 2);
    }

    /// An engine that cancels the outer context the moment it is called,
    /// simulating an external cancel racing an in-flight engine call.
    struct CancelOnCallEngine {
        outer: crate::clock::CancellationToken,
    }

    #[async_trait::async_trait]
    impl crate::engine::InferenceEngine for CancelOnCallEngine {
        async fn initialize(&mut self, _model_ref: &str) -> Result<(), crate::engine::EngineError> {
            Ok(())
        }

        async fn generate(
            &self,
            ctx: &Context,
            request: &crate::core::types::InferenceRequest,
        ) -> Result<crate::core::types::InferenceResponse, crate::engine::EngineError> {
            self.outer.cancel();
            if ctx.is_cancelled() {
                return Err(crate::engine::EngineError::Cancelled);
            }
            Ok(crate::core::types::InferenceResponse::from_request(request, "late".to_string(), vec![], 1))
        }

        async fn embed(&self, _ctx: &Context, _input: &str) -> Result<Vec<f32>, crate::engine::EngineError> {
            Ok(vec![])
        }

        fn tokenize(&self, _text: &str) -> Vec<i32> {
            vec![]
        }

        fn detokenize(&self, _tokens: &[i32]) -> String {
            String::new()
        }

        async fn save_state(&self) -> Result<Vec<u8>, crate::engine::EngineError> {
            Ok(vec![])
        }

        async fn load_state(&mut self, _bytes: &[u8]) -> Result<(), crate::engine::EngineError> {
            Ok(())
        }

        async fn close(&mut self) -> Result<(), crate::engine::EngineError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn cancellation_mid_step_is_observed_by_the_in_flight_engine_call() {
        let ctx = Context::with_timeout(Duration::from_secs(5));
        let outer = ctx.token().clone();
        let mut sched = EchobeatsScheduler::new(
            EchobeatsConfig::fast_test(),
            [
                Box::new(CancelOnCallEngine { outer }),
                Box::new(MockEngine::new()),
                Box::new(MockEngine::new()),
            ],
        );
        let mut episodic = EpisodicBuffer::new(64);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut wake = WakeController::new(WakeConfig::fast_test());
        let mut identity = Identity::new("test", 8);

        let report = sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;

        // The first step's alpha call cancels the outer context partway
        // through; the derived step context must see it immediately, and
        // the cycle must stop at the next step boundary rather than
        // running to completion.
        assert!(ctx.is_cancelled());
        assert!(report.cancelled);
        assert!(report.steps_run < 12);
        assert!(report
            .outcomes
            .iter()
            .any(|o| matches!(o, StepOutcome::Failed { error, .. } if error.contains("ancel"))));
    }

    #[tokio::test]
    async fn cancelled_context_stops_the_cycle_early() {
        let mut sched = scheduler(EchobeatsConfig::fast_test());
        let mut episodic = EpisodicBuffer::new(64);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut wake = WakeController::new(WakeConfig::fast_test());
        let mut identity = Identity::new("test", 8);
        let ctx = Context::with_timeout(Duration::from_secs(5));
        ctx.cancel();

        let report = sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;

        assert!(report.cancelled);
        assert_eq!(report.steps_run, 0);
    }

    #[tokio::test]
    async fn gate_closed_stops_the_cycle_early() {
        let mut sched = scheduler(EchobeatsConfig::fast_test());
        let mut episodic = EpisodicBuffer::new(64);
        let mut memory = MemoryStore::new(MemoryConfig::fast());
        let mut wake = WakeController::new(WakeConfig::fast_test());
        let mut identity = Identity::new("test", 8);
        wake.tick(Duration::from_secs(10), 1.0);
        wake.maybe_begin_tiring().unwrap();
        let ctx = Context::with_timeout(Duration::from_secs(5));

        let report = sched.run_cycle(&ctx, &mut episodic, &mut memory, &mut wake, &mut identity).await;

        assert!(report.gated);
        assert_eq!(report.steps_run, 0);
    }

    #[test]
    fn rhythm_phase_cycles_through_all_four_phases() {
        let mut phase = RhythmPhase::Focus;
        for expected in [RhythmPhase::Explore, RhythmPhase::Integrate, RhythmPhase::Rest, RhythmPhase::Focus] {
            phase = phase.next();
            assert_eq!(phase, expected);
        }
    }

    #[test]
    fn rhythm_multipliers_stay_within_bounds() {
        for phase in [RhythmPhase::Focus, RhythmPhase::Explore, RhythmPhase::Integrate, RhythmPhase::Rest] {
            let m = phase.period_multiplier();
            assert!((0.5..=3.0).contains(&m));
        }
    }

    #[test]
    fn rhythm_controller_advances_after_phase_duration() {
        let mut rhythm = RhythmController::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(5));
        rhythm.tick();
        assert_eq!(rhythm.phase(), RhythmPhase::Explore);
    }
}
