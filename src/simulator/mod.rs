//! Verification simulator.
//!
//! Animates convergence of a "live" factuality score toward a claim's
//! authored `risk_score`, and scatters agent-assessment events along the
//! way. Nothing here alters authored data: the simulator reads one claim
//! and produces samples and events for the session to record.
//!
//! Ticks are numbered from 1. At tick `t` the score is
//! `lerp(start, risk, ease(min(t / settle, 1)))` plus uniform noise, clamped
//! to `[floor, ceiling]`. Events fire on even ticks strictly before
//! `settle`. The run finishes itself at tick `settle + linger`.

mod curve;
mod random;
mod ticker;

pub use curve::{ease, expected_score, lerp, progress};
pub use random::{RandomSource, SeededRandom};
pub use ticker::{ClockMode, Ticker};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::{ensure_unit, AgentName, Stance};
use crate::claim::Claim;
use crate::error::{AxiomResult, LookupError, ValidationError};
use crate::scenario::Scenario;

/// Simulator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Wall time between ticks.
    pub tick_period: Duration,
    /// Ticks during which the score moves and events are emitted.
    pub settle_ticks: u32,
    /// Extra ticks held after settling before the run completes.
    pub linger_ticks: u32,
    /// Half-width of the uniform score noise.
    pub noise: f64,
    /// Starting score for adverse claims.
    pub adverse_start: f64,
    /// Starting score for clean claims.
    pub clean_start: f64,
    /// Probability an event's stance agrees with the claim's direction.
    pub stance_fidelity: f64,
    /// Lowest displayable score.
    pub floor: f64,
    /// Highest displayable score.
    pub ceiling: f64,
    /// Where ticks come from.
    pub clock: ClockMode,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_millis(300),
            settle_ticks: 18,
            linger_ticks: 2,
            noise: 0.02,
            adverse_start: 0.78,
            clean_start: 0.38,
            stance_fidelity: 0.85,
            floor: 0.02,
            ceiling: 0.98,
            clock: ClockMode::Realtime,
        }
    }
}

impl SimulatorConfig {
    /// Ticks in a complete run.
    #[must_use]
    pub const fn total_ticks(&self) -> u32 {
        self.settle_ticks + self.linger_ticks
    }

    /// Same configuration, stepped by hand.
    #[must_use]
    pub const fn manual(mut self) -> Self {
        self.clock = ClockMode::Manual;
        self
    }

    /// Checks the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidConfig` for a zero settle window or
    /// tick period, or an inverted clamp, and `ValueOutOfRange` for
    /// probabilities and scores outside [0.0, 1.0].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.settle_ticks == 0 {
            return Err(ValidationError::InvalidConfig {
                key: "settle_ticks".to_string(),
                value: "0".to_string(),
            });
        }
        if self.tick_period.is_zero() {
            return Err(ValidationError::InvalidConfig {
                key: "tick_period".to_string(),
                value: "0ms".to_string(),
            });
        }
        ensure_unit("noise", self.noise)?;
        ensure_unit("adverse_start", self.adverse_start)?;
        ensure_unit("clean_start", self.clean_start)?;
        ensure_unit("stance_fidelity", self.stance_fidelity)?;
        ensure_unit("floor", self.floor)?;
        ensure_unit("ceiling", self.ceiling)?;
        if self.floor >= self.ceiling {
            return Err(ValidationError::InvalidConfig {
                key: "floor".to_string(),
                value: format!("{} (ceiling {})", self.floor, self.ceiling),
            });
        }
        Ok(())
    }

    /// Builds the ticker for this configuration.
    #[must_use]
    pub fn ticker(&self) -> Ticker {
        Ticker::for_mode(self.clock, self.tick_period)
    }
}

/// One recorded score.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub tick: u32,
    pub score: f64,
}

/// A cosmetic assessment "pill" shown while verifying.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentEvent {
    pub tick: u32,
    pub agent: AgentName,
    pub stance: Stance,
    pub confidence: f64,
    pub summary: String,
}

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    /// The score recorded this tick.
    pub sample: ScoreSample,
    /// The event emitted this tick, if any.
    pub event: Option<AssessmentEvent>,
    /// `true` exactly once: on the final tick of the run.
    pub finished: bool,
}

/// A single simulated verification run over one claim.
#[derive(Debug)]
pub struct Simulator {
    run_id: Uuid,
    scenario: Arc<Scenario>,
    claim_index: usize,
    config: SimulatorConfig,
    rng: Box<dyn RandomSource>,
    tick: u32,
    stopped: bool,
}

impl Simulator {
    /// Creates a run over `claim_id` of `scenario`.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::UnknownClaim` if the claim does not exist, or a
    /// `ValidationError` for an unusable config.
    pub fn new(
        scenario: Arc<Scenario>,
        claim_id: &str,
        config: SimulatorConfig,
        rng: Box<dyn RandomSource>,
    ) -> AxiomResult<Self> {
        config.validate()?;
        let claim_index = scenario
            .claims
            .iter()
            .position(|c| c.id == claim_id)
            .ok_or_else(|| LookupError::UnknownClaim {
                claim_id: claim_id.to_string(),
            })?;

        Ok(Self {
            run_id: Uuid::new_v4(),
            scenario,
            claim_index,
            config,
            rng,
            tick: 0,
            stopped: false,
        })
    }

    /// Creates a run over the scenario's primary claim.
    ///
    /// # Errors
    ///
    /// See [`Simulator::new`]; an empty scenario has no primary claim.
    pub fn primary(
        scenario: Arc<Scenario>,
        config: SimulatorConfig,
        rng: Box<dyn RandomSource>,
    ) -> AxiomResult<Self> {
        let claim_id = scenario
            .primary_claim()
            .map(|c| c.id.clone())
            .ok_or_else(|| ValidationError::EmptyScenario {
                scenario: scenario.id.clone(),
            })?;
        Self::new(scenario, &claim_id, config, rng)
    }

    /// Identifier of this run, for log correlation.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// The claim being animated.
    #[must_use]
    pub fn claim(&self) -> &Claim {
        &self.scenario.claims[self.claim_index]
    }

    /// The scenario the claim belongs to.
    #[must_use]
    pub fn scenario(&self) -> &Arc<Scenario> {
        &self.scenario
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Ticks applied so far.
    #[must_use]
    pub const fn ticks_run(&self) -> u32 {
        self.tick
    }

    /// Whether more ticks will be produced.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        !self.stopped
    }

    /// Starting score for this claim.
    #[must_use]
    pub fn start_bias(&self) -> f64 {
        if self.claim().is_adverse {
            self.config.adverse_start
        } else {
            self.config.clean_start
        }
    }

    /// Advances one tick. Returns `None` once stopped or finished.
    pub fn tick(&mut self) -> Option<TickOutcome> {
        if self.stopped {
            return None;
        }
        self.tick += 1;
        let t = self.tick;

        let target = self.claim().risk_score;
        let base = expected_score(self.start_bias(), target, t, self.config.settle_ticks);
        let jitter = (self.rng.unit() * 2.0 - 1.0) * self.config.noise;
        let score = (base + jitter).clamp(self.config.floor, self.config.ceiling);

        let event = if t % 2 == 0 && t < self.config.settle_ticks {
            Some(self.sample_event(t))
        } else {
            None
        };

        let finished = t >= self.config.total_ticks();
        if finished {
            self.stopped = true;
        }

        Some(TickOutcome {
            sample: ScoreSample { tick: t, score },
            event,
            finished,
        })
    }

    /// Stops the run. Idempotent.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    fn sample_event(&mut self, tick: u32) -> AssessmentEvent {
        let agent = AgentName::ALL[self.rng.index(AgentName::ALL.len())];
        let leaning = Stance::leaning(self.claim().is_adverse);
        let stance = if self.rng.unit() < self.config.stance_fidelity {
            leaning
        } else {
            leaning.flipped()
        };

        let authored = self.claim().assessment(agent);
        let (confidence, summary) = match authored {
            Some(a) if a.stance == stance => (a.confidence, a.summary.clone()),
            Some(a) => (
                1.0 - a.confidence,
                format!("{agent} notes a weak {stance} signal"),
            ),
            None => (0.5, format!("{agent} is still gathering evidence")),
        };

        AssessmentEvent {
            tick,
            agent,
            stance,
            confidence,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn scenario(id: &str) -> Arc<Scenario> {
        Catalog::builtin().unwrap().require(id).unwrap()
    }

    fn run(id: &str, seed: u64) -> (Vec<ScoreSample>, Vec<AssessmentEvent>, u32) {
        let mut sim = Simulator::primary(
            scenario(id),
            SimulatorConfig::default().manual(),
            Box::new(SeededRandom::seeded(seed)),
        )
        .unwrap();
        let mut samples = Vec::new();
        let mut events = Vec::new();
        let mut finishes = 0;
        while let Some(outcome) = sim.tick() {
            samples.push(outcome.sample);
            events.extend(outcome.event);
            if outcome.finished {
                finishes += 1;
            }
        }
        (samples, events, finishes)
    }

    #[test]
    fn test_run_length_and_single_finish() {
        let (samples, _, finishes) = run("finance_false", 1);
        assert_eq!(samples.len(), 20);
        assert_eq!(finishes, 1);
        assert_eq!(samples.last().unwrap().tick, 20);
    }

    #[test]
    fn test_samples_clamped_and_converged() {
        let config = SimulatorConfig::default();
        for seed in 0..25 {
            let (samples, _, _) = run("finance_false", seed);
            assert!(samples
                .iter()
                .all(|s| (config.floor..=config.ceiling).contains(&s.score)));
            let last = samples.last().unwrap().score;
            // Primary claim risk is 0.06.
            assert!((last - 0.06).abs() <= config.noise + 1e-9);
        }
    }

    #[test]
    fn test_events_on_even_ticks_before_settle() {
        let (_, events, _) = run("finance_true", 9);
        let ticks: Vec<u32> = events.iter().map(|e| e.tick).collect();
        assert_eq!(ticks, vec![2, 4, 6, 8, 10, 12, 14, 16]);
    }

    #[test]
    fn test_seed_reproducibility() {
        assert_eq!(run("legal_false", 77), run("legal_false", 77));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut sim = Simulator::primary(
            scenario("finance_true"),
            SimulatorConfig::default().manual(),
            Box::new(SeededRandom::seeded(3)),
        )
        .unwrap();
        assert!(sim.tick().is_some());
        sim.stop();
        sim.stop();
        assert!(!sim.is_running());
        assert!(sim.tick().is_none());
        assert_eq!(sim.ticks_run(), 1);
    }

    #[test]
    fn test_unknown_claim() {
        let err = Simulator::new(
            scenario("finance_true"),
            "CLM-404",
            SimulatorConfig::default(),
            Box::new(SeededRandom::seeded(0)),
        )
        .unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimulatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.total_ticks(), 20);
        config.settle_ticks = 0;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.floor = 0.99;
        assert!(config.validate().is_err());

        let mut config = SimulatorConfig::default();
        config.stance_fidelity = 1.5;
        assert!(config.validate().is_err());
    }

    #[derive(Debug)]
    struct Constant(f64);

    impl RandomSource for Constant {
        fn unit(&mut self) -> f64 {
            self.0
        }
    }

    #[test]
    fn test_midpoint_noise_follows_curve_exactly() {
        // A source pinned at 0.5 yields zero jitter and always picks the
        // middle agent with the leaning stance.
        let mut sim = Simulator::primary(
            scenario("finance_true"),
            SimulatorConfig::default().manual(),
            Box::new(Constant(0.5)),
        )
        .unwrap();
        let target = sim.claim().risk_score;
        let start = sim.start_bias();
        for t in 1..=20 {
            let outcome = sim.tick().unwrap();
            let expected = expected_score(start, target, t, 18).clamp(0.02, 0.98);
            assert!((outcome.sample.score - expected).abs() < 1e-12);
            if let Some(event) = outcome.event {
                assert_eq!(event.agent, AgentName::RetrieverAgent);
                assert_eq!(event.stance, Stance::Support);
            }
        }
        assert!(sim.tick().is_none());
    }

    fn first_event(id: &str, rng: Box<dyn RandomSource>) -> AssessmentEvent {
        let mut sim =
            Simulator::primary(scenario(id), SimulatorConfig::default().manual(), rng).unwrap();
        std::iter::from_fn(|| sim.tick())
            .find_map(|o| o.event)
            .unwrap()
    }

    #[test]
    fn test_draw_above_fidelity_flips_stance() {
        let event = first_event("finance_true", Box::new(Constant(0.9)));
        assert_eq!(event.agent, AgentName::ConsistencyBot);
        assert_eq!(event.stance, Stance::leaning(false).flipped());
        assert_eq!(event.stance, Stance::Oppose);
        // Authored ConsistencyBot confidence is 0.80 in favour.
        assert!((event.confidence - 0.2).abs() < 1e-12);
        assert!(event.summary.contains("weak"));
    }

    #[test]
    fn test_adverse_claim_leans_short() {
        let event = first_event("finance_false", Box::new(Constant(0.5)));
        assert_eq!(event.stance, Stance::Oppose);
        let authored = scenario("finance_false").claims[0]
            .assessment(event.agent)
            .unwrap()
            .clone();
        assert_eq!(event.summary, authored.summary);
        assert!((event.confidence - authored.confidence).abs() < f64::EPSILON);
    }

    #[test]
    fn test_agreeing_fraction_tracks_fidelity() {
        let fidelity = SimulatorConfig::default().stance_fidelity;
        for id in ["finance_false", "finance_true"] {
            let leaning = Stance::leaning(scenario(id).claims[0].is_adverse);
            let (mut agree, mut total) = (0_u32, 0_u32);
            for seed in 0..500 {
                let (_, events, _) = run(id, seed);
                total += u32::try_from(events.len()).unwrap();
                agree += u32::try_from(events.iter().filter(|e| e.stance == leaning).count())
                    .unwrap();
            }
            let fraction = f64::from(agree) / f64::from(total);
            assert!(
                (fraction - fidelity).abs() < 0.03,
                "{id}: {agree}/{total} = {fraction}"
            );
        }
    }
}
