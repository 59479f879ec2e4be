//! The walkthrough player: catalog, session, simulator, and bridge together.
//!
//! `Player` is the single entry point a front end drives. It owns the
//! session by value and passes it to nothing; the catalog is shared behind
//! an `Arc` so fixture backends and callers can read the same scenarios.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::bridge::{Bridge, BridgeMode, RemoteRun, RemoteStatus, VerifyRequest};
use crate::catalog::Catalog;
use crate::config::PlayerConfig;
use crate::drawer::{resolve, DetailPayload, DetailSelector};
use crate::error::{AxiomError, AxiomResult, LookupError, PlaybackError};
use crate::screen::{Command, Screen};
use crate::session::Session;
use crate::simulator::{SeededRandom, Simulator, TickOutcome, Ticker};
use crate::view::{highlights, Highlight, VerdictSummary};

/// Drives one viewing at a time.
#[derive(Debug)]
pub struct Player {
    catalog: Arc<Catalog>,
    config: PlayerConfig,
    session: Session,
    bridge: Option<Bridge>,
    remote: Option<RemoteRun>,
}

impl Player {
    /// A player over `catalog`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if `config` is invalid or a catalog
    /// scenario violates `config.policy`.
    pub fn new(catalog: Arc<Catalog>, config: PlayerConfig) -> AxiomResult<Self> {
        config.validate()?;
        if *catalog.policy() != config.policy {
            for scenario in catalog.iter() {
                scenario.validate(&config.policy)?;
            }
        }
        Ok(Self {
            catalog,
            config,
            session: Session::new(),
            bridge: None,
            remote: None,
        })
    }

    /// A player over the built-in catalog.
    ///
    /// # Errors
    ///
    /// See [`Player::new`].
    pub fn builtin(config: PlayerConfig) -> AxiomResult<Self> {
        let catalog = Catalog::builtin_with_policy(config.policy)?;
        Self::new(Arc::new(catalog), config)
    }

    /// Connects the backend bridge per `config.bridge` and reports its mode.
    pub fn connect_bridge(&mut self) -> BridgeMode {
        let bridge = Bridge::connect(&self.config.bridge, Arc::clone(&self.catalog));
        let mode = bridge.mode();
        self.bridge = Some(bridge);
        mode
    }

    /// Uses `bridge` instead of connecting from config.
    #[must_use]
    pub fn with_bridge(mut self, bridge: Bridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// The shared scenario catalog.
    #[must_use]
    pub const fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// The current viewing.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Shorthand for `session().screen()`.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.session.screen()
    }

    #[must_use]
    pub const fn bridge(&self) -> Option<&Bridge> {
        self.bridge.as_ref()
    }

    /// Mutable bridge, for [`Bridge::reprobe`].
    pub fn bridge_mut(&mut self) -> Option<&mut Bridge> {
        self.bridge.as_mut()
    }

    /// Fixture or live; fixture when no bridge is connected.
    #[must_use]
    pub fn bridge_mode(&self) -> BridgeMode {
        self.bridge.as_ref().map_or(BridgeMode::Fixture, Bridge::mode)
    }

    /// Follows the forward edge. Entering VERIFYING starts the simulator.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` where no manual advance
    /// exists. If the simulator cannot be built the session stays on
    /// RESPONSE.
    pub fn advance(&mut self) -> AxiomResult<Screen> {
        let run = if self.screen().next() == Some(Screen::Verifying) {
            Some(self.prepare_simulation()?)
        } else {
            None
        };
        let to = self.session.advance()?;
        if let Some((simulator, ticker)) = run {
            self.session.start(simulator, ticker)?;
        }
        Ok(to)
    }

    /// LANDING → SCENARIOS.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off LANDING.
    pub fn skip_intro(&mut self) -> AxiomResult<()> {
        Ok(self.session.skip_intro()?)
    }

    /// Resets the session and starts scenario `id` at INTRO.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::UnknownScenario` for an id not in the catalog
    /// and `PlaybackError::InvalidTransition` on LANDING and SLIDESHOW. The
    /// session is unchanged on error.
    pub fn select_scenario(&mut self, id: &str) -> AxiomResult<()> {
        let scenario = self.catalog.require(id).map_err(|e| {
            warn!(scenario = id, "unknown scenario");
            e
        })?;
        self.cancel_remote_for(Command::SelectScenario);
        self.session.select(scenario)?;
        Ok(())
    }

    /// VERDICT → SCENARIOS.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off VERDICT.
    pub fn browse_scenarios(&mut self) -> AxiomResult<()> {
        self.cancel_remote_for(Command::BrowseScenarios);
        self.session.browse_scenarios()?;
        Ok(())
    }

    /// Full reset back to LANDING.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` on LANDING and SLIDESHOW.
    pub fn go_home(&mut self) -> AxiomResult<()> {
        self.cancel_remote_for(Command::GoHome);
        self.session.go_home()?;
        Ok(())
    }

    /// Reveals claims on the RESPONSE screen.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off RESPONSE.
    pub fn reveal_claims(&mut self) -> AxiomResult<()> {
        Ok(self.session.reveal_claims()?)
    }

    /// Flips the advanced view; returns the new value.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` outside VERIFYING and VERDICT.
    pub fn toggle_advanced_view(&mut self) -> AxiomResult<bool> {
        Ok(self.session.toggle_advanced_view()?)
    }

    /// Starts the simulator on the active scenario's primary claim.
    ///
    /// Called automatically on entering VERIFYING; call it again only after
    /// [`Player::cancel_simulation`].
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::SimulatorAlreadyRunning` if one is running,
    /// `PlaybackError::InvalidTransition` outside VERIFYING, and
    /// `PlaybackError::NoActiveScenario` without a scenario.
    pub fn start_simulation(&mut self) -> AxiomResult<()> {
        if self.session.is_simulating() {
            warn!("simulation start rejected; one is already running");
            return Err(PlaybackError::SimulatorAlreadyRunning.into());
        }
        let (simulator, ticker) = self.prepare_simulation()?;
        self.session.start(simulator, ticker)?;
        Ok(())
    }

    fn prepare_simulation(&self) -> AxiomResult<(Simulator, Ticker)> {
        let scenario = self
            .session
            .scenario()
            .cloned()
            .ok_or(PlaybackError::NoActiveScenario)?;
        let rng = Box::new(SeededRandom::from_option(self.config.seed));
        let simulator = Simulator::primary(scenario, self.config.simulator, rng)?;
        Ok((simulator, self.config.simulator.ticker()))
    }

    /// Stops the simulator without leaving VERIFYING. Idempotent.
    pub fn cancel_simulation(&mut self) -> bool {
        self.session.cancel_simulation()
    }

    /// Applies every due tick and every queued stream item. Returns the
    /// number of ticks applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        for _ in 0..self.session.due_ticks() {
            match self.session.apply_tick() {
                Ok(outcome) => {
                    applied += 1;
                    if outcome.finished {
                        break;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "tick dropped");
                    break;
                }
            }
        }
        self.drain_remote();
        applied
    }

    /// Applies exactly one tick regardless of the clock.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::SimulatorNotRunning` when nothing is running.
    pub fn step(&mut self) -> AxiomResult<TickOutcome> {
        Ok(self.session.apply_tick()?)
    }

    /// Drives the running simulation to completion, blocking on the clock.
    /// A manual clock is stepped directly.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::SimulatorNotRunning` if no simulation is
    /// running and the session is not already at VERDICT.
    pub fn wait_for_verdict(&mut self) -> AxiomResult<()> {
        if !self.session.is_simulating() {
            if self.screen() == Screen::Verdict {
                return Ok(());
            }
            return Err(PlaybackError::SimulatorNotRunning.into());
        }
        while self.session.is_simulating() {
            // A wall-clock ticker blocks here; a manual one returns at once.
            let _ = self.session.wait_tick();
            self.session.apply_tick()?;
            self.drain_remote();
        }
        Ok(())
    }

    /// Opens the evidence drawer.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` outside VERIFYING and
    /// VERDICT, or a `LookupError` when the selector does not resolve; the
    /// drawer stays closed.
    pub fn open_detail(&mut self, selector: DetailSelector) -> AxiomResult<()> {
        self.session.open_detail(selector)
    }

    /// Closes the drawer.
    pub fn close_detail(&mut self) {
        self.session.close_detail();
    }

    /// The open drawer's content.
    #[must_use]
    pub fn detail(&self) -> Option<DetailPayload<'_>> {
        self.session.detail()
    }

    /// Resolves `selector` against the active scenario without opening the drawer.
    ///
    /// # Errors
    ///
    /// Returns a `LookupError` for a miss or when no scenario is active.
    pub fn resolve_detail(&self, selector: &DetailSelector) -> AxiomResult<DetailPayload<'_>> {
        let scenario = self
            .session
            .scenario()
            .ok_or(LookupError::NoActiveScenario)?;
        Ok(resolve(selector, scenario)?)
    }

    /// Claim spans to highlight; empty until claims are revealed.
    #[must_use]
    pub fn response_highlights(&self) -> Vec<Highlight> {
        match self.session.scenario() {
            Some(scenario) if self.session.claims_revealed() => highlights(scenario),
            _ => Vec::new(),
        }
    }

    /// The VERDICT view model. `None` before the verdict.
    #[must_use]
    pub fn verdict_summary(&self) -> Option<VerdictSummary> {
        if self.screen() != Screen::Verdict {
            return None;
        }
        let scenario = self.session.scenario()?;
        let final_score = self.session.score_samples().last().map(|s| s.score);
        Some(VerdictSummary::new(scenario, final_score))
    }

    /// Opens a streaming verification of the active scenario through the
    /// bridge. Items are queued and applied on [`Player::pump`].
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::NoActiveScenario` without a scenario and
    /// `AxiomError::Internal` without a bridge.
    pub fn start_remote(&mut self) -> AxiomResult<()> {
        let scenario = self
            .session
            .scenario()
            .cloned()
            .ok_or(PlaybackError::NoActiveScenario)?;
        let bridge = self
            .bridge
            .as_mut()
            .ok_or_else(|| AxiomError::internal("no backend bridge connected"))?;
        let stream = bridge.stream(&VerifyRequest::from(scenario.as_ref()))?;
        self.cancel_remote();
        self.remote = Some(RemoteRun::new(stream));
        Ok(())
    }

    /// Applies queued stream items. Returns how many were applied.
    pub fn drain_remote(&mut self) -> usize {
        self.remote.as_mut().map_or(0, RemoteRun::drain)
    }

    /// Blocks until the streaming verification settles, fails, or closes,
    /// or `timeout` passes without a new item. `None` without a stream.
    pub fn settle_remote(&mut self, timeout: Duration) -> Option<&RemoteStatus> {
        self.remote
            .as_mut()
            .map(|remote| remote.drain_blocking(timeout))
    }

    /// The streaming verification, if one was started.
    #[must_use]
    pub const fn remote(&self) -> Option<&RemoteRun> {
        self.remote.as_ref()
    }

    fn cancel_remote(&mut self) {
        if let Some(mut remote) = self.remote.take() {
            remote.cancel();
        }
    }

    /// Cancels the stream only if the session will accept `command`.
    fn cancel_remote_for(&mut self, command: Command) {
        if self.session.screen().permits(command) {
            self.cancel_remote();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::SimulatorConfig;

    fn player() -> Player {
        let config = PlayerConfig {
            simulator: SimulatorConfig::default().manual(),
            seed: Some(11),
            ..PlayerConfig::default()
        };
        Player::builtin(config).unwrap()
    }

    fn to_verifying(player: &mut Player, id: &str) {
        player.skip_intro().unwrap();
        player.select_scenario(id).unwrap();
        player.advance().unwrap();
        player.advance().unwrap();
        player.advance().unwrap();
    }

    #[test]
    fn test_entering_verifying_starts_simulation() {
        let mut player = player();
        to_verifying(&mut player, "finance_false");
        assert_eq!(player.screen(), Screen::Verifying);
        assert!(player.session().is_simulating());
        assert!(player.start_simulation().is_err());
    }

    #[test]
    fn test_unknown_scenario_leaves_session() {
        let mut player = player();
        player.skip_intro().unwrap();
        let err = player.select_scenario("crypto_true").unwrap_err();
        assert!(matches!(
            err,
            AxiomError::Playback(PlaybackError::UnknownScenario { .. })
        ));
        assert_eq!(player.screen(), Screen::Scenarios);
    }

    #[test]
    fn test_manual_clock_pump_is_noop() {
        let mut player = player();
        to_verifying(&mut player, "finance_true");
        assert_eq!(player.pump(), 0);
        assert!(player.session().score_samples().is_empty());
    }

    #[test]
    fn test_wait_for_verdict_with_manual_clock() {
        let mut player = player();
        to_verifying(&mut player, "finance_true");
        player.wait_for_verdict().unwrap();
        assert_eq!(player.screen(), Screen::Verdict);
        assert_eq!(player.session().score_samples().len(), 20);
        player.wait_for_verdict().unwrap();
        assert!(player.verdict_summary().is_some());
    }

    #[test]
    fn test_highlights_require_reveal() {
        let mut player = player();
        player.skip_intro().unwrap();
        player.select_scenario("finance_false").unwrap();
        player.advance().unwrap();
        player.advance().unwrap();
        assert!(player.response_highlights().is_empty());
        player.reveal_claims().unwrap();
        assert!(!player.response_highlights().is_empty());
    }

    #[test]
    fn test_remote_stream_through_fixture_bridge() {
        let mut player = player();
        player.connect_bridge();
        assert_eq!(player.bridge_mode(), BridgeMode::Fixture);

        player.skip_intro().unwrap();
        player.select_scenario("finance_true").unwrap();
        player.start_remote().unwrap();
        player.pump();
        assert_eq!(player.remote().unwrap().status(), &RemoteStatus::Settled);

        player.go_home().unwrap();
        assert!(player.remote().is_none());
    }

    #[test]
    fn test_failed_simulator_start_keeps_response() {
        let mut player = player();
        player.skip_intro().unwrap();
        player.select_scenario("finance_true").unwrap();
        player.advance().unwrap();
        player.advance().unwrap();
        player.config.simulator.settle_ticks = 0;

        let err = player.advance().unwrap_err();
        assert!(matches!(err, AxiomError::Validation(_)));
        assert_eq!(player.screen(), Screen::Response);
        assert!(!player.session().is_simulating());

        player.config.simulator.settle_ticks = 18;
        assert_eq!(player.advance().unwrap(), Screen::Verifying);
        assert!(player.session().is_simulating());
    }

    #[test]
    fn test_rejected_command_keeps_remote() {
        let mut player = player();
        player.connect_bridge();
        player.skip_intro().unwrap();
        player.select_scenario("legal_false").unwrap();
        player.start_remote().unwrap();

        assert!(player.browse_scenarios().is_err());
        assert_eq!(player.remote().unwrap().status(), &RemoteStatus::Streaming);

        player.select_scenario("finance_false").unwrap();
        assert!(player.remote().is_none());
        assert_eq!(player.session().scenario().unwrap().id, "finance_false");
    }

    #[test]
    fn test_settle_remote_blocks_until_settled() {
        let mut player = player();
        assert!(player.settle_remote(Duration::from_millis(10)).is_none());

        player.connect_bridge();
        player.skip_intro().unwrap();
        player.select_scenario("finance_true").unwrap();
        player.start_remote().unwrap();
        assert_eq!(
            player.settle_remote(Duration::from_secs(1)),
            Some(&RemoteStatus::Settled)
        );
        assert!(player.remote().unwrap().settlement().is_some());
    }
}
