//! One viewing of the walkthrough.
//!
//! The session owns the current screen, the transient view state, and the
//! running simulation if there is one. Every operation is checked against
//! the transition table in [`Screen::permits`]; a rejected operation leaves
//! the session unchanged. Every reset path cancels the running simulation
//! before touching any other field, so a stale tick can never write into a
//! newer scenario's view.

use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::drawer::{resolve, DetailPayload, DetailSelector};
use crate::error::{AxiomResult, LookupError, PlaybackError};
use crate::scenario::Scenario;
use crate::screen::{Command, Screen};
use crate::simulator::{AssessmentEvent, ScoreSample, Simulator, Ticker, TickOutcome};

#[derive(Debug)]
struct ActiveRun {
    simulator: Simulator,
    ticker: Ticker,
}

impl ActiveRun {
    fn cancel(&mut self) {
        self.simulator.stop();
        self.ticker.cancel();
    }
}

/// Mutable, process-local state of one viewing.
#[derive(Debug)]
pub struct Session {
    viewing_id: Option<Uuid>,
    screen: Screen,
    scenario: Option<Arc<Scenario>>,
    score_samples: Vec<ScoreSample>,
    assessment_events: Vec<AssessmentEvent>,
    claims_revealed: bool,
    advanced_view: bool,
    open_detail: Option<DetailSelector>,
    run: Option<ActiveRun>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh session on the LANDING screen.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            viewing_id: None,
            screen: Screen::Landing,
            scenario: None,
            score_samples: Vec::new(),
            assessment_events: Vec::new(),
            claims_revealed: false,
            advanced_view: false,
            open_detail: None,
            run: None,
        }
    }

    /// Current screen.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Identifier of the current viewing; assigned on scenario selection.
    #[must_use]
    pub const fn viewing_id(&self) -> Option<Uuid> {
        self.viewing_id
    }

    #[must_use]
    pub const fn scenario(&self) -> Option<&Arc<Scenario>> {
        self.scenario.as_ref()
    }

    #[must_use]
    pub fn active_scenario_id(&self) -> Option<&str> {
        self.scenario.as_deref().map(|s| s.id.as_str())
    }

    /// Samples recorded by the current or last run, in tick order.
    #[must_use]
    pub fn score_samples(&self) -> &[ScoreSample] {
        &self.score_samples
    }

    #[must_use]
    pub fn assessment_events(&self) -> &[AssessmentEvent] {
        &self.assessment_events
    }

    /// Whether the RESPONSE screen has revealed its claims.
    #[must_use]
    pub const fn claims_revealed(&self) -> bool {
        self.claims_revealed
    }

    /// Whether the advanced (agent-level) view is on.
    #[must_use]
    pub const fn advanced_view(&self) -> bool {
        self.advanced_view
    }

    /// Selector of the open drawer, if one is open.
    #[must_use]
    pub const fn open_selector(&self) -> Option<&DetailSelector> {
        self.open_detail.as_ref()
    }

    /// Whether a simulation is in flight.
    #[must_use]
    pub const fn is_simulating(&self) -> bool {
        self.run.is_some()
    }

    /// The running simulator, if any.
    #[must_use]
    pub fn simulator(&self) -> Option<&Simulator> {
        self.run.as_ref().map(|r| &r.simulator)
    }

    fn guard(&self, command: Command) -> Result<(), PlaybackError> {
        if self.screen.permits(command) {
            return Ok(());
        }
        warn!(screen = %self.screen, %command, "rejected transition");
        Err(PlaybackError::InvalidTransition {
            from: self.screen,
            command,
        })
    }

    fn transition(&mut self, to: Screen) {
        debug!(from = %self.screen, %to, "screen transition");
        self.screen = to;
    }

    /// Follows the forward edge from the current screen.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` where no manual advance
    /// exists, notably from SCENARIOS, VERIFYING, and VERDICT.
    pub fn advance(&mut self) -> Result<Screen, PlaybackError> {
        self.guard(Command::Advance)?;
        let next = self.screen.next().ok_or(PlaybackError::InvalidTransition {
            from: self.screen,
            command: Command::Advance,
        })?;
        self.transition(next);
        Ok(next)
    }

    /// LANDING → SCENARIOS.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off the LANDING screen.
    pub fn skip_intro(&mut self) -> Result<(), PlaybackError> {
        self.guard(Command::SkipIntro)?;
        self.transition(Screen::Scenarios);
        Ok(())
    }

    /// Resets the session and starts `scenario` at INTRO.
    ///
    /// Selecting the scenario that is already active still resets.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` on LANDING and SLIDESHOW.
    pub fn select(&mut self, scenario: Arc<Scenario>) -> Result<(), PlaybackError> {
        self.guard(Command::SelectScenario)?;
        self.reset();
        let viewing_id = Uuid::new_v4();
        info!(scenario = %scenario.id, viewing = %viewing_id, "scenario selected");
        self.viewing_id = Some(viewing_id);
        self.scenario = Some(scenario);
        self.transition(Screen::Intro);
        Ok(())
    }

    /// VERDICT → SCENARIOS, clearing the finished viewing.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off the VERDICT screen.
    pub fn browse_scenarios(&mut self) -> Result<(), PlaybackError> {
        self.guard(Command::BrowseScenarios)?;
        self.reset();
        self.transition(Screen::Scenarios);
        Ok(())
    }

    /// Resets everything and returns to LANDING.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` on LANDING and SLIDESHOW.
    pub fn go_home(&mut self) -> Result<(), PlaybackError> {
        self.guard(Command::GoHome)?;
        self.reset();
        self.transition(Screen::Landing);
        Ok(())
    }

    /// Marks claims as revealed. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` off the RESPONSE screen.
    pub fn reveal_claims(&mut self) -> Result<(), PlaybackError> {
        self.guard(Command::RevealClaims)?;
        self.claims_revealed = true;
        Ok(())
    }

    /// Flips the advanced view and returns its new value.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` outside VERIFYING and VERDICT.
    pub fn toggle_advanced_view(&mut self) -> Result<bool, PlaybackError> {
        self.guard(Command::ToggleAdvancedView)?;
        self.advanced_view = !self.advanced_view;
        Ok(self.advanced_view)
    }

    /// Installs a simulation.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` outside VERIFYING and
    /// `PlaybackError::SimulatorAlreadyRunning` if one is in flight; the
    /// running one is untouched either way.
    pub fn start(&mut self, simulator: Simulator, ticker: Ticker) -> Result<(), PlaybackError> {
        self.guard(Command::StartSimulation)?;
        if self.run.is_some() {
            warn!("simulation start rejected; one is already running");
            return Err(PlaybackError::SimulatorAlreadyRunning);
        }
        info!(
            run = %simulator.run_id(),
            claim = %simulator.claim().id,
            total_ticks = simulator.config().total_ticks(),
            "simulation started"
        );
        self.run = Some(ActiveRun { simulator, ticker });
        Ok(())
    }

    /// Ticks that have fired and not yet been applied.
    #[must_use]
    pub fn due_ticks(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.ticker.due())
    }

    /// Blocks for the next wall-clock tick. `false` if none can come.
    #[must_use]
    pub fn wait_tick(&self) -> bool {
        self.run.as_ref().is_some_and(|r| r.ticker.wait())
    }

    /// Applies one simulator tick: records the sample and any event, and on
    /// the final tick transitions to VERDICT.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::SimulatorNotRunning` when nothing is running.
    pub fn apply_tick(&mut self) -> Result<TickOutcome, PlaybackError> {
        let run = self.run.as_mut().ok_or(PlaybackError::SimulatorNotRunning)?;
        let outcome = run
            .simulator
            .tick()
            .ok_or(PlaybackError::SimulatorNotRunning)?;

        self.score_samples.push(outcome.sample);
        if let Some(event) = &outcome.event {
            self.assessment_events.push(event.clone());
        }

        if outcome.finished {
            self.complete()?;
        }
        Ok(outcome)
    }

    fn complete(&mut self) -> Result<(), PlaybackError> {
        if let Some(mut run) = self.run.take() {
            run.cancel();
            info!(
                run = %run.simulator.run_id(),
                ticks = run.simulator.ticks_run(),
                "simulation finished"
            );
        }
        self.guard(Command::CompleteVerification)?;
        self.transition(Screen::Verdict);
        Ok(())
    }

    /// Stops the running simulation, if any, without leaving VERIFYING.
    /// Idempotent. Returns whether something was cancelled.
    pub fn cancel_simulation(&mut self) -> bool {
        let Some(mut run) = self.run.take() else {
            return false;
        };
        run.cancel();
        info!(
            run = %run.simulator.run_id(),
            ticks = run.simulator.ticks_run(),
            "simulation cancelled"
        );
        true
    }

    /// Opens the drawer on `selector`.
    ///
    /// A selector that does not resolve leaves the drawer closed.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::InvalidTransition` outside VERIFYING and
    /// VERDICT, or the `LookupError` from resolution.
    pub fn open_detail(&mut self, selector: DetailSelector) -> AxiomResult<()> {
        self.guard(Command::OpenDetail)?;
        let scenario = self.scenario.as_deref().ok_or(LookupError::NoActiveScenario)?;
        if let Err(e) = resolve(&selector, scenario) {
            debug!(?selector, error = %e, "detail selector did not resolve");
            self.open_detail = None;
            return Err(e.into());
        }
        self.open_detail = Some(selector);
        Ok(())
    }

    /// Closes the drawer. Idempotent.
    pub fn close_detail(&mut self) {
        self.open_detail = None;
    }

    /// The open drawer's content.
    #[must_use]
    pub fn detail(&self) -> Option<DetailPayload<'_>> {
        let selector = self.open_detail.as_ref()?;
        let scenario = self.scenario.as_deref()?;
        resolve(selector, scenario).ok()
    }

    /// Cancels any simulation, then clears every transient field. The
    /// screen is left for the caller to set.
    fn reset(&mut self) {
        self.cancel_simulation();
        self.viewing_id = None;
        self.scenario = None;
        self.score_samples.clear();
        self.assessment_events.clear();
        self.claims_revealed = false;
        self.advanced_view = false;
        self.open_detail = None;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(run) = self.run.as_mut() {
            run.cancel();
        }
    }
}
