//! # Axiom Player - Claim-Verification Walkthrough Engine
//!
//! Axiom Player plays back scripted walkthroughs of a claim-verification
//! workflow: a prompt, a generated response, the claims extracted from it,
//! a multi-agent verification that looks live, and a final verdict. All
//! verification outcomes are authored data; the engine animates them and
//! never computes them.
//!
//! ## Core Concepts
//!
//! - **Scenario**: an immutable, authored walkthrough owned by the [`Catalog`]
//! - **Session**: the mutable state of one viewing, driven through [`Screen`]s
//! - **Simulator**: seeded, cancellable score convergence toward a claim's risk score
//! - **Drawer**: a pure resolver from a [`DetailSelector`] to drawer content
//! - **Bridge**: an optional live backend with silent fallback to fixtures
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axiom_player::{Player, PlayerConfig, Screen};
//!
//! let mut player = Player::builtin(PlayerConfig::from_env()?)?;
//! player.skip_intro()?;
//! player.select_scenario("finance_false")?;
//! player.advance()?; // PROMPT
//! player.advance()?; // RESPONSE
//! player.reveal_claims()?;
//! player.advance()?; // VERIFYING, simulator running
//! player.wait_for_verdict()?;
//! assert_eq!(player.screen(), Screen::Verdict);
//! let summary = player.verdict_summary().unwrap();
//! assert!(summary.issues_found);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Authored data model
pub mod assessment;
pub mod catalog;
pub mod claim;
pub mod error;
pub mod policy;
pub mod scenario;
pub mod settlement;

// Playback
pub mod config;
pub mod drawer;
pub mod player;
pub mod screen;
pub mod session;
pub mod simulator;
pub mod view;

// Backend bridge
pub mod bridge;

// Re-export primary types at crate root for convenience
pub use assessment::{
    AgentAssessment, AgentName, AgentProfile, EvidenceSide, Finding, FindingKind, Stance,
    AGENT_PROFILES,
};
pub use catalog::Catalog;
pub use claim::{Claim, ClaimType, Severity, Verdict};
pub use config::PlayerConfig;
pub use drawer::{resolve, ClaimSummary, DetailPayload, DetailSelector};
pub use error::{
    AxiomError, AxiomResult, LookupError, PlaybackError, TransportError, ValidationError,
};
pub use player::Player;
pub use policy::{overall_action, RiskAction, RiskPolicy};
pub use scenario::Scenario;
pub use screen::{Command, Screen};
pub use session::Session;
pub use settlement::{EvidenceCounts, Settlement};
pub use simulator::{
    AssessmentEvent, ClockMode, RandomSource, ScoreSample, SeededRandom, Simulator,
    SimulatorConfig, TickOutcome, Ticker,
};
pub use view::{Highlight, VerdictSummary};

pub use bridge::{
    Bridge, BridgeConfig, BridgeMode, FixtureBackend, RemoteRun, RemoteStatus,
    VerificationBackend, VerificationStream,
};
#[cfg(feature = "bridge")]
pub use bridge::HttpBackend;
