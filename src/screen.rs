//! Screens of the guided walkthrough and the transition table between them.
//!
//! The forward path is
//! `LANDING → SLIDESHOW → SCENARIOS → INTRO → PROMPT → RESPONSE → VERIFYING → VERDICT`.
//! `SCENARIOS → INTRO` happens only through scenario selection and
//! `VERIFYING → VERDICT` only through simulator completion; neither is a
//! manual advance.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A screen of the walkthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Screen {
    /// Title screen.
    Landing,
    /// Narrative slides introducing the problem.
    Slideshow,
    /// Scenario picker.
    Scenarios,
    /// Scenario context card.
    Intro,
    /// The user prompt.
    Prompt,
    /// The generated response, with claims optionally highlighted.
    Response,
    /// Live-looking multi-agent verification.
    Verifying,
    /// Final verdict with the evidence drawer.
    Verdict,
}

impl Screen {
    /// All screens in walkthrough order.
    pub const ALL: [Self; 8] = [
        Self::Landing,
        Self::Slideshow,
        Self::Scenarios,
        Self::Intro,
        Self::Prompt,
        Self::Response,
        Self::Verifying,
        Self::Verdict,
    ];

    /// The screen a manual advance leads to, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Landing => Some(Self::Slideshow),
            Self::Slideshow => Some(Self::Scenarios),
            Self::Intro => Some(Self::Prompt),
            Self::Prompt => Some(Self::Response),
            Self::Response => Some(Self::Verifying),
            Self::Scenarios | Self::Verifying | Self::Verdict => None,
        }
    }

    /// Whether `command` is accepted on this screen.
    #[must_use]
    pub const fn permits(self, command: Command) -> bool {
        match command {
            Command::Advance => self.next().is_some(),
            Command::SkipIntro => matches!(self, Self::Landing),
            Command::SelectScenario | Command::GoHome => {
                !matches!(self, Self::Landing | Self::Slideshow)
            }
            Command::BrowseScenarios => matches!(self, Self::Verdict),
            Command::RevealClaims => matches!(self, Self::Response),
            Command::ToggleAdvancedView | Command::OpenDetail => {
                matches!(self, Self::Verifying | Self::Verdict)
            }
            Command::StartSimulation | Command::CompleteVerification => {
                matches!(self, Self::Verifying)
            }
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Landing => "LANDING",
            Self::Slideshow => "SLIDESHOW",
            Self::Scenarios => "SCENARIOS",
            Self::Intro => "INTRO",
            Self::Prompt => "PROMPT",
            Self::Response => "RESPONSE",
            Self::Verifying => "VERIFYING",
            Self::Verdict => "VERDICT",
        };
        f.write_str(s)
    }
}

/// Session operations checked against the transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Follow the forward edge.
    Advance,
    /// `LANDING → SCENARIOS`.
    SkipIntro,
    /// Select a scenario and restart at INTRO.
    SelectScenario,
    /// `VERDICT → SCENARIOS`.
    BrowseScenarios,
    /// Highlight claims in the response.
    RevealClaims,
    /// Flip the advanced view.
    ToggleAdvancedView,
    /// Return to LANDING.
    GoHome,
    /// Open the evidence drawer.
    OpenDetail,
    /// Start the score simulator.
    StartSimulation,
    /// Simulator completion signal.
    CompleteVerification,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Advance => "advance",
            Self::SkipIntro => "skip_intro",
            Self::SelectScenario => "select_scenario",
            Self::BrowseScenarios => "browse_scenarios",
            Self::RevealClaims => "reveal_claims",
            Self::ToggleAdvancedView => "toggle_advanced_view",
            Self::GoHome => "go_home",
            Self::OpenDetail => "open_detail",
            Self::StartSimulation => "start_simulation",
            Self::CompleteVerification => "complete_verification",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges() {
        assert_eq!(Screen::Landing.next(), Some(Screen::Slideshow));
        assert_eq!(Screen::Slideshow.next(), Some(Screen::Scenarios));
        assert_eq!(Screen::Intro.next(), Some(Screen::Prompt));
        assert_eq!(Screen::Prompt.next(), Some(Screen::Response));
        assert_eq!(Screen::Response.next(), Some(Screen::Verifying));
    }

    #[test]
    fn test_verifying_rejects_manual_advance() {
        assert!(!Screen::Verifying.permits(Command::Advance));
        assert!(Screen::Verifying.permits(Command::CompleteVerification));
    }

    #[test]
    fn test_scenarios_requires_selection() {
        assert!(!Screen::Scenarios.permits(Command::Advance));
        assert!(Screen::Scenarios.permits(Command::SelectScenario));
    }

    #[test]
    fn test_home_unreachable_before_scenarios() {
        assert!(!Screen::Landing.permits(Command::GoHome));
        assert!(!Screen::Slideshow.permits(Command::GoHome));
        for screen in &Screen::ALL[2..] {
            assert!(screen.permits(Command::GoHome), "{screen}");
        }
    }

    #[test]
    fn test_reveal_only_on_response() {
        for screen in Screen::ALL {
            assert_eq!(
                screen.permits(Command::RevealClaims),
                screen == Screen::Response
            );
        }
    }

    #[test]
    fn test_screen_serde_spelling() {
        let json = serde_json::to_string(&Screen::Verdict).unwrap();
        assert_eq!(json, "\"VERDICT\"");
    }
}
