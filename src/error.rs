//! Error types for the playback engine.
//!
//! Errors are strongly typed using thiserror and grouped by concern:
//! authored-data and configuration defects, rejected playback operations,
//! drawer lookup misses, and backend transport failures. None of them is
//! fatal; callers either retry with valid input or degrade to fixtures.

use thiserror::Error;

use crate::screen::{Command, Screen};

/// Validation errors raised while loading authored data or configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Field '{field}' has value {value}, outside [0.0, 1.0]")]
    ValueOutOfRange {
        field: String,
        value: f64,
    },

    #[error("Scenario '{scenario}' has no claims")]
    EmptyScenario {
        scenario: String,
    },

    #[error("Scenario id '{id}' is registered twice")]
    DuplicateScenario {
        id: String,
    },

    #[error("Claim id '{claim}' appears twice in scenario '{scenario}'")]
    DuplicateClaimId {
        scenario: String,
        claim: String,
    },

    #[error("Claim '{claim}' has risk score {risk_score} which maps to {expected}, but is authored as {actual}")]
    ActionMismatch {
        claim: String,
        risk_score: f64,
        expected: String,
        actual: String,
    },

    #[error("Claim '{claim}' has verdict {verdict} but is_adverse={is_adverse}")]
    VerdictAdverseMismatch {
        claim: String,
        verdict: String,
        is_adverse: bool,
    },

    #[error("Claim '{claim}' files an assessment by {agent} under key {key}")]
    AgentKeyMismatch {
        claim: String,
        key: String,
        agent: String,
    },

    #[error("Wire verdict {verdict} on claim '{claim}' has no playback equivalent")]
    UnsupportedVerdict {
        claim: String,
        verdict: String,
    },

    #[error("Wire claim type {claim_type} on claim '{claim}' has no playback equivalent")]
    UnsupportedClaimType {
        claim: String,
        claim_type: String,
    },

    #[error("Invalid risk thresholds: rewrite_from ({rewrite_from}) must be below allow_above ({allow_above})")]
    InvalidThresholds {
        allow_above: f64,
        rewrite_from: f64,
    },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidConfig {
        key: String,
        value: String,
    },

    #[error("Malformed fixture '{name}': {message}")]
    MalformedFixture {
        name: String,
        message: String,
    },
}

/// Rejected session operations.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Invalid transition: {command} is not allowed from {from}")]
    InvalidTransition {
        from: Screen,
        command: Command,
    },

    #[error("Unknown scenario: {id}")]
    UnknownScenario {
        id: String,
    },

    #[error("A simulator is already running for this session")]
    SimulatorAlreadyRunning,

    #[error("No simulator is running for this session")]
    SimulatorNotRunning,

    #[error("No scenario is active")]
    NoActiveScenario,
}

/// Lookup misses. The drawer treats every variant as "not found".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("Unknown claim: {claim_id}")]
    UnknownClaim {
        claim_id: String,
    },

    #[error("Unknown agent '{agent}' for claim {claim_id}")]
    UnknownAgent {
        agent: String,
        claim_id: String,
    },

    #[error("No scenario is active")]
    NoActiveScenario,

    #[error("No fixture scenario matches the submitted response")]
    NoFixtureForResponse,

    #[error("Unknown verification session: {id}")]
    UnknownSession {
        id: String,
    },
}

/// Transport errors for the optional backend bridge.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Backend unavailable: {message}")]
    BackendUnavailable {
        message: String,
    },

    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
    },

    #[error("Failed to serialize request: {message}")]
    SerializationFailed {
        message: String,
    },

    #[error("Failed to deserialize response: {message}")]
    DeserializationFailed {
        message: String,
    },

    #[error("Server error (code {code}): {message}")]
    ServerError {
        code: u16,
        message: String,
    },
}

/// Top-level error type for the playback engine.
#[derive(Debug, Error)]
pub enum AxiomError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Not found: {0}")]
    Lookup(#[from] LookupError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl AxiomError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a rejected playback operation.
    #[must_use]
    pub const fn is_playback(&self) -> bool {
        matches!(self, Self::Playback(_))
    }

    /// Returns true if this is a lookup miss.
    #[must_use]
    pub const fn is_lookup(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }

    /// Returns true if this is a transport error.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns true if this is an `InvalidTransition` rejection.
    #[must_use]
    pub const fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::Playback(PlaybackError::InvalidTransition { .. }))
    }

    /// Returns true if a caller may reasonably retry the same call.
    ///
    /// The engine itself never retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => match e {
                TransportError::BackendUnavailable { .. }
                | TransportError::ConnectionFailed { .. } => true,
                TransportError::ServerError { code, .. } => *code >= 500,
                _ => false,
            },
            Self::Validation(_) | Self::Playback(_) | Self::Lookup(_) | Self::Internal { .. } => {
                false
            }
        }
    }
}

/// Result type alias for engine operations.
pub type AxiomResult<T> = Result<T, AxiomError>;
