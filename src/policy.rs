//! Risk-to-action policy.
//!
//! The playback engine never computes risk from evidence. It publishes the
//! thresholds authored claims must respect and applies them when validating
//! and rendering: `risk > allow_above → ALLOW`,
//! `rewrite_from ≤ risk ≤ allow_above → REWRITE`, `risk < rewrite_from → BLOCK`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::assessment::ensure_unit;
use crate::claim::{Claim, Severity};
use crate::error::ValidationError;

/// What to do with a claim (or a whole response).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskAction {
    /// Deliver unchanged.
    Allow,
    /// Deliver only after rewriting with verified data.
    Rewrite,
    /// Do not deliver.
    Block,
}

impl fmt::Display for RiskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => f.write_str("ALLOW"),
            Self::Rewrite => f.write_str("REWRITE"),
            Self::Block => f.write_str("BLOCK"),
        }
    }
}

/// Published risk thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Scores strictly above this are ALLOW.
    pub allow_above: f64,
    /// Scores at or above this (and not ALLOW) are REWRITE; below are BLOCK.
    pub rewrite_from: f64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            allow_above: 0.80,
            rewrite_from: 0.40,
        }
    }
}

impl RiskPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if a threshold lies outside [0.0, 1.0] or
    /// `rewrite_from` is not below `allow_above`.
    pub fn new(allow_above: f64, rewrite_from: f64) -> Result<Self, ValidationError> {
        let policy = Self {
            allow_above,
            rewrite_from,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Checks the thresholds are ordered and in range.
    ///
    /// # Errors
    ///
    /// See [`RiskPolicy::new`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_unit("allow_above", self.allow_above)?;
        ensure_unit("rewrite_from", self.rewrite_from)?;
        if self.rewrite_from >= self.allow_above {
            return Err(ValidationError::InvalidThresholds {
                allow_above: self.allow_above,
                rewrite_from: self.rewrite_from,
            });
        }
        Ok(())
    }

    /// The action a risk score maps to.
    #[must_use]
    pub fn action_for(&self, risk_score: f64) -> RiskAction {
        if risk_score > self.allow_above {
            RiskAction::Allow
        } else if risk_score >= self.rewrite_from {
            RiskAction::Rewrite
        } else {
            RiskAction::Block
        }
    }

    /// Checks an authored claim's action against its risk score.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ActionMismatch` on an authoring defect.
    pub fn check(&self, claim: &Claim) -> Result<(), ValidationError> {
        let expected = self.action_for(claim.risk_score);
        if expected == claim.action {
            Ok(())
        } else {
            Err(ValidationError::ActionMismatch {
                claim: claim.id.clone(),
                risk_score: claim.risk_score,
                expected: expected.to_string(),
                actual: claim.action.to_string(),
            })
        }
    }
}

/// The response-level action implied by its claims.
///
/// A blocked CRITICAL or HIGH claim blocks the whole response; any other
/// blocked or rewritten claim forces a rewrite; an empty claim list blocks.
#[must_use]
pub fn overall_action(claims: &[Claim]) -> RiskAction {
    if claims.is_empty() {
        return RiskAction::Block;
    }

    let severe_block = claims.iter().any(|c| {
        c.action == RiskAction::Block && matches!(c.severity, Severity::Critical | Severity::High)
    });
    if severe_block {
        return RiskAction::Block;
    }

    if claims.iter().any(|c| c.action != RiskAction::Allow) {
        return RiskAction::Rewrite;
    }

    RiskAction::Allow
}
