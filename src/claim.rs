//! Claims extracted from a generated response.
//!
//! A claim carries its authored verdict, action, and every agent's
//! assessment. Claims are owned by the catalog and never mutated during
//! playback.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};

use crate::assessment::{ensure_unit, AgentAssessment, AgentName};
use crate::error::ValidationError;
use crate::policy::RiskAction;

/// The kind of assertion a claim makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClaimType {
    /// A figure, percentage, or amount.
    Numeric,
    /// Something that happened.
    Event,
    /// A fact about an organisation or person.
    Entity,
    /// A citation to a court decision.
    CaseLaw,
    /// A statement about the law in general.
    Legal,
}

/// How damaging the claim would be if wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Med,
    High,
    Critical,
}

/// Authored truth value of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    True,
    False,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::True => f.write_str("TRUE"),
            Self::False => f.write_str("FALSE"),
        }
    }
}

/// A single factual assertion and its authored verification outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    /// Unique within its scenario.
    pub id: String,
    /// The claim as a short declarative sentence.
    pub text: String,
    /// Kind of assertion.
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    /// Damage if wrong.
    pub severity: Severity,
    /// Whether the claim is false or fabricated in this scenario.
    pub is_adverse: bool,
    /// Span of the scenario response this claim was extracted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
    /// Factuality score: 1.0 is certainly true, 0.0 certainly false.
    pub risk_score: f64,
    /// Authored truth value.
    pub verdict: Verdict,
    /// Authored action; must agree with `risk_score` under the risk policy.
    pub action: RiskAction,
    /// Why the verdict was reached.
    pub rationale: String,
    /// Per-agent assessments.
    #[serde(default)]
    pub assessments: BTreeMap<AgentName, AgentAssessment>,
}

impl Claim {
    /// The assessment filed by `agent`, if any.
    #[must_use]
    pub fn assessment(&self, agent: AgentName) -> Option<&AgentAssessment> {
        self.assessments.get(&agent)
    }

    /// Checks score ranges, the verdict/adverse convention, and assessment keys.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_unit(format!("{}.risk_score", self.id), self.risk_score)?;

        if (self.verdict == Verdict::False) != self.is_adverse {
            return Err(ValidationError::VerdictAdverseMismatch {
                claim: self.id.clone(),
                verdict: self.verdict.to_string(),
                is_adverse: self.is_adverse,
            });
        }

        for (key, assessment) in &self.assessments {
            if *key != assessment.agent {
                return Err(ValidationError::AgentKeyMismatch {
                    claim: self.id.clone(),
                    key: key.to_string(),
                    agent: assessment.agent.to_string(),
                });
            }
            assessment.validate(&self.id)?;
        }
        Ok(())
    }

    /// Byte range of this claim's highlight span within `response`.
    ///
    /// Tries an exact match first, then a case-insensitive match that
    /// tolerates differing whitespace. Absent or unmatched spans yield `None`.
    #[must_use]
    pub fn highlight_in(&self, response: &str) -> Option<Range<usize>> {
        let span = self.highlight.as_deref()?.trim();
        if span.is_empty() {
            return None;
        }

        if let Some(start) = response.find(span) {
            return Some(start..start + span.len());
        }

        let pattern = span
            .split_whitespace()
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"\s+");
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .ok()?;
        re.find(response).map(|m| m.range())
    }
}

/// Minimal claim for unit tests in sibling modules.
#[cfg(test)]
pub(crate) fn test_claim(id: &str, risk_score: f64, action: RiskAction) -> Claim {
    let is_adverse = action == RiskAction::Block;
    Claim {
        id: id.to_string(),
        text: format!("Claim {id}"),
        claim_type: ClaimType::Numeric,
        severity: Severity::Med,
        is_adverse,
        highlight: None,
        risk_score,
        verdict: if is_adverse { Verdict::False } else { Verdict::True },
        action,
        rationale: String::new(),
        assessments: BTreeMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::Stance;

    const RESPONSE: &str = "Acme Corp delivered exceptional results in Q3 2024. \
        Revenue grew 28% quarter-over-quarter to $2.19 billion.";

    #[test]
    fn test_claim_type_wire_spelling() {
        assert_eq!(serde_json::to_string(&ClaimType::CaseLaw).unwrap(), "\"CASE_LAW\"");
        assert_eq!(serde_json::to_string(&Severity::Med).unwrap(), "\"MED\"");
    }

    #[test]
    fn test_validate_verdict_convention() {
        let mut claim = test_claim("CLM-001", 0.1, RiskAction::Block);
        assert!(claim.validate().is_ok());
        claim.is_adverse = false;
        assert!(matches!(
            claim.validate(),
            Err(ValidationError::VerdictAdverseMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_agent_key() {
        let mut claim = test_claim("CLM-001", 0.1, RiskAction::Block);
        claim.assessments.insert(
            AgentName::ConsistencyBot,
            AgentAssessment {
                agent: AgentName::RetrieverAgent,
                stance: Stance::Oppose,
                confidence: 0.8,
                summary: String::new(),
                findings: Vec::new(),
            },
        );
        assert!(matches!(
            claim.validate(),
            Err(ValidationError::AgentKeyMismatch { .. })
        ));
    }

    #[test]
    fn test_validate_risk_range() {
        let claim = test_claim("CLM-001", -0.1, RiskAction::Block);
        assert!(matches!(
            claim.validate(),
            Err(ValidationError::ValueOutOfRange { .. })
        ));
    }

    #[test]
    fn test_highlight_exact() {
        let mut claim = test_claim("CLM-001", 0.1, RiskAction::Block);
        claim.highlight = Some("Revenue grew 28%".to_string());
        let range = claim.highlight_in(RESPONSE).unwrap();
        assert_eq!(&RESPONSE[range], "Revenue grew 28%");
    }

    #[test]
    fn test_highlight_whitespace_tolerant() {
        let mut claim = test_claim("CLM-001", 0.1, RiskAction::Block);
        claim.highlight = Some("revenue  grew\n28%".to_string());
        let range = claim.highlight_in(RESPONSE).unwrap();
        assert_eq!(&RESPONSE[range], "Revenue grew 28%");
    }

    #[test]
    fn test_highlight_unmatched_or_absent() {
        let mut claim = test_claim("CLM-001", 0.1, RiskAction::Block);
        assert!(claim.highlight_in(RESPONSE).is_none());
        claim.highlight = Some("Revenue fell".to_string());
        assert!(claim.highlight_in(RESPONSE).is_none());
    }
}
