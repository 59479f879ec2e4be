//! Verifier agents, their assessments, and the findings backing them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LookupError, ValidationError};

/// Ensures a score lies in the closed unit interval.
pub(crate) fn ensure_unit(field: impl Into<String>, value: f64) -> Result<(), ValidationError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::ValueOutOfRange {
            field: field.into(),
            value,
        })
    }
}

/// The three verifier agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgentName {
    /// Structured data and numeric validation.
    NumericVerifier,
    /// Semantic evidence retrieval.
    RetrieverAgent,
    /// Cross-claim logical consistency.
    ConsistencyBot,
}

impl AgentName {
    /// All agents in display order.
    pub const ALL: [Self; 3] = [Self::NumericVerifier, Self::RetrieverAgent, Self::ConsistencyBot];

    /// The agent's display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NumericVerifier => "NumericVerifier",
            Self::RetrieverAgent => "RetrieverAgent",
            Self::ConsistencyBot => "ConsistencyBot",
        }
    }

    /// Static metadata for this agent.
    #[must_use]
    pub fn profile(self) -> &'static AgentProfile {
        match self {
            Self::NumericVerifier => &AGENT_PROFILES[0],
            Self::RetrieverAgent => &AGENT_PROFILES[1],
            Self::ConsistencyBot => &AGENT_PROFILES[2],
        }
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentName {
    type Err = LookupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|agent| agent.as_str() == s)
            .ok_or_else(|| LookupError::UnknownAgent {
                agent: s.to_string(),
                claim_id: String::new(),
            })
    }
}

/// Agent metadata shown in the drawer and served by `GET /api/agents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentProfile {
    /// Agent identity.
    pub name: AgentName,
    /// One-line description of what the agent checks.
    pub specialty: &'static str,
    /// Reliability weight the verification backend applies to this agent.
    pub reliability_weight: f64,
}

/// Registry of the fixed agent set.
pub static AGENT_PROFILES: [AgentProfile; 3] = [
    AgentProfile {
        name: AgentName::NumericVerifier,
        specialty: "Structured data & numeric validation",
        reliability_weight: 1.0,
    },
    AgentProfile {
        name: AgentName::RetrieverAgent,
        specialty: "Semantic evidence retrieval",
        reliability_weight: 0.9,
    },
    AgentProfile {
        name: AgentName::ConsistencyBot,
        specialty: "Cross-claim logical consistency analysis",
        reliability_weight: 0.8,
    },
];

/// An agent's position on a claim.
///
/// Rendered as LONG (believes the claim) or SHORT (believes it false).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stance {
    /// The claim holds.
    #[serde(rename = "LONG", alias = "SUPPORT")]
    Support,
    /// The claim does not hold.
    #[serde(rename = "SHORT", alias = "OPPOSE")]
    Oppose,
}

impl Stance {
    /// The opposite stance.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Support => Self::Oppose,
            Self::Oppose => Self::Support,
        }
    }

    /// The stance that agrees with a claim's adverse/clean direction.
    #[must_use]
    pub const fn leaning(is_adverse: bool) -> Self {
        if is_adverse {
            Self::Oppose
        } else {
            Self::Support
        }
    }
}

impl fmt::Display for Stance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Support => f.write_str("LONG"),
            Self::Oppose => f.write_str("SHORT"),
        }
    }
}

/// Kind of evidence a finding represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FindingKind {
    Contradiction,
    Confirmed,
    Supports,
    Flag,
    Inconsistency,
    Consistent,
    Pattern,
    NotFound,
}

/// Which side of the evidence ledger a finding counts toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceSide {
    /// Corroborates the claim.
    Supporting,
    /// Undercuts the claim.
    Contradicting,
    /// Raises a question without settling it.
    Neutral,
}

impl FindingKind {
    /// The ledger side this kind of finding is tallied under.
    #[must_use]
    pub const fn side(self) -> EvidenceSide {
        match self {
            Self::Confirmed | Self::Supports | Self::Consistent => EvidenceSide::Supporting,
            Self::Contradiction | Self::NotFound | Self::Inconsistency => {
                EvidenceSide::Contradicting
            }
            Self::Flag | Self::Pattern => EvidenceSide::Neutral,
        }
    }
}

/// One piece of evidence backing an assessment. Never mutated after authoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// What the evidence says about the claim.
    pub kind: FindingKind,
    /// Human-readable description.
    pub text: String,
    /// Where the evidence came from.
    pub source: String,
    /// Relevance to the claim (0.0 to 1.0).
    pub relevance: f64,
}

/// One verifier's stance, confidence, and supporting findings for a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAssessment {
    /// The agent that produced this assessment.
    pub agent: AgentName,
    /// Position taken on the claim.
    pub stance: Stance,
    /// Confidence in the stance (0.0 to 1.0).
    pub confidence: f64,
    /// One-line summary.
    pub summary: String,
    /// Evidence, in authored order.
    #[serde(default)]
    pub findings: Vec<Finding>,
}

impl AgentAssessment {
    /// Checks score ranges on the assessment and its findings.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ValueOutOfRange` for any score outside [0.0, 1.0].
    pub fn validate(&self, claim_id: &str) -> Result<(), ValidationError> {
        ensure_unit(format!("{claim_id}.{}.confidence", self.agent), self.confidence)?;
        for (idx, finding) in self.findings.iter().enumerate() {
            ensure_unit(
                format!("{claim_id}.{}.findings[{idx}].relevance", self.agent),
                finding.relevance,
            )?;
        }
        Ok(())
    }

    /// The finding with the highest relevance.
    #[must_use]
    pub fn top_finding(&self) -> Option<&Finding> {
        self.findings
            .iter()
            .max_by(|a, b| a.relevance.total_cmp(&b.relevance))
    }
}
