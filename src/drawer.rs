//! Evidence drawer: resolves a detail selector against the active scenario.
//!
//! Resolution is a pure function. It borrows from the scenario, never
//! mutates it, and reports a miss as a [`LookupError`] so the caller can
//! leave the drawer closed.

use serde::{Deserialize, Serialize};

use crate::assessment::{AgentAssessment, AgentName, AgentProfile};
use crate::claim::{Claim, Verdict};
use crate::error::LookupError;
use crate::policy::{overall_action, RiskAction};
use crate::scenario::Scenario;
use crate::settlement::{EvidenceCounts, Settlement};

/// What the drawer should show.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailSelector {
    /// One agent's assessment of one claim.
    Agent { agent: String, claim_id: String },
    /// A claim and all of its assessments.
    Claim { claim_id: String },
    /// The scenario's settlement.
    Settlement,
}

impl DetailSelector {
    /// Selector for `agent` on `claim_id`.
    #[must_use]
    pub fn agent(agent: AgentName, claim_id: impl Into<String>) -> Self {
        Self::Agent {
            agent: agent.as_str().to_string(),
            claim_id: claim_id.into(),
        }
    }

    /// Selector for `claim_id`.
    #[must_use]
    pub fn claim(claim_id: impl Into<String>) -> Self {
        Self::Claim {
            claim_id: claim_id.into(),
        }
    }
}

/// One row of the settlement drawer's claim list.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimSummary<'a> {
    pub id: &'a str,
    pub text: &'a str,
    pub verdict: Verdict,
    pub action: RiskAction,
    pub risk_score: f64,
    pub is_adverse: bool,
}

impl<'a> From<&'a Claim> for ClaimSummary<'a> {
    fn from(claim: &'a Claim) -> Self {
        Self {
            id: &claim.id,
            text: &claim.text,
            verdict: claim.verdict,
            action: claim.action,
            risk_score: claim.risk_score,
            is_adverse: claim.is_adverse,
        }
    }
}

/// Resolved drawer content.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailPayload<'a> {
    Agent {
        profile: &'static AgentProfile,
        claim: &'a Claim,
        assessment: &'a AgentAssessment,
    },
    Claim {
        claim: &'a Claim,
    },
    Settlement {
        settlement: &'a Settlement,
        claims: Vec<ClaimSummary<'a>>,
        /// Findings tallied from the claims, next to the authored counts.
        computed_evidence: EvidenceCounts,
        overall_action: RiskAction,
    },
}

/// Resolves `selector` against `scenario`.
///
/// # Errors
///
/// Returns `LookupError::UnknownClaim` or `LookupError::UnknownAgent` when
/// the selector names something the scenario does not contain.
pub fn resolve<'a>(
    selector: &DetailSelector,
    scenario: &'a Scenario,
) -> Result<DetailPayload<'a>, LookupError> {
    match selector {
        DetailSelector::Agent { agent, claim_id } => {
            let claim = find_claim(scenario, claim_id)?;
            let unknown_agent = || LookupError::UnknownAgent {
                agent: agent.clone(),
                claim_id: claim_id.clone(),
            };
            let name: AgentName = agent.parse().map_err(|_| unknown_agent())?;
            let assessment = claim.assessment(name).ok_or_else(unknown_agent)?;
            Ok(DetailPayload::Agent {
                profile: name.profile(),
                claim,
                assessment,
            })
        }
        DetailSelector::Claim { claim_id } => Ok(DetailPayload::Claim {
            claim: find_claim(scenario, claim_id)?,
        }),
        DetailSelector::Settlement => Ok(DetailPayload::Settlement {
            settlement: &scenario.settlement,
            claims: scenario.claims.iter().map(ClaimSummary::from).collect(),
            computed_evidence: EvidenceCounts::tally(&scenario.claims),
            overall_action: overall_action(&scenario.claims),
        }),
    }
}

fn find_claim<'a>(scenario: &'a Scenario, claim_id: &str) -> Result<&'a Claim, LookupError> {
    scenario
        .claim(claim_id)
        .ok_or_else(|| LookupError::UnknownClaim {
            claim_id: claim_id.to_string(),
        })
}
