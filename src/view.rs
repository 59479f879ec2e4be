//! Read-only view models derived from a scenario.

use std::ops::Range;

use serde::Serialize;

use crate::claim::Claim;
use crate::policy::{overall_action, RiskAction};
use crate::scenario::Scenario;
use crate::settlement::EvidenceCounts;

/// A claim's span within the scenario response.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Highlight {
    pub claim_id: String,
    /// Byte range into the response text.
    pub range: Range<usize>,
    /// The matched text as it appears in the response.
    pub text: String,
    pub is_adverse: bool,
    pub action: RiskAction,
}

/// One highlight per claim whose span is found in the response, in
/// response order.
#[must_use]
pub fn highlights(scenario: &Scenario) -> Vec<Highlight> {
    let mut out: Vec<Highlight> = scenario
        .claims
        .iter()
        .filter_map(|claim| highlight(claim, &scenario.response))
        .collect();
    out.sort_by_key(|h| h.range.start);
    out
}

fn highlight(claim: &Claim, response: &str) -> Option<Highlight> {
    let range = claim.highlight_in(response)?;
    Some(Highlight {
        claim_id: claim.id.clone(),
        text: response.get(range.clone())?.to_string(),
        range,
        is_adverse: claim.is_adverse,
        action: claim.action,
    })
}

/// What the VERDICT screen shows.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerdictSummary {
    pub scenario_id: String,
    /// `true` when any claim is adverse.
    pub issues_found: bool,
    pub adverse_claim_ids: Vec<String>,
    pub overall_action: RiskAction,
    /// Authored recommendation, verbatim.
    pub recommendation: String,
    pub oracle: String,
    pub confidence: f64,
    pub evidence: EvidenceCounts,
    pub claim_count: usize,
    pub blocked: usize,
    pub rewritten: usize,
    pub allowed: usize,
    /// Last simulated score, if a simulation ran.
    pub final_score: Option<f64>,
}

impl VerdictSummary {
    /// Summarizes `scenario`, with the simulator's last score if known.
    #[must_use]
    pub fn new(scenario: &Scenario, final_score: Option<f64>) -> Self {
        let count = |action: RiskAction| scenario.claims.iter().filter(|c| c.action == action).count();
        let settlement = &scenario.settlement;
        Self {
            scenario_id: scenario.id.clone(),
            issues_found: scenario.has_issues(),
            adverse_claim_ids: scenario
                .adverse_claim_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
            overall_action: overall_action(&scenario.claims),
            recommendation: settlement.recommendation.clone(),
            oracle: settlement.oracle.clone(),
            confidence: settlement.confidence,
            evidence: settlement.evidence,
            claim_count: scenario.claims.len(),
            blocked: count(RiskAction::Block),
            rewritten: count(RiskAction::Rewrite),
            allowed: count(RiskAction::Allow),
            final_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_highlights_in_response_order() {
        let catalog = Catalog::builtin().unwrap();
        let scenario = catalog.get("finance_false").unwrap();
        let hs = highlights(scenario);
        assert!(!hs.is_empty());
        assert!(hs.windows(2).all(|w| w[0].range.start <= w[1].range.start));
        for h in &hs {
            assert_eq!(&scenario.response[h.range.clone()], h.text);
        }
    }

    #[test]
    fn test_verdict_summary_counts() {
        let catalog = Catalog::builtin().unwrap();
        let scenario = catalog.get("legal_false").unwrap();
        let summary = VerdictSummary::new(scenario, Some(0.05));
        assert!(summary.issues_found);
        assert_eq!(summary.claim_count, 3);
        assert_eq!(summary.blocked, 2);
        assert_eq!(summary.rewritten, 1);
        assert_eq!(summary.allowed, 0);
        assert_eq!(summary.adverse_claim_ids.len(), 3);
        assert_eq!(summary.recommendation, scenario.settlement.recommendation);
    }
}
