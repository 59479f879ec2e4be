//! Settlement: the aggregated verdict and recommendation for a response.

use serde::{Deserialize, Serialize};

use crate::assessment::{ensure_unit, EvidenceSide};
use crate::claim::Claim;
use crate::error::ValidationError;

/// Evidence counts by ledger side.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCounts {
    pub supporting: u32,
    pub contradicting: u32,
    pub neutral: u32,
}

impl EvidenceCounts {
    /// Tallies every finding of every assessment across `claims`.
    #[must_use]
    pub fn tally(claims: &[Claim]) -> Self {
        let mut counts = Self::default();
        let findings = claims
            .iter()
            .flat_map(|c| c.assessments.values())
            .flat_map(|a| a.findings.iter());
        for finding in findings {
            match finding.kind.side() {
                EvidenceSide::Supporting => counts.supporting += 1,
                EvidenceSide::Contradicting => counts.contradicting += 1,
                EvidenceSide::Neutral => counts.neutral += 1,
            }
        }
        counts
    }

    /// Total pieces of evidence.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.supporting + self.contradicting + self.neutral
    }
}

/// The oracle's settlement of a scenario. Read-only during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Name of the settling oracle.
    pub oracle: String,
    /// Confidence in the settlement (0.0 to 1.0).
    pub confidence: f64,
    /// Narrative summary.
    pub summary: String,
    /// Authored evidence counts.
    pub evidence: EvidenceCounts,
    /// What to do with the response.
    pub recommendation: String,
}

impl Settlement {
    /// Checks the confidence range.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ValueOutOfRange` for a confidence outside [0.0, 1.0].
    pub fn validate(&self, scenario_id: &str) -> Result<(), ValidationError> {
        ensure_unit(format!("{scenario_id}.settlement.confidence"), self.confidence)
    }
}
