//! Scenario records: a prompt, a generated response, and its authored verification.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::claim::Claim;
use crate::error::ValidationError;
use crate::policy::RiskPolicy;
use crate::settlement::Settlement;

/// One scripted walkthrough. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Catalog key, e.g. `finance_false`.
    pub id: String,
    /// Short display label.
    pub label: String,
    /// Domain the response belongs to (finance, legal, ...).
    pub domain: String,
    /// One-line hook.
    pub tagline: String,
    /// Background shown on the INTRO screen.
    pub context: String,
    /// What the user asked.
    pub prompt: String,
    /// What the model answered.
    pub response: String,
    /// Claims extracted from `response`, in display order.
    pub claims: Vec<Claim>,
    /// Oracle settlement for the response as a whole.
    pub settlement: Settlement,
    /// What would have happened had the response shipped unchecked.
    pub impact: String,
}

impl Scenario {
    /// Validates the scenario against `policy`.
    ///
    /// Checks that claims exist and have unique ids, every claim's action
    /// matches its risk score, `verdict == FALSE` iff `is_adverse`, and all
    /// scores lie in [0.0, 1.0].
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found.
    pub fn validate(&self, policy: &RiskPolicy) -> Result<(), ValidationError> {
        if self.claims.is_empty() {
            return Err(ValidationError::EmptyScenario {
                scenario: self.id.clone(),
            });
        }

        let mut seen = HashSet::with_capacity(self.claims.len());
        for claim in &self.claims {
            if !seen.insert(claim.id.as_str()) {
                return Err(ValidationError::DuplicateClaimId {
                    scenario: self.id.clone(),
                    claim: claim.id.clone(),
                });
            }
            claim.validate()?;
            policy.check(claim)?;
        }

        self.settlement.validate(&self.id)
    }

    /// The claim handed to the score simulator: the first one.
    #[must_use]
    pub fn primary_claim(&self) -> Option<&Claim> {
        self.claims.first()
    }

    /// Looks up a claim by id.
    #[must_use]
    pub fn claim(&self, claim_id: &str) -> Option<&Claim> {
        self.claims.iter().find(|c| c.id == claim_id)
    }

    /// Whether any claim is adverse ("issues found").
    #[must_use]
    pub fn has_issues(&self) -> bool {
        self.claims.iter().any(|c| c.is_adverse)
    }

    /// Ids of the adverse claims, in display order.
    #[must_use]
    pub fn adverse_claim_ids(&self) -> Vec<&str> {
        self.claims
            .iter()
            .filter(|c| c.is_adverse)
            .map(|c| c.id.as_str())
            .collect()
    }

    /// Stable content digest (hex BLAKE3 of the canonical JSON encoding).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        // Serializing plain data with string-keyed maps cannot fail.
        if let Ok(bytes) = serde_json::to_vec(self) {
            hasher.update(&bytes);
        }
        hasher.finalize().to_hex().to_string()
    }
}
