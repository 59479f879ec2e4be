//! Scenario catalog: the static registry of authored scenarios.
//!
//! Scenarios are validated against the risk policy when they enter the
//! catalog, so an authoring defect surfaces at load rather than mid-playback.
//! The catalog hands out `Arc<Scenario>` handles; nothing downstream can
//! mutate a scenario.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{AxiomResult, PlaybackError, ValidationError};
use crate::policy::RiskPolicy;
use crate::scenario::Scenario;

/// Built-in fixtures, in picker order.
const BUILTIN_FIXTURES: [(&str, &str); 3] = [
    ("finance_false", include_str!("catalog/fixtures/finance_false.json")),
    ("finance_true", include_str!("catalog/fixtures/finance_true.json")),
    ("legal_false", include_str!("catalog/fixtures/legal_false.json")),
];

/// Registry of scenarios keyed by id.
#[derive(Debug, Clone)]
pub struct Catalog {
    scenarios: Vec<Arc<Scenario>>,
    index: HashMap<String, usize>,
    policy: RiskPolicy,
}

impl Catalog {
    /// Loads the built-in scenarios under the default risk policy.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if a fixture is malformed or violates the policy.
    pub fn builtin() -> AxiomResult<Self> {
        Self::builtin_with_policy(RiskPolicy::default())
    }

    /// Loads the built-in scenarios under `policy`.
    ///
    /// # Errors
    ///
    /// See [`Catalog::builtin`].
    pub fn builtin_with_policy(policy: RiskPolicy) -> AxiomResult<Self> {
        let scenarios = BUILTIN_FIXTURES
            .iter()
            .map(|(name, json)| parse_fixture(name, json))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_scenarios(scenarios, policy)
    }

    /// Builds a catalog from already-parsed scenarios.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` for an invalid policy, a duplicate id, or
    /// any scenario that fails validation.
    pub fn from_scenarios(
        scenarios: impl IntoIterator<Item = Scenario>,
        policy: RiskPolicy,
    ) -> AxiomResult<Self> {
        policy.validate()?;

        let mut catalog = Self {
            scenarios: Vec::new(),
            index: HashMap::new(),
            policy,
        };

        for scenario in scenarios {
            scenario.validate(&policy)?;
            if catalog.index.contains_key(&scenario.id) {
                return Err(ValidationError::DuplicateScenario { id: scenario.id }.into());
            }
            for claim in &scenario.claims {
                if claim.highlight.is_some() && claim.highlight_in(&scenario.response).is_none() {
                    debug!(scenario = %scenario.id, claim = %claim.id, "highlight span not found in response");
                }
            }
            debug!(
                scenario = %scenario.id,
                claims = scenario.claims.len(),
                fingerprint = %scenario.fingerprint(),
                "scenario loaded"
            );
            catalog
                .index
                .insert(scenario.id.clone(), catalog.scenarios.len());
            catalog.scenarios.push(Arc::new(scenario));
        }

        Ok(catalog)
    }

    /// Builds a catalog from `(name, json)` scenario documents.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if any document is malformed, a scenario
    /// is invalid, or an id is registered twice.
    pub fn from_json_documents<'a>(
        documents: impl IntoIterator<Item = (&'a str, &'a str)>,
        policy: RiskPolicy,
    ) -> AxiomResult<Self> {
        let scenarios = documents
            .into_iter()
            .map(|(name, json)| parse_fixture(name, json))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_scenarios(scenarios, policy)
    }

    /// The policy this catalog was validated against.
    #[must_use]
    pub const fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Looks up a scenario.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Scenario>> {
        self.index.get(id).map(|&idx| &self.scenarios[idx])
    }

    /// Looks up a scenario, failing with `UnknownScenario`.
    ///
    /// # Errors
    ///
    /// Returns `PlaybackError::UnknownScenario` if `id` is not registered.
    pub fn require(&self, id: &str) -> Result<Arc<Scenario>, PlaybackError> {
        self.get(id)
            .cloned()
            .ok_or_else(|| PlaybackError::UnknownScenario { id: id.to_string() })
    }

    /// Whether `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Scenario ids in picker order.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.scenarios.iter().map(|s| s.id.as_str()).collect()
    }

    /// Scenarios in picker order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Scenario>> {
        self.scenarios.iter()
    }

    /// Number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Finds the scenario whose response text equals `response` (whitespace-trimmed).
    #[must_use]
    pub fn find_by_response(&self, response: &str) -> Option<&Arc<Scenario>> {
        let wanted = response.trim();
        self.scenarios.iter().find(|s| s.response.trim() == wanted)
    }
}

fn parse_fixture(name: &str, json: &str) -> Result<Scenario, ValidationError> {
    serde_json::from_str(json).map_err(|e| ValidationError::MalformedFixture {
        name: name.to_string(),
        message: e.to_string(),
    })
}
