//! Catalog-backed implementation of the verification backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::assessment::AgentName;
use crate::catalog::Catalog;
use crate::error::{AxiomError, AxiomResult, LookupError};
use crate::policy::overall_action;
use crate::scenario::Scenario;

use super::stream::VerificationStream;
use super::wire::{
    AgentInfo, AgentQuote, HealthStatus, RiskUpdate, SessionSummary, SettlementEvent,
    StreamEvent, VerificationSession, VerifyRequest, WireClaim,
};
use super::VerificationBackend;

/// Sessions kept by a [`FixtureBackend`]; the oldest is evicted first.
pub const SESSION_CAPACITY: usize = 64;

/// Serves every backend operation from the local catalog.
///
/// Verified and demo sessions are kept in memory so `session` and
/// `sessions` behave like the live backend, up to [`SESSION_CAPACITY`].
#[derive(Debug)]
pub struct FixtureBackend {
    catalog: Arc<Catalog>,
    sessions: Mutex<VecDeque<VerificationSession>>,
}

impl FixtureBackend {
    /// Serves `catalog` with an empty session store.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            sessions: Mutex::new(VecDeque::new()),
        }
    }

    /// The catalog fixtures are served from.
    #[must_use]
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    fn lock(&self) -> AxiomResult<MutexGuard<'_, VecDeque<VerificationSession>>> {
        self.sessions
            .lock()
            .map_err(|_| AxiomError::internal("fixture session store poisoned"))
    }

    fn scenario_for(&self, request: &VerifyRequest) -> AxiomResult<Arc<Scenario>> {
        self.catalog
            .find_by_response(&request.response)
            .cloned()
            .ok_or_else(|| LookupError::NoFixtureForResponse.into())
    }

    fn record(&self, scenario: &Scenario) -> AxiomResult<VerificationSession> {
        let session = VerificationSession::from_scenario(scenario);
        let mut sessions = self.lock()?;
        if sessions.len() == SESSION_CAPACITY {
            sessions.pop_front();
        }
        sessions.push_back(session.clone());
        Ok(session)
    }
}

impl VerificationBackend for FixtureBackend {
    fn health(&self) -> AxiomResult<HealthStatus> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            demo_mode: true,
        })
    }

    fn verify(&self, request: &VerifyRequest) -> AxiomResult<VerificationSession> {
        let scenario = self.scenario_for(request)?;
        self.record(&scenario)
    }

    fn extract_claims(&self, request: &VerifyRequest) -> AxiomResult<Vec<WireClaim>> {
        let scenario = self.scenario_for(request)?;
        Ok(VerificationSession::from_scenario(&scenario).claims)
    }

    fn session(&self, id: &str) -> AxiomResult<VerificationSession> {
        self.lock()?
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| LookupError::UnknownSession { id: id.to_string() }.into())
    }

    fn sessions(&self) -> AxiomResult<Vec<SessionSummary>> {
        Ok(self.lock()?.iter().map(VerificationSession::summary).collect())
    }

    fn demo(&self, scenario_id: &str) -> AxiomResult<VerificationSession> {
        let scenario = self.catalog.require(&scenario_id.replace('-', "_"))?;
        self.record(&scenario)
    }

    fn agents(&self) -> AxiomResult<Vec<AgentInfo>> {
        Ok(AgentName::ALL.into_iter().map(AgentInfo::from).collect())
    }

    fn stream(&self, request: &VerifyRequest) -> AxiomResult<VerificationStream> {
        let Some(scenario) = self.catalog.find_by_response(&request.response).cloned() else {
            let message = if request.response.trim().is_empty() {
                "Response text is required."
            } else {
                "No fixture scenario matches the submitted response."
            };
            return Ok(VerificationStream::from_events([StreamEvent::Error {
                message: message.to_string(),
            }]));
        };
        let session = self.record(&scenario)?;
        Ok(VerificationStream::from_events(replay(&scenario, &session)))
    }
}

/// The event sequence the live backend would stream for `scenario`.
///
/// `session_created`, `claims_extracted`, then per claim one `agent_quote`
/// per assessment followed by its `risk_update`, and finally `settlement`.
#[must_use]
pub fn replay(scenario: &Scenario, session: &VerificationSession) -> Vec<StreamEvent> {
    let mut events = vec![
        StreamEvent::SessionCreated {
            session_id: session.id.clone(),
            prompt: scenario.prompt.clone(),
        },
        StreamEvent::ClaimsExtracted {
            claims: session.claims.clone(),
        },
    ];

    for claim in &scenario.claims {
        for assessment in claim.assessments.values() {
            events.push(StreamEvent::AgentQuote(AgentQuote {
                claim_id: claim.id.clone(),
                agent_name: assessment.agent.as_str().to_string(),
                position: assessment.stance,
                confidence: assessment.confidence,
                summary: assessment.summary.clone(),
                findings_count: assessment.findings.len(),
            }));
        }
        events.push(StreamEvent::RiskUpdate(RiskUpdate {
            claim_id: claim.id.clone(),
            risk_score: claim.risk_score,
            verdict: claim.verdict.into(),
            action: claim.action,
            rationale: claim.rationale.clone(),
        }));
    }

    if let Some(settlement) = &session.settlement {
        let mut settlement = settlement.clone();
        settlement.settled_at = Some(Utc::now().naive_utc());
        events.push(StreamEvent::Settlement(SettlementEvent {
            settlement,
            overall_action: overall_action(&scenario.claims),
        }));
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::stream::{RemoteRun, RemoteStatus};
    use crate::bridge::wire::StreamEventKind;
    use crate::policy::RiskAction;

    fn backend() -> FixtureBackend {
        FixtureBackend::new(Arc::new(Catalog::builtin().unwrap()))
    }

    #[test]
    fn test_demo_and_session_store() {
        let backend = backend();
        let session = backend.demo("finance-false").unwrap();
        assert_eq!(session.verifications.len(), 4);
        assert_eq!(session.overall_action, Some(RiskAction::Block));

        let fetched = backend.session(&session.id).unwrap();
        assert_eq!(fetched, session);

        let listed = backend.sessions().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].claims_count, 4);

        let err = backend.session("SES-FFFFFFFF").unwrap_err();
        assert!(err.is_lookup());
    }

    #[test]
    fn test_session_store_evicts_oldest() {
        let backend = backend();
        let recorded: Vec<VerificationSession> = (0..=SESSION_CAPACITY)
            .map(|_| backend.demo("legal_true").unwrap())
            .collect();
        assert_eq!(backend.sessions().unwrap().len(), SESSION_CAPACITY);
        assert!(backend.session(&recorded[0].id).unwrap_err().is_lookup());
        let last = recorded.last().unwrap();
        assert_eq!(&backend.session(&last.id).unwrap(), last);
    }

    #[test]
    fn test_verify_matches_response() {
        let backend = backend();
        let scenario = backend.catalog().get("finance_true").unwrap().clone();
        let session = backend.verify(&VerifyRequest::from(scenario.as_ref())).unwrap();
        assert_eq!(session.overall_action, Some(RiskAction::Allow));

        let unknown = VerifyRequest {
            prompt: "p".to_string(),
            response: "Something no fixture says.".to_string(),
            domain: "finance".to_string(),
        };
        assert!(matches!(
            backend.verify(&unknown),
            Err(AxiomError::Lookup(LookupError::NoFixtureForResponse))
        ));
    }

    #[test]
    fn test_agents_registry() {
        let agents = backend().agents().unwrap();
        let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["NumericVerifier", "RetrieverAgent", "ConsistencyBot"]);
    }

    #[test]
    fn test_replay_order() {
        let backend = backend();
        let scenario = backend.catalog().get("legal_false").unwrap().clone();
        let session = VerificationSession::from_scenario(&scenario);
        let kinds: Vec<StreamEventKind> = replay(&scenario, &session)
            .iter()
            .map(StreamEvent::kind)
            .collect();

        assert_eq!(kinds[0], StreamEventKind::SessionCreated);
        assert_eq!(kinds[1], StreamEventKind::ClaimsExtracted);
        assert_eq!(*kinds.last().unwrap(), StreamEventKind::Settlement);
        let updates = kinds
            .iter()
            .filter(|k| **k == StreamEventKind::RiskUpdate)
            .count();
        assert_eq!(updates, scenario.claims.len());
    }

    #[test]
    fn test_stream_settles() {
        let backend = backend();
        let scenario = backend.catalog().get("finance_false").unwrap().clone();
        let mut run = RemoteRun::new(backend.stream(&VerifyRequest::from(scenario.as_ref())).unwrap());
        run.drain();
        assert_eq!(run.status(), &RemoteStatus::Settled);
        assert_eq!(run.risk_updates().len(), 4);
        assert_eq!(
            run.settlement().unwrap().settlement.recommendation,
            scenario.settlement.recommendation
        );
    }

    #[test]
    fn test_stream_unknown_response_fails() {
        let request = VerifyRequest {
            prompt: String::new(),
            response: String::new(),
            domain: "finance".to_string(),
        };
        let mut run = RemoteRun::new(backend().stream(&request).unwrap());
        run.drain();
        assert!(matches!(run.status(), RemoteStatus::Failed { .. }));
    }
}
