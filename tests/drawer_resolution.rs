use axiom_player::{
    resolve, AgentName, Catalog, DetailPayload, DetailSelector, LookupError, RiskAction,
};

fn selectors() -> Vec<DetailSelector> {
    let mut out = vec![DetailSelector::Settlement];
    for claim_id in ["CLM-001", "CLM-002", "CLM-003"] {
        out.push(DetailSelector::claim(claim_id));
        for agent in AgentName::ALL {
            out.push(DetailSelector::agent(agent, claim_id));
        }
    }
    out
}

#[test]
fn resolution_is_pure() {
    let catalog = Catalog::builtin().unwrap();
    for scenario in catalog.iter() {
        let before = scenario.fingerprint();
        for selector in selectors() {
            let a = resolve(&selector, scenario).unwrap();
            let b = resolve(&selector, scenario).unwrap();
            assert_eq!(a, b, "{}: {selector:?}", scenario.id);
            assert_eq!(
                serde_json::to_string(&a).unwrap(),
                serde_json::to_string(&b).unwrap()
            );
        }
        assert_eq!(scenario.fingerprint(), before);
    }
}

#[test]
fn misses_are_lookup_errors() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("finance_true").unwrap();

    let err = resolve(&DetailSelector::claim("CLM-004"), scenario).unwrap_err();
    assert!(matches!(err, LookupError::UnknownClaim { ref claim_id } if claim_id == "CLM-004"));

    let err = resolve(
        &DetailSelector::Agent {
            agent: "OracleBot".to_string(),
            claim_id: "CLM-001".to_string(),
        },
        scenario,
    )
    .unwrap_err();
    assert!(matches!(err, LookupError::UnknownAgent { ref agent, .. } if agent == "OracleBot"));
}

#[test]
fn agent_payload_carries_profile_and_findings() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("legal_false").unwrap();
    let payload = resolve(
        &DetailSelector::agent(AgentName::RetrieverAgent, "CLM-001"),
        scenario,
    )
    .unwrap();
    let DetailPayload::Agent {
        profile,
        claim,
        assessment,
    } = payload
    else {
        panic!("expected an agent payload");
    };
    assert_eq!(profile.name, AgentName::RetrieverAgent);
    assert_eq!(claim.id, "CLM-001");
    assert_eq!(assessment.agent, AgentName::RetrieverAgent);
    assert!(!assessment.findings.is_empty());
}

#[test]
fn settlement_payload_lists_every_claim() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("legal_false").unwrap();
    let DetailPayload::Settlement {
        settlement,
        claims,
        computed_evidence,
        overall_action,
    } = resolve(&DetailSelector::Settlement, scenario).unwrap()
    else {
        panic!("expected a settlement payload");
    };
    assert_eq!(claims.len(), scenario.claims.len());
    assert_eq!(settlement.recommendation, scenario.settlement.recommendation);
    assert_eq!(computed_evidence, settlement.evidence);
    assert_eq!(overall_action, RiskAction::Block);
    assert!(claims.iter().any(|c| c.action == RiskAction::Rewrite));
}
