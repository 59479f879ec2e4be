use std::sync::Arc;

use axiom_player::{Catalog, Scenario, SeededRandom, Simulator, SimulatorConfig, TickOutcome};

fn run(scenario: &Arc<Scenario>, claim_id: &str, seed: u64) -> Vec<TickOutcome> {
    let config = SimulatorConfig::default().manual();
    let mut sim = Simulator::new(
        Arc::clone(scenario),
        claim_id,
        config,
        Box::new(SeededRandom::seeded(seed)),
    )
    .unwrap();
    std::iter::from_fn(|| sim.tick()).collect()
}

#[test]
fn samples_stay_in_bounds_and_converge() {
    let catalog = Catalog::builtin().unwrap();
    let config = SimulatorConfig::default();
    for scenario in catalog.iter() {
        for claim in &scenario.claims {
            for seed in 0..32 {
                let outcomes = run(scenario, &claim.id, seed);
                assert_eq!(outcomes.len(), config.total_ticks() as usize);
                for o in &outcomes {
                    assert!(
                        (config.floor..=config.ceiling).contains(&o.sample.score),
                        "{}/{} seed {seed}: {}",
                        scenario.id,
                        claim.id,
                        o.sample.score
                    );
                }
                let last = outcomes.last().unwrap().sample.score;
                assert!(
                    (last - claim.risk_score).abs() <= config.noise + 1e-9,
                    "{}/{} seed {seed}: {last} vs {}",
                    scenario.id,
                    claim.id,
                    claim.risk_score
                );
            }
        }
    }
}

#[test]
fn finishes_exactly_once_on_the_last_tick() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("finance_false").unwrap();
    for seed in 0..16 {
        let outcomes = run(scenario, "CLM-001", seed);
        let finished: Vec<u32> = outcomes
            .iter()
            .filter(|o| o.finished)
            .map(|o| o.sample.tick)
            .collect();
        assert_eq!(finished, vec![20]);
    }
}

#[test]
fn same_seed_same_run() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("legal_false").unwrap();
    let a = run(scenario, "CLM-003", 99);
    let b = run(scenario, "CLM-003", 99);
    assert_eq!(a, b);

    let c = run(scenario, "CLM-003", 100);
    assert_ne!(a, c);
}

#[test]
fn events_only_while_settling() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("finance_true").unwrap();
    let settle = SimulatorConfig::default().settle_ticks;
    let outcomes = run(scenario, "CLM-002", 4);
    for o in &outcomes {
        let t = o.sample.tick;
        assert_eq!(o.event.is_some(), t % 2 == 0 && t < settle, "tick {t}");
        if let Some(event) = &o.event {
            assert_eq!(event.tick, t);
            assert!((0.0..=1.0).contains(&event.confidence));
        }
    }
}

#[test]
fn adverse_claims_start_high_and_fall() {
    let catalog = Catalog::builtin().unwrap();
    let scenario = catalog.get("finance_false").unwrap();
    let outcomes = run(scenario, "CLM-001", 1);
    let first = outcomes.first().unwrap().sample.score;
    let last = outcomes.last().unwrap().sample.score;
    assert!(first > 0.6);
    assert!(last < 0.15);
}
