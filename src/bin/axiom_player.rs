//! `axiom-player` binary: headless playback of a walkthrough scenario.
//!
//! # Usage
//!
//! ```bash
//! # List the built-in scenarios
//! axiom-player --list
//!
//! # Play a scenario in real time with a fixed seed
//! axiom-player --scenario finance_false --seed 42
//!
//! # Play without waiting on the clock and print the verdict as JSON
//! axiom-player --scenario finance_true --fast --json
//!
//! # Probe a live backend and stream its verification alongside playback
//! axiom-player --scenario legal_false --backend http://localhost:8000
//! ```

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use axiom_player::{
    AxiomResult, BridgeMode, DetailPayload, DetailSelector, Player, PlayerConfig, RemoteStatus,
    Screen,
};

/// Arguments for the `axiom-player` binary.
#[derive(Parser, Debug)]
#[command(
    name = "axiom-player",
    version,
    about = "Headless playback of scripted claim-verification walkthroughs",
    long_about = None,
)]
struct Args {
    /// Print the scenario catalog and exit.
    #[arg(long, default_value_t = false)]
    list: bool,

    /// Scenario to play.
    #[arg(long, short = 's')]
    scenario: Option<String>,

    /// Seed for the score simulator.
    #[arg(long, env = "AXIOM_SEED")]
    seed: Option<u64>,

    /// Tick period in milliseconds.
    #[arg(long, env = "AXIOM_TICK_MS")]
    tick_ms: Option<u64>,

    /// Verification backend base URL.
    #[arg(long, env = "AXIOM_BACKEND_URL")]
    backend: Option<String>,

    /// Step the simulator without waiting on the clock.
    #[arg(long, default_value_t = false)]
    fast: bool,

    /// Print the verdict summary as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn config(args: &Args) -> AxiomResult<PlayerConfig> {
    let mut config = PlayerConfig::from_env()?;
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(ms) = args.tick_ms {
        config.simulator.tick_period = Duration::from_millis(ms);
    }
    if let Some(url) = &args.backend {
        config.bridge.base_url = Some(url.trim_end_matches('/').to_string());
    }
    if args.fast {
        config.simulator = config.simulator.manual();
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> AxiomResult<()> {
    let mut player = Player::builtin(config(args)?)?;

    let Some(id) = args.scenario.as_deref().filter(|_| !args.list) else {
        for scenario in player.catalog().iter() {
            println!(
                "{:<14} {:<8} {:<2} claims  {}",
                scenario.id,
                scenario.domain,
                scenario.claims.len(),
                scenario.label
            );
        }
        return Ok(());
    };

    if player.config().bridge.base_url.is_some() {
        let mode = player.connect_bridge();
        println!("backend: {mode}");
    }

    player.skip_intro()?;
    player.select_scenario(id)?;
    print_screen(&player);

    let Some(scenario) = player.session().scenario().cloned() else {
        return Ok(());
    };
    println!("  {}", scenario.context);

    player.advance()?;
    print_screen(&player);
    println!("  {}", scenario.prompt);

    player.advance()?;
    print_screen(&player);
    println!("  {}", scenario.response);
    player.reveal_claims()?;
    for h in player.response_highlights() {
        println!("  [{}] {:<7} \"{}\"", h.claim_id, h.action, h.text);
    }

    player.advance()?;
    print_screen(&player);
    if player.bridge_mode() == BridgeMode::Live {
        player.start_remote()?;
    }

    while player.session().is_simulating() {
        let _ = player.session().wait_tick();
        let outcome = player.step()?;
        player.drain_remote();
        print!("  t={:>2} score={:.3}", outcome.sample.tick, outcome.sample.score);
        if let Some(event) = outcome.event {
            print!("  {} {} ({:.2}) {}", event.agent, event.stance, event.confidence, event.summary);
        }
        println!();
    }
    print_screen(&player);

    let timeout = player.config().bridge.timeout;
    player.settle_remote(timeout);
    if let Some(remote) = player.remote() {
        match remote.status() {
            RemoteStatus::Settled => println!(
                "  live backend settled: {}",
                remote
                    .overall_action()
                    .map_or_else(|| "-".to_string(), |a| a.to_string())
            ),
            other => println!("  live backend: {other:?}"),
        }
    }

    let Some(summary) = player.verdict_summary() else {
        return Ok(());
    };
    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| axiom_player::AxiomError::internal(e.to_string()))?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "  {} | overall {} | {} blocked, {} rewrite, {} allowed",
        if summary.issues_found { "ISSUES FOUND" } else { "CLEAN" },
        summary.overall_action,
        summary.blocked,
        summary.rewritten,
        summary.allowed
    );
    if let Ok(DetailPayload::Settlement {
        settlement,
        computed_evidence,
        ..
    }) = player.resolve_detail(&DetailSelector::Settlement)
    {
        println!(
            "  {} ({:.0}%): {} supporting, {} contradicting, {} neutral (tallied {}/{}/{})",
            settlement.oracle,
            settlement.confidence * 100.0,
            settlement.evidence.supporting,
            settlement.evidence.contradicting,
            settlement.evidence.neutral,
            computed_evidence.supporting,
            computed_evidence.contradicting,
            computed_evidence.neutral
        );
    }
    println!("  {}", summary.recommendation);
    Ok(())
}

fn print_screen(player: &Player) {
    let screen = player.screen();
    match screen {
        Screen::Intro | Screen::Verdict => {
            let label = player
                .session()
                .scenario()
                .map_or("", |s| s.label.as_str());
            println!("== {screen} == {label}");
        }
        _ => println!("== {screen} =="),
    }
}
