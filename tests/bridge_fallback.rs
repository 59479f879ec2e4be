#![cfg(feature = "bridge")]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use axiom_player::{Bridge, BridgeConfig, BridgeMode, Catalog, Player, PlayerConfig, RemoteStatus};

const HEALTH_BODY: &str = r#"{"status":"healthy","demo_mode":true}"#;

/// Serves `connections` canned `/health` responses, then drops the listener.
fn canned_backend(connections: usize) -> (String, thread::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            loop {
                line.clear();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{HEALTH_BODY}",
                HEALTH_BODY.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
        }
    });
    (url, handle)
}

fn config(url: &str) -> BridgeConfig {
    BridgeConfig {
        base_url: Some(url.to_string()),
        timeout: Duration::from_secs(2),
        ..BridgeConfig::default()
    }
}

#[test]
fn unreachable_backend_selects_fixtures() {
    let catalog = Arc::new(Catalog::builtin().unwrap());
    let mut bridge = Bridge::connect(&config("http://127.0.0.1:9"), catalog);
    assert_eq!(bridge.mode(), BridgeMode::Fixture);

    let session = bridge.demo("finance_false").unwrap();
    assert_eq!(session.claims.len(), 4);
    assert_eq!(bridge.agents().unwrap().len(), 3);
    assert!(bridge.sessions().unwrap().iter().any(|s| s.id == session.id));
}

#[test]
fn healthy_backend_is_live_until_it_goes_away() {
    let (url, server) = canned_backend(1);
    let catalog = Arc::new(Catalog::builtin().unwrap());
    let mut bridge = Bridge::connect(&config(&url), catalog);
    assert_eq!(bridge.mode(), BridgeMode::Live);
    server.join().unwrap();

    let agents = bridge.agents().unwrap();
    assert_eq!(agents.len(), 3);
    assert_eq!(bridge.mode(), BridgeMode::Fixture);

    assert_eq!(bridge.reprobe(), BridgeMode::Fixture);
}

#[test]
fn player_streams_fixtures_without_a_backend() {
    let config = PlayerConfig {
        bridge: config("http://127.0.0.1:9"),
        seed: Some(5),
        ..PlayerConfig::default()
    };
    let mut player = Player::builtin(config).unwrap();
    assert_eq!(player.connect_bridge(), BridgeMode::Fixture);

    player.skip_intro().unwrap();
    player.select_scenario("legal_false").unwrap();
    player.start_remote().unwrap();
    player.drain_remote();

    let remote = player.remote().unwrap();
    assert_eq!(remote.status(), &RemoteStatus::Settled);
    assert_eq!(remote.claim_ids().len(), 3);
    assert_eq!(remote.risk_updates().len(), 3);
    assert_eq!(remote.quotes().len(), 9);
    assert!(remote.settlement().is_some());
}
