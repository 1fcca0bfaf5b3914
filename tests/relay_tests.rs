//! End-to-end relay tests over real WebSocket connections

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::timeout;

use tank_duel::app::AppState;
use tank_duel::config::Config;
use tank_duel::game::{GameMatch, MatchConfig, MatchPhase};
use tank_duel::http::build_router;
use tank_duel::ws::{MoveDirection, PeerLink, PeerMsg, WeaponKind};

const WAIT: Duration = Duration::from_secs(5);

async fn start_relay(mode: &str) -> SocketAddr {
    let mode = mode.to_string();
    let config = Config::from_lookup(|key| match key {
        "RELAY_MODE" => Some(mode.clone()),
        "JOIN_RATE_LIMIT" => Some("100".to_string()),
        _ => None,
    })
    .unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(AppState::new(config));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn recv(link: &mut PeerLink) -> PeerMsg {
    timeout(WAIT, link.recv())
        .await
        .expect("timed out waiting for relay")
        .expect("relay link closed")
}

/// Connect and wait for the welcome, so join order is deterministic
async fn join(addr: SocketAddr) -> (PeerLink, String) {
    let mut link = PeerLink::connect(&format!("ws://{}/ws", addr))
        .await
        .unwrap();
    match recv(&mut link).await {
        PeerMsg::Welcome { id } => (link, id),
        other => panic!("expected welcome, got {:?}", other),
    }
}

async fn assert_silent(link: &mut PeerLink) {
    assert!(timeout(Duration::from_millis(200), link.recv()).await.is_err());
}

#[tokio::test]
async fn test_handshake_through_relay() {
    let addr = start_relay("paired").await;

    let (mut link_a, id_a) = join(addr).await;
    let (mut link_b, id_b) = join(addr).await;
    assert_ne!(id_a, id_b);

    let mut game_a = GameMatch::with_arcade(MatchConfig::default());
    let mut game_b = GameMatch::with_arcade(MatchConfig::default());
    game_a
        .handle_message(PeerMsg::Welcome { id: id_a.clone() })
        .unwrap();
    game_b
        .handle_message(PeerMsg::Welcome { id: id_b.clone() })
        .unwrap();

    // The relay announces the newcomer to the waiting peer only
    let announce = recv(&mut link_a).await;
    assert_eq!(
        announce,
        PeerMsg::PeerJoined {
            first_to_join: false,
            id: id_b.clone()
        }
    );
    game_a.handle_message(announce).unwrap();
    assert_eq!(game_a.phase(), MatchPhase::LocalTurn);

    for msg in game_a.drain_outbox() {
        link_a.send(msg).unwrap();
    }

    let reply = recv(&mut link_b).await;
    assert_eq!(
        reply,
        PeerMsg::PeerJoined {
            first_to_join: true,
            id: id_a.clone()
        }
    );
    game_b.handle_message(reply).unwrap();
    assert_eq!(game_b.phase(), MatchPhase::RemoteTurn);
    assert_eq!(game_b.opponent_id(), Some(id_a.as_str()));
    assert_eq!(game_a.opponent_id(), Some(id_b.as_str()));
}

#[tokio::test]
async fn test_messages_arrive_in_order() {
    let addr = start_relay("paired").await;
    let (link_a, _) = join(addr).await;
    let (mut link_b, _) = join(addr).await;

    let sent = vec![
        PeerMsg::UnitMove {
            direction: MoveDirection::Left,
        },
        PeerMsg::UnitMove {
            direction: MoveDirection::Stop,
        },
        PeerMsg::FireShell {
            angle: 45.0,
            power: 500.0,
        },
    ];
    for msg in &sent {
        link_a.send(msg.clone()).unwrap();
    }

    for expected in sent {
        assert_eq!(recv(&mut link_b).await, expected);
    }
}

#[tokio::test]
async fn test_third_connection_is_isolated_in_paired_mode() {
    let addr = start_relay("paired").await;
    let (link_a, _) = join(addr).await;
    let (mut link_b, _) = join(addr).await;
    let (mut link_c, _) = join(addr).await;

    link_a
        .send(PeerMsg::UnitMove {
            direction: MoveDirection::Right,
        })
        .unwrap();

    assert!(matches!(recv(&mut link_b).await, PeerMsg::UnitMove { .. }));
    assert_silent(&mut link_c).await;
}

#[tokio::test]
async fn test_broadcast_mode_reaches_every_peer() {
    let addr = start_relay("broadcast").await;
    let (mut link_a, _) = join(addr).await;
    let (mut link_b, id_b) = join(addr).await;
    let (mut link_c, id_c) = join(addr).await;

    // Join announcements; a hears about both newcomers
    let mut heard_by_a = Vec::new();
    for _ in 0..2 {
        match recv(&mut link_a).await {
            PeerMsg::PeerJoined {
                first_to_join: false,
                id,
            } => heard_by_a.push(id),
            other => panic!("expected join announcement, got {:?}", other),
        }
    }
    heard_by_a.sort();
    let mut expected = vec![id_b, id_c.clone()];
    expected.sort();
    assert_eq!(heard_by_a, expected);

    assert_eq!(
        recv(&mut link_b).await,
        PeerMsg::PeerJoined {
            first_to_join: false,
            id: id_c
        }
    );

    link_c
        .send(PeerMsg::ShellSwitch {
            shell: WeaponKind::Heavy,
        })
        .unwrap();

    assert!(matches!(recv(&mut link_a).await, PeerMsg::ShellSwitch { .. }));
    assert!(matches!(recv(&mut link_b).await, PeerMsg::ShellSwitch { .. }));
    assert_silent(&mut link_c).await;
}
