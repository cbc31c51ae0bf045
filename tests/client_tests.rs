//! Integration-style client tests for the Gamebus admin client.
//!
//! Uses the shared `MockConnector` from `tests/common` to accept connections,
//! script server pushes, and inspect the frames `AdminClient` sends,
//! including reconnect timing under a paused clock.

mod common;

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use gamebus_admin_client::endpoint::Endpoint;
use gamebus_admin_client::{
    AdminClient, AdminConfig, AdminError, AdminEvent, ConfigEdit, ConnectionState, GamePhase,
    LocalStorage, MemoryStorage, SelfiePhase,
};
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_test::assert_ok;

use common::{
    auth_failed_json, configuration_json, is_game_id, mock_connector, sample_configuration,
    selfie_state_json, state_json, wait_for_event, ConnectorHandle, MockServer,
};

// ════════════════════════════════════════════════════════════════════
// Helpers
// ════════════════════════════════════════════════════════════════════

fn start(config: AdminConfig) -> (AdminClient, mpsc::Receiver<AdminEvent>, ConnectorHandle) {
    let (connector, handle) = mock_connector();
    let (client, events) = AdminClient::start(connector, config);
    (client, events, handle)
}

/// Log in with `token`, accept the connection, and consume the `register`
/// frame and the `Connected` event.
async fn login_and_accept(
    client: &AdminClient,
    events: &mut mpsc::Receiver<AdminEvent>,
    handle: &mut ConnectorHandle,
    token: &str,
) -> MockServer {
    assert_ok!(client.login(token));
    let mut server = handle.accept().await;
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "register", "token": token })
    );
    wait_for_event(events, |e| matches!(e, AdminEvent::Connected)).await;
    server
}

/// An open, authenticated session that has received a configuration.
async fn configured_session() -> (
    AdminClient,
    mpsc::Receiver<AdminEvent>,
    ConnectorHandle,
    MockServer,
) {
    let (client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(configuration_json(sample_configuration()));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Notice { .. })).await;
    (client, events, handle, server)
}

fn is_disconnected(e: &AdminEvent) -> bool {
    matches!(e, AdminEvent::Disconnected { .. })
}

// ════════════════════════════════════════════════════════════════════
// Connection lifecycle
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn login_connects_to_development_endpoint_and_registers() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));

    client.login("operator-token").unwrap();
    let ev = events.recv().await.expect("event");
    assert_eq!(
        ev,
        AdminEvent::Connecting {
            url: "ws://localhost:9001/game/admin".into()
        }
    );

    let mut server = handle.accept().await;
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "register", "token": "operator-token" })
    );
    assert_eq!(events.recv().await.expect("event"), AdminEvent::Connected);

    let snapshot = client.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Open);
    assert!(!snapshot.authenticated, "register alone does not authenticate");

    client.shutdown().await;
}

#[tokio::test]
async fn first_server_frame_authenticates() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(state_json("title"));
    assert_eq!(events.recv().await.expect("event"), AdminEvent::Authenticated);
    assert_eq!(
        events.recv().await.expect("event"),
        AdminEvent::GameStateChanged {
            phase: Some(GamePhase::Title),
            is_paused: false,
            is_playing: false,
        }
    );
    assert!(client.is_authenticated());

    client.shutdown().await;
}

#[tokio::test]
async fn malformed_frame_is_dropped_without_authenticating() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push_raw("not json at all");
    server.push_raw(r#"{"state":"play"}"#);
    server.push(selfie_state_json("open"));

    // The first event after the garbage comes from the valid frame.
    assert_eq!(events.recv().await.expect("event"), AdminEvent::Authenticated);
    assert_eq!(
        events.recv().await.expect("event"),
        AdminEvent::SelfieStateChanged {
            state: "open".into()
        }
    );
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn login_is_ignored_while_connected() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    client.login("other").unwrap();
    server.push(state_json("demo"));
    wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;

    assert_eq!(handle.attempts().len(), 1);
    assert!(server.try_next_frame().is_none(), "no second register");

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn auth_failed_closes_without_retry() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "bad-token").await;

    server.push(auth_failed_json());
    assert_eq!(events.recv().await.expect("event"), AdminEvent::AuthFailed);
    assert_eq!(
        events.recv().await.expect("event"),
        AdminEvent::Disconnected {
            reason: Some("authentication failed".into()),
            will_retry: false,
        }
    );
    assert!(server.is_closed());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.attempts().len(), 1);

    let snapshot = client.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Closed);
    assert!(!snapshot.authenticated);
    assert!(!snapshot.reconnecting);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn auth_failed_after_authentication_stops_reconnecting() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;
    server.push(auth_failed_json());
    wait_for_event(&mut events, is_disconnected).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(handle.attempts().len(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn authenticated_session_reconnects_after_interval() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;

    server.hang_up();
    let ev = wait_for_event(&mut events, is_disconnected).await;
    assert_eq!(
        ev,
        AdminEvent::Disconnected {
            reason: None,
            will_retry: true,
        }
    );
    let closed_at = Instant::now();
    let snapshot = client.snapshot();
    assert!(!snapshot.authenticated);
    assert!(snapshot.reconnecting);

    let mut second = handle.accept().await;
    assert_eq!(closed_at.elapsed(), Duration::from_millis(5000));
    assert_eq!(
        second.next_frame().await,
        json!({ "type": "register", "token": "tok" })
    );

    second.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;
    assert!(!client.snapshot().reconnecting);
    assert_eq!(handle.attempts().len(), 2);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn reconnect_keeps_retrying_refused_attempts() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;

    handle.set_refuse(true);
    server.hang_up();
    wait_for_event(&mut events, is_disconnected).await;

    // Two refused attempts, each scheduling the next.
    for _ in 0..2 {
        let ev = wait_for_event(&mut events, is_disconnected).await;
        assert!(matches!(
            ev,
            AdminEvent::Disconnected {
                will_retry: true,
                ..
            }
        ));
    }
    assert_eq!(handle.attempts().len(), 3);

    handle.set_refuse(false);
    let mut third = handle.accept().await;
    assert_eq!(third.next_frame().await["type"], "register");

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn unauthenticated_close_is_not_retried() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.hang_up();
    let ev = wait_for_event(&mut events, is_disconnected).await;
    assert_eq!(
        ev,
        AdminEvent::Disconnected {
            reason: None,
            will_retry: false,
        }
    );

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.attempts().len(), 1);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn prior_session_connects_on_start_and_retries() {
    let config = AdminConfig::new(Endpoint::default()).with_prior_session("saved");
    let (mut client, mut events, mut handle) = start(config);
    handle.set_refuse(true);

    // The loop connects on start without a login call.
    wait_for_event(&mut events, is_disconnected).await;
    handle.set_refuse(false);

    let mut server = handle.accept().await;
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "register", "token": "saved" })
    );

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disconnect_closes_without_retry() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;

    client.disconnect().unwrap();
    assert_eq!(
        wait_for_event(&mut events, is_disconnected).await,
        AdminEvent::Disconnected {
            reason: Some("disconnected by operator".into()),
            will_retry: false,
        }
    );
    assert!(server.is_closed());

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(handle.attempts().len(), 1);
    assert!(!client.is_connected());

    client.shutdown().await;
}

#[tokio::test]
async fn shutdown_closes_the_connection() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    client.shutdown().await;

    assert!(server.is_closed());
    assert_eq!(
        wait_for_event(&mut events, is_disconnected).await,
        AdminEvent::Disconnected {
            reason: Some("client shut down".into()),
            will_retry: false,
        }
    );
    assert_eq!(client.snapshot().connection, ConnectionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn production_endpoint_is_resolved_per_attempt() {
    let host = Arc::new(StdMutex::new("mobile-app-admin-blue.example.com".to_string()));
    let source = Arc::clone(&host);
    let endpoint = Endpoint::production(move || source.lock().unwrap().clone());
    let (mut client, mut events, mut handle) = start(AdminConfig::new(endpoint));

    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;

    *host.lock().unwrap() = "mobile-app-admin-green.example.com".to_string();
    server.hang_up();

    let ev = wait_for_event(&mut events, |e| matches!(e, AdminEvent::Connecting { .. })).await;
    assert_eq!(
        ev,
        AdminEvent::Connecting {
            url: "ws://gamebus-green.example.com/game/admin".into()
        }
    );
    let _second = handle.accept().await;
    assert_eq!(
        handle.attempts(),
        vec![
            "ws://gamebus-blue.example.com/game/admin".to_string(),
            "ws://gamebus-green.example.com/game/admin".to_string(),
        ]
    );

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Server pushes
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn state_push_play_sets_playing() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(state_json("play"));
    let ev = wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;
    assert_eq!(
        ev,
        AdminEvent::GameStateChanged {
            phase: Some(GamePhase::Play),
            is_paused: false,
            is_playing: true,
        }
    );

    let snapshot = client.snapshot();
    assert_eq!(snapshot.game_phase, Some(GamePhase::Play));
    assert!(snapshot.is_playing);
    assert!(!snapshot.is_paused);

    client.shutdown().await;
}

#[tokio::test]
async fn selfie_push_replaces_booth_state() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(selfie_state_json("open"));
    server.push(selfie_state_json("closed"));
    wait_for_event(&mut events, |e| {
        *e == AdminEvent::SelfieStateChanged {
            state: "closed".into(),
        }
    })
    .await;

    assert_eq!(client.snapshot().selfie_state.as_deref(), Some("closed"));

    client.shutdown().await;
}

#[tokio::test]
async fn configuration_push_notifies_and_normalizes_bypass() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    server.push(configuration_json(sample_configuration()));
    let ev = wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::ConfigurationUpdated { .. })
    })
    .await;
    let AdminEvent::ConfigurationUpdated { configuration } = ev else {
        unreachable!();
    };
    assert!(!configuration.bp);
    assert_eq!(configuration.opacity(), Some(85.0));
    assert_eq!(configuration.get("theme"), Some(&json!("keynote")));

    assert_eq!(
        events.recv().await.expect("event"),
        AdminEvent::Notice {
            message: "Game Configuration Updated!".into()
        }
    );

    let snapshot = client.snapshot();
    assert_eq!(snapshot.configuration.as_ref().map(|c| c.bp), Some(false));

    client.shutdown().await;
}

// ════════════════════════════════════════════════════════════════════
// Operator commands
// ════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn commands_are_rejected_before_connecting() {
    let (mut client, _events, handle) = start(AdminConfig::new(Endpoint::default()));

    assert!(matches!(
        client.change_state(GamePhase::Demo),
        Err(AdminError::NotConnected)
    ));
    assert!(matches!(
        client.change_selfie_state(SelfiePhase::Closed),
        Err(AdminError::NotConnected)
    ));
    assert!(handle.attempts().is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn pause_from_play_sends_state_change_then_configuration() {
    let (mut client, mut events, _handle, mut server) = configured_session().await;
    server.push(state_json("play"));
    wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;

    assert_ok!(client.change_state(GamePhase::Pause));
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "state-change", "state": "pause", "token": "tok" })
    );
    let config = server.next_frame().await;
    assert_eq!(config["type"], "configuration");
    assert_eq!(config["token"], "tok");
    assert_eq!(config["configuration"]["opacity"].as_f64(), Some(85.0));
    assert_eq!(config["configuration"]["bp"], false);
    assert_eq!(config["configuration"]["theme"], "keynote");
    assert!(config["configuration"].get("gameId").is_none());

    let ev = wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;
    assert_eq!(
        ev,
        AdminEvent::GameStateChanged {
            phase: Some(GamePhase::Pause),
            is_paused: true,
            is_playing: false,
        }
    );

    client.shutdown().await;
}

#[tokio::test]
async fn pause_while_paused_resumes_play() {
    let (mut client, mut events, _handle, mut server) = configured_session().await;
    server.push(state_json("pause"));
    wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;

    client.change_state(GamePhase::Pause).unwrap();
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "state-change", "state": "play", "token": "tok" })
    );
    let config = server.next_frame().await;
    assert!(
        config["configuration"].get("gameId").is_none(),
        "resuming does not start a new game"
    );

    let ev = wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;
    assert_eq!(
        ev,
        AdminEvent::GameStateChanged {
            phase: Some(GamePhase::Play),
            is_paused: false,
            is_playing: true,
        }
    );
    assert!(!client.subscribe().borrow().is_paused);

    client.shutdown().await;
}

#[tokio::test]
async fn play_stamps_a_fresh_game_id_each_time() {
    let (mut client, _events, _handle, mut server) = configured_session().await;

    client.change_state(GamePhase::Play).unwrap();
    assert_eq!(server.next_frame().await["state"], "play");
    let first = server.next_frame().await["configuration"]["gameId"]
        .as_str()
        .expect("gameId")
        .to_string();
    assert!(is_game_id(&first), "{first}");

    client.change_state(GamePhase::Play).unwrap();
    server.next_frame().await;
    let second = server.next_frame().await["configuration"]["gameId"]
        .as_str()
        .expect("gameId")
        .to_string();
    assert!(is_game_id(&second), "{second}");
    assert_ne!(first, second);

    client.shutdown().await;
}

#[tokio::test]
async fn state_change_without_configuration_sends_single_frame() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    client.change_state(GamePhase::GameOver).unwrap();
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "state-change", "state": "game-over", "token": "tok" })
    );
    wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::GameStateChanged { .. })
    })
    .await;
    assert!(server.try_next_frame().is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn selfie_request_waits_for_server_push() {
    let (mut client, mut events, _handle, mut server) = configured_session().await;
    server.push(selfie_state_json("closed"));
    wait_for_event(&mut events, |e| {
        matches!(e, AdminEvent::SelfieStateChanged { .. })
    })
    .await;

    client.change_selfie_state(SelfiePhase::Open).unwrap();
    assert_eq!(
        server.next_frame().await,
        json!({ "type": "selfie-state-change", "state": "open", "token": "tok" })
    );
    assert_eq!(client.snapshot().selfie_state.as_deref(), Some("closed"));

    client.shutdown().await;
}

#[tokio::test]
async fn edit_is_rejected_before_configuration_arrives() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;

    assert!(matches!(
        client.edit_configuration(ConfigEdit::Opacity(50.0)),
        Err(AdminError::NoConfiguration)
    ));
    tokio::task::yield_now().await;
    assert!(server.try_next_frame().is_none());

    client.shutdown().await;
}

#[tokio::test]
async fn each_edit_republishes_the_whole_configuration_once() {
    let (mut client, _events, _handle, mut server) = configured_session().await;

    client
        .edit_configuration(ConfigEdit::Opacity(40.0))
        .unwrap();
    let frame = server.next_frame().await;
    assert_eq!(frame["type"], "configuration");
    assert_eq!(frame["configuration"]["opacity"].as_f64(), Some(40.0));
    assert_eq!(frame["configuration"]["scale"].as_f64(), Some(1.5));
    assert_eq!(frame["configuration"]["background"], "#000000");
    assert_eq!(frame["configuration"]["theme"], "keynote");

    client.edit_configuration(ConfigEdit::Bypass(true)).unwrap();
    let frame = server.next_frame().await;
    assert_eq!(frame["configuration"]["bp"], true);
    assert_eq!(frame["configuration"]["opacity"].as_f64(), Some(40.0));

    client
        .edit_configuration(ConfigEdit::Background("#ffffff".into()))
        .unwrap();
    let frame = server.next_frame().await;
    assert_eq!(frame["configuration"]["background"], "#ffffff");

    tokio::task::yield_now().await;
    assert!(server.try_next_frame().is_none(), "one frame per edit");

    let configuration = client.snapshot().configuration.expect("configuration");
    assert!(configuration.bp);
    assert_eq!(configuration.background().as_deref(), Some("#ffffff"));

    client.shutdown().await;
}

#[tokio::test]
async fn edit_republishes_untouched_fields_as_received() {
    let (mut client, mut events, mut handle) = start(AdminConfig::new(Endpoint::default()));
    let mut server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(configuration_json(json!({
        "opacity": "",
        "scale": 2,
        "speed": "3",
        "goldenSnitch": null
    })));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Notice { .. })).await;
    assert!(client.is_authenticated());

    client.edit_configuration(ConfigEdit::Bypass(true)).unwrap();
    let frame = server.next_frame().await;
    assert_eq!(
        frame["configuration"],
        json!({
            "opacity": "",
            "scale": 2,
            "speed": "3",
            "goldenSnitch": null,
            "bp": true
        })
    );

    client.shutdown().await;
}

#[tokio::test]
async fn clear_local_storage_keeps_the_session() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set("token", "tok").unwrap();
    let config = AdminConfig::new(Endpoint::default())
        .with_local_storage(Arc::clone(&storage) as Arc<dyn LocalStorage>);
    let (mut client, mut events, mut handle) = start(config);
    let server = login_and_accept(&client, &mut events, &mut handle, "tok").await;
    server.push(state_json("title"));
    wait_for_event(&mut events, |e| matches!(e, AdminEvent::Authenticated)).await;

    assert_ok!(client.clear_local_storage());
    assert!(storage.is_empty().unwrap());
    assert!(client.is_connected());
    assert!(client.is_authenticated());

    client.shutdown().await;
}
