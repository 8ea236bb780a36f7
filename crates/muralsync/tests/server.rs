//! End-to-end tests: a real server on a loopback port, driven by
//! tokio-tungstenite clients speaking the JSON event protocol.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use muralsync::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Helpers
// =========================================================================

type ClientWs = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

/// Starts a server on a random port and returns its address and engine.
async fn start_with(builder: MuralServerBuilder) -> (String, EngineHandle) {
    let server = builder
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();
    let engine = server.engine();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    // Give the accept loop a moment to start.
    tokio::time::sleep(Duration::from_millis(10)).await;
    (addr, engine)
}

async fn start_server() -> (String, EngineHandle) {
    start_with(MuralServer::builder()).await
}

async fn connect(addr: &str) -> ClientWs {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .expect("should connect");
    ws
}

async fn send_json(ws: &mut ClientWs, value: Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("send");
}

async fn send_command(ws: &mut ClientWs, command: &ClientCommand) {
    let text = serde_json::to_string(command).expect("encode");
    ws.send(Message::Text(text.into())).await.expect("send");
}

/// Next event frame as raw JSON.
async fn recv_json(ws: &mut ClientWs) -> Value {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("frame should arrive in time")
            .expect("stream should be open")
            .expect("frame should be valid");
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).expect("frame is JSON");
        }
    }
}

async fn recv_event(ws: &mut ClientWs) -> ServerEvent {
    serde_json::from_value(recv_json(ws).await).expect("frame is a server event")
}

/// Asserts that nothing arrives for a short while.
async fn assert_silent(ws: &mut ClientWs) {
    let result = tokio::time::timeout(Duration::from_millis(100), ws.next()).await;
    assert!(result.is_err(), "unexpected frame: {result:?}");
}

/// Creates a session and returns its code, consuming the snapshot.
async fn create_session(ws: &mut ClientWs) -> SessionCode {
    send_json(ws, json!({ "event": "createSession" })).await;
    let ServerEvent::SessionCreated(code) = recv_event(ws).await else {
        panic!("expected sessionCreated");
    };
    assert!(matches!(recv_event(ws).await, ServerEvent::SessionData(_)));
    code
}

async fn join_session(ws: &mut ClientWs, code: &SessionCode) -> CanvasSnapshot {
    send_json(ws, json!({ "event": "joinSession", "data": code.as_str() })).await;
    match recv_event(ws).await {
        ServerEvent::SessionData(snapshot) => snapshot,
        other => panic!("expected sessionData, got {other:?}"),
    }
}

// =========================================================================
// Session lifecycle
// =========================================================================

#[tokio::test]
async fn test_create_session_sends_code_then_empty_snapshot() {
    let (addr, _engine) = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({ "event": "createSession" })).await;

    let created = recv_json(&mut ws).await;
    assert_eq!(created["event"], "sessionCreated");
    let code = created["data"].as_str().expect("code is a string");
    assert_eq!(code.len(), 6);
    assert!(
        code.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );

    let data = recv_json(&mut ws).await;
    assert_eq!(
        data,
        json!({
            "event": "sessionData",
            "data": { "notes": [], "drawings": [], "canvasTexts": [] }
        })
    );
}

#[tokio::test]
async fn test_join_unknown_code_returns_error() {
    let (addr, _engine) = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({ "event": "joinSession", "data": "ZZZZZZ" })).await;

    assert_eq!(
        recv_json(&mut ws).await,
        json!({ "event": "error", "data": "Invalid session code" })
    );
}

#[tokio::test]
async fn test_join_receives_existing_canvas() {
    let (addr, _engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let code = create_session(&mut alice).await;

    send_json(
        &mut alice,
        json!({
            "event": "addText",
            "data": { "text": "hi", "x": 1.0, "y": 2.0, "color": "black", "fontSize": 16.0 }
        }),
    )
    .await;
    assert!(matches!(recv_event(&mut alice).await, ServerEvent::TextAdded(_)));

    let mut bob = connect(&addr).await;
    let snapshot = join_session(&mut bob, &code).await;
    assert_eq!(snapshot.canvas_texts.len(), 1);
    assert_eq!(snapshot.canvas_texts[0].text, "hi");
}

#[tokio::test]
async fn test_disconnect_from_session_stops_broadcasts() {
    let (addr, _engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    send_json(&mut bob, json!({ "event": "disconnectFromSession" })).await;
    assert_eq!(recv_event(&mut bob).await, ServerEvent::SessionLeft);

    send_json(&mut alice, json!({ "event": "clearCanvas" })).await;
    assert_eq!(recv_event(&mut alice).await, ServerEvent::CanvasCleared);
    assert_silent(&mut bob).await;
}

// =========================================================================
// Fan-out
// =========================================================================

#[tokio::test]
async fn test_add_note_echoes_token_to_originator_only() {
    let (addr, _engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    send_json(
        &mut alice,
        json!({
            "event": "addNote",
            "data": { "text": "todo", "x": 10.0, "y": 20.0, "color": "yellow", "tempId": "tmp-1" }
        }),
    )
    .await;

    let own = recv_json(&mut alice).await;
    assert_eq!(own["event"], "noteAdded");
    assert_eq!(own["data"]["correlationToken"], "tmp-1");
    assert_eq!(own["data"]["text"], "todo");
    let id = own["data"]["id"].as_str().expect("note id");
    assert_eq!(id.len(), 10);

    let other = recv_json(&mut bob).await;
    assert_eq!(other["event"], "noteAdded");
    assert_eq!(other["data"]["id"], id);
    assert!(other["data"].get("correlationToken").is_none());
}

#[tokio::test]
async fn test_draw_is_not_echoed_to_sender() {
    let (addr, _engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    let stroke = Drawing {
        path: vec![0.0, 0.0, 10.0, 10.0],
        color: "red".into(),
        width: 2.0,
    };
    send_command(&mut alice, &ClientCommand::Draw(stroke.clone())).await;

    assert_eq!(recv_event(&mut bob).await, ServerEvent::Drawing(stroke));
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_erase_area_broadcasts_fresh_snapshot() {
    let (addr, _engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    send_command(
        &mut alice,
        &ClientCommand::Draw(Drawing {
            path: vec![0.0, 0.0, 50.0, 0.0, 100.0, 0.0],
            color: "blue".into(),
            width: 1.0,
        }),
    )
    .await;
    assert!(matches!(recv_event(&mut bob).await, ServerEvent::Drawing(_)));

    send_json(
        &mut bob,
        json!({ "event": "eraseArea", "data": { "x": 0.0, "y": 0.0, "radius": 5.0 } }),
    )
    .await;

    for ws in [&mut alice, &mut bob] {
        let ServerEvent::SessionData(snapshot) = recv_event(ws).await else {
            panic!("expected sessionData");
        };
        assert_eq!(snapshot.drawings.len(), 1);
        assert_eq!(snapshot.drawings[0].path, vec![50.0, 0.0, 100.0, 0.0]);
    }
}

#[tokio::test]
async fn test_capacity_error_goes_to_requester_only() {
    let store = StoreConfig {
        max_notes: 1,
        ..Default::default()
    };
    let (addr, _engine) = start_with(MuralServer::builder().store_config(store)).await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    let note = json!({
        "event": "addNote",
        "data": { "text": "n", "x": 0.0, "y": 0.0, "color": "pink" }
    });
    send_json(&mut alice, note.clone()).await;
    assert!(matches!(recv_event(&mut alice).await, ServerEvent::NoteAdded(_)));
    assert!(matches!(recv_event(&mut bob).await, ServerEvent::NoteAdded(_)));

    send_json(&mut alice, note).await;
    assert_eq!(
        recv_event(&mut alice).await,
        ServerEvent::Error("Maximum number of notes reached for this session".into())
    );
    assert_silent(&mut bob).await;
}

// =========================================================================
// Connection handling
// =========================================================================

#[tokio::test]
async fn test_invalid_frame_returns_error_to_sender_only() {
    let (addr, engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;

    alice
        .send(Message::Text("not json".into()))
        .await
        .expect("send");
    assert_eq!(
        recv_event(&mut alice).await,
        ServerEvent::Error("Invalid message".into())
    );

    send_json(&mut alice, json!({ "event": "paintTheSky" })).await;
    assert!(matches!(recv_event(&mut alice).await, ServerEvent::Error(_)));

    assert_silent(&mut bob).await;
    assert_eq!(engine.stats().await.unwrap().session_count, 1);
}

#[tokio::test]
async fn test_heartbeat_is_acknowledged() {
    let (addr, _engine) = start_server().await;
    let mut ws = connect(&addr).await;

    send_json(&mut ws, json!({ "event": "heartbeat", "data": { "clientTime": 1234 } })).await;

    let ack = recv_json(&mut ws).await;
    assert_eq!(ack["event"], "heartbeatAck");
    assert_eq!(ack["data"]["clientTime"], 1234);
    assert!(ack["data"]["serverTime"].as_u64().expect("server time") > 0);
}

#[tokio::test]
async fn test_closed_socket_releases_membership() {
    let (addr, engine) = start_server().await;
    let mut alice = connect(&addr).await;
    let mut bob = connect(&addr).await;
    let code = create_session(&mut alice).await;
    join_session(&mut bob, &code).await;
    assert_eq!(engine.stats().await.unwrap().total_members, 2);

    bob.close(None).await.expect("close");
    drop(bob);
    tokio::time::sleep(Duration::from_millis(100)).await;

    let stats = engine.stats().await.unwrap();
    assert_eq!(stats.session_count, 1, "session outlives its members");
    assert_eq!(stats.total_members, 1);
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let (addr, engine) = start_with(
        MuralServer::builder().connection_timeout(Duration::from_millis(200)),
    )
    .await;
    let mut ws = connect(&addr).await;
    create_session(&mut ws).await;

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "server should close a silent socket");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.stats().await.unwrap().total_members, 0);
}

#[tokio::test]
async fn test_shutdown_closes_connections_and_stops_engine() {
    let (addr, engine) = start_server().await;
    let mut ws = connect(&addr).await;
    create_session(&mut ws).await;

    engine.shutdown().await.expect("shutdown");

    let closed = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client should see the socket close");
    assert!(engine.is_closed());
}
