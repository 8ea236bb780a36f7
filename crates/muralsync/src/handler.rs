//! Per-connection task: decode frames, forward commands to the engine,
//! write the engine's events back out.
//!
//! Each accepted socket gets its own task running [`handle_connection`].
//! The task registers an outbound channel with the engine, then loops over
//! two sources until either side goes away:
//!   - inbound frames, decoded into [`ClientCommand`]s and submitted;
//!   - outbound [`ServerEvent`]s pushed by the engine.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use muralsync_protocol::{ClientCommand, Codec, ConnectionId, ServerEvent};
use muralsync_router::EngineHandle;
use muralsync_transport::{Connection, WebSocketConnection};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::MuralError;
use crate::server::ServerState;

/// Message sent back for a frame that is not a known command.
const INVALID_MESSAGE: &str = "Invalid message";

/// Drop guard that tells the engine a connection is gone.
///
/// Runs on every exit path, including panics. `Drop` is synchronous, so the
/// disconnect is sent from a spawned task.
struct ConnectionGuard {
    id: ConnectionId,
    engine: EngineHandle,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let id = self.id;
        let engine = self.engine.clone();
        tokio::spawn(async move {
            let _ = engine.disconnect(id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), MuralError> {
    let conn_id = conn.id();
    info!(connection_id = %conn_id, "client connected");

    let (tx, mut outbound) = mpsc::unbounded_channel();
    state.engine.connect(conn_id, tx).await?;
    let _guard = ConnectionGuard {
        id: conn_id,
        engine: state.engine.clone(),
    };

    // Only inbound frames push the deadline back; a client that just listens
    // still has to heartbeat.
    let mut deadline = Instant::now() + state.connection_timeout;

    loop {
        tokio::select! {
            received = tokio::time::timeout_at(deadline, conn.recv()) => {
                let data = match received {
                    Ok(Ok(Some(data))) => data,
                    Ok(Ok(None)) => {
                        info!(connection_id = %conn_id, "client disconnected");
                        break;
                    }
                    Ok(Err(e)) => {
                        debug!(connection_id = %conn_id, error = %e, "recv error");
                        break;
                    }
                    Err(_) => {
                        info!(connection_id = %conn_id, "connection timed out");
                        let _ = conn.close().await;
                        break;
                    }
                };
                deadline = Instant::now() + state.connection_timeout;
                handle_frame(&conn, &state, &data).await?;
            }
            event = outbound.recv() => {
                let Some(event) = event else {
                    debug!(connection_id = %conn_id, "engine released connection");
                    let _ = conn.close().await;
                    break;
                };
                send_event(&conn, &state.codec, &event).await?;
            }
        }
    }

    // _guard drops here and the engine forgets this connection.
    Ok(())
}

/// Decodes one frame and either answers it locally or submits it.
async fn handle_frame<C: Codec>(
    conn: &WebSocketConnection,
    state: &ServerState<C>,
    data: &[u8],
) -> Result<(), MuralError> {
    let command: ClientCommand = match state.codec.decode(data) {
        Ok(command) => command,
        Err(e) => {
            debug!(connection_id = %conn.id(), error = %e, "failed to decode frame");
            let event = ServerEvent::Error(INVALID_MESSAGE.to_string());
            return send_event(conn, &state.codec, &event).await;
        }
    };

    match command {
        ClientCommand::Heartbeat { client_time } => {
            let ack = ServerEvent::HeartbeatAck {
                client_time,
                server_time: unix_millis(),
            };
            send_event(conn, &state.codec, &ack).await
        }
        command => Ok(state.engine.submit(conn.id(), command).await?),
    }
}

async fn send_event(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    event: &ServerEvent,
) -> Result<(), MuralError> {
    let text = codec.encode_text(event)?;
    conn.send_text(text).await?;
    Ok(())
}

/// Wall-clock milliseconds since the Unix epoch; zero if the clock is
/// before it.
fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
