use axum::{
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::Response,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior, timeout};
use tracing::{debug, info, warn};

use crate::{
    constants::*,
    services::HubHandle,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StartQuery {
    #[serde(rename = "userId", default)]
    pub user_id: String,
}

/// Upgrades `/start?userId=...` into a companion connection.
pub async fn start(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<StartQuery>,
) -> Response {
    let hub = state.hub.clone();
    ws.max_message_size(MAX_FRAME_SIZE)
        .max_frame_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| serve(socket, hub, query.user_id))
}

/// Runs one connection until either side goes away.
///
/// The calling task becomes the only reader of the socket and a spawned task
/// the only writer.
pub async fn serve(mut socket: WebSocket, hub: HubHandle, user_id: String) {
    if !is_valid_user_id(&user_id) {
        warn!(user = %user_id, "rejecting connection with malformed user id");
        let frame = CloseFrame {
            code: close_code::POLICY,
            reason: "invalid user id".into(),
        };
        let _ = socket.send(Message::Close(Some(frame))).await;
        return;
    }

    let (connection, queue) = hub.open_connection(&user_id);
    let serial = connection.serial;
    if hub.register(connection).await.is_err() {
        warn!(user = %user_id, "hub unavailable, dropping connection");
        return;
    }

    let (sink, stream) = socket.split();
    let writer = tokio::spawn(write_pump(sink, queue));
    read_pump(stream, &hub, &user_id).await;

    // the writer exits once the hub closes this connection's queue
    if hub.unregister(user_id, serial).await.is_err() {
        writer.abort();
    }
}

/// Forwards inbound frames to the hub until the transport fails, closes, or
/// stays silent past the read deadline. Only pongs refresh the deadline.
pub async fn read_pump<S>(mut stream: S, hub: &HubHandle, user_id: &str)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        let frame = tokio::select! {
            _ = &mut deadline => {
                info!(user = %user_id, "read deadline passed");
                break;
            }
            frame = stream.next() => frame,
        };

        let payload = match frame {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    debug!(user = %user_id, "dropping non utf-8 frame");
                    continue;
                }
            },
            Some(Ok(Message::Pong(_))) => {
                deadline.as_mut().reset(Instant::now() + PONG_WAIT);
                continue;
            }
            Some(Ok(Message::Ping(_))) => continue,
            Some(Ok(Message::Close(frame))) => {
                debug!(user = %user_id, ?frame, "peer closed");
                break;
            }
            Some(Err(e)) => {
                warn!(user = %user_id, error = %e, "read failed");
                break;
            }
            None => break,
        };

        if hub.inbound(user_id.to_string(), payload).await.is_err() {
            break;
        }
    }
}

/// Drains the outbound queue into the transport, pinging while idle.
///
/// Everything already queued when a message is dequeued goes out in the same
/// flush. A closed queue sends a close frame and ends the pump.
pub async fn write_pump<S>(mut sink: S, mut queue: mpsc::Receiver<String>)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + PING_PERIOD, PING_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            message = queue.recv() => {
                let Some(message) = message else {
                    let _ = timeout(WRITE_WAIT, sink.send(Message::Close(None))).await;
                    return;
                };
                match timeout(WRITE_WAIT, write_batch(&mut sink, message, &mut queue)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        debug!(error = %e, "write failed");
                        return;
                    }
                    Err(_) => {
                        debug!("write deadline passed");
                        return;
                    }
                }
            }
            _ = ticker.tick() => {
                match timeout(WRITE_WAIT, sink.send(Message::Ping(Bytes::new()))).await {
                    Ok(Ok(())) => {}
                    _ => return,
                }
            }
        }
    }
}

async fn write_batch<S>(
    sink: &mut S,
    first: String,
    queue: &mut mpsc::Receiver<String>,
) -> Result<(), S::Error>
where
    S: Sink<Message> + Unpin,
{
    sink.feed(Message::Text(first.into())).await?;
    while let Ok(next) = queue.try_recv() {
        sink.feed(Message::Text(next.into())).await?;
    }
    sink.flush().await
}
