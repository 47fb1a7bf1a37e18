use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    debug_handler,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{sync::mpsc::UnboundedReceiver, task::JoinHandle, time};

use crate::config::Config;

use super::{
    conn::{Connection, Outbox},
    msg::ServerMsg,
    router::SignalRouter,
};

/// How long queued frames may still flush after teardown.
const FLUSH_GRACE: Duration = Duration::from_secs(1);

#[debug_handler(state = crate::AppState)]
pub async fn room_ws(
    State(router): State<SignalRouter>,
    State(config): State<Arc<Config>>,

    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, router, config))
}

/// Runs one client from accept to teardown.
pub async fn serve(socket: WebSocket, router: SignalRouter, config: Arc<Config>) {
    let (outbox, outbound) = Outbox::channel();
    let mut conn = Connection::new(outbox);
    tracing::info!(conn = %conn.id(), "connected");
    conn.reply(ServerMsg::Welcome { id: conn.id() });

    let (sender, mut receiver) = socket.split();
    let mut writer = tokio::spawn(write_loop(sender, outbound, config.ping_interval));
    let writer_done = read_loop(&mut receiver, &mut writer, &router, &mut conn, config.client_timeout).await;

    router.disconnect(&mut conn).await;
    drop(conn);

    // the registry no longer holds our outbox, so the writer drains and exits
    if !writer_done && time::timeout(FLUSH_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
}

/// Feeds inbound frames to the router until the transport ends. Returns
/// whether the writer finished first.
async fn read_loop(
    receiver: &mut SplitStream<WebSocket>,
    writer: &mut JoinHandle<()>,
    router: &SignalRouter,
    conn: &mut Connection,
    client_timeout: Duration,
) -> bool {
    loop {
        let next = tokio::select! {
            _ = &mut *writer => return true,
            next = time::timeout(client_timeout, receiver.next()) => next,
        };

        match next {
            Err(_) => {
                tracing::info!(conn = %conn.id(), "client went silent");
                return false;
            }
            Ok(None) => return false,
            Ok(Some(Err(err))) => {
                tracing::debug!(conn = %conn.id(), "transport error: {err}");
                return false;
            }
            Ok(Some(Ok(msg))) => match msg {
                Message::Text(text) => router.handle_frame(conn, text.as_str().as_bytes()).await,
                Message::Binary(data) => router.handle_frame(conn, &data).await,
                Message::Close(_) => return false,
                Message::Ping(_) | Message::Pong(_) => {}
            },
        }
    }
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, Message>,
    mut outbound: UnboundedReceiver<ServerMsg>,
    ping_interval: Duration,
) {
    let mut ping = time::interval(ping_interval);
    ping.tick().await;

    loop {
        let frame = tokio::select! {
            msg = outbound.recv() => {
                let Some(msg) = msg else { break };
                match serde_json::to_string(&msg) {
                    Ok(text) => Message::Text(text.into()),
                    Err(err) => {
                        tracing::warn!("could not encode {msg:?}: {err}");
                        continue;
                    }
                }
            }
            _ = ping.tick() => Message::Ping(Bytes::new()),
        };

        if sender.send(frame).await.is_err() {
            break;
        }
    }

    let _ = sender.close().await;
}
