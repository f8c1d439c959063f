//! Server-Sent Events keep-alive emitter.
//!
//! Each open `GET /mcp/sse` connection gets one emitter task. The task sends
//! an `initialize` notification immediately, then a timestamped ping every
//! interval. The HTTP response body is the receiving half of a bounded
//! channel: when the client disconnects actix drops the body, the channel
//! closes, and the task returns. Nothing outlives the connection.

use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use futures_util::Stream;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Events buffered between the emitter and a slow client.
const CHANNEL_CAPACITY: usize = 4;

/// Id used for the server-initiated `initialize` event.
const INITIALIZE_EVENT_ID: u64 = 1;

/// Format one SSE frame.
pub fn frame(event: &str, data: &Value) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

pub fn initialize_frame(initialize_result: Value) -> Bytes {
    frame(
        "message",
        &json!({
            "jsonrpc": "2.0",
            "id": INITIALIZE_EVENT_ID,
            "result": initialize_result,
        }),
    )
}

pub fn ping_frame() -> Bytes {
    frame(
        "ping",
        &json!({
            "jsonrpc": "2.0",
            "method": "ping",
            "params": { "timestamp": chrono::Utc::now().to_rfc3339() },
        }),
    )
}

/// Start an emitter and return its task handle plus the event stream to use
/// as a response body.
///
/// The body's lifetime bounds the task; the handle is only for joining it.
/// Must be called from within a tokio runtime.
pub fn spawn(
    initialize_result: Value,
    interval: Duration,
) -> (JoinHandle<()>, impl Stream<Item = Result<Bytes, Infallible>> + Unpin + 'static) {
    let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);
    let task = tokio::spawn(emit(tx, initialize_result, interval));

    let body = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok(chunk), rx))
    });
    (task, Box::pin(body))
}

async fn emit(tx: mpsc::Sender<Bytes>, initialize_result: Value, interval: Duration) {
    tracing::info!("SSE client connected");
    if tx.send(initialize_frame(initialize_result)).await.is_err() {
        tracing::info!("SSE client disconnected before handshake");
        return;
    }

    // An interval past the clock's range never ticks; just wait for the client to leave.
    let Some(first_tick) = Instant::now()
        .checked_add(interval)
        .filter(|start| start.checked_add(interval).is_some())
    else {
        tx.closed().await;
        tracing::info!("SSE client disconnected");
        return;
    };

    let mut ticker = time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            _ = ticker.tick() => {
                if tx.send(ping_frame()).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::info!("SSE client disconnected");
}
