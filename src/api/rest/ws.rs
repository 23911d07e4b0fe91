use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::account::GeoPoint;
use crate::realtime::ChannelEvent;
use crate::state::AppState;

/// Frames a client may send. Group keys are opaque IDs; supplying one is
/// the only "authentication" the channel performs.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientFrame {
    Authenticate { user_id: Uuid },
    RiderAuthenticate { rider_id: Uuid },
    RiderLocationUpdate { order_id: Uuid, location: GeoPoint },
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut groups: StreamMap<Uuid, BroadcastStream<ChannelEvent>> = StreamMap::new();

    state.metrics.realtime_clients.inc();
    info!("websocket client connected");

    loop {
        tokio::select! {
            frame = receiver.next() => {
                let Some(Ok(message)) = frame else { break };
                let Message::Text(text) = message else { continue };

                match serde_json::from_str::<ClientFrame>(&text) {
                    Ok(frame) => apply_frame(&state, &mut groups, frame),
                    Err(err) => {
                        warn!(error = %err, "ignoring malformed client frame");
                    }
                }
            }
            Some((_, event)) = groups.next(), if !groups.is_empty() => {
                // Lagged receivers just skip ahead; there is no replay.
                let Ok(event) = event else { continue };
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        warn!(error = %err, "failed to serialize channel event");
                        continue;
                    }
                };
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    }

    let joined: Vec<Uuid> = groups.keys().copied().collect();
    drop(groups);
    for group in joined {
        state.hub.prune(group);
    }

    state.metrics.realtime_clients.dec();
    info!("websocket client disconnected");
}

/// Dispatches one parsed client frame against the connection's group
/// subscriptions.
fn apply_frame(
    state: &AppState,
    groups: &mut StreamMap<Uuid, BroadcastStream<ChannelEvent>>,
    frame: ClientFrame,
) {
    match frame {
        ClientFrame::Authenticate { user_id } => {
            join_group(state, groups, user_id);
        }
        ClientFrame::RiderAuthenticate { rider_id } => {
            join_group(state, groups, rider_id);
        }
        ClientFrame::RiderLocationUpdate { order_id, location } => {
            let reached = state
                .hub
                .publish(order_id, ChannelEvent::LocationUpdate { order_id, location });
            state.metrics.location_broadcasts_total.inc();
            tracing::debug!(order_id = %order_id, reached, "location update published");
        }
    }
}

fn join_group(
    state: &AppState,
    groups: &mut StreamMap<Uuid, BroadcastStream<ChannelEvent>>,
    group: Uuid,
) {
    if groups.contains_key(&group) {
        return;
    }
    let rx = state.hub.subscribe(group);
    groups.insert(group, BroadcastStream::new(rx));
}
