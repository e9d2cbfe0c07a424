//! Realtime gateway: one WebSocket connection per client.
//!
//! Each connection gets an identity and a bounded outbound channel. A
//! dedicated sender task drains the channel onto the socket, so a slow or
//! gone client backs up only its own queue and never a match. Inbound
//! frames are decoded into [`ClientMessage`] and translated into registry
//! and coordinator calls; every resulting [`MatchState`] snapshot flows
//! back as a typed message.
//!
//! The gateway holds no game state. Matches live in the registry and keep
//! running when a connection drops; a reconnecting client re-attaches by
//! sending `get_state` with its match id.

use crate::coordinator::{BotTurn, MatchCoordinator};
use crate::protocol::{ClientMessage, ServerMessage};
use crate::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Outbound messages queued per connection before the sender task
/// applies backpressure.
const OUTBOUND_BUFFER: usize = 64;

/// Axum handler for WebSocket upgrade requests.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Runs one connection to completion.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();
    tracing::info!(%client_id, "client connected");

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(OUTBOUND_BUFFER);

    // Sender task: the only writer to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let Ok(json) = serde_json::to_string(&msg) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        if let Message::Text(text) = msg {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(client_msg, &state, &tx).await,
                Err(e) => {
                    send(
                        &tx,
                        ServerMessage::Error {
                            message: format!("malformed message: {}", e),
                        },
                    )
                    .await;
                }
            }
        }
    }

    // The match, if any, keeps running in the registry; only this
    // connection's plumbing goes away.
    tracing::info!(%client_id, "client disconnected");
    send_task.abort();
}

/// Queues an outbound message, dropping it if the connection is gone.
async fn send(tx: &mpsc::Sender<ServerMessage>, msg: ServerMessage) {
    let _ = tx.send(msg).await;
}

/// Dispatches one inbound message.
async fn handle_message(msg: ClientMessage, state: &AppState, tx: &mpsc::Sender<ServerMessage>) {
    match msg {
        ClientMessage::CreateMatch { config } => match state.registry.create(config).await {
            Ok(coordinator) => {
                send(
                    tx,
                    ServerMessage::MatchCreated {
                        match_id: coordinator.id().to_string(),
                    },
                )
                .await;

                let snapshot = coordinator.snapshot().await;
                let ended = snapshot.game_over;
                let winner = snapshot.winner;
                let message = snapshot.message.clone();
                send(tx, ServerMessage::GameState { state: snapshot }).await;

                if ended {
                    // a bot seat failed to initialize and forfeited
                    let message = message.unwrap_or_else(|| "match ended".to_string());
                    send(
                        tx,
                        ServerMessage::BotError {
                            message: message.clone(),
                        },
                    )
                    .await;
                    send(tx, ServerMessage::MatchEnd { winner, message }).await;
                } else {
                    spawn_bot_driver(coordinator, tx.clone()).await;
                }
            }
            Err(e) => {
                send(
                    tx,
                    ServerMessage::Error {
                        message: format!("Failed to create match: {}", e),
                    },
                )
                .await;
            }
        },

        ClientMessage::PlayMove { match_id, row, col } => {
            let coordinator = match state.registry.get(&match_id) {
                Ok(coordinator) => coordinator,
                Err(e) => {
                    send(
                        tx,
                        ServerMessage::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                    return;
                }
            };

            match coordinator.play_move(row, col).await {
                Ok((snapshot, mover)) => {
                    send(
                        tx,
                        ServerMessage::MovePlayed {
                            row,
                            col,
                            player: mover.index() as i8,
                        },
                    )
                    .await;

                    let ended = snapshot.game_over;
                    let winner = snapshot.winner;
                    let message = snapshot.message.clone();
                    send(tx, ServerMessage::GameState { state: snapshot }).await;

                    if ended {
                        send(
                            tx,
                            ServerMessage::MatchEnd {
                                winner,
                                message: message.unwrap_or_else(|| "match ended".to_string()),
                            },
                        )
                        .await;
                    } else {
                        spawn_bot_driver(coordinator, tx.clone()).await;
                    }
                }
                Err(e) => {
                    send(
                        tx,
                        ServerMessage::Error {
                            message: e.to_string(),
                        },
                    )
                    .await;
                }
            }
        }

        ClientMessage::TogglePause { match_id } => match state.registry.get(&match_id) {
            Ok(coordinator) => {
                let snapshot = coordinator.toggle_pause().await;
                send(tx, ServerMessage::GameState { state: snapshot }).await;
                // resuming may hand the turn back to a bot
                spawn_bot_driver(coordinator, tx.clone()).await;
            }
            Err(e) => {
                send(
                    tx,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        },

        ClientMessage::GetState { match_id } => match state.registry.get(&match_id) {
            Ok(coordinator) => {
                let snapshot = coordinator.snapshot().await;
                send(tx, ServerMessage::GameState { state: snapshot }).await;
            }
            Err(e) => {
                send(
                    tx,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
        },
    }
}

/// Spawns a task that advances bot turns until the match reaches a human
/// turn, a pause, or its end. Advancement is serialized by the
/// coordinator, so overlapping drivers are harmless.
async fn spawn_bot_driver(coordinator: Arc<MatchCoordinator>, tx: mpsc::Sender<ServerMessage>) {
    if !coordinator.needs_bot_turn().await {
        return;
    }
    tokio::spawn(async move {
        loop {
            match coordinator.advance_bot_turn().await {
                BotTurn::Idle => break,
                BotTurn::Played(snapshot) => {
                    let ended = snapshot.game_over;
                    let winner = snapshot.winner;
                    let message = snapshot.message.clone();
                    send(&tx, ServerMessage::GameState { state: snapshot }).await;
                    if ended {
                        send(
                            &tx,
                            ServerMessage::MatchEnd {
                                winner,
                                message: message.unwrap_or_else(|| "match ended".to_string()),
                            },
                        )
                        .await;
                        break;
                    }
                }
                BotTurn::Fault { state, message } => {
                    let winner = state.winner;
                    send(
                        &tx,
                        ServerMessage::BotError {
                            message: message.clone(),
                        },
                    )
                    .await;
                    send(&tx, ServerMessage::GameState { state }).await;
                    send(&tx, ServerMessage::MatchEnd { winner, message }).await;
                    break;
                }
            }
        }
    });
}
