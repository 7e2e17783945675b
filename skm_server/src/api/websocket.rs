//! WebSocket handler for live table communication.
//!
//! Each connection gets an unbounded event channel whose sender becomes the
//! player's connection handle inside the table actor. A send task forwards
//! events from that channel to the socket as JSON text frames; the receive
//! loop parses client commands and routes them.
//!
//! `table:join`, `table:leave` and `tables:list` are handled here, because
//! they decide which table actor (if any) the connection is attached to.
//! Everything else is forwarded to the joined table.
//!
//! A malformed or out-of-place command never closes the socket; the client
//! gets an `error` event and the connection stays up. A socket that closes
//! without leaving is reported to the table as a disconnect, which keeps
//! the seat for a reconnect.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use shan_koe_mee::{ClientCommand, ServerEvent, TableHandle, TableResponse, Username};

use super::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    info!("ws connection {connection_id} opened");

    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let _ = tx.send(ServerEvent::Connected {
        message: "connected".to_string(),
    });

    let mut session: Option<(TableHandle, Username)> = None;
    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let command: ClientCommand = match serde_json::from_str(&text) {
            Ok(command) => command,
            Err(err) => {
                warn!("ws connection {connection_id} sent unparseable command: {err}");
                let _ = tx.send(ServerEvent::Error {
                    message: "unrecognized command".to_string(),
                });
                continue;
            }
        };

        match command {
            ClientCommand::Join {
                table_id,
                username,
                buy_in,
            } => {
                if session.is_some() {
                    let _ = tx.send(ServerEvent::Error {
                        message: "already seated at a table".to_string(),
                    });
                    continue;
                }
                let Some(handle) = state.manager.get(&table_id) else {
                    let _ = tx.send(ServerEvent::Error {
                        message: format!("no such table: {table_id}"),
                    });
                    continue;
                };
                match handle.join(username.clone(), tx.clone(), buy_in).await {
                    TableResponse::Success => {
                        info!("ws connection {connection_id} joined {table_id} as {username}");
                        session = Some((handle, username));
                    }
                    TableResponse::TableFull => {
                        let _ = tx.send(ServerEvent::Error {
                            message: "table is full".to_string(),
                        });
                    }
                    TableResponse::Error(message) => {
                        let _ = tx.send(ServerEvent::Error { message });
                    }
                }
            }
            ClientCommand::Leave => {
                if let Some((handle, username)) = session.take() {
                    handle.leave(username).await;
                }
            }
            ClientCommand::ListTables => {
                let result = state.manager.summaries().await;
                let _ = tx.send(ServerEvent::TableList { result });
            }
            routed => match &session {
                Some((handle, username)) => handle.command(username.clone(), routed),
                None => {
                    let _ = tx.send(ServerEvent::Error {
                        message: "join a table first".to_string(),
                    });
                }
            },
        }
    }

    if let Some((handle, username)) = session {
        info!("ws connection {connection_id} dropped while seated as {username}");
        handle.disconnect(username);
    }
    send_task.abort();
    info!("ws connection {connection_id} closed");
}
