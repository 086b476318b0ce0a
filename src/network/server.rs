//! WebSocket Arena Server
//!
//! Accepts client connections, parses protocol messages and routes them to
//! the arena session. All game decisions happen in the session's
//! simulation; this layer only moves messages.

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use crate::game::fighter::EntityId;
use crate::network::protocol::{ClientMessage, ErrorCode, ServerMessage};
use crate::network::session::{ArenaSession, SessionCommand, SessionConfig, run_session};
use crate::TICK_RATE;

/// Server-level errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Socket-level failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or framing failure.
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),

    /// The arena session is gone.
    #[error("session closed")]
    SessionClosed,
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: String,
    /// Session configuration
    pub session: SessionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9001".to_string(),
            session: SessionConfig::default(),
        }
    }
}

/// The arena server: one listening socket, one session.
pub struct ArenaServer {
    config: ServerConfig,
}

impl ArenaServer {
    /// Create a server.
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Listen and serve until the process is stopped.
    pub async fn run(self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!(addr = %self.config.bind_addr, "arena server listening");

        let (commands, command_rx) = mpsc::channel(256);
        let session = ArenaSession::new(self.config.session.clone());
        tokio::spawn(run_session(session, command_rx));

        loop {
            let (stream, addr) = listener.accept().await?;
            debug!(%addr, "incoming connection");
            let commands = commands.clone();
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, addr, commands).await {
                    warn!(%addr, %err, "connection ended with error");
                }
            });
        }
    }
}

/// Serve one client connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: mpsc::Sender<SessionCommand>,
) -> Result<(), ServerError> {
    let ws = accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    // One writer owns the sink; everything else goes through this queue.
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(256);
    let writer = tokio::spawn(async move {
        while let Some(message) = out_rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    let mut entity: Option<EntityId> = None;
    let mut broadcast_task: Option<tokio::task::JoinHandle<()>> = None;

    while let Some(frame) = stream.next().await {
        let frame = frame?;
        let text = match frame {
            Message::Text(text) => text,
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => continue,
            _ => continue,
        };

        let message: ClientMessage = match serde_json::from_str(&text) {
            Ok(message) => message,
            Err(err) => {
                debug!(%addr, %err, "unparseable message");
                let _ = out_tx
                    .send(ServerMessage::Error {
                        code: ErrorCode::InvalidMessage,
                        message: err.to_string(),
                    })
                    .await;
                continue;
            }
        };

        match message {
            ClientMessage::Join(request) => {
                let (reply_tx, reply_rx) = oneshot::channel();
                commands
                    .send(SessionCommand::Join {
                        name: request.name,
                        team: request.team,
                        reply: reply_tx,
                    })
                    .await
                    .map_err(|_| ServerError::SessionClosed)?;

                match reply_rx.await.map_err(|_| ServerError::SessionClosed)? {
                    Ok((ack, mut events)) => {
                        entity = Some(ack.entity);
                        let _ = out_tx
                            .send(ServerMessage::Welcome {
                                entity: ack.entity.0,
                                match_id: hex::encode(ack.match_id),
                                tick_rate: TICK_RATE,
                                base_health: ack.base_health,
                            })
                            .await;

                        // Forward session broadcasts to this client
                        let forward_tx = out_tx.clone();
                        broadcast_task = Some(tokio::spawn(async move {
                            while let Ok(message) = events.recv().await {
                                if forward_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                        }));
                    }
                    Err(err) => {
                        let code = match err {
                            crate::network::session::SessionError::ArenaFull => ErrorCode::ArenaFull,
                            crate::network::session::SessionError::MatchStarted => {
                                ErrorCode::MatchStarted
                            }
                            crate::network::session::SessionError::UnknownFighter(_) => {
                                ErrorCode::NotJoined
                            }
                        };
                        let _ = out_tx
                            .send(ServerMessage::Error {
                                code,
                                message: err.to_string(),
                            })
                            .await;
                    }
                }
            }

            ClientMessage::Ready => {
                let Some(entity) = entity else {
                    let _ = out_tx
                        .send(ServerMessage::Error {
                            code: ErrorCode::NotJoined,
                            message: "join before readying up".to_string(),
                        })
                        .await;
                    continue;
                };
                commands
                    .send(SessionCommand::Ready { entity })
                    .await
                    .map_err(|_| ServerError::SessionClosed)?;
            }

            ClientMessage::Input(input) => {
                let Some(entity) = entity else {
                    continue; // silently drop input from spectators
                };
                commands
                    .send(SessionCommand::Input { entity, input })
                    .await
                    .map_err(|_| ServerError::SessionClosed)?;
            }

            ClientMessage::Ping { timestamp } => {
                let _ = out_tx.send(ServerMessage::Pong { timestamp }).await;
            }

            ClientMessage::Leave => break,
        }
    }

    // Connection gone: withdraw the fighter
    if let Some(entity) = entity {
        let _ = commands.send(SessionCommand::Leave { entity }).await;
    }
    if let Some(task) = broadcast_task {
        task.abort();
    }
    writer.abort();
    debug!(%addr, "connection closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:9001");
        assert_eq!(config.session.max_fighters, 4);
    }
}
