//! WebSocket transport for the game session.
//!
//! Each connection gets a writer task merging two streams: direct replies
//! to this connection and the session broadcast. Participants a connection
//! joined one by one leave when it closes; a seated roster stays until it
//! is replaced.

use crate::models::ClientMessage;
use crate::state::AppState;
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use session::SessionEvent;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tracing::{debug, info, warn};
use types::errors::SessionError;
use types::ids::{ConnectionId, ParticipantId};

/// Replies queued per connection before the reader waits on the writer.
const REPLY_QUEUE_CAPACITY: usize = 64;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection = ConnectionId::new();
    info!(client_id = %connection, "Client connected");

    let (mut sink, mut stream) = socket.split();
    let (replies, mut reply_queue) = mpsc::channel::<SessionEvent>(REPLY_QUEUE_CAPACITY);
    let mut broadcasts = state.session.subscribe();

    let writer = tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                reply = reply_queue.recv() => match reply {
                    Some(event) => event,
                    None => break,
                },
                broadcast = broadcasts.recv() => match broadcast {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(client_id = %connection, skipped, "Client lagging, events dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                },
            };

            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(event = event.label(), error = %e, "Failed to encode event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined = Vec::new();
    let greeting = SessionEvent::ConnectionStatus {
        client_id: connection,
    };
    if replies.send(greeting).await.is_ok() {
        while let Some(Ok(message)) = stream.next().await {
            let reply = match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(command) => dispatch(&state, connection, &mut joined, command).await,
                    Err(e) => Some(SessionEvent::error(format!("Invalid message: {e}"))),
                },
                Message::Close(_) => break,
                _ => None,
            };
            if let Some(reply) = reply {
                if replies.send(reply).await.is_err() {
                    break;
                }
            }
        }
    }

    leave_joined(&state, connection, joined).await;
    writer.abort();
    info!(client_id = %connection, "Client disconnected");
}

/// Apply one client message; returns the reply for this connection.
///
/// `None` means the answer reaches every connection through the session
/// broadcast instead.
pub async fn dispatch(
    state: &AppState,
    connection: ConnectionId,
    joined: &mut Vec<ParticipantId>,
    message: ClientMessage,
) -> Option<SessionEvent> {
    let session = &state.session;
    match message {
        ClientMessage::JoinGame {
            config: Some(roster),
            ..
        } => {
            let seated = match session.seat_roster(roster.names(), roster.include_ai).await {
                Ok(seated) => seated,
                Err(e) => return Some(SessionEvent::error(e.to_string())),
            };
            // The roster replaced every participant, this connection's included.
            joined.clear();
            Some(match session.snapshot().await {
                Ok(snapshot) => SessionEvent::Joined {
                    participants: seated,
                    snapshot,
                },
                Err(e) => SessionEvent::error(e.to_string()),
            })
        }

        ClientMessage::JoinGame {
            player_id,
            config: None,
        } => {
            let id = player_id.unwrap_or_else(|| connection.into());
            Some(match session.join(id.clone()).await {
                Ok(snapshot) => {
                    joined.push(id.clone());
                    SessionEvent::Joined {
                        participants: vec![id],
                        snapshot,
                    }
                }
                Err(e) => SessionEvent::error(e.to_string()),
            })
        }

        ClientMessage::StartGame { symbols } => match session.start(symbols).await {
            Ok(_) => None,
            Err(e @ SessionError::AlreadyRunning) => Some(SessionEvent::error(e.to_string())),
            Err(e) => Some(SessionEvent::error(format!("Failed to start game: {e}"))),
        },

        ClientMessage::PlayerAction {
            player_id,
            fund,
            action,
        } => {
            let id = match acting_participant(player_id, joined) {
                Ok(id) => id,
                Err(event) => return Some(event),
            };
            Some(match session.trade(id.clone(), fund, action).await {
                Ok(view) => SessionEvent::ActionResult {
                    success: true,
                    player_id: id,
                    fund,
                    action,
                    detail: format!("Action {} succeeded for fund {fund}", action.as_str()),
                    player_state: Some(view),
                },
                Err(e @ SessionError::UnknownParticipant(_)) => SessionEvent::error(e.to_string()),
                Err(e) => SessionEvent::ActionResult {
                    success: false,
                    player_id: id,
                    fund,
                    action,
                    detail: e.to_string(),
                    player_state: None,
                },
            })
        }

        ClientMessage::NavigateChart {
            player_id,
            fund,
            direction,
        } => {
            let id = match acting_participant(player_id, joined) {
                Ok(id) => id,
                Err(event) => return Some(event),
            };
            Some(match session.navigate_chart(id.clone(), fund, direction).await {
                Ok(cursor) => SessionEvent::Chart {
                    player_id: id,
                    fund,
                    cursor,
                },
                Err(e) => SessionEvent::error(e.to_string()),
            })
        }

        ClientMessage::GetGameState => Some(match session.snapshot().await {
            Ok(snapshot) => SessionEvent::GameState { snapshot },
            Err(e) => SessionEvent::error(e.to_string()),
        }),

        ClientMessage::StopGame => match session.stop().await {
            Ok(()) => None,
            Err(e) => Some(SessionEvent::error(e.to_string())),
        },

        ClientMessage::GetAvailableStocks => Some(match session.available_symbols().await {
            Ok(symbols) => SessionEvent::AvailableSymbols { symbols },
            Err(e) => SessionEvent::error(e.to_string()),
        }),
    }
}

/// Remove the participants a closing connection joined itself.
async fn leave_joined(state: &AppState, connection: ConnectionId, joined: Vec<ParticipantId>) {
    for id in joined {
        if let Err(e) = state.session.leave(id).await {
            debug!(client_id = %connection, error = %e, "Leave after disconnect failed");
        }
    }
}

/// The participant a command acts for: the named one, or the only one this
/// connection joined.
fn acting_participant(
    named: Option<ParticipantId>,
    joined: &[ParticipantId],
) -> Result<ParticipantId, SessionEvent> {
    match (named, joined) {
        (Some(id), _) => Ok(id),
        (None, [only]) => Ok(only.clone()),
        (None, _) => Err(SessionEvent::error("player_id is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use persistence::GlobalLeaderboardStore;
    use session::{InMemoryFeed, SessionConfig, SessionEngine};
    use std::sync::Arc;
    use tempfile::TempDir;
    use types::fund::TradeKind;
    use types::ids::{FundSlot, Symbol};
    use types::player::ChartDirection;

    fn app_state(tmp: &TempDir) -> AppState {
        let feed = InMemoryFeed::new()
            .with_prices("aaa", &[50.0, 60.0])
            .with_prices("bbb", &[20.0, 25.0]);
        let config = SessionConfig {
            tick_rate_hz: 10,
            duration_secs: 1,
            ..SessionConfig::default()
        };
        let (session, _task) = session::spawn(SessionEngine::new(config, Arc::new(feed)), None);
        let store = Arc::new(GlobalLeaderboardStore::new(tmp.path().join("board.json")));
        AppState::new(session, store)
    }

    fn slot(index: usize) -> FundSlot {
        FundSlot::new(index).unwrap()
    }

    #[tokio::test]
    async fn test_join_defaults_to_connection_id() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let connection = ConnectionId::new();
        let mut joined = Vec::new();

        let reply = dispatch(
            &state,
            connection,
            &mut joined,
            ClientMessage::JoinGame {
                player_id: None,
                config: None,
            },
        )
        .await;

        match reply {
            Some(SessionEvent::Joined {
                participants,
                snapshot,
            }) => {
                assert_eq!(participants, vec![ParticipantId::from(connection)]);
                assert!(snapshot.players.contains_key(&participants[0]));
            }
            other => panic!("Expected joined, got {:?}", other),
        }
        assert_eq!(joined.len(), 1);
    }

    #[tokio::test]
    async fn test_roster_join_seats_ai_first() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let mut joined = Vec::new();
        let roster: ClientMessage = serde_json::from_str(
            r#"{"type":"join_game","config":{"player_names":["Ann","Bob"]}}"#,
        )
        .unwrap();

        let reply = dispatch(&state, ConnectionId::new(), &mut joined, roster).await;

        match reply {
            Some(SessionEvent::Joined { participants, .. }) => {
                assert_eq!(
                    participants,
                    vec![
                        ParticipantId::ai(),
                        ParticipantId::new("Ann"),
                        ParticipantId::new("Bob")
                    ]
                );
            }
            other => panic!("Expected joined, got {:?}", other),
        }
        assert!(joined.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_keeps_roster_seated_elsewhere() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let (first, second) = (ConnectionId::new(), ConnectionId::new());
        let (mut first_joined, mut second_joined) = (Vec::new(), Vec::new());

        let roster = |names: &str| -> ClientMessage {
            serde_json::from_str(&format!(
                r#"{{"type":"join_game","config":{{"player_names":{names}}}}}"#
            ))
            .unwrap()
        };
        dispatch(&state, first, &mut first_joined, roster(r#"["Ann"]"#)).await;
        dispatch(&state, second, &mut second_joined, roster(r#"["Ann","Bob"]"#)).await;
        assert!(first_joined.is_empty());
        assert!(second_joined.is_empty());

        leave_joined(&state, first, first_joined).await;
        leave_joined(&state, second, second_joined).await;

        let snapshot = state.session.snapshot().await.unwrap();
        let remaining: Vec<_> = snapshot.players.keys().cloned().collect();
        assert_eq!(
            remaining,
            vec![
                ParticipantId::ai(),
                ParticipantId::new("Ann"),
                ParticipantId::new("Bob")
            ]
        );
    }

    #[tokio::test]
    async fn test_action_requires_player_when_ambiguous() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let mut joined = vec![ParticipantId::new("Ann"), ParticipantId::new("Bob")];

        let reply = dispatch(
            &state,
            ConnectionId::new(),
            &mut joined,
            ClientMessage::PlayerAction {
                player_id: None,
                fund: slot(0),
                action: TradeKind::AllIn,
            },
        )
        .await;

        assert!(matches!(reply, Some(SessionEvent::Error { .. })));
    }

    #[tokio::test]
    async fn test_failed_action_reports_result() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let mut joined = Vec::new();
        let connection = ConnectionId::new();

        dispatch(
            &state,
            connection,
            &mut joined,
            ClientMessage::JoinGame {
                player_id: Some(ParticipantId::new("Ann")),
                config: None,
            },
        )
        .await;

        // Lobby: no prices, so the trade is rejected.
        let reply = dispatch(
            &state,
            connection,
            &mut joined,
            ClientMessage::PlayerAction {
                player_id: None,
                fund: slot(0),
                action: TradeKind::AllIn,
            },
        )
        .await;

        match reply {
            Some(SessionEvent::ActionResult {
                success,
                player_id,
                player_state,
                ..
            }) => {
                assert!(!success);
                assert_eq!(player_id, ParticipantId::new("Ann"));
                assert!(player_state.is_none());
            }
            other => panic!("Expected action result, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_player_action_is_error() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);

        let reply = dispatch(
            &state,
            ConnectionId::new(),
            &mut Vec::new(),
            ClientMessage::PlayerAction {
                player_id: Some(ParticipantId::new("ghost")),
                fund: slot(0),
                action: TradeKind::AllOut,
            },
        )
        .await;

        match reply {
            Some(SessionEvent::Error { message }) => assert_eq!(message, "Player not found: ghost"),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_is_broadcast_and_restart_rejected() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let mut events = state.session.subscribe();
        let start = || ClientMessage::StartGame {
            symbols: Some(vec![Symbol::new("aaa"), Symbol::new("bbb")]),
        };

        let reply = dispatch(&state, ConnectionId::new(), &mut Vec::new(), start()).await;
        assert!(reply.is_none());
        assert!(matches!(
            events.recv().await.unwrap(),
            SessionEvent::Started { .. }
        ));

        let reply = dispatch(&state, ConnectionId::new(), &mut Vec::new(), start()).await;
        match reply {
            Some(SessionEvent::Error { message }) => assert_eq!(message, "Game already running"),
            other => panic!("Expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_chart_and_queries() {
        let tmp = TempDir::new().unwrap();
        let state = app_state(&tmp);
        let mut joined = Vec::new();
        let connection = ConnectionId::new();
        dispatch(
            &state,
            connection,
            &mut joined,
            ClientMessage::JoinGame {
                player_id: None,
                config: None,
            },
        )
        .await;

        let reply = dispatch(
            &state,
            connection,
            &mut joined,
            ClientMessage::NavigateChart {
                player_id: None,
                fund: slot(1),
                direction: ChartDirection::Next,
            },
        )
        .await;
        assert!(matches!(reply, Some(SessionEvent::Chart { cursor: 1, .. })));

        let reply = dispatch(&state, connection, &mut joined, ClientMessage::GetGameState).await;
        assert!(matches!(reply, Some(SessionEvent::GameState { .. })));

        let reply =
            dispatch(&state, connection, &mut joined, ClientMessage::GetAvailableStocks).await;
        match reply {
            Some(SessionEvent::AvailableSymbols { symbols }) => assert_eq!(symbols.len(), 2),
            other => panic!("Expected symbols, got {:?}", other),
        }

        let reply = dispatch(&state, connection, &mut joined, ClientMessage::StopGame).await;
        assert!(matches!(reply, Some(SessionEvent::Error { .. })));
    }
}
