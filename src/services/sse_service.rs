use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dto::sse::{AdminHandshake, ServerEvent},
    error::ServiceError,
    state::{SharedState, SseHub},
};

/// Subscribe to the shared public SSE stream.
pub fn subscribe_public(state: &SharedState) -> broadcast::Receiver<ServerEvent> {
    state.public_sse().subscribe()
}

/// Subscribe to the admin-only SSE stream.
pub async fn subscribe_admin(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, String), ServiceError> {
    let token = claim_admin_token(state).await?;
    let receiver = state.admin_sse().subscribe();
    Ok((receiver, token))
}

/// Subscribe to the stream of a registered participant.
pub async fn subscribe_participant(
    state: &SharedState,
    id: Uuid,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    let session = state.session().read().await;
    if !session.participants.contains_key(&id) {
        return Err(ServiceError::NotFound(format!("participant {id} not found")));
    }
    // Subscribing under the session lock keeps a concurrent reset from missing this channel.
    Ok(state.sse().subscribe_participant(id))
}

/// Identifies the target SSE stream so teardown can do stream-specific bookkeeping.
#[derive(Clone)]
pub enum StreamKind {
    Public,
    /// Carries the shared state so teardown can release the admin token.
    Admin(SharedState),
    Participant(Uuid),
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            let mut event = Event::default().data(payload.data);
                            if let Some(name) = payload.event {
                                event = event.event(name);
                            }

                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "SSE subscriber lagged; skipping events");
                            continue;
                        }
                    }
                }
            }
        }

        match kind {
            StreamKind::Public => info!("Public SSE stream disconnected"),
            StreamKind::Admin(state) => {
                reset_admin_token(state).await;
                info!("Admin SSE stream disconnected")
            }
            StreamKind::Participant(id) => {
                info!(participant_id = %id, "Participant SSE stream disconnected")
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Reserve the admin token for a new stream, failing if another connection holds it.
async fn claim_admin_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.admin_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "Another admin SSE stream is already active".into(),
        )),
    }
}

/// Send the freshly issued token onto the admin stream.
pub fn broadcast_admin_handshake(hub: &SseHub, token: &str) {
    if let Ok(event) = ServerEvent::json(
        Some("admin_token".to_string()),
        &AdminHandshake {
            token: token.to_string(),
        },
    ) {
        hub.broadcast(event);
    }
}

/// Send a human-readable info message onto a stream.
pub fn broadcast_info(hub: &SseHub, message: &str) {
    hub.broadcast(ServerEvent::new(
        Some("info".to_string()),
        message.to_string(),
    ));
}

async fn reset_admin_token(state: SharedState) {
    let mut guard = state.admin_token().lock().await;
    guard.take();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    #[tokio::test]
    async fn only_one_admin_stream_at_a_time() {
        let state = AppState::new(AppConfig::default());

        let (_rx, token) = subscribe_admin(&state).await.unwrap();
        assert_eq!(token.len(), 32);
        assert!(matches!(
            subscribe_admin(&state).await,
            Err(ServiceError::Unauthorized(_))
        ));

        reset_admin_token(state.clone()).await;
        assert!(subscribe_admin(&state).await.is_ok());
    }

    #[tokio::test]
    async fn handshake_reaches_admin_subscriber() {
        let state = AppState::new(AppConfig::default());
        let (mut rx, token) = subscribe_admin(&state).await.unwrap();

        broadcast_admin_handshake(state.admin_sse(), &token);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("admin_token"));
        assert!(event.data.contains(&token));
    }

    #[tokio::test]
    async fn unknown_participant_cannot_subscribe() {
        let state = AppState::new(AppConfig::default());
        assert!(matches!(
            subscribe_participant(&state, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
