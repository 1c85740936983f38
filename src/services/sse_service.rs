use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::SessionStatus, dto::sse::ServerEvent, error::ServiceError, state::SharedState,
};

/// Subscribe to the stream of a session that has not finished yet.
pub async fn subscribe_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<broadcast::Receiver<ServerEvent>, ServiceError> {
    let store = state.require_quiz_store().await?;
    let session = store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))?;
    if session.status == SessionStatus::Finished {
        return Err(ServiceError::InvalidState(
            "session is finished; no further events will be sent".into(),
        ));
    }
    Ok(state.session_sse(session_id).subscribe())
}

/// Convert a broadcast receiver into an SSE response, forwarding events until the client
/// disconnects or the session hub goes away.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    session_id: Uuid,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
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
                        // Skip lagged messages but keep the stream alive.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!(%session_id, "session SSE stream disconnected");
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
