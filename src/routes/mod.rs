use axum::Router;

use crate::state::SharedState;

pub mod answers;
pub mod docs;
pub mod extract;
pub mod health;
pub mod participants;
pub mod playlists;
pub mod sessions;
pub mod sse;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(playlists::router())
        .merge(sessions::router())
        .merge(participants::router())
        .merge(answers::router())
        .merge(sse::router());

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}
