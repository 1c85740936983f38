use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Serve the Swagger UI at `/docs` along with the raw OpenAPI document.
pub fn router(state: SharedState) -> Router<SharedState> {
    let ui: Router<SharedState> = SwaggerUi::new("/docs")
        .url(OPENAPI_JSON_PATH, ApiDoc::openapi())
        .into();

    ui.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_quiz_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/playlists",
            "/sessions",
            "/sessions/{id}",
            "/sessions/by-code/{code}",
            "/sessions/{id}/questions",
            "/sessions/{id}/start",
            "/sessions/{id}/advance",
            "/sessions/{id}/terminate",
            "/sessions/{id}/participants",
            "/sessions/{id}/answers",
            "/sessions/{id}/events",
            "/healthcheck",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
    }
}
