use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Playlist Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::playlists::create_playlist,
        crate::routes::playlists::get_playlist,
        crate::routes::sessions::create_session,
        crate::routes::sessions::list_sessions,
        crate::routes::sessions::get_session,
        crate::routes::sessions::delete_session,
        crate::routes::sessions::find_by_room_code,
        crate::routes::sessions::generate_questions,
        crate::routes::sessions::list_questions,
        crate::routes::sessions::start_session,
        crate::routes::sessions::advance_session,
        crate::routes::sessions::terminate_session,
        crate::routes::participants::join_session,
        crate::routes::participants::join_by_room_code,
        crate::routes::participants::leave_session,
        crate::routes::participants::list_participants,
        crate::routes::answers::submit_answer,
        crate::routes::sse::session_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dto::playlist::CreatePlaylistRequest,
            crate::dto::playlist::PlaylistVideoInput,
            crate::dto::playlist::PlaylistSummary,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionSummary,
            crate::dto::session::SessionDetails,
            crate::dto::participant::JoinSessionRequest,
            crate::dto::participant::ParticipantSummary,
            crate::dto::question::GenerateQuestionsResponse,
            crate::dto::question::QuestionPreview,
            crate::dto::answer::SubmitAnswerRequest,
            crate::dto::answer::SubmitAnswerResponse,
            crate::dto::sse::Handshake,
            crate::dto::sse::QuizEvent,
            crate::state::settings::PartialQuizSettings,
            crate::dao::models::QuizSettings,
            crate::dao::models::SessionStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "playlists", description = "Playlist registration"),
        (name = "sessions", description = "Session lifecycle"),
        (name = "participants", description = "Joining and leaving sessions"),
        (name = "answers", description = "Answer submission and scoring"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
