//! DTOs for answer submission.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Answer typed by a participant for the current question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitAnswerRequest {
    pub participant_id: Uuid,
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 200))]
    pub answer: String,
    /// Milliseconds the client believes have elapsed in the question. Informational only.
    #[serde(default)]
    pub elapsed_ms: Option<u64>,
}

/// Scoring outcome of a submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub is_correct: bool,
    pub points_awarded: i32,
    /// Stage the answer was scored in (1 to 3).
    pub stage: u8,
    pub new_score: i32,
    /// Best similarity against the accepted answers, in `[0, 1]`.
    pub confidence: f64,
}
