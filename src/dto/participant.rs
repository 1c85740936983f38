//! DTOs for joining, leaving and listing participants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::ParticipantEntity,
    dto::{format_system_time, validation::validate_display_name},
};

/// Payload used to join a session by id.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinSessionRequest {
    /// Name shown to the other players (1 to 50 characters).
    pub display_name: String,
}

impl Validate for JoinSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_display_name(&self.display_name) {
            errors.add("display_name", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Public projection of a participant.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ParticipantSummary {
    pub id: Uuid,
    pub session_id: Uuid,
    pub display_name: String,
    pub score: i32,
    pub connected: bool,
    pub joined_at: String,
}

impl From<ParticipantEntity> for ParticipantSummary {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            id: value.id,
            session_id: value.session_id,
            display_name: value.display_name,
            score: value.score,
            connected: value.connected,
            joined_at: format_system_time(value.joined_at),
        }
    }
}
