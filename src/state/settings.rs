use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::dao::models::{QuizSettings, StageProgression};

impl Default for QuizSettings {
    fn default() -> Self {
        Self {
            max_participants: 10,
            time_per_stage: 15,
            answer_time_limit: 10,
            stage_progression: StageProgression::Auto,
            points_for_stage1: 3,
            points_for_stage2: 2,
            points_for_stage3: 1,
            penalty_points: -1,
        }
    }
}

/// Settings supplied by the host when creating a session. Omitted fields take defaults.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct PartialQuizSettings {
    /// Maximum number of participants (1..=100).
    #[validate(range(min = 1, max = 100))]
    pub max_participants: Option<usize>,
    /// Duration in seconds of each presentation stage (1..=300).
    #[validate(range(min = 1, max = 300))]
    pub time_per_stage: Option<u32>,
    /// Answer time limit in seconds (1..=300).
    #[validate(range(min = 1, max = 300))]
    pub answer_time_limit: Option<u32>,
    /// Auto or manual progression.
    pub stage_progression: Option<StageProgression>,
    /// Points for a correct answer in stage 1 (-1000..=1000).
    #[validate(range(min = -1000, max = 1000))]
    pub points_for_stage1: Option<i32>,
    /// Points for a correct answer in stage 2 (-1000..=1000).
    #[validate(range(min = -1000, max = 1000))]
    pub points_for_stage2: Option<i32>,
    /// Points for a correct answer in stage 3 (-1000..=1000).
    #[validate(range(min = -1000, max = 1000))]
    pub points_for_stage3: Option<i32>,
    /// Points applied to a wrong answer (-1000..=1000).
    #[validate(range(min = -1000, max = 1000))]
    pub penalty_points: Option<i32>,
}

impl PartialQuizSettings {
    /// Fill every missing field from [`QuizSettings::default`].
    pub fn apply_defaults(self) -> QuizSettings {
        let defaults = QuizSettings::default();
        QuizSettings {
            max_participants: self.max_participants.unwrap_or(defaults.max_participants),
            time_per_stage: self.time_per_stage.unwrap_or(defaults.time_per_stage),
            answer_time_limit: self
                .answer_time_limit
                .unwrap_or(defaults.answer_time_limit),
            stage_progression: self
                .stage_progression
                .unwrap_or(defaults.stage_progression),
            points_for_stage1: self
                .points_for_stage1
                .unwrap_or(defaults.points_for_stage1),
            points_for_stage2: self
                .points_for_stage2
                .unwrap_or(defaults.points_for_stage2),
            points_for_stage3: self
                .points_for_stage3
                .unwrap_or(defaults.points_for_stage3),
            penalty_points: self.penalty_points.unwrap_or(defaults.penalty_points),
        }
    }
}
