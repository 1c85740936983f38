//! Validation helpers for DTOs.

use validator::ValidationError;

use crate::services::question_generator::resolve_video_reference;

/// Longest accepted display name, in characters, once trimmed.
pub const MAX_DISPLAY_NAME_CHARS: usize = 50;

/// Validates that a display name has 1 to 50 characters once surrounding whitespace is removed.
///
/// # Examples
///
/// ```ignore
/// validate_display_name("Alice")   // Ok
/// validate_display_name("   ")     // Err - blank
/// ```
pub fn validate_display_name(name: &str) -> Result<(), ValidationError> {
    let chars = name.trim().chars().count();
    if chars == 0 {
        let mut err = ValidationError::new("display_name_blank");
        err.message = Some("Display name must not be blank".into());
        return Err(err);
    }
    if chars > MAX_DISPLAY_NAME_CHARS {
        let mut err = ValidationError::new("display_name_length");
        err.message = Some(
            format!(
                "Display name must be at most {MAX_DISPLAY_NAME_CHARS} characters (got {chars})"
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Validates that a playlist entry is either a bare YouTube id or a YouTube URL.
pub fn validate_video_reference(reference: &str) -> Result<(), ValidationError> {
    if resolve_video_reference(reference).is_none() {
        let mut err = ValidationError::new("video_reference_format");
        err.message = Some(format!("`{reference}` is neither a video id nor a video URL").into());
        return Err(err);
    }
    Ok(())
}
