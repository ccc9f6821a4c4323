//! Inbound frame and message-content rules.

use parlor_core::error::AppError;

/// Rejects frames above the configured size.
pub fn validate_frame(raw: &str, max_bytes: usize) -> Result<(), AppError> {
    if raw.len() > max_bytes {
        return Err(AppError::validation("Payload too large"));
    }
    Ok(())
}

/// Trims message content and truncates it to `max_chars` characters.
///
/// Returns `None` for content that is blank after trimming.
pub fn normalize_content(content: &str, max_chars: usize) -> Option<String> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_chars).collect())
}
