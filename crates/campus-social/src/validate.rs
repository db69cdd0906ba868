//! Input checks shared by the HTTP handlers and the chat gateway.

use campus_types::models::{
    CHAT_MAX_LEN, COMMENT_MAX_LEN, PASSWORD_MIN_LEN, POST_CONTENT_MAX_LEN, POST_TITLE_MAX_LEN,
    STATUS_MAX_LEN, is_valid_user_id, normalize_user_id,
};

use crate::SocialError;

/// Normalize and validate a new user identity.
pub fn new_user_id(raw: &str) -> Result<String, SocialError> {
    let id = normalize_user_id(raw);
    if !is_valid_user_id(&id) {
        return Err(SocialError::InvalidInput(
            "User ID must be 3-30 characters of letters, digits or underscores",
        ));
    }
    Ok(id)
}

pub fn password(raw: &str) -> Result<(), SocialError> {
    if raw.chars().count() < PASSWORD_MIN_LEN {
        return Err(SocialError::InvalidInput("Password must be at least 6 characters"));
    }
    Ok(())
}

pub fn status(raw: &str) -> Result<String, SocialError> {
    let status = raw.trim();
    if status.is_empty() {
        return Err(SocialError::InvalidInput("Status cannot be empty"));
    }
    if raw.chars().count() > STATUS_MAX_LEN {
        return Err(SocialError::InvalidInput("Status must be 150 characters or less"));
    }
    Ok(status.to_string())
}

pub fn post_title(raw: &str) -> Result<String, SocialError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(SocialError::InvalidInput("Title is required"));
    }
    if title.chars().count() > POST_TITLE_MAX_LEN {
        return Err(SocialError::InvalidInput("Title must be 100 characters or less"));
    }
    Ok(title.to_string())
}

pub fn post_content(raw: &str) -> Result<String, SocialError> {
    let content = raw.trim();
    if content.chars().count() > POST_CONTENT_MAX_LEN {
        return Err(SocialError::InvalidInput("Content must be 5000 characters or less"));
    }
    Ok(content.to_string())
}

pub fn comment(raw: &str) -> Result<String, SocialError> {
    if raw.trim().is_empty() {
        return Err(SocialError::InvalidInput("Comment content is required"));
    }
    if raw.chars().count() > COMMENT_MAX_LEN {
        return Err(SocialError::InvalidInput("Comment must be 1000 characters or less"));
    }
    Ok(raw.to_string())
}

pub fn chat_content(raw: &str) -> Result<(), SocialError> {
    if raw.trim().is_empty() {
        return Err(SocialError::InvalidInput("Message content is required"));
    }
    if raw.chars().count() > CHAT_MAX_LEN {
        return Err(SocialError::InvalidInput("Message must be 2000 characters or less"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_ids_are_case_folded() {
        assert_eq!(new_user_id("Amy_B").unwrap(), "amy_b");
        assert!(new_user_id("a!").is_err());
    }

    #[test]
    fn status_is_trimmed_and_bounded() {
        assert_eq!(status("  studying  ").unwrap(), "studying");
        assert!(status("   ").is_err());
        assert!(status(&"x".repeat(151)).is_err());
        assert!(status(&"x".repeat(150)).is_ok());
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(post_title(" ").is_err());
        assert!(comment("").is_err());
        assert!(chat_content(" \n").is_err());
        assert!(chat_content(&"x".repeat(2001)).is_err());
        assert!(password("12345").is_err());
    }
}
