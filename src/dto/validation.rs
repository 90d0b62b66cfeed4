//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted display name, counted in characters after trimming.
pub const MAX_NAME_CHARS: usize = 64;

/// Validates that a display name is non-empty and at most [`MAX_NAME_CHARS`] once trimmed.
pub fn validate_participant_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_empty");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }

    let length = trimmed.chars().count();
    if length > MAX_NAME_CHARS {
        let mut err = ValidationError::new("name_length");
        err.message = Some(
            format!("Name must be at most {MAX_NAME_CHARS} characters (got {length})").into(),
        );
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_regular_names() {
        assert!(validate_participant_name("Ada").is_ok());
        assert!(validate_participant_name("  Grace Hopper ").is_ok());
        assert!(validate_participant_name(&"é".repeat(MAX_NAME_CHARS)).is_ok());
    }

    #[test]
    fn rejects_blank_names() {
        assert!(validate_participant_name("").is_err());
        assert!(validate_participant_name("   \t").is_err());
    }

    #[test]
    fn rejects_long_names() {
        let err = validate_participant_name(&"a".repeat(MAX_NAME_CHARS + 1)).unwrap_err();
        assert_eq!(err.code, "name_length");
    }
}
