//! Common validation utilities.

use validator::ValidationError;

/// Maximum length of a vision-model answer accepted for analysis (characters).
pub const MAX_RESPONSE_TEXT_LENGTH: usize = 20_000;

/// Maximum length of a prompt forwarded to the vision model (characters).
pub const MAX_PROMPT_LENGTH: usize = 2_000;

/// Validates that a text field contains something other than whitespace.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a prompt for the vision model.
pub fn validate_prompt(prompt: &str) -> Result<(), ValidationError> {
    validate_not_blank(prompt)?;
    if prompt.chars().count() > MAX_PROMPT_LENGTH {
        let mut err = ValidationError::new("prompt_length");
        err.message = Some(format!("Prompt must be at most {} characters", MAX_PROMPT_LENGTH).into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_not_blank() {
        assert!(validate_not_blank("a car is close").is_ok());
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank("   \n\t").is_err());
    }

    #[test]
    fn test_validate_not_blank_error_message() {
        let err = validate_not_blank(" ").unwrap_err();
        assert_eq!(err.code, "blank");
        assert_eq!(err.message.unwrap(), "Value must not be blank");
    }

    #[test]
    fn test_validate_prompt_length() {
        assert!(validate_prompt("Describe the scene").is_ok());
        let long = "x".repeat(MAX_PROMPT_LENGTH + 1);
        let err = validate_prompt(&long).unwrap_err();
        assert_eq!(err.code, "prompt_length");
    }
}
