//! Text-field normalisation shared by the services.
//!
//! Lengths are counted in characters, not bytes; names and addresses are
//! mostly Hangul.

/// Trim an optional field. Blank input becomes `None`.
///
/// # Errors
///
/// Returns a message naming `field` when the trimmed value is longer than
/// `max` characters.
pub fn optional(value: Option<&str>, field: &str, max: usize) -> Result<Option<String>, String> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => {
            check_len(v, field, max)?;
            Ok(Some(v.to_string()))
        }
    }
}

/// Trim a required field.
///
/// # Errors
///
/// Returns a message naming `field` when the trimmed value is empty or longer
/// than `max` characters.
pub fn required(value: &str, field: &str, max: usize) -> Result<String, String> {
    let v = value.trim();
    if v.is_empty() {
        return Err(format!("{field} is required"));
    }
    check_len(v, field, max)?;
    Ok(v.to_string())
}

/// Trim a patched field, keeping blank input as `Some("")` so the
/// repository clears the column.
///
/// # Errors
///
/// Returns a message naming `field` when the trimmed value is longer than
/// `max` characters.
pub fn patch(value: Option<&str>, field: &str, max: usize) -> Result<Option<String>, String> {
    value
        .map(|v| {
            let v = v.trim();
            check_len(v, field, max).map(|()| v.to_string())
        })
        .transpose()
}

fn check_len(value: &str, field: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("{field} must be at most {max} characters"));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_blank_is_none() {
        assert_eq!(optional(Some("   "), "phone", 30).unwrap(), None);
        assert_eq!(optional(None, "phone", 30).unwrap(), None);
        assert_eq!(
            optional(Some(" 010-1234-5678 "), "phone", 30).unwrap(),
            Some("010-1234-5678".to_string())
        );
    }

    #[test]
    fn test_length_counts_characters() {
        // 3 Hangul syllables are 9 bytes.
        assert!(required("김도예", "label", 3).is_ok());
        assert_eq!(
            required("김도예가", "label", 3).unwrap_err(),
            "label must be at most 3 characters"
        );
    }

    #[test]
    fn test_required_rejects_blank() {
        assert_eq!(required("  ", "label", 50).unwrap_err(), "label is required");
    }

    #[test]
    fn test_patch_keeps_blank_for_clearing() {
        assert_eq!(patch(Some("  "), "phone", 30).unwrap(), Some(String::new()));
        assert_eq!(patch(None, "phone", 30).unwrap(), None);
    }
}
