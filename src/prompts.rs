//! Prompts sent with every business-card extraction request.
//!
//! The field names listed in the user instruction are part of the wire
//! contract: the reply parser maps exactly these keys onto
//! [`crate::record::ContactRecord`]. The instruction text is therefore built
//! from [`crate::record::CONTACT_FIELDS`] instead of being spelled out by hand,
//! so renaming a field cannot leave the prompt behind.

use crate::record::CONTACT_FIELDS;
use once_cell::sync::Lazy;

/// Default system instruction establishing the extraction persona.
///
/// Used when `ExtractionConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You extract structured contact and social media information from business cards.";

const USER_INSTRUCTION_HEAD: &str =
    "Extract ALL information from this business card and return VALID JSON ONLY.\n\nFields:\n";

const USER_INSTRUCTION_TAIL: &str = "\nIf missing, return empty string. No explanations.";

/// User instruction enumerating the fifteen extracted fields.
pub static USER_INSTRUCTION: Lazy<String> = Lazy::new(|| {
    let mut text = String::from(USER_INSTRUCTION_HEAD);
    for field in CONTACT_FIELDS {
        text.push_str(field);
        text.push('\n');
    }
    text.push_str(USER_INSTRUCTION_TAIL);
    text
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_instruction_lists_every_field_on_its_own_line() {
        let lines: Vec<&str> = USER_INSTRUCTION.lines().collect();
        for field in CONTACT_FIELDS {
            assert!(lines.contains(&field), "missing field line: {field}");
        }
    }

    #[test]
    fn user_instruction_keeps_field_order() {
        let positions: Vec<usize> = CONTACT_FIELDS
            .iter()
            .map(|f| USER_INSTRUCTION.find(&format!("\n{f}\n")).expect("field present"))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn user_instruction_states_empty_string_convention() {
        assert!(USER_INSTRUCTION.starts_with("Extract ALL information"));
        assert!(USER_INSTRUCTION.ends_with("If missing, return empty string. No explanations."));
    }

    #[test]
    fn source_file_is_never_requested() {
        assert!(!USER_INSTRUCTION.contains("source_file"));
    }
}
