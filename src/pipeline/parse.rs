//! Reply parsing: raw model text → [`ContactRecord`].
//!
//! Models are told to answer with bare JSON but regularly wrap it in a
//! ` ```json ... ``` ` fence anyway. The fence is stripped, the body decoded
//! as a JSON object, and the object mapped onto the contact schema.
//!
//! Decode failures are returned, never defaulted here: the retry policy
//! decides whether to ask again or fall back to the sentinel record.

use crate::error::ExtractionError;
use crate::record::ContactRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

// Opening fence plus optional language tag (```json, ```JSON, ```js ...).
static RE_OPEN_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+-]*[ \t]*(?:\r?\n)?").unwrap());

static RE_CLOSE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*```$").unwrap());

/// Trim the reply and remove a surrounding code fence, if any.
///
/// An unterminated fence is tolerated: only the opening marker is removed.
pub fn strip_fences(raw: &str) -> &str {
    let text = raw.trim();
    if !text.starts_with("```") {
        return text;
    }
    let open_len = RE_OPEN_FENCE.find(text).map_or(3, |m| m.end());
    let body = &text[open_len..];
    let close_start = RE_CLOSE_FENCE.find(body).map_or(body.len(), |m| m.start());
    body[..close_start].trim()
}

/// Decode a model reply into a contact record.
pub fn parse_reply(raw: &str) -> Result<ContactRecord, ExtractionError> {
    let body = strip_fences(raw);
    if body.is_empty() {
        return Err(ExtractionError::EmptyReply);
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ExtractionError::MalformedJson {
        detail: e.to_string(),
    })?;

    match value {
        Value::Object(object) => Ok(ContactRecord::from_json_object(object)),
        other => Err(ExtractionError::NotAnObject {
            found: json_kind(&other).to_string(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
