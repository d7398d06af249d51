//! The contact schema produced for every business card.
//!
//! [`ContactRecord`] has a fixed shape: fifteen extracted string fields, the
//! `source_file` bookkeeping field, and an `extra` side map for any keys the
//! model volunteers beyond the schema. Nothing here is ever `null`; an absent
//! field is an empty string.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// The fifteen field names the model is asked to fill, in prompt order.
pub const CONTACT_FIELDS: [&str; 15] = [
    "name",
    "title",
    "company",
    "email",
    "phone",
    "website",
    "address",
    "linkedin",
    "twitter",
    "instagram",
    "facebook",
    "youtube",
    "tiktok",
    "other_socials",
    "notes",
];

/// Key of the filename column attached after extraction.
pub const SOURCE_FILE_KEY: &str = "source_file";

/// `notes` value of the sentinel record used when extraction permanently fails.
pub const EXTRACTION_FAILED_NOTE: &str = "Extraction failed or unreadable card";

/// One extracted business card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactRecord {
    pub name: String,
    pub title: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: String,
    pub linkedin: String,
    pub twitter: String,
    pub instagram: String,
    pub facebook: String,
    pub youtube: String,
    pub tiktok: String,
    pub other_socials: String,
    pub notes: String,
    /// Original upload filename. Never sent to the model.
    pub source_file: String,
    /// Keys the model returned outside the schema, in reply order.
    pub extra: Map<String, Value>,
}

impl ContactRecord {
    /// The canonical "unreadable card" record: every field empty except `notes`.
    pub fn extraction_failed() -> Self {
        Self {
            notes: EXTRACTION_FAILED_NOTE.to_string(),
            ..Self::default()
        }
    }

    /// Build a record from a decoded reply object.
    ///
    /// Schema fields are coerced to text (`null` → `""`), unknown keys move
    /// to [`ContactRecord::extra`] untouched. A `source_file` key in the reply
    /// is discarded: that column belongs to the aggregator.
    pub fn from_json_object(object: Map<String, Value>) -> Self {
        let mut record = Self::default();
        for (key, value) in object {
            if key == SOURCE_FILE_KEY {
                continue;
            }
            match record.field_mut(&key) {
                Some(slot) => *slot = value_to_text(&value),
                None => {
                    record.extra.insert(key, value);
                }
            }
        }
        record
    }

    /// Attach the originating filename.
    pub fn with_source_file(mut self, filename: impl Into<String>) -> Self {
        self.source_file = filename.into();
        self
    }

    /// True for the sentinel produced by [`ContactRecord::extraction_failed`].
    pub fn is_extraction_failed(&self) -> bool {
        self.notes == EXTRACTION_FAILED_NOTE
            && CONTACT_FIELDS[..14]
                .iter()
                .all(|f| self.field(f).is_some_and(str::is_empty))
            && self.extra.is_empty()
    }

    /// Look up one of the fifteen schema fields, or `source_file`, by name.
    pub fn field(&self, key: &str) -> Option<&str> {
        let value = match key {
            "name" => &self.name,
            "title" => &self.title,
            "company" => &self.company,
            "email" => &self.email,
            "phone" => &self.phone,
            "website" => &self.website,
            "address" => &self.address,
            "linkedin" => &self.linkedin,
            "twitter" => &self.twitter,
            "instagram" => &self.instagram,
            "facebook" => &self.facebook,
            "youtube" => &self.youtube,
            "tiktok" => &self.tiktok,
            "other_socials" => &self.other_socials,
            "notes" => &self.notes,
            SOURCE_FILE_KEY => &self.source_file,
            _ => return None,
        };
        Some(value)
    }

    fn field_mut(&mut self, key: &str) -> Option<&mut String> {
        let slot = match key {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "company" => &mut self.company,
            "email" => &mut self.email,
            "phone" => &mut self.phone,
            "website" => &mut self.website,
            "address" => &mut self.address,
            "linkedin" => &mut self.linkedin,
            "twitter" => &mut self.twitter,
            "instagram" => &mut self.instagram,
            "facebook" => &mut self.facebook,
            "youtube" => &mut self.youtube,
            "tiktok" => &mut self.tiktok,
            "other_socials" => &mut self.other_socials,
            "notes" => &mut self.notes,
            _ => return None,
        };
        Some(slot)
    }

    /// Flatten into an ordered row: schema fields, extras, then `source_file`.
    pub fn to_row(&self) -> Map<String, Value> {
        let mut row = Map::with_capacity(CONTACT_FIELDS.len() + 1 + self.extra.len());
        for key in CONTACT_FIELDS {
            let value = self.field(key).unwrap_or_default();
            row.insert(key.to_string(), Value::String(value.to_string()));
        }
        for (key, value) in &self.extra {
            row.insert(key.clone(), value.clone());
        }
        row.insert(
            SOURCE_FILE_KEY.to_string(),
            Value::String(self.source_file.clone()),
        );
        row
    }
}

impl Serialize for ContactRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_row().serialize(serializer)
    }
}

/// Render a reply value as cell text.
///
/// Strings pass through, `null` is empty, scalars use their JSON spelling,
/// string lists are comma-joined, anything else stays compact JSON.
pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(_) | Value::Number(_) => value.to_string(),
        Value::Array(items) if items.iter().all(|v| !v.is_array() && !v.is_object()) => items
            .iter()
            .map(value_to_text)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn sentinel_has_every_key_and_only_the_note() {
        let r = ContactRecord::extraction_failed();
        let row = r.to_row();
        assert_eq!(row.len(), 16);
        for key in CONTACT_FIELDS {
            let expected = if key == "notes" { EXTRACTION_FAILED_NOTE } else { "" };
            assert_eq!(row[key], json!(expected), "field {key}");
        }
        assert_eq!(row[SOURCE_FILE_KEY], json!(""));
        assert!(r.is_extraction_failed());
    }

    #[test]
    fn from_json_object_coerces_schema_fields() {
        let r = ContactRecord::from_json_object(object(json!({
            "name": "Ada Lovelace",
            "phone": 5551234,
            "email": null,
            "other_socials": ["mastodon: @ada", "", "bsky: ada.dev"]
        })));
        assert_eq!(r.name, "Ada Lovelace");
        assert_eq!(r.phone, "5551234");
        assert_eq!(r.email, "");
        assert_eq!(r.other_socials, "mastodon: @ada, bsky: ada.dev");
        assert!(r.extra.is_empty());
    }

    #[test]
    fn unknown_keys_go_to_extra_in_reply_order() {
        let r = ContactRecord::from_json_object(object(json!({
            "name": "Bob",
            "fax": "555-0000",
            "languages": ["en", "fr"]
        })));
        let keys: Vec<&str> = r.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, ["fax", "languages"]);
        assert_eq!(r.extra["languages"], json!(["en", "fr"]));
    }

    #[test]
    fn reply_source_file_is_ignored() {
        let r = ContactRecord::from_json_object(object(json!({
            "name": "Eve",
            "source_file": "spoofed.png"
        })))
        .with_source_file("real.png");
        assert_eq!(r.source_file, "real.png");
        assert!(!r.extra.contains_key(SOURCE_FILE_KEY));
    }

    #[test]
    fn row_order_is_schema_then_extra_then_source_file() {
        let r = ContactRecord::from_json_object(object(json!({"name": "A", "fax": "1"})))
            .with_source_file("a.png");
        let keys: Vec<String> = r.to_row().keys().cloned().collect();
        assert_eq!(&keys[..15], CONTACT_FIELDS.map(String::from).as_slice());
        assert_eq!(keys[15], "fax");
        assert_eq!(keys[16], SOURCE_FILE_KEY);
    }

    #[test]
    fn real_record_is_not_mistaken_for_sentinel() {
        let mut r = ContactRecord::extraction_failed();
        r.company = "Acme".into();
        assert!(!r.is_extraction_failed());
    }

    #[test]
    fn serialises_as_flat_object() {
        let r = ContactRecord {
            name: "Zoe".into(),
            ..ContactRecord::default()
        }
        .with_source_file("z.jpg");
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["name"], "Zoe");
        assert_eq!(v["source_file"], "z.jpg");
        assert_eq!(v.as_object().unwrap().len(), 16);
    }

    #[test]
    fn nested_objects_stay_json() {
        assert_eq!(value_to_text(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(value_to_text(&json!(true)), "true");
    }
}
