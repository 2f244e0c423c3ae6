//! Translation between [`Record`] and wire documents.
//!
//! The wire shape is
//! `{_id?, _rev?, name, category, available, gender, birthday}` with `gender`
//! as its upper-case name and `birthday` as a `YYYY-MM-DD` string.

use chrono::NaiveDate;
use serde_json::Value;

use crate::client::Document;
use crate::error::ValidationError;
use crate::types::{Gender, Record};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Stateless encoder/decoder for records.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordCodec;

impl RecordCodec {
    /// Encodes a record. `_id` and `_rev` are emitted only when set.
    pub fn encode(record: &Record) -> Document {
        let mut document = Document::new();
        if let Some(id) = record.id() {
            document.insert("_id".to_string(), Value::String(id.to_string()));
        }
        if let Some(rev) = record.revision() {
            document.insert("_rev".to_string(), Value::String(rev.to_string()));
        }
        document.insert("name".to_string(), Value::String(record.name.clone()));
        document.insert(
            "category".to_string(),
            record
                .category
                .as_ref()
                .map_or(Value::Null, |c| Value::String(c.clone())),
        );
        document.insert("available".to_string(), Value::Bool(record.available));
        document.insert(
            "gender".to_string(),
            Value::String(record.gender.as_str().to_string()),
        );
        document.insert(
            "birthday".to_string(),
            Value::String(record.birthday.format(DATE_FORMAT).to_string()),
        );
        document
    }

    /// Decodes a document into a new record.
    pub fn decode(document: &Document) -> Result<Record, ValidationError> {
        let mut record = Record::new(String::new());
        Self::decode_into(&mut record, document)?;
        Ok(record)
    }

    /// Decodes a document over an existing record.
    ///
    /// Data fields are replaced only when the whole document validates. An
    /// existing id is kept; `_rev` always replaces the revision when present.
    pub fn decode_into(record: &mut Record, document: &Document) -> Result<(), ValidationError> {
        let name = required(document, "name")?;
        let name = name
            .as_str()
            .ok_or_else(|| invalid_type("name", "string", name))?
            .to_string();

        let category = match required(document, "category")? {
            Value::Null => None,
            Value::String(category) => Some(category.clone()),
            other => return Err(invalid_type("category", "string or null", other)),
        };

        let available = required(document, "available")?;
        let available = available
            .as_bool()
            .ok_or_else(|| invalid_type("available", "boolean", available))?;

        let gender = required(document, "gender")?;
        let gender = gender
            .as_str()
            .ok_or_else(|| invalid_type("gender", "string", gender))?
            .parse::<Gender>()?;

        let birthday = required(document, "birthday")?;
        let birthday_str = birthday
            .as_str()
            .ok_or_else(|| invalid_type("birthday", "string", birthday))?;
        let birthday = NaiveDate::parse_from_str(birthday_str, DATE_FORMAT).map_err(|_| {
            ValidationError::InvalidDate {
                field: "birthday",
                value: birthday_str.to_string(),
            }
        })?;

        record.name = name;
        record.category = category;
        record.available = available;
        record.gender = gender;
        record.birthday = birthday;

        if record.id.is_none() {
            if let Some(id) = document.get("_id").and_then(Value::as_str) {
                record.id = Some(id.to_string());
            }
        }
        if let Some(rev) = document.get("_rev").and_then(Value::as_str) {
            record.revision = Some(rev.to_string());
        }

        Ok(())
    }
}

fn required<'a>(document: &'a Document, field: &'static str) -> Result<&'a Value, ValidationError> {
    document
        .get(field)
        .ok_or(ValidationError::MissingField { field })
}

fn invalid_type(field: &'static str, expected: &'static str, found: &Value) -> ValidationError {
    ValidationError::InvalidType {
        field,
        expected,
        found: json_type_name(found).to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
