//! Declarative copying of client JSON into store update documents.

use mongodb::bson::{self, Bson, Document};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    Verbatim,
    Float,
}

/// One allowed payload key and the document field it lands in.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub from: &'static str,
    pub to: &'static str,
    pub coerce: Coerce,
}

impl FieldRule {
    pub const fn verbatim(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            coerce: Coerce::Verbatim,
        }
    }

    pub const fn float(from: &'static str, to: &'static str) -> Self {
        Self {
            from,
            to,
            coerce: Coerce::Float,
        }
    }
}

/// Copy every allow-listed key that is present in `payload`. An explicit JSON
/// `null` counts as present and clears the field.
pub fn merge_present(payload: &Map<String, Value>, rules: &[FieldRule]) -> AppResult<Document> {
    let mut update = Document::new();
    for rule in rules {
        let Some(value) = payload.get(rule.from) else {
            continue;
        };
        let value = match rule.coerce {
            Coerce::Verbatim => bson::to_bson(value)?,
            Coerce::Float => Bson::Double(coerce_float(value).ok_or_else(|| {
                AppError::BadRequest(format!("Invalid value for {}", rule.from))
            })?),
        };
        update.insert(rule.to, value);
    }
    Ok(update)
}

/// Copy the whole payload except the listed keys.
pub fn copy_except(payload: &Map<String, Value>, excluded: &[&str]) -> AppResult<Document> {
    let mut update = Document::new();
    for (key, value) in payload {
        if excluded.contains(&key.as_str()) {
            continue;
        }
        update.insert(key.clone(), bson::to_bson(value)?);
    }
    Ok(update)
}

/// `<prefix>: a, b` naming every field flagged as absent.
pub fn missing_fields(prefix: &str, fields: &[(&str, bool)]) -> AppError {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();
    AppError::BadRequest(format!("{prefix}: {}", missing.join(", ")))
}

/// Accept a JSON number or a numeric string.
pub fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}
