//! Field filtering and JSON serialization of records.
//!
//! Only the fields a record type registers through [`Record::field_names`] are ever
//! persisted. With `#[derive(Record)]` these are exactly the struct's `pub` fields, so
//! private state never reaches the store whatever its value.
//!
//! [`to_json`] renders the same field set plus the record id as JSON with
//! lexicographically sorted keys. Ids are always rendered as strings: values under
//! `_id`/`$id` keys and any nested [`ObjectId`](bson::oid::ObjectId) reference are
//! converted before encoding.

use bson::{Bson, Document};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{error::DocumentStoreResult, record::Record};

/// Builds the persisted field map of `record`.
///
/// Keys not registered in [`Record::field_names`] are dropped, as is any `_id`: ids
/// are managed by the record layer, not stored as a field.
pub fn to_document<R: Record>(record: &R) -> DocumentStoreResult<Document> {
    let allowed = R::field_names();

    Ok(record
        .to_document()?
        .into_iter()
        .filter(|(key, _)| key != "_id" && allowed.contains(&key.as_str()))
        .collect())
}

/// Builds the JSON value of `record`: persisted fields plus `_id`, ids stringified,
/// keys sorted.
pub fn to_json_value<R: Record>(record: &R) -> DocumentStoreResult<Value> {
    let mut document = to_document(record)?;

    if let Some(id) = record.id() {
        document.insert("_id", id.to_bson());
    }

    bson_to_json(Bson::Document(document))
}

/// Encodes `record` as sorted JSON.
///
/// Returns `None` instead of an error when encoding fails.
pub fn to_json<R: Record>(record: &R) -> Option<String> {
    let encoded = to_json_value(record).and_then(|value| Ok(serde_json::to_string(&value)?));

    match encoded {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "failed to encode record as JSON");
            None
        }
    }
}

/// Encodes already prepared JSON values as a JSON array, `None` on failure.
pub fn to_json_array(values: Vec<Value>) -> Option<String> {
    match serde_json::to_string(&Value::Array(values)) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "failed to encode records as JSON");
            None
        }
    }
}

/// Converts BSON to JSON with ids stringified and object keys sorted.
pub fn bson_to_json(value: Bson) -> DocumentStoreResult<Value> {
    Ok(sort_keys(serde_json::to_value(stringify_ids(value))?))
}

fn stringify_ids(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Document(document) => Bson::Document(
            document
                .into_iter()
                .map(|(key, value)| {
                    let value = if key == "_id" || key == "$id" {
                        id_to_string(value)
                    } else {
                        stringify_ids(value)
                    };
                    (key, value)
                })
                .collect(),
        ),
        Bson::Array(items) => Bson::Array(items.into_iter().map(stringify_ids).collect()),
        other => other,
    }
}

fn id_to_string(value: Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::Int32(value) => Bson::String(value.to_string()),
        Bson::Int64(value) => Bson::String(value.to_string()),
        Bson::Double(value) if value.fract() == 0.0 => Bson::String((value as i64).to_string()),
        Bson::Double(value) => Bson::String(value.to_string()),
        Bson::String(value) => Bson::String(value),
        // Embedded documents under `_id` (compound keys) keep their shape.
        nested @ (Bson::Document(_) | Bson::Array(_)) => stringify_ids(nested),
        other => Bson::String(other.to_string()),
    }
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries = map.into_iter().collect::<Vec<_>>();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));

            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect::<Map<_, _>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    #[test]
    fn ids_become_strings_at_any_depth() {
        let oid = ObjectId::new();
        let owner = ObjectId::new();

        let json = bson_to_json(Bson::Document(doc! {
            "_id": 42_i64,
            "owner": owner,
            "links": [ { "$ref": "people", "$id": 7_i32 }, { "_id": oid } ],
        }))
        .unwrap();

        assert_eq!(json["_id"], Value::String("42".into()));
        assert_eq!(json["owner"], Value::String(owner.to_hex()));
        assert_eq!(json["links"][0]["$id"], Value::String("7".into()));
        assert_eq!(json["links"][1]["_id"], Value::String(oid.to_hex()));
    }

    #[test]
    fn object_keys_are_sorted() {
        let json = bson_to_json(Bson::Document(doc! {
            "zeta": 1,
            "alpha": { "y": 1, "b": 2 },
            "mid": 3,
        }))
        .unwrap();
        let encoded = serde_json::to_string(&json).unwrap();

        assert_eq!(encoded, r#"{"alpha":{"b":2,"y":1},"mid":3,"zeta":1}"#);
    }
}
