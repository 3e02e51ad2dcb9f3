//! Record identifiers.
//!
//! Every persisted record is addressed by an [`Id`] stored under the reserved `_id` key.
//! Three shapes are supported: an opaque store-native [`ObjectId`], an application assigned
//! integer (sequential or random allocation), and a numeric string.

use bson::{Bson, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use std::fmt;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// The identifier of a persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Id {
    /// Store-generated identifier, never assigned by the application.
    Object(ObjectId),
    /// Integer identifier produced by the sequential or random allocator.
    Int(i64),
    /// Identifier given as a string of decimal digits.
    Numeric(String),
}

impl Id {
    /// Parses an identifier from its string form.
    ///
    /// A string of decimal digits parses as [`Id::Numeric`], whatever its length, and
    /// any other 24 hex characters as an [`ObjectId`]. Anything else is rejected.
    pub fn parse(value: &str) -> DocumentStoreResult<Self> {
        if is_numeric(value) {
            return Ok(Id::Numeric(value.to_string()));
        }

        if value.len() == 24 {
            if let Ok(oid) = ObjectId::parse_str(value) {
                return Ok(Id::Object(oid));
            }
        }

        Err(DocumentStoreError::InvalidDocument(format!("'{value}' is not a valid id")))
    }

    /// Returns the integer value of this id, if it has one.
    ///
    /// Numeric strings are parsed, so `Id::Numeric("42")` yields `Some(42)`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Id::Int(value) => Some(*value),
            Id::Numeric(value) => value.parse().ok(),
            Id::Object(_) => None,
        }
    }

    /// Converts the id into the BSON value stored under `_id`.
    pub fn to_bson(&self) -> Bson {
        match self {
            Id::Object(oid) => Bson::ObjectId(*oid),
            Id::Int(value) => Bson::Int64(*value),
            Id::Numeric(value) => Bson::String(value.clone()),
        }
    }
}

fn is_numeric(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Object(oid) => write!(f, "{}", oid.to_hex()),
            Id::Int(value) => write!(f, "{value}"),
            Id::Numeric(value) => f.write_str(value),
        }
    }
}

impl From<ObjectId> for Id {
    fn from(oid: ObjectId) -> Self {
        Id::Object(oid)
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Int(value)
    }
}

impl From<Id> for Bson {
    fn from(id: Id) -> Self {
        id.to_bson()
    }
}

impl TryFrom<&Bson> for Id {
    type Error = DocumentStoreError;

    fn try_from(value: &Bson) -> Result<Self, Self::Error> {
        match value {
            Bson::ObjectId(oid) => Ok(Id::Object(*oid)),
            Bson::Int32(value) => Ok(Id::Int(*value as i64)),
            Bson::Int64(value) => Ok(Id::Int(*value)),
            Bson::Double(value) if value.fract() == 0.0 => Ok(Id::Int(*value as i64)),
            Bson::String(value) if is_numeric(value) => Ok(Id::Numeric(value.clone())),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "unsupported _id value: {other}"
            ))),
        }
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Id::Object(oid) => oid.serialize(serializer),
            Id::Int(value) => serializer.serialize_i64(*value),
            Id::Numeric(value) => serializer.serialize_str(value),
        }
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Bson::deserialize(deserializer)?;
        Id::try_from(&value).map_err(D::Error::custom)
    }
}
