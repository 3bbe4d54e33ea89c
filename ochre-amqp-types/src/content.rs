//! Content attached to content-bearing methods

use std::collections::BTreeMap;

use crate::Payload;

/// A value in a [`FieldTable`].
///
/// Only the value kinds the client actually produces or inspects are
/// represented; the table grammar of the specification is wider.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Boolean field.
    Bool(bool),
    /// Signed 32 bit integer field.
    LongInt(i32),
    /// Signed 64 bit integer field.
    LongLongInt(i64),
    /// UTF-8 string field.
    LongString(String),
    /// POSIX timestamp in seconds.
    Timestamp(u64),
    /// Nested table.
    Table(FieldTable),
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::LongInt(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::LongLongInt(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::LongString(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::LongString(value)
    }
}

/// Implementation specific arguments attached to methods and properties.
pub type FieldTable = BTreeMap<String, FieldValue>;

/// The standard properties of the `basic` content header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BasicProperties {
    /// MIME content type.
    pub content_type: Option<String>,
    /// MIME content encoding.
    pub content_encoding: Option<String>,
    /// Application headers.
    pub headers: Option<FieldTable>,
    /// 1 = non-persistent, 2 = persistent.
    pub delivery_mode: Option<u8>,
    /// Message priority, 0 to 9.
    pub priority: Option<u8>,
    /// Application correlation identifier.
    pub correlation_id: Option<String>,
    /// Address to reply to.
    pub reply_to: Option<String>,
    /// Message expiration.
    pub expiration: Option<String>,
    /// Application message identifier.
    pub message_id: Option<String>,
    /// Message timestamp.
    pub timestamp: Option<u64>,
    /// Message type name.
    pub message_type: Option<String>,
    /// Creating user id.
    pub user_id: Option<String>,
    /// Creating application id.
    pub app_id: Option<String>,
    /// Intra-cluster routing identifier.
    pub cluster_id: Option<String>,
}

/// The properties and payload attached to a content-bearing method.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Content {
    /// Content header properties.
    pub properties: BasicProperties,
    /// Message body.
    pub payload: Payload,
}

impl Content {
    /// Creates content with default properties.
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            properties: BasicProperties::default(),
            payload: payload.into(),
        }
    }

    /// Creates content with explicit properties.
    pub fn with_properties(properties: BasicProperties, payload: impl Into<Payload>) -> Self {
        Self {
            properties,
            payload: payload.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_convert_from_primitives() {
        let mut table = FieldTable::new();
        table.insert("publisher_confirms".into(), true.into());
        table.insert("version".into(), "0.1.0".into());
        table.insert("max".into(), FieldValue::LongInt(42));

        assert_eq!(table.get("publisher_confirms"), Some(&FieldValue::Bool(true)));
        assert_eq!(
            table.get("version"),
            Some(&FieldValue::LongString("0.1.0".into()))
        );
    }

    #[test]
    fn content_defaults_to_empty_properties() {
        let content = Content::new("payload".as_bytes().to_vec());
        assert_eq!(content.properties, BasicProperties::default());
        assert_eq!(&content.payload[..], b"payload");
    }
}
