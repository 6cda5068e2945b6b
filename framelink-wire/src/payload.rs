//! Schema-driven dynamic payloads.
//!
//! A JSON definition file maps message names to a type code and an ordered
//! field list, each field typed `string`, `int` or `float`:
//!
//! ```json
//! {
//!     "chat_message": {
//!         "type": 0,
//!         "fields": { "username": "string", "message": "string" }
//!     }
//! }
//! ```
//!
//! Each definition is compiled once, at load time, into a flat vector of
//! field descriptors that the encode and decode paths iterate per message.
//! The on-the-wire layout is identical to a hand-written composite: fields
//! concatenated in declared order, no tagging.

use crate::buffer::ByteBuf;
use crate::codec::{self, WireEncode};
use crate::envelope::Envelope;
use crate::error::WireError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Kind of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
}

impl FieldKind {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::Str),
            "int" => Some(Self::Int),
            "float" => Some(Self::Float),
            _ => None,
        }
    }

    fn type_name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "int",
            Self::Float => "float",
        }
    }

    fn default_value(self) -> FieldValue {
        match self {
            Self::Str => FieldValue::Str(String::new()),
            Self::Int => FieldValue::Int(0),
            Self::Float => FieldValue::Float(0.0),
        }
    }
}

/// One positional field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i32),
    Float(f32),
}

impl FieldValue {
    fn kind(&self) -> FieldKind {
        match self {
            Self::Str(_) => FieldKind::Str,
            Self::Int(_) => FieldKind::Int,
            Self::Float(_) => FieldKind::Float,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

/// A compiled message definition: type code plus the field schedule.
#[derive(Debug)]
pub struct Schema {
    name: String,
    kind: i16,
    fields: Vec<(String, FieldKind)>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The envelope type code this schema is registered under.
    pub fn kind(&self) -> i16 {
        self.kind
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Position of a named field, if present.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(field, _)| field == name)
    }

    fn compile(name: &str, definition: &serde_json::Value) -> Result<Self, WireError> {
        let kind = definition
            .get("type")
            .and_then(|v| v.as_i64())
            .filter(|v| i16::try_from(*v).is_ok())
            .ok_or_else(|| WireError::InvalidSchema(format!("{name}: missing or bad type code")))?
            as i16;

        let raw_fields = definition
            .get("fields")
            .and_then(|v| v.as_object())
            .ok_or_else(|| WireError::InvalidSchema(format!("{name}: missing field map")))?;

        let mut fields = Vec::with_capacity(raw_fields.len());
        for (field, value) in raw_fields {
            let kind_name = value
                .as_str()
                .ok_or_else(|| WireError::InvalidSchema(format!("{name}.{field}: non-string kind")))?;
            let kind = FieldKind::parse(kind_name).ok_or_else(|| {
                WireError::InvalidSchema(format!("{name}.{field}: unknown kind {kind_name}"))
            })?;
            fields.push((field.clone(), kind));
        }

        Ok(Self {
            name: name.to_owned(),
            kind,
            fields,
        })
    }

    fn encode_fields(&self, values: &[FieldValue], buf: &mut ByteBuf) {
        debug_assert_eq!(values.len(), self.fields.len());
        for value in values {
            match value {
                FieldValue::Str(text) => codec::put_str(buf, text),
                FieldValue::Int(number) => codec::put_i32(buf, *number),
                FieldValue::Float(number) => codec::put_f32(buf, *number),
            }
        }
    }

    /// Decodes a payload of this schema starting at `offset`.
    pub fn decode(
        schema: &Arc<Schema>,
        data: &[u8],
        offset: &mut usize,
    ) -> Result<DynamicPayload, WireError> {
        let mut values = Vec::with_capacity(schema.fields.len());
        for (_, kind) in &schema.fields {
            let value = match kind {
                FieldKind::Str => FieldValue::Str(codec::get_str(data, offset)?),
                FieldKind::Int => FieldValue::Int(codec::get_i32(data, offset)?),
                FieldKind::Float => FieldValue::Float(codec::get_f32(data, offset)?),
            };
            values.push(value);
        }
        Ok(DynamicPayload {
            schema: Arc::clone(schema),
            values,
        })
    }
}

/// A message instance stamped with its compiled schema.
///
/// Fields are created at their kind's default value and assigned by
/// position; assignment is kind-checked against the schema so the encode
/// path is total.
#[derive(Debug, Clone)]
pub struct DynamicPayload {
    schema: Arc<Schema>,
    values: Vec<FieldValue>,
}

impl DynamicPayload {
    fn new(schema: Arc<Schema>) -> Self {
        let values = schema.fields.iter().map(|(_, kind)| kind.default_value()).collect();
        Self { schema, values }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Assigns the field at `index`, checking its kind.
    pub fn set(&mut self, index: usize, value: impl Into<FieldValue>) -> Result<(), WireError> {
        let value = value.into();
        let (_, expected) = self
            .schema
            .fields
            .get(index)
            .ok_or(WireError::FieldKind {
                index,
                expected: "no such field",
            })?;
        if value.kind() != *expected {
            return Err(WireError::FieldKind {
                index,
                expected: expected.type_name(),
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Assigns every field in declared order.
    pub fn fill<I>(&mut self, values: I) -> Result<(), WireError>
    where
        I: IntoIterator,
        I::Item: Into<FieldValue>,
    {
        for (index, value) in values.into_iter().enumerate() {
            self.set(index, value)?;
        }
        Ok(())
    }

    pub fn get(&self, index: usize) -> Option<&FieldValue> {
        self.values.get(index)
    }

    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.values.get(index).and_then(FieldValue::as_str)
    }

    pub fn int_at(&self, index: usize) -> Option<i32> {
        self.values.get(index).and_then(FieldValue::as_int)
    }

    pub fn float_at(&self, index: usize) -> Option<f32> {
        self.values.get(index).and_then(FieldValue::as_float)
    }
}

impl WireEncode for DynamicPayload {
    fn encode(&self, buf: &mut ByteBuf) {
        self.schema.encode_fields(&self.values, buf);
    }
}

/// Registry of compiled message definitions, keyed by name and type code.
#[derive(Debug, Default)]
pub struct PayloadFactory {
    by_name: HashMap<String, Arc<Schema>>,
    by_kind: HashMap<i16, Arc<Schema>>,
}

impl PayloadFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and compiles a JSON definition document.
    pub fn load_definitions(&mut self, json: &str) -> Result<(), WireError> {
        let document: serde_json::Value = serde_json::from_str(json)?;
        let entries = document
            .as_object()
            .ok_or_else(|| WireError::InvalidSchema("top level must be an object".into()))?;

        for (name, definition) in entries {
            let schema = Arc::new(Schema::compile(name, definition)?);
            self.by_kind.insert(schema.kind(), Arc::clone(&schema));
            self.by_name.insert(name.clone(), schema);
        }
        Ok(())
    }

    /// Loads definitions from a JSON file.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), WireError> {
        let json = std::fs::read_to_string(path)?;
        self.load_definitions(&json)
    }

    /// Creates a message of the named definition with defaulted fields,
    /// already stamped with its envelope type code.
    pub fn create(&self, name: &str) -> Result<Envelope<DynamicPayload>, WireError> {
        let schema = self
            .by_name
            .get(name)
            .ok_or_else(|| WireError::UnknownMessage(name.to_owned()))?;
        Ok(Envelope::new(schema.kind(), DynamicPayload::new(Arc::clone(schema))))
    }

    /// Decodes a full frame (envelope header included), resolving the schema
    /// by the frame's type code.
    pub fn open(&self, data: &[u8]) -> Result<(i16, DynamicPayload), WireError> {
        let mut offset = 0;
        let kind = codec::get_i16(data, &mut offset)?;
        let schema = self
            .by_kind
            .get(&kind)
            .ok_or_else(|| WireError::UnknownMessage(format!("type {kind}")))?;
        let payload = Schema::decode(schema, data, &mut offset)?;
        Ok((kind, payload))
    }

    pub fn schema(&self, name: &str) -> Option<&Arc<Schema>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFINITIONS: &str = r#"{
        "chat_message": {
            "type": 0,
            "fields": { "username": "string", "message": "string" }
        },
        "telemetry": {
            "type": 9,
            "fields": { "sensor": "string", "reading": "float", "sequence": "int" }
        }
    }"#;

    fn factory() -> PayloadFactory {
        let mut factory = PayloadFactory::new();
        factory.load_definitions(DEFINITIONS).unwrap();
        factory
    }

    #[test]
    fn test_compile_definitions() {
        let factory = factory();
        assert_eq!(factory.len(), 2);

        let schema = factory.schema("telemetry").unwrap();
        assert_eq!(schema.kind(), 9);
        assert_eq!(schema.field_count(), 3);
        assert_eq!(schema.field_index("reading"), Some(1));
    }

    #[test]
    fn test_roundtrip() {
        let factory = factory();
        let mut message = factory.create("chat_message").unwrap();
        message.payload.fill(["A", "hi"]).unwrap();

        let bytes = message.to_bytes();
        let (kind, payload) = factory.open(&bytes).unwrap();
        assert_eq!(kind, 0);
        assert_eq!(payload.str_at(0), Some("A"));
        assert_eq!(payload.str_at(1), Some("hi"));
    }

    #[test]
    fn test_layout_matches_handwritten_composite() {
        struct ChatMessage {
            username: String,
            message: String,
        }

        impl WireEncode for ChatMessage {
            fn encode(&self, buf: &mut ByteBuf) {
                self.username.encode(buf);
                self.message.encode(buf);
            }
        }

        let handwritten = Envelope::new(
            0,
            ChatMessage {
                username: "A".into(),
                message: "hi".into(),
            },
        )
        .to_bytes();

        let factory = factory();
        let mut dynamic = factory.create("chat_message").unwrap();
        dynamic.payload.fill(["A", "hi"]).unwrap();

        assert_eq!(dynamic.to_bytes().as_slice(), handwritten.as_slice());
    }

    #[test]
    fn test_mixed_kinds() {
        let factory = factory();
        let mut message = factory.create("telemetry").unwrap();
        message.payload.set(0, "temp-1").unwrap();
        message.payload.set(1, 21.5f32).unwrap();
        message.payload.set(2, 17).unwrap();

        let bytes = message.to_bytes();
        let (kind, payload) = factory.open(&bytes).unwrap();
        assert_eq!(kind, 9);
        assert_eq!(payload.str_at(0), Some("temp-1"));
        assert_eq!(payload.float_at(1), Some(21.5));
        assert_eq!(payload.int_at(2), Some(17));
    }

    #[test]
    fn test_kind_checked_assignment() {
        let factory = factory();
        let mut message = factory.create("telemetry").unwrap();
        assert!(matches!(
            message.payload.set(0, 3),
            Err(WireError::FieldKind { index: 0, .. })
        ));
        assert!(message.payload.set(99, 3).is_err());
    }

    #[test]
    fn test_unknown_message() {
        let factory = factory();
        assert!(matches!(
            factory.create("nope"),
            Err(WireError::UnknownMessage(_))
        ));

        // An envelope whose type code has no definition.
        let bytes = Envelope::new(42, "x".to_string()).to_bytes();
        assert!(matches!(
            factory.open(&bytes),
            Err(WireError::UnknownMessage(_))
        ));
    }

    #[test]
    fn test_rejects_bad_definitions() {
        let mut factory = PayloadFactory::new();
        assert!(factory
            .load_definitions(r#"{"m": {"fields": {"a": "string"}}}"#)
            .is_err());
        assert!(factory
            .load_definitions(r#"{"m": {"type": 1, "fields": {"a": "bytes"}}}"#)
            .is_err());
        assert!(factory
            .load_definitions(r#"{"m": {"type": 70000, "fields": {}}}"#)
            .is_err());
    }

    #[test]
    fn test_decode_truncated_payload() {
        let factory = factory();
        let mut message = factory.create("chat_message").unwrap();
        message.payload.fill(["A", "hi"]).unwrap();
        let bytes = message.to_bytes();

        assert!(matches!(
            factory.open(&bytes[..bytes.len() - 1]),
            Err(WireError::Truncated)
        ));
    }
}
