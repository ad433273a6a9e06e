use chrono::{DateTime, Utc};
use serde::ser::{self, Serialize};
use super::{CodecError, Fields, Value};

/// Newtype name marking a string as a Firestore timestamp. Only [`ValueSerializer`]
/// looks at it; serde_json drops newtype names, so API bodies still carry plain strings.
pub const TIMESTAMP_TOKEN: &str = "$__firestore_timestamp";

impl ser::Error for CodecError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        CodecError::Shape(msg.to_string())
    }
}

/// Serializes a record straight into a [`Value`] tree.
pub struct ValueSerializer;

impl ser::Serializer for ValueSerializer {
    type Ok = Value;
    type Error = CodecError;

    type SerializeSeq = SerializeVec;
    type SerializeTuple = SerializeVec;
    type SerializeTupleStruct = SerializeVec;
    type SerializeTupleVariant = SerializeTupleVariant;
    type SerializeMap = SerializeMap;
    type SerializeStruct = SerializeMap;
    type SerializeStructVariant = SerializeStructVariant;

    fn serialize_bool(self, v: bool) -> Result<Value, CodecError> {
        Ok(Value::Boolean(v))
    }

    fn serialize_i8(self, v: i8) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i16(self, v: i16) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i32(self, v: i32) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_i64(self, v: i64) -> Result<Value, CodecError> {
        Ok(Value::Integer(v))
    }

    fn serialize_u8(self, v: u8) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u16(self, v: u16) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u32(self, v: u32) -> Result<Value, CodecError> {
        self.serialize_i64(i64::from(v))
    }

    fn serialize_u64(self, v: u64) -> Result<Value, CodecError> {
        // above i64::MAX; Firestore cannot hold it as an integer
        Ok(i64::try_from(v).map(Value::Integer).unwrap_or(Value::Double(v as f64)))
    }

    fn serialize_f32(self, v: f32) -> Result<Value, CodecError> {
        self.serialize_f64(f64::from(v))
    }

    fn serialize_f64(self, v: f64) -> Result<Value, CodecError> {
        Ok(Value::Double(v))
    }

    fn serialize_char(self, v: char) -> Result<Value, CodecError> {
        Ok(Value::String(v.to_string()))
    }

    fn serialize_str(self, v: &str) -> Result<Value, CodecError> {
        Ok(Value::String(v.to_string()))
    }

    // same shape serde_json gives a byte slice
    fn serialize_bytes(self, v: &[u8]) -> Result<Value, CodecError> {
        Ok(Value::Array(v.iter().map(|b| Value::Integer(i64::from(*b))).collect()))
    }

    fn serialize_none(self) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_some<T>(self, value: &T) -> Result<Value, CodecError>
    where
        T: ?Sized + Serialize,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Value, CodecError> {
        Ok(Value::Null)
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Value, CodecError> {
        Ok(Value::String(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(self, name: &'static str, value: &T) -> Result<Value, CodecError>
    where
        T: ?Sized + Serialize,
    {
        if name != TIMESTAMP_TOKEN {
            return value.serialize(self);
        }
        match value.serialize(ValueSerializer)? {
            Value::String(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|e| CodecError::Malformed { kind: "timestampValue", detail: e.to_string() }),
            other => Err(CodecError::Malformed { kind: "timestampValue", detail: format!("{:?}", other) }),
        }
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Value, CodecError>
    where
        T: ?Sized + Serialize,
    {
        let mut fields = Fields::new();
        fields.insert(variant.to_string(), value.serialize(ValueSerializer)?);
        Ok(Value::Map(fields))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<SerializeVec, CodecError> {
        Ok(SerializeVec { values: Vec::with_capacity(len.unwrap_or(0)) })
    }

    fn serialize_tuple(self, len: usize) -> Result<SerializeVec, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(self, _name: &'static str, len: usize) -> Result<SerializeVec, CodecError> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<SerializeTupleVariant, CodecError> {
        Ok(SerializeTupleVariant { variant, values: Vec::with_capacity(len) })
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<SerializeMap, CodecError> {
        Ok(SerializeMap { fields: Fields::new(), next_key: None })
    }

    fn serialize_struct(self, _name: &'static str, len: usize) -> Result<SerializeMap, CodecError> {
        self.serialize_map(Some(len))
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        _len: usize,
    ) -> Result<SerializeStructVariant, CodecError> {
        Ok(SerializeStructVariant { variant, fields: Fields::new() })
    }
}

pub struct SerializeVec {
    values: Vec<Value>,
}

impl ser::SerializeSeq for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        self.values.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Array(self.values))
    }
}

impl ser::SerializeTuple for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for SerializeVec {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Value, CodecError> {
        ser::SerializeSeq::end(self)
    }
}

pub struct SerializeTupleVariant {
    variant: &'static str,
    values: Vec<Value>,
}

impl ser::SerializeTupleVariant for SerializeTupleVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        self.values.push(value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        let mut fields = Fields::new();
        fields.insert(self.variant.to_string(), Value::Array(self.values));
        Ok(Value::Map(fields))
    }
}

pub struct SerializeMap {
    fields: Fields,
    next_key: Option<String>,
}

impl ser::SerializeMap for SerializeMap {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        let key = match key.serialize(ValueSerializer)? {
            Value::String(s) => s,
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
            other => return Err(CodecError::Shape(format!("map key must be a string, got {:?}", other))),
        };
        self.next_key = Some(key);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        let key = self
            .next_key
            .take()
            .ok_or_else(|| CodecError::Shape("map value without a key".to_string()))?;
        self.fields.insert(key, value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Map(self.fields))
    }
}

impl ser::SerializeStruct for SerializeMap {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        self.fields.insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        Ok(Value::Map(self.fields))
    }
}

pub struct SerializeStructVariant {
    variant: &'static str,
    fields: Fields,
}

impl ser::SerializeStructVariant for SerializeStructVariant {
    type Ok = Value;
    type Error = CodecError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), CodecError>
    where
        T: ?Sized + Serialize,
    {
        self.fields.insert(key.to_string(), value.serialize(ValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Value, CodecError> {
        let mut outer = Fields::new();
        outer.insert(self.variant.to_string(), Value::Map(self.fields));
        Ok(Value::Map(outer))
    }
}
