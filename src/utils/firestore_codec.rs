mod ser;

use std::collections::BTreeMap;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Map, Number};
use thiserror::Error;

pub use ser::{ValueSerializer, TIMESTAMP_TOKEN};

/// Document fields keyed by field name, ordered so encoded output is stable.
pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("expected a JSON object for a Firestore value, got {0}")]
    NotAnObject(String),
    #[error("unsupported Firestore value kind: {0}")]
    UnsupportedKind(String),
    #[error("malformed {kind}: {detail}")]
    Malformed { kind: &'static str, detail: String },
    #[error("expected a JSON object for document fields")]
    FieldsNotAnObject,
    #[error("cannot map document fields onto a record: {0}")]
    Shape(String),
}

/// A single Firestore value in its tagged form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Timestamp(DateTime<Utc>),
    String(String),
    /// Full resource name of another document.
    Reference(String),
    Bytes(Vec<u8>),
    GeoPoint { latitude: f64, longitude: f64 },
    Map(Fields),
    Array(Vec<Value>),
}

impl Value {
    /// Decode the REST representation (`{"stringValue": "..."}` and friends).
    pub fn from_wire(wire: &serde_json::Value) -> Result<Self, CodecError> {
        let obj = wire
            .as_object()
            .ok_or_else(|| CodecError::NotAnObject(wire.to_string()))?;

        let (kind, inner) = match obj.iter().next() {
            Some(entry) if obj.len() == 1 => entry,
            _ => return Err(CodecError::NotAnObject(wire.to_string())),
        };

        match kind.as_str() {
            "nullValue" => Ok(Value::Null),
            "booleanValue" => inner
                .as_bool()
                .map(Value::Boolean)
                .ok_or_else(|| malformed("booleanValue", inner)),
            // int64 travels as a decimal string; some emulators send a number
            "integerValue" => match inner {
                serde_json::Value::String(s) => s
                    .parse::<i64>()
                    .map(Value::Integer)
                    .map_err(|e| CodecError::Malformed { kind: "integerValue", detail: e.to_string() }),
                serde_json::Value::Number(n) => n
                    .as_i64()
                    .map(Value::Integer)
                    .ok_or_else(|| malformed("integerValue", inner)),
                _ => Err(malformed("integerValue", inner)),
            },
            "doubleValue" => match inner {
                serde_json::Value::Number(n) => n
                    .as_f64()
                    .map(Value::Double)
                    .ok_or_else(|| malformed("doubleValue", inner)),
                serde_json::Value::String(s) => s
                    .parse::<f64>()
                    .map(Value::Double)
                    .map_err(|e| CodecError::Malformed { kind: "doubleValue", detail: e.to_string() }),
                _ => Err(malformed("doubleValue", inner)),
            },
            "timestampValue" => {
                let raw = inner.as_str().ok_or_else(|| malformed("timestampValue", inner))?;
                DateTime::parse_from_rfc3339(raw)
                    .map(|dt| Value::Timestamp(dt.with_timezone(&Utc)))
                    .map_err(|e| CodecError::Malformed { kind: "timestampValue", detail: e.to_string() })
            }
            "stringValue" => inner
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(|| malformed("stringValue", inner)),
            "referenceValue" => inner
                .as_str()
                .map(|s| Value::Reference(s.to_string()))
                .ok_or_else(|| malformed("referenceValue", inner)),
            "bytesValue" => {
                let raw = inner.as_str().ok_or_else(|| malformed("bytesValue", inner))?;
                STANDARD
                    .decode(raw)
                    .map(Value::Bytes)
                    .map_err(|e| CodecError::Malformed { kind: "bytesValue", detail: e.to_string() })
            }
            // zero coordinates are left out of the wire form
            "geoPointValue" => {
                let coordinate = |name: &str| match inner.get(name) {
                    None | Some(serde_json::Value::Null) => Ok(0.0),
                    Some(n) => n.as_f64().ok_or_else(|| malformed("geoPointValue", inner)),
                };
                if !inner.is_object() {
                    return Err(malformed("geoPointValue", inner));
                }
                Ok(Value::GeoPoint { latitude: coordinate("latitude")?, longitude: coordinate("longitude")? })
            }
            "mapValue" => match inner.get("fields") {
                None | Some(serde_json::Value::Null) => Ok(Value::Map(Fields::new())),
                Some(fields) => fields_from_wire(fields).map(Value::Map),
            },
            "arrayValue" => match inner.get("values") {
                None | Some(serde_json::Value::Null) => Ok(Value::Array(Vec::new())),
                Some(serde_json::Value::Array(values)) => values
                    .iter()
                    .map(Value::from_wire)
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array),
                Some(other) => Err(malformed("arrayValue", other)),
            },
            other => Err(CodecError::UnsupportedKind(other.to_string())),
        }
    }

    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            Value::Null => json!({ "nullValue": null }),
            Value::Boolean(b) => json!({ "booleanValue": b }),
            Value::Integer(i) => json!({ "integerValue": i.to_string() }),
            Value::Double(d) => json!({ "doubleValue": d }),
            Value::Timestamp(ts) => json!({ "timestampValue": format_timestamp(ts) }),
            Value::String(s) => json!({ "stringValue": s }),
            Value::Reference(name) => json!({ "referenceValue": name }),
            Value::Bytes(bytes) => json!({ "bytesValue": STANDARD.encode(bytes) }),
            Value::GeoPoint { latitude, longitude } => json!({
                "geoPointValue": { "latitude": latitude, "longitude": longitude }
            }),
            Value::Map(fields) => json!({ "mapValue": { "fields": fields_to_wire(fields) } }),
            Value::Array(values) => json!({
                "arrayValue": { "values": values.iter().map(Value::to_wire).collect::<Vec<_>>() }
            }),
        }
    }

    /// Plain JSON as served to the frontend. Timestamps become RFC 3339 strings,
    /// references their resource name and bytes base64.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Double(d) => Number::from_f64(*d)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Timestamp(ts) => serde_json::Value::String(format_timestamp(ts)),
            Value::String(s) | Value::Reference(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
            Value::GeoPoint { latitude, longitude } => json!({ "latitude": latitude, "longitude": longitude }),
            Value::Map(fields) => serde_json::Value::Object(fields_to_json(fields)),
            Value::Array(values) => serde_json::Value::Array(values.iter().map(Value::to_json).collect()),
        }
    }

    /// Plain JSON into a value. Strings always stay strings, whatever they look like;
    /// typed records go through [`encode`], which knows their timestamp fields.
    pub fn from_json(plain: &serde_json::Value) -> Self {
        match plain {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if n.is_u64() {
                    // above i64::MAX; Firestore cannot hold it as an integer
                    Value::Double(n.as_f64().unwrap_or(f64::MAX))
                } else {
                    Value::Double(n.as_f64().unwrap_or_default())
                }
            }
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(values) => Value::Array(values.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Map(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(ts: DateTime<Utc>) -> Self {
        Value::Timestamp(ts)
    }
}

fn malformed(kind: &'static str, inner: &serde_json::Value) -> CodecError {
    CodecError::Malformed { kind, detail: inner.to_string() }
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Decode the `fields` object of a Firestore document or map value.
pub fn fields_from_wire(wire: &serde_json::Value) -> Result<Fields, CodecError> {
    let obj = wire.as_object().ok_or(CodecError::FieldsNotAnObject)?;
    obj.iter()
        .map(|(k, v)| Value::from_wire(v).map(|value| (k.clone(), value)))
        .collect()
}

pub fn fields_to_wire(fields: &Fields) -> serde_json::Value {
    serde_json::Value::Object(
        fields.iter().map(|(k, v)| (k.clone(), v.to_wire())).collect(),
    )
}

pub fn fields_to_json(fields: &Fields) -> Map<String, serde_json::Value> {
    fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
}

pub fn fields_from_json(plain: &Map<String, serde_json::Value>) -> Fields {
    plain.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect()
}

/// Serialize any value, keeping fields written through `timestamp_opt` as timestamps.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, CodecError> {
    value.serialize(ValueSerializer)
}

/// Encode a record into document fields. `id` is the document name, never a field.
pub fn encode<T: Serialize>(record: &T) -> Result<Fields, CodecError> {
    match to_value(record)? {
        Value::Map(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        _ => Err(CodecError::FieldsNotAnObject),
    }
}

/// Decode document fields into a record, injecting the document id.
pub fn decode<T: DeserializeOwned>(id: &str, fields: &Fields) -> Result<T, CodecError> {
    let mut plain = fields_to_json(fields);
    plain.insert("id".to_string(), serde_json::Value::String(id.to_string()));
    serde_json::from_value(serde_json::Value::Object(plain)).map_err(|e| CodecError::Shape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde::Deserialize;

    fn sample_fields() -> Fields {
        let mut nested = Fields::new();
        nested.insert("city".to_string(), Value::String("Nairobi".to_string()));
        nested.insert("floor".to_string(), Value::Integer(3));

        let mut fields = Fields::new();
        fields.insert("name".to_string(), Value::String("Amina".to_string()));
        fields.insert("balance".to_string(), Value::Integer(1500));
        fields.insert("rating".to_string(), Value::Double(4.5));
        fields.insert("verified".to_string(), Value::Boolean(true));
        fields.insert("referredBy".to_string(), Value::Null);
        fields.insert(
            "createdAt".to_string(),
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 6, 9, 30, 0).unwrap()),
        );
        fields.insert("address".to_string(), Value::Map(nested));
        fields.insert(
            "tags".to_string(),
            Value::Array(vec![Value::String("kra".to_string()), Value::Integer(7)]),
        );
        fields
    }

    fn rich_fields() -> Fields {
        let mut fields = sample_fields();
        fields.insert(
            "team".to_string(),
            Value::Reference("projects/p/databases/(default)/documents/teams/t1".to_string()),
        );
        fields.insert("avatar".to_string(), Value::Bytes(vec![0, 159, 255]));
        fields.insert("office".to_string(), Value::GeoPoint { latitude: -1.2864, longitude: 36.8172 });
        fields
    }

    #[test]
    fn test_decode_rest_document_fields() {
        let wire = json!({
            "phone": { "stringValue": "+254700000000" },
            "balance": { "integerValue": "250" },
            "rate": { "doubleValue": 0.3 },
            "active": { "booleanValue": false },
            "manager": { "nullValue": null },
            "createdAt": { "timestampValue": "2024-05-01T08:00:00.123456Z" },
            "meta": { "mapValue": {} },
            "history": { "arrayValue": {} }
        });

        let fields = fields_from_wire(&wire).unwrap();
        assert_eq!(fields["phone"], Value::String("+254700000000".to_string()));
        assert_eq!(fields["balance"], Value::Integer(250));
        assert_eq!(fields["rate"], Value::Double(0.3));
        assert_eq!(fields["active"], Value::Boolean(false));
        assert_eq!(fields["manager"], Value::Null);
        assert!(matches!(fields["createdAt"], Value::Timestamp(_)));
        assert_eq!(fields["meta"], Value::Map(Fields::new()));
        assert_eq!(fields["history"], Value::Array(vec![]));
    }

    #[test]
    fn test_wire_round_trip_all_kinds() {
        let fields = rich_fields();
        let wire = fields_to_wire(&fields);
        assert_eq!(wire["avatar"], json!({ "bytesValue": "AJ//" }));
        assert_eq!(fields_from_wire(&wire).unwrap(), fields);
    }

    #[test]
    fn test_plain_form() {
        let fields = rich_fields();
        let plain = fields_to_json(&fields);

        assert_eq!(plain["createdAt"], json!("2024-03-06T09:30:00Z"));
        assert_eq!(plain["balance"], json!(1500));
        assert_eq!(plain["address"]["city"], json!("Nairobi"));
        assert_eq!(plain["team"], json!("projects/p/databases/(default)/documents/teams/t1"));
        assert_eq!(plain["office"], json!({ "latitude": -1.2864, "longitude": 36.8172 }));

        // plain JSON has no timestamp kind; the string comes back as written
        let back = fields_from_json(&plain);
        assert_eq!(back["createdAt"], Value::String("2024-03-06T09:30:00Z".to_string()));
        assert_eq!(back["address"], fields["address"]);
        assert_eq!(back["tags"], fields["tags"]);
        assert_eq!(back["rating"], fields["rating"]);
    }

    #[test]
    fn test_geo_point_defaults_missing_coordinates() {
        assert_eq!(
            Value::from_wire(&json!({ "geoPointValue": { "latitude": 1.5 } })).unwrap(),
            Value::GeoPoint { latitude: 1.5, longitude: 0.0 }
        );
        assert!(Value::from_wire(&json!({ "bytesValue": "not base64!" })).is_err());
    }

    #[test]
    fn test_integral_double_stays_double() {
        let value = Value::Double(500.0);
        assert_eq!(Value::from_json(&value.to_json()), value);
        assert_eq!(value.to_wire(), json!({ "doubleValue": 500.0 }));
    }

    #[test]
    fn test_integer_wire_is_string() {
        assert_eq!(Value::Integer(42).to_wire(), json!({ "integerValue": "42" }));
        assert_eq!(Value::from_wire(&json!({ "integerValue": 42 })).unwrap(), Value::Integer(42));
    }

    #[test]
    fn test_plain_strings_stay_strings() {
        for text in ["2024-03-06", "Wednesday", "2024-03-06T09:30:00+03:00"] {
            assert_eq!(Value::from_json(&json!(text)), Value::String(text.to_string()));
        }
    }

    #[test]
    fn test_rejects_unknown_and_malformed_values() {
        assert_eq!(
            Value::from_wire(&json!({ "vectorValue": { "values": [] } })),
            Err(CodecError::UnsupportedKind("vectorValue".to_string()))
        );
        assert!(Value::from_wire(&json!({ "integerValue": "twelve" })).is_err());
        assert!(Value::from_wire(&json!("bare")).is_err());
        assert!(Value::from_wire(&json!({ "stringValue": "a", "integerValue": "1" })).is_err());
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[serde(default)]
        id: String,
        user_phone: String,
        amount: f64,
    }

    #[test]
    fn test_encode_drops_id_and_decode_injects_it() {
        let record = Sample { id: "w1".to_string(), user_phone: "+254711000000".to_string(), amount: 300.0 };
        let fields = encode(&record).unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["userPhone"], Value::String("+254711000000".to_string()));

        let back: Sample = decode("w1", &fields).unwrap();
        assert_eq!(back, record);
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct Note {
        #[serde(default)]
        id: String,
        message: String,
        #[serde(default, with = "crate::models::timestamp_opt")]
        sent_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_only_declared_timestamps_become_timestamps() {
        let note = Note {
            id: "n1".to_string(),
            message: "2024-03-06T09:30:00+03:00".to_string(),
            sent_at: Some(Utc.with_ymd_and_hms(2024, 3, 6, 6, 30, 0).unwrap()),
        };
        let fields = encode(&note).unwrap();
        assert_eq!(fields["message"], Value::String("2024-03-06T09:30:00+03:00".to_string()));
        assert_eq!(fields["sentAt"], Value::Timestamp(Utc.with_ymd_and_hms(2024, 3, 6, 6, 30, 0).unwrap()));

        let wire = fields_to_wire(&fields);
        assert_eq!(wire["message"], json!({ "stringValue": "2024-03-06T09:30:00+03:00" }));
        let back: Note = decode("n1", &fields_from_wire(&wire).unwrap()).unwrap();
        assert_eq!(back, note);

        // the API body is unaffected by the marker
        assert_eq!(serde_json::to_value(&note).unwrap()["sentAt"], json!("2024-03-06T06:30:00Z"));
    }

    #[test]
    fn test_encode_nested_and_unset_values() {
        let payload = json!({ "label": "KRA", "price": 500.0, "count": 3, "tags": ["a"], "extra": null });
        let fields = encode(&payload).unwrap();
        assert_eq!(fields["price"], Value::Double(500.0));
        assert_eq!(fields["count"], Value::Integer(3));
        assert_eq!(fields["tags"], Value::Array(vec![Value::from("a")]));
        assert_eq!(fields["extra"], Value::Null);
        assert_eq!(fields_to_json(&fields), payload.as_object().unwrap().clone());
    }

    #[test]
    fn test_decode_accepts_integer_for_float_field() {
        let mut fields = Fields::new();
        fields.insert("userPhone".to_string(), Value::String("+254711000000".to_string()));
        fields.insert("amount".to_string(), Value::Integer(450));
        let back: Sample = decode("w2", &fields).unwrap();
        assert_eq!(back.amount, 450.0);
    }
}
