//! Sample documents
//!
//! Upstream collaborators hand over a schema together with decoded records.
//! As a file this is a JSON document:
//!
//! ```json
//! { "schema": { "type": "record", ... }, "records": [ { ... }, ... ] }
//! ```
//!
//! Record values are decoded against the schema. A union value is either a
//! bare value (the first branch that accepts it wins) or a single-key object
//! naming the branch, e.g. `{"string": "x"}`.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::schema::{Datum, Schema};

/// A schema plus the records sampled from one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    schema: Schema,
    records: Vec<Datum>,
}

impl Sample {
    pub fn new(schema: Schema, records: Vec<Datum>) -> Self {
        Self { schema, records }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Datum] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Decode a `{schema, records}` document.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidSample("sample document must be an object".to_string()))?;
        let schema = obj
            .get("schema")
            .ok_or_else(|| Error::InvalidSample("sample document has no schema".to_string()))?;
        let schema = Schema::from_json(schema)?;

        let records = match obj.get("records") {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(Error::InvalidSample(
                    "'records' must be an array".to_string(),
                ))
            }
            None => {
                return Err(Error::InvalidSample(
                    "sample document has no records".to_string(),
                ))
            }
        };

        let records = records
            .iter()
            .enumerate()
            .map(|(idx, record)| {
                decode_datum(record, &schema)
                    .map_err(|e| Error::InvalidSample(format!("record {}: {}", idx, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { schema, records })
    }

    /// Read and decode a sample document from disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let value: Value = serde_json::from_slice(&data)?;
        Self::from_json(&value)
    }
}

/// Decode one JSON value against its declared schema.
pub fn decode_datum(value: &Value, schema: &Schema) -> Result<Datum> {
    let mismatch = || {
        Error::InvalidSample(format!(
            "expected {} but found {}",
            schema.kind(),
            truncate(value)
        ))
    };

    match schema {
        Schema::Null => match value {
            Value::Null => Ok(Datum::Null),
            _ => Err(mismatch()),
        },
        Schema::Boolean => value.as_bool().map(Datum::Boolean).ok_or_else(mismatch),
        Schema::Int => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Datum::Int)
            .ok_or_else(mismatch),
        Schema::Long => value.as_i64().map(Datum::Long).ok_or_else(mismatch),
        Schema::Float => value.as_f64().map(|v| Datum::Float(v as f32)).ok_or_else(mismatch),
        Schema::Double => value.as_f64().map(Datum::Double).ok_or_else(mismatch),
        Schema::String => value
            .as_str()
            .map(|s| Datum::String(s.to_string()))
            .ok_or_else(mismatch),
        Schema::Bytes => value
            .as_str()
            .and_then(latin1_bytes)
            .map(Datum::Bytes)
            .ok_or_else(mismatch),
        Schema::Fixed { size, .. } => match value.as_str().and_then(latin1_bytes) {
            Some(bytes) if bytes.len() == *size => Ok(Datum::Fixed(bytes)),
            _ => Err(mismatch()),
        },
        Schema::Enum { symbols, .. } => match value.as_str() {
            Some(symbol) if symbols.iter().any(|s| s == symbol) => Ok(Datum::Enum(symbol.to_string())),
            _ => Err(mismatch()),
        },
        Schema::Array(items) => match value {
            Value::Array(values) => values
                .iter()
                .map(|v| decode_datum(v, items))
                .collect::<Result<Vec<_>>>()
                .map(Datum::Array),
            _ => Err(mismatch()),
        },
        Schema::Map(values) => match value {
            Value::Object(obj) => obj
                .iter()
                .map(|(k, v)| decode_datum(v, values).map(|d| (k.clone(), d)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(Datum::Map),
            _ => Err(mismatch()),
        },
        Schema::Record { fields, .. } => {
            let obj = value.as_object().ok_or_else(mismatch)?;
            let mut decoded = BTreeMap::new();
            for field in fields {
                match obj.get(&field.name) {
                    // Absent fields, and nulls for non-nullable fields, are left
                    // out of the record; the profiler treats them as missing.
                    None => {}
                    Some(Value::Null) if !accepts_null(&field.schema) => {}
                    Some(v) => {
                        let datum = decode_datum(v, &field.schema)
                            .map_err(|e| Error::InvalidSample(format!("field '{}': {}", field.name, e)))?;
                        decoded.insert(field.name.clone(), datum);
                    }
                }
            }
            Ok(Datum::Record(decoded))
        }
        Schema::Union(branches) => {
            if let Value::Object(obj) = value {
                if obj.len() == 1 {
                    if let Some((tag, inner)) = obj.iter().next() {
                        if let Some(branch) = branches.iter().find(|b| b.type_name() == tag) {
                            return decode_datum(inner, branch);
                        }
                    }
                }
            }
            branches
                .iter()
                .find_map(|branch| decode_datum(value, branch).ok())
                .ok_or_else(mismatch)
        }
    }
}

fn accepts_null(schema: &Schema) -> bool {
    match schema {
        Schema::Null => true,
        Schema::Union(branches) => branches.iter().any(|b| matches!(b, Schema::Null)),
        _ => false,
    }
}

/// Avro's JSON encoding of bytes: one code point in `0..=255` per byte.
fn latin1_bytes(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(u32::from(c)).ok()).collect()
}

fn truncate(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() <= 40 {
        text
    } else {
        let head: String = text.chars().take(40).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, SchemaKind};
    use serde_json::json;

    fn person_schema() -> Schema {
        Schema::record(
            "person",
            vec![
                Field::new("id", Schema::Int),
                Field::new("name", Schema::String),
                Field::new("email", Schema::Union(vec![Schema::Null, Schema::String])),
            ],
        )
    }

    #[test]
    fn test_decode_sample_document() {
        let doc = json!({
            "schema": person_schema(),
            "records": [
                {"id": 1, "name": "ann", "email": null},
                {"id": 2, "name": "bob", "email": {"string": "bob@example.com"}},
                {"id": 3, "name": "cy", "email": "cy@example.com"}
            ]
        });

        let sample = Sample::from_json(&doc).unwrap();
        assert_eq!(sample.len(), 3);
        let Datum::Record(second) = &sample.records()[1] else {
            panic!("expected a record");
        };
        assert_eq!(second["email"], Datum::String("bob@example.com".to_string()));
        let Datum::Record(first) = &sample.records()[0] else {
            panic!("expected a record");
        };
        assert_eq!(first["email"].kind(), SchemaKind::Null);
    }

    #[test]
    fn test_missing_and_null_fields_are_omitted() {
        let record = decode_datum(&json!({"id": null}), &person_schema()).unwrap();
        assert_eq!(record, Datum::Record(BTreeMap::new()));
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let doc = json!({
            "schema": person_schema(),
            "records": [{"id": "not a number"}]
        });
        assert!(matches!(Sample::from_json(&doc), Err(Error::InvalidSample(_))));
    }

    #[test]
    fn test_int_out_of_range() {
        assert!(decode_datum(&json!(1u64 << 40), &Schema::Int).is_err());
        assert_eq!(
            decode_datum(&json!(1u64 << 40), &Schema::Long).unwrap(),
            Datum::Long(1 << 40)
        );
    }

    #[test]
    fn test_fixed_and_enum() {
        let fixed = Schema::Fixed {
            name: "pair".to_string(),
            size: 2,
            doc: None,
        };
        assert_eq!(
            decode_datum(&json!("\u{00ff}a"), &fixed).unwrap(),
            Datum::Fixed(vec![0xff, b'a'])
        );
        assert!(decode_datum(&json!("abc"), &fixed).is_err());

        let color = Schema::Enum {
            name: "Color".to_string(),
            symbols: vec!["RED".to_string()],
            doc: None,
        };
        assert_eq!(
            decode_datum(&json!("RED"), &color).unwrap(),
            Datum::Enum("RED".to_string())
        );
        assert!(decode_datum(&json!("BLUE"), &color).is_err());
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.json");
        let doc = json!({
            "schema": person_schema(),
            "records": [{"id": 7, "name": "x"}]
        });
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let sample = Sample::from_path(&path).unwrap();
        assert_eq!(sample.schema(), &person_schema());
        assert_eq!(sample.len(), 1);
    }
}
