//! Schema model and decoded values
//!
//! A [`Schema`] is the declared shape of a dataset: a tree over a closed set
//! of kinds (record, array, map, union, enum, fixed and the primitives).
//! Schemas read and write an Avro-style JSON form so dictionary entries and
//! samples can carry them as plain documents.
//!
//! A [`Datum`] is one decoded value. Its [`Datum::kind`] is the runtime kind
//! used to pick a union branch when profiling data.

use std::collections::BTreeMap;
use std::fmt;

use ahash::{AHashMap, AHashSet};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};

/// Field-less discriminant of a schema or profile node.
///
/// Declaration order matches the wire tags, so the derived ordering sorts
/// kinds by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Array,
    Boolean,
    Bytes,
    Double,
    Enum,
    Fixed,
    Float,
    Int,
    Long,
    Map,
    Null,
    Record,
    String,
    Union,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 14] = [
        SchemaKind::Array,
        SchemaKind::Boolean,
        SchemaKind::Bytes,
        SchemaKind::Double,
        SchemaKind::Enum,
        SchemaKind::Fixed,
        SchemaKind::Float,
        SchemaKind::Int,
        SchemaKind::Long,
        SchemaKind::Map,
        SchemaKind::Null,
        SchemaKind::Record,
        SchemaKind::String,
        SchemaKind::Union,
    ];

    /// Tag written in front of every node in the summary wire format.
    #[inline]
    pub fn tag(self) -> i16 {
        match self {
            SchemaKind::Array => 1,
            SchemaKind::Boolean => 2,
            SchemaKind::Bytes => 3,
            SchemaKind::Double => 4,
            SchemaKind::Enum => 5,
            SchemaKind::Fixed => 6,
            SchemaKind::Float => 7,
            SchemaKind::Int => 8,
            SchemaKind::Long => 9,
            SchemaKind::Map => 10,
            SchemaKind::Null => 11,
            SchemaKind::Record => 12,
            SchemaKind::String => 13,
            SchemaKind::Union => 14,
        }
    }

    pub fn from_tag(tag: i16) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.tag() == tag)
    }

    /// Upper-case name, as used in union branch lists and node descriptions.
    pub fn name(self) -> &'static str {
        match self {
            SchemaKind::Array => "ARRAY",
            SchemaKind::Boolean => "BOOLEAN",
            SchemaKind::Bytes => "BYTES",
            SchemaKind::Double => "DOUBLE",
            SchemaKind::Enum => "ENUM",
            SchemaKind::Fixed => "FIXED",
            SchemaKind::Float => "FLOAT",
            SchemaKind::Int => "INT",
            SchemaKind::Long => "LONG",
            SchemaKind::Map => "MAP",
            SchemaKind::Null => "NULL",
            SchemaKind::Record => "RECORD",
            SchemaKind::String => "STRING",
            SchemaKind::Union => "UNION",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Record, array, map and union nodes have children; everything else is a leaf.
    #[inline]
    pub fn is_leaf(self) -> bool {
        !matches!(
            self,
            SchemaKind::Record | SchemaKind::Array | SchemaKind::Map | SchemaKind::Union
        )
    }

    fn json_name(self) -> &'static str {
        match self {
            SchemaKind::Array => "array",
            SchemaKind::Boolean => "boolean",
            SchemaKind::Bytes => "bytes",
            SchemaKind::Double => "double",
            SchemaKind::Enum => "enum",
            SchemaKind::Fixed => "fixed",
            SchemaKind::Float => "float",
            SchemaKind::Int => "int",
            SchemaKind::Long => "long",
            SchemaKind::Map => "map",
            SchemaKind::Null => "null",
            SchemaKind::Record => "record",
            SchemaKind::String => "string",
            SchemaKind::Union => "union",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named field of a record schema
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub schema: Schema,
    pub doc: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            doc: None,
        }
    }

    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Declared structure of a dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Schema {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    Enum {
        name: String,
        symbols: Vec<String>,
        doc: Option<String>,
    },
    Fixed {
        name: String,
        size: usize,
        doc: Option<String>,
    },
    Array(Box<Schema>),
    Map(Box<Schema>),
    Union(Vec<Schema>),
    Record {
        name: String,
        fields: Vec<Field>,
        doc: Option<String>,
    },
}

impl Schema {
    /// Convenience constructor for a record without documentation.
    pub fn record(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Schema::Record {
            name: name.into(),
            fields,
            doc: None,
        }
    }

    pub fn kind(&self) -> SchemaKind {
        match self {
            Schema::Null => SchemaKind::Null,
            Schema::Boolean => SchemaKind::Boolean,
            Schema::Int => SchemaKind::Int,
            Schema::Long => SchemaKind::Long,
            Schema::Float => SchemaKind::Float,
            Schema::Double => SchemaKind::Double,
            Schema::Bytes => SchemaKind::Bytes,
            Schema::String => SchemaKind::String,
            Schema::Enum { .. } => SchemaKind::Enum,
            Schema::Fixed { .. } => SchemaKind::Fixed,
            Schema::Array(_) => SchemaKind::Array,
            Schema::Map(_) => SchemaKind::Map,
            Schema::Union(_) => SchemaKind::Union,
            Schema::Record { .. } => SchemaKind::Record,
        }
    }

    /// Schema-level documentation. Only named types carry one.
    pub fn doc(&self) -> Option<&str> {
        match self {
            Schema::Record { doc, .. } | Schema::Enum { doc, .. } | Schema::Fixed { doc, .. } => {
                doc.as_deref()
            }
            _ => None,
        }
    }

    /// Declared fields; empty for anything but a record.
    pub fn fields(&self) -> &[Field] {
        match self {
            Schema::Record { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Name used to tag a union branch in JSON: the type name for named
    /// types, the primitive name otherwise.
    pub fn type_name(&self) -> &str {
        match self {
            Schema::Record { name, .. } | Schema::Enum { name, .. } | Schema::Fixed { name, .. } => {
                name
            }
            other => other.kind().json_name(),
        }
    }

    /// Parse the Avro-style JSON form.
    pub fn from_json(value: &Value) -> Result<Self> {
        SchemaParser::default().parse(value)
    }

    /// Parse the Avro-style JSON form from text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::InvalidSchema(format!("not valid JSON: {}", e)))?;
        Self::from_json(&value)
    }

    /// Render the Avro-style JSON form.
    pub fn to_json(&self) -> Value {
        match self {
            Schema::Null
            | Schema::Boolean
            | Schema::Int
            | Schema::Long
            | Schema::Float
            | Schema::Double
            | Schema::Bytes
            | Schema::String => Value::String(self.kind().json_name().to_string()),
            Schema::Enum { name, symbols, doc } => {
                let mut obj = named_object("enum", name, doc);
                obj.insert("symbols".to_string(), json!(symbols));
                Value::Object(obj)
            }
            Schema::Fixed { name, size, doc } => {
                let mut obj = named_object("fixed", name, doc);
                obj.insert("size".to_string(), json!(size));
                Value::Object(obj)
            }
            Schema::Array(items) => json!({ "type": "array", "items": items.to_json() }),
            Schema::Map(values) => json!({ "type": "map", "values": values.to_json() }),
            Schema::Union(branches) => Value::Array(branches.iter().map(Schema::to_json).collect()),
            Schema::Record { name, fields, doc } => {
                let mut obj = named_object("record", name, doc);
                let fields: Vec<Value> = fields
                    .iter()
                    .map(|field| {
                        let mut f = Map::new();
                        f.insert("name".to_string(), Value::String(field.name.clone()));
                        f.insert("type".to_string(), field.schema.to_json());
                        if let Some(doc) = &field.doc {
                            f.insert("doc".to_string(), Value::String(doc.clone()));
                        }
                        Value::Object(f)
                    })
                    .collect();
                obj.insert("fields".to_string(), Value::Array(fields));
                Value::Object(obj)
            }
        }
    }
}

fn named_object(ty: &str, name: &str, doc: &Option<String>) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("type".to_string(), Value::String(ty.to_string()));
    obj.insert("name".to_string(), Value::String(name.to_string()));
    if let Some(doc) = doc {
        obj.insert("doc".to_string(), Value::String(doc.clone()));
    }
    obj
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Schema::from_json(&value).map_err(D::Error::custom)
    }
}

/// Parser state: named types seen so far, so later positions may refer to
/// them by name.
#[derive(Default)]
struct SchemaParser {
    named: AHashMap<String, Schema>,
    defining: AHashSet<String>,
}

impl SchemaParser {
    fn parse(&mut self, value: &Value) -> Result<Schema> {
        match value {
            Value::String(name) => self.resolve(name),
            Value::Array(branches) => {
                let branches = branches
                    .iter()
                    .map(|branch| self.parse(branch))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Schema::Union(branches))
            }
            Value::Object(obj) => match obj.get("type") {
                Some(Value::String(ty)) => self.parse_complex(ty, obj),
                Some(nested) => self.parse(nested),
                None => Err(Error::InvalidSchema(format!(
                    "schema object without a type: {}",
                    value
                ))),
            },
            other => Err(Error::InvalidSchema(format!(
                "unexpected schema value: {}",
                other
            ))),
        }
    }

    fn resolve(&self, name: &str) -> Result<Schema> {
        if let Some(schema) = primitive(name) {
            return Ok(schema);
        }
        if self.defining.contains(name) {
            return Err(Error::InvalidSchema(format!(
                "recursive reference to '{}' is not supported",
                name
            )));
        }
        self.named
            .get(name)
            .cloned()
            .ok_or_else(|| Error::InvalidSchema(format!("unknown type '{}'", name)))
    }

    fn parse_complex(&mut self, ty: &str, obj: &Map<String, Value>) -> Result<Schema> {
        match ty {
            "record" | "error" => {
                let name = required_str(obj, "name")?;
                let full_name = full_name(obj, &name);
                self.defining.insert(name.clone());
                self.defining.insert(full_name.clone());
                let fields = match obj.get("fields") {
                    Some(Value::Array(fields)) => fields
                        .iter()
                        .map(|field| self.parse_field(field))
                        .collect::<Result<Vec<_>>>(),
                    _ => Err(Error::InvalidSchema(format!(
                        "record '{}' has no field list",
                        name
                    ))),
                };
                self.defining.remove(&name);
                self.defining.remove(&full_name);
                let schema = Schema::Record {
                    name: name.clone(),
                    fields: fields?,
                    doc: optional_str(obj, "doc"),
                };
                self.define(name, full_name, &schema);
                Ok(schema)
            }
            "enum" => {
                let name = required_str(obj, "name")?;
                let symbols = match obj.get("symbols") {
                    Some(Value::Array(symbols)) => symbols
                        .iter()
                        .map(|s| {
                            s.as_str().map(str::to_string).ok_or_else(|| {
                                Error::InvalidSchema(format!("enum '{}' has a non-string symbol", name))
                            })
                        })
                        .collect::<Result<Vec<_>>>()?,
                    _ => {
                        return Err(Error::InvalidSchema(format!(
                            "enum '{}' has no symbols",
                            name
                        )))
                    }
                };
                let schema = Schema::Enum {
                    name: name.clone(),
                    symbols,
                    doc: optional_str(obj, "doc"),
                };
                let full_name = full_name(obj, &name);
                self.define(name, full_name, &schema);
                Ok(schema)
            }
            "fixed" => {
                let name = required_str(obj, "name")?;
                let size = obj
                    .get("size")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| Error::InvalidSchema(format!("fixed '{}' has no size", name)))?;
                let schema = Schema::Fixed {
                    name: name.clone(),
                    size: size as usize,
                    doc: optional_str(obj, "doc"),
                };
                let full_name = full_name(obj, &name);
                self.define(name, full_name, &schema);
                Ok(schema)
            }
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| Error::InvalidSchema("array without items".to_string()))?;
                Ok(Schema::Array(Box::new(self.parse(items)?)))
            }
            "map" => {
                let values = obj
                    .get("values")
                    .ok_or_else(|| Error::InvalidSchema("map without values".to_string()))?;
                Ok(Schema::Map(Box::new(self.parse(values)?)))
            }
            other => self.resolve(other),
        }
    }

    fn parse_field(&mut self, value: &Value) -> Result<Field> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::InvalidSchema(format!("field is not an object: {}", value)))?;
        let name = required_str(obj, "name")?;
        let ty = obj
            .get("type")
            .ok_or_else(|| Error::InvalidSchema(format!("field '{}' has no type", name)))?;
        Ok(Field {
            schema: self.parse(ty)?,
            doc: optional_str(obj, "doc"),
            name,
        })
    }

    fn define(&mut self, name: String, full_name: String, schema: &Schema) {
        if full_name != name {
            self.named.insert(full_name, schema.clone());
        }
        self.named.insert(name, schema.clone());
    }
}

fn primitive(name: &str) -> Option<Schema> {
    Some(match name {
        "null" => Schema::Null,
        "boolean" => Schema::Boolean,
        "int" => Schema::Int,
        "long" => Schema::Long,
        "float" => Schema::Float,
        "double" => Schema::Double,
        "bytes" => Schema::Bytes,
        "string" => Schema::String,
        _ => return None,
    })
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidSchema(format!("missing '{}' in {}", key, Value::Object(obj.clone()))))
}

fn optional_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn full_name(obj: &Map<String, Value>, name: &str) -> String {
    match obj.get("namespace").and_then(Value::as_str) {
        Some(ns) if !ns.is_empty() && !name.contains('.') => format!("{}.{}", ns, name),
        _ => name.to_string(),
    }
}

/// A decoded value
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Null,
    Boolean(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
    String(String),
    Enum(String),
    Fixed(Vec<u8>),
    Array(Vec<Datum>),
    Map(BTreeMap<String, Datum>),
    Record(BTreeMap<String, Datum>),
}

impl Datum {
    /// Runtime kind of the value.
    pub fn kind(&self) -> SchemaKind {
        match self {
            Datum::Null => SchemaKind::Null,
            Datum::Boolean(_) => SchemaKind::Boolean,
            Datum::Int(_) => SchemaKind::Int,
            Datum::Long(_) => SchemaKind::Long,
            Datum::Float(_) => SchemaKind::Float,
            Datum::Double(_) => SchemaKind::Double,
            Datum::Bytes(_) => SchemaKind::Bytes,
            Datum::String(_) => SchemaKind::String,
            Datum::Enum(_) => SchemaKind::Enum,
            Datum::Fixed(_) => SchemaKind::Fixed,
            Datum::Array(_) => SchemaKind::Array,
            Datum::Map(_) => SchemaKind::Map,
            Datum::Record(_) => SchemaKind::Record,
        }
    }

    /// Build a record value from `(field, value)` pairs.
    pub fn record<I, K>(fields: I) -> Datum
    where
        I: IntoIterator<Item = (K, Datum)>,
        K: Into<String>,
    {
        Datum::Record(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<i32> for Datum {
    fn from(v: i32) -> Self {
        Datum::Int(v)
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Long(v)
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Double(v)
    }
}

impl From<bool> for Datum {
    fn from(v: bool) -> Self {
        Datum::Boolean(v)
    }
}

impl From<&str> for Datum {
    fn from(v: &str) -> Self {
        Datum::String(v.to_string())
    }
}

impl From<String> for Datum {
    fn from(v: String) -> Self {
        Datum::String(v)
    }
}
