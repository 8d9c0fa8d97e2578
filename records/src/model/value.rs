// Registrar
// Copyright 2023 Julio Merino
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not
// use this file except in compliance with the License.  You may obtain a copy
// of the License at:
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.  See the
// License for the specific language governing permissions and limitations
// under the License.

//! Values stored in the fields of an entity and their wire representation.

use crate::model::schema::{KeyKind, Schema};
use derive_getters::Getters;
use derive_more::{Constructor, Display};
use serde::ser::{Error, SerializeMap};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Format of dates in the wire representation and in databases that lack a native date type.
pub(crate) const DATE_FORMAT: &[time::format_description::BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Primary key of a row.
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Key {
    /// An integer key assigned by the database.
    #[display("{_0}")]
    Serial(i64),

    /// A UUID key assigned by the service.
    #[display("{_0}")]
    Uuid(Uuid),
}

impl Key {
    /// Parses the textual representation of a key of the given `kind`, as found in URLs.
    pub fn parse(kind: KeyKind, raw: &str) -> Option<Key> {
        match kind {
            KeyKind::Serial => raw.parse::<i64>().ok().map(Key::Serial),
            KeyKind::Uuid => Uuid::parse_str(raw).ok().map(Key::Uuid),
        }
    }

    /// Returns the kind of this key.
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Serial(_) => KeyKind::Serial,
            Key::Uuid(_) => KeyKind::Uuid,
        }
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Key::Serial(id) => serializer.serialize_i64(*id),
            Key::Uuid(id) => serializer.collect_str(&id.hyphenated()),
        }
    }
}

/// A value stored in a field.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absence of a value.
    Null,

    /// A text value, used by all textual field kinds.
    Text(String),

    /// An integer value.
    Integer(i64),

    /// A floating point value.
    Float(f64),

    /// A calendar date.
    Date(Date),

    /// A point in time.
    Timestamp(OffsetDateTime),

    /// A reference to another row.
    Key(Key),

    /// A set of references to other rows.
    Keys(Vec<Key>),
}

impl Value {
    /// Returns true if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the value formatted for humans, or `None` if null.
    pub fn to_label(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Integer(i) => Some(i.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::Date(d) => d.format(DATE_FORMAT).ok(),
            Value::Timestamp(ts) => ts.format(&Rfc3339).ok(),
            Value::Key(k) => Some(k.to_string()),
            Value::Keys(ks) => {
                Some(ks.iter().map(Key::to_string).collect::<Vec<String>>().join(","))
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Date(d) => {
                let formatted = d.format(DATE_FORMAT).map_err(S::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            Value::Timestamp(ts) => {
                let formatted = ts.format(&Rfc3339).map_err(S::Error::custom)?;
                serializer.serialize_str(&formatted)
            }
            Value::Key(k) => k.serialize(serializer),
            Value::Keys(ks) => ks.serialize(serializer),
        }
    }
}

/// Collection of field values keyed by field name.
pub type Values = BTreeMap<&'static str, Value>;

/// A row of an entity as loaded from the database.
#[derive(Clone, Constructor, Debug, Getters, PartialEq)]
pub struct Record {
    /// Primary key of the row.
    key: Key,

    /// Values of all fields of the row, including the many-to-many ones.
    values: Values,
}

impl Record {
    /// Gets the value of the field `name`, which is null if the field is unknown.
    pub fn get(&self, name: &str) -> &Value {
        self.values.get(name).unwrap_or(&Value::Null)
    }

    /// Sets the value of the field `name`.
    pub fn set(&mut self, name: &'static str, value: Value) {
        self.values.insert(name, value);
    }

    /// Builds the human-readable label of this row as declared by its `schema`.
    pub fn label(&self, schema: &Schema) -> String {
        schema
            .label
            .iter()
            .filter_map(|name| self.get(name).to_label())
            .filter(|s| !s.is_empty())
            .collect::<Vec<String>>()
            .join(" ")
    }
}

/// The wire representation of a record: its `id` followed by all fields in declaration order.
#[derive(Debug)]
pub struct Representation {
    /// Definition of the entity the record belongs to.
    schema: &'static Schema,

    /// The record to represent.
    record: Record,
}

impl Representation {
    /// Creates the representation of `record`, which must belong to `schema`.
    pub fn new(schema: &'static Schema, record: Record) -> Self {
        Self { schema, record }
    }
}

impl Serialize for Representation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.schema.fields.len() + 1))?;
        map.serialize_entry("id", self.record.key())?;
        for field in self.schema.fields() {
            map.serialize_entry(field.name, self.record.get(field.name))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::schema::{Auto, Field, Order};
    use time::macros::{date, datetime};

    static PERSON: Schema = Schema {
        name: "person",
        path: "people",
        table: "people",
        key: KeyKind::Uuid,
        fields: &[
            Field::text("first_name", 100),
            Field::text("middle_name", 100).optional(),
            Field::text("last_name", 100),
            Field::date("born"),
            Field::float("height", None).optional(),
            Field::timestamp("created_at", Auto::OnCreate),
        ],
        unique_together: &[],
        ordering: &[Order::asc("last_name")],
        label: &["first_name", "middle_name", "last_name"],
        rules: &[],
    };

    fn person(middle_name: Value) -> Record {
        let mut values = Values::new();
        values.insert("first_name", Value::Text("Ada".to_owned()));
        values.insert("middle_name", middle_name);
        values.insert("last_name", Value::Text("Lovelace".to_owned()));
        values.insert("born", Value::Date(date!(1815 - 12 - 10)));
        values.insert("height", Value::Null);
        values.insert("created_at", Value::Timestamp(datetime!(2024-09-01 08:00:00.5 UTC)));
        let key = Key::Uuid(Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap());
        Record::new(key, values)
    }

    #[test]
    fn test_key_parse() {
        assert_eq!(Some(Key::Serial(15)), Key::parse(KeyKind::Serial, "15"));
        assert_eq!(None, Key::parse(KeyKind::Serial, "abc"));
        assert_eq!(None, Key::parse(KeyKind::Serial, "67e55044-10b1-426f-9247-bb680e5fe0c8"));

        let key = Key::parse(KeyKind::Uuid, "67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        assert_eq!(KeyKind::Uuid, key.kind());
        assert_eq!("67e55044-10b1-426f-9247-bb680e5fe0c8", key.to_string());
        assert_eq!(None, Key::parse(KeyKind::Uuid, "15"));
    }

    #[test]
    fn test_record_label() {
        assert_eq!("Ada Lovelace", person(Value::Null).label(&PERSON));
        assert_eq!("Ada Lovelace", person(Value::Text(String::new())).label(&PERSON));
        assert_eq!("Ada King Lovelace", person(Value::Text("King".to_owned())).label(&PERSON));
    }

    #[test]
    fn test_record_get_unknown_is_null() {
        assert!(person(Value::Null).get("unknown").is_null());
    }

    #[test]
    fn test_representation_serialization() {
        let repr = Representation::new(&PERSON, person(Value::Null));
        assert_eq!(
            concat!(
                r#"{"id":"67e55044-10b1-426f-9247-bb680e5fe0c8","first_name":"Ada","#,
                r#""middle_name":null,"last_name":"Lovelace","born":"1815-12-10","#,
                r#""height":null,"created_at":"2024-09-01T08:00:00.5Z"}"#,
            ),
            serde_json::to_string(&repr).unwrap()
        );
    }

    #[test]
    fn test_value_serialization() {
        assert_eq!("15", serde_json::to_string(&Value::Key(Key::Serial(15))).unwrap());
        let keys = Value::Keys(vec![Key::Serial(1), Key::Serial(2)]);
        assert_eq!("[1,2]", serde_json::to_string(&keys).unwrap());
        assert_eq!("9.5", serde_json::to_string(&Value::Float(9.5)).unwrap());
        assert_eq!("10.0", serde_json::to_string(&Value::Float(10.0)).unwrap());
    }
}
