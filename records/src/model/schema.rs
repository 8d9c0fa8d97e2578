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

//! Declarative description of the entities managed by the service.
//!
//! Every entity is described by a static `Schema` that lists its fields in declaration order.
//! The persistence, validation and serialization layers are all driven by these descriptions, so
//! adding an entity only requires declaring its schema, its tables and registering it.

use std::fmt;
use std::ptr;

/// Kind of primary key used by an entity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyKind {
    /// Integer keys assigned by the database.
    Serial,

    /// Random UUIDs assigned by the service on creation.
    Uuid,
}

/// What to do with the rows that reference another row when the latter is deleted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OnDelete {
    /// Delete the referencing rows too.
    Cascade,

    /// Reject the deletion while references exist.
    Protect,

    /// Clear the reference.
    SetNull,
}

/// Policy for fields whose values are managed by the service instead of by clients.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Auto {
    /// The value comes from the client.
    Never,

    /// The value is set to the current time when the entity is created.
    OnCreate,

    /// The value is set to the current time whenever the entity is saved.
    OnSave,
}

/// Data type of a field, including the constraints that apply to its values.
#[derive(Clone, Copy, Debug)]
pub enum FieldKind {
    /// Single-line text of bounded length.
    Text {
        /// Maximum length in characters.
        max_length: usize,
    },

    /// Unbounded text.
    LongText,

    /// An email address of bounded length.
    Email {
        /// Maximum length in characters.
        max_length: usize,
    },

    /// An integer with optional inclusive bounds.
    Integer {
        /// Minimum allowed value.
        min: Option<i64>,

        /// Maximum allowed value.
        max: Option<i64>,
    },

    /// A floating point number with an optional inclusive lower bound.
    Float {
        /// Minimum allowed value.
        min: Option<f64>,
    },

    /// A calendar date.
    Date,

    /// A point in time.
    Timestamp,

    /// A reference to a single row of another entity.
    ForeignKey {
        /// The referenced entity.
        target: &'static Schema,

        /// Deletion policy for the referenced row.
        on_delete: OnDelete,
    },

    /// A set of references to rows of another entity, stored in a join table.
    ManyToMany {
        /// The referenced entity.
        target: &'static Schema,

        /// Name of the join table.
        through: &'static str,

        /// Column of the join table that references the owner of the field.
        source_column: &'static str,

        /// Column of the join table that references the `target`.
        target_column: &'static str,
    },
}

/// Definition of a single field of an entity.
#[derive(Clone, Copy, Debug)]
pub struct Field {
    /// Name of the field in the wire representation and of its database column.
    pub name: &'static str,

    /// Data type of the field.
    pub kind: FieldKind,

    /// Whether clients must provide a value on creation and full updates.
    pub required: bool,

    /// Whether the field accepts nulls.
    pub nullable: bool,

    /// Whether no two rows may share the same non-null value.
    pub unique: bool,

    /// Whether the value is managed by the service.
    pub auto: Auto,
}

impl Field {
    /// Creates a required field of the given `kind`.
    const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind, required: true, nullable: false, unique: false, auto: Auto::Never }
    }

    /// Creates a required single-line text field.
    pub const fn text(name: &'static str, max_length: usize) -> Self {
        Self::new(name, FieldKind::Text { max_length })
    }

    /// Creates a required long text field.
    pub const fn long_text(name: &'static str) -> Self {
        Self::new(name, FieldKind::LongText)
    }

    /// Creates a required email field.
    pub const fn email(name: &'static str) -> Self {
        Self::new(name, FieldKind::Email { max_length: 254 })
    }

    /// Creates a required integer field constrained to `min..=max`.
    pub const fn integer(name: &'static str, min: Option<i64>, max: Option<i64>) -> Self {
        Self::new(name, FieldKind::Integer { min, max })
    }

    /// Creates a required floating point field with a lower bound.
    pub const fn float(name: &'static str, min: Option<f64>) -> Self {
        Self::new(name, FieldKind::Float { min })
    }

    /// Creates a required date field.
    pub const fn date(name: &'static str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    /// Creates a timestamp field managed by the service according to `auto`.
    pub const fn timestamp(name: &'static str, auto: Auto) -> Self {
        Self { auto, ..Self::new(name, FieldKind::Timestamp) }
    }

    /// Creates a required reference to a row in `target`.
    pub const fn foreign_key(
        name: &'static str,
        target: &'static Schema,
        on_delete: OnDelete,
    ) -> Self {
        Self::new(name, FieldKind::ForeignKey { target, on_delete })
    }

    /// Creates an optional set of references to rows in `target` stored in the `through` table.
    pub const fn many_to_many(
        name: &'static str,
        target: &'static Schema,
        through: &'static str,
        source_column: &'static str,
        target_column: &'static str,
    ) -> Self {
        let kind = FieldKind::ManyToMany { target, through, source_column, target_column };
        Self { required: false, ..Self::new(name, kind) }
    }

    /// Marks the field as optional and nullable.
    pub const fn optional(self) -> Self {
        Self { required: false, nullable: true, ..self }
    }

    /// Marks the field as unique.
    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    /// Returns true if clients can provide a value for this field.
    pub fn is_writable(&self) -> bool {
        self.auto == Auto::Never
    }

    /// Returns true if the field is stored in the entity's own table.
    pub fn is_column(&self) -> bool {
        !matches!(self.kind, FieldKind::ManyToMany { .. })
    }

    /// Returns the human-readable name of the field for use in messages.
    pub fn verbose_name(&self) -> String {
        self.name.replace('_', " ")
    }
}

/// Sorting criteria for listings.
#[derive(Clone, Copy, Debug)]
pub struct Order {
    /// Name of the field to sort by, or `id` for the primary key.
    pub field: &'static str,

    /// Whether to sort in descending order.
    pub descending: bool,
}

impl Order {
    /// Sorts by `field` in ascending order.
    pub const fn asc(field: &'static str) -> Self {
        Self { field, descending: false }
    }

    /// Sorts by `field` in descending order.
    pub const fn desc(field: &'static str) -> Self {
        Self { field, descending: true }
    }
}

/// Cross-field validation rules evaluated before persisting a row.
#[derive(Clone, Copy, Debug)]
pub enum Rule {
    /// The numeric `field` may not exceed the `limit` field of the row referenced by `reference`.
    NotAboveReferenced {
        /// Name of the field to check.
        field: &'static str,

        /// Name of the foreign key field that points to the row holding the limit.
        reference: &'static str,

        /// Name of the integer field in the referenced row that holds the limit.
        limit: &'static str,
    },
}

/// Definition of an entity.
#[derive(Debug)]
pub struct Schema {
    /// Human-readable name of the entity, in lowercase.
    pub name: &'static str,

    /// URL path segment under which the entity is exposed.
    pub path: &'static str,

    /// Name of the database table that stores the entity.
    pub table: &'static str,

    /// Kind of the primary key, always stored in the `id` column.
    pub key: KeyKind,

    /// Fields of the entity in declaration order, excluding the primary key.
    pub fields: &'static [Field],

    /// Groups of fields whose combined values must be unique.
    pub unique_together: &'static [&'static [&'static str]],

    /// Default sorting for listings.  The primary key is always used as the last criteria.
    pub ordering: &'static [Order],

    /// Fields whose values, joined by spaces, make up the label of a row.
    pub label: &'static [&'static str],

    /// Cross-field validation rules.
    pub rules: &'static [Rule],
}

impl Schema {
    /// Looks up a field by `name`.
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter().find(|f| f.name == name)
    }

    /// Iterates over all fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &'static Field> {
        let fields: &'static [Field] = self.fields;
        fields.iter()
    }

    /// Iterates over the fields stored in the entity's own table.
    pub fn columns(&self) -> impl Iterator<Item = &'static Field> {
        self.fields().filter(|f| f.is_column())
    }

    /// Iterates over the fields stored in join tables.
    pub fn links(&self) -> impl Iterator<Item = &'static Field> {
        self.fields().filter(|f| !f.is_column())
    }

    /// Returns true if `self` and `other` describe the same entity.
    pub fn is(&self, other: &Schema) -> bool {
        ptr::eq(self, other)
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
