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

//! Generation of the SQL statements used to manipulate entities.

use crate::model::schema::{Field, FieldKind, Schema};

/// Name of the primary key column in all tables.
pub(crate) const KEY_COLUMN: &str = "id";

/// SQL dialects supported by the generator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Dialect {
    /// PostgreSQL, which has native timestamps and numbered placeholders.
    Postgres,

    /// SQLite, where timestamps are stored as a pair of seconds and nanoseconds columns.
    Sqlite,
}

impl Dialect {
    /// Returns the placeholder for the parameter at 1-based position `n`.
    fn placeholder(self, n: usize) -> String {
        match self {
            Dialect::Postgres => format!("${}", n),
            Dialect::Sqlite => "?".to_owned(),
        }
    }

    /// Returns the columns that store `field`, which are none for many-to-many fields.
    pub(crate) fn columns(self, field: &Field) -> Vec<String> {
        match (self, field.kind) {
            (_, FieldKind::ManyToMany { .. }) => vec![],
            (Dialect::Sqlite, FieldKind::Timestamp) => {
                vec![format!("{}_secs", field.name), format!("{}_nsecs", field.name)]
            }
            _ => vec![field.name.to_owned()],
        }
    }
}

/// Builds a list of `column = placeholder` conditions starting at parameter `first`.
fn assignments(dialect: Dialect, columns: &[String], first: usize, separator: &str) -> String {
    columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", c, dialect.placeholder(first + i)))
        .collect::<Vec<String>>()
        .join(separator)
}

/// Builds the `ORDER BY` clause for listings of `schema`.
fn order_by(dialect: Dialect, schema: &Schema) -> String {
    let mut terms = vec![];
    let mut has_key = false;
    for order in schema.ordering {
        let direction = if order.descending { "DESC" } else { "ASC" };
        let columns = match schema.field(order.field) {
            Some(field) => dialect.columns(field),
            None => {
                has_key |= order.field == KEY_COLUMN;
                vec![order.field.to_owned()]
            }
        };
        for column in columns {
            terms.push(format!("{} {}", column, direction));
        }
    }
    if !has_key {
        terms.push(format!("{} ASC", KEY_COLUMN));
    }
    terms.join(", ")
}

/// Query to fetch all rows of `schema` in their default order.
pub(crate) fn select_all(dialect: Dialect, schema: &Schema) -> String {
    format!("SELECT * FROM {} ORDER BY {}", schema.table, order_by(dialect, schema))
}

/// Query to fetch a single row of `schema` given its key as the only parameter.
pub(crate) fn select_one(dialect: Dialect, schema: &Schema) -> String {
    format!("SELECT * FROM {} WHERE {} = {}", schema.table, KEY_COLUMN, dialect.placeholder(1))
}

/// Query to insert a row into `schema` setting the given `fields`, plus the key if `with_key` is
/// true.  The key must be the first parameter.  Returns the key of the new row.
pub(crate) fn insert(
    dialect: Dialect,
    schema: &Schema,
    fields: &[&Field],
    with_key: bool,
) -> String {
    let mut columns = vec![];
    if with_key {
        columns.push(KEY_COLUMN.to_owned());
    }
    for field in fields {
        columns.extend(dialect.columns(field));
    }

    if columns.is_empty() {
        return format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", schema.table, KEY_COLUMN);
    }

    let placeholders =
        (1..=columns.len()).map(|i| dialect.placeholder(i)).collect::<Vec<String>>().join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        schema.table,
        columns.join(", "),
        placeholders,
        KEY_COLUMN
    )
}

/// Query to update the given `fields` of a row of `schema`.  The key is the last parameter.
pub(crate) fn update(dialect: Dialect, schema: &Schema, fields: &[&Field]) -> String {
    let columns = fields.iter().flat_map(|f| dialect.columns(f)).collect::<Vec<String>>();
    format!(
        "UPDATE {} SET {} WHERE {} = {}",
        schema.table,
        assignments(dialect, &columns, 1, ", "),
        KEY_COLUMN,
        dialect.placeholder(columns.len() + 1)
    )
}

/// Query to delete a row of `schema` given its key as the only parameter.
pub(crate) fn delete(dialect: Dialect, schema: &Schema) -> String {
    format!("DELETE FROM {} WHERE {} = {}", schema.table, KEY_COLUMN, dialect.placeholder(1))
}

/// Query to count the rows of `schema` whose `fields` match the given parameters.  If `exclude`
/// is true, the key of a row to ignore must be passed as the last parameter.
pub(crate) fn count_matching(
    dialect: Dialect,
    schema: &Schema,
    fields: &[&Field],
    exclude: bool,
) -> String {
    let columns = fields.iter().flat_map(|f| dialect.columns(f)).collect::<Vec<String>>();
    let mut query = format!("SELECT COUNT(*) AS count FROM {}", schema.table);
    if !columns.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&assignments(dialect, &columns, 1, " AND "));
    }
    if exclude {
        query.push_str(if columns.is_empty() { " WHERE " } else { " AND " });
        query.push_str(&format!("{} <> {}", KEY_COLUMN, dialect.placeholder(columns.len() + 1)));
    }
    query
}

/// Query to compute the maximum value of the single-column `field` across the rows of `schema`
/// whose `filters` match.  Returns null when no rows match.
pub(crate) fn max_matching(
    dialect: Dialect,
    schema: &Schema,
    field: &Field,
    filters: &[&Field],
) -> String {
    let columns = filters.iter().flat_map(|f| dialect.columns(f)).collect::<Vec<String>>();
    let mut query = format!("SELECT MAX({}) AS max FROM {}", field.name, schema.table);
    if !columns.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&assignments(dialect, &columns, 1, " AND "));
    }
    query
}

/// Query to fetch the `(source, target)` pairs stored for the many-to-many `field`, restricted
/// to a single owner passed as the only parameter if `filtered` is true.
pub(crate) fn select_links(dialect: Dialect, field: &Field, filtered: bool) -> Option<String> {
    let FieldKind::ManyToMany { through, source_column, target_column, .. } = field.kind else {
        return None;
    };
    let filter = if filtered {
        format!(" WHERE {} = {}", source_column, dialect.placeholder(1))
    } else {
        String::new()
    };
    Some(format!(
        "SELECT {} AS source, {} AS target FROM {}{} ORDER BY {}, {}",
        source_column, target_column, through, filter, source_column, target_column
    ))
}

/// Query to delete all pairs stored for the many-to-many `field` for the owner passed as the
/// only parameter.
pub(crate) fn delete_links(dialect: Dialect, field: &Field) -> Option<String> {
    let FieldKind::ManyToMany { through, source_column, .. } = field.kind else {
        return None;
    };
    Some(format!("DELETE FROM {} WHERE {} = {}", through, source_column, dialect.placeholder(1)))
}

/// Query to store a `(source, target)` pair for the many-to-many `field`.
pub(crate) fn insert_link(dialect: Dialect, field: &Field) -> Option<String> {
    let FieldKind::ManyToMany { through, source_column, target_column, .. } = field.kind else {
        return None;
    };
    Some(format!(
        "INSERT INTO {} ({}, {}) VALUES ({}, {})",
        through,
        source_column,
        target_column,
        dialect.placeholder(1),
        dialect.placeholder(2)
    ))
}
