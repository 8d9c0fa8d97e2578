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

//! Conversions between field values and database parameters and rows.

use crate::db::sql::{Dialect, KEY_COLUMN};
use crate::model::schema::{Field, FieldKind, KeyKind, Schema};
use crate::model::{DATE_FORMAT, Key, Record, Value, Values};
#[cfg(feature = "postgres")]
use registrar_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use registrar_core::db::sqlite::{self, build_timestamp, unpack_timestamp};
use registrar_core::db::{DbError, DbResult};
use sqlx::Row;
#[cfg(feature = "postgres")]
use sqlx::postgres::{PgArguments, PgRow, Postgres};
use sqlx::query::Query;
#[cfg(any(feature = "sqlite", test))]
use sqlx::sqlite::{Sqlite, SqliteArguments, SqliteRow};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// A typed query parameter.
///
/// Nulls carry their type because PostgreSQL needs to know it.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Param {
    /// A text parameter.
    Text(Option<String>),

    /// An integer parameter.
    Integer(Option<i64>),

    /// A floating point parameter.
    Float(Option<f64>),

    /// A date parameter.
    Date(Option<Date>),

    /// A timestamp parameter.
    Timestamp(Option<OffsetDateTime>),

    /// A UUID parameter.
    Uuid(Option<Uuid>),
}

/// Returns the parameters to match a key of `kind` against, or null if `key` is missing.
fn key_params(dialect: Dialect, kind: KeyKind, key: Option<&Key>) -> DbResult<Vec<Param>> {
    let param = match (dialect, kind, key) {
        (_, KeyKind::Serial, None) => Param::Integer(None),
        (_, KeyKind::Serial, Some(Key::Serial(id))) => Param::Integer(Some(*id)),
        (Dialect::Postgres, KeyKind::Uuid, None) => Param::Uuid(None),
        (Dialect::Postgres, KeyKind::Uuid, Some(Key::Uuid(id))) => Param::Uuid(Some(*id)),
        (Dialect::Sqlite, KeyKind::Uuid, None) => Param::Text(None),
        (Dialect::Sqlite, KeyKind::Uuid, Some(Key::Uuid(id))) => {
            Param::Text(Some(id.hyphenated().to_string()))
        }
        (_, kind, Some(key)) => {
            return Err(DbError::BackendError(format!("Key {} is not of kind {:?}", key, kind)));
        }
    };
    Ok(vec![param])
}

/// Returns the parameters that identify `key`.
pub(crate) fn key_param(dialect: Dialect, key: &Key) -> DbResult<Vec<Param>> {
    key_params(dialect, key.kind(), Some(key))
}

/// Returns the parameters that store `value` in the columns of `field`.
pub(crate) fn field_params(dialect: Dialect, field: &Field, value: &Value) -> DbResult<Vec<Param>> {
    let params = match (field.kind, value) {
        (FieldKind::ForeignKey { target, .. }, Value::Null) => {
            return key_params(dialect, target.key, None);
        }
        (FieldKind::ForeignKey { target, .. }, Value::Key(key)) => {
            return key_params(dialect, target.key, Some(key));
        }

        (FieldKind::Text { .. } | FieldKind::LongText | FieldKind::Email { .. }, Value::Null) => {
            vec![Param::Text(None)]
        }
        (
            FieldKind::Text { .. } | FieldKind::LongText | FieldKind::Email { .. },
            Value::Text(s),
        ) => {
            vec![Param::Text(Some(s.clone()))]
        }

        (FieldKind::Integer { .. }, Value::Null) => vec![Param::Integer(None)],
        (FieldKind::Integer { .. }, Value::Integer(i)) => vec![Param::Integer(Some(*i))],

        (FieldKind::Float { .. }, Value::Null) => vec![Param::Float(None)],
        (FieldKind::Float { .. }, Value::Float(f)) => vec![Param::Float(Some(*f))],

        (FieldKind::Date, Value::Null) => match dialect {
            Dialect::Postgres => vec![Param::Date(None)],
            Dialect::Sqlite => vec![Param::Text(None)],
        },
        (FieldKind::Date, Value::Date(d)) => match dialect {
            Dialect::Postgres => vec![Param::Date(Some(*d))],
            Dialect::Sqlite => {
                let formatted =
                    d.format(DATE_FORMAT).map_err(|e| DbError::BackendError(e.to_string()))?;
                vec![Param::Text(Some(formatted))]
            }
        },

        (FieldKind::Timestamp, Value::Null) => match dialect {
            Dialect::Postgres => vec![Param::Timestamp(None)],
            Dialect::Sqlite => vec![Param::Integer(None), Param::Integer(None)],
        },
        (FieldKind::Timestamp, Value::Timestamp(ts)) => match dialect {
            Dialect::Postgres => vec![Param::Timestamp(Some(*ts))],
            #[cfg(any(feature = "sqlite", test))]
            Dialect::Sqlite => {
                let (secs, nsecs) = unpack_timestamp(*ts)?;
                vec![Param::Integer(Some(secs)), Param::Integer(Some(nsecs))]
            }
            #[cfg(not(any(feature = "sqlite", test)))]
            Dialect::Sqlite => unreachable!("SQLite support not compiled in"),
        },

        (kind, value) => {
            return Err(DbError::BackendError(format!(
                "Value {:?} cannot be stored in field {} of kind {:?}",
                value, field.name, kind
            )));
        }
    };
    Ok(params)
}

/// Binds all `params` to a PostgreSQL `query`.
#[cfg(feature = "postgres")]
pub(crate) fn bind_pg<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: Vec<Param>,
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            Param::Text(v) => query.bind(v),
            Param::Integer(v) => query.bind(v),
            Param::Float(v) => query.bind(v),
            Param::Date(v) => query.bind(v),
            Param::Timestamp(v) => query.bind(v),
            Param::Uuid(v) => query.bind(v),
        };
    }
    query
}

/// Binds all `params` to a SQLite `query`.
#[cfg(any(feature = "sqlite", test))]
pub(crate) fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: Vec<Param>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            Param::Text(v) => query.bind(v),
            Param::Integer(v) => query.bind(v),
            Param::Float(v) => query.bind(v),
            Param::Date(v) => query.bind(v),
            Param::Timestamp(v) => query.bind(v),
            Param::Uuid(v) => query.bind(v),
        };
    }
    query
}

/// Parses a date stored as text.
#[cfg(any(feature = "sqlite", test))]
fn parse_date(name: &str, raw: &str) -> DbResult<Date> {
    Date::parse(raw, DATE_FORMAT)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid date in {}: {}", name, e)))
}

/// Parses a UUID stored as text.
#[cfg(any(feature = "sqlite", test))]
fn parse_uuid(name: &str, raw: &str) -> DbResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| DbError::DataIntegrityError(format!("Invalid UUID in {}: {}", name, e)))
}

/// Extracts the key of kind `kind` stored in `column` of a PostgreSQL `row`.
#[cfg(feature = "postgres")]
fn pg_key(row: &PgRow, column: &str, kind: KeyKind) -> DbResult<Option<Key>> {
    let key = match kind {
        KeyKind::Serial => {
            let id: Option<i64> = row.try_get(column).map_err(postgres::map_sqlx_error)?;
            id.map(Key::Serial)
        }
        KeyKind::Uuid => {
            let id: Option<Uuid> = row.try_get(column).map_err(postgres::map_sqlx_error)?;
            id.map(Key::Uuid)
        }
    };
    Ok(key)
}

/// Extracts the key of kind `kind` stored in `column` of a SQLite `row`.
#[cfg(any(feature = "sqlite", test))]
fn sqlite_key(row: &SqliteRow, column: &str, kind: KeyKind) -> DbResult<Option<Key>> {
    let key = match kind {
        KeyKind::Serial => {
            let id: Option<i64> = row.try_get(column).map_err(sqlite::map_sqlx_error)?;
            id.map(Key::Serial)
        }
        KeyKind::Uuid => {
            let id: Option<String> = row.try_get(column).map_err(sqlite::map_sqlx_error)?;
            match id {
                Some(id) => Some(Key::Uuid(parse_uuid(column, &id)?)),
                None => None,
            }
        }
    };
    Ok(key)
}

/// Extracts a required key from a PostgreSQL `row`.
#[cfg(feature = "postgres")]
pub(crate) fn pg_required_key(row: &PgRow, column: &str, kind: KeyKind) -> DbResult<Key> {
    pg_key(row, column, kind)?
        .ok_or_else(|| DbError::DataIntegrityError(format!("Null key in column {}", column)))
}

/// Extracts a required key from a SQLite `row`.
#[cfg(any(feature = "sqlite", test))]
pub(crate) fn sqlite_required_key(row: &SqliteRow, column: &str, kind: KeyKind) -> DbResult<Key> {
    sqlite_key(row, column, kind)?
        .ok_or_else(|| DbError::DataIntegrityError(format!("Null key in column {}", column)))
}

/// Converts an optional value into a `Value`, mapping missing values to nulls.
fn or_null<T>(value: Option<T>, f: impl FnOnce(T) -> Value) -> Value {
    value.map(f).unwrap_or(Value::Null)
}

/// Converts a PostgreSQL `row` into a record of `schema`, without its many-to-many fields.
#[cfg(feature = "postgres")]
pub(crate) fn record_from_pg_row(schema: &Schema, row: &PgRow) -> DbResult<Record> {
    let key = pg_required_key(row, KEY_COLUMN, schema.key)?;

    let mut values = Values::new();
    for field in schema.columns() {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Text { .. } | FieldKind::LongText | FieldKind::Email { .. } => {
                let v: Option<String> = row.try_get(name).map_err(postgres::map_sqlx_error)?;
                or_null(v, Value::Text)
            }
            FieldKind::Integer { .. } => {
                let v: Option<i64> = row.try_get(name).map_err(postgres::map_sqlx_error)?;
                or_null(v, Value::Integer)
            }
            FieldKind::Float { .. } => {
                let v: Option<f64> = row.try_get(name).map_err(postgres::map_sqlx_error)?;
                or_null(v, Value::Float)
            }
            FieldKind::Date => {
                let v: Option<Date> = row.try_get(name).map_err(postgres::map_sqlx_error)?;
                or_null(v, Value::Date)
            }
            FieldKind::Timestamp => {
                let v: Option<OffsetDateTime> =
                    row.try_get(name).map_err(postgres::map_sqlx_error)?;
                or_null(v, Value::Timestamp)
            }
            FieldKind::ForeignKey { target, .. } => {
                or_null(pg_key(row, name, target.key)?, Value::Key)
            }
            FieldKind::ManyToMany { .. } => continue,
        };
        values.insert(name, value);
    }

    Ok(Record::new(key, values))
}

/// Converts a SQLite `row` into a record of `schema`, without its many-to-many fields.
#[cfg(any(feature = "sqlite", test))]
pub(crate) fn record_from_sqlite_row(schema: &Schema, row: &SqliteRow) -> DbResult<Record> {
    let key = sqlite_required_key(row, KEY_COLUMN, schema.key)?;

    let mut values = Values::new();
    for field in schema.columns() {
        let name = field.name;
        let value = match field.kind {
            FieldKind::Text { .. } | FieldKind::LongText | FieldKind::Email { .. } => {
                let v: Option<String> = row.try_get(name).map_err(sqlite::map_sqlx_error)?;
                or_null(v, Value::Text)
            }
            FieldKind::Integer { .. } => {
                let v: Option<i64> = row.try_get(name).map_err(sqlite::map_sqlx_error)?;
                or_null(v, Value::Integer)
            }
            FieldKind::Float { .. } => {
                let v: Option<f64> = row.try_get(name).map_err(sqlite::map_sqlx_error)?;
                or_null(v, Value::Float)
            }
            FieldKind::Date => {
                let v: Option<String> = row.try_get(name).map_err(sqlite::map_sqlx_error)?;
                match v {
                    Some(raw) => Value::Date(parse_date(name, &raw)?),
                    None => Value::Null,
                }
            }
            FieldKind::Timestamp => {
                let secs_column = format!("{}_secs", name);
                let nsecs_column = format!("{}_nsecs", name);
                let secs: Option<i64> =
                    row.try_get(secs_column.as_str()).map_err(sqlite::map_sqlx_error)?;
                let nsecs: Option<i64> =
                    row.try_get(nsecs_column.as_str()).map_err(sqlite::map_sqlx_error)?;
                match (secs, nsecs) {
                    (Some(secs), Some(nsecs)) => Value::Timestamp(build_timestamp(secs, nsecs)?),
                    _ => Value::Null,
                }
            }
            FieldKind::ForeignKey { target, .. } => {
                or_null(sqlite_key(row, name, target.key)?, Value::Key)
            }
            FieldKind::ManyToMany { .. } => continue,
        };
        values.insert(name, value);
    }

    Ok(Record::new(key, values))
}
