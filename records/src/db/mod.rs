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

//! Database abstraction to manipulate the rows of any entity.
//!
//! All operations are generic over the entity `Schema`: the SQL statements are generated from the
//! schema by the `sql` module and the conversions between values and rows are handled by the
//! `codec` module.

use crate::model::schema::{Field, FieldKind, Schema};
use crate::model::{Key, Record, Value, Values};
use codec::Param;
#[cfg(feature = "postgres")]
use codec::{bind_pg, pg_required_key, record_from_pg_row};
#[cfg(any(feature = "sqlite", test))]
use codec::{bind_sqlite, record_from_sqlite_row, sqlite_required_key};
#[cfg(feature = "postgres")]
use registrar_core::db::postgres;
#[cfg(any(feature = "sqlite", test))]
use registrar_core::db::sqlite;
use registrar_core::db::{DbError, DbResult, Executor};
use sql::Dialect;
use sqlx::Row;
use std::collections::HashMap;

mod codec;
mod sql;
#[cfg(test)]
mod tests;

/// Initializes the database schema.
pub async fn init_schema(ex: &mut Executor) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => postgres::run_schema(ex, include_str!("postgres.sql")).await,

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => sqlite::run_schema(ex, include_str!("sqlite.sql")).await,

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Computes the fields and parameters to store `values` in the table of `schema`.
///
/// Values for unknown fields and for many-to-many fields are ignored.
fn value_params(
    dialect: Dialect,
    schema: &Schema,
    values: &Values,
) -> DbResult<(Vec<&'static Field>, Vec<Param>)> {
    let mut fields = vec![];
    let mut params = vec![];
    for field in schema.columns() {
        if let Some(value) = values.get(field.name) {
            fields.push(field);
            params.extend(codec::field_params(dialect, field, value)?);
        }
    }
    Ok((fields, params))
}

/// Builds the error returned when a many-to-many operation is requested on another `field`.
fn not_many_to_many(field: &Field) -> DbError {
    DbError::BackendError(format!("Field {} is not a many-to-many", field.name))
}

/// Fetches the `(owner, target)` pairs of the many-to-many `field` of `schema`, optionally
/// restricted to a single `owner`.
async fn get_links(
    ex: &mut Executor,
    schema: &Schema,
    field: &Field,
    owner: Option<&Key>,
) -> DbResult<Vec<(Key, Key)>> {
    let FieldKind::ManyToMany { target: target_schema, .. } = field.kind else {
        return Err(not_many_to_many(field));
    };

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = sql::select_links(Dialect::Postgres, field, owner.is_some())
                .ok_or_else(|| not_many_to_many(field))?;
            let params = match owner {
                Some(key) => codec::key_param(Dialect::Postgres, key)?,
                None => vec![],
            };
            let rows = bind_pg(sqlx::query(&query_str), params)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            let mut links = Vec::with_capacity(rows.len());
            for row in rows {
                let source = pg_required_key(&row, "source", schema.key)?;
                let target = pg_required_key(&row, "target", target_schema.key)?;
                links.push((source, target));
            }
            Ok(links)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = sql::select_links(Dialect::Sqlite, field, owner.is_some())
                .ok_or_else(|| not_many_to_many(field))?;
            let params = match owner {
                Some(key) => codec::key_param(Dialect::Sqlite, key)?,
                None => vec![],
            };
            let rows = bind_sqlite(sqlx::query(&query_str), params)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            let mut links = Vec::with_capacity(rows.len());
            for row in rows {
                let source = sqlite_required_key(&row, "source", schema.key)?;
                let target = sqlite_required_key(&row, "target", target_schema.key)?;
                links.push((source, target));
            }
            Ok(links)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Populates the many-to-many fields of `records`, which must all belong to `schema`.
///
/// If `owner` is provided, only the links of that row are fetched.
async fn attach_links(
    ex: &mut Executor,
    schema: &Schema,
    records: &mut [Record],
    owner: Option<&Key>,
) -> DbResult<()> {
    for field in schema.links() {
        let mut by_owner: HashMap<Key, Vec<Key>> = HashMap::new();
        for (source, target) in get_links(ex, schema, field, owner).await? {
            by_owner.entry(source).or_default().push(target);
        }
        for record in records.iter_mut() {
            let targets = by_owner.remove(record.key()).unwrap_or_default();
            record.set(field.name, Value::Keys(targets));
        }
    }
    Ok(())
}

/// Gets all rows of `schema` in their default order.
pub async fn list_records(ex: &mut Executor, schema: &Schema) -> DbResult<Vec<Record>> {
    let mut records = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = sql::select_all(Dialect::Postgres, schema);
            let rows = sqlx::query(&query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            rows.iter().map(|row| record_from_pg_row(schema, row)).collect::<DbResult<Vec<_>>>()?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = sql::select_all(Dialect::Sqlite, schema);
            let rows = sqlx::query(&query_str)
                .fetch_all(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            rows.iter()
                .map(|row| record_from_sqlite_row(schema, row))
                .collect::<DbResult<Vec<_>>>()?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    attach_links(ex, schema, &mut records, None).await?;
    Ok(records)
}

/// Gets the row of `schema` identified by `key`.
pub async fn get_record(ex: &mut Executor, schema: &Schema, key: &Key) -> DbResult<Record> {
    let record = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = sql::select_one(Dialect::Postgres, schema);
            let row = bind_pg(sqlx::query(&query_str), codec::key_param(Dialect::Postgres, key)?)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            record_from_pg_row(schema, &row)?
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = sql::select_one(Dialect::Sqlite, schema);
            let row = bind_sqlite(sqlx::query(&query_str), codec::key_param(Dialect::Sqlite, key)?)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            record_from_sqlite_row(schema, &row)?
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let mut records = [record];
    attach_links(ex, schema, &mut records, Some(key)).await?;
    let [record] = records;
    Ok(record)
}

/// Checks if the row of `schema` identified by `key` exists.
pub async fn record_exists(ex: &mut Executor, schema: &Schema, key: &Key) -> DbResult<bool> {
    let row = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = sql::select_one(Dialect::Postgres, schema);
            bind_pg(sqlx::query(&query_str), codec::key_param(Dialect::Postgres, key)?)
                .fetch_optional(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?
                .map(|_| ())
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = sql::select_one(Dialect::Sqlite, schema);
            bind_sqlite(sqlx::query(&query_str), codec::key_param(Dialect::Sqlite, key)?)
                .fetch_optional(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?
                .map(|_| ())
        }

        #[allow(unused)]
        _ => unreachable!(),
    };
    Ok(row.is_some())
}

/// Inserts a new row into `schema` with the given `values` and returns its key.
///
/// The `key` must be provided for entities whose keys are assigned by the service and must be
/// missing for entities whose keys are assigned by the database.  Many-to-many values are
/// ignored: use `set_links` to store them.
pub async fn insert_record(
    ex: &mut Executor,
    schema: &Schema,
    key: Option<&Key>,
    values: &Values,
) -> DbResult<Key> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let (fields, value_params) = value_params(Dialect::Postgres, schema, values)?;
            let mut params = match key {
                Some(key) => codec::key_param(Dialect::Postgres, key)?,
                None => vec![],
            };
            params.extend(value_params);

            let query_str = sql::insert(Dialect::Postgres, schema, &fields, key.is_some());
            let row = bind_pg(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            pg_required_key(&row, sql::KEY_COLUMN, schema.key)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (fields, value_params) = value_params(Dialect::Sqlite, schema, values)?;
            let mut params = match key {
                Some(key) => codec::key_param(Dialect::Sqlite, key)?,
                None => vec![],
            };
            params.extend(value_params);

            let query_str = sql::insert(Dialect::Sqlite, schema, &fields, key.is_some());
            let row = bind_sqlite(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            sqlite_required_key(&row, sql::KEY_COLUMN, schema.key)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Updates the row of `schema` identified by `key` with the given `values`, leaving any fields
/// not present in `values` untouched.  Many-to-many values are ignored: use `set_links` to store
/// them.
pub async fn update_record(
    ex: &mut Executor,
    schema: &Schema,
    key: &Key,
    values: &Values,
) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let (fields, mut params) = value_params(Dialect::Postgres, schema, values)?;
            if fields.is_empty() {
                None
            } else {
                params.extend(codec::key_param(Dialect::Postgres, key)?);
                let query_str = sql::update(Dialect::Postgres, schema, &fields);
                let done = bind_pg(sqlx::query(&query_str), params)
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?;
                Some(done.rows_affected())
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let (fields, mut params) = value_params(Dialect::Sqlite, schema, values)?;
            if fields.is_empty() {
                None
            } else {
                params.extend(codec::key_param(Dialect::Sqlite, key)?);
                let query_str = sql::update(Dialect::Sqlite, schema, &fields);
                let done = bind_sqlite(sqlx::query(&query_str), params)
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?;
                Some(done.rows_affected())
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    let rows_affected = match rows_affected {
        Some(rows_affected) => rows_affected,
        None => u64::from(record_exists(ex, schema, key).await?),
    };
    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Update affected more than one row".to_owned())),
    }
}

/// Deletes the row of `schema` identified by `key`.
///
/// Rows that reference the deleted one are handled by the database according to their deletion
/// policies, so callers must check for protected references beforehand.
pub async fn delete_record(ex: &mut Executor, schema: &Schema, key: &Key) -> DbResult<()> {
    let rows_affected = match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let query_str = sql::delete(Dialect::Postgres, schema);
            let done = bind_pg(sqlx::query(&query_str), codec::key_param(Dialect::Postgres, key)?)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            done.rows_affected()
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let query_str = sql::delete(Dialect::Sqlite, schema);
            let done = bind_sqlite(sqlx::query(&query_str), codec::key_param(Dialect::Sqlite, key)?)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            done.rows_affected()
        }

        #[allow(unused)]
        _ => unreachable!(),
    };

    match rows_affected {
        0 => Err(DbError::NotFound),
        1 => Ok(()),
        _ => Err(DbError::BackendError("Deletion affected more than one row".to_owned())),
    }
}

/// Replaces the targets of the many-to-many `field` for the row identified by `owner`.
pub async fn set_links(
    ex: &mut Executor,
    field: &Field,
    owner: &Key,
    targets: &[Key],
) -> DbResult<()> {
    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let delete_str =
                sql::delete_links(Dialect::Postgres, field).ok_or_else(|| not_many_to_many(field))?;
            let insert_str =
                sql::insert_link(Dialect::Postgres, field).ok_or_else(|| not_many_to_many(field))?;
            bind_pg(sqlx::query(&delete_str), codec::key_param(Dialect::Postgres, owner)?)
                .execute(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            for target in targets {
                let mut params = codec::key_param(Dialect::Postgres, owner)?;
                params.extend(codec::key_param(Dialect::Postgres, target)?);
                bind_pg(sqlx::query(&insert_str), params)
                    .execute(ex.conn())
                    .await
                    .map_err(postgres::map_sqlx_error)?;
            }
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let delete_str =
                sql::delete_links(Dialect::Sqlite, field).ok_or_else(|| not_many_to_many(field))?;
            let insert_str =
                sql::insert_link(Dialect::Sqlite, field).ok_or_else(|| not_many_to_many(field))?;
            bind_sqlite(sqlx::query(&delete_str), codec::key_param(Dialect::Sqlite, owner)?)
                .execute(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            for target in targets {
                let mut params = codec::key_param(Dialect::Sqlite, owner)?;
                params.extend(codec::key_param(Dialect::Sqlite, target)?);
                bind_sqlite(sqlx::query(&insert_str), params)
                    .execute(ex.conn())
                    .await
                    .map_err(sqlite::map_sqlx_error)?;
            }
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
    Ok(())
}

/// Counts the rows of `schema` whose fields match all of the given `criteria`, ignoring the row
/// identified by `exclude` if provided.
///
/// Null values never match anything, so criteria with nulls should not be passed in.
pub async fn count_matching(
    ex: &mut Executor,
    schema: &Schema,
    criteria: &[(&'static Field, &Value)],
    exclude: Option<&Key>,
) -> DbResult<i64> {
    let fields = criteria.iter().map(|(f, _)| *f).collect::<Vec<&Field>>();

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut params = vec![];
            for (field, value) in criteria {
                params.extend(codec::field_params(Dialect::Postgres, field, value)?);
            }
            if let Some(key) = exclude {
                params.extend(codec::key_param(Dialect::Postgres, key)?);
            }

            let query_str =
                sql::count_matching(Dialect::Postgres, schema, &fields, exclude.is_some());
            let row = bind_pg(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("count").map_err(postgres::map_sqlx_error)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut params = vec![];
            for (field, value) in criteria {
                params.extend(codec::field_params(Dialect::Sqlite, field, value)?);
            }
            if let Some(key) = exclude {
                params.extend(codec::key_param(Dialect::Sqlite, key)?);
            }

            let query_str =
                sql::count_matching(Dialect::Sqlite, schema, &fields, exclude.is_some());
            let row = bind_sqlite(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("count").map_err(sqlite::map_sqlx_error)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}

/// Computes the maximum value of the floating point `field` across the rows of `schema` whose
/// fields match all of the given `criteria`.  Returns `None` if no rows match.
pub async fn max_matching(
    ex: &mut Executor,
    schema: &Schema,
    field: &Field,
    criteria: &[(&'static Field, &Value)],
) -> DbResult<Option<f64>> {
    let fields = criteria.iter().map(|(f, _)| *f).collect::<Vec<&Field>>();

    match ex {
        #[cfg(feature = "postgres")]
        Executor::Postgres(ex) => {
            let mut params = vec![];
            for (field, value) in criteria {
                params.extend(codec::field_params(Dialect::Postgres, field, value)?);
            }

            let query_str = sql::max_matching(Dialect::Postgres, schema, field, &fields);
            let row = bind_pg(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(postgres::map_sqlx_error)?;
            row.try_get("max").map_err(postgres::map_sqlx_error)
        }

        #[cfg(any(feature = "sqlite", test))]
        Executor::Sqlite(ex) => {
            let mut params = vec![];
            for (field, value) in criteria {
                params.extend(codec::field_params(Dialect::Sqlite, field, value)?);
            }

            let query_str = sql::max_matching(Dialect::Sqlite, schema, field, &fields);
            let row = bind_sqlite(sqlx::query(&query_str), params)
                .fetch_one(ex.conn())
                .await
                .map_err(sqlite::map_sqlx_error)?;
            row.try_get("max").map_err(sqlite::map_sqlx_error)
        }

        #[allow(unused)]
        _ => unreachable!(),
    }
}
