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

//! Extends the driver with the operations to manipulate the rows of any entity.

use crate::db;
use crate::driver::serializer::{self, Mode};
use crate::driver::{RecordsDriver, validation};
use crate::model::schema::{Auto, KeyKind, Schema};
use crate::model::{Key, Record, Value, Values};
use log::info;
use registrar_core::db::{DbError, Executor};
use registrar_core::driver::{DriverError, DriverResult};
use time::OffsetDateTime;
use uuid::Uuid;

/// Builds the error returned when a row of `schema` cannot be found.
fn not_found(schema: &Schema) -> DriverError {
    DriverError::NotFound(format!("No {} matches the given query.", schema.name))
}

/// Parses the `raw` key of a row of `schema` as provided in a URL.
///
/// Malformed keys cannot match any row, so they are reported as not found.
fn parse_key(schema: &Schema, raw: &str) -> DriverResult<Key> {
    Key::parse(schema.key, raw).ok_or_else(|| not_found(schema))
}

/// Gets the row of `schema` identified by `key`, reporting missing rows in terms of the entity.
async fn fetch(ex: &mut Executor, schema: &Schema, key: &Key) -> DriverResult<Record> {
    match db::get_record(ex, schema, key).await {
        Ok(record) => Ok(record),
        Err(DbError::NotFound) => Err(not_found(schema)),
        Err(e) => Err(e.into()),
    }
}

/// Sets the timestamps managed by the service in `values` to `now`.
fn stamp(schema: &Schema, values: &mut Values, now: OffsetDateTime, creating: bool) {
    for field in schema.fields() {
        let set = match field.auto {
            Auto::Never => false,
            Auto::OnCreate => creating,
            Auto::OnSave => true,
        };
        if set {
            values.insert(field.name, Value::Timestamp(now));
        }
    }
}

/// Replaces the links of the row `key` for all many-to-many fields present in `values`.
async fn store_links(
    ex: &mut Executor,
    schema: &Schema,
    key: &Key,
    values: &Values,
) -> DriverResult<()> {
    for field in schema.links() {
        if let Some(Value::Keys(targets)) = values.get(field.name) {
            db::set_links(ex, field, key, targets).await?;
        }
    }
    Ok(())
}

impl RecordsDriver {
    /// Gets all rows of `schema` in their default order.
    pub(crate) async fn list_records(self, schema: &Schema) -> DriverResult<Vec<Record>> {
        let records = db::list_records(&mut self.db.ex().await?, schema).await?;
        Ok(records)
    }

    /// Gets the row of `schema` identified by the `raw_key`.
    pub(crate) async fn get_record(self, schema: &Schema, raw_key: &str) -> DriverResult<Record> {
        let key = parse_key(schema, raw_key)?;
        fetch(&mut self.db.ex().await?, schema, &key).await
    }

    /// Creates a new row of `schema` from the client-provided `payload`.
    pub(crate) async fn create_record(
        self,
        schema: &Schema,
        payload: &serde_json::Value,
    ) -> DriverResult<Record> {
        let mut values = serializer::parse(schema, payload, Mode::Create)?;

        let mut tx = self.db.begin().await?;
        validation::validate(tx.ex(), &self.registry, schema, None, &values).await?;

        stamp(schema, &mut values, self.clock.now_utc(), true);
        let key = match schema.key {
            KeyKind::Serial => None,
            KeyKind::Uuid => Some(Key::Uuid(Uuid::new_v4())),
        };
        let key = db::insert_record(tx.ex(), schema, key.as_ref(), &values)
            .await
            .map_err(|e| DriverError::from(e).into_field_errors())?;
        store_links(tx.ex(), schema, &key, &values).await?;

        let record = db::get_record(tx.ex(), schema, &key).await?;
        tx.commit().await?;
        info!("Created {} {} ({})", schema.name, key, record.label(schema));
        Ok(record)
    }

    /// Updates the row of `schema` identified by the `raw_key` with the client-provided
    /// `payload`.
    ///
    /// If `partial` is true, only the fields present in the `payload` are modified.  Otherwise,
    /// the `payload` must carry all required fields, and optional fields it omits keep their
    /// current values.
    pub(crate) async fn update_record(
        self,
        schema: &Schema,
        raw_key: &str,
        payload: &serde_json::Value,
        partial: bool,
    ) -> DriverResult<Record> {
        let key = parse_key(schema, raw_key)?;

        let mut tx = self.db.begin().await?;
        let existing = fetch(tx.ex(), schema, &key).await?;

        let mode = if partial { Mode::Partial } else { Mode::Replace };
        let mut values = serializer::parse(schema, payload, mode)?;
        validation::validate(tx.ex(), &self.registry, schema, Some(&existing), &values).await?;

        stamp(schema, &mut values, self.clock.now_utc(), false);
        db::update_record(tx.ex(), schema, &key, &values)
            .await
            .map_err(|e| DriverError::from(e).into_field_errors())?;
        store_links(tx.ex(), schema, &key, &values).await?;

        let record = db::get_record(tx.ex(), schema, &key).await?;
        tx.commit().await?;
        info!("Updated {} {} ({})", schema.name, key, record.label(schema));
        Ok(record)
    }

    /// Deletes the row of `schema` identified by the `raw_key`.
    ///
    /// The deletion is rejected if any other row that protects its references points to it.
    /// Otherwise, the rows that reference it are deleted or detached as declared by their fields.
    pub(crate) async fn delete_record(self, schema: &Schema, raw_key: &str) -> DriverResult<()> {
        let key = parse_key(schema, raw_key)?;

        let mut tx = self.db.begin().await?;
        let existing = fetch(tx.ex(), schema, &key).await?;

        let value = Value::Key(key);
        for (referrer, field) in self.registry.protected_references(schema) {
            let count = db::count_matching(tx.ex(), referrer, &[(field, &value)], None).await?;
            if count > 0 {
                return Err(DriverError::Conflict(format!(
                    "Cannot delete {} {} because it is still referenced by {} {}",
                    schema.name,
                    existing.label(schema),
                    count,
                    referrer.table
                )));
            }
        }

        match db::delete_record(tx.ex(), schema, &key).await {
            Ok(()) => (),
            Err(DbError::NotFound) => return Err(not_found(schema)),
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        info!("Deleted {} {} ({})", schema.name, key, existing.label(schema));
        Ok(())
    }
}
