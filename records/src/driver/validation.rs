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

//! Validation of writes that requires looking at the database.
//!
//! Checks run in two stages.  Field-level checks (references and single-field uniqueness) are
//! evaluated first, and only if they all pass are the entity-level checks (uniqueness of field
//! groups and cross-field rules) evaluated against the state the row would have after the write.
//! Rules are also checked in reverse: changing a limit must not leave the rows that reference it
//! above the new value.

use crate::db;
use crate::model::schema::{FieldKind, Rule, Schema};
use crate::model::{Key, Record, Registry, Value, Values};
use registrar_core::db::Executor;
use registrar_core::driver::{DriverError, DriverResult};
use registrar_core::model::{FieldErrors, NON_FIELD_ERRORS};

/// Formats the error for a reference to a missing row identified by `key`.
fn missing_reference(key: &Key) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", key)
}

/// Checks the references and the single-field uniqueness of the written `values`.
async fn validate_fields(
    ex: &mut Executor,
    schema: &Schema,
    exclude: Option<&Key>,
    values: &Values,
) -> DriverResult<FieldErrors> {
    let mut errors = FieldErrors::default();
    for (name, value) in values {
        let Some(field) = schema.field(name) else {
            continue;
        };

        match (field.kind, value) {
            (FieldKind::ForeignKey { target, .. }, Value::Key(key)) => {
                if !db::record_exists(ex, target, key).await? {
                    errors.add(field.name, missing_reference(key));
                }
            }
            (FieldKind::ManyToMany { target, .. }, Value::Keys(keys)) => {
                for key in keys {
                    if !db::record_exists(ex, target, key).await? {
                        errors.add(field.name, missing_reference(key));
                        break;
                    }
                }
            }
            _ => (),
        }

        if field.unique
            && !value.is_null()
            && !errors.contains(field.name)
            && db::count_matching(ex, schema, &[(field, value)], exclude).await? > 0
        {
            errors.add(
                field.name,
                format!("{} with this {} already exists.", schema.name, field.verbose_name()),
            );
        }
    }
    Ok(errors)
}

/// Checks that the combinations of values declared unique by `schema` are not in use by other
/// rows.
async fn validate_unique_together(
    ex: &mut Executor,
    schema: &Schema,
    exclude: Option<&Key>,
    merged: &Values,
    errors: &mut FieldErrors,
) -> DriverResult<()> {
    for group in schema.unique_together {
        let mut criteria = Vec::with_capacity(group.len());
        for name in group.iter() {
            match (schema.field(name), merged.get(name)) {
                (Some(field), Some(value)) if !value.is_null() => criteria.push((field, value)),
                _ => break,
            }
        }
        if criteria.len() != group.len() {
            continue;
        }

        if db::count_matching(ex, schema, &criteria, exclude).await? > 0 {
            errors.add(
                NON_FIELD_ERRORS,
                format!("The fields {} must make a unique set.", group.join(", ")),
            );
        }
    }
    Ok(())
}

/// Evaluates the cross-field `rules` of `schema` against the `merged` state of a row.
async fn validate_rules(
    ex: &mut Executor,
    schema: &Schema,
    merged: &Values,
    errors: &mut FieldErrors,
) -> DriverResult<()> {
    for rule in schema.rules {
        match rule {
            Rule::NotAboveReferenced { field, reference, limit } => {
                let Some(Value::Float(value)) = merged.get(field) else {
                    continue;
                };
                let (Some(Value::Key(key)), Some(reference_field)) =
                    (merged.get(reference), schema.field(reference))
                else {
                    continue;
                };
                let FieldKind::ForeignKey { target, .. } = reference_field.kind else {
                    return Err(DriverError::BackendError(format!(
                        "Field {} of {} is not a reference",
                        reference, schema.name
                    )));
                };
                let Some(limit_field) = target.field(limit) else {
                    return Err(DriverError::BackendError(format!(
                        "Unknown field {} in {}",
                        limit, target.name
                    )));
                };

                let referenced = db::get_record(ex, target, key).await?;
                if let Value::Integer(max) = referenced.get(limit)
                    && *value > *max as f64
                {
                    errors.add(
                        *field,
                        format!(
                            "Ensure this value is less than or equal to the {} of the {} ({}).",
                            limit_field.verbose_name(),
                            target.name,
                            max
                        ),
                    );
                }
            }
        }
    }
    Ok(())
}

/// Evaluates the rules of other entities that take their limits from the row `key` of `schema`,
/// checking that the rows referencing it stay within any limit changed by `values`.
async fn validate_referencing_rules(
    ex: &mut Executor,
    registry: &Registry,
    schema: &Schema,
    key: &Key,
    values: &Values,
    errors: &mut FieldErrors,
) -> DriverResult<()> {
    for referrer in registry.schemas() {
        for rule in referrer.rules {
            match rule {
                Rule::NotAboveReferenced { field, reference, limit } => {
                    let Some(Value::Integer(new_limit)) = values.get(limit) else {
                        continue;
                    };
                    let (Some(checked_field), Some(reference_field)) =
                        (referrer.field(field), referrer.field(reference))
                    else {
                        continue;
                    };
                    let FieldKind::ForeignKey { target, .. } = reference_field.kind else {
                        continue;
                    };
                    if !target.is(schema) {
                        continue;
                    }

                    let owner = Value::Key(*key);
                    let criteria = [(reference_field, &owner)];
                    if let Some(max) =
                        db::max_matching(ex, referrer, checked_field, &criteria).await?
                        && max > *new_limit as f64
                    {
                        errors.add(
                            *limit,
                            format!(
                                "Ensure this value is greater than or equal to the highest {} \
                                 of its {}s ({}).",
                                checked_field.verbose_name(),
                                referrer.name,
                                max
                            ),
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

/// Validates writing `values` into a row of `schema`.
///
/// `existing` is the current state of the row for updates and `None` for creations.  The
/// `values` must have already been parsed and only need to contain the fields being written.
pub(crate) async fn validate(
    ex: &mut Executor,
    registry: &Registry,
    schema: &Schema,
    existing: Option<&Record>,
    values: &Values,
) -> DriverResult<()> {
    let exclude = existing.map(Record::key);

    let errors = validate_fields(ex, schema, exclude, values).await?;
    if !errors.is_empty() {
        return Err(DriverError::InvalidFields(errors));
    }

    let mut merged = match existing {
        Some(record) => record.values().clone(),
        None => Values::new(),
    };
    merged.extend(values.iter().map(|(name, value)| (*name, value.clone())));

    let mut errors = FieldErrors::default();
    validate_unique_together(ex, schema, exclude, &merged, &mut errors).await?;
    validate_rules(ex, schema, &merged, &mut errors).await?;
    if let Some(key) = exclude {
        validate_referencing_rules(ex, registry, schema, key, values, &mut errors).await?;
    }
    errors.into_result()?;
    Ok(())
}
