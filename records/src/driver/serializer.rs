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

//! Parsing and validation of the payloads sent by clients to write entities.
//!
//! This only performs the checks that can be done without looking at the database: types,
//! required-ness and bounds.  All problems are collected before returning so that clients get
//! a complete error report in a single response.

use crate::model::schema::{Field, FieldKind, KeyKind, Schema};
use crate::model::{DATE_FORMAT, Key, Value, Values};
use registrar_core::model::{EmailAddress, FieldErrors, NON_FIELD_ERRORS};
use serde_json::Value as Json;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Returns the name of the type of a JSON `value` as reported in error messages.
fn type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "NoneType",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}

/// Parses a text value, trimming surrounding whitespace.
fn parse_text(raw: &Json, allow_blank: bool, max_length: Option<usize>) -> Result<String, String> {
    let s = match raw {
        Json::String(s) => s.trim().to_owned(),
        Json::Number(n) => n.to_string(),
        _ => return Err("Not a valid string.".to_owned()),
    };
    if s.is_empty() && !allow_blank {
        return Err("This field may not be blank.".to_owned());
    }
    if let Some(max_length) = max_length
        && s.chars().count() > max_length
    {
        return Err(format!("Ensure this field has no more than {} characters.", max_length));
    }
    Ok(s)
}

/// Parses an email address, normalizing it in the same way the rest of the system does.
fn parse_email(raw: &Json, allow_blank: bool, max_length: usize) -> Result<String, String> {
    let s = parse_text(raw, allow_blank, Some(max_length))?;
    if s.is_empty() {
        return Ok(s);
    }
    match EmailAddress::new(s) {
        Ok(email) => Ok(email.as_str().to_owned()),
        Err(_) => Err("Enter a valid email address.".to_owned()),
    }
}

/// Parses an integer value, accepting numeric strings and integral floats.
fn parse_integer(raw: &Json) -> Result<i64, String> {
    let invalid = || "A valid integer is required.".to_owned();
    match raw {
        Json::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => Ok(i),
            (None, Some(f)) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Ok(f as i64)
            }
            _ => Err(invalid()),
        },
        Json::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Parses a finite floating point value, accepting numeric strings.
fn parse_float(raw: &Json) -> Result<f64, String> {
    let invalid = || "A valid number is required.".to_owned();
    let f = match raw {
        Json::Number(n) => n.as_f64().ok_or_else(invalid)?,
        Json::String(s) => s.trim().parse::<f64>().map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };
    if !f.is_finite() {
        return Err(invalid());
    }
    Ok(f)
}

/// Checks that `value` is within the inclusive `min` and `max` bounds.
fn check_bounds<T: PartialOrd + ToString>(
    value: T,
    min: Option<T>,
    max: Option<T>,
) -> Result<T, String> {
    if let Some(min) = min
        && value < min
    {
        return Err(format!("Ensure this value is greater than or equal to {}.", min.to_string()));
    }
    if let Some(max) = max
        && value > max
    {
        return Err(format!("Ensure this value is less than or equal to {}.", max.to_string()));
    }
    Ok(value)
}

/// Parses a date in `YYYY-MM-DD` format.
fn parse_date(raw: &Json) -> Result<Date, String> {
    let invalid =
        || "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.".to_owned();
    match raw {
        Json::String(s) => Date::parse(s.trim(), DATE_FORMAT).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Parses an RFC 3339 timestamp.
fn parse_timestamp(raw: &Json) -> Result<OffsetDateTime, String> {
    let invalid = || {
        "Datetime has wrong format. Use one of these formats instead: \
            YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z]."
            .to_owned()
    };
    match raw {
        Json::String(s) => OffsetDateTime::parse(s.trim(), &Rfc3339).map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

/// Parses a reference to a row whose keys are of `kind`.
fn parse_pk(kind: KeyKind, raw: &Json) -> Result<Key, String> {
    let incorrect_type =
        || format!("Incorrect type. Expected pk value, received {}.", type_name(raw));
    match (kind, raw) {
        (KeyKind::Serial, Json::Number(n)) => {
            n.as_i64().map(Key::Serial).ok_or_else(incorrect_type)
        }
        (KeyKind::Serial, Json::String(s)) => {
            s.trim().parse::<i64>().map(Key::Serial).map_err(|_| incorrect_type())
        }
        (KeyKind::Uuid, Json::String(s)) => Uuid::parse_str(s.trim())
            .map(Key::Uuid)
            .map_err(|_| format!("\"{}\" is not a valid UUID.", s)),
        _ => Err(incorrect_type()),
    }
}

/// Parses a list of references to rows whose keys are of `kind`, dropping duplicates.
fn parse_pk_list(kind: KeyKind, raw: &Json) -> Result<Vec<Key>, String> {
    let Json::Array(items) = raw else {
        return Err(format!("Expected a list of items but got type \"{}\".", type_name(raw)));
    };
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let key = parse_pk(kind, item)?;
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    Ok(keys)
}

/// Parses the `raw` value provided by a client for `field`.
fn parse_field(field: &Field, raw: &Json) -> Result<Value, String> {
    if raw.is_null() {
        if field.nullable {
            return Ok(Value::Null);
        }
        return Err("This field may not be null.".to_owned());
    }

    let allow_blank = !field.required;
    match field.kind {
        FieldKind::Text { max_length } => {
            parse_text(raw, allow_blank, Some(max_length)).map(Value::Text)
        }
        FieldKind::LongText => parse_text(raw, allow_blank, None).map(Value::Text),
        FieldKind::Email { max_length } => {
            parse_email(raw, allow_blank, max_length).map(Value::Text)
        }
        FieldKind::Integer { min, max } => {
            parse_integer(raw).and_then(|i| check_bounds(i, min, max)).map(Value::Integer)
        }
        FieldKind::Float { min } => {
            parse_float(raw).and_then(|f| check_bounds(f, min, None)).map(Value::Float)
        }
        FieldKind::Date => parse_date(raw).map(Value::Date),
        FieldKind::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        FieldKind::ForeignKey { target, .. } => parse_pk(target.key, raw).map(Value::Key),
        FieldKind::ManyToMany { target, .. } => parse_pk_list(target.key, raw).map(Value::Keys),
    }
}

/// How a payload relates to the row it writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Mode {
    /// The payload describes a new row.  Optional fields not present take their default values.
    Create,

    /// The payload replaces an existing row.  Required fields must be present but optional
    /// fields not present keep their current values.
    Replace,

    /// The payload modifies some fields of an existing row.
    Partial,
}

/// Parses the `payload` sent by a client to write a row of `schema` in the given `mode`.
///
/// Only the fields to write are returned.  Fields managed by the service and unknown fields are
/// ignored.
pub(crate) fn parse(schema: &Schema, payload: &Json, mode: Mode) -> Result<Values, FieldErrors> {
    let Json::Object(data) = payload else {
        return Err(FieldErrors::single(
            NON_FIELD_ERRORS,
            format!("Invalid data. Expected a dictionary, but got {}.", type_name(payload)),
        ));
    };

    let mut values = Values::new();
    let mut errors = FieldErrors::default();
    for field in schema.fields().filter(|f| f.is_writable()) {
        match data.get(field.name) {
            None if mode == Mode::Partial => (),
            None if field.required => errors.add(field.name, "This field is required."),
            None if mode == Mode::Replace => (),
            None => {
                let default = match field.kind {
                    FieldKind::ManyToMany { .. } => Value::Keys(vec![]),
                    _ => Value::Null,
                };
                values.insert(field.name, default);
            }
            Some(raw) => match parse_field(field, raw) {
                Ok(value) => {
                    values.insert(field.name, value);
                }
                Err(message) => errors.add(field.name, message),
            },
        }
    }

    errors.into_result()?;
    Ok(values)
}
