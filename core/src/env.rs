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

//! Utilities to read the configuration of the services from environment variables.
//!
//! Every setting lives in a variable named `<prefix>_<suffix>`, where the prefix groups related
//! settings (such as `PGSQL_PROD` for the production database) and the suffix names the setting.

use std::env;

/// Result type for environment errors.
type Result<T> = std::result::Result<T, String>;

/// Raw contents of an environment variable, pending conversion to the type of the setting.
pub struct Value(String);

impl TryFrom<Value> for String {
    type Error = String;

    fn try_from(value: Value) -> Result<Self> {
        Ok(value.0)
    }
}

/// Generates a `TryFrom<Value>` for a numeric type.
macro_rules! tryfrom_value_for_number [
    ( $t:ty ) => {
        impl TryFrom<Value> for $t {
            type Error = String;

            fn try_from(value: Value) -> Result<Self> {
                let raw = value.0.trim();
                raw.parse::<$t>().map_err(|e| format!("Invalid {}: {}", stringify!($t), e))
            }
        }
    }
];

tryfrom_value_for_number!(u16);
tryfrom_value_for_number!(u32);

/// Reads the variable `name` and converts it to `T` if it is set.
fn lookup<T: TryFrom<Value, Error = String>>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => T::try_from(Value(raw))
            .map(Some)
            .map_err(|e| format!("Invalid type in environment variable {}: {}", name, e)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(format!("Invalid value in environment variable {}", name))
        }
    }
}

/// Gets the mandatory setting `<prefix>_<suffix>` converted to `T`.
pub fn get_required_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<T> {
    let name = format!("{}_{}", prefix, suffix);
    lookup(&name)?.ok_or_else(|| format!("Required environment variable {} not present", name))
}

/// Gets the setting `<prefix>_<suffix>` converted to `T`, or `None` if it is not set.
pub fn get_optional_var<T: TryFrom<Value, Error = String>>(
    prefix: &str,
    suffix: &str,
) -> Result<Option<T>> {
    lookup(&format!("{}_{}", prefix, suffix))
}
