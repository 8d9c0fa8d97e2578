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

//! The `Password` and `HashedPassword` data types.

use registrar_core::model::{ModelError, ModelResult};
use std::fmt;

/// Maximum length of a password.  bcrypt only looks at the first 72 bytes of its input, so we
/// reject longer passwords instead of silently ignoring part of them.
pub const MAX_PASSWORD_LENGTH: usize = 56;

/// Cost factor for bcrypt hashes.
const BCRYPT_COST: u32 = 10;

/// An opaque type to hold a password, protecting it from leaking into logs.
#[derive(PartialEq)]
#[cfg_attr(any(test, feature = "testutils"), derive(Clone))]
pub struct Password(String);

impl Password {
    /// Creates a new password from a literal string.
    pub fn new<S: Into<String>>(s: S) -> ModelResult<Self> {
        let s = s.into();
        if s.len() > MAX_PASSWORD_LENGTH {
            return Err(ModelError("Password is too long".to_owned()));
        }
        Ok(Password(s))
    }

    /// Checks that the password is sufficiently complex via the `validator` hook, which returns
    /// a description of the problem if there is one.
    pub fn validate(&self, validator: fn(&str) -> Option<&'static str>) -> ModelResult<()> {
        match validator(&self.0) {
            Some(error) => Err(ModelError(error.to_owned())),
            None => Ok(()),
        }
    }

    /// Hashes the password.  Consumes the password because there is no context in which keeping
    /// the password alive once we have generated its hash is correct.
    pub fn hash(self) -> ModelResult<HashedPassword> {
        let hashed = bcrypt::hash(self.0, BCRYPT_COST)
            .map_err(|e| ModelError(format!("Password error: {}", e)))?;
        Ok(HashedPassword::new(hashed))
    }
}

#[cfg(any(test, feature = "testutils"))]
impl From<&'static str> for Password {
    /// Creates a new password from a hardcoded string, which must be valid.
    fn from(s: &'static str) -> Self {
        Password::new(s).expect("Hardcoded passwords must be valid")
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed password")
    }
}

/// An opaque type to hold a hashed password, protecting it from leaking into logs.
#[derive(PartialEq)]
#[cfg_attr(any(test, feature = "testutils"), derive(Clone))]
pub struct HashedPassword(String);

impl HashedPassword {
    /// Creates a new hashed password from a literal string.
    pub fn new<S: Into<String>>(s: S) -> Self {
        HashedPassword(s.into())
    }

    /// Returns a string view of the hash.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("scrubbed hash")
    }
}
