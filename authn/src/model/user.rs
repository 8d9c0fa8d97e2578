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

//! The `User` data type.

use crate::model::HashedPassword;
use registrar_core::model::{EmailAddress, Username};
use time::OffsetDateTime;

/// Representation of a registered account.
#[derive(Debug, PartialEq)]
pub struct User {
    /// Name of the user.
    username: Username,

    /// Email of the user.
    email: EmailAddress,

    /// Hashed password.
    password: HashedPassword,

    /// Time when the account was created.
    date_joined: OffsetDateTime,
}

impl User {
    /// Creates a new user with the given fields.
    pub(crate) fn new(
        username: Username,
        email: EmailAddress,
        password: HashedPassword,
        date_joined: OffsetDateTime,
    ) -> Self {
        Self { username, email, password, date_joined }
    }

    /// Gets the user's username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Gets the user's email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Gets the user's password as a hash.
    pub fn password(&self) -> &HashedPassword {
        &self.password
    }

    /// Gets the time when the user registered.
    pub fn date_joined(&self) -> OffsetDateTime {
        self.date_joined
    }
}
