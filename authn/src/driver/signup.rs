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

//! Extends the driver with the `signup` method.

use crate::db;
use crate::driver::AuthnDriver;
use crate::model::{MAX_PASSWORD_LENGTH, Password, User};
use log::info;
use registrar_core::db::{DbError, DbResult, TxExecutor};
use registrar_core::driver::{DriverError, DriverResult};
use registrar_core::model::{
    EmailAddress, FieldErrors, MAX_EMAIL_LENGTH, MAX_USERNAME_LENGTH, NON_FIELD_ERRORS, Username,
};

/// Raw registration data as submitted by a client.
///
/// All fields are optional so that missing values are reported together with any other problems
/// in the submission.
#[derive(Debug, Default)]
pub struct SignupForm {
    /// Desired username.
    pub username: Option<String>,

    /// Email address of the new user.
    pub email: Option<String>,

    /// Desired password, in the clear.
    pub password: Option<String>,
}

/// Verifies that a password is sufficiently complex.
fn password_validator(s: &str) -> Option<&'static str> {
    if s.chars().count() < 8 {
        return Some("This password is too short. It must contain at least 8 characters.");
    }

    let mut alphabetic = false;
    let mut numeric = false;
    for ch in s.chars() {
        if ch.is_alphabetic() {
            alphabetic = true;
        }
        if ch.is_numeric() {
            numeric = true;
        }
    }
    if !alphabetic || !numeric {
        return Some("This password must contain both letters and numbers.");
    }

    None
}

/// Checks the presence and length of a raw text `value` for `field`, recording problems in
/// `errors`.
fn check_text(
    field: &'static str,
    value: Option<String>,
    max_length: usize,
    errors: &mut FieldErrors,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, "This field is required.");
            None
        }
        Some(value) if value.trim().is_empty() => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(value) if value.chars().count() > max_length => {
            errors.add(
                field,
                format!("Ensure this field has no more than {} characters.", max_length),
            );
            None
        }
        Some(value) => Some(value),
    }
}

/// Records an error in `field` if looking up an account with `lookup` found one.
fn check_unused(
    lookup: DbResult<User>,
    field: &'static str,
    message: &'static str,
    errors: &mut FieldErrors,
) -> DriverResult<()> {
    match lookup {
        Ok(_) => {
            errors.add(field, message);
            Ok(())
        }
        Err(DbError::NotFound) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

impl AuthnDriver {
    /// Validates the fields of a submission and checks that the requested identifiers are free,
    /// returning the parsed values.
    async fn validate_signup(
        tx: &mut TxExecutor,
        form: SignupForm,
    ) -> DriverResult<(Username, EmailAddress, Password)> {
        let mut errors = FieldErrors::default();

        let username =
            check_text("username", form.username, MAX_USERNAME_LENGTH, &mut errors).and_then(|s| {
                match Username::new(s) {
                    Ok(username) => Some(username),
                    Err(_) => {
                        errors.add(
                            "username",
                            "Enter a valid username. This value may contain only letters, \
                            numbers, and @/./+/-/_ characters.",
                        );
                        None
                    }
                }
            });

        let email =
            check_text("email", form.email, MAX_EMAIL_LENGTH, &mut errors).and_then(|s| {
                match EmailAddress::new(s) {
                    Ok(email) => Some(email),
                    Err(_) => {
                        errors.add("email", "Enter a valid email address.");
                        None
                    }
                }
            });

        let password =
            check_text("password", form.password, MAX_PASSWORD_LENGTH, &mut errors).and_then(|s| {
                let password = Password::new(s).and_then(|p| {
                    p.validate(password_validator)?;
                    Ok(p)
                });
                match password {
                    Ok(password) => Some(password),
                    Err(e) => {
                        errors.add("password", e.to_string());
                        None
                    }
                }
            });

        if let Some(username) = &username {
            let lookup = db::get_user_by_username(tx.ex(), username).await;
            let message = "A user with that username already exists.";
            check_unused(lookup, "username", message, &mut errors)?;
        }
        if let Some(email) = &email {
            let lookup = db::get_user_by_email(tx.ex(), email).await;
            check_unused(lookup, "email", "A user with that email already exists.", &mut errors)?;
        }

        match (username, email, password) {
            (Some(username), Some(email), Some(password)) if errors.is_empty() => {
                Ok((username, email, password))
            }
            _ => Err(DriverError::InvalidFields(errors)),
        }
    }

    /// Creates a new account for a user.
    pub async fn signup(self, form: SignupForm) -> DriverResult<User> {
        let mut tx = self.db.begin().await?;

        let (username, email, password) = Self::validate_signup(&mut tx, form).await?;
        let password =
            password.hash().map_err(|e| FieldErrors::single("password", e.to_string()))?;

        let user = User::new(username, email, password, self.clock.now_utc());
        match db::create_user(tx.ex(), &user).await {
            Ok(()) => (),
            Err(DbError::AlreadyExists) => {
                return Err(DriverError::InvalidFields(FieldErrors::single(
                    NON_FIELD_ERRORS,
                    "A user with that username or email already exists.",
                )));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        info!("Registered new user {}", user.username().as_str());
        Ok(user)
    }
}
