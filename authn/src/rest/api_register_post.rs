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

//! API to create a new user account.

use crate::driver::{AuthnDriver, SignupForm};
use crate::model::User;
use axum::Json;
use axum::extract::State;
use http::StatusCode;
use registrar_core::model::{FieldErrors, NON_FIELD_ERRORS};
use registrar_core::rest::{RestError, RestResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;

/// Public representation of a registered user.
#[derive(Debug, Deserialize, PartialEq, Serialize)]
pub struct UserResponse {
    /// Name of the user.
    pub username: String,

    /// Email address of the user.
    pub email: String,

    /// Registration time in RFC 3339 format.
    pub date_joined: String,
}

impl TryFrom<User> for UserResponse {
    type Error = RestError;

    fn try_from(user: User) -> RestResult<Self> {
        let date_joined = user
            .date_joined()
            .format(&Rfc3339)
            .map_err(|e| RestError::InternalError(e.to_string()))?;
        Ok(Self {
            username: user.username().as_str().to_owned(),
            email: user.email().as_str().to_owned(),
            date_joined,
        })
    }
}

/// Message returned by the server after creating an account.
#[derive(Debug, Deserialize, Serialize)]
pub struct RegisterResponse {
    /// The newly-created account.
    pub user: UserResponse,
}

/// Extracts the optional text field `name` from `payload`, recording type errors in `errors`.
fn text_field(
    payload: &serde_json::Map<String, Value>,
    name: &'static str,
    errors: &mut FieldErrors,
) -> Option<String> {
    match payload.get(name) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(_) => {
            errors.add(name, "Not a valid string.");
            None
        }
    }
}

/// Converts the raw JSON `payload` into a registration form.
fn parse_form(payload: Value) -> Result<SignupForm, FieldErrors> {
    let Value::Object(payload) = payload else {
        return Err(FieldErrors::single(
            NON_FIELD_ERRORS,
            "Invalid data. Expected a dictionary, but got a different type.",
        ));
    };

    let mut errors = FieldErrors::default();
    let form = SignupForm {
        username: text_field(&payload, "username", &mut errors),
        email: text_field(&payload, "email", &mut errors),
        password: text_field(&payload, "password", &mut errors),
    };
    errors.into_result()?;
    Ok(form)
}

/// POST handler for this API.
pub(crate) async fn handler(
    State(driver): State<AuthnDriver>,
    Json(payload): Json<Value>,
) -> RestResult<(StatusCode, Json<RegisterResponse>)> {
    let form = parse_form(payload)?;
    let user = driver.signup(form).await?;
    let response = RegisterResponse { user: UserResponse::try_from(user)? };
    Ok((StatusCode::CREATED, Json(response)))
}
