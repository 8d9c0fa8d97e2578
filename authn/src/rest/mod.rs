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

//! REST interface for account registration.

use crate::driver::AuthnDriver;
use axum::Router;

mod api_register_post;
pub use api_register_post::{RegisterResponse, UserResponse};
#[cfg(test)]
mod testutils;

/// Creates the router for the registration endpoints.
///
/// The `driver` is a configured instance of the `AuthnDriver` to handle accounts.
pub fn app(driver: AuthnDriver) -> Router {
    use axum::routing::post;

    Router::new().route("/register", post(api_register_post::handler)).with_state(driver)
}
