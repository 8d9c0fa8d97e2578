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

//! Test utilities for the REST API.

use crate::driver::testutils::TestContext as DriverTestContext;
use crate::model::User;
use crate::rest::app;
use axum::Router;
use registrar_core::model::Username;

/// State of a running test.
pub(crate) struct TestContext {
    /// Driver-level test context that owns the database.
    inner: DriverTestContext,

    /// The router serving the API under test.
    app: Router,
}

impl TestContext {
    /// Sets up the test environment with an in-memory database.
    pub(crate) async fn setup() -> Self {
        let inner = DriverTestContext::setup().await;
        let app = Router::new().nest("/api/test", app(inner.driver()));
        Self { inner, app }
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Creates a user by directly modifying the backing database.
    pub(crate) async fn create_user(&self, username: &'static str, email: &'static str) -> User {
        self.inner.create_user(username, email).await
    }

    /// Checks if the user with `username` exists by directly querying the backing database.
    pub(crate) async fn user_exists(&self, username: &Username) -> bool {
        self.inner.user_exists(username).await
    }

    /// Releases the database connections held by the context.
    pub(crate) async fn close(self) {
        self.inner.close().await;
    }
}
