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
use crate::model::schema::{KeyKind, Schema};
use crate::rest::app;
use axum::Router;
use std::ops::Deref;

/// Returns identifiers that cannot match any row of `schema` in a fresh database: a well-formed
/// one and a malformed one.
pub(crate) fn missing_ids(schema: &Schema) -> [&'static str; 2] {
    match schema.key {
        KeyKind::Serial => ["999", "not-a-key"],
        KeyKind::Uuid => ["67e55044-10b1-426f-9247-bb680e5fe0c8", "not-a-key"],
    }
}

/// State of a running test.
///
/// Dereferences to the driver-level context to access its fixtures.
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
        let app = Router::new().nest("/api/v1", app(inner.driver()));
        Self { inner, app }
    }

    /// Iterates over all entities served by the app.
    pub(crate) fn schemas(&self) -> Vec<&'static Schema> {
        self.inner.driver().registry().schemas().collect()
    }

    /// Gets a clone of the app router.
    pub(crate) fn app(&self) -> Router {
        self.app.clone()
    }

    /// Consumes the context and returns the app router.
    pub(crate) fn into_app(self) -> Router {
        self.app
    }

    /// Releases the database connections held by the context.
    pub(crate) async fn close(self) {
        self.inner.close().await;
    }
}

impl Deref for TestContext {
    type Target = DriverTestContext;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
