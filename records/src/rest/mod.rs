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

//! REST interface for the school records.

use crate::driver::RecordsDriver;
use axum::{Extension, Router};

mod resource_delete;
mod resource_get;
mod resource_list_get;
mod resource_patch;
mod resource_post;
mod resource_put;
#[cfg(test)]
mod testutils;

/// Creates the router for the application.
///
/// Every entity known to the `driver` gets a collection route and an item route under its path.
/// The handlers are shared by all entities and learn which one they serve from the `Schema`
/// attached to each route as an extension.
pub fn app(driver: RecordsDriver) -> Router {
    use axum::routing::get;

    let mut router = Router::new();
    for schema in driver.registry().schemas() {
        let collection = get(resource_list_get::handler)
            .post(resource_post::handler)
            .layer(Extension(schema));
        let item = get(resource_get::handler)
            .put(resource_put::handler)
            .patch(resource_patch::handler)
            .delete(resource_delete::handler)
            .layer(Extension(schema));
        router = router
            .route(&format!("/{}", schema.path), collection)
            .route(&format!("/{}/:id", schema.path), item);
    }
    router.with_state(driver)
}
