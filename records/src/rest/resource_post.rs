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

//! API to create a new row of an entity.

use crate::driver::RecordsDriver;
use crate::model::Representation;
use crate::model::schema::Schema;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use registrar_core::rest::RestResult;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<RecordsDriver>,
    Extension(schema): Extension<&'static Schema>,
    Json(payload): Json<serde_json::Value>,
) -> RestResult<(StatusCode, Json<Representation>)> {
    let record = driver.create_record(schema, &payload).await?;
    Ok((StatusCode::CREATED, Json(Representation::new(schema, record))))
}
