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

//! API to get a single row of an entity.

use crate::driver::RecordsDriver;
use crate::model::Representation;
use crate::model::schema::Schema;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use registrar_core::rest::{EmptyBody, RestResult};

/// API handler.
pub(crate) async fn handler(
    State(driver): State<RecordsDriver>,
    Extension(schema): Extension<&'static Schema>,
    Path(id): Path<String>,
    _: EmptyBody,
) -> RestResult<Json<Representation>> {
    let record = driver.get_record(schema, &id).await?;
    Ok(Json(Representation::new(schema, record)))
}

#[cfg(test)]
mod tests {
    use crate::model::academics::STUDENT;
    use crate::rest::testutils::*;
    use axum::http;
    use registrar_core::rest::testutils::*;
    use registrar_core::test_payload_must_be_empty;
    use serde_json::{Value, json};

    fn route(path: &str, id: &str) -> (http::Method, String) {
        (http::Method::GET, format!("/api/v1/{}/{}", path, id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let course = context.course("BSCS").await;
        let subject1 = context.subject(course, "CS101").await;
        let subject2 = context.subject(course, "CS102").await;
        let student = context.student("juan@example.com", Some(course)).await;

        let payload = json!({"subjects": [subject2, subject1]});
        let raw_key = student.to_string();
        context.driver().update_record(&STUDENT, &raw_key, &payload, true).await.unwrap();

        let response = OneShotBuilder::new(context.app(), route("students", &raw_key))
            .send_empty()
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(
            json!({
                "id": student.to_string(),
                "first_name": "Juan",
                "middle_name": null,
                "last_name": "Dela Cruz",
                "email": "juan@example.com",
                "student_number": null,
                "date_of_birth": "2005-03-07",
                "profile_image": null,
                "course": course,
                "year_level": null,
                "section": null,
                "subjects": [subject1, subject2],
                "created_at": "2024-09-01T08:00:00Z",
                "updated_at": "2024-09-01T08:00:00Z",
            }),
            response
        );

        context.close().await;
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;
        context.course("BSCS").await;

        for schema in context.schemas() {
            for id in missing_ids(schema) {
                OneShotBuilder::new(context.app(), route(schema.path, id))
                    .send_empty()
                    .await
                    .expect_status(http::StatusCode::NOT_FOUND)
                    .expect_error(&format!("No {} matches the given query", schema.name))
                    .await;
            }
        }

        context.close().await;
    }

    test_payload_must_be_empty!(TestContext::setup().await.into_app(), route("courses", "1"));
}
