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

//! API to replace all fields of a row of an entity.

use crate::driver::RecordsDriver;
use crate::model::Representation;
use crate::model::schema::Schema;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use registrar_core::rest::RestResult;

/// API handler.
pub(crate) async fn handler(
    State(driver): State<RecordsDriver>,
    Extension(schema): Extension<&'static Schema>,
    Path(id): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> RestResult<Json<Representation>> {
    let record = driver.update_record(schema, &id, &payload, false).await?;
    Ok(Json(Representation::new(schema, record)))
}

#[cfg(test)]
mod tests {
    use crate::model::Value as FieldValue;
    use crate::model::academics::{STUDENT, TEACHER};
    use crate::rest::testutils::*;
    use axum::http;
    use registrar_core::rest::testutils::*;
    use registrar_core::test_payload_must_be_json;
    use serde_json::{Value, json};
    use std::time::Duration;

    fn route(path: &str, id: &str) -> (http::Method, String) {
        (http::Method::PUT, format!("/api/v1/{}/{}", path, id))
    }

    #[tokio::test]
    async fn test_ok() {
        let context = TestContext::setup().await;
        let teacher = context.teacher("maria@example.com").await;
        context.advance(Duration::from_secs(3600));

        let response = OneShotBuilder::new(context.app(), route("teachers", &teacher.to_string()))
            .send_json(json!({
                "first_name": "Maria",
                "last_name": "Reyes",
                "email": "maria.reyes@example.com",
                "created_at": "2000-01-01T00:00:00Z",
            }))
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(
            json!({
                "id": teacher,
                "first_name": "Maria",
                "last_name": "Reyes",
                "email": "maria.reyes@example.com",
                "created_at": "2024-09-01T08:00:00Z",
                "updated_at": "2024-09-01T09:00:00Z",
            }),
            response
        );

        let record = context.get(&TEACHER, &teacher).await;
        assert_eq!(&FieldValue::Text("Reyes".to_owned()), record.get("last_name"));

        context.close().await;
    }

    #[tokio::test]
    async fn test_omitted_optional_fields_are_kept() {
        let context = TestContext::setup().await;
        let course = context.course("BSCS").await;
        let subject = context.subject(course, "CS101").await;
        let student = context.student("juan@example.com", Some(course)).await;
        context
            .driver()
            .update_record(&STUDENT, &student.to_string(), &json!({"subjects": [subject]}), true)
            .await
            .unwrap();

        let response = OneShotBuilder::new(context.app(), route("students", &student.to_string()))
            .send_json(json!({
                "first_name": "Juan",
                "last_name": "Santos",
                "email": "juan@example.com",
                "date_of_birth": "2005-03-07",
            }))
            .await
            .expect_json::<Value>()
            .await;
        assert_eq!(json!("Santos"), response["last_name"]);
        assert_eq!(json!(course), response["course"]);
        assert_eq!(json!([subject]), response["subjects"]);

        context.close().await;
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let context = TestContext::setup().await;
        let teacher = context.teacher("maria@example.com").await;

        let errors = OneShotBuilder::new(context.app(), route("teachers", &teacher.to_string()))
            .send_json(json!({"first_name": "Maria"}))
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_field_errors()
            .await;
        assert_eq!(Some(["This field is required.".to_owned()].as_slice()), errors.get("email"));
        assert!(errors.contains("last_name"));

        context.close().await;
    }

    #[tokio::test]
    async fn test_unique_excludes_self() {
        let context = TestContext::setup().await;
        let teacher1 = context.teacher("maria@example.com").await;
        context.teacher("jose@example.com").await;

        let payload = json!({"first_name": "M", "last_name": "S", "email": "maria@example.com"});
        OneShotBuilder::new(context.app(), route("teachers", &teacher1.to_string()))
            .send_json(payload)
            .await
            .expect_json::<Value>()
            .await;

        let payload = json!({"first_name": "M", "last_name": "S", "email": "jose@example.com"});
        let errors = OneShotBuilder::new(context.app(), route("teachers", &teacher1.to_string()))
            .send_json(payload)
            .await
            .expect_status(http::StatusCode::BAD_REQUEST)
            .expect_field_errors()
            .await;
        assert_eq!(
            Some(["teacher with this email already exists.".to_owned()].as_slice()),
            errors.get("email")
        );

        context.close().await;
    }

    #[tokio::test]
    async fn test_not_found() {
        let context = TestContext::setup().await;

        for schema in context.schemas() {
            for id in missing_ids(schema) {
                OneShotBuilder::new(context.app(), route(schema.path, id))
                    .send_json(json!({}))
                    .await
                    .expect_status(http::StatusCode::NOT_FOUND)
                    .expect_error(&format!("No {} matches the given query", schema.name))
                    .await;
            }
        }

        context.close().await;
    }

    test_payload_must_be_json!(TestContext::setup().await.into_app(), route("teachers", "1"));
}
