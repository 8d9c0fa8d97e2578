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

//! Test utilities for the business layer.

use crate::db;
use crate::driver::RecordsDriver;
use crate::model::academics::{COURSE, SECTION, STUDENT, SUBJECT, TEACHER};
use crate::model::assessments::{QUIZ, QUIZ_RESULT};
use crate::model::schema::Schema;
use crate::model::{Key, Record, Registry, Value, Values};
use registrar_core::clocks::Clock;
use registrar_core::clocks::testutils::SettableClock;
use registrar_core::db::Db;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use time::macros::{date, datetime};
use uuid::Uuid;

/// State of a running test.
pub(crate) struct TestContext {
    /// The database backing the driver.
    db: Arc<dyn Db + Send + Sync>,

    /// The clock used by the driver, which tests can manipulate.
    clock: Arc<SettableClock>,

    /// The driver under test.
    driver: RecordsDriver,
}

impl TestContext {
    /// Initializes the driver using an in-memory database and a settable clock.
    pub(crate) async fn setup() -> Self {
        let db: Arc<dyn Db + Send + Sync> =
            Arc::new(registrar_core::db::sqlite::testutils::setup().await);
        db::init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        let clock = Arc::new(SettableClock::new(datetime!(2024-09-01 08:00:00 UTC)));
        let registry = Arc::new(Registry::school().unwrap());
        let driver = RecordsDriver::new(db.clone(), clock.clone(), registry);
        Self { db, clock, driver }
    }

    /// Gets a copy of the driver in this test context.
    pub(crate) fn driver(&self) -> RecordsDriver {
        self.driver.clone()
    }

    /// Gets the database used by this test context.
    pub(crate) fn db(&self) -> Arc<dyn Db + Send + Sync> {
        self.db.clone()
    }

    /// Returns the current time as seen by the driver.
    pub(crate) fn now(&self) -> OffsetDateTime {
        self.clock.now_utc()
    }

    /// Advances the time seen by the driver by `delta`.
    pub(crate) fn advance(&self, delta: Duration) {
        self.clock.advance(delta)
    }

    /// Inserts a row into `schema` by directly modifying the backing database.
    ///
    /// The timestamps managed by the service are set to the current time.
    async fn put(
        &self,
        schema: &Schema,
        key: Option<Key>,
        pairs: Vec<(&'static str, Value)>,
    ) -> Key {
        let mut values = pairs.into_iter().collect::<Values>();
        for field in schema.fields().filter(|f| !f.is_writable()) {
            values.insert(field.name, Value::Timestamp(self.now()));
        }
        db::insert_record(&mut self.db.ex().await.unwrap(), schema, key.as_ref(), &values)
            .await
            .unwrap()
    }

    /// Creates a course identified by `code`.
    pub(crate) async fn course(&self, code: &str) -> Key {
        let name = Value::Text(format!("Course {}", code));
        self.put(&COURSE, None, vec![("name", name), ("code", Value::Text(code.to_owned()))]).await
    }

    /// Creates a section named `section`.
    pub(crate) async fn section(&self, section: &str) -> Key {
        self.put(&SECTION, None, vec![("section", Value::Text(section.to_owned()))]).await
    }

    /// Creates a teacher reachable at `email`.
    pub(crate) async fn teacher(&self, email: &str) -> Key {
        self.put(
            &TEACHER,
            None,
            vec![
                ("first_name", Value::Text("Maria".to_owned())),
                ("last_name", Value::Text("Santos".to_owned())),
                ("email", Value::Text(email.to_owned())),
            ],
        )
        .await
    }

    /// Creates a subject identified by `code` within `course`.
    pub(crate) async fn subject(&self, course: Key, code: &str) -> Key {
        self.put(
            &SUBJECT,
            None,
            vec![
                ("name", Value::Text(format!("Subject {}", code))),
                ("code", Value::Text(code.to_owned())),
                ("course", Value::Key(course)),
            ],
        )
        .await
    }

    /// Creates a student reachable at `email`, optionally enrolled in `course`.
    pub(crate) async fn student(&self, email: &str, course: Option<Key>) -> Key {
        self.put(
            &STUDENT,
            Some(Key::Uuid(Uuid::new_v4())),
            vec![
                ("first_name", Value::Text("Juan".to_owned())),
                ("last_name", Value::Text("Dela Cruz".to_owned())),
                ("email", Value::Text(email.to_owned())),
                ("date_of_birth", Value::Date(date!(2005 - 03 - 07))),
                ("course", course.map(Value::Key).unwrap_or(Value::Null)),
            ],
        )
        .await
    }

    /// Creates a quiz for `subject` worth `total_marks`.
    pub(crate) async fn quiz(&self, subject: Key, total_marks: i64) -> Key {
        self.put(
            &QUIZ,
            None,
            vec![
                ("subject", Value::Key(subject)),
                ("title", Value::Text("Quiz 1".to_owned())),
                ("total_marks", Value::Integer(total_marks)),
                ("date", Value::Date(date!(2024 - 09 - 15))),
            ],
        )
        .await
    }

    /// Records the `score` obtained by `student` in `quiz`.
    pub(crate) async fn quiz_result(&self, quiz: Key, student: Key, score: f64) -> Key {
        self.put(
            &QUIZ_RESULT,
            None,
            vec![
                ("quiz", Value::Key(quiz)),
                ("student", Value::Key(student)),
                ("score", Value::Float(score)),
            ],
        )
        .await
    }

    /// Gets the row of `schema` identified by `key` by directly querying the backing database.
    pub(crate) async fn get(&self, schema: &Schema, key: &Key) -> Record {
        db::get_record(&mut self.db.ex().await.unwrap(), schema, key).await.unwrap()
    }

    /// Checks if the row of `schema` identified by `key` exists by directly querying the backing
    /// database.
    pub(crate) async fn exists(&self, schema: &Schema, key: &Key) -> bool {
        db::record_exists(&mut self.db.ex().await.unwrap(), schema, key).await.unwrap()
    }

    /// Releases the database connections held by the context.
    pub(crate) async fn close(self) {
        self.db.close().await;
    }
}
