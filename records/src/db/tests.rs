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

//! Common tests for any database implementation.

use crate::db::*;
use crate::model::academics::{COURSE, SECTION, STUDENT, SUBJECT, TEACHER};
use crate::model::assessments::{QUIZ, QUIZ_RESULT};
use registrar_core::db::Db;
use std::sync::Arc;
use time::OffsetDateTime;
use time::macros::{date, datetime};
use uuid::Uuid;

/// Syntactic sugar to build a collection of values.
fn values(pairs: &[(&'static str, Value)]) -> Values {
    pairs.iter().cloned().collect()
}

/// Syntactic sugar to build a text value.
fn text(s: &str) -> Value {
    Value::Text(s.to_owned())
}

/// Syntactic sugar to build a timestamp value.
fn ts(t: OffsetDateTime) -> Value {
    Value::Timestamp(t)
}

/// Inserts a course with the given `code` and returns its key.
async fn put_course(ex: &mut Executor, code: &str) -> Key {
    let now = datetime!(2024-09-01 08:00:00.123456 UTC);
    let course = values(&[
        ("name", text(&format!("Course {}", code))),
        ("code", text(code)),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    insert_record(ex, &COURSE, None, &course).await.unwrap()
}

/// Inserts a subject with the given `code` in `course` and returns its key.
async fn put_subject(ex: &mut Executor, course: Key, teacher: Option<Key>, code: &str) -> Key {
    let now = datetime!(2024-09-01 09:00:00 UTC);
    let subject = values(&[
        ("name", text(&format!("Subject {}", code))),
        ("code", text(code)),
        ("course", Value::Key(course)),
        ("teacher", teacher.map(Value::Key).unwrap_or(Value::Null)),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    insert_record(ex, &SUBJECT, None, &subject).await.unwrap()
}

/// Inserts a student with the given `email` enrolled in `course` and returns its key.
async fn put_student(ex: &mut Executor, course: Option<Key>, email: &str) -> Key {
    let now = datetime!(2024-09-01 10:00:00 UTC);
    let key = Key::Uuid(Uuid::new_v4());
    let student = values(&[
        ("first_name", text("Juan")),
        ("middle_name", Value::Null),
        ("last_name", text("Dela Cruz")),
        ("email", text(email)),
        ("student_number", Value::Null),
        ("date_of_birth", Value::Date(date!(2005 - 03 - 07))),
        ("profile_image", Value::Null),
        ("course", course.map(Value::Key).unwrap_or(Value::Null)),
        ("year_level", Value::Null),
        ("section", Value::Null),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    assert_eq!(key, insert_record(ex, &STUDENT, Some(&key), &student).await.unwrap());
    key
}

pub(crate) async fn test_insert_and_get_serial(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let key1 = put_course(&mut ex, "BSCS").await;
    let key2 = put_course(&mut ex, "BSIT").await;
    assert_ne!(key1, key2);

    let record = get_record(&mut ex, &COURSE, &key1).await.unwrap();
    assert_eq!(&key1, record.key());
    assert_eq!(&text("Course BSCS"), record.get("name"));
    assert_eq!(&text("BSCS"), record.get("code"));
    assert_eq!(&ts(datetime!(2024-09-01 08:00:00.123456 UTC)), record.get("created_at"));

    assert!(record_exists(&mut ex, &COURSE, &key2).await.unwrap());
    assert!(!record_exists(&mut ex, &COURSE, &Key::Serial(12345)).await.unwrap());
    assert_eq!(
        DbError::NotFound,
        get_record(&mut ex, &COURSE, &Key::Serial(12345)).await.unwrap_err()
    );

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_insert_and_get_uuid_with_links(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let subject1 = put_subject(&mut ex, course, None, "CS101").await;
    let subject2 = put_subject(&mut ex, course, None, "CS102").await;
    let student = put_student(&mut ex, Some(course), "juan@example.com").await;

    let subjects = STUDENT.field("subjects").unwrap();
    set_links(&mut ex, subjects, &student, &[subject2, subject1]).await.unwrap();

    let record = get_record(&mut ex, &STUDENT, &student).await.unwrap();
    assert_eq!(&Value::Key(course), record.get("course"));
    assert_eq!(&Value::Date(date!(2005 - 03 - 07)), record.get("date_of_birth"));
    assert_eq!(&Value::Null, record.get("middle_name"));
    assert_eq!(&Value::Keys(vec![subject1, subject2]), record.get("subjects"));

    set_links(&mut ex, subjects, &student, &[subject2]).await.unwrap();
    let record = get_record(&mut ex, &STUDENT, &student).await.unwrap();
    assert_eq!(&Value::Keys(vec![subject2]), record.get("subjects"));

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_list_records_ordering(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    assert!(list_records(&mut ex, &COURSE).await.unwrap().is_empty());

    put_course(&mut ex, "C").await;
    put_course(&mut ex, "A").await;
    put_course(&mut ex, "B").await;
    let codes = list_records(&mut ex, &COURSE)
        .await
        .unwrap()
        .iter()
        .map(|r| r.get("code").clone())
        .collect::<Vec<Value>>();
    assert_eq!(vec![text("A"), text("B"), text("C")], codes);

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_list_records_newest_first(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let subject = put_subject(&mut ex, course, None, "CS101").await;
    let quiz = values(&[
        ("subject", Value::Key(subject)),
        ("title", text("Quiz 1")),
        ("total_marks", Value::Integer(10)),
        ("date", Value::Date(date!(2024 - 09 - 10))),
    ]);
    let quiz = insert_record(&mut ex, &QUIZ, None, &quiz).await.unwrap();

    let mut keys = vec![];
    for (i, graded_at) in [
        datetime!(2024-09-11 10:00:00 UTC),
        datetime!(2024-09-11 12:00:00 UTC),
        datetime!(2024-09-11 11:00:00 UTC),
    ]
    .into_iter()
    .enumerate()
    {
        let student = put_student(&mut ex, None, &format!("s{}@example.com", i)).await;
        let result = values(&[
            ("quiz", Value::Key(quiz)),
            ("student", Value::Key(student)),
            ("score", Value::Float(7.5)),
            ("graded_at", ts(graded_at)),
        ]);
        keys.push(insert_record(&mut ex, &QUIZ_RESULT, None, &result).await.unwrap());
    }

    let listed = list_records(&mut ex, &QUIZ_RESULT)
        .await
        .unwrap()
        .iter()
        .map(|r| *r.key())
        .collect::<Vec<Key>>();
    assert_eq!(vec![keys[1], keys[2], keys[0]], listed);

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_update_record(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let key = put_course(&mut ex, "BSCS").await;
    let other = put_course(&mut ex, "BSIT").await;

    let later = datetime!(2024-09-05 08:00:00 UTC);
    let changes = values(&[("name", text("Computer Science")), ("updated_at", ts(later))]);
    update_record(&mut ex, &COURSE, &key, &changes).await.unwrap();

    let record = get_record(&mut ex, &COURSE, &key).await.unwrap();
    assert_eq!(&text("Computer Science"), record.get("name"));
    assert_eq!(&text("BSCS"), record.get("code"));
    assert_eq!(&ts(later), record.get("updated_at"));
    assert_eq!(&ts(datetime!(2024-09-01 08:00:00.123456 UTC)), record.get("created_at"));

    let record = get_record(&mut ex, &COURSE, &other).await.unwrap();
    assert_eq!(&text("Course BSIT"), record.get("name"));

    update_record(&mut ex, &COURSE, &key, &Values::new()).await.unwrap();

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_update_record_not_found(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let changes = values(&[("name", text("Computer Science"))]);
    assert_eq!(
        DbError::NotFound,
        update_record(&mut ex, &COURSE, &Key::Serial(8), &changes).await.unwrap_err()
    );
    assert_eq!(
        DbError::NotFound,
        update_record(&mut ex, &COURSE, &Key::Serial(8), &Values::new()).await.unwrap_err()
    );

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_delete_record(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let key = put_course(&mut ex, "BSCS").await;
    delete_record(&mut ex, &COURSE, &key).await.unwrap();
    assert!(!record_exists(&mut ex, &COURSE, &key).await.unwrap());
    assert_eq!(DbError::NotFound, delete_record(&mut ex, &COURSE, &key).await.unwrap_err());

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_delete_record_cascades(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let other_course = put_course(&mut ex, "BSIT").await;
    let subject = put_subject(&mut ex, course, None, "CS101").await;
    let other_subject = put_subject(&mut ex, other_course, None, "IT101").await;
    let student = put_student(&mut ex, None, "juan@example.com").await;
    let subjects = STUDENT.field("subjects").unwrap();
    set_links(&mut ex, subjects, &student, &[subject, other_subject]).await.unwrap();

    delete_record(&mut ex, &COURSE, &course).await.unwrap();

    assert!(!record_exists(&mut ex, &SUBJECT, &subject).await.unwrap());
    assert!(record_exists(&mut ex, &SUBJECT, &other_subject).await.unwrap());
    let record = get_record(&mut ex, &STUDENT, &student).await.unwrap();
    assert_eq!(&Value::Keys(vec![other_subject]), record.get("subjects"));

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_delete_record_sets_null(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let now = datetime!(2024-09-01 08:00:00 UTC);
    let teacher = values(&[
        ("first_name", text("Maria")),
        ("last_name", text("Santos")),
        ("email", text("maria@example.com")),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    let teacher = insert_record(&mut ex, &TEACHER, None, &teacher).await.unwrap();
    let course = put_course(&mut ex, "BSCS").await;
    let subject = put_subject(&mut ex, course, Some(teacher), "CS101").await;

    delete_record(&mut ex, &TEACHER, &teacher).await.unwrap();

    let record = get_record(&mut ex, &SUBJECT, &subject).await.unwrap();
    assert_eq!(&Value::Null, record.get("teacher"));

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_count_matching(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let subject = put_subject(&mut ex, course, None, "CS101").await;
    put_subject(&mut ex, course, None, "CS102").await;

    let course_field = SUBJECT.field("course").unwrap();
    let code_field = SUBJECT.field("code").unwrap();
    let course_value = Value::Key(course);
    let code_value = text("CS101");

    assert_eq!(
        2,
        count_matching(&mut ex, &SUBJECT, &[(course_field, &course_value)], None).await.unwrap()
    );
    let criteria = [(course_field, &course_value), (code_field, &code_value)];
    assert_eq!(1, count_matching(&mut ex, &SUBJECT, &criteria, None).await.unwrap());
    assert_eq!(0, count_matching(&mut ex, &SUBJECT, &criteria, Some(&subject)).await.unwrap());

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_max_matching(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let subject = put_subject(&mut ex, course, None, "CS101").await;
    let mut quizzes = vec![];
    for title in ["Quiz 1", "Quiz 2"] {
        let quiz = values(&[
            ("subject", Value::Key(subject)),
            ("title", text(title)),
            ("total_marks", Value::Integer(10)),
            ("date", Value::Date(date!(2024 - 09 - 10))),
        ]);
        quizzes.push(insert_record(&mut ex, &QUIZ, None, &quiz).await.unwrap());
    }
    for (i, score) in [4.5, 9.0].into_iter().enumerate() {
        let student = put_student(&mut ex, None, &format!("s{}@example.com", i)).await;
        let result = values(&[
            ("quiz", Value::Key(quizzes[0])),
            ("student", Value::Key(student)),
            ("score", Value::Float(score)),
            ("graded_at", ts(datetime!(2024-09-11 10:00:00 UTC))),
        ]);
        insert_record(&mut ex, &QUIZ_RESULT, None, &result).await.unwrap();
    }

    let score = QUIZ_RESULT.field("score").unwrap();
    let quiz_field = QUIZ_RESULT.field("quiz").unwrap();
    let graded = Value::Key(quizzes[0]);
    let ungraded = Value::Key(quizzes[1]);
    assert_eq!(
        Some(9.0),
        max_matching(&mut ex, &QUIZ_RESULT, score, &[(quiz_field, &graded)]).await.unwrap()
    );
    assert_eq!(
        None,
        max_matching(&mut ex, &QUIZ_RESULT, score, &[(quiz_field, &ungraded)]).await.unwrap()
    );

    drop(ex);
    db.close().await;
}

pub(crate) async fn test_constraint_violations(db: Arc<dyn Db + Send + Sync>) {
    let mut ex = db.ex().await.unwrap();

    let course = put_course(&mut ex, "BSCS").await;
    let now = datetime!(2024-09-01 08:00:00 UTC);
    let duplicate = values(&[
        ("name", text("Duplicate")),
        ("code", text("BSCS")),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    assert_eq!(
        DbError::AlreadyExists,
        insert_record(&mut ex, &COURSE, None, &duplicate).await.unwrap_err()
    );

    let dangling = values(&[
        ("name", text("Orphan")),
        ("code", text("X1")),
        ("course", Value::Key(Key::Serial(9999))),
        ("teacher", Value::Null),
        ("created_at", ts(now)),
        ("updated_at", ts(now)),
    ]);
    assert_eq!(
        DbError::NotFound,
        insert_record(&mut ex, &SUBJECT, None, &dangling).await.unwrap_err()
    );

    put_subject(&mut ex, course, None, "CS101").await;
    let section = values(&[("section", text("A"))]);
    insert_record(&mut ex, &SECTION, None, &section).await.unwrap();
    assert_eq!(
        DbError::AlreadyExists,
        insert_record(&mut ex, &SECTION, None, &section).await.unwrap_err()
    );

    drop(ex);
    db.close().await;
}

macro_rules! generate_db_tests [
    ( $setup:expr $(, #[$extra:meta] )? ) => {
        registrar_core::db::testutils::generate_tests!(
            $(#[$extra],)?
            $setup,
            $crate::db::tests,
            test_insert_and_get_serial,
            test_insert_and_get_uuid_with_links,
            test_list_records_ordering,
            test_list_records_newest_first,
            test_update_record,
            test_update_record_not_found,
            test_delete_record,
            test_delete_record_cascades,
            test_delete_record_sets_null,
            test_count_matching,
            test_max_matching,
            test_constraint_violations
        );
    }
];

#[cfg(feature = "postgres")]
mod postgres {
    use super::*;
    use registrar_core::db::postgres::testutils::setup;

    generate_db_tests!(
        {
            let db = Arc::new(setup().await);
            init_schema(&mut db.ex().await.unwrap()).await.unwrap();
            db
        },
        #[ignore = "Requires environment configuration and is expensive"]
    );
}

mod sqlite {
    use super::*;
    use registrar_core::db::sqlite::testutils::setup;

    generate_db_tests!({
        let db = Arc::new(setup().await);
        init_schema(&mut db.ex().await.unwrap()).await.unwrap();
        db
    });
}
