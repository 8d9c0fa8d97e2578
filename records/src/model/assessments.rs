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

//! Assessments owned by subjects and the per-student results of taking them.

use crate::model::academics::{STUDENT, SUBJECT};
use crate::model::schema::{Auto, Field, KeyKind, OnDelete, Order, Rule, Schema};

/// Fields shared by all assessments.
macro_rules! assessment_fields {
    ( $( $extra:expr ),* ) => {
        &[
            Field::foreign_key("subject", &SUBJECT, OnDelete::Cascade),
            Field::text("title", 100),
            Field::integer("total_marks", Some(1), None),
            Field::date("date"),
            $( $extra, )*
        ]
    };
}

/// Fields shared by all assessment results, given the name of the assessment field and the
/// schema of the assessment.
macro_rules! result_fields {
    ( $assessment:literal, $target:expr ) => {
        &[
            Field::foreign_key($assessment, $target, OnDelete::Cascade),
            Field::foreign_key("student", &STUDENT, OnDelete::Cascade),
            Field::float("score", Some(0.0)),
            Field::timestamp("graded_at", Auto::OnCreate),
        ]
    };
}

/// Ordering of all assessments.
const ASSESSMENT_ORDERING: &[Order] = &[Order::asc("date"), Order::asc("id")];

/// Ordering of all results: newest first.
const RESULT_ORDERING: &[Order] = &[Order::desc("graded_at"), Order::desc("id")];

/// A quiz.
pub static QUIZ: Schema = Schema {
    name: "quiz",
    path: "quizzes",
    table: "quizzes",
    key: KeyKind::Serial,
    fields: assessment_fields!(),
    unique_together: &[],
    ordering: ASSESSMENT_ORDERING,
    label: &["title"],
    rules: &[],
};

/// An exam.
pub static EXAM: Schema = Schema {
    name: "exam",
    path: "exams",
    table: "exams",
    key: KeyKind::Serial,
    fields: assessment_fields!(),
    unique_together: &[],
    ordering: ASSESSMENT_ORDERING,
    label: &["title"],
    rules: &[],
};

/// A graded activity, which carries a free-form description.
pub static ACTIVITY: Schema = Schema {
    name: "activity",
    path: "activities",
    table: "activities",
    key: KeyKind::Serial,
    fields: assessment_fields!(Field::long_text("description")),
    unique_together: &[],
    ordering: ASSESSMENT_ORDERING,
    label: &["title"],
    rules: &[],
};

/// The score of a student in a quiz.
pub static QUIZ_RESULT: Schema = Schema {
    name: "quiz result",
    path: "quiz-results",
    table: "quiz_results",
    key: KeyKind::Serial,
    fields: result_fields!("quiz", &QUIZ),
    unique_together: &[&["quiz", "student"]],
    ordering: RESULT_ORDERING,
    label: &["student", "quiz", "score"],
    rules: &[Rule::NotAboveReferenced { field: "score", reference: "quiz", limit: "total_marks" }],
};

/// The score of a student in an exam.
pub static EXAM_RESULT: Schema = Schema {
    name: "exam result",
    path: "exam-results",
    table: "exam_results",
    key: KeyKind::Serial,
    fields: result_fields!("exam", &EXAM),
    unique_together: &[&["exam", "student"]],
    ordering: RESULT_ORDERING,
    label: &["student", "exam", "score"],
    rules: &[Rule::NotAboveReferenced { field: "score", reference: "exam", limit: "total_marks" }],
};

/// The score of a student in an activity.
pub static ACTIVITY_RESULT: Schema = Schema {
    name: "activity result",
    path: "activity-results",
    table: "activity_results",
    key: KeyKind::Serial,
    fields: result_fields!("activity", &ACTIVITY),
    unique_together: &[&["activity", "student"]],
    ordering: RESULT_ORDERING,
    label: &["student", "activity", "score"],
    rules: &[Rule::NotAboveReferenced {
        field: "score",
        reference: "activity",
        limit: "total_marks",
    }],
};
