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

//! Academic entities: courses, year levels, sections, teachers, subjects and students.

use crate::model::schema::{Auto, Field, KeyKind, OnDelete, Order, Schema};

/// Maximum length of names and titles.
const NAME_LENGTH: usize = 100;

/// Maximum length of codes and labels.
const CODE_LENGTH: usize = 10;

/// A degree program.
pub static COURSE: Schema = Schema {
    name: "course",
    path: "courses",
    table: "courses",
    key: KeyKind::Serial,
    fields: &[
        Field::text("name", NAME_LENGTH),
        Field::text("code", CODE_LENGTH).unique(),
        Field::timestamp("created_at", Auto::OnCreate),
        Field::timestamp("updated_at", Auto::OnSave),
    ],
    unique_together: &[],
    ordering: &[Order::asc("code")],
    label: &["name", "code"],
    rules: &[],
};

/// A year of study.
pub static YEAR_LEVEL: Schema = Schema {
    name: "year level",
    path: "yearlevels",
    table: "year_levels",
    key: KeyKind::Serial,
    fields: &[Field::integer("year", Some(1), Some(32767)).unique()],
    unique_together: &[],
    ordering: &[Order::asc("year")],
    label: &["year"],
    rules: &[],
};

/// A group of students within a year level.
pub static SECTION: Schema = Schema {
    name: "section",
    path: "sections",
    table: "sections",
    key: KeyKind::Serial,
    fields: &[Field::text("section", CODE_LENGTH).unique()],
    unique_together: &[],
    ordering: &[Order::asc("section")],
    label: &["section"],
    rules: &[],
};

/// A member of the faculty.
pub static TEACHER: Schema = Schema {
    name: "teacher",
    path: "teachers",
    table: "teachers",
    key: KeyKind::Serial,
    fields: &[
        Field::text("first_name", NAME_LENGTH),
        Field::text("last_name", NAME_LENGTH),
        Field::email("email").unique(),
        Field::timestamp("created_at", Auto::OnCreate),
        Field::timestamp("updated_at", Auto::OnSave),
    ],
    unique_together: &[],
    ordering: &[Order::asc("last_name"), Order::asc("first_name")],
    label: &["first_name", "last_name"],
    rules: &[],
};

/// A subject taught as part of a course.
pub static SUBJECT: Schema = Schema {
    name: "subject",
    path: "subjects",
    table: "subjects",
    key: KeyKind::Serial,
    fields: &[
        Field::text("name", NAME_LENGTH),
        Field::text("code", CODE_LENGTH),
        Field::foreign_key("course", &COURSE, OnDelete::Cascade),
        Field::foreign_key("teacher", &TEACHER, OnDelete::SetNull).optional(),
        Field::timestamp("created_at", Auto::OnCreate),
        Field::timestamp("updated_at", Auto::OnSave),
    ],
    unique_together: &[&["course", "code"]],
    ordering: &[Order::asc("course"), Order::asc("code")],
    label: &["code", "name"],
    rules: &[],
};

/// A student, optionally enrolled in a course, year level and section.
pub static STUDENT: Schema = Schema {
    name: "student",
    path: "students",
    table: "students",
    key: KeyKind::Uuid,
    fields: &[
        Field::text("first_name", NAME_LENGTH),
        Field::text("middle_name", NAME_LENGTH).optional(),
        Field::text("last_name", NAME_LENGTH),
        Field::email("email").unique(),
        Field::integer("student_number", Some(1), None).optional().unique(),
        Field::date("date_of_birth"),
        Field::text("profile_image", NAME_LENGTH).optional(),
        Field::foreign_key("course", &COURSE, OnDelete::Protect).optional(),
        Field::foreign_key("year_level", &YEAR_LEVEL, OnDelete::Protect).optional(),
        Field::foreign_key("section", &SECTION, OnDelete::Protect).optional(),
        Field::many_to_many("subjects", &SUBJECT, "student_subjects", "student", "subject"),
        Field::timestamp("created_at", Auto::OnCreate),
        Field::timestamp("updated_at", Auto::OnSave),
    ],
    unique_together: &[],
    ordering: &[Order::asc("last_name"), Order::asc("first_name")],
    label: &["first_name", "middle_name", "last_name"],
    rules: &[],
};
