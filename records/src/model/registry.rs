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

//! Explicit collection of all entities served by the application.

use crate::model::academics::{COURSE, SECTION, STUDENT, SUBJECT, TEACHER, YEAR_LEVEL};
use crate::model::assessments::{ACTIVITY, ACTIVITY_RESULT, EXAM, EXAM_RESULT, QUIZ, QUIZ_RESULT};
use crate::model::schema::{Field, FieldKind, OnDelete, Schema};

/// Collection of entity definitions, built once at startup.
#[derive(Debug)]
pub struct Registry {
    /// Registered entities in registration order.
    schemas: Vec<&'static Schema>,
}

impl Registry {
    /// Creates a registry with the given `schemas`.
    ///
    /// Every entity referenced by the fields of a schema must be registered too.
    pub fn new(schemas: Vec<&'static Schema>) -> Result<Self, String> {
        for schema in &schemas {
            for field in schema.fields() {
                let target = match field.kind {
                    FieldKind::ForeignKey { target, .. } => target,
                    FieldKind::ManyToMany { target, .. } => target,
                    _ => continue,
                };
                if !schemas.iter().any(|s| s.is(target)) {
                    return Err(format!(
                        "Field {}.{} references unregistered entity {}",
                        schema.name, field.name, target.name
                    ));
                }
            }
        }

        for (i, schema) in schemas.iter().enumerate() {
            if schemas[i + 1..].iter().any(|s| s.path == schema.path || s.table == schema.table) {
                return Err(format!("Entity {} registered more than once", schema.name));
            }
        }

        Ok(Self { schemas })
    }

    /// Creates the registry with all entities of the school records service.
    pub fn school() -> Result<Self, String> {
        Self::new(vec![
            &STUDENT,
            &TEACHER,
            &COURSE,
            &YEAR_LEVEL,
            &SECTION,
            &SUBJECT,
            &QUIZ,
            &EXAM,
            &ACTIVITY,
            &QUIZ_RESULT,
            &EXAM_RESULT,
            &ACTIVITY_RESULT,
        ])
    }

    /// Iterates over all registered entities.
    pub fn schemas(&self) -> impl Iterator<Item = &'static Schema> + '_ {
        self.schemas.iter().copied()
    }

    /// Returns the foreign key fields, and the entities that own them, that prevent the deletion
    /// of rows of `target` while they reference them.
    pub fn protected_references(&self, target: &Schema) -> Vec<(&'static Schema, &'static Field)> {
        let mut references = vec![];
        for schema in self.schemas() {
            for field in schema.fields() {
                if let FieldKind::ForeignKey { target: t, on_delete: OnDelete::Protect } =
                    field.kind
                {
                    if t.is(target) {
                        references.push((schema, field));
                    }
                }
            }
        }
        references
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_school_registry() {
        let school = Registry::school().unwrap();
        let paths = school.schemas().map(|s| s.path).collect::<Vec<&str>>();
        assert_eq!(
            vec![
                "students",
                "teachers",
                "courses",
                "yearlevels",
                "sections",
                "subjects",
                "quizzes",
                "exams",
                "activities",
                "quiz-results",
                "exam-results",
                "activity-results",
            ],
            paths
        );
    }

    #[test]
    fn test_new_rejects_unregistered_targets() {
        let err = Registry::new(vec![&SUBJECT]).unwrap_err();
        assert!(err.contains("subject.course"), "Unexpected error {}", err);
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let err = Registry::new(vec![&COURSE, &COURSE]).unwrap_err();
        assert!(err.contains("more than once"), "Unexpected error {}", err);
    }

    #[test]
    fn test_protected_references() {
        let registry = Registry::school().unwrap();

        let refs = registry
            .protected_references(&COURSE)
            .into_iter()
            .map(|(s, f)| format!("{}.{}", s.table, f.name))
            .collect::<Vec<String>>();
        assert_eq!(vec!["students.course"], refs);

        assert_eq!(1, registry.protected_references(&SECTION).len());
        assert!(registry.protected_references(&SUBJECT).is_empty());
        assert!(registry.protected_references(&TEACHER).is_empty());
    }
}
