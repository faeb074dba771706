use crate::model::{Class, Student};
use serde::Serialize;
use std::collections::HashSet;

/// Shown for a class whose record carries no `student_count`.
pub const STUDENT_COUNT_FALLBACK: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_classes: usize,
    pub total_students: usize,
    pub distinct_teachers: usize,
    pub total_students_across_classes: u64,
}

pub fn total_classes(classes: &[Class]) -> usize {
    classes.len()
}

pub fn total_students(students: &[Student]) -> usize {
    students.len()
}

pub fn distinct_teachers(classes: &[Class]) -> usize {
    classes
        .iter()
        .map(|c| c.teacher.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn student_count_or(class: &Class, fallback: u32) -> u32 {
    class.student_count.unwrap_or(fallback)
}

pub fn total_students_across_classes(classes: &[Class], fallback: u32) -> u64 {
    classes
        .iter()
        .map(|c| u64::from(student_count_or(c, fallback)))
        .sum()
}

/// Recomputed from scratch on every call.
pub fn compute(classes: &[Class], students: &[Student], fallback: u32) -> DashboardStats {
    DashboardStats {
        total_classes: total_classes(classes),
        total_students: total_students(students),
        distinct_teachers: distinct_teachers(classes),
        total_students_across_classes: total_students_across_classes(classes, fallback),
    }
}
