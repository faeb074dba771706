use super::error::ValidationError;
use crate::config::RosterConfig;
use crate::model::{Class, ClassDraft, ClassPayload, StudentDraft, StudentPayload};
use chrono::Datelike;

fn optional(raw: &str) -> Option<String> {
    let t = raw.trim();
    (!t.is_empty()).then(|| t.to_string())
}

fn is_blank(raw: &str) -> bool {
    raw.trim().is_empty()
}

pub fn class_payload(
    draft: &ClassDraft,
    roster: &RosterConfig,
) -> Result<ClassPayload, ValidationError> {
    let missing: Vec<&'static str> = [
        ("name", &draft.name),
        ("grade", &draft.grade),
        ("teacher", &draft.teacher),
    ]
    .into_iter()
    .filter(|(_, v)| is_blank(v))
    .map(|(k, _)| k)
    .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { missing });
    }

    let grade = draft.grade.trim();
    if !roster.grades.is_empty() && !roster.grades.iter().any(|g| g == grade) {
        return Err(ValidationError::UnknownGrade(grade.to_string()));
    }
    let teacher = draft.teacher.trim();
    if !roster.teachers.is_empty() && !roster.teachers.iter().any(|t| t == teacher) {
        return Err(ValidationError::UnknownTeacher(teacher.to_string()));
    }

    // The form defaults the year to the current one.
    let year = match draft.year.trim() {
        "" => chrono::Local::now().year().to_string(),
        y if y.len() == 4 && y.bytes().all(|b| b.is_ascii_digit()) => y.to_string(),
        y => return Err(ValidationError::InvalidYear(y.to_string())),
    };

    Ok(ClassPayload {
        name: draft.name.trim().to_string(),
        grade: grade.to_string(),
        year,
        teacher: teacher.to_string(),
        description: optional(&draft.description),
    })
}

/// `classes` is the current store contents: a student may only be enrolled in
/// a class the session knows about.
pub fn student_payload(
    draft: &StudentDraft,
    classes: &[Class],
    student_id: Option<String>,
) -> Result<StudentPayload, ValidationError> {
    let mut missing = Vec::new();
    if is_blank(&draft.name) {
        missing.push("name");
    }
    if is_blank(&draft.email) {
        missing.push("email");
    }
    if draft.class_id.is_none() {
        missing.push("class_id");
    }
    let Some(class_id) = draft.class_id.filter(|_| missing.is_empty()) else {
        return Err(ValidationError::MissingFields { missing });
    };
    if !classes.iter().any(|c| c.id == class_id) {
        return Err(ValidationError::UnknownClass(class_id));
    }

    Ok(StudentPayload {
        student_id,
        name: draft.name.trim().to_string(),
        email: draft.email.trim().to_string(),
        phone: optional(&draft.phone),
        address: optional(&draft.address),
        class_id,
        birth_date: draft.birth_date,
        parent_name: optional(&draft.parent_name),
        parent_phone: optional(&draft.parent_phone),
    })
}
