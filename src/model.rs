use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Server-assigned identity. Integer on the wire, but front-ends coming from
/// HTML forms frequently send it back as a numeric string, so both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => Ok(EntityId(n)),
            NumberOrText::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(EntityId)
                .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Class,
    Student,
}

impl EntityKind {
    /// Resource segment in the REST collection contract.
    pub fn resource(self) -> &'static str {
        match self {
            EntityKind::Class => "classes",
            EntityKind::Student => "students",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Class => "turma",
            EntityKind::Student => "estudante",
        })
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: EntityId,
    pub name: String,
    pub grade: String,
    #[serde(deserialize_with = "year_from_wire")]
    pub year: String,
    pub teacher: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub student_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: EntityId,
    /// Display identifier (e.g. `EST003`). Assigned once, never regenerated.
    #[serde(default)]
    pub student_id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    pub class_id: EntityId,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub parent_phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

/// Form input for creating or editing a class. Every field is raw text; the
/// coordinator validates it into a [`ClassPayload`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassDraft {
    pub name: String,
    pub grade: String,
    #[serde(deserialize_with = "year_from_wire")]
    pub year: String,
    pub teacher: String,
    #[serde(deserialize_with = "text_or_null")]
    pub description: String,
}

impl ClassDraft {
    /// Form contents for editing an existing record.
    pub fn from_class(class: &Class) -> Self {
        Self {
            name: class.name.clone(),
            grade: class.grade.clone(),
            year: class.year.clone(),
            teacher: class.teacher.clone(),
            description: class.description.clone().unwrap_or_default(),
        }
    }
}

/// Form input for a student. Keys are camelCase; the snake_case keys of a
/// listed row are accepted too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StudentDraft {
    pub name: String,
    pub email: String,
    #[serde(deserialize_with = "text_or_null")]
    pub phone: String,
    #[serde(deserialize_with = "text_or_null")]
    pub address: String,
    #[serde(alias = "class_id", deserialize_with = "optional_id")]
    pub class_id: Option<EntityId>,
    #[serde(alias = "birth_date", deserialize_with = "optional_date")]
    pub birth_date: Option<NaiveDate>,
    #[serde(alias = "parent_name", deserialize_with = "text_or_null")]
    pub parent_name: String,
    #[serde(alias = "parent_phone", deserialize_with = "text_or_null")]
    pub parent_phone: String,
}

impl StudentDraft {
    pub fn from_student(student: &Student) -> Self {
        Self {
            name: student.name.clone(),
            email: student.email.clone(),
            phone: student.phone.clone().unwrap_or_default(),
            address: student.address.clone().unwrap_or_default(),
            class_id: Some(student.class_id),
            birth_date: student.birth_date,
            parent_name: student.parent_name.clone().unwrap_or_default(),
            parent_phone: student.parent_phone.clone().unwrap_or_default(),
        }
    }
}

/// Body sent to the remote store on POST/PUT `classes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassPayload {
    pub name: String,
    pub grade: String,
    pub year: String,
    pub teacher: String,
    pub description: Option<String>,
}

/// Body sent to the remote store on POST/PUT `students`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentPayload {
    /// `None` lets the authoritative store assign the display id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub class_id: EntityId,
    pub birth_date: Option<NaiveDate>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
}

fn year_from_wire<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => n.to_string(),
        NumberOrText::Text(s) => s.trim().to_string(),
    })
}

fn text_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(EntityId(n))),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(|n| Some(EntityId(n)))
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
    }
}

fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                serde::de::Error::custom(format!("invalid date: {s:?} (expected YYYY-MM-DD)"))
            }),
    }
}
