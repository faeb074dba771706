use crate::model::{Class, EntityId};

/// Shown wherever a student's class reference does not resolve.
pub const CLASS_NOT_FOUND: &str = "Turma não encontrada";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved<'a> {
    Found(&'a Class),
    NotFound,
}

impl<'a> Resolved<'a> {
    pub fn class(self) -> Option<&'a Class> {
        match self {
            Resolved::Found(c) => Some(c),
            Resolved::NotFound => None,
        }
    }

    pub fn is_found(self) -> bool {
        matches!(self, Resolved::Found(_))
    }

    pub fn display_name(self) -> &'a str {
        match self {
            Resolved::Found(c) => &c.name,
            Resolved::NotFound => CLASS_NOT_FOUND,
        }
    }
}

/// A miss is a display concern (the class may have been deleted after the
/// student was enrolled), never an error.
pub fn resolve(class_id: EntityId, classes: &[Class]) -> Resolved<'_> {
    classes
        .iter()
        .find(|c| c.id == class_id)
        .map_or(Resolved::NotFound, Resolved::Found)
}
