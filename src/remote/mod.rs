//! The authoritative store behind the cache.
//!
//! [`Remote`] is the REST collection contract for `classes` and `students`:
//! list, create, update by identity, delete by identity. Success returns the
//! canonical record; failure carries the server's `error` message unmodified.

mod http;
mod workspace;

pub use http::HttpRemote;
pub use workspace::WorkspaceRemote;

use crate::model::{Class, ClassPayload, EntityId, Student, StudentPayload};
use thiserror::Error;

/// Used when a failure body carries no `error` field.
pub const UNKNOWN_ERROR: &str = "Erro desconhecido";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Non-success status with an error payload. `message` is shown as-is.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// Network failure or an unparseable response.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        RemoteError::Rejected {
            status,
            message: message.into(),
        }
    }
}

pub trait Remote: Send + Sync {
    /// Short human-readable location, reported by `health`.
    fn describe(&self) -> String;

    fn list_classes(&self) -> Result<Vec<Class>, RemoteError>;
    fn create_class(&self, payload: &ClassPayload) -> Result<Class, RemoteError>;
    fn update_class(&self, id: EntityId, payload: &ClassPayload) -> Result<Class, RemoteError>;
    fn delete_class(&self, id: EntityId) -> Result<(), RemoteError>;

    fn list_students(&self) -> Result<Vec<Student>, RemoteError>;
    fn create_student(&self, payload: &StudentPayload) -> Result<Student, RemoteError>;
    fn update_student(&self, id: EntityId, payload: &StudentPayload)
        -> Result<Student, RemoteError>;
    fn delete_student(&self, id: EntityId) -> Result<(), RemoteError>;
}
