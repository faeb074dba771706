use crate::model::{EntityId, EntityKind};
use crate::remote::RemoteError;
use thiserror::Error;

/// Caught before any remote call; the store is untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Por favor, preencha todos os campos obrigatórios: {}", .missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },

    #[error("Série inválida: {0}")]
    UnknownGrade(String),

    #[error("Professor não cadastrado: {0}")]
    UnknownTeacher(String),

    #[error("Ano inválido: {0}")]
    InvalidYear(String),

    #[error("Turma não encontrada: {0}")]
    UnknownClass(EntityId),
}

/// What the user was doing when a remote call failed; picks the retry text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Save(EntityKind),
    Delete(EntityKind),
}

impl Action {
    pub fn retry_message(self) -> &'static str {
        match self {
            Action::Load => "Erro ao carregar dados. Tente novamente.",
            Action::Save(EntityKind::Class) => "Erro ao salvar turma. Tente novamente.",
            Action::Save(EntityKind::Student) => "Erro ao salvar estudante. Tente novamente.",
            Action::Delete(EntityKind::Class) => "Erro ao excluir turma. Tente novamente.",
            Action::Delete(EntityKind::Student) => "Erro ao excluir estudante. Tente novamente.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Server message, verbatim.
    #[error("{message}")]
    Rejected {
        action: Action,
        status: u16,
        message: String,
    },

    #[error("{}", .action.retry_message())]
    Transport { action: Action, detail: String },

    #[error("{kind} {id} não está carregado(a)")]
    NotFound { kind: EntityKind, id: EntityId },
}

impl SyncError {
    pub(crate) fn remote(action: Action, err: RemoteError) -> Self {
        match err {
            RemoteError::Rejected { status, message } => SyncError::Rejected {
                action,
                status,
                message,
            },
            RemoteError::Transport(detail) => SyncError::Transport { action, detail },
        }
    }

    /// Whether resubmitting the same mutation unchanged could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { .. } => true,
            SyncError::Rejected { status, .. } => *status >= 500,
            SyncError::Invalid(_) | SyncError::NotFound { .. } => false,
        }
    }
}
