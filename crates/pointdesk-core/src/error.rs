use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::{EntityId, EntityKind};

/// Failures reported by a repository implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: EntityId },
    /// A referential or uniqueness constraint rejected the write.
    #[error("{0}")]
    Constraint(String),
    #[error("data access failed: {0}")]
    Unavailable(String),
}

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, String>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Records a message; the first message per field wins.
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.to_string());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.fields {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Errors surfaced to the user by desk operations.
#[derive(Debug, Error)]
pub enum DeskError {
    #[error("Ошибка валидации: {0}")]
    Validation(ValidationErrors),
    #[error("Ошибка доступа к данным: {0}")]
    DataAccess(String),
    /// Delete rejected by the store because the row is still referenced.
    #[error("Ошибка удаления: {0}")]
    ConstraintViolation(String),
    /// Save rejected by the store, e.g. a duplicate login.
    #[error("Ошибка сохранения: {0}")]
    Conflict(String),
    #[error("Запись не найдена: {entity} {id}")]
    NotFound { entity: EntityKind, id: EntityId },
    #[error("Неверный логин или пароль")]
    Authentication,
    #[error("Недостаточно прав")]
    Forbidden,
}

impl DeskError {
    /// Maps a failed delete; constraint rejections keep only the store's cause.
    pub fn from_delete(err: StoreError) -> Self {
        match err {
            StoreError::Constraint(cause) => DeskError::ConstraintViolation(cause),
            other => other.into(),
        }
    }
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => DeskError::NotFound { entity, id },
            StoreError::Constraint(cause) => DeskError::Conflict(cause),
            StoreError::Unavailable(cause) => DeskError::DataAccess(cause),
        }
    }
}

impl From<ValidationErrors> for DeskError {
    fn from(errors: ValidationErrors) -> Self {
        DeskError::Validation(errors)
    }
}
