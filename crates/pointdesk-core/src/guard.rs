//! Deletion policy for entities other records point at.
//!
//! Deletes are optimistic: nothing is pre-checked, the store's referential
//! constraint decides and a rejection is reported as a deletion error.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DeskError;
use crate::models::{EntityId, EntityKind};
use crate::storage::{
    ClientRepository, ContractRepository, EmployeeRepository, PointRepository,
    ProcurationRepository, Store,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "entity", content = "id", rename_all = "snake_case")]
pub enum DeleteTarget {
    Client(EntityId),
    Employee(EntityId),
    Point(EntityId),
    Procuration(EntityId),
    Contract(EntityId),
}

impl DeleteTarget {
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        match kind {
            EntityKind::Client => DeleteTarget::Client(id),
            EntityKind::Employee => DeleteTarget::Employee(id),
            EntityKind::Point => DeleteTarget::Point(id),
            EntityKind::Procuration => DeleteTarget::Procuration(id),
            EntityKind::Contract => DeleteTarget::Contract(id),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            DeleteTarget::Client(_) => EntityKind::Client,
            DeleteTarget::Employee(_) => EntityKind::Employee,
            DeleteTarget::Point(_) => EntityKind::Point,
            DeleteTarget::Procuration(_) => EntityKind::Procuration,
            DeleteTarget::Contract(_) => EntityKind::Contract,
        }
    }

    pub fn id(&self) -> EntityId {
        match *self {
            DeleteTarget::Client(id)
            | DeleteTarget::Employee(id)
            | DeleteTarget::Point(id)
            | DeleteTarget::Procuration(id)
            | DeleteTarget::Contract(id) => id,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteCheck {
    /// Always true: the delete is attempted regardless of references.
    pub allowed: bool,
    pub blocking_references: u64,
}

/// Counts the live references to `target`.
pub async fn can_delete(store: &dyn Store, target: DeleteTarget) -> Result<DeleteCheck, DeskError> {
    let blocking_references = match target {
        DeleteTarget::Client(id) => store.count_contracts_by_client(id).await?,
        DeleteTarget::Employee(id) => store.count_contracts_by_employee(id).await?,
        DeleteTarget::Point(id) => store.count_contracts_by_point(id).await?,
        DeleteTarget::Procuration(id) => store.count_employees_by_procuration(id).await?,
        DeleteTarget::Contract(_) => 0,
    };

    Ok(DeleteCheck {
        allowed: true,
        blocking_references,
    })
}

/// Attempts the delete and maps a constraint rejection to
/// [`DeskError::ConstraintViolation`].
pub async fn delete(store: &dyn Store, target: DeleteTarget) -> Result<(), DeskError> {
    let result = match target {
        DeleteTarget::Client(id) => store.delete_client(id).await,
        DeleteTarget::Employee(id) => store.delete_employee(id).await,
        DeleteTarget::Point(id) => store.delete_point(id).await,
        DeleteTarget::Procuration(id) => store.delete_procuration(id).await,
        DeleteTarget::Contract(id) => store.delete_contract(id).await,
    };

    match result {
        Ok(()) => {
            info!("{} {} deleted", target.kind(), target.id());
            Ok(())
        }
        Err(err) => {
            let err = DeskError::from_delete(err);
            warn!("{} {} not deleted: {err}", target.kind(), target.id());
            Err(err)
        }
    }
}
