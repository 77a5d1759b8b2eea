use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Client, Contract, Employee, EntityId, Point, Procuration, Stored};

pub type StoreResult<T> = Result<T, StoreError>;

// `save_*` inserts when `id` is `None` and overwrites the row otherwise.
// Name filters are case-insensitive substring matches.

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn all_clients(&self) -> StoreResult<Vec<Stored<Client>>>;
    async fn client_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Client>>>;
    async fn clients_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Client>>>;
    async fn save_client(&self, id: Option<EntityId>, client: Client)
    -> StoreResult<Stored<Client>>;
    async fn delete_client(&self, id: EntityId) -> StoreResult<()>;
}

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn all_employees(&self) -> StoreResult<Vec<Stored<Employee>>>;
    async fn employee_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Employee>>>;
    async fn employee_by_login(&self, login: &str) -> StoreResult<Option<Stored<Employee>>>;
    async fn employees_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Employee>>>;
    async fn count_employees_by_procuration(&self, procuration_id: EntityId) -> StoreResult<u64>;
    async fn save_employee(
        &self,
        id: Option<EntityId>,
        employee: Employee,
    ) -> StoreResult<Stored<Employee>>;
    async fn delete_employee(&self, id: EntityId) -> StoreResult<()>;
}

#[async_trait]
pub trait PointRepository: Send + Sync {
    async fn all_points(&self) -> StoreResult<Vec<Stored<Point>>>;
    async fn point_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Point>>>;
    async fn points_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Point>>>;
    async fn save_point(&self, id: Option<EntityId>, point: Point) -> StoreResult<Stored<Point>>;
    async fn delete_point(&self, id: EntityId) -> StoreResult<()>;
}

#[async_trait]
pub trait ProcurationRepository: Send + Sync {
    async fn all_procurations(&self) -> StoreResult<Vec<Stored<Procuration>>>;
    async fn procuration_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Procuration>>>;
    async fn procurations_by_number(&self, fragment: &str)
    -> StoreResult<Vec<Stored<Procuration>>>;
    async fn save_procuration(
        &self,
        id: Option<EntityId>,
        procuration: Procuration,
    ) -> StoreResult<Stored<Procuration>>;
    async fn delete_procuration(&self, id: EntityId) -> StoreResult<()>;
}

#[async_trait]
pub trait ContractRepository: Send + Sync {
    async fn all_contracts(&self) -> StoreResult<Vec<Stored<Contract>>>;
    async fn contract_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Contract>>>;
    async fn contracts_by_point(&self, point_id: EntityId) -> StoreResult<Vec<Stored<Contract>>>;
    /// `status` is compared against the stored status label verbatim.
    async fn contracts_by_point_and_status(
        &self,
        point_id: EntityId,
        status: &str,
    ) -> StoreResult<Vec<Stored<Contract>>>;
    async fn contracts_by_client_name(&self, fragment: &str)
    -> StoreResult<Vec<Stored<Contract>>>;
    async fn count_contracts_by_client(&self, client_id: EntityId) -> StoreResult<u64>;
    async fn count_contracts_by_employee(&self, employee_id: EntityId) -> StoreResult<u64>;
    async fn count_contracts_by_point(&self, point_id: EntityId) -> StoreResult<u64>;
    async fn save_contract(
        &self,
        id: Option<EntityId>,
        contract: Contract,
    ) -> StoreResult<Stored<Contract>>;
    async fn delete_contract(&self, id: EntityId) -> StoreResult<()>;
}

/// Everything the desk needs from persistence.
pub trait Store:
    ClientRepository
    + EmployeeRepository
    + PointRepository
    + ProcurationRepository
    + ContractRepository
{
}

impl<T> Store for T where
    T: ClientRepository
        + EmployeeRepository
        + PointRepository
        + ProcurationRepository
        + ContractRepository
{
}
