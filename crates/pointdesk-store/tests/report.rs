mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{add_client, add_contract, add_employee, add_point, add_priced_contract, desk};
use pointdesk_core::report::{INACTIVE_STATUS_LABEL, build_summary_report};
use pointdesk_core::{
    Client, ClientRepository, Contract, ContractRepository, ContractStatus, Desk, DeskError,
    Employee, EmployeeRepository, EntityId, NoopNotifier, Point, PointRepository, Procuration,
    ProcurationRepository, StoreError, StoreResult, Stored,
};
use pointdesk_store::InMemoryStore;
use rust_decimal::Decimal;

#[tokio::test]
async fn branch_totals_count_active_contracts_only() {
    let (desk, store, _) = desk();
    let point = add_point(&store, "Branch A").await;
    let client = add_client(&store, "Ольга Иванова").await;
    let manager = add_employee(&store, "olga").await;

    add_contract(&store, client.id, manager.id, point.id, 100, ContractStatus::Active).await;
    add_contract(&store, client.id, manager.id, point.id, 200, ContractStatus::Active).await;
    add_contract(&store, client.id, manager.id, point.id, 50, ContractStatus::Closed).await;

    let rows = desk.summary_report().await.unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.name, "Branch A");
    assert_eq!(row.total_count, 3);
    assert_eq!(row.active_count, 2);
    assert_eq!(row.active_sum, Decimal::new(300, 0));
    assert_eq!(row.inactive_count, 0);
    assert_eq!(row.inactive_sum, Decimal::ZERO);
}

#[tokio::test]
async fn no_points_gives_empty_report() {
    let (desk, _, _) = desk();
    assert!(desk.summary_report().await.unwrap().is_empty());
}

#[tokio::test]
async fn point_without_contracts_reports_zeros() {
    let (_, store, _) = desk();
    add_point(&store, "Пустая").await;

    let rows = build_summary_report(store.as_ref()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].total_count, 0);
    assert_eq!(rows[0].active_count, 0);
    assert_eq!(rows[0].active_sum, Decimal::ZERO);
}

#[tokio::test]
async fn rows_follow_point_order() {
    let (desk, store, _) = desk();
    for name in ["Север", "Юг", "Центр"] {
        add_point(&store, name).await;
    }

    let names: Vec<_> = desk
        .summary_report()
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.name)
        .collect();
    assert_eq!(names, ["Север", "Юг", "Центр"]);
}

#[tokio::test]
async fn report_is_repeatable() {
    let (desk, store, _) = desk();
    let point = add_point(&store, "Branch B").await;
    let client = add_client(&store, "Пётр Сидоров").await;
    let manager = add_employee(&store, "petr").await;
    add_contract(&store, client.id, manager.id, point.id, 75, ContractStatus::Overdue).await;

    let first = desk.summary_report().await.unwrap();
    let second = desk.summary_report().await.unwrap();
    assert_eq!(first, second);
}

// Regression: the inactive columns filter on a label no contract carries.
#[tokio::test]
async fn inactive_columns_stay_zero_for_every_status() {
    let (desk, store, _) = desk();
    let point = add_point(&store, "Branch C").await;
    let client = add_client(&store, "Мария Орлова").await;
    let manager = add_employee(&store, "maria").await;
    for status in ContractStatus::ALL {
        add_contract(&store, client.id, manager.id, point.id, 10, status).await;
    }

    assert!(ContractStatus::from_label(INACTIVE_STATUS_LABEL).is_none());
    let row = &desk.summary_report().await.unwrap()[0];
    assert_eq!(row.total_count, 3);
    assert_eq!(row.active_count, 1);
    assert_eq!(row.inactive_count, 0);
    assert_eq!(row.inactive_sum, Decimal::ZERO);
}

#[tokio::test]
async fn active_sum_is_exact_for_fractional_amounts() {
    let (desk, store, _) = desk();
    let point = add_point(&store, "Branch D").await;
    let client = add_client(&store, "Ирина Белова").await;
    let manager = add_employee(&store, "irina").await;
    let refs = (client.id, manager.id, point.id);
    add_priced_contract(&store, refs, Decimal::new(10, 2), ContractStatus::Active).await;
    add_priced_contract(&store, refs, Decimal::new(20, 2), ContractStatus::Active).await;
    add_priced_contract(&store, refs, Decimal::new(1999, 2), ContractStatus::Overdue).await;

    let row = &desk.summary_report().await.unwrap()[0];
    assert_eq!(row.total_count, 3);
    assert_eq!(row.active_sum, Decimal::new(30, 2));
    assert_eq!(row.active_sum.to_string(), "0.30");
}

/// Delegates to an in-memory store but fails contract listings for one point.
struct BrokenPointStore {
    inner: InMemoryStore,
    broken_point: EntityId,
}

impl BrokenPointStore {
    fn check(&self, point_id: EntityId) -> StoreResult<()> {
        if point_id == self.broken_point {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for BrokenPointStore {
    async fn all_clients(&self) -> StoreResult<Vec<Stored<Client>>> {
        self.inner.all_clients().await
    }

    async fn client_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Client>>> {
        self.inner.client_by_id(id).await
    }

    async fn clients_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Client>>> {
        self.inner.clients_by_name(fragment).await
    }

    async fn save_client(
        &self,
        id: Option<EntityId>,
        client: Client,
    ) -> StoreResult<Stored<Client>> {
        self.inner.save_client(id, client).await
    }

    async fn delete_client(&self, id: EntityId) -> StoreResult<()> {
        self.inner.delete_client(id).await
    }
}

#[async_trait]
impl EmployeeRepository for BrokenPointStore {
    async fn all_employees(&self) -> StoreResult<Vec<Stored<Employee>>> {
        self.inner.all_employees().await
    }

    async fn employee_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Employee>>> {
        self.inner.employee_by_id(id).await
    }

    async fn employee_by_login(&self, login: &str) -> StoreResult<Option<Stored<Employee>>> {
        self.inner.employee_by_login(login).await
    }

    async fn employees_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Employee>>> {
        self.inner.employees_by_name(fragment).await
    }

    async fn count_employees_by_procuration(&self, procuration_id: EntityId) -> StoreResult<u64> {
        self.inner.count_employees_by_procuration(procuration_id).await
    }

    async fn save_employee(
        &self,
        id: Option<EntityId>,
        employee: Employee,
    ) -> StoreResult<Stored<Employee>> {
        self.inner.save_employee(id, employee).await
    }

    async fn delete_employee(&self, id: EntityId) -> StoreResult<()> {
        self.inner.delete_employee(id).await
    }
}

#[async_trait]
impl PointRepository for BrokenPointStore {
    async fn all_points(&self) -> StoreResult<Vec<Stored<Point>>> {
        self.inner.all_points().await
    }

    async fn point_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Point>>> {
        self.inner.point_by_id(id).await
    }

    async fn points_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Point>>> {
        self.inner.points_by_name(fragment).await
    }

    async fn save_point(&self, id: Option<EntityId>, point: Point) -> StoreResult<Stored<Point>> {
        self.inner.save_point(id, point).await
    }

    async fn delete_point(&self, id: EntityId) -> StoreResult<()> {
        self.inner.delete_point(id).await
    }
}

#[async_trait]
impl ProcurationRepository for BrokenPointStore {
    async fn all_procurations(&self) -> StoreResult<Vec<Stored<Procuration>>> {
        self.inner.all_procurations().await
    }

    async fn procuration_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Procuration>>> {
        self.inner.procuration_by_id(id).await
    }

    async fn procurations_by_number(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Procuration>>> {
        self.inner.procurations_by_number(fragment).await
    }

    async fn save_procuration(
        &self,
        id: Option<EntityId>,
        procuration: Procuration,
    ) -> StoreResult<Stored<Procuration>> {
        self.inner.save_procuration(id, procuration).await
    }

    async fn delete_procuration(&self, id: EntityId) -> StoreResult<()> {
        self.inner.delete_procuration(id).await
    }
}

#[async_trait]
impl ContractRepository for BrokenPointStore {
    async fn all_contracts(&self) -> StoreResult<Vec<Stored<Contract>>> {
        self.inner.all_contracts().await
    }

    async fn contract_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Contract>>> {
        self.inner.contract_by_id(id).await
    }

    async fn contracts_by_point(&self, point_id: EntityId) -> StoreResult<Vec<Stored<Contract>>> {
        self.check(point_id)?;
        self.inner.contracts_by_point(point_id).await
    }

    async fn contracts_by_point_and_status(
        &self,
        point_id: EntityId,
        status: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        self.check(point_id)?;
        self.inner.contracts_by_point_and_status(point_id, status).await
    }

    async fn contracts_by_client_name(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        self.inner.contracts_by_client_name(fragment).await
    }

    async fn count_contracts_by_client(&self, client_id: EntityId) -> StoreResult<u64> {
        self.inner.count_contracts_by_client(client_id).await
    }

    async fn count_contracts_by_employee(&self, employee_id: EntityId) -> StoreResult<u64> {
        self.inner.count_contracts_by_employee(employee_id).await
    }

    async fn count_contracts_by_point(&self, point_id: EntityId) -> StoreResult<u64> {
        self.inner.count_contracts_by_point(point_id).await
    }

    async fn save_contract(
        &self,
        id: Option<EntityId>,
        contract: Contract,
    ) -> StoreResult<Stored<Contract>> {
        self.inner.save_contract(id, contract).await
    }

    async fn delete_contract(&self, id: EntityId) -> StoreResult<()> {
        self.inner.delete_contract(id).await
    }
}

#[tokio::test]
async fn failed_contract_listing_aborts_the_whole_report() {
    let inner = InMemoryStore::new();
    let first = add_point(&inner, "Север").await;
    let second = add_point(&inner, "Юг").await;
    let client = add_client(&inner, "Олег Смирнов").await;
    let manager = add_employee(&inner, "oleg").await;
    add_contract(&inner, client.id, manager.id, first.id, 100, ContractStatus::Active).await;

    let store = Arc::new(BrokenPointStore {
        inner,
        broken_point: second.id,
    });
    let desk = Desk::new(store, Arc::new(NoopNotifier));

    let result = desk.summary_report().await;
    assert!(
        matches!(result, Err(DeskError::DataAccess(ref cause)) if cause == "connection reset"),
        "expected a data access error, got {result:?}"
    );
}
