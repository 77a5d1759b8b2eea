use std::collections::BTreeMap;

use async_trait::async_trait;
use pointdesk_core::{
    Client, ClientRepository, Contract, ContractRepository, Employee, EmployeeRepository,
    EntityId, EntityKind, Point, PointRepository, Procuration, ProcurationRepository, StoreError,
    StoreResult, Stored,
};
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    clients: BTreeMap<EntityId, Client>,
    employees: BTreeMap<EntityId, Employee>,
    points: BTreeMap<EntityId, Point>,
    procurations: BTreeMap<EntityId, Procuration>,
    contracts: BTreeMap<EntityId, Contract>,
    sequence: EntityId,
}

impl Tables {
    fn next_id(&mut self) -> EntityId {
        self.sequence += 1;
        self.sequence
    }

    fn count_contracts(&self, references: impl Fn(&Contract) -> bool) -> u64 {
        self.contracts.values().filter(|c| references(c)).count() as u64
    }

    fn check_contract_refs(&self, contract: &Contract) -> StoreResult<()> {
        if !self.clients.contains_key(&contract.client_id) {
            return Err(missing_ref(EntityKind::Client, contract.client_id));
        }
        if !self.employees.contains_key(&contract.employee_id) {
            return Err(missing_ref(EntityKind::Employee, contract.employee_id));
        }
        if !self.points.contains_key(&contract.point_id) {
            return Err(missing_ref(EntityKind::Point, contract.point_id));
        }
        Ok(())
    }

    fn check_employee(&self, id: Option<EntityId>, employee: &Employee) -> StoreResult<()> {
        if let Some(procuration_id) = employee.procuration_id {
            if !self.procurations.contains_key(&procuration_id) {
                return Err(missing_ref(EntityKind::Procuration, procuration_id));
            }
        }
        let taken = self
            .employees
            .iter()
            .any(|(other, e)| Some(*other) != id && e.login == employee.login);
        if taken {
            return Err(StoreError::Constraint(format!(
                "login {} is already taken",
                employee.login
            )));
        }
        Ok(())
    }
}

fn missing_ref(entity: EntityKind, id: EntityId) -> StoreError {
    StoreError::Constraint(format!("{entity} {id} does not exist"))
}

fn referenced(entity: EntityKind, id: EntityId, count: u64, by: &str) -> StoreError {
    StoreError::Constraint(format!("{entity} {id} is referenced by {count} {by}(s)"))
}

fn matches(haystack: &str, fragment: &str) -> bool {
    haystack.to_lowercase().contains(&fragment.to_lowercase())
}

fn listed<T: Clone>(table: &BTreeMap<EntityId, T>, keep: impl Fn(&T) -> bool) -> Vec<Stored<T>> {
    table
        .iter()
        .filter(|(_, record)| keep(record))
        .map(|(id, record)| Stored::new(*id, record.clone()))
        .collect()
}

fn fetched<T: Clone>(table: &BTreeMap<EntityId, T>, id: EntityId) -> Option<Stored<T>> {
    table.get(&id).map(|record| Stored::new(id, record.clone()))
}

fn upsert<T: Clone>(
    table: &mut BTreeMap<EntityId, T>,
    entity: EntityKind,
    id: EntityId,
    is_new: bool,
    record: T,
) -> StoreResult<Stored<T>> {
    if !is_new && !table.contains_key(&id) {
        return Err(StoreError::NotFound { entity, id });
    }
    table.insert(id, record.clone());
    Ok(Stored::new(id, record))
}

fn removed<T>(
    table: &mut BTreeMap<EntityId, T>,
    entity: EntityKind,
    id: EntityId,
) -> StoreResult<()> {
    table
        .remove(&id)
        .map(|_| ())
        .ok_or(StoreError::NotFound { entity, id })
}

/// Process-local store with the same referential rules as the SQL schema.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryStore {
    async fn all_clients(&self) -> StoreResult<Vec<Stored<Client>>> {
        Ok(listed(&self.tables.read().await.clients, |_| true))
    }

    async fn client_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Client>>> {
        Ok(fetched(&self.tables.read().await.clients, id))
    }

    async fn clients_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Client>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.clients, |c| matches(&c.full_name, fragment)))
    }

    async fn save_client(
        &self,
        id: Option<EntityId>,
        client: Client,
    ) -> StoreResult<Stored<Client>> {
        let mut tables = self.tables.write().await;
        let target = id.unwrap_or_else(|| tables.next_id());
        upsert(&mut tables.clients, EntityKind::Client, target, id.is_none(), client)
    }

    async fn delete_client(&self, id: EntityId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let count = tables.count_contracts(|c| c.client_id == id);
        if count > 0 {
            return Err(referenced(EntityKind::Client, id, count, "contract"));
        }
        removed(&mut tables.clients, EntityKind::Client, id)
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryStore {
    async fn all_employees(&self) -> StoreResult<Vec<Stored<Employee>>> {
        Ok(listed(&self.tables.read().await.employees, |_| true))
    }

    async fn employee_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Employee>>> {
        Ok(fetched(&self.tables.read().await.employees, id))
    }

    async fn employee_by_login(&self, login: &str) -> StoreResult<Option<Stored<Employee>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.employees, |e| e.login == login).into_iter().next())
    }

    async fn employees_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Employee>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.employees, |e| matches(&e.full_name, fragment)))
    }

    async fn count_employees_by_procuration(&self, procuration_id: EntityId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables
            .employees
            .values()
            .filter(|e| e.procuration_id == Some(procuration_id))
            .count() as u64)
    }

    async fn save_employee(
        &self,
        id: Option<EntityId>,
        employee: Employee,
    ) -> StoreResult<Stored<Employee>> {
        let mut tables = self.tables.write().await;
        tables.check_employee(id, &employee)?;
        let target = id.unwrap_or_else(|| tables.next_id());
        upsert(&mut tables.employees, EntityKind::Employee, target, id.is_none(), employee)
    }

    async fn delete_employee(&self, id: EntityId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let count = tables.count_contracts(|c| c.employee_id == id);
        if count > 0 {
            return Err(referenced(EntityKind::Employee, id, count, "contract"));
        }
        removed(&mut tables.employees, EntityKind::Employee, id)
    }
}

#[async_trait]
impl PointRepository for InMemoryStore {
    async fn all_points(&self) -> StoreResult<Vec<Stored<Point>>> {
        Ok(listed(&self.tables.read().await.points, |_| true))
    }

    async fn point_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Point>>> {
        Ok(fetched(&self.tables.read().await.points, id))
    }

    async fn points_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Point>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.points, |p| matches(&p.name, fragment)))
    }

    async fn save_point(&self, id: Option<EntityId>, point: Point) -> StoreResult<Stored<Point>> {
        let mut tables = self.tables.write().await;
        let target = id.unwrap_or_else(|| tables.next_id());
        upsert(&mut tables.points, EntityKind::Point, target, id.is_none(), point)
    }

    async fn delete_point(&self, id: EntityId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let count = tables.count_contracts(|c| c.point_id == id);
        if count > 0 {
            return Err(referenced(EntityKind::Point, id, count, "contract"));
        }
        removed(&mut tables.points, EntityKind::Point, id)
    }
}

#[async_trait]
impl ProcurationRepository for InMemoryStore {
    async fn all_procurations(&self) -> StoreResult<Vec<Stored<Procuration>>> {
        Ok(listed(&self.tables.read().await.procurations, |_| true))
    }

    async fn procuration_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Procuration>>> {
        Ok(fetched(&self.tables.read().await.procurations, id))
    }

    async fn procurations_by_number(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Procuration>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.procurations, |p| matches(&p.number, fragment)))
    }

    async fn save_procuration(
        &self,
        id: Option<EntityId>,
        procuration: Procuration,
    ) -> StoreResult<Stored<Procuration>> {
        let mut tables = self.tables.write().await;
        let target = id.unwrap_or_else(|| tables.next_id());
        upsert(
            &mut tables.procurations,
            EntityKind::Procuration,
            target,
            id.is_none(),
            procuration,
        )
    }

    async fn delete_procuration(&self, id: EntityId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        let count = tables
            .employees
            .values()
            .filter(|e| e.procuration_id == Some(id))
            .count() as u64;
        if count > 0 {
            return Err(referenced(EntityKind::Procuration, id, count, "employee"));
        }
        removed(&mut tables.procurations, EntityKind::Procuration, id)
    }
}

#[async_trait]
impl ContractRepository for InMemoryStore {
    async fn all_contracts(&self) -> StoreResult<Vec<Stored<Contract>>> {
        Ok(listed(&self.tables.read().await.contracts, |_| true))
    }

    async fn contract_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Contract>>> {
        Ok(fetched(&self.tables.read().await.contracts, id))
    }

    async fn contracts_by_point(&self, point_id: EntityId) -> StoreResult<Vec<Stored<Contract>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.contracts, |c| c.point_id == point_id))
    }

    async fn contracts_by_point_and_status(
        &self,
        point_id: EntityId,
        status: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.contracts, |c| {
            c.point_id == point_id && c.status.label() == status
        }))
    }

    async fn contracts_by_client_name(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        let tables = self.tables.read().await;
        Ok(listed(&tables.contracts, |c| {
            tables
                .clients
                .get(&c.client_id)
                .is_some_and(|client| matches(&client.full_name, fragment))
        }))
    }

    async fn count_contracts_by_client(&self, client_id: EntityId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.count_contracts(|c| c.client_id == client_id))
    }

    async fn count_contracts_by_employee(&self, employee_id: EntityId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.count_contracts(|c| c.employee_id == employee_id))
    }

    async fn count_contracts_by_point(&self, point_id: EntityId) -> StoreResult<u64> {
        let tables = self.tables.read().await;
        Ok(tables.count_contracts(|c| c.point_id == point_id))
    }

    async fn save_contract(
        &self,
        id: Option<EntityId>,
        contract: Contract,
    ) -> StoreResult<Stored<Contract>> {
        let mut tables = self.tables.write().await;
        tables.check_contract_refs(&contract)?;
        let target = id.unwrap_or_else(|| tables.next_id());
        upsert(&mut tables.contracts, EntityKind::Contract, target, id.is_none(), contract)
    }

    async fn delete_contract(&self, id: EntityId) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        removed(&mut tables.contracts, EntityKind::Contract, id)
    }
}
