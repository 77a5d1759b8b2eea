#![allow(dead_code)]

use std::sync::Arc;

use chrono::NaiveDate;
use pointdesk_core::{
    Client, ClientForm, ClientRepository, Contract, ContractForm, ContractRepository,
    ContractStatus, Desk, Employee, EmployeeForm, EmployeeRepository, EntityId, Point,
    PointRepository, Role, Stored,
};
use pointdesk_store::{BroadcastNotifier, InMemoryStore};
use rust_decimal::Decimal;

pub fn far_future() -> NaiveDate {
    NaiveDate::from_ymd_opt(2099, 12, 31).unwrap()
}

pub fn desk() -> (Desk, Arc<InMemoryStore>, Arc<BroadcastNotifier>) {
    let store = Arc::new(InMemoryStore::new());
    let notifier = Arc::new(BroadcastNotifier::default());
    let desk = Desk::new(store.clone(), notifier.clone());
    (desk, store, notifier)
}

pub fn client_form(name: &str) -> ClientForm {
    ClientForm {
        full_name: name.to_string(),
        phone: "+7 999 123-45-67".to_string(),
    }
}

pub fn employee_form(login: &str, password: &str, role: Role) -> EmployeeForm {
    EmployeeForm {
        full_name: format!("Сотрудник {login}"),
        login: login.to_string(),
        password: password.to_string(),
        confirm_password: password.to_string(),
        role: Some(role),
        procuration_id: None,
    }
}

pub fn contract_form(client: EntityId, employee: EntityId, point: EntityId) -> ContractForm {
    ContractForm {
        client_id: Some(client),
        employee_id: Some(employee),
        point_id: Some(point),
        amount: Some(Decimal::new(100, 0)),
        term: Some(far_future()),
        status: Some(ContractStatus::Active),
        issue_date: None,
    }
}

pub async fn add_point(store: &InMemoryStore, name: &str) -> Stored<Point> {
    store
        .save_point(
            None,
            Point {
                name: name.to_string(),
                address: format!("{name}, ул. Мира, 5"),
            },
        )
        .await
        .unwrap()
}

pub async fn add_client(store: &InMemoryStore, name: &str) -> Stored<Client> {
    store
        .save_client(
            None,
            Client {
                full_name: name.to_string(),
                phone: "+79990001122".to_string(),
            },
        )
        .await
        .unwrap()
}

pub async fn add_employee(store: &InMemoryStore, login: &str) -> Stored<Employee> {
    store
        .save_employee(
            None,
            Employee {
                full_name: format!("Менеджер {login}"),
                login: login.to_string(),
                password_hash: String::new(),
                role: Role::User,
                procuration_id: None,
            },
        )
        .await
        .unwrap()
}

/// Inserts a contract directly, bypassing form validation.
pub async fn add_contract(
    store: &InMemoryStore,
    client_id: EntityId,
    employee_id: EntityId,
    point_id: EntityId,
    amount: i64,
    status: ContractStatus,
) -> Stored<Contract> {
    let refs = (client_id, employee_id, point_id);
    add_priced_contract(store, refs, Decimal::new(amount, 0), status).await
}

pub async fn add_priced_contract(
    store: &InMemoryStore,
    (client_id, employee_id, point_id): (EntityId, EntityId, EntityId),
    amount: Decimal,
    status: ContractStatus,
) -> Stored<Contract> {
    store
        .save_contract(
            None,
            Contract {
                client_id,
                employee_id,
                point_id,
                amount,
                term: far_future(),
                issue_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
                status,
            },
        )
        .await
        .unwrap()
}
