use std::sync::Arc;

use chrono::{Local, NaiveDate};
use tracing::{error, info, warn};

use crate::auth::{self, Principal};
use crate::error::{DeskError, ValidationErrors};
use crate::events::{ChangeNotifier, ChangeType, DataChangedEvent};
use crate::forms::{
    ClientForm, ContractForm, EmployeeForm, FormContext, FormModel, PointForm, ProcurationForm,
};
use crate::guard::{self, DeleteCheck, DeleteTarget};
use crate::models::{
    Client, Contract, Employee, EntityId, EntityKind, Point, Procuration, Stored,
};
use crate::pdf::{self, ContractCard};
use crate::report::{self, SummaryRow};
use crate::storage::{
    ClientRepository, ContractRepository, EmployeeRepository, PointRepository,
    ProcurationRepository, Store,
};

/// Trimmed, non-empty filter text, or `None` to list everything.
fn filter_text(filter: Option<&str>) -> Option<&str> {
    filter.map(str::trim).filter(|text| !text.is_empty())
}

fn found<T>(entity: EntityKind, id: EntityId, value: Option<T>) -> Result<T, DeskError> {
    value.ok_or(DeskError::NotFound { entity, id })
}

fn incomplete(field: &str, message: &str) -> DeskError {
    DeskError::Validation(ValidationErrors::single(field, message))
}

/// Back-office operations over a store, shared by every presentation surface.
#[derive(Clone)]
pub struct Desk {
    store: Arc<dyn Store>,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Desk {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn ChangeNotifier>) -> Self {
        Self { store, notifier }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    async fn notify(&self, entity: EntityKind, change: ChangeType, id: EntityId) {
        let event = DataChangedEvent::now(entity, change, id);
        if let Err(err) = self.notifier.publish(&event).await {
            warn!("failed to publish {entity} {id} change: {err:#}");
        }
    }

    async fn saved<T>(
        &self,
        entity: EntityKind,
        is_new: bool,
        saved: Stored<T>,
    ) -> Result<Stored<T>, DeskError> {
        let change = if is_new {
            ChangeType::Created
        } else {
            ChangeType::Updated
        };
        info!("{entity} {} saved", saved.id);
        self.notify(entity, change, saved.id).await;
        Ok(saved)
    }

    async fn remove(&self, target: DeleteTarget) -> Result<(), DeskError> {
        guard::delete(self.store(), target).await?;
        self.notify(target.kind(), ChangeType::Deleted, target.id())
            .await;
        Ok(())
    }

    pub async fn can_delete(&self, target: DeleteTarget) -> Result<DeleteCheck, DeskError> {
        guard::can_delete(self.store(), target).await
    }

    pub async fn authenticate(&self, login: &str, password: &str) -> Result<Principal, DeskError> {
        auth::authenticate(self.store(), login, password).await
    }

    pub async fn ensure_admin(&self, password: &str) -> Result<bool, DeskError> {
        auth::ensure_admin(self.store(), password).await
    }

    pub async fn summary_report(&self) -> Result<Vec<SummaryRow>, DeskError> {
        report::build_summary_report(self.store())
            .await
            .inspect_err(|err| error!("summary report failed: {err}"))
            .map_err(DeskError::from)
    }

    pub async fn clients(&self, filter: Option<&str>) -> Result<Vec<Stored<Client>>, DeskError> {
        let clients = match filter_text(filter) {
            Some(text) => self.store.clients_by_name(text).await,
            None => self.store.all_clients().await,
        };
        Ok(clients.inspect_err(|err| error!("failed to load clients: {err}"))?)
    }

    pub async fn client(&self, id: EntityId) -> Result<Stored<Client>, DeskError> {
        found(EntityKind::Client, id, self.store.client_by_id(id).await?)
    }

    pub async fn save_client(
        &self,
        id: Option<EntityId>,
        form: ClientForm,
    ) -> Result<Stored<Client>, DeskError> {
        form.validate(&FormContext::new(Self::today(), id.is_none()))?;
        let saved = self.store.save_client(id, form.into_record()).await?;
        self.saved(EntityKind::Client, id.is_none(), saved).await
    }

    pub async fn delete_client(&self, id: EntityId) -> Result<(), DeskError> {
        self.remove(DeleteTarget::Client(id)).await
    }

    pub async fn points(&self, filter: Option<&str>) -> Result<Vec<Stored<Point>>, DeskError> {
        let points = match filter_text(filter) {
            Some(text) => self.store.points_by_name(text).await,
            None => self.store.all_points().await,
        };
        Ok(points.inspect_err(|err| error!("failed to load points: {err}"))?)
    }

    pub async fn point(&self, id: EntityId) -> Result<Stored<Point>, DeskError> {
        found(EntityKind::Point, id, self.store.point_by_id(id).await?)
    }

    pub async fn save_point(
        &self,
        id: Option<EntityId>,
        form: PointForm,
    ) -> Result<Stored<Point>, DeskError> {
        form.validate(&FormContext::new(Self::today(), id.is_none()))?;
        let saved = self.store.save_point(id, form.into_record()).await?;
        self.saved(EntityKind::Point, id.is_none(), saved).await
    }

    pub async fn delete_point(&self, id: EntityId) -> Result<(), DeskError> {
        self.remove(DeleteTarget::Point(id)).await
    }

    pub async fn procurations(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Stored<Procuration>>, DeskError> {
        let procurations = match filter_text(filter) {
            Some(text) => self.store.procurations_by_number(text).await,
            None => self.store.all_procurations().await,
        };
        Ok(procurations.inspect_err(|err| error!("failed to load procurations: {err}"))?)
    }

    pub async fn procuration(&self, id: EntityId) -> Result<Stored<Procuration>, DeskError> {
        found(
            EntityKind::Procuration,
            id,
            self.store.procuration_by_id(id).await?,
        )
    }

    pub async fn save_procuration(
        &self,
        id: Option<EntityId>,
        form: ProcurationForm,
    ) -> Result<Stored<Procuration>, DeskError> {
        form.validate(&FormContext::new(Self::today(), id.is_none()))?;
        let record = form
            .into_record()
            .ok_or_else(|| incomplete("date", "Выберите дату"))?;
        let saved = self.store.save_procuration(id, record).await?;
        self.saved(EntityKind::Procuration, id.is_none(), saved)
            .await
    }

    pub async fn delete_procuration(&self, id: EntityId) -> Result<(), DeskError> {
        self.remove(DeleteTarget::Procuration(id)).await
    }

    pub async fn employees(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Stored<Employee>>, DeskError> {
        let employees = match filter_text(filter) {
            Some(text) => self.store.employees_by_name(text).await,
            None => self.store.all_employees().await,
        };
        Ok(employees.inspect_err(|err| error!("failed to load employees: {err}"))?)
    }

    pub async fn employee(&self, id: EntityId) -> Result<Stored<Employee>, DeskError> {
        found(EntityKind::Employee, id, self.store.employee_by_id(id).await?)
    }

    /// Saves an employee, hashing a new password or keeping the stored hash.
    pub async fn save_employee(
        &self,
        id: Option<EntityId>,
        form: EmployeeForm,
    ) -> Result<Stored<Employee>, DeskError> {
        form.validate(&FormContext::new(Self::today(), id.is_none()))?;

        let existing = match id {
            Some(id) => Some(self.employee(id).await?),
            None => None,
        };

        let login = form.login.trim();
        if let Some(holder) = self.store.employee_by_login(login).await? {
            if Some(holder.id) != id {
                return Err(incomplete("login", "Логин уже используется"));
            }
        }
        if let Some(procuration_id) = form.procuration_id {
            if self.store.procuration_by_id(procuration_id).await?.is_none() {
                return Err(incomplete("procuration_id", "Доверенность не найдена"));
            }
        }

        let password_hash = match (form.password_change(), existing) {
            (Some(password), _) => auth::hash_password(password)
                .map_err(|err| DeskError::DataAccess(err.to_string()))?,
            (None, Some(existing)) => existing.record.password_hash,
            (None, None) => {
                return Err(incomplete(
                    "password",
                    "Для нового сотрудника пароль обязателен (мин. 6 символов)",
                ));
            }
        };

        let record = form
            .into_record(password_hash)
            .ok_or_else(|| incomplete("role", "Выберите роль"))?;
        let saved = self.store.save_employee(id, record).await?;
        self.saved(EntityKind::Employee, id.is_none(), saved).await
    }

    pub async fn delete_employee(&self, id: EntityId) -> Result<(), DeskError> {
        self.remove(DeleteTarget::Employee(id)).await
    }

    pub async fn contracts(
        &self,
        client_filter: Option<&str>,
    ) -> Result<Vec<Stored<Contract>>, DeskError> {
        let contracts = match filter_text(client_filter) {
            Some(text) => self.store.contracts_by_client_name(text).await,
            None => self.store.all_contracts().await,
        };
        Ok(contracts.inspect_err(|err| error!("failed to load contracts: {err}"))?)
    }

    pub async fn contract(&self, id: EntityId) -> Result<Stored<Contract>, DeskError> {
        found(EntityKind::Contract, id, self.store.contract_by_id(id).await?)
    }

    /// A new contract form, pre-filled with the signed-in employee.
    pub async fn blank_contract(&self, principal: &Principal) -> Result<ContractForm, DeskError> {
        let mut form = ContractForm::blank(Self::today());
        if self
            .store
            .employee_by_id(principal.employee_id)
            .await?
            .is_some()
        {
            form.employee_id = Some(principal.employee_id);
        }
        Ok(form)
    }

    /// Saves a contract after checking that its client, employee and point exist.
    pub async fn save_contract(
        &self,
        id: Option<EntityId>,
        mut form: ContractForm,
    ) -> Result<Stored<Contract>, DeskError> {
        let today = Self::today();
        form.validate(&FormContext::new(today, id.is_none()))?;

        let mut missing = ValidationErrors::new();
        if let Some(client_id) = form.client_id {
            if self.store.client_by_id(client_id).await?.is_none() {
                missing.add("client_id", "Клиент не найден");
            }
        }
        if let Some(employee_id) = form.employee_id {
            if self.store.employee_by_id(employee_id).await?.is_none() {
                missing.add("employee_id", "Сотрудник не найден");
            }
        }
        if let Some(point_id) = form.point_id {
            if self.store.point_by_id(point_id).await?.is_none() {
                missing.add("point_id", "Точка выдачи не найдена");
            }
        }
        missing.into_result()?;

        if let (Some(id), None) = (id, form.issue_date) {
            form.issue_date = Some(self.contract(id).await?.issue_date);
        }

        let record = form
            .into_record(today)
            .ok_or_else(|| incomplete("contract", "Заполните обязательные поля"))?;
        let saved = self.store.save_contract(id, record).await?;
        self.saved(EntityKind::Contract, id.is_none(), saved).await
    }

    pub async fn delete_contract(&self, id: EntityId) -> Result<(), DeskError> {
        self.remove(DeleteTarget::Contract(id)).await
    }

    pub async fn contract_card(&self, id: EntityId) -> Result<ContractCard, DeskError> {
        let contract = self.contract(id).await?;
        let client_name = self
            .store
            .client_by_id(contract.client_id)
            .await?
            .map(|client| client.record.full_name);
        let manager_name = self
            .store
            .employee_by_id(contract.employee_id)
            .await?
            .map(|employee| employee.record.full_name);

        Ok(ContractCard {
            contract_id: contract.id,
            client_name,
            amount: contract.amount,
            term: contract.term,
            manager_name,
            status: contract.status,
        })
    }

    /// Renders the contract printout; returns the file name and PDF bytes.
    pub async fn contract_pdf(&self, id: EntityId) -> Result<(String, Vec<u8>), DeskError> {
        let card = self.contract_card(id).await?;
        Ok((card.file_name(), pdf::render_contract(&card)))
    }
}
