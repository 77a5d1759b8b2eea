//! Plain form payloads exchanged with the presentation layer and their
//! field validation rules.

use std::sync::LazyLock;

use chrono::{Months, NaiveDate};
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::models::{
    Client, Contract, ContractStatus, Employee, EntityId, Point, Procuration, Role,
};

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_CLIENT_NAME_LEN: usize = 3;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9\s\-]{10,15}$").expect("phone pattern is valid"));

/// What a form needs to know about the edit it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct FormContext {
    pub today: NaiveDate,
    pub is_new: bool,
}

impl FormContext {
    pub fn new(today: NaiveDate, is_new: bool) -> Self {
        Self { today, is_new }
    }
}

/// A form bound to one record type.
pub trait FormModel: Clone {
    type Record: Clone;

    fn blank(today: NaiveDate) -> Self;
    fn from_record(record: &Self::Record) -> Self;
    fn validate(&self, ctx: &FormContext) -> Result<(), ValidationErrors>;
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub phone: String,
}

impl ClientForm {
    pub fn into_record(self) -> Client {
        Client {
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

impl FormModel for ClientForm {
    type Record = Client;

    fn blank(_today: NaiveDate) -> Self {
        Self::default()
    }

    fn from_record(record: &Client) -> Self {
        Self {
            full_name: record.full_name.clone(),
            phone: record.phone.clone(),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let full_name = self.full_name.trim();
        if full_name.is_empty() {
            errors.add("full_name", "Обязательное поле");
        } else if full_name.chars().count() < MIN_CLIENT_NAME_LEN {
            errors.add("full_name", "Минимум 3 символа");
        }

        let phone = self.phone.trim();
        if phone.is_empty() {
            errors.add("phone", "Обязательное поле");
        } else if !PHONE_PATTERN.is_match(phone) {
            errors.add("phone", "Неверный формат телефона");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
}

impl PointForm {
    pub fn into_record(self) -> Point {
        Point {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
        }
    }
}

impl FormModel for PointForm {
    type Record = Point;

    fn blank(_today: NaiveDate) -> Self {
        Self::default()
    }

    fn from_record(record: &Point) -> Self {
        Self {
            name: record.name.clone(),
            address: record.address.clone(),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&self.name) {
            errors.add("name", "Введите название");
        }
        if is_blank(&self.address) {
            errors.add("address", "Введите адрес");
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcurationForm {
    #[serde(default)]
    pub number: String,
    pub date: Option<NaiveDate>,
}

impl ProcurationForm {
    /// Returns `None` while the form is incomplete; validate first.
    pub fn into_record(self) -> Option<Procuration> {
        Some(Procuration {
            number: self.number.trim().to_string(),
            date: self.date?,
        })
    }
}

impl FormModel for ProcurationForm {
    type Record = Procuration;

    fn blank(_today: NaiveDate) -> Self {
        Self::default()
    }

    fn from_record(record: &Procuration) -> Self {
        Self {
            number: record.number.clone(),
            date: Some(record.date),
        }
    }

    fn validate(&self, _ctx: &FormContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&self.number) {
            errors.add("number", "Введите номер");
        }
        if self.date.is_none() {
            errors.add("date", "Выберите дату");
        }
        errors.into_result()
    }
}

/// Employee form; an empty password on an existing employee keeps the stored hash.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeForm {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub login: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub confirm_password: String,
    pub role: Option<Role>,
    pub procuration_id: Option<EntityId>,
}

impl EmployeeForm {
    pub fn password_change(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(self.password.as_str())
        }
    }

    /// Builds the record around an already computed password hash.
    pub fn into_record(self, password_hash: String) -> Option<Employee> {
        Some(Employee {
            full_name: self.full_name.trim().to_string(),
            login: self.login.trim().to_string(),
            password_hash,
            role: self.role?,
            procuration_id: self.procuration_id,
        })
    }
}

impl FormModel for EmployeeForm {
    type Record = Employee;

    fn blank(_today: NaiveDate) -> Self {
        Self::default()
    }

    fn from_record(record: &Employee) -> Self {
        Self {
            full_name: record.full_name.clone(),
            login: record.login.clone(),
            password: String::new(),
            confirm_password: String::new(),
            role: Some(record.role),
            procuration_id: record.procuration_id,
        }
    }

    fn validate(&self, ctx: &FormContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if is_blank(&self.full_name) {
            errors.add("full_name", "Введите ФИО");
        }
        if is_blank(&self.login) {
            errors.add("login", "Введите логин");
        }
        if self.role.is_none() {
            errors.add("role", "Выберите роль");
        }

        let password_len = self.password.chars().count();
        if ctx.is_new && password_len < MIN_PASSWORD_LEN {
            errors.add(
                "password",
                "Для нового сотрудника пароль обязателен (мин. 6 символов)",
            );
        } else if password_len > 0 && password_len < MIN_PASSWORD_LEN {
            errors.add("password", "Пароль должен быть не менее 6 символов");
        }
        if self.password != self.confirm_password {
            errors.add("confirm_password", "Пароли не совпадают");
        }

        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractForm {
    pub client_id: Option<EntityId>,
    pub employee_id: Option<EntityId>,
    pub point_id: Option<EntityId>,
    pub amount: Option<Decimal>,
    pub term: Option<NaiveDate>,
    pub status: Option<ContractStatus>,
    /// Defaults to the day of creation.
    pub issue_date: Option<NaiveDate>,
}

impl ContractForm {
    /// Returns `None` while a required field is missing; validate first.
    pub fn into_record(self, today: NaiveDate) -> Option<Contract> {
        Some(Contract {
            client_id: self.client_id?,
            employee_id: self.employee_id?,
            point_id: self.point_id?,
            amount: self.amount?,
            term: self.term?,
            issue_date: self.issue_date.unwrap_or(today),
            status: self.status?,
        })
    }
}

/// Amounts are stored as NUMERIC(19, 2).
pub const AMOUNT_SCALE: u32 = 2;

pub fn default_term(today: NaiveDate) -> NaiveDate {
    today.checked_add_months(Months::new(1)).unwrap_or(today)
}

impl FormModel for ContractForm {
    type Record = Contract;

    fn blank(today: NaiveDate) -> Self {
        Self {
            amount: Some(Decimal::ZERO),
            term: Some(default_term(today)),
            status: Some(ContractStatus::Active),
            ..Self::default()
        }
    }

    fn from_record(record: &Contract) -> Self {
        Self {
            client_id: Some(record.client_id),
            employee_id: Some(record.employee_id),
            point_id: Some(record.point_id),
            amount: Some(record.amount),
            term: Some(record.term),
            status: Some(record.status),
            issue_date: Some(record.issue_date),
        }
    }

    fn validate(&self, ctx: &FormContext) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self.amount {
            None => errors.add("amount", "Укажите сумму"),
            Some(amount) if amount <= Decimal::ZERO => {
                errors.add("amount", "Сумма должна быть положительной")
            }
            Some(amount) if amount.normalize().scale() > AMOUNT_SCALE => {
                errors.add("amount", "Сумма указывается с точностью до копеек")
            }
            Some(_) => {}
        }
        if self.client_id.is_none() {
            errors.add("client_id", "Выберите клиента");
        }
        if self.employee_id.is_none() {
            errors.add("employee_id", "Выберите сотрудника");
        }
        if self.point_id.is_none() {
            errors.add("point_id", "Выберите точку выдачи");
        }
        if self.status.is_none() {
            errors.add("status", "Укажите статус");
        }
        match self.term {
            None => errors.add("term", "Укажите срок"),
            Some(term) if term < ctx.today => {
                errors.add("term", "Дата должна быть сегодня или позже")
            }
            Some(_) => {}
        }

        errors.into_result()
    }
}
