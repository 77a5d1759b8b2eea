use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type EntityId = i64;

/// A record together with the surrogate id the store assigned to it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stored<T> {
    pub id: EntityId,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Stored<T> {
    pub fn new(id: EntityId, record: T) -> Self {
        Self { id, record }
    }
}

impl<T> Deref for Stored<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

impl<T> DerefMut for Stored<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.record
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Client,
    Employee,
    Point,
    Procuration,
    Contract,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Client => "client",
            EntityKind::Employee => "employee",
            EntityKind::Point => "point",
            EntityKind::Procuration => "procuration",
            EntityKind::Contract => "contract",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract status; stored and serialized as the Russian label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ContractStatus {
    #[serde(rename = "Активен")]
    Active,
    #[serde(rename = "Закрыт")]
    Closed,
    #[serde(rename = "Просрочен")]
    Overdue,
}

impl ContractStatus {
    pub const ALL: [ContractStatus; 3] = [
        ContractStatus::Active,
        ContractStatus::Closed,
        ContractStatus::Overdue,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ContractStatus::Active => "Активен",
            ContractStatus::Closed => "Закрыт",
            ContractStatus::Overdue => "Просрочен",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.label() == label.trim())
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }

    /// Parses a stored role, ignoring the `ROLE_` authority prefix.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let bare = raw.strip_prefix("ROLE_").unwrap_or(raw);
        match bare {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Client {
    pub full_name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub name: String,
    pub address: String,
}

/// Power of attorney granting an employee signing authority.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Procuration {
    pub number: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
    pub full_name: String,
    pub login: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub procuration_id: Option<EntityId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contract {
    pub client_id: EntityId,
    pub employee_id: EntityId,
    pub point_id: EntityId,
    pub amount: Decimal,
    pub term: NaiveDate,
    pub issue_date: NaiveDate,
    pub status: ContractStatus,
}
