use chrono::{DateTime, Utc};
use pointdesk_core::{
    ContractForm, Employee, EntityId, Role, Stored, SummaryRow, ValidationErrors,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub employee: EmployeeView,
}

/// Employee as shown to clients; never carries the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmployeeView {
    pub id: EntityId,
    pub full_name: String,
    pub login: String,
    pub role: Role,
    pub procuration_id: Option<EntityId>,
}

impl From<&Stored<Employee>> for EmployeeView {
    fn from(employee: &Stored<Employee>) -> Self {
        Self {
            id: employee.id,
            full_name: employee.full_name.clone(),
            login: employee.login.clone(),
            role: employee.role,
            procuration_id: employee.procuration_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Case-insensitive name fragment; blank lists everything.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractSearchQuery {
    /// Client name fragment.
    pub client: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub total: usize,
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for ListResponse<T> {
    fn from(items: Vec<T>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractDefaults {
    pub form: ContractForm,
    pub employee: Option<EmployeeView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReportResponse {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<SummaryRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ValidationErrors>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}
