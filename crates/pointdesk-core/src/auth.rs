use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::DeskError;
use crate::models::{Employee, EntityId, Role, Stored};
use crate::storage::{EmployeeRepository, Store};

pub const ADMIN_LOGIN: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const ADMIN_FULL_NAME: &str = "Администратор";

/// The authenticated employee behind a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub employee_id: EntityId,
    pub login: String,
    pub full_name: String,
    pub role: Role,
}

impl Principal {
    pub fn from_employee(employee: &Stored<Employee>) -> Self {
        Self {
            employee_id: employee.id,
            login: employee.login.clone(),
            full_name: employee.full_name.clone(),
            role: employee.role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), DeskError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(DeskError::Forbidden)
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Checks credentials against the employee table.
///
/// Unknown login and wrong password are indistinguishable to the caller.
pub async fn authenticate(
    store: &dyn Store,
    login: &str,
    password: &str,
) -> Result<Principal, DeskError> {
    let login = login.trim();
    let Some(employee) = store.employee_by_login(login).await? else {
        warn!("login rejected for unknown user {login}");
        return Err(DeskError::Authentication);
    };

    if !verify_password(password, &employee.password_hash) {
        warn!("login rejected for {login}: bad password");
        return Err(DeskError::Authentication);
    }

    Ok(Principal::from_employee(&employee))
}

/// Creates the `admin` account when it is missing. Returns whether it did.
pub async fn ensure_admin(store: &dyn Store, password: &str) -> Result<bool, DeskError> {
    if store.employee_by_login(ADMIN_LOGIN).await?.is_some() {
        return Ok(false);
    }

    let password_hash =
        hash_password(password).map_err(|err| DeskError::DataAccess(err.to_string()))?;
    let admin = Employee {
        full_name: ADMIN_FULL_NAME.to_string(),
        login: ADMIN_LOGIN.to_string(),
        password_hash,
        role: Role::Admin,
        procuration_id: None,
    };
    let saved = store.save_employee(None, admin).await?;
    info!("bootstrapped administrator account {} (id {})", ADMIN_LOGIN, saved.id);
    Ok(true)
}
