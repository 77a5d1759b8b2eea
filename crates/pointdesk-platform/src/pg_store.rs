use async_trait::async_trait;
use pointdesk_core::{
    Client, ClientRepository, Contract, ContractRepository, ContractStatus, Employee,
    EmployeeRepository, EntityId, EntityKind, Point, PointRepository, Procuration,
    ProcurationRepository, Role, StoreError, StoreResult, Stored,
};
use sqlx::error::ErrorKind;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const CONTRACT_COLUMNS: &str =
    "id, client_id, employee_id, point_id, amount, term, issue_date, status";
const EMPLOYEE_COLUMNS: &str = "id, full_name, login, password_hash, role, procuration_id";

fn store_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(
            db_err.kind(),
            ErrorKind::ForeignKeyViolation | ErrorKind::UniqueViolation
        ) {
            return StoreError::Constraint(db_err.message().to_string());
        }
    }
    StoreError::Unavailable(err.to_string())
}

fn client_row(row: &PgRow) -> StoreResult<Stored<Client>> {
    Ok(Stored::new(
        row.try_get("id").map_err(store_error)?,
        Client {
            full_name: row.try_get("full_name").map_err(store_error)?,
            phone: row.try_get("phone").map_err(store_error)?,
        },
    ))
}

fn point_row(row: &PgRow) -> StoreResult<Stored<Point>> {
    Ok(Stored::new(
        row.try_get("id").map_err(store_error)?,
        Point {
            name: row.try_get("name").map_err(store_error)?,
            address: row.try_get("address").map_err(store_error)?,
        },
    ))
}

fn procuration_row(row: &PgRow) -> StoreResult<Stored<Procuration>> {
    Ok(Stored::new(
        row.try_get("id").map_err(store_error)?,
        Procuration {
            number: row.try_get("number").map_err(store_error)?,
            date: row.try_get("date").map_err(store_error)?,
        },
    ))
}

fn employee_row(row: &PgRow) -> StoreResult<Stored<Employee>> {
    let raw_role: String = row.try_get("role").map_err(store_error)?;
    let role = Role::parse(&raw_role)
        .ok_or_else(|| StoreError::Unavailable(format!("unknown role {raw_role}")))?;
    Ok(Stored::new(
        row.try_get("id").map_err(store_error)?,
        Employee {
            full_name: row.try_get("full_name").map_err(store_error)?,
            login: row.try_get("login").map_err(store_error)?,
            password_hash: row.try_get("password_hash").map_err(store_error)?,
            role,
            procuration_id: row.try_get("procuration_id").map_err(store_error)?,
        },
    ))
}

fn contract_row(row: &PgRow) -> StoreResult<Stored<Contract>> {
    let label: String = row.try_get("status").map_err(store_error)?;
    let status = ContractStatus::from_label(&label)
        .ok_or_else(|| StoreError::Unavailable(format!("unknown contract status {label}")))?;
    Ok(Stored::new(
        row.try_get("id").map_err(store_error)?,
        Contract {
            client_id: row.try_get("client_id").map_err(store_error)?,
            employee_id: row.try_get("employee_id").map_err(store_error)?,
            point_id: row.try_get("point_id").map_err(store_error)?,
            amount: row.try_get("amount").map_err(store_error)?,
            term: row.try_get("term").map_err(store_error)?,
            issue_date: row.try_get("issue_date").map_err(store_error)?,
            status,
        },
    ))
}

fn rows<T>(
    rows: Vec<PgRow>,
    map: fn(&PgRow) -> StoreResult<Stored<T>>,
) -> StoreResult<Vec<Stored<T>>> {
    rows.iter().map(map).collect()
}

fn saved<T>(
    row: Option<PgRow>,
    map: fn(&PgRow) -> StoreResult<Stored<T>>,
    entity: EntityKind,
    id: Option<EntityId>,
) -> StoreResult<Stored<T>> {
    match row {
        Some(row) => map(&row),
        None => Err(StoreError::NotFound {
            entity,
            id: id.unwrap_or_default(),
        }),
    }
}

fn count(row: PgRow) -> StoreResult<u64> {
    let count: i64 = row.try_get("count").map_err(store_error)?;
    Ok(count.max(0) as u64)
}

/// Pattern for `ILIKE ... ESCAPE '\'`; wildcards in the fragment match literally.
fn like(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Postgres-backed store; the schema comes from [`crate::db::ensure_schema`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn delete_row(&self, table: &str, entity: EntityKind, id: EntityId) -> StoreResult<()> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity, id });
        }
        Ok(())
    }
}

#[async_trait]
impl ClientRepository for PgStore {
    async fn all_clients(&self) -> StoreResult<Vec<Stored<Client>>> {
        let fetched = sqlx::query("SELECT id, full_name, phone FROM clients ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows(fetched, client_row)
    }

    async fn client_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Client>>> {
        let row = sqlx::query("SELECT id, full_name, phone FROM clients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.as_ref().map(client_row).transpose()
    }

    async fn clients_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Client>>> {
        let fetched = sqlx::query(
            "SELECT id, full_name, phone FROM clients \
             WHERE full_name ILIKE $1 ESCAPE '\\' ORDER BY id",
        )
        .bind(like(fragment))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, client_row)
    }

    async fn save_client(
        &self,
        id: Option<EntityId>,
        client: Client,
    ) -> StoreResult<Stored<Client>> {
        let sql = match id {
            None => {
                "INSERT INTO clients (full_name, phone) VALUES ($1, $2) \
                 RETURNING id, full_name, phone"
            }
            Some(_) => {
                "UPDATE clients SET full_name = $1, phone = $2 WHERE id = $3 \
                 RETURNING id, full_name, phone"
            }
        };
        let mut query = sqlx::query(sql).bind(&client.full_name).bind(&client.phone);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        saved(row, client_row, EntityKind::Client, id)
    }

    async fn delete_client(&self, id: EntityId) -> StoreResult<()> {
        self.delete_row("clients", EntityKind::Client, id).await
    }
}

#[async_trait]
impl EmployeeRepository for PgStore {
    async fn all_employees(&self) -> StoreResult<Vec<Stored<Employee>>> {
        let fetched = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, employee_row)
    }

    async fn employee_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Employee>>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.as_ref().map(employee_row).transpose()
    }

    async fn employee_by_login(&self, login: &str) -> StoreResult<Option<Stored<Employee>>> {
        let row = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees WHERE login = $1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.as_ref().map(employee_row).transpose()
    }

    async fn employees_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Employee>>> {
        let fetched = sqlx::query(&format!(
            "SELECT {EMPLOYEE_COLUMNS} FROM employees \
             WHERE full_name ILIKE $1 ESCAPE '\\' ORDER BY id"
        ))
        .bind(like(fragment))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, employee_row)
    }

    async fn count_employees_by_procuration(&self, procuration_id: EntityId) -> StoreResult<u64> {
        let row =
            sqlx::query("SELECT COUNT(*) AS count FROM employees WHERE procuration_id = $1")
                .bind(procuration_id)
                .fetch_one(&self.pool)
                .await
                .map_err(store_error)?;
        count(row)
    }

    async fn save_employee(
        &self,
        id: Option<EntityId>,
        employee: Employee,
    ) -> StoreResult<Stored<Employee>> {
        let sql = match id {
            None => format!(
                "INSERT INTO employees (full_name, login, password_hash, role, procuration_id) \
                 VALUES ($1, $2, $3, $4, $5) RETURNING {EMPLOYEE_COLUMNS}"
            ),
            Some(_) => format!(
                "UPDATE employees SET full_name = $1, login = $2, password_hash = $3, \
                 role = $4, procuration_id = $5 WHERE id = $6 RETURNING {EMPLOYEE_COLUMNS}"
            ),
        };
        let mut query = sqlx::query(&sql)
            .bind(&employee.full_name)
            .bind(&employee.login)
            .bind(&employee.password_hash)
            .bind(employee.role.as_str())
            .bind(employee.procuration_id);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        saved(row, employee_row, EntityKind::Employee, id)
    }

    async fn delete_employee(&self, id: EntityId) -> StoreResult<()> {
        self.delete_row("employees", EntityKind::Employee, id).await
    }
}

#[async_trait]
impl PointRepository for PgStore {
    async fn all_points(&self) -> StoreResult<Vec<Stored<Point>>> {
        let fetched = sqlx::query("SELECT id, name, address FROM points ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows(fetched, point_row)
    }

    async fn point_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Point>>> {
        let row = sqlx::query("SELECT id, name, address FROM points WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.as_ref().map(point_row).transpose()
    }

    async fn points_by_name(&self, fragment: &str) -> StoreResult<Vec<Stored<Point>>> {
        let fetched = sqlx::query(
            "SELECT id, name, address FROM points WHERE name ILIKE $1 ESCAPE '\\' ORDER BY id",
        )
        .bind(like(fragment))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, point_row)
    }

    async fn save_point(&self, id: Option<EntityId>, point: Point) -> StoreResult<Stored<Point>> {
        let sql = match id {
            None => {
                "INSERT INTO points (name, address) VALUES ($1, $2) \
                 RETURNING id, name, address"
            }
            Some(_) => {
                "UPDATE points SET name = $1, address = $2 WHERE id = $3 \
                 RETURNING id, name, address"
            }
        };
        let mut query = sqlx::query(sql).bind(&point.name).bind(&point.address);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        saved(row, point_row, EntityKind::Point, id)
    }

    async fn delete_point(&self, id: EntityId) -> StoreResult<()> {
        self.delete_row("points", EntityKind::Point, id).await
    }
}

#[async_trait]
impl ProcurationRepository for PgStore {
    async fn all_procurations(&self) -> StoreResult<Vec<Stored<Procuration>>> {
        let fetched = sqlx::query("SELECT id, number, date FROM procurations ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
        rows(fetched, procuration_row)
    }

    async fn procuration_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Procuration>>> {
        let row = sqlx::query("SELECT id, number, date FROM procurations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        row.as_ref().map(procuration_row).transpose()
    }

    async fn procurations_by_number(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Procuration>>> {
        let fetched = sqlx::query(
            "SELECT id, number, date FROM procurations \
             WHERE number ILIKE $1 ESCAPE '\\' ORDER BY id",
        )
        .bind(like(fragment))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, procuration_row)
    }

    async fn save_procuration(
        &self,
        id: Option<EntityId>,
        procuration: Procuration,
    ) -> StoreResult<Stored<Procuration>> {
        let sql = match id {
            None => {
                "INSERT INTO procurations (number, date) VALUES ($1, $2) \
                 RETURNING id, number, date"
            }
            Some(_) => {
                "UPDATE procurations SET number = $1, date = $2 WHERE id = $3 \
                 RETURNING id, number, date"
            }
        };
        let mut query = sqlx::query(sql)
            .bind(&procuration.number)
            .bind(procuration.date);
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        saved(row, procuration_row, EntityKind::Procuration, id)
    }

    async fn delete_procuration(&self, id: EntityId) -> StoreResult<()> {
        self.delete_row("procurations", EntityKind::Procuration, id)
            .await
    }
}

#[async_trait]
impl ContractRepository for PgStore {
    async fn all_contracts(&self) -> StoreResult<Vec<Stored<Contract>>> {
        let fetched = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, contract_row)
    }

    async fn contract_by_id(&self, id: EntityId) -> StoreResult<Option<Stored<Contract>>> {
        let row = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)?;
        row.as_ref().map(contract_row).transpose()
    }

    async fn contracts_by_point(&self, point_id: EntityId) -> StoreResult<Vec<Stored<Contract>>> {
        let fetched = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts WHERE point_id = $1 ORDER BY id"
        ))
        .bind(point_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, contract_row)
    }

    async fn contracts_by_point_and_status(
        &self,
        point_id: EntityId,
        status: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        let fetched = sqlx::query(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contracts \
             WHERE point_id = $1 AND status = $2 ORDER BY id"
        ))
        .bind(point_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, contract_row)
    }

    async fn contracts_by_client_name(
        &self,
        fragment: &str,
    ) -> StoreResult<Vec<Stored<Contract>>> {
        let fetched = sqlx::query(
            "SELECT c.id, c.client_id, c.employee_id, c.point_id, c.amount, c.term, \
             c.issue_date, c.status \
             FROM contracts c JOIN clients cl ON cl.id = c.client_id \
             WHERE cl.full_name ILIKE $1 ESCAPE '\\' ORDER BY c.id",
        )
        .bind(like(fragment))
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;
        rows(fetched, contract_row)
    }

    async fn count_contracts_by_client(&self, client_id: EntityId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM contracts WHERE client_id = $1")
            .bind(client_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        count(row)
    }

    async fn count_contracts_by_employee(&self, employee_id: EntityId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM contracts WHERE employee_id = $1")
            .bind(employee_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        count(row)
    }

    async fn count_contracts_by_point(&self, point_id: EntityId) -> StoreResult<u64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM contracts WHERE point_id = $1")
            .bind(point_id)
            .fetch_one(&self.pool)
            .await
            .map_err(store_error)?;
        count(row)
    }

    async fn save_contract(
        &self,
        id: Option<EntityId>,
        contract: Contract,
    ) -> StoreResult<Stored<Contract>> {
        let sql = match id {
            None => format!(
                "INSERT INTO contracts \
                 (client_id, employee_id, point_id, amount, term, issue_date, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {CONTRACT_COLUMNS}"
            ),
            Some(_) => format!(
                "UPDATE contracts SET client_id = $1, employee_id = $2, point_id = $3, \
                 amount = $4, term = $5, issue_date = $6, status = $7 \
                 WHERE id = $8 RETURNING {CONTRACT_COLUMNS}"
            ),
        };
        let mut query = sqlx::query(&sql)
            .bind(contract.client_id)
            .bind(contract.employee_id)
            .bind(contract.point_id)
            .bind(contract.amount)
            .bind(contract.term)
            .bind(contract.issue_date)
            .bind(contract.status.label());
        if let Some(id) = id {
            query = query.bind(id);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;
        saved(row, contract_row, EntityKind::Contract, id)
    }

    async fn delete_contract(&self, id: EntityId) -> StoreResult<()> {
        self.delete_row("contracts", EntityKind::Contract, id).await
    }
}
