use anyhow::Result;
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::info;

/// Tables for the desk. References are `ON DELETE RESTRICT` so a referenced
/// row can never be removed out from under a contract or employee.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS clients (
    id BIGSERIAL PRIMARY KEY,
    full_name TEXT NOT NULL,
    phone TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS points (
    id BIGSERIAL PRIMARY KEY,
    name TEXT NOT NULL,
    address TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS procurations (
    id BIGSERIAL PRIMARY KEY,
    number TEXT NOT NULL,
    date DATE NOT NULL
);

CREATE TABLE IF NOT EXISTS employees (
    id BIGSERIAL PRIMARY KEY,
    full_name TEXT NOT NULL,
    login TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    procuration_id BIGINT REFERENCES procurations (id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS contracts (
    id BIGSERIAL PRIMARY KEY,
    client_id BIGINT NOT NULL REFERENCES clients (id) ON DELETE RESTRICT,
    employee_id BIGINT NOT NULL REFERENCES employees (id) ON DELETE RESTRICT,
    point_id BIGINT NOT NULL REFERENCES points (id) ON DELETE RESTRICT,
    amount NUMERIC(19, 2) NOT NULL,
    term DATE NOT NULL,
    issue_date DATE NOT NULL,
    status TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS contracts_point_idx ON contracts (point_id);
CREATE INDEX IF NOT EXISTS contracts_client_idx ON contracts (client_id);
"#;

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    Ok(pool)
}

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("database schema ready");
    Ok(())
}
