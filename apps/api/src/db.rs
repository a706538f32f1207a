use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Creates the `employees` and `resumes` tables if they do not exist yet.
/// Idempotent — safe to run on every startup.
pub async fn bootstrap_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS employees (
            id SERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            role VARCHAR(100) NOT NULL,
            email VARCHAR(160) NOT NULL UNIQUE,
            leave_date DATE,
            skills TEXT NOT NULL DEFAULT '',
            on_leave BOOLEAN NOT NULL DEFAULT FALSE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS resumes (
            id SERIAL PRIMARY KEY,
            employee_email VARCHAR(160),
            candidate_name VARCHAR(120),
            phone VARCHAR(60),
            skills TEXT,
            raw_text TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes separately — one command per prepared statement.
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_employees_email ON employees(email)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_resumes_employee_email ON resumes(employee_email)")
        .execute(pool)
        .await?;

    info!("Database schema ready (employees, resumes)");
    Ok(())
}
