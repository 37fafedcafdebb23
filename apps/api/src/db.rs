use anyhow::{Context, Result};
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

/// Migrations embedded from `apps/api/migrations`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("Failed to apply database migrations")?;

    info!("Database migrations applied");
    Ok(())
}

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

/// True when the error is a unique-constraint violation raised by Postgres.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some(UNIQUE_VIOLATION),
        _ => false,
    }
}

/// Row seeding shared by the database-backed tests.
#[cfg(test)]
pub mod fixtures {
    use sqlx::PgPool;
    use uuid::Uuid;

    pub async fn seed_user(pool: &PgPool, role: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, email, full_name, password_hash, role) \
             VALUES ($1, $2, $3, 'Test User', 'not-a-hash', $4)",
        )
        .bind(id)
        .bind(format!("user-{id}"))
        .bind(format!("{id}@example.com"))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    /// Inserts a client and an open requirement under it.
    pub async fn seed_requirement(pool: &PgPool, created_by: Uuid, assigned_to: Option<Uuid>) -> Uuid {
        let client_id = Uuid::new_v4();
        sqlx::query("INSERT INTO clients (id, name) VALUES ($1, $2)")
            .bind(client_id)
            .bind(format!("Client {client_id}"))
            .execute(pool)
            .await
            .unwrap();

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO requirements (id, req_code, client_id, title, employment_mode, created_by, assigned_to) \
             VALUES ($1, $2, $3, 'Backend Engineer', 'permanent', $4, $5)",
        )
        .bind(id)
        .bind(format!("REQ-{id}"))
        .bind(client_id)
        .bind(created_by)
        .bind(assigned_to)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    pub async fn seed_candidate(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO candidates (id, name, email) VALUES ($1, 'Jane Doe', $2)")
            .bind(id)
            .bind(format!("{id}@candidates.example.com"))
            .execute(pool)
            .await
            .unwrap();
        id
    }
}
