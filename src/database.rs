//! PostgreSQL pool construction.
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Username and password used when `config.yaml` provides none.
pub const DEFAULT_CREDENTIALS: &str = "postgres";
/// Database name used when `config.yaml` provides none.
pub const DEFAULT_DATABASE_NAME: &str = "annuaire";
/// Pool size used when `config.yaml` provides none.
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Holds the connection pool handed to the store adapters.
#[derive(Clone)]
pub struct Database {
    /// Shared PostgreSQL pool.
    pub postgres: PgPool,
}

impl Database {
    /// Init database connections.
    pub async fn new(
        hostname: &str,
        username: &str,
        password: &str,
        db: &str,
        pool: u32,
    ) -> Result<Self, sqlx::Error> {
        let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
        let postgres = PgPoolOptions::new()
            .max_connections(pool)
            .connect(&addr)
            .await?;

        tracing::info!(%hostname, %db, "postgres connected");

        Ok(Self { postgres })
    }
}
