//! Postgres connection pool lifecycle.
//!
//! The pool is built once at process start and injected into
//! `PgStore`; it is dropped with the process. Nothing holds a pool
//! in global state.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default connection cap. Kept low for single-user tooling.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connect a pool against `database_url` with the given cap.
///
/// # Errors
///
/// Returns the underlying sqlx error if the connection fails.
pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    // Integration test requires a real database:
    // DATABASE_URL=postgres://... cargo test -p council-store -- --ignored

    #[tokio::test]
    #[ignore = "requires database"]
    async fn pool_acquires_connection() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
        let pool = create_pool(&url, DEFAULT_MAX_CONNECTIONS)
            .await
            .expect("pool creation failed");

        let result: (i32,) = sqlx::query_as("SELECT 1")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);
    }
}
