//! Administrative SQL helpers. Everything here talks to the `postgres`
//! maintenance database; the actual dump/restore/create/drop work goes
//! through the external client utilities.

use anyhow::{Context, Result};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use crate::config::ResolvedConfig;

/// Connection options for the `postgres` maintenance database, built from
/// discrete parts so the password never appears in a URL.
pub fn admin_connect_options(config: &ResolvedConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.db_host)
        .port(config.db_port)
        .username(&config.db_user)
        .database("postgres");
    if let Some(password) = &config.db_password {
        options = options.password(password);
    }
    options
}

/// Opens an administrative connection to the maintenance database.
pub async fn admin_connect(config: &ResolvedConfig) -> Result<PgConnection> {
    PgConnection::connect_with(&admin_connect_options(config))
        .await
        .with_context(|| {
            format!(
                "Failed to connect to 'postgres' database on {}:{}",
                config.db_host, config.db_port
            )
        })
}

/// Preflight ping. Logs the outcome and returns whether the server is
/// reachable with the resolved credentials.
pub async fn check_db_connection(config: &ResolvedConfig) -> bool {
    match admin_connect(config).await {
        Ok(mut conn) => {
            info!(
                "✓ Connected to PostgreSQL at {}:{}",
                config.db_host, config.db_port
            );
            let _ = conn.close().await;
            true
        }
        Err(e) => {
            warn!(
                "Failed to connect to PostgreSQL at {}:{}: {:?}",
                config.db_host, config.db_port, e
            );
            false
        }
    }
}

/// Checks whether a database exists on the server.
pub async fn database_exists(conn: &mut PgConnection, db_name: &str) -> Result<bool> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(conn)
            .await
            .with_context(|| format!("Failed to check existence of database '{}'", db_name))?;
    Ok(exists)
}

/// Terminates every backend connected to `db_name` other than our own.
/// Required before the database can be dropped or overwritten.
pub async fn terminate_connections(conn: &mut PgConnection, db_name: &str) -> Result<usize> {
    let terminated = sqlx::query(
        "SELECT pg_terminate_backend(pid) FROM pg_stat_activity \
         WHERE datname = $1 AND pid <> pg_backend_pid()",
    )
    .bind(db_name)
    .fetch_all(conn)
    .await
    .with_context(|| format!("Failed to terminate connections to database '{}'", db_name))?;

    if !terminated.is_empty() {
        info!(
            "Terminated {} active connection(s) to database '{}'",
            terminated.len(),
            db_name
        );
    }
    Ok(terminated.len())
}
