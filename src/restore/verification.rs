use anyhow::{Context, Result};
use sqlx::{Connection, PgConnection};
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::utils::setting;

/// Basic post-restore verification: the restored database must be
/// reachable, and an empty public schema is worth a warning (an Odoo
/// database always has tables).
pub async fn verify_restore(config: &ResolvedConfig, restored_db: &str) -> Result<()> {
    let options = setting::admin_connect_options(config).database(restored_db);
    let mut conn = PgConnection::connect_with(&options)
        .await
        .with_context(|| format!("Failed to connect to restored database '{}'", restored_db))?;

    let table_count: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM pg_catalog.pg_tables WHERE schemaname = 'public'",
    )
    .fetch_one(&mut conn)
    .await
    .with_context(|| format!("Failed to count tables in restored database '{}'", restored_db))?;

    if table_count == 0 {
        warn!(
            "No tables found in the public schema of restored database '{}'",
            restored_db
        );
    } else {
        info!(
            "✓ Restore verification: {} table(s) in public schema of '{}'",
            table_count, restored_db
        );
    }
    let _ = conn.close().await;
    Ok(())
}
