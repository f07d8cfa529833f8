use sqlx_core::migrate::{MigrateError, Migrator};

use crate::config;

/// Bring the schema up to date. Returns how many migrations the directory holds.
pub async fn run(pool: &sqlx::SqlitePool) -> Result<usize, MigrateError> {
    let migrator = Migrator::new(config::migrations_dir()).await?;
    migrator.run(pool).await?;
    Ok(migrator.iter().count())
}

#[cfg(test)]
mod tests {
    use crate::db_users::memory_pool;

    #[tokio::test]
    async fn rerunning_is_a_no_op() {
        let pool = memory_pool().await;
        let applied = super::run(&pool).await.expect("second run");
        assert!(applied >= 1);

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
        )
        .fetch_one(&pool)
        .await
        .expect("inspect schema");
        assert_eq!(tables, 1);
    }
}
