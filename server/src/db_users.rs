use osiris_shared::RosterEntry;
use sqlx::SqlitePool;

type UserRow = (
    i64,
    String,
    String,
    Option<f64>,
    Option<f64>,
    Option<String>,
    Option<String>,
    i64,
);

/// Validated register input, ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpsert {
    pub name: String,
    pub ip: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub city: Option<String>,
    pub country: Option<String>,
}

/// All users, most recently seen first.
pub async fn list(pool: &SqlitePool) -> Result<Vec<RosterEntry>, sqlx_core::Error> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, ip, name, lat, lng, city, country, last_seen \
         FROM users ORDER BY last_seen DESC, id DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(
            |(id, ip, name, lat, lng, city, country, last_seen)| RosterEntry {
                id,
                ip,
                name,
                lat,
                lng,
                city,
                country,
                last_seen,
            },
        )
        .collect())
}

/// Insert or refresh the row keyed by `name`. `created_at` is only set on insert.
pub async fn upsert(
    pool: &SqlitePool,
    user: &UserUpsert,
    now_ms: i64,
) -> Result<(), sqlx_core::Error> {
    sqlx::query(
        "INSERT INTO users (ip, name, lat, lng, city, country, last_seen, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(name) DO UPDATE SET \
             ip = excluded.ip, lat = excluded.lat, lng = excluded.lng, \
             city = excluded.city, country = excluded.country, last_seen = excluded.last_seen",
    )
    .bind(&user.ip)
    .bind(&user.name)
    .bind(user.lat)
    .bind(user.lng)
    .bind(&user.city)
    .bind(&user.country)
    .bind(now_ms)
    .bind(now_ms)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear(pool: &SqlitePool) -> Result<u64, sqlx_core::Error> {
    let result = sqlx::query("DELETE FROM users").execute(pool).await?;
    Ok(result.rows_affected())
}

/// The address that registered the row, or `None` if no such row exists.
pub async fn owner_ip(pool: &SqlitePool, id: i64) -> Result<Option<String>, sqlx_core::Error> {
    sqlx::query_scalar::<_, String>("SELECT ip FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx_core::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx_core::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> SqlitePool {
    use sqlx::sqlite::SqlitePoolOptions;

    // A single connection that never idles out keeps the in-memory database alive.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite");
    crate::db_migrations::run(&pool)
        .await
        .expect("run migrations");
    pool
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, ip: &str) -> UserUpsert {
        UserUpsert {
            name: name.to_string(),
            ip: ip.to_string(),
            lat: Some(59.91),
            lng: Some(10.75),
            city: Some("Oslo".to_string()),
            country: None,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_per_name() {
        let pool = memory_pool().await;
        upsert(&pool, &user("Ada", "10.0.0.1"), 1_000)
            .await
            .expect("insert");
        let mut moved = user("Ada", "10.0.0.2");
        moved.city = Some("Bergen".to_string());
        upsert(&pool, &moved, 2_000).await.expect("update");

        let rows = list(&pool).await.expect("list");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ip, "10.0.0.2");
        assert_eq!(rows[0].city.as_deref(), Some("Bergen"));
        assert_eq!(rows[0].last_seen, 2_000);

        let created_at = sqlx::query_scalar::<_, i64>("SELECT created_at FROM users")
            .fetch_one(&pool)
            .await
            .expect("created_at");
        assert_eq!(created_at, 1_000);
    }

    #[tokio::test]
    async fn list_orders_by_last_seen_descending() {
        let pool = memory_pool().await;
        upsert(&pool, &user("Old", "1.1.1.1"), 1_000).await.expect("old");
        upsert(&pool, &user("New", "2.2.2.2"), 5_000).await.expect("new");
        upsert(&pool, &user("Mid", "3.3.3.3"), 3_000).await.expect("mid");

        let names: Vec<String> = list(&pool)
            .await
            .expect("list")
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(names, vec!["New", "Mid", "Old"]);
    }

    #[tokio::test]
    async fn delete_and_clear_report_affected_rows() {
        let pool = memory_pool().await;
        upsert(&pool, &user("Ada", "1.1.1.1"), 1).await.expect("ada");
        upsert(&pool, &user("Bo", "2.2.2.2"), 2).await.expect("bo");

        let rows = list(&pool).await.expect("list");
        let bo = rows.iter().find(|r| r.name == "Bo").expect("bo row");
        assert_eq!(
            owner_ip(&pool, bo.id).await.expect("owner").as_deref(),
            Some("2.2.2.2")
        );
        assert!(delete(&pool, bo.id).await.expect("delete"));
        assert!(!delete(&pool, bo.id).await.expect("second delete"));
        assert_eq!(owner_ip(&pool, bo.id).await.expect("owner"), None);

        assert_eq!(clear(&pool).await.expect("clear"), 1);
        assert_eq!(count(&pool).await.expect("count"), 0);
    }
}
