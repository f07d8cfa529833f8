pub mod sqlite {
    pub use sqlx_sqlite::{SqliteConnectOptions, SqlitePoolOptions};
}

pub use sqlx_core::query::query;
pub use sqlx_core::query_as::query_as;
pub use sqlx_core::query_scalar::query_scalar;
pub use sqlx_sqlite::{Sqlite, SqlitePool};
