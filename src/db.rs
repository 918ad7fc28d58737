use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::env;
use std::str::FromStr;

pub type Db = Pool<Sqlite>;

// crate-relative path for sqlx migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn connect() -> Result<Db> {
    let url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://lms.db".into());
    let opts = SqliteConnectOptions::from_str(&url)?
        .create_if_missing(true)
        .foreign_keys(true);
    Ok(SqlitePoolOptions::new().connect_with(opts).await?)
}
