#![allow(dead_code)]

use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

use rustilms::auth::AuthContext;
use rustilms::db::{Db, MIGRATOR};
use rustilms::files::FileStore;
use rustilms::models::{Role, User};
use rustilms::users::{self, NewUser};

/// Fresh in-memory database plus a throwaway upload directory. A single
/// connection so every query sees the same in-memory database.
pub async fn setup() -> (Db, FileStore) {
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open test database");
    MIGRATOR.run(&db).await.expect("failed to run migrations");

    let dir = std::env::temp_dir().join(format!("rustilms-test-{}", Uuid::new_v4()));
    (db, FileStore::new(dir))
}

pub async fn register_user(db: &Db, name: &str, email: &str, role: Role) -> User {
    users::register(
        db,
        NewUser {
            name: name.into(),
            email: email.into(),
            password: "password123".into(),
            role,
        },
    )
    .await
    .expect("failed to register user")
}

pub fn ctx_for(user: &User) -> AuthContext {
    AuthContext {
        user_id: user.id,
        role: user.role,
        token: String::new(),
    }
}

pub async fn count(db: &Db, sql: &str) -> i64 {
    sqlx::query_scalar(sql)
        .fetch_one(db)
        .await
        .expect("count query failed")
}
