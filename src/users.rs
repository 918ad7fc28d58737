use chrono::Utc;

use crate::auth;
use crate::db::Db;
use crate::error::AppError;
use crate::models::{Role, User};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub async fn register(db: &Db, new: NewUser) -> Result<User, AppError> {
    let name = new.name.trim();
    let email = new.email.trim();
    if name.is_empty() {
        return Err(AppError::validation("name is required"));
    }
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if new.password.is_empty() {
        return Err(AppError::validation("password is required"));
    }

    // Email comparison is exact, matching the stored value.
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    if existing.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = auth::hash_password(&new.password)?;
    let inserted = sqlx::query(
        "INSERT INTO users (name, email, password_hash, role, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(email)
    .bind(&password_hash)
    .bind(new.role)
    .bind(Utc::now())
    .execute(db)
    .await;

    let user_id = match inserted {
        Ok(done) => done.last_insert_rowid(),
        // two concurrent signups for the same email: the UNIQUE constraint
        // catches what the pre-check missed
        Err(e) if is_unique_violation(&e) => return Err(AppError::DuplicateEmail),
        Err(e) => return Err(e.into()),
    };

    fetch_user(db, user_id).await
}

/// Uniform failure for unknown email and wrong password.
pub async fn authenticate(db: &Db, email: &str, password: &str) -> Result<User, AppError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(db)
        .await?;
    let user = user.ok_or(AppError::InvalidCredentials)?;
    if !auth::verify_password(password, &user.password_hash) {
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

pub async fn fetch_user(db: &Db, user_id: i64) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(d) if d.message().contains("UNIQUE"))
}
