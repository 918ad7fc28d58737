use std::collections::HashSet;

use chrono::Utc;

use crate::auth::AuthContext;
use crate::courses;
use crate::db::Db;
use crate::error::AppError;
use crate::policy;

/// Idempotent: enrolling twice in the same course leaves exactly one row.
/// The `UNIQUE (student_id, course_id)` constraint backs this, so a
/// concurrent duplicate insert lands on the conflict arm instead of a
/// second row.
pub async fn enroll(db: &Db, ctx: &AuthContext, course_id: i64) -> Result<(), AppError> {
    policy::require_student(ctx)?;
    courses::fetch_course(db, course_id).await?;

    sqlx::query(
        r#"
        INSERT INTO enrollments (student_id, course_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT (student_id, course_id) DO NOTHING
        "#,
    )
    .bind(ctx.user_id)
    .bind(course_id)
    .bind(Utc::now())
    .execute(db)
    .await?;
    Ok(())
}

pub async fn unenroll(db: &Db, ctx: &AuthContext, course_id: i64) -> Result<(), AppError> {
    policy::require_student(ctx)?;
    let done = sqlx::query("DELETE FROM enrollments WHERE student_id = ? AND course_id = ?")
        .bind(ctx.user_id)
        .bind(course_id)
        .execute(db)
        .await?;
    if done.rows_affected() == 0 {
        return Err(AppError::NotEnrolled);
    }
    Ok(())
}

/// The caller's own enrollments, as a set for cheap membership checks when
/// rendering enrollment status across a course listing.
pub async fn enrolled_course_ids(db: &Db, ctx: &AuthContext) -> Result<HashSet<i64>, AppError> {
    policy::require_student(ctx)?;
    let rows: Vec<(i64,)> = sqlx::query_as("SELECT course_id FROM enrollments WHERE student_id = ?")
        .bind(ctx.user_id)
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn is_enrolled(db: &Db, student_id: i64, course_id: i64) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM enrollments WHERE student_id = ? AND course_id = ?")
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}
