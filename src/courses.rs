use chrono::Utc;

use crate::auth::AuthContext;
use crate::db::Db;
use crate::enrollments;
use crate::error::AppError;
use crate::files::FileStore;
use crate::lessons;
use crate::models::{Course, CourseDetail, LessonDetail, Role, User};
use crate::policy;

pub async fn create_course(
    db: &Db,
    ctx: &AuthContext,
    title: &str,
    description: &str,
) -> Result<Course, AppError> {
    policy::require_teacher(ctx)?;
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }

    let done = sqlx::query(
        "INSERT INTO courses (title, description, teacher_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(title)
    .bind(description)
    .bind(ctx.user_id)
    .bind(Utc::now())
    .execute(db)
    .await?;

    fetch_course(db, done.last_insert_rowid()).await
}

/// The caller's own courses; teachers only.
pub async fn list_courses_for_teacher(db: &Db, ctx: &AuthContext) -> Result<Vec<Course>, AppError> {
    policy::require_teacher(ctx)?;
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE teacher_id = ? ORDER BY id")
        .bind(ctx.user_id)
        .fetch_all(db)
        .await
        .map_err(Into::into)
}

/// Every course, for student browsing.
pub async fn list_all_courses(db: &Db, ctx: &AuthContext) -> Result<Vec<Course>, AppError> {
    policy::require_student(ctx)?;
    sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY id")
        .fetch_all(db)
        .await
        .map_err(Into::into)
}

pub async fn update_course(
    db: &Db,
    ctx: &AuthContext,
    course_id: i64,
    title: &str,
    description: &str,
) -> Result<Course, AppError> {
    let course = fetch_course(db, course_id).await?;
    policy::require_course_owner(ctx, &course)?;

    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }

    sqlx::query("UPDATE courses SET title = ?, description = ? WHERE id = ?")
        .bind(title)
        .bind(description)
        .bind(course_id)
        .execute(db)
        .await?;

    fetch_course(db, course_id).await
}

/// Ordered cascade: each lesson's attachment bytes and rows, then the
/// lessons, then every enrollment referencing the course, then the course
/// row itself.
pub async fn delete_course(
    db: &Db,
    files: &FileStore,
    ctx: &AuthContext,
    course_id: i64,
) -> Result<(), AppError> {
    let course = fetch_course(db, course_id).await?;
    policy::require_course_owner(ctx, &course)?;

    for lesson in lessons::lessons_for_course(db, course_id).await? {
        lessons::remove_lesson(db, files, lesson.id).await?;
    }

    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM enrollments WHERE course_id = ?")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Any authenticated caller may view a course. Students additionally learn
/// whether they are enrolled; the roster is populated only for the owning
/// teacher and never handed to anyone else.
pub async fn course_detail(db: &Db, ctx: &AuthContext, course_id: i64) -> Result<CourseDetail, AppError> {
    let course = fetch_course(db, course_id).await?;

    let mut lesson_details = Vec::new();
    for lesson in lessons::lessons_for_course(db, course_id).await? {
        let files = lessons::files_for_lesson(db, lesson.id).await?;
        lesson_details.push(LessonDetail { lesson, files });
    }

    let mut enrolled = None;
    let mut students = None;
    match ctx.role {
        Role::Student => {
            enrolled = Some(enrollments::is_enrolled(db, ctx.user_id, course_id).await?);
        }
        Role::Teacher if ctx.user_id == course.teacher_id => {
            students = Some(roster(db, course_id).await?);
        }
        Role::Teacher => {}
    }

    Ok(CourseDetail {
        course,
        lessons: lesson_details,
        enrolled,
        students,
    })
}

/// The enrolled students of a course; owning teacher only.
pub async fn list_students_for_course(
    db: &Db,
    ctx: &AuthContext,
    course_id: i64,
) -> Result<Vec<User>, AppError> {
    let course = fetch_course(db, course_id).await?;
    policy::require_course_owner(ctx, &course)?;
    roster(db, course_id).await
}

pub async fn fetch_course(db: &Db, course_id: i64) -> Result<Course, AppError> {
    sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
        .bind(course_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

async fn roster(db: &Db, course_id: i64) -> Result<Vec<User>, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT u.* FROM users u
        JOIN enrollments e ON e.student_id = u.id
        WHERE e.course_id = ?
        ORDER BY u.id
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
    .map_err(Into::into)
}
