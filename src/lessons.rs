use chrono::Utc;

use crate::auth::AuthContext;
use crate::courses;
use crate::db::Db;
use crate::error::AppError;
use crate::files::{self, FileStore};
use crate::models::{Lesson, LessonFile};
use crate::policy;

#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct NewLesson {
    pub title: String,
    /// Absent for file-only lessons.
    pub content: Option<String>,
    pub upload: Option<Upload>,
}

pub async fn add_lesson(
    db: &Db,
    files: &FileStore,
    ctx: &AuthContext,
    course_id: i64,
    new: NewLesson,
) -> Result<Lesson, AppError> {
    let course = courses::fetch_course(db, course_id).await?;
    policy::require_course_owner(ctx, &course)?;

    let title = new.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    let content = new.content.filter(|c| !c.trim().is_empty());

    let done = sqlx::query("INSERT INTO lessons (title, content, course_id, created_at) VALUES (?, ?, ?, ?)")
        .bind(title)
        .bind(content.as_deref())
        .bind(course_id)
        .bind(Utc::now())
        .execute(db)
        .await?;
    let lesson_id = done.last_insert_rowid();

    if let Some(upload) = new.upload {
        attach_file(db, files, lesson_id, &upload.filename, &upload.bytes).await?;
    }

    fetch_lesson(db, lesson_id).await
}

/// Store the bytes under a lesson-scoped key and record the attachment row.
/// Re-uploading the same name to the same lesson overwrites, keeping one row.
pub async fn attach_file(
    db: &Db,
    files: &FileStore,
    lesson_id: i64,
    filename: &str,
    bytes: &[u8],
) -> Result<LessonFile, AppError> {
    let clean = files::sanitize_filename(filename);
    let stored_name = FileStore::stored_name(lesson_id, &clean);
    files.store(&stored_name, bytes)?;

    sqlx::query(
        r#"
        INSERT INTO lesson_files (filename, stored_name, lesson_id, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (stored_name) DO UPDATE SET filename = excluded.filename
        "#,
    )
    .bind(&clean)
    .bind(&stored_name)
    .bind(lesson_id)
    .bind(Utc::now())
    .execute(db)
    .await?;

    sqlx::query_as::<_, LessonFile>("SELECT * FROM lesson_files WHERE stored_name = ?")
        .bind(&stored_name)
        .fetch_one(db)
        .await
        .map_err(Into::into)
}

/// Does not alter existing attachments.
pub async fn edit_lesson(
    db: &Db,
    ctx: &AuthContext,
    lesson_id: i64,
    title: &str,
    content: Option<String>,
) -> Result<Lesson, AppError> {
    let lesson = fetch_lesson(db, lesson_id).await?;
    let course = courses::fetch_course(db, lesson.course_id).await?;
    policy::require_course_owner(ctx, &course)?;

    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("title is required"));
    }
    let content = content.filter(|c| !c.trim().is_empty());

    sqlx::query("UPDATE lessons SET title = ?, content = ? WHERE id = ?")
        .bind(title)
        .bind(content.as_deref())
        .bind(lesson_id)
        .execute(db)
        .await?;

    fetch_lesson(db, lesson_id).await
}

pub async fn delete_lesson(
    db: &Db,
    files: &FileStore,
    ctx: &AuthContext,
    lesson_id: i64,
) -> Result<(), AppError> {
    let lesson = fetch_lesson(db, lesson_id).await?;
    let course = courses::fetch_course(db, lesson.course_id).await?;
    policy::require_course_owner(ctx, &course)?;

    remove_lesson(db, files, lesson_id).await
}

/// Ordered cleanup shared with the course cascade: attachment bytes first,
/// then the attachment rows, then the lesson row. Byte removal is best-effort
/// and sits outside the transactional boundary of the row deletes.
pub(crate) async fn remove_lesson(db: &Db, files: &FileStore, lesson_id: i64) -> Result<(), AppError> {
    let attachments = files_for_lesson(db, lesson_id).await?;
    for file in &attachments {
        files.delete(&file.stored_name);
    }

    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM lesson_files WHERE lesson_id = ?")
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM lessons WHERE id = ?")
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn fetch_lesson(db: &Db, lesson_id: i64) -> Result<Lesson, AppError> {
    sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE id = ?")
        .bind(lesson_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn lessons_for_course(db: &Db, course_id: i64) -> Result<Vec<Lesson>, AppError> {
    sqlx::query_as::<_, Lesson>("SELECT * FROM lessons WHERE course_id = ? ORDER BY id")
        .bind(course_id)
        .fetch_all(db)
        .await
        .map_err(Into::into)
}

pub async fn files_for_lesson(db: &Db, lesson_id: i64) -> Result<Vec<LessonFile>, AppError> {
    sqlx::query_as::<_, LessonFile>("SELECT * FROM lesson_files WHERE lesson_id = ? ORDER BY id")
        .bind(lesson_id)
        .fetch_all(db)
        .await
        .map_err(Into::into)
}
