use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde_json::json;

use crate::auth::{self, AuthContext};
use crate::courses;
use crate::db::Db;
use crate::enrollments;
use crate::error::AppError;
use crate::files::FileStore;
use crate::lessons::{self, NewLesson, Upload};
use crate::models::*;
use crate::users::{self, NewUser};

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub files: FileStore,
}

pub fn router(db: Db, files: FileStore) -> Router {
    Router::new()
        // identity
        .route("/api/signup", post(signup))
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        // catalog
        .route("/api/courses", get(browse_courses).post(create_course))
        .route("/api/my-courses", get(my_courses))
        .route(
            "/api/courses/:course_id",
            get(course_detail).put(update_course).delete(delete_course),
        )
        .route("/api/courses/:course_id/students", get(course_students))
        // enrollment
        .route("/api/courses/:course_id/enroll", post(enroll))
        .route("/api/courses/:course_id/unenroll", post(unenroll))
        // lessons
        .route("/api/courses/:course_id/lessons", post(add_lesson))
        .route("/api/lessons/:lesson_id", put(edit_lesson).delete(delete_lesson))
        // attachment download (authenticated, addressed by stored name)
        .route("/uploads/*stored_name", get(download_file))
        .with_state(AppState { db, files })
}

// --- identity ---

async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupReq>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = users::register(
        &state.db,
        NewUser {
            name: req.name,
            email: req.email,
            password: req.password,
            role: req.role,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<Json<LoginResp>, AppError> {
    let user = users::authenticate(&state.db, &req.email, &req.password).await?;
    let token = auth::create_session(&state.db, user.id).await?;
    Ok(Json(LoginResp { token, user }))
}

async fn logout(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<serde_json::Value>, AppError> {
    auth::destroy_session(&state.db, &ctx.token).await?;
    Ok(Json(json!({ "ok": true })))
}

// --- catalog ---

async fn browse_courses(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<BrowseCourses>, AppError> {
    let courses = courses::list_all_courses(&state.db, &ctx).await?;
    let mut enrolled_course_ids: Vec<i64> = enrollments::enrolled_course_ids(&state.db, &ctx)
        .await?
        .into_iter()
        .collect();
    enrolled_course_ids.sort_unstable();
    Ok(Json(BrowseCourses {
        courses,
        enrolled_course_ids,
    }))
}

async fn my_courses(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<Vec<Course>>, AppError> {
    Ok(Json(courses::list_courses_for_teacher(&state.db, &ctx).await?))
}

async fn create_course(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(req): Json<CourseReq>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let course = courses::create_course(&state.db, &ctx, &req.title, &req.description).await?;
    Ok((StatusCode::CREATED, Json(course)))
}

async fn course_detail(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseDetail>, AppError> {
    Ok(Json(courses::course_detail(&state.db, &ctx, course_id).await?))
}

async fn update_course(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
    Json(req): Json<CourseReq>,
) -> Result<Json<Course>, AppError> {
    let course =
        courses::update_course(&state.db, &ctx, course_id, &req.title, &req.description).await?;
    Ok(Json(course))
}

async fn delete_course(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    courses::delete_course(&state.db, &state.files, &ctx, course_id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn course_students(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(
        courses::list_students_for_course(&state.db, &ctx, course_id).await?,
    ))
}

// --- enrollment ---

async fn enroll(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    enrollments::enroll(&state.db, &ctx, course_id).await?;
    Ok(Json(json!({ "ok": true })))
}

async fn unenroll(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    enrollments::unenroll(&state.db, &ctx, course_id).await?;
    Ok(Json(json!({ "ok": true })))
}

// --- lessons ---

async fn add_lesson(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(course_id): Path<i64>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<Lesson>), AppError> {
    let mut title = None;
    let mut content = None;
    let mut upload = None;

    while let Some(field) = mp.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(bad_multipart)?),
            "content" => content = Some(field.text().await.map_err(bad_multipart)?),
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?.to_vec();
                if !filename.is_empty() && !bytes.is_empty() {
                    upload = Some(Upload { filename, bytes });
                }
            }
            _ => {}
        }
    }

    let lesson = lessons::add_lesson(
        &state.db,
        &state.files,
        &ctx,
        course_id,
        NewLesson {
            title: title.unwrap_or_default(),
            content,
            upload,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

async fn edit_lesson(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(lesson_id): Path<i64>,
    Json(req): Json<LessonEditReq>,
) -> Result<Json<Lesson>, AppError> {
    let lesson =
        lessons::edit_lesson(&state.db, &ctx, lesson_id, &req.title, req.content).await?;
    Ok(Json(lesson))
}

async fn delete_lesson(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(lesson_id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    lessons::delete_lesson(&state.db, &state.files, &ctx, lesson_id).await?;
    Ok(Json(json!({ "ok": true })))
}

// --- downloads ---

async fn download_file(
    State(state): State<AppState>,
    _ctx: AuthContext,
    Path(stored_name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.files.retrieve(&stored_name)?;
    let display_name = stored_name.rsplit('/').next().unwrap_or("file").to_string();
    let disposition = format!(
        "attachment; filename*=UTF-8''{}",
        utf8_percent_encode(&display_name, NON_ALPHANUMERIC)
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    ))
}

// --- helpers ---

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::validation(e.to_string())
}
