use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(sqlx::Type, Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Course {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub teacher_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Enrollment {
    pub id: i64,
    pub student_id: i64,
    pub course_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct Lesson {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub course_id: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow, Serialize, Deserialize, Debug, Clone)]
pub struct LessonFile {
    pub id: i64,
    /// Sanitized name of the upload, shown to users.
    pub filename: String,
    /// Storage key, namespaced per lesson so same-named uploads in
    /// different lessons never collide.
    pub stored_name: String,
    pub lesson_id: i64,
    pub created_at: DateTime<Utc>,
}

// --- request/response bodies ---

#[derive(Deserialize, Debug, Clone)]
pub struct SignupReq {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct LoginResp {
    pub token: String,
    pub user: User,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CourseReq {
    pub title: String,
    pub description: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LessonEditReq {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct LessonDetail {
    pub lesson: Lesson,
    pub files: Vec<LessonFile>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseDetail {
    pub course: Course,
    pub lessons: Vec<LessonDetail>,
    /// Present for student callers: whether they are enrolled.
    pub enrolled: Option<bool>,
    /// Present only for the owning teacher: the enrolled students.
    pub students: Option<Vec<User>>,
}

#[derive(Serialize, Debug, Clone)]
pub struct BrowseCourses {
    pub courses: Vec<Course>,
    pub enrolled_course_ids: Vec<i64>,
}
