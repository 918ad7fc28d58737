// Authorization predicates. Every mutating operation resolves its target and
// passes the caller's context through one of these before touching storage.

use crate::auth::AuthContext;
use crate::error::AppError;
use crate::models::{Course, Role};

pub fn require_teacher(ctx: &AuthContext) -> Result<(), AppError> {
    if ctx.role == Role::Teacher {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn require_student(ctx: &AuthContext) -> Result<(), AppError> {
    if ctx.role == Role::Student {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Edit/delete on a course and everything under it (lessons, attachments,
/// roster) is reserved for the teacher the course references.
pub fn require_course_owner(ctx: &AuthContext, course: &Course) -> Result<(), AppError> {
    if ctx.role == Role::Teacher && ctx.user_id == course.teacher_id {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
