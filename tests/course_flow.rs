mod common;

use common::{count, ctx_for, register_user, setup};
use rustilms::courses;
use rustilms::enrollments;
use rustilms::error::AppError;
use rustilms::lessons::{self, NewLesson, Upload};
use rustilms::models::Role;

#[tokio::test]
async fn only_teachers_create_courses() {
    let (db, _files) = setup().await;
    let student = register_user(&db, "S", "s@example.com", Role::Student).await;

    let result = courses::create_course(&db, &ctx_for(&student), "Algebra", "intro").await;
    assert!(matches!(result, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn empty_course_title_is_rejected() {
    let (db, _files) = setup().await;
    let teacher = register_user(&db, "T", "t@example.com", Role::Teacher).await;

    let result = courses::create_course(&db, &ctx_for(&teacher), "  ", "intro").await;
    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn non_owner_cannot_update_or_delete() {
    let (db, files) = setup().await;
    let owner = register_user(&db, "A", "a@example.com", Role::Teacher).await;
    let other = register_user(&db, "B", "b@example.com", Role::Teacher).await;
    let course = courses::create_course(&db, &ctx_for(&owner), "Algebra", "intro")
        .await
        .expect("create failed");

    let bctx = ctx_for(&other);
    assert!(matches!(
        courses::update_course(&db, &bctx, course.id, "Hijacked", "desc").await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        courses::delete_course(&db, &files, &bctx, course.id).await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn updating_a_missing_course_is_not_found() {
    let (db, _files) = setup().await;
    let teacher = register_user(&db, "T", "t@example.com", Role::Teacher).await;

    let result = courses::update_course(&db, &ctx_for(&teacher), 999, "x", "y").await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test]
async fn update_overwrites_title_and_description() {
    let (db, _files) = setup().await;
    let teacher = register_user(&db, "T", "t@example.com", Role::Teacher).await;
    let ctx = ctx_for(&teacher);
    let course = courses::create_course(&db, &ctx, "Algebra", "intro")
        .await
        .expect("create failed");

    let updated = courses::update_course(&db, &ctx, course.id, "Algebra II", "more")
        .await
        .expect("update failed");
    assert_eq!(updated.title, "Algebra II");
    assert_eq!(updated.description, "more");
}

#[tokio::test]
async fn course_listings_are_scoped() {
    let (db, _files) = setup().await;
    let alice = register_user(&db, "A", "a@example.com", Role::Teacher).await;
    let bob = register_user(&db, "B", "b@example.com", Role::Teacher).await;
    let student = register_user(&db, "S", "s@example.com", Role::Student).await;

    courses::create_course(&db, &ctx_for(&alice), "Algebra", "intro").await.expect("create failed");
    courses::create_course(&db, &ctx_for(&alice), "Biology", "cells").await.expect("create failed");
    courses::create_course(&db, &ctx_for(&bob), "Chemistry", "atoms").await.expect("create failed");

    let mine = courses::list_courses_for_teacher(&db, &ctx_for(&alice))
        .await
        .expect("listing failed");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|c| c.teacher_id == alice.id));

    let all = courses::list_all_courses(&db, &ctx_for(&student))
        .await
        .expect("listing failed");
    assert_eq!(all.len(), 3);

    // browsing the full catalog is the student view
    assert!(matches!(
        courses::list_all_courses(&db, &ctx_for(&alice)).await,
        Err(AppError::Forbidden)
    ));
    assert!(matches!(
        courses::list_courses_for_teacher(&db, &ctx_for(&student)).await,
        Err(AppError::Forbidden)
    ));
}

#[tokio::test]
async fn course_detail_shows_roster_only_to_the_owner() {
    let (db, _files) = setup().await;
    let owner = register_user(&db, "A", "a@example.com", Role::Teacher).await;
    let other = register_user(&db, "B", "b@example.com", Role::Teacher).await;
    let student = register_user(&db, "S", "s@example.com", Role::Student).await;
    let outsider = register_user(&db, "S2", "s2@example.com", Role::Student).await;

    let course = courses::create_course(&db, &ctx_for(&owner), "Algebra", "intro")
        .await
        .expect("create failed");
    enrollments::enroll(&db, &ctx_for(&student), course.id)
        .await
        .expect("enroll failed");

    let owner_view = courses::course_detail(&db, &ctx_for(&owner), course.id)
        .await
        .expect("detail failed");
    let roster = owner_view.students.expect("owner should see the roster");
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].id, student.id);
    assert!(owner_view.enrolled.is_none());

    let other_view = courses::course_detail(&db, &ctx_for(&other), course.id)
        .await
        .expect("detail failed");
    assert!(other_view.students.is_none());
    assert!(other_view.enrolled.is_none());

    let student_view = courses::course_detail(&db, &ctx_for(&student), course.id)
        .await
        .expect("detail failed");
    assert!(student_view.students.is_none());
    assert_eq!(student_view.enrolled, Some(true));

    // read access is not gated by enrollment
    let outsider_view = courses::course_detail(&db, &ctx_for(&outsider), course.id)
        .await
        .expect("detail failed");
    assert_eq!(outsider_view.enrolled, Some(false));
    assert!(outsider_view.students.is_none());

    let roster_direct = courses::list_students_for_course(&db, &ctx_for(&other), course.id).await;
    assert!(matches!(roster_direct, Err(AppError::Forbidden)));
}

#[tokio::test]
async fn delete_course_cascades_to_everything() {
    let (db, files) = setup().await;
    let teacher = register_user(&db, "T", "t@example.com", Role::Teacher).await;
    let student = register_user(&db, "S", "s@example.com", Role::Student).await;
    let tctx = ctx_for(&teacher);
    let sctx = ctx_for(&student);

    let course = courses::create_course(&db, &tctx, "Algebra", "intro")
        .await
        .expect("create failed");
    let lesson = lessons::add_lesson(
        &db,
        &files,
        &tctx,
        course.id,
        NewLesson {
            title: "L1".into(),
            content: Some("text".into()),
            upload: Some(Upload {
                filename: "notes.pdf".into(),
                bytes: b"bytes".to_vec(),
            }),
        },
    )
    .await
    .expect("add lesson failed");
    lessons::add_lesson(
        &db,
        &files,
        &tctx,
        course.id,
        NewLesson {
            title: "L2".into(),
            content: Some("more".into()),
            upload: None,
        },
    )
    .await
    .expect("add lesson failed");
    enrollments::enroll(&db, &sctx, course.id).await.expect("enroll failed");

    let stored = rustilms::files::FileStore::stored_name(lesson.id, "notes.pdf");
    assert!(files.retrieve(&stored).is_ok());

    courses::delete_course(&db, &files, &tctx, course.id)
        .await
        .expect("delete failed");

    assert_eq!(count(&db, "SELECT COUNT(*) FROM lessons").await, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM lesson_files").await, 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM enrollments").await, 0);
    assert!(matches!(files.retrieve(&stored), Err(AppError::NotFound)));
    assert!(matches!(
        courses::fetch_course(&db, course.id).await,
        Err(AppError::NotFound)
    ));

    let ids = enrollments::enrolled_course_ids(&db, &sctx)
        .await
        .expect("listing failed");
    assert!(ids.is_empty());
}

// Teacher A creates "Algebra"; teacher B may not delete it; student S enrolls
// and sees it listed; A deletes it and S's enrollment disappears with it.
#[tokio::test]
async fn algebra_lifecycle() {
    let (db, files) = setup().await;
    let a = register_user(&db, "A", "a@example.com", Role::Teacher).await;
    let b = register_user(&db, "B", "b@example.com", Role::Teacher).await;
    let s = register_user(&db, "S", "s@example.com", Role::Student).await;

    let algebra = courses::create_course(&db, &ctx_for(&a), "Algebra", "intro")
        .await
        .expect("create failed");

    assert!(matches!(
        courses::delete_course(&db, &files, &ctx_for(&b), algebra.id).await,
        Err(AppError::Forbidden)
    ));

    enrollments::enroll(&db, &ctx_for(&s), algebra.id)
        .await
        .expect("enroll failed");
    let ids = enrollments::enrolled_course_ids(&db, &ctx_for(&s))
        .await
        .expect("listing failed");
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&algebra.id));

    courses::delete_course(&db, &files, &ctx_for(&a), algebra.id)
        .await
        .expect("delete failed");
    let ids = enrollments::enrolled_course_ids(&db, &ctx_for(&s))
        .await
        .expect("listing failed");
    assert!(ids.is_empty());
}
