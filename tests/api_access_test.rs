mod common;

use axum::http::StatusCode;
use common::{caller, spawn_app};
use course_backend::models::profile::Role;
use serde_json::json;

#[tokio::test]
async fn health_is_public_and_api_needs_a_token() {
    let app = spawn_app();

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["quiz_sessions"], 0);

    let (status, body) = app.call("GET", "/api/courses", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn tokens_signed_with_another_secret_are_rejected() {
    let app = spawn_app();
    let mut student = caller(Role::Student, "Ada Byron");
    student.token = tokio_test::assert_ok!(course_backend::utils::token::issue_token(
        "some_other_secret",
        &student.user,
        chrono::Duration::hours(1),
    ));

    let (status, _) = app.call("GET", "/api/courses", Some(&student), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn enrollment_gates_lectures_and_rejects_duplicates() {
    let app = spawn_app();
    let instructor = caller(Role::Instructor, "Grace Hopper");
    let student = caller(Role::Student, "Alan Turing");

    let course_id = app.create_course(&instructor, "Compilers in Practice").await;
    let first = app.create_lecture(&instructor, course_id, "Lexing").await;
    let second = app.create_lecture(&instructor, course_id, "Parsing").await;

    let (status, body) = app
        .call("GET", &format!("/api/lectures/{first}"), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preview"], true);
    assert_eq!(body["watched"], false);

    let (status, _) = app
        .call("GET", &format!("/api/lectures/{second}"), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            "GET",
            &format!("/api/courses/{course_id}/chat"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    app.enroll(&student, course_id).await;
    let (status, body) = app
        .call(
            "POST",
            &format!("/api/courses/{course_id}/enroll"),
            Some(&student),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Already enrolled in this course");

    let (status, body) = app
        .call("GET", &format!("/api/lectures/{second}"), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["preview"], false);

    let (status, body) = app
        .call("GET", &format!("/api/courses/{course_id}"), Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_enrolled"], true);
    assert_eq!(body["is_owner"], false);
    assert_eq!(body["enrollment_count"], 1);
    assert_eq!(body["lectures"].as_array().unwrap().len(), 2);

    let (status, body) = app.call("GET", "/api/me/courses", Some(&student), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn students_cannot_author_courses() {
    let app = spawn_app();
    let student = caller(Role::Student, "Alan Turing");

    let (status, _) = app
        .call(
            "POST",
            "/api/courses",
            Some(&student),
            Some(json!({
                "title": "My Own Course",
                "description": "Students should not be able to publish this."
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn course_chat_returns_messages_oldest_first() {
    let app = spawn_app();
    let instructor = caller(Role::Instructor, "Grace Hopper");
    let student = caller(Role::Student, "Alan Turing");
    let course_id = app.create_course(&instructor, "Compilers in Practice").await;
    app.enroll(&student, course_id).await;

    for (who, text) in [(&student, "first"), (&instructor, "second"), (&student, "third")] {
        let (status, _) = app
            .call(
                "POST",
                &format!("/api/courses/{course_id}/chat"),
                Some(who),
                Some(json!({ "content": text })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/courses/{course_id}/chat?limit=2"),
            Some(&instructor),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let contents: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["second", "third"]);
}
