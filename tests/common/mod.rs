#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use course_backend::{
    config::Config,
    database::memory::InMemoryRepository,
    middleware::auth::CurrentUser,
    models::profile::Role,
    routes::app_router,
    utils::token::issue_token,
    AppState,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "test_secret_key";

pub struct TestApp {
    pub router: Router,
    pub repo: Arc<InMemoryRepository>,
}

pub fn spawn_app() -> TestApp {
    let repo = Arc::new(InMemoryRepository::new());
    let state = AppState::new(repo.clone(), Arc::new(Config::for_tests(SECRET)));
    TestApp {
        router: app_router(state),
        repo,
    }
}

pub struct Caller {
    pub user: CurrentUser,
    pub token: String,
}

pub fn caller(role: Role, name: &str) -> Caller {
    let user = CurrentUser {
        id: Uuid::new_v4(),
        role,
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
    };
    let token = issue_token(SECRET, &user, chrono::Duration::hours(1)).expect("token");
    Caller { user, token }
}

impl TestApp {
    pub async fn call(
        &self,
        method: &str,
        uri: &str,
        who: Option<&Caller>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(who) = who {
            builder = builder.header("authorization", format!("Bearer {}", who.token));
        }
        let req = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        let resp = self.router.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let value = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }

    pub async fn create_course(&self, owner: &Caller, title: &str) -> Uuid {
        let (status, body) = self
            .call(
                "POST",
                "/api/courses",
                Some(owner),
                Some(json!({
                    "title": title,
                    "description": "A practical course with short weekly lectures.",
                    "category": "programming"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().expect("course id").parse().expect("uuid")
    }

    pub async fn create_lecture(&self, owner: &Caller, course_id: Uuid, title: &str) -> Uuid {
        let (status, body) = self
            .call(
                "POST",
                &format!("/api/courses/{course_id}/lectures"),
                Some(owner),
                Some(json!({
                    "title": title,
                    "description": "Walkthrough of this week's material.",
                    "video_url": "https://cdn.example.com/videos/lecture.mp4",
                    "duration_seconds": 600
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().expect("lecture id").parse().expect("uuid")
    }

    pub async fn enroll(&self, student: &Caller, course_id: Uuid) {
        let (status, body) = self
            .call(
                "POST",
                &format!("/api/courses/{course_id}/enroll"),
                Some(student),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }
}
