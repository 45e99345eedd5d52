pub mod certificates;
pub mod community;
pub mod courses;
pub mod health;
pub mod lectures;
pub mod notifications;
pub mod progress;
pub mod quiz_sessions;
pub mod quizzes;

use axum::{
    routing::{get, post},
    Router,
};

use crate::middleware::auth::require_bearer_auth;
use crate::AppState;

/// Builds every route. Everything under `/api` needs a bearer token.
pub fn app_router(state: AppState) -> Router {
    let api = Router::new()
        .route(
            "/api/courses",
            get(courses::list_courses).post(courses::create_course),
        )
        .route(
            "/api/courses/:id",
            get(courses::get_course)
                .patch(courses::update_course)
                .delete(courses::delete_course),
        )
        .route("/api/courses/:id/enroll", post(courses::enroll))
        .route("/api/instructor/courses", get(courses::instructor_courses))
        .route("/api/me/courses", get(courses::my_courses))
        .route("/api/courses/:id/lectures", post(lectures::create_lecture))
        .route(
            "/api/lectures/:id",
            get(lectures::get_lecture)
                .patch(lectures::update_lecture)
                .delete(lectures::delete_lecture),
        )
        .route(
            "/api/lectures/:id/watch",
            post(progress::open_lecture).delete(progress::close_lecture),
        )
        .route(
            "/api/lectures/:id/progress",
            post(progress::report_progress).delete(progress::mark_unwatched),
        )
        .route(
            "/api/courses/:id/completion",
            get(progress::course_completion),
        )
        .route(
            "/api/courses/:id/progress/refresh",
            post(progress::refresh_progress),
        )
        .route(
            "/api/courses/:id/quizzes",
            get(quizzes::list_quizzes).post(quizzes::create_quiz),
        )
        .route(
            "/api/quizzes/:id",
            axum::routing::patch(quizzes::update_quiz).delete(quizzes::delete_quiz),
        )
        .route("/api/quizzes/:id/attempts", get(quizzes::my_attempts))
        .route(
            "/api/courses/:id/quizzes/:quiz_id/sessions",
            post(quiz_sessions::start_session),
        )
        .route(
            "/api/quiz-sessions/:id",
            get(quiz_sessions::get_session).delete(quiz_sessions::discard_session),
        )
        .route(
            "/api/quiz-sessions/:id/answers",
            axum::routing::put(quiz_sessions::select_answer),
        )
        .route("/api/quiz-sessions/:id/next", post(quiz_sessions::next_question))
        .route(
            "/api/quiz-sessions/:id/previous",
            post(quiz_sessions::previous_question),
        )
        .route("/api/quiz-sessions/:id/jump", post(quiz_sessions::jump_to_question))
        .route("/api/quiz-sessions/:id/submit", post(quiz_sessions::submit))
        .route(
            "/api/courses/:id/discussion",
            get(community::list_discussion).post(community::post_comment),
        )
        .route(
            "/api/courses/:id/discussion/:comment_id/replies",
            post(community::post_reply),
        )
        .route(
            "/api/courses/:id/chat",
            get(community::list_chat).post(community::send_chat),
        )
        .route("/api/me/certificates", get(certificates::my_certificates))
        .route("/api/certificates/:id", get(certificates::get_certificate))
        .route(
            "/api/notifications/poll",
            get(notifications::poll_notifications),
        )
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(api)
        .with_state(state)
}
