pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod utils;

use std::sync::Arc;

use crate::config::Config;
use crate::database::repository::Repository;
use crate::services::{
    certificate_service::CertificateService, community_service::CommunityService,
    course_service::CourseService, notification_service::NotificationService,
    progress_service::ProgressService, quiz_service::QuizService,
    quiz_session_service::QuizSessionService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub course_service: CourseService,
    pub quiz_service: QuizService,
    pub quiz_session_service: QuizSessionService,
    pub progress_service: ProgressService,
    pub community_service: CommunityService,
    pub certificate_service: CertificateService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new<R>(repo: Arc<R>, config: Arc<Config>) -> Self
    where
        R: Repository + 'static,
    {
        let notification_service = NotificationService::new();
        let course_service = CourseService::new(repo.clone(), notification_service.clone());
        let quiz_service = QuizService::new(
            repo.clone(),
            course_service.clone(),
            notification_service.clone(),
            config.default_passing_score,
        );
        let certificate_service = CertificateService::new(repo.clone());
        let quiz_session_service = QuizSessionService::new(
            quiz_service.clone(),
            course_service.clone(),
            certificate_service.clone(),
            notification_service.clone(),
            config.seconds_per_question,
            config.quiz_session_idle_minutes,
        );
        let progress_service = ProgressService::new(
            repo.clone(),
            course_service.clone(),
            notification_service.clone(),
            config.progress_idle_minutes,
        );
        let community_service = CommunityService::new(repo, course_service.clone());

        Self {
            config,
            course_service,
            quiz_service,
            quiz_session_service,
            progress_service,
            community_service,
            certificate_service,
            notification_service,
        }
    }
}
