pub mod certificate_service;
pub mod community_service;
pub mod course_service;
pub mod grading_service;
pub mod notification_service;
pub mod progress_service;
pub mod quiz_service;
pub mod quiz_session_service;
