use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::database::repository::CommunityRepository;
use crate::dto::community_dto::{ChatPayload, CommentPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::CurrentUser;
use crate::models::community::{ChatMessage, DiscussionComment, DiscussionReply};
use crate::services::course_service::CourseService;
use crate::utils::time::now;
use crate::utils::validation::require_text;

pub const DEFAULT_CHAT_LIMIT: i64 = 100;
const MAX_CHAT_LIMIT: i64 = 500;

/// Course discussion board and course chat. Both are open to enrolled
/// students and the owning instructor only.
#[derive(Clone)]
pub struct CommunityService {
    repo: Arc<dyn CommunityRepository>,
    courses: CourseService,
}

impl CommunityService {
    pub fn new(repo: Arc<dyn CommunityRepository>, courses: CourseService) -> Self {
        Self { repo, courses }
    }

    pub async fn list_discussion(&self, user: &CurrentUser, course_id: Uuid) -> Result<Vec<DiscussionComment>> {
        self.courses.require_member(course_id, user).await?;
        self.repo.list_comments(course_id).await
    }

    pub async fn post_comment(
        &self,
        user: &CurrentUser,
        course_id: Uuid,
        payload: CommentPayload,
    ) -> Result<DiscussionComment> {
        payload.validate()?;
        let text = require_text("Comment", &payload.text)?;
        self.courses.require_member(course_id, user).await?;

        let comment = DiscussionComment {
            id: Uuid::new_v4(),
            course_id,
            author_id: user.id,
            author_name: self.courses.display_name(user).await?,
            text,
            created_at: now(),
            replies: Vec::new(),
        };
        self.repo.insert_comment(&comment).await?;
        tracing::info!(comment_id = %comment.id, %course_id, "discussion comment posted");
        Ok(comment)
    }

    pub async fn post_reply(
        &self,
        user: &CurrentUser,
        course_id: Uuid,
        comment_id: Uuid,
        payload: CommentPayload,
    ) -> Result<DiscussionReply> {
        payload.validate()?;
        let text = require_text("Reply", &payload.text)?;
        self.courses.require_member(course_id, user).await?;

        match self.repo.get_comment(comment_id).await? {
            Some(comment) if comment.course_id == course_id => {}
            _ => return Err(Error::NotFound("Comment not found".to_string())),
        }

        let reply = DiscussionReply {
            id: Uuid::new_v4(),
            comment_id,
            author_id: user.id,
            author_name: self.courses.display_name(user).await?,
            text,
            created_at: now(),
        };
        self.repo.insert_reply(&reply).await?;
        Ok(reply)
    }

    pub async fn list_chat(&self, user: &CurrentUser, course_id: Uuid, limit: Option<i64>) -> Result<Vec<ChatMessage>> {
        self.courses.require_member(course_id, user).await?;
        let limit = limit.unwrap_or(DEFAULT_CHAT_LIMIT).clamp(1, MAX_CHAT_LIMIT);
        self.repo.list_chat_messages(course_id, limit).await
    }

    pub async fn send_chat(&self, user: &CurrentUser, course_id: Uuid, payload: ChatPayload) -> Result<ChatMessage> {
        payload.validate()?;
        let content = require_text("Message", &payload.content)?;
        self.courses.require_member(course_id, user).await?;

        let message = ChatMessage {
            id: Uuid::new_v4(),
            course_id,
            sender_id: user.id,
            sender_name: self.courses.display_name(user).await?,
            sender_role: user.role,
            content,
            sent_at: now(),
        };
        self.repo.insert_chat_message(&message).await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::InMemoryRepository;
    use crate::dto::course_dto::CreateCoursePayload;
    use crate::models::profile::Role;
    use crate::services::notification_service::NotificationService;

    fn person(role: Role, name: &str) -> CurrentUser {
        CurrentUser {
            id: Uuid::new_v4(),
            role,
            name: name.into(),
            email: String::new(),
        }
    }

    #[tokio::test]
    async fn only_members_can_talk() {
        let repo = Arc::new(InMemoryRepository::new());
        let courses = CourseService::new(repo.clone(), NotificationService::new());
        let svc = CommunityService::new(repo, courses.clone());

        let instructor = person(Role::Instructor, "Mina Cho");
        let course = courses
            .create_course(
                &instructor,
                CreateCoursePayload {
                    title: "Data Structures".into(),
                    description: "Lists, trees, graphs and the rest.".into(),
                    image_url: None,
                    category: None,
                },
            )
            .await
            .unwrap();
        let outsider = person(Role::Student, "Nobody");
        let err = svc
            .post_comment(&outsider, course.id, CommentPayload { text: "hello".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));

        let student = person(Role::Student, "Kai Lee");
        courses.enroll(&student, course.id).await.unwrap();
        let comment = svc
            .post_comment(&student, course.id, CommentPayload { text: " When is week 2? ".into() })
            .await
            .unwrap();
        assert_eq!(comment.text, "When is week 2?");
        svc.post_reply(&instructor, course.id, comment.id, CommentPayload { text: "Monday".into() })
            .await
            .unwrap();

        let thread = svc.list_discussion(&student, course.id).await.unwrap();
        assert_eq!(thread.len(), 1);
        assert_eq!(thread[0].replies[0].author_name, "Mina Cho");

        let blank = svc
            .send_chat(&student, course.id, ChatPayload { content: "   ".into() })
            .await
            .unwrap_err();
        assert!(matches!(blank, Error::BadRequest(_)));
    }
}
