use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommentPayload {
    #[validate(length(max = 2000, message = "Comment is too long"))]
    pub text: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatPayload {
    #[validate(length(max = 2000, message = "Message is too long"))]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatQuery {
    pub limit: Option<i64>,
}
