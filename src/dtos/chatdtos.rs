use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    chatmodel::{ChatMessage, Conversation},
    usermodel::{TrustLevel, User},
};

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct StartConversationDto {
    pub other_user_id: Uuid,
    pub job_id: Option<Uuid>,
}

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageDto {
    #[validate(length(min = 1, max = 2000, message = "Message must be between 1-2000 characters"))]
    pub content: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct PaginationDto {
    #[validate(range(min = 1))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100))]
    pub limit: Option<u32>,
}

impl PaginationDto {
    /// (limit, offset) for SQL.
    pub fn limit_offset(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(50) as i64;
        let page = self.page.unwrap_or(1) as i64;
        (limit, (page - 1) * limit)
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatParticipant {
    pub id: Uuid,
    pub name: String,
    pub trust_score: i32,
    pub trust_level: TrustLevel,
}

impl From<&User> for ChatParticipant {
    fn from(user: &User) -> Self {
        ChatParticipant {
            id: user.id,
            name: user.name.clone(),
            trust_score: user.trust_score,
            trust_level: user.trust_level,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationWithParticipant {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_user: Option<ChatParticipant>,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponseDto {
    pub status: &'static str,
    pub conversations: Vec<ConversationWithParticipant>,
    pub results: usize,
}

#[derive(Debug, Serialize)]
pub struct MessageListResponseDto {
    pub status: &'static str,
    pub messages: Vec<ChatMessage>,
    pub results: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        assert_eq!(PaginationDto::default().limit_offset(), (50, 0));

        let page = PaginationDto {
            page: Some(3),
            limit: Some(20),
        };
        assert_eq!(page.limit_offset(), (20, 40));
    }

    #[test]
    fn test_empty_message_rejected() {
        let dto = SendMessageDto {
            content: String::new(),
        };
        assert!(dto.validate().is_err());
    }
}
