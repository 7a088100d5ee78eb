//! Request and response bodies that are not domain types

use serde::{Deserialize, Serialize};

use crate::models::{MemberRole, Message, User};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoogleLoginRequest {
    pub google_token: String,
}

/// Successful credential exchange
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub user: User,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateGroupRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_private: bool,
    pub ai_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
}

/// Partial group update; unset fields are left alone by the backend
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateGroupRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_members: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleUpdateRequest {
    pub role: MemberRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContent {
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditsRequest {
    pub amount: f64,
}

/// Result of accepting a group invitation
#[derive(Debug, Clone, Deserialize)]
pub struct InvitationAccepted {
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub group_id: Option<i64>,
}

/// One page of messages.
///
/// The backend returns a bare array today; an envelope with an explicit
/// `has_more` is honoured when present.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessagePage {
    Envelope {
        messages: Vec<Message>,
        #[serde(default)]
        has_more: Option<bool>,
        #[serde(default)]
        total: Option<u64>,
    },
    List(Vec<Message>),
}

impl MessagePage {
    pub fn into_parts(self) -> (Vec<Message>, Option<bool>) {
        match self {
            MessagePage::Envelope {
                messages, has_more, ..
            } => (messages, has_more),
            MessagePage::List(messages) => (messages, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = r#"{"id": 1, "content": "hi", "user_id": 2, "group_id": 3,
        "is_ai_message": false, "created_at": "2024-03-01T10:00:00"}"#;

    #[test]
    fn test_message_page_list() {
        let json = format!("[{}]", MESSAGE);
        let page: MessagePage = serde_json::from_str(&json).unwrap();
        let (messages, has_more) = page.into_parts();
        assert_eq!(messages.len(), 1);
        assert_eq!(has_more, None);
    }

    #[test]
    fn test_message_page_envelope() {
        let json = format!(r#"{{"messages": [{}], "has_more": false, "total": 1}}"#, MESSAGE);
        let page: MessagePage = serde_json::from_str(&json).unwrap();
        let (messages, has_more) = page.into_parts();
        assert_eq!(messages[0].content, "hi");
        assert_eq!(has_more, Some(false));
    }

    #[test]
    fn test_register_skips_empty_full_name() {
        let body = RegisterRequest {
            email: "a@b.c".into(),
            username: "ab".into(),
            password: "secret".into(),
            full_name: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("full_name").is_none());
    }
}
