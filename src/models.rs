//! Domain Types
//!
//! Wire types shared by the API client, the stores and the front ends.
//! Field names follow the backend's snake_case JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type GroupId = i64;
pub type MessageId = i64;
pub type NotificationId = i64;

/// Notification type carrying an invitation id in `data`
pub const GROUP_INVITATION: &str = "group_invitation";

/// Authenticated account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub credits: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub last_login: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Full name when set, else the username
    pub fn display_name(&self) -> &str {
        self.full_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.username)
    }
}

/// Minimal user view embedded in messages and member lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Chat group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub ai_enabled: bool,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub max_members: Option<u32>,
    #[serde(default, alias = "creator_id")]
    pub created_by: UserId,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Member role inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    Moderator,
    Member,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemberRole::Owner => "owner",
            MemberRole::Admin => "admin",
            MemberRole::Moderator => "moderator",
            MemberRole::Member => "member",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "owner" => Ok(MemberRole::Owner),
            "admin" => Ok(MemberRole::Admin),
            "moderator" => Ok(MemberRole::Moderator),
            "member" => Ok(MemberRole::Member),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

fn default_role() -> MemberRole {
    MemberRole::Member
}

/// Group membership entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub id: i64,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(default)]
    pub group_id: GroupId,
    #[serde(default = "default_role")]
    pub role: MemberRole,
    #[serde(with = "timestamp")]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub user: Option<UserSummary>,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub content: String,
    pub user_id: UserId,
    pub group_id: GroupId,
    #[serde(default)]
    pub is_ai_message: bool,
    #[serde(default)]
    pub ai_model_used: Option<String>,
    #[serde(default)]
    pub credits_used: Option<f64>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "user")]
    pub sender: Option<UserSummary>,
}

impl Message {
    /// Name to show next to the message
    pub fn author_name(&self) -> String {
        if self.is_ai_message {
            return self
                .ai_model_used
                .clone()
                .unwrap_or_else(|| "AI Assistant".to_string());
        }
        self.sender
            .as_ref()
            .map(|s| s.full_name.clone().unwrap_or_else(|| s.username.clone()))
            .unwrap_or_else(|| format!("User {}", self.user_id))
    }
}

/// In-app notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub related_id: Option<i64>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    pub fn is_invitation(&self) -> bool {
        self.kind == GROUP_INVITATION
    }

    /// Invitation id embedded in a `group_invitation` payload
    pub fn invitation_id(&self) -> Option<i64> {
        if !self.is_invitation() {
            return None;
        }
        self.data.get("invitation_id").and_then(|v| v.as_i64())
    }

    pub fn group_name(&self) -> Option<&str> {
        self.data.get("group_name").and_then(|v| v.as_str())
    }
}

/// Response of the notification list endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationSummary {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub total_count: u32,
}

/// Response of the notification count endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationCounts {
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub total_count: u32,
}

/// Credit balance
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub credits: f64,
}

/// Timestamps as the backend writes them.
///
/// Accepts RFC 3339 and naive ISO 8601 (read as UTC); always writes RFC 3339.
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(dt) => serializer.serialize_some(&dt.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp: {}", raw))
                }),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_naive_timestamp_is_utc() {
        let dt = timestamp::parse("2024-03-01T10:15:30.123456").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T10:15:30.123456+00:00");

        let dt = timestamp::parse("2024-03-01T10:15:30Z").unwrap();
        assert_eq!(dt.timestamp(), 1709288130);
    }

    #[test]
    fn test_group_accepts_creator_id() {
        let json = r#"{
            "id": 7, "name": "Rustaceans", "is_private": false,
            "ai_enabled": true, "ai_model": "gemini", "creator_id": 3,
            "created_at": "2024-03-01T10:00:00", "updated_at": "2024-03-01T10:00:00",
            "member_count": 4, "max_members": 100
        }"#;
        let group: Group = serde_json::from_str(json).unwrap();
        assert_eq!(group.created_by, 3);
        assert_eq!(group.member_count, 4);
        assert!(group.updated_at.is_some());
    }

    #[test]
    fn test_invitation_payload() {
        let json = r#"{
            "id": 1, "type": "group_invitation", "title": "Invite",
            "message": "You were invited", "is_read": false,
            "data": {"invitation_id": 42, "group_name": "Book Club"},
            "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.invitation_id(), Some(42));
        assert_eq!(notification.group_name(), Some("Book Club"));
        assert!(notification.read_at.is_none());
    }

    #[test]
    fn test_invitation_id_only_for_invitations() {
        let json = r#"{
            "id": 2, "type": "system", "title": "Hi", "message": "Welcome",
            "data": {"invitation_id": 1}, "created_at": "2024-03-01T10:00:00Z"
        }"#;
        let notification: Notification = serde_json::from_str(json).unwrap();
        assert_eq!(notification.invitation_id(), None);
    }

    #[test]
    fn test_member_role_parse() {
        assert_eq!("Admin".parse::<MemberRole>().unwrap(), MemberRole::Admin);
        assert!("guest".parse::<MemberRole>().is_err());
        assert_eq!(MemberRole::Moderator.to_string(), "moderator");
    }
}
