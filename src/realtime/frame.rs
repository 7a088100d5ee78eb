//! Realtime Frames
//!
//! Every frame on the socket is a JSON object `{ type, group_id?, user_id?,
//! data?, message? }`. [`Frame`] keeps that shape so unknown types still
//! reach subscribers; [`InboundEvent`] is the typed reading of known ones.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::models::{GroupId, Message, UserId};

/// Inbound frame types
pub mod kind {
    pub const MESSAGE: &str = "message";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const TYPING: &str = "typing";
    pub const USER_TYPING: &str = "user_typing";
    pub const USER_STOPPED_TYPING: &str = "user_stopped_typing";
    pub const USER_JOINED: &str = "user_joined";
    pub const USER_LEFT: &str = "user_left";
    pub const CONNECTION_CONFIRMED: &str = "connection_confirmed";
    pub const ERROR: &str = "error";

    // Outbound
    pub const JOIN_GROUP: &str = "join_group";
    pub const LEAVE_GROUP: &str = "leave_group";
    pub const STOP_TYPING: &str = "stop_typing";
}

/// Wire frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<serde_json::Value>,
}

impl Frame {
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// `data` decoded as `T`
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        self.data
            .clone()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// A field of `data`, used when the top-level field is absent
    fn data_field(&self, name: &str) -> Option<&serde_json::Value> {
        self.data.as_ref().and_then(|data| data.get(name))
    }

    fn group(&self) -> Option<GroupId> {
        self.group_id
            .or_else(|| self.data_field("group_id").and_then(|v| v.as_i64()))
    }

    fn user(&self) -> Option<UserId> {
        self.user_id
            .or_else(|| self.data_field("user_id").and_then(|v| v.as_i64()))
    }

    /// Typed interpretation of a known frame
    pub fn event(&self) -> Result<InboundEvent, FrameError> {
        let event = match self.kind.as_str() {
            kind::MESSAGE => InboundEvent::Message(self.decode_message(self.data.as_ref())?),
            kind::NEW_MESSAGE => InboundEvent::Message(self.decode_message(self.message.as_ref())?),
            kind::TYPING => {
                let is_typing = self
                    .data_field("is_typing")
                    .and_then(|v| v.as_bool())
                    .ok_or(FrameError::Missing("data.is_typing"))?;
                self.typing(is_typing)?
            }
            kind::USER_TYPING => self.typing(true)?,
            kind::USER_STOPPED_TYPING => self.typing(false)?,
            kind::USER_JOINED | kind::USER_LEFT => {
                let group_id = self.group().ok_or(FrameError::Missing("group_id"))?;
                let user_id = self.user();
                if self.kind == kind::USER_JOINED {
                    InboundEvent::UserJoined { group_id, user_id }
                } else {
                    InboundEvent::UserLeft { group_id, user_id }
                }
            }
            kind::CONNECTION_CONFIRMED => InboundEvent::ConnectionConfirmed {
                user_id: self.user(),
            },
            kind::ERROR => InboundEvent::Error(
                self.message
                    .as_ref()
                    .and_then(|m| m.as_str())
                    .or_else(|| self.data_field("message").and_then(|m| m.as_str()))
                    .unwrap_or("unknown error")
                    .to_string(),
            ),
            _ => InboundEvent::Other,
        };
        Ok(event)
    }

    fn decode_message(&self, payload: Option<&serde_json::Value>) -> Result<Message, FrameError> {
        let payload = payload.ok_or(FrameError::Missing("message payload"))?;
        serde_json::from_value(payload.clone()).map_err(|e| FrameError::Payload(e.to_string()))
    }

    fn typing(&self, is_typing: bool) -> Result<InboundEvent, FrameError> {
        Ok(InboundEvent::Typing {
            group_id: self.group().ok_or(FrameError::Missing("group_id"))?,
            user_id: self.user().ok_or(FrameError::Missing("user_id"))?,
            is_typing,
        })
    }
}

/// Known inbound events
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    Message(Message),
    Typing {
        group_id: GroupId,
        user_id: UserId,
        is_typing: bool,
    },
    UserJoined {
        group_id: GroupId,
        user_id: Option<UserId>,
    },
    UserLeft {
        group_id: GroupId,
        user_id: Option<UserId>,
    },
    ConnectionConfirmed {
        user_id: Option<UserId>,
    },
    Error(String),
    Other,
}

/// Outbound frames the client produces
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    JoinGroup(GroupId),
    LeaveGroup(GroupId),
    Typing { group_id: GroupId, is_typing: bool },
}

impl OutboundFrame {
    pub fn to_frame(&self) -> Frame {
        match self {
            OutboundFrame::JoinGroup(id) => Frame::new(kind::JOIN_GROUP).with_group(*id),
            OutboundFrame::LeaveGroup(id) => Frame::new(kind::LEAVE_GROUP).with_group(*id),
            // The backend only relays a stop on `stop_typing`
            OutboundFrame::Typing {
                group_id,
                is_typing,
            } => {
                let frame_kind = if *is_typing { kind::TYPING } else { kind::STOP_TYPING };
                Frame::new(frame_kind)
                    .with_group(*group_id)
                    .with_data(serde_json::json!({ "is_typing": is_typing }))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame is missing {0}")]
    Missing(&'static str),

    #[error("invalid payload: {0}")]
    Payload(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_typing() {
        let frame = Frame::decode(
            r#"{"type": "typing", "group_id": 7, "user_id": 3, "data": {"is_typing": false}}"#,
        )
        .unwrap();
        assert_eq!(
            frame.event().unwrap(),
            InboundEvent::Typing {
                group_id: 7,
                user_id: 3,
                is_typing: false
            }
        );
    }

    #[test]
    fn test_typing_without_flag_is_error() {
        let frame = Frame::decode(r#"{"type": "typing", "group_id": 7, "user_id": 3}"#).unwrap();
        assert!(matches!(
            frame.event(),
            Err(FrameError::Missing("data.is_typing"))
        ));

        let frame =
            Frame::decode(r#"{"type": "typing", "group_id": 7, "user_id": 3, "data": {"is_typing": "yes"}}"#)
                .unwrap();
        assert!(frame.event().is_err());
    }

    #[test]
    fn test_user_typing_from_backend() {
        let frame = Frame::decode(r#"{"type": "user_typing", "user_id": 3, "group_id": 7}"#).unwrap();
        assert!(matches!(
            frame.event().unwrap(),
            InboundEvent::Typing { is_typing: true, .. }
        ));
    }

    #[test]
    fn test_new_message_payload_in_message_field() {
        let frame = Frame::decode(
            r#"{"type": "new_message", "group_id": 7, "message": {
                "id": 10, "content": "hey", "user_id": 2, "group_id": 7,
                "is_ai_message": true, "ai_model_used": "gemini",
                "created_at": "2024-03-01T10:00:00"}}"#,
        )
        .unwrap();
        match frame.event().unwrap() {
            InboundEvent::Message(message) => {
                assert_eq!(message.id, 10);
                assert!(message.is_ai_message);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_missing_payload_is_error() {
        let frame = Frame::decode(r#"{"type": "message"}"#).unwrap();
        assert!(frame.event().is_err());
    }

    #[test]
    fn test_unknown_type_is_other() {
        let frame = Frame::decode(r#"{"type": "presence", "data": 1}"#).unwrap();
        assert_eq!(frame.event().unwrap(), InboundEvent::Other);
    }

    #[test]
    fn test_outbound_typing_shape() {
        let json = OutboundFrame::Typing {
            group_id: 7,
            is_typing: true,
        }
        .to_frame()
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "typing");
        assert_eq!(value["group_id"], 7);
        assert_eq!(value["data"]["is_typing"], true);
        assert!(value.get("message").is_none());
    }

    #[test]
    fn test_outbound_typing_stop_uses_stop_kind() {
        let json = OutboundFrame::Typing {
            group_id: 7,
            is_typing: false,
        }
        .to_frame()
        .encode()
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], "stop_typing");
        assert_eq!(value["group_id"], 7);
        assert_eq!(value["data"]["is_typing"], false);
    }

    #[test]
    fn test_outbound_join() {
        let frame = OutboundFrame::JoinGroup(4).to_frame();
        assert_eq!(frame.encode().unwrap(), r#"{"type":"join_group","group_id":4}"#);
    }
}
