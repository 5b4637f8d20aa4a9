use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Resolved caller identity attached to a connection for its lifetime.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: String,
    pub name: String,
}

impl UserIdentity {
    /// Fallback identity for absent or invalid credentials.
    pub fn guest() -> Self {
        Self {
            id: "guest".to_string(),
            name: "Guest User".to_string(),
        }
    }
}

/// One connection's presence entry within a room. Two tabs of the same
/// user are two participants with distinct connection ids.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub connection_id: Uuid,
}

/// Messages received over the real-time channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join-document", rename_all = "camelCase")]
    JoinDocument { document_id: i64 },
    #[serde(rename = "leave-document", rename_all = "camelCase")]
    LeaveDocument { document_id: i64 },
    #[serde(rename = "document-update", rename_all = "camelCase")]
    DocumentUpdate {
        document_id: i64,
        content: String,
        #[serde(default)]
        cursor_position: Value,
    },
    #[serde(rename = "cursor-position", rename_all = "camelCase")]
    CursorPosition { document_id: i64, position: Value },
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing { document_id: i64, is_typing: bool },
}

/// Messages sent over the real-time channel. Cursor payloads are opaque
/// and relayed verbatim; timestamps are server-assigned epoch millis.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "user-joined", rename_all = "camelCase")]
    UserJoined {
        user: UserIdentity,
        active_users: Vec<Participant>,
    },
    #[serde(rename = "user-left", rename_all = "camelCase")]
    UserLeft {
        user: UserIdentity,
        active_users: Vec<Participant>,
    },
    #[serde(rename = "document-updated", rename_all = "camelCase")]
    DocumentUpdated {
        content: String,
        cursor_position: Value,
        user: UserIdentity,
        timestamp: i64,
    },
    #[serde(rename = "cursor-moved", rename_all = "camelCase")]
    CursorMoved {
        position: Value,
        user: UserIdentity,
        timestamp: i64,
    },
    #[serde(rename = "user-typing", rename_all = "camelCase")]
    UserTyping {
        user: UserIdentity,
        is_typing: bool,
        timestamp: i64,
    },
}

/// Envelope published on the external event bus. The event name is
/// rebroadcast verbatim; the payload is never inspected.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BusEvent {
    pub event: String,
    pub data: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_messages_use_wire_names() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "document-update",
            "documentId": 42,
            "content": "hello",
            "cursorPosition": {"line": 3, "ch": 7},
        }))
        .unwrap();
        match msg {
            ClientMessage::DocumentUpdate {
                document_id,
                content,
                cursor_position,
            } => {
                assert_eq!(document_id, 42);
                assert_eq!(content, "hello");
                assert_eq!(cursor_position["line"], 3);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn cursor_position_defaults_to_null() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "document-update",
            "documentId": 1,
            "content": "x",
        }))
        .unwrap();
        match msg {
            ClientMessage::DocumentUpdate {
                cursor_position, ..
            } => assert!(cursor_position.is_null()),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn server_messages_use_wire_names() {
        let user = UserIdentity::guest();
        let frame = serde_json::to_value(ServerMessage::UserJoined {
            user: user.clone(),
            active_users: vec![Participant {
                id: user.id.clone(),
                name: user.name.clone(),
                connection_id: Uuid::new_v4(),
            }],
        })
        .unwrap();
        assert_eq!(frame["type"], "user-joined");
        assert!(frame["activeUsers"].is_array());
        assert!(frame["activeUsers"][0]["connectionId"].is_string());

        let frame = serde_json::to_value(ServerMessage::UserTyping {
            user,
            is_typing: true,
            timestamp: 1,
        })
        .unwrap();
        assert_eq!(frame["type"], "user-typing");
        assert_eq!(frame["isTyping"], true);
    }
}
