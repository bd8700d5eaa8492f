use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::{format_timestamp, now_millis, User};

pub const DEFAULT_ROOM: &str = "general-chat";
pub const MAX_MESSAGE_LEN: usize = 1000;
const ROOM_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub message: String,
    pub room: String,
    pub timestamp: String,
}

/// Frames sent to clients as `{ "event": ..., "data": ... }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    ConnectionStatus(ConnectionStatus),
    NewMessage(ChatMessage),
    JoinedRoomAck(RoomAck),
    Error(ChatError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub status: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomAck {
    pub room: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatError {
    pub message: String,
}

impl ServerEvent {
    pub fn connected(user: &User) -> Self {
        ServerEvent::ConnectionStatus(ConnectionStatus {
            status: "connected".into(),
            user_id: user.id.clone(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerEvent::Error(ChatError { message: message.into() })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::error!("❌ Failed to encode chat frame: {}", e);
            r#"{"event":"error","data":{"message":"Internal error."}}"#.to_string()
        })
    }
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Events a client may send
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    SendMessage(String),
    JoinRoom(Option<String>),
}

impl ClientEvent {
    pub fn parse(text: &str) -> Result<Self, String> {
        let frame: InboundFrame = serde_json::from_str(text).map_err(|e| format!("Malformed frame: {}", e))?;
        match frame.event.as_str() {
            "sendMessage" => {
                // Accept both `{ "message": "..." }` and a bare string
                let message = match &frame.data {
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => other.get("message").and_then(|m| m.as_str()).map(String::from),
                };
                message
                    .map(ClientEvent::SendMessage)
                    .ok_or_else(|| "sendMessage requires a message.".to_string())
            }
            "joinRoom" => {
                let room = match &frame.data {
                    serde_json::Value::String(s) => Some(s.clone()),
                    other => other.get("room").and_then(|r| r.as_str()).map(String::from),
                };
                Ok(ClientEvent::JoinRoom(room))
            }
            other => Err(format!("Unknown event '{}'.", other)),
        }
    }
}

/// Fan-out hub: one broadcast channel per room, no history kept
pub struct ChatHub {
    rooms: Mutex<HashMap<String, broadcast::Sender<ChatMessage>>>,
    clients: Arc<AtomicUsize>,
}

/// Counts a connected client for as long as it is alive
pub struct ClientSlot {
    clients: Arc<AtomicUsize>,
}

impl Drop for ClientSlot {
    fn drop(&mut self) {
        self.clients.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for ChatHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatHub {
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            clients: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn sender(&self, room: &str) -> broadcast::Sender<ChatMessage> {
        let mut rooms = self.rooms.lock().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone()
    }

    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<ChatMessage> {
        self.sender(room).subscribe()
    }

    /// Returns how many subscribers the message reached
    pub fn publish(&self, message: ChatMessage) -> usize {
        self.sender(&message.room).send(message).unwrap_or(0)
    }

    pub fn register_client(&self) -> ClientSlot {
        self.clients.fetch_add(1, Ordering::SeqCst);
        ClientSlot {
            clients: self.clients.clone(),
        }
    }

    pub fn connected_clients(&self) -> usize {
        self.clients.load(Ordering::SeqCst)
    }

    /// Applies one client event; returns the frames addressed to the sender only.
    /// Chat messages themselves reach the sender through its room subscription.
    pub fn handle_event(&self, user: &User, event: ClientEvent) -> Vec<ServerEvent> {
        match event {
            ClientEvent::SendMessage(raw) => {
                let message = raw.trim();
                if message.is_empty() {
                    return Vec::new();
                }
                if message.chars().count() > MAX_MESSAGE_LEN {
                    return vec![ServerEvent::error(format!(
                        "Message cannot be longer than {} characters.",
                        MAX_MESSAGE_LEN
                    ))];
                }

                let delivered = self.publish(ChatMessage {
                    id: Uuid::new_v4().to_string(),
                    sender_id: user.id.clone(),
                    sender_name: user.display_name(),
                    message: message.to_string(),
                    room: DEFAULT_ROOM.to_string(),
                    timestamp: format_timestamp(now_millis()),
                });
                log::debug!("💬 Message from {} delivered to {} client(s)", user.email, delivered);
                Vec::new()
            }
            ClientEvent::JoinRoom(requested) => {
                if let Some(room) = requested.filter(|r| r != DEFAULT_ROOM) {
                    log::debug!("Room '{}' requested by {}, using {}", room, user.email, DEFAULT_ROOM);
                }
                vec![ServerEvent::JoinedRoomAck(RoomAck {
                    room: DEFAULT_ROOM.to_string(),
                    message: format!("Successfully joined room: {}", DEFAULT_ROOM),
                })]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::new_v4().to_string(),
            email: format!("{}@example.com", first.to_lowercase()),
            password_hash: String::new(),
            role: Role::User,
            first_name: first.into(),
            last_name: last.into(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_parse_client_events() {
        assert_eq!(
            ClientEvent::parse(r#"{"event":"sendMessage","data":{"message":"hi"}}"#).unwrap(),
            ClientEvent::SendMessage("hi".into())
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"joinRoom","data":"general-chat"}"#).unwrap(),
            ClientEvent::JoinRoom(Some("general-chat".into()))
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"joinRoom"}"#).unwrap(),
            ClientEvent::JoinRoom(None)
        );
        assert!(ClientEvent::parse(r#"{"event":"sendMessage","data":{}}"#).is_err());
        assert!(ClientEvent::parse(r#"{"event":"dance"}"#).is_err());
        assert!(ClientEvent::parse("not json").is_err());
    }

    #[test]
    fn test_server_event_shape() {
        let alice = user("Alice", "Smith");
        let json: serde_json::Value = serde_json::from_str(&ServerEvent::connected(&alice).to_json()).unwrap();
        assert_eq!(json["event"], "connectionStatus");
        assert_eq!(json["data"]["status"], "connected");
        assert_eq!(json["data"]["userId"], alice.id.as_str());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = ChatHub::new();
        let alice = user("Alice", "Smith");
        let mut alice_rx = hub.subscribe(DEFAULT_ROOM);
        let mut bob_rx = hub.subscribe(DEFAULT_ROOM);

        let replies = hub.handle_event(&alice, ClientEvent::SendMessage("  hello  ".into()));
        assert!(replies.is_empty());

        let to_bob = bob_rx.recv().await.unwrap();
        assert_eq!(to_bob.message, "hello");
        assert_eq!(to_bob.sender_name, "Alice Smith");
        assert_eq!(to_bob.sender_id, alice.id);
        // the sender gets its own message back
        assert_eq!(alice_rx.recv().await.unwrap(), to_bob);

        let frame: serde_json::Value =
            serde_json::from_str(&ServerEvent::NewMessage(to_bob).to_json()).unwrap();
        assert_eq!(frame["event"], "newMessage");
        assert_eq!(frame["data"]["senderName"], "Alice Smith");
    }

    #[test]
    fn test_blank_and_oversized_messages() {
        let hub = ChatHub::new();
        let alice = user("Alice", "Smith");
        let mut rx = hub.subscribe(DEFAULT_ROOM);

        assert!(hub.handle_event(&alice, ClientEvent::SendMessage("   ".into())).is_empty());
        let replies = hub.handle_event(&alice, ClientEvent::SendMessage("x".repeat(MAX_MESSAGE_LEN + 1)));
        assert!(matches!(replies.as_slice(), [ServerEvent::Error(_)]));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_join_room_acknowledges_default() {
        let hub = ChatHub::new();
        let alice = user("Alice", "Smith");
        let replies = hub.handle_event(&alice, ClientEvent::JoinRoom(Some("random".into())));
        match replies.as_slice() {
            [ServerEvent::JoinedRoomAck(ack)] => assert_eq!(ack.room, DEFAULT_ROOM),
            other => panic!("unexpected replies: {:?}", other),
        }
    }

    #[test]
    fn test_client_slots_count() {
        let hub = ChatHub::new();
        let first = hub.register_client();
        let second = hub.register_client();
        assert_eq!(hub.connected_clients(), 2);
        drop(first);
        assert_eq!(hub.connected_clients(), 1);
        drop(second);
        assert_eq!(hub.connected_clients(), 0);
    }
}
