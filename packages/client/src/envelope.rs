//! Wire envelope exchanged with the chat server.
//!
//! The JSON shape is fixed by the server:
//!
//! ```json
//! {"sender":"Alice","senderRole":"CUSTOMER","content":"Hello","type":"CHAT","roomId":"room1","timestamp":1714526130123}
//! ```

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use dentalchat_shared::time::parse_datetime_millis;

use crate::error::ClientError;

/// Role of the participant who sent an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Role {
    Customer,
    Admin,
}

impl Role {
    /// CSS class / display tag for the role
    pub fn class_name(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl From<String> for Role {
    // Anyone who is not a customer is shown as clinic staff.
    fn from(value: String) -> Self {
        if value.eq_ignore_ascii_case("CUSTOMER") {
            Role::Customer
        } else {
            Role::Admin
        }
    }
}

/// Kind of envelope.
///
/// Only JOIN is shown as a notice; every other kind renders as a bubble.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageType {
    Join,
    Chat,
    Leave,
    /// A kind this client does not know yet
    #[serde(other)]
    Other,
}

/// Timestamp as it appears on the wire.
///
/// Epoch milliseconds is the canonical form. Servers backed by Jackson emit
/// `LocalDateTime` either as an ISO string or as a component array, so both
/// are accepted and resolved against the display offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTimestamp {
    Millis(i64),
    Text(String),
    Components(Vec<i64>),
}

impl WireTimestamp {
    /// Resolve to Unix milliseconds, interpreting zone-less forms in `offset`.
    pub fn to_millis(&self, offset: FixedOffset) -> Option<i64> {
        match self {
            WireTimestamp::Millis(millis) => Some(*millis),
            WireTimestamp::Text(text) => parse_datetime_millis(text, offset),
            WireTimestamp::Components(parts) => components_to_millis(parts, offset),
        }
    }
}

// [year, month, day, hour, minute, second?, nanos?]
fn components_to_millis(parts: &[i64], offset: FixedOffset) -> Option<i64> {
    let field = |i: usize| parts.get(i).copied().unwrap_or(0);
    if parts.len() < 5 {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(
        i32::try_from(field(0)).ok()?,
        u32::try_from(field(1)).ok()?,
        u32::try_from(field(2)).ok()?,
    )?;
    let time = date.and_hms_nano_opt(
        u32::try_from(field(3)).ok()?,
        u32::try_from(field(4)).ok()?,
        u32::try_from(field(5)).ok()?,
        u32::try_from(field(6)).ok()?,
    )?;

    time.and_local_timezone(offset)
        .single()
        .map(|dt| dt.timestamp_millis())
}

/// Structured message unit exchanged between client and server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub sender: String,
    pub sender_role: Role,
    pub content: String,
    #[serde(rename = "type")]
    pub r#type: MessageType,
    pub room_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<WireTimestamp>,
}

impl Envelope {
    /// Room-join announcement. The server fills in the notice text.
    pub fn join(sender: &str, sender_role: Role, room_id: &str) -> Self {
        Self {
            sender: sender.to_string(),
            sender_role,
            content: String::new(),
            r#type: MessageType::Join,
            room_id: room_id.to_string(),
            timestamp: None,
        }
    }

    /// Chat message. The server stamps the time on broadcast.
    pub fn chat(sender: &str, sender_role: Role, room_id: &str, content: &str) -> Self {
        Self {
            sender: sender.to_string(),
            sender_role,
            content: content.to_string(),
            r#type: MessageType::Chat,
            room_id: room_id.to_string(),
            timestamp: None,
        }
    }

    /// Serialize to the JSON body sent over the wire
    pub fn to_json(&self) -> Result<String, ClientError> {
        serde_json::to_string(self).map_err(ClientError::Serialize)
    }

    /// Parse an inbound JSON body
    pub fn from_json(body: &str) -> Result<Self, ClientError> {
        serde_json::from_str(body).map_err(ClientError::MalformedEnvelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dentalchat_shared::time::offset_from_hours;
    use serde_json::json;

    #[test]
    fn test_join_envelope_wire_shape() {
        // テスト項目: JOIN エンベロープがサーバーの期待する JSON 形式で出力される
        // given (前提条件):
        let envelope = Envelope::join("Alice", Role::Customer, "room1");

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "sender": "Alice",
                "senderRole": "CUSTOMER",
                "content": "",
                "type": "JOIN",
                "roomId": "room1"
            })
        );
    }

    #[test]
    fn test_chat_envelope_wire_shape() {
        // テスト項目: CHAT エンベロープの JSON にタイムスタンプが含まれない
        // given (前提条件):
        let envelope = Envelope::chat("Dr.Kim", Role::Admin, "room7", "Hello");

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&envelope.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(value["senderRole"], "ADMIN");
        assert_eq!(value["type"], "CHAT");
        assert_eq!(value["content"], "Hello");
        assert!(value.get("timestamp").is_none());
    }

    #[test]
    fn test_parse_inbound_with_epoch_millis() {
        // テスト項目: エポックミリ秒のタイムスタンプを持つメッセージを解析できる
        // given (前提条件):
        let body = r#"{"sender":"Alice","senderRole":"CUSTOMER","content":"hi","type":"CHAT","roomId":"room1","timestamp":0}"#;

        // when (操作):
        let envelope = Envelope::from_json(body).unwrap();

        // then (期待する結果):
        assert_eq!(envelope.timestamp, Some(WireTimestamp::Millis(0)));
        assert_eq!(envelope.r#type, MessageType::Chat);
    }

    #[test]
    fn test_parse_inbound_with_local_datetime_string() {
        // テスト項目: ISO 形式のローカル日時タイムスタンプがミリ秒に変換される
        // given (前提条件):
        let body = r#"{"sender":"Alice","senderRole":"customer","content":"Alice joined the room","type":"JOIN","roomId":"room1","timestamp":"1970-01-01T09:00:01.5"}"#;

        // when (操作):
        let envelope = Envelope::from_json(body).unwrap();

        // then (期待する結果):
        assert_eq!(envelope.sender_role, Role::Customer);
        let millis = envelope
            .timestamp
            .and_then(|ts| ts.to_millis(offset_from_hours(9)));
        assert_eq!(millis, Some(1500));
    }

    #[test]
    fn test_component_array_timestamp() {
        // テスト項目: 配列形式のローカル日時がミリ秒に変換される
        // given (前提条件):
        let timestamp = WireTimestamp::Components(vec![1970, 1, 1, 9, 0, 2, 0]);

        // when (操作):
        let millis = timestamp.to_millis(offset_from_hours(9));

        // then (期待する結果):
        assert_eq!(millis, Some(2000));
    }

    #[test]
    fn test_missing_timestamp_is_none() {
        // テスト項目: タイムスタンプがない場合は None になる
        // given (前提条件):
        let body = r#"{"sender":"Bob","senderRole":"ADMIN","content":"x","type":"CHAT","roomId":"r"}"#;

        // when (操作):
        let envelope = Envelope::from_json(body).unwrap();

        // then (期待する結果):
        assert_eq!(envelope.timestamp, None);
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        // テスト項目: 不正な JSON は MalformedEnvelope エラーになる
        // given (前提条件):
        let body = "not json";

        // when (操作):
        let result = Envelope::from_json(body);

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::MalformedEnvelope(_))));
    }

    #[test]
    fn test_unknown_role_is_shown_as_admin() {
        // テスト項目: CUSTOMER 以外のロールは admin として扱われる
        // given (前提条件):
        let body = r#"{"sender":"System","senderRole":"SYSTEM","content":"x","type":"CHAT","roomId":"r"}"#;

        // when (操作):
        let envelope = Envelope::from_json(body).unwrap();

        // then (期待する結果):
        assert_eq!(envelope.sender_role, Role::Admin);
    }

    #[test]
    fn test_leave_and_unknown_types_are_accepted() {
        // テスト項目: LEAVE や未知の種別のメッセージも解析エラーにならない
        // given (前提条件):
        let leave = r#"{"sender":"Bob","senderRole":"CUSTOMER","content":"bye","type":"LEAVE","roomId":"r"}"#;
        let typing = r#"{"sender":"Bob","senderRole":"CUSTOMER","content":"","type":"TYPING","roomId":"r"}"#;

        // when (操作):
        let leave = Envelope::from_json(leave).unwrap();
        let typing = Envelope::from_json(typing).unwrap();

        // then (期待する結果):
        assert_eq!(leave.r#type, MessageType::Leave);
        assert_eq!(typing.r#type, MessageType::Other);
    }
}
