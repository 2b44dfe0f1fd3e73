// Wire format (JSON текстовые кадры)
// Используется для передачи кадров через WebSocket

use crate::protocol::messages::{ClientFrame, ServerFrame};
use crate::utils::error::{NegotiationError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Упаковать ClientFrame в JSON (клиент -> сервер)
pub fn encode_client_frame(frame: &ClientFrame) -> Result<String> {
    encode_raw(frame)
}

/// Распаковать JSON в ServerFrame (сервер -> клиент)
pub fn decode_server_frame(text: &str) -> Result<ServerFrame> {
    decode_raw(text)
}

/// Упаковать произвольные данные в JSON
pub fn encode_raw<T: Serialize>(data: &T) -> Result<String> {
    serde_json::to_string(data)
        .map_err(|e| NegotiationError::SerializationError(format!("JSON encode error: {}", e)))
}

/// Распаковать JSON в произвольный тип
pub fn decode_raw<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text)
        .map_err(|e| NegotiationError::SerializationError(format!("JSON decode error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::SendData;
    use crate::storage::models::MessageKind;

    #[test]
    fn test_encode_send_frame() {
        let frame = ClientFrame::Send(SendData {
            conversation_id: 12,
            msg_type: MessageKind::Quote,
            content: "¥420 · 50 tons".to_string(),
            payload: Some(r#"{"price":"420"}"#.to_string()),
            temp_id: "temp_1_abc".to_string(),
        });

        let json: serde_json::Value = serde_json::from_str(&encode_client_frame(&frame).unwrap()).unwrap();
        assert_eq!(json["type"], "SEND");
        assert_eq!(json["conversationId"], 12);
        assert_eq!(json["msgType"], "QUOTE");
        assert_eq!(json["tempId"], "temp_1_abc");
        assert!(json["payload"].is_string());
    }

    #[test]
    fn test_encode_simple_frames() {
        assert_eq!(
            encode_client_frame(&ClientFrame::typing(3)).unwrap(),
            r#"{"type":"TYPING","conversationId":3}"#
        );
        assert_eq!(encode_client_frame(&ClientFrame::Ping).unwrap(), r#"{"type":"PING"}"#);
    }

    #[test]
    fn test_decode_server_frames() {
        let sent = decode_server_frame(r#"{"type":"SENT","conversationId":1,"messageId":55,"tempId":"temp_9"}"#).unwrap();
        match sent {
            ServerFrame::Sent(ack) => {
                assert_eq!(ack.id, Some(55));
                assert_eq!(ack.temp_id.as_deref(), Some("temp_9"));
            }
            other => panic!("unexpected frame {:?}", other),
        }

        let pong = decode_server_frame(r#"{"type":"PONG"}"#).unwrap();
        assert_eq!(pong, ServerFrame::Pong(Default::default()));

        let push = decode_server_frame(
            r#"{"type":"MESSAGE","conversationId":4,"message":{"id":8,"fromUserId":2,"msgType":"TEXT","content":"hi"}}"#,
        )
        .unwrap();
        match push {
            ServerFrame::Message(push) => assert_eq!(push.conversation_id(), Some(4)),
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert!(decode_server_frame(r#"{"type":"SHRUG"}"#).is_err());
        assert!(decode_server_frame("not json").is_err());
    }
}
