//! Wire shapes exchanged over `postMessage`.
//!
//! Outbound calls are [`MessageRequest`]s, replies are [`MessageResponse`]s
//! and id-less notifications relayed to a child window are
//! [`MessageEvent`]s. Inbound data is classified with
//! [`InboundMessage::classify`].

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the handshake call.
pub const INITIALIZE_FUNC: &str = "initialize";
/// Call announcing interest in a named host event.
pub const REGISTER_HANDLER_FUNC: &str = "registerHandler";

/// Correlation id of an outgoing call.
pub type MessageId = u64;

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// A call sent to another frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRequest {
    pub id: MessageId,
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
    /// Milliseconds since the Unix epoch at creation time.
    pub timestamp: i64,
}

impl MessageRequest {
    /// Build a request stamped with the current time.
    pub fn new(id: MessageId, func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            id,
            func: func.into(),
            args,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// A reply to a correlated call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: MessageId,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_partial_response: Option<bool>,
}

impl MessageResponse {
    /// Build a final reply.
    pub fn new(id: MessageId, args: Vec<Value>) -> Self {
        Self {
            id,
            args,
            is_partial_response: None,
        }
    }

    /// Build a reply carrying an explicit partial flag.
    pub fn with_partial(id: MessageId, args: Vec<Value>, is_partial: bool) -> Self {
        Self {
            id,
            args,
            is_partial_response: Some(is_partial),
        }
    }

    /// Whether more replies for this id will follow.
    pub fn is_partial(&self) -> bool {
        self.is_partial_response == Some(true)
    }
}

/// A named notification without correlation id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl MessageEvent {
    pub fn new(func: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            func: func.into(),
            args,
        }
    }
}

/// One delivery to a caller: the reply arguments and whether it is partial.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub args: Vec<Value>,
    pub is_partial: bool,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Classification of inbound data.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Reply to one of our calls (numeric id, no `func`).
    Response(MessageResponse),
    /// Correlated call from a child frame (numeric id and `func`).
    Request(MessageRequest),
    /// Named event for the handler registry (`func` with a non-correlating id).
    Event(MessageEvent),
    /// Anything else.
    Unknown,
}

impl InboundMessage {
    /// Classify raw message data.
    pub fn classify(data: &Value) -> Self {
        let Some(obj) = data.as_object() else {
            return InboundMessage::Unknown;
        };
        let id = obj.get("id").and_then(Value::as_u64);
        let func = obj.get("func").and_then(Value::as_str);
        let args = match obj.get("args") {
            Some(Value::Array(args)) => args.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        };

        match (id, func) {
            (Some(id), Some(func)) => InboundMessage::Request(MessageRequest {
                id,
                func: func.to_string(),
                args,
                timestamp: obj.get("timestamp").and_then(Value::as_i64).unwrap_or_default(),
            }),
            (None, Some(func)) => InboundMessage::Event(MessageEvent::new(func, args)),
            (Some(id), None) => InboundMessage::Response(MessageResponse {
                id,
                args,
                is_partial_response: obj.get("isPartialResponse").and_then(Value::as_bool),
            }),
            (None, None) => InboundMessage::Unknown,
        }
    }

    /// Classify a message from the parent.
    ///
    /// The parent never expects this frame to answer it, so a message with
    /// a numeric id and a `func` is a reply when `is_pending` claims the id
    /// and a named event otherwise.
    pub fn classify_from_parent(data: &Value, is_pending: impl Fn(MessageId) -> bool) -> Self {
        match Self::classify(data) {
            InboundMessage::Request(req) if is_pending(req.id) => InboundMessage::Response(MessageResponse {
                id: req.id,
                args: req.args,
                is_partial_response: data.get("isPartialResponse").and_then(Value::as_bool),
            }),
            InboundMessage::Request(req) => InboundMessage::Event(MessageEvent::new(req.func, req.args)),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let req = MessageRequest::new(7, "getContext", vec![json!(1)]);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["func"], "getContext");
        assert_eq!(value["args"], json!([1]));
        assert!(value["timestamp"].as_i64().unwrap() > 0);
        assert!(value.get("isPartialResponse").is_none());
    }

    #[test]
    fn test_classify_response() {
        let msg = InboundMessage::classify(&json!({"id": 3, "args": ["a"], "isPartialResponse": true}));
        match msg {
            InboundMessage::Response(resp) => {
                assert_eq!(resp.id, 3);
                assert!(resp.is_partial());
            }
            other => panic!("unexpected {:?}", other),
        }
        let msg = InboundMessage::classify(&json!({"id": 4, "args": []}));
        assert!(matches!(msg, InboundMessage::Response(ref r) if !r.is_partial()));
    }

    #[test]
    fn test_classify_event_with_sentinel_id() {
        for data in [
            json!({"func": "themeChange", "args": ["dark"]}),
            json!({"id": null, "func": "themeChange", "args": ["dark"]}),
            json!({"id": "x", "func": "themeChange", "args": ["dark"]}),
        ] {
            assert_eq!(
                InboundMessage::classify(&data),
                InboundMessage::Event(MessageEvent::new("themeChange", vec![json!("dark")]))
            );
        }
    }

    #[test]
    fn test_classify_request_from_parent() {
        let data = json!({"id": 1, "func": "load", "args": [{}]});
        assert!(matches!(InboundMessage::classify(&data), InboundMessage::Request(_)));
        assert!(matches!(
            InboundMessage::classify_from_parent(&data, |_| false),
            InboundMessage::Event(ref e) if e.func == "load"
        ));
    }

    #[test]
    fn test_parent_reply_echoing_func_is_a_response() {
        let data = json!({"id": 4, "func": "getContext", "args": ["ctx"], "isPartialResponse": true});
        match InboundMessage::classify_from_parent(&data, |id| id == 4) {
            InboundMessage::Response(resp) => {
                assert_eq!(resp.id, 4);
                assert_eq!(resp.args, vec![json!("ctx")]);
                assert!(resp.is_partial());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_classify_unknown() {
        assert_eq!(InboundMessage::classify(&json!("hello")), InboundMessage::Unknown);
        assert_eq!(InboundMessage::classify(&json!({"foo": 1})), InboundMessage::Unknown);
        assert_eq!(InboundMessage::classify(&json!({"id": -1})), InboundMessage::Unknown);
    }
}
