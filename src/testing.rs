//! Test doubles for driving an engine without a browser.
//!
//! [`RecordingFrame`] and [`RecordingBridge`] keep every message posted to
//! them so tests can assert on exactly what the host would have seen.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::frame::{Frame, FrameId, NativeBridge};

/// A message captured by [`RecordingFrame`].
#[derive(Debug, Clone, PartialEq)]
pub struct PostedMessage {
    pub message: Value,
    pub target_origin: String,
}

/// A frame that records what was posted to it.
#[derive(Debug)]
pub struct RecordingFrame {
    id: FrameId,
    posted: Mutex<Vec<PostedMessage>>,
    closed: AtomicBool,
}

impl RecordingFrame {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: FrameId::next(),
            posted: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Every message posted so far, in order.
    pub fn posted(&self) -> Vec<PostedMessage> {
        self.posted.lock().clone()
    }

    /// Only the payloads, in order.
    pub fn messages(&self) -> Vec<Value> {
        self.posted.lock().iter().map(|p| p.message.clone()).collect()
    }

    /// The `func` names of posted messages, in order.
    pub fn funcs(&self) -> Vec<String> {
        self.posted
            .lock()
            .iter()
            .filter_map(|p| p.message.get("func").and_then(Value::as_str).map(String::from))
            .collect()
    }

    /// The last posted message whose `func` equals `func`.
    pub fn last_call(&self, func: &str) -> Option<Value> {
        self.posted
            .lock()
            .iter()
            .rev()
            .find(|p| p.message.get("func").and_then(Value::as_str) == Some(func))
            .map(|p| p.message.clone())
    }

    pub fn clear(&self) {
        self.posted.lock().clear();
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

impl Frame for RecordingFrame {
    fn id(&self) -> FrameId {
        self.id
    }

    fn post_message(&self, message: Value, target_origin: &str) {
        self.posted.lock().push(PostedMessage {
            message,
            target_origin: target_origin.to_string(),
        });
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// A native bridge that records what was sent through it.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    sent: Mutex<Vec<String>>,
}

impl RecordingBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Raw JSON strings in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Sent messages decoded back to JSON values.
    pub fn messages(&self) -> Vec<Value> {
        self.sent
            .lock()
            .iter()
            .filter_map(|s| serde_json::from_str(s).ok())
            .collect()
    }

    pub fn funcs(&self) -> Vec<String> {
        self.messages()
            .iter()
            .filter_map(|m| m.get("func").and_then(Value::as_str).map(String::from))
            .collect()
    }
}

impl NativeBridge for RecordingBridge {
    fn frameless_post_message(&self, message: String) {
        self.sent.lock().push(message);
    }
}
