//! Window abstractions the engine talks through.
//!
//! A [`Frame`] is anything that accepts `postMessage`-style deliveries: the
//! embedding parent, an opener, or a popup this page opened. A
//! [`NativeBridge`] is the host-injected object used instead of a parent
//! frame when the page runs frameless inside a native shell.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

static FRAME_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a window, used to compare message sources.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(u64);

impl FrameId {
    /// Allocate a fresh, process-unique id.
    pub fn next() -> Self {
        Self(FRAME_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({})", self.0)
    }
}

/// A window reachable with `postMessage`.
pub trait Frame: Send + Sync {
    /// Identity used to recognize this window as a message source.
    fn id(&self) -> FrameId;

    /// Deliver `message`, restricted to `target_origin` (`"*"` for any).
    fn post_message(&self, message: Value, target_origin: &str);

    /// Whether the window has been closed.
    fn is_closed(&self) -> bool {
        false
    }
}

/// Host-injected channel used by frameless pages.
pub trait NativeBridge: Send + Sync {
    /// Hand a JSON-encoded message to the native host.
    fn frameless_post_message(&self, message: String);
}

/// Describes the window the engine runs in.
#[derive(Clone)]
pub struct WindowEnvironment {
    /// Identity of the current window.
    pub own_id: FrameId,
    /// Origin of the current window, trusted without consulting the allow-list.
    pub own_origin: Option<String>,
    /// The embedding parent, or the opener for top-level popups.
    pub parent: Option<Arc<dyn Frame>>,
    /// Native bridge injected by a frameless host.
    pub native_bridge: Option<Arc<dyn NativeBridge>>,
}

impl WindowEnvironment {
    /// Environment for a page embedded in `parent`.
    pub fn framed(parent: Arc<dyn Frame>) -> Self {
        Self {
            own_id: FrameId::next(),
            own_origin: None,
            parent: Some(parent),
            native_bridge: None,
        }
    }

    /// Environment for a page hosted by a native shell.
    pub fn frameless(bridge: Arc<dyn NativeBridge>) -> Self {
        Self {
            own_id: FrameId::next(),
            own_origin: None,
            parent: None,
            native_bridge: Some(bridge),
        }
    }

    /// Environment with no way to reach a host.
    pub fn detached() -> Self {
        Self {
            own_id: FrameId::next(),
            own_origin: None,
            parent: None,
            native_bridge: None,
        }
    }

    /// Builder: set the current window's origin.
    pub fn with_own_origin(mut self, origin: impl Into<String>) -> Self {
        self.own_origin = Some(origin.into());
        self
    }
}

impl fmt::Debug for WindowEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowEnvironment")
            .field("own_id", &self.own_id)
            .field("own_origin", &self.own_origin)
            .field("parent", &self.parent.as_ref().map(|p| p.id()))
            .field("native_bridge", &self.native_bridge.is_some())
            .finish()
    }
}

/// An inbound `message` event.
#[derive(Clone)]
pub struct InboundEvent {
    /// The window that posted the message, when known.
    pub source: Option<Arc<dyn Frame>>,
    /// The sender's origin as reported by the browser.
    pub origin: String,
    /// The message payload.
    pub data: Value,
}

impl InboundEvent {
    pub fn new(source: Arc<dyn Frame>, origin: impl Into<String>, data: Value) -> Self {
        Self {
            source: Some(source),
            origin: origin.into(),
            data,
        }
    }

    pub fn source_id(&self) -> Option<FrameId> {
        self.source.as_ref().map(|s| s.id())
    }
}

impl fmt::Debug for InboundEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundEvent")
            .field("source", &self.source_id())
            .field("origin", &self.origin)
            .field("data", &self.data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_ids_are_unique() {
        let a = FrameId::next();
        let b = FrameId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_detached_environment() {
        let env = WindowEnvironment::detached().with_own_origin("https://app.example.com");
        assert!(env.parent.is_none());
        assert!(env.native_bridge.is_none());
        assert_eq!(env.own_origin.as_deref(), Some("https://app.example.com"));
    }
}
