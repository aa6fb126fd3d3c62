//! Frame routing: which window a message goes to and where one came from.
//!
//! The router owns the parent and child relationships, their known origins
//! and the per-target outbound queues. It never touches a window directly:
//! every delivery is returned as a [`Transmission`] for the caller to
//! perform once it has released its own locks.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::errors::{EngineError, Result};
use crate::frame::{Frame, FrameId, InboundEvent, NativeBridge, WindowEnvironment};
use crate::origin::OriginValidator;

/// Target origin used when the peer's origin is not known yet.
pub const ANY_ORIGIN: &str = "*";

// ---------------------------------------------------------------------------
// FrameRole
// ---------------------------------------------------------------------------

/// How this window reaches its host. Decided once per initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRole {
    /// The host is a real parent (or opener) window.
    Framed,
    /// The host is reached through an injected native bridge.
    Frameless,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRole::Framed => write!(f, "framed"),
            FrameRole::Frameless => write!(f, "frameless"),
        }
    }
}

/// Where an accepted inbound message came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundSource {
    Parent,
    Child,
    /// Dropped: own window, untrusted origin, or unrelated source.
    Ignored,
}

impl InboundSource {
    pub fn is_from_parent(&self) -> bool {
        matches!(self, InboundSource::Parent)
    }

    pub fn is_from_child(&self) -> bool {
        matches!(self, InboundSource::Child)
    }
}

// ---------------------------------------------------------------------------
// Transmission
// ---------------------------------------------------------------------------

/// A delivery the router decided on.
pub enum Transmission {
    Post {
        frame: Arc<dyn Frame>,
        message: Value,
        target_origin: String,
    },
    Native {
        bridge: Arc<dyn NativeBridge>,
        message: String,
    },
}

impl Transmission {
    /// Perform the delivery.
    pub fn deliver(self) {
        match self {
            Transmission::Post {
                frame,
                message,
                target_origin,
            } => frame.post_message(message, &target_origin),
            Transmission::Native { bridge, message } => bridge.frameless_post_message(message),
        }
    }
}

impl fmt::Debug for Transmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transmission::Post {
                frame,
                message,
                target_origin,
            } => f
                .debug_struct("Post")
                .field("frame", &frame.id())
                .field("message", message)
                .field("target_origin", target_origin)
                .finish(),
            Transmission::Native { message, .. } => f.debug_struct("Native").field("message", message).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// Peer
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Peer {
    frame: Option<Arc<dyn Frame>>,
    origin: Option<String>,
    queue: VecDeque<Value>,
}

impl Peer {
    fn is(&self, id: FrameId) -> bool {
        self.frame.as_ref().map(|f| f.id()) == Some(id)
    }

    fn is_closed(&self) -> bool {
        self.frame.as_ref().map(|f| f.is_closed()).unwrap_or(false)
    }

    fn forget(&mut self) {
        self.frame = None;
        self.origin = None;
    }

    fn ready(&self) -> Option<(Arc<dyn Frame>, String)> {
        match (&self.frame, &self.origin) {
            (Some(frame), Some(origin)) => Some((frame.clone(), origin.clone())),
            _ => None,
        }
    }

    fn drain(&mut self) -> Vec<Transmission> {
        let Some((frame, origin)) = self.ready() else {
            return Vec::new();
        };
        self.queue
            .drain(..)
            .map(|message| Transmission::Post {
                frame: frame.clone(),
                message,
                target_origin: origin.clone(),
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// FrameRouter
// ---------------------------------------------------------------------------

/// Tracks parent/child windows and decides message targets.
pub struct FrameRouter {
    own_id: FrameId,
    own_origin: Option<String>,
    role: Option<FrameRole>,
    parent: Peer,
    child: Peer,
    native_bridge: Option<Arc<dyn NativeBridge>>,
    /// Set once the native host has spoken; gates the parent queue when frameless.
    native_established: bool,
    /// Set once the handshake succeeded; nothing but the handshake reaches
    /// the host before that.
    parent_open: bool,
}

impl FrameRouter {
    pub fn new(environment: &WindowEnvironment) -> Self {
        Self {
            own_id: environment.own_id,
            own_origin: environment.own_origin.clone(),
            role: None,
            parent: Peer {
                frame: environment.parent.clone(),
                ..Peer::default()
            },
            child: Peer::default(),
            native_bridge: environment.native_bridge.clone(),
            native_established: false,
            parent_open: false,
        }
    }

    /// Decide the role, once. Later calls return the first decision.
    pub fn establish_role(&mut self) -> Result<FrameRole> {
        if let Some(role) = self.role {
            return Ok(role);
        }
        let role = if self.parent.frame.is_some() {
            FrameRole::Framed
        } else if self.native_bridge.is_some() {
            FrameRole::Frameless
        } else {
            return Err(EngineError::NoParentWindow);
        };
        log::debug!("Frame role established: {}", role);
        self.role = Some(role);
        Ok(role)
    }

    pub fn role(&self) -> Option<FrameRole> {
        self.role
    }

    pub fn is_frameless(&self) -> bool {
        self.role == Some(FrameRole::Frameless)
    }

    pub fn has_child(&self) -> bool {
        self.child.frame.is_some()
    }

    pub fn child_id(&self) -> Option<FrameId> {
        self.child.frame.as_ref().map(|f| f.id())
    }

    pub fn parent_id(&self) -> Option<FrameId> {
        self.parent.frame.as_ref().map(|f| f.id())
    }

    pub fn parent_origin(&self) -> Option<&str> {
        self.parent.origin.as_deref()
    }

    pub fn child_origin(&self) -> Option<&str> {
        self.child.origin.as_deref()
    }

    pub fn is_parent_open(&self) -> bool {
        self.parent_open
    }

    pub fn queued_for_parent(&self) -> usize {
        self.parent.queue.len()
    }

    pub fn queued_for_child(&self) -> usize {
        self.child.queue.len()
    }

    // -----------------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------------

    /// Route the handshake. It bypasses the queue and goes to any origin,
    /// since the parent's origin is unknown until it answers.
    pub fn route_handshake(&mut self, message: Value) -> Result<Transmission> {
        match self.establish_role()? {
            FrameRole::Frameless => {
                let bridge = self.native_bridge.clone().ok_or(EngineError::NoParentWindow)?;
                Ok(Transmission::Native {
                    bridge,
                    message: serde_json::to_string(&message)?,
                })
            }
            FrameRole::Framed => {
                let frame = self.parent.frame.clone().ok_or(EngineError::NoParentWindow)?;
                Ok(Transmission::Post {
                    frame,
                    message,
                    target_origin: ANY_ORIGIN.to_string(),
                })
            }
        }
    }

    /// Route a message to the host, or queue it until the handshake
    /// succeeded and the host is reachable.
    pub fn route_to_parent(&mut self, message: Value) -> Result<Option<Transmission>> {
        if self.parent_open && self.parent.queue.is_empty() {
            if self.is_frameless() {
                if let Some(bridge) = self.native_bridge.clone().filter(|_| self.native_established) {
                    return Ok(Some(Transmission::Native {
                        bridge,
                        message: serde_json::to_string(&message)?,
                    }));
                }
            } else if let Some((frame, target_origin)) = self.parent.ready() {
                return Ok(Some(Transmission::Post {
                    frame,
                    message,
                    target_origin,
                }));
            }
        }
        log::debug!("Queueing message for parent ({} already queued)", self.parent.queue.len());
        self.parent.queue.push_back(message);
        Ok(None)
    }

    /// Route a message to the held child window.
    pub fn route_to_child(&mut self, message: Value) -> Result<Option<Transmission>> {
        if self.child.frame.is_none() {
            return Err(EngineError::NoChildWindow);
        }
        if self.child.queue.is_empty() {
            if let Some((frame, target_origin)) = self.child.ready() {
                return Ok(Some(Transmission::Post {
                    frame,
                    message,
                    target_origin,
                }));
            }
        }
        log::debug!("Queueing message for child ({} already queued)", self.child.queue.len());
        self.child.queue.push_back(message);
        Ok(None)
    }

    /// Release the parent queue after a successful handshake.
    pub fn open_parent(&mut self) -> Vec<Transmission> {
        self.parent_open = true;
        self.flush()
    }

    /// Drain every queue whose target is now reachable, parent first.
    pub fn flush(&mut self) -> Vec<Transmission> {
        let mut out = Vec::new();
        if !self.parent_open {
            log::trace!("Holding {} message(s) until the handshake succeeds", self.parent.queue.len());
        } else if self.is_frameless() {
            if self.native_established {
                if let Some(bridge) = self.native_bridge.clone() {
                    for message in self.parent.queue.drain(..) {
                        match serde_json::to_string(&message) {
                            Ok(message) => out.push(Transmission::Native {
                                bridge: bridge.clone(),
                                message,
                            }),
                            Err(e) => log::warn!("Dropping unserializable queued message: {}", e),
                        }
                    }
                }
            }
        } else {
            out.extend(self.parent.drain());
        }
        out.extend(self.child.drain());
        if !out.is_empty() {
            log::debug!("Flushing {} queued message(s)", out.len());
        }
        out
    }

    // -----------------------------------------------------------------------
    // Child management
    // -----------------------------------------------------------------------

    /// Hold a child window, e.g. a popup opened for authentication.
    pub fn attach_child(&mut self, frame: Arc<dyn Frame>, origin: Option<String>) -> Vec<Transmission> {
        if !self.child.is(frame.id()) {
            self.child.queue.clear();
        }
        self.child.frame = Some(frame);
        self.child.origin = origin;
        self.child.drain()
    }

    pub fn detach_child(&mut self) {
        self.child.forget();
        self.child.queue.clear();
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Gate and classify a `message` event, updating relationships.
    ///
    /// Returns the source classification plus any queued deliveries that
    /// became possible.
    pub fn classify_inbound(
        &mut self,
        event: &InboundEvent,
        validator: &OriginValidator,
    ) -> (InboundSource, Vec<Transmission>) {
        let Some(source) = event.source.clone() else {
            log::debug!("Dropping message without a source window");
            return (InboundSource::Ignored, Vec::new());
        };
        let source_id = source.id();
        if source_id == self.own_id {
            return (InboundSource::Ignored, Vec::new());
        }
        let same_origin = self.own_origin.as_deref() == Some(event.origin.as_str());
        if !same_origin && !validator.is_allowed(&event.origin) {
            return (InboundSource::Ignored, Vec::new());
        }

        self.update_relationships(source, &event.origin);
        let flushed = self.flush();

        let classification = if self.parent.is(source_id) {
            InboundSource::Parent
        } else if self.child.is(source_id) {
            InboundSource::Child
        } else {
            InboundSource::Ignored
        };
        (classification, flushed)
    }

    /// Record that the native host delivered a message.
    pub fn accept_native_message(&mut self) -> Vec<Transmission> {
        self.native_established = true;
        self.flush()
    }

    fn update_relationships(&mut self, source: Arc<dyn Frame>, origin: &str) {
        let source_id = source.id();
        // Frameless windows have no parent frame, so window messages must be
        // from the child.
        if !self.is_frameless()
            && (self.parent.frame.is_none() || self.parent.is_closed() || self.parent.is(source_id))
        {
            self.parent.frame = Some(source);
            self.parent.origin = Some(origin.to_string());
        } else if self.child.frame.is_none() || self.child.is_closed() || self.child.is(source_id) {
            self.child.frame = Some(source);
            self.child.origin = Some(origin.to_string());
        }

        if self.parent.is_closed() {
            self.parent.forget();
        }
        if self.child.is_closed() {
            self.child.forget();
        }
    }
}

impl fmt::Debug for FrameRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameRouter")
            .field("role", &self.role)
            .field("parent", &self.parent_id())
            .field("parent_origin", &self.parent.origin)
            .field("child", &self.child_id())
            .field("child_origin", &self.child.origin)
            .field("queued_for_parent", &self.parent.queue.len())
            .field("queued_for_child", &self.child.queue.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingBridge, RecordingFrame};
    use serde_json::json;

    const HOST: &str = "https://teams.microsoft.com";

    fn deliver_all(transmissions: Vec<Transmission>) {
        for t in transmissions {
            t.deliver();
        }
    }

    #[test]
    fn test_role_requires_parent_or_bridge() {
        let mut router = FrameRouter::new(&WindowEnvironment::detached());
        assert!(matches!(router.establish_role(), Err(EngineError::NoParentWindow)));

        let parent = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent));
        assert_eq!(router.establish_role().unwrap(), FrameRole::Framed);

        let bridge = RecordingBridge::new();
        let mut router = FrameRouter::new(&WindowEnvironment::frameless(bridge));
        assert_eq!(router.establish_role().unwrap(), FrameRole::Frameless);
    }

    #[test]
    fn test_parent_queue_waits_for_open() {
        let parent = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent.clone()));
        router.route_handshake(json!({"func": "initialize"})).unwrap().deliver();
        assert_eq!(parent.posted()[0].target_origin, ANY_ORIGIN);

        assert!(router.route_to_parent(json!({"func": "a"})).unwrap().is_none());
        assert!(router.route_to_parent(json!({"func": "b"})).unwrap().is_none());
        assert_eq!(router.queued_for_parent(), 2);
        assert_eq!(parent.funcs(), vec!["initialize"]);

        let event = InboundEvent::new(parent.clone(), HOST, json!({"func": "themeChange", "args": []}));
        let (source, flushed) = router.classify_inbound(&event, &OriginValidator::new());
        assert_eq!(source, InboundSource::Parent);
        assert!(flushed.is_empty());
        assert_eq!(router.parent_origin(), Some(HOST));
        assert!(router.route_to_parent(json!({"func": "c"})).unwrap().is_none());
        assert_eq!(parent.funcs(), vec!["initialize"]);

        deliver_all(router.open_parent());
        assert!(router.is_parent_open());
        assert_eq!(parent.funcs(), vec!["initialize", "a", "b", "c"]);
        assert_eq!(parent.posted()[1].target_origin, HOST);

        router.route_to_parent(json!({"func": "d"})).unwrap().unwrap().deliver();
        assert_eq!(parent.funcs(), vec!["initialize", "a", "b", "c", "d"]);
    }

    #[test]
    fn test_untrusted_origin_is_ignored_without_side_effects() {
        let parent = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent.clone()));
        router.establish_role().unwrap();
        router.route_to_parent(json!({"func": "a"})).unwrap();

        let event = InboundEvent::new(parent.clone(), "https://teams.microsoft.com.evil.com", json!({}));
        let (source, flushed) = router.classify_inbound(&event, &OriginValidator::new());
        assert_eq!(source, InboundSource::Ignored);
        assert!(flushed.is_empty());
        assert_eq!(router.parent_origin(), None);
        assert_eq!(router.queued_for_parent(), 1);
    }

    #[test]
    fn test_own_origin_bypasses_allow_list() {
        let parent = RecordingFrame::new();
        let env = WindowEnvironment::framed(parent.clone()).with_own_origin("https://app.local");
        let mut router = FrameRouter::new(&env);
        router.establish_role().unwrap();
        let event = InboundEvent::new(parent, "https://app.local", json!({}));
        let (source, _) = router.classify_inbound(&event, &OriginValidator::empty());
        assert_eq!(source, InboundSource::Parent);
    }

    #[test]
    fn test_second_window_becomes_child() {
        let parent = RecordingFrame::new();
        let child = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent.clone()));
        router.establish_role().unwrap();
        let validator = OriginValidator::new();

        router.classify_inbound(&InboundEvent::new(parent.clone(), HOST, json!({})), &validator);
        let (source, _) =
            router.classify_inbound(&InboundEvent::new(child.clone(), HOST, json!({})), &validator);
        assert_eq!(source, InboundSource::Child);
        assert_eq!(router.child_id(), Some(child.id()));
    }

    #[test]
    fn test_frameless_window_messages_come_from_child() {
        let bridge = RecordingBridge::new();
        let child = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::frameless(bridge.clone()));
        router.establish_role().unwrap();

        let (source, _) = router.classify_inbound(
            &InboundEvent::new(child.clone(), HOST, json!({})),
            &OriginValidator::new(),
        );
        assert_eq!(source, InboundSource::Child);
        assert!(router.parent_id().is_none());
    }

    #[test]
    fn test_frameless_queue_waits_for_native_host() {
        let bridge = RecordingBridge::new();
        let mut router = FrameRouter::new(&WindowEnvironment::frameless(bridge.clone()));
        router.route_handshake(json!({"func": "initialize"})).unwrap().deliver();
        assert!(router.route_to_parent(json!({"func": "a"})).unwrap().is_none());
        assert_eq!(bridge.funcs(), vec!["initialize"]);

        assert!(router.open_parent().is_empty());
        assert!(router.route_to_parent(json!({"func": "b"})).unwrap().is_none());
        deliver_all(router.accept_native_message());
        assert_eq!(bridge.funcs(), vec!["initialize", "a", "b"]);
        router.route_to_parent(json!({"func": "c"})).unwrap().unwrap().deliver();
        assert_eq!(bridge.funcs(), vec!["initialize", "a", "b", "c"]);
    }

    #[test]
    fn test_child_routing() {
        let parent = RecordingFrame::new();
        let child = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent));
        assert!(matches!(router.route_to_child(json!({})), Err(EngineError::NoChildWindow)));

        assert!(router.attach_child(child.clone(), None).is_empty());
        assert!(router.route_to_child(json!({"func": "x"})).unwrap().is_none());
        deliver_all(router.attach_child(child.clone(), Some("https://auth.example.com".into())));
        assert_eq!(child.funcs(), vec!["x"]);
        assert_eq!(child.posted()[0].target_origin, "https://auth.example.com");

        router.detach_child();
        assert!(!router.has_child());
    }

    #[test]
    fn test_closed_child_is_replaced() {
        let parent = RecordingFrame::new();
        let first = RecordingFrame::new();
        let second = RecordingFrame::new();
        let mut router = FrameRouter::new(&WindowEnvironment::framed(parent.clone()));
        router.establish_role().unwrap();
        let validator = OriginValidator::new();
        router.classify_inbound(&InboundEvent::new(parent, HOST, json!({})), &validator);
        router.classify_inbound(&InboundEvent::new(first.clone(), HOST, json!({})), &validator);
        first.close();
        let (source, _) =
            router.classify_inbound(&InboundEvent::new(second.clone(), HOST, json!({})), &validator);
        assert_eq!(source, InboundSource::Child);
        assert_eq!(router.child_id(), Some(second.id()));
    }
}
