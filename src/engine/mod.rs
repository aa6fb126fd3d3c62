//! The communication engine.
//!
//! An [`Engine`] owns one window's [`CommunicationState`]: the handshake,
//! the frame router, the pending-call table, the origin allow-list and the
//! handler registry. It is cheap to clone; clones share that state.
//!
//! State lives behind a single lock that is never held while a frame
//! receives a message, a caller is notified or a handler runs. Handlers may
//! therefore call back into the engine, including registering handlers or
//! sending new calls, while they are being dispatched.

pub mod calls;

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};

use crate::config::EngineConfig;
use crate::dispatcher::{Delivery, MessageDispatcher, ResponseFuture, ResponseSink, ResponseStream};
use crate::errors::{EngineError, Result};
use crate::frame::{Frame, InboundEvent, WindowEnvironment};
use crate::handlers::{BootstrapEvent, BootstrapHooks, HandlerRegistry, ReadyToUnload};
use crate::negotiation::{negotiate, HandshakeResponse, HandshakeState, NegotiatedHost};
use crate::origin::OriginValidator;
use crate::protocol::{
    InboundMessage, MessageEvent, MessageId, MessageRequest, MessageResponse, Reply, INITIALIZE_FUNC,
    REGISTER_HANDLER_FUNC,
};
use crate::router::{FrameRole, FrameRouter, InboundSource, Transmission};
use crate::runtime::{FrameContext, HostClientType, Runtime, SupportsMatrix};
use crate::version::is_at_least;

/// Context name reported in [`EngineError::WrongContext`] when the host
/// declared none.
const UNDEFINED_CONTEXT: &str = "undefined";

// ---------------------------------------------------------------------------
// CommunicationState
// ---------------------------------------------------------------------------

struct PendingHandshake {
    id: MessageId,
    waiter: oneshot::Sender<Result<()>>,
}

/// Everything one engine instance knows about its window.
struct CommunicationState {
    handshake: HandshakeState,
    pending_handshake: Option<PendingHandshake>,
    negotiated: Option<NegotiatedHost>,
    router: FrameRouter,
    dispatcher: MessageDispatcher,
    validator: OriginValidator,
    handlers: HandlerRegistry,
}

impl CommunicationState {
    fn new(config: &EngineConfig, environment: &WindowEnvironment) -> Self {
        let mut validator = OriginValidator::new();
        validator.add_user_origins(&config.valid_origins);
        Self {
            handshake: HandshakeState::Uninitialized,
            pending_handshake: None,
            negotiated: None,
            router: FrameRouter::new(environment),
            dispatcher: MessageDispatcher::new(),
            validator,
            handlers: HandlerRegistry::with_bootstrap(),
        }
    }

    /// Allocate an id for `func` and hand it to the router, tracking `sink`
    /// when the caller wants replies.
    fn route_request(
        &mut self,
        func: &str,
        args: Vec<Value>,
        sink: Option<ResponseSink>,
    ) -> Result<(MessageId, Option<Transmission>)> {
        let request = self.dispatcher.create_request(func, args);
        let transmission = self.router.route_to_parent(serde_json::to_value(&request)?)?;
        if let Some(sink) = sink {
            self.dispatcher.track(&request, sink);
        }
        log::debug!("Sending '{}' as message {}", func, request.id);
        Ok((request.id, transmission))
    }
}

/// Side effects decided under the lock and performed after releasing it.
#[derive(Default)]
struct Effects {
    transmissions: Vec<Transmission>,
    handshake: Option<(oneshot::Sender<Result<()>>, Result<()>)>,
    deliveries: Vec<Delivery>,
    parent_event: Option<MessageEvent>,
    child_request: Option<MessageRequest>,
}

impl Effects {
    fn apply(self, engine: &Engine) {
        for transmission in self.transmissions {
            transmission.deliver();
        }
        if let Some((waiter, result)) = self.handshake {
            if waiter.send(result).is_err() {
                log::debug!("Nobody is awaiting the handshake result");
            }
        }
        for delivery in self.deliveries {
            delivery.deliver();
        }
        if let Some(event) = self.parent_event {
            engine.handle_parent_event(event);
        }
        if let Some(request) = self.child_request {
            engine.handle_child_request(request);
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct EngineInner {
    config: EngineConfig,
    environment: WindowEnvironment,
    state: Mutex<CommunicationState>,
}

/// Request/response engine for one window.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    pub fn new(config: EngineConfig, environment: WindowEnvironment) -> Self {
        let state = CommunicationState::new(&config, &environment);
        Self {
            inner: Arc::new(EngineInner {
                config,
                environment,
                state: Mutex::new(state),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    fn downgrade(&self) -> Weak<EngineInner> {
        Arc::downgrade(&self.inner)
    }

    fn upgrade(inner: &Weak<EngineInner>) -> Option<Engine> {
        inner.upgrade().map(|inner| Engine { inner })
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Start the handshake and return a future for its outcome.
    ///
    /// The `initialize` message is posted before this returns, so calls made
    /// right afterwards are queued behind it. If a handshake is already in
    /// flight or complete, `valid_origins` are merged into the allow-list and
    /// the future resolves immediately. After a failed handshake a new one is
    /// started.
    pub fn initialize(&self, valid_origins: &[&str]) -> impl Future<Output = Result<()>> + Send + 'static {
        let started = self.start_handshake(valid_origins);
        let engine = self.clone();
        async move {
            match started {
                Ok(Some((id, rx))) => engine.await_handshake(id, rx).await,
                Ok(None) => Ok(()),
                Err(e) => Err(e),
            }
        }
    }

    fn start_handshake(&self, valid_origins: &[&str]) -> Result<Option<(MessageId, oneshot::Receiver<Result<()>>)>> {
        let config = &self.inner.config;
        let (id, rx, transmission) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.validator.add_user_origins(valid_origins.iter());
            match state.handshake {
                HandshakeState::HandshakeSent | HandshakeState::Negotiated => {
                    log::debug!("initialize called again while {}", state.handshake);
                    return Ok(None);
                }
                HandshakeState::Uninitialized | HandshakeState::Failed => {}
            }

            let request = state.dispatcher.create_request(
                INITIALIZE_FUNC,
                vec![json!(config.library_version), json!(config.runtime_api_version)],
            );
            let transmission = state.router.route_handshake(serde_json::to_value(&request)?)?;
            let (tx, rx) = oneshot::channel();
            state.pending_handshake = Some(PendingHandshake {
                id: request.id,
                waiter: tx,
            });
            state.handshake = HandshakeState::HandshakeSent;
            if let Some(role) = state.router.role() {
                log::info!("Initializing as {} window (handshake message {})", role, request.id);
            }
            (request.id, rx, transmission)
        };
        transmission.deliver();
        Ok(Some((id, rx)))
    }

    async fn await_handshake(&self, id: MessageId, mut rx: oneshot::Receiver<Result<()>>) -> Result<()> {
        let timeout_ms = self.inner.config.initialization_timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(EngineError::Cancelled {
                func: INITIALIZE_FUNC.to_string(),
            }),
            Err(_) => {
                if self.expire_handshake(id) {
                    return Err(EngineError::HandshakeTimeout { timeout_ms });
                }
                // The reply won the race against the deadline.
                match rx.try_recv() {
                    Ok(result) => result,
                    Err(_) => Err(EngineError::HandshakeTimeout { timeout_ms }),
                }
            }
        }
    }

    fn expire_handshake(&self, id: MessageId) -> bool {
        let mut state = self.inner.state.lock();
        if state.pending_handshake.as_ref().map(|h| h.id) != Some(id) {
            return false;
        }
        state.pending_handshake = None;
        state.handshake = HandshakeState::Failed;
        log::warn!(
            "SDK initialization timed out after {} ms",
            self.inner.config.initialization_timeout_ms
        );
        true
    }

    fn complete_handshake(&self, state: &mut CommunicationState, response: &MessageResponse) -> Result<()> {
        let reply = HandshakeResponse::from_args(&response.args);
        match negotiate(&reply, &self.inner.config.default_sdk_version_for_compat_check) {
            Ok(host) => {
                log::info!(
                    "Negotiated with host: context={:?} client={:?} sdk={} apiVersion={}",
                    host.frame_context,
                    host.host_client_type,
                    host.client_supported_sdk_version,
                    host.runtime.api_version
                );
                state.negotiated = Some(host);
                state.handshake = HandshakeState::Negotiated;
                Ok(())
            }
            Err(e) => {
                log::warn!("Handshake failed: {}", e);
                state.handshake = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    /// Return to the uninitialized state.
    ///
    /// Pending calls are dropped (their futures resolve to
    /// [`EngineError::Cancelled`]), relationships, queues, handlers, hooks,
    /// page-supplied origins and the negotiated runtime are forgotten.
    /// Message ids keep increasing.
    pub fn uninitialize(&self) {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.handshake == HandshakeState::Uninitialized {
            return;
        }
        log::info!("Uninitializing ({} pending call(s) cancelled)", state.dispatcher.pending_count());
        state.dispatcher.clear();
        state.pending_handshake = None;
        state.negotiated = None;
        state.router = FrameRouter::new(&self.inner.environment);
        state.handlers.clear();
        state.handlers.install_bootstrap();
        state.validator.clear_user_origins();
        state.validator.add_user_origins(&self.inner.config.valid_origins);
        state.handshake = HandshakeState::Uninitialized;
    }

    // -----------------------------------------------------------------------
    // Outbound calls
    // -----------------------------------------------------------------------

    fn start_call(&self, func: &str, args: Vec<Value>, sink: Option<ResponseSink>) -> Result<MessageId> {
        let (id, transmission) = {
            let mut state = self.inner.state.lock();
            if !state.handshake.initialize_called() {
                return Err(EngineError::NotInitialized);
            }
            state.route_request(func, args, sink)?
        };
        if let Some(transmission) = transmission {
            transmission.deliver();
        }
        Ok(id)
    }

    /// Call `func` on the host and get a future for the final reply.
    ///
    /// Before the handshake completes the call is queued; queued calls are
    /// posted in the order they were made.
    pub fn send(&self, func: &str, args: Vec<Value>) -> Result<ResponseFuture> {
        let (tx, rx) = oneshot::channel();
        let id = self.start_call(func, args, Some(ResponseSink::Future(tx)))?;
        Ok(ResponseFuture::new(id, func, rx))
    }

    /// Call `func` and stream every reply, partial ones included.
    pub fn send_streaming(&self, func: &str, args: Vec<Value>) -> Result<ResponseStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.start_call(func, args, Some(ResponseSink::Stream(tx)))?;
        Ok(ResponseStream::new(id, rx))
    }

    /// Call `func` and invoke `callback` for every reply.
    pub fn send_with_callback<F>(&self, func: &str, args: Vec<Value>, callback: F) -> Result<MessageId>
    where
        F: FnMut(Reply) + Send + 'static,
    {
        self.start_call(func, args, Some(ResponseSink::callback(callback)))
    }

    /// Post `func` without waiting for a reply.
    pub fn notify(&self, func: &str, args: Vec<Value>) -> Result<()> {
        self.start_call(func, args, None).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    /// Register `handler` for the event `name`, replacing any previous one.
    ///
    /// With `announce`, a `registerHandler` notification tells the host the
    /// page now listens for the event. Announcements made before
    /// `initialize` wait in the outbound queue.
    pub fn register_handler<F>(&self, name: &str, handler: F, announce: bool)
    where
        F: Fn(&Engine, &[Value]) -> Option<Value> + Send + Sync + 'static,
    {
        self.inner.state.lock().handlers.register(name, Arc::new(handler));
        if announce {
            self.announce_handler(name);
        }
    }

    fn announce_handler(&self, name: &str) {
        let routed = {
            let mut state = self.inner.state.lock();
            state.route_request(REGISTER_HANDLER_FUNC, vec![json!(name)], None)
        };
        match routed {
            Ok((_, Some(transmission))) => transmission.deliver(),
            Ok((_, None)) => {}
            Err(e) => log::warn!("Failed to announce handler '{}': {}", name, e),
        }
    }

    /// Remove the handler for `name`. Returns whether one was registered.
    pub fn remove_handler(&self, name: &str) -> bool {
        self.inner.state.lock().handlers.unregister(name).is_some()
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.inner.state.lock().handlers.contains(name)
    }

    /// Run the handler for `name`, returning whether one ran and its result.
    pub fn dispatch_handler(&self, name: &str, args: &[Value]) -> (bool, Option<Value>) {
        let handler = self.inner.state.lock().handlers.get(name);
        match handler {
            Some(handler) => {
                log::debug!("Dispatching '{}' to its handler", name);
                (true, handler(self, args))
            }
            None => (false, None),
        }
    }

    pub(crate) fn bootstrap_hooks(&self) -> BootstrapHooks {
        self.inner.state.lock().handlers.hooks().clone()
    }

    fn set_hook(&self, event: BootstrapEvent, update: impl FnOnce(&mut BootstrapHooks)) -> Result<()> {
        self.ensure_initialize_called()?;
        update(self.inner.state.lock().handlers.hooks_mut());
        self.announce_handler(event.as_str());
        Ok(())
    }

    /// Observe theme changes. The new theme is still relayed to a held child.
    pub fn on_theme_change<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.set_hook(BootstrapEvent::ThemeChange, |hooks| hooks.theme_change = Some(Arc::new(hook)))
    }

    /// Observe `load` events carrying the load context.
    pub fn on_load<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.set_hook(BootstrapEvent::Load, |hooks| hooks.load = Some(Arc::new(hook)))
    }

    /// Take over unloading. The hook returns `true` when it will call
    /// [`ReadyToUnload::ready`] itself.
    pub fn on_before_unload<F>(&self, hook: F) -> Result<()>
    where
        F: Fn(ReadyToUnload) -> bool + Send + Sync + 'static,
    {
        self.set_hook(BootstrapEvent::BeforeUnload, |hooks| hooks.before_unload = Some(Arc::new(hook)))
    }

    /// Handle back-button presses. Return `false` to let the host navigate.
    pub fn on_back_button_press<F>(&self, hook: F) -> Result<()>
    where
        F: Fn() -> bool + Send + Sync + 'static,
    {
        self.set_hook(BootstrapEvent::BackButtonPress, |hooks| {
            hooks.back_button_press = Some(Arc::new(hook))
        })
    }

    // -----------------------------------------------------------------------
    // Inbound
    // -----------------------------------------------------------------------

    /// Process a `message` event posted to this window.
    ///
    /// Events from the window itself, from untrusted origins or from
    /// unrelated windows are dropped without any observable effect.
    pub fn handle_message_event(&self, event: InboundEvent) {
        let effects = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if !state.handshake.initialize_called() {
                log::debug!("Ignoring message received before initialize");
                return;
            }
            let (source, flushed) = state.router.classify_inbound(&event, &state.validator);
            let mut effects = Effects {
                transmissions: flushed,
                ..Effects::default()
            };
            match source {
                InboundSource::Parent => self.process_parent_message(state, &event.data, &mut effects),
                InboundSource::Child => process_child_message(&event.data, &mut effects),
                InboundSource::Ignored => {}
            }
            effects
        };
        effects.apply(self);
    }

    /// Process a JSON message delivered by the native host of a frameless
    /// window.
    pub fn handle_native_message(&self, json: &str) {
        let data: Value = match serde_json::from_str(json) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Dropping undecodable native message: {}", e);
                return;
            }
        };
        let effects = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            if !state.handshake.initialize_called() || !state.router.is_frameless() {
                log::debug!("Ignoring native message outside an initialized frameless window");
                return;
            }
            let mut effects = Effects {
                transmissions: state.router.accept_native_message(),
                ..Effects::default()
            };
            self.process_parent_message(state, &data, &mut effects);
            effects
        };
        effects.apply(self);
    }

    fn process_parent_message(&self, state: &mut CommunicationState, data: &Value, effects: &mut Effects) {
        let handshake_id = state.pending_handshake.as_ref().map(|h| h.id);
        let message = InboundMessage::classify_from_parent(data, |id| {
            Some(id) == handshake_id || state.dispatcher.is_pending(id)
        });
        match message {
            InboundMessage::Response(response) => {
                let is_handshake_reply = !response.is_partial() && handshake_id == Some(response.id);
                if is_handshake_reply {
                    if let Some(pending) = state.pending_handshake.take() {
                        let result = self.complete_handshake(state, &response);
                        if result.is_ok() {
                            effects.transmissions.extend(state.router.open_parent());
                        }
                        effects.handshake = Some((pending.waiter, result));
                    }
                } else if let Some(delivery) = state.dispatcher.resolve(response) {
                    effects.deliveries.push(delivery);
                }
            }
            InboundMessage::Event(event) => effects.parent_event = Some(event),
            InboundMessage::Request(_) | InboundMessage::Unknown => {
                log::warn!("Dropping unrecognized message from parent: {}", data);
            }
        }
    }

    fn handle_parent_event(&self, event: MessageEvent) {
        let (handled, _) = self.dispatch_handler(&event.func, &event.args);
        if handled {
            return;
        }
        if self.has_child() {
            if let Err(e) = self.send_event_to_child(&event.func, event.args) {
                log::debug!("Could not relay '{}' to child: {}", event.func, e);
            }
        } else {
            log::debug!("No handler registered for '{}'", event.func);
        }
    }

    /// Answer a child's request locally, or proxy it to the parent and relay
    /// every reply back under the child's id.
    fn handle_child_request(&self, request: MessageRequest) {
        if let (true, Some(result)) = self.dispatch_handler(&request.func, &request.args) {
            let args = match result {
                Value::Array(args) => args,
                other => vec![other],
            };
            if let Err(e) = self.send_response_to_child(request.id, args, false) {
                log::debug!("Could not answer child message {}: {}", request.id, e);
            }
            return;
        }

        let engine = self.downgrade();
        let child_id = request.id;
        let relay = move |reply: Reply| {
            let Some(engine) = Engine::upgrade(&engine) else {
                return;
            };
            if !engine.has_child() {
                return;
            }
            if let Err(e) = engine.send_response_to_child(child_id, reply.args, reply.is_partial) {
                log::debug!("Could not relay reply to child message {}: {}", child_id, e);
            }
        };
        match self.send_with_callback(&request.func, request.args, relay) {
            Ok(id) => log::debug!("Proxied child message {} to parent as {}", child_id, id),
            Err(e) => log::warn!("Failed to proxy child message {}: {}", child_id, e),
        }
    }

    // -----------------------------------------------------------------------
    // Child window
    // -----------------------------------------------------------------------

    /// Hold `frame` as this window's child, e.g. an authentication popup.
    /// Messages for the child are queued until its origin is known.
    pub fn attach_child(&self, frame: Arc<dyn Frame>, origin: Option<&str>) {
        let flushed = self
            .inner
            .state
            .lock()
            .router
            .attach_child(frame, origin.map(String::from));
        for transmission in flushed {
            transmission.deliver();
        }
    }

    pub fn detach_child(&self) {
        self.inner.state.lock().router.detach_child();
    }

    pub fn has_child(&self) -> bool {
        self.inner.state.lock().router.has_child()
    }

    /// Relay a named event to the child window.
    pub fn send_event_to_child(&self, func: &str, args: Vec<Value>) -> Result<()> {
        let message = serde_json::to_value(MessageEvent::new(func, args))?;
        self.post_to_child(message)
    }

    fn send_response_to_child(&self, id: MessageId, args: Vec<Value>, is_partial: bool) -> Result<()> {
        let message = serde_json::to_value(MessageResponse::with_partial(id, args, is_partial))?;
        self.post_to_child(message)
    }

    fn post_to_child(&self, message: Value) -> Result<()> {
        let transmission = self.inner.state.lock().router.route_to_child(message)?;
        if let Some(transmission) = transmission {
            transmission.deliver();
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn handshake_state(&self) -> HandshakeState {
        self.inner.state.lock().handshake
    }

    pub fn is_negotiated(&self) -> bool {
        self.handshake_state() == HandshakeState::Negotiated
    }

    /// Fails with [`EngineError::NotInitialized`] unless `initialize` was
    /// invoked.
    pub fn ensure_initialize_called(&self) -> Result<()> {
        if self.handshake_state().initialize_called() {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    /// Fails unless negotiation completed and, when `expected` is not empty,
    /// the frame context is one of `expected`. A host that reported no
    /// context matches no non-empty set.
    pub fn ensure_initialized(&self, expected: &[FrameContext]) -> Result<()> {
        let state = self.inner.state.lock();
        let Some(host) = state.negotiated.as_ref() else {
            return Err(EngineError::NotInitialized);
        };
        if expected.is_empty() {
            return Ok(());
        }
        let actual = host.frame_context.as_deref();
        if expected.iter().any(|c| Some(c.as_str()) == actual) {
            return Ok(());
        }
        Err(EngineError::WrongContext {
            allowed: serde_json::to_string(expected)?,
            actual: actual.unwrap_or(UNDEFINED_CONTEXT).to_string(),
        })
    }

    pub fn role(&self) -> Option<FrameRole> {
        self.inner.state.lock().router.role()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().dispatcher.pending_count()
    }

    pub fn negotiated_host(&self) -> Option<NegotiatedHost> {
        self.inner.state.lock().negotiated.clone()
    }

    pub fn runtime(&self) -> Option<Runtime> {
        self.inner.state.lock().negotiated.as_ref().map(|h| h.runtime.clone())
    }

    pub fn supports_matrix(&self) -> Option<SupportsMatrix> {
        self.inner
            .state
            .lock()
            .negotiated
            .as_ref()
            .map(|h| h.runtime.supports.clone())
    }

    /// Whether the negotiated host supports the capability at `path`.
    /// Always `false` before negotiation.
    pub fn is_supported(&self, path: &[&str]) -> bool {
        self.inner
            .state
            .lock()
            .negotiated
            .as_ref()
            .map(|h| h.runtime.is_supported(path))
            .unwrap_or(false)
    }

    pub fn frame_context(&self) -> Option<String> {
        self.inner.state.lock().negotiated.as_ref().and_then(|h| h.frame_context.clone())
    }

    pub fn host_client_type(&self) -> Option<String> {
        self.inner
            .state
            .lock()
            .negotiated
            .as_ref()
            .and_then(|h| h.host_client_type.clone())
    }

    /// The SDK version the host declared, or the configured default.
    pub fn client_supported_sdk_version(&self) -> String {
        self.inner
            .state
            .lock()
            .negotiated
            .as_ref()
            .map(|h| h.client_supported_sdk_version.clone())
            .unwrap_or_else(|| self.inner.config.default_sdk_version_for_compat_check.clone())
    }

    /// `false` when either version cannot be parsed.
    pub fn is_current_sdk_version_at_least(&self, version: &str) -> bool {
        is_at_least(&self.client_supported_sdk_version(), version)
    }

    pub fn is_host_client_mobile(&self) -> bool {
        self.host_client_type()
            .as_deref()
            .and_then(HostClientType::from_str_opt)
            .map(|t| t.is_mobile())
            .unwrap_or(false)
    }

    /// Whether a message from `origin` would pass the allow-list.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        self.inner.state.lock().validator.is_allowed(origin)
    }

    pub fn user_origins(&self) -> Vec<String> {
        self.inner
            .state
            .lock()
            .validator
            .user_origins()
            .into_iter()
            .map(String::from)
            .collect()
    }
}

fn process_child_message(data: &Value, effects: &mut Effects) {
    match InboundMessage::classify(data) {
        InboundMessage::Request(request) => effects.child_request = Some(request),
        _ => log::debug!("Ignoring non-request message from child: {}", data),
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Engine")
            .field("handshake", &state.handshake)
            .field("router", &state.router)
            .field("pending", &state.dispatcher.pending_count())
            .field("handlers", &state.handlers)
            .finish()
    }
}
