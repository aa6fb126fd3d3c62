//! Request/response correlation.
//!
//! The dispatcher hands out monotonically increasing message ids, remembers
//! who is waiting on each one and matches inbound replies back to them by
//! id alone. A reply flagged `isPartialResponse` is delivered without
//! retiring the request; the first final reply retires it, and later finals
//! for the same id find nothing and are dropped.
//!
//! Resolution happens in two steps so that no lock is held while user code
//! runs: [`MessageDispatcher::resolve`] returns a [`Delivery`] and the caller
//! invokes [`Delivery::deliver`] afterwards.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use futures::Stream;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

use crate::errors::{EngineError, Result};
use crate::protocol::{MessageId, MessageRequest, MessageResponse, Reply};

/// Legacy callback receiving every reply with its partial flag.
pub type ReplyCallback = Box<dyn FnMut(Reply) + Send>;

// ---------------------------------------------------------------------------
// ResponseSink
// ---------------------------------------------------------------------------

/// Where replies for a pending request go.
pub enum ResponseSink {
    /// Future-style caller; only the final reply is delivered.
    Future(oneshot::Sender<Vec<Value>>),
    /// Streaming caller; every reply is delivered.
    Stream(mpsc::UnboundedSender<Reply>),
    /// Callback-style caller; every reply is delivered.
    Callback(Arc<Mutex<ReplyCallback>>),
}

impl ResponseSink {
    /// Wrap a callback.
    pub fn callback(callback: impl FnMut(Reply) + Send + 'static) -> Self {
        ResponseSink::Callback(Arc::new(Mutex::new(Box::new(callback))))
    }

    /// A handle usable for a partial delivery, if this sink takes partials.
    fn partial_handle(&self) -> Option<ResponseSink> {
        match self {
            ResponseSink::Future(_) => None,
            ResponseSink::Stream(tx) => Some(ResponseSink::Stream(tx.clone())),
            ResponseSink::Callback(cb) => Some(ResponseSink::Callback(cb.clone())),
        }
    }
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSink::Future(_) => write!(f, "Future"),
            ResponseSink::Stream(_) => write!(f, "Stream"),
            ResponseSink::Callback(_) => write!(f, "Callback"),
        }
    }
}

// ---------------------------------------------------------------------------
// PendingRequest
// ---------------------------------------------------------------------------

/// A call waiting for its final reply.
#[derive(Debug)]
pub struct PendingRequest {
    pub id: MessageId,
    pub function_name: String,
    pub timestamp_sent: DateTime<Utc>,
    sink: ResponseSink,
}

/// A reply ready to hand to its consumer.
#[derive(Debug)]
pub struct Delivery {
    pub id: MessageId,
    pub function_name: String,
    reply: Reply,
    sink: ResponseSink,
}

impl Delivery {
    pub fn is_partial(&self) -> bool {
        self.reply.is_partial
    }

    /// Hand the reply to the consumer. Consumers that went away are ignored.
    pub fn deliver(self) {
        match self.sink {
            ResponseSink::Future(tx) => {
                if tx.send(self.reply.args).is_err() {
                    log::debug!("Caller of message {} dropped its future", self.id);
                }
            }
            ResponseSink::Stream(tx) => {
                if tx.send(self.reply).is_err() {
                    log::debug!("Caller of message {} dropped its stream", self.id);
                }
            }
            ResponseSink::Callback(cb) => {
                let mut guard = cb.lock();
                let callback: &mut ReplyCallback = &mut guard;
                callback(self.reply);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MessageDispatcher
// ---------------------------------------------------------------------------

/// Id allocation and the pending-request table.
#[derive(Debug, Default)]
pub struct MessageDispatcher {
    next_id: MessageId,
    pending: HashMap<MessageId, PendingRequest>,
}

impl MessageDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the next outgoing request. Ids never repeat for this dispatcher.
    pub fn create_request(&mut self, func: &str, args: Vec<Value>) -> MessageRequest {
        let id = self.next_id;
        self.next_id += 1;
        MessageRequest::new(id, func, args)
    }

    /// Remember who waits on `request`.
    pub fn track(&mut self, request: &MessageRequest, sink: ResponseSink) {
        log::debug!("Tracking message {} ({})", request.id, request.func);
        self.pending.insert(
            request.id,
            PendingRequest {
                id: request.id,
                function_name: request.func.clone(),
                timestamp_sent: DateTime::<Utc>::from_timestamp_millis(request.timestamp).unwrap_or_else(Utc::now),
                sink,
            },
        );
    }

    /// Match a reply to its pending request.
    ///
    /// Returns `None` when nobody should be notified: the id is unknown or
    /// already retired, or the reply is partial and the caller only wants
    /// the final one.
    pub fn resolve(&mut self, response: MessageResponse) -> Option<Delivery> {
        let is_partial = response.is_partial();
        let reply = Reply {
            args: response.args,
            is_partial,
        };

        if is_partial {
            let pending = self.pending.get(&response.id)?;
            log::debug!("Partial response for message {} ({})", pending.id, pending.function_name);
            let sink = pending.sink.partial_handle()?;
            return Some(Delivery {
                id: pending.id,
                function_name: pending.function_name.clone(),
                reply,
                sink,
            });
        }

        match self.pending.remove(&response.id) {
            Some(pending) => {
                log::debug!("Final response for message {} ({})", pending.id, pending.function_name);
                Some(Delivery {
                    id: pending.id,
                    function_name: pending.function_name,
                    reply,
                    sink: pending.sink,
                })
            }
            None => {
                log::debug!("Dropping response for unknown or completed message {}", response.id);
                None
            }
        }
    }

    /// Forget a request without notifying anyone. Future and stream callers
    /// observe cancellation when their sender drops.
    pub fn evict(&mut self, id: MessageId) -> Option<PendingRequest> {
        self.pending.remove(&id)
    }

    /// Drop every pending request.
    pub fn clear(&mut self) {
        if !self.pending.is_empty() {
            log::debug!("Discarding {} pending request(s)", self.pending.len());
        }
        self.pending.clear();
    }

    pub fn is_pending(&self, id: MessageId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The id the next request will receive.
    pub fn peek_next_id(&self) -> MessageId {
        self.next_id
    }
}

// ---------------------------------------------------------------------------
// Consumer handles
// ---------------------------------------------------------------------------

/// Resolves with the arguments of the final reply.
pub struct ResponseFuture {
    id: MessageId,
    func: String,
    rx: oneshot::Receiver<Vec<Value>>,
}

impl ResponseFuture {
    pub(crate) fn new(id: MessageId, func: impl Into<String>, rx: oneshot::Receiver<Vec<Value>>) -> Self {
        Self {
            id,
            func: func.into(),
            rx,
        }
    }

    /// The correlation id of the underlying call.
    pub fn id(&self) -> MessageId {
        self.id
    }
}

impl Future for ResponseFuture {
    type Output = Result<Vec<Value>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let func = self.func.clone();
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| EngineError::Cancelled { func }))
    }
}

impl fmt::Debug for ResponseFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFuture")
            .field("id", &self.id)
            .field("func", &self.func)
            .finish()
    }
}

/// Yields every reply for a call; ends after the final one.
pub struct ResponseStream {
    id: MessageId,
    rx: mpsc::UnboundedReceiver<Reply>,
    done: bool,
}

impl ResponseStream {
    pub(crate) fn new(id: MessageId, rx: mpsc::UnboundedReceiver<Reply>) -> Self {
        Self { id, rx, done: false }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }
}

impl Stream for ResponseStream {
    type Item = Reply;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.rx.poll_recv(cx) {
            Poll::Ready(Some(reply)) => {
                if !reply.is_partial {
                    self.done = true;
                }
                Poll::Ready(Some(reply))
            }
            Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}
