//! Reply-shape helpers used by capability code.
//!
//! Hosts answer most calls in one of three shapes: a single value,
//! `[status, reason]`, or `[error, result]`. These helpers unwrap them. Like
//! [`Engine::send`] they post the call before returning, so ordering against
//! other calls is fixed at the call site rather than at the first poll.

use std::future::Future;

use serde_json::Value;

use super::Engine;
use crate::dispatcher::ResponseFuture;
use crate::errors::{EngineError, Result, SdkError};

impl Engine {
    /// Call `func` and resolve with the first reply argument (`null` when
    /// the reply is empty).
    pub fn send_and_unwrap(&self, func: &str, args: Vec<Value>) -> impl Future<Output = Result<Value>> + Send + 'static {
        first_argument(self.send(func, args))
    }

    /// Call `func` whose reply is `[status, reason]`.
    ///
    /// A false status becomes [`EngineError::HostReportedFailure`] carrying
    /// the host's reason.
    pub fn send_and_handle_status_and_reason(
        &self,
        func: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<()>> + Send + 'static {
        with_status_and_reason(func.to_string(), self.send(func, args))
    }

    /// Call `func` whose reply is `[error, result]`.
    ///
    /// A non-null error becomes [`EngineError::HostError`] when it carries a
    /// known error code, and [`EngineError::HostReportedFailure`] otherwise.
    pub fn send_and_handle_sdk_error(
        &self,
        func: &str,
        args: Vec<Value>,
    ) -> impl Future<Output = Result<Value>> + Send + 'static {
        with_sdk_error(self.send(func, args))
    }
}

async fn first_argument(call: Result<ResponseFuture>) -> Result<Value> {
    let mut reply = call?.await?;
    Ok(if reply.is_empty() { Value::Null } else { reply.swap_remove(0) })
}

async fn with_status_and_reason(func: String, call: Result<ResponseFuture>) -> Result<()> {
    let reply = call?.await?;
    status_and_reason(&func, &reply)
}

async fn with_sdk_error(call: Result<ResponseFuture>) -> Result<Value> {
    error_and_result(call?.await?)
}

fn status_and_reason(func: &str, reply: &[Value]) -> Result<()> {
    let status = reply.first().and_then(Value::as_bool).unwrap_or(false);
    if status {
        return Ok(());
    }
    let reason = reply
        .get(1)
        .and_then(Value::as_str)
        .filter(|r| !r.is_empty())
        .map(String::from)
        .unwrap_or_else(|| format!("Call '{}' failed", func));
    Err(EngineError::HostReportedFailure { reason })
}

fn error_and_result(mut reply: Vec<Value>) -> Result<Value> {
    let result = if reply.len() > 1 { reply.swap_remove(1) } else { Value::Null };
    match reply.into_iter().next() {
        None | Some(Value::Null) => Ok(result),
        Some(error) => match serde_json::from_value::<SdkError>(error.clone()) {
            Ok(sdk_error) => Err(EngineError::HostError(sdk_error)),
            Err(_) => Err(EngineError::HostReportedFailure {
                reason: error.to_string(),
            }),
        },
    }
}
