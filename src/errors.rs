//! Error types for the communication engine.
//!
//! Routing errors (`NotInitialized`, `WrongContext`) are raised synchronously
//! by the engine. Untrusted origins never become errors at all: those events
//! are dropped before they reach any of the code paths below.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used whenever a call is made before `initialize`.
pub const ERROR_LIBRARY_NOT_INITIALIZED: &str = "The library has not yet been initialized";

// ---------------------------------------------------------------------------
// Host error codes
// ---------------------------------------------------------------------------

/// Numeric error codes reported by the host in failure replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
#[repr(i32)]
pub enum ErrorCode {
    /// The API is not supported on the current platform.
    NotSupportedOnPlatform = 100,
    /// The requested file could not be found.
    FileNotFound = 404,
    /// Internal error encountered while performing the required operation.
    InternalError = 500,
    /// The API is not supported in the current frame context.
    NotSupportedInCurrentContext = 501,
    /// Permissions were declined by the user.
    PermissionDenied = 1000,
    /// A network issue occurred.
    NetworkError = 2000,
    /// The underlying hardware does not support the capability.
    NoHwSupport = 3000,
    /// One or more arguments are invalid.
    InvalidArguments = 4000,
    /// The user is not authorized for this operation.
    UnauthorizedUserOperation = 5000,
    /// The platform ran out of resources.
    InsufficientResources = 6000,
    /// The platform throttled the request.
    Throttle = 7000,
    /// The user aborted the operation.
    UserAbort = 8000,
    /// The operation timed out on the host.
    OperationTimedOut = 8001,
    /// The host is too old for this API.
    OldPlatform = 9000,
    /// A payload exceeded the allowed size.
    SizeExceeded = 10000,
}

impl ErrorCode {
    /// Get the numeric wire value.
    pub fn code(&self) -> i32 {
        *self as i32
    }

    /// Get a default description for this code.
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::NotSupportedOnPlatform => "Not supported on platform",
            Self::FileNotFound => "File not found",
            Self::InternalError => "Internal error",
            Self::NotSupportedInCurrentContext => "Not supported in current context",
            Self::PermissionDenied => "Permission denied",
            Self::NetworkError => "Network error",
            Self::NoHwSupport => "No hardware support",
            Self::InvalidArguments => "Invalid arguments",
            Self::UnauthorizedUserOperation => "Unauthorized user operation",
            Self::InsufficientResources => "Insufficient resources",
            Self::Throttle => "Throttled",
            Self::UserAbort => "User aborted",
            Self::OperationTimedOut => "Operation timed out",
            Self::OldPlatform => "Old platform",
            Self::SizeExceeded => "Size exceeded",
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = String;

    fn try_from(value: i32) -> std::result::Result<Self, Self::Error> {
        Ok(match value {
            100 => Self::NotSupportedOnPlatform,
            404 => Self::FileNotFound,
            500 => Self::InternalError,
            501 => Self::NotSupportedInCurrentContext,
            1000 => Self::PermissionDenied,
            2000 => Self::NetworkError,
            3000 => Self::NoHwSupport,
            4000 => Self::InvalidArguments,
            5000 => Self::UnauthorizedUserOperation,
            6000 => Self::InsufficientResources,
            7000 => Self::Throttle,
            8000 => Self::UserAbort,
            8001 => Self::OperationTimedOut,
            9000 => Self::OldPlatform,
            10000 => Self::SizeExceeded,
            other => return Err(format!("unknown error code {}", other)),
        })
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Structured failure payload returned by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SdkError {
    /// Error code.
    pub error_code: ErrorCode,
    /// Optional developer-facing description. Not localized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SdkError {
    /// Create a new error with no message.
    pub fn new(error_code: ErrorCode) -> Self {
        Self {
            error_code,
            message: None,
        }
    }

    /// Builder: attach a message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for SdkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{} ({}): {}", self.error_code.default_message(), self.error_code.code(), message),
            None => write!(f, "{} ({})", self.error_code.default_message(), self.error_code.code()),
        }
    }
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Errors produced by the communication engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A call was attempted before `initialize` was ever invoked, or before
    /// negotiation completed for calls that require it.
    #[error("{}", ERROR_LIBRARY_NOT_INITIALIZED)]
    NotInitialized,

    /// The current frame context is not one the call is allowed in.
    #[error("This call is only allowed in following contexts: {allowed}. Current context: \"{actual}\".")]
    WrongContext {
        /// JSON list of allowed contexts.
        allowed: String,
        /// The current frame context.
        actual: String,
    },

    /// The handshake did not complete within the deadline.
    #[error("SDK initialization timed out after {timeout_ms} ms.")]
    HandshakeTimeout { timeout_ms: u64 },

    /// The host replied with a failure status and a reason.
    #[error("{reason}")]
    HostReportedFailure { reason: String },

    /// The host replied with a structured error.
    #[error("Host error: {0}")]
    HostError(SdkError),

    /// The handshake payload matched no recognized shape.
    #[error("Malformed handshake payload: {reason}")]
    MalformedHandshakePayload { reason: String },

    /// Neither a parent frame nor a native bridge is available.
    #[error("Initialization Failed. No Parent window found.")]
    NoParentWindow,

    /// A message was addressed to a child window while none is held.
    #[error("No child window is open")]
    NoChildWindow,

    /// The pending call was discarded before a final reply arrived.
    #[error("Call '{func}' was cancelled before the host replied")]
    Cancelled { func: String },

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;
