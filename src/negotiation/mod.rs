//! Handshake state and capability negotiation.
//!
//! The host answers `initialize` with
//! `[frameContext, hostClientType, runtimeConfig, clientSupportedSdkVersion]`.
//! Hosts of different ages fill the last two positions differently, so each
//! argument is first classified into a [`RuntimeArgument`] and then
//! [`negotiate`] walks a fixed fallback order:
//!
//! 1. a runtime object (or its JSON text) in the `runtimeConfig` position;
//! 2. a bare version in the `runtimeConfig` position, with the runtime in the
//!    version position;
//! 3. no runtime at all: synthesize one from the declared version.
//!
//! Text that parses as JSON but is not a runtime object is fatal.

use std::fmt;

use serde_json::Value;

use crate::errors::{EngineError, Result};
use crate::runtime::{generate_back_compat_runtime, HostClientType, Runtime};
use crate::version::is_valid_version;

// ---------------------------------------------------------------------------
// HandshakeState
// ---------------------------------------------------------------------------

/// Lifecycle of the `initialize` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandshakeState {
    Uninitialized,
    HandshakeSent,
    Negotiated,
    /// The deadline expired or the reply was unusable.
    Failed,
}

impl HandshakeState {
    /// Whether `initialize` has been invoked and not undone.
    pub fn initialize_called(&self) -> bool {
        !matches!(self, HandshakeState::Uninitialized)
    }
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandshakeState::Uninitialized => "uninitialized",
            HandshakeState::HandshakeSent => "handshake-sent",
            HandshakeState::Negotiated => "negotiated",
            HandshakeState::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Handshake reply
// ---------------------------------------------------------------------------

/// Positional arguments of the host's `initialize` reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandshakeResponse {
    pub frame_context: Option<String>,
    pub host_client_type: Option<String>,
    pub runtime_config: Option<Value>,
    pub client_supported_sdk_version: Option<Value>,
}

impl HandshakeResponse {
    pub fn from_args(args: &[Value]) -> Self {
        let string_at = |i: usize| args.get(i).and_then(Value::as_str).map(String::from);
        let value_at = |i: usize| args.get(i).filter(|v| !v.is_null()).cloned();
        Self {
            frame_context: string_at(0),
            host_client_type: string_at(1),
            runtime_config: value_at(2),
            client_supported_sdk_version: value_at(3),
        }
    }
}

/// What a single runtime-bearing argument turned out to be.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeArgument {
    /// A runtime object with an `apiVersion`.
    Runtime(Runtime),
    /// A dotted version string.
    VersionString(String),
    /// Text that is neither JSON nor a version.
    Unparseable,
    /// Nothing was sent.
    Absent,
    /// Well-formed JSON that is not a runtime object.
    Invalid(String),
}

impl RuntimeArgument {
    pub fn classify(arg: Option<&Value>) -> Self {
        match arg {
            None | Some(Value::Null) => RuntimeArgument::Absent,
            Some(value @ Value::Object(_)) => Self::from_json(value),
            Some(Value::String(text)) => {
                let text = text.trim();
                if text.is_empty() {
                    return RuntimeArgument::Absent;
                }
                if is_valid_version(text) {
                    return RuntimeArgument::VersionString(text.to_string());
                }
                match serde_json::from_str::<Value>(text) {
                    Ok(Value::Null) => RuntimeArgument::Invalid("runtime config parsed to null".to_string()),
                    Ok(value) => Self::from_json(&value),
                    Err(_) => RuntimeArgument::Unparseable,
                }
            }
            Some(other) => RuntimeArgument::Invalid(format!("unexpected runtime config value {}", other)),
        }
    }

    fn from_json(value: &Value) -> Self {
        match Runtime::from_value(value) {
            Some(runtime) => RuntimeArgument::Runtime(runtime),
            None => RuntimeArgument::Invalid("received runtime config is invalid".to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Negotiation
// ---------------------------------------------------------------------------

/// Which fallback produced the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSource {
    /// Runtime given in the `runtimeConfig` position.
    Declared,
    /// Version in the `runtimeConfig` position, runtime in the version position.
    Swapped,
    /// Synthesized from the declared legacy version.
    Synthesized,
}

/// Result of a successful negotiation.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiatedHost {
    pub frame_context: Option<String>,
    pub host_client_type: Option<String>,
    pub client_supported_sdk_version: String,
    pub runtime: Runtime,
    pub source: RuntimeSource,
}

/// Interpret the host's `initialize` reply.
pub fn negotiate(response: &HandshakeResponse, default_sdk_version: &str) -> Result<NegotiatedHost> {
    let version_position = RuntimeArgument::classify(response.client_supported_sdk_version.as_ref());
    let mut sdk_version = match &version_position {
        RuntimeArgument::VersionString(v) => v.clone(),
        _ => default_sdk_version.to_string(),
    };
    let client_type = response.host_client_type.as_deref().and_then(HostClientType::from_str_opt);

    let (runtime, source) = match RuntimeArgument::classify(response.runtime_config.as_ref()) {
        RuntimeArgument::Runtime(runtime) => (runtime, RuntimeSource::Declared),
        RuntimeArgument::Invalid(reason) => {
            return Err(EngineError::MalformedHandshakePayload { reason });
        }
        first => {
            if let RuntimeArgument::VersionString(v) = first {
                log::debug!("Runtime config '{}' is an SDK version", v);
                sdk_version = v;
            }
            match version_position {
                RuntimeArgument::Runtime(runtime) => (runtime, RuntimeSource::Swapped),
                RuntimeArgument::Invalid(reason) => {
                    return Err(EngineError::MalformedHandshakePayload { reason });
                }
                _ => {
                    log::debug!("Synthesizing runtime for legacy host version {}", sdk_version);
                    (generate_back_compat_runtime(&sdk_version, client_type), RuntimeSource::Synthesized)
                }
            }
        }
    };

    Ok(NegotiatedHost {
        frame_context: response.frame_context.clone(),
        host_client_type: response.host_client_type.clone(),
        client_supported_sdk_version: sdk_version,
        runtime,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const DEFAULT: &str = "2.0.1";

    fn reply(args: Value) -> HandshakeResponse {
        HandshakeResponse::from_args(args.as_array().unwrap())
    }

    #[test]
    fn test_structured_runtime_string() {
        let runtime = json!({"apiVersion": 2, "supports": {"chat": {}}}).to_string();
        let host = negotiate(&reply(json!(["content", "web", runtime, "2.0.5"])), DEFAULT).unwrap();
        assert_eq!(host.source, RuntimeSource::Declared);
        assert_eq!(host.frame_context.as_deref(), Some("content"));
        assert_eq!(host.client_supported_sdk_version, "2.0.5");
        assert!(host.runtime.is_supported(&["chat"]));
    }

    #[test]
    fn test_structured_runtime_object() {
        let host = negotiate(
            &reply(json!(["task", "desktop", {"apiVersion": 3, "supports": {"mail": {}}}])),
            DEFAULT,
        )
        .unwrap();
        assert_eq!(host.source, RuntimeSource::Declared);
        assert_eq!(host.client_supported_sdk_version, DEFAULT);
        assert!(host.runtime.is_supported(&["mail"]));
    }

    #[test]
    fn test_swapped_positions() {
        let runtime = json!({"apiVersion": 2, "supports": {"calendar": {}}}).to_string();
        let host = negotiate(&reply(json!(["content", "web", "1.9.0", runtime])), DEFAULT).unwrap();
        assert_eq!(host.source, RuntimeSource::Swapped);
        assert_eq!(host.client_supported_sdk_version, "1.9.0");
        assert!(host.runtime.is_supported(&["calendar"]));
    }

    #[test]
    fn test_version_only_synthesizes() {
        let host = negotiate(&reply(json!(["content", "desktop", "2.0.1"])), DEFAULT).unwrap();
        assert_eq!(host.source, RuntimeSource::Synthesized);
        assert_eq!(host.client_supported_sdk_version, "2.0.1");
        assert_eq!(host.runtime.is_legacy_teams, Some(true));
        assert!(host.runtime.is_supported(&["webStorage"]));
    }

    #[test]
    fn test_absent_payload_uses_declared_or_default_version() {
        let host = negotiate(&reply(json!(["content"])), DEFAULT).unwrap();
        assert_eq!(host.source, RuntimeSource::Synthesized);
        assert_eq!(host.client_supported_sdk_version, DEFAULT);
        assert!(host.host_client_type.is_none());

        let host = negotiate(&reply(json!(["content", "web", null, "1.9.0"])), DEFAULT).unwrap();
        assert_eq!(host.client_supported_sdk_version, "1.9.0");
        assert!(host.runtime.is_supported(&["location"]));
        assert!(!host.runtime.is_supported(&["people"]));
    }

    #[test]
    fn test_unparseable_text_falls_back() {
        let host = negotiate(&reply(json!(["content", "web", "not json {", "2.0.0"])), DEFAULT).unwrap();
        assert_eq!(host.source, RuntimeSource::Synthesized);
        assert!(host.runtime.is_supported(&["people"]));
    }

    #[test]
    fn test_malformed_payloads_are_fatal() {
        for args in [
            json!(["content", "web", "{\"supports\": {}}"]),
            json!(["content", "web", "null"]),
            json!(["content", "web", "[1, 2]"]),
            json!(["content", "web", {"apiVersion": "x"}]),
            json!(["content", "web", "1.9.0", "null"]),
            json!(["content", "web", "1.9.0", "{\"no\": \"api\"}"]),
        ] {
            let err = negotiate(&reply(args.clone()), DEFAULT).unwrap_err();
            assert!(
                matches!(err, EngineError::MalformedHandshakePayload { .. }),
                "expected malformed for {}",
                args
            );
        }
    }

    #[test]
    fn test_classify_argument() {
        assert_eq!(RuntimeArgument::classify(None), RuntimeArgument::Absent);
        assert_eq!(RuntimeArgument::classify(Some(&json!(""))), RuntimeArgument::Absent);
        assert_eq!(
            RuntimeArgument::classify(Some(&json!("2.0"))),
            RuntimeArgument::VersionString("2.0".to_string())
        );
        assert_eq!(RuntimeArgument::classify(Some(&json!("abc"))), RuntimeArgument::Unparseable);
        assert!(matches!(RuntimeArgument::classify(Some(&json!(true))), RuntimeArgument::Invalid(_)));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(HandshakeState::HandshakeSent.to_string(), "handshake-sent");
        assert!(!HandshakeState::Uninitialized.initialize_called());
        assert!(HandshakeState::Failed.initialize_called());
    }
}
