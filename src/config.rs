//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Runtime API version this library understands.
pub const LATEST_RUNTIME_API_VERSION: u32 = 4;

/// SDK version assumed for hosts that do not declare one.
pub const DEFAULT_SDK_VERSION_FOR_COMPAT_CHECK: &str = "2.0.1";

/// Deadline for the initialization handshake, in milliseconds.
pub const INITIALIZATION_TIMEOUT_MS: u64 = 60_000;

/// Configuration for an [`Engine`](crate::engine::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Overall deadline for the `initialize` exchange.
    #[serde(default = "default_initialization_timeout_ms")]
    pub initialization_timeout_ms: u64,
    /// Library version announced in the handshake.
    #[serde(default = "default_library_version")]
    pub library_version: String,
    /// Runtime API version announced in the handshake.
    #[serde(default = "default_runtime_api_version")]
    pub runtime_api_version: u32,
    /// Version assumed when the host omits its supported SDK version.
    #[serde(default = "default_sdk_version_for_compat_check")]
    pub default_sdk_version_for_compat_check: String,
    /// Extra origins to trust in addition to the built-in allow-list.
    #[serde(default)]
    pub valid_origins: Vec<String>,
}

fn default_initialization_timeout_ms() -> u64 { INITIALIZATION_TIMEOUT_MS }
fn default_library_version() -> String { env!("CARGO_PKG_VERSION").to_string() }
fn default_runtime_api_version() -> u32 { LATEST_RUNTIME_API_VERSION }
fn default_sdk_version_for_compat_check() -> String { DEFAULT_SDK_VERSION_FOR_COMPAT_CHECK.to_string() }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initialization_timeout_ms: default_initialization_timeout_ms(),
            library_version: default_library_version(),
            runtime_api_version: default_runtime_api_version(),
            default_sdk_version_for_compat_check: default_sdk_version_for_compat_check(),
            valid_origins: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Builder: set the handshake deadline.
    pub fn with_initialization_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.initialization_timeout_ms = timeout_ms;
        self
    }

    /// Builder: set the announced library version.
    pub fn with_library_version(mut self, version: impl Into<String>) -> Self {
        self.library_version = version.into();
        self
    }

    /// Builder: set the announced runtime API version.
    pub fn with_runtime_api_version(mut self, version: u32) -> Self {
        self.runtime_api_version = version;
        self
    }

    /// Builder: add trusted origins.
    pub fn with_valid_origins<I, S>(mut self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_origins.extend(origins.into_iter().map(Into::into));
        self
    }
}
