//! # hostbridge
//!
//! Request/response communication for a page embedded in a foreign host
//! frame, using only `postMessage`-style delivery as the transport.
//!
//! The engine performs the `initialize` handshake, negotiates which
//! capabilities the host supports, correlates replies (including partial,
//! streaming replies) with the calls that caused them, and gates every
//! inbound message on an origin allow-list. Capability code builds on
//! [`Engine::send`], [`Engine::register_handler`], [`Engine::is_supported`]
//! and [`Engine::ensure_initialized`].
//!
//! ```no_run
//! use hostbridge::{Engine, EngineConfig, WindowEnvironment};
//! use hostbridge::testing::RecordingFrame;
//!
//! # async fn demo() -> hostbridge::Result<()> {
//! let parent = RecordingFrame::new();
//! let engine = Engine::new(EngineConfig::default(), WindowEnvironment::framed(parent));
//! let ready = engine.initialize(&["https://tasks.example.com"]);
//! let context = engine.send("getContext", vec![])?;
//! ready.await?;
//! let _reply = context.await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod errors;
pub mod frame;
pub mod handlers;
pub mod negotiation;
pub mod origin;
pub mod protocol;
pub mod router;
pub mod runtime;
pub mod testing;
pub mod version;

pub use config::EngineConfig;
pub use dispatcher::{ResponseFuture, ResponseStream};
pub use engine::Engine;
pub use errors::{EngineError, ErrorCode, Result, SdkError};
pub use frame::{Frame, FrameId, InboundEvent, NativeBridge, WindowEnvironment};
pub use handlers::{Handler, ReadyToUnload};
pub use negotiation::HandshakeState;
pub use origin::OriginValidator;
pub use protocol::Reply;
pub use router::FrameRole;
pub use runtime::{FrameContext, HostClientType, Runtime, SupportsMatrix};
pub use version::compare_versions;
