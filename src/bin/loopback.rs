//! loopback: drive an engine against an in-process simulated host.
//!
//! The simulated host answers the handshake with a structured runtime,
//! replies to a few calls (one of them with partial progress replies) and
//! refuses everything else. Set `RUST_LOG=debug` to see every message.
//!
//! ```bash
//! cargo run --bin loopback
//! ```

use std::iter;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::StreamExt;
use hostbridge::{Engine, EngineConfig, Frame, FrameId, InboundEvent, WindowEnvironment};
use serde_json::{json, Value};
use tokio::sync::mpsc;

const HOST_ORIGIN: &str = "https://teams.microsoft.com";

/// The host window as seen from the page.
struct SimulatedHost {
    id: FrameId,
    inbox: mpsc::UnboundedSender<Value>,
}

impl Frame for SimulatedHost {
    fn id(&self) -> FrameId {
        self.id
    }

    fn post_message(&self, message: Value, target_origin: &str) {
        log::debug!("host <- {} (target origin {})", message, target_origin);
        if self.inbox.send(message).is_err() {
            log::warn!("Simulated host has stopped");
        }
    }
}

fn replies_for(id: u64, func: &str) -> Vec<Value> {
    match func {
        "initialize" => {
            let runtime = json!({
                "apiVersion": 4,
                "supports": {"pages": {"backStack": {}}, "chat": {}}
            });
            vec![json!({"id": id, "args": ["content", "web", runtime.to_string(), "2.0.5"]})]
        }
        "getContext" => vec![json!({"id": id, "args": [{"frameContext": "content", "locale": "en-us"}]})],
        "download" => (1..=3)
            .map(|step| json!({"id": id, "args": [step * 25], "isPartialResponse": true}))
            .chain(iter::once(json!({"id": id, "args": [100]})))
            .collect(),
        "registerHandler" => Vec::new(),
        other => vec![json!({"id": id, "args": [false, format!("'{}' is not supported here", other)]})],
    }
}

async fn run_host(engine: Engine, host: Arc<SimulatedHost>, mut inbox: mpsc::UnboundedReceiver<Value>) {
    while let Some(message) = inbox.recv().await {
        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            continue;
        };
        let func = message.get("func").and_then(Value::as_str).unwrap_or_default();
        for reply in replies_for(id, func) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            log::debug!("host -> {}", reply);
            engine.handle_message_event(InboundEvent::new(host.clone(), HOST_ORIGIN, reply));
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
    let host = Arc::new(SimulatedHost {
        id: FrameId::next(),
        inbox: inbox_tx,
    });
    let config = EngineConfig::new().with_initialization_timeout_ms(5_000);
    let engine = Engine::new(config, WindowEnvironment::framed(host.clone()));
    tokio::spawn(run_host(engine.clone(), host, inbox_rx));

    // Issued before the handshake completes; posted right after it.
    let ready = engine.initialize(&[]);
    let context = engine.send_and_unwrap("getContext", vec![]);

    ready.await.context("handshake with the simulated host failed")?;
    log::info!(
        "Negotiated: context={:?} sdk={} backStack={}",
        engine.frame_context(),
        engine.client_supported_sdk_version(),
        engine.is_supported(&["pages", "backStack"])
    );
    log::info!("getContext -> {}", context.await?);

    let mut download = engine.send_streaming("download", vec![json!("report.pdf")])?;
    while let Some(reply) = download.next().await {
        let kind = if reply.is_partial { "progress" } else { "done" };
        log::info!("download {} {:?}", kind, reply.args);
    }

    match engine.send_and_handle_status_and_reason("teleport", vec![]).await {
        Ok(()) => log::info!("teleport succeeded"),
        Err(e) => log::info!("teleport refused: {}", e),
    }

    engine.uninitialize();
    Ok(())
}
