//! Built-in handlers installed before any user registration.
//!
//! Each one runs the page's hook when it has set one and otherwise falls back
//! to a default: theme and load events are always relayed to a held child
//! window, while unload and back-button events go to the child or, with no
//! child, back to the host.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Handler;
use crate::engine::Engine;

/// Call sent once the page has finished its unload work.
pub const READY_TO_UNLOAD_FUNC: &str = "readyToUnload";
/// Call asking the host to navigate back when the page did not.
pub const NAVIGATE_BACK_FUNC: &str = "navigateBack";

pub type ThemeChangeHook = Arc<dyn Fn(&str) + Send + Sync>;
pub type LoadHook = Arc<dyn Fn(&Value) + Send + Sync>;
/// Returns `true` when the page took over unloading and will call
/// [`ReadyToUnload::ready`] itself.
pub type BeforeUnloadHook = Arc<dyn Fn(ReadyToUnload) -> bool + Send + Sync>;
/// Returns `true` when the page handled the press.
pub type BackButtonHook = Arc<dyn Fn() -> bool + Send + Sync>;

/// Events that always have a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootstrapEvent {
    ThemeChange,
    Load,
    BeforeUnload,
    BackButtonPress,
}

impl BootstrapEvent {
    pub const ALL: [BootstrapEvent; 4] = [
        BootstrapEvent::ThemeChange,
        BootstrapEvent::Load,
        BootstrapEvent::BeforeUnload,
        BootstrapEvent::BackButtonPress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BootstrapEvent::ThemeChange => "themeChange",
            BootstrapEvent::Load => "load",
            BootstrapEvent::BeforeUnload => "beforeUnload",
            BootstrapEvent::BackButtonPress => "backButtonPress",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    pub(crate) fn builtin_handler(&self) -> Handler {
        match self {
            BootstrapEvent::ThemeChange => Arc::new(handle_theme_change),
            BootstrapEvent::Load => Arc::new(handle_load),
            BootstrapEvent::BeforeUnload => Arc::new(handle_before_unload),
            BootstrapEvent::BackButtonPress => Arc::new(handle_back_button_press),
        }
    }
}

/// Hooks set through the typed `on_*` registrations.
#[derive(Clone, Default)]
pub struct BootstrapHooks {
    pub theme_change: Option<ThemeChangeHook>,
    pub load: Option<LoadHook>,
    pub before_unload: Option<BeforeUnloadHook>,
    pub back_button_press: Option<BackButtonHook>,
}

impl fmt::Debug for BootstrapHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapHooks")
            .field("theme_change", &self.theme_change.is_some())
            .field("load", &self.load.is_some())
            .field("before_unload", &self.before_unload.is_some())
            .field("back_button_press", &self.back_button_press.is_some())
            .finish()
    }
}

/// Handed to a before-unload hook; tells the host the page may be unloaded.
#[derive(Clone)]
pub struct ReadyToUnload {
    engine: Engine,
}

impl ReadyToUnload {
    pub(crate) fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn ready(&self) {
        if let Err(e) = self.engine.notify(READY_TO_UNLOAD_FUNC, Vec::new()) {
            log::warn!("Failed to signal {}: {}", READY_TO_UNLOAD_FUNC, e);
        }
    }
}

impl fmt::Debug for ReadyToUnload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReadyToUnload")
    }
}

// ---------------------------------------------------------------------------
// Built-in handlers
// ---------------------------------------------------------------------------

fn relay_to_child(engine: &Engine, event: BootstrapEvent, args: &[Value]) -> bool {
    if !engine.has_child() {
        return false;
    }
    match engine.send_event_to_child(event.as_str(), args.to_vec()) {
        Ok(()) => true,
        Err(e) => {
            log::debug!("Could not relay {} to child: {}", event.as_str(), e);
            false
        }
    }
}

fn handle_theme_change(engine: &Engine, args: &[Value]) -> Option<Value> {
    if let Some(hook) = engine.bootstrap_hooks().theme_change {
        let theme = args.first().and_then(Value::as_str).unwrap_or_default();
        hook(theme);
    }
    relay_to_child(engine, BootstrapEvent::ThemeChange, args);
    None
}

fn handle_load(engine: &Engine, args: &[Value]) -> Option<Value> {
    if let Some(hook) = engine.bootstrap_hooks().load {
        hook(args.first().unwrap_or(&Value::Null));
    }
    relay_to_child(engine, BootstrapEvent::Load, args);
    None
}

fn handle_before_unload(engine: &Engine, args: &[Value]) -> Option<Value> {
    let ready = ReadyToUnload::new(engine.clone());
    let handled = match engine.bootstrap_hooks().before_unload {
        Some(hook) => hook(ready.clone()),
        None => false,
    };
    if !handled && !relay_to_child(engine, BootstrapEvent::BeforeUnload, args) {
        ready.ready();
    }
    None
}

fn handle_back_button_press(engine: &Engine, args: &[Value]) -> Option<Value> {
    let handled = match engine.bootstrap_hooks().back_button_press {
        Some(hook) => hook(),
        None => false,
    };
    if !handled && !relay_to_child(engine, BootstrapEvent::BackButtonPress, args) {
        if let Err(e) = engine.notify(NAVIGATE_BACK_FUNC, Vec::new()) {
            log::warn!("Failed to request back navigation: {}", e);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(BootstrapEvent::from_str_opt("beforeUnload"), Some(BootstrapEvent::BeforeUnload));
        assert_eq!(BootstrapEvent::BackButtonPress.as_str(), "backButtonPress");
        assert_eq!(BootstrapEvent::from_str_opt("focusEnter"), None);
    }

    #[test]
    fn test_hooks_debug_shows_presence() {
        let hooks = BootstrapHooks {
            back_button_press: Some(Arc::new(|| false)),
            ..BootstrapHooks::default()
        };
        let text = format!("{:?}", hooks);
        assert!(text.contains("back_button_press: true"));
        assert!(text.contains("theme_change: false"));
    }
}
