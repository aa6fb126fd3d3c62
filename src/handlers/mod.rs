//! Named handlers for host-initiated events.
//!
//! Events such as `themeChange` or `backButtonPress` arrive without a
//! correlation id and are routed here by name. Each name maps to at most one
//! handler; registering again replaces the previous one.

pub mod bootstrap;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::engine::Engine;

pub use bootstrap::{BootstrapEvent, BootstrapHooks, ReadyToUnload};

/// A named event handler.
///
/// Receives the engine it was dispatched by and the event arguments. A
/// returned value is used as the answer when the event was a request
/// relayed from a child window.
pub type Handler = Arc<dyn Fn(&Engine, &[Value]) -> Option<Value> + Send + Sync>;

/// Name to handler table plus the hook slots read by the bootstrap handlers.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
    hooks: BootstrapHooks,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the bootstrap handlers installed.
    pub fn with_bootstrap() -> Self {
        let mut registry = Self::new();
        registry.install_bootstrap();
        registry
    }

    /// Install the built-in handlers for every bootstrap event that has no
    /// handler yet.
    pub fn install_bootstrap(&mut self) {
        for event in BootstrapEvent::ALL {
            self.handlers
                .entry(event.as_str().to_string())
                .or_insert_with(|| event.builtin_handler());
        }
    }

    /// Register `handler` under `name`, returning the handler it replaced.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) -> Option<Handler> {
        let name = name.into();
        log::debug!("Registering handler for '{}'", name);
        self.handlers.insert(name, handler)
    }

    pub fn unregister(&mut self, name: &str) -> Option<Handler> {
        log::debug!("Removing handler for '{}'", name);
        self.handlers.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn hooks(&self) -> &BootstrapHooks {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut BootstrapHooks {
        &mut self.hooks
    }

    /// Drop every handler and hook.
    pub fn clear(&mut self) {
        self.handlers.clear();
        self.hooks = BootstrapHooks::default();
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .field("hooks", &self.hooks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn constant(value: Value) -> Handler {
        Arc::new(move |_: &Engine, _: &[Value]| Some(value.clone()))
    }

    #[test]
    fn test_bootstrap_names_installed() {
        let registry = HandlerRegistry::with_bootstrap();
        assert_eq!(
            registry.names(),
            vec!["backButtonPress", "beforeUnload", "load", "themeChange"]
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = HandlerRegistry::new();
        assert!(registry.register("focusEnter", constant(json!(1))).is_none());
        assert!(registry.register("focusEnter", constant(json!(2))).is_some());
        assert_eq!(registry.names(), vec!["focusEnter"]);
        assert!(registry.unregister("focusEnter").is_some());
        assert!(!registry.contains("focusEnter"));
        assert!(registry.unregister("focusEnter").is_none());
    }

    #[test]
    fn test_bootstrap_does_not_override_user_handler() {
        let mut registry = HandlerRegistry::new();
        let mine = constant(json!("mine"));
        registry.register("themeChange", mine.clone());
        registry.install_bootstrap();
        let installed = registry.get("themeChange").unwrap();
        assert!(Arc::ptr_eq(&installed, &mine));
        assert!(registry.contains("load"));
    }

    #[test]
    fn test_clear_drops_hooks() {
        let mut registry = HandlerRegistry::with_bootstrap();
        registry.hooks_mut().back_button_press = Some(Arc::new(|| true));
        registry.clear();
        assert!(registry.names().is_empty());
        assert!(registry.hooks().back_button_press.is_none());
    }
}
