//! Negotiated host runtime: frame contexts, client types and the supports
//! matrix every capability consults through `is_supported`.

pub mod back_compat;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use back_compat::{
    generate_back_compat_runtime, legacy_teams_supports, VersionCapabilities, LEGACY_TEAMS_CAPABILITIES,
    VERSION_CAPABILITIES,
};

// ---------------------------------------------------------------------------
// FrameContext
// ---------------------------------------------------------------------------

/// Where in the host the page is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FrameContext {
    Settings,
    Content,
    Authentication,
    Remove,
    Task,
    SidePanel,
    Stage,
    MeetingStage,
}

impl FrameContext {
    /// Wire value of the context.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameContext::Settings => "settings",
            FrameContext::Content => "content",
            FrameContext::Authentication => "authentication",
            FrameContext::Remove => "remove",
            FrameContext::Task => "task",
            FrameContext::SidePanel => "sidePanel",
            FrameContext::Stage => "stage",
            FrameContext::MeetingStage => "meetingStage",
        }
    }

    /// Parse a wire value.
    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "settings" => Some(FrameContext::Settings),
            "content" => Some(FrameContext::Content),
            "authentication" => Some(FrameContext::Authentication),
            "remove" => Some(FrameContext::Remove),
            "task" => Some(FrameContext::Task),
            "sidePanel" => Some(FrameContext::SidePanel),
            "stage" => Some(FrameContext::Stage),
            "meetingStage" => Some(FrameContext::MeetingStage),
            _ => None,
        }
    }
}

impl fmt::Display for FrameContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HostClientType
// ---------------------------------------------------------------------------

/// Client platform the host runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HostClientType {
    Desktop,
    Web,
    Android,
    Ios,
    Ipados,
    /// Superseded by `TeamsRoomsWindows`; still reported by old hosts.
    Rigel,
    SurfaceHub,
    TeamsRoomsWindows,
    TeamsRoomsAndroid,
    TeamsPhones,
    TeamsDisplays,
}

impl HostClientType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostClientType::Desktop => "desktop",
            HostClientType::Web => "web",
            HostClientType::Android => "android",
            HostClientType::Ios => "ios",
            HostClientType::Ipados => "ipados",
            HostClientType::Rigel => "rigel",
            HostClientType::SurfaceHub => "surfaceHub",
            HostClientType::TeamsRoomsWindows => "teamsRoomsWindows",
            HostClientType::TeamsRoomsAndroid => "teamsRoomsAndroid",
            HostClientType::TeamsPhones => "teamsPhones",
            HostClientType::TeamsDisplays => "teamsDisplays",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        [
            HostClientType::Desktop,
            HostClientType::Web,
            HostClientType::Android,
            HostClientType::Ios,
            HostClientType::Ipados,
            HostClientType::Rigel,
            HostClientType::SurfaceHub,
            HostClientType::TeamsRoomsWindows,
            HostClientType::TeamsRoomsAndroid,
            HostClientType::TeamsPhones,
            HostClientType::TeamsDisplays,
        ]
        .into_iter()
        .find(|t| t.as_str() == s)
    }

    /// Phones and tablets.
    pub fn is_mobile(&self) -> bool {
        matches!(self, HostClientType::Android | HostClientType::Ios | HostClientType::Ipados)
    }
}

impl fmt::Display for HostClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// SupportsMatrix
// ---------------------------------------------------------------------------

/// Nested map of capability name to sub-capabilities the host honours.
///
/// A capability is supported when its key maps to an object; `null` or a
/// missing key means unsupported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupportsMatrix(Map<String, Value>);

impl SupportsMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Check a capability path such as `["pages", "backStack"]`.
    pub fn supports(&self, path: &[&str]) -> bool {
        let Some((first, rest)) = path.split_first() else {
            return false;
        };
        let mut current = match self.0.get(*first) {
            Some(value @ Value::Object(_)) => value,
            _ => return false,
        };
        for key in rest {
            current = match current.get(*key) {
                Some(value @ Value::Object(_)) => value,
                _ => return false,
            };
        }
        true
    }

    /// Mark the capability at `path` as supported, creating the parent
    /// entries it needs. Non-object values on the way are replaced.
    pub fn enable(&mut self, path: &[&str]) {
        let mut current = &mut self.0;
        for key in path {
            let entry = current
                .entry(key.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            current = match entry {
                Value::Object(map) => map,
                _ => return,
            };
        }
    }

    /// Supported top-level capability names.
    pub fn capabilities(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(_, v)| v.is_object())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Runtime
// ---------------------------------------------------------------------------

/// Host runtime description published after a successful handshake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Runtime {
    pub api_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_legacy_teams: Option<bool>,
    #[serde(default)]
    pub supports: SupportsMatrix,
}

impl Runtime {
    /// Parse a runtime object, requiring a numeric `apiVersion`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        obj.get("apiVersion")?.as_u64()?;
        serde_json::from_value(value.clone()).ok()
    }

    pub fn is_supported(&self, path: &[&str]) -> bool {
        self.supports.supports(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_supports_paths() {
        let runtime = Runtime::from_value(&json!({
            "apiVersion": 2,
            "supports": {"pages": {"backStack": {}, "tabs": null}, "chat": {}, "mail": null}
        }))
        .unwrap();
        assert!(runtime.is_supported(&["pages"]));
        assert!(runtime.is_supported(&["pages", "backStack"]));
        assert!(!runtime.is_supported(&["pages", "tabs"]));
        assert!(runtime.is_supported(&["chat"]));
        assert!(!runtime.is_supported(&["mail"]));
        assert!(!runtime.is_supported(&["calendar"]));
        assert!(!runtime.is_supported(&[]));
        assert_eq!(runtime.supports.capabilities().len(), 2);
    }

    #[test]
    fn test_enable_creates_and_replaces() {
        let mut supports = SupportsMatrix::from_map(
            json!({"teams": {"fullTrust": {}}, "mail": null})
                .as_object()
                .unwrap()
                .clone(),
        );
        supports.enable(&["teams", "fullTrust", "joinedTeams"]);
        supports.enable(&["mail", "inbox"]);
        supports.enable(&[]);
        assert!(supports.supports(&["teams", "fullTrust", "joinedTeams"]));
        assert!(supports.supports(&["mail", "inbox"]));
        let mut names = supports.capabilities();
        names.sort_unstable();
        assert_eq!(names, vec!["mail", "teams"]);
    }

    #[test]
    fn test_runtime_requires_api_version() {
        assert!(Runtime::from_value(&json!({"supports": {}})).is_none());
        assert!(Runtime::from_value(&json!({"apiVersion": "1"})).is_none());
        assert!(Runtime::from_value(&json!(null)).is_none());
        let rt = Runtime::from_value(&json!({"apiVersion": 1})).unwrap();
        assert!(rt.supports.as_map().is_empty());
    }

    #[test]
    fn test_context_round_trip_names() {
        assert_eq!(FrameContext::from_str_opt("sidePanel"), Some(FrameContext::SidePanel));
        assert_eq!(FrameContext::MeetingStage.to_string(), "meetingStage");
        assert_eq!(FrameContext::from_str_opt("nope"), None);
        assert_eq!(HostClientType::from_str_opt("teamsRoomsAndroid"), Some(HostClientType::TeamsRoomsAndroid));
        assert!(HostClientType::Ipados.is_mobile());
        assert!(!HostClientType::Web.is_mobile());
    }
}
