//! Supports matrix synthesis for legacy hosts.
//!
//! Hosts that predate runtime negotiation only report the highest SDK
//! version they understand. Their capabilities are the legacy Teams baseline
//! plus every version-gated addition at or below that version, filtered by
//! client platform.

use super::{HostClientType, Runtime, SupportsMatrix};
use crate::version::is_at_least;

/// Capabilities unlocked by a host SDK version on given platforms.
#[derive(Debug, Clone, Copy)]
pub struct VersionCapabilities {
    pub version: &'static str,
    /// Capability path enabled in the supports matrix.
    pub capability: &'static [&'static str],
    pub host_client_types: &'static [HostClientType],
}

const V1_HOST_CLIENT_TYPES: &[HostClientType] = &[
    HostClientType::Desktop,
    HostClientType::Web,
    HostClientType::Android,
    HostClientType::Ios,
    HostClientType::Rigel,
    HostClientType::SurfaceHub,
    HostClientType::TeamsRoomsWindows,
    HostClientType::TeamsRoomsAndroid,
    HostClientType::TeamsPhones,
    HostClientType::TeamsDisplays,
];

/// Version-gated additions, in ascending version order.
pub const VERSION_CAPABILITIES: &[VersionCapabilities] = &[
    VersionCapabilities {
        version: "1.9.0",
        capability: &["location"],
        host_client_types: V1_HOST_CLIENT_TYPES,
    },
    VersionCapabilities {
        version: "2.0.0",
        capability: &["people"],
        host_client_types: V1_HOST_CLIENT_TYPES,
    },
    VersionCapabilities {
        version: "2.0.1",
        capability: &["teams", "fullTrust", "joinedTeams"],
        host_client_types: &[
            HostClientType::Android,
            HostClientType::Desktop,
            HostClientType::Ios,
            HostClientType::TeamsRoomsAndroid,
            HostClientType::TeamsPhones,
            HostClientType::TeamsDisplays,
            HostClientType::Web,
        ],
    },
    VersionCapabilities {
        version: "2.0.1",
        capability: &["webStorage"],
        host_client_types: &[HostClientType::Desktop],
    },
    VersionCapabilities {
        version: "2.0.5",
        capability: &["webStorage"],
        host_client_types: &[HostClientType::Android, HostClientType::Desktop, HostClientType::Ios],
    },
];

/// Capabilities every legacy Teams host supports.
pub const LEGACY_TEAMS_CAPABILITIES: &[&[&str]] = &[
    &["appInstallDialog"],
    &["appEntity"],
    &["call"],
    &["chat"],
    &["conversations"],
    &["dialog", "bot"],
    &["dialog", "update"],
    &["logs"],
    &["meetingRoom"],
    &["menus"],
    &["monetization"],
    &["notifications"],
    &["pages", "appButton"],
    &["pages", "tabs"],
    &["pages", "config"],
    &["pages", "backStack"],
    &["pages", "fullTrust"],
    &["remoteCamera"],
    &["sharing"],
    &["stageView"],
    &["teams", "fullTrust"],
    &["teamsCore"],
    &["video"],
];

/// The supports matrix of a legacy Teams host before version gating.
pub fn legacy_teams_supports() -> SupportsMatrix {
    let mut supports = SupportsMatrix::new();
    for path in LEGACY_TEAMS_CAPABILITIES {
        supports.enable(path);
    }
    supports
}

/// Build the runtime of a legacy host from its highest supported version.
pub fn generate_back_compat_runtime(highest_supported_version: &str, host_client_type: Option<HostClientType>) -> Runtime {
    let mut supports = legacy_teams_supports();

    for entry in VERSION_CAPABILITIES {
        if !is_at_least(highest_supported_version, entry.version) {
            continue;
        }
        let Some(client) = host_client_type else {
            continue;
        };
        if !entry.host_client_types.contains(&client) {
            continue;
        }
        supports.enable(entry.capability);
    }

    Runtime {
        api_version: 1,
        is_legacy_teams: Some(true),
        supports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_version_gets_baseline_only() {
        let rt = generate_back_compat_runtime("1.6.0", Some(HostClientType::Desktop));
        assert_eq!(rt.api_version, 1);
        assert_eq!(rt.is_legacy_teams, Some(true));
        assert!(rt.is_supported(&["pages", "backStack"]));
        assert!(!rt.is_supported(&["location"]));
        assert!(!rt.is_supported(&["people"]));
    }

    #[test]
    fn test_version_gates_accumulate() {
        let rt = generate_back_compat_runtime("2.0.0", Some(HostClientType::Web));
        assert!(rt.is_supported(&["location"]));
        assert!(rt.is_supported(&["people"]));
        assert!(!rt.is_supported(&["teams", "fullTrust", "joinedTeams"]));

        let rt = generate_back_compat_runtime("2.0.1", Some(HostClientType::Web));
        assert!(rt.is_supported(&["teams", "fullTrust", "joinedTeams"]));
        assert!(!rt.is_supported(&["webStorage"]));
    }

    #[test]
    fn test_platform_filter() {
        let rt = generate_back_compat_runtime("2.0.1", Some(HostClientType::Desktop));
        assert!(rt.is_supported(&["webStorage"]));

        let rt = generate_back_compat_runtime("2.0.5", Some(HostClientType::Android));
        assert!(rt.is_supported(&["webStorage"]));

        let rt = generate_back_compat_runtime("9.0.0", Some(HostClientType::SurfaceHub));
        assert!(rt.is_supported(&["people"]));
        assert!(!rt.is_supported(&["webStorage"]));
        assert!(!rt.is_supported(&["teams", "fullTrust", "joinedTeams"]));
    }

    #[test]
    fn test_baseline_is_nested() {
        let supports = legacy_teams_supports();
        assert!(supports.supports(&["dialog", "bot"]));
        assert!(supports.supports(&["dialog", "update"]));
        assert!(supports.supports(&["teams", "fullTrust"]));
        assert!(!supports.supports(&["teams", "fullTrust", "joinedTeams"]));
        assert_eq!(supports.capabilities().len(), 18);
    }

    #[test]
    fn test_unknown_client_gets_baseline() {
        let rt = generate_back_compat_runtime("2.0.5", None);
        assert!(rt.is_supported(&["chat"]));
        assert!(!rt.is_supported(&["location"]));
    }
}
