//! Built-in list of trusted host origins.
//!
//! Entries are `host` or `host:port`; a leading `*.` label accepts any
//! subdomain of the remaining domain but not the domain itself. Only
//! `https` origins are ever matched against this list.

/// Hosts allowed to talk to the page without any user configuration.
pub const BUILTIN_VALID_ORIGINS: &[&str] = &[
    "teams.microsoft.com",
    "teams.microsoft.us",
    "gov.teams.microsoft.us",
    "dod.teams.microsoft.us",
    "int.teams.microsoft.com",
    "teams.live.com",
    "devspaces.skype.com",
    "ssauth.skype.com",
    "local.teams.live.com",
    "local.teams.live.com:8080",
    "local.teams.office.com",
    "local.teams.office.com:8080",
    "outlook.office.com",
    "outlook-sdf.office.com",
    "outlook.office365.com",
    "outlook-sdf.office365.com",
    "outlook.live.com",
    "outlook-sdf.live.com",
    "*.teams.microsoft.com",
    "*.www.office.com",
    "www.office.com",
    "word.office.com",
    "excel.office.com",
    "powerpoint.office.com",
    "www.officeppe.com",
    "*.www.microsoft365.com",
    "www.microsoft365.com",
    "bing.com",
    "edgeservices.bing.com",
    "www.bing.com",
    "www.staging-bing-int.com",
    "teams.cloud.microsoft",
    "outlook.cloud.microsoft",
    "m365.cloud.microsoft",
];

/// Prefix every user-supplied origin must carry to be accepted.
pub const USER_ORIGIN_REQUIRED_PREFIX: &str = "https://";
