//! Origin validation for inbound messages.
//!
//! Every inbound `message` event passes through [`OriginValidator::is_allowed`]
//! before anything else looks at it. The validator unions the built-in host
//! allow-list with origins supplied by the page at `initialize` time.
//!
//! Matching rules, identical for both lists:
//!
//! - only `https` candidates are ever accepted;
//! - a plain entry must equal the candidate host exactly;
//! - a `*.domain` entry accepts one or more extra labels in front of
//!   `domain`, split on a real label boundary, and never `domain` itself;
//! - an entry with a port accepts only that port, an entry without one
//!   accepts only the default port.

pub mod allow_list;

use std::fmt;

use url::Url;

pub use allow_list::{BUILTIN_VALID_ORIGINS, USER_ORIGIN_REQUIRED_PREFIX};

const HTTPS_DEFAULT_PORT: u16 = 443;

// ---------------------------------------------------------------------------
// AllowedOrigin
// ---------------------------------------------------------------------------

/// A parsed allow-list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPattern {
    /// Whether the entry started with a `*.` wildcard label.
    pub wildcard: bool,
    /// Lowercased domain, without the wildcard label.
    pub domain: String,
    /// Required port, `None` meaning the default port.
    pub port: Option<u16>,
}

impl HostPattern {
    /// Parse a `host`, `*.host`, or `host:port` entry.
    pub fn parse(entry: &str) -> Option<Self> {
        let entry = entry.trim().trim_end_matches('/').to_ascii_lowercase();
        if entry.is_empty() || entry.contains('/') {
            return None;
        }

        let (host, port) = match entry.rsplit_once(':') {
            Some((host, port)) => {
                let port: u16 = port.parse().ok()?;
                (host.to_string(), if port == HTTPS_DEFAULT_PORT { None } else { Some(port) })
            }
            None => (entry, None),
        };

        let (wildcard, domain) = match host.strip_prefix("*.") {
            Some(rest) => (true, rest.to_string()),
            None => (false, host),
        };
        if domain.is_empty() || domain.contains('*') || domain.split('.').any(str::is_empty) {
            return None;
        }

        Some(Self { wildcard, domain, port })
    }

    /// Check a candidate host and port against this entry.
    pub fn matches(&self, host: &str, port: Option<u16>) -> bool {
        if self.port != port {
            return false;
        }
        if !self.wildcard {
            return host == self.domain;
        }
        match host.strip_suffix(self.domain.as_str()) {
            // `prefix` still carries the boundary dot, e.g. "sub." for
            // "sub.teams.microsoft.com"; "evilteams." style prefixes lack it.
            Some(prefix) => match prefix.strip_suffix('.') {
                Some(labels) => !labels.is_empty() && labels.split('.').all(|l| !l.is_empty()),
                None => false,
            },
            None => false,
        }
    }
}

impl fmt::Display for HostPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.wildcard {
            write!(f, "*.")?;
        }
        write!(f, "{}", self.domain)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

/// One entry of the combined allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigin {
    /// Entry from the built-in host list.
    Builtin(HostPattern),
    /// Entry supplied by the page, kept with its original spelling.
    User { literal: String, pattern: HostPattern },
}

impl AllowedOrigin {
    /// The host pattern regardless of where the entry came from.
    pub fn pattern(&self) -> &HostPattern {
        match self {
            AllowedOrigin::Builtin(pattern) => pattern,
            AllowedOrigin::User { pattern, .. } => pattern,
        }
    }
}

// ---------------------------------------------------------------------------
// OriginValidator
// ---------------------------------------------------------------------------

/// Gate for inbound message origins.
#[derive(Debug, Clone)]
pub struct OriginValidator {
    builtin: Vec<AllowedOrigin>,
    user: Vec<AllowedOrigin>,
}

impl Default for OriginValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginValidator {
    /// Create a validator seeded with the built-in allow-list.
    pub fn new() -> Self {
        let builtin = BUILTIN_VALID_ORIGINS
            .iter()
            .filter_map(|entry| HostPattern::parse(entry))
            .map(AllowedOrigin::Builtin)
            .collect();
        Self {
            builtin,
            user: Vec::new(),
        }
    }

    /// Create a validator with no built-in entries.
    pub fn empty() -> Self {
        Self {
            builtin: Vec::new(),
            user: Vec::new(),
        }
    }

    /// Merge page-supplied origins into the list.
    ///
    /// Entries not starting with `https://` or not parseable are ignored;
    /// duplicates are dropped. Returns how many entries were added.
    pub fn add_user_origins<I, S>(&mut self, origins: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        for origin in origins {
            let origin = origin.as_ref();
            let Some(rest) = origin.strip_prefix(USER_ORIGIN_REQUIRED_PREFIX) else {
                log::debug!("Ignoring valid origin '{}': only https origins are accepted", origin);
                continue;
            };
            if self.user.iter().any(|o| matches!(o, AllowedOrigin::User { literal, .. } if literal == origin)) {
                continue;
            }
            match HostPattern::parse(rest) {
                Some(pattern) => {
                    self.user.push(AllowedOrigin::User {
                        literal: origin.to_string(),
                        pattern,
                    });
                    added += 1;
                }
                None => log::debug!("Ignoring unparseable valid origin '{}'", origin),
            }
        }
        added
    }

    /// Forget every page-supplied origin.
    pub fn clear_user_origins(&mut self) {
        self.user.clear();
    }

    /// Page-supplied origins in the order they were added.
    pub fn user_origins(&self) -> Vec<&str> {
        self.user
            .iter()
            .filter_map(|o| match o {
                AllowedOrigin::User { literal, .. } => Some(literal.as_str()),
                AllowedOrigin::Builtin(_) => None,
            })
            .collect()
    }

    /// Decide whether a message from `origin` may be processed.
    pub fn is_allowed(&self, origin: &str) -> bool {
        let Ok(url) = Url::parse(origin) else {
            log::debug!("Origin '{}' rejected: not a valid URL", origin);
            return false;
        };
        if url.scheme() != "https" {
            log::debug!("Origin '{}' rejected: protocol '{}' is not https", origin, url.scheme());
            return false;
        }
        // An origin never carries credentials, a path, a query or a fragment.
        if !url.username().is_empty()
            || url.password().is_some()
            || !matches!(url.path(), "" | "/")
            || url.query().is_some()
            || url.fragment().is_some()
        {
            log::debug!("Origin '{}' rejected: not a bare origin", origin);
            return false;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let port = url.port();

        let allowed = self
            .builtin
            .iter()
            .chain(self.user.iter())
            .any(|entry| entry.pattern().matches(host, port));
        if !allowed {
            log::debug!(
                "Origin '{}' rejected: not in the built-in list or the {} page-supplied origins",
                origin,
                self.user.len()
            );
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_exact_and_wildcard() {
        let v = OriginValidator::new();
        assert!(v.is_allowed("https://teams.microsoft.com"));
        assert!(v.is_allowed("https://subdomain.teams.microsoft.com"));
        assert!(v.is_allowed("https://a.b.teams.microsoft.com"));
        assert!(v.is_allowed("https://outlook.office.com"));
    }

    #[test]
    fn test_rejects_non_https() {
        let v = OriginValidator::new();
        assert!(!v.is_allowed("http://teams.microsoft.com"));
        assert!(!v.is_allowed("ftp://teams.microsoft.com"));
        assert!(!v.is_allowed("not a url"));
    }

    #[test]
    fn test_rejects_suffix_and_prefix_spoofing() {
        let v = OriginValidator::new();
        assert!(!v.is_allowed("https://teams.microsoft.com.evil.com"));
        assert!(!v.is_allowed("https://evilteams.microsoft.com"));
        assert!(!v.is_allowed("https://myteams.microsoft.com.evil.com"));
        assert!(!v.is_allowed("https://evil.com/teams.microsoft.com"));
    }

    #[test]
    fn test_wildcard_excludes_bare_domain() {
        let pattern = HostPattern::parse("*.example.com").unwrap();
        assert!(pattern.matches("a.example.com", None));
        assert!(pattern.matches("a.b.example.com", None));
        assert!(!pattern.matches("example.com", None));
        assert!(!pattern.matches(".example.com", None));
        assert!(!pattern.matches("aexample.com", None));
    }

    #[test]
    fn test_builtin_ports() {
        let v = OriginValidator::new();
        assert!(v.is_allowed("https://local.teams.live.com:8080"));
        assert!(v.is_allowed("https://local.teams.live.com"));
        assert!(!v.is_allowed("https://local.teams.live.com:9090"));
        assert!(!v.is_allowed("https://teams.microsoft.com:8080"));
        // The default port is normalized away by URL parsing.
        assert!(v.is_allowed("https://teams.microsoft.com:443"));
    }

    #[test]
    fn test_user_origin_requires_exact_port() {
        let mut v = OriginValidator::new();
        assert!(!v.is_allowed("https://testorigin.com:8080"));

        v.add_user_origins(["https://testorigin.com"]);
        assert!(v.is_allowed("https://testorigin.com"));
        assert!(!v.is_allowed("https://testorigin.com:8080"));

        let mut v = OriginValidator::new();
        v.add_user_origins(["https://testorigin.com:8080"]);
        assert!(v.is_allowed("https://testorigin.com:8080"));
        assert!(!v.is_allowed("https://testorigin.com"));
    }

    #[test]
    fn test_user_wildcard() {
        let mut v = OriginValidator::empty();
        v.add_user_origins(["https://*.contoso.com"]);
        assert!(v.is_allowed("https://app.contoso.com"));
        assert!(v.is_allowed("https://deep.app.contoso.com"));
        assert!(!v.is_allowed("https://contoso.com"));
        assert!(!v.is_allowed("https://app.contoso.com.evil.com"));
    }

    #[test]
    fn test_user_origins_filtered_and_deduplicated() {
        let mut v = OriginValidator::empty();
        let added = v.add_user_origins([
            "https://a.example.com",
            "http://b.example.com",
            "c.example.com",
            "https://a.example.com",
        ]);
        assert_eq!(added, 1);
        assert_eq!(v.user_origins(), vec!["https://a.example.com"]);
        assert!(!v.is_allowed("https://b.example.com"));

        v.clear_user_origins();
        assert!(!v.is_allowed("https://a.example.com"));
    }

    #[test]
    fn test_rejects_non_origin_forms() {
        let mut v = OriginValidator::empty();
        v.add_user_origins(["https://a.example.com"]);
        assert!(v.is_allowed("https://a.example.com/"));
        assert!(!v.is_allowed("https://a.example.com/path"));
        assert!(!v.is_allowed("https://user@a.example.com"));
        assert!(!v.is_allowed("https://a.example.com?x=1"));
    }

    #[test]
    fn test_host_pattern_display() {
        assert_eq!(HostPattern::parse("*.Example.com:8080").unwrap().to_string(), "*.example.com:8080");
        assert!(HostPattern::parse("example.com:notaport").is_none());
        assert!(HostPattern::parse("a..b").is_none());
    }
}
