//! Dotted version comparison used for backward-compatibility gating.

use std::cmp::Ordering;

/// Compare two dotted version strings.
///
/// The shorter version is padded with zeros, so `"1.2"` equals `"1.2.0"`.
/// Every part must be one or more ASCII digits; anything else makes the
/// comparison undefined and `None` is returned.
///
/// ```
/// use std::cmp::Ordering;
/// use hostbridge::version::compare_versions;
///
/// assert_eq!(compare_versions("1.2", "1.2.0"), Some(Ordering::Equal));
/// assert_eq!(compare_versions("2.0", "1.3.2"), Some(Ordering::Greater));
/// assert_eq!(compare_versions("1.2a", "1.2b"), None);
/// ```
pub fn compare_versions(v1: &str, v2: &str) -> Option<Ordering> {
    let left = parse_parts(v1)?;
    let right = parse_parts(v2)?;

    let len = left.len().max(right.len());
    for i in 0..len {
        let a = left.get(i).copied().unwrap_or(0);
        let b = right.get(i).copied().unwrap_or(0);
        match a.cmp(&b) {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(Ordering::Equal)
}

/// Whether `version` is a well-formed dotted version.
pub fn is_valid_version(version: &str) -> bool {
    parse_parts(version).is_some()
}

/// `true` when `version >= required`; `false` when either is malformed.
pub fn is_at_least(version: &str, required: &str) -> bool {
    matches!(
        compare_versions(version, required),
        Some(Ordering::Greater | Ordering::Equal)
    )
}

fn parse_parts(version: &str) -> Option<Vec<u64>> {
    version
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            // Overlong parts compare as saturated rather than failing.
            Some(part.parse::<u64>().unwrap_or(u64::MAX))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding() {
        assert_eq!(compare_versions("1.2", "1.2.0"), Some(Ordering::Equal));
        assert_eq!(compare_versions("1.2.0.0", "1.2"), Some(Ordering::Equal));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(compare_versions("1.2", "1.3"), Some(Ordering::Less));
        assert_eq!(compare_versions("2.0", "1.3.2"), Some(Ordering::Greater));
        assert_eq!(compare_versions("1.10", "1.9"), Some(Ordering::Greater));
        assert_eq!(compare_versions("01.2", "1.2"), Some(Ordering::Equal));
    }

    #[test]
    fn test_malformed() {
        assert_eq!(compare_versions("1.2a", "1.2b"), None);
        assert_eq!(compare_versions("", "1.0"), None);
        assert_eq!(compare_versions("1..2", "1.2"), None);
        assert_eq!(compare_versions("1.2", "-1"), None);
        assert!(!is_valid_version("{\"apiVersion\":1}"));
    }

    #[test]
    fn test_is_at_least() {
        assert!(is_at_least("2.0.1", "2.0.1"));
        assert!(is_at_least("2.1", "2.0.5"));
        assert!(!is_at_least("1.9.0", "2.0.0"));
        assert!(!is_at_least("garbage", "1.0"));
    }
}
