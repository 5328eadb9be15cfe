//! Domain normalization.
//!
//! Every hostname that reaches a PAC table goes through [`normalize`]. The
//! parser and the merger both call it, so there is exactly one definition of
//! what a routable domain looks like.

use std::fmt;
use std::net::IpAddr;

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// A validated, lowercase domain name.
///
/// A `Domain` has no scheme, port, path or wildcard, consists of at least two
/// labels of `[a-z0-9-]` that neither start nor end with `-`, and is never an
/// IP literal. The last label is never all digits. The only way to obtain one is through [`normalize`] (or
/// [`str::parse`]), so holding a `Domain` means the invariant holds.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Domain(String);

impl Domain {
    /// Returns the domain as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the domain and returns the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Domain {
    type Err = InvalidDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).ok_or_else(|| InvalidDomain(s.to_string()))
    }
}

/// Returned when a token cannot be turned into a [`Domain`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid domain: {0:?}")]
pub struct InvalidDomain(pub String);

/// Canonicalize a hostname-like token.
///
/// The token is trimmed and lowercased, a single leading and trailing dot are
/// removed and anything from the first `:` on (a port) is dropped. The result
/// is returned only if it satisfies the [`Domain`] grammar.
///
/// # Example
///
/// ```
/// use pacserve::rules::normalize;
///
/// assert_eq!(normalize(" Example.COM:8080 ").unwrap().as_str(), "example.com");
/// assert!(normalize("*.example.com").is_none());
/// assert!(normalize("192.168.0.1").is_none());
/// ```
#[must_use]
pub fn normalize(token: &str) -> Option<Domain> {
    let lowered = token.trim().to_ascii_lowercase();
    let mut s = lowered.as_str();
    s = s.strip_prefix('.').unwrap_or(s);
    s = s.strip_suffix('.').unwrap_or(s);

    if let Some(idx) = s.find(':') {
        s = &s[..idx];
    }

    if s.is_empty() || !s.contains('.') {
        return None;
    }
    if s.contains(['*', '_']) {
        return None;
    }
    if s.parse::<IpAddr>().is_ok() {
        return None;
    }
    if !s.split('.').all(is_valid_label) {
        return None;
    }
    // Shorthand IPv4 forms like `127.1` are addresses, not names.
    if s.rsplit('.').next().is_some_and(|tld| tld.bytes().all(|b| b.is_ascii_digit())) {
        return None;
    }

    Some(Domain(s.to_string()))
}

fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(s: &str) -> Option<String> {
        normalize(s).map(Domain::into_string)
    }

    #[test]
    fn should_accept_plain_domain() {
        assert_eq!(norm("example.com"), Some("example.com".into()));
        assert_eq!(norm("a.b.example.co.uk"), Some("a.b.example.co.uk".into()));
        assert_eq!(norm("xn--fiqs8s.cn"), Some("xn--fiqs8s.cn".into()));
    }

    #[test]
    fn should_lowercase_and_trim() {
        assert_eq!(norm("  WWW.Example.Com\t"), Some("www.example.com".into()));
    }

    #[test]
    fn should_strip_single_leading_and_trailing_dot() {
        assert_eq!(norm(".example.com"), Some("example.com".into()));
        assert_eq!(norm("example.com."), Some("example.com".into()));
        assert_eq!(norm("..example.com"), None);
    }

    #[test]
    fn should_strip_port() {
        assert_eq!(norm("example.com:8080"), Some("example.com".into()));
    }

    #[test]
    fn should_reject_wildcards_and_underscores() {
        assert_eq!(norm("*.example.com"), None);
        assert_eq!(norm("exam_ple.com"), None);
    }

    #[test]
    fn should_reject_ip_literals() {
        assert_eq!(norm("192.168.0.1"), None);
        assert_eq!(norm("127.0.0.1"), None);
        assert_eq!(norm("::1"), None);
        assert_eq!(norm("[2001:db8::1]"), None);
        assert_eq!(norm("127.1"), None);
        assert_eq!(norm("10.0.1"), None);
    }

    #[test]
    fn should_allow_digits_outside_last_label() {
        assert_eq!(norm("163.com"), Some("163.com".into()));
        assert_eq!(norm("1.2.3.example.com"), Some("1.2.3.example.com".into()));
    }

    #[test]
    fn should_reject_degenerate_input() {
        assert_eq!(norm(""), None);
        assert_eq!(norm("."), None);
        assert_eq!(norm("localhost"), None);
        assert_eq!(norm("a..b.com"), None);
    }

    #[test]
    fn should_reject_bad_labels() {
        assert_eq!(norm("-example.com"), None);
        assert_eq!(norm("example-.com"), None);
        assert_eq!(norm("exa mple.com"), None);
        assert_eq!(norm("exämple.com"), None);
        let long = format!("{}.com", "a".repeat(64));
        assert_eq!(norm(&long), None);
        let max = format!("{}.com", "a".repeat(63));
        assert_eq!(norm(&max), Some(max.clone()));
    }

    #[test]
    fn should_parse_via_from_str() {
        let domain: Domain = "GitHub.com".parse().unwrap();
        assert_eq!(domain.as_str(), "github.com");
        assert!("nodot".parse::<Domain>().is_err());
    }
}
