//! gfwlist rule parser.
//!
//! Parses the AdBlock-Plus-derived subset used by gfwlist and similar lists
//! to extract the hostnames that should go through the proxy and the ones
//! that must bypass it. This is a domain-level reading of the rules: anything
//! needing a URL matcher is dropped rather than approximated.

use std::collections::BTreeSet;

use url::{Host, Url};

use super::ParseError;
use super::domain::{Domain, normalize};

/// Classification of a single rule-list line.
///
/// # Recognized Syntax
///
/// - `! comment` - [`RuleLine::Comment`]
/// - `[AutoProxy 0.2.9]` - [`RuleLine::SectionHeader`]
/// - `/regex/` - [`RuleLine::Regex`], never matched
/// - `example.com##.banner` - [`RuleLine::Unrecognized`] (element hiding)
/// - `@@||example.com` - [`RuleLine::Exception`], routed direct
/// - `||example.com`, `|http://example.com/path`, `.example.com` -
///   [`RuleLine::Blocking`], routed through the proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleLine<'a> {
    /// Blank line.
    Empty,
    /// Line starting with `!`.
    Comment,
    /// Line starting with `[`.
    SectionHeader,
    /// A `/.../` regular expression rule.
    Regex,
    /// A rule shape this parser does not handle.
    Unrecognized,
    /// Rule body following an `@@` marker.
    Exception(&'a str),
    /// Rule body of a plain blocking rule.
    Blocking(&'a str),
}

impl<'a> RuleLine<'a> {
    /// Classify a raw line. Surrounding whitespace is ignored.
    #[must_use]
    pub fn classify(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if line.starts_with('!') {
            return Self::Comment;
        }
        if line.starts_with('[') {
            return Self::SectionHeader;
        }

        let (body, is_exception) = match line.strip_prefix("@@") {
            Some(rest) => (rest.trim(), true),
            None => (line, false),
        };

        if body.is_empty() || is_cosmetic(body) {
            return Self::Unrecognized;
        }
        if body.len() >= 2 && body.starts_with('/') && body.ends_with('/') {
            return Self::Regex;
        }

        if is_exception {
            Self::Exception(body)
        } else {
            Self::Blocking(body)
        }
    }
}

fn is_cosmetic(body: &str) -> bool {
    body.contains("##") || body.contains("#@#") || body.contains("#?#")
}

/// Domains extracted from one rule list, split by routing tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    /// Domains from blocking rules, to be proxied.
    pub proxy: BTreeSet<Domain>,
    /// Domains from exception rules, to be accessed directly.
    pub direct: BTreeSet<Domain>,
}

impl RuleSet {
    /// Returns `true` when neither tier holds a domain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxy.is_empty() && self.direct.is_empty()
    }

    /// Total number of domains across both tiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.proxy.len() + self.direct.len()
    }
}

/// Extract domains from rule-list text, dropping every line that cannot be
/// reduced to a domain.
///
/// This never fails; an input without usable rules yields an empty
/// [`RuleSet`]. Use [`parse`] when an empty result must be treated as an
/// error.
#[must_use]
pub fn extract(text: &str) -> RuleSet {
    let mut rules = RuleSet::default();
    let mut skipped = 0usize;

    for line in text.lines() {
        let (body, direct) = match RuleLine::classify(line) {
            RuleLine::Blocking(body) => (body, false),
            RuleLine::Exception(body) => (body, true),
            RuleLine::Empty | RuleLine::Comment | RuleLine::SectionHeader => continue,
            RuleLine::Regex | RuleLine::Unrecognized => {
                skipped += 1;
                continue;
            }
        };

        let Some(domain) = extract_host(body) else {
            skipped += 1;
            continue;
        };

        if direct {
            rules.direct.insert(domain);
        } else {
            rules.proxy.insert(domain);
        }
    }

    tracing::debug!(
        proxy = rules.proxy.len(),
        direct = rules.direct.len(),
        skipped,
        "extracted rule list"
    );

    rules
}

/// Parse rule-list text into proxy and direct domain sets.
///
/// # Errors
///
/// Returns [`ParseError::NoDomains`] if no line produced a valid domain, which
/// signals a corrupt or truncated list rather than an intentionally empty one.
///
/// # Example
///
/// ```
/// use pacserve::rules::parse;
///
/// let rules = parse("@@||direct.example.com\n||proxy.example.com\n! comment\n").unwrap();
/// assert_eq!(rules.proxy.iter().next().unwrap().as_str(), "proxy.example.com");
/// assert_eq!(rules.direct.iter().next().unwrap().as_str(), "direct.example.com");
/// ```
pub fn parse(text: &str) -> Result<RuleSet, ParseError> {
    let rules = extract(text);
    if rules.is_empty() {
        return Err(ParseError::NoDomains);
    }
    Ok(rules)
}

/// Reduce a rule body to the domain it targets.
///
/// Handles bodies like:
/// - `||example.com`
/// - `|https://www.example.com/path?q=1`
/// - `example.com/path`
/// - `.example.com`
/// - `||example.com^$third-party`
fn extract_host(body: &str) -> Option<Domain> {
    let body = body.trim_start_matches('|');

    // `^` is the ABP separator and `$` starts the option list; neither is
    // part of a host.
    let body = body.find(['^', '$']).map_or(body, |end| &body[..end]);

    if body.starts_with("http://") || body.starts_with("https://") {
        let url = Url::parse(body).ok()?;
        return normalize(url.host_str()?);
    }

    let host = body.find(['/', '?']).map_or(body, |end| &body[..end]);

    if host.contains(['*', '%']) {
        return None;
    }
    let host = host.strip_prefix('.').unwrap_or(host);

    // Internationalized names go through the same IDNA mapping as URL
    // rules so that both spellings yield the same punycode domain.
    if !host.is_ascii() {
        return match Host::parse(host).ok()? {
            Host::Domain(ascii) => normalize(&ascii),
            Host::Ipv4(_) | Host::Ipv6(_) => None,
        };
    }

    normalize(host)
}
