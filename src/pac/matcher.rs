//! In-process evaluation of the generated PAC logic.
//!
//! [`Router`] mirrors `FindProxyForURL` from the rendered script so that a
//! routing decision can be checked without a JavaScript engine.

use std::collections::HashSet;
use std::fmt;

use super::render::DIRECT;
use crate::rules::{Domain, Lists};

/// A set of domains matched by exact host or any parent domain.
#[derive(Debug, Clone, Default)]
pub struct DomainTable {
    domains: HashSet<String>,
}

impl DomainTable {
    /// Build a table from already normalized domains.
    pub fn new<'a>(domains: impl IntoIterator<Item = &'a Domain>) -> Self {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_str().to_string())
                .collect(),
        }
    }

    /// Check whether `host` or one of its parent domains is in the table.
    ///
    /// The host is lowercased, then checked as-is and after stripping each
    /// leftmost label in turn, so `example.com` matches `www.example.com`
    /// but not `notexample.com`.
    #[must_use]
    pub fn matches(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }

        let lowered = host.to_ascii_lowercase();
        let mut candidate = lowered.as_str();
        if self.domains.contains(candidate) {
            return true;
        }
        while let Some(pos) = candidate.find('.') {
            candidate = &candidate[pos + 1..];
            if self.domains.contains(candidate) {
                return true;
            }
        }
        false
    }

    /// Number of domains in the table.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.domains.len()
    }

    /// Returns `true` when the table holds no domain.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }
}

/// Routing decision for a host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Direct,
    Proxy,
}

impl Route {
    /// Lowercase name used in logs and the debug endpoint.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Proxy => "proxy",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-tier router with direct precedence, defaulting to direct.
#[derive(Debug, Clone, Default)]
pub struct Router {
    proxy: DomainTable,
    direct: DomainTable,
}

impl Router {
    /// Build a router from merged lists.
    #[must_use]
    pub fn new(lists: &Lists) -> Self {
        Self {
            proxy: DomainTable::new(&lists.proxy),
            direct: DomainTable::new(&lists.direct),
        }
    }

    /// Decide how `host` is routed.
    #[must_use]
    pub fn route(&self, host: &str) -> Route {
        if self.direct.matches(host) {
            Route::Direct
        } else if self.proxy.matches(host) {
            Route::Proxy
        } else {
            Route::Direct
        }
    }

    /// Same result `FindProxyForURL(url, host)` returns for a script
    /// rendered with `proxy` as its descriptor.
    #[must_use]
    pub fn find_proxy_for_host<'a>(&self, host: &str, proxy: &'a str) -> &'a str {
        match self.route(host) {
            Route::Proxy => proxy,
            Route::Direct => DIRECT,
        }
    }
}
