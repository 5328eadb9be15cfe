//! Merging of domain collections from several sources.

use std::collections::BTreeSet;

use super::domain::{Domain, normalize};

/// Final, render-ready domain tables.
///
/// Both vectors are sorted ascending and free of duplicates, and no domain
/// appears in both. Build one with [`merge_tiers`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lists {
    /// Domains routed through the proxy.
    pub proxy: Vec<Domain>,
    /// Domains routed directly. Takes precedence over `proxy`.
    pub direct: Vec<Domain>,
}

impl Lists {
    /// Returns `true` when both tables are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.proxy.is_empty() && self.direct.is_empty()
    }
}

/// Flatten any number of domain collections into one sorted, deduplicated
/// sequence.
///
/// Every entry is re-validated through [`normalize`]: entries that fail are
/// dropped and the rest are case-folded before deduplication. This makes it
/// safe to feed both already-parsed [`Domain`]s and raw user input.
///
/// # Example
///
/// ```
/// use pacserve::rules::merge;
///
/// let merged = merge([
///     vec!["Example.com", "a.example.com"],
///     vec!["example.com", "github.com", "127.0.0.1"],
/// ]);
/// let merged: Vec<&str> = merged.iter().map(|d| d.as_str()).collect();
/// assert_eq!(merged, vec!["a.example.com", "example.com", "github.com"]);
/// ```
pub fn merge<I, C, S>(sets: I) -> Vec<Domain>
where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    collect(sets).into_iter().collect()
}

/// Merge each routing tier separately and enforce direct precedence.
///
/// Any domain present in the direct tier is removed from the proxy tier, so
/// an exception rule always wins over a blocking rule for the same domain,
/// regardless of which source contributed either.
pub fn merge_tiers<P, PC, PS, D, DC, DS>(proxy_sets: P, direct_sets: D) -> Lists
where
    P: IntoIterator<Item = PC>,
    PC: IntoIterator<Item = PS>,
    PS: AsRef<str>,
    D: IntoIterator<Item = DC>,
    DC: IntoIterator<Item = DS>,
    DS: AsRef<str>,
{
    let direct = collect(direct_sets);
    let proxy: Vec<Domain> = collect(proxy_sets)
        .into_iter()
        .filter(|domain| !direct.contains(domain))
        .collect();

    Lists {
        proxy,
        direct: direct.into_iter().collect(),
    }
}

fn collect<I, C, S>(sets: I) -> BTreeSet<Domain>
where
    I: IntoIterator<Item = C>,
    C: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    sets.into_iter()
        .flatten()
        .filter_map(|entry| normalize(entry.as_ref()))
        .collect()
}
