//! Fingerprint-keyed snapshot cache.
//!
//! Holds at most one built value together with the fingerprint of the
//! inputs it was built from. A lookup with the same fingerprint returns the
//! stored snapshot; any other fingerprint triggers a rebuild whose result
//! replaces the snapshot wholesale.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

/// Identity of a set of inputs.
///
/// Built from one identity string per source, joined with `|`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Wrap a ready-made identity string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Join per-source identities into one fingerprint.
    ///
    /// ```
    /// use pacserve::cache::Fingerprint;
    ///
    /// let fp = Fingerprint::from_parts(["f:gfwlist.txt:1:10", "f:custom.txt:2:20"]);
    /// assert_eq!(fp.as_str(), "f:gfwlist.txt:1:10|f:custom.txt:2:20");
    /// ```
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for (idx, part) in parts.into_iter().enumerate() {
            if idx > 0 {
                joined.push('|');
            }
            joined.push_str(part.as_ref());
        }
        Self(joined)
    }

    /// The fingerprint as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct Entry<T> {
    fingerprint: Fingerprint,
    value: Arc<T>,
}

/// Cache of a single value keyed by the fingerprint of its inputs.
///
/// Readers take a shared lock only long enough to clone an `Arc`; the build
/// closure runs without any lock held and the result is installed under a
/// short exclusive lock. Concurrent misses may each build; the last one to
/// install wins. Snapshots are immutable, so a reader holding one is never
/// affected by a later install.
pub struct FreshnessCache<T> {
    current: RwLock<Option<Arc<Entry<T>>>>,
    hits: AtomicU64,
    rebuilds: AtomicU64,
}

impl<T> FreshnessCache<T> {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
            hits: AtomicU64::new(0),
            rebuilds: AtomicU64::new(0),
        }
    }

    /// Return the cached value if it was built from `fingerprint`.
    #[must_use]
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        let current = self.current.read().clone()?;
        (current.fingerprint == *fingerprint).then(|| Arc::clone(&current.value))
    }

    /// Return the cached value for `fingerprint`, building it on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `build`. A failed build leaves the
    /// previously cached value in place.
    pub fn get_or_build<F, E>(&self, fingerprint: &Fingerprint, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get(fingerprint) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        let value = Arc::new(build()?);
        self.rebuilds.fetch_add(1, Ordering::Relaxed);

        let entry = Arc::new(Entry {
            fingerprint: fingerprint.clone(),
            value: Arc::clone(&value),
        });
        *self.current.write() = Some(entry);

        Ok(value)
    }

    /// Fingerprint of the currently cached value, if any.
    #[must_use]
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.current
            .read()
            .as_ref()
            .map(|entry| entry.fingerprint.clone())
    }

    /// Number of lookups served from the cache.
    #[must_use]
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Number of successful builds installed.
    #[must_use]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }
}

impl<T> fmt::Debug for FreshnessCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreshnessCache")
            .field("fingerprint", &self.fingerprint())
            .field("hits", &self.hits())
            .field("rebuilds", &self.rebuilds())
            .finish()
    }
}

impl<T> Default for FreshnessCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn build_ok(body: &str) -> impl FnOnce() -> Result<Vec<u8>, Infallible> + '_ {
        move || Ok(body.as_bytes().to_vec())
    }

    #[test]
    fn should_build_on_first_lookup() {
        let cache = FreshnessCache::new();
        let fp = Fingerprint::new("a");

        assert!(cache.get(&fp).is_none());
        let value = cache.get_or_build(&fp, build_ok("one")).unwrap();

        assert_eq!(value.as_slice(), b"one");
        assert_eq!(cache.rebuilds(), 1);
        assert_eq!(cache.hits(), 0);
        assert_eq!(cache.fingerprint(), Some(fp));
    }

    #[test]
    fn should_not_rebuild_for_same_fingerprint() {
        let cache = FreshnessCache::new();
        let fp = Fingerprint::new("a");

        let first = cache.get_or_build(&fp, build_ok("one")).unwrap();
        let second = cache
            .get_or_build(&fp, || -> Result<Vec<u8>, Infallible> {
                panic!("must not rebuild on a hit")
            })
            .unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.rebuilds(), 1);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn should_replace_value_when_fingerprint_changes() {
        let cache = FreshnessCache::new();

        let old = cache
            .get_or_build(&Fingerprint::new("a"), build_ok("one"))
            .unwrap();
        let new = cache
            .get_or_build(&Fingerprint::new("b"), build_ok("two"))
            .unwrap();

        assert_eq!(new.as_slice(), b"two");
        // A snapshot handed out earlier is unaffected by the replacement.
        assert_eq!(old.as_slice(), b"one");
        assert_eq!(cache.rebuilds(), 2);
        assert_eq!(cache.fingerprint(), Some(Fingerprint::new("b")));
    }

    #[test]
    fn should_keep_previous_value_when_build_fails() {
        let cache = FreshnessCache::new();
        let fp = Fingerprint::new("a");
        cache.get_or_build(&fp, build_ok("one")).unwrap();

        let result: Result<_, &str> = cache.get_or_build(&Fingerprint::new("b"), || Err("boom"));

        assert_eq!(result.unwrap_err(), "boom");
        assert_eq!(cache.fingerprint(), Some(fp.clone()));
        assert_eq!(cache.get(&fp).unwrap().as_slice(), b"one");
        assert_eq!(cache.rebuilds(), 1);
    }

    #[test]
    fn should_serve_concurrent_readers_same_snapshot() {
        let cache = FreshnessCache::new();
        let fp = Fingerprint::new("a");
        let built = AtomicU64::new(0);
        cache
            .get_or_build(&fp, || {
                built.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(b"body".to_vec())
            })
            .unwrap();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        let value = cache
                            .get_or_build(&fp, || {
                                built.fetch_add(1, Ordering::SeqCst);
                                Ok::<_, Infallible>(b"other".to_vec())
                            })
                            .unwrap();
                        assert_eq!(value.as_slice(), b"body");
                    }
                });
            }
        });

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 800);
    }

    #[test]
    fn should_join_fingerprint_parts() {
        assert_eq!(Fingerprint::from_parts(["a"]).as_str(), "a");
        assert_eq!(Fingerprint::from_parts(["a", "b", "c"]).to_string(), "a|b|c");
        assert_eq!(Fingerprint::from_parts(Vec::<String>::new()).as_str(), "");
    }
}
