//! Rule-list sources.
//!
//! A [`RuleSource`] hands out raw rule-list bytes together with a cheap
//! identity string used by the freshness cache to decide whether anything
//! changed since the last build.

use std::borrow::Cow;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use rust_embed::RustEmbed;

/// File name of the bundled rule list inside `assets/`.
pub const BUNDLED_GFWLIST: &str = "gfwlist.txt";

#[derive(RustEmbed)]
#[folder = "assets/"]
#[include = "*.txt"]
struct BundledAssets;

/// Error type for rule-source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// File was not found at the specified path.
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    /// Permission denied when accessing the file.
    #[error("permission denied: {0:?}")]
    PermissionDenied(PathBuf),

    /// I/O error while inspecting or reading the file.
    #[error("I/O error reading {path:?}: {source}")]
    Io {
        /// Path to the file that caused the error.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A bundled asset is missing from the binary.
    #[error("bundled asset not found: {0}")]
    MissingAsset(String),
}

impl SourceError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

/// A place rule-list bytes come from.
pub trait RuleSource: fmt::Debug + Send + Sync {
    /// Human readable name, used in logs and error messages.
    fn name(&self) -> Cow<'_, str>;

    /// Identity of the current content.
    ///
    /// Two calls return the same string as long as the content did not
    /// change. It must be cheap: it runs on every request.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the source cannot be inspected.
    fn fingerprint(&self) -> Result<String, SourceError>;

    /// Read the raw (possibly base64-encoded) content.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] if the source cannot be read.
    fn read(&self) -> Result<Cow<'_, [u8]>, SourceError>;
}

/// Rule list stored in a local file.
///
/// The fingerprint is `f:<path>:<mtime-nanos>:<size>`.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// Source reading `path` on every build.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RuleSource for FileSource {
    fn name(&self) -> Cow<'_, str> {
        self.path.to_string_lossy()
    }

    fn fingerprint(&self) -> Result<String, SourceError> {
        let meta =
            std::fs::metadata(&self.path).map_err(|err| SourceError::from_io(&self.path, err))?;
        let modified = meta
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map_or(0, |elapsed| elapsed.as_nanos());

        Ok(format!(
            "f:{}:{modified}:{}",
            self.path.display(),
            meta.len()
        ))
    }

    fn read(&self) -> Result<Cow<'_, [u8]>, SourceError> {
        std::fs::read(&self.path)
            .map(Cow::Owned)
            .map_err(|err| SourceError::from_io(&self.path, err))
    }
}

/// Rule list held in memory, typically compiled into the binary.
///
/// The content never changes, so the fingerprint is `g:<name>:<len>`.
#[derive(Clone)]
pub struct EmbeddedSource {
    name: String,
    data: Cow<'static, [u8]>,
}

impl EmbeddedSource {
    /// Source serving `data` under `name`.
    pub fn new(name: impl Into<String>, data: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// The rule list bundled with this crate under `assets/`.
    ///
    /// This is a minimal sample covering a few dozen common hosts, not a
    /// copy of the upstream gfwlist.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingAsset`] if the asset was not embedded.
    pub fn bundled() -> Result<Self, SourceError> {
        let file = BundledAssets::get(BUNDLED_GFWLIST)
            .ok_or_else(|| SourceError::MissingAsset(BUNDLED_GFWLIST.to_string()))?;
        Ok(Self::new("embedded", file.data))
    }
}

impl fmt::Debug for EmbeddedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedSource")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

impl RuleSource for EmbeddedSource {
    fn name(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }

    fn fingerprint(&self) -> Result<String, SourceError> {
        Ok(format!("g:{}:{}", self.name, self.data.len()))
    }

    fn read(&self) -> Result<Cow<'_, [u8]>, SourceError> {
        Ok(Cow::Borrowed(&self.data))
    }
}

/// A file that falls back to another source while the file does not exist.
///
/// Any error other than "not found" is reported as-is; an unreadable file
/// never silently switches to the fallback.
#[derive(Debug)]
pub struct FallbackSource {
    primary: FileSource,
    fallback: Box<dyn RuleSource>,
}

impl FallbackSource {
    /// Read `primary`, or `fallback` while `primary` does not exist.
    pub fn new(primary: FileSource, fallback: impl RuleSource + 'static) -> Self {
        Self {
            primary,
            fallback: Box::new(fallback),
        }
    }

    /// Returns `true` when the primary file is currently missing.
    ///
    /// A file that exists but cannot be inspected does not count as
    /// missing.
    #[must_use]
    pub fn is_using_fallback(&self) -> bool {
        matches!(
            std::fs::metadata(self.primary.path()),
            Err(err) if err.kind() == io::ErrorKind::NotFound
        )
    }
}

impl RuleSource for FallbackSource {
    fn name(&self) -> Cow<'_, str> {
        if self.is_using_fallback() {
            self.fallback.name()
        } else {
            self.primary.name()
        }
    }

    fn fingerprint(&self) -> Result<String, SourceError> {
        match self.primary.fingerprint() {
            Err(SourceError::NotFound(path)) => {
                tracing::debug!(
                    path = ?path,
                    fallback = %self.fallback.name(),
                    "rule file missing, using fallback"
                );
                self.fallback.fingerprint()
            }
            other => other,
        }
    }

    fn read(&self) -> Result<Cow<'_, [u8]>, SourceError> {
        match self.primary.read() {
            Err(SourceError::NotFound(_)) => self.fallback.read(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn should_fingerprint_file_with_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "||example.com\n").unwrap();

        let source = FileSource::new(&path);
        let fingerprint = source.fingerprint().unwrap();

        assert!(fingerprint.starts_with(&format!("f:{}:", path.display())));
        assert!(fingerprint.ends_with(":14"));
    }

    #[test]
    fn should_change_fingerprint_when_size_changes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "||a.com\n").unwrap();
        let source = FileSource::new(&path);
        let before = source.fingerprint().unwrap();

        fs::write(&path, "||a.com\n||b.com\n").unwrap();
        let after = source.fingerprint().unwrap();

        assert_ne!(before, after);
    }

    #[test]
    fn should_read_file_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.txt");
        fs::write(&path, "||example.com\n").unwrap();

        let source = FileSource::new(&path);
        assert_eq!(source.read().unwrap().as_ref(), b"||example.com\n");
    }

    #[test]
    fn should_return_not_found_for_missing_file() {
        let source = FileSource::new("/nonexistent/path/to/gfwlist.txt");
        assert!(matches!(source.fingerprint(), Err(SourceError::NotFound(_))));
        assert!(matches!(source.read(), Err(SourceError::NotFound(_))));
    }

    #[test]
    fn should_fingerprint_embedded_by_length() {
        let source = EmbeddedSource::new("test", b"||example.com".as_slice());
        assert_eq!(source.fingerprint().unwrap(), "g:test:13");
        assert_eq!(source.read().unwrap().as_ref(), b"||example.com");
    }

    #[test]
    fn should_load_bundled_list() {
        let source = EmbeddedSource::bundled().unwrap();
        assert!(!source.read().unwrap().is_empty());
        assert!(source.fingerprint().unwrap().starts_with("g:embedded:"));
    }

    #[test]
    fn should_bundle_sample_with_both_tiers() {
        let source = EmbeddedSource::bundled().unwrap();
        let text = crate::rules::decode_rule_list(&source.read().unwrap()).unwrap();
        let rules = crate::rules::parse(&text).unwrap();

        assert!(text.contains("Minimal sample"));
        assert!(rules.proxy.contains(&"google.com".parse::<crate::rules::Domain>().unwrap()));
        assert!(rules.direct.contains(&"qq.com".parse::<crate::rules::Domain>().unwrap()));
    }

    #[test]
    fn should_use_fallback_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gfwlist.txt");
        let source = FallbackSource::new(
            FileSource::new(&path),
            EmbeddedSource::new("fallback", b"||fallback.com".as_slice()),
        );

        assert!(source.is_using_fallback());
        assert_eq!(source.name(), "fallback");
        assert_eq!(source.fingerprint().unwrap(), "g:fallback:14");
        assert_eq!(source.read().unwrap().as_ref(), b"||fallback.com");

        fs::write(&path, "||file.com\n").unwrap();

        assert!(!source.is_using_fallback());
        assert!(source.fingerprint().unwrap().starts_with("f:"));
        assert_eq!(source.read().unwrap().as_ref(), b"||file.com\n");
    }

    #[test]
    fn should_keep_primary_name_when_file_cannot_be_inspected() {
        let dir = TempDir::new().unwrap();
        // A regular file used as a directory fails with something other
        // than "not found".
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let path = blocker.join("gfwlist.txt");
        let source = FallbackSource::new(
            FileSource::new(&path),
            EmbeddedSource::new("fallback", b"||fallback.com".as_slice()),
        );

        assert!(!source.is_using_fallback());
        assert_eq!(source.name(), path.to_string_lossy());
        assert!(matches!(source.fingerprint(), Err(SourceError::Io { .. })));
        assert!(source.read().is_err());
    }
}
