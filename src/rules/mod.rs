//! Rule-list handling.
//!
//! This module turns raw gfwlist-style rule lists into validated domain
//! tables:
//!
//! - [`source`]: where the raw bytes come from (file, bundled asset, fallback)
//! - [`decode`]: base64 transport decoding
//! - [`gfwlist`]: line classification and domain extraction
//! - [`domain`]: the [`Domain`] type and its normalizer
//! - [`merge`]: combining several sources into render-ready [`Lists`]
//! - [`remote`]: downloading a list over HTTP
//!
//! # Example
//!
//! ```
//! use pacserve::rules::{merge_tiers, parse};
//!
//! let base = parse("||example.com\n@@||cdn.example.com").unwrap();
//! let custom = parse("||github.com").unwrap();
//!
//! let lists = merge_tiers([&base.proxy, &custom.proxy], [&base.direct, &custom.direct]);
//! assert_eq!(lists.proxy.len(), 2);
//! assert_eq!(lists.direct.len(), 1);
//! ```

pub mod decode;
pub mod domain;
pub mod gfwlist;
pub mod merge;
pub mod remote;
pub mod source;

pub use decode::{DecodeError, decode_rule_list};
pub use domain::{Domain, InvalidDomain, normalize};
pub use gfwlist::{RuleLine, RuleSet, extract, parse};
pub use merge::{Lists, merge, merge_tiers};
pub use source::{EmbeddedSource, FallbackSource, FileSource, RuleSource, SourceError};

/// Error type for rule-list parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The list did not contain a single usable domain rule.
    #[error("no domains parsed from rule list")]
    NoDomains,
}
