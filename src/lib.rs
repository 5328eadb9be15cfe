//! pacserve - gfwlist to PAC converter and server.
//!
//! pacserve reads an AutoProxy ("gfwlist") rule list, extracts the domains
//! it names, and renders a Proxy Auto-Configuration script that sends those
//! domains through a proxy and everything else direct. The script is cached
//! and only rebuilt when one of its source files changes.
//!
//! # Architecture
//!
//! - [`rules`]: Rule-list sources, decoding, parsing and merging
//! - [`pac`]: Script rendering and an in-process evaluator
//! - [`cache`]: Fingerprint-keyed snapshot cache
//! - [`service`]: Pipeline orchestration on top of the cache
//! - [`server`]: HTTP front end
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//!
//! # Bundled list
//!
//! When the default `gfwlist.txt` is absent, pacserve serves the list
//! compiled in from `assets/gfwlist.txt`. That list is a minimal sample of a
//! few dozen well-known rules, not a snapshot of the upstream gfwlist. Use
//! `gfwlist2pac` or download the upstream list to `gfwlist.txt` for real
//! coverage.
//!
//! # Example
//!
//! ```rust
//! use pacserve::pac::Route;
//! use pacserve::rules::EmbeddedSource;
//! use pacserve::service::PacService;
//!
//! let list = "@@||direct.example.com\n||proxy.example.com\n! comment\n";
//! let service = PacService::new(
//!     EmbeddedSource::new("inline", list.as_bytes()),
//!     "SOCKS5 127.0.0.1:1080",
//! );
//!
//! let pac = service.load_pac().unwrap();
//! assert_eq!(pac.router().route("sub.direct.example.com"), Route::Direct);
//! assert_eq!(pac.find_proxy_for_host("proxy.example.com"), "SOCKS5 127.0.0.1:1080");
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pac;
pub mod rules;
pub mod server;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
