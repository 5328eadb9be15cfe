//! PAC script generation.
//!
//! - [`render`](mod@render): produces the script text from [`Lists`](crate::rules::Lists)
//! - [`matcher`]: evaluates the same routing logic in Rust

pub mod matcher;
pub mod render;

pub use matcher::{DomainTable, Route, Router};
pub use render::{CUSTOM_PLACEHOLDER, DIRECT, RenderError, inject_custom, render};
