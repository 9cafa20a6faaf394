//! The library code for the `coursefeed` feed generator. A run scans a
//! directory of Markdown course materials and publishes an RSS feed of the
//! ones that should currently be visible. The architecture breaks down into
//! these steps:
//!
//! 1. Resolving "now" ([`crate::clock`]) and the publication window
//!    ([`crate::config`]) once for the run
//! 2. Parsing posts from source files on disk ([`crate::parser`],
//!    [`crate::frontmatter`], [`crate::post`]), with every date normalized into
//!    a UTC instant ([`crate::date`])
//! 3. Filtering the posts against "now" and the window ([`crate::filter`])
//! 4. Sorting and grouping the survivors by tag and rendering the feeds
//!    ([`crate::feed`], [`crate::tag`])
//!
//! The second step is where the subtlety lives. Authors write dates in
//! several shapes, often without a time or an offset, and mean "that day in
//! my zone" when they do. A single malformed file must never stop a run, so
//! each file is parsed on its own and problems are logged and skipped.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod clock;
pub mod config;
pub mod date;
pub mod env;
pub mod feed;
pub mod filter;
pub mod frontmatter;
pub mod parser;
pub mod post;
pub mod status;
pub mod tag;
