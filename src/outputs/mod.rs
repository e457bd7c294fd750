//! File outputs for a fetch run.
//!
//! # Submodules
//!
//! - [`json`]: writes the [`Digest`](crate::models::Digest) as JSON for other programs
//! - [`markdown`]: renders the digest as a Markdown page grouped by source
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-04-10/
//!     └── news.json
//!
//! markdown_output_dir/
//! └── 2025-04-10.md
//! ```

pub mod json;
pub mod markdown;
