//! # tlf-data
//!
//! Everything between a file on disk and the analysis-ready dataset:
//!
//! - [`DatasetLoader`] reads `<name>.parquet` through an in-memory `DuckDB`
//!   connection, or `<name>.arrow` / `<name>.ipc` through `arrow-ipc`.
//! - [`DatasetCache`] shares loaded datasets across the reports of one run.
//! - [`derive::apply`] runs the declarative filter / derive / aggregate steps
//!   using the small expression language in [`expr`].
//! - [`describe`] holds the descriptive statistics shared with the summary tables.

pub mod cache;
pub mod derive;
pub mod describe;
pub mod error;
pub mod expr;
pub mod loader;

pub use cache::DatasetCache;
pub use error::{DataError, DerivationError};
pub use expr::{CompiledExpr, round_half_away, titlecase};
pub use loader::{DatasetLoader, SourceFormat};
