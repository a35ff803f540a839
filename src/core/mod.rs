//! Pure filter, search, sort and pagination engines.

/// Per-column filters and the global search pass.
pub mod filter;
/// Standalone fuzzy ranking.
pub mod fuzzy;
/// Page slicing and clamping.
pub mod paginate;
/// Explicit filter → sort → paginate pipeline.
pub mod pipeline;
/// Tri-state single-column sort.
pub mod sort;
