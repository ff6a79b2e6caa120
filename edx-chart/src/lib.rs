//! Chart descriptors for environmental value tables.
//!
//! Charts are plain serializable data. A front end renders them from their
//! JSON form; nothing here draws.

pub mod chart;
pub mod select;

pub use chart::Chart;
pub use select::select;
