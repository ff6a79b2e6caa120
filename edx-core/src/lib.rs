pub mod error;
pub mod extract;
pub mod intent;
pub mod metric;
pub mod prompt;
pub mod service;
pub mod state;
pub mod table;
pub mod year;

#[cfg(feature = "api")]
pub mod client;
