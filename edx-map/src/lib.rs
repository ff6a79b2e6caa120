//! Map layers for the satellite-imagery platform.
//!
//! Maps are described, not drawn: each one lists the boundary, imagery and
//! land-cover layers a platform client should add, with their visualization
//! parameters, legends and captions.

pub mod boundary;
pub mod error;
pub mod layers;
pub mod render;
pub mod session;

pub use error::MapError;
pub use render::{LayerMapRenderer, MapOutput, MapRenderer, MapRequest};
pub use session::EarthEngineSession;
