//! Per-image editing core: geometry, cursor hit-testing, and the point/label
//! state machine. Everything in here is UI-free and works in image-space
//! pixel coordinates.

mod editor;
mod geometry;
mod hittest;

pub use editor::*;
pub use geometry::*;
pub use hittest::*;
