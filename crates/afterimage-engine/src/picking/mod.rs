//! Pointer picking.
//!
//! Maps window-space pointer positions to a 3D marker position by casting a
//! ray from the camera through the pointer's normalized device coordinates
//! and intersecting it against a fixed invisible plane.

mod ray;
mod tracker;

pub use ray::{Plane, Ray};
pub use tracker::{pointer_ndc, PointerTracker};
