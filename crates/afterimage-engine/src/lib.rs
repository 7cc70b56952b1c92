//! Afterimage engine crate.
//!
//! Owns the platform + GPU runtime and the feedback rendering pipeline:
//! a 3D scene is rendered offscreen, blended with the previous frame's
//! accumulated image in a full-screen pass, presented, and carried forward
//! for the next frame.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod scene;
pub mod picking;
pub mod render;
pub mod feedback;
