//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and Window, and wires them to the GPU layer.
//! The engine drives exactly one window; the feedback chain is tied to one
//! surface.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
