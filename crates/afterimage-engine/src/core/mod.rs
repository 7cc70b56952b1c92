//! Core engine-facing contracts.
//!
//! Defines the stable interface between the runtime (platform loop) and the
//! application: the per-frame callback, its context, and the per-frame
//! mutable state shared between the pointer tracker, the scene and the
//! feedback pipeline.

mod app;
mod ctx;
mod frame_state;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
pub use frame_state::FrameState;
