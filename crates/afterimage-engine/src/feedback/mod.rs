//! Feedback rendering pipeline.
//!
//! A frame travels through three logical buffer roles:
//!
//! ```text
//! scene ──▶ source ─┐
//!                   ├─▶ composite ──▶ accum-curr ──▶ present
//! accum-prev ───────┘                     │
//!       ▲                                 │ copy forward
//!       └─────────────────────────────────┘
//! ```
//!
//! The compositor never reads and writes the same physical target in one
//! pass; the schedule (`schedule` module) makes that unrepresentable and the
//! explicit forward copy carries the accumulated image into the next frame.

mod blend;
mod compositor;
mod pool;
mod present;
mod schedule;
mod sequencer;

pub use blend::{BlendFn, DecayParams, FloodParams};
pub use compositor::FeedbackCompositor;
pub use pool::{PoolError, Target, TargetDesc, TargetHandle, TargetPool};
pub use present::PresentPass;
pub use sequencer::{FrameSequencer, Phase, SequencerConfig, SequencerError};
