//! GPU rendering subsystem.
//!
//! Passes issue GPU commands via wgpu and own their resources (pipelines,
//! buffers, per-node mesh uploads). Pipelines are created lazily and rebuilt
//! when the output format changes.

mod ctx;
mod scene_pass;

pub use ctx::RenderCtx;
pub use scene_pass::ScenePass;
