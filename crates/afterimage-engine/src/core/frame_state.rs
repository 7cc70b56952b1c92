use glam::{Vec2, Vec3};

/// Per-frame mutable state shared across pipeline stages.
///
/// The pointer tracker writes `pointer_ndc` and `marker_position`; the frame
/// sequencer advances `time`. Both run on the event-loop thread, so plain
/// fields are safe here; a multi-threaded host would need to wrap this in a
/// lock or feed it through a channel.
#[derive(Debug, Copy, Clone, Default)]
pub struct FrameState {
    /// Seconds elapsed since the sequencer started running.
    pub time: f32,

    /// Pointer position in normalized device coordinates, [-1, 1], y up.
    pub pointer_ndc: Vec2,

    /// Last known marker position on the picking plane, world space.
    pub marker_position: Vec3,
}
