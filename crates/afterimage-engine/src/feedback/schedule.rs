//! The per-frame schedule as data.
//!
//! Each frame is an ordered list of steps over logical buffer roles. Steps
//! name which roles they read and which one they write, so the aliasing
//! invariant — no step reads and writes the same physical target — is a
//! property of these constants, checked by the tests below, rather than a
//! runtime check scattered through the sequencer.

/// Logical buffer role; the sequencer maps each role to a pooled target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub(crate) enum Role {
    /// This frame's direct scene render.
    Source,
    /// Last frame's composited output.
    AccumPrev,
    /// This frame's composited output; becomes next frame's `AccumPrev`.
    AccumCurr,
}

/// One step of the schedule.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) enum Step {
    /// Clear a role to the configured neutral seed color.
    Seed { target: Role },
    /// Draw the 3D scene into a role.
    DrawScene { target: Role },
    /// Full-screen blend of `source` and `previous` into `target`.
    Composite {
        source: Role,
        previous: Role,
        target: Role,
    },
    /// Draw a role to the window surface.
    Present { source: Role },
    /// Copy one role's contents into another (texture-to-texture copy).
    CopyForward { from: Role, to: Role },
}

impl Step {
    pub(crate) fn reads(&self) -> Vec<Role> {
        match self {
            Step::Seed { .. } | Step::DrawScene { .. } => Vec::new(),
            Step::Composite {
                source, previous, ..
            } => vec![*source, *previous],
            Step::Present { source } => vec![*source],
            Step::CopyForward { from, .. } => vec![*from],
        }
    }

    pub(crate) fn writes(&self) -> Option<Role> {
        match self {
            Step::Seed { target }
            | Step::DrawScene { target }
            | Step::Composite { target, .. } => Some(*target),
            Step::Present { .. } => None, // writes the surface, not a role
            Step::CopyForward { to, .. } => Some(*to),
        }
    }
}

/// One-time priming: define `AccumPrev` before the first composite reads it.
pub(crate) const PRIME_STEPS: &[Step] = &[Step::Seed {
    target: Role::AccumPrev,
}];

/// Steady-state frame. Two accumulation buffers plus an explicit forward
/// copy: the composite writes a target distinct from both of its inputs, and
/// the copy carries the result into `AccumPrev` for the next frame.
pub(crate) const FRAME_STEPS: &[Step] = &[
    Step::DrawScene { target: Role::Source },
    Step::Composite {
        source: Role::Source,
        previous: Role::AccumPrev,
        target: Role::AccumCurr,
    },
    Step::Present { source: Role::AccumCurr },
    Step::CopyForward {
        from: Role::AccumCurr,
        to: Role::AccumPrev,
    },
];

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn no_step_reads_its_own_write() {
        for step in PRIME_STEPS.iter().chain(FRAME_STEPS) {
            if let Some(w) = step.writes() {
                assert!(
                    !step.reads().contains(&w),
                    "{step:?} reads and writes {w:?}"
                );
            }
        }
    }

    #[test]
    fn composite_inputs_are_distinct_from_output() {
        for step in FRAME_STEPS {
            if let Step::Composite {
                source,
                previous,
                target,
            } = step
            {
                assert_ne!(source, target);
                assert_ne!(previous, target);
            }
        }
    }

    #[test]
    fn priming_defines_the_composite_input() {
        let seeded: Vec<Role> = PRIME_STEPS
            .iter()
            .filter_map(|s| match s {
                Step::Seed { target } => Some(*target),
                _ => None,
            })
            .collect();
        assert!(seeded.contains(&Role::AccumPrev));
    }

    /// Symbolic interpreter: runs the schedule over labeled buffer contents
    /// and checks that the `previous` read in frame N is exactly the
    /// composite produced in frame N-1.
    #[test]
    fn forward_copy_preserves_continuity() {
        let mut contents: HashMap<Role, String> = HashMap::new();

        for step in PRIME_STEPS {
            if let Step::Seed { target } = step {
                contents.insert(*target, "seed".to_string());
            }
        }

        let mut last_composite = String::new();
        for frame in 0..4u32 {
            let mut presented = None;

            for step in FRAME_STEPS {
                match step {
                    // FRAME_STEPS contains no Seed; nothing to interpret.
                    Step::Seed { .. } => {}
                    Step::DrawScene { target } => {
                        contents.insert(*target, format!("scene{frame}"));
                    }
                    Step::Composite {
                        source,
                        previous,
                        target,
                    } => {
                        let prev = contents[previous].clone();
                        // Continuity: previous is last frame's composite
                        // (or the seed on the first frame).
                        if frame == 0 {
                            assert_eq!(prev, "seed");
                        } else {
                            assert_eq!(prev, last_composite);
                        }
                        let out = format!("mix({}, {})", contents[source], prev);
                        contents.insert(*target, out);
                    }
                    Step::Present { source } => {
                        presented = Some(contents[source].clone());
                    }
                    Step::CopyForward { from, to } => {
                        let v = contents[from].clone();
                        contents.insert(*to, v);
                    }
                }
            }

            last_composite = contents[&Role::AccumCurr].clone();
            // What reaches the screen is this frame's composite.
            assert_eq!(presented.as_deref(), Some(last_composite.as_str()));
        }
    }

    #[test]
    fn present_shows_the_current_composite() {
        let composite_pos = FRAME_STEPS
            .iter()
            .position(|s| matches!(s, Step::Composite { .. }))
            .unwrap();
        let present_pos = FRAME_STEPS
            .iter()
            .position(|s| matches!(s, Step::Present { .. }))
            .unwrap();
        assert!(composite_pos < present_pos);
    }
}
