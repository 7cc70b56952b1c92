use bytemuck::{Pod, Zeroable};

/// Coefficients for the exponential-decay blend:
/// `output = source * source_gain + previous * decay`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DecayParams {
    /// Weight of this frame's direct render.
    pub source_gain: f32,

    /// Weight of the previous accumulated frame. The loop gain: values below
    /// 1.0 give a converging trail, 1.0 and above accumulate without bound.
    pub decay: f32,
}

impl Default for DecayParams {
    fn default() -> Self {
        Self {
            source_gain: 1.0,
            decay: 0.9,
        }
    }
}

impl DecayParams {
    /// Whether repeated application converges.
    ///
    /// Only `decay` feeds back through the loop; `source_gain` scales the
    /// input once per frame. The empirically pleasant range is 0.9..1.0, but
    /// anything in [0, 1) is bounded.
    pub fn is_stable(&self) -> bool {
        self.source_gain.is_finite() && (0.0..1.0).contains(&self.decay)
    }

    /// CPU reference of the shader blend, component-wise over RGBA.
    ///
    /// Lets hosts validate coefficients against readbacks, and anchors the
    /// unit tests to the same arithmetic the fragment shader performs.
    pub fn mix(&self, source: [f32; 4], previous: [f32; 4]) -> [f32; 4] {
        let mut out = [0.0; 4];
        for i in 0..4 {
            out[i] = source[i] * self.source_gain + previous[i] * self.decay;
        }
        out
    }
}

/// Parameters for the noise-displaced flood blend.
///
/// The previous frame is sampled five times (center plus four axis offsets
/// displaced by fractal value noise) and the taps are combined with a
/// component-wise darken (min) before the usual decay mix with the source.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FloodParams {
    /// Fractal noise octave count, clamped to 1..=8 in the shader.
    pub octaves: u32,

    /// Tap displacement scale in UV units.
    pub spread: f32,

    pub source_gain: f32,
    pub decay: f32,
}

impl Default for FloodParams {
    fn default() -> Self {
        Self {
            octaves: 5,
            spread: 0.012,
            source_gain: 1.0,
            decay: 0.95,
        }
    }
}

impl FloodParams {
    pub fn is_stable(&self) -> bool {
        // The darken across taps can only lower values, so the decay bound
        // from the simple blend still dominates.
        self.source_gain.is_finite() && (0.0..1.0).contains(&self.decay)
    }
}

/// Pluggable blend function for the feedback compositor.
///
/// The iterations this engine grew out of never settled on one blend, so the
/// choice stays open: both feed the same uniform block and differ only in
/// fragment shader.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum BlendFn {
    Decay(DecayParams),
    Flood(FloodParams),
}

impl Default for BlendFn {
    fn default() -> Self {
        BlendFn::Decay(DecayParams::default())
    }
}

impl BlendFn {
    pub fn is_stable(&self) -> bool {
        match self {
            BlendFn::Decay(p) => p.is_stable(),
            BlendFn::Flood(p) => p.is_stable(),
        }
    }

    pub(crate) fn to_uniforms(self, resolution: (u32, u32), time: f32) -> CompositeUniforms {
        let (source_gain, decay, spread, octaves) = match self {
            BlendFn::Decay(p) => (p.source_gain, p.decay, 0.0, 0),
            BlendFn::Flood(p) => (p.source_gain, p.decay, p.spread, p.octaves.clamp(1, 8)),
        };

        CompositeUniforms {
            resolution: [resolution.0.max(1) as f32, resolution.1.max(1) as f32],
            time,
            source_gain,
            decay,
            spread,
            octaves,
            _pad: 0,
        }
    }
}

/// Uniform block shared by both composite shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(crate) struct CompositeUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub source_gain: f32,
    pub decay: f32,
    pub spread: f32,
    pub octaves: u32,
    pub _pad: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: [f32; 4] = [0.0; 4];

    #[test]
    fn impulse_decays_geometrically() {
        // Unit impulse on frame 1, zero source afterwards: accumulated
        // brightness at frame n must be decay^(n-1).
        let p = DecayParams {
            source_gain: 1.0,
            decay: 0.9,
        };

        let impulse = [1.0, 1.0, 1.0, 1.0];
        let mut accum = p.mix(impulse, BLACK);

        for n in 2..=20u32 {
            accum = p.mix(BLACK, accum);
            let expected = 0.9f32.powi(n as i32 - 1);
            assert!(
                (accum[0] - expected).abs() < 1e-5,
                "frame {n}: got {}, expected {expected}",
                accum[0]
            );
        }
    }

    #[test]
    fn zero_decay_degenerates_to_pass_through() {
        let p = DecayParams {
            source_gain: 1.0,
            decay: 0.0,
        };
        let src = [0.25, 0.5, 0.75, 1.0];
        let prev = [0.9, 0.9, 0.9, 0.9];
        assert_eq!(p.mix(src, prev), src);
    }

    #[test]
    fn black_inputs_stay_black() {
        for decay in [0.0, 0.5, 0.9, 0.99] {
            let p = DecayParams {
                source_gain: 1.0,
                decay,
            };
            assert_eq!(p.mix(BLACK, BLACK), BLACK);
        }
    }

    #[test]
    fn stability_bounds() {
        assert!(DecayParams::default().is_stable());
        assert!(DecayParams { source_gain: 1.0, decay: 0.0 }.is_stable());
        assert!(!DecayParams { source_gain: 1.0, decay: 1.0 }.is_stable());
        assert!(!DecayParams { source_gain: 1.0, decay: -0.1 }.is_stable());
        assert!(!DecayParams { source_gain: f32::NAN, decay: 0.5 }.is_stable());

        assert!(FloodParams::default().is_stable());
        assert!(!FloodParams { decay: 1.2, ..Default::default() }.is_stable());
    }

    #[test]
    fn bounded_accumulation_under_constant_source() {
        // Constant source converges to source_gain / (1 - decay).
        let p = DecayParams {
            source_gain: 0.1,
            decay: 0.9,
        };
        let src = [1.0, 1.0, 1.0, 1.0];
        let mut accum = BLACK;
        for _ in 0..500 {
            accum = p.mix(src, accum);
        }
        assert!((accum[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn uniforms_clamp_octaves_and_resolution() {
        let u = BlendFn::Flood(FloodParams {
            octaves: 99,
            ..Default::default()
        })
        .to_uniforms((0, 600), 1.5);

        assert_eq!(u.octaves, 8);
        assert_eq!(u.resolution[0], 1.0);
        assert_eq!(u.resolution[1], 600.0);
        assert_eq!(u.time, 1.5);
    }
}
