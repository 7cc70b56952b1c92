//! Interactive viewer: a pointer-tracked sphere fed through the feedback
//! compositor, leaving an afterimage trail behind the cursor.
//!
//! Keys: `B` toggles the blend strategy, `R` reseeds the trail, `F` toggles
//! fullscreen, `Escape` quits.

use anyhow::Result;
use clap::{Parser, ValueEnum};
use glam::Vec3;
use winit::dpi::LogicalSize;

use afterimage_engine::core::{App, AppControl, FrameCtx, FrameState};
use afterimage_engine::device::GpuInit;
use afterimage_engine::feedback::{
    BlendFn, DecayParams, FloodParams, FrameSequencer, SequencerConfig,
};
use afterimage_engine::input::Key;
use afterimage_engine::logging::{init_logging, LoggingConfig};
use afterimage_engine::picking::{Plane, PointerTracker};
use afterimage_engine::render::RenderCtx;
use afterimage_engine::scene::{Camera, Mesh, Node, Scene};
use afterimage_engine::window::{Runtime, RuntimeConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum BlendMode {
    /// Plain exponential decay: each frame the trail fades by `decay`.
    Decay,
    /// Noise-displaced flood: the trail smears outward as it fades.
    Flood,
}

#[derive(Debug, Parser)]
#[command(name = "afterimage", about = "Pointer trail feedback viewer")]
struct Cli {
    /// Window width in logical pixels.
    #[arg(long, default_value_t = 1024.0)]
    width: f64,

    /// Window height in logical pixels.
    #[arg(long, default_value_t = 768.0)]
    height: f64,

    /// Initial blend strategy.
    #[arg(long, value_enum, default_value_t = BlendMode::Decay)]
    blend: BlendMode,

    /// Trail persistence per frame; must stay below 1.0 to converge.
    #[arg(long, default_value_t = 0.9)]
    decay: f32,

    /// Weight of the freshly rendered scene in the blend.
    #[arg(long, default_value_t = 1.0)]
    gain: f32,

    /// Flood tap displacement, in UV units.
    #[arg(long, default_value_t = 0.012)]
    spread: f32,

    /// Flood noise octaves (1-8).
    #[arg(long, default_value_t = 5)]
    octaves: u32,

    /// Marker sphere radius in world units.
    #[arg(long, default_value_t = 0.1)]
    radius: f32,

    /// Background and trail seed color, RRGGBB hex.
    #[arg(long, default_value = "000000", value_parser = parse_color)]
    background: wgpu::Color,
}

fn parse_color(s: &str) -> Result<wgpu::Color, String> {
    let hex = s.trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("expected RRGGBB hex, got {s:?}"));
    }
    let v = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;

    Ok(wgpu::Color {
        r: f64::from((v >> 16) & 0xff) / 255.0,
        g: f64::from((v >> 8) & 0xff) / 255.0,
        b: f64::from(v & 0xff) / 255.0,
        a: 1.0,
    })
}

impl Cli {
    fn blend_fn(&self) -> BlendFn {
        match self.blend {
            BlendMode::Decay => BlendFn::Decay(DecayParams {
                source_gain: self.gain,
                decay: self.decay,
            }),
            BlendMode::Flood => BlendFn::Flood(FloodParams {
                octaves: self.octaves,
                spread: self.spread,
                source_gain: self.gain,
                decay: self.decay,
            }),
        }
    }
}

struct Viewer {
    scene: Scene,
    camera: Camera,
    tracker: PointerTracker,
    sequencer: FrameSequencer,
    state: FrameState,
    flood: FloodParams,
    decay: DecayParams,
}

impl Viewer {
    fn new(cli: &Cli) -> Self {
        let mut scene = Scene::new();
        let marker = scene.push(
            Node::new(Mesh::uv_sphere(1.0, 48, 24))
                .with_scale(cli.radius)
                .with_color([1.0, 1.0, 1.0, 1.0]),
        );

        // Pick against the z=0 world plane the camera faces.
        let tracker = PointerTracker::new(Plane::new(Vec3::Z, 0.0), marker);

        let mut sequencer = FrameSequencer::new(SequencerConfig {
            blend: cli.blend_fn(),
            seed_color: cli.background,
            clear_color: cli.background,
            ..SequencerConfig::default()
        });
        sequencer.start();

        let flood = FloodParams {
            octaves: cli.octaves,
            spread: cli.spread,
            source_gain: cli.gain,
            decay: cli.decay,
        };
        let decay = DecayParams {
            source_gain: cli.gain,
            decay: cli.decay,
        };

        Self {
            scene,
            camera: Camera::default(),
            tracker,
            sequencer,
            state: FrameState::default(),
            flood,
            decay,
        }
    }

    fn toggle_blend(&mut self) {
        let next = match self.sequencer.blend() {
            BlendFn::Decay(_) => BlendFn::Flood(self.flood),
            BlendFn::Flood(_) => BlendFn::Decay(self.decay),
        };
        log::info!("blend switched to {next:?}");
        self.sequencer.set_blend(next);
    }
}

impl App for Viewer {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input_frame.keys_pressed.contains(&Key::Escape) {
            self.sequencer.stop();
            return AppControl::Exit;
        }
        if ctx.input_frame.keys_pressed.contains(&Key::B) {
            self.toggle_blend();
        }
        if ctx.input_frame.keys_pressed.contains(&Key::R) {
            self.sequencer.reseed();
        }
        if ctx.input_frame.keys_pressed.contains(&Key::F) {
            let window = ctx.window.window;
            let fullscreen = match window.fullscreen() {
                Some(_) => None,
                None => Some(winit::window::Fullscreen::Borderless(None)),
            };
            window.set_fullscreen(fullscreen);
        }

        let size = ctx.window.physical_size();
        let aspect = size.0.max(1) as f32 / size.1.max(1) as f32;

        if let Some(pos) = ctx.input.pointer_pos {
            self.tracker.update(
                &mut self.state,
                &mut self.scene,
                &self.camera,
                aspect,
                pos,
                size,
            );
        }

        let dt = ctx.time.dt;
        let scene = &self.scene;
        let camera = &self.camera;
        let sequencer = &mut self.sequencer;
        let state = &mut self.state;

        ctx.render(|gpu, frame| {
            let rctx = RenderCtx::new(gpu.device(), gpu.queue());
            let result = sequencer.run_frame(
                &rctx,
                &mut frame.encoder,
                &frame.view,
                gpu.surface_format(),
                size,
                scene,
                camera,
                state,
                dt,
            );

            match result {
                Ok(()) => AppControl::Continue,
                Err(err) => {
                    log::error!("frame schedule failed: {err}");
                    AppControl::Exit
                }
            }
        })
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let cli = Cli::parse();
    let viewer = Viewer::new(&cli);

    let config = RuntimeConfig {
        title: "afterimage".to_string(),
        initial_size: LogicalSize::new(cli.width, cli.height),
    };

    Runtime::run(config, GpuInit::default(), viewer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_with_and_without_hash() {
        let c = parse_color("ff8000").unwrap();
        assert!((c.r - 1.0).abs() < 1e-9);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-9);
        assert!((c.b - 0.0).abs() < 1e-9);

        assert_eq!(parse_color("#ff8000").unwrap(), c);
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!(parse_color("fff").is_err());
        assert!(parse_color("gggggg").is_err());
        assert!(parse_color("").is_err());
    }

    #[test]
    fn cli_defaults_are_stable() {
        let cli = Cli::parse_from(["afterimage"]);
        assert!(matches!(cli.blend_fn(), BlendFn::Decay(p) if p.is_stable()));
        assert_eq!(cli.background, wgpu::Color::BLACK);
    }
}
