use thiserror::Error;

use crate::core::FrameState;
use crate::render::{RenderCtx, ScenePass};
use crate::scene::{Camera, Scene};

use super::blend::BlendFn;
use super::compositor::FeedbackCompositor;
use super::pool::{create_target, PoolError, Target, TargetDesc, TargetHandle, TargetPool};
use super::present::PresentPass;
use super::schedule::{Role, Step, FRAME_STEPS, PRIME_STEPS};

/// Sequencer lifecycle.
///
/// `Stopped` is terminal: once cancelled, the sequencer never runs another
/// frame and all pool handles are released.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    /// Constructed, not yet started.
    Idle,
    /// Waiting to render the neutral seed into `accumulated-previous`.
    Priming,
    /// Steady-state per-frame loop.
    Running,
    /// Cancelled; resources released.
    Stopped,
}

#[derive(Debug, Error)]
pub enum SequencerError {
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Sequencer configuration.
#[derive(Debug, Copy, Clone)]
pub struct SequencerConfig {
    /// Pixel format shared by all offscreen targets in the chain.
    ///
    /// A filterable float format keeps repeated blending from banding.
    pub format: wgpu::TextureFormat,

    /// Neutral image the chain is seeded with before the first composite.
    pub seed_color: wgpu::Color,

    /// Scene pass background.
    pub clear_color: wgpu::Color,

    /// Blend strategy for the compositor; swappable at runtime.
    pub blend: BlendFn,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            format: wgpu::TextureFormat::Rgba16Float,
            seed_color: wgpu::Color::BLACK,
            clear_color: wgpu::Color::BLACK,
            blend: BlendFn::default(),
        }
    }
}

/// Physical targets currently bound to the schedule's logical roles.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct Roles {
    source: TargetHandle,
    accum_prev: TargetHandle,
    accum_curr: TargetHandle,
}

impl Roles {
    fn get(&self, role: Role) -> TargetHandle {
        match role {
            Role::Source => self.source,
            Role::AccumPrev => self.accum_prev,
            Role::AccumCurr => self.accum_curr,
        }
    }

    fn all(&self) -> [TargetHandle; 3] {
        [self.source, self.accum_prev, self.accum_curr]
    }
}

/// Owns the per-frame schedule: render order, which targets hold which
/// buffer roles, and the end-of-frame forward copy.
pub struct FrameSequencer {
    config: SequencerConfig,
    phase: Phase,

    pool: TargetPool<Target>,
    roles: Option<Roles>,

    scene_pass: ScenePass,
    compositor: FeedbackCompositor,
    presenter: PresentPass,
}

impl FrameSequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            pool: TargetPool::new(),
            roles: None,
            scene_pass: ScenePass::new(),
            compositor: FeedbackCompositor::new(),
            presenter: PresentPass::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn blend(&self) -> BlendFn {
        self.config.blend
    }

    /// Swaps the blend strategy; takes effect on the next frame.
    pub fn set_blend(&mut self, blend: BlendFn) {
        if !blend.is_stable() {
            log::warn!("feedback blend {blend:?} is not stable; brightness may run away");
        }
        self.config.blend = blend;
    }

    /// `Idle -> Priming`. A stopped sequencer stays stopped.
    pub fn start(&mut self) {
        match self.phase {
            Phase::Idle => {
                if !self.config.blend.is_stable() {
                    log::warn!(
                        "starting with unstable blend {:?}; brightness may run away",
                        self.config.blend
                    );
                }
                self.phase = Phase::Priming;
            }
            Phase::Stopped => log::warn!("start() on a stopped sequencer is ignored"),
            Phase::Priming | Phase::Running => {}
        }
    }

    /// Drops the accumulated history; the next frame reseeds before
    /// compositing.
    pub fn reseed(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Priming;
        }
    }

    /// Cancels the sequencer and releases all pool handles. Idempotent; safe
    /// to call with no frame in flight.
    pub fn stop(&mut self) {
        if let Some(roles) = self.roles.take() {
            for handle in roles.all() {
                self.pool.release(handle);
            }
        }
        if self.phase != Phase::Stopped {
            log::debug!("frame sequencer stopped");
        }
        self.phase = Phase::Stopped;
    }

    /// Runs one frame of the schedule, recording into `encoder`.
    ///
    /// No-op unless the sequencer has been started, and always a no-op after
    /// `stop()`. A zero-sized drawable (minimized window) skips the frame and
    /// retries on the next callback.
    #[allow(clippy::too_many_arguments)]
    pub fn run_frame(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        surface_format: wgpu::TextureFormat,
        size: (u32, u32),
        scene: &Scene,
        camera: &Camera,
        state: &mut FrameState,
        dt: f32,
    ) -> Result<(), SequencerError> {
        match self.phase {
            Phase::Idle | Phase::Stopped => return Ok(()),
            Phase::Priming | Phase::Running => {}
        }

        if size.0 == 0 || size.1 == 0 {
            // Not ready to draw; defer, don't fail.
            return Ok(());
        }

        self.ensure_targets(ctx.device, size)?;
        let Some(roles) = self.roles else {
            return Ok(());
        };

        if self.phase == Phase::Priming {
            for step in PRIME_STEPS {
                if let Step::Seed { target } = step {
                    match self.pool.view(roles.get(*target)) {
                        Ok(view) => clear_pass(encoder, view, self.config.seed_color),
                        Err(err) => {
                            // Retry next callback; priming failures are
                            // deferrals, not errors.
                            log::debug!("priming deferred: {err}");
                            return Ok(());
                        }
                    }
                }
            }
            state.time = 0.0;
            self.phase = Phase::Running;
        }

        state.time += dt;

        for step in FRAME_STEPS {
            debug_assert!(
                step.writes().is_none_or(|w| !step.reads().contains(&w)),
                "schedule step {step:?} aliases its own output"
            );

            match step {
                Step::Seed { .. } => unreachable!("seed steps only occur while priming"),

                Step::DrawScene { target } => {
                    self.scene_pass.render(
                        ctx,
                        encoder,
                        self.pool.view(roles.get(*target))?,
                        self.config.format,
                        size,
                        scene,
                        camera,
                        self.config.clear_color,
                    );
                }

                Step::Composite {
                    source,
                    previous,
                    target,
                } => {
                    self.compositor.composite(
                        ctx,
                        encoder,
                        self.pool.view(roles.get(*source))?,
                        self.pool.view(roles.get(*previous))?,
                        self.pool.view(roles.get(*target))?,
                        self.config.format,
                        size,
                        state.time,
                        self.config.blend,
                    );
                }

                Step::Present { source } => {
                    self.presenter.render(
                        ctx,
                        encoder,
                        self.pool.view(roles.get(*source))?,
                        surface_view,
                        surface_format,
                    );
                }

                Step::CopyForward { from, to } => {
                    encoder.copy_texture_to_texture(
                        self.pool.texture(roles.get(*from))?.as_image_copy(),
                        self.pool.texture(roles.get(*to))?.as_image_copy(),
                        wgpu::Extent3d {
                            width: size.0,
                            height: size.1,
                            depth_or_array_layers: 1,
                        },
                    );
                }
            }
        }

        Ok(())
    }

    /// Allocates or reallocates the three role targets for `size`.
    fn ensure_targets(
        &mut self,
        device: &wgpu::Device,
        size: (u32, u32),
    ) -> Result<(), SequencerError> {
        let desc = TargetDesc::new(size.0, size.1, self.config.format);
        bind_roles(&mut self.pool, &mut self.roles, &mut self.phase, desc, |d| {
            create_target(device, d)
        })?;
        Ok(())
    }
}

/// Binds the schedule's logical roles to pool targets matching `desc`,
/// reallocating when the desc changed.
///
/// Any reallocation drops the accumulated history, so the phase falls back to
/// `Priming` and the chain reseeds before the next composite — a
/// mismatched-size texture is never sampled. Target construction is injected
/// so the bookkeeping stays independent of the GPU.
fn bind_roles<T>(
    pool: &mut TargetPool<T>,
    roles: &mut Option<Roles>,
    phase: &mut Phase,
    desc: TargetDesc,
    mut make: impl FnMut(TargetDesc) -> T,
) -> Result<(), PoolError> {
    if roles.is_some() && pool.desc() == Some(desc) {
        return Ok(());
    }

    if let Some(old) = roles.take() {
        for handle in old.all() {
            pool.release(handle);
        }
        log::info!(
            "feedback targets reallocated at {}x{}",
            desc.width,
            desc.height
        );
    }

    pool.resize_with(desc.width, desc.height, &mut make);

    *roles = Some(Roles {
        source: pool.acquire_with(desc, &mut make)?,
        accum_prev: pool.acquire_with(desc, &mut make)?,
        accum_curr: pool.acquire_with(desc, &mut make)?,
    });
    *phase = Phase::Priming;

    Ok(())
}

fn clear_pass(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView, color: wgpu::Color) {
    // Scoped render pass; the binding is released when `_rpass` drops.
    let _rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("afterimage seed pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(color),
                store: wgpu::StoreOp::Store,
            },
            depth_slice: None,
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
        multiview_mask: None,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sequencer() -> FrameSequencer {
        FrameSequencer::new(SequencerConfig::default())
    }

    #[test]
    fn starts_idle_and_primes_on_start() {
        let mut s = sequencer();
        assert_eq!(s.phase(), Phase::Idle);
        s.start();
        assert_eq!(s.phase(), Phase::Priming);
    }

    #[test]
    fn start_is_idempotent_while_active() {
        let mut s = sequencer();
        s.start();
        s.start();
        assert_eq!(s.phase(), Phase::Priming);
    }

    #[test]
    fn stop_is_terminal_and_idempotent() {
        let mut s = sequencer();
        s.start();
        s.stop();
        assert_eq!(s.phase(), Phase::Stopped);

        // Stopping again with no frame in flight must not panic.
        s.stop();
        assert_eq!(s.phase(), Phase::Stopped);

        // A stopped sequencer cannot be restarted.
        s.start();
        assert_eq!(s.phase(), Phase::Stopped);
    }

    #[test]
    fn stop_before_start_is_safe() {
        let mut s = sequencer();
        s.stop();
        assert_eq!(s.phase(), Phase::Stopped);
    }

    #[test]
    fn reseed_only_interrupts_a_running_sequencer() {
        let mut s = sequencer();
        s.reseed();
        assert_eq!(s.phase(), Phase::Idle);

        s.start();
        s.reseed();
        assert_eq!(s.phase(), Phase::Priming);

        s.stop();
        s.reseed();
        assert_eq!(s.phase(), Phase::Stopped);
    }

    #[test]
    fn blend_is_swappable() {
        use super::super::blend::{BlendFn, FloodParams};

        let mut s = sequencer();
        s.set_blend(BlendFn::Flood(FloodParams::default()));
        assert!(matches!(s.blend(), BlendFn::Flood(_)));
    }

    const FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    fn dims(desc: TargetDesc) -> (u32, u32) {
        (desc.width, desc.height)
    }

    #[test]
    fn binding_is_stable_while_the_desc_matches() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let mut roles = None;
        let mut phase = Phase::Priming;
        let desc = TargetDesc::new(800, 600, FMT);

        bind_roles(&mut pool, &mut roles, &mut phase, desc, dims).unwrap();
        let bound = roles.unwrap();
        assert_eq!(pool.live(), 3);

        // Steady state: same desc leaves the binding and the phase alone.
        phase = Phase::Running;
        bind_roles(&mut pool, &mut roles, &mut phase, desc, dims).unwrap();
        assert_eq!(phase, Phase::Running);
        assert_eq!(roles, Some(bound));
    }

    #[test]
    fn desc_change_reprimes_and_stales_old_handles() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let mut roles = None;
        let mut phase = Phase::Priming;

        bind_roles(
            &mut pool,
            &mut roles,
            &mut phase,
            TargetDesc::new(800, 600, FMT),
            dims,
        )
        .unwrap();
        let old = roles.unwrap();
        phase = Phase::Running;

        // Resize mid-run: rebind, fall back to Priming, reject old handles.
        bind_roles(
            &mut pool,
            &mut roles,
            &mut phase,
            TargetDesc::new(1920, 1080, FMT),
            dims,
        )
        .unwrap();

        assert_eq!(phase, Phase::Priming);
        for handle in old.all() {
            assert_eq!(pool.get(handle), Err(PoolError::Stale));
        }
        for handle in roles.unwrap().all() {
            assert_eq!(pool.get(handle), Ok(&(1920, 1080)));
        }
        assert_eq!(pool.live(), 3);
    }
}
