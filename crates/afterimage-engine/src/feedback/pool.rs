use thiserror::Error;

/// Size and pixel format of an offscreen target.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
}

impl TargetDesc {
    pub fn new(width: u32, height: u32, format: wgpu::TextureFormat) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            format,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was reallocated (resize) after this handle was acquired.
    #[error("stale target handle: pool was reallocated since acquisition")]
    Stale,

    /// The handle's slot was released.
    #[error("target handle was released")]
    Released,

    /// Every target in one feedback chain must share one size and format.
    #[error("target desc mismatch: requested {requested:?}, pool holds {held:?}")]
    Mismatch {
        requested: TargetDesc,
        held: TargetDesc,
    },
}

/// Generation-stamped handle to a pooled target.
///
/// Handles are plain indices; they become invalid (`PoolError::Stale`) when
/// the pool reallocates on resize, so callers must not retain them across a
/// resize.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TargetHandle {
    slot: usize,
    generation: u64,
}

/// A pooled offscreen color target.
pub struct Target {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

/// Owns a small fixed set of equally-sized offscreen color targets.
///
/// Each target is usable as a render attachment, a sampled texture, and a
/// copy source/destination — the three things the feedback schedule needs —
/// but the schedule guarantees no target is ever read and written in the
/// same pass.
///
/// The slot/generation bookkeeping is independent of what a slot stores:
/// target construction is injected through `acquire_with`/`resize_with`, and
/// the GPU-backed entry points on `TargetPool<Target>` supply it. Tests drive
/// the same bookkeeping with plain values.
pub struct TargetPool<T = Target> {
    desc: Option<TargetDesc>,
    generation: u64,
    slots: Vec<Option<T>>,
}

impl<T> TargetPool<T> {
    pub fn new() -> Self {
        Self {
            desc: None,
            generation: 0,
            slots: Vec::new(),
        }
    }

    /// The desc shared by all live targets, if any have been acquired.
    pub fn desc(&self) -> Option<TargetDesc> {
        self.desc
    }

    /// Allocates a slot, filling it with `make(desc)`, and returns a handle.
    ///
    /// The first acquisition fixes the pool's desc; later acquisitions must
    /// match it exactly.
    pub fn acquire_with(
        &mut self,
        desc: TargetDesc,
        make: impl FnOnce(TargetDesc) -> T,
    ) -> Result<TargetHandle, PoolError> {
        match self.desc {
            None => self.desc = Some(desc),
            Some(held) if held != desc => {
                return Err(PoolError::Mismatch {
                    requested: desc,
                    held,
                });
            }
            Some(_) => {}
        }

        let target = make(desc);

        let slot = match self.slots.iter().position(Option::is_none) {
            Some(i) => {
                self.slots[i] = Some(target);
                i
            }
            None => {
                self.slots.push(Some(target));
                self.slots.len() - 1
            }
        };

        Ok(TargetHandle {
            slot,
            generation: self.generation,
        })
    }

    /// Releases a handle's target.
    ///
    /// Stale handles are ignored: their targets were already destroyed by
    /// the reallocation that staled them.
    pub fn release(&mut self, handle: TargetHandle) {
        if handle.generation != self.generation {
            return;
        }
        if let Some(slot) = self.slots.get_mut(handle.slot) {
            *slot = None;
        }
    }

    /// Rebuilds every live target at a new size, atomically.
    ///
    /// Bumps the pool generation so all previously issued handles turn stale;
    /// nothing can sample or bind a target of the old size afterwards.
    pub fn resize_with(
        &mut self,
        width: u32,
        height: u32,
        mut make: impl FnMut(TargetDesc) -> T,
    ) {
        let Some(desc) = self.desc else { return };
        let desc = TargetDesc::new(width, height, desc.format);
        if Some(desc) == self.desc {
            return;
        }

        self.desc = Some(desc);
        self.generation += 1;

        for slot in self.slots.iter_mut() {
            if slot.is_some() {
                *slot = Some(make(desc));
            }
        }
    }

    /// Number of live (unreleased) targets.
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, handle: TargetHandle) -> Result<&T, PoolError> {
        if handle.generation != self.generation {
            return Err(PoolError::Stale);
        }
        self.slots
            .get(handle.slot)
            .and_then(Option::as_ref)
            .ok_or(PoolError::Released)
    }
}

impl TargetPool<Target> {
    /// Allocates a GPU target and returns a handle to it.
    pub fn acquire(
        &mut self,
        device: &wgpu::Device,
        desc: TargetDesc,
    ) -> Result<TargetHandle, PoolError> {
        self.acquire_with(desc, |d| create_target(device, d))
    }

    /// Reallocates every live GPU target at a new size.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.resize_with(width, height, |d| create_target(device, d));
    }

    pub fn view(&self, handle: TargetHandle) -> Result<&wgpu::TextureView, PoolError> {
        self.get(handle).map(|t| &t.view)
    }

    pub fn texture(&self, handle: TargetHandle) -> Result<&wgpu::Texture, PoolError> {
        self.get(handle).map(|t| &t.texture)
    }
}

impl<T> Default for TargetPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn create_target(device: &wgpu::Device, desc: TargetDesc) -> Target {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("afterimage offscreen target"),
        size: wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: desc.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Target { texture, view }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FMT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

    fn dims(desc: TargetDesc) -> (u32, u32) {
        (desc.width, desc.height)
    }

    #[test]
    fn first_acquire_fixes_the_desc() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        assert_eq!(pool.desc(), None);

        let desc = TargetDesc::new(800, 600, FMT);
        let h = pool.acquire_with(desc, dims).unwrap();

        assert_eq!(pool.desc(), Some(desc));
        assert_eq!(pool.get(h), Ok(&(800, 600)));
    }

    #[test]
    fn mismatched_desc_is_rejected() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let held = TargetDesc::new(800, 600, FMT);
        pool.acquire_with(held, dims).unwrap();

        let requested = TargetDesc::new(1024, 768, FMT);
        assert_eq!(
            pool.acquire_with(requested, dims),
            Err(PoolError::Mismatch { requested, held })
        );
    }

    #[test]
    fn released_slot_is_reused_and_old_handle_rejected() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let desc = TargetDesc::new(800, 600, FMT);

        let h = pool.acquire_with(desc, dims).unwrap();
        pool.release(h);
        assert_eq!(pool.get(h), Err(PoolError::Released));

        // Same generation, so the freed slot is reused in place.
        let h2 = pool.acquire_with(desc, dims).unwrap();
        assert_eq!(pool.get(h2), Ok(&(800, 600)));
    }

    #[test]
    fn resize_stales_every_outstanding_handle() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let h = pool
            .acquire_with(TargetDesc::new(800, 600, FMT), dims)
            .unwrap();

        pool.resize_with(1920, 1080, dims);

        assert_eq!(pool.get(h), Err(PoolError::Stale));
        assert_eq!(pool.desc(), Some(TargetDesc::new(1920, 1080, FMT)));

        // Live slots were rebuilt at the new size; a fresh acquisition sees
        // the new desc, never the old one.
        let h2 = pool
            .acquire_with(TargetDesc::new(1920, 1080, FMT), dims)
            .unwrap();
        assert_eq!(pool.get(h2), Ok(&(1920, 1080)));
    }

    #[test]
    fn resize_to_the_same_size_keeps_handles_valid() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let h = pool
            .acquire_with(TargetDesc::new(800, 600, FMT), dims)
            .unwrap();

        pool.resize_with(800, 600, dims);

        assert_eq!(pool.get(h), Ok(&(800, 600)));
    }

    #[test]
    fn releasing_a_stale_handle_is_ignored() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        let old = pool
            .acquire_with(TargetDesc::new(800, 600, FMT), dims)
            .unwrap();

        pool.resize_with(1920, 1080, dims);
        assert_eq!(pool.live(), 1);

        // The stale release must not clear the rebuilt slot under it.
        pool.release(old);
        assert_eq!(pool.live(), 1);
        assert_eq!(pool.get(old), Err(PoolError::Stale));
    }

    #[test]
    fn resize_before_any_acquisition_is_a_no_op() {
        let mut pool: TargetPool<(u32, u32)> = TargetPool::new();
        pool.resize_with(1920, 1080, dims);
        assert_eq!(pool.desc(), None);
    }
}
