use crate::foundation::core::{Region, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::render::resources::SharedResourceSet;

/// Parameters a [`Renderer`] is constructed with.
///
/// In sample-partition mode `samples_per_pixel` is the worker's share of the request total, not the
/// total itself.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RendererParams {
    /// Scene selector understood by the renderer.
    pub scene_id: u32,
    /// Full image width in pixels.
    pub width: u32,
    /// Full image height in pixels.
    pub height: u32,
    /// Samples to take per pixel.
    pub samples_per_pixel: u32,
    /// Maximum trace depth.
    pub max_depth: u32,
    /// Build an acceleration structure before tracing.
    pub accel: bool,
}

impl RendererParams {
    /// Float count of a whole-frame accumulation buffer (`width * height * 4`).
    pub fn accumulation_len(&self) -> usize {
        Region::full(self.width, self.height).byte_len()
    }

    /// Same parameters with a different per-pixel sample budget.
    pub fn with_samples(&self, samples_per_pixel: u32) -> Self {
        Self {
            samples_per_pixel,
            ..self.clone()
        }
    }
}

/// Opaque per-pixel image synthesizer driven by the scheduler.
///
/// A renderer is owned by exactly one worker and only ever processes one unit at a time.
pub trait Renderer: Send {
    /// Render the whole frame and return unnormalized per-pixel color sums.
    ///
    /// The buffer holds `width * height * 4` floats (RGBA, row-major). Values are *not* divided by
    /// the sample count and *not* tone mapped; alpha is ignored by aggregation.
    fn accumulate(&mut self, seed: u64) -> RaypoolResult<Vec<f32>>;

    /// Render `region` at full quality and return finished, opaque RGBA8 bytes
    /// (`region.width * region.height * 4`, row-major within the region).
    fn render_region(&mut self, region: Region, seed: u64) -> RaypoolResult<Vec<u8>>;
}

/// Builds renderers for workers.
///
/// Shared by every worker of a pool, so it must be `Sync`; each call to [`RendererFactory::create`]
/// yields a renderer private to the calling worker.
pub trait RendererFactory: Send + Sync {
    /// Per-worker bring-up hook, run once on the worker before it reports ready.
    ///
    /// Returning an error fails the whole pool creation.
    fn prepare_worker(
        &self,
        _worker: WorkerId,
        _resources: &SharedResourceSet,
    ) -> RaypoolResult<()> {
        Ok(())
    }

    /// Construct a renderer for `params` using the worker's copy of the shared resources.
    fn create(
        &self,
        params: &RendererParams,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<Box<dyn Renderer>>;
}

/// Worker-side renderer slot: keeps the last renderer and reuses it while parameters match.
pub(crate) struct RendererSlot {
    current: Option<(RendererParams, Box<dyn Renderer>)>,
}

impl RendererSlot {
    pub(crate) fn new() -> Self {
        Self { current: None }
    }

    pub(crate) fn get_or_create(
        &mut self,
        factory: &dyn RendererFactory,
        params: &RendererParams,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<&mut Box<dyn Renderer>> {
        let reuse = matches!(&self.current, Some((p, _)) if p == params);
        if !reuse {
            self.current = None;
            let renderer = factory.create(params, resources)?;
            let (_, renderer) = self.current.insert((params.clone(), renderer));
            return Ok(renderer);
        }
        self.current
            .as_mut()
            .map(|(_, renderer)| renderer)
            .ok_or_else(|| RaypoolError::dispatch("renderer slot unexpectedly empty"))
    }

    /// Forget the current renderer (after a failure its state is not trusted).
    pub(crate) fn reset(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
