use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use rayon::prelude::*;

use crate::backend::{BackendKind, RenderBackend, RenderOutput, RenderStats, drive};
use crate::composite::region::composite_regions;
use crate::foundation::core::{Region, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::pool::worker::panic_message;
use crate::preview::channel::PreviewEvent;
use crate::render::renderer::{RendererFactory, RendererParams, RendererSlot};
use crate::render::resources::SharedResourceSet;
use crate::schedule::partition::partition_scanlines;
use crate::session::context::RenderContext;
use crate::session::phase::RequestPhase;
use crate::session::request::RenderRequest;

/// Renders strips on a rayon pool sized to `opts.workers`, with renderer slots held per rayon job.
///
/// Bypasses the message-passing pool (which stays idle) but shares its factory, resources and
/// admission rules. A fresh rayon pool is built per request and every one of its threads runs
/// `prepare_worker` once before any strip is rendered. Preview events are published after the
/// parallel pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeParallelBackend;

impl RenderBackend for NativeParallelBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeParallel
    }

    #[tracing::instrument(
        skip_all,
        fields(backend = "native_parallel", width = request.width, height = request.height)
    )]
    fn render_image(
        &mut self,
        ctx: &mut RenderContext,
        request: &RenderRequest,
    ) -> RaypoolResult<RenderOutput> {
        drive(ctx, request, |scope, publisher| {
            let params = request.renderer_params();
            scope.tracker.advance(RequestPhase::Dispatching)?;
            let strips =
                partition_scanlines(params.width, params.height, scope.opts.strip_height)?;
            let pool = build_thread_pool(scope.opts.workers)?;
            let factory: &dyn RendererFactory = &**scope.factory;
            let resources = scope.resources;
            prepare_threads(&pool, factory, resources)?;
            scope.tracker.advance(RequestPhase::InFlight)?;

            let seed = request.seed;
            let rendered = pool.install(|| {
                strips
                    .par_iter()
                    .map_init(RendererSlot::new, |slot, &region| {
                        render_strip(slot, factory, resources, &params, region, seed)
                    })
                    .collect::<Vec<_>>()
            });

            let mut done = Vec::with_capacity(rendered.len());
            for (region, result) in strips.iter().zip(rendered) {
                let pixels = Arc::new(result?);
                publisher.publish(PreviewEvent {
                    request: scope.id,
                    image_width: params.width,
                    region: *region,
                    pixels: Arc::clone(&pixels),
                });
                done.push((*region, pixels));
            }

            scope.tracker.advance(RequestPhase::Copying)?;
            let image = composite_regions(params.width, params.height, &done)?;
            let stats = RenderStats {
                units_total: done.len(),
                workers_used: pool.current_num_threads().min(done.len()),
                preview_events: 0,
            };
            Ok((image, stats))
        })
    }
}

/// Run `prepare_worker` exactly once on every thread of `pool`.
pub(crate) fn prepare_threads(
    pool: &rayon::ThreadPool,
    factory: &dyn RendererFactory,
    resources: &SharedResourceSet,
) -> RaypoolResult<()> {
    pool.broadcast(|bc| {
        let worker = WorkerId(bc.index());
        catch_unwind(AssertUnwindSafe(|| factory.prepare_worker(worker, resources)))
            .unwrap_or_else(|p| {
                Err(RaypoolError::initialization(
                    worker,
                    format!("prepare panicked: {}", panic_message(p.as_ref())),
                ))
            })
            .map_err(|e| match e {
                e @ RaypoolError::Initialization { .. } => e,
                other => RaypoolError::initialization(worker, other.to_string()),
            })
    })
    .into_iter()
    .collect()
}

/// Render one strip with the calling rayon job's renderer slot.
///
/// `map_init` state lives per split job, so one thread may build its slot more than once.
fn render_strip(
    slot: &mut RendererSlot,
    factory: &dyn RendererFactory,
    resources: &SharedResourceSet,
    params: &RendererParams,
    region: Region,
    seed: u64,
) -> RaypoolResult<Vec<u8>> {
    let worker = WorkerId(rayon::current_thread_index().unwrap_or(0));
    let rendered = catch_unwind(AssertUnwindSafe(|| {
        slot.get_or_create(factory, params, resources)
            .and_then(|renderer| renderer.render_region(region, seed))
    }));
    let pixels = match rendered {
        Ok(Ok(pixels)) => pixels,
        Ok(Err(e)) => {
            slot.reset();
            return Err(RaypoolError::worker(worker, e.to_string()));
        }
        Err(p) => {
            slot.reset();
            return Err(RaypoolError::worker(
                worker,
                format!("renderer panicked: {}", panic_message(p.as_ref())),
            ));
        }
    };
    if pixels.len() != region.byte_len() {
        return Err(RaypoolError::aggregation_mismatch(format!(
            "strip {region:?} came back with {} bytes, expected {}",
            pixels.len(),
            region.byte_len()
        )));
    }
    Ok(pixels)
}

pub(crate) fn build_thread_pool(threads: usize) -> RaypoolResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(RaypoolError::validation("native backend needs >= 1 thread"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("raypool-native-{i}"))
        .build()
        .map_err(|e| RaypoolError::validation(format!("failed to build rayon thread pool: {e}")))
}
