use crate::backend::{BackendKind, RenderBackend, RenderOutput, RenderStats, drive};
use crate::composite::region::composite_regions;
use crate::foundation::error::RaypoolResult;
use crate::preview::channel::PreviewEvent;
use crate::schedule::scanline::run_scanlines;
use crate::session::context::RenderContext;
use crate::session::phase::RequestPhase;
use crate::session::request::RenderRequest;

/// Pull-based strips at full quality; each strip is previewed as soon as it lands.
#[derive(Clone, Copy, Debug, Default)]
pub struct ScanlineBackend;

impl RenderBackend for ScanlineBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Scanline
    }

    #[tracing::instrument(
        skip_all,
        fields(backend = "scanline", width = request.width, height = request.height)
    )]
    fn render_image(
        &mut self,
        ctx: &mut RenderContext,
        request: &RenderRequest,
    ) -> RaypoolResult<RenderOutput> {
        drive(ctx, request, |scope, publisher| {
            let params = request.renderer_params();
            let id = scope.id;
            let strips = run_scanlines(
                scope.pool,
                id,
                &params,
                request.seed,
                scope.opts.strip_height,
                &mut scope.tracker,
                |region, pixels| {
                    publisher.publish(PreviewEvent {
                        request: id,
                        image_width: params.width,
                        region,
                        pixels: pixels.clone(),
                    });
                },
            )?;

            scope.tracker.advance(RequestPhase::Copying)?;
            let image = composite_regions(params.width, params.height, &strips)?;
            let stats = RenderStats {
                units_total: strips.len(),
                // All workers are idle at admission, so the first wave reaches this many.
                workers_used: scope.pool.len().min(strips.len()),
                preview_events: 0,
            };
            Ok((image, stats))
        })
    }
}
