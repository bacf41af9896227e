use std::sync::Arc;

use crate::backend::{BackendKind, RenderBackend, RenderOutput, RenderStats, drive};
use crate::composite::aggregate::aggregate_samples;
use crate::foundation::core::Region;
use crate::foundation::error::RaypoolResult;
use crate::preview::channel::PreviewEvent;
use crate::schedule::sample::run_sample_partition;
use crate::session::context::RenderContext;
use crate::session::phase::RequestPhase;
use crate::session::request::RenderRequest;

/// Splits the sample budget over the pool; every worker renders the whole frame.
///
/// Whole-frame partials are meaningless on their own, so preview gets a single full-image event
/// once aggregation is done.
#[derive(Clone, Copy, Debug, Default)]
pub struct SamplePartitionBackend;

impl RenderBackend for SamplePartitionBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SamplePartition
    }

    #[tracing::instrument(
        skip_all,
        fields(backend = "sample_partition", width = request.width, height = request.height)
    )]
    fn render_image(
        &mut self,
        ctx: &mut RenderContext,
        request: &RenderRequest,
    ) -> RaypoolResult<RenderOutput> {
        drive(ctx, request, |scope, publisher| {
            let params = request.renderer_params();
            let partials = run_sample_partition(
                scope.pool,
                scope.id,
                &params,
                request.seed,
                &mut scope.tracker,
            )?;

            scope.tracker.advance(RequestPhase::Aggregating)?;
            let image = aggregate_samples(
                &partials,
                params.samples_per_pixel,
                params.width,
                params.height,
            )?;

            if publisher.is_active() {
                publisher.publish(PreviewEvent {
                    request: scope.id,
                    image_width: image.width,
                    region: Region::full(image.width, image.height),
                    pixels: Arc::new(image.data.clone()),
                });
            }
            let stats = RenderStats {
                units_total: partials.len(),
                workers_used: partials.len(),
                preview_events: 0,
            };
            Ok((image, stats))
        })
    }
}
