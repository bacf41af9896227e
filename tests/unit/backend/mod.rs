use super::*;
use crate::foundation::core::WorkerId;
use crate::foundation::error::RaypoolError;
use crate::render::resources::SharedResourceSet;
use crate::preview::channel::preview_channel;
use crate::session::context::ContextOpts;
use crate::test_support::{ProbeFactory, probe_pixel};
use std::sync::Arc;

fn ctx(workers: usize, factory: ProbeFactory) -> RenderContext {
    let opts = ContextOpts {
        workers,
        strip_height: 3,
        preview_capacity: None,
    };
    RenderContext::new(Arc::new(factory), SharedResourceSet::new(), opts).unwrap()
}

const ALL: [BackendKind; 3] = [
    BackendKind::SamplePartition,
    BackendKind::Scanline,
    BackendKind::NativeParallel,
];

#[test]
fn create_backend_matches_kind() {
    for kind in ALL {
        assert_eq!(create_backend(kind).kind(), kind);
    }
}

#[test]
fn backend_kind_names_are_stable() {
    for (kind, name) in ALL
        .into_iter()
        .zip(["sample_partition", "scanline", "native_parallel"])
    {
        assert_eq!(kind.to_string(), name);
        assert_eq!(serde_json::to_string(&kind).unwrap(), format!("\"{name}\""));
    }
    assert_eq!(BackendKind::default(), BackendKind::SamplePartition);
}

#[test]
fn sample_partition_aggregates_to_the_mean() {
    let mut c = ctx(3, ProbeFactory::default());
    let out = SamplePartitionBackend
        .render_image(&mut c, &RenderRequest::new(4, 2, 7, 3))
        .unwrap();
    // 0.25 per sample -> mean 0.25 -> sqrt 0.5 -> byte 128.
    assert!(out.image.data.chunks_exact(4).all(|px| px == [128, 128, 128, 255]));
    assert_eq!(out.stats.units_total, 3);
    assert_eq!(c.phase(), RequestPhase::Complete);
}

#[test]
fn region_backends_reproduce_renderer_pixels() {
    for kind in [BackendKind::Scanline, BackendKind::NativeParallel] {
        let mut c = ctx(2, ProbeFactory::default());
        let out = create_backend(kind)
            .render_image(&mut c, &RenderRequest::new(5, 7, 2, 2))
            .unwrap();
        assert_eq!(out.stats.units_total, 3, "{kind}");
        for y in 0..7 {
            for x in 0..5 {
                assert_eq!(out.image.pixel(x, y), Some(probe_pixel(x, y)), "{kind}");
            }
        }
        assert_eq!(c.phase(), RequestPhase::Complete);
    }
}

#[test]
fn invalid_request_is_rejected_before_admission() {
    let mut c = ctx(1, ProbeFactory::default());
    let err = ScanlineBackend
        .render_image(&mut c, &RenderRequest::new(0, 4, 1, 1))
        .unwrap_err();
    assert!(matches!(err, RaypoolError::Validation(_)));
    assert_eq!(c.phase(), RequestPhase::Idle);
}

#[test]
fn worker_failure_marks_the_request_failed() {
    for kind in ALL {
        let mut c = ctx(
            2,
            ProbeFactory {
                fail_row: Some(4),
                fail_accumulate: true,
                ..ProbeFactory::default()
            },
        );
        let err = create_backend(kind)
            .render_image(&mut c, &RenderRequest::new(3, 6, 2, 2))
            .unwrap_err();
        assert!(matches!(err, RaypoolError::Worker { .. }), "{kind}: {err}");
        assert_eq!(c.phase(), RequestPhase::Failed, "{kind}");
        c.settle().unwrap();
    }
}

#[test]
fn elapsed_ms_truncates() {
    let out = RenderOutput {
        image: FinalImage::opaque(1, 1),
        elapsed: Duration::from_micros(2_900),
        stats: RenderStats::default(),
    };
    assert_eq!(out.elapsed_ms(), 2);
}

#[test]
fn native_prepares_each_rayon_thread_once() {
    let factory = Arc::new(ProbeFactory::default());
    let opts = ContextOpts {
        workers: 2,
        strip_height: 1,
        preview_capacity: None,
    };
    let mut c = RenderContext::new(factory.clone(), SharedResourceSet::new(), opts).unwrap();
    assert_eq!(factory.prepared(), 2);

    let out = NativeParallelBackend
        .render_image(&mut c, &RenderRequest::new(2, 256, 1, 1))
        .unwrap();
    assert_eq!(out.stats.units_total, 256);
    assert_eq!(factory.prepared(), 4);
}

#[test]
fn native_prepare_failure_is_an_initialization_error() {
    let failing = ProbeFactory {
        fail_prepare: Some(WorkerId(1)),
        ..ProbeFactory::default()
    };
    let pool = native::build_thread_pool(2).unwrap();
    let err = native::prepare_threads(&pool, &failing, &SharedResourceSet::new()).unwrap_err();
    assert!(matches!(err, RaypoolError::Initialization { worker, .. } if worker == WorkerId(1)));
    assert_eq!(failing.prepared(), 2);
}

#[test]
fn previews_delivered_before_a_failure_stay_delivered() {
    let mut c = ctx(
        1,
        ProbeFactory {
            fail_row: Some(7),
            ..ProbeFactory::default()
        },
    );
    let (tx, rx) = preview_channel(None);
    let err = ScanlineBackend
        .render_image(&mut c, &RenderRequest::new(3, 9, 1, 1).with_preview(tx))
        .unwrap_err();
    assert!(matches!(err, RaypoolError::Worker { .. }), "{err}");
    let rows: Vec<u32> = rx.drain().iter().map(|ev| ev.region.y).collect();
    assert_eq!(rows, vec![0, 3]);
    assert_eq!(c.phase(), RequestPhase::Failed);
}
