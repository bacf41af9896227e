use super::*;
use crate::foundation::core::{Region, WorkerId};
use crate::pool::worker::UnitOrder;
use crate::schedule::partition::WorkUnit;
use crate::test_support::{ProbeFactory, probe_params};
use std::time::Duration;

fn opts(workers: usize) -> ContextOpts {
    ContextOpts {
        workers,
        ..ContextOpts::default()
    }
}

fn ctx(workers: usize, factory: ProbeFactory) -> RenderContext {
    RenderContext::new(Arc::new(factory), SharedResourceSet::new(), opts(workers)).unwrap()
}

#[test]
fn default_opts_are_usable() {
    let o = ContextOpts::default();
    assert!(o.workers >= 1);
    assert_eq!(o.strip_height, 16);
    assert_eq!(o.preview_capacity, Some(64));
    o.validate().unwrap();
}

#[test]
fn opts_parse_with_defaults() {
    let o: ContextOpts = serde_json::from_str(r#"{ "workers": 3 }"#).unwrap();
    assert_eq!(o.workers, 3);
    assert_eq!(o.strip_height, 16);
    let bad = ContextOpts {
        strip_height: 0,
        ..opts(2)
    };
    assert!(matches!(bad.validate(), Err(RaypoolError::Validation(_))));
}

#[test]
fn request_ids_increase_and_phase_is_recorded() {
    let mut c = ctx(2, ProbeFactory::default());
    assert_eq!(c.phase(), RequestPhase::Idle);
    {
        let mut scope = c.begin_request().unwrap();
        assert_eq!(scope.id, RequestId(1));
        scope.tracker.advance(RequestPhase::Dispatching).unwrap();
        scope.tracker.fail();
    }
    assert_eq!(c.phase(), RequestPhase::Failed);
    let scope = c.begin_request().unwrap();
    assert_eq!(scope.id, RequestId(2));
}

#[test]
fn busy_until_settled() {
    let mut c = ctx(
        1,
        ProbeFactory {
            delay: Duration::from_millis(100),
            ..ProbeFactory::default()
        },
    );
    {
        let scope = c.begin_request().unwrap();
        let id = scope.id;
        scope
            .pool
            .dispatch(
                WorkerId(0),
                UnitOrder {
                    request: id,
                    unit: WorkUnit::Region(Region::new(0, 0, 2, 1)),
                    params: probe_params(2, 1, 1),
                    seed: 0,
                },
            )
            .unwrap();
    }
    assert!(matches!(c.begin_request(), Err(RaypoolError::Busy(_))));
    assert_eq!(c.settle().unwrap(), 1);
    assert!(c.begin_request().is_ok());
}

#[test]
fn set_workers_recreates_only_on_change() {
    let mut c = ctx(2, ProbeFactory::default());
    c.set_workers(2).unwrap();
    assert_eq!(c.pool().map(|p| p.len()), Some(2));
    c.set_workers(4).unwrap();
    assert_eq!(c.opts().workers, 4);
    assert_eq!(c.pool().map(|p| p.len()), Some(4));
    assert!(c.set_workers(0).is_err());
}

#[test]
fn shutdown_context_refuses_requests_until_reopened() {
    let mut c = ctx(1, ProbeFactory::default());
    c.shutdown();
    assert!(c.pool().is_none());
    assert!(matches!(c.begin_request(), Err(RaypoolError::Validation(_))));
    assert_eq!(c.settle().unwrap(), 0);
    c.set_workers(1).unwrap();
    assert!(c.begin_request().is_ok());
}

#[test]
fn failed_bring_up_returns_initialization() {
    let err = RenderContext::new(
        Arc::new(ProbeFactory {
            fail_prepare: Some(WorkerId(0)),
            ..ProbeFactory::default()
        }),
        SharedResourceSet::new(),
        opts(2),
    )
    .unwrap_err();
    assert!(matches!(err, RaypoolError::Initialization { .. }));
}
