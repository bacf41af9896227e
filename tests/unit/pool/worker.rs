use super::*;
use crate::foundation::core::Region;
use crate::test_support::{ProbeFactory, probe_params};
use std::time::Duration;

struct Harness {
    handle: WorkerHandle,
    responses: mpsc::Receiver<UnitResponse>,
    ready: mpsc::Receiver<ReadyReport>,
}

fn spawn(factory: ProbeFactory) -> Harness {
    let (resp_tx, responses) = mpsc::channel();
    let (ready_tx, ready) = mpsc::channel();
    let handle = WorkerHandle::spawn(
        WorkerId(3),
        Arc::new(factory),
        SharedResourceSet::new(),
        resp_tx,
        ready_tx,
    )
    .unwrap();
    Harness {
        handle,
        responses,
        ready,
    }
}

fn region_order(y: u32) -> UnitOrder {
    UnitOrder {
        request: RequestId(1),
        unit: WorkUnit::Region(Region::new(0, y, 2, 1)),
        params: probe_params(2, 4, 1),
        seed: 0,
    }
}

#[test]
fn worker_reports_ready_and_renders_units() {
    let mut h = spawn(ProbeFactory::default());
    let (id, ready) = h.ready.recv().unwrap();
    assert_eq!(id, WorkerId(3));
    assert!(ready.is_ok());

    h.handle.send(region_order(2)).unwrap();
    let resp = h.responses.recv().unwrap();
    assert_eq!(resp.worker, WorkerId(3));
    assert_eq!(resp.request, RequestId(1));
    match resp.result.unwrap() {
        PartialResult::Rgba8(px) => assert_eq!(&px[..4], &[0, 2, 2, 255]),
        other => panic!("unexpected partial: {other:?}"),
    }

    h.handle.request_shutdown();
    h.handle.join();
    assert!(!h.handle.is_alive());
    assert_eq!(h.handle.state, WorkerState::Exited);
}

#[test]
fn renderer_errors_and_panics_become_worker_errors() {
    let mut h = spawn(ProbeFactory {
        fail_row: Some(1),
        panic_row: Some(2),
        ..ProbeFactory::default()
    });
    h.ready.recv().unwrap().1.unwrap();

    h.handle.send(region_order(1)).unwrap();
    let err = h.responses.recv().unwrap().result.unwrap_err();
    assert!(matches!(err, RaypoolError::Worker { worker: WorkerId(3), .. }));

    h.handle.send(region_order(2)).unwrap();
    let err = h.responses.recv().unwrap().result.unwrap_err();
    assert!(err.to_string().contains("renderer panicked: probe panic"), "{err}");

    // The thread survives both failures.
    h.handle.send(region_order(0)).unwrap();
    assert!(h.responses.recv().unwrap().result.is_ok());

    h.handle.request_shutdown();
    h.handle.join();
}

#[test]
fn failed_prepare_ends_the_thread() {
    let mut h = spawn(ProbeFactory {
        fail_prepare: Some(WorkerId(3)),
        ..ProbeFactory::default()
    });
    let (_, ready) = h.ready.recv().unwrap();
    assert!(ready.is_err());
    for _ in 0..200 {
        if !h.handle.is_alive() {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(!h.handle.is_alive());
    assert!(h.handle.send(region_order(0)).is_err());
    h.handle.join();
}

#[test]
fn panic_message_reads_str_and_string_payloads() {
    assert_eq!(panic_message(&"boom"), "boom");
    assert_eq!(panic_message(&String::from("bang")), "bang");
    assert_eq!(panic_message(&7u8), "non-string panic payload");
}
