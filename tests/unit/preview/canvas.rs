use super::*;
use crate::foundation::core::Region;
use crate::preview::channel::preview_channel;
use std::sync::Arc;

fn strip(request: u64, y: u32, h: u32, v: u8) -> PreviewEvent {
    let region = Region::new(0, y, 3, h);
    PreviewEvent {
        request: RequestId(request),
        image_width: 3,
        region,
        pixels: Arc::new(vec![v; region.byte_len()]),
    }
}

#[test]
fn coverage_grows_until_complete() {
    let mut canvas = PreviewCanvas::new(3, 4);
    assert_eq!(canvas.covered_rows(), 0);
    canvas.apply(&strip(1, 2, 2, 50)).unwrap();
    assert_eq!(canvas.covered_rows(), 2);
    assert!((canvas.coverage() - 0.5).abs() < 1e-6);
    assert!(!canvas.is_complete());

    canvas.apply(&strip(1, 0, 2, 60)).unwrap();
    assert!(canvas.is_complete());
    assert_eq!(canvas.events(), 2);
    assert_eq!(canvas.image().pixel(1, 3), Some([50, 50, 50, 50]));
    assert_eq!(canvas.image().pixel(1, 0), Some([60, 60, 60, 60]));
}

#[test]
fn repeated_regions_do_not_double_count() {
    let mut canvas = PreviewCanvas::new(3, 2);
    canvas.apply(&strip(1, 0, 1, 1)).unwrap();
    canvas.apply(&strip(1, 0, 1, 2)).unwrap();
    assert_eq!(canvas.covered_rows(), 1);
    assert!(!canvas.is_complete());
}

#[test]
fn newer_request_starts_a_fresh_frame() {
    let mut canvas = PreviewCanvas::new(3, 2);
    canvas.apply(&strip(1, 0, 2, 9)).unwrap();
    assert!(canvas.is_complete());
    canvas.apply(&strip(2, 0, 1, 4)).unwrap();
    assert_eq!(canvas.request(), Some(RequestId(2)));
    assert_eq!(canvas.covered_rows(), 1);
    assert_eq!(canvas.image().pixel(0, 1), Some([0, 0, 0, 255]));
}

#[test]
fn mismatched_width_is_rejected() {
    let mut canvas = PreviewCanvas::new(5, 2);
    assert!(matches!(
        canvas.apply(&strip(1, 0, 1, 0)),
        Err(RaypoolError::Validation(_))
    ));
}

#[test]
fn drain_applies_queued_events_without_blocking() {
    let (tx, rx) = preview_channel(None);
    let mut canvas = PreviewCanvas::new(3, 3);
    assert_eq!(canvas.drain(&rx).unwrap(), 0);
    let mut publisher = crate::preview::channel::PreviewPublisher::new(Some(tx));
    publisher.publish(strip(1, 0, 2, 3));
    publisher.publish(strip(1, 2, 1, 3));
    assert_eq!(canvas.drain(&rx).unwrap(), 2);
    assert!(canvas.is_complete());
}

#[test]
fn run_until_disconnected_redraws_at_the_end() {
    let (tx, rx) = preview_channel(Some(2));
    let producer = std::thread::spawn(move || {
        let mut publisher = crate::preview::channel::PreviewPublisher::new(Some(tx));
        for y in 0..3 {
            publisher.publish(strip(4, y, 1, 8));
        }
        publisher.finish()
    });

    let mut canvas = PreviewCanvas::new(3, 3);
    let mut redraws = 0;
    canvas
        .run_until_disconnected(&rx, Duration::from_millis(5), |_| redraws += 1)
        .unwrap();
    assert_eq!(producer.join().unwrap(), 3);
    assert!(redraws >= 1);
    assert!(canvas.is_complete());
    assert_eq!(canvas.into_image().pixel(2, 2), Some([8, 8, 8, 8]));
}
