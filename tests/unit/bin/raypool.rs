use super::*;
use raypool::{FinalImage, RaypoolError, RenderStats};

fn output() -> RenderOutput {
    RenderOutput {
        image: FinalImage::opaque(2, 2),
        elapsed: Duration::from_millis(3),
        stats: RenderStats::default(),
    }
}

#[test]
fn consumer_failure_does_not_hide_a_finished_render() {
    let failed: ConsumerOutcome = Ok(Err(RaypoolError::validation("event width mismatch")));
    let out = settle_preview(Ok(output()), failed).unwrap();
    assert_eq!(out.image, FinalImage::opaque(2, 2));
}

#[test]
fn consumer_panic_does_not_hide_a_finished_render() {
    let payload: Box<dyn std::any::Any + Send> = Box::new("consumer panicked");
    let panicked: ConsumerOutcome = Err(payload);
    assert!(settle_preview(Ok(output()), panicked).is_ok());
}

#[test]
fn render_error_is_reported_even_when_the_consumer_finished() {
    let done: ConsumerOutcome = Ok(Ok(PreviewCanvas::new(2, 2)));
    let err = settle_preview(Err(RaypoolError::busy("still running")), done).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RaypoolError>(),
        Some(RaypoolError::Busy(_))
    ));
}
