use super::*;
use crate::preview::channel::preview_channel;

#[test]
fn defaults_fill_missing_json_fields() {
    let req = RenderRequest::from_json(r#"{ "width": 64, "samples_per_pixel": 4 }"#).unwrap();
    assert_eq!(req.width, 64);
    assert_eq!(req.height, 180);
    assert_eq!(req.samples_per_pixel, 4);
    assert_eq!(req.max_depth, 64);
    assert!(!req.accel);
    assert!(req.preview.is_none());
    req.validate().unwrap();
}

#[test]
fn unknown_fields_are_a_serde_error() {
    let err = RenderRequest::from_json(r#"{ "widht": 3 }"#).unwrap_err();
    assert!(matches!(err, RaypoolError::Serde(_)), "{err}");
}

#[test]
fn validate_rejects_empty_or_oversized_requests() {
    for bad in [
        RenderRequest::new(0, 4, 1, 1),
        RenderRequest::new(4, 0, 1, 1),
        RenderRequest::new(4, 4, 0, 1),
        RenderRequest::new(4, 4, 1, 0),
        RenderRequest::new(MAX_DIMENSION + 1, 4, 1, 1),
    ] {
        assert!(matches!(bad.validate(), Err(RaypoolError::Validation(_))));
    }
}

#[test]
fn renderer_params_mirror_the_request() {
    let req = RenderRequest::new(8, 6, 10, 5)
        .with_scene(1)
        .with_accel(true)
        .with_seed(42);
    let p = req.renderer_params();
    assert_eq!((p.width, p.height, p.samples_per_pixel), (8, 6, 10));
    assert_eq!((p.scene_id, p.max_depth, p.accel), (1, 5, true));
    assert_eq!(req.seed, 42);
}

#[test]
fn preview_sink_is_not_serialized() {
    let (tx, _rx) = preview_channel(None);
    let req = RenderRequest::new(2, 2, 1, 1).with_preview(tx);
    let json = serde_json::to_string(&req).unwrap();
    assert!(!json.contains("preview"));
    let back = RenderRequest::from_json(&json).unwrap();
    assert!(back.preview.is_none());
    assert_eq!(back.width, 2);
}

#[test]
fn from_path_reports_missing_files() {
    let err = RenderRequest::from_path("/definitely/not/here.json").unwrap_err();
    assert!(err.to_string().contains("read request"), "{err}");
}
