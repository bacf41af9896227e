use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
}

struct Flat;

impl Renderer for Flat {
    fn accumulate(&mut self, _seed: u64) -> RaypoolResult<Vec<f32>> {
        Ok(Vec::new())
    }

    fn render_region(&mut self, region: Region, _seed: u64) -> RaypoolResult<Vec<u8>> {
        Ok(vec![7; region.byte_len()])
    }
}

impl RendererFactory for CountingFactory {
    fn create(
        &self,
        _params: &RendererParams,
        _resources: &SharedResourceSet,
    ) -> RaypoolResult<Box<dyn Renderer>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(Flat))
    }
}

fn params(samples: u32) -> RendererParams {
    RendererParams {
        scene_id: 0,
        width: 4,
        height: 2,
        samples_per_pixel: samples,
        max_depth: 4,
        accel: false,
    }
}

#[test]
fn accumulation_len_covers_rgba() {
    assert_eq!(params(1).accumulation_len(), 4 * 2 * 4);
    assert_eq!(params(1).with_samples(9).samples_per_pixel, 9);
}

#[test]
fn slot_reuses_renderer_while_params_match() {
    let factory = CountingFactory::default();
    let res = SharedResourceSet::new();
    let mut slot = RendererSlot::new();

    slot.get_or_create(&factory, &params(4), &res).unwrap();
    slot.get_or_create(&factory, &params(4), &res).unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 1);

    let r = slot.get_or_create(&factory, &params(8), &res).unwrap();
    assert_eq!(r.render_region(Region::full(1, 1), 0).unwrap(), vec![7; 4]);
    assert_eq!(factory.created.load(Ordering::SeqCst), 2);

    slot.reset();
    slot.get_or_create(&factory, &params(8), &res).unwrap();
    assert_eq!(factory.created.load(Ordering::SeqCst), 3);
}

#[test]
fn default_prepare_worker_accepts_anything() {
    let factory = CountingFactory::default();
    assert!(
        factory
            .prepare_worker(WorkerId(0), &SharedResourceSet::new())
            .is_ok()
    );
}
