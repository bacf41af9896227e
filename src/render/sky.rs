//! Built-in procedural renderer.
//!
//! Cheap stand-in for a real tracer so the scheduling layer can be driven end to end: a sky
//! gradient, an optional checker ground, or a backdrop texture taken from the shared resources.
//! Every pixel takes `samples_per_pixel` jittered samples, so partitioning the sample budget
//! produces genuinely independent noise per worker.

use anyhow::Context;

use crate::composite::aggregate::{channel_to_byte, tone_map};
use crate::foundation::core::{Region, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::foundation::math::{SplitMix64, pixel_seed};
use crate::render::renderer::{Renderer, RendererFactory, RendererParams};
use crate::render::resources::SharedResourceSet;

/// Resource name sampled by [`SkyScene::Backdrop`].
pub const BACKDROP_RESOURCE: &str = "backdrop";

const SKY_ZENITH: [f32; 3] = [0.5, 0.7, 1.0];
const HORIZON: f32 = 0.6;
const CHECKER_CELL_PX: f32 = 8.0;

/// Scenes understood by [`SkyRenderer`], selected by `scene_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkyScene {
    /// `0`: white-to-blue vertical gradient.
    Gradient,
    /// `1`: gradient sky over a checker ground plane.
    Checker,
    /// `2`: backdrop texture from the `backdrop` resource.
    Backdrop,
}

impl SkyScene {
    /// Map a scene id to a scene.
    pub fn from_id(id: u32) -> RaypoolResult<Self> {
        match id {
            0 => Ok(Self::Gradient),
            1 => Ok(Self::Checker),
            2 => Ok(Self::Backdrop),
            other => Err(RaypoolError::validation(format!(
                "unknown scene id {other} (expected 0, 1 or 2)"
            ))),
        }
    }
}

/// Factory for [`SkyRenderer`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SkyFactory;

impl RendererFactory for SkyFactory {
    fn prepare_worker(
        &self,
        worker: WorkerId,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<()> {
        if let Some(bytes) = resources.get(BACKDROP_RESOURCE) {
            image::guess_format(bytes).map_err(|e| {
                RaypoolError::initialization(worker, format!("unreadable backdrop resource: {e}"))
            })?;
        }
        Ok(())
    }

    fn create(
        &self,
        params: &RendererParams,
        resources: &SharedResourceSet,
    ) -> RaypoolResult<Box<dyn Renderer>> {
        let scene = SkyScene::from_id(params.scene_id)?;
        let backdrop = match scene {
            SkyScene::Backdrop => Some(decode_backdrop(resources)?),
            SkyScene::Gradient | SkyScene::Checker => None,
        };
        Ok(Box::new(SkyRenderer {
            params: params.clone(),
            scene,
            backdrop,
        }))
    }
}

fn decode_backdrop(resources: &SharedResourceSet) -> RaypoolResult<image::RgbaImage> {
    let bytes = resources.get(BACKDROP_RESOURCE).ok_or_else(|| {
        RaypoolError::validation(format!(
            "backdrop scene requires the '{BACKDROP_RESOURCE}' resource"
        ))
    })?;
    let img = image::load_from_memory(bytes).context("decode backdrop resource")?;
    Ok(img.to_rgba8())
}

/// Procedural renderer for the [`SkyScene`] variants.
///
/// The scenes contain no geometry, so `accel` is accepted and has no effect.
pub struct SkyRenderer {
    params: RendererParams,
    scene: SkyScene,
    backdrop: Option<image::RgbaImage>,
}

impl SkyRenderer {
    fn radiance(&self, px: f32, py: f32) -> [f32; 3] {
        let depth = self.params.max_depth;
        if depth == 0 {
            return [0.0; 3];
        }
        let u = px / self.params.width.max(1) as f32;
        let v = py / self.params.height.max(1) as f32;

        match self.scene {
            SkyScene::Gradient => sky(v),
            SkyScene::Checker => {
                if v <= HORIZON {
                    return sky(v);
                }
                let cell = (px / CHECKER_CELL_PX).floor() as i64
                    + (py / CHECKER_CELL_PX).floor() as i64;
                let albedo = if cell.rem_euclid(2) == 0 { 0.8 } else { 0.3 };
                // One bounce off the ground needs depth >= 2; deeper paths add diminishing light.
                let gain = 1.0 - 0.5f32.powi(depth.saturating_sub(1).min(24) as i32);
                let horizon = sky(HORIZON);
                horizon.map(|c| c * albedo * gain)
            }
            SkyScene::Backdrop => match &self.backdrop {
                Some(img) => texel(img, u, v),
                None => sky(v),
            },
        }
    }

    fn pixel_sum(&self, x: u32, y: u32, seed: u64) -> [f32; 3] {
        let mut rng = SplitMix64::new(pixel_seed(seed, x, y));
        let mut sum = [0.0f32; 3];
        for _ in 0..self.params.samples_per_pixel {
            let px = x as f32 + rng.next_f32();
            let py = y as f32 + rng.next_f32();
            let c = self.radiance(px, py);
            for (s, c) in sum.iter_mut().zip(c) {
                *s += c;
            }
        }
        sum
    }
}

impl Renderer for SkyRenderer {
    fn accumulate(&mut self, seed: u64) -> RaypoolResult<Vec<f32>> {
        let mut out = Vec::with_capacity(self.params.accumulation_len());
        let alpha = self.params.samples_per_pixel as f32;
        for y in 0..self.params.height {
            for x in 0..self.params.width {
                let [r, g, b] = self.pixel_sum(x, y, seed);
                out.extend_from_slice(&[r, g, b, alpha]);
            }
        }
        Ok(out)
    }

    fn render_region(&mut self, region: Region, seed: u64) -> RaypoolResult<Vec<u8>> {
        if !region.fits_within(self.params.width, self.params.height) {
            return Err(RaypoolError::validation(format!(
                "region {region:?} exceeds {}x{} image",
                self.params.width, self.params.height
            )));
        }
        let scale = 1.0 / self.params.samples_per_pixel.max(1) as f32;
        let mut out = Vec::with_capacity(region.byte_len());
        for y in region.y..region.bottom() {
            for x in region.x..region.right() {
                let sum = self.pixel_sum(x, y, seed);
                for c in sum {
                    out.push(channel_to_byte(tone_map(c * scale)));
                }
                out.push(u8::MAX);
            }
        }
        Ok(out)
    }
}

fn sky(v: f32) -> [f32; 3] {
    let t = (1.0 - v).clamp(0.0, 1.0);
    [
        (1.0 - t) + SKY_ZENITH[0] * t,
        (1.0 - t) + SKY_ZENITH[1] * t,
        (1.0 - t) + SKY_ZENITH[2] * t,
    ]
}

fn texel(img: &image::RgbaImage, u: f32, v: f32) -> [f32; 3] {
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return [0.0; 3];
    }
    let x = ((u.clamp(0.0, 1.0) * w as f32) as u32).min(w - 1);
    let y = ((v.clamp(0.0, 1.0) * h as f32) as u32).min(h - 1);
    let p = img.get_pixel(x, y).0;
    // Approximate sRGB decode; the tone curve re-applies the matching sqrt.
    [p[0], p[1], p[2]].map(|c| {
        let c = f32::from(c) / 255.0;
        c * c
    })
}

#[cfg(test)]
#[path = "../../tests/unit/render/sky.rs"]
mod tests;
