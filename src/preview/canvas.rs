use std::sync::mpsc::RecvTimeoutError;
use std::time::{Duration, Instant};

use crate::composite::region::copy_region;
use crate::foundation::core::{FinalImage, RequestId};
use crate::foundation::error::{RaypoolError, RaypoolResult};
use crate::preview::channel::{PreviewEvent, PreviewReceiver};

/// Consumer-side image assembled from preview events, redrawn on the consumer's own schedule.
#[derive(Clone, Debug)]
pub struct PreviewCanvas {
    image: FinalImage,
    covered: Vec<bool>,
    covered_count: usize,
    request: Option<RequestId>,
    events: usize,
}

impl PreviewCanvas {
    /// Opaque black canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        let image = FinalImage::opaque(width, height);
        let pixels = width as usize * height as usize;
        Self {
            image,
            covered: vec![false; pixels],
            covered_count: 0,
            request: None,
            events: 0,
        }
    }

    /// Paint one event. An event from a newer request starts a fresh frame.
    pub fn apply(&mut self, ev: &PreviewEvent) -> RaypoolResult<()> {
        if ev.image_width != self.image.width {
            return Err(RaypoolError::validation(format!(
                "preview event for a {}px wide image, canvas is {}px",
                ev.image_width, self.image.width
            )));
        }
        if self.request != Some(ev.request) {
            if self.request.is_some() {
                self.reset();
            }
            self.request = Some(ev.request);
        }
        copy_region(&mut self.image, ev.region, &ev.pixels)?;

        let w = self.image.width as usize;
        for y in ev.region.y..ev.region.bottom() {
            let row = y as usize * w;
            for x in ev.region.x..ev.region.right() {
                let seen = &mut self.covered[row + x as usize];
                if !*seen {
                    *seen = true;
                    self.covered_count += 1;
                }
            }
        }
        self.events += 1;
        Ok(())
    }

    /// Apply every event already queued on `rx` without blocking. Returns how many were applied.
    pub fn drain(&mut self, rx: &PreviewReceiver) -> RaypoolResult<usize> {
        let mut n = 0;
        while let Some(ev) = rx.try_recv() {
            self.apply(&ev)?;
            n += 1;
        }
        Ok(n)
    }

    /// Receive until every sender is gone, calling `redraw` at most once per `cadence` and once at
    /// the end.
    pub fn run_until_disconnected<F>(
        &mut self,
        rx: &PreviewReceiver,
        cadence: Duration,
        mut redraw: F,
    ) -> RaypoolResult<()>
    where
        F: FnMut(&PreviewCanvas),
    {
        let mut last = Instant::now();
        let mut dirty = false;
        loop {
            match rx.recv_timeout(cadence) {
                Ok(ev) => {
                    self.apply(&ev)?;
                    self.drain(rx)?;
                    dirty = true;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if dirty && last.elapsed() >= cadence {
                redraw(self);
                last = Instant::now();
                dirty = false;
            }
        }
        redraw(self);
        Ok(())
    }

    /// Rows whose every pixel has been painted.
    pub fn covered_rows(&self) -> u32 {
        let w = self.image.width as usize;
        if w == 0 {
            return 0;
        }
        self.covered
            .chunks_exact(w)
            .filter(|row| row.iter().all(|c| *c))
            .count() as u32
    }

    /// Fraction of pixels painted so far, in `[0, 1]`.
    pub fn coverage(&self) -> f32 {
        if self.covered.is_empty() {
            return 1.0;
        }
        self.covered_count as f32 / self.covered.len() as f32
    }

    /// Return `true` once every pixel has been painted.
    pub fn is_complete(&self) -> bool {
        self.covered_count == self.covered.len()
    }

    /// Events applied since the current frame started.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Request currently shown.
    pub fn request(&self) -> Option<RequestId> {
        self.request
    }

    /// Current pixels.
    pub fn image(&self) -> &FinalImage {
        &self.image
    }

    /// Take the pixels, consuming the canvas.
    pub fn into_image(self) -> FinalImage {
        self.image
    }

    fn reset(&mut self) {
        self.image = FinalImage::opaque(self.image.width, self.image.height);
        self.covered.fill(false);
        self.covered_count = 0;
        self.events = 0;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/preview/canvas.rs"]
mod tests;
