use crate::foundation::error::{RaypoolError, RaypoolResult};

/// Bytes per RGBA8 pixel.
pub const RGBA_CHANNELS: usize = 4;

/// Stable identity of a worker within one pool (0-based slot index).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct WorkerId(pub usize);

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic identity of one render request on a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Axis-aligned pixel rectangle `[x, x+width) x [y, y+height)`, row 0 at the top.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Region {
    /// Left column.
    pub x: u32,
    /// Top row.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Region {
    /// Create a region from its origin and extent.
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` image.
    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Number of pixels covered.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }

    /// Length of a tightly packed RGBA8 buffer for this region.
    pub fn byte_len(self) -> usize {
        self.pixel_count().saturating_mul(RGBA_CHANNELS)
    }

    /// Exclusive bottom row.
    pub fn bottom(self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Exclusive right column.
    pub fn right(self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Return `true` when the region has no pixels.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Return `true` when the region lies inside a `width x height` image.
    pub fn fits_within(self, width: u32, height: u32) -> bool {
        u64::from(self.x) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.y) + u64::from(self.height) <= u64::from(height)
    }

    /// Return `true` when the two regions share at least one pixel.
    pub fn overlaps(self, other: Region) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

/// Final composited image: tightly packed RGBA8, row-major, alpha always 255.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FinalImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height * 4` bytes.
    pub data: Vec<u8>,
}

impl FinalImage {
    /// Opaque black image of the given size.
    pub fn opaque(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; Region::full(width, height).byte_len()];
        for px in data.chunks_exact_mut(RGBA_CHANNELS) {
            px[3] = u8::MAX;
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap an existing buffer, validating its length.
    pub fn from_rgba8(width: u32, height: u32, data: Vec<u8>) -> RaypoolResult<Self> {
        let expected = Region::full(width, height).byte_len();
        if data.len() != expected {
            return Err(RaypoolError::aggregation_mismatch(format!(
                "image buffer is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// RGBA8 value of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * RGBA_CHANNELS;
        let px = self.data.get(i..i + RGBA_CHANNELS)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
