#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new_default() -> Self {
        Self(Self::OFFSET_BASIS)
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Small deterministic generator for sub-pixel jitter. Not for anything security related.
#[derive(Clone, Debug)]
pub(crate) struct SplitMix64(u64);

impl SplitMix64 {
    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub(crate) fn next_f32(&mut self) -> f32 {
        // 24 high bits fill the f32 mantissa exactly.
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Derive a per-worker seed so partitions sample independent noise.
pub(crate) fn worker_seed(base: u64, worker: usize) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_u64(base);
    h.write_u64(worker as u64);
    h.finish()
}

/// Derive a per-pixel seed so a pixel's jitter does not depend on which worker renders it.
pub(crate) fn pixel_seed(base: u64, x: u32, y: u32) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_u64(base);
    h.write_u64((u64::from(y) << 32) | u64::from(x));
    h.finish()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
