use crate::foundation::core::{Region, WorkerId};
use crate::foundation::error::{RaypoolError, RaypoolResult};

/// One assignable piece of a render request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkUnit {
    /// Whole-frame render with a reduced per-pixel sample budget.
    SamplePartition {
        /// Samples per pixel for this unit.
        sample_count: u32,
    },
    /// Sub-image render at full quality.
    Region(Region),
}

/// Output of one worker for one [`WorkUnit`].
#[derive(Clone, Debug, PartialEq)]
pub enum PartialResult {
    /// Unnormalized whole-frame RGBA sums (for [`WorkUnit::SamplePartition`]).
    Accumulated(Vec<f32>),
    /// Finished RGBA8 bytes of the unit's region (for [`WorkUnit::Region`]).
    Rgba8(Vec<u8>),
}

/// Split `total` samples over `workers` slots by round-robin increment.
///
/// One sample is added to the current slot, then the slot advances (wrapping) until all samples
/// are assigned. The counts sum to `total` exactly and differ by at most one; when
/// `workers > total` the trailing slots get zero.
pub fn partition_samples(total: u32, workers: usize) -> RaypoolResult<Vec<u32>> {
    if workers == 0 {
        return Err(RaypoolError::validation(
            "sample partition requires at least one worker",
        ));
    }
    let mut counts = vec![0u32; workers];
    let mut slot = 0usize;
    for _ in 0..total {
        counts[slot] += 1;
        slot = (slot + 1) % workers;
    }
    Ok(counts)
}

/// Pair each non-empty sample count with its worker slot; zero-sample slots are skipped.
pub fn sample_units(counts: &[u32]) -> Vec<(WorkerId, WorkUnit)> {
    counts
        .iter()
        .enumerate()
        .filter(|(_, c)| **c > 0)
        .map(|(i, &c)| (WorkerId(i), WorkUnit::SamplePartition { sample_count: c }))
        .collect()
}

/// Split a `width x height` image into full-width horizontal strips of at most `strip_height` rows.
///
/// Strips are returned top to bottom; only the last one may be shorter.
pub fn partition_scanlines(
    width: u32,
    height: u32,
    strip_height: u32,
) -> RaypoolResult<Vec<Region>> {
    if strip_height == 0 {
        return Err(RaypoolError::validation("scanline strip height must be >= 1"));
    }
    let mut strips = Vec::with_capacity(height.div_ceil(strip_height) as usize);
    let mut y = 0u32;
    while y < height {
        let h = strip_height.min(height - y);
        strips.push(Region::new(0, y, width, h));
        y += h;
    }
    Ok(strips)
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/partition.rs"]
mod tests;
