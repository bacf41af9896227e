use crate::foundation::core::{FinalImage, RGBA_CHANNELS, Region};
use crate::foundation::error::{RaypoolError, RaypoolResult};

/// Upper bound of the tone curve; keeps `value * 256` below 256.
pub const TONE_MAX: f32 = 0.999;

/// Monotonic tone curve `clamp(sqrt(c), 0, 0.999)`.
///
/// Negative and NaN inputs map to `0`.
pub fn tone_map(c: f32) -> f32 {
    if c.is_nan() || c <= 0.0 {
        return 0.0;
    }
    c.sqrt().min(TONE_MAX)
}

/// Scale a tone-mapped value by 256 and truncate into a byte.
pub fn channel_to_byte(v: f32) -> u8 {
    // `as` saturates, so out-of-range inputs clamp to 0..=255.
    (v * 256.0) as u8
}

/// Combine whole-frame partial sums from every sample partition into the final image.
///
/// Each partial holds `width * height * 4` unnormalized sums. Color channels are summed across all
/// partials, divided by `total_samples`, tone mapped and converted to bytes. Alpha is always 255.
/// The result does not depend on the order of `partials` beyond floating-point rounding; sums are
/// carried in `f64` so that rounding stays far below one byte step.
pub fn aggregate_samples(
    partials: &[Vec<f32>],
    total_samples: u32,
    width: u32,
    height: u32,
) -> RaypoolResult<FinalImage> {
    if total_samples == 0 {
        return Err(RaypoolError::validation(
            "sample aggregation requires total_samples >= 1",
        ));
    }
    if partials.is_empty() {
        return Err(RaypoolError::aggregation_mismatch(
            "no partial buffers to aggregate",
        ));
    }

    let expected = Region::full(width, height).byte_len();
    for (i, p) in partials.iter().enumerate() {
        if p.len() != expected {
            return Err(RaypoolError::aggregation_mismatch(format!(
                "partial buffer {i} holds {} values, expected {expected} for {width}x{height}",
                p.len()
            )));
        }
    }

    let mut sums = vec![0.0f64; expected];
    for p in partials {
        for (s, &v) in sums.iter_mut().zip(p.iter()) {
            *s += f64::from(v);
        }
    }

    let scale = 1.0 / f64::from(total_samples);
    let mut data = vec![0u8; expected];
    for (out, sum) in data
        .chunks_exact_mut(RGBA_CHANNELS)
        .zip(sums.chunks_exact(RGBA_CHANNELS))
    {
        for c in 0..3 {
            out[c] = channel_to_byte(tone_map((sum[c] * scale) as f32));
        }
        out[3] = u8::MAX;
    }

    FinalImage::from_rgba8(width, height, data)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/aggregate.rs"]
mod tests;
