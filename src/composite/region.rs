use std::ops::Deref;

use crate::foundation::core::{FinalImage, RGBA_CHANNELS, Region};
use crate::foundation::error::{RaypoolError, RaypoolResult};

/// Copy a finished region buffer into `dest` at the offset implied by `region`.
///
/// `src` is tightly packed RGBA8 for the region alone. Pixels are copied unchanged; no
/// renormalization happens for region results.
pub fn copy_region(dest: &mut FinalImage, region: Region, src: &[u8]) -> RaypoolResult<()> {
    let dest_len = Region::full(dest.width, dest.height).byte_len();
    if dest.data.len() != dest_len {
        return Err(RaypoolError::aggregation_mismatch(format!(
            "destination buffer is {} bytes, expected {dest_len} for {}x{}",
            dest.data.len(),
            dest.width,
            dest.height
        )));
    }
    if !region.fits_within(dest.width, dest.height) {
        return Err(RaypoolError::aggregation_mismatch(format!(
            "region {region:?} exceeds {}x{} image",
            dest.width, dest.height
        )));
    }
    if src.len() != region.byte_len() {
        return Err(RaypoolError::aggregation_mismatch(format!(
            "region {region:?} buffer holds {} bytes, expected {}",
            src.len(),
            region.byte_len()
        )));
    }
    if region.is_empty() {
        return Ok(());
    }

    let dest_stride = dest.width as usize * RGBA_CHANNELS;
    let row_bytes = region.width as usize * RGBA_CHANNELS;
    let x_off = region.x as usize * RGBA_CHANNELS;
    for (row, src_row) in src.chunks_exact(row_bytes).enumerate() {
        let start = (region.y as usize + row) * dest_stride + x_off;
        dest.data[start..start + row_bytes].copy_from_slice(src_row);
    }
    Ok(())
}

/// Assemble a final image from disjoint finished regions.
///
/// Regions may arrive in any order; pixels not covered by any region stay opaque black. Parts can
/// be owned buffers or shared ones such as `Arc<Vec<u8>>`.
pub fn composite_regions<B>(
    width: u32,
    height: u32,
    parts: &[(Region, B)],
) -> RaypoolResult<FinalImage>
where
    B: Deref,
    B::Target: AsRef<[u8]>,
{
    let mut img = FinalImage::opaque(width, height);
    for (region, bytes) in parts {
        copy_region(&mut img, *region, bytes.deref().as_ref())?;
    }
    Ok(img)
}

#[cfg(test)]
#[path = "../../tests/unit/composite/region.rs"]
mod tests;
