use crate::{
    error::Result,
    types::{PixelImage, ProbabilityGrid},
};

use super::{check_dimensions, into_image, is_positive};

/// Opaque black written over background pixels
pub const MASKED_PIXEL: [u8; 4] = [0, 0, 0, 255];

/// Hard cutout of the leaf from the resized source
#[derive(Debug, Clone)]
pub struct LeafIsolation {
    pub image: PixelImage,
    pub leaf_pixels: u32,
}

/// Keep pixels whose leaf probability is above `threshold`, black out the rest.
pub fn isolate_leaf(resized: &PixelImage, leaf: &ProbabilityGrid, threshold: f32) -> Result<LeafIsolation> {
    check_dimensions(resized, leaf, "leaf")?;

    let source = resized.as_raw();
    let mut buffer = vec![0u8; source.len()];
    let mut leaf_pixels = 0u32;

    for (index, &probability) in leaf.values().iter().enumerate() {
        let offset = index * 4;
        let target = &mut buffer[offset..offset + 4];
        if is_positive(probability, threshold) {
            target.copy_from_slice(&source[offset..offset + 4]);
            leaf_pixels += 1;
        } else {
            target.copy_from_slice(&MASKED_PIXEL);
        }
    }

    Ok(LeafIsolation {
        image: into_image(resized.width(), resized.height(), buffer)?,
        leaf_pixels,
    })
}
