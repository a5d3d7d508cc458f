use crate::{
    error::Result,
    traits::HighlightPolicy,
    types::{PixelImage, ProbabilityGrid},
};

use super::{DEFAULT_BRIGHTEN_GAIN, DEFAULT_DARKEN_FACTOR, check_dimensions, into_image, is_positive, scale_channel};

/// Disease-highlighted copy of the resized source
#[derive(Debug, Clone)]
pub struct DiseaseHighlight {
    pub image: PixelImage,
    pub diseased_pixels: u32,
}

/// A pixel is diseased when both its leaf and disease probabilities are
/// above threshold. Diseased pixels go through `policy.diseased`, all others
/// through `policy.background`.
pub fn highlight_disease(
    resized: &PixelImage,
    leaf: &ProbabilityGrid,
    disease: &ProbabilityGrid,
    leaf_threshold: f32,
    disease_threshold: f32,
    policy: &dyn HighlightPolicy,
) -> Result<DiseaseHighlight> {
    check_dimensions(resized, leaf, "leaf")?;
    check_dimensions(resized, disease, "disease")?;

    let source = resized.as_raw();
    let mut buffer = vec![0u8; source.len()];
    let mut diseased_pixels = 0u32;

    let cells = leaf.values().iter().zip(disease.values());
    for (index, (&leaf_p, &disease_p)) in cells.enumerate() {
        let offset = index * 4;
        let pixel = [
            source[offset],
            source[offset + 1],
            source[offset + 2],
            source[offset + 3],
        ];

        let out = if is_positive(leaf_p, leaf_threshold) && is_positive(disease_p, disease_threshold) {
            diseased_pixels += 1;
            policy.diseased(pixel)
        } else {
            policy.background(pixel)
        };
        buffer[offset..offset + 4].copy_from_slice(&out);
    }

    Ok(DiseaseHighlight {
        image: into_image(resized.width(), resized.height(), buffer)?,
        diseased_pixels,
    })
}

/// Brightens diseased pixels and darkens everything else, uniformly per RGB
/// channel. Alpha passes through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrightenDarkenHighlighter {
    pub gain: f32,
    pub attenuation: f32,
}

impl BrightenDarkenHighlighter {
    pub fn new(gain: f32, attenuation: f32) -> Self {
        Self { gain, attenuation }
    }
}

impl Default for BrightenDarkenHighlighter {
    fn default() -> Self {
        Self::new(DEFAULT_BRIGHTEN_GAIN, DEFAULT_DARKEN_FACTOR)
    }
}

impl HighlightPolicy for BrightenDarkenHighlighter {
    fn diseased(&self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        [
            scale_channel(r, self.gain),
            scale_channel(g, self.gain),
            scale_channel(b, self.gain),
            a,
        ]
    }

    fn background(&self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        [
            scale_channel(r, self.attenuation),
            scale_channel(g, self.attenuation),
            scale_channel(b, self.attenuation),
            a,
        ]
    }

    fn name(&self) -> &'static str {
        "brighten_darken"
    }
}

/// Boosts only the red channel of diseased pixels; other pixels are copied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RedChannelHighlighter {
    pub gain: f32,
}

impl Default for RedChannelHighlighter {
    fn default() -> Self {
        Self { gain: 1.5 }
    }
}

impl HighlightPolicy for RedChannelHighlighter {
    fn diseased(&self, [r, g, b, a]: [u8; 4]) -> [u8; 4] {
        [scale_channel(r, self.gain), g, b, a]
    }

    fn background(&self, pixel: [u8; 4]) -> [u8; 4] {
        pixel
    }

    fn name(&self) -> &'static str {
        "red_channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::INPUT_SIZE;
    use image::{Rgba, RgbaImage};

    fn grid(value: f32) -> ProbabilityGrid {
        ProbabilityGrid::filled(INPUT_SIZE, INPUT_SIZE, value)
    }

    fn uniform(pixel: [u8; 4]) -> PixelImage {
        RgbaImage::from_pixel(INPUT_SIZE, INPUT_SIZE, Rgba(pixel))
    }

    #[test]
    fn test_all_diseased_brightens_and_clamps() {
        let resized = uniform([255, 200, 100, 42]);
        let policy = BrightenDarkenHighlighter::default();

        let result = highlight_disease(&resized, &grid(1.0), &grid(1.0), 0.5, 0.5, &policy).expect("Should fuse");
        assert_eq!(result.diseased_pixels, INPUT_SIZE * INPUT_SIZE);
        assert!(result.image.pixels().all(|p| p.0 == [255, 220, 110, 42]));
    }

    #[test]
    fn test_healthy_leaf_is_darkened() {
        let resized = uniform([200, 101, 0, 255]);
        let policy = BrightenDarkenHighlighter::default();

        let result = highlight_disease(&resized, &grid(1.0), &grid(0.0), 0.5, 0.5, &policy).expect("Should fuse");
        assert_eq!(result.diseased_pixels, 0);
        assert!(result.image.pixels().all(|p| p.0 == [100, 50, 0, 255]));
    }

    #[test]
    fn test_disease_outside_leaf_is_not_counted() {
        let resized = uniform([50, 50, 50, 255]);
        let policy = BrightenDarkenHighlighter::default();

        let result = highlight_disease(&resized, &grid(0.0), &grid(1.0), 0.5, 0.5, &policy).expect("Should fuse");
        assert_eq!(result.diseased_pixels, 0);
    }

    #[test]
    fn test_count_requires_both_strictly_above() {
        let leaf = ProbabilityGrid::from_fn(8, 8, |x, _| if x < 4 { 0.9 } else { 0.5 });
        let disease = ProbabilityGrid::from_fn(8, 8, |_, y| if y < 2 { 0.51 } else { 0.5 });
        let resized = RgbaImage::from_pixel(8, 8, Rgba([10, 10, 10, 255]));

        let result = highlight_disease(&resized, &leaf, &disease, 0.5, 0.5, &BrightenDarkenHighlighter::default())
            .expect("Should fuse");
        assert_eq!(result.diseased_pixels, 4 * 2);
        assert_eq!(result.image.get_pixel(0, 0).0, [11, 11, 11, 255]);
        assert_eq!(result.image.get_pixel(5, 0).0, [5, 5, 5, 255]);
    }

    #[test]
    fn test_red_channel_variant() {
        let resized = uniform([200, 30, 40, 255]);
        let policy = RedChannelHighlighter::default();

        let diseased = highlight_disease(&resized, &grid(1.0), &grid(1.0), 0.5, 0.5, &policy).expect("Should fuse");
        assert_eq!(diseased.image.get_pixel(0, 0).0, [255, 30, 40, 255]);

        let healthy = highlight_disease(&resized, &grid(1.0), &grid(0.0), 0.5, 0.5, &policy).expect("Should fuse");
        assert_eq!(healthy.image, resized);
    }

    #[test]
    fn test_output_does_not_alias_source() {
        let resized = uniform([80, 80, 80, 255]);
        let before = resized.clone();
        let mut result = highlight_disease(
            &resized,
            &grid(1.0),
            &grid(1.0),
            0.5,
            0.5,
            &BrightenDarkenHighlighter::default(),
        )
        .expect("Should fuse");

        result.image.put_pixel(0, 0, Rgba([1, 2, 3, 4]));
        assert_eq!(resized, before);
    }
}
