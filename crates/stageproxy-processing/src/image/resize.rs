use image::{DynamicImage, GenericImageView};

use crate::dimensions::ResizeDims;

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Cut the source rectangle out of `img` and scale it to the output size.
    pub fn apply(img: &DynamicImage, dims: ResizeDims) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let region = if (dims.src_x, dims.src_y, dims.src_w, dims.src_h)
            == (0, 0, orig_width, orig_height)
        {
            img.clone()
        } else {
            img.crop_imm(dims.src_x, dims.src_y, dims.src_w, dims.src_h)
        };

        let filter = Self::select_filter(dims.src_w, dims.src_h, dims.dst_w, dims.dst_h);
        region.resize_exact(dims.dst_w, dims.dst_h, filter)
    }
}
