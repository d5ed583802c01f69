//! Byte-level image transformer: decode, resize, re-encode.

use std::io::Cursor;

use image::{DynamicImage, GenericImageView, ImageFormat};

use crate::dimensions::resize_dimensions;
use crate::image::resize::ImageResize;

pub struct ImageTransformer;

impl ImageTransformer {
    /// Decode any supported image from memory.
    pub fn decode(data: &[u8]) -> Result<DynamicImage, image::ImageError> {
        image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(image::ImageError::IoError)?
            .decode()
    }

    /// Pixel size of an encoded image, `None` when it cannot be decoded.
    pub fn dimensions(data: &[u8]) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }

    /// Output format for a file extension, defaulting to the source's own format.
    pub fn format_for_extension(extension: &str, data: &[u8]) -> ImageFormat {
        ImageFormat::from_extension(extension)
            .or_else(|| image::guess_format(data).ok())
            .unwrap_or(ImageFormat::Jpeg)
    }

    /// Produce the `width`x`height` variant of `data`.
    ///
    /// When the requested size would not shrink the image the pixels are
    /// re-encoded unchanged.
    pub fn resize_variant(
        data: &[u8],
        width: u32,
        height: u32,
        crop: bool,
        format: ImageFormat,
    ) -> Result<Vec<u8>, image::ImageError> {
        let img = Self::decode(data)?;
        Self::resize_decoded(img, width, height, crop, format)
    }

    /// [`resize_variant`](Self::resize_variant) for an already decoded image.
    pub fn resize_decoded(
        img: DynamicImage,
        width: u32,
        height: u32,
        crop: bool,
        format: ImageFormat,
    ) -> Result<Vec<u8>, image::ImageError> {
        let (orig_width, orig_height) = img.dimensions();

        let output = match resize_dimensions(orig_width, orig_height, width, height, crop) {
            Some(dims) => {
                tracing::debug!(
                    orig_width,
                    orig_height,
                    width = dims.dst_w,
                    height = dims.dst_h,
                    crop,
                    "Resizing image"
                );
                ImageResize::apply(&img, dims)
            }
            None => {
                tracing::debug!(
                    orig_width,
                    orig_height,
                    width,
                    height,
                    "Requested size does not shrink the image, keeping original pixels"
                );
                img
            }
        };

        Self::encode(output, format)
    }

    fn encode(img: DynamicImage, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
        let img = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
            _ => img,
        };
        let (width, height) = img.dimensions();
        let mut buffer = Vec::with_capacity(Self::encode_capacity(width, height));
        img.write_to(&mut Cursor::new(&mut buffer), format)?;
        Ok(buffer)
    }

    /// Output buffer hint: three bytes per pixel, computed without `u32` overflow.
    fn encode_capacity(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }
}
