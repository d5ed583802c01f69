//! Resize dimension math.
//!
//! Crop mode scales the image until it covers the box, then takes the centered
//! box. Non-crop mode fits the image inside the box keeping its aspect ratio.
//! A zero bound means "unconstrained" on that axis. Upscaling is refused.

/// Source rectangle and output size of a resize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeDims {
    pub src_x: u32,
    pub src_y: u32,
    pub src_w: u32,
    pub src_h: u32,
    pub dst_w: u32,
    pub dst_h: u32,
}

/// Scale `(width, height)` down to fit within `(max_width, max_height)`.
pub fn constrain_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if max_width == 0 && max_height == 0 {
        return (width, height);
    }

    let mut width_ratio = 1.0_f64;
    let mut height_ratio = 1.0_f64;
    if max_width > 0 && width > 0 && width > max_width {
        width_ratio = max_width as f64 / width as f64;
    }
    if max_height > 0 && height > 0 && height > max_height {
        height_ratio = max_height as f64 / height as f64;
    }

    let smaller = width_ratio.min(height_ratio);
    let larger = width_ratio.max(height_ratio);

    let overflows = |ratio: f64| {
        (width as f64 * ratio).round() as u32 > max_width
            || (height as f64 * ratio).round() as u32 > max_height
    };
    let ratio = if overflows(larger) { smaller } else { larger };

    let w = ((width as f64 * ratio).round() as u32).max(1);
    let h = ((height as f64 * ratio).round() as u32).max(1);
    (w, h)
}

/// Work out how an `orig_w`x`orig_h` image becomes a `dest_w`x`dest_h` size.
///
/// Returns `None` when the result would not be smaller than the original.
pub fn resize_dimensions(
    orig_w: u32,
    orig_h: u32,
    dest_w: u32,
    dest_h: u32,
    crop: bool,
) -> Option<ResizeDims> {
    if orig_w == 0 || orig_h == 0 || (dest_w == 0 && dest_h == 0) {
        return None;
    }

    let dims = if crop {
        let aspect = orig_w as f64 / orig_h as f64;
        let mut new_w = dest_w.min(orig_w);
        let mut new_h = dest_h.min(orig_h);
        if new_w == 0 {
            new_w = (new_h as f64 * aspect).round() as u32;
        }
        if new_h == 0 {
            new_h = (new_w as f64 / aspect).round() as u32;
        }
        if new_w == 0 || new_h == 0 {
            return None;
        }

        let size_ratio = (new_w as f64 / orig_w as f64).max(new_h as f64 / orig_h as f64);
        let crop_w = ((new_w as f64 / size_ratio).round() as u32).min(orig_w);
        let crop_h = ((new_h as f64 / size_ratio).round() as u32).min(orig_h);

        ResizeDims {
            src_x: (orig_w - crop_w) / 2,
            src_y: (orig_h - crop_h) / 2,
            src_w: crop_w,
            src_h: crop_h,
            dst_w: new_w,
            dst_h: new_h,
        }
    } else {
        let (new_w, new_h) = constrain_dimensions(orig_w, orig_h, dest_w, dest_h);
        ResizeDims {
            src_x: 0,
            src_y: 0,
            src_w: orig_w,
            src_h: orig_h,
            dst_w: new_w,
            dst_h: new_h,
        }
    };

    if dims.dst_w >= orig_w && dims.dst_h >= orig_h {
        return None;
    }
    // Within a pixel of the original on both axes counts as the same size.
    if dims.dst_w.abs_diff(orig_w) <= 1 && dims.dst_h.abs_diff(orig_h) <= 1 {
        return None;
    }

    Some(dims)
}
