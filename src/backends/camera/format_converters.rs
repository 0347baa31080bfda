// SPDX-License-Identifier: GPL-3.0-only
//! Pixel format conversion to 8-bit luma
//!
//! Barcode decoding works on luminance only, so every capture format is
//! reduced to a tightly packed grayscale plane as early as possible.

use tracing::trace;

/// Capture layouts the native backend knows how to reduce to luma
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LumaLayout {
    /// 8-bit grayscale (`GREY`)
    Grey,
    /// Packed 4:2:2, Y0 U Y1 V (`YUYV`)
    Yuyv,
    /// Packed 4:2:2, U Y0 V Y1 (`UYVY`)
    Uyvy,
    /// Motion JPEG, one JPEG image per buffer (`MJPG`)
    Mjpeg,
}

impl LumaLayout {
    /// Preference order when negotiating a capture format
    pub const PREFERRED: [LumaLayout; 4] = [
        LumaLayout::Yuyv,
        LumaLayout::Grey,
        LumaLayout::Uyvy,
        LumaLayout::Mjpeg,
    ];

    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"GREY" => Some(LumaLayout::Grey),
            b"YUYV" => Some(LumaLayout::Yuyv),
            b"UYVY" => Some(LumaLayout::Uyvy),
            b"MJPG" => Some(LumaLayout::Mjpeg),
            _ => None,
        }
    }

    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            LumaLayout::Grey => b"GREY",
            LumaLayout::Yuyv => b"YUYV",
            LumaLayout::Uyvy => b"UYVY",
            LumaLayout::Mjpeg => b"MJPG",
        }
    }

    /// Bytes per pixel on the luma-carrying rows (0 for compressed formats)
    fn bytes_per_pixel(&self) -> usize {
        match self {
            LumaLayout::Grey => 1,
            LumaLayout::Yuyv | LumaLayout::Uyvy => 2,
            LumaLayout::Mjpeg => 0,
        }
    }

    /// Offset of the luma byte inside a pixel
    fn luma_offset(&self) -> usize {
        match self {
            LumaLayout::Uyvy => 1,
            _ => 0,
        }
    }
}

/// Convert a captured buffer to packed luma
///
/// `stride` is the number of bytes per row including padding; pass 0 to
/// derive it from the width. Returns `None` when the buffer is truncated or
/// cannot be decoded.
pub fn to_luma(
    layout: LumaLayout,
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> Option<Vec<u8>> {
    if layout == LumaLayout::Mjpeg {
        return mjpeg_to_luma(data, width, height);
    }

    let w = width as usize;
    let h = height as usize;
    let bpp = layout.bytes_per_pixel();
    let offset = layout.luma_offset();
    let stride = if stride == 0 { w * bpp } else { stride as usize };

    if stride < w * bpp || data.len() < stride * h.saturating_sub(1) + w * bpp {
        trace!(
            len = data.len(),
            width,
            height,
            stride,
            "Buffer too short for frame"
        );
        return None;
    }

    let mut luma = Vec::with_capacity(w * h);
    for y in 0..h {
        let row = &data[y * stride..y * stride + w * bpp];
        if bpp == 1 {
            luma.extend_from_slice(row);
        } else {
            luma.extend(row.chunks_exact(bpp).map(|px| px[offset]));
        }
    }

    Some(luma)
}

/// Decode a Motion JPEG buffer to luma
fn mjpeg_to_luma(data: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let image = image::load_from_memory_with_format(data, image::ImageFormat::Jpeg)
        .map_err(|e| trace!(error = %e, "Failed to decode MJPEG frame"))
        .ok()?;
    let gray = image.to_luma8();
    if gray.width() != width || gray.height() != height {
        trace!(
            got_width = gray.width(),
            got_height = gray.height(),
            width,
            height,
            "MJPEG frame size does not match negotiated format"
        );
    }
    Some(gray.into_raw())
}
