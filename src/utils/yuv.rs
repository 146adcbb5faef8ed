//! YUV420SP (NV21) frame averaging.
//!
//! Camera preview frames arrive as a full-resolution luma plane followed by an
//! interleaved V/U plane at half resolution in both directions. The pipeline
//! only needs the mean of each RGB channel over the whole frame.

use crate::sample::{IntensityMethod, Sample};
use crate::{Error, Result};

/// Upper clamp of the fixed-point RGB intermediate (18 bits)
const FIXED_POINT_MAX: i32 = 262_143;

/// Mean RGB channel values of one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelAverages {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
}

impl ChannelAverages {
    /// Turn the averages into a timestamped sample
    #[must_use]
    pub fn to_sample(self, timestamp_ms: i64, method: IntensityMethod) -> Sample {
        Sample::new(timestamp_ms, self.red, self.green, self.blue, method)
    }
}

/// Number of bytes an NV21 frame of the given size must hold, `None` on overflow
#[must_use]
pub fn required_len(width: usize, height: usize) -> Option<usize> {
    let chroma_rows = height.div_ceil(2);
    let chroma_row_len = width.checked_add(width % 2)?;
    width
        .checked_mul(height)?
        .checked_add(chroma_rows.checked_mul(chroma_row_len)?)
}

/// Convert one YUV triple to 8-bit RGB using the integer BT.601 coefficients
#[inline]
fn yuv_to_rgb(y: u8, u: i32, v: i32) -> (u32, u32, u32) {
    let y = (i32::from(y) - 16).max(0);
    let y1192 = 1192 * y;

    let red = (y1192 + 1634 * v).clamp(0, FIXED_POINT_MAX);
    let green = (y1192 - 833 * v - 400 * u).clamp(0, FIXED_POINT_MAX);
    let blue = (y1192 + 2066 * u).clamp(0, FIXED_POINT_MAX);

    // Keep the top 8 of 18 bits per channel; values are non-negative here
    #[allow(clippy::cast_sign_loss)]
    (
        ((red >> 10) & 0xff) as u32,
        ((green >> 10) & 0xff) as u32,
        ((blue >> 10) & 0xff) as u32,
    )
}

/// Average the RGB channels of an NV21 frame
///
/// # Errors
///
/// Returns `Error::InvalidInput` if a dimension is zero or the buffer is too
/// short for the given dimensions
#[allow(clippy::cast_precision_loss)] // Pixel sums fit comfortably in f64
pub fn average_rgb(data: &[u8], width: usize, height: usize) -> Result<ChannelAverages> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidInput(format!(
            "Invalid frame dimensions: {width}x{height}"
        )));
    }

    let needed = required_len(width, height).ok_or_else(|| {
        Error::InvalidInput(format!("Frame dimensions overflow: {width}x{height}"))
    })?;
    if data.len() < needed {
        return Err(Error::InvalidInput(format!(
            "Frame buffer too short: {} bytes for {}x{} (need {})",
            data.len(),
            width,
            height,
            needed
        )));
    }

    let frame_size = width * height;
    let (luma, chroma) = data.split_at(frame_size);
    let chroma_row_len = width + width % 2;

    let mut sums = (0u64, 0u64, 0u64);
    for (row_index, row) in luma.chunks_exact(width).enumerate() {
        let chroma_start = (row_index >> 1) * chroma_row_len;
        let chroma_row = &chroma[chroma_start..chroma_start + chroma_row_len];

        for (col, &y) in row.iter().enumerate() {
            let pair = (col >> 1) * 2;
            let v = i32::from(chroma_row[pair]) - 128;
            let u = i32::from(chroma_row[pair + 1]) - 128;

            let (r, g, b) = yuv_to_rgb(y, u, v);
            sums.0 += u64::from(r);
            sums.1 += u64::from(g);
            sums.2 += u64::from(b);
        }
    }

    let pixels = frame_size as f64;
    Ok(ChannelAverages {
        red: sums.0 as f64 / pixels,
        green: sums.1 as f64 / pixels,
        blue: sums.2 as f64 / pixels,
    })
}
