//! Frame views and ROI color extraction.
//!
//! The pipeline never owns the incoming video frames; it borrows them for the
//! duration of one `process_frame` call. Grayscale frames needed across calls
//! (optical flow reads the previous frame) are copied into a `GrayBuffer`.

use crate::geometry::Rect;

/// Borrowed view of an interleaved RGB888 frame, row-major.
#[derive(Debug, Clone, Copy)]
pub struct RgbFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> RgbFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        debug_assert!(data.len() >= (width * height * 3) as usize);
        Self { data, width, height }
    }

    /// Mean [R, G, B] over `roi` clipped to the frame bounds.
    ///
    /// Returns `[0.0; 3]` when the clipped region is empty.
    pub fn mean_rgb(&self, roi: Rect) -> [f32; 3] {
        let x0 = roi.x.max(0.0) as u32;
        let y0 = roi.y.max(0.0) as u32;
        let x1 = ((roi.x + roi.width) as u32).min(self.width);
        let y1 = ((roi.y + roi.height) as u32).min(self.height);

        let mut sum = [0.0f64; 3];
        let mut count = 0u64;
        let stride = (self.width * 3) as usize;

        for y in y0..y1 {
            let row = y as usize * stride;
            for x in x0..x1 {
                let idx = row + x as usize * 3;
                sum[0] += self.data[idx] as f64;
                sum[1] += self.data[idx + 1] as f64;
                sum[2] += self.data[idx + 2] as f64;
                count += 1;
            }
        }

        if count > 0 {
            let inv = 1.0 / count as f64;
            [
                (sum[0] * inv) as f32,
                (sum[1] * inv) as f32,
                (sum[2] * inv) as f32,
            ]
        } else {
            [0.0, 0.0, 0.0]
        }
    }
}

/// Borrowed view of an 8-bit grayscale frame, row-major.
#[derive(Debug, Clone, Copy)]
pub struct GrayFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

impl<'a> GrayFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        debug_assert!(data.len() >= (width * height) as usize);
        Self { data, width, height }
    }

    pub fn to_owned(&self) -> GrayBuffer {
        GrayBuffer {
            data: self.data[..(self.width * self.height) as usize].to_vec(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Owned grayscale frame, kept between calls for optical flow.
#[derive(Debug, Clone)]
pub struct GrayBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayBuffer {
    pub fn view(&self) -> GrayFrame<'_> {
        GrayFrame {
            data: &self.data,
            width: self.width,
            height: self.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_rgb_uniform() {
        let frame: Vec<u8> = vec![
            128, 64, 32, 128, 64, 32, //
            128, 64, 32, 128, 64, 32,
        ];
        let view = RgbFrame::new(&frame, 2, 2);
        let rgb = view.mean_rgb(Rect::new(0.0, 0.0, 2.0, 2.0));
        assert_relative_eq!(rgb[0], 128.0, epsilon = 0.01);
        assert_relative_eq!(rgb[1], 64.0, epsilon = 0.01);
        assert_relative_eq!(rgb[2], 32.0, epsilon = 0.01);
    }

    #[test]
    fn test_mean_rgb_clips_to_frame() {
        let frame: Vec<u8> = vec![10; 4 * 4 * 3];
        let view = RgbFrame::new(&frame, 4, 4);
        let rgb = view.mean_rgb(Rect::new(2.0, 2.0, 10.0, 10.0));
        assert_relative_eq!(rgb[0], 10.0, epsilon = 0.01);
    }

    #[test]
    fn test_mean_rgb_empty_roi() {
        let frame: Vec<u8> = vec![10; 4 * 4 * 3];
        let view = RgbFrame::new(&frame, 4, 4);
        let rgb = view.mean_rgb(Rect::new(10.0, 10.0, 2.0, 2.0));
        assert_eq!(rgb, [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_gray_roundtrip() {
        let data: Vec<u8> = (0..16).collect();
        let view = GrayFrame::new(&data, 4, 4);
        let owned = view.to_owned();
        assert_eq!(owned.view().data, &data[..]);
    }
}
