use anyhow::{anyhow, Context, Result};
use image::RgbaImage;

use crate::core::coords::PixelRect;

/// Source of screen pixels for the detector.
pub trait ScreenCapture {
    /// Pixel size of the primary display.
    fn screen_size(&mut self) -> Result<(u32, u32)>;

    /// Capture `region` of the primary display, or all of it when `None`.
    fn capture(&mut self, region: Option<PixelRect>) -> Result<RgbaImage>;
}

/// Captures the primary monitor through xcap.
#[derive(Default)]
pub struct XcapScreen;

impl XcapScreen {
    pub fn new() -> Self {
        Self
    }

    fn grab_primary(&self) -> Result<RgbaImage> {
        let monitors = xcap::Monitor::all().map_err(|e| anyhow!("Failed to list monitors: {}", e))?;
        let monitor = pick_primary(&monitors, |m| m.is_primary().unwrap_or(false))
            .ok_or_else(|| anyhow!("No monitor available for capture"))?;
        let frame = monitor
            .capture_image()
            .map_err(|e| anyhow!("Failed to capture monitor: {}", e))?;

        RgbaImage::from_raw(frame.width(), frame.height(), frame.into_raw())
            .context("Captured frame has an invalid buffer size")
    }
}

impl ScreenCapture for XcapScreen {
    fn screen_size(&mut self) -> Result<(u32, u32)> {
        let frame = self.grab_primary()?;
        Ok(frame.dimensions())
    }

    fn capture(&mut self, region: Option<PixelRect>) -> Result<RgbaImage> {
        let frame = self.grab_primary()?;
        match region {
            None => Ok(frame),
            Some(rect) => crop_frame(&frame, rect),
        }
    }
}

/// The primary entry, or the first one when none says it is primary.
fn pick_primary<T>(monitors: &[T], is_primary: impl Fn(&T) -> bool) -> Option<&T> {
    monitors.iter().find(|m| is_primary(*m)).or_else(|| monitors.first())
}

/// Cut `rect` out of a full frame, rejecting rectangles that leave it.
pub fn crop_frame(frame: &RgbaImage, rect: PixelRect) -> Result<RgbaImage> {
    let (frame_w, frame_h) = frame.dimensions();
    if rect.right > frame_w || rect.bottom > frame_h {
        return Err(anyhow!(
            "Region {} is out of frame bounds ({}x{})",
            rect,
            frame_w,
            frame_h
        ));
    }
    Ok(image::imageops::crop_imm(frame, rect.left, rect.top, rect.width(), rect.height()).to_image())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn crop_keeps_pixels_at_offset() {
        let mut frame = RgbaImage::new(10, 10);
        frame.put_pixel(6, 7, Rgba([255, 0, 0, 255]));

        let rect = PixelRect {
            left: 5,
            top: 5,
            right: 9,
            bottom: 9,
        };
        let crop = crop_frame(&frame, rect).unwrap();

        assert_eq!(crop.dimensions(), (4, 4));
        assert_eq!(crop.get_pixel(1, 2), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn crop_rejects_out_of_bounds_region() {
        let frame = RgbaImage::new(10, 10);
        let rect = PixelRect {
            left: 5,
            top: 5,
            right: 11,
            bottom: 9,
        };
        assert!(crop_frame(&frame, rect).is_err());
    }

    #[test]
    fn primary_monitor_wins_over_order() {
        let monitors = [("left", false), ("main", true), ("right", false)];
        let picked = pick_primary(&monitors, |m| m.1).unwrap();
        assert_eq!(picked.0, "main");
    }

    #[test]
    fn falls_back_to_first_monitor() {
        let monitors = [("left", false), ("right", false)];
        assert_eq!(pick_primary(&monitors, |m| m.1).unwrap().0, "left");
        let none: [(&str, bool); 0] = [];
        assert!(pick_primary(&none, |m| m.1).is_none());
    }
}
