// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge sampling for smart stretch.

use bleedwerk_core::types::{Color, Side};

use crate::analysis::stats::mean_color;
use crate::raster::RasterSample;

/// Pixels averaged along a strip when sampling its end for a corner.
pub const EDGE_SAMPLE_WINDOW: usize = 4;

/// The stripe `inset` pixels in from `side`, with the first and last `inset`
/// entries replaced by the nearest clean sample.
///
/// Returns `None` when the raster is too small to leave any clean pixels.
pub fn sample_strip(raster: &RasterSample, side: Side, inset: u32) -> Option<Vec<Color>> {
    let depth = raster.depth(side);
    if depth <= 2 * inset {
        return None;
    }
    let mut strip = raster.line(side, inset);
    let inset = inset as usize;
    if strip.len() <= 2 * inset {
        return None;
    }
    let last = strip.len() - 1;
    let (head, tail) = (strip[inset], strip[last - inset]);
    for i in 0..inset {
        strip[i] = head;
        strip[last - i] = tail;
    }
    Some(strip)
}

/// Mean of the strip's pixels starting at `offset`, over
/// [`EDGE_SAMPLE_WINDOW`] entries toward the strip's far end.
pub fn sample_edge(strip: &[Color], offset: usize) -> Color {
    if strip.is_empty() {
        return Color::WHITE;
    }
    let start = offset.min(strip.len() - 1);
    let end = (start + EDGE_SAMPLE_WINDOW).min(strip.len());
    mean_color(strip[start..end].iter().copied()).unwrap_or(strip[start])
}

/// [`sample_edge`] measured from the strip's last pixel backwards.
pub fn sample_edge_from_end(strip: &[Color], offset: usize) -> Color {
    let reversed: Vec<Color> = strip.iter().rev().copied().collect();
    sample_edge(&reversed, offset)
}

/// Per-channel mean of two colors, rounded half up.
pub fn blend(a: Color, b: Color) -> Color {
    let avg = |x: u8, y: u8| ((x as u16 + y as u16 + 1) / 2) as u8;
    match (a, b) {
        (Color::Gray(x), Color::Gray(y)) => Color::Gray(avg(x, y)),
        (a, b) => {
            let (a, b) = (a.to_rgb(), b.to_rgb());
            Color::Rgb([avg(a[0], b[0]), avg(a[1], b[1]), avg(a[2], b[2])])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn ramp(width: u32, height: u32) -> RasterSample {
        RasterSample::from_gray(
            GrayImage::from_fn(width, height, |x, y| Luma([(x * 10 + y) as u8])),
            72.0,
        )
    }

    #[test]
    fn strip_ends_are_clamped_to_clean_pixels() {
        let raster = ramp(10, 8);
        let strip = sample_strip(&raster, Side::Top, 2).unwrap();
        assert_eq!(strip.len(), 10);
        assert_eq!(strip[0], Color::Gray(22));
        assert_eq!(strip[1], Color::Gray(22));
        assert_eq!(strip[2], Color::Gray(22));
        assert_eq!(strip[5], Color::Gray(52));
        assert_eq!(strip[9], Color::Gray(72));
    }

    #[test]
    fn strip_needs_room_for_the_inset() {
        let raster = ramp(10, 4);
        assert!(sample_strip(&raster, Side::Top, 2).is_none());
        assert!(sample_strip(&raster, Side::Left, 2).is_none());
        assert!(sample_strip(&raster, Side::Left, 1).is_some());
    }

    #[test]
    fn edge_sample_averages_a_window() {
        let strip: Vec<Color> = (0..10).map(|v| Color::Gray(v * 10)).collect();
        assert_eq!(sample_edge(&strip, 2), Color::Gray(35));
        assert_eq!(sample_edge_from_end(&strip, 0), Color::Gray(75));
        assert_eq!(sample_edge(&strip, 50), Color::Gray(90));
    }

    #[test]
    fn blend_rounds_half_up() {
        assert_eq!(blend(Color::Gray(1), Color::Gray(2)), Color::Gray(2));
        assert_eq!(
            blend(Color::Rgb([0, 10, 255]), Color::Gray(100)),
            Color::Rgb([50, 55, 178])
        );
    }
}
