// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-channel color statistics over pixel runs.

use bleedwerk_core::types::Color;

/// Per-channel median. Gray when every sample is gray.
///
/// For even counts the upper of the two middle values is taken. Returns
/// `None` for an empty run.
pub fn median_color(samples: &[Color]) -> Option<Color> {
    if samples.is_empty() {
        return None;
    }
    if let Some(grays) = all_gray(samples) {
        return Some(Color::Gray(median_channel(grays)));
    }
    let mut median = [0u8; 3];
    for (channel, slot) in median.iter_mut().enumerate() {
        *slot = median_channel(samples.iter().map(|c| c.to_rgb()[channel]).collect());
    }
    Some(Color::Rgb(median))
}

/// Per-channel arithmetic mean, rounded half up. Gray when every sample is
/// gray.
pub fn mean_color(samples: impl IntoIterator<Item = Color>) -> Option<Color> {
    let mut sums = [0u64; 3];
    let mut count = 0u64;
    let mut gray = true;
    for color in samples {
        gray &= matches!(color, Color::Gray(_));
        for (sum, value) in sums.iter_mut().zip(color.to_rgb()) {
            *sum += value as u64;
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let mean = sums.map(|sum| ((sum + count / 2) / count) as u8);
    Some(if gray {
        Color::Gray(mean[0])
    } else {
        Color::Rgb(mean)
    })
}

fn all_gray(samples: &[Color]) -> Option<Vec<u8>> {
    samples
        .iter()
        .map(|c| match c {
            Color::Gray(v) => Some(*v),
            Color::Rgb(_) => None,
        })
        .collect()
}

fn median_channel(mut values: Vec<u8>) -> u8 {
    let mid = values.len() / 2;
    *values.select_nth_unstable(mid).1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_ignores_outliers() {
        let samples = [
            Color::Gray(10),
            Color::Gray(12),
            Color::Gray(250),
            Color::Gray(11),
            Color::Gray(0),
        ];
        assert_eq!(median_color(&samples), Some(Color::Gray(11)));
    }

    #[test]
    fn median_is_per_channel() {
        let samples = [
            Color::Rgb([1, 200, 5]),
            Color::Rgb([3, 100, 6]),
            Color::Rgb([2, 150, 4]),
        ];
        assert_eq!(median_color(&samples), Some(Color::Rgb([2, 150, 5])));
    }

    #[test]
    fn empty_runs_have_no_statistics() {
        assert_eq!(median_color(&[]), None);
        assert_eq!(mean_color(Vec::new()), None);
    }

    #[test]
    fn mean_rounds_half_up() {
        let mean = mean_color([Color::Gray(1), Color::Gray(2)]);
        assert_eq!(mean, Some(Color::Gray(2)));
    }

    #[test]
    fn mixed_mean_is_rgb() {
        let mean = mean_color([Color::Gray(0), Color::Rgb([100, 50, 0])]);
        assert_eq!(mean, Some(Color::Rgb([50, 25, 0])));
    }
}
