//! Gradient quantization (ISO/IEC 14495-1, A.3.3) and context index computation.

use crate::coding_parameters::{CustomThresholds, compute_default};
use std::borrow::Cow;
use std::sync::OnceLock;

/// Maps a local gradient to one of the nine regions -4..=4.
pub fn quantize_gradient(d: i32, t1: i32, t2: i32, t3: i32, near_lossless: i32) -> i32 {
    if d <= -t3 {
        return -4;
    }
    if d <= -t2 {
        return -3;
    }
    if d <= -t1 {
        return -2;
    }
    if d < -near_lossless {
        return -1;
    }
    if d <= near_lossless {
        return 0;
    }
    if d < t1 {
        return 1;
    }
    if d < t2 {
        return 2;
    }
    if d < t3 {
        return 3;
    }
    4
}

fn build_table(bits_per_pixel: i32, thresholds: &CustomThresholds, near_lossless: i32) -> Vec<i8> {
    let range = 1 << bits_per_pixel;
    (-range..range)
        .map(|d| {
            quantize_gradient(
                d,
                thresholds.threshold1,
                thresholds.threshold2,
                thresholds.threshold3,
                near_lossless,
            ) as i8
        })
        .collect()
}

static LOSSLESS_TABLE_8: OnceLock<Vec<i8>> = OnceLock::new();
static LOSSLESS_TABLE_10: OnceLock<Vec<i8>> = OnceLock::new();
static LOSSLESS_TABLE_12: OnceLock<Vec<i8>> = OnceLock::new();
static LOSSLESS_TABLE_16: OnceLock<Vec<i8>> = OnceLock::new();

/// Shared table for lossless coding with default thresholds, if one exists for `bits_per_pixel`.
fn lossless_default_table(bits_per_pixel: i32) -> Option<&'static [i8]> {
    let cell = match bits_per_pixel {
        8 => &LOSSLESS_TABLE_8,
        10 => &LOSSLESS_TABLE_10,
        12 => &LOSSLESS_TABLE_12,
        16 => &LOSSLESS_TABLE_16,
        _ => return None,
    };
    let table = cell.get_or_init(|| {
        let maximum_sample_value = (1 << bits_per_pixel) - 1;
        build_table(bits_per_pixel, &compute_default(maximum_sample_value, 0), 0)
    });
    Some(table.as_slice())
}

/// Quantizes gradients through a lookup table covering `-2^bpp..2^bpp`.
#[derive(Debug, Clone)]
pub struct GradientQuantizer {
    table: Cow<'static, [i8]>,
    offset: i32,
}

impl GradientQuantizer {
    /// `thresholds` must be fully resolved.
    pub fn new(bits_per_pixel: i32, thresholds: &CustomThresholds, near_lossless: i32) -> Self {
        let maximum_sample_value = (1 << bits_per_pixel) - 1;
        let is_lossless_default = near_lossless == 0
            && thresholds.maximum_sample_value == maximum_sample_value
            && *thresholds == compute_default(maximum_sample_value, 0);

        let table = match lossless_default_table(bits_per_pixel) {
            Some(shared) if is_lossless_default => Cow::Borrowed(shared),
            _ => Cow::Owned(build_table(bits_per_pixel, thresholds, near_lossless)),
        };

        Self {
            table,
            offset: 1 << bits_per_pixel,
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.table, Cow::Borrowed(_))
    }

    #[inline]
    pub fn quantize(&self, d: i32) -> i32 {
        self.table[(d + self.offset) as usize] as i32
    }

    /// Folds three gradients into a signed context index in -364..=364.
    #[inline]
    pub fn context_id(&self, d1: i32, d2: i32, d3: i32) -> i32 {
        (self.quantize(d1) * 9 + self.quantize(d2)) * 9 + self.quantize(d3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regions_follow_thresholds() {
        let regions: Vec<i32> = [-30, -21, -20, -7, -6, -3, -2, -1, 0, 1, 2, 3, 6, 7, 20, 21]
            .iter()
            .map(|&d| quantize_gradient(d, 3, 7, 21, 0))
            .collect();
        assert_eq!(regions, vec![-4, -4, -3, -3, -2, -2, -1, -1, 0, 1, 1, 2, 2, 3, 3, 4]);
    }

    #[test]
    fn near_lossless_widens_zero_region() {
        assert_eq!(quantize_gradient(2, 10, 20, 30, 2), 0);
        assert_eq!(quantize_gradient(-2, 10, 20, 30, 2), 0);
        assert_eq!(quantize_gradient(3, 10, 20, 30, 2), 1);
        assert_eq!(quantize_gradient(-3, 10, 20, 30, 2), -1);
    }

    #[test]
    fn shared_table_matches_computed_table() {
        let thresholds = compute_default(255, 0);
        let shared = GradientQuantizer::new(8, &thresholds, 0);
        assert!(shared.is_shared());

        let owned = GradientQuantizer {
            table: Cow::Owned(build_table(8, &thresholds, 0)),
            offset: 256,
        };
        for d in -255..=255 {
            assert_eq!(shared.quantize(d), owned.quantize(d));
        }
    }

    #[test]
    fn custom_thresholds_use_private_table() {
        let thresholds = CustomThresholds {
            maximum_sample_value: 255,
            threshold1: 4,
            threshold2: 8,
            threshold3: 22,
            reset_value: 64,
        };
        let quantizer = GradientQuantizer::new(8, &thresholds, 0);
        assert!(!quantizer.is_shared());
        assert_eq!(quantizer.quantize(3), 1);
        assert_eq!(quantizer.context_id(0, 0, 0), 0);
        assert_eq!(quantizer.context_id(-30, -30, -30), -364);
    }
}
