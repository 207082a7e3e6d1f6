//! Sample types and the arithmetic policies of the coding process.

use crate::coding_parameters::{ceil_log2, compute_bits_per_pixel, compute_limit_parameter};
use crate::constants::DEFAULT_RESET_THRESHOLD;
use std::fmt::Debug;

/// Storage type of one sample in the line buffers and in the pixel buffer.
pub trait Sample: Copy + Default + Debug + PartialEq + Send + Sync + 'static {
    /// Bytes per sample in the pixel buffer (little endian).
    const BYTES: usize;

    fn to_i32(self) -> i32;
    fn from_i32(value: i32) -> Self;
    fn read(bytes: &[u8]) -> Self;
    fn write(self, bytes: &mut [u8]);
}

impl Sample for u8 {
    const BYTES: usize = 1;

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Self {
        value as u8
    }

    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[0] = self;
    }
}

impl Sample for u16 {
    const BYTES: usize = 2;

    fn to_i32(self) -> i32 {
        self as i32
    }

    fn from_i32(value: i32) -> Self {
        value as u16
    }

    fn read(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn write(self, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&self.to_le_bytes());
    }
}

/// Three samples of one pixel, coded together in sample interleaved scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Triplet<S> {
    pub v1: S,
    pub v2: S,
    pub v3: S,
}

impl<S: Sample> Triplet<S> {
    pub fn new(v1: i32, v2: i32, v3: i32) -> Self {
        Self {
            v1: S::from_i32(v1),
            v2: S::from_i32(v2),
            v3: S::from_i32(v3),
        }
    }
}

/// Quantization, reconstruction and prediction correction for one parameter set.
///
/// Encoder and decoder must use the same implementation for a scan; the
/// specialized lossless variant is numerically identical to `DefaultTraits`
/// for the parameters it accepts.
pub trait CodecTraits: Copy + Debug {
    fn maximum_sample_value(&self) -> i32;
    fn near_lossless(&self) -> i32;
    fn range(&self) -> i32;
    fn quantized_bits_per_pixel(&self) -> i32;
    fn limit(&self) -> i32;
    fn reset_threshold(&self) -> i32;

    fn compute_error_value(&self, error_value: i32) -> i32;
    fn compute_reconstructed_sample(&self, predicted_value: i32, error_value: i32) -> i32;
    fn is_near(&self, lhs: i32, rhs: i32) -> bool;
    fn correct_prediction(&self, predicted: i32) -> i32;
}

/// General traits: any MAXVAL, NEAR and RESET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTraits {
    maximum_sample_value: i32,
    near_lossless: i32,
    range: i32,
    quantized_bits_per_pixel: i32,
    limit: i32,
    reset_threshold: i32,
}

impl DefaultTraits {
    pub fn new(maximum_sample_value: i32, near_lossless: i32, reset_threshold: i32) -> Self {
        let range = (maximum_sample_value + 2 * near_lossless) / (2 * near_lossless + 1) + 1;
        Self {
            maximum_sample_value,
            near_lossless,
            range,
            quantized_bits_per_pixel: ceil_log2(range),
            limit: compute_limit_parameter(compute_bits_per_pixel(maximum_sample_value)),
            reset_threshold,
        }
    }

    fn quantize(&self, error_value: i32) -> i32 {
        if error_value > 0 {
            (error_value + self.near_lossless) / (2 * self.near_lossless + 1)
        } else {
            -(self.near_lossless - error_value) / (2 * self.near_lossless + 1)
        }
    }

    fn dequantize(&self, error_value: i32) -> i32 {
        error_value * (2 * self.near_lossless + 1)
    }

    fn modulo_range(&self, mut error_value: i32) -> i32 {
        if error_value < 0 {
            error_value += self.range;
        }
        if error_value >= (self.range + 1) / 2 {
            error_value -= self.range;
        }
        error_value
    }

    fn fix_reconstructed_value(&self, mut value: i32) -> i32 {
        if value < -self.near_lossless {
            value += self.range * (2 * self.near_lossless + 1);
        } else if value > self.maximum_sample_value + self.near_lossless {
            value -= self.range * (2 * self.near_lossless + 1);
        }
        self.correct_prediction(value)
    }
}

impl CodecTraits for DefaultTraits {
    fn maximum_sample_value(&self) -> i32 {
        self.maximum_sample_value
    }

    fn near_lossless(&self) -> i32 {
        self.near_lossless
    }

    fn range(&self) -> i32 {
        self.range
    }

    fn quantized_bits_per_pixel(&self) -> i32 {
        self.quantized_bits_per_pixel
    }

    fn limit(&self) -> i32 {
        self.limit
    }

    fn reset_threshold(&self) -> i32 {
        self.reset_threshold
    }

    fn compute_error_value(&self, error_value: i32) -> i32 {
        self.modulo_range(self.quantize(error_value))
    }

    fn compute_reconstructed_sample(&self, predicted_value: i32, error_value: i32) -> i32 {
        self.fix_reconstructed_value(predicted_value + self.dequantize(error_value))
    }

    fn is_near(&self, lhs: i32, rhs: i32) -> bool {
        (lhs - rhs).abs() <= self.near_lossless
    }

    fn correct_prediction(&self, predicted: i32) -> i32 {
        if (predicted as u32) <= self.maximum_sample_value as u32 {
            predicted
        } else {
            !(predicted >> 31) & self.maximum_sample_value
        }
    }
}

/// Lossless traits for `MAXVAL = 2^BITS - 1`, `NEAR = 0` and the default RESET.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LosslessTraits<const BITS: i32>;

impl<const BITS: i32> LosslessTraits<BITS> {
    const MAXIMUM_SAMPLE_VALUE: i32 = (1 << BITS) - 1;
}

impl<const BITS: i32> CodecTraits for LosslessTraits<BITS> {
    fn maximum_sample_value(&self) -> i32 {
        Self::MAXIMUM_SAMPLE_VALUE
    }

    fn near_lossless(&self) -> i32 {
        0
    }

    fn range(&self) -> i32 {
        1 << BITS
    }

    fn quantized_bits_per_pixel(&self) -> i32 {
        BITS
    }

    fn limit(&self) -> i32 {
        compute_limit_parameter(BITS)
    }

    fn reset_threshold(&self) -> i32 {
        DEFAULT_RESET_THRESHOLD
    }

    #[inline]
    fn compute_error_value(&self, error_value: i32) -> i32 {
        (error_value << (32 - BITS)) >> (32 - BITS)
    }

    #[inline]
    fn compute_reconstructed_sample(&self, predicted_value: i32, error_value: i32) -> i32 {
        (predicted_value + error_value) & Self::MAXIMUM_SAMPLE_VALUE
    }

    #[inline]
    fn is_near(&self, lhs: i32, rhs: i32) -> bool {
        lhs == rhs
    }

    #[inline]
    fn correct_prediction(&self, predicted: i32) -> i32 {
        if (predicted & Self::MAXIMUM_SAMPLE_VALUE) == predicted {
            predicted
        } else {
            !(predicted >> 31) & Self::MAXIMUM_SAMPLE_VALUE
        }
    }
}

/// 0 for non-negative values, -1 for negative values.
#[inline]
pub fn bit_wise_sign(i: i32) -> i32 {
    i >> 31
}

/// Negates `value` when `sign` is -1.
#[inline]
pub fn apply_sign(value: i32, sign: i32) -> i32 {
    (sign ^ value) - sign
}

/// -1 for negative values, 1 otherwise.
#[inline]
pub fn sign(n: i32) -> i32 {
    (n >> 31) | 1
}

/// Median edge detecting predictor (ISO/IEC 14495-1, A.4.1).
#[inline]
pub fn get_predicted_value(ra: i32, rb: i32, rc: i32) -> i32 {
    let sign = bit_wise_sign(rb - ra);

    // Ra is between Rc and Rb
    if (sign ^ (rc - ra)) < 0 {
        return rb;
    }
    if (sign ^ (rb - rc)) < 0 {
        return ra;
    }

    ra + rb - rc
}

#[inline]
pub fn map_error_value(error_value: i32) -> i32 {
    (error_value >> 30) ^ (2 * error_value)
}

#[inline]
pub fn unmap_error_value(mapped_error_value: i32) -> i32 {
    let sign = (mapped_error_value << 31) >> 31;
    sign ^ (mapped_error_value >> 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_equivalence<const BITS: i32>() {
        let lossless = LosslessTraits::<BITS>;
        let general = DefaultTraits::new((1 << BITS) - 1, 0, DEFAULT_RESET_THRESHOLD);

        assert_eq!(lossless.range(), general.range());
        assert_eq!(lossless.quantized_bits_per_pixel(), general.quantized_bits_per_pixel());
        assert_eq!(lossless.limit(), general.limit());

        let maximum = (1 << BITS) - 1;
        for error_value in -maximum..=maximum {
            assert_eq!(
                lossless.compute_error_value(error_value),
                general.compute_error_value(error_value),
                "error value {error_value} at {BITS} bits"
            );
        }

        let half = 1 << (BITS - 1);
        for predicted in 0..=maximum {
            for error_value in [-half, -1, 0, 1, half - 1] {
                assert_eq!(
                    lossless.compute_reconstructed_sample(predicted, error_value),
                    general.compute_reconstructed_sample(predicted, error_value)
                );
            }
        }

        for predicted in [-maximum - 1, -1, 0, maximum, maximum + 1, 2 * maximum] {
            assert_eq!(lossless.correct_prediction(predicted), general.correct_prediction(predicted));
        }
    }

    #[test]
    fn lossless_traits_match_default_traits() {
        check_equivalence::<2>();
        check_equivalence::<8>();
        check_equivalence::<12>();
        check_equivalence::<16>();
    }

    #[test]
    fn near_lossless_reconstruction_stays_within_bound() {
        let traits = DefaultTraits::new(255, 3, DEFAULT_RESET_THRESHOLD);
        for predicted in 0..=255 {
            for actual in 0..=255 {
                let error_value = traits.compute_error_value(actual - predicted);
                let reconstructed = traits.compute_reconstructed_sample(predicted, error_value);
                assert!((reconstructed - actual).abs() <= 3, "{predicted} {actual} {reconstructed}");
            }
        }
    }

    #[test]
    fn prediction_correction_clamps_custom_maximum() {
        let traits = DefaultTraits::new(100, 0, DEFAULT_RESET_THRESHOLD);
        assert_eq!(traits.correct_prediction(50), 50);
        assert_eq!(traits.correct_prediction(101), 100);
        assert_eq!(traits.correct_prediction(-5), 0);
    }

    #[test]
    fn sign_helpers() {
        assert_eq!(bit_wise_sign(5), 0);
        assert_eq!(bit_wise_sign(-5), -1);
        assert_eq!(apply_sign(7, -1), -7);
        assert_eq!(apply_sign(7, 0), 7);
        assert_eq!(sign(0), 1);
        assert_eq!(sign(-3), -1);
    }

    #[test]
    fn predictor_is_median_edge_detector() {
        assert_eq!(get_predicted_value(10, 20, 5), 20);
        assert_eq!(get_predicted_value(10, 20, 25), 10);
        assert_eq!(get_predicted_value(10, 20, 15), 15);
        assert_eq!(get_predicted_value(20, 10, 25), 10);
        assert_eq!(get_predicted_value(20, 10, 5), 20);
    }

    #[test]
    fn error_mapping_is_reversible() {
        for error_value in -300..300 {
            let mapped = map_error_value(error_value);
            assert!(mapped >= 0);
            assert_eq!(unmap_error_value(mapped), error_value);
        }
        assert_eq!(map_error_value(0), 0);
        assert_eq!(map_error_value(-1), 1);
        assert_eq!(map_error_value(1), 2);
    }
}
