use crate::constants::{
    AUTO_CALCULATE_STRIDE, DEFAULT_RESET_THRESHOLD, DEFAULT_THRESHOLD1, DEFAULT_THRESHOLD2,
    DEFAULT_THRESHOLD3, MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_COMPONENT_COUNT, MAXIMUM_DIMENSION,
    MINIMUM_BITS_PER_SAMPLE, MINIMUM_COMPONENT_COUNT, MINIMUM_DIMENSION, SEGMENT_LENGTH_SIZE,
};
use crate::error::JlsError;
use crate::{ColorTransformation, InterleaveMode};
use std::cmp::{max, min};

/// JPEG-LS preset coding parameters (ISO/IEC 14495-1, C.2.4.1.1).
///
/// A zero field means "use the computed default"; all fields zero is the
/// default set and is not written to the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CustomThresholds {
    pub maximum_sample_value: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset_value: i32,
}

impl CustomThresholds {
    pub fn is_default(&self) -> bool {
        self.maximum_sample_value == 0
            && self.threshold1 == 0
            && self.threshold2 == 0
            && self.threshold3 == 0
            && self.reset_value == 0
    }
}

/// "JFIF\0", version, units, densities and thumbnail size.
const JFIF_FIXED_SIZE: usize = 14;

/// Optional JFIF (APP0) metadata. A version of 0 means no JFIF segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JfifParameters {
    pub version: u16,
    pub units: u8,
    pub x_density: u16,
    pub y_density: u16,
    pub x_thumbnail: u8,
    pub y_thumbnail: u8,
    /// Packed RGB thumbnail, `3 * x_thumbnail * y_thumbnail` bytes.
    pub thumbnail: Vec<u8>,
}

impl JfifParameters {
    pub fn is_present(&self) -> bool {
        self.version != 0
    }

    pub(crate) fn thumbnail_size(&self) -> usize {
        3 * self.x_thumbnail as usize * self.y_thumbnail as usize
    }

    /// Value of the APP0 length field: length, identifier, fixed fields and thumbnail.
    pub(crate) fn segment_length(&self) -> usize {
        SEGMENT_LENGTH_SIZE + JFIF_FIXED_SIZE + self.thumbnail.len()
    }
}

/// Region of interest used by `decode_rect`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Description of an image and how it is (or should be) coded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageParameters {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: i32,
    pub component_count: i32,
    pub interleave_mode: InterleaveMode,
    /// NEAR: 0 is lossless.
    pub allowed_lossy_error: i32,
    /// Bytes per row of one pixel buffer row (per plane row for `InterleaveMode::None`).
    /// 0 lets the codec compute it.
    pub stride: usize,
    pub color_transformation: ColorTransformation,
    pub jfif: JfifParameters,
    pub custom: CustomThresholds,
}

impl ImageParameters {
    pub fn new(width: u32, height: u32, bits_per_sample: i32, component_count: i32) -> Self {
        Self {
            width,
            height,
            bits_per_sample,
            component_count,
            ..Default::default()
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        ((self.bits_per_sample + 7) / 8) as usize
    }

    /// Interleave mode that is actually used: single component images are never interleaved.
    pub fn effective_interleave_mode(&self) -> InterleaveMode {
        if self.component_count == 1 {
            InterleaveMode::None
        } else {
            self.interleave_mode
        }
    }

    /// Number of samples stored side by side in one pixel buffer row.
    pub fn samples_per_pixel(&self) -> usize {
        match self.effective_interleave_mode() {
            InterleaveMode::None => 1,
            _ => self.component_count as usize,
        }
    }

    pub fn default_stride(&self) -> usize {
        self.width as usize * self.samples_per_pixel() * self.bytes_per_sample()
    }

    pub fn effective_stride(&self) -> usize {
        if self.stride == AUTO_CALCULATE_STRIDE {
            self.default_stride()
        } else {
            self.stride
        }
    }

    /// Number of separately stored planes in the pixel buffer.
    pub fn plane_count(&self) -> usize {
        match self.effective_interleave_mode() {
            InterleaveMode::None => self.component_count as usize,
            _ => 1,
        }
    }

    /// Size in bytes of the pixel buffer described by these parameters.
    pub fn uncompressed_size(&self) -> usize {
        self.effective_stride() * self.height as usize * self.plane_count()
    }

    pub fn maximum_sample_value(&self) -> i32 {
        if self.custom.maximum_sample_value != 0 {
            self.custom.maximum_sample_value
        } else {
            (1 << self.bits_per_sample) - 1
        }
    }

    /// Checks the geometry and coding options supplied by a caller before encoding.
    pub fn validate(&self) -> Result<(), JlsError> {
        if !(MINIMUM_DIMENSION..=MAXIMUM_DIMENSION).contains(&self.width)
            || !(MINIMUM_DIMENSION..=MAXIMUM_DIMENSION).contains(&self.height)
        {
            return Err(JlsError::InvalidJlsParameters);
        }

        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&self.bits_per_sample) {
            return Err(JlsError::InvalidJlsParameters);
        }

        if !(MINIMUM_COMPONENT_COUNT..=MAXIMUM_COMPONENT_COUNT).contains(&self.component_count) {
            return Err(JlsError::InvalidJlsParameters);
        }

        self.check_coherent()?;

        let maximum_component_value = (1 << self.bits_per_sample) - 1;
        let maximum_sample_value = if self.custom.maximum_sample_value != 0 {
            min(self.custom.maximum_sample_value, maximum_component_value)
        } else {
            maximum_component_value
        };
        if self.allowed_lossy_error < 0
            || self.allowed_lossy_error > compute_maximum_near_lossless(maximum_sample_value)
        {
            return Err(JlsError::InvalidJlsParameters);
        }

        validate_thresholds(&self.custom, self.bits_per_sample, self.allowed_lossy_error)
            .map_err(|_| JlsError::InvalidJlsParameters)?;

        if self.stride != AUTO_CALCULATE_STRIDE && self.stride < self.default_stride() {
            return Err(JlsError::InvalidJlsParameters);
        }

        self.check_color_transformation()?;

        if self.jfif.is_present() {
            if self.jfif.thumbnail.len() != self.jfif.thumbnail_size() {
                return Err(JlsError::InvalidJlsParameters);
            }
            if self.jfif.segment_length() > u16::MAX as usize {
                return Err(JlsError::InvalidJlsParameters);
            }
        }

        Ok(())
    }

    /// Rejects component and interleave combinations the format does not allow.
    pub fn check_coherent(&self) -> Result<(), JlsError> {
        match self.component_count {
            0 => Err(JlsError::InvalidJlsParameters),
            1 => Ok(()),
            3 => Ok(()),
            4 if self.interleave_mode == InterleaveMode::Sample => {
                Err(JlsError::ParameterValueNotSupported)
            }
            4 => Ok(()),
            _ if self.interleave_mode != InterleaveMode::None => {
                Err(JlsError::ParameterValueNotSupported)
            }
            _ => Ok(()),
        }
    }

    /// Color transforms only apply to 8 or 16 bit three component interleaved images.
    pub fn check_color_transformation(&self) -> Result<(), JlsError> {
        if self.color_transformation == ColorTransformation::None {
            return Ok(());
        }

        if self.component_count != 3 || self.effective_interleave_mode() == InterleaveMode::None {
            return Err(JlsError::UnsupportedColorTransform);
        }

        if self.bits_per_sample != 8 && self.bits_per_sample != 16 {
            return Err(JlsError::UnsupportedBitDepthForTransform);
        }

        Ok(())
    }
}

/// Parameters of a single scan, derived from the image parameters and the scan header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodingParameters {
    pub width: u32,
    pub height: u32,
    pub bits_per_sample: i32,
    /// Components coded in this scan.
    pub component_count: i32,
    pub interleave_mode: InterleaveMode,
    pub near_lossless: i32,
    /// Bytes per row of the pixel buffer holding this scan.
    pub stride: usize,
    pub transformation: ColorTransformation,
    /// Preset parameters as signalled; zero fields are resolved when the scan starts.
    pub thresholds: CustomThresholds,
}

impl CodingParameters {
    pub fn bytes_per_sample(&self) -> usize {
        ((self.bits_per_sample + 7) / 8) as usize
    }

    pub fn samples_per_pixel(&self) -> usize {
        match self.interleave_mode {
            InterleaveMode::None => 1,
            _ => self.component_count as usize,
        }
    }

    /// Byte count of one encoded row of this scan.
    pub fn row_size(&self) -> usize {
        self.width as usize * self.samples_per_pixel() * self.bytes_per_sample()
    }
}

// Clamping function as defined by ISO/IEC 14495-1, Figure C.3
const fn clamp(i: i32, j: i32, maximum_sample_value: i32) -> i32 {
    if i > maximum_sample_value || i < j {
        j
    } else {
        i
    }
}

pub fn compute_maximum_near_lossless(maximum_sample_value: i32) -> i32 {
    min(255, maximum_sample_value / 2)
}

// Default coding threshold values as defined by ISO/IEC 14495-1, C.2.4.1.1.1
pub fn compute_default(maximum_sample_value: i32, near_lossless: i32) -> CustomThresholds {
    debug_assert!(maximum_sample_value <= u16::MAX as i32);
    debug_assert!(near_lossless >= 0 && near_lossless <= compute_maximum_near_lossless(maximum_sample_value));

    if maximum_sample_value >= 128 {
        let factor = (min(maximum_sample_value, 4095) + 128) / 256;
        let threshold1 = clamp(
            factor * (DEFAULT_THRESHOLD1 - 2) + 2 + 3 * near_lossless,
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            factor * (DEFAULT_THRESHOLD2 - 3) + 3 + 5 * near_lossless,
            threshold1,
            maximum_sample_value,
        );

        CustomThresholds {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                factor * (DEFAULT_THRESHOLD3 - 4) + 4 + 7 * near_lossless,
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    } else {
        let factor = 256 / (maximum_sample_value + 1);
        let threshold1 = clamp(
            max(2, DEFAULT_THRESHOLD1 / factor + 3 * near_lossless),
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            max(3, DEFAULT_THRESHOLD2 / factor + 5 * near_lossless),
            threshold1,
            maximum_sample_value,
        );

        CustomThresholds {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                max(4, DEFAULT_THRESHOLD3 / factor + 7 * near_lossless),
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    }
}

/// Validates preset parameters against table C.1 and fills in defaults for zero fields.
pub fn validate_thresholds(
    thresholds: &CustomThresholds,
    bits_per_sample: i32,
    near_lossless: i32,
) -> Result<CustomThresholds, JlsError> {
    let maximum_component_value = (1 << bits_per_sample) - 1;

    // ISO/IEC 14495-1, C.2.4.1.1, Table C.1 defines the valid JPEG-LS preset coding parameters values.
    if thresholds.maximum_sample_value != 0
        && (thresholds.maximum_sample_value < 1 || thresholds.maximum_sample_value > maximum_component_value)
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    let maximum_sample_value = if thresholds.maximum_sample_value != 0 {
        thresholds.maximum_sample_value
    } else {
        maximum_component_value
    };

    if near_lossless > compute_maximum_near_lossless(maximum_sample_value) {
        return Err(JlsError::InvalidJlsParameters);
    }

    if thresholds.threshold1 != 0
        && (thresholds.threshold1 < near_lossless + 1 || thresholds.threshold1 > maximum_sample_value)
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    let defaults = compute_default(maximum_sample_value, near_lossless);

    let threshold1 = if thresholds.threshold1 != 0 {
        thresholds.threshold1
    } else {
        defaults.threshold1
    };

    if thresholds.threshold2 != 0
        && (thresholds.threshold2 < threshold1 || thresholds.threshold2 > maximum_sample_value)
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    let threshold2 = if thresholds.threshold2 != 0 {
        thresholds.threshold2
    } else {
        defaults.threshold2
    };

    if thresholds.threshold3 != 0
        && (thresholds.threshold3 < threshold2 || thresholds.threshold3 > maximum_sample_value)
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    if thresholds.reset_value != 0
        && (thresholds.reset_value < 3 || thresholds.reset_value > max(255, maximum_sample_value))
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    Ok(CustomThresholds {
        maximum_sample_value,
        threshold1,
        threshold2,
        threshold3: if thresholds.threshold3 != 0 {
            thresholds.threshold3
        } else {
            defaults.threshold3
        },
        reset_value: if thresholds.reset_value != 0 {
            thresholds.reset_value
        } else {
            defaults.reset_value
        },
    })
}

/// Number of bits needed to hold `value`, i.e. ceil(log2(value + 1)).
pub fn bit_count(value: i32) -> i32 {
    debug_assert!(value >= 0);
    32 - (value as u32).leading_zeros() as i32
}

/// Smallest `n` with `2^n >= value`.
pub fn ceil_log2(value: i32) -> i32 {
    debug_assert!(value > 0);
    bit_count(value - 1)
}

/// bpp as defined in ISO/IEC 14495-1, A.2.1.
pub fn compute_bits_per_pixel(maximum_sample_value: i32) -> i32 {
    max(2, bit_count(maximum_sample_value))
}

pub fn compute_limit_parameter(bits_per_pixel: i32) -> i32 {
    2 * (bits_per_pixel + max(8, bits_per_pixel))
}
