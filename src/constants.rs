pub const DEFAULT_RESET_THRESHOLD: i32 = 64; // Default RESET value as defined in ISO/IEC 14495-1, table C.2

pub const MINIMUM_COMPONENT_COUNT: i32 = 1;
pub const MAXIMUM_COMPONENT_COUNT: i32 = 255;
pub const MINIMUM_BITS_PER_SAMPLE: i32 = 2;
pub const MAXIMUM_BITS_PER_SAMPLE: i32 = 16;
pub const MAXIMUM_NEAR_LOSSLESS: i32 = 255;
pub const MINIMUM_DIMENSION: u32 = 1;
pub const MAXIMUM_DIMENSION: u32 = u16::MAX as u32;

// Number of regular mode contexts after folding the quantized gradients (ISO/IEC 14495-1, A.3.4).
pub const CONTEXT_COUNT: usize = 365;

// Default threshold values for JPEG-LS statistical modeling as defined in ISO/IEC 14495-1, table C.3
// for the case MAXVAL = 255 and NEAR = 0.
pub const DEFAULT_THRESHOLD1: i32 = 3; // BASIC_T1
pub const DEFAULT_THRESHOLD2: i32 = 7; // BASIC_T2
pub const DEFAULT_THRESHOLD3: i32 = 21; // BASIC_T3

// Largest Golomb parameter that can be produced by valid context statistics.
pub const MAX_K_VALUE: i32 = 16;

// The special value to indicate that the stride should be calculated.
pub const AUTO_CALCULATE_STRIDE: usize = 0;

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// Size of the scratch buffer used when the compressed data goes to a stream.
pub const STREAM_SCRATCH_SIZE: usize = 4000;

// Run length order table, ISO/IEC 14495-1, A.7.1.2.
pub const J: [i32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13, 14, 15,
];
