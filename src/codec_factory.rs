//! Selection of the scan coder for a parameter set.
//!
//! Lossless scans with the default MAXVAL and RESET at 8, 12 and 16 bits use
//! `LosslessTraits`, which produce the same bit stream as `DefaultTraits` with
//! cheaper arithmetic. Everything else goes through `DefaultTraits`.

use crate::InterleaveMode;
use crate::byte_stream::{ByteSink, ByteSource};
use crate::coding_parameters::{CodingParameters, CustomThresholds, Rect, validate_thresholds};
use crate::constants::DEFAULT_RESET_THRESHOLD;
use crate::error::JlsError;
use crate::process_line::{PixelSink, PixelSource, ScanPixel};
use crate::scan_decoder::ScanDecoder;
use crate::scan_encoder::ScanEncoder;
use crate::traits::{CodecTraits, DefaultTraits, LosslessTraits, Triplet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecVariant {
    LosslessScalar8,
    LosslessScalar12,
    LosslessScalar16,
    LosslessTriplet8,
    DefaultScalar8,
    DefaultScalar16,
    DefaultTriplet8,
    DefaultTriplet16,
}

/// Picks the coder for a scan; `thresholds` must already be resolved.
pub fn select_codec(
    parameters: &CodingParameters,
    thresholds: &CustomThresholds,
    allow_specializations: bool,
) -> Result<CodecVariant, JlsError> {
    let bits_per_sample = parameters.bits_per_sample;
    let is_triplet = parameters.interleave_mode == InterleaveMode::Sample;
    if is_triplet && parameters.component_count != 3 {
        return Err(JlsError::ParameterValueNotSupported);
    }

    let is_lossless_default = allow_specializations
        && parameters.near_lossless == 0
        && thresholds.maximum_sample_value == (1 << bits_per_sample) - 1
        && thresholds.reset_value == DEFAULT_RESET_THRESHOLD;

    let variant = match (is_triplet, is_lossless_default, bits_per_sample) {
        (true, true, 8) => CodecVariant::LosslessTriplet8,
        (false, true, 8) => CodecVariant::LosslessScalar8,
        (false, true, 12) => CodecVariant::LosslessScalar12,
        (false, true, 16) => CodecVariant::LosslessScalar16,
        (true, _, bits) if bits <= 8 => CodecVariant::DefaultTriplet8,
        (true, _, _) => CodecVariant::DefaultTriplet16,
        (false, _, bits) if bits <= 8 => CodecVariant::DefaultScalar8,
        (false, _, _) => CodecVariant::DefaultScalar16,
    };
    Ok(variant)
}

fn line_components(parameters: &CodingParameters) -> usize {
    match parameters.interleave_mode {
        InterleaveMode::Line => parameters.component_count as usize,
        InterleaveMode::None | InterleaveMode::Sample => 1,
    }
}

fn default_traits(parameters: &CodingParameters, thresholds: &CustomThresholds) -> DefaultTraits {
    DefaultTraits::new(
        thresholds.maximum_sample_value,
        parameters.near_lossless,
        thresholds.reset_value,
    )
}

/// Encodes one scan of `pixels` and returns the size of the coded segment.
pub fn encode_scan(sink: &mut ByteSink, pixels: &[u8], parameters: &CodingParameters) -> Result<usize, JlsError> {
    encode_scan_with(sink, pixels, parameters, true)
}

pub(crate) fn encode_scan_with(
    sink: &mut ByteSink,
    pixels: &[u8],
    parameters: &CodingParameters,
    allow_specializations: bool,
) -> Result<usize, JlsError> {
    let thresholds = validate_thresholds(
        &parameters.thresholds,
        parameters.bits_per_sample,
        parameters.near_lossless,
    )?;
    let variant = select_codec(parameters, &thresholds, allow_specializations)?;
    log::debug!(
        "encoding scan of {} component(s), {:?} interleave with {variant:?}",
        parameters.component_count,
        parameters.interleave_mode
    );

    let source = PixelSource {
        pixels,
        stride: parameters.stride,
        width: parameters.width as usize,
        components: parameters.samples_per_pixel(),
        transformation: parameters.transformation,
        range: 1 << parameters.bits_per_sample,
    };
    let height = parameters.height as usize;
    let lines = line_components(parameters);

    fn run<T: CodecTraits, P: ScanPixel>(
        traits: T,
        thresholds: &CustomThresholds,
        sink: &mut ByteSink,
        source: &PixelSource,
        height: usize,
        lines: usize,
    ) -> Result<usize, JlsError> {
        ScanEncoder::new(traits, thresholds, sink).encode_scan::<P>(source, height, lines)
    }

    let t = &thresholds;
    match variant {
        CodecVariant::LosslessScalar8 => run::<_, u8>(LosslessTraits::<8>, t, sink, &source, height, lines),
        CodecVariant::LosslessScalar12 => run::<_, u16>(LosslessTraits::<12>, t, sink, &source, height, lines),
        CodecVariant::LosslessScalar16 => run::<_, u16>(LosslessTraits::<16>, t, sink, &source, height, lines),
        CodecVariant::LosslessTriplet8 => {
            run::<_, Triplet<u8>>(LosslessTraits::<8>, t, sink, &source, height, lines)
        }
        CodecVariant::DefaultScalar8 => {
            run::<_, u8>(default_traits(parameters, t), t, sink, &source, height, lines)
        }
        CodecVariant::DefaultScalar16 => {
            run::<_, u16>(default_traits(parameters, t), t, sink, &source, height, lines)
        }
        CodecVariant::DefaultTriplet8 => {
            run::<_, Triplet<u8>>(default_traits(parameters, t), t, sink, &source, height, lines)
        }
        CodecVariant::DefaultTriplet16 => {
            run::<_, Triplet<u16>>(default_traits(parameters, t), t, sink, &source, height, lines)
        }
    }
}

/// Decodes one scan, writing the rows and columns inside `region` to `sink`.
///
/// Each written row occupies `stride` bytes; bytes past the region's row are skipped.
pub fn decode_scan(
    source: &mut ByteSource,
    sink: &mut ByteSink,
    parameters: &CodingParameters,
    region: Rect,
    stride: usize,
) -> Result<(), JlsError> {
    let thresholds = validate_thresholds(
        &parameters.thresholds,
        parameters.bits_per_sample,
        parameters.near_lossless,
    )
    .map_err(|_| JlsError::InvalidCompressedData)?;
    let variant = select_codec(parameters, &thresholds, true)?;
    log::debug!(
        "decoding scan of {} component(s), {:?} interleave with {variant:?}",
        parameters.component_count,
        parameters.interleave_mode
    );

    let components = parameters.samples_per_pixel();
    let row_size = region.width as usize * components * parameters.bytes_per_sample();
    let mut pixel_sink = PixelSink::new(
        sink,
        region.x as usize,
        region.width as usize,
        components,
        stride - row_size,
        parameters.transformation,
        1 << parameters.bits_per_sample,
    );
    let width = parameters.width as usize;
    let height = parameters.height as usize;
    let lines = line_components(parameters);
    let rows = region.y as usize..(region.y + region.height) as usize;

    fn run<T: CodecTraits, P: ScanPixel>(
        traits: T,
        thresholds: &CustomThresholds,
        source: &mut ByteSource,
        sink: &mut PixelSink,
        (width, height, lines): (usize, usize, usize),
        rows: std::ops::Range<usize>,
    ) -> Result<(), JlsError> {
        ScanDecoder::new(traits, thresholds, source).decode_scan::<P>(sink, width, height, lines, rows)
    }

    let t = &thresholds;
    let sink = &mut pixel_sink;
    let geometry = (width, height, lines);
    match variant {
        CodecVariant::LosslessScalar8 => run::<_, u8>(LosslessTraits::<8>, t, source, sink, geometry, rows),
        CodecVariant::LosslessScalar12 => run::<_, u16>(LosslessTraits::<12>, t, source, sink, geometry, rows),
        CodecVariant::LosslessScalar16 => run::<_, u16>(LosslessTraits::<16>, t, source, sink, geometry, rows),
        CodecVariant::LosslessTriplet8 => {
            run::<_, Triplet<u8>>(LosslessTraits::<8>, t, source, sink, geometry, rows)
        }
        CodecVariant::DefaultScalar8 => {
            run::<_, u8>(default_traits(parameters, t), t, source, sink, geometry, rows)
        }
        CodecVariant::DefaultScalar16 => {
            run::<_, u16>(default_traits(parameters, t), t, source, sink, geometry, rows)
        }
        CodecVariant::DefaultTriplet8 => {
            run::<_, Triplet<u8>>(default_traits(parameters, t), t, source, sink, geometry, rows)
        }
        CodecVariant::DefaultTriplet16 => {
            run::<_, Triplet<u16>>(default_traits(parameters, t), t, source, sink, geometry, rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorTransformation;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn parameters(bits_per_sample: i32, component_count: i32, interleave_mode: InterleaveMode) -> CodingParameters {
        let width = 37;
        let samples = if interleave_mode == InterleaveMode::None { 1 } else { component_count as usize };
        CodingParameters {
            width,
            height: 23,
            bits_per_sample,
            component_count,
            interleave_mode,
            near_lossless: 0,
            stride: width as usize * samples * ((bits_per_sample as usize + 7) / 8),
            transformation: ColorTransformation::None,
            thresholds: CustomThresholds::default(),
        }
    }

    // Smooth ramps with noise, so both regular and run mode are exercised.
    fn test_image(parameters: &CodingParameters) -> Vec<u8> {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let maximum = (1u32 << parameters.bits_per_sample) - 1;
        let samples = parameters.row_size() / parameters.bytes_per_sample();
        let mut pixels = Vec::new();
        for y in 0..parameters.height {
            for x in 0..samples as u32 {
                let value = if y % 5 == 0 {
                    maximum / 3
                } else {
                    ((x * 7 + y * 3) * (maximum / 255).max(1) + rng.random_range(0..4)).min(maximum)
                };
                if parameters.bytes_per_sample() == 1 {
                    pixels.push(value as u8);
                } else {
                    pixels.extend_from_slice(&(value as u16).to_le_bytes());
                }
            }
        }
        pixels
    }

    fn encode(parameters: &CodingParameters, pixels: &[u8], allow_specializations: bool) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut sink = ByteSink::from_writer(&mut output);
            encode_scan_with(&mut sink, pixels, parameters, allow_specializations).unwrap();
            sink.flush().unwrap();
        }
        output
    }

    #[test]
    fn specialized_coders_match_default_coder() {
        let cases = [
            (8, 1, InterleaveMode::None, CodecVariant::LosslessScalar8),
            (12, 1, InterleaveMode::None, CodecVariant::LosslessScalar12),
            (16, 1, InterleaveMode::None, CodecVariant::LosslessScalar16),
            (8, 3, InterleaveMode::Line, CodecVariant::LosslessScalar8),
            (8, 3, InterleaveMode::Sample, CodecVariant::LosslessTriplet8),
        ];
        for (bits, components, interleave_mode, expected) in cases {
            let parameters = parameters(bits, components, interleave_mode);
            let thresholds = validate_thresholds(&parameters.thresholds, bits, 0).unwrap();
            assert_eq!(select_codec(&parameters, &thresholds, true).unwrap(), expected);

            let pixels = test_image(&parameters);
            assert_eq!(
                encode(&parameters, &pixels, true),
                encode(&parameters, &pixels, false),
                "{expected:?}"
            );
        }
    }

    #[test]
    fn general_coder_for_near_lossless_and_custom_reset() {
        let mut near = parameters(8, 1, InterleaveMode::None);
        near.near_lossless = 2;
        let thresholds = validate_thresholds(&near.thresholds, 8, 2).unwrap();
        assert_eq!(select_codec(&near, &thresholds, true).unwrap(), CodecVariant::DefaultScalar8);

        let mut reset = parameters(10, 3, InterleaveMode::Sample);
        reset.thresholds.reset_value = 32;
        let thresholds = validate_thresholds(&reset.thresholds, 10, 0).unwrap();
        assert_eq!(select_codec(&reset, &thresholds, true).unwrap(), CodecVariant::DefaultTriplet16);
    }

    #[test]
    fn sample_interleave_needs_three_components() {
        let parameters = parameters(8, 4, InterleaveMode::Sample);
        let thresholds = validate_thresholds(&parameters.thresholds, 8, 0).unwrap();
        assert_eq!(
            select_codec(&parameters, &thresholds, true),
            Err(JlsError::ParameterValueNotSupported)
        );
    }

    #[test]
    fn decoded_scan_matches_source() {
        for (bits, components, interleave_mode) in [
            (8, 1, InterleaveMode::None),
            (12, 3, InterleaveMode::Line),
            (16, 3, InterleaveMode::Sample),
            (5, 1, InterleaveMode::None),
        ] {
            let parameters = parameters(bits, components, interleave_mode);
            let pixels = test_image(&parameters);
            let mut encoded = encode(&parameters, &pixels, true);
            encoded.extend_from_slice(&[0xFF, 0xD9]);

            let mut decoded = vec![0u8; pixels.len()];
            let mut source = ByteSource::from_slice(&encoded);
            let mut sink = ByteSink::from_slice(&mut decoded);
            let region = Rect::new(0, 0, parameters.width, parameters.height);
            decode_scan(&mut source, &mut sink, &parameters, region, parameters.stride).unwrap();
            assert_eq!(decoded, pixels, "{bits} bits, {interleave_mode:?}");
        }
    }
}
