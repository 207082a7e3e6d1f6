use jpegls_rs::{
    ByteSink, ByteSource, ColorTransformation, CustomThresholds, ImageParameters, InterleaveMode, JlsError,
    JpeglsDecoder, JpeglsEncoder, Rect, decode, decode_rect, decode_stream, decode_to_vec, encode, encode_stream,
    encode_to_vec,
};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;

fn random_image(parameters: &ImageParameters, seed: u64) -> Vec<u8> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    let maximum = parameters.maximum_sample_value();
    let sample_count = parameters.uncompressed_size() / parameters.bytes_per_sample();
    let mut pixels = Vec::with_capacity(parameters.uncompressed_size());
    for _ in 0..sample_count {
        let value = rng.random_range(0..=maximum);
        if parameters.bytes_per_sample() == 1 {
            pixels.push(value as u8);
        } else {
            pixels.extend_from_slice(&(value as u16).to_le_bytes());
        }
    }
    pixels
}

/// Smooth gradient with some noise, the kind of content that uses both coding modes.
fn natural_image(parameters: &ImageParameters, seed: u64) -> Vec<u8> {
    let mut rng = XorShiftRng::seed_from_u64(seed);
    let maximum = parameters.maximum_sample_value();
    let width = parameters.width as i32;
    let samples_per_row = (parameters.default_stride() / parameters.bytes_per_sample()) as i32;
    let sample_count = parameters.uncompressed_size() / parameters.bytes_per_sample();
    let mut pixels = Vec::with_capacity(parameters.uncompressed_size());
    for index in 0..sample_count as i32 {
        let x = (index % samples_per_row) % width;
        let y = index / samples_per_row;
        let flat = (x / 8 + y / 8) % 3 == 0;
        let noise = if flat { 0 } else { rng.random_range(-2..=2) };
        let value = ((x * 3 + y * 5) * (maximum + 1) / 256 + noise).clamp(0, maximum);
        if parameters.bytes_per_sample() == 1 {
            pixels.push(value as u8);
        } else {
            pixels.extend_from_slice(&(value as u16).to_le_bytes());
        }
    }
    pixels
}

fn samples(pixels: &[u8], bytes_per_sample: usize) -> Vec<i32> {
    if bytes_per_sample == 1 {
        pixels.iter().map(|&b| b as i32).collect()
    } else {
        pixels
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]) as i32)
            .collect()
    }
}

fn assert_round_trip(parameters: &ImageParameters, pixels: &[u8]) {
    let encoded = encode_to_vec(pixels, parameters).unwrap();
    let (decoded, header) = decode_to_vec(&encoded).unwrap();
    assert_eq!(header.width, parameters.width);
    assert_eq!(header.height, parameters.height);
    assert_eq!(header.component_count, parameters.component_count);

    let near = parameters.allowed_lossy_error;
    if near == 0 {
        assert!(decoded == pixels, "lossless mismatch for {parameters:?}");
    } else {
        let bytes_per_sample = parameters.bytes_per_sample();
        let original = samples(pixels, bytes_per_sample);
        let decoded = samples(&decoded, bytes_per_sample);
        assert_eq!(original.len(), decoded.len());
        for (index, (a, b)) in original.iter().zip(&decoded).enumerate() {
            assert!((a - b).abs() <= near, "sample {index}: {a} vs {b} for {parameters:?}");
        }
    }
}

#[test]
fn lossless_grayscale_all_bit_depths() {
    for bits in 2..=16 {
        let parameters = ImageParameters::new(37, 23, bits, 1);
        assert_round_trip(&parameters, &natural_image(&parameters, bits as u64));
        assert_round_trip(&parameters, &random_image(&parameters, 100 + bits as u64));
    }
}

#[test]
fn lossless_interleave_modes() {
    for bits in [2, 5, 8, 10, 12, 16] {
        for (components, interleave_mode) in [
            (3, InterleaveMode::None),
            (3, InterleaveMode::Line),
            (3, InterleaveMode::Sample),
            (4, InterleaveMode::Line),
            (2, InterleaveMode::None),
        ] {
            let mut parameters = ImageParameters::new(19, 11, bits, components);
            parameters.interleave_mode = interleave_mode;
            assert_round_trip(&parameters, &natural_image(&parameters, bits as u64));
            assert_round_trip(&parameters, &random_image(&parameters, 7));
        }
    }
}

#[test]
fn near_lossless_within_error_bound() {
    for (bits, near) in [(8, 1), (8, 3), (12, 7), (16, 2), (4, 1)] {
        for interleave_mode in [InterleaveMode::None, InterleaveMode::Line, InterleaveMode::Sample] {
            let mut parameters = ImageParameters::new(29, 17, bits, 3);
            parameters.interleave_mode = interleave_mode;
            parameters.allowed_lossy_error = near;
            assert_round_trip(&parameters, &natural_image(&parameters, 3));
            assert_round_trip(&parameters, &random_image(&parameters, 4));
        }
    }
}

#[test]
fn color_transforms_are_lossless() {
    for bits in [8, 16] {
        for transformation in [ColorTransformation::Hp1, ColorTransformation::Hp2, ColorTransformation::Hp3] {
            for interleave_mode in [InterleaveMode::Line, InterleaveMode::Sample] {
                let mut parameters = ImageParameters::new(16, 9, bits, 3);
                parameters.interleave_mode = interleave_mode;
                parameters.color_transformation = transformation;
                assert_round_trip(&parameters, &random_image(&parameters, 11));
            }
        }
    }
}

#[test]
fn custom_thresholds_and_maximum_sample_value() {
    let mut parameters = ImageParameters::new(31, 13, 8, 1);
    parameters.custom = CustomThresholds {
        maximum_sample_value: 200,
        threshold1: 5,
        threshold2: 12,
        threshold3: 40,
        reset_value: 32,
    };
    assert_round_trip(&parameters, &random_image(&parameters, 5));

    parameters.allowed_lossy_error = 2;
    assert_round_trip(&parameters, &natural_image(&parameters, 6));
}

#[test]
fn padded_stride_source() {
    let mut parameters = ImageParameters::new(10, 6, 12, 3);
    parameters.interleave_mode = InterleaveMode::Line;
    parameters.stride = 64;
    let pixels = random_image(&parameters, 21);

    let encoded = encode_to_vec(&pixels, &parameters).unwrap();
    let (decoded, _) = decode_to_vec(&encoded).unwrap();
    for row in 0..6 {
        assert_eq!(&decoded[row * 60..row * 60 + 60], &pixels[row * 64..row * 64 + 60]);
    }
}

#[test]
fn stream_source_and_sink() {
    let parameters = ImageParameters::new(100, 70, 16, 1);
    let pixels = natural_image(&parameters, 8);

    let mut encoded = Vec::new();
    let size = {
        let mut sink = ByteSink::from_writer(&mut encoded);
        encode_stream(&mut sink, &pixels, &parameters).unwrap()
    };
    assert_eq!(size, encoded.len());

    let mut buffer = vec![0u8; encoded.len()];
    assert_eq!(encode(&mut buffer, &pixels, &parameters).unwrap(), encoded.len());
    assert_eq!(buffer, encoded);

    let mut reader = std::io::Cursor::new(encoded);
    let mut decoded = Vec::new();
    {
        let mut sink = ByteSink::from_writer(&mut decoded);
        decode_stream(&mut sink, ByteSource::from_reader(&mut reader), None).unwrap();
        sink.flush().unwrap();
    }
    assert_eq!(decoded, pixels);
}

#[test]
fn region_of_interest() {
    let mut parameters = ImageParameters::new(24, 20, 8, 3);
    parameters.interleave_mode = InterleaveMode::Sample;
    let pixels = natural_image(&parameters, 9);
    let encoded = encode_to_vec(&pixels, &parameters).unwrap();

    let region = Rect::new(5, 7, 10, 6);
    let mut destination = vec![0u8; 10 * 6 * 3];
    decode_rect(&mut destination, &encoded, region, None).unwrap();
    for row in 0..6 {
        let source_start = (7 + row) * 72 + 5 * 3;
        assert_eq!(&destination[row * 30..row * 30 + 30], &pixels[source_start..source_start + 30]);
    }
}

#[test]
fn region_of_planar_image() {
    let parameters = ImageParameters::new(12, 8, 8, 3);
    let pixels = random_image(&parameters, 10);
    let encoded = encode_to_vec(&pixels, &parameters).unwrap();

    let mut decoder = JpeglsDecoder::new(&encoded);
    decoder.read_header().unwrap();
    decoder.set_region(Rect::new(3, 2, 4, 5)).unwrap();
    let decoded = decoder.decode_to_vec().unwrap();
    assert_eq!(decoded.len(), 4 * 5 * 3);

    for plane in 0..3 {
        for row in 0..5 {
            let source_start = plane * 96 + (2 + row) * 12 + 3;
            let target_start = plane * 20 + row * 4;
            assert_eq!(&decoded[target_start..target_start + 4], &pixels[source_start..source_start + 4]);
        }
    }
}

#[test]
fn builder_round_trip() {
    let parameters = ImageParameters::new(33, 21, 10, 3);
    let mut encoder = JpeglsEncoder::new(parameters);
    encoder.set_interleave_mode(InterleaveMode::Line).unwrap();
    encoder.set_near_lossless(0).unwrap();
    let pixels = natural_image(encoder.parameters(), 12);
    let encoded = encoder.encode(&pixels).unwrap();

    let mut decoder = JpeglsDecoder::new(&encoded);
    let header = decoder.read_header().unwrap();
    assert_eq!(header.interleave_mode, InterleaveMode::Line);
    let mut decoded = vec![0u8; pixels.len()];
    decoder.decode(&mut decoded).unwrap();
    assert_eq!(decoded, pixels);
}

#[test]
fn truncated_stream_fails() {
    let parameters = ImageParameters::new(32, 32, 8, 1);
    let pixels = random_image(&parameters, 13);
    let encoded = encode_to_vec(&pixels, &parameters).unwrap();

    let mut destination = vec![0u8; pixels.len()];
    let truncated = &encoded[..encoded.len() / 2];
    assert_eq!(
        decode(&mut destination, truncated, None),
        Err(JlsError::CompressedBufferTooSmall)
    );
}
