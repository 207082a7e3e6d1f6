//! Transfer of pixel rows between the caller's buffer and the coder's line buffers.
//!
//! Line buffers hold every component of a scan one after the other, each with
//! one edge sample in front and one behind: sample `x` of component `c` lives
//! at `lines[c * line_stride + 1 + x]` with `line_stride = width + 2`.

use crate::ColorTransformation;
use crate::byte_stream::ByteSink;
use crate::color_transform;
use crate::error::JlsError;
use crate::scan_decoder::ScanDecoder;
use crate::scan_encoder::ScanEncoder;
use crate::traits::{CodecTraits, Sample, Triplet};
use std::fmt::Debug;

/// Rows of an uncompressed image as stored by the caller.
pub struct PixelSource<'p> {
    pub pixels: &'p [u8],
    pub stride: usize,
    pub width: usize,
    /// Samples stored side by side for one pixel.
    pub components: usize,
    pub transformation: ColorTransformation,
    pub range: i32,
}

/// Destination rows of a decoded region.
pub struct PixelSink<'s, 'a> {
    sink: &'s mut ByteSink<'a>,
    x: usize,
    width: usize,
    components: usize,
    row_padding: usize,
    transformation: ColorTransformation,
    range: i32,
    row_buffer: Vec<u8>,
}

impl<'s, 'a> PixelSink<'s, 'a> {
    pub fn new(
        sink: &'s mut ByteSink<'a>,
        x: usize,
        width: usize,
        components: usize,
        row_padding: usize,
        transformation: ColorTransformation,
        range: i32,
    ) -> Self {
        Self {
            sink,
            x,
            width,
            components,
            row_padding,
            transformation,
            range,
            row_buffer: Vec::new(),
        }
    }

    fn flush_row(&mut self) -> Result<(), JlsError> {
        self.sink.write_bytes(&self.row_buffer)?;
        self.sink.skip(self.row_padding)
    }
}

/// A unit coded by the scan coders: one sample, or one triplet in sample interleaved scans.
pub trait ScanPixel: Copy + Default + Debug {
    fn read_row(source: &PixelSource, row: usize, lines: &mut [Self], line_stride: usize);

    fn write_row(sink: &mut PixelSink, lines: &[Self], line_stride: usize) -> Result<(), JlsError>;

    fn encode_line<T: CodecTraits>(
        encoder: &mut ScanEncoder<'_, '_, T>,
        previous: &[Self],
        current: &mut [Self],
    ) -> Result<(), JlsError>;

    fn decode_line<T: CodecTraits>(
        decoder: &mut ScanDecoder<'_, '_, T>,
        previous: &[Self],
        current: &mut [Self],
    ) -> Result<(), JlsError>;
}

fn read_scalar_row<S: Sample>(source: &PixelSource, row: usize, lines: &mut [S], line_stride: usize) {
    let pixel_size = source.components * S::BYTES;
    let start = row * source.stride;
    let bytes = &source.pixels[start..start + source.width * pixel_size];

    if source.components == 3 && source.transformation != ColorTransformation::None {
        for (x, pixel) in bytes.chunks_exact(pixel_size).enumerate() {
            let (v1, v2, v3) = color_transform::forward(
                source.transformation,
                source.range,
                S::read(pixel).to_i32(),
                S::read(&pixel[S::BYTES..]).to_i32(),
                S::read(&pixel[2 * S::BYTES..]).to_i32(),
            );
            lines[1 + x] = S::from_i32(v1);
            lines[line_stride + 1 + x] = S::from_i32(v2);
            lines[2 * line_stride + 1 + x] = S::from_i32(v3);
        }
        return;
    }

    for (x, pixel) in bytes.chunks_exact(pixel_size).enumerate() {
        for (component, sample) in pixel.chunks_exact(S::BYTES).enumerate() {
            lines[component * line_stride + 1 + x] = S::read(sample);
        }
    }
}

fn write_scalar_row<S: Sample>(sink: &mut PixelSink, lines: &[S], line_stride: usize) -> Result<(), JlsError> {
    let components = sink.components;
    sink.row_buffer.resize(sink.width * components * S::BYTES, 0);

    for (i, pixel) in sink.row_buffer.chunks_exact_mut(components * S::BYTES).enumerate() {
        let x = sink.x + i;
        if components == 3 && sink.transformation != ColorTransformation::None {
            let (red, green, blue) = color_transform::inverse(
                sink.transformation,
                sink.range,
                lines[1 + x].to_i32(),
                lines[line_stride + 1 + x].to_i32(),
                lines[2 * line_stride + 1 + x].to_i32(),
            );
            S::from_i32(red).write(pixel);
            S::from_i32(green).write(&mut pixel[S::BYTES..]);
            S::from_i32(blue).write(&mut pixel[2 * S::BYTES..]);
        } else {
            for (component, sample) in pixel.chunks_exact_mut(S::BYTES).enumerate() {
                lines[component * line_stride + 1 + x].write(sample);
            }
        }
    }
    sink.flush_row()
}

fn read_triplet_row<S: Sample>(source: &PixelSource, row: usize, lines: &mut [Triplet<S>]) {
    let pixel_size = 3 * S::BYTES;
    let start = row * source.stride;
    let bytes = &source.pixels[start..start + source.width * pixel_size];

    for (x, pixel) in bytes.chunks_exact(pixel_size).enumerate() {
        let (v1, v2, v3) = color_transform::forward(
            source.transformation,
            source.range,
            S::read(pixel).to_i32(),
            S::read(&pixel[S::BYTES..]).to_i32(),
            S::read(&pixel[2 * S::BYTES..]).to_i32(),
        );
        lines[1 + x] = Triplet::new(v1, v2, v3);
    }
}

fn write_triplet_row<S: Sample>(sink: &mut PixelSink, lines: &[Triplet<S>]) -> Result<(), JlsError> {
    sink.row_buffer.resize(sink.width * 3 * S::BYTES, 0);

    for (i, pixel) in sink.row_buffer.chunks_exact_mut(3 * S::BYTES).enumerate() {
        let value = lines[1 + sink.x + i];
        let (red, green, blue) = color_transform::inverse(
            sink.transformation,
            sink.range,
            value.v1.to_i32(),
            value.v2.to_i32(),
            value.v3.to_i32(),
        );
        S::from_i32(red).write(pixel);
        S::from_i32(green).write(&mut pixel[S::BYTES..]);
        S::from_i32(blue).write(&mut pixel[2 * S::BYTES..]);
    }
    sink.flush_row()
}

macro_rules! impl_scalar_pixel {
    ($sample:ty) => {
        impl ScanPixel for $sample {
            fn read_row(source: &PixelSource, row: usize, lines: &mut [Self], line_stride: usize) {
                read_scalar_row(source, row, lines, line_stride);
            }

            fn write_row(sink: &mut PixelSink, lines: &[Self], line_stride: usize) -> Result<(), JlsError> {
                write_scalar_row(sink, lines, line_stride)
            }

            fn encode_line<T: CodecTraits>(
                encoder: &mut ScanEncoder<'_, '_, T>,
                previous: &[Self],
                current: &mut [Self],
            ) -> Result<(), JlsError> {
                encoder.encode_scalar_line(previous, current)
            }

            fn decode_line<T: CodecTraits>(
                decoder: &mut ScanDecoder<'_, '_, T>,
                previous: &[Self],
                current: &mut [Self],
            ) -> Result<(), JlsError> {
                decoder.decode_scalar_line(previous, current)
            }
        }
    };
}

macro_rules! impl_triplet_pixel {
    ($sample:ty) => {
        impl ScanPixel for Triplet<$sample> {
            fn read_row(source: &PixelSource, row: usize, lines: &mut [Self], _line_stride: usize) {
                read_triplet_row(source, row, lines);
            }

            fn write_row(sink: &mut PixelSink, lines: &[Self], _line_stride: usize) -> Result<(), JlsError> {
                write_triplet_row(sink, lines)
            }

            fn encode_line<T: CodecTraits>(
                encoder: &mut ScanEncoder<'_, '_, T>,
                previous: &[Self],
                current: &mut [Self],
            ) -> Result<(), JlsError> {
                encoder.encode_triplet_line(previous, current)
            }

            fn decode_line<T: CodecTraits>(
                decoder: &mut ScanDecoder<'_, '_, T>,
                previous: &[Self],
                current: &mut [Self],
            ) -> Result<(), JlsError> {
                decoder.decode_triplet_line(previous, current)
            }
        }
    };
}

impl_scalar_pixel!(u8);
impl_scalar_pixel!(u16);
impl_triplet_pixel!(u8);
impl_triplet_pixel!(u16);
