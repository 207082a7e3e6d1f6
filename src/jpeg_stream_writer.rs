//! JPEG-LS codestream writer.
//!
//! An encode call describes the stream as an ordered list of segments and then
//! serializes it in one pass. Scan data is produced while writing, so the
//! pixels are borrowed by the `ImageData` segments until `write` returns.

use crate::byte_stream::ByteSink;
use crate::codec_factory;
use crate::coding_parameters::{CodingParameters, CustomThresholds, JfifParameters, compute_default};
use crate::constants::SEGMENT_LENGTH_SIZE;
use crate::error::JlsError;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::{ColorTransformation, InterleaveMode};

/// One marker segment of a JPEG-LS stream.
#[derive(Debug, Clone)]
pub enum JpegSegment<'p> {
    StartOfImage,
    EndOfImage,
    StartOfFrame {
        width: u32,
        height: u32,
        bits_per_sample: i32,
        component_count: i32,
    },
    Jfif(JfifParameters),
    PresetParameters(CustomThresholds),
    ColorTransform(ColorTransformation),
    StartOfScan {
        component_ids: Vec<u8>,
        near_lossless: i32,
        interleave_mode: InterleaveMode,
    },
    ImageData {
        pixels: &'p [u8],
        parameters: CodingParameters,
    },
}

/// Collects the segments of a stream and writes them between SOI and EOI.
#[derive(Debug, Default)]
pub struct JpegStreamWriter<'p> {
    segments: Vec<JpegSegment<'p>>,
    last_component_index: i32,
}

impl<'p> JpegStreamWriter<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_segment(&mut self, segment: JpegSegment<'p>) {
        self.segments.push(segment);
    }

    /// Appends the preset parameters (when needed), scan header and scan data of one scan.
    pub fn add_scan(&mut self, pixels: &'p [u8], parameters: CodingParameters) {
        let thresholds = parameters.thresholds;
        if !thresholds.is_default() {
            self.add_segment(JpegSegment::PresetParameters(thresholds));
        } else if parameters.bits_per_sample > 12 {
            // Readers disagree on the defaults for MAXVAL > 4095, so they are always signalled.
            let maximum_sample_value = (1 << parameters.bits_per_sample) - 1;
            self.add_segment(JpegSegment::PresetParameters(compute_default(
                maximum_sample_value,
                parameters.near_lossless,
            )));
        }

        let component_ids = if parameters.interleave_mode == InterleaveMode::None {
            self.last_component_index += 1;
            vec![self.last_component_index as u8]
        } else {
            (1..=parameters.component_count).map(|id| id as u8).collect()
        };

        self.add_segment(JpegSegment::StartOfScan {
            component_ids,
            near_lossless: parameters.near_lossless,
            interleave_mode: parameters.interleave_mode,
        });
        self.add_segment(JpegSegment::ImageData { pixels, parameters });
    }

    pub fn segments(&self) -> &[JpegSegment<'p>] {
        &self.segments
    }

    /// Writes SOI, every segment in order and EOI. Returns the number of bytes written.
    pub fn write(&self, sink: &mut ByteSink) -> Result<usize, JlsError> {
        let start = sink.bytes_written();
        write_segment(sink, &JpegSegment::StartOfImage)?;
        for segment in &self.segments {
            write_segment(sink, segment)?;
        }
        write_segment(sink, &JpegSegment::EndOfImage)?;
        Ok(sink.bytes_written() - start)
    }
}

fn write_marker(sink: &mut ByteSink, marker: JpegMarkerCode) -> Result<(), JlsError> {
    sink.write_u8(JPEG_MARKER_START_BYTE)?;
    sink.write_u8(marker.into())
}

fn write_segment_header(sink: &mut ByteSink, marker: JpegMarkerCode, payload_size: usize) -> Result<(), JlsError> {
    let length = u16::try_from(payload_size + SEGMENT_LENGTH_SIZE).map_err(|_| JlsError::InvalidJlsParameters)?;
    write_marker(sink, marker)?;
    sink.write_u16(length)
}

fn write_segment(sink: &mut ByteSink, segment: &JpegSegment) -> Result<(), JlsError> {
    match segment {
        JpegSegment::StartOfImage => write_marker(sink, JpegMarkerCode::StartOfImage),
        JpegSegment::EndOfImage => write_marker(sink, JpegMarkerCode::EndOfImage),
        JpegSegment::StartOfFrame {
            width,
            height,
            bits_per_sample,
            component_count,
        } => {
            log::trace!("SOF55 {width}x{height}, {bits_per_sample} bits, {component_count} component(s)");
            write_segment_header(sink, JpegMarkerCode::StartOfFrameJpegls, 6 + 3 * *component_count as usize)?;
            sink.write_u8(*bits_per_sample as u8)?;
            sink.write_u16(*height as u16)?;
            sink.write_u16(*width as u16)?;
            sink.write_u8(*component_count as u8)?;
            for component in 0..*component_count {
                sink.write_u8((component + 1) as u8)?; // Component ID
                sink.write_u8(0x11)?; // H=1, V=1
                sink.write_u8(0)?; // Tq
            }
            Ok(())
        }
        JpegSegment::Jfif(jfif) => {
            write_segment_header(sink, JpegMarkerCode::ApplicationData0, jfif.segment_length() - SEGMENT_LENGTH_SIZE)?;
            sink.write_bytes(b"JFIF\0")?;
            sink.write_u16(jfif.version)?;
            sink.write_u8(jfif.units)?;
            sink.write_u16(jfif.x_density)?;
            sink.write_u16(jfif.y_density)?;
            sink.write_u8(jfif.x_thumbnail)?;
            sink.write_u8(jfif.y_thumbnail)?;
            sink.write_bytes(&jfif.thumbnail)
        }
        JpegSegment::PresetParameters(thresholds) => {
            log::trace!("LSE preset coding parameters {thresholds:?}");
            write_segment_header(sink, JpegMarkerCode::JpeglsPresetParameters, 1 + 5 * 2)?;
            sink.write_u8(1)?; // Type 1: preset coding parameters
            for value in [
                thresholds.maximum_sample_value,
                thresholds.threshold1,
                thresholds.threshold2,
                thresholds.threshold3,
                thresholds.reset_value,
            ] {
                sink.write_u16(value as u16)?;
            }
            Ok(())
        }
        JpegSegment::ColorTransform(transformation) => {
            write_segment_header(sink, JpegMarkerCode::ApplicationData8, 5)?;
            sink.write_bytes(b"mrfx")?;
            sink.write_u8((*transformation).into())
        }
        JpegSegment::StartOfScan {
            component_ids,
            near_lossless,
            interleave_mode,
        } => {
            write_segment_header(sink, JpegMarkerCode::StartOfScan, 1 + 2 * component_ids.len() + 3)?;
            sink.write_u8(component_ids.len() as u8)?;
            for &id in component_ids {
                sink.write_u8(id)?;
                sink.write_u8(0)?; // Mapping table selector
            }
            sink.write_u8(*near_lossless as u8)?;
            sink.write_u8((*interleave_mode).into())?;
            sink.write_u8(0) // Point transform
        }
        JpegSegment::ImageData { pixels, parameters } => {
            let size = codec_factory::encode_scan(sink, pixels, parameters)?;
            log::trace!("scan data: {size} bytes");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorTransformation;

    fn write(writer: &JpegStreamWriter) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut sink = ByteSink::from_writer(&mut output);
            writer.write(&mut sink).unwrap();
            sink.flush().unwrap();
        }
        output
    }

    fn scan_parameters(bits_per_sample: i32) -> CodingParameters {
        CodingParameters {
            width: 1,
            height: 1,
            bits_per_sample,
            component_count: 1,
            interleave_mode: InterleaveMode::None,
            near_lossless: 0,
            stride: 2,
            transformation: ColorTransformation::None,
            thresholds: CustomThresholds::default(),
        }
    }

    #[test]
    fn empty_stream_is_soi_eoi() {
        assert_eq!(write(&JpegStreamWriter::new()), vec![0xFF, 0xD8, 0xFF, 0xD9]);
    }

    #[test]
    fn frame_and_transform_segments() {
        let mut writer = JpegStreamWriter::new();
        writer.add_segment(JpegSegment::StartOfFrame {
            width: 300,
            height: 2,
            bits_per_sample: 8,
            component_count: 3,
        });
        writer.add_segment(JpegSegment::ColorTransform(ColorTransformation::Hp2));
        let bytes = write(&writer);
        assert_eq!(
            &bytes[2..21],
            &[
                0xFF, 0xF7, 0, 17, 8, 0, 2, 0x01, 0x2C, 3, 1, 0x11, 0, 2, 0x11, 0, 3, 0x11, 0
            ]
        );
        assert_eq!(&bytes[21..30], &[0xFF, 0xE8, 0, 7, b'm', b'r', b'f', b'x', 2]);
    }

    #[test]
    fn sixteen_bit_scans_signal_default_thresholds() {
        let pixels = [0u8; 2];
        let mut writer = JpegStreamWriter::new();
        writer.add_scan(&pixels, scan_parameters(16));
        assert!(matches!(
            writer.segments()[0],
            JpegSegment::PresetParameters(CustomThresholds {
                maximum_sample_value: 65535,
                threshold1: 18,
                threshold2: 67,
                threshold3: 276,
                reset_value: 64,
            })
        ));

        let mut writer = JpegStreamWriter::new();
        writer.add_scan(&pixels, scan_parameters(8));
        assert!(matches!(writer.segments()[0], JpegSegment::StartOfScan { .. }));
    }

    #[test]
    fn non_interleaved_scans_number_components() {
        let pixels = [0u8; 1];
        let mut writer = JpegStreamWriter::new();
        writer.add_scan(&pixels, scan_parameters(8));
        writer.add_scan(&pixels, scan_parameters(8));
        let ids: Vec<Vec<u8>> = writer
            .segments()
            .iter()
            .filter_map(|segment| match segment {
                JpegSegment::StartOfScan { component_ids, .. } => Some(component_ids.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![vec![1], vec![2]]);
    }

    #[test]
    fn jfif_segment_layout() {
        let mut writer = JpegStreamWriter::new();
        writer.add_segment(JpegSegment::Jfif(JfifParameters {
            version: 0x0102,
            units: 1,
            x_density: 72,
            y_density: 72,
            ..Default::default()
        }));
        let bytes = write(&writer);
        assert_eq!(
            &bytes[2..20],
            &[0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F', 0, 1, 2, 1, 0, 72, 0, 72, 0, 0]
        );
    }
}
