//! JPEG-LS codestream reader.
//!
//! Parses the marker segments in front of each scan and leaves the byte
//! source positioned on the first byte of the entropy coded data.

use crate::byte_stream::ByteSource;
use crate::coding_parameters::{
    CodingParameters, CustomThresholds, ImageParameters, JfifParameters, compute_maximum_near_lossless,
};
use crate::constants::{MAXIMUM_BITS_PER_SAMPLE, MINIMUM_BITS_PER_SAMPLE, SEGMENT_LENGTH_SIZE};
use crate::error::JlsError;
use crate::jpeg_marker_code::{JPEG_MARKER_START_BYTE, JpegMarkerCode};
use crate::{ColorTransformation, InterleaveMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JpegStreamReaderState {
    BeforeStartOfImage,
    HeaderSection,
    ScanSection,
    EndOfImage,
}

/// Fields of the most recent StartOfScan segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanHeader {
    component_count: i32,
    near_lossless: i32,
    interleave_mode: InterleaveMode,
}

/// Bounds checked cursor over the payload of one segment.
struct SegmentReader {
    data: Vec<u8>,
    position: usize,
}

impl SegmentReader {
    fn read_u8(&mut self) -> Result<u8, JlsError> {
        let value = *self.data.get(self.position).ok_or(JlsError::InvalidCompressedData)?;
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16, JlsError> {
        Ok(((self.read_u8()? as u16) << 8) | self.read_u8()? as u16)
    }

    fn read_bytes(&mut self, count: usize) -> Result<&[u8], JlsError> {
        let end = self.position + count;
        if end > self.data.len() {
            return Err(JlsError::InvalidCompressedData);
        }
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn starts_with(&self, prefix: &[u8]) -> bool {
        self.data[self.position..].starts_with(prefix)
    }
}

pub struct JpegStreamReader<'a> {
    source: ByteSource<'a>,
    state: JpegStreamReaderState,
    parameters: ImageParameters,
    frame_read: bool,
    scan: Option<ScanHeader>,
    components_in_scans: i32,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: ByteSource<'a>) -> Self {
        Self {
            source,
            state: JpegStreamReaderState::BeforeStartOfImage,
            parameters: ImageParameters::default(),
            frame_read: false,
            scan: None,
            components_in_scans: 0,
        }
    }

    /// Frame, scan and preset parameters read so far.
    pub fn parameters(&self) -> &ImageParameters {
        &self.parameters
    }

    pub fn source_mut(&mut self) -> &mut ByteSource<'a> {
        &mut self.source
    }

    /// Reads everything up to and including the first StartOfScan segment.
    pub fn read_header(&mut self) -> Result<(), JlsError> {
        if self.state != JpegStreamReaderState::BeforeStartOfImage {
            return Err(JlsError::UnexpectedFailure);
        }

        if self.read_next_marker()? != JpegMarkerCode::StartOfImage {
            return Err(JlsError::InvalidCompressedData);
        }
        self.state = JpegStreamReaderState::HeaderSection;

        self.read_until_start_of_scan()?;
        self.parameters.check_coherent()
    }

    /// Reads the segments between the previous scan and the next StartOfScan.
    pub fn read_next_scan_header(&mut self) -> Result<(), JlsError> {
        if self.state != JpegStreamReaderState::ScanSection {
            return Err(JlsError::UnexpectedFailure);
        }
        self.read_until_start_of_scan()
    }

    /// Expects EndOfImage after the last scan; comments and application data are skipped.
    pub fn read_end_of_image(&mut self) -> Result<(), JlsError> {
        loop {
            match self.read_next_marker()? {
                JpegMarkerCode::EndOfImage => {
                    self.state = JpegStreamReaderState::EndOfImage;
                    return Ok(());
                }
                JpegMarkerCode::Comment | JpegMarkerCode::ApplicationData7 | JpegMarkerCode::ApplicationData8 => {
                    self.read_segment()?;
                }
                marker => {
                    log::debug!("unexpected {marker:?} after the last scan");
                    return Err(JlsError::InvalidCompressedData);
                }
            }
        }
    }

    /// Coding parameters of the current scan for a pixel buffer with `stride` bytes per row.
    pub fn coding_parameters(&self, stride: usize) -> Result<CodingParameters, JlsError> {
        let scan = self.scan.as_ref().ok_or(JlsError::UnexpectedFailure)?;
        Ok(CodingParameters {
            width: self.parameters.width,
            height: self.parameters.height,
            bits_per_sample: self.parameters.bits_per_sample,
            component_count: scan.component_count,
            interleave_mode: scan.interleave_mode,
            near_lossless: scan.near_lossless,
            stride,
            transformation: self.parameters.color_transformation,
            thresholds: self.parameters.custom,
        })
    }

    fn read_until_start_of_scan(&mut self) -> Result<(), JlsError> {
        loop {
            let marker = self.read_next_marker()?;
            log::debug!("marker {marker:?} at offset {}", self.source.position() - 2);

            match marker {
                JpegMarkerCode::StartOfFrameJpegls => self.read_start_of_frame()?,
                JpegMarkerCode::JpeglsPresetParameters => self.read_preset_parameters()?,
                JpegMarkerCode::ApplicationData0 => self.read_application_data0()?,
                JpegMarkerCode::ApplicationData8 => self.read_color_transform()?,
                JpegMarkerCode::ApplicationData7 | JpegMarkerCode::Comment => {
                    self.read_segment()?;
                }
                JpegMarkerCode::StartOfScan => {
                    self.read_start_of_scan()?;
                    self.state = JpegStreamReaderState::ScanSection;
                    return Ok(());
                }
                JpegMarkerCode::StartOfImage | JpegMarkerCode::EndOfImage => {
                    return Err(JlsError::InvalidCompressedData);
                }
                marker if marker.is_foreign_start_of_frame() => {
                    return Err(JlsError::UnsupportedEncoding);
                }
                _ => return Err(JlsError::UnknownJpegMarker),
            }
        }
    }

    /// Reads a marker code, skipping 0xFF fill bytes in front of it (ITU-T T.81, B.1.1.2).
    fn read_next_marker(&mut self) -> Result<JpegMarkerCode, JlsError> {
        if self.source.read_u8()? != JPEG_MARKER_START_BYTE {
            return Err(JlsError::MissingJpegMarkerStart);
        }

        let mut code = self.source.read_u8()?;
        while code == JPEG_MARKER_START_BYTE {
            code = self.source.read_u8()?;
        }

        JpegMarkerCode::try_from(code).map_err(|_| {
            log::debug!("unknown marker code {code:#04X}");
            JlsError::UnknownJpegMarker
        })
    }

    fn read_segment(&mut self) -> Result<SegmentReader, JlsError> {
        let length = self.source.read_u16()? as usize;
        if length < SEGMENT_LENGTH_SIZE {
            return Err(JlsError::InvalidCompressedData);
        }
        let data = self.source.read_bytes(length - SEGMENT_LENGTH_SIZE)?;
        Ok(SegmentReader { data, position: 0 })
    }

    fn read_start_of_frame(&mut self) -> Result<(), JlsError> {
        if self.frame_read {
            return Err(JlsError::InvalidCompressedData);
        }

        let mut segment = self.read_segment()?;
        let bits_per_sample = segment.read_u8()? as i32;
        let height = segment.read_u16()? as u32;
        let width = segment.read_u16()? as u32;
        let component_count = segment.read_u8()? as i32;

        if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&bits_per_sample) {
            return Err(JlsError::ParameterValueNotSupported);
        }
        if width == 0 || height == 0 {
            return Err(JlsError::InvalidCompressedData);
        }
        if component_count == 0 {
            return Err(JlsError::InvalidJlsParameters);
        }

        // Component ID, sampling factors and quantization table selector.
        segment.read_bytes(3 * component_count as usize)?;

        log::debug!("frame {width}x{height}, {bits_per_sample} bits, {component_count} component(s)");
        self.parameters.width = width;
        self.parameters.height = height;
        self.parameters.bits_per_sample = bits_per_sample;
        self.parameters.component_count = component_count;
        self.frame_read = true;
        Ok(())
    }

    fn read_preset_parameters(&mut self) -> Result<(), JlsError> {
        let mut segment = self.read_segment()?;
        match segment.read_u8()? {
            1 => {
                let thresholds = CustomThresholds {
                    maximum_sample_value: segment.read_u16()? as i32,
                    threshold1: segment.read_u16()? as i32,
                    threshold2: segment.read_u16()? as i32,
                    threshold3: segment.read_u16()? as i32,
                    reset_value: segment.read_u16()? as i32,
                };
                log::debug!("preset coding parameters {thresholds:?}");
                self.parameters.custom = thresholds;
                Ok(())
            }
            // Mapping tables and oversize dimensions.
            2..=4 => Err(JlsError::ParameterValueNotSupported),
            _ => Err(JlsError::InvalidCompressedData),
        }
    }

    fn read_application_data0(&mut self) -> Result<(), JlsError> {
        let mut segment = self.read_segment()?;
        if !segment.starts_with(b"JFIF\0") {
            return Ok(());
        }
        segment.read_bytes(5)?;

        let mut jfif = JfifParameters {
            version: segment.read_u16()?,
            units: segment.read_u8()?,
            x_density: segment.read_u16()?,
            y_density: segment.read_u16()?,
            x_thumbnail: segment.read_u8()?,
            y_thumbnail: segment.read_u8()?,
            thumbnail: Vec::new(),
        };
        jfif.thumbnail = segment.read_bytes(jfif.thumbnail_size())?.to_vec();
        if segment.remaining() != 0 {
            log::debug!("{} bytes of padding after JFIF thumbnail", segment.remaining());
        }
        self.parameters.jfif = jfif;
        Ok(())
    }

    fn read_color_transform(&mut self) -> Result<(), JlsError> {
        let mut segment = self.read_segment()?;
        if segment.remaining() < 5 || !segment.starts_with(b"mrfx") {
            return Ok(());
        }
        segment.read_bytes(4)?;

        let value = segment.read_u8()?;
        self.parameters.color_transformation = match ColorTransformation::try_from(value) {
            Ok(transformation) => transformation,
            // RgbAsYuvLossy and Matrix
            Err(_) if value == 4 || value == 5 => return Err(JlsError::ImageTypeNotSupported),
            Err(_) => return Err(JlsError::InvalidCompressedData),
        };
        Ok(())
    }

    fn read_start_of_scan(&mut self) -> Result<(), JlsError> {
        if !self.frame_read {
            return Err(JlsError::InvalidCompressedData);
        }

        let mut segment = self.read_segment()?;
        let component_count = segment.read_u8()? as i32;
        if component_count == 0 {
            return Err(JlsError::InvalidCompressedData);
        }
        if component_count != 1 && component_count != self.parameters.component_count {
            return Err(JlsError::ParameterValueNotSupported);
        }
        if self.components_in_scans + component_count > self.parameters.component_count {
            return Err(JlsError::InvalidCompressedData);
        }

        let mut component_ids = Vec::with_capacity(component_count as usize);
        for _ in 0..component_count {
            component_ids.push(segment.read_u8()?);
            segment.read_u8()?; // Mapping table selector
        }

        let near_lossless = segment.read_u8()? as i32;
        let interleave_mode =
            InterleaveMode::try_from(segment.read_u8()?).map_err(|_| JlsError::InvalidCompressedData)?;
        if segment.read_u8()? != 0 {
            // Point transform
            return Err(JlsError::InvalidCompressedData);
        }

        let interleave_mode = if component_count == 1 {
            InterleaveMode::None
        } else if interleave_mode == InterleaveMode::None {
            return Err(JlsError::InvalidCompressedData);
        } else {
            interleave_mode
        };

        let maximum_sample_value = if self.parameters.custom.maximum_sample_value != 0 {
            self.parameters.custom.maximum_sample_value
        } else {
            (1 << self.parameters.bits_per_sample) - 1
        };
        if near_lossless > compute_maximum_near_lossless(maximum_sample_value) {
            return Err(JlsError::InvalidCompressedData);
        }

        log::debug!("scan of component(s) {component_ids:?}, NEAR {near_lossless}, {interleave_mode:?} interleave");
        self.components_in_scans += component_count;
        if self.scan.is_none() {
            self.parameters.interleave_mode = interleave_mode;
            self.parameters.allowed_lossy_error = near_lossless;
        }
        self.parameters.stride = self.parameters.default_stride();
        self.scan = Some(ScanHeader {
            component_count,
            near_lossless,
            interleave_mode,
        });
        Ok(())
    }
}
