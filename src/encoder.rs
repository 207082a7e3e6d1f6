//! Encoding entry points.

use crate::byte_stream::ByteSink;
use crate::coding_parameters::{CodingParameters, CustomThresholds, ImageParameters, JfifParameters};
use crate::constants::MAXIMUM_NEAR_LOSSLESS;
use crate::error::JlsError;
use crate::jpeg_stream_writer::{JpegSegment, JpegStreamWriter};
use crate::{ColorTransformation, InterleaveMode};

/// Encodes `source` as a complete JPEG-LS stream and returns the number of bytes written.
///
/// Nothing is written when the parameters are rejected.
pub fn encode_stream(destination: &mut ByteSink, source: &[u8], parameters: &ImageParameters) -> Result<usize, JlsError> {
    parameters.validate()?;
    if source.len() < parameters.uncompressed_size() {
        return Err(JlsError::UncompressedBufferTooSmall);
    }

    let interleave_mode = parameters.effective_interleave_mode();
    let stride = parameters.effective_stride();
    log::debug!(
        "encoding {}x{} image, {} bits, {} component(s), {interleave_mode:?} interleave, NEAR {}",
        parameters.width,
        parameters.height,
        parameters.bits_per_sample,
        parameters.component_count,
        parameters.allowed_lossy_error
    );

    let mut writer = JpegStreamWriter::new();
    if parameters.jfif.is_present() {
        writer.add_segment(JpegSegment::Jfif(parameters.jfif.clone()));
    }
    writer.add_segment(JpegSegment::StartOfFrame {
        width: parameters.width,
        height: parameters.height,
        bits_per_sample: parameters.bits_per_sample,
        component_count: parameters.component_count,
    });
    if parameters.color_transformation != ColorTransformation::None {
        writer.add_segment(JpegSegment::ColorTransform(parameters.color_transformation));
    }

    let scan_parameters = |component_count| CodingParameters {
        width: parameters.width,
        height: parameters.height,
        bits_per_sample: parameters.bits_per_sample,
        component_count,
        interleave_mode,
        near_lossless: parameters.allowed_lossy_error,
        stride,
        transformation: parameters.color_transformation,
        thresholds: parameters.custom,
    };

    if interleave_mode == InterleaveMode::None {
        let plane_size = stride * parameters.height as usize;
        for plane in source.chunks(plane_size).take(parameters.component_count as usize) {
            writer.add_scan(plane, scan_parameters(1));
        }
    } else {
        writer.add_scan(source, scan_parameters(parameters.component_count));
    }

    let size = writer.write(destination)?;
    destination.flush()?;
    log::debug!("encoded {size} bytes");
    Ok(size)
}

pub fn encode(destination: &mut [u8], source: &[u8], parameters: &ImageParameters) -> Result<usize, JlsError> {
    let mut sink = ByteSink::from_slice(destination);
    encode_stream(&mut sink, source, parameters)
}

pub fn encode_to_vec(source: &[u8], parameters: &ImageParameters) -> Result<Vec<u8>, JlsError> {
    let mut encoded = Vec::with_capacity(estimated_destination_size(parameters));
    {
        let mut sink = ByteSink::from_writer(&mut encoded);
        encode_stream(&mut sink, source, parameters)?;
    }
    Ok(encoded)
}

/// Destination size that fits the typical encoding of `parameters`.
pub fn estimated_destination_size(parameters: &ImageParameters) -> usize {
    parameters.width as usize
        * parameters.height as usize
        * parameters.component_count.max(0) as usize
        * parameters.bytes_per_sample()
        + 1024
        + parameters.jfif.thumbnail.len()
}

/// Builder style encoder around [`encode_stream`].
#[derive(Debug, Clone)]
pub struct JpeglsEncoder {
    parameters: ImageParameters,
}

impl JpeglsEncoder {
    pub fn new(parameters: ImageParameters) -> Self {
        Self { parameters }
    }

    pub fn parameters(&self) -> &ImageParameters {
        &self.parameters
    }

    pub fn set_near_lossless(&mut self, near_lossless: i32) -> Result<(), JlsError> {
        if !(0..=MAXIMUM_NEAR_LOSSLESS).contains(&near_lossless) {
            return Err(JlsError::InvalidJlsParameters);
        }
        self.parameters.allowed_lossy_error = near_lossless;
        Ok(())
    }

    pub fn set_interleave_mode(&mut self, interleave_mode: InterleaveMode) -> Result<(), JlsError> {
        self.parameters.interleave_mode = interleave_mode;
        Ok(())
    }

    pub fn set_color_transformation(&mut self, transformation: ColorTransformation) -> Result<(), JlsError> {
        self.parameters.color_transformation = transformation;
        Ok(())
    }

    pub fn set_custom_thresholds(&mut self, thresholds: CustomThresholds) -> Result<(), JlsError> {
        self.parameters.custom = thresholds;
        Ok(())
    }

    pub fn set_jfif(&mut self, jfif: JfifParameters) -> Result<(), JlsError> {
        if jfif.thumbnail.len() != jfif.thumbnail_size() || jfif.segment_length() > u16::MAX as usize {
            return Err(JlsError::InvalidJlsParameters);
        }
        self.parameters.jfif = jfif;
        Ok(())
    }

    pub fn encode(&self, source: &[u8]) -> Result<Vec<u8>, JlsError> {
        encode_to_vec(source, &self.parameters)
    }

    pub fn encode_into(&self, destination: &mut [u8], source: &[u8]) -> Result<usize, JlsError> {
        encode(destination, source, &self.parameters)
    }
}
