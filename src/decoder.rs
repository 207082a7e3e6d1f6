//! Decoding entry points.

use crate::byte_stream::{ByteSink, ByteSource};
use crate::codec_factory;
use crate::coding_parameters::{ImageParameters, Rect};
use crate::constants::AUTO_CALCULATE_STRIDE;
use crate::error::JlsError;
use crate::jpeg_stream_reader::JpegStreamReader;

/// Parses the stream up to the first scan header without decoding pixels.
pub fn read_header(source: ByteSource) -> Result<ImageParameters, JlsError> {
    let mut reader = JpegStreamReader::new(source);
    reader.read_header()?;
    Ok(reader.parameters().clone())
}

/// Decodes a complete image into `destination`.
///
/// A non-zero `stride` in `hint` sets the distance between output rows.
pub fn decode_stream(
    destination: &mut ByteSink,
    source: ByteSource,
    hint: Option<&ImageParameters>,
) -> Result<(), JlsError> {
    let mut reader = JpegStreamReader::new(source);
    reader.read_header()?;
    decode_region(&mut reader, destination, None, hint)?;
    destination.flush()
}

pub fn decode(destination: &mut [u8], source: &[u8], hint: Option<&ImageParameters>) -> Result<(), JlsError> {
    let mut sink = ByteSink::from_slice(destination);
    decode_stream(&mut sink, ByteSource::from_slice(source), hint)
}

/// Decodes only the pixels inside `region`. Output rows are `region.width` pixels wide.
pub fn decode_rect(
    destination: &mut [u8],
    source: &[u8],
    region: Rect,
    hint: Option<&ImageParameters>,
) -> Result<(), JlsError> {
    let mut reader = JpegStreamReader::new(ByteSource::from_slice(source));
    reader.read_header()?;
    let mut sink = ByteSink::from_slice(destination);
    decode_region(&mut reader, &mut sink, Some(region), hint)?;
    Ok(())
}

/// Decodes a complete image into a new buffer with the default stride.
pub fn decode_to_vec(source: &[u8]) -> Result<(Vec<u8>, ImageParameters), JlsError> {
    decode_into_vec(source, None)
}

/// The output size comes from the header, so it is reserved fallibly and
/// only filled as rows are decoded.
fn decode_into_vec(source: &[u8], region: Option<Rect>) -> Result<(Vec<u8>, ImageParameters), JlsError> {
    let mut reader = JpegStreamReader::new(ByteSource::from_slice(source));
    reader.read_header()?;

    let size = match region {
        Some(region) => region_size(reader.parameters(), region),
        None => reader.parameters().uncompressed_size(),
    };
    let mut pixels = Vec::new();
    pixels.try_reserve_exact(size).map_err(|_| {
        log::warn!("cannot reserve {size} bytes for the decoded image");
        JlsError::NotEnoughMemory
    })?;

    let parameters = {
        let mut sink = ByteSink::from_writer(&mut pixels);
        let parameters = decode_region(&mut reader, &mut sink, region, None)?;
        sink.flush()?;
        parameters
    };
    Ok((pixels, parameters))
}

/// Output size of `region` with the default stride; 0 when the region is outside the image.
fn region_size(parameters: &ImageParameters, region: Rect) -> usize {
    if region.x as u64 + region.width as u64 > parameters.width as u64
        || region.y as u64 + region.height as u64 > parameters.height as u64
    {
        return 0;
    }
    region.width as usize
        * region.height as usize
        * parameters.samples_per_pixel()
        * parameters.bytes_per_sample()
        * parameters.plane_count()
}

fn decode_region(
    reader: &mut JpegStreamReader,
    sink: &mut ByteSink,
    region: Option<Rect>,
    hint: Option<&ImageParameters>,
) -> Result<ImageParameters, JlsError> {
    let parameters = reader.parameters().clone();
    parameters.check_coherent()?;
    parameters.check_color_transformation()?;

    let region = region.unwrap_or(Rect::new(0, 0, parameters.width, parameters.height));
    if region.width == 0
        || region.height == 0
        || region.x as u64 + region.width as u64 > parameters.width as u64
        || region.y as u64 + region.height as u64 > parameters.height as u64
    {
        return Err(JlsError::InvalidJlsParameters);
    }

    let row_size = region.width as usize * parameters.samples_per_pixel() * parameters.bytes_per_sample();
    let stride = match hint.map(|hint| hint.stride) {
        Some(stride) if stride != AUTO_CALCULATE_STRIDE => stride,
        _ => row_size,
    };
    if stride < row_size {
        return Err(JlsError::InvalidJlsParameters);
    }

    let required = stride * region.height as usize * parameters.plane_count();
    if sink.remaining_capacity().is_some_and(|capacity| capacity < required) {
        return Err(JlsError::UncompressedBufferTooSmall);
    }

    log::debug!(
        "decoding {}x{} region at ({}, {}) of {}x{} image, {} bits, {} component(s), {:?} interleave, NEAR {}",
        region.width,
        region.height,
        region.x,
        region.y,
        parameters.width,
        parameters.height,
        parameters.bits_per_sample,
        parameters.component_count,
        parameters.interleave_mode,
        parameters.allowed_lossy_error
    );

    let mut components_decoded = 0;
    loop {
        let coding_parameters = reader.coding_parameters(stride)?;
        codec_factory::decode_scan(reader.source_mut(), sink, &coding_parameters, region, stride)?;

        components_decoded += coding_parameters.component_count;
        if components_decoded >= parameters.component_count {
            break;
        }
        reader.read_next_scan_header()?;
    }

    reader.read_end_of_image()?;
    Ok(parameters)
}

/// Stateful decoder: read the header, optionally select a region, then decode.
pub struct JpeglsDecoder<'a> {
    source: &'a [u8],
    parameters: Option<ImageParameters>,
    region: Option<Rect>,
}

impl<'a> JpeglsDecoder<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self {
            source,
            parameters: None,
            region: None,
        }
    }

    pub fn read_header(&mut self) -> Result<&ImageParameters, JlsError> {
        let parameters = read_header(ByteSource::from_slice(self.source))?;
        Ok(self.parameters.insert(parameters))
    }

    /// Header parameters, available after `read_header`.
    pub fn parameters(&self) -> Option<&ImageParameters> {
        self.parameters.as_ref()
    }

    pub fn set_region(&mut self, region: Rect) -> Result<(), JlsError> {
        if region.width == 0 || region.height == 0 {
            return Err(JlsError::InvalidJlsParameters);
        }
        self.region = Some(region);
        Ok(())
    }

    /// Size in bytes of the output of `decode` with the current region.
    pub fn destination_size(&self) -> Result<usize, JlsError> {
        let parameters = self.parameters.as_ref().ok_or(JlsError::UnexpectedFailure)?;
        let region = self
            .region
            .unwrap_or(Rect::new(0, 0, parameters.width, parameters.height));
        Ok(region_size(parameters, region))
    }

    pub fn decode(&mut self, destination: &mut [u8]) -> Result<(), JlsError> {
        if self.parameters.is_none() {
            self.read_header()?;
        }
        match self.region {
            Some(region) => decode_rect(destination, self.source, region, None),
            None => decode(destination, self.source, None),
        }
    }

    pub fn decode_to_vec(&mut self) -> Result<Vec<u8>, JlsError> {
        let (pixels, parameters) = decode_into_vec(self.source, self.region)?;
        self.parameters = Some(parameters);
        Ok(pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::encode_to_vec;

    fn gradient_image(width: u32, height: u32) -> (Vec<u8>, ImageParameters) {
        let parameters = ImageParameters::new(width, height, 8, 1);
        let pixels = (0..width * height).map(|i| ((i % width) * 7 + (i / width) * 3) as u8).collect();
        (pixels, parameters)
    }

    #[test]
    fn header_only() {
        let (pixels, parameters) = gradient_image(9, 5);
        let encoded = encode_to_vec(&pixels, &parameters).unwrap();
        let header = read_header(ByteSource::from_slice(&encoded)).unwrap();
        assert_eq!(header.width, 9);
        assert_eq!(header.height, 5);
        assert_eq!(header.stride, 9);
    }

    #[test]
    fn destination_too_small() {
        let (pixels, parameters) = gradient_image(8, 8);
        let encoded = encode_to_vec(&pixels, &parameters).unwrap();
        let mut destination = vec![0u8; 63];
        assert_eq!(
            decode(&mut destination, &encoded, None),
            Err(JlsError::UncompressedBufferTooSmall)
        );
    }

    #[test]
    fn stride_hint_pads_rows() {
        let (pixels, parameters) = gradient_image(6, 4);
        let encoded = encode_to_vec(&pixels, &parameters).unwrap();
        let hint = ImageParameters {
            stride: 10,
            ..parameters.clone()
        };
        let mut destination = vec![0xAAu8; 40];
        decode(&mut destination, &encoded, Some(&hint)).unwrap();
        for row in 0..4 {
            assert_eq!(&destination[row * 10..row * 10 + 6], &pixels[row * 6..row * 6 + 6]);
            assert_eq!(&destination[row * 10 + 6..row * 10 + 10], &[0xAA; 4]);
        }

        let narrow = ImageParameters { stride: 5, ..parameters };
        assert_eq!(
            decode(&mut destination, &encoded, Some(&narrow)),
            Err(JlsError::InvalidJlsParameters)
        );
    }

    #[test]
    fn region_outside_image() {
        let (pixels, parameters) = gradient_image(8, 8);
        let encoded = encode_to_vec(&pixels, &parameters).unwrap();
        let mut destination = vec![0u8; 64];
        assert_eq!(
            decode_rect(&mut destination, &encoded, Rect::new(4, 4, 5, 1), None),
            Err(JlsError::InvalidJlsParameters)
        );
    }

    #[test]
    fn decoder_region() {
        let (pixels, parameters) = gradient_image(8, 6);
        let encoded = encode_to_vec(&pixels, &parameters).unwrap();

        let mut decoder = JpeglsDecoder::new(&encoded);
        assert_eq!(decoder.read_header().unwrap().width, 8);
        decoder.set_region(Rect::new(2, 1, 3, 4)).unwrap();
        assert_eq!(decoder.destination_size().unwrap(), 12);

        let region = decoder.decode_to_vec().unwrap();
        let expected: Vec<u8> = (1..5)
            .flat_map(|y| pixels[y * 8 + 2..y * 8 + 5].to_vec())
            .collect();
        assert_eq!(region, expected);
    }

    #[test]
    fn missing_end_of_image() {
        let (pixels, parameters) = gradient_image(4, 4);
        let mut encoded = encode_to_vec(&pixels, &parameters).unwrap();
        let length = encoded.len();
        encoded[length - 1] = 0xFE;
        encoded.extend_from_slice(&[0, 2]);
        // A trailing comment segment without EOI.
        assert_eq!(
            decode_to_vec(&encoded).map(|(pixels, _)| pixels),
            Err(JlsError::CompressedBufferTooSmall)
        );
    }
}
