use crate::bit_reader::BitReader;
use crate::byte_stream::ByteSource;
use crate::coding_parameters::{CustomThresholds, compute_bits_per_pixel};
use crate::constants::{CONTEXT_COUNT, J};
use crate::error::JlsError;
use crate::golomb_lut;
use crate::process_line::{PixelSink, ScanPixel};
use crate::quantization::GradientQuantizer;
use crate::regular_mode_context::RegularModeContext;
use crate::run_mode_context::RunModeContext;
use crate::traits::{
    CodecTraits, Sample, Triplet, apply_sign, bit_wise_sign, get_predicted_value, sign, unmap_error_value,
};

/// Decodes one entropy coded segment back into pixel rows.
pub struct ScanDecoder<'s, 'a, T: CodecTraits> {
    traits: T,
    reader: BitReader<'s, 'a>,
    quantizer: GradientQuantizer,
    regular_mode_contexts: Vec<RegularModeContext>,
    run_mode_contexts: [RunModeContext; 2],
    run_index: usize,
}

impl<'s, 'a, T: CodecTraits> ScanDecoder<'s, 'a, T> {
    pub fn new(traits: T, thresholds: &CustomThresholds, source: &'s mut ByteSource<'a>) -> Self {
        let range = traits.range();
        Self {
            quantizer: GradientQuantizer::new(
                compute_bits_per_pixel(traits.maximum_sample_value()),
                thresholds,
                traits.near_lossless(),
            ),
            reader: BitReader::new(source),
            regular_mode_contexts: vec![RegularModeContext::new(range); CONTEXT_COUNT],
            run_mode_contexts: [RunModeContext::new(0, range), RunModeContext::new(1, range)],
            run_index: 0,
            traits,
        }
    }

    /// Decodes all `height` rows of the scan and hands `rows` of them to `sink`.
    ///
    /// Rows outside `rows` are still decoded, as every row predicts from the one above.
    pub fn decode_scan<P: ScanPixel>(
        mut self,
        sink: &mut PixelSink,
        width: usize,
        height: usize,
        line_components: usize,
        rows: std::ops::Range<usize>,
    ) -> Result<(), JlsError> {
        let line_stride = width + 2;
        let mut previous = vec![P::default(); line_components * line_stride];
        let mut current = previous.clone();
        let mut run_indices = vec![0usize; line_components];

        for row in 0..height {
            std::mem::swap(&mut previous, &mut current);

            for (component, run_index) in run_indices.iter_mut().enumerate() {
                let start = component * line_stride;
                let end = start + line_stride;
                self.run_index = *run_index;

                previous[start + width + 1] = previous[start + width];
                current[start] = previous[start + 1];

                P::decode_line(&mut self, &previous[start..end], &mut current[start..end])?;
                *run_index = self.run_index;
            }

            if rows.contains(&row) {
                P::write_row(sink, &current, line_stride)?;
            }
        }

        self.reader.end_scan()
    }

    pub(crate) fn decode_scalar_line<S: Sample>(&mut self, previous: &[S], current: &mut [S]) -> Result<(), JlsError> {
        let width = current.len() - 2;
        let mut index = 0;
        let mut rb = previous[0].to_i32();
        let mut rd = previous[1].to_i32();

        while index < width {
            let ra = current[index].to_i32();
            let rc = rb;
            rb = rd;
            rd = previous[index + 2].to_i32();

            let qs = self.quantizer.context_id(rd - rb, rb - rc, rc - ra);
            if qs != 0 {
                let value = self.decode_regular(qs, get_predicted_value(ra, rb, rc))?;
                current[index + 1] = S::from_i32(value);
                index += 1;
            } else {
                index += self.decode_scalar_run_mode(index, previous, current)?;
                rb = previous[index].to_i32();
                rd = previous[index + 1].to_i32();
            }
        }
        Ok(())
    }

    pub(crate) fn decode_triplet_line<S: Sample>(
        &mut self,
        previous: &[Triplet<S>],
        current: &mut [Triplet<S>],
    ) -> Result<(), JlsError> {
        let width = current.len() - 2;
        let mut index = 0;

        while index < width {
            let ra = current[index];
            let rc = previous[index];
            let rb = previous[index + 1];
            let rd = previous[index + 2];

            let qs1 = self.context_id(rd.v1, rb.v1, rc.v1, ra.v1);
            let qs2 = self.context_id(rd.v2, rb.v2, rc.v2, ra.v2);
            let qs3 = self.context_id(rd.v3, rb.v3, rc.v3, ra.v3);

            if qs1 == 0 && qs2 == 0 && qs3 == 0 {
                index += self.decode_triplet_run_mode(index, previous, current)?;
            } else {
                let v1 = self.decode_regular(
                    qs1,
                    get_predicted_value(ra.v1.to_i32(), rb.v1.to_i32(), rc.v1.to_i32()),
                )?;
                let v2 = self.decode_regular(
                    qs2,
                    get_predicted_value(ra.v2.to_i32(), rb.v2.to_i32(), rc.v2.to_i32()),
                )?;
                let v3 = self.decode_regular(
                    qs3,
                    get_predicted_value(ra.v3.to_i32(), rb.v3.to_i32(), rc.v3.to_i32()),
                )?;
                current[index + 1] = Triplet::new(v1, v2, v3);
                index += 1;
            }
        }
        Ok(())
    }

    #[inline]
    fn context_id<S: Sample>(&self, rd: S, rb: S, rc: S, ra: S) -> i32 {
        let (rd, rb, rc, ra) = (rd.to_i32(), rb.to_i32(), rc.to_i32(), ra.to_i32());
        self.quantizer.context_id(rd - rb, rb - rc, rc - ra)
    }

    fn decode_regular(&mut self, qs: i32, predicted: i32) -> Result<i32, JlsError> {
        let traits = self.traits;
        let sign = bit_wise_sign(qs);
        let context_index = apply_sign(qs, sign) as usize;
        let context = self.regular_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter()?;
        let predicted_value = traits.correct_prediction(predicted + apply_sign(context.c(), sign));

        let code = golomb_lut::lookup(k, self.reader.peek_byte()?);
        let mut error_value = if code.bit_count != 0 {
            self.reader.skip(code.bit_count as u32)?;
            unmap_error_value(code.mapped_value as i32)
        } else {
            let error_value = unmap_error_value(self.decode_value(k, traits.limit())?);
            if error_value.abs() > 65535 {
                return Err(JlsError::InvalidCompressedData);
            }
            error_value
        };

        if k == 0 {
            error_value ^= context.error_correction(traits.near_lossless());
        }
        self.regular_mode_contexts[context_index].update_variables_and_bias(
            error_value,
            traits.near_lossless(),
            traits.reset_threshold(),
        )?;

        Ok(traits.compute_reconstructed_sample(predicted_value, apply_sign(error_value, sign)))
    }

    fn decode_value(&mut self, k: i32, limit: i32) -> Result<i32, JlsError> {
        let quantized_bits_per_pixel = self.traits.quantized_bits_per_pixel();
        let escape = limit - quantized_bits_per_pixel - 1;
        let high_bits = self.reader.read_high_bits(escape)?;

        if high_bits >= escape {
            return Ok(self.reader.read_value(quantized_bits_per_pixel as u32)? + 1);
        }
        if k == 0 {
            return Ok(high_bits);
        }
        Ok((high_bits << k) + self.reader.read_value(k as u32)?)
    }

    fn decode_scalar_run_mode<S: Sample>(
        &mut self,
        start_index: usize,
        previous: &[S],
        current: &mut [S],
    ) -> Result<usize, JlsError> {
        let remaining = current.len() - 2 - start_index;
        let ra = current[start_index];
        let run_length = self.decode_run_pixels(remaining)?;
        current[start_index + 1..start_index + 1 + run_length].fill(ra);

        if run_length == remaining {
            return Ok(run_length);
        }

        let position = start_index + 1 + run_length;
        let value = self.decode_scalar_run_interruption(ra.to_i32(), previous[position].to_i32())?;
        current[position] = S::from_i32(value);
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_triplet_run_mode<S: Sample>(
        &mut self,
        start_index: usize,
        previous: &[Triplet<S>],
        current: &mut [Triplet<S>],
    ) -> Result<usize, JlsError> {
        let remaining = current.len() - 2 - start_index;
        let ra = current[start_index];
        let run_length = self.decode_run_pixels(remaining)?;
        current[start_index + 1..start_index + 1 + run_length].fill(ra);

        if run_length == remaining {
            return Ok(run_length);
        }

        let position = start_index + 1 + run_length;
        let rb = previous[position];
        let v1 = self.decode_triplet_channel(ra.v1.to_i32(), rb.v1.to_i32())?;
        let v2 = self.decode_triplet_channel(ra.v2.to_i32(), rb.v2.to_i32())?;
        let v3 = self.decode_triplet_channel(ra.v3.to_i32(), rb.v3.to_i32())?;
        current[position] = Triplet::new(v1, v2, v3);
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_run_pixels(&mut self, pixel_count: usize) -> Result<usize, JlsError> {
        let mut index = 0;
        while self.reader.read_bit()? {
            let chunk = 1usize << J[self.run_index];
            let count = chunk.min(pixel_count - index);
            index += count;

            if count == chunk {
                self.increment_run_index();
            }
            if index == pixel_count {
                break;
            }
        }

        if index != pixel_count {
            // Incomplete run: the remainder follows in J[RUNindex] bits.
            index += self.reader.read_value(J[self.run_index] as u32)? as usize;
        }

        if index > pixel_count {
            return Err(JlsError::InvalidCompressedData);
        }
        Ok(index)
    }

    fn decode_scalar_run_interruption(&mut self, ra: i32, rb: i32) -> Result<i32, JlsError> {
        let traits = self.traits;
        if (ra - rb).abs() <= traits.near_lossless() {
            let error_value = self.decode_run_interruption_error(1)?;
            return Ok(traits.compute_reconstructed_sample(ra, error_value));
        }

        let error_value = self.decode_run_interruption_error(0)?;
        Ok(traits.compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
    }

    fn decode_triplet_channel(&mut self, ra: i32, rb: i32) -> Result<i32, JlsError> {
        let error_value = self.decode_run_interruption_error(0)?;
        Ok(self.traits.compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
    }

    fn decode_run_interruption_error(&mut self, context_index: usize) -> Result<i32, JlsError> {
        let context = self.run_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter()?;
        let limit = self.traits.limit() - J[self.run_index] - 1;
        let e_mapped_error_value = self.decode_value(k, limit)?;
        let error_value = context.decode_error_value(e_mapped_error_value + context.run_interruption_type(), k);

        self.run_mode_contexts[context_index].update_variables(
            error_value,
            e_mapped_error_value,
            self.traits.reset_threshold(),
        );
        Ok(error_value)
    }

    fn increment_run_index(&mut self) {
        self.run_index = (self.run_index + 1).min(31);
    }

    fn decrement_run_index(&mut self) {
        self.run_index = self.run_index.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColorTransformation;
    use crate::byte_stream::ByteSink;
    use crate::coding_parameters::compute_default;
    use crate::traits::LosslessTraits;

    fn decode_plane(scan: &[u8], width: usize, height: usize) -> Result<Vec<u8>, JlsError> {
        let mut data = scan.to_vec();
        data.extend_from_slice(&[0xFF, 0xD9]);
        let mut source = ByteSource::from_slice(&data);
        let mut output = vec![0u8; width * height];
        let mut sink = ByteSink::from_slice(&mut output);
        let mut pixel_sink = PixelSink::new(&mut sink, 0, width, 1, 0, ColorTransformation::None, 256);
        let decoder = ScanDecoder::new(LosslessTraits::<8>, &compute_default(255, 0), &mut source);
        decoder.decode_scan::<u8>(&mut pixel_sink, width, height, 1, 0..height)?;
        Ok(output)
    }

    #[test]
    fn flat_image_decodes_from_run_bits() {
        assert_eq!(decode_plane(&[0xFF, 0x7F, 0xFF, 0x7E], 16, 16).unwrap(), vec![0u8; 256]);
    }

    #[test]
    fn run_longer_than_line_is_rejected() {
        // J[0] = 0: a "0" bit terminates the run with a zero bit remainder,
        // but one "1" bit already covers the single pixel of the line.
        assert_eq!(decode_plane(&[0b1000_0000], 1, 1).unwrap(), vec![0]);
        assert!(decode_plane(&[0b0000_0000, 0, 0, 0, 0], 1, 1).is_err());
    }

    #[test]
    fn missing_scan_data_is_reported() {
        assert_eq!(decode_plane(&[0xFF, 0x7F], 16, 16), Err(JlsError::InvalidCompressedData));
    }
}
