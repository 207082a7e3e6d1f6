use crate::bit_writer::BitWriter;
use crate::byte_stream::ByteSink;
use crate::coding_parameters::{CustomThresholds, compute_bits_per_pixel};
use crate::constants::{CONTEXT_COUNT, J};
use crate::error::JlsError;
use crate::process_line::{PixelSource, ScanPixel};
use crate::quantization::GradientQuantizer;
use crate::regular_mode_context::RegularModeContext;
use crate::run_mode_context::RunModeContext;
use crate::traits::{
    CodecTraits, Sample, Triplet, apply_sign, bit_wise_sign, get_predicted_value, map_error_value, sign,
};

/// Encodes the pixels of one scan into an entropy coded segment (ISO/IEC 14495-1, annex A).
pub struct ScanEncoder<'s, 'a, T: CodecTraits> {
    traits: T,
    writer: BitWriter<'s, 'a>,
    quantizer: GradientQuantizer,
    regular_mode_contexts: Vec<RegularModeContext>,
    run_mode_contexts: [RunModeContext; 2],
    run_index: usize,
}

impl<'s, 'a, T: CodecTraits> ScanEncoder<'s, 'a, T> {
    /// `thresholds` must be resolved against the scan parameters.
    pub fn new(traits: T, thresholds: &CustomThresholds, sink: &'s mut ByteSink<'a>) -> Self {
        let range = traits.range();
        Self {
            quantizer: GradientQuantizer::new(
                compute_bits_per_pixel(traits.maximum_sample_value()),
                thresholds,
                traits.near_lossless(),
            ),
            writer: BitWriter::new(sink),
            regular_mode_contexts: vec![RegularModeContext::new(range); CONTEXT_COUNT],
            run_mode_contexts: [RunModeContext::new(0, range), RunModeContext::new(1, range)],
            run_index: 0,
            traits,
        }
    }

    /// Encodes `height` rows of `source` and returns the byte count of the coded segment.
    pub fn encode_scan<P: ScanPixel>(
        mut self,
        source: &PixelSource,
        height: usize,
        line_components: usize,
    ) -> Result<usize, JlsError> {
        let width = source.width;
        let line_stride = width + 2;
        let mut previous = vec![P::default(); line_components * line_stride];
        let mut current = previous.clone();
        let mut run_indices = vec![0usize; line_components];

        for row in 0..height {
            std::mem::swap(&mut previous, &mut current);
            P::read_row(source, row, &mut current, line_stride);

            for (component, run_index) in run_indices.iter_mut().enumerate() {
                let start = component * line_stride;
                let end = start + line_stride;
                self.run_index = *run_index;

                // Edge samples used by the predictor.
                previous[start + width + 1] = previous[start + width];
                current[start] = previous[start + 1];

                P::encode_line(&mut self, &previous[start..end], &mut current[start..end])?;
                *run_index = self.run_index;
            }
        }

        self.writer.end_scan()
    }

    pub(crate) fn encode_scalar_line<S: Sample>(&mut self, previous: &[S], current: &mut [S]) -> Result<(), JlsError> {
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
                let x = current[index + 1].to_i32();
                let value = self.encode_regular(qs, x, get_predicted_value(ra, rb, rc))?;
                current[index + 1] = S::from_i32(value);
                index += 1;
            } else {
                index += self.encode_scalar_run_mode(index, previous, current)?;
                rb = previous[index].to_i32();
                rd = previous[index + 1].to_i32();
            }
        }
        Ok(())
    }

    pub(crate) fn encode_triplet_line<S: Sample>(
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
                index += self.encode_triplet_run_mode(index, previous, current)?;
            } else {
                let x = current[index + 1];
                let v1 = self.encode_regular(
                    qs1,
                    x.v1.to_i32(),
                    get_predicted_value(ra.v1.to_i32(), rb.v1.to_i32(), rc.v1.to_i32()),
                )?;
                let v2 = self.encode_regular(
                    qs2,
                    x.v2.to_i32(),
                    get_predicted_value(ra.v2.to_i32(), rb.v2.to_i32(), rc.v2.to_i32()),
                )?;
                let v3 = self.encode_regular(
                    qs3,
                    x.v3.to_i32(),
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

    // Code segments A.15 to A.19
    fn encode_regular(&mut self, qs: i32, x: i32, predicted: i32) -> Result<i32, JlsError> {
        let traits = self.traits;
        let sign = bit_wise_sign(qs);
        let context_index = apply_sign(qs, sign) as usize;
        let context = self.regular_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter()?;
        let predicted_value = traits.correct_prediction(predicted + apply_sign(context.c(), sign));
        let error_value = traits.compute_error_value(apply_sign(x - predicted_value, sign));

        self.encode_mapped_value(
            k,
            map_error_value(context.error_correction(k | traits.near_lossless()) ^ error_value),
            traits.limit(),
        )?;
        self.regular_mode_contexts[context_index].update_variables_and_bias(
            error_value,
            traits.near_lossless(),
            traits.reset_threshold(),
        )?;

        Ok(traits.compute_reconstructed_sample(predicted_value, apply_sign(error_value, sign)))
    }

    fn encode_mapped_value(&mut self, k: i32, mapped_error: i32, limit: i32) -> Result<(), JlsError> {
        let quantized_bits_per_pixel = self.traits.quantized_bits_per_pixel();
        let mut high_bits = mapped_error >> k;

        if high_bits < limit - quantized_bits_per_pixel - 1 {
            if high_bits + 1 > 31 {
                self.writer.append_to_bit_stream(0, (high_bits / 2) as u32)?;
                high_bits -= high_bits / 2;
            }
            self.writer.append_to_bit_stream(1, (high_bits + 1) as u32)?;
            return self
                .writer
                .append_to_bit_stream((mapped_error & ((1 << k) - 1)) as u32, k as u32);
        }

        // Escape code: LIMIT - qbpp - 1 zeros, a one, then the value itself.
        if limit - quantized_bits_per_pixel > 31 {
            self.writer.append_to_bit_stream(0, 31)?;
            self.writer
                .append_to_bit_stream(1, (limit - quantized_bits_per_pixel - 31) as u32)?;
        } else {
            self.writer
                .append_to_bit_stream(1, (limit - quantized_bits_per_pixel) as u32)?;
        }
        self.writer.append_to_bit_stream(
            ((mapped_error - 1) & ((1 << quantized_bits_per_pixel) - 1)) as u32,
            quantized_bits_per_pixel as u32,
        )
    }

    fn encode_scalar_run_mode<S: Sample>(
        &mut self,
        start_index: usize,
        previous: &[S],
        current: &mut [S],
    ) -> Result<usize, JlsError> {
        let remaining = current.len() - 2 - start_index;
        let ra = current[start_index].to_i32();

        let mut run_length = 0;
        while self.traits.is_near(current[start_index + 1 + run_length].to_i32(), ra) {
            current[start_index + 1 + run_length] = S::from_i32(ra);
            run_length += 1;
            if run_length == remaining {
                break;
            }
        }

        self.encode_run_pixels(run_length, run_length == remaining)?;
        if run_length == remaining {
            return Ok(run_length);
        }

        let position = start_index + 1 + run_length;
        let value = self.encode_scalar_run_interruption(
            current[position].to_i32(),
            ra,
            previous[position].to_i32(),
        )?;
        current[position] = S::from_i32(value);
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn encode_triplet_run_mode<S: Sample>(
        &mut self,
        start_index: usize,
        previous: &[Triplet<S>],
        current: &mut [Triplet<S>],
    ) -> Result<usize, JlsError> {
        let remaining = current.len() - 2 - start_index;
        let ra = current[start_index];

        let mut run_length = 0;
        while self.is_near_triplet(current[start_index + 1 + run_length], ra) {
            current[start_index + 1 + run_length] = ra;
            run_length += 1;
            if run_length == remaining {
                break;
            }
        }

        self.encode_run_pixels(run_length, run_length == remaining)?;
        if run_length == remaining {
            return Ok(run_length);
        }

        let position = start_index + 1 + run_length;
        current[position] = self.encode_triplet_run_interruption(current[position], ra, previous[position])?;
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn is_near_triplet<S: Sample>(&self, lhs: Triplet<S>, rhs: Triplet<S>) -> bool {
        self.traits.is_near(lhs.v1.to_i32(), rhs.v1.to_i32())
            && self.traits.is_near(lhs.v2.to_i32(), rhs.v2.to_i32())
            && self.traits.is_near(lhs.v3.to_i32(), rhs.v3.to_i32())
    }

    // Code segment A.14
    fn encode_run_pixels(&mut self, mut run_length: usize, end_of_line: bool) -> Result<(), JlsError> {
        while run_length >= 1 << J[self.run_index] {
            self.writer.append_ones(1)?;
            run_length -= 1 << J[self.run_index];
            self.increment_run_index();
        }

        if end_of_line {
            if run_length != 0 {
                self.writer.append_ones(1)?;
            }
        } else {
            // Leading zero followed by the remainder of the run.
            self.writer
                .append_to_bit_stream(run_length as u32, (J[self.run_index] + 1) as u32)?;
        }
        Ok(())
    }

    fn encode_scalar_run_interruption(&mut self, x: i32, ra: i32, rb: i32) -> Result<i32, JlsError> {
        let traits = self.traits;
        if (ra - rb).abs() <= traits.near_lossless() {
            let error_value = traits.compute_error_value(x - ra);
            self.encode_run_interruption_error(1, error_value)?;
            return Ok(traits.compute_reconstructed_sample(ra, error_value));
        }

        let error_value = traits.compute_error_value((x - rb) * sign(rb - ra));
        self.encode_run_interruption_error(0, error_value)?;
        Ok(traits.compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
    }

    fn encode_triplet_run_interruption<S: Sample>(
        &mut self,
        x: Triplet<S>,
        ra: Triplet<S>,
        rb: Triplet<S>,
    ) -> Result<Triplet<S>, JlsError> {
        let v1 = self.encode_triplet_channel(x.v1.to_i32(), ra.v1.to_i32(), rb.v1.to_i32())?;
        let v2 = self.encode_triplet_channel(x.v2.to_i32(), ra.v2.to_i32(), rb.v2.to_i32())?;
        let v3 = self.encode_triplet_channel(x.v3.to_i32(), ra.v3.to_i32(), rb.v3.to_i32())?;
        Ok(Triplet::new(v1, v2, v3))
    }

    fn encode_triplet_channel(&mut self, x: i32, ra: i32, rb: i32) -> Result<i32, JlsError> {
        let traits = self.traits;
        let error_value = traits.compute_error_value(sign(rb - ra) * (x - rb));
        self.encode_run_interruption_error(0, error_value)?;
        Ok(traits.compute_reconstructed_sample(rb, error_value * sign(rb - ra)))
    }

    // Code segment A.22
    fn encode_run_interruption_error(&mut self, context_index: usize, error_value: i32) -> Result<(), JlsError> {
        let context = self.run_mode_contexts[context_index];
        let k = context.compute_golomb_coding_parameter()?;
        let e_mapped_error_value = context.compute_mapped_error_value(error_value, k);
        let limit = self.traits.limit() - J[self.run_index] - 1;

        self.encode_mapped_value(k, e_mapped_error_value, limit)?;
        self.run_mode_contexts[context_index].update_variables(
            error_value,
            e_mapped_error_value,
            self.traits.reset_threshold(),
        );
        Ok(())
    }

    fn increment_run_index(&mut self) {
        self.run_index = (self.run_index + 1).min(31);
    }

    fn decrement_run_index(&mut self) {
        self.run_index = self.run_index.saturating_sub(1);
    }
}
