//! Bit packing for entropy coded segments (ISO/IEC 14495-1, 9.1).
//!
//! After every 0xFF byte only seven bits are emitted into the next byte, so its
//! most significant bit is always zero and can never be mistaken for a marker.

use crate::byte_stream::ByteSink;
use crate::error::JlsError;

pub struct BitWriter<'s, 'a> {
    sink: &'s mut ByteSink<'a>,
    bit_buffer: u64,
    bit_count: u32,
    is_ff_written: bool,
    bytes_written: usize,
}

impl<'s, 'a> BitWriter<'s, 'a> {
    pub fn new(sink: &'s mut ByteSink<'a>) -> Self {
        Self {
            sink,
            bit_buffer: 0,
            bit_count: 0,
            is_ff_written: false,
            bytes_written: 0,
        }
    }

    #[inline]
    fn emit_size(&self) -> u32 {
        if self.is_ff_written { 7 } else { 8 }
    }

    /// Appends the low `count` bits of `value`, most significant first.
    pub fn append_to_bit_stream(&mut self, value: u32, count: u32) -> Result<(), JlsError> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(());
        }

        let mask = (1u64 << count) - 1;
        self.bit_buffer = (self.bit_buffer << count) | (value as u64 & mask);
        self.bit_count += count;

        loop {
            let size = self.emit_size();
            if self.bit_count < size {
                break;
            }
            self.bit_count -= size;
            let byte = ((self.bit_buffer >> self.bit_count) & ((1 << size) - 1)) as u8;
            self.sink.write_u8(byte)?;
            self.bytes_written += 1;
            self.is_ff_written = byte == 0xFF;
        }
        Ok(())
    }

    pub fn append_ones(&mut self, count: u32) -> Result<(), JlsError> {
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(32);
            self.append_to_bit_stream(u32::MAX, chunk)?;
            remaining -= chunk;
        }
        Ok(())
    }

    /// Pads the final byte with zero bits and returns the size of the coded segment.
    pub fn end_scan(mut self) -> Result<usize, JlsError> {
        if self.bit_count > 0 {
            let padding = self.emit_size() - self.bit_count;
            self.append_to_bit_stream(0, padding)?;
        } else if self.is_ff_written {
            self.append_to_bit_stream(0, 7)?;
        }
        debug_assert_eq!(self.bit_count, 0);
        Ok(self.bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_bits(f: impl FnOnce(&mut BitWriter) -> Result<(), JlsError>) -> Vec<u8> {
        let mut output = Vec::new();
        {
            let mut sink = ByteSink::from_writer(&mut output);
            let mut writer = BitWriter::new(&mut sink);
            f(&mut writer).unwrap();
            writer.end_scan().unwrap();
            sink.flush().unwrap();
        }
        output
    }

    #[test]
    fn byte_after_ff_carries_seven_bits() {
        let bytes = write_bits(|writer| {
            writer.append_to_bit_stream(0xFF, 8)?;
            writer.append_to_bit_stream(0x7F, 7)
        });
        assert_eq!(bytes, vec![0xFF, 0x7F]);
    }

    #[test]
    fn sixteen_ones_are_stuffed() {
        let bytes = write_bits(|writer| writer.append_to_bit_stream(0xFFFF, 16));
        assert_eq!(bytes, vec![0xFF, 0x7F, 0x80]);
    }

    #[test]
    fn trailing_ff_is_followed_by_zero_byte() {
        let bytes = write_bits(|writer| writer.append_ones(8));
        assert_eq!(bytes, vec![0xFF, 0x00]);
    }

    #[test]
    fn partial_byte_is_zero_padded() {
        let bytes = write_bits(|writer| writer.append_to_bit_stream(0b101, 3));
        assert_eq!(bytes, vec![0b1010_0000]);
    }

    #[test]
    fn full_sink_reports_buffer_too_small() {
        let mut data = [0u8; 1];
        let mut sink = ByteSink::from_slice(&mut data);
        let mut writer = BitWriter::new(&mut sink);
        assert_eq!(
            writer.append_to_bit_stream(0xABCD, 16),
            Err(JlsError::CompressedBufferTooSmall)
        );
    }
}
