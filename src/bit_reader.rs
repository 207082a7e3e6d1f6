//! Bit unpacking for entropy coded segments.
//!
//! The reader never consumes a 0xFF byte that starts a marker, so after
//! `end_scan` the byte source is positioned on the marker that follows the scan.

use crate::byte_stream::ByteSource;
use crate::error::JlsError;

const CACHE_BITS: u32 = u64::BITS;

pub struct BitReader<'s, 'a> {
    source: &'s mut ByteSource<'a>,
    // Left aligned; bits past `valid_bits` are always zero.
    cache: u64,
    valid_bits: u32,
    previous_was_ff: bool,
    stopped_at_marker: bool,
    end_of_data: bool,
}

impl<'s, 'a> BitReader<'s, 'a> {
    pub fn new(source: &'s mut ByteSource<'a>) -> Self {
        Self {
            source,
            cache: 0,
            valid_bits: 0,
            previous_was_ff: false,
            stopped_at_marker: false,
            end_of_data: false,
        }
    }

    fn fill(&mut self) -> Result<(), JlsError> {
        while self.valid_bits <= CACHE_BITS - 8 && !self.stopped_at_marker && !self.end_of_data {
            let Some(byte) = self.source.peek_u8(0)? else {
                self.end_of_data = true;
                break;
            };

            if self.previous_was_ff {
                // Checked below before the 0xFF was accepted.
                debug_assert!(byte < 0x80);
                self.source.read_u8()?;
                self.cache |= ((byte & 0x7F) as u64) << (CACHE_BITS - 7 - self.valid_bits);
                self.valid_bits += 7;
                self.previous_was_ff = false;
                continue;
            }

            if byte == 0xFF {
                match self.source.peek_u8(1)? {
                    Some(next) if next < 0x80 => {}
                    Some(_) => {
                        self.stopped_at_marker = true;
                        break;
                    }
                    None => {
                        self.end_of_data = true;
                        break;
                    }
                }
                self.previous_was_ff = true;
            }

            self.source.read_u8()?;
            self.cache |= (byte as u64) << (CACHE_BITS - 8 - self.valid_bits);
            self.valid_bits += 8;
        }
        Ok(())
    }

    fn out_of_data(&self) -> JlsError {
        if self.stopped_at_marker {
            JlsError::InvalidCompressedData
        } else {
            JlsError::CompressedBufferTooSmall
        }
    }

    fn ensure(&mut self, count: u32) -> Result<(), JlsError> {
        if self.valid_bits < count {
            self.fill()?;
            if self.valid_bits < count {
                return Err(self.out_of_data());
            }
        }
        Ok(())
    }

    #[inline]
    fn consume(&mut self, count: u32) {
        self.cache = self.cache.checked_shl(count).unwrap_or(0);
        self.valid_bits -= count;
    }

    /// Reads `count` (at most 32) bits as an unsigned value.
    pub fn read_value(&mut self, count: u32) -> Result<i32, JlsError> {
        debug_assert!(count <= 32);
        if count == 0 {
            return Ok(0);
        }
        self.ensure(count)?;
        let value = (self.cache >> (CACHE_BITS - count)) as u32;
        self.consume(count);
        Ok(value as i32)
    }

    pub fn read_bit(&mut self) -> Result<bool, JlsError> {
        Ok(self.read_value(1)? == 1)
    }

    /// The next 8 bits without consuming them; missing bits read as zero.
    pub fn peek_byte(&mut self) -> Result<u8, JlsError> {
        if self.valid_bits < 8 {
            self.fill()?;
        }
        Ok((self.cache >> (CACHE_BITS - 8)) as u8)
    }

    pub fn skip(&mut self, count: u32) -> Result<(), JlsError> {
        self.ensure(count)?;
        self.consume(count);
        Ok(())
    }

    /// Counts zero bits up to and including the next 1 bit and returns the zero count.
    pub fn read_high_bits(&mut self, maximum_zero_count: i32) -> Result<i32, JlsError> {
        let mut count: i32 = 0;
        loop {
            if self.valid_bits == 0 {
                self.fill()?;
                if self.valid_bits == 0 {
                    return Err(self.out_of_data());
                }
            }

            let zeros = self.cache.leading_zeros();
            if zeros < self.valid_bits {
                count += zeros as i32;
                self.consume(zeros + 1);
                if count > maximum_zero_count {
                    return Err(JlsError::InvalidCompressedData);
                }
                return Ok(count);
            }

            count += self.valid_bits as i32;
            self.cache = 0;
            self.valid_bits = 0;
            if count > maximum_zero_count {
                return Err(JlsError::InvalidCompressedData);
            }
        }
    }

    /// Checks that only padding bits remain in front of the next marker.
    pub fn end_scan(mut self) -> Result<(), JlsError> {
        self.fill()?;
        if self.valid_bits >= 8 {
            log::debug!("{} unused bits at end of scan", self.valid_bits);
            return Err(JlsError::InvalidCompressedData);
        }
        Ok(())
    }
}
