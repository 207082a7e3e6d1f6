//! Lookup table for Golomb codes that fit in one byte.
//!
//! Indexed by `k` and the next 8 bits of the stream. Entries with a
//! `bit_count` of 0 mark codes that are longer than 8 bits.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GolombCodeMatch {
    pub mapped_value: i16,
    pub bit_count: u8,
}

const fn countl_zero_u8(mut x: u8) -> u8 {
    if x == 0 {
        return 8;
    }
    let mut count = 0;
    while (x & 0x80) == 0 {
        x <<= 1;
        count += 1;
    }
    count
}

pub const GOLOMB_LUT: [[GolombCodeMatch; 256]; 32] = {
    let mut lut = [[GolombCodeMatch {
        mapped_value: 0,
        bit_count: 0,
    }; 256]; 32];
    let mut k: usize = 0;
    while k < 32 {
        let mut value: usize = 0;
        while value < 256 {
            let unary_length = countl_zero_u8(value as u8) as usize;
            let length = unary_length + k + 1;

            if length <= 8 {
                let shift = 8 - length;
                let remainder = (value >> shift) & ((1 << k) - 1);
                lut[k][value] = GolombCodeMatch {
                    mapped_value: ((unary_length << k) + remainder) as i16,
                    bit_count: length as u8,
                };
            }
            value += 1;
        }
        k += 1;
    }
    lut
};

#[inline]
pub fn lookup(k: i32, next_byte: u8) -> GolombCodeMatch {
    GOLOMB_LUT[k as usize][next_byte as usize]
}
