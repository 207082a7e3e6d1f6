use crate::constants::MAX_K_VALUE;
use crate::error::JlsError;
use crate::traits::bit_wise_sign;

/// Adaptive statistics of one regular mode context (ISO/IEC 14495-1, A.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularModeContext {
    a: i32,
    b: i32,
    c: i32,
    n: i32,
}

impl RegularModeContext {
    pub fn new(range: i32) -> Self {
        Self {
            a: initialization_value_for_a(range),
            b: 0,
            c: 0,
            n: 1,
        }
    }

    pub fn c(&self) -> i32 {
        self.c
    }

    pub fn error_correction(&self, k: i32) -> i32 {
        if k != 0 {
            return 0;
        }
        bit_wise_sign(2 * self.b + self.n - 1)
    }

    pub fn update_variables_and_bias(
        &mut self,
        error_value: i32,
        near_lossless: i32,
        reset_threshold: i32,
    ) -> Result<(), JlsError> {
        debug_assert!(self.n != 0);

        self.a += error_value.abs();
        self.b += error_value * (2 * near_lossless + 1);

        if self.a >= 65536 * 256 || self.b.abs() >= 65536 * 256 {
            return Err(JlsError::InvalidCompressedData);
        }

        if self.n == reset_threshold {
            self.a >>= 1;
            self.b >>= 1;
            self.n >>= 1;
        }

        self.n += 1;

        // Code segment A.13
        const MAX_C: i32 = 127;
        const MIN_C: i32 = -128;

        if self.b + self.n <= 0 {
            self.b += self.n;
            if self.b <= -self.n {
                self.b = -self.n + 1;
            }
            if self.c > MIN_C {
                self.c -= 1;
            }
        } else if self.b > 0 {
            self.b -= self.n;
            if self.b > 0 {
                self.b = 0;
            }
            if self.c < MAX_C {
                self.c += 1;
            }
        }
        Ok(())
    }

    /// Code segment A.10.
    pub fn compute_golomb_coding_parameter(&self) -> Result<i32, JlsError> {
        let mut k = 0;
        while (self.n << k) < self.a && k < MAX_K_VALUE {
            k += 1;
        }

        if (self.n << k) < self.a {
            return Err(JlsError::InvalidCompressedData);
        }
        Ok(k)
    }
}

pub(crate) fn initialization_value_for_a(range: i32) -> i32 {
    std::cmp::max(2, (range + 32) / 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state() {
        let context = RegularModeContext::new(256);
        assert_eq!(context.a, 4);
        assert_eq!(context.n, 1);
        assert_eq!(context.compute_golomb_coding_parameter().unwrap(), 2);

        let context = RegularModeContext::new(4);
        assert_eq!(context.a, 2);
    }

    #[test]
    fn bias_moves_towards_error_sign() {
        let mut context = RegularModeContext::new(256);
        context.update_variables_and_bias(5, 0, 64).unwrap();
        assert_eq!(context.c(), 1);
        assert_eq!(context.b, 0);
        assert_eq!(context.n, 2);

        let mut context = RegularModeContext::new(256);
        context.update_variables_and_bias(-5, 0, 64).unwrap();
        assert_eq!(context.c(), -1);
        assert_eq!(context.b, -1);
    }

    #[test]
    fn counters_halve_at_reset() {
        let mut context = RegularModeContext::new(256);
        for _ in 0..63 {
            context.update_variables_and_bias(0, 0, 64).unwrap();
        }
        assert_eq!(context.n, 64);
        context.update_variables_and_bias(0, 0, 64).unwrap();
        assert_eq!(context.n, 33);
        assert_eq!(context.a, 2);
    }

    #[test]
    fn error_correction_only_for_k_zero() {
        let mut context = RegularModeContext::new(256);
        assert_eq!(context.error_correction(1), 0);
        assert_eq!(context.error_correction(0), 0);
        context.b = -2;
        context.n = 2;
        assert_eq!(context.error_correction(0), -1);
    }
}
