//! HP reversible color transforms (the "mrfx" APP8 extension).
//!
//! All arithmetic is modulo `range`, which is 256 for 8 bit samples and
//! 65536 for 16 bit samples.

use crate::ColorTransformation;

/// Maps an RGB pixel to the three coded components.
pub fn forward(transformation: ColorTransformation, range: i32, red: i32, green: i32, blue: i32) -> (i32, i32, i32) {
    let mask = range - 1;
    let half = range / 2;
    match transformation {
        ColorTransformation::None => (red, green, blue),
        ColorTransformation::Hp1 => ((red - green + half) & mask, green, (blue - green + half) & mask),
        ColorTransformation::Hp2 => (
            (red - green + half) & mask,
            green,
            (blue - ((red + green) >> 1) - half) & mask,
        ),
        ColorTransformation::Hp3 => {
            let v2 = (blue - green + half) & mask;
            let v3 = (red - green + half) & mask;
            let v1 = (green + ((v2 + v3) >> 2) - range / 4) & mask;
            (v1, v2, v3)
        }
    }
}

/// Maps three decoded components back to RGB.
pub fn inverse(transformation: ColorTransformation, range: i32, v1: i32, v2: i32, v3: i32) -> (i32, i32, i32) {
    let mask = range - 1;
    let half = range / 2;
    match transformation {
        ColorTransformation::None => (v1, v2, v3),
        ColorTransformation::Hp1 => ((v1 + v2 - half) & mask, v2, (v3 + v2 - half) & mask),
        ColorTransformation::Hp2 => {
            let red = (v1 + v2 - half) & mask;
            (red, v2, (v3 + ((red + v2) >> 1) - half) & mask)
        }
        ColorTransformation::Hp3 => {
            let green = (v1 - ((v3 + v2) >> 2) + range / 4) & mask;
            ((v3 + green - half) & mask, green, (v2 + green - half) & mask)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    const TRANSFORMS: [ColorTransformation; 3] = [
        ColorTransformation::Hp1,
        ColorTransformation::Hp2,
        ColorTransformation::Hp3,
    ];

    #[test]
    fn exhaustive_round_trip_8_bit() {
        for transformation in TRANSFORMS {
            for red in (0..256).step_by(3) {
                for green in (0..256).step_by(5) {
                    for blue in 0..256 {
                        let (v1, v2, v3) = forward(transformation, 256, red, green, blue);
                        assert!((0..256).contains(&v1) && (0..256).contains(&v2) && (0..256).contains(&v3));
                        assert_eq!(
                            inverse(transformation, 256, v1, v2, v3),
                            (red, green, blue),
                            "{transformation:?}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn random_round_trip_16_bit() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        for transformation in TRANSFORMS {
            for _ in 0..10_000 {
                let red = rng.random_range(0..65536);
                let green = rng.random_range(0..65536);
                let blue = rng.random_range(0..65536);
                let (v1, v2, v3) = forward(transformation, 65536, red, green, blue);
                assert_eq!(inverse(transformation, 65536, v1, v2, v3), (red, green, blue));
            }
        }
    }

    #[test]
    fn hp1_centers_differences() {
        assert_eq!(forward(ColorTransformation::Hp1, 256, 100, 100, 100), (128, 100, 128));
        assert_eq!(forward(ColorTransformation::None, 256, 1, 2, 3), (1, 2, 3));
    }
}
