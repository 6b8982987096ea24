//! Crop coefficient (Kc) lookup and interpolation over the growing season.
//!
//! A crop's season has two phases: *growing* (planting to full cover) and
//! *maturity* (full cover to harvest). Each phase is sampled at 11
//! breakpoints of phase completion (0%, 10%, ..., 100%) and interpolated
//! linearly in between.

pub mod curve;
pub mod table;

pub use curve::{CropCoefficientCurve, Phase};
pub use table::{KcCurve, KcTable};

/// Number of breakpoints per phase.
pub const BREAKPOINTS: usize = 11;

/// Spacing of breakpoints, in percent of phase completion.
pub const BREAKPOINT_STEP: f64 = 10.0;

/// Piecewise-linear interpolation over evenly spaced breakpoints.
pub mod interpolation {
    use super::{BREAKPOINTS, BREAKPOINT_STEP};

    /// Value at `percent` (0-100) of a curve sampled every 10%.
    ///
    /// Percentages outside [0, 100] are clamped to the end breakpoints.
    pub fn interpolate_breakpoints(points: &[f64; BREAKPOINTS], percent: f64) -> f64 {
        let max = BREAKPOINT_STEP * (BREAKPOINTS - 1) as f64;
        let percent = percent.clamp(0.0, max);
        let lower = ((percent / BREAKPOINT_STEP).floor() as usize).min(BREAKPOINTS - 2);
        let t = (percent - lower as f64 * BREAKPOINT_STEP) / BREAKPOINT_STEP;
        points[lower] + t * (points[lower + 1] - points[lower])
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use approx::assert_relative_eq;

        const RAMP: [f64; BREAKPOINTS] = [0.0, 0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

        #[test]
        fn test_breakpoints_are_exact() {
            for (i, expected) in RAMP.iter().enumerate() {
                let v = interpolate_breakpoints(&RAMP, i as f64 * 10.0);
                assert_relative_eq!(v, *expected, epsilon = 1e-12);
            }
        }

        #[test]
        fn test_between_breakpoints() {
            let points = [0.2, 0.4, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 0.5, 0.3];
            assert_relative_eq!(interpolate_breakpoints(&points, 5.0), 0.3, epsilon = 1e-12);
            assert_relative_eq!(interpolate_breakpoints(&points, 12.5), 0.55, epsilon = 1e-12);
            assert_relative_eq!(interpolate_breakpoints(&points, 95.0), 0.4, epsilon = 1e-12);
        }

        #[test]
        fn test_out_of_range_is_clamped() {
            assert_relative_eq!(interpolate_breakpoints(&RAMP, -20.0), 0.0);
            assert_relative_eq!(interpolate_breakpoints(&RAMP, 140.0), 1.0);
        }
    }
}
