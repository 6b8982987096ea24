use crate::interpolation::interpolate_breakpoints;
use crate::table::KcTable;
use chrono::NaiveDate;
use hec_core::farm::CropSchedule;
use hec_core::{CouplingError, CropId, Result};
use hec_utils::dates::DateRange;

/// Phase of a crop's season.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Planting (inclusive) to full cover (exclusive)
    Growing,
    /// Full cover to harvest, both inclusive
    Maturity,
}

/// Daily crop coefficients interpolated from a [`KcTable`].
#[derive(Debug, Clone)]
pub struct CropCoefficientCurve {
    table: KcTable,
}

impl CropCoefficientCurve {
    pub fn new(table: KcTable) -> Self {
        CropCoefficientCurve { table }
    }

    pub fn table(&self) -> &KcTable {
        &self.table
    }

    /// Phase of `current` and its completion in percent, or `None` outside
    /// the season. A zero-length phase reports 0% completion.
    pub fn phase(
        current: NaiveDate,
        start: NaiveDate,
        cover: NaiveDate,
        end: NaiveDate,
    ) -> Option<(Phase, f64)> {
        if start <= current && current < cover {
            Some((Phase::Growing, percent_complete(current, start, cover)))
        } else if cover <= current && current <= end {
            Some((Phase::Maturity, percent_complete(current, cover, end)))
        } else {
            None
        }
    }

    /// Crop coefficient of `crop_id` on `current` for a crop planted on
    /// `start`, at full cover on `cover` and harvested on `end`.
    ///
    /// Returns 0.0 outside `[start, end]`.
    pub fn coefficient(
        &self,
        current: NaiveDate,
        start: NaiveDate,
        cover: NaiveDate,
        end: NaiveDate,
        crop_id: CropId,
    ) -> Result<f64> {
        let curve = self.table.curve(crop_id)?;
        validate_dates(start, cover, end, crop_id)?;
        Ok(match Self::phase(current, start, cover, end) {
            Some((Phase::Growing, pct)) => interpolate_breakpoints(&curve.growing, pct),
            Some((Phase::Maturity, pct)) => interpolate_breakpoints(&curve.maturity, pct),
            None => 0.0,
        })
    }

    /// [`Self::coefficient`] for a farm crop schedule.
    pub fn coefficient_for(&self, schedule: &CropSchedule, current: NaiveDate) -> Result<f64> {
        self.coefficient(
            current,
            schedule.start,
            schedule.cover,
            schedule.end,
            schedule.crop_id,
        )
    }

    /// Sum of daily coefficients over every day of `[start, end]`.
    pub fn seasonal_sum(
        &self,
        start: NaiveDate,
        cover: NaiveDate,
        end: NaiveDate,
        crop_id: CropId,
    ) -> Result<f64> {
        DateRange(start, end)
            .map(|day| self.coefficient(day, start, cover, end, crop_id))
            .sum()
    }

    /// Coefficient at `percent` completion of the growing phase.
    pub fn growing_coefficient(&self, crop_id: CropId, percent: f64) -> Result<f64> {
        Ok(interpolate_breakpoints(
            &self.table.curve(crop_id)?.growing,
            percent,
        ))
    }

    /// Coefficient at `percent` completion of the maturity phase.
    pub fn maturity_coefficient(&self, crop_id: CropId, percent: f64) -> Result<f64> {
        Ok(interpolate_breakpoints(
            &self.table.curve(crop_id)?.maturity,
            percent,
        ))
    }
}

fn percent_complete(current: NaiveDate, phase_start: NaiveDate, phase_end: NaiveDate) -> f64 {
    let length = (phase_end - phase_start).num_days();
    if length == 0 {
        return 0.0;
    }
    (current - phase_start).num_days() as f64 / length as f64 * 100.0
}

fn validate_dates(start: NaiveDate, cover: NaiveDate, end: NaiveDate, crop_id: CropId) -> Result<()> {
    if cover < start {
        return Err(CouplingError::InvalidCropSchedule {
            crop_id,
            reason: format!("full cover {} precedes planting {}", cover, start),
        });
    }
    if end < cover {
        return Err(CouplingError::InvalidCropSchedule {
            crop_id,
            reason: format!("harvest {} precedes full cover {}", end, cover),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::KcCurve;
    use approx::assert_relative_eq;

    const FIXTURE: &str = include_str!("../../fixtures/crop_coefficients.csv");

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn fixture_curve() -> CropCoefficientCurve {
        CropCoefficientCurve::new(KcTable::parse_csv(FIXTURE).unwrap())
    }

    fn flat_curve(crop_id: CropId, kc: f64) -> CropCoefficientCurve {
        CropCoefficientCurve::new(vec![(crop_id, KcCurve::flat(kc))].into_iter().collect())
    }

    #[test]
    fn test_zero_outside_season() {
        let curve = fixture_curve();
        let (s, c, e) = (ymd(2020, 5, 1), ymd(2020, 6, 1), ymd(2020, 8, 1));
        assert_eq!(curve.coefficient(ymd(2020, 4, 30), s, c, e, 5).unwrap(), 0.0);
        assert_eq!(curve.coefficient(ymd(2020, 8, 2), s, c, e, 5).unwrap(), 0.0);
        assert_eq!(curve.coefficient(ymd(2019, 5, 1), s, c, e, 5).unwrap(), 0.0);
    }

    #[test]
    fn test_season_bounds_are_inclusive() {
        let curve = fixture_curve();
        let (s, c, e) = (ymd(2020, 5, 1), ymd(2020, 6, 1), ymd(2020, 8, 1));
        assert_relative_eq!(curve.coefficient(s, s, c, e, 5).unwrap(), 0.15);
        assert_relative_eq!(curve.coefficient(e, s, c, e, 5).unwrap(), 0.22);
    }

    #[test]
    fn test_interpolates_within_phase() {
        let curve = fixture_curve();
        // 20-day growing phase: day 1 is 5% complete
        let (s, c, e) = (ymd(2020, 5, 1), ymd(2020, 5, 21), ymd(2020, 6, 10));
        let kc = curve.coefficient(ymd(2020, 5, 2), s, c, e, 5).unwrap();
        assert_relative_eq!(kc, 0.165, epsilon = 1e-12);
        // maturity phase: 10 of 20 days is 50%
        let kc = curve.coefficient(ymd(2020, 5, 31), s, c, e, 5).unwrap();
        assert_relative_eq!(kc, 0.86, epsilon = 1e-12);
    }

    #[test]
    fn test_continuous_at_full_cover() {
        let curve = fixture_curve();
        for crop in curve.table().crop_ids().collect::<Vec<_>>() {
            let end_of_growing = curve.growing_coefficient(crop, 100.0).unwrap();
            let start_of_maturity = curve.maturity_coefficient(crop, 0.0).unwrap();
            assert_relative_eq!(end_of_growing, start_of_maturity, epsilon = 1e-12);
        }

        let (s, c, e) = (ymd(2020, 5, 1), ymd(2020, 5, 21), ymd(2020, 6, 10));
        let at_cover = curve.coefficient(c, s, c, e, 1).unwrap();
        assert_relative_eq!(at_cover, curve.growing_coefficient(1, 100.0).unwrap());
    }

    #[test]
    fn test_phase() {
        let (s, c, e) = (ymd(2020, 5, 1), ymd(2020, 5, 11), ymd(2020, 5, 21));
        assert_eq!(CropCoefficientCurve::phase(s, s, c, e), Some((Phase::Growing, 0.0)));
        assert_eq!(CropCoefficientCurve::phase(c, s, c, e), Some((Phase::Maturity, 0.0)));
        assert_eq!(CropCoefficientCurve::phase(e, s, c, e), Some((Phase::Maturity, 100.0)));
        assert_eq!(CropCoefficientCurve::phase(ymd(2020, 5, 22), s, c, e), None);
    }

    #[test]
    fn test_degenerate_phases() {
        let curve = fixture_curve();
        let d = ymd(2020, 7, 1);
        // planting and full cover on the same day
        let kc = curve.coefficient(d, d, d, ymd(2020, 7, 11), 5).unwrap();
        assert_relative_eq!(kc, 1.12);
        // full cover and harvest on the same day
        let kc = curve.coefficient(d, ymd(2020, 6, 21), d, d, 5).unwrap();
        assert_relative_eq!(kc, 1.12);
        // single-day season
        let kc = curve.coefficient(d, d, d, d, 5).unwrap();
        assert!(kc.is_finite());
    }

    #[test]
    fn test_unknown_crop() {
        let curve = fixture_curve();
        let d = ymd(2020, 7, 1);
        assert!(matches!(
            curve.coefficient(d, d, d, d, 42),
            Err(CouplingError::UnknownCrop(42))
        ));
    }

    #[test]
    fn test_out_of_order_dates() {
        let curve = fixture_curve();
        let result = curve.coefficient(
            ymd(2020, 5, 5),
            ymd(2020, 5, 10),
            ymd(2020, 5, 1),
            ymd(2020, 6, 1),
            5,
        );
        assert!(matches!(
            result,
            Err(CouplingError::InvalidCropSchedule { crop_id: 5, .. })
        ));
    }

    #[test]
    fn test_seasonal_sum_flat() {
        let curve = flat_curve(5, 0.5);
        let sum = curve
            .seasonal_sum(ymd(2020, 5, 1), ymd(2020, 5, 2), ymd(2020, 5, 4), 5)
            .unwrap();
        assert_relative_eq!(sum, 2.0);
    }

    #[test]
    fn test_seasonal_sum_visits_every_breakpoint() {
        // 10-day phases land exactly on each breakpoint once
        let curve = fixture_curve();
        let sum = curve
            .seasonal_sum(ymd(2020, 5, 1), ymd(2020, 5, 11), ymd(2020, 5, 21), 5)
            .unwrap();
        assert_relative_eq!(sum, 14.03, epsilon = 1e-9);
    }
}
