use ql_core::errors::{Error, Result};
use ql_core::Rate;
use ql_time::Date;

/// One zero-rate observation on a [`Curve`].
///
/// `serial` caches `date.serial()` as a float so interpolation arithmetic
/// doesn't re-derive it on every lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    /// The sample's maturity date.
    pub date: Date,
    /// The zero rate observed at `date`, as a decimal (0.05 = 5%).
    pub rate: Rate,
    /// `date`'s serial number as `f64`, for interpolation.
    pub serial: f64,
}

/// A zero-coupon rate curve as of a fixed value date.
///
/// Samples are appended in increasing date order by the caller (typically
/// while parsing an external quote source); [`Curve`] does not sort them.
#[derive(Debug, Clone)]
pub struct Curve {
    value_date: Date,
    compound_freq: Rate,
    ir_vol: Rate,
    mean_reversion: Rate,
    samples: Vec<CurveSample>,
}

impl Curve {
    /// Default short-rate volatility used to calibrate a Hull-White tree
    /// against this curve, absent an explicit override.
    pub const DEFAULT_IR_VOL: Rate = 0.20;

    /// Default mean-reversion speed used to calibrate a Hull-White tree
    /// against this curve, absent an explicit override.
    pub const DEFAULT_MEAN_REVERSION: Rate = 0.05;

    /// Create an empty curve as of `value_date`, with the model's default
    /// volatility, mean-reversion, and semiannual compounding.
    pub fn new(value_date: Date) -> Self {
        Curve {
            value_date,
            compound_freq: 2.0,
            ir_vol: Self::DEFAULT_IR_VOL,
            mean_reversion: Self::DEFAULT_MEAN_REVERSION,
            samples: Vec::new(),
        }
    }

    /// Override the curve's policy constants (compounding frequency,
    /// short-rate volatility, mean reversion).
    pub fn with_policy(mut self, compound_freq: Rate, ir_vol: Rate, mean_reversion: Rate) -> Self {
        self.compound_freq = compound_freq;
        self.ir_vol = ir_vol;
        self.mean_reversion = mean_reversion;
        self
    }

    /// The curve's value date.
    pub fn value_date(&self) -> Date {
        self.value_date
    }

    /// The curve's value date as a serial number, for interpolation against
    /// a tree step computed as a fractional offset from today.
    pub fn value_date_serial(&self) -> f64 {
        self.value_date.serial() as f64
    }

    /// The compounding frequency assumed for rates quoted on this curve.
    pub fn compound_freq(&self) -> Rate {
        self.compound_freq
    }

    /// The short-rate volatility used to calibrate a tree against this curve.
    pub fn ir_vol(&self) -> Rate {
        self.ir_vol
    }

    /// The mean-reversion speed used to calibrate a tree against this curve.
    pub fn mean_reversion(&self) -> Rate {
        self.mean_reversion
    }

    /// Append a `(date, rate)` observation.
    ///
    /// The caller is responsible for appending in non-decreasing date order;
    /// [`rate_at`][Self::rate_at] assumes the samples are sorted.
    pub fn append(&mut self, date: Date, rate: Rate) {
        self.samples.push(CurveSample {
            date,
            rate,
            serial: date.serial() as f64,
        });
    }

    /// The curve's raw samples, in the order they were appended.
    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    /// Look up the zero rate at `date`.
    ///
    /// See [`rate_at_serial`][Self::rate_at_serial] for the lookup rule.
    pub fn rate_at(&self, date: Date, interpolate: bool) -> Result<Rate> {
        self.rate_at_serial(date.serial() as f64, interpolate)
            .map(|(rate, _)| rate)
    }

    /// Look up the zero rate at a fractional serial date — the tree build
    /// needs rates at `valueDate + k·dt·365.25`, which rarely lands on a
    /// whole calendar day.
    ///
    /// When `interpolate` is `false`, returns the nearest sample, with ties
    /// resolved in favor of the earlier one. When `true`, linearly
    /// interpolates between the straddling samples. A query before the
    /// first sample or after the last one clamps to that sample.
    ///
    /// Returns the matched rate along with the serial date actually used
    /// (the query date when interpolating, the sample's own date
    /// otherwise) — mirroring the `(tenor, rate)` pair a caller needs to
    /// report which point on the curve answered the query.
    pub fn rate_at_serial(&self, query: f64, interpolate: bool) -> Result<(Rate, f64)> {
        if self.samples.is_empty() {
            return Err(Error::EmptyCurve);
        }
        for (i, sample) in self.samples.iter().enumerate() {
            if query > sample.serial {
                continue;
            }
            if i == 0 {
                return Ok((sample.rate, sample.serial));
            }
            let prev = self.samples[i - 1];
            if interpolate {
                let period = sample.serial - prev.serial;
                let dt = query - prev.serial;
                let rate = prev.rate + (sample.rate - prev.rate) * dt / period;
                return Ok((rate, query));
            }
            if query - prev.serial <= sample.serial - query {
                return Ok((prev.rate, prev.serial));
            }
            return Ok((sample.rate, sample.serial));
        }
        let last = self.samples[self.samples.len() - 1];
        Ok((last.rate, last.serial))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: u16, m: u8, day: u8) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn sample_curve() -> Curve {
        let mut c = Curve::new(d(2020, 1, 1));
        c.append(d(2021, 1, 1), 0.01);
        c.append(d(2022, 1, 1), 0.02);
        c.append(d(2023, 1, 1), 0.04);
        c
    }

    #[test]
    fn empty_curve_errors() {
        let c = Curve::new(d(2020, 1, 1));
        assert!(matches!(c.rate_at(d(2021, 1, 1), false), Err(Error::EmptyCurve)));
    }

    #[test]
    fn before_first_sample_clamps() {
        let c = sample_curve();
        let r = c.rate_at(d(2020, 6, 1), false).unwrap();
        assert_eq!(r, 0.01);
    }

    #[test]
    fn after_last_sample_clamps() {
        let c = sample_curve();
        let r = c.rate_at(d(2030, 1, 1), false).unwrap();
        assert_eq!(r, 0.04);
    }

    #[test]
    fn nearest_neighbor_tie_favors_earlier() {
        let c = sample_curve();
        let midpoint = d(2021, 1, 1).serial() + (d(2022, 1, 1).serial() - d(2021, 1, 1).serial()) / 2;
        let mid_date = Date::from_serial(midpoint).unwrap();
        let (rate, _) = c.rate_at_serial(mid_date.serial() as f64, false).unwrap();
        assert_eq!(rate, 0.01);
    }

    #[test]
    fn linear_interpolation() {
        let c = sample_curve();
        let d1 = d(2021, 1, 1);
        let d2 = d(2022, 1, 1);
        let q = (d1.serial() + d2.serial()) as f64 / 2.0;
        let (rate, used) = c.rate_at_serial(q, true).unwrap();
        assert!((rate - 0.015).abs() < 1e-9);
        assert_eq!(used, q);
    }

    #[test]
    fn exact_hit_returns_sample() {
        let c = sample_curve();
        let r = c.rate_at(d(2022, 1, 1), false).unwrap();
        assert_eq!(r, 0.02);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn interpolation_is_piecewise_linear(
            r1 in -0.02f64..0.10,
            r2 in -0.02f64..0.10,
            alpha in 0.0f64..1.0,
        ) {
            let d1 = d(2020, 7, 1);
            let d2 = d(2021, 7, 1);
            let mut c = Curve::new(d(2020, 1, 1));
            c.append(d1, r1);
            c.append(d2, r2);

            let query_serial = alpha * d1.serial() as f64 + (1.0 - alpha) * d2.serial() as f64;
            let (rate, _) = c.rate_at_serial(query_serial, true).unwrap();
            let expected = alpha * r1 + (1.0 - alpha) * r2;
            prop_assert!((rate - expected).abs() < 1e-9, "rate={rate} expected={expected}");
        }
    }
}
