//! Closed-form clean-price-from-yield and the YTM/YTC/YTW bisection engine.

use crate::bond::{Bond, Schedule};
use ql_core::errors::Result;
use ql_core::{Price, Rate};
use ql_curve::Curve;
use ql_math::solvers1d::bisect_solve;
use ql_time::{Date, TimeUnit};

/// Bracket and tolerances for the yield bisection (§4.1): `[-0.9999, 1000.0]`
/// with both `x` and `|f|` converging to `1e-6`.
const YIELD_BRACKET: (Rate, Rate) = (-0.9999, 1000.0);
const YIELD_TOLERANCE: Rate = 1e-6;

/// Clean price of `bond` given yield `y`, valued as of `value_date`.
///
/// Dates after maturity price to zero. Returns `dirty - accrued interest`,
/// where the dirty price sums discounted coupons plus the discounted
/// redemption, compounded at the bond's coupon frequency.
pub fn clean_price(bond: &Bond, schedule: &Schedule, y: Rate, value_date: Date) -> Price {
    if value_date > bond.maturity {
        return 0.0;
    }
    let entries = schedule.entries();
    let n = schedule.maturity_index();
    let i = schedule.next_date_idx(value_date);
    let freq = bond.coupon_freq as f64;

    let accrued = if i > 0 && i <= n {
        bond.face_value
            * entries[i - 1].rate
            * bond.day_count.year_fraction(entries[i - 1].date, value_date)
    } else {
        0.0
    };

    let mut dirty = 0.0;
    if i <= n {
        let t = (entries[n].date - value_date) as f64 / 365.25;
        if t >= 0.0 {
            dirty += bond.redemption * (1.0 + y / freq).powf(-t * freq);
        }
    }

    let mut k = i.max(1);
    while k <= n {
        let t = (entries[k].date - value_date) as f64 / 365.25;
        if t >= 0.0 {
            let amount = bond.face_value * entries[k - 1].rate * entries[k - 1].tenor;
            dirty += amount * (1.0 + y / freq).powf(-t * freq);
        }
        k += 1;
    }

    dirty - accrued
}

/// Yield to maturity: solves `clean_price(bond, y, value_date) == market_price`.
pub fn ytm(bond: &Bond, schedule: &Schedule, market_price: Price, value_date: Date) -> Result<Rate> {
    let (lo, hi) = YIELD_BRACKET;
    bisect_solve(
        |y| clean_price(bond, schedule, y, value_date) - market_price,
        lo,
        hi,
        YIELD_TOLERANCE,
        YIELD_TOLERANCE,
    )
}

/// Yield to next call: prices a copy of `bond` whose maturity/redemption are
/// shifted to the next call date/price, then solves for its YTM.
///
/// Returns `Ok(None)` when the bond carries no next call date.
pub fn ytc(
    bond: &Bond,
    market_price: Price,
    value_date: Date,
) -> Result<Option<Rate>> {
    let Some(call_date) = bond.next_call_date else {
        return Ok(None);
    };
    let called = bond.with_maturity(call_date, bond.next_call_price);
    let schedule = Schedule::build(&called)?;
    Ok(Some(ytm(&called, &schedule, market_price, value_date)?))
}

/// Yield to worst: the minimum yield (and the date achieving it) across the
/// straight YTM and every 7-day-spaced candidate call date from the next
/// call date through maturity.
///
/// Assumes a single call schedule running from the next call date to
/// maturity, all exercisable at `next_call_price`.
pub fn ytw(bond: &Bond, market_price: Price, value_date: Date) -> Result<(Rate, Date)> {
    let schedule = Schedule::build(bond)?;
    let mut worst_yield = ytm(bond, &schedule, market_price, value_date)?;
    let mut worst_date = bond.maturity;

    let Some(next_call_date) = bond.next_call_date else {
        return Ok((worst_yield, worst_date));
    };

    let mut call_date = next_call_date;
    while call_date <= bond.maturity {
        let called = bond.with_maturity(call_date, bond.next_call_price);
        let called_schedule = Schedule::build(&called)?;
        let candidate_yield = ytm(&called, &called_schedule, market_price, value_date)?;
        if candidate_yield < worst_yield {
            worst_yield = candidate_yield;
            worst_date = call_date;
        }
        call_date = call_date.advance(7, TimeUnit::Days)?;
    }

    Ok((worst_yield, worst_date))
}

/// Treasury spread lookup: the `(date, rate)` pair a treasury par curve
/// reports at the bond's maturity, for the caller to subtract from YTM.
pub fn yield_spread(bond: &Bond, treasury_curve: &Curve, interpolate: bool) -> Result<(Date, Rate)> {
    let (rate, serial) = treasury_curve.rate_at_serial(bond.maturity.serial() as f64, interpolate)?;
    let date = if (serial - serial.round()).abs() < 1e-9 {
        Date::from_serial(serial.round() as i32)?
    } else {
        bond.maturity
    };
    Ok((date, rate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bond::DayCount;

    fn d(y: u16, m: u8, day: u8) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn sample_bond() -> Bond {
        Bond {
            cusip: "TEST01".into(),
            issue_date: d(2020, 1, 1),
            effective_date: d(2020, 1, 1),
            maturity: d(2025, 1, 1),
            coupon_rate: 0.05,
            coupon_freq: 2,
            day_count: DayCount::Actual360,
            face_value: 100.0,
            redemption: 100.0,
            next_call_date: None,
            next_call_price: 100.0,
            recovery_rate: 0.75,
        }
    }

    #[test]
    fn ytm_at_par_matches_coupon() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        let y = ytm(&bond, &schedule, 100.0, bond.effective_date).unwrap();
        assert!((y - 0.05).abs() < 1e-4, "y = {y}");
    }

    #[test]
    fn ytm_monotonically_decreasing_in_yield() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        let p_low = clean_price(&bond, &schedule, 0.01, bond.effective_date);
        let p_high = clean_price(&bond, &schedule, 0.10, bond.effective_date);
        assert!(p_low > p_high);
    }

    #[test]
    fn discount_premium_bracket_yield() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        let y_discount = ytm(&bond, &schedule, 95.0, bond.effective_date).unwrap();
        let y_premium = ytm(&bond, &schedule, 105.0, bond.effective_date).unwrap();
        assert!(y_discount > 0.05);
        assert!(y_premium < 0.05);
    }

    #[test]
    fn non_callable_ytw_equals_ytm_at_maturity() {
        let bond = sample_bond();
        let (w, date) = ytw(&bond, 100.0, bond.effective_date).unwrap();
        let schedule = Schedule::build(&bond).unwrap();
        let y = ytm(&bond, &schedule, 100.0, bond.effective_date).unwrap();
        assert!((w - y).abs() < 1e-12);
        assert_eq!(date, bond.maturity);
    }

    #[test]
    fn ytc_none_when_not_callable() {
        let bond = sample_bond();
        assert!(ytc(&bond, 100.0, bond.effective_date).unwrap().is_none());
    }

    #[test]
    fn callable_ytc_below_ytm_for_premium_bond() {
        let mut bond = sample_bond();
        bond.next_call_date = Some(d(2023, 1, 1));
        bond.next_call_price = 100.0;
        let schedule = Schedule::build(&bond).unwrap();
        let y = ytm(&bond, &schedule, 102.0, bond.effective_date).unwrap();
        let c = ytc(&bond, 102.0, bond.effective_date).unwrap().unwrap();
        assert!(c < y, "ytc {c} should be below ytm {y}");

        let (w, w_date) = ytw(&bond, 102.0, bond.effective_date).unwrap();
        assert!((w - c).abs() < 1e-6);
        assert!(w_date >= bond.next_call_date.unwrap() && w_date <= bond.maturity);
    }
}
