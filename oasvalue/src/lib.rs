//! # oasvalue
//!
//! The facade that assembles a single pricing result from the yield engine
//! (`ql-bonds`) and the Hull-White OAS engine (`ql-hw`): YTM/YTC/YTW, treasury
//! spread, jump-to-default, and OAS, bundled into one [`PricingResponse`].
//!
//! CSV/JSON ingestion of bond reference records and curve data, curve
//! acquisition, and any HTTP/CLI surface are external collaborators and are
//! not part of this crate; it only implements the pricing-request/response
//! contract.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

use ql_bonds::{ytc, ytm, ytw, yield_spread, Bond, Schedule};
use ql_core::{Price, Rate, Spread};
use ql_curve::Curve;
use ql_hw::{ModelConfig, OasEngine};
use ql_time::Date;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised at the facade boundary.
///
/// Wraps the core's error hierarchy and adds the one concern specific to
/// this layer: turning a `YYYYMMDD` integer into a [`Date`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FacadeError {
    /// A `YYYYMMDD` field could not be parsed into a calendar date.
    #[error("invalid YYYYMMDD date {0}")]
    InvalidDate(i64),

    /// Propagated from the core (data/model/numeric/contract errors).
    #[error(transparent)]
    Core(#[from] ql_core::Error),
}

/// Shorthand result type for this crate.
pub type Result<T> = std::result::Result<T, FacadeError>;

/// A pricing request handed to the core by a collaborator.
///
/// `oas` defaults to the bond's own coupon rate when absent, matching the
/// external interface's documented default seed spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRequest {
    /// Value date to price as of, `YYYYMMDD`.
    pub value_date: i64,
    /// Market (clean) price to solve OAS against.
    pub price: Price,
    /// Seed credit spread for the Newton solve. Defaults to the bond's
    /// coupon rate when `None`, per the external interface contract.
    pub oas: Option<Spread>,
}

/// The combined pricing result for one bond on one value date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResponse {
    /// The bond's identifier, echoed from the bond descriptor.
    pub cusip: String,
    /// The bond's coupon rate.
    pub coupon: Rate,
    /// Maturity date, `YYYYMMDD`.
    pub maturity: i64,
    /// Value date priced as of, `YYYYMMDD`.
    pub value_date: i64,
    /// The market clean price supplied in the request.
    pub price: Price,
    /// Yield to maturity.
    pub ytm: Rate,
    /// Yield to next call, `None` when the bond is not callable.
    pub ytc: Option<Rate>,
    /// Yield to worst (minimum of YTM and every candidate YTC).
    pub ytw: Rate,
    /// The date achieving `ytw`, `YYYYMMDD`.
    pub ytw_date: i64,
    /// `ytm` minus the treasury par curve's rate at the bond's maturity.
    pub ytm_to_treasury_spread: Rate,
    /// Jump-to-default loss: `price - recovery_rate * 100`.
    pub jtd: Price,
    /// Option-adjusted spread solved against `price`.
    pub oas: Spread,
}

/// `YYYYMMDD` representation of `date`.
pub fn to_yyyymmdd(date: Date) -> i64 {
    date.year() as i64 * 10_000 + date.month() as i64 * 100 + date.day_of_month() as i64
}

/// Parse a `YYYYMMDD` integer into a [`Date`].
pub fn from_yyyymmdd(value: i64) -> Result<Date> {
    if !(19_000_101..=21_991_231).contains(&value) {
        return Err(FacadeError::InvalidDate(value));
    }
    let year = (value / 10_000) as u16;
    let month = ((value / 100) % 100) as u8;
    let day = (value % 100) as u8;
    Date::from_ymd(year, month, day).map_err(|_| FacadeError::InvalidDate(value))
}

/// Price `bond` against `spot_curve` (the risk-free curve feeding the
/// Hull-White tree) and `treasury_curve` (the par curve for the treasury
/// spread), per `request`. Mirrors the C8 result-assembly recipe: compute
/// YTM/YTC/YTW and the treasury spread from the yield engine, JTD from the
/// bond's own recovery assumption, and OAS from the tree, then bundle all of
/// it into one immutable [`PricingResponse`].
pub fn price_bond(
    bond: &Bond,
    spot_curve: &Curve,
    treasury_curve: &Curve,
    request: &PricingRequest,
    config: ModelConfig,
) -> Result<PricingResponse> {
    bond.validate()?;
    let value_date = from_yyyymmdd(request.value_date)?;

    let schedule = Schedule::build(bond)?;
    let ytm_value = ytm(bond, &schedule, request.price, value_date)?;
    let ytc_value = ytc(bond, request.price, value_date)?;
    let (ytw_value, ytw_date) = ytw(bond, request.price, value_date)?;
    let (_, treasury_rate) = yield_spread(bond, treasury_curve, false)?;
    let jtd = bond.jtd_risk(request.price);

    let seed_spread = request.oas.unwrap_or(bond.coupon_rate);
    let mut engine = OasEngine::setup(bond, spot_curve, value_date, seed_spread, config)?;
    let oas = engine.calibrate_oas(request.price)?;

    Ok(PricingResponse {
        cusip: bond.cusip.clone(),
        coupon: bond.coupon_rate,
        maturity: to_yyyymmdd(bond.maturity),
        value_date: request.value_date,
        price: request.price,
        ytm: ytm_value,
        ytc: ytc_value,
        ytw: ytw_value,
        ytw_date: to_yyyymmdd(ytw_date),
        ytm_to_treasury_spread: ytm_value - treasury_rate,
        jtd,
        oas,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ql_bonds::DayCount;
    use ql_time::TimeUnit;

    fn d(y: u16, m: u8, day: u8) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    fn flat_curve(value_date: Date, rate: Rate) -> Curve {
        let mut c = Curve::new(value_date);
        c.append(value_date.advance(1, TimeUnit::Years).unwrap(), rate);
        c.append(value_date.advance(30, TimeUnit::Years).unwrap(), rate);
        c
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
    fn yyyymmdd_roundtrips() {
        let date = d(2023, 11, 7);
        assert_eq!(to_yyyymmdd(date), 20_231_107);
        assert_eq!(from_yyyymmdd(20_231_107).unwrap(), date);
    }

    #[test]
    fn rejects_malformed_yyyymmdd() {
        assert!(from_yyyymmdd(99_999_999).is_err());
    }

    #[test]
    fn non_callable_response_has_no_ytc_and_ytw_equals_ytm() {
        let bond = sample_bond();
        let curve = flat_curve(bond.effective_date, 0.05);
        let request = PricingRequest {
            value_date: to_yyyymmdd(bond.effective_date),
            price: 100.0,
            oas: Some(0.0),
        };
        let response =
            price_bond(&bond, &curve, &curve, &request, ModelConfig::default()).unwrap();
        assert!(response.ytc.is_none());
        assert!((response.ytw - response.ytm).abs() < 1e-9);
        assert_eq!(response.ytw_date, response.maturity);
        assert!((response.jtd - (100.0 - 0.75 * 100.0)).abs() < 1e-9);
    }

    #[test]
    fn callable_response_reports_ytc_and_jtd() {
        let mut bond = sample_bond();
        bond.next_call_date = Some(d(2023, 1, 1));
        bond.next_call_price = 100.0;
        let curve = flat_curve(bond.effective_date, 0.04);
        let request = PricingRequest {
            value_date: to_yyyymmdd(bond.effective_date),
            price: 98.0,
            oas: None,
        };
        let response =
            price_bond(&bond, &curve, &curve, &request, ModelConfig::default()).unwrap();
        assert!(response.ytc.is_some());
        assert!((response.jtd - 23.0).abs() < 1e-9);
    }
}
