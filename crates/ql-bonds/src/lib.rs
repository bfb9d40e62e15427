//! # ql-bonds
//!
//! The bond/coupon schedule data model (§C2) and the yield engine (§C4):
//! closed-form clean-price-from-yield, and YTM/YTC/YTW via bisection.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bond;
mod yield_engine;

pub use bond::{Bond, Coupon, DayCount, Schedule};
pub use yield_engine::{clean_price, yield_spread, ytc, ytm, ytw};
