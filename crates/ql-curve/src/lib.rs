//! # ql-curve
//!
//! Zero-coupon rate curve storage and the nearest/linear rate lookup used to
//! calibrate the Hull-White lattice and to price a bond's treasury spread.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod curve;

pub use curve::{Curve, CurveSample};
