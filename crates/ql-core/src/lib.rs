//! # ql-core
//!
//! Core types and error definitions shared across the workspace —
//! type aliases and the error hierarchy used by `ql-time`, `ql-math`,
//! `ql-curve`, `ql-bonds`, and `ql-hw`.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Error hierarchy and `ensure!`/`fail!` macros.
pub mod errors;

/// Conversion between discretely- and continuously-compounded rates.
pub mod rate_conversion;

pub use errors::{Error, Result};
pub use rate_conversion::{cc_to_dc, dc_to_cc};

/// Floating-point type used throughout the library.
pub type Real = f64;

/// Integer type used for general-purpose counting.
pub type Integer = i32;

/// Non-negative integer type.
pub type Natural = u32;

/// Alias used for array sizes / indices.
pub type Size = usize;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A spread over a reference rate.
pub type Spread = Real;

/// A discount factor in [0, 1].
pub type DiscountFactor = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years.
pub type Time = Real;
