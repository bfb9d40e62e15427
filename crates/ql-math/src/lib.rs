//! # ql-math
//!
//! 1-D root-finding: the dual-tolerance bisection this workspace uses.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// 1-D root-finding solvers (the dual-tolerance bisection this workspace uses).
pub mod solvers1d;
