use ql_core::errors::{Error, Result};
use ql_core::{cc_to_dc, dc_to_cc, Rate, Real, Time};
use ql_curve::Curve;

use crate::node_probability::NodeProbability;

/// One time slice of the trinomial tree: the center short rate, the upper
/// and lower arm rates, and each node's Arrow-Debreu weight (the present
/// value today of $1 at that node, $0 elsewhere).
///
/// Size `s = min(i, j_max)` for slice `i`; geometry reverts to a constant
/// width beyond `j_max` (§3 invariant).
#[derive(Debug, Clone)]
pub struct TreeBranch {
    size: usize,
    node: Rate,
    up: Vec<Rate>,
    down: Vec<Rate>,
    q_node: Real,
    q_up: Vec<Real>,
    q_down: Vec<Real>,
}

impl TreeBranch {
    /// Create a branch with `size` nodes per arm, rates at 1.0 and
    /// Arrow-Debreu weights at 0 pending [`adjust_tree_nodes`][Self::adjust_tree_nodes].
    pub fn new(size: usize) -> Self {
        TreeBranch {
            size,
            node: 1.0,
            up: vec![1.0; size],
            down: vec![1.0; size],
            q_node: 0.0,
            q_up: vec![0.0; size],
            q_down: vec![0.0; size],
        }
    }

    /// Number of nodes per arm at this slice.
    pub fn size(&self) -> usize {
        self.size
    }

    /// The center node's short rate.
    pub fn node_rate(&self) -> Rate {
        self.node
    }

    /// Upper-arm short rate at index `j` (0-based, nearest to center first).
    pub fn up_rate(&self, j: usize) -> Rate {
        self.up[j]
    }

    /// Lower-arm short rate at index `j`.
    pub fn down_rate(&self, j: usize) -> Rate {
        self.down[j]
    }

    /// Fill the upper arm: `up[0] = u`, `up[i] = up[i-1] * u` while
    /// `i < j_max`, flattening to a constant thereafter (the reflecting
    /// boundary).
    pub fn set_up_branch(&mut self, u: Rate, j_max: i32) {
        if self.size == 0 {
            return;
        }
        self.up[0] = u;
        for i in 1..self.size {
            self.up[i] = if (i as i32) < j_max {
                self.up[i - 1] * u
            } else {
                self.up[i - 1]
            };
        }
    }

    /// Fill the lower arm, symmetric with [`set_up_branch`][Self::set_up_branch].
    pub fn set_down_branch(&mut self, d: Rate, j_max: i32) {
        if self.size == 0 {
            return;
        }
        self.down[0] = d;
        for i in 1..self.size {
            self.down[i] = if (i as i32) < j_max {
                self.down[i - 1] * d
            } else {
                self.down[i - 1]
            };
        }
    }

    /// Propagate Arrow-Debreu weights from `prev` into this slice.
    ///
    /// At the root slice (`size == 0`) there is no `prev`: the center rate
    /// is read directly off the curve and `Q_0 = 1`.
    pub fn adjust_tree_nodes(
        &mut self,
        curve: &Curve,
        dt: Time,
        prev: Option<&TreeBranch>,
        probs: &NodeProbability,
    ) -> Result<()> {
        if self.size == 0 {
            let today = curve.value_date_serial();
            let (rate, _) = curve.rate_at_serial(today + 365.25 * dt, false)?;
            self.node = dc_to_cc(rate, 2.0);
            self.q_node = 1.0;
            return Ok(());
        }
        let prev = prev.expect("non-root slice requires the previous slice's weights");

        let j_max = probs.j_max();
        let pre_size = prev.size;
        let prob_up = probs.prob_up();
        let prob_mid = probs.prob_mid();
        let prob_down = probs.prob_down();

        // Center node.
        let (q1, r1, p1, q3, r3, p3) = if self.size > 1 {
            let idx_up = probs.find_index(1)?;
            let idx_down = probs.find_index(-1)?;
            (
                prev.q_up[0],
                prev.up[0],
                prob_down[idx_up],
                prev.q_down[0],
                prev.down[0],
                prob_up[idx_down],
            )
        } else {
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
        };
        let idx0 = probs.find_index(0)?;
        let (q2, r2, p2) = (prev.q_node, prev.node, prob_mid[idx0]);
        self.q_node = q1 * p1 * (-r1 * dt).exp() + q2 * p2 * (-r2 * dt).exp() + q3 * p3 * (-r3 * dt).exp();

        let pre_size_i = pre_size as i32;

        // Upper arm.
        for i in 0..self.size {
            let ii = i as i32;
            let (q1, r1, p1);
            let (q2, r2, p2);
            let (q3, r3, p3);
            let mut extra = 0.0;

            if ii > pre_size_i - 1 {
                q1 = 0.0;
                r1 = 0.0;
                p1 = 0.0;
                q2 = 0.0;
                r2 = 0.0;
                p2 = 0.0;
                if i > 0 {
                    let idx = probs.find_index(ii)?;
                    q3 = prev.q_up[i - 1];
                    r3 = prev.up[i - 1];
                    p3 = prob_up[idx];
                } else {
                    let idx = probs.find_index(0)?;
                    q3 = prev.q_node;
                    r3 = prev.node;
                    p3 = prob_up[idx];
                }
            } else if ii == pre_size_i - 1 {
                q1 = 0.0;
                r1 = 0.0;
                p1 = 0.0;
                q2 = prev.q_up[i];
                r2 = prev.up[i];
                p2 = if ii == j_max - 1 {
                    probs.top_high()
                } else {
                    let idx = probs.find_index(ii + 1)?;
                    prob_mid[idx]
                };
                if i == 0 {
                    let idx = probs.find_index(0)?;
                    q3 = prev.q_node;
                    r3 = prev.node;
                    p3 = prob_up[idx];
                } else {
                    let idx = probs.find_index(ii)?;
                    q3 = prev.q_up[i - 1];
                    r3 = prev.up[i - 1];
                    p3 = prob_up[idx];
                }
            } else {
                q1 = prev.q_up[i + 1];
                r1 = prev.up[i + 1];
                p1 = if ii + 2 == j_max {
                    probs.top_mid()
                } else {
                    let idx = probs.find_index(ii + 2)?;
                    prob_down[idx]
                };
                q2 = prev.q_up[i];
                r2 = prev.up[i];
                p2 = {
                    let idx = probs.find_index(ii + 1)?;
                    prob_mid[idx]
                };
                if i > 0 {
                    let idx = probs.find_index(ii)?;
                    q3 = prev.q_up[i - 1];
                    r3 = prev.up[i - 1];
                    p3 = prob_up[idx];
                } else {
                    let idx = probs.find_index(0)?;
                    q3 = prev.q_node;
                    r3 = prev.node;
                    p3 = prob_up[idx];
                }
                if ii + 3 == j_max && (i + 2) < pre_size {
                    let q0 = prev.q_up[i + 2];
                    let r0 = prev.up[i + 2];
                    let p0 = probs.top_low();
                    extra = q0 * p0 * (-r0 * dt).exp();
                }
            }
            self.q_up[i] = extra
                + q1 * p1 * (-r1 * dt).exp()
                + q2 * p2 * (-r2 * dt).exp()
                + q3 * p3 * (-r3 * dt).exp();
        }

        // Lower arm, mirrored.
        for i in 0..self.size {
            let ii = i as i32;
            let (q1, r1, p1);
            let (q2, r2, p2);
            let (q3, r3, p3);
            let mut extra = 0.0;

            if ii > pre_size_i - 1 {
                q3 = 0.0;
                r3 = 0.0;
                p3 = 0.0;
                q2 = 0.0;
                r2 = 0.0;
                p2 = 0.0;
                if i > 0 {
                    let idx = probs.find_index(-ii)?;
                    q1 = prev.q_down[i - 1];
                    r1 = prev.down[i - 1];
                    p1 = prob_down[idx];
                } else {
                    let idx = probs.find_index(0)?;
                    q1 = prev.q_node;
                    r1 = prev.node;
                    p1 = prob_down[idx];
                }
            } else if ii == pre_size_i - 1 {
                q3 = 0.0;
                r3 = 0.0;
                p3 = 0.0;
                q2 = prev.q_down[i];
                r2 = prev.down[i];
                p2 = if ii == j_max - 1 {
                    probs.bottom_low()
                } else {
                    let idx = probs.find_index(-ii - 1)?;
                    prob_mid[idx]
                };
                if i == 0 {
                    let idx = probs.find_index(0)?;
                    q1 = prev.q_node;
                    r1 = prev.node;
                    p1 = prob_down[idx];
                } else {
                    let idx = probs.find_index(-ii)?;
                    q1 = prev.q_down[i - 1];
                    r1 = prev.down[i - 1];
                    p1 = prob_down[idx];
                }
            } else {
                q3 = prev.q_down[i + 1];
                r3 = prev.down[i + 1];
                p3 = if ii + 2 == j_max {
                    probs.bottom_mid()
                } else {
                    let idx = probs.find_index(-ii - 2)?;
                    prob_up[idx]
                };
                q2 = prev.q_down[i];
                r2 = prev.down[i];
                p2 = {
                    let idx = probs.find_index(-ii - 1)?;
                    prob_mid[idx]
                };
                if i > 0 {
                    let idx = probs.find_index(-ii)?;
                    q1 = prev.q_down[i - 1];
                    r1 = prev.down[i - 1];
                    p1 = prob_down[idx];
                } else {
                    let idx = probs.find_index(0)?;
                    q1 = prev.q_node;
                    r1 = prev.node;
                    p1 = prob_down[idx];
                }
                if ii + 3 == j_max && (i + 2) < pre_size {
                    let q0 = prev.q_down[i + 2];
                    let r0 = prev.down[i + 2];
                    let p0 = probs.bottom_high();
                    extra = q0 * p0 * (-r0 * dt).exp();
                }
            }
            self.q_down[i] = extra
                + q1 * p1 * (-r1 * dt).exp()
                + q2 * p2 * (-r2 * dt).exp()
                + q3 * p3 * (-r3 * dt).exp();
        }

        Ok(())
    }

    /// Find the scalar `alpha` such that `sum_nodes Q * exp(-alpha * r * dt)
    /// == target_df`, by bisection on `alpha ∈ [0, 1]`.
    ///
    /// Fails with [`Error::CalibrationFailed`] if the endpoints don't
    /// bracket `target_df` (the weighted sum is monotonically decreasing in
    /// `alpha`, so `sum(0) < target_df` or `sum(1) > target_df` means no
    /// root exists in range).
    pub fn calibration_multiplier(&self, dt: Time, target_df: Real, slice: usize) -> Result<Real> {
        let sum_at = |alpha: Real| -> Real {
            let mut sum = self.q_node * (-alpha * self.node * dt).exp();
            for i in 0..self.size {
                let u = self.q_up[i] * (-alpha * self.up[i] * dt).exp();
                sum += if u.is_finite() { u } else { 0.0 };
                let d = self.q_down[i] * (-alpha * self.down[i] * dt).exp();
                sum += if d.is_finite() { d } else { 0.0 };
            }
            sum
        };

        let mut left = 0.0;
        let mut right = 1.0;
        let sum_l = sum_at(left);
        let sum_r = sum_at(right);
        if sum_l < target_df || sum_r > target_df {
            return Err(Error::CalibrationFailed { slice, target: target_df });
        }

        let mut mid = right;
        let mut sum = sum_r;
        while (sum - target_df).abs() > 1e-6 && (left - right).abs() > 1e-5 {
            mid = 0.5 * (left + right);
            sum = sum_at(mid);
            if sum < target_df {
                right = mid;
            }
            if sum > target_df {
                left = mid;
            }
        }
        Ok(mid)
    }

    /// Rescale every rate in this slice by `multiplier` (applies the
    /// calibration result).
    pub fn apply_multiplier(&mut self, multiplier: Rate) {
        self.node *= multiplier;
        for r in self.up.iter_mut() {
            *r *= multiplier;
        }
        for r in self.down.iter_mut() {
            *r *= multiplier;
        }
    }

    /// Shift every rate by a credit spread: convert to discrete compounding
    /// (f=2), add `spread`, convert back to continuous. Passing a negative
    /// `spread` removes a previously applied shift.
    pub fn shift_by_credit_spread(&mut self, spread: Rate) {
        self.node = dc_to_cc(cc_to_dc(self.node, 2.0) + spread, 2.0);
        for r in self.up.iter_mut() {
            *r = dc_to_cc(cc_to_dc(*r, 2.0) + spread, 2.0);
        }
        for r in self.down.iter_mut() {
            *r = dc_to_cc(cc_to_dc(*r, 2.0) + spread, 2.0);
        }
    }
}
