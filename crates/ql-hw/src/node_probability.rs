use ql_core::errors::{Error, Result};
use ql_core::{Rate, Time};

/// Hull-White branching probabilities for a trinomial tree with half-width
/// `j_max`: one `(p_u, p_m, p_d)` row per interior branching index, plus the
/// three-down (top) and three-up (bottom) reflecting-boundary rows.
#[derive(Debug, Clone)]
pub struct NodeProbability {
    j_max: i32,
    prob_up: Vec<Rate>,
    prob_mid: Vec<Rate>,
    prob_down: Vec<Rate>,
    top_high: Rate,
    top_mid: Rate,
    top_low: Rate,
    bottom_high: Rate,
    bottom_mid: Rate,
    bottom_low: Rate,
}

impl NodeProbability {
    /// Build the probability table for half-width `j_max`, time step `dt`,
    /// and mean-reversion speed `a`.
    pub fn new(j_max: i32, dt: Time, a: Rate) -> Self {
        let n = (2 * j_max - 1).max(0) as usize;
        let mut prob_up = Vec::with_capacity(n);
        let mut prob_mid = Vec::with_capacity(n);
        let mut prob_down = Vec::with_capacity(n);

        for i in 0..n {
            let j = i as i32 - j_max + 1;
            let jf = j as f64;
            let pu = 1.0 / 6.0 + (a * a * jf * jf * dt * dt - a * jf * dt) / 2.0;
            let pm = 2.0 / 3.0 - a * a * jf * jf * dt * dt;
            let pd = 1.0 - pu - pm;
            prob_up.push(pu);
            prob_mid.push(pm);
            prob_down.push(pd);
        }

        let jm = j_max as f64;
        let top_high = 7.0 / 6.0 + (a * a * jm * jm * dt * dt - 3.0 * a * jm * dt) / 2.0;
        let top_mid = -1.0 / 3.0 - a * a * jm * jm * dt * dt + 2.0 * a * jm * dt;
        let top_low = 1.0 - top_high - top_mid;

        let bottom_high = 1.0 / 6.0 + (a * a * jm * jm * dt * dt + a * (-jm) * dt) / 2.0;
        let bottom_mid = -1.0 / 3.0 - a * a * jm * jm * dt * dt - 2.0 * a * (-jm) * dt;
        let bottom_low = 1.0 - bottom_high - bottom_mid;

        NodeProbability {
            j_max,
            prob_up,
            prob_mid,
            prob_down,
            top_high,
            top_mid,
            top_low,
            bottom_high,
            bottom_mid,
            bottom_low,
        }
    }

    /// The tree's half-width.
    pub fn j_max(&self) -> i32 {
        self.j_max
    }

    /// Map a branching index `j ∈ (-j_max, j_max)` to a row in the interior
    /// probability arrays.
    pub fn find_index(&self, j: i32) -> Result<usize> {
        if j <= -self.j_max || j >= self.j_max {
            return Err(Error::ProbIndexOutOfRange { j, j_max: self.j_max });
        }
        Ok((j + self.j_max - 1) as usize)
    }

    /// Up-branching probability for each interior row.
    pub fn prob_up(&self) -> &[Rate] {
        &self.prob_up
    }

    /// Mid-branching probability for each interior row.
    pub fn prob_mid(&self) -> &[Rate] {
        &self.prob_mid
    }

    /// Down-branching probability for each interior row.
    pub fn prob_down(&self) -> &[Rate] {
        &self.prob_down
    }

    /// Top boundary (`j = +j_max`), no-up branch.
    pub fn top_high(&self) -> Rate {
        self.top_high
    }

    /// Top boundary, one-down branch.
    pub fn top_mid(&self) -> Rate {
        self.top_mid
    }

    /// Top boundary, two-down branch.
    pub fn top_low(&self) -> Rate {
        self.top_low
    }

    /// Bottom boundary (`j = -j_max`), two-up branch.
    pub fn bottom_high(&self) -> Rate {
        self.bottom_high
    }

    /// Bottom boundary, one-up branch.
    pub fn bottom_mid(&self) -> Rate {
        self.bottom_mid
    }

    /// Bottom boundary, no-up branch.
    pub fn bottom_low(&self) -> Rate {
        self.bottom_low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interior_rows_sum_to_one() {
        let p = NodeProbability::new(5, 0.01, 0.05);
        for i in 0..p.prob_up().len() {
            let sum = p.prob_up()[i] + p.prob_mid()[i] + p.prob_down()[i];
            assert!((sum - 1.0).abs() < 1e-12, "row {i} sums to {sum}");
        }
    }

    #[test]
    fn boundary_rows_sum_to_one() {
        let p = NodeProbability::new(5, 0.01, 0.05);
        assert!((p.top_high() + p.top_mid() + p.top_low() - 1.0).abs() < 1e-12);
        assert!((p.bottom_high() + p.bottom_mid() + p.bottom_low() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn find_index_out_of_range() {
        let p = NodeProbability::new(3, 0.01, 0.05);
        assert!(p.find_index(3).is_err());
        assert!(p.find_index(-3).is_err());
        assert!(p.find_index(0).is_ok());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn rows_sum_to_one_over_grid_range(
            j_max in 2i32..40,
            dt in 0.001f64..0.2,
            a in 0.01f64..0.5,
        ) {
            let p = NodeProbability::new(j_max, dt, a);
            for i in 0..p.prob_up().len() {
                let sum = p.prob_up()[i] + p.prob_mid()[i] + p.prob_down()[i];
                prop_assert!((sum - 1.0).abs() < 1e-9, "row {i} sums to {sum}");
            }
            prop_assert!((p.top_high() + p.top_mid() + p.top_low() - 1.0).abs() < 1e-9);
            prop_assert!((p.bottom_high() + p.bottom_mid() + p.bottom_low() - 1.0).abs() < 1e-9);
        }
    }
}
