use ql_core::errors::{Error, Result};
use ql_core::{ensure, Price, Rate, Time};
use ql_time::day_counter::{Actual360, Actual365Fixed, Actual36525, DayCounter, Thirty360};
use ql_time::{Date, TimeUnit};

/// Day-count convention used to compute year fractions for a bond.
///
/// Stored as a tag rather than `Box<dyn DayCounter>` since the set of
/// conventions is closed and small; dispatch is a plain match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayCount {
    /// Actual/360 — the core's default.
    #[default]
    Actual360,
    /// Actual/365 (Fixed).
    Actual365Fixed,
    /// Actual/365.25.
    Actual36525,
    /// 30/360 (Bond Basis).
    Thirty360,
}

impl DayCount {
    /// Year fraction between `d1` and `d2` under this convention.
    pub fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        match self {
            DayCount::Actual360 => Actual360.year_fraction(d1, d2),
            DayCount::Actual365Fixed => Actual365Fixed.year_fraction(d1, d2),
            DayCount::Actual36525 => Actual36525.year_fraction(d1, d2),
            DayCount::Thirty360 => Thirty360.year_fraction(d1, d2),
        }
    }

    /// Year fraction from `d1` to a fractional serial date `t`.
    ///
    /// Used by the OAS engine's accrued-interest schedule, which evaluates
    /// accrual at tree-step calendar times that rarely land on a whole day.
    /// `Thirty360` has no natural fractional-day extension, so it falls back
    /// to the actual/360 day count here.
    pub fn year_fraction_from_serial(&self, d1: Date, t: f64) -> Time {
        let days = t - d1.serial() as f64;
        match self {
            DayCount::Actual360 | DayCount::Thirty360 => days / 360.0,
            DayCount::Actual365Fixed => days / 365.0,
            DayCount::Actual36525 => days / 365.25,
        }
    }
}

/// A single entry in a bond's coupon schedule.
///
/// `tenor` is the year fraction from this entry's date to the *next*
/// entry's date — the forward period whose accrual is paid at that next
/// date. The terminal (maturity) entry's tenor is unused and left at 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coupon {
    /// This entry's date.
    pub date: Date,
    /// The coupon rate applying to this period (decimal, e.g. 0.045).
    pub rate: Rate,
    /// Year fraction from `date` to the next entry's date.
    pub tenor: Time,
}

/// A bond's derived coupon schedule.
///
/// Entry 0 is the stub (effective-date anchor), entries `1..N` are real
/// coupons, entry `N` is the maturity entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    entries: Vec<Coupon>,
}

impl Schedule {
    /// Build the coupon schedule for `bond`.
    ///
    /// Steps backward from maturity in `12/frequency`-month increments
    /// until the next step would cross the effective date — the last date
    /// still inside `(effective, maturity]` is the first coupon date.
    /// Then steps forward, appending a coupon each period and stopping once
    /// the next step would land within 15 days of maturity, always closing
    /// with a terminal entry at maturity itself.
    pub fn build(bond: &Bond) -> Result<Self> {
        ensure!(
            bond.effective_date <= bond.maturity,
            "effective date {} must not be after maturity {}",
            bond.effective_date,
            bond.maturity
        );
        let months_per_period = 12 / bond.coupon_freq as i32;

        let mut first_coupon_date = bond.maturity;
        let mut curr = bond.maturity;
        while curr > bond.effective_date {
            first_coupon_date = curr;
            curr = curr.advance(-months_per_period, TimeUnit::Months)?;
        }

        let mut entries = vec![Coupon {
            date: bond.effective_date,
            rate: bond.coupon_rate,
            tenor: 0.0,
        }];

        let max_date = bond.maturity - 15;
        let mut curr = first_coupon_date;
        while curr < max_date {
            let last = entries.last_mut().expect("stub entry always present");
            last.tenor = bond.day_count.year_fraction(last.date, curr);
            entries.push(Coupon {
                date: curr,
                rate: bond.coupon_rate,
                tenor: 0.0,
            });
            curr = curr.advance(months_per_period, TimeUnit::Months)?;
        }

        let last = entries.last_mut().expect("stub entry always present");
        last.tenor = bond.day_count.year_fraction(last.date, bond.maturity);
        entries.push(Coupon {
            date: bond.maturity,
            rate: bond.coupon_rate,
            tenor: 0.0,
        });

        Ok(Schedule { entries })
    }

    /// All schedule entries, index 0 (stub) through index `N` (maturity).
    pub fn entries(&self) -> &[Coupon] {
        &self.entries
    }

    /// Index of the maturity entry, `N`.
    pub fn maturity_index(&self) -> usize {
        self.entries.len() - 1
    }

    /// The smallest `i` with `entries[i].date >= value_date`.
    ///
    /// Used by the yield engine and the OAS engine to locate the current
    /// accrual period relative to a value date.
    pub fn next_date_idx(&self, value_date: Date) -> usize {
        self.entries
            .iter()
            .position(|c| c.date >= value_date)
            .unwrap_or(self.entries.len())
    }
}

/// A fixed-coupon bond descriptor.
///
/// Constructed once from a reference record and never mutated by the core.
/// The yield engine's YTC/YTW paths operate on a short-lived [`Bond::with_maturity`]
/// copy rather than mutating this one.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    /// Opaque identifier (e.g. CUSIP).
    pub cusip: String,
    /// Issue date.
    pub issue_date: Date,
    /// Effective (accrual start) date.
    pub effective_date: Date,
    /// Maturity date.
    pub maturity: Date,
    /// Coupon rate, decimal (e.g. 0.045 for 4.5%).
    pub coupon_rate: Rate,
    /// Coupon payments per year (1, 2, 4, or 12).
    pub coupon_freq: u32,
    /// Day-count convention for year fractions.
    pub day_count: DayCount,
    /// Face (par) value, default 100.
    pub face_value: Price,
    /// Redemption value paid at maturity, default 100.
    pub redemption: Price,
    /// Next scheduled call date, if any.
    pub next_call_date: Option<Date>,
    /// Price paid upon exercise of the next call.
    pub next_call_price: Price,
    /// Recovery rate assumed for jump-to-default, default 0.75.
    pub recovery_rate: Rate,
}

impl Bond {
    /// Validate the invariants from §3: coupon frequency, coupon rate range,
    /// effective/maturity ordering, and (if set) the next-call window.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            matches!(self.coupon_freq, 1 | 2 | 4 | 12),
            "coupon frequency {} must be one of {{1, 2, 4, 12}}",
            self.coupon_freq
        );
        ensure!(
            (0.0..1.0).contains(&self.coupon_rate),
            "coupon rate {} must be in [0, 1)",
            self.coupon_rate
        );
        ensure!(
            self.effective_date <= self.maturity,
            "effective date {} must not be after maturity {}",
            self.effective_date,
            self.maturity
        );
        if let Some(call_date) = self.next_call_date {
            ensure!(
                self.effective_date <= call_date && call_date <= self.maturity,
                "next call date {call_date} must fall within [effective, maturity]"
            );
            ensure!(
                self.next_call_price > 0.0 && self.next_call_price <= 2.0 * self.face_value,
                "next call price {} must be in (0, 2*face]",
                self.next_call_price
            );
        }
        Ok(())
    }

    /// A copy with `maturity` and `redemption` overridden.
    ///
    /// Used by [`ytc`][crate::ytc] and [`ytw`][crate::ytw] to price against a
    /// truncated schedule without mutating the canonical bond (§9 design
    /// notes: bond descriptors are never mutated in place).
    pub fn with_maturity(&self, maturity: Date, redemption: Price) -> Self {
        Bond {
            maturity,
            redemption,
            ..self.clone()
        }
    }

    /// Jump-to-default loss: `market_price - recovery_rate * 100`.
    pub fn jtd_risk(&self, market_price: Price) -> Price {
        market_price - self.recovery_rate * 100.0
    }

    /// `true` if the bond carries a next-call date.
    pub fn is_callable(&self) -> bool {
        self.next_call_date.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn schedule_tenors_sum_to_whole_life() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        let total: Time = schedule
            .entries()
            .iter()
            .take(schedule.maturity_index())
            .map(|c| c.tenor)
            .sum();
        let expected = bond
            .day_count
            .year_fraction(bond.effective_date, bond.maturity);
        assert!((total - expected).abs() < 1e-9, "{total} vs {expected}");
    }

    #[test]
    fn schedule_terminal_entry_is_maturity() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        assert_eq!(
            schedule.entries()[schedule.maturity_index()].date,
            bond.maturity
        );
        assert_eq!(schedule.entries()[0].date, bond.effective_date);
    }

    #[test]
    fn next_date_idx_finds_current_period() {
        let bond = sample_bond();
        let schedule = Schedule::build(&bond).unwrap();
        let idx = schedule.next_date_idx(bond.effective_date);
        assert_eq!(idx, 0);
        let idx = schedule.next_date_idx(d(2024, 12, 31));
        assert_eq!(idx, schedule.maturity_index());
    }

    #[test]
    fn rejects_invalid_coupon_freq() {
        let mut bond = sample_bond();
        bond.coupon_freq = 3;
        assert!(bond.validate().is_err());
    }

    #[test]
    fn rejects_call_outside_life() {
        let mut bond = sample_bond();
        bond.next_call_date = Some(d(2026, 1, 1));
        assert!(bond.validate().is_err());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn schedule_tenors_sum_to_whole_life_over_freq_and_term(
            freq in prop_oneof![Just(1u32), Just(2u32), Just(4u32), Just(12u32)],
            years in 1i32..30,
        ) {
            let mut bond = sample_bond();
            bond.coupon_freq = freq;
            bond.maturity = bond.effective_date.advance(years, TimeUnit::Years).unwrap();

            let schedule = Schedule::build(&bond).unwrap();
            let total: Time = schedule
                .entries()
                .iter()
                .take(schedule.maturity_index())
                .map(|c| c.tenor)
                .sum();
            let expected = bond
                .day_count
                .year_fraction(bond.effective_date, bond.maturity);
            prop_assert!((total - expected).abs() < 1e-6, "{total} vs {expected}");
        }
    }
}
