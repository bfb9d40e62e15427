//! Conversion between discretely- and continuously-compounded rates.

use crate::Rate;

/// Convert a discretely-compounded rate (compounding frequency `freq` times
/// per year) to its continuously-compounded equivalent.
///
/// `DCtoCC(r, f) = f · ln(1 + r/f)`
pub fn dc_to_cc(rate: Rate, freq: Rate) -> Rate {
    freq * (1.0 + rate / freq).ln()
}

/// Convert a continuously-compounded rate to its discretely-compounded
/// equivalent (compounding frequency `freq` times per year).
///
/// `CCtoDC(r, f) = f · (exp(r/f) − 1)`
pub fn cc_to_dc(rate: Rate, freq: Rate) -> Rate {
    freq * ((rate / freq).exp() - 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn roundtrip() {
        for freq in [1.0, 2.0, 4.0, 12.0] {
            for r in [-0.05, 0.0, 0.03, 0.08, 0.20] {
                let cc = dc_to_cc(r, freq);
                let back = cc_to_dc(cc, freq);
                assert!((back - r).abs() < 1e-12, "freq={freq} r={r} back={back}");
            }
        }
    }

    proptest! {
        #[test]
        fn roundtrip_over_rate_and_freq_range(
            r in -0.05f64..0.20,
            freq in prop_oneof![Just(1.0), Just(2.0), Just(4.0), Just(12.0)],
        ) {
            let cc = dc_to_cc(r, freq);
            let back = cc_to_dc(cc, freq);
            prop_assert!((back - r).abs() < 1e-12, "freq={freq} r={r} back={back}");
        }
    }
}
