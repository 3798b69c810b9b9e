//! Shared value types for weighted finite-state transducers.
//!
//! - [`weight`]: log-domain probability weights and their text forms
//! - [`alphabet`]: symbol tables mapping names to dense ids

pub mod alphabet;
pub mod weight;

pub use alphabet::{Alphabet, EPSILON, EPSILON_NAME, Symbol};
pub use weight::{LogStyle, LogThreshold, Weight, WeightFormat, WeightParseError};

#[cfg(test)]
mod proptests {
    use super::Weight;
    use proptest::prelude::*;

    fn real() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), 1e-6f64..1e3]
    }

    fn close(a: Weight, b: Weight) -> bool {
        a.approx_eq(b, 1e-9 * a.ln().abs().max(b.ln().abs()).max(1.0))
    }

    proptest! {
        #[test]
        fn addition_matches_reals(a in real(), b in real()) {
            let sum = (Weight::from_real(a) + Weight::from_real(b)).to_real();
            prop_assert!((sum - (a + b)).abs() <= 1e-9 * (a + b).max(1.0));
        }

        #[test]
        fn division_undoes_multiplication(a in real(), b in 1e-6f64..1e3) {
            let (a, b) = (Weight::from_real(a), Weight::from_real(b));
            prop_assert!(close((a * b) / b, a));
        }

        #[test]
        fn addition_commutes(a in real(), b in real()) {
            let (a, b) = (Weight::from_real(a), Weight::from_real(b));
            prop_assert!(close(a + b, b + a));
        }

        #[test]
        fn addition_associates(a in real(), b in real(), c in real()) {
            let (a, b, c) = (Weight::from_real(a), Weight::from_real(b), Weight::from_real(c));
            prop_assert!(close((a + b) + c, a + (b + c)));
        }

        #[test]
        fn zero_is_additive_identity(a in real()) {
            let a = Weight::from_real(a);
            prop_assert_eq!(a + Weight::zero(), a);
        }

        #[test]
        fn one_is_multiplicative_identity(a in real()) {
            let a = Weight::from_real(a);
            prop_assert_eq!(a * Weight::one(), a);
        }

        #[test]
        fn multiplication_distributes(a in real(), b in real(), c in real()) {
            let (a, b, c) = (Weight::from_real(a), Weight::from_real(b), Weight::from_real(c));
            prop_assert!(close(a * (b + c), a * b + a * c));
        }

        #[test]
        fn subtraction_never_goes_negative(a in real(), b in real()) {
            let (a, b) = (Weight::from_real(a), Weight::from_real(b));
            let d = a - b;
            if b >= a {
                prop_assert!(d.is_zero());
            } else {
                prop_assert!(d <= a);
            }
        }

        #[test]
        fn add_is_monotone(a in real(), b in real()) {
            let (a, b) = (Weight::from_real(a), Weight::from_real(b));
            prop_assert!(a + b >= a.max(b));
        }
    }
}
