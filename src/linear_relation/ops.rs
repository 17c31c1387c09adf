use alloc::vec;
use core::ops::{Add, Mul, Neg, Sub};

use ff::Field;

use super::{GroupVar, ScalarVar, Sum, Term, Weighted};

mod add {
    use super::*;

    impl Add<Term> for Term {
        type Output = Sum<Term>;

        fn add(self, rhs: Term) -> Self::Output {
            Sum(vec![self, rhs])
        }
    }

    impl Add<Term> for Sum<Term> {
        type Output = Sum<Term>;

        fn add(mut self, rhs: Term) -> Self::Output {
            self.0.push(rhs);
            self
        }
    }

    impl<T> Add<Sum<T>> for Sum<T> {
        type Output = Sum<T>;

        fn add(mut self, rhs: Sum<T>) -> Self::Output {
            self.0.extend(rhs.0);
            self
        }
    }

    impl<F: Field> Add<Weighted<Term, F>> for Weighted<Term, F> {
        type Output = Sum<Weighted<Term, F>>;

        fn add(self, rhs: Weighted<Term, F>) -> Self::Output {
            Sum(vec![self, rhs])
        }
    }

    impl<F: Field> Add<Term> for Weighted<Term, F> {
        type Output = Sum<Weighted<Term, F>>;

        fn add(self, rhs: Term) -> Self::Output {
            Sum(vec![self, rhs.into()])
        }
    }

    impl<F: Field> Add<Weighted<Term, F>> for Term {
        type Output = Sum<Weighted<Term, F>>;

        fn add(self, rhs: Weighted<Term, F>) -> Self::Output {
            rhs + self
        }
    }

    impl<F: Field> Add<Weighted<Term, F>> for Sum<Weighted<Term, F>> {
        type Output = Sum<Weighted<Term, F>>;

        fn add(mut self, rhs: Weighted<Term, F>) -> Self::Output {
            self.0.push(rhs);
            self
        }
    }

    impl<F: Field> Add<Term> for Sum<Weighted<Term, F>> {
        type Output = Sum<Weighted<Term, F>>;

        fn add(mut self, rhs: Term) -> Self::Output {
            self.0.push(rhs.into());
            self
        }
    }
}

mod mul {
    use super::*;

    impl Mul<ScalarVar> for GroupVar {
        type Output = Term;

        /// Multiply a [ScalarVar] by a [GroupVar] to form a new [Term].
        fn mul(self, rhs: ScalarVar) -> Term {
            Term {
                elem: self,
                scalar: rhs,
            }
        }
    }

    impl Mul<GroupVar> for ScalarVar {
        type Output = Term;

        /// Multiply a [ScalarVar] by a [GroupVar] to form a new [Term].
        fn mul(self, rhs: GroupVar) -> Term {
            rhs * self
        }
    }

    // Only `term * weight` is provided: a foreign trait cannot be implemented on a bare
    // generic field type.
    impl<F: Field> Mul<F> for Term {
        type Output = Weighted<Term, F>;

        fn mul(self, rhs: F) -> Self::Output {
            Weighted {
                term: self,
                weight: rhs,
            }
        }
    }

    impl<F: Field> Mul<F> for Weighted<Term, F> {
        type Output = Weighted<Term, F>;

        fn mul(self, rhs: F) -> Self::Output {
            Weighted {
                term: self.term,
                weight: self.weight * rhs,
            }
        }
    }
}

mod neg {
    use super::*;

    impl<F: Field> Neg for Weighted<Term, F> {
        type Output = Weighted<Term, F>;

        /// Negation of a weighted term, implemented as negation of its weight.
        fn neg(self) -> Self::Output {
            Weighted {
                term: self.term,
                weight: -self.weight,
            }
        }
    }

    impl<F: Field> Neg for Sum<Weighted<Term, F>> {
        type Output = Sum<Weighted<Term, F>>;

        fn neg(self) -> Self::Output {
            Sum(self.0.into_iter().map(Neg::neg).collect())
        }
    }
}

mod sub {
    use super::*;

    impl<F: Field> Sub<Weighted<Term, F>> for Sum<Weighted<Term, F>> {
        type Output = Sum<Weighted<Term, F>>;

        #[allow(clippy::suspicious_arithmetic_impl)]
        fn sub(self, rhs: Weighted<Term, F>) -> Self::Output {
            self + rhs.neg()
        }
    }

    impl<F: Field> Sub<Weighted<Term, F>> for Weighted<Term, F> {
        type Output = Sum<Weighted<Term, F>>;

        #[allow(clippy::suspicious_arithmetic_impl)]
        fn sub(self, rhs: Weighted<Term, F>) -> Self::Output {
            self + rhs.neg()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::LinearCombination;
    use super::*;
    use curve25519_dalek::{RistrettoPoint, Scalar};

    #[test]
    fn weighted_sums_keep_their_weights() {
        let (x, y) = (ScalarVar(0), ScalarVar(1));
        let (g, h) = (GroupVar(0), GroupVar(1));

        let lc: LinearCombination<RistrettoPoint> =
            x * g * Scalar::from(3u64) - y * h * Scalar::from(2u64);
        let weights = lc.terms().iter().map(|w| w.weight).collect::<Vec<_>>();
        assert_eq!(weights, vec![Scalar::from(3u64), -Scalar::from(2u64)]);
        assert_eq!(lc.terms()[1].term, Term { scalar: y, elem: h });
    }

    #[test]
    fn plain_terms_get_unit_weight() {
        let lc: LinearCombination<RistrettoPoint> = (ScalarVar(0) * GroupVar(2)).into();
        assert_eq!(lc.terms().len(), 1);
        assert_eq!(lc.terms()[0].weight, Scalar::ONE);
    }
}
