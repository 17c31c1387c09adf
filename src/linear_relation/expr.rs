//! Declarative equations over named unknowns.
//!
//! An [`EquationSystem`] is a list of equations `lhs == rhs` whose sides are
//! [`Expr`]essions written in additive notation: group literals, known scalar
//! multiples, unknown scalar multiples (the witness) and the group operation.
//! Multiplicative statements such as `C = g^x · h^r` read as
//! `C == g·x + h·r` here.
//!
//! ```
//! # use curve25519_dalek::{RistrettoPoint, Scalar};
//! # use group::Group;
//! use sigma_policy_proofs::linear_relation::expr::{EquationSystem, Expr};
//!
//! let mut rng = rand::thread_rng();
//! let (g, h) = (RistrettoPoint::random(&mut rng), RistrettoPoint::random(&mut rng));
//! let (x, r) = (Scalar::from(7u64), Scalar::from(11u64));
//!
//! let mut system = EquationSystem::new();
//! system.equation(
//!     Expr::element(g * x + h * r),
//!     Expr::element(g).pow_unknown("x") + Expr::element(h).pow_unknown("r"),
//! );
//! let compiled = system.compile().unwrap();
//! assert_eq!(compiled.unknowns, ["x", "r"]);
//! assert!(compiled.relation.is_satisfied_by(&[x, r]));
//! ```
//!
//! Bilinear pairings enter through the [`Pairing`] trait. Since
//! `e(A^x, B) = e(A, B)^x`, a pairing with an unknown exponent is written as
//! `Expr::pairing(&engine, &a, &b).pow_unknown("x")` and compiles to a
//! target-group base.
//!
//! Equations in the target group usually talk about the same values as equations in
//! the source group (a commitment opens to the value a signature is on). A
//! [`LinkedEquationSystem`] holds both kinds over one table of unknowns; it compiles
//! to a [`LinkedRelation`] whose two halves share nonces and responses.

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::ops::{Add, Neg, Sub};

use ff::Field;
use group::prime::PrimeGroup;

use super::linked::LinkedRelation;
use super::{CanonicalLinearRelation, LinearCombination, LinearRelation, ScalarVar, Sum, Weighted};
use crate::errors::{Error, InvalidInstance};

/// A bilinear map `e: Left × Right → G`.
pub trait Pairing<G: PrimeGroup> {
    type Left;
    type Right;

    fn pair(&self, left: &Self::Left, right: &Self::Right) -> G;
}

/// An expression over a group, possibly involving named unknown scalars.
#[derive(Clone, Debug)]
pub enum Expr<G: PrimeGroup> {
    /// A public group element.
    Element(G),
    /// The group operation.
    Sum(Box<Expr<G>>, Box<Expr<G>>),
    /// The group inverse.
    Neg(Box<Expr<G>>),
    /// Multiplication by a public scalar.
    Scale(Box<Expr<G>>, G::Scalar),
    /// Multiplication by a named unknown scalar.
    Unknown(Box<Expr<G>>, String),
}

impl<G: PrimeGroup> Expr<G> {
    pub fn element(element: G) -> Self {
        Expr::Element(element)
    }

    /// The pairing of two public values, as an element of the target group.
    pub fn pairing<P: Pairing<G>>(engine: &P, left: &P::Left, right: &P::Right) -> Self {
        Expr::Element(engine.pair(left, right))
    }

    /// Raise to a known exponent.
    pub fn pow(self, exponent: G::Scalar) -> Self {
        Expr::Scale(Box::new(self), exponent)
    }

    /// Raise to the unknown `name`.
    ///
    /// The base must not itself depend on an unknown.
    pub fn pow_unknown(self, name: impl Into<String>) -> Self {
        Expr::Unknown(Box::new(self), name.into())
    }

    fn collect_unknowns(&self, out: &mut Vec<String>) {
        match self {
            Expr::Element(_) => {}
            Expr::Sum(a, b) => {
                a.collect_unknowns(out);
                b.collect_unknowns(out);
            }
            Expr::Neg(a) | Expr::Scale(a, _) => a.collect_unknowns(out),
            Expr::Unknown(a, name) => {
                a.collect_unknowns(out);
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
        }
    }

    fn flatten(&self) -> Result<Flat<G>, InvalidInstance> {
        match self {
            Expr::Element(element) => Ok(Flat {
                constant: *element,
                terms: Vec::new(),
            }),
            Expr::Sum(a, b) => {
                let mut flat = a.flatten()?;
                let other = b.flatten()?;
                flat.constant += other.constant;
                flat.terms.extend(other.terms);
                Ok(flat)
            }
            Expr::Neg(a) => Ok(a.flatten()?.scale(-G::Scalar::ONE)),
            Expr::Scale(a, k) => Ok(a.flatten()?.scale(*k)),
            Expr::Unknown(a, name) => {
                let base = a.flatten()?;
                if !base.terms.is_empty() {
                    return Err(InvalidInstance::new(
                        "unknown exponent applied to a base that depends on an unknown",
                    ));
                }
                Ok(Flat {
                    constant: G::identity(),
                    terms: vec![(name.clone(), base.constant, G::Scalar::ONE)],
                })
            }
        }
    }
}

impl<G: PrimeGroup> Add for Expr<G> {
    type Output = Expr<G>;

    fn add(self, rhs: Expr<G>) -> Self::Output {
        Expr::Sum(Box::new(self), Box::new(rhs))
    }
}

impl<G: PrimeGroup> Neg for Expr<G> {
    type Output = Expr<G>;

    fn neg(self) -> Self::Output {
        Expr::Neg(Box::new(self))
    }
}

impl<G: PrimeGroup> Sub for Expr<G> {
    type Output = Expr<G>;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(self, rhs: Expr<G>) -> Self::Output {
        self + rhs.neg()
    }
}

/// An expression normalized to `constant + Σ weight·unknown·base`.
struct Flat<G: PrimeGroup> {
    constant: G,
    terms: Vec<(String, G, G::Scalar)>,
}

impl<G: PrimeGroup> Flat<G> {
    fn scale(mut self, k: G::Scalar) -> Self {
        self.constant *= k;
        for (_, _, weight) in self.terms.iter_mut() {
            *weight *= k;
        }
        self
    }
}

/// The result of compiling an [`EquationSystem`].
#[derive(Clone, Debug)]
pub struct CompiledEquations<G: PrimeGroup> {
    pub relation: CanonicalLinearRelation<G>,
    /// Unknown names, in the order of the witness vector.
    pub unknowns: Vec<String>,
}

/// A conjunction of equations sharing a namespace of unknowns.
#[derive(Clone, Debug)]
pub struct EquationSystem<G: PrimeGroup> {
    equations: Vec<(Expr<G>, Expr<G>)>,
}

impl<G: PrimeGroup> Default for EquationSystem<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: PrimeGroup> EquationSystem<G> {
    pub fn new() -> Self {
        Self {
            equations: Vec::new(),
        }
    }

    /// Add the equation `lhs == rhs`.
    pub fn equation(&mut self, lhs: Expr<G>, rhs: Expr<G>) -> &mut Self {
        self.equations.push((lhs, rhs));
        self
    }

    /// Names of all unknowns, in first-seen order.
    pub fn unknowns(&self) -> Vec<String> {
        let mut names = Vec::new();
        for (lhs, rhs) in &self.equations {
            lhs.collect_unknowns(&mut names);
            rhs.collect_unknowns(&mut names);
        }
        names
    }

    /// Order the values of `assignment` as the witness vector of the compiled relation.
    pub fn witness_from_map(
        &self,
        assignment: &BTreeMap<String, G::Scalar>,
    ) -> Result<Vec<G::Scalar>, Error> {
        self.unknowns()
            .into_iter()
            .map(|name| {
                assignment
                    .get(&name)
                    .copied()
                    .ok_or(Error::UnknownVariable(name))
            })
            .collect()
    }

    /// Compile into the canonical linear form.
    ///
    /// Each equation is rearranged as
    /// `lhs.constant - rhs.constant = Σ rhs.terms - Σ lhs.terms`.
    pub fn compile(&self) -> Result<CompiledEquations<G>, Error> {
        let unknowns = self.unknowns();
        Ok(CompiledEquations {
            relation: self.compile_over(&unknowns)?,
            unknowns,
        })
    }

    /// Compile with one scalar variable per entry of `unknowns`, in that order.
    ///
    /// Every unknown of the system must be listed; listed names the system does not
    /// use stay unconstrained.
    fn compile_over(&self, unknowns: &[String]) -> Result<CanonicalLinearRelation<G>, Error> {
        let mut relation = LinearRelation::<G>::new();
        let vars: BTreeMap<String, ScalarVar> = unknowns
            .iter()
            .map(|name| (name.clone(), relation.allocate_scalar()))
            .collect();

        for (lhs, rhs) in &self.equations {
            let lhs = lhs.flatten()?;
            let rhs = rhs.flatten()?;

            let mut terms = Vec::new();
            let signed = rhs
                .terms
                .into_iter()
                .chain(lhs.terms.into_iter().map(|(n, b, w)| (n, b, -w)));
            for (name, base, weight) in signed {
                let elem = relation.allocate_element();
                relation.set_element(elem, base);
                let scalar = *vars
                    .get(&name)
                    .ok_or_else(|| Error::UnknownVariable(name.to_string()))?;
                terms.push(Weighted {
                    term: scalar * elem,
                    weight,
                });
            }

            let image = relation.allocate_element();
            relation.set_element(image, lhs.constant - rhs.constant);
            let lc: LinearCombination<G> = Sum(terms);
            relation.append_equation(image, lc);
        }

        relation.canonical()
    }
}

/// The result of compiling a [`LinkedEquationSystem`].
#[derive(Clone, Debug)]
pub struct CompiledLinkedEquations<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> {
    pub relation: LinkedRelation<G, T>,
    /// Unknown names, in the order of the witness vector.
    pub unknowns: Vec<String>,
}

/// Equations over a source group `G` and a target group `T` with a common
/// scalar field, sharing one namespace of unknowns.
#[derive(Clone, Debug)]
pub struct LinkedEquationSystem<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> {
    source: EquationSystem<G>,
    target: EquationSystem<T>,
}

impl<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> Default for LinkedEquationSystem<G, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> LinkedEquationSystem<G, T> {
    pub fn new() -> Self {
        Self {
            source: EquationSystem::new(),
            target: EquationSystem::new(),
        }
    }

    /// Add `lhs == rhs` in the source group.
    pub fn source_equation(&mut self, lhs: Expr<G>, rhs: Expr<G>) -> &mut Self {
        self.source.equation(lhs, rhs);
        self
    }

    /// Add `lhs == rhs` in the target group.
    pub fn target_equation(&mut self, lhs: Expr<T>, rhs: Expr<T>) -> &mut Self {
        self.target.equation(lhs, rhs);
        self
    }

    /// Names of all unknowns, source equations first, in first-seen order.
    pub fn unknowns(&self) -> Vec<String> {
        let mut names = self.source.unknowns();
        for name in self.target.unknowns() {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Order the values of `assignment` as the witness vector of the compiled relation.
    pub fn witness_from_map(
        &self,
        assignment: &BTreeMap<String, G::Scalar>,
    ) -> Result<Vec<G::Scalar>, Error> {
        self.unknowns()
            .into_iter()
            .map(|name| {
                assignment
                    .get(&name)
                    .copied()
                    .ok_or(Error::UnknownVariable(name))
            })
            .collect()
    }

    /// Compile both halves over the shared unknowns.
    ///
    /// # Errors
    /// - [`Error::InvalidInstanceWitnessPair`] if either group has no non-trivial
    ///   equation, or an equation is not linear in the unknowns.
    pub fn compile(&self) -> Result<CompiledLinkedEquations<G, T>, Error> {
        let unknowns = self.unknowns();
        let relation = LinkedRelation::new(
            self.source.compile_over(&unknowns)?,
            self.target.compile_over(&unknowns)?,
        )?;
        Ok(CompiledLinkedEquations { relation, unknowns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::{RistrettoPoint, Scalar};
    use group::Group;

    /// `e(a, B) = a·B`, bilinear in both arguments.
    struct ScalingPairing;

    impl Pairing<RistrettoPoint> for ScalingPairing {
        type Left = Scalar;
        type Right = RistrettoPoint;

        fn pair(&self, left: &Scalar, right: &RistrettoPoint) -> RistrettoPoint {
            right * left
        }
    }

    #[test]
    fn shared_unknowns_get_one_variable() {
        let mut rng = rand::thread_rng();
        let (g, h) = (RistrettoPoint::random(&mut rng), RistrettoPoint::random(&mut rng));
        let x = Scalar::from(5u64);

        let mut system = EquationSystem::new();
        system
            .equation(Expr::element(g * x), Expr::element(g).pow_unknown("x"))
            .equation(Expr::element(h * x), Expr::element(h).pow_unknown("x"));
        let compiled = system.compile().unwrap();

        assert_eq!(compiled.unknowns, ["x"]);
        assert_eq!(compiled.relation.num_scalars, 1);
        assert_eq!(compiled.relation.num_equations(), 2);
        assert!(compiled.relation.is_satisfied_by(&[x]));
        assert!(!compiled.relation.is_satisfied_by(&[x + Scalar::ONE]));
    }

    #[test]
    fn constants_move_to_the_image() {
        let mut rng = rand::thread_rng();
        let (g, h) = (RistrettoPoint::random(&mut rng), RistrettoPoint::random(&mut rng));
        let (a, r) = (Scalar::from(42u64), Scalar::from(9u64));
        let commitment = g * a + h * r;

        // C - g·a == h·r
        let mut system = EquationSystem::new();
        system.equation(
            Expr::element(commitment) - Expr::element(g).pow(a),
            Expr::element(h).pow_unknown("r"),
        );
        let compiled = system.compile().unwrap();
        assert_eq!(compiled.relation.image, vec![h * r]);
        assert!(compiled.relation.is_satisfied_by(&[r]));
    }

    #[test]
    fn unknowns_on_both_sides() {
        let mut rng = rand::thread_rng();
        let g = RistrettoPoint::random(&mut rng);
        let (x, y) = (Scalar::from(3u64), Scalar::from(10u64));

        // g·x + g·7 == g·y  with y = x + 7
        let mut system = EquationSystem::new();
        system.equation(
            Expr::element(g).pow_unknown("x") + Expr::element(g).pow(Scalar::from(7u64)),
            Expr::element(g).pow_unknown("y"),
        );
        let compiled = system.compile().unwrap();
        assert_eq!(compiled.unknowns, ["x", "y"]);
        assert!(compiled.relation.is_satisfied_by(&[x, y]));
    }

    #[test]
    fn pairing_with_unknown_exponent() {
        let mut rng = rand::thread_rng();
        let b = RistrettoPoint::random(&mut rng);
        let a = Scalar::from(17u64);
        let x = Scalar::from(23u64);
        let engine = ScalingPairing;

        // e(a·x, B) == e(a, B)^x
        let target = engine.pair(&(a * x), &b);
        let mut system = EquationSystem::new();
        system.equation(
            Expr::element(target),
            Expr::pairing(&engine, &a, &b).pow_unknown("x"),
        );
        let compiled = system.compile().unwrap();
        assert!(compiled.relation.is_satisfied_by(&[x]));
    }

    /// `e(a, B) = a·B` with `B` in G2, standing in for a pairing into the target group.
    struct G2ScalingPairing;

    impl Pairing<bls12_381::G2Projective> for G2ScalingPairing {
        type Left = bls12_381::Scalar;
        type Right = bls12_381::G2Projective;

        fn pair(&self, left: &Self::Left, right: &Self::Right) -> bls12_381::G2Projective {
            right * left
        }
    }

    #[test]
    fn commitment_linked_to_pairing_equation() {
        use bls12_381::{G1Projective, G2Projective, Scalar as Fr};

        use crate::fiat_shamir::{FiatShamirContext, Nizk};
        use crate::session::run_interactive;
        use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};

        let mut rng = rand::thread_rng();
        let (g, h) = (G1Projective::random(&mut rng), G1Projective::random(&mut rng));
        let b = G2Projective::random(&mut rng);
        let a = Fr::from(17u64);
        let (m, r) = (Fr::from(34u64), Fr::random(&mut rng));
        let engine = G2ScalingPairing;

        // C == g·m + h·r  and  e(a·m, B) == e(a, B)^m
        let linked = |signed: Fr| {
            let mut system = LinkedEquationSystem::<G1Projective, G2Projective>::new();
            system
                .source_equation(
                    Expr::element(g * m + h * r),
                    Expr::element(g).pow_unknown("m") + Expr::element(h).pow_unknown("r"),
                )
                .target_equation(
                    Expr::element(engine.pair(&(a * signed), &b)),
                    Expr::pairing(&engine, &a, &b).pow_unknown("m"),
                );
            system
        };

        let system = linked(m);
        let compiled = system.compile().unwrap();
        assert_eq!(compiled.unknowns, ["m", "r"]);
        assert_eq!(compiled.relation.num_scalars(), 2);
        let witness = system
            .witness_from_map(&BTreeMap::from([("m".to_string(), m), ("r".to_string(), r)]))
            .unwrap();
        assert!(compiled.relation.is_witness_valid(&witness));
        assert!(run_interactive(&compiled.relation, witness.clone(), &mut rng).is_ok());
        assert!(compiled
            .relation
            .simulate_transcript(&mut rng)
            .and_then(|t| compiled.relation.verifier(&t.announcement, &t.challenge, &t.response))
            .is_ok());

        let nizk: Nizk<_> = Nizk::new(b"linked", compiled.relation);
        let context = FiatShamirContext::default();
        let proof = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
        assert!(nizk.verify_batchable(&proof, &context).is_ok());

        // the pairing equation is on another value than the commitment opens to
        let mismatched = linked(m + Fr::ONE).compile().unwrap().relation;
        assert!(!mismatched.is_witness_valid(&vec![m, r]));
        assert!(!mismatched.is_witness_valid(&vec![m + Fr::ONE, r]));
    }

    #[test]
    fn linked_system_needs_both_groups() {
        use bls12_381::{G1Projective, G2Projective};

        let g = G1Projective::generator();
        let mut system = LinkedEquationSystem::<G1Projective, G2Projective>::new();
        system.source_equation(Expr::element(g), Expr::element(g).pow_unknown("x"));
        assert!(system.compile().is_err());
    }

    #[test]
    fn non_linear_exponent_is_rejected() {
        let g = RistrettoPoint::generator();
        let mut system = EquationSystem::new();
        system.equation(
            Expr::element(g),
            Expr::element(g).pow_unknown("x").pow_unknown("y"),
        );
        assert!(matches!(
            system.compile(),
            Err(Error::InvalidInstanceWitnessPair)
        ));
    }

    #[test]
    fn missing_witness_value() {
        let g = RistrettoPoint::generator();
        let mut system = EquationSystem::new();
        system.equation(
            Expr::element(g),
            Expr::element(g).pow_unknown("x") + Expr::element(g).pow_unknown("y"),
        );
        let assignment = BTreeMap::from([("x".to_string(), Scalar::ONE)]);
        match system.witness_from_map(&assignment) {
            Err(Error::UnknownVariable(name)) => assert_eq!(name, "y"),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
