//! # Linear Relations Handling.
//!
//! This module provides the algebraic-relation compiler used by every Schnorr-style
//! protocol in the crate. Statements are systems of equations of the form
//!
//! ```text
//! image_i = Σ_j scalar_j * element_j
//! ```
//!
//! where the scalars are the unknowns (the witness) and the elements are public.
//!
//! It includes:
//! - [`LinearCombination`]: a sparse representation of scalar multiplication relations.
//! - [`LinearMap`]: a collection of linear combinations acting on group elements.
//! - [`LinearRelation`]: an allocation-based builder for statements.
//! - [`CanonicalLinearRelation`]: the normalized form proven by [`crate::schnorr_protocol`].
//! - [`expr`]: a declarative front end over named unknowns.
//! - [`LinkedRelation`]: a witness shared by relations over two groups.

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use core::iter;

use ff::Field;
use group::prime::PrimeGroup;
use group::Group;

use crate::errors::Error;
use crate::group::msm::msm;

mod canonical;
pub mod expr;
mod linked;
/// Implementations of core ops for the linear combination types.
mod ops;

pub use canonical::CanonicalLinearRelation;
pub use linked::LinkedRelation;

/// A wrapper representing an index for a scalar variable.
///
/// Used to reference scalars in sparse linear combinations.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ScalarVar(pub(crate) usize);

impl ScalarVar {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A wrapper representing an index for a group element (point).
///
/// Used to reference group elements in sparse linear combinations.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct GroupVar(pub(crate) usize);

impl GroupVar {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// A term in a linear combination, representing `scalar * elem`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Term {
    pub scalar: ScalarVar,
    pub elem: GroupVar,
}

impl From<(ScalarVar, GroupVar)> for Term {
    fn from((scalar, elem): (ScalarVar, GroupVar)) -> Self {
        Self { scalar, elem }
    }
}

/// A term multiplied by a public weight.
#[derive(Copy, Clone, Debug)]
pub struct Weighted<T, F> {
    pub term: T,
    pub weight: F,
}

impl<F: Field> From<Term> for Weighted<Term, F> {
    fn from(term: Term) -> Self {
        Self {
            term,
            weight: F::ONE,
        }
    }
}

impl<F: Field> From<(ScalarVar, GroupVar)> for Weighted<Term, F> {
    fn from(pair: (ScalarVar, GroupVar)) -> Self {
        Term::from(pair).into()
    }
}

/// A formal sum of terms.
#[derive(Clone, Debug)]
pub struct Sum<T>(pub(crate) Vec<T>);

impl<T> Sum<T> {
    /// Access the terms of the sum as slice reference.
    pub fn terms(&self) -> &[T] {
        &self.0
    }
}

impl<F: Field> From<Term> for Sum<Weighted<Term, F>> {
    fn from(term: Term) -> Self {
        Sum(vec![term.into()])
    }
}

impl<F: Field> From<Weighted<Term, F>> for Sum<Weighted<Term, F>> {
    fn from(term: Weighted<Term, F>) -> Self {
        Sum(vec![term])
    }
}

impl<F: Field> From<Sum<Term>> for Sum<Weighted<Term, F>> {
    fn from(sum: Sum<Term>) -> Self {
        Sum(sum.0.into_iter().map(Into::into).collect())
    }
}

impl<F: Field, const N: usize> From<[(ScalarVar, GroupVar); N]> for Sum<Weighted<Term, F>> {
    fn from(pairs: [(ScalarVar, GroupVar); N]) -> Self {
        Sum(pairs.into_iter().map(Into::into).collect())
    }
}

impl<F: Field> From<Vec<(ScalarVar, GroupVar)>> for Sum<Weighted<Term, F>> {
    fn from(pairs: Vec<(ScalarVar, GroupVar)>) -> Self {
        Sum(pairs.into_iter().map(Into::into).collect())
    }
}

/// Represents a sparse linear combination of scalars and group elements.
///
/// For example, it can represent an equation like:
/// `w_1 * s_1 * P_1 + w_2 * s_2 * P_2 + ... + w_n * s_n * P_n`
///
/// where `s_i` are scalar variables, `P_i` are group element variables and `w_i` public
/// weights. The indices refer to external lists managed by the containing [`LinearMap`].
pub type LinearCombination<G> = Sum<Weighted<Term, <G as Group>::Scalar>>;

/// Ordered mapping of [`GroupVar`] to group elements assignments.
#[derive(Clone, Debug)]
pub struct GroupMap<G>(Vec<Option<G>>);

impl<G> Default for GroupMap<G> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<G: PrimeGroup> GroupMap<G> {
    /// Assign a group element value to a point variable.
    ///
    /// # Panics
    ///
    /// Panics if the given assignment conflicts with the existing assignment.
    pub fn assign_element(&mut self, var: GroupVar, element: G) {
        if self.0.len() <= var.0 {
            self.0.resize(var.0 + 1, None);
        } else if let Some(assignment) = self.0[var.0] {
            assert_eq!(
                assignment, element,
                "conflicting assignments for var {var:?}"
            )
        }
        self.0[var.0] = Some(element);
    }

    /// Assigns specific group elements to point variables.
    pub fn assign_elements(&mut self, assignments: impl IntoIterator<Item = (GroupVar, G)>) {
        for (var, elem) in assignments.into_iter() {
            self.assign_element(var, elem);
        }
    }

    /// Appends a new element and returns its variable.
    pub fn push(&mut self, element: G) -> GroupVar {
        self.0.push(Some(element));
        GroupVar(self.0.len() - 1)
    }

    /// Get the element value assigned to the given point var.
    ///
    /// Returns [`Error::UnassignedGroupVar`] if a value is not assigned.
    pub fn get(&self, var: GroupVar) -> Result<G, Error> {
        self.0
            .get(var.0)
            .copied()
            .flatten()
            .ok_or_else(|| Error::UnassignedGroupVar {
                var_debug: format!("{var:?}"),
            })
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A LinearMap represents a list of linear combinations over group elements.
///
/// It supports dynamic allocation of scalars and elements,
/// and evaluates by performing multi-scalar multiplications.
#[derive(Clone, Default, Debug)]
pub struct LinearMap<G: PrimeGroup> {
    /// The set of linear combination constraints (equations).
    pub linear_combinations: Vec<LinearCombination<G>>,
    /// The list of group elements referenced by the constraints.
    ///
    /// Uninitialized group elements are presented with `None`.
    pub group_elements: GroupMap<G>,
    /// The total number of scalar variables allocated.
    pub num_scalars: usize,
    /// The total number of group element variables allocated.
    pub num_elements: usize,
}

impl<G: PrimeGroup> LinearMap<G> {
    pub fn new() -> Self {
        Self {
            linear_combinations: Vec::new(),
            group_elements: GroupMap::default(),
            num_scalars: 0,
            num_elements: 0,
        }
    }

    /// Returns the number of constraints (equations) in this linear map.
    pub fn num_constraints(&self) -> usize {
        self.linear_combinations.len()
    }

    /// Adds a new linear combination constraint to the map.
    pub fn append(&mut self, lc: LinearCombination<G>) {
        self.linear_combinations.push(lc);
    }

    fn evaluate_one(&self, lc: &LinearCombination<G>, scalars: &[G::Scalar]) -> Result<G, Error> {
        let coefficients = lc
            .terms()
            .iter()
            .map(|weighted| {
                scalars
                    .get(weighted.term.scalar.0)
                    .map(|s| *s * weighted.weight)
                    .ok_or(Error::InvalidInstanceWitnessPair)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        let elements = lc
            .terms()
            .iter()
            .map(|weighted| self.group_elements.get(weighted.term.elem))
            .collect::<Result<Vec<_>, Error>>()?;
        Ok(msm(&coefficients, &elements))
    }

    /// Evaluates all linear combinations with the provided scalars.
    ///
    /// # Returns
    ///
    /// One group element per linear combination.
    pub fn evaluate(&self, scalars: &[G::Scalar]) -> Result<Vec<G>, Error> {
        self.linear_combinations
            .iter()
            .map(|lc| self.evaluate_one(lc, scalars))
            .collect()
    }
}

/// A wrapper struct coupling a [`LinearMap`] with the corresponding expected output (image) elements.
///
/// This structure represents the *preimage problem* for a linear map: given a set of scalar
/// inputs, determine whether their image under the map matches a target set of group elements.
#[derive(Clone, Default, Debug)]
pub struct LinearRelation<G: PrimeGroup> {
    /// The underlying linear map describing the structure of the statement.
    pub linear_map: LinearMap<G>,
    /// Indices pointing to elements representing the "target" images for each constraint.
    pub image: Vec<GroupVar>,
}

impl<G: PrimeGroup> LinearRelation<G> {
    /// Create a new empty [`LinearRelation`].
    pub fn new() -> Self {
        Self {
            linear_map: LinearMap::new(),
            image: Vec::new(),
        }
    }

    /// Adds a new equation to the statement of the form:
    /// `lhs = Σ weight_i * (scalar_i * point_i)`.
    pub fn append_equation(&mut self, lhs: GroupVar, rhs: impl Into<LinearCombination<G>>) {
        self.linear_map.append(rhs.into());
        self.image.push(lhs);
    }

    /// Allocates a fresh image variable and constrains it to equal `rhs`.
    pub fn allocate_eq(&mut self, rhs: impl Into<LinearCombination<G>>) -> GroupVar {
        let var = self.allocate_element();
        self.append_equation(var, rhs);
        var
    }

    /// Allocates a scalar variable.
    pub fn allocate_scalar(&mut self) -> ScalarVar {
        self.linear_map.num_scalars += 1;
        ScalarVar(self.linear_map.num_scalars - 1)
    }

    /// Allocates `N` new scalar variables.
    pub fn allocate_scalars<const N: usize>(&mut self) -> [ScalarVar; N] {
        core::array::from_fn(|_| self.allocate_scalar())
    }

    /// Allocates a point variable (group element).
    pub fn allocate_element(&mut self) -> GroupVar {
        self.linear_map.num_elements += 1;
        GroupVar(self.linear_map.num_elements - 1)
    }

    /// Allocates `N` point variables.
    pub fn allocate_elements<const N: usize>(&mut self) -> [GroupVar; N] {
        core::array::from_fn(|_| self.allocate_element())
    }

    /// Assign a group element value to a point variable.
    ///
    /// # Panics
    ///
    /// Panics if the given assignment conflicts with the existing assignment.
    pub fn set_element(&mut self, var: GroupVar, element: G) {
        self.linear_map.group_elements.assign_element(var, element)
    }

    /// Assigns specific group elements to point variables.
    pub fn set_elements(&mut self, assignments: impl IntoIterator<Item = (GroupVar, G)>) {
        self.linear_map.group_elements.assign_elements(assignments)
    }

    /// Evaluates all linear combinations with the provided scalars and assigns the results
    /// to the image variables.
    ///
    /// Returns an error if unassigned elements prevent the image from being computed.
    pub fn compute_image(&mut self, scalars: &[G::Scalar]) -> Result<(), Error> {
        let images = self.linear_map.evaluate(scalars)?;
        for (lhs, value) in iter::zip(self.image.clone(), images) {
            self.linear_map.group_elements.assign_element(lhs, value);
        }
        Ok(())
    }

    /// Returns the current group elements corresponding to the image variables.
    pub fn image(&self) -> Result<Vec<G>, Error> {
        self.image
            .iter()
            .map(|&var| self.linear_map.group_elements.get(var))
            .collect()
    }

    /// Normalize this relation into a [`CanonicalLinearRelation`].
    pub fn canonical(&self) -> Result<CanonicalLinearRelation<G>, Error> {
        Ok(CanonicalLinearRelation::try_from(self)?)
    }
}
