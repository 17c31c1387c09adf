use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::iter;

use ff::Field;
use group::prime::PrimeGroup;

use super::{GroupMap, GroupVar, LinearCombination, LinearRelation, ScalarVar};
use crate::errors::{Error, InvalidInstance};
use crate::group::msm::msm;

/// A normalized form of the [`LinearRelation`], which is used for serialization into the transcript.
///
/// This struct represents a normalized form of a linear relation where each
/// constraint is of the form: image_i = Σ (scalar_j * group_element_k)
/// without weights.
#[derive(Clone, Debug, Default)]
pub struct CanonicalLinearRelation<G: PrimeGroup> {
    /// The image group elements (left-hand side of equations)
    pub image: Vec<G>,
    /// The constraints, where each constraint is a vector of (scalar_var, group_var) pairs
    /// representing the right-hand side of the equation
    pub linear_combinations: Vec<Vec<(ScalarVar, GroupVar)>>,
    /// The group elements map
    pub group_elements: GroupMap<G>,
    /// Number of scalar variables
    pub num_scalars: usize,
}

type WeightedGroupCache<G> = BTreeMap<GroupVar, Vec<(<G as group::Group>::Scalar, GroupVar)>>;

impl<G: PrimeGroup> CanonicalLinearRelation<G> {
    /// Create a new empty canonical linear relation
    pub fn new() -> Self {
        Self {
            image: Vec::new(),
            linear_combinations: Vec::new(),
            group_elements: GroupMap::default(),
            num_scalars: 0,
        }
    }

    /// Number of equations in the relation.
    pub fn num_equations(&self) -> usize {
        self.image.len()
    }

    /// Evaluate the right-hand side of every equation on the given scalars.
    pub fn evaluate(&self, scalars: &[G::Scalar]) -> Result<Vec<G>, Error> {
        if scalars.len() != self.num_scalars {
            return Err(Error::InvalidInstanceWitnessPair);
        }
        self.linear_combinations
            .iter()
            .map(|lc| {
                let coefficients = lc.iter().map(|(s, _)| scalars[s.0]).collect::<Vec<_>>();
                let elements = lc
                    .iter()
                    .map(|(_, g)| self.group_elements.get(*g))
                    .collect::<Result<Vec<_>, Error>>()?;
                Ok(msm(&coefficients, &elements))
            })
            .collect()
    }

    /// Returns `true` iff `scalars` is a preimage of the image.
    pub fn is_satisfied_by(&self, scalars: &[G::Scalar]) -> bool {
        self.evaluate(scalars)
            .is_ok_and(|values| values == self.image)
    }

    /// Get or create a GroupVar for a weighted group element, with deduplication
    fn get_or_create_weighted_group_var(
        &mut self,
        group_var: GroupVar,
        weight: &G::Scalar,
        original_group_elements: &GroupMap<G>,
        weighted_group_cache: &mut WeightedGroupCache<G>,
    ) -> Result<GroupVar, Error> {
        let entry = weighted_group_cache.entry(group_var).or_default();

        if let Some((_, existing_var)) = entry.iter().find(|(w, _)| w == weight) {
            return Ok(*existing_var);
        }

        let original_group_val = original_group_elements.get(group_var)?;
        let new_var = self.group_elements.push(original_group_val * weight);
        entry.push((*weight, new_var));

        Ok(new_var)
    }

    /// Process a single constraint equation and add it to the canonical relation
    fn process_constraint(
        &mut self,
        image: G,
        equation: &LinearCombination<G>,
        original_relation: &LinearRelation<G>,
        weighted_group_cache: &mut WeightedGroupCache<G>,
    ) -> Result<(), Error> {
        let mut rhs_terms = Vec::new();

        for weighted_term in equation.terms() {
            if weighted_term.weight.is_zero().into() {
                continue;
            }
            let canonical_group_var = self.get_or_create_weighted_group_var(
                weighted_term.term.elem,
                &weighted_term.weight,
                &original_relation.linear_map.group_elements,
                weighted_group_cache,
            )?;
            rhs_terms.push((weighted_term.term.scalar, canonical_group_var));
        }

        self.image.push(image);
        self.linear_combinations.push(rhs_terms);
        Ok(())
    }

    /// Serialize the linear relation to bytes.
    ///
    /// The output format is:
    /// - [Ne: u32] number of equations
    /// - Ne × equations:
    ///   - [lhs_index: u32] output group element index
    ///   - [Nt: u32] number of terms
    ///   - Nt × [scalar_index: u32, group_index: u32] term entries
    /// - Followed by all group elements in serialized form
    pub fn label(&self) -> Vec<u8> {
        let mut out = Vec::new();

        let mut group_repr_mapping: BTreeMap<Vec<u8>, u32> = BTreeMap::new();
        let mut group_elements_ordered = Vec::new();

        let mut repr_index = |elem_repr: G::Repr| -> u32 {
            if let Some(&index) = group_repr_mapping.get(elem_repr.as_ref()) {
                return index;
            }
            let new_index = group_elements_ordered.len() as u32;
            group_repr_mapping.insert(elem_repr.as_ref().to_vec(), new_index);
            group_elements_ordered.push(elem_repr);
            new_index
        };

        let mut constraint_data = Vec::new();
        for (image_elem, constraint_terms) in iter::zip(&self.image, &self.linear_combinations) {
            let lhs_index = repr_index(image_elem.to_bytes());
            let mut rhs_terms = Vec::new();
            for (scalar_var, group_var) in constraint_terms {
                // Every group var of a canonical relation is assigned at construction.
                let group_elem = self.group_elements.get(*group_var).unwrap_or_else(|_| G::identity());
                let group_index = repr_index(group_elem.to_bytes());
                rhs_terms.push((scalar_var.0 as u32, group_index));
            }
            constraint_data.push((lhs_index, rhs_terms));
        }

        out.extend_from_slice(&(constraint_data.len() as u32).to_le_bytes());
        for (lhs_index, rhs_terms) in constraint_data {
            out.extend_from_slice(&lhs_index.to_le_bytes());
            out.extend_from_slice(&(rhs_terms.len() as u32).to_le_bytes());
            for (scalar_index, group_index) in rhs_terms {
                out.extend_from_slice(&scalar_index.to_le_bytes());
                out.extend_from_slice(&group_index.to_le_bytes());
            }
        }

        for elem_repr in group_elements_ordered {
            out.extend_from_slice(elem_repr.as_ref());
        }

        out
    }
}

impl<G: PrimeGroup> TryFrom<&LinearRelation<G>> for CanonicalLinearRelation<G> {
    type Error = InvalidInstance;

    fn try_from(relation: &LinearRelation<G>) -> Result<Self, Self::Error> {
        if relation.image.len() != relation.linear_map.linear_combinations.len() {
            return Err(InvalidInstance::new(
                "Equations and image elements must match",
            ));
        }

        let image = relation
            .image()
            .map_err(|_| InvalidInstance::new("Unassigned group variable in image"))?;

        let mut canonical = CanonicalLinearRelation::new();
        canonical.num_scalars = relation.linear_map.num_scalars;
        let mut weighted_group_cache = BTreeMap::new();

        for (lhs, rhs) in iter::zip(image, &relation.linear_map.linear_combinations) {
            // An equation with no witness-dependent terms must already hold.
            if rhs.terms().iter().all(|w| bool::from(w.weight.is_zero())) {
                if lhs != G::identity() {
                    return Err(InvalidInstance::new(
                        "Trivial linear combination does not match image",
                    ));
                }
                continue;
            }

            if lhs == G::identity() {
                return Err(InvalidInstance::new("Image contains identity element"));
            }

            canonical
                .process_constraint(lhs, rhs, relation, &mut weighted_group_cache)
                .map_err(|_| InvalidInstance::new("Unassigned group variable in linear combination"))?;
        }

        if canonical.linear_combinations.is_empty() {
            return Err(InvalidInstance::new("Relation has no non-trivial equation"));
        }

        Ok(canonical)
    }
}
