//! Witnesses of a policy tree, keyed by leaf name.
//!
//! A leaf without an entry is treated as unsatisfied; the composer simulates it.

use alloc::collections::BTreeMap;
use alloc::string::String;

use group::prime::PrimeGroup;

use crate::errors::Error;
use crate::policy::{LeafWitness, PolicyTree};
use crate::traits::SigmaProtocol;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WitnessTable<G: PrimeGroup> {
    entries: BTreeMap<String, LeafWitness<G>>,
}

impl<G: PrimeGroup> Default for WitnessTable<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: PrimeGroup> WitnessTable<G> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds the witness for leaf `name`.
    ///
    /// # Errors
    /// - [`Error::DuplicateWitness`] if `name` already has a witness.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        witness: impl Into<LeafWitness<G>>,
    ) -> Result<(), Error> {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(Error::DuplicateWitness(name));
        }
        self.entries.insert(name, witness.into());
        Ok(())
    }

    /// Builder-style [`Self::insert`].
    pub fn with(
        mut self,
        name: impl Into<String>,
        witness: impl Into<LeafWitness<G>>,
    ) -> Result<Self, Error> {
        self.insert(name, witness)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&LeafWitness<G>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks every entry against `tree`.
    ///
    /// # Errors
    /// - [`Error::UnknownLeaf`] if an entry names no leaf of the tree.
    /// - [`Error::InvalidInstanceWitnessPair`] if a witness does not satisfy its leaf.
    pub fn validate(&self, tree: &PolicyTree<G>) -> Result<(), Error> {
        for (name, witness) in &self.entries {
            let index = tree
                .leaf_index(name)
                .ok_or_else(|| Error::UnknownLeaf(name.clone()))?;
            if !tree.leaves()[index].protocol.is_witness_valid(witness) {
                return Err(Error::InvalidInstanceWitnessPair);
            }
        }
        Ok(())
    }
}
