//! Policy trees.
//!
//! A [`PolicyTree`] is a tree of threshold gates over named atomic statements
//! ([`LeafProtocol`]). A threshold node `t`-of-`n` is satisfied when at least `t`
//! children are; AND is `n`-of-`n`, OR is `1`-of-`n`. Trees are validated on
//! construction: thresholds are in `1..=n`, nodes have children and leaf names are
//! unique. A credential leaf may disclose attributes only if every gate above it is
//! `n`-of-`n`: under any other gate it may be simulated, and a simulated leaf cannot
//! produce the values a real one would disclose.
//!
//! Leaves are numbered in pre-order; this numbering fixes the order of leaf
//! messages in the composed protocol.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::credential::{
    Credential, CredentialAnnouncement, CredentialProverState, CredentialResponse,
    CredentialStatement,
};
use crate::errors::Error;
use crate::group::serialization::deserialize_scalars;
use crate::linear_relation::CanonicalLinearRelation;
use crate::representation::Representation;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};

/// An atomic statement at a leaf of a policy tree.
#[derive(Clone, Debug)]
pub enum LeafProtocol<G: PrimeGroup> {
    /// Knowledge of a preimage of a linear map.
    Linear(CanonicalLinearRelation<G>),
    /// Knowledge of a credential opening, with selective disclosure.
    Credential(CredentialStatement<G>),
}

impl<G: PrimeGroup> LeafProtocol<G> {
    /// Whether the leaf reveals attribute values in its messages.
    pub fn discloses(&self) -> bool {
        match self {
            LeafProtocol::Linear(_) => false,
            LeafProtocol::Credential(statement) => !statement.disclosed_indices().is_empty(),
        }
    }
}

impl<G: PrimeGroup> From<CanonicalLinearRelation<G>> for LeafProtocol<G> {
    fn from(relation: CanonicalLinearRelation<G>) -> Self {
        LeafProtocol::Linear(relation)
    }
}

impl<G: PrimeGroup> From<CredentialStatement<G>> for LeafProtocol<G> {
    fn from(statement: CredentialStatement<G>) -> Self {
        LeafProtocol::Credential(statement)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafAnnouncement<G: PrimeGroup> {
    Linear(Vec<G>),
    Credential(CredentialAnnouncement<G>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafResponse<G: PrimeGroup> {
    Linear(Vec<G::Scalar>),
    Credential(CredentialResponse<G>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeafWitness<G: PrimeGroup> {
    Linear(Vec<G::Scalar>),
    Credential(Credential<G>),
}

impl<G: PrimeGroup> From<Vec<G::Scalar>> for LeafWitness<G> {
    fn from(scalars: Vec<G::Scalar>) -> Self {
        LeafWitness::Linear(scalars)
    }
}

impl<G: PrimeGroup> From<Credential<G>> for LeafWitness<G> {
    fn from(credential: Credential<G>) -> Self {
        LeafWitness::Credential(credential)
    }
}

pub enum LeafProverState<G: PrimeGroup> {
    Linear((Vec<G::Scalar>, Vec<G::Scalar>)),
    Credential(CredentialProverState<G>),
}

fn shape_mismatch() -> Error {
    Error::MalformedProof("message does not match the leaf kind".into())
}

impl<G: PrimeGroup> SigmaProtocol for LeafProtocol<G> {
    type Announcement = LeafAnnouncement<G>;
    type ProverState = LeafProverState<G>;
    type Response = LeafResponse<G>;
    type Witness = LeafWitness<G>;
    type Challenge = G::Scalar;

    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        match (self, witness) {
            (LeafProtocol::Linear(p), LeafWitness::Linear(w)) => {
                let (a, s) = p.prover_announce(w, rng)?;
                Ok((LeafAnnouncement::Linear(a), LeafProverState::Linear(s)))
            }
            (LeafProtocol::Credential(p), LeafWitness::Credential(w)) => {
                let (a, s) = p.prover_announce(w, rng)?;
                Ok((LeafAnnouncement::Credential(a), LeafProverState::Credential(s)))
            }
            _ => Err(Error::InvalidInstanceWitnessPair),
        }
    }

    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        match (self, state) {
            (LeafProtocol::Linear(p), LeafProverState::Linear(s)) => {
                p.prover_response(s, challenge).map(LeafResponse::Linear)
            }
            (LeafProtocol::Credential(p), LeafProverState::Credential(s)) => {
                p.prover_response(s, challenge).map(LeafResponse::Credential)
            }
            _ => Err(Error::ProtocolState("prover state of another leaf kind".into())),
        }
    }

    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        match (self, announcement, response) {
            (LeafProtocol::Linear(p), LeafAnnouncement::Linear(a), LeafResponse::Linear(z)) => {
                p.verifier(a, challenge, z)
            }
            (
                LeafProtocol::Credential(p),
                LeafAnnouncement::Credential(a),
                LeafResponse::Credential(z),
            ) => p.verifier(a, challenge, z),
            _ => Err(shape_mismatch()),
        }
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        match (self, witness) {
            (LeafProtocol::Linear(p), LeafWitness::Linear(w)) => p.is_witness_valid(w),
            (LeafProtocol::Credential(p), LeafWitness::Credential(w)) => p.is_witness_valid(w),
            _ => false,
        }
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        G::Scalar::random(rng)
    }

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8> {
        match (self, announcement) {
            (LeafProtocol::Linear(p), LeafAnnouncement::Linear(a)) => p.serialize_announcement(a),
            (LeafProtocol::Credential(p), LeafAnnouncement::Credential(a)) => {
                p.serialize_announcement(a)
            }
            // Messages are only ever built by their own leaf.
            _ => Vec::new(),
        }
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        crate::group::serialization::serialize_scalars(&[*challenge])
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        match (self, response) {
            (LeafProtocol::Linear(p), LeafResponse::Linear(z)) => p.serialize_response(z),
            (LeafProtocol::Credential(p), LeafResponse::Credential(z)) => p.serialize_response(z),
            _ => Vec::new(),
        }
    }

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        match self {
            LeafProtocol::Linear(p) => p.deserialize_announcement(data).map(LeafAnnouncement::Linear),
            LeafProtocol::Credential(p) => p
                .deserialize_announcement(data)
                .map(LeafAnnouncement::Credential),
        }
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        let scalars = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid challenge encoding".into()))?;
        Ok(scalars[0])
    }

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        match self {
            LeafProtocol::Linear(p) => p.deserialize_response(data).map(LeafResponse::Linear),
            LeafProtocol::Credential(p) => {
                p.deserialize_response(data).map(LeafResponse::Credential)
            }
        }
    }

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation {
        match (self, announcement) {
            (LeafProtocol::Linear(p), LeafAnnouncement::Linear(a)) => p.announcement_to_repr(a),
            (LeafProtocol::Credential(p), LeafAnnouncement::Credential(a)) => {
                p.announcement_to_repr(a)
            }
            _ => Representation::List(Vec::new()),
        }
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        match (self, response) {
            (LeafProtocol::Linear(p), LeafResponse::Linear(z)) => p.response_to_repr(z),
            (LeafProtocol::Credential(p), LeafResponse::Credential(z)) => p.response_to_repr(z),
            _ => Representation::List(Vec::new()),
        }
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        match self {
            LeafProtocol::Linear(p) => p.recreate_announcement(repr).map(LeafAnnouncement::Linear),
            LeafProtocol::Credential(p) => p
                .recreate_announcement(repr)
                .map(LeafAnnouncement::Credential),
        }
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        match self {
            LeafProtocol::Linear(p) => p.recreate_response(repr).map(LeafResponse::Linear),
            LeafProtocol::Credential(p) => p.recreate_response(repr).map(LeafResponse::Credential),
        }
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        match self {
            LeafProtocol::Linear(p) => p.protocol_identifier().as_ref().to_vec(),
            LeafProtocol::Credential(p) => p.protocol_identifier().as_ref().to_vec(),
        }
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        match self {
            LeafProtocol::Linear(p) => p.instance_label().as_ref().to_vec(),
            LeafProtocol::Credential(p) => p.instance_label().as_ref().to_vec(),
        }
    }
}

impl<G: PrimeGroup> SigmaProtocolSimulator for LeafProtocol<G> {
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        match self {
            LeafProtocol::Linear(p) => LeafResponse::Linear(p.simulate_response(rng)),
            LeafProtocol::Credential(p) => LeafResponse::Credential(p.simulate_response(rng)),
        }
    }

    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        match (self, response) {
            (LeafProtocol::Linear(p), LeafResponse::Linear(z)) => p
                .simulate_announcement(challenge, z)
                .map(LeafAnnouncement::Linear),
            (LeafProtocol::Credential(p), LeafResponse::Credential(z)) => p
                .simulate_announcement(challenge, z)
                .map(LeafAnnouncement::Credential),
            _ => Err(Error::SimulationPrecondition(
                "response does not match the leaf kind".into(),
            )),
        }
    }
}

/// A named leaf of a [`PolicyTree`].
#[derive(Clone, Debug)]
pub struct Leaf<G: PrimeGroup> {
    pub name: String,
    pub protocol: LeafProtocol<G>,
}

/// Index of a leaf in pre-order.
pub type LeafIndex = usize;

/// The shape of a policy tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyNode {
    Threshold {
        threshold: usize,
        children: Vec<PolicyNode>,
    },
    Leaf(LeafIndex),
}

impl PolicyNode {
    fn shift_leaves(&mut self, offset: usize) {
        match self {
            PolicyNode::Leaf(index) => *index += offset,
            PolicyNode::Threshold { children, .. } => {
                children.iter_mut().for_each(|c| c.shift_leaves(offset))
            }
        }
    }

    /// Number of threshold nodes in this subtree.
    pub fn num_threshold_nodes(&self) -> usize {
        match self {
            PolicyNode::Leaf(_) => 0,
            PolicyNode::Threshold { children, .. } => {
                1 + children.iter().map(PolicyNode::num_threshold_nodes).sum::<usize>()
            }
        }
    }
}

/// A validated threshold tree over named atomic statements.
#[derive(Clone, Debug)]
pub struct PolicyTree<G: PrimeGroup> {
    root: PolicyNode,
    leaves: Vec<Leaf<G>>,
}

impl<G: PrimeGroup> PolicyTree<G> {
    /// A tree consisting of a single leaf.
    pub fn leaf(name: impl Into<String>, protocol: impl Into<LeafProtocol<G>>) -> Self {
        Self {
            root: PolicyNode::Leaf(0),
            leaves: vec![Leaf {
                name: name.into(),
                protocol: protocol.into(),
            }],
        }
    }

    /// A `threshold`-of-`children.len()` gate.
    ///
    /// # Errors
    /// - [`Error::MalformedPolicy`] for an empty child list, a threshold outside
    ///   `1..=children.len()`, a leaf name used twice or, when `threshold` is below
    ///   `children.len()`, a credential leaf below it that discloses attributes.
    pub fn threshold(threshold: usize, children: Vec<PolicyTree<G>>) -> Result<Self, Error> {
        if children.is_empty() {
            return Err(Error::MalformedPolicy("threshold node without children".into()));
        }
        if threshold == 0 || threshold > children.len() {
            return Err(Error::MalformedPolicy(format!(
                "threshold {threshold} out of range for {} children",
                children.len()
            )));
        }

        let children_len = children.len();
        let mut names = BTreeSet::new();
        let mut leaves = Vec::new();
        let mut nodes = Vec::with_capacity(children.len());
        for child in children {
            let mut node = child.root;
            node.shift_leaves(leaves.len());
            for leaf in child.leaves {
                if !names.insert(leaf.name.clone()) {
                    return Err(Error::MalformedPolicy(format!(
                        "leaf name `{}` used twice",
                        leaf.name
                    )));
                }
                if threshold < children_len && leaf.protocol.discloses() {
                    return Err(Error::MalformedPolicy(format!(
                        "leaf `{}` discloses attributes under a {threshold}-of-{children_len} gate",
                        leaf.name
                    )));
                }
                leaves.push(leaf);
            }
            nodes.push(node);
        }

        Ok(Self {
            root: PolicyNode::Threshold {
                threshold,
                children: nodes,
            },
            leaves,
        })
    }

    /// All children must hold.
    pub fn and(children: Vec<PolicyTree<G>>) -> Result<Self, Error> {
        Self::threshold(children.len(), children)
    }

    /// At least one child must hold.
    pub fn or(children: Vec<PolicyTree<G>>) -> Result<Self, Error> {
        Self::threshold(1, children)
    }

    /// Builds a tree from a description, taking leaf statements from `statements` by name.
    ///
    /// Unknown node kinds and stray fields are already rejected when the description
    /// is deserialized.
    ///
    /// # Errors
    /// - [`Error::MalformedPolicy`] for bad thresholds or a leaf referenced twice.
    /// - [`Error::UnknownLeaf`] if a leaf name has no statement.
    pub fn from_description(
        description: &PolicyDescription,
        statements: &BTreeMap<String, LeafProtocol<G>>,
    ) -> Result<Self, Error> {
        match description {
            PolicyDescription::Leaf { name } => {
                let protocol = statements
                    .get(name)
                    .ok_or_else(|| Error::UnknownLeaf(name.clone()))?;
                Ok(Self::leaf(name.clone(), protocol.clone()))
            }
            PolicyDescription::Threshold {
                threshold,
                children,
            } => {
                let children = children
                    .iter()
                    .map(|child| Self::from_description(child, statements))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::threshold(*threshold, children)
            }
        }
    }

    /// The description of this tree's shape.
    pub fn description(&self) -> PolicyDescription {
        fn describe<G: PrimeGroup>(node: &PolicyNode, leaves: &[Leaf<G>]) -> PolicyDescription {
            match node {
                PolicyNode::Leaf(index) => PolicyDescription::leaf(leaves[*index].name.clone()),
                PolicyNode::Threshold {
                    threshold,
                    children,
                } => PolicyDescription::threshold(
                    *threshold,
                    children.iter().map(|c| describe(c, leaves)).collect(),
                ),
            }
        }
        describe(&self.root, &self.leaves)
    }

    pub fn root(&self) -> &PolicyNode {
        &self.root
    }

    pub fn leaves(&self) -> &[Leaf<G>] {
        &self.leaves
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.len()
    }

    pub fn leaf_index(&self, name: &str) -> Option<LeafIndex> {
        self.leaves.iter().position(|leaf| leaf.name == name)
    }

    /// Canonical encoding of the tree: its shape, leaf names, protocol identifiers and
    /// instance labels, in pre-order.
    pub fn label(&self) -> Vec<u8> {
        use crate::group::serialization::write_len;

        fn encode<G: PrimeGroup>(node: &PolicyNode, leaves: &[Leaf<G>], out: &mut Vec<u8>) {
            match node {
                PolicyNode::Threshold {
                    threshold,
                    children,
                } => {
                    out.push(0);
                    write_len(out, *threshold);
                    write_len(out, children.len());
                    for child in children {
                        encode(child, leaves, out);
                    }
                }
                PolicyNode::Leaf(index) => {
                    let leaf = &leaves[*index];
                    out.push(1);
                    for field in [
                        leaf.name.as_bytes().to_vec(),
                        leaf.protocol.protocol_identifier().as_ref().to_vec(),
                        leaf.protocol.instance_label().as_ref().to_vec(),
                    ] {
                        write_len(out, field.len());
                        out.extend_from_slice(&field);
                    }
                }
            }
        }

        let mut out = Vec::new();
        encode(&self.root, &self.leaves, &mut out);
        out
    }
}

/// A serializable description of a policy tree's shape.
///
/// ```json
/// { "kind": "threshold", "threshold": 1, "children": [
///     { "kind": "leaf", "name": "alice" },
///     { "kind": "leaf", "name": "bob" } ] }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum PolicyDescription {
    Leaf {
        name: String,
    },
    Threshold {
        threshold: usize,
        children: Vec<PolicyDescription>,
    },
}

impl PolicyDescription {
    pub fn leaf(name: impl Into<String>) -> Self {
        PolicyDescription::Leaf { name: name.into() }
    }

    pub fn threshold(threshold: usize, children: Vec<PolicyDescription>) -> Self {
        PolicyDescription::Threshold {
            threshold,
            children,
        }
    }
}
