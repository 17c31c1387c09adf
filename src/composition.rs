//! # Partial-knowledge composition
//!
//! [`PartialKnowledge`] turns a [`PolicyTree`] into a single Sigma protocol proving that
//! the prover can satisfy the policy, without revealing which leaves it actually knows
//! witnesses for (Cramer, Damgård and Schoenmakers, CRYPTO '94).
//!
//! ## Prover
//! 1. Leaves with a witness are satisfied; a threshold node is satisfied when at least
//!    `t` of its children are. An unsatisfiable root fails with
//!    [`Error::PolicyUnfulfillable`] before any message is produced.
//! 2. At every satisfied threshold node, exactly `t` satisfied children have their
//!    challenge *derived* later; every other child gets a uniformly random share now.
//!    Unsatisfied children are simulated under that share, surplus satisfied children
//!    are run honestly and later answer it.
//! 3. The announcement is one message per leaf, in leaf order.
//! 4. On the challenge `c`, shares propagate from the root: each node completes its
//!    sharing of the challenge it received (see [`crate::sharing`]).
//!
//! ## Response
//! Per threshold node in pre-order, the transmitted prefix of its share vector, and one
//! response per leaf.
//!
//! ## Verifier
//! Expands every share vector from the challenge received by the node, and checks each
//! leaf transcript under its own challenge.
//!
//! ## Example
//!
//! ```
//! # use curve25519_dalek::{RistrettoPoint, Scalar};
//! # use ff::Field;
//! # use group::Group;
//! use sigma_policy_proofs::composition::PartialKnowledge;
//! use sigma_policy_proofs::policy::PolicyTree;
//! use sigma_policy_proofs::predicates::discrete_log;
//! use sigma_policy_proofs::session::run_interactive;
//! use sigma_policy_proofs::witness::WitnessTable;
//!
//! let mut rng = rand::thread_rng();
//! let g = RistrettoPoint::generator();
//! let x = Scalar::random(&mut rng);
//! let alice = discrete_log(g, g * x).unwrap();
//! let bob = discrete_log(g, RistrettoPoint::random(&mut rng)).unwrap();
//!
//! let policy = PolicyTree::or(vec![
//!     PolicyTree::leaf("alice", alice),
//!     PolicyTree::leaf("bob", bob),
//! ])
//! .unwrap();
//! let protocol = PartialKnowledge::new(policy);
//! let witness = WitnessTable::new().with("alice", vec![x]).unwrap();
//! assert!(run_interactive(&protocol, witness, &mut rng).is_ok());
//! ```

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use crate::credential::VerifiedDisclosures;
use crate::duplex_sponge::DuplexSpongeInterface;
use crate::errors::Error;
use crate::fiat_shamir::{FiatShamirContext, Nizk};
use crate::group::serialization::{deserialize_scalars, serialize_scalars};
use crate::policy::{
    LeafAnnouncement, LeafProtocol, LeafProverState, LeafResponse, PolicyNode, PolicyTree,
};
use crate::representation::Representation;
use crate::sharing::{complete_shares, compress_shares, compressed_len, expand_shares};
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};
use crate::witness::WitnessTable;

/// A policy tree run as one Sigma protocol.
#[derive(Clone, Debug)]
pub struct PartialKnowledge<G: PrimeGroup> {
    tree: PolicyTree<G>,
}

/// Response of [`PartialKnowledge`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartialKnowledgeResponse<G: PrimeGroup> {
    /// Transmitted challenge shares, per threshold node in pre-order.
    pub shares: Vec<Vec<G::Scalar>>,
    /// One response per leaf.
    pub leaves: Vec<LeafResponse<G>>,
}

enum NodeShares<G: PrimeGroup> {
    /// Shares fixed at announce time; the rest is derived from the node's challenge.
    Derive(Vec<(usize, G::Scalar)>),
    /// The full share vector of a simulated subtree.
    Simulated(Vec<G::Scalar>),
}

enum LeafPlan<G: PrimeGroup> {
    Real(LeafProverState<G>),
    Simulated(LeafResponse<G>),
}

/// Prover state of [`PartialKnowledge`].
pub struct PartialKnowledgeState<G: PrimeGroup> {
    nodes: Vec<Option<NodeShares<G>>>,
    leaves: Vec<Option<LeafPlan<G>>>,
}

struct Planner<'a, G: PrimeGroup, R> {
    tree: &'a PolicyTree<G>,
    witness: &'a WitnessTable<G>,
    satisfied: Vec<bool>,
    rng: &'a mut R,
    announcements: Vec<Option<LeafAnnouncement<G>>>,
    state: PartialKnowledgeState<G>,
}

impl<G: PrimeGroup, R: RngCore + CryptoRng> Planner<'_, G, R> {
    fn reserve_node(&mut self) -> usize {
        self.state.nodes.push(None);
        self.state.nodes.len() - 1
    }

    fn is_satisfied(&self, node: &PolicyNode) -> bool {
        match node {
            PolicyNode::Leaf(index) => self.satisfied[*index],
            PolicyNode::Threshold {
                threshold,
                children,
            } => children.iter().filter(|c| self.is_satisfied(c)).count() >= *threshold,
        }
    }

    fn plan_real(&mut self, node: &PolicyNode) -> Result<(), Error> {
        match node {
            PolicyNode::Leaf(index) => {
                let leaf = &self.tree.leaves()[*index];
                let witness = self
                    .witness
                    .get(&leaf.name)
                    .ok_or(Error::PolicyUnfulfillable)?;
                let (announcement, state) = leaf.protocol.prover_announce(witness, &mut *self.rng)?;
                self.announcements[*index] = Some(announcement);
                self.state.leaves[*index] = Some(LeafPlan::Real(state));
            }
            PolicyNode::Threshold {
                threshold,
                children,
            } => {
                let id = self.reserve_node();
                let mut derived = 0;
                let mut fixed = Vec::with_capacity(children.len() - threshold);
                for (j, child) in children.iter().enumerate() {
                    let satisfied = self.is_satisfied(child);
                    if satisfied && derived < *threshold {
                        derived += 1;
                        self.plan_real(child)?;
                        continue;
                    }
                    let share = G::Scalar::random(&mut *self.rng);
                    fixed.push((j, share));
                    if satisfied {
                        self.plan_real(child)?;
                    } else {
                        self.simulate(child, share)?;
                    }
                }
                if derived < *threshold {
                    return Err(Error::PolicyUnfulfillable);
                }
                debug!(node = id, threshold, fixed = fixed.len(), "planned threshold node");
                self.state.nodes[id] = Some(NodeShares::Derive(fixed));
            }
        }
        Ok(())
    }

    fn simulate(&mut self, node: &PolicyNode, challenge: G::Scalar) -> Result<(), Error> {
        match node {
            PolicyNode::Leaf(index) => {
                let protocol = &self.tree.leaves()[*index].protocol;
                let transcript = protocol.simulate(&challenge, &mut *self.rng)?;
                self.announcements[*index] = Some(transcript.announcement);
                self.state.leaves[*index] = Some(LeafPlan::Simulated(transcript.response));
            }
            PolicyNode::Threshold {
                threshold,
                children,
            } => {
                let id = self.reserve_node();
                let compressed = (0..compressed_len(*threshold, children.len()))
                    .map(|_| G::Scalar::random(&mut *self.rng))
                    .collect::<Vec<_>>();
                let shares = expand_shares(challenge, *threshold, children.len(), &compressed)?;
                for (child, share) in children.iter().zip(&shares) {
                    self.simulate(child, *share)?;
                }
                self.state.nodes[id] = Some(NodeShares::Simulated(shares));
            }
        }
        Ok(())
    }
}

impl<G: PrimeGroup> PartialKnowledge<G> {
    pub fn new(tree: PolicyTree<G>) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &PolicyTree<G> {
        &self.tree
    }

    /// `(threshold, number of children)` of every threshold node, in pre-order.
    fn threshold_nodes(&self) -> Vec<(usize, usize)> {
        fn walk(node: &PolicyNode, out: &mut Vec<(usize, usize)>) {
            if let PolicyNode::Threshold {
                threshold,
                children,
            } = node
            {
                out.push((*threshold, children.len()));
                children.iter().for_each(|c| walk(c, out));
            }
        }
        let mut out = Vec::new();
        walk(self.tree.root(), &mut out);
        out
    }

    fn leaf_protocol(&self, index: usize) -> &LeafProtocol<G> {
        &self.tree.leaves()[index].protocol
    }

    fn check_arity(
        &self,
        announcement: Option<&[LeafAnnouncement<G>]>,
        response: &PartialKnowledgeResponse<G>,
    ) -> Result<(), Error> {
        let num_leaves = self.tree.num_leaves();
        if announcement.is_some_and(|a| a.len() != num_leaves) || response.leaves.len() != num_leaves
        {
            return Err(Error::MalformedProof(format!(
                "expected {num_leaves} leaf messages"
            )));
        }
        let num_nodes = self.tree.root().num_threshold_nodes();
        if response.shares.len() != num_nodes {
            return Err(Error::MalformedProof(format!(
                "expected {num_nodes} share vectors, found {}",
                response.shares.len()
            )));
        }
        Ok(())
    }

    /// The challenge of every leaf, expanded from the root challenge.
    fn leaf_challenges(
        &self,
        challenge: G::Scalar,
        shares: &[Vec<G::Scalar>],
    ) -> Result<Vec<G::Scalar>, Error> {
        fn expand<G: PrimeGroup>(
            node: &PolicyNode,
            challenge: G::Scalar,
            shares: &[Vec<G::Scalar>],
            next_node: &mut usize,
            out: &mut [G::Scalar],
        ) -> Result<(), Error> {
            match node {
                PolicyNode::Leaf(index) => out[*index] = challenge,
                PolicyNode::Threshold {
                    threshold,
                    children,
                } => {
                    let id = *next_node;
                    *next_node += 1;
                    let compressed = shares
                        .get(id)
                        .ok_or_else(|| Error::MalformedProof("missing share vector".into()))?;
                    let all = expand_shares(challenge, *threshold, children.len(), compressed)?;
                    for (child, share) in children.iter().zip(all) {
                        expand::<G>(child, share, shares, next_node, out)?;
                    }
                }
            }
            Ok(())
        }

        let mut out = vec![G::Scalar::ZERO; self.tree.num_leaves()];
        expand::<G>(self.tree.root(), challenge, shares, &mut 0, &mut out)?;
        Ok(out)
    }

    /// Verifies a transcript and returns the attributes disclosed by credential leaves
    /// the policy forces to hold.
    ///
    /// Only leaves whose ancestors are all `n`-of-`n` gates are read; [`PolicyTree`]
    /// rejects disclosing leaves anywhere else.
    #[instrument(skip_all)]
    pub fn verify_with_disclosures(
        &self,
        announcement: &[LeafAnnouncement<G>],
        challenge: &G::Scalar,
        response: &PartialKnowledgeResponse<G>,
    ) -> Result<VerifiedDisclosures<G>, Error> {
        self.verifier(&announcement.to_vec(), challenge, response)?;
        Ok(self.disclosures(announcement))
    }

    pub(crate) fn disclosures(&self, announcement: &[LeafAnnouncement<G>]) -> VerifiedDisclosures<G> {
        fn collect<G: PrimeGroup>(
            node: &PolicyNode,
            tree: &PolicyTree<G>,
            announcement: &[LeafAnnouncement<G>],
            out: &mut VerifiedDisclosures<G>,
        ) {
            match node {
                PolicyNode::Leaf(index) => {
                    let leaf = &tree.leaves()[*index];
                    if let (LeafProtocol::Credential(statement), Some(LeafAnnouncement::Credential(a))) =
                        (&leaf.protocol, announcement.get(*index))
                    {
                        out.record(&leaf.name, statement, a);
                    }
                }
                PolicyNode::Threshold {
                    threshold,
                    children,
                } if *threshold == children.len() => {
                    children
                        .iter()
                        .for_each(|c| collect(c, tree, announcement, out));
                }
                PolicyNode::Threshold { .. } => {}
            }
        }

        let mut out = VerifiedDisclosures::default();
        collect(self.tree.root(), &self.tree, announcement, &mut out);
        out
    }
}

impl<G: PrimeGroup> SigmaProtocol for PartialKnowledge<G> {
    type Announcement = Vec<LeafAnnouncement<G>>;
    type ProverState = PartialKnowledgeState<G>;
    type Response = PartialKnowledgeResponse<G>;
    type Witness = WitnessTable<G>;
    type Challenge = G::Scalar;

    #[instrument(skip_all, fields(leaves = self.tree.num_leaves()))]
    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        witness.validate(&self.tree)?;
        let satisfied = self
            .tree
            .leaves()
            .iter()
            .map(|leaf| witness.get(&leaf.name).is_some())
            .collect::<Vec<_>>();
        let num_leaves = self.tree.num_leaves();

        let mut planner = Planner {
            tree: &self.tree,
            witness,
            satisfied,
            rng,
            announcements: (0..num_leaves).map(|_| None).collect(),
            state: PartialKnowledgeState {
                nodes: Vec::new(),
                leaves: (0..num_leaves).map(|_| None).collect(),
            },
        };
        if !planner.is_satisfied(self.tree.root()) {
            return Err(Error::PolicyUnfulfillable);
        }
        debug!(
            satisfied = planner.satisfied.iter().filter(|s| **s).count(),
            "policy satisfiable"
        );
        planner.plan_real(self.tree.root())?;

        let announcement = planner
            .announcements
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::ProtocolState("leaf left without announcement".into()))?;
        Ok((announcement, planner.state))
    }

    #[instrument(skip_all)]
    fn prover_response(
        &self,
        mut state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        fn respond<G: PrimeGroup>(
            tree: &PolicyTree<G>,
            node: &PolicyNode,
            challenge: G::Scalar,
            state: &mut PartialKnowledgeState<G>,
            next_node: &mut usize,
            shares_out: &mut [Vec<G::Scalar>],
            leaves_out: &mut [Option<LeafResponse<G>>],
        ) -> Result<(), Error> {
            let missing = || Error::ProtocolState("prover state does not match the policy".into());
            match node {
                PolicyNode::Leaf(index) => {
                    let response = match state.leaves.get_mut(*index).and_then(Option::take) {
                        Some(LeafPlan::Real(s)) => {
                            tree.leaves()[*index].protocol.prover_response(s, &challenge)?
                        }
                        Some(LeafPlan::Simulated(response)) => response,
                        None => return Err(missing()),
                    };
                    leaves_out[*index] = Some(response);
                }
                PolicyNode::Threshold {
                    threshold,
                    children,
                } => {
                    let id = *next_node;
                    *next_node += 1;
                    let shares = match state.nodes.get_mut(id).and_then(Option::take) {
                        Some(NodeShares::Derive(fixed)) => {
                            complete_shares(challenge, *threshold, children.len(), &fixed)?
                        }
                        Some(NodeShares::Simulated(shares)) => shares,
                        None => return Err(missing()),
                    };
                    shares_out[id] = compress_shares(*threshold, &shares);
                    for (child, share) in children.iter().zip(shares) {
                        respond(tree, child, share, state, next_node, shares_out, leaves_out)?;
                    }
                }
            }
            Ok(())
        }

        let mut shares = vec![Vec::new(); state.nodes.len()];
        let mut leaves = (0..self.tree.num_leaves()).map(|_| None).collect::<Vec<_>>();
        respond(
            &self.tree,
            self.tree.root(),
            *challenge,
            &mut state,
            &mut 0,
            &mut shares,
            &mut leaves,
        )?;
        let leaves = leaves
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| Error::ProtocolState("leaf left without response".into()))?;
        Ok(PartialKnowledgeResponse { shares, leaves })
    }

    #[instrument(skip_all, fields(leaves = self.tree.num_leaves()))]
    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        self.check_arity(Some(announcement), response)?;
        let challenges = self.leaf_challenges(*challenge, &response.shares)?;
        for (index, ((a, c), z)) in announcement
            .iter()
            .zip(&challenges)
            .zip(&response.leaves)
            .enumerate()
        {
            self.leaf_protocol(index).verifier(a, c, z).inspect_err(|err| {
                debug!(leaf = index, %err, "leaf rejected");
            })?;
        }
        Ok(())
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        self.check_witness(witness).is_ok()
    }

    /// # Errors
    /// - [`Error::UnknownLeaf`] or [`Error::InvalidInstanceWitnessPair`] for a bad entry.
    /// - [`Error::PolicyUnfulfillable`] if the valid entries do not satisfy the root.
    fn check_witness(&self, witness: &Self::Witness) -> Result<(), Error> {
        witness.validate(&self.tree)?;
        fn satisfied<G: PrimeGroup>(
            node: &PolicyNode,
            tree: &PolicyTree<G>,
            witness: &WitnessTable<G>,
        ) -> bool {
            match node {
                PolicyNode::Leaf(index) => witness.get(&tree.leaves()[*index].name).is_some(),
                PolicyNode::Threshold {
                    threshold,
                    children,
                } => {
                    children
                        .iter()
                        .filter(|c| satisfied(c, tree, witness))
                        .count()
                        >= *threshold
                }
            }
        }
        if satisfied(self.tree.root(), &self.tree, witness) {
            Ok(())
        } else {
            Err(Error::PolicyUnfulfillable)
        }
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        G::Scalar::random(rng)
    }

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8> {
        let mut out = Vec::new();
        for (index, a) in announcement.iter().enumerate() {
            out.extend(self.leaf_protocol(index).serialize_announcement(a));
        }
        out
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        serialize_scalars(&[*challenge])
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        let mut out = Vec::new();
        for shares in &response.shares {
            out.extend(serialize_scalars(shares));
        }
        for (index, z) in response.leaves.iter().enumerate() {
            out.extend(self.leaf_protocol(index).serialize_response(z));
        }
        out
    }

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        (0..self.tree.num_leaves())
            .map(|index| self.leaf_protocol(index).deserialize_announcement(data))
            .collect()
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        let scalars = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid challenge encoding".into()))?;
        Ok(scalars[0])
    }

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        let shares = self
            .threshold_nodes()
            .into_iter()
            .map(|(t, n)| {
                deserialize_scalars::<G::Scalar>(data, compressed_len(t, n))
                    .ok_or_else(|| Error::MalformedProof("invalid challenge shares".into()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let leaves = (0..self.tree.num_leaves())
            .map(|index| self.leaf_protocol(index).deserialize_response(data))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PartialKnowledgeResponse { shares, leaves })
    }

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation {
        Representation::List(
            announcement
                .iter()
                .enumerate()
                .map(|(index, a)| self.leaf_protocol(index).announcement_to_repr(a))
                .collect(),
        )
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        Representation::map([
            (
                "shares",
                Representation::List(
                    response
                        .shares
                        .iter()
                        .map(|s| Representation::scalars::<G::Scalar>(s))
                        .collect(),
                ),
            ),
            (
                "leaves",
                Representation::List(
                    response
                        .leaves
                        .iter()
                        .enumerate()
                        .map(|(index, z)| self.leaf_protocol(index).response_to_repr(z))
                        .collect(),
                ),
            ),
        ])
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        repr.as_list_of_len(self.tree.num_leaves())?
            .iter()
            .enumerate()
            .map(|(index, item)| self.leaf_protocol(index).recreate_announcement(item))
            .collect()
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        let nodes = self.threshold_nodes();
        let shares = repr
            .get("shares")?
            .as_list_of_len(nodes.len())?
            .iter()
            .zip(nodes)
            .map(|(item, (t, n))| item.to_scalars::<G::Scalar>(compressed_len(t, n)))
            .collect::<Result<Vec<_>, _>>()?;
        let leaves = repr
            .get("leaves")?
            .as_list_of_len(self.tree.num_leaves())?
            .iter()
            .enumerate()
            .map(|(index, item)| self.leaf_protocol(index).recreate_response(item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PartialKnowledgeResponse { shares, leaves })
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        b"sigma-policy-proofs/partial-knowledge-v1"
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        self.tree.label()
    }
}

impl<G: PrimeGroup> SigmaProtocolSimulator for PartialKnowledge<G> {
    /// Uniform transmitted shares for every threshold node and a simulated response
    /// for every leaf.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        let shares = self
            .threshold_nodes()
            .into_iter()
            .map(|(t, n)| {
                (0..compressed_len(t, n))
                    .map(|_| G::Scalar::random(&mut *rng))
                    .collect()
            })
            .collect();
        let leaves = self
            .tree
            .leaves()
            .iter()
            .map(|leaf| leaf.protocol.simulate_response(&mut *rng))
            .collect();
        PartialKnowledgeResponse { shares, leaves }
    }

    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        self.check_arity(None, response)?;
        let challenges = self.leaf_challenges(*challenge, &response.shares)?;
        challenges
            .iter()
            .zip(&response.leaves)
            .enumerate()
            .map(|(index, (c, z))| self.leaf_protocol(index).simulate_announcement(c, z))
            .collect()
    }
}

impl<G, H> Nizk<PartialKnowledge<G>, H>
where
    G: PrimeGroup,
    H: DuplexSpongeInterface,
{
    /// Verifies a batchable proof and returns the attributes it discloses.
    pub fn verify_batchable_with_disclosures(
        &self,
        proof: &[u8],
        context: &FiatShamirContext,
    ) -> Result<VerifiedDisclosures<G>, Error> {
        let transcript = self.verify_batchable_transcript(proof, context)?;
        Ok(self.interactive_proof.disclosures(&transcript.announcement))
    }
}
