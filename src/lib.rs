//! # sigma-policy-proofs
//!
//! Zero-knowledge proofs of *partial* knowledge for anonymous credentials.
//!
//! Atomic statements are Schnorr-family relations: preimages of linear maps over a
//! prime-order group ([`linear_relation`], [`schnorr_protocol`]) and openings of
//! attribute commitments with selective disclosure ([`credential`]). A
//! [`policy::PolicyTree`] combines them with threshold gates, and
//! [`composition::PartialKnowledge`] proves the whole policy as one Sigma protocol,
//! hiding which leaves the prover actually satisfies.
//!
//! Interactive protocols are made non-interactive with the Fiat-Shamir transform
//! ([`fiat_shamir::Nizk`]) or hardened for concurrent interactive use with Damgård's
//! transform ([`damgard::Damgard`]).
//!
//! ```
//! # use curve25519_dalek::{RistrettoPoint, Scalar};
//! # use ff::Field;
//! # use group::Group;
//! use sigma_policy_proofs::composition::PartialKnowledge;
//! use sigma_policy_proofs::fiat_shamir::{FiatShamirContext, Nizk};
//! use sigma_policy_proofs::policy::PolicyTree;
//! use sigma_policy_proofs::predicates::{discrete_log, pedersen_opening};
//! use sigma_policy_proofs::witness::WitnessTable;
//!
//! let mut rng = rand::thread_rng();
//! let (g, h) = (RistrettoPoint::random(&mut rng), RistrettoPoint::random(&mut rng));
//! let (sk, x, r) = (Scalar::random(&mut rng), Scalar::from(42u64), Scalar::random(&mut rng));
//!
//! // key AND (commitment opening OR unknown key)
//! let policy = PolicyTree::and(vec![
//!     PolicyTree::leaf("key", discrete_log(g, g * sk).unwrap()),
//!     PolicyTree::or(vec![
//!         PolicyTree::leaf("opening", pedersen_opening(g, h, g * x + h * r).unwrap()),
//!         PolicyTree::leaf("other", discrete_log(g, RistrettoPoint::random(&mut rng)).unwrap()),
//!     ])
//!     .unwrap(),
//! ])
//! .unwrap();
//! let witness = WitnessTable::new()
//!     .with("key", vec![sk])
//!     .unwrap()
//!     .with("opening", vec![x, r])
//!     .unwrap();
//!
//! let nizk: Nizk<_> = Nizk::new(b"example session", PartialKnowledge::new(policy));
//! let context = FiatShamirContext::new(b"verifier", b"hello");
//! let proof = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
//! assert!(nizk.verify_batchable(&proof, &context).is_ok());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(non_snake_case)]
#![deny(unused_variables)]
#![deny(unused_mut)]

extern crate alloc;

pub mod composition;
pub mod credential;
pub mod damgard;
pub mod duplex_sponge;
pub mod errors;
pub mod fiat_shamir;
pub mod group;
pub mod linear_relation;
pub mod policy;
pub mod predicates;
pub mod representation;
pub mod schnorr_protocol;
pub mod session;
pub mod sharing;
pub mod traits;
pub mod witness;

#[cfg(test)]
pub mod tests;

pub use composition::PartialKnowledge;
pub use errors::Error;
pub use fiat_shamir::{FiatShamirContext, Nizk};
pub use linear_relation::{CanonicalLinearRelation, LinearRelation};
pub use policy::{LeafProtocol, PolicyDescription, PolicyTree};
pub use representation::Representation;
pub use traits::{SigmaProtocol, SigmaProtocolSimulator, Transcript};
pub use witness::WitnessTable;
