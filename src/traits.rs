//! Generic interface for 3-message Sigma protocols.
//!
//! This module defines the [`SigmaProtocol`] and [`SigmaProtocolSimulator`] traits,
//! used to describe interactive zero-knowledge proofs of knowledge,
//! such as Schnorr proofs, that follow the 3-message Sigma protocol structure.

use alloc::vec::Vec;
use core::fmt;

use rand_core::{CryptoRng, RngCore};

use crate::errors::Error;
use crate::representation::Representation;

/// A trait defining the behavior of a generic Sigma protocol.
///
/// A Sigma protocol is a 3-message proof protocol where a prover can convince
/// a verifier of knowledge of a witness for a given public statement
/// without revealing the witness.
///
/// ## Associated Types
/// - `Announcement`: The prover's first message.
/// - `ProverState`: The prover's internal state needed to compute a response.
/// - `Response`: The prover's response to a verifier's challenge.
/// - `Witness`: The prover's secret knowledge.
/// - `Challenge`: The verifier's challenge value.
///
/// ## Minimal Implementation
/// Types implementing [`SigmaProtocol`] must define:
/// - `prover_announce`: generates an announcement and internal state.
/// - `prover_response`: computes a response to a challenge.
/// - `verifier`: verifies a full transcript `(announcement, challenge, response)`.
///
/// ## Serialization
/// Each message has a compact binary form (`serialize_*` / `deserialize_*`, the
/// latter consuming bytes from the front of a cursor) and a structured
/// [`Representation`] (`*_to_repr` / `recreate_*`). Messages are always
/// recreated by the protocol that produced them.
///
/// ## Identification
/// To allow transcript hash binding and protocol distinction,
/// implementors must provide:
/// - `protocol_identifier`: a fixed byte identifier of the protocol.
/// - `instance_label`: a label specific to the instance being proven.
pub trait SigmaProtocol {
    type Announcement: Clone + PartialEq + fmt::Debug;
    type ProverState;
    type Response: Clone + PartialEq + fmt::Debug;
    type Witness;
    type Challenge: Clone + PartialEq + fmt::Debug;

    /// First step of the protocol. Given the witness and RNG, this generates:
    /// - A public announcement to send to the verifier.
    /// - The internal state to use when computing the response.
    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error>;

    /// Computes the prover's response to a challenge based on the prover state.
    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error>;

    /// Final step of the protocol: checks that the announcement, challenge, and response
    /// form a valid transcript.
    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error>;

    /// Returns `true` iff the witness satisfies the relation.
    fn is_witness_valid(&self, witness: &Self::Witness) -> bool;

    /// Like [`Self::is_witness_valid`], but reports why a witness is rejected.
    ///
    /// # Errors
    /// - [`Error::InvalidInstanceWitnessPair`] by default.
    fn check_witness(&self, witness: &Self::Witness) -> Result<(), Error> {
        if self.is_witness_valid(witness) {
            Ok(())
        } else {
            Err(Error::InvalidInstanceWitnessPair)
        }
    }

    /// Draws a uniformly random challenge.
    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge;

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8>;

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8>;

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8>;

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error>;

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error>;

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error>;

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation;

    fn response_to_repr(&self, response: &Self::Response) -> Representation;

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error>;

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error>;

    fn protocol_identifier(&self) -> impl AsRef<[u8]>;

    fn instance_label(&self) -> impl AsRef<[u8]>;
}

/// A full protocol transcript `(announcement, challenge, response)`.
pub struct Transcript<P: SigmaProtocol + ?Sized> {
    pub announcement: P::Announcement,
    pub challenge: P::Challenge,
    pub response: P::Response,
}

impl<P: SigmaProtocol + ?Sized> Clone for Transcript<P> {
    fn clone(&self) -> Self {
        Self {
            announcement: self.announcement.clone(),
            challenge: self.challenge.clone(),
            response: self.response.clone(),
        }
    }
}

impl<P: SigmaProtocol + ?Sized> PartialEq for Transcript<P> {
    fn eq(&self, other: &Self) -> bool {
        self.announcement == other.announcement
            && self.challenge == other.challenge
            && self.response == other.response
    }
}

impl<P: SigmaProtocol + ?Sized> fmt::Debug for Transcript<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transcript")
            .field("announcement", &self.announcement)
            .field("challenge", &self.challenge)
            .field("response", &self.response)
            .finish()
    }
}

/// A trait defining the behavior of a Sigma protocol for which simulation of transcripts is necessary.
///
/// Besides proving zero-knowledge, simulation is used during genuine proof generation
/// by compositions: branches the prover cannot satisfy are simulated under a challenge
/// share fixed in advance.
///
/// ## Minimal Implementation
/// Types implementing [`SigmaProtocolSimulator`] must define:
/// - `simulate_response`
/// - `simulate_announcement`
pub trait SigmaProtocolSimulator: SigmaProtocol {
    /// Generates a uniformly random response.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response;

    /// Solves the verification equation backwards: returns the unique announcement for which
    /// `(announcement, challenge, response)` is a valid transcript.
    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error>;

    /// Simulates an accepting transcript for a challenge chosen by the caller.
    fn simulate(
        &self,
        challenge: &Self::Challenge,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Transcript<Self>, Error> {
        let response = self.simulate_response(rng);
        let announcement = self.simulate_announcement(challenge, &response)?;
        Ok(Transcript {
            announcement,
            challenge: challenge.clone(),
            response,
        })
    }

    /// Generates a full simulated transcript with a random challenge,
    /// without requiring knowledge of a witness.
    fn simulate_transcript(
        &self,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Transcript<Self>, Error> {
        let challenge = self.sample_challenge(rng);
        self.simulate(&challenge, rng)
    }
}
