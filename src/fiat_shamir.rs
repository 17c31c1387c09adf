//! Fiat-Shamir transformation for [`SigmaProtocol`]s.
//!
//! This module defines [`Nizk`], a generic non-interactive Sigma protocol wrapper,
//! based on applying the Fiat-Shamir heuristic using a duplex sponge.
//!
//! It transforms an interactive [`SigmaProtocol`] into a non-interactive one,
//! by deriving challenges deterministically from the protocol identifier, the
//! session identifier, the instance label, the [`FiatShamirContext`] and the
//! announcement.
//!
//! Two proof encodings are supported:
//! - *batchable*: `announcement ‖ response`;
//! - *compact*: `challenge ‖ response`, the verifier recomputes the announcement
//!   with the simulator and compares the re-derived challenge in constant time.
//!
//! # Usage
//! This struct is generic over:
//! - `P`: the underlying Sigma protocol ([`SigmaProtocol`] trait).
//! - `H`: the duplex sponge ([`DuplexSpongeInterface`]), Keccak by default.

use alloc::vec::Vec;
use core::marker::PhantomData;

use ff::PrimeField;
use num_bigint::BigUint;
use num_traits::identities::One;
use rand_core::{CryptoRng, RngCore};
use sha3::{Digest, Sha3_256};
use subtle::ConstantTimeEq;
use tracing::instrument;

use crate::duplex_sponge::keccak::KeccakDuplexSponge;
use crate::duplex_sponge::DuplexSpongeInterface;
use crate::errors::Error;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator, Transcript};

/// Public data bound into the challenge next to the statement.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FiatShamirContext {
    /// Identity of the intended verifier; prevents replaying a proof to another verifier.
    pub verifier_id: Vec<u8>,
    /// Application message; turns the proof into a signature on it.
    pub message: Vec<u8>,
}

impl FiatShamirContext {
    pub fn new(verifier_id: impl AsRef<[u8]>, message: impl AsRef<[u8]>) -> Self {
        Self {
            verifier_id: verifier_id.as_ref().to_vec(),
            message: message.as_ref().to_vec(),
        }
    }

    pub fn with_message(message: impl AsRef<[u8]>) -> Self {
        Self::new(b"", message)
    }
}

/// A Fiat-Shamir transformation of a [`SigmaProtocol`] into a non-interactive proof.
///
/// [`Nizk`] wraps an interactive Sigma protocol `P` and a duplex sponge `H`.
/// It manages the domain separation, proof generation, and proof verification.
#[derive(Debug)]
pub struct Nizk<P, H = KeccakDuplexSponge>
where
    P: SigmaProtocol,
    H: DuplexSpongeInterface,
{
    pub session_id: Vec<u8>,
    /// Underlying interactive proof.
    pub interactive_proof: P,
    _sponge: PhantomData<H>,
}

impl<P, H> Nizk<P, H>
where
    P: SigmaProtocol,
    P::Challenge: PrimeField,
    H: DuplexSpongeInterface,
{
    /// Constructs a new [`Nizk`] instance.
    ///
    /// # Parameters
    /// - `session_identifier`: Domain separation for this application or session.
    /// - `interactive_proof`: An instance of the interactive Sigma protocol.
    pub fn new(session_identifier: &[u8], interactive_proof: P) -> Self {
        Self {
            session_id: session_identifier.to_vec(),
            interactive_proof,
            _sponge: PhantomData,
        }
    }

    fn sponge(&self, context: &FiatShamirContext) -> H {
        let protocol_id = self.interactive_proof.protocol_identifier();
        let instance_label = self.interactive_proof.instance_label();
        let mut sponge = H::new(protocol_iv(protocol_id.as_ref()));
        absorb_len_prefixed(&mut sponge, &self.session_id);
        absorb_len_prefixed(&mut sponge, instance_label.as_ref());
        absorb_len_prefixed(&mut sponge, &context.verifier_id);
        absorb_len_prefixed(&mut sponge, &context.message);
        sponge
    }

    /// The challenge for `announcement` under `context`.
    pub fn challenge_for(
        &self,
        announcement: &P::Announcement,
        context: &FiatShamirContext,
    ) -> P::Challenge {
        let mut sponge = self.sponge(context);
        absorb_len_prefixed(
            &mut sponge,
            &self.interactive_proof.serialize_announcement(announcement),
        );
        derive_challenge(&mut sponge)
    }

    /// Runs the prover with the hash-derived challenge.
    #[instrument(skip_all, fields(session_id = ?self.session_id))]
    pub fn prove(
        &self,
        witness: &P::Witness,
        context: &FiatShamirContext,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Transcript<P>, Error> {
        let (announcement, state) = self.interactive_proof.prover_announce(witness, rng)?;
        let challenge = self.challenge_for(&announcement, context);
        let response = self.interactive_proof.prover_response(state, &challenge)?;
        Ok(Transcript {
            announcement,
            challenge,
            response,
        })
    }

    /// Verifies a transcript, recomputing its challenge.
    pub fn verify(&self, transcript: &Transcript<P>, context: &FiatShamirContext) -> Result<(), Error> {
        let expected = self.challenge_for(&transcript.announcement, context);
        if expected != transcript.challenge {
            return Err(Error::VerificationFailure);
        }
        self.interactive_proof.verifier(
            &transcript.announcement,
            &transcript.challenge,
            &transcript.response,
        )
    }

    /// Generates a batchable proof `announcement ‖ response`.
    pub fn prove_batchable(
        &self,
        witness: &P::Witness,
        context: &FiatShamirContext,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Vec<u8>, Error> {
        let transcript = self.prove(witness, context, rng)?;
        let mut proof = self
            .interactive_proof
            .serialize_announcement(&transcript.announcement);
        proof.extend(self.interactive_proof.serialize_response(&transcript.response));
        Ok(proof)
    }

    /// Verifies a batchable proof and returns the accepted transcript.
    ///
    /// # Errors
    /// - [`Error::MalformedProof`] if the proof cannot be decoded or has trailing bytes.
    /// - [`Error::VerificationFailure`] if the transcript is rejected.
    #[instrument(skip_all, fields(session_id = ?self.session_id, proof_len = proof.len()))]
    pub fn verify_batchable_transcript(
        &self,
        proof: &[u8],
        context: &FiatShamirContext,
    ) -> Result<Transcript<P>, Error> {
        let mut cursor = proof;
        let announcement = self.interactive_proof.deserialize_announcement(&mut cursor)?;
        let response = self.interactive_proof.deserialize_response(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::MalformedProof("trailing bytes after proof".into()));
        }
        let challenge = self.challenge_for(&announcement, context);
        self.interactive_proof
            .verifier(&announcement, &challenge, &response)?;
        Ok(Transcript {
            announcement,
            challenge,
            response,
        })
    }

    /// Verifies a batchable proof.
    pub fn verify_batchable(&self, proof: &[u8], context: &FiatShamirContext) -> Result<(), Error> {
        self.verify_batchable_transcript(proof, context).map(|_| ())
    }

    /// Signs `message`: a batchable proof bound to the message.
    pub fn sign(
        &self,
        witness: &P::Witness,
        message: &[u8],
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Vec<u8>, Error> {
        self.prove_batchable(witness, &FiatShamirContext::with_message(message), rng)
    }

    pub fn verify_signature(&self, signature: &[u8], message: &[u8]) -> Result<(), Error> {
        self.verify_batchable(signature, &FiatShamirContext::with_message(message))
    }
}

impl<P, H> Nizk<P, H>
where
    P: SigmaProtocolSimulator,
    P::Challenge: PrimeField,
    H: DuplexSpongeInterface,
{
    /// Generates a compact proof `challenge ‖ response`.
    pub fn prove_compact(
        &self,
        witness: &P::Witness,
        context: &FiatShamirContext,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Vec<u8>, Error> {
        let transcript = self.prove(witness, context, rng)?;
        let mut proof = self
            .interactive_proof
            .serialize_challenge(&transcript.challenge);
        proof.extend(self.interactive_proof.serialize_response(&transcript.response));
        Ok(proof)
    }

    /// Verifies a compact proof.
    ///
    /// Recomputes the announcement from the challenge and response, re-derives the
    /// challenge from it and compares both in constant time.
    #[instrument(skip_all, fields(session_id = ?self.session_id, proof_len = proof.len()))]
    pub fn verify_compact(&self, proof: &[u8], context: &FiatShamirContext) -> Result<(), Error> {
        let mut cursor = proof;
        let challenge = self.interactive_proof.deserialize_challenge(&mut cursor)?;
        let response = self.interactive_proof.deserialize_response(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::MalformedProof("trailing bytes after proof".into()));
        }

        let announcement = self
            .interactive_proof
            .simulate_announcement(&challenge, &response)?;
        let expected = self.challenge_for(&announcement, context);
        let matches = self
            .interactive_proof
            .serialize_challenge(&expected)
            .ct_eq(&self.interactive_proof.serialize_challenge(&challenge));
        if !bool::from(matches) {
            return Err(Error::VerificationFailure);
        }
        self.interactive_proof
            .verifier(&announcement, &challenge, &response)
    }
}

fn length_to_bytes(x: usize) -> [u8; 4] {
    (x as u32).to_be_bytes()
}

fn absorb_len_prefixed<H: DuplexSpongeInterface>(sponge: &mut H, data: &[u8]) {
    sponge.absorb(&length_to_bytes(data.len()));
    sponge.absorb(data);
}

/// Initialization vector of the sponge: SHA3-256 of the protocol identifier.
fn protocol_iv(protocol_id: &[u8]) -> [u8; 32] {
    let digest = Sha3_256::digest(protocol_id);
    let mut iv = [0u8; 32];
    iv.copy_from_slice(&digest);
    iv
}

fn field_cardinality<F: PrimeField>() -> BigUint {
    let bytes = (F::ZERO - F::ONE).to_repr();
    BigUint::from_bytes_le(bytes.as_ref()) + BigUint::one()
}

/// Squeezes a scalar with 128 bits of statistical slack and reduces it modulo the field order.
///
/// Assumes a little-endian `F::Repr`, as for the curves this crate is used with.
pub(crate) fn derive_challenge<F: PrimeField, H: DuplexSpongeInterface>(sponge: &mut H) -> F {
    let scalar_byte_length = (F::NUM_BITS as usize).div_ceil(8);
    let uniform_bytes = sponge.squeeze(scalar_byte_length + 16);
    let scalar = BigUint::from_bytes_be(&uniform_bytes);
    let reduced = scalar % field_cardinality::<F>();

    let mut bytes = alloc::vec![0u8; F::Repr::default().as_ref().len()];
    let reduced_bytes = reduced.to_bytes_le();
    bytes[..reduced_bytes.len()].copy_from_slice(&reduced_bytes);

    let mut repr = F::Repr::default();
    repr.as_mut().copy_from_slice(&bytes);
    F::from_repr(repr).expect("challenge reduction should not fail")
}

/// Hashes arbitrary bytes to a scalar under a domain separator.
pub(crate) fn hash_to_scalar<F: PrimeField>(domain: &[u8], data: &[u8]) -> F {
    let mut sponge = KeccakDuplexSponge::new(protocol_iv(domain));
    absorb_len_prefixed(&mut sponge, data);
    derive_challenge(&mut sponge)
}
