//! Damgård's transform for concurrent zero-knowledge.
//!
//! [`Damgard`] wraps a complete Sigma protocol so that the prover commits to its
//! announcement with a trapdoor (Pedersen) commitment
//! `C = H(announcement)·g + r·h`, receives the challenge, and only then reveals the
//! announcement, the opening `r` and the response
//! (Damgård, "Efficient Concurrent Zero-Knowledge in the Auxiliary String Model",
//! EUROCRYPT 2000).
//!
//! The wrapper is a [`SigmaProtocol`] of its own but not a policy leaf: it is applied
//! to a whole composed protocol, never inside one.

use alloc::format;
use alloc::vec::Vec;
use core::fmt;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use crate::errors::{Error, InvalidInstance};
use crate::fiat_shamir::hash_to_scalar;
use crate::group::serialization::{
    deserialize_elements, deserialize_scalars, serialize_elements, serialize_scalars,
};
use crate::representation::Representation;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator, Transcript};

const COMMITMENT_DOMAIN: &[u8] = b"sigma-policy-proofs/damgard-commitment";

/// Public generators `(g, h)` of the announcement commitment.
///
/// Nobody may know `log_g(h)`: it is the trapdoor of the commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentKey<G: PrimeGroup> {
    g: G,
    h: G,
}

impl<G: PrimeGroup> CommitmentKey<G> {
    pub fn new(g: G, h: G) -> Result<Self, InvalidInstance> {
        if bool::from(g.is_identity()) || bool::from(h.is_identity()) {
            return Err(InvalidInstance::new("commitment generators must not be the identity"));
        }
        if g == h {
            return Err(InvalidInstance::new("commitment generators must be distinct"));
        }
        Ok(Self { g, h })
    }

    pub fn random(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        Self {
            g: G::random(&mut *rng),
            h: G::random(&mut *rng),
        }
    }

    fn commit(&self, message: &[u8], opening: G::Scalar) -> G {
        self.g * hash_to_scalar::<G::Scalar>(COMMITMENT_DOMAIN, message) + self.h * opening
    }
}

/// A Sigma protocol whose announcement is hidden in a trapdoor commitment.
#[derive(Clone, Debug)]
pub struct Damgard<P, G: PrimeGroup> {
    inner: P,
    key: CommitmentKey<G>,
}

/// Second message of [`Damgard`]: the opened announcement and the inner response.
pub struct DamgardResponse<P: SigmaProtocol, G: PrimeGroup> {
    pub announcement: P::Announcement,
    pub opening: G::Scalar,
    pub response: P::Response,
}

impl<P: SigmaProtocol, G: PrimeGroup> Clone for DamgardResponse<P, G> {
    fn clone(&self) -> Self {
        Self {
            announcement: self.announcement.clone(),
            opening: self.opening,
            response: self.response.clone(),
        }
    }
}

impl<P: SigmaProtocol, G: PrimeGroup> PartialEq for DamgardResponse<P, G> {
    fn eq(&self, other: &Self) -> bool {
        self.announcement == other.announcement
            && self.opening == other.opening
            && self.response == other.response
    }
}

impl<P: SigmaProtocol, G: PrimeGroup> fmt::Debug for DamgardResponse<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DamgardResponse")
            .field("announcement", &self.announcement)
            .field("opening", &self.opening)
            .field("response", &self.response)
            .finish()
    }
}

impl<P, G> Damgard<P, G>
where
    P: SigmaProtocol<Challenge = G::Scalar>,
    G: PrimeGroup,
{
    pub fn new(inner: P, key: CommitmentKey<G>) -> Self {
        Self { inner, key }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn commitment(&self, announcement: &P::Announcement, opening: G::Scalar) -> G {
        self.key
            .commit(&self.inner.serialize_announcement(announcement), opening)
    }
}

impl<P, G> SigmaProtocol for Damgard<P, G>
where
    P: SigmaProtocol<Challenge = G::Scalar>,
    G: PrimeGroup,
{
    type Announcement = G;
    type ProverState = (P::Announcement, P::ProverState, G::Scalar);
    type Response = DamgardResponse<P, G>;
    type Witness = P::Witness;
    type Challenge = G::Scalar;

    #[instrument(skip_all)]
    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        let (announcement, state) = self.inner.prover_announce(witness, rng)?;
        let opening = G::Scalar::random(&mut *rng);
        let commitment = self.commitment(&announcement, opening);
        Ok((commitment, (announcement, state, opening)))
    }

    fn prover_response(
        &self,
        (announcement, state, opening): Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        let response = self.inner.prover_response(state, challenge)?;
        Ok(DamgardResponse {
            announcement,
            opening,
            response,
        })
    }

    #[instrument(skip_all)]
    fn verifier(
        &self,
        commitment: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        if self.commitment(&response.announcement, response.opening) != *commitment {
            debug!("announcement does not open the commitment");
            return Err(Error::VerificationFailure);
        }
        self.inner
            .verifier(&response.announcement, challenge, &response.response)
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        self.inner.is_witness_valid(witness)
    }

    fn check_witness(&self, witness: &Self::Witness) -> Result<(), Error> {
        self.inner.check_witness(witness)
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        self.inner.sample_challenge(rng)
    }

    fn serialize_announcement(&self, commitment: &Self::Announcement) -> Vec<u8> {
        serialize_elements([commitment])
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        self.inner.serialize_challenge(challenge)
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        let mut out = self.inner.serialize_announcement(&response.announcement);
        out.extend(serialize_scalars(&[response.opening]));
        out.extend(self.inner.serialize_response(&response.response));
        out
    }

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        let elements = deserialize_elements::<G>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid commitment encoding".into()))?;
        Ok(elements[0])
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        self.inner.deserialize_challenge(data)
    }

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        let announcement = self.inner.deserialize_announcement(data)?;
        let opening = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid commitment opening".into()))?[0];
        let response = self.inner.deserialize_response(data)?;
        Ok(DamgardResponse {
            announcement,
            opening,
            response,
        })
    }

    fn announcement_to_repr(&self, commitment: &Self::Announcement) -> Representation {
        Representation::element(commitment)
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        Representation::map([
            (
                "announcement",
                self.inner.announcement_to_repr(&response.announcement),
            ),
            ("opening", Representation::scalar(&response.opening)),
            ("response", self.inner.response_to_repr(&response.response)),
        ])
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        repr.to_element()
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        Ok(DamgardResponse {
            announcement: self.inner.recreate_announcement(repr.get("announcement")?)?,
            opening: repr.get("opening")?.to_scalar()?,
            response: self.inner.recreate_response(repr.get("response")?)?,
        })
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        let mut id = b"sigma-policy-proofs/damgard-v1/".to_vec();
        id.extend_from_slice(self.inner.protocol_identifier().as_ref());
        id
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        let mut label = serialize_elements([&self.key.g, &self.key.h]);
        label.extend_from_slice(self.inner.instance_label().as_ref());
        label
    }
}

impl<P, G> SigmaProtocolSimulator for Damgard<P, G>
where
    P: SigmaProtocolSimulator<Challenge = G::Scalar>,
    G: PrimeGroup,
{
    /// Opens a commitment to an inner transcript simulated under a random challenge.
    ///
    /// Only challenge-independent in distribution; use [`SigmaProtocolSimulator::simulate`]
    /// to fix the challenge.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        let challenge = self.inner.sample_challenge(&mut *rng);
        let response = self.inner.simulate_response(&mut *rng);
        let announcement = self
            .inner
            .simulate_announcement(&challenge, &response)
            .expect("a simulated response is accepted by its own simulator");
        DamgardResponse {
            announcement,
            opening: G::Scalar::random(&mut *rng),
            response,
        }
    }

    /// The commitment opened by `response`.
    ///
    /// # Errors
    /// - [`Error::SimulationPrecondition`] if the opened inner transcript does not
    ///   answer `challenge`.
    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        self.inner
            .verifier(&response.announcement, challenge, &response.response)
            .map_err(|err| {
                Error::SimulationPrecondition(format!(
                    "opened transcript does not answer the challenge: {err}"
                ))
            })?;
        Ok(self.commitment(&response.announcement, response.opening))
    }

    fn simulate(
        &self,
        challenge: &Self::Challenge,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Transcript<Self>, Error> {
        let inner = self.inner.simulate(challenge, &mut *rng)?;
        let opening = G::Scalar::random(&mut *rng);
        Ok(Transcript {
            announcement: self.commitment(&inner.announcement, opening),
            challenge: *challenge,
            response: DamgardResponse {
                announcement: inner.announcement,
                opening,
                response: inner.response,
            },
        })
    }
}
