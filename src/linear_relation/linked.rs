//! Two canonical relations, over different groups, on one witness.
//!
//! A [`LinkedRelation`] proves knowledge of a single scalar vector `w` with
//! `source(w) = X` in `G` and `target(w) = Y` in `T`. The prover draws one nonce
//! vector for both halves and sends one response vector, so an unknown shared by the
//! two halves is provably the same value.

use alloc::format;
use alloc::vec::Vec;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};
use tracing::instrument;

use super::CanonicalLinearRelation;
use crate::errors::{Error, InvalidInstance};
use crate::group::serialization::{deserialize_scalars, serialize_scalars, write_len};
use crate::representation::Representation;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};

#[derive(Clone, Debug)]
pub struct LinkedRelation<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> {
    source: CanonicalLinearRelation<G>,
    target: CanonicalLinearRelation<T>,
}

impl<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> LinkedRelation<G, T> {
    /// # Errors
    /// - [`InvalidInstance`] if the halves disagree on the number of unknowns.
    pub fn new(
        source: CanonicalLinearRelation<G>,
        target: CanonicalLinearRelation<T>,
    ) -> Result<Self, InvalidInstance> {
        if source.num_scalars != target.num_scalars {
            return Err(InvalidInstance::new(format!(
                "linked relations over {} and {} unknowns",
                source.num_scalars, target.num_scalars
            )));
        }
        Ok(Self { source, target })
    }

    pub fn source(&self) -> &CanonicalLinearRelation<G> {
        &self.source
    }

    pub fn target(&self) -> &CanonicalLinearRelation<T> {
        &self.target
    }

    pub fn num_scalars(&self) -> usize {
        self.source.num_scalars
    }

    fn check_response(&self, response: &[G::Scalar]) -> Result<(), Error> {
        if response.len() != self.num_scalars() {
            return Err(Error::MalformedProof(format!(
                "expected {} response scalars, found {}",
                self.num_scalars(),
                response.len()
            )));
        }
        Ok(())
    }
}

impl<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> SigmaProtocol for LinkedRelation<G, T> {
    type Announcement = (Vec<G>, Vec<T>);
    type ProverState = (Vec<G::Scalar>, Vec<G::Scalar>);
    type Response = Vec<G::Scalar>;
    type Witness = Vec<G::Scalar>;
    type Challenge = G::Scalar;

    #[instrument(skip_all)]
    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        if witness.len() != self.num_scalars() {
            return Err(Error::InvalidInstanceWitnessPair);
        }
        let nonces = (0..self.num_scalars())
            .map(|_| G::Scalar::random(&mut *rng))
            .collect::<Vec<_>>();
        let announcement = (self.source.evaluate(&nonces)?, self.target.evaluate(&nonces)?);
        Ok((announcement, (nonces, witness.clone())))
    }

    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        self.source.prover_response(state, challenge)
    }

    #[instrument(skip_all)]
    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        self.check_response(response)?;
        self.source.verifier(&announcement.0, challenge, response)?;
        self.target.verifier(&announcement.1, challenge, response)
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        self.source.is_satisfied_by(witness) && self.target.is_satisfied_by(witness)
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        G::Scalar::random(rng)
    }

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8> {
        let mut out = self.source.serialize_announcement(&announcement.0);
        out.extend(self.target.serialize_announcement(&announcement.1));
        out
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        serialize_scalars(&[*challenge])
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        serialize_scalars(response)
    }

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        let source = self.source.deserialize_announcement(data)?;
        let target = self.target.deserialize_announcement(data)?;
        Ok((source, target))
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        let scalars = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid challenge encoding".into()))?;
        Ok(scalars[0])
    }

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        deserialize_scalars::<G::Scalar>(data, self.num_scalars())
            .ok_or_else(|| Error::MalformedProof("invalid response encoding".into()))
    }

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation {
        Representation::map([
            ("source", Representation::elements(&announcement.0)),
            ("target", Representation::elements(&announcement.1)),
        ])
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        Representation::scalars(response)
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        Ok((
            repr.get("source")?.to_elements(self.source.num_equations())?,
            repr.get("target")?.to_elements(self.target.num_equations())?,
        ))
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        repr.to_scalars(self.num_scalars())
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        b"sigma-policy-proofs/linked-schnorr-v1"
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        let mut out = Vec::new();
        for label in [self.source.label(), self.target.label()] {
            write_len(&mut out, label.len());
            out.extend(label);
        }
        out
    }
}

impl<G: PrimeGroup, T: PrimeGroup<Scalar = G::Scalar>> SigmaProtocolSimulator
    for LinkedRelation<G, T>
{
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        self.source.simulate_response(rng)
    }

    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        self.check_response(response)?;
        Ok((
            self.source.simulate_announcement(challenge, response)?,
            self.target.simulate_announcement(challenge, response)?,
        ))
    }
}
