//! Implementation of the generic Schnorr Sigma Protocol over a [`group::Group`].
//!
//! [`CanonicalLinearRelation`] implements a Sigma protocol proving knowledge of a
//! preimage of a linear map (discrete logarithms, representations, Pedersen openings,
//! equality of discrete logarithms), see
//! [Maurer09](https://crypto-test.ethz.ch/publications/files/Maurer09.pdf).

use alloc::format;
use alloc::vec::Vec;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};
use tracing::instrument;

use crate::errors::Error;
use crate::group::serialization::{
    deserialize_elements, deserialize_scalars, serialize_elements, serialize_scalars,
};
use crate::linear_relation::CanonicalLinearRelation;
use crate::representation::Representation;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};

impl<G: PrimeGroup> SigmaProtocol for CanonicalLinearRelation<G> {
    type Announcement = Vec<G>;
    type ProverState = (Vec<G::Scalar>, Vec<G::Scalar>);
    type Response = Vec<G::Scalar>;
    type Witness = Vec<G::Scalar>;
    type Challenge = G::Scalar;

    /// Prover's first message: evaluates the relation on fresh random nonces.
    ///
    /// # Returns
    /// - The announcement (one group element per equation).
    /// - The prover state (nonces and witness) used to compute the response.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInstanceWitnessPair`] if the witness has the wrong length.
    #[instrument(skip(self, witness, rng))]
    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        if witness.len() != self.num_scalars {
            return Err(Error::InvalidInstanceWitnessPair);
        }

        let nonces = (0..self.num_scalars)
            .map(|_| G::Scalar::random(&mut *rng))
            .collect::<Vec<_>>();

        let announcement = self.evaluate(&nonces)?;
        Ok((announcement, (nonces, witness.clone())))
    }

    /// Computes `response_i = nonce_i + challenge * witness_i`.
    #[instrument(skip(self, prover_state, challenge))]
    fn prover_response(
        &self,
        prover_state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        let (nonces, witness) = prover_state;
        if nonces.len() != self.num_scalars || witness.len() != self.num_scalars {
            return Err(Error::InvalidInstanceWitnessPair);
        }

        let responses = nonces
            .into_iter()
            .zip(witness)
            .map(|(r, w)| r + w * challenge)
            .collect();
        Ok(responses)
    }

    /// Checks `evaluate(response) == challenge * image + announcement` for every equation.
    ///
    /// # Errors
    /// - [`Error::MalformedProof`] if the announcement or response has the wrong length.
    /// - [`Error::VerificationFailure`] if an equation does not hold.
    #[instrument(fields(self.image.len = self.image.len(), self.num_scalars = self.num_scalars), skip(self, announcement, challenge, response))]
    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        if announcement.len() != self.image.len() {
            return Err(Error::MalformedProof(format!(
                "expected {} announcement elements, found {}",
                self.image.len(),
                announcement.len()
            )));
        }
        if response.len() != self.num_scalars {
            return Err(Error::MalformedProof(format!(
                "expected {} response scalars, found {}",
                self.num_scalars,
                response.len()
            )));
        }

        let lhs = self.evaluate(response)?;
        let rhs = announcement
            .iter()
            .zip(&self.image)
            .map(|(a, img)| *img * challenge + a)
            .collect::<Vec<_>>();
        if lhs == rhs {
            Ok(())
        } else {
            Err(Error::VerificationFailure)
        }
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        self.is_satisfied_by(witness)
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        G::Scalar::random(rng)
    }

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8> {
        serialize_elements(announcement)
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        serialize_scalars(&[*challenge])
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        serialize_scalars(response)
    }

    /// Reads one group element per equation.
    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        deserialize_elements::<G>(data, self.image.len())
            .ok_or_else(|| Error::MalformedProof("invalid announcement encoding".into()))
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        let scalars = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid challenge encoding".into()))?;
        Ok(scalars[0])
    }

    /// Reads one scalar per witness variable.
    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        deserialize_scalars::<G::Scalar>(data, self.num_scalars)
            .ok_or_else(|| Error::MalformedProof("invalid response encoding".into()))
    }

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation {
        Representation::elements(announcement)
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        Representation::scalars(response)
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        repr.to_elements(self.image.len())
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        repr.to_scalars(self.num_scalars)
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        b"sigma-policy-proofs/schnorr-v1"
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        self.label()
    }
}

impl<G: PrimeGroup> SigmaProtocolSimulator for CanonicalLinearRelation<G> {
    /// Draws one uniform scalar per witness variable.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        (0..self.num_scalars)
            .map(|_| G::Scalar::random(&mut *rng))
            .collect()
    }

    /// Recomputes the announcement as `evaluate(response) - challenge * image`.
    ///
    /// # Errors
    /// - [`Error::MalformedProof`] if the response length does not match the number of scalars.
    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        if response.len() != self.num_scalars {
            return Err(Error::MalformedProof(format!(
                "expected {} response scalars, found {}",
                self.num_scalars,
                response.len()
            )));
        }

        let response_image = self.evaluate(response)?;
        let announcement = response_image
            .iter()
            .zip(&self.image)
            .map(|(res, img)| *res - *img * challenge)
            .collect::<Vec<_>>();
        Ok(announcement)
    }
}
