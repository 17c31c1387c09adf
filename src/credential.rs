//! Selective disclosure of committed credential attributes.
//!
//! A [`Credential`] is a vector of attributes `m_1..m_L` together with a blinding `r`,
//! committed under an issuer's generators as
//!
//! ```text
//! C = r·h_0 + Σ m_i·h_i
//! ```
//!
//! A [`CredentialStatement`] proves knowledge of an opening of `C` while revealing the
//! attributes of a chosen index set. The revealed values travel inside the leaf's
//! announcement (and response), next to the issuer identifier, so that the Fiat-Shamir
//! challenge binds them. They are readable only through [`VerifiedDisclosures`],
//! which the composer hands out after the whole proof verified.
//!
//! A leaf that discloses is only accepted by [`crate::policy::PolicyTree`] below
//! `n`-of-`n` gates. Below an OR, disclose nothing and prove the attribute with a
//! predicate instead.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use ff::Field;
use group::prime::PrimeGroup;
use rand_core::{CryptoRng, RngCore};

use crate::errors::{Error, InvalidInstance};
use crate::group::msm::msm;
use crate::group::serialization::{
    deserialize_elements, deserialize_scalars, read_bytes, read_len, serialize_elements,
    serialize_scalars, write_len,
};
use crate::linear_relation::{CanonicalLinearRelation, LinearRelation};
use crate::representation::Representation;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};

/// Public key material of a credential issuer: an identifier and the generators
/// `h_0` (blinding) and `h_1..h_L` (one per attribute).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuerKey<G: PrimeGroup> {
    id: String,
    generators: Vec<G>,
}

impl<G: PrimeGroup> IssuerKey<G> {
    pub fn new(id: impl Into<String>, generators: Vec<G>) -> Result<Self, InvalidInstance> {
        if generators.len() < 2 {
            return Err(InvalidInstance::new(
                "issuer key needs a blinding generator and at least one attribute generator",
            ));
        }
        if generators.iter().any(|g| bool::from(g.is_identity())) {
            return Err(InvalidInstance::new("issuer generator is the identity"));
        }
        Ok(Self {
            id: id.into(),
            generators,
        })
    }

    /// Samples independent generators for `num_attributes` attributes.
    pub fn random(
        id: impl Into<String>,
        num_attributes: usize,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<Self, InvalidInstance> {
        let generators = (0..=num_attributes).map(|_| G::random(&mut *rng)).collect();
        Self::new(id, generators)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn num_attributes(&self) -> usize {
        self.generators.len() - 1
    }

    fn blinding_generator(&self) -> G {
        self.generators[0]
    }

    fn attribute_generator(&self, index: usize) -> G {
        self.generators[index + 1]
    }
}

/// An attribute vector with the blinding of its commitment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential<G: PrimeGroup> {
    pub attributes: Vec<G::Scalar>,
    pub blinding: G::Scalar,
}

impl<G: PrimeGroup> Credential<G> {
    /// Creates a credential with a fresh blinding and returns it with its commitment.
    pub fn issue(
        key: &IssuerKey<G>,
        attributes: Vec<G::Scalar>,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self, G), InvalidInstance> {
        if attributes.len() != key.num_attributes() {
            return Err(InvalidInstance::new(format!(
                "issuer `{}` certifies {} attributes, got {}",
                key.id,
                key.num_attributes(),
                attributes.len()
            )));
        }
        let credential = Self {
            attributes,
            blinding: G::Scalar::random(rng),
        };
        let commitment = credential.commit(key);
        Ok((credential, commitment))
    }

    /// `r·h_0 + Σ m_i·h_i`.
    pub fn commit(&self, key: &IssuerKey<G>) -> G {
        let mut scalars = Vec::with_capacity(self.attributes.len() + 1);
        scalars.push(self.blinding);
        scalars.extend_from_slice(&self.attributes);
        msm(&scalars, &key.generators)
    }
}

/// The statement "I know an opening of `commitment` under `issuer`, and the attributes
/// at `disclosed` have the values I announce".
#[derive(Clone, Debug)]
pub struct CredentialStatement<G: PrimeGroup> {
    issuer: IssuerKey<G>,
    commitment: G,
    disclosed: Vec<usize>,
    hidden: Vec<usize>,
}

impl<G: PrimeGroup> CredentialStatement<G> {
    pub fn new(
        issuer: IssuerKey<G>,
        commitment: G,
        disclosed: impl IntoIterator<Item = usize>,
    ) -> Result<Self, InvalidInstance> {
        let disclosed = disclosed.into_iter().collect::<BTreeSet<_>>();
        if disclosed.iter().any(|&i| i >= issuer.num_attributes()) {
            return Err(InvalidInstance::new("disclosed attribute index out of range"));
        }
        if bool::from(commitment.is_identity()) {
            return Err(InvalidInstance::new("credential commitment is the identity"));
        }
        let hidden = (0..issuer.num_attributes())
            .filter(|i| !disclosed.contains(i))
            .collect();
        Ok(Self {
            issuer,
            commitment,
            disclosed: disclosed.into_iter().collect(),
            hidden,
        })
    }

    pub fn issuer(&self) -> &IssuerKey<G> {
        &self.issuer
    }

    pub fn disclosed_indices(&self) -> &[usize] {
        &self.disclosed
    }

    /// Opening of `C - Σ_disclosed m_i·h_i` over `h_0` and the hidden generators.
    ///
    /// The witness order is `[r, m_hidden...]`.
    fn hidden_relation(&self, disclosed_values: &[G::Scalar]) -> Result<CanonicalLinearRelation<G>, Error> {
        let mut relation = LinearRelation::new();
        let revealed = disclosed_values
            .iter()
            .zip(&self.disclosed)
            .map(|(m, &i)| self.issuer.attribute_generator(i) * m)
            .sum::<G>();

        let r = relation.allocate_scalar();
        let h0 = relation.allocate_element();
        relation.set_element(h0, self.issuer.blinding_generator());
        let mut rhs = Vec::with_capacity(self.hidden.len() + 1);
        rhs.push((r, h0));
        for &i in &self.hidden {
            let m = relation.allocate_scalar();
            let h = relation.allocate_element();
            relation.set_element(h, self.issuer.attribute_generator(i));
            rhs.push((m, h));
        }
        let image = relation.allocate_element();
        relation.set_element(image, self.commitment - revealed);
        relation.append_equation(image, rhs);
        relation.canonical()
    }

    fn hidden_witness(&self, credential: &Credential<G>) -> Vec<G::Scalar> {
        let mut witness = Vec::with_capacity(self.hidden.len() + 1);
        witness.push(credential.blinding);
        witness.extend(self.hidden.iter().map(|&i| credential.attributes[i]));
        witness
    }

    fn check_disclosed(&self, values: &[G::Scalar]) -> Result<(), Error> {
        if values.len() != self.disclosed.len() {
            return Err(Error::MalformedProof(format!(
                "expected {} disclosed attributes, found {}",
                self.disclosed.len(),
                values.len()
            )));
        }
        Ok(())
    }
}

/// First message of a credential leaf.
///
/// The disclosed values have no accessor; read them from
/// [`VerifiedDisclosures`] after verification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialAnnouncement<G: PrimeGroup> {
    issuer_id: String,
    disclosed: Vec<G::Scalar>,
    elements: Vec<G>,
}

/// Response of a credential leaf: the disclosed values again, and the Schnorr
/// responses for the blinding and the hidden attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialResponse<G: PrimeGroup> {
    disclosed: Vec<G::Scalar>,
    scalars: Vec<G::Scalar>,
}

pub struct CredentialProverState<G: PrimeGroup> {
    disclosed: Vec<G::Scalar>,
    relation: CanonicalLinearRelation<G>,
    inner: (Vec<G::Scalar>, Vec<G::Scalar>),
}

impl<G: PrimeGroup> SigmaProtocol for CredentialStatement<G> {
    type Announcement = CredentialAnnouncement<G>;
    type ProverState = CredentialProverState<G>;
    type Response = CredentialResponse<G>;
    type Witness = Credential<G>;
    type Challenge = G::Scalar;

    fn prover_announce(
        &self,
        witness: &Self::Witness,
        rng: &mut (impl RngCore + CryptoRng),
    ) -> Result<(Self::Announcement, Self::ProverState), Error> {
        if !self.is_witness_valid(witness) {
            return Err(Error::InvalidInstanceWitnessPair);
        }
        let disclosed = self
            .disclosed
            .iter()
            .map(|&i| witness.attributes[i])
            .collect::<Vec<_>>();
        let relation = self.hidden_relation(&disclosed)?;
        let (elements, inner) = relation.prover_announce(&self.hidden_witness(witness), rng)?;
        let announcement = CredentialAnnouncement {
            issuer_id: self.issuer.id.clone(),
            disclosed: disclosed.clone(),
            elements,
        };
        Ok((
            announcement,
            CredentialProverState {
                disclosed,
                relation,
                inner,
            },
        ))
    }

    fn prover_response(
        &self,
        state: Self::ProverState,
        challenge: &Self::Challenge,
    ) -> Result<Self::Response, Error> {
        let scalars = state.relation.prover_response(state.inner, challenge)?;
        Ok(CredentialResponse {
            disclosed: state.disclosed,
            scalars,
        })
    }

    fn verifier(
        &self,
        announcement: &Self::Announcement,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<(), Error> {
        self.check_disclosed(&announcement.disclosed)?;
        if announcement.issuer_id != self.issuer.id || announcement.disclosed != response.disclosed
        {
            return Err(Error::VerificationFailure);
        }
        self.hidden_relation(&announcement.disclosed)?.verifier(
            &announcement.elements,
            challenge,
            &response.scalars,
        )
    }

    fn is_witness_valid(&self, witness: &Self::Witness) -> bool {
        witness.attributes.len() == self.issuer.num_attributes()
            && witness.commit(&self.issuer) == self.commitment
    }

    fn sample_challenge(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Challenge {
        G::Scalar::random(rng)
    }

    fn serialize_announcement(&self, announcement: &Self::Announcement) -> Vec<u8> {
        let mut out = Vec::new();
        write_len(&mut out, announcement.issuer_id.len());
        out.extend_from_slice(announcement.issuer_id.as_bytes());
        out.extend(serialize_scalars(&announcement.disclosed));
        out.extend(serialize_elements(&announcement.elements));
        out
    }

    fn serialize_challenge(&self, challenge: &Self::Challenge) -> Vec<u8> {
        serialize_scalars(&[*challenge])
    }

    fn serialize_response(&self, response: &Self::Response) -> Vec<u8> {
        let mut out = serialize_scalars(&response.disclosed);
        out.extend(serialize_scalars(&response.scalars));
        out
    }

    fn deserialize_announcement(&self, data: &mut &[u8]) -> Result<Self::Announcement, Error> {
        let malformed = || Error::MalformedProof("invalid credential announcement".into());
        let len = read_len(data).ok_or_else(malformed)?;
        let id_bytes = read_bytes(data, len).ok_or_else(malformed)?;
        let issuer_id = core::str::from_utf8(id_bytes)
            .map_err(|_| malformed())?
            .to_string();
        let disclosed =
            deserialize_scalars::<G::Scalar>(data, self.disclosed.len()).ok_or_else(malformed)?;
        let elements = deserialize_elements::<G>(data, 1).ok_or_else(malformed)?;
        Ok(CredentialAnnouncement {
            issuer_id,
            disclosed,
            elements,
        })
    }

    fn deserialize_challenge(&self, data: &mut &[u8]) -> Result<Self::Challenge, Error> {
        let scalars = deserialize_scalars::<G::Scalar>(data, 1)
            .ok_or_else(|| Error::MalformedProof("invalid challenge encoding".into()))?;
        Ok(scalars[0])
    }

    fn deserialize_response(&self, data: &mut &[u8]) -> Result<Self::Response, Error> {
        let malformed = || Error::MalformedProof("invalid credential response".into());
        let disclosed =
            deserialize_scalars::<G::Scalar>(data, self.disclosed.len()).ok_or_else(malformed)?;
        let scalars =
            deserialize_scalars::<G::Scalar>(data, self.hidden.len() + 1).ok_or_else(malformed)?;
        Ok(CredentialResponse { disclosed, scalars })
    }

    fn announcement_to_repr(&self, announcement: &Self::Announcement) -> Representation {
        Representation::map([
            ("issuer", Representation::Str(announcement.issuer_id.clone())),
            ("disclosed", Representation::scalars(&announcement.disclosed)),
            ("elements", Representation::elements(&announcement.elements)),
        ])
    }

    fn response_to_repr(&self, response: &Self::Response) -> Representation {
        Representation::map([
            ("disclosed", Representation::scalars(&response.disclosed)),
            ("scalars", Representation::scalars(&response.scalars)),
        ])
    }

    fn recreate_announcement(&self, repr: &Representation) -> Result<Self::Announcement, Error> {
        Ok(CredentialAnnouncement {
            issuer_id: repr.get("issuer")?.as_str()?.to_string(),
            disclosed: repr.get("disclosed")?.to_scalars(self.disclosed.len())?,
            elements: repr.get("elements")?.to_elements(1)?,
        })
    }

    fn recreate_response(&self, repr: &Representation) -> Result<Self::Response, Error> {
        Ok(CredentialResponse {
            disclosed: repr.get("disclosed")?.to_scalars(self.disclosed.len())?,
            scalars: repr.get("scalars")?.to_scalars(self.hidden.len() + 1)?,
        })
    }

    fn protocol_identifier(&self) -> impl AsRef<[u8]> {
        b"sigma-policy-proofs/credential-v1"
    }

    fn instance_label(&self) -> impl AsRef<[u8]> {
        let mut out = Vec::new();
        write_len(&mut out, self.issuer.id.len());
        out.extend_from_slice(self.issuer.id.as_bytes());
        write_len(&mut out, self.issuer.generators.len());
        out.extend(serialize_elements(&self.issuer.generators));
        out.extend(serialize_elements([&self.commitment]));
        write_len(&mut out, self.disclosed.len());
        for &i in &self.disclosed {
            write_len(&mut out, i);
        }
        out
    }
}

impl<G: PrimeGroup> SigmaProtocolSimulator for CredentialStatement<G> {
    /// Simulated credential leaves disclose zeros. Policy trees only place disclosing
    /// leaves where they are never simulated.
    fn simulate_response(&self, rng: &mut (impl RngCore + CryptoRng)) -> Self::Response {
        CredentialResponse {
            disclosed: alloc::vec![G::Scalar::ZERO; self.disclosed.len()],
            scalars: (0..=self.hidden.len())
                .map(|_| G::Scalar::random(&mut *rng))
                .collect(),
        }
    }

    fn simulate_announcement(
        &self,
        challenge: &Self::Challenge,
        response: &Self::Response,
    ) -> Result<Self::Announcement, Error> {
        self.check_disclosed(&response.disclosed)?;
        let elements = self
            .hidden_relation(&response.disclosed)?
            .simulate_announcement(challenge, &response.scalars)?;
        Ok(CredentialAnnouncement {
            issuer_id: self.issuer.id.clone(),
            disclosed: response.disclosed.clone(),
            elements,
        })
    }
}

/// Attribute values revealed by a verified proof, by issuer and attribute index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifiedDisclosures<G: PrimeGroup> {
    by_leaf: BTreeMap<String, (String, BTreeMap<usize, G::Scalar>)>,
}

impl<G: PrimeGroup> Default for VerifiedDisclosures<G> {
    fn default() -> Self {
        Self {
            by_leaf: BTreeMap::new(),
        }
    }
}

impl<G: PrimeGroup> VerifiedDisclosures<G> {
    pub(crate) fn record(
        &mut self,
        leaf: &str,
        statement: &CredentialStatement<G>,
        announcement: &CredentialAnnouncement<G>,
    ) {
        let values = statement
            .disclosed
            .iter()
            .copied()
            .zip(announcement.disclosed.iter().copied())
            .collect();
        self.by_leaf
            .insert(leaf.to_string(), (announcement.issuer_id.clone(), values));
    }

    /// The value of attribute `index` disclosed under a credential of `issuer`.
    ///
    /// If several credentials of the same issuer disclose the index, the one of the
    /// first leaf (by name) is returned; use [`Self::for_leaf`] to disambiguate.
    pub fn get(&self, issuer: &str, index: usize) -> Option<&G::Scalar> {
        self.by_leaf
            .values()
            .filter(|(id, _)| id == issuer)
            .find_map(|(_, values)| values.get(&index))
    }

    /// All values disclosed by the credential leaf `leaf`.
    pub fn for_leaf(&self, leaf: &str) -> Option<(&str, &BTreeMap<usize, G::Scalar>)> {
        self.by_leaf
            .get(leaf)
            .map(|(issuer, values)| (issuer.as_str(), values))
    }

    /// Disclosures grouped as issuer id → attribute index → value.
    pub fn by_issuer(&self) -> BTreeMap<&str, BTreeMap<usize, G::Scalar>> {
        let mut out: BTreeMap<&str, BTreeMap<usize, G::Scalar>> = BTreeMap::new();
        for (issuer, values) in self.by_leaf.values() {
            let entry = out.entry(issuer.as_str()).or_default();
            for (&index, &value) in values {
                entry.entry(index).or_insert(value);
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.by_leaf.is_empty()
    }
}
