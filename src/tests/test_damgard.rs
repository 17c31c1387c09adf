use bls12_381::{G1Projective as G, Scalar};
use ff::Field;
use group::Group;
use rand::rngs::OsRng;

use super::test_relations::{discrete_logarithm, dleq, pedersen_commitment};
use crate::composition::PartialKnowledge;
use crate::damgard::{CommitmentKey, Damgard};
use crate::errors::Error;
use crate::fiat_shamir::{FiatShamirContext, Nizk};
use crate::policy::PolicyTree;
use crate::representation::Representation;
use crate::session::{run_interactive, ProverSession, Verifier};
use crate::traits::SigmaProtocol;
use crate::witness::WitnessTable;

fn composed() -> (Damgard<PartialKnowledge<G>, G>, WitnessTable<G>) {
    let mut rng = OsRng;
    let (r1, w1) = dleq::<G, _>(&mut rng);
    let (r2, _) = pedersen_commitment::<G, _>(&mut rng);
    let policy =
        PolicyTree::or(vec![PolicyTree::leaf("dleq", r1), PolicyTree::leaf("pedersen", r2)])
            .unwrap();
    let witness = WitnessTable::new().with("dleq", w1).unwrap();
    let protocol = Damgard::new(
        PartialKnowledge::new(policy),
        CommitmentKey::random(&mut rng),
    );
    (protocol, witness)
}

#[test]
fn test_damgard_completeness() {
    let mut rng = OsRng;
    let (relation, witness) = discrete_logarithm::<G, _>(&mut rng);
    let protocol = Damgard::new(relation, CommitmentKey::<G>::random(&mut rng));
    assert!(run_interactive(&protocol, witness, &mut rng).is_ok());

    let (protocol, witness) = composed();
    assert!(protocol.is_witness_valid(&witness));
    let mut session = ProverSession::new(&protocol, witness).unwrap();
    let verifier = Verifier::new(&protocol);
    let commitment = session.announce(&mut rng).unwrap();
    let challenge = verifier.challenge(&mut rng);
    let response = session.respond(&challenge).unwrap();
    assert!(verifier.verify(&commitment, &challenge, &response).is_ok());
}

#[test]
fn test_damgard_rejects_wrong_opening() {
    let mut rng = OsRng;
    let (protocol, witness) = composed();
    let transcript = run_interactive(&protocol, witness, &mut rng).unwrap();

    let mut response = transcript.response.clone();
    response.opening += Scalar::ONE;
    assert!(matches!(
        protocol.verifier(&transcript.announcement, &transcript.challenge, &response),
        Err(Error::VerificationFailure)
    ));

    // the prover cannot swap the announcement after seeing the challenge
    let mut response = transcript.response.clone();
    response.announcement.reverse();
    assert!(matches!(
        protocol.verifier(&transcript.announcement, &transcript.challenge, &response),
        Err(Error::VerificationFailure)
    ));

    let other = transcript.announcement + G::generator();
    assert!(protocol
        .verifier(&other, &transcript.challenge, &transcript.response)
        .is_err());
}

#[test]
fn test_damgard_commitment_key() {
    let g = G::generator();
    assert!(CommitmentKey::new(g, G::identity()).is_err());
    assert!(CommitmentKey::new(g, g).is_err());
    assert!(CommitmentKey::new(g, g.double()).is_ok());
}

#[test]
fn test_damgard_binds_the_key() {
    let mut rng = OsRng;
    let (protocol, witness) = composed();
    let transcript = run_interactive(&protocol, witness, &mut rng).unwrap();
    let rekeyed = Damgard::new(protocol.inner().clone(), CommitmentKey::<G>::random(&mut rng));
    assert!(rekeyed
        .verifier(&transcript.announcement, &transcript.challenge, &transcript.response)
        .is_err());
    assert_ne!(
        protocol.instance_label().as_ref(),
        rekeyed.instance_label().as_ref()
    );
}

#[test]
fn test_damgard_encodings() {
    let mut rng = OsRng;
    let (protocol, witness) = composed();
    let transcript = run_interactive(&protocol, witness.clone(), &mut rng).unwrap();

    let bytes = protocol.serialize_response(&transcript.response);
    let mut cursor = bytes.as_slice();
    let response = protocol.deserialize_response(&mut cursor).unwrap();
    assert!(cursor.is_empty());
    assert_eq!(response, transcript.response);

    let json = serde_json::to_string(&protocol.response_to_repr(&transcript.response)).unwrap();
    let repr: Representation = serde_json::from_str(&json).unwrap();
    assert_eq!(protocol.recreate_response(&repr).unwrap(), transcript.response);

    let repr = protocol.announcement_to_repr(&transcript.announcement);
    assert_eq!(
        protocol.recreate_announcement(&repr).unwrap(),
        transcript.announcement
    );

    // the transform composes with Fiat-Shamir
    let nizk: Nizk<_> = Nizk::new(b"damgard", protocol);
    let context = FiatShamirContext::default();
    let proof = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
    assert!(nizk.verify_batchable(&proof, &context).is_ok());
    assert!(nizk.verify_batchable(&proof[..proof.len() - 1], &context).is_err());
}
