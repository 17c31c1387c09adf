use bls12_381::{G1Projective as G, Scalar};
use ff::Field;
use group::Group;
use rand::rngs::OsRng;

use crate::composition::PartialKnowledge;
use crate::credential::{Credential, CredentialStatement, IssuerKey};
use crate::errors::Error;
use crate::fiat_shamir::{FiatShamirContext, Nizk};
use crate::policy::PolicyTree;
use crate::predicates::discrete_log;
use crate::session::run_interactive;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};
use crate::witness::WitnessTable;

const AGE: usize = 0;
const COUNTRY: usize = 1;
const SECRET: usize = 2;

fn issue(issuer: &IssuerKey<G>) -> (Credential<G>, G) {
    let attributes = vec![Scalar::from(34u64), Scalar::from(250u64), Scalar::random(OsRng)];
    Credential::issue(issuer, attributes, &mut OsRng).unwrap()
}

#[test]
fn test_credential_leaf_completeness() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (credential, commitment) = issue(&issuer);
    assert_eq!(credential.commit(&issuer), commitment);

    for disclosed in [vec![], vec![AGE], vec![AGE, COUNTRY], vec![AGE, COUNTRY, SECRET]] {
        let statement = CredentialStatement::new(issuer.clone(), commitment, disclosed).unwrap();
        assert!(statement.is_witness_valid(&credential));
        assert!(run_interactive(&statement, credential.clone(), &mut rng).is_ok());
        assert!(statement
            .simulate_transcript(&mut rng)
            .and_then(|t| statement.verifier(&t.announcement, &t.challenge, &t.response))
            .is_ok());
    }
}

#[test]
fn test_disclosures_readable_after_verification() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (credential, commitment) = issue(&issuer);
    let statement = CredentialStatement::new(issuer, commitment, [COUNTRY, AGE]).unwrap();
    assert_eq!(statement.disclosed_indices(), [AGE, COUNTRY]);

    let x = Scalar::random(&mut rng);
    let policy = PolicyTree::and(vec![
        PolicyTree::leaf("id", statement),
        PolicyTree::leaf("key", discrete_log(G::generator(), G::generator() * x).unwrap()),
    ])
    .unwrap();
    let witness = WitnessTable::new()
        .with("id", credential)
        .unwrap()
        .with("key", vec![x])
        .unwrap();

    let protocol = PartialKnowledge::new(policy);
    let transcript = run_interactive(&protocol, witness.clone(), &mut rng).unwrap();
    let disclosures = protocol
        .verify_with_disclosures(
            &transcript.announcement,
            &transcript.challenge,
            &transcript.response,
        )
        .unwrap();
    assert_eq!(disclosures.get("gov", AGE), Some(&Scalar::from(34u64)));
    assert_eq!(disclosures.get("gov", COUNTRY), Some(&Scalar::from(250u64)));
    assert_eq!(disclosures.get("gov", SECRET), None);
    assert_eq!(disclosures.for_leaf("id").map(|(issuer, _)| issuer), Some("gov"));

    let nizk: Nizk<_> = Nizk::new(b"credentials", protocol);
    let context = FiatShamirContext::new(b"bar", b"");
    let proof = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
    let disclosures = nizk
        .verify_batchable_with_disclosures(&proof, &context)
        .unwrap();
    assert_eq!(disclosures.by_issuer()["gov"].len(), 2);
}

#[test]
fn test_disclosures_not_released_on_failure() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (credential, commitment) = issue(&issuer);
    let statement = CredentialStatement::new(issuer, commitment, [AGE]).unwrap();
    let protocol = PartialKnowledge::new(PolicyTree::leaf("id", statement));
    let witness = WitnessTable::new().with("id", credential).unwrap();
    let transcript = run_interactive(&protocol, witness, &mut rng).unwrap();

    let wrong_challenge = transcript.challenge + Scalar::ONE;
    assert!(matches!(
        protocol.verify_with_disclosures(
            &transcript.announcement,
            &wrong_challenge,
            &transcript.response
        ),
        Err(Error::VerificationFailure)
    ));
}

#[test]
fn test_disclosing_leaves_only_under_and_gates() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (_, commitment_a) = issue(&issuer);
    let (_, commitment_b) = issue(&issuer);
    let disclosing = |name: &str, commitment: G| {
        PolicyTree::leaf(
            name,
            CredentialStatement::new(issuer.clone(), commitment, [AGE]).unwrap(),
        )
    };
    let x = Scalar::random(&mut rng);
    let key = || PolicyTree::leaf("key", discrete_log(G::generator(), G::generator() * x).unwrap());

    // a simulated branch would announce different disclosed values than a real one
    for policy in [
        PolicyTree::or(vec![disclosing("a", commitment_a), disclosing("b", commitment_b)]),
        PolicyTree::threshold(1, vec![disclosing("a", commitment_a), key()]),
        PolicyTree::or(vec![
            PolicyTree::and(vec![disclosing("a", commitment_a), key()]).unwrap(),
            disclosing("b", commitment_b),
        ]),
    ] {
        assert!(matches!(policy, Err(Error::MalformedPolicy(_))));
    }

    let nested = PolicyTree::and(vec![
        PolicyTree::and(vec![disclosing("a", commitment_a), key()]).unwrap(),
        disclosing("b", commitment_b),
    ]);
    assert!(nested.is_ok());
}

#[test]
fn test_credential_or_hides_the_real_branch() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (credential, commitment_a) = issue(&issuer);
    let (_, commitment_b) = issue(&issuer);
    let hidden = |commitment: G| CredentialStatement::new(issuer.clone(), commitment, Vec::new()).unwrap();

    let policy = PolicyTree::or(vec![
        PolicyTree::leaf("a", hidden(commitment_a)),
        PolicyTree::leaf("b", hidden(commitment_b)),
    ])
    .unwrap();
    let protocol = PartialKnowledge::new(policy);
    let witness = WitnessTable::new().with("a", credential).unwrap();
    let transcript = run_interactive(&protocol, witness, &mut rng).unwrap();

    let announcement = protocol.announcement_to_repr(&transcript.announcement);
    let leaves = announcement.as_list_of_len(2).unwrap();
    for field in ["issuer", "disclosed"] {
        assert_eq!(leaves[0].get(field).unwrap(), leaves[1].get(field).unwrap());
    }
    let response = protocol.response_to_repr(&transcript.response);
    let leaves = response.get("leaves").unwrap().as_list_of_len(2).unwrap();
    assert_eq!(
        leaves[0].get("disclosed").unwrap(),
        leaves[1].get("disclosed").unwrap()
    );

    let disclosures = protocol
        .verify_with_disclosures(
            &transcript.announcement,
            &transcript.challenge,
            &transcript.response,
        )
        .unwrap();
    assert!(disclosures.is_empty());
}

#[test]
fn test_disclosed_value_tampering() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 3, &mut rng).unwrap();
    let (credential, commitment) = issue(&issuer);

    // a credential claiming a different age cannot prove the statement
    let mut forged = credential.clone();
    forged.attributes[AGE] = Scalar::from(18u64);
    let statement = CredentialStatement::new(issuer.clone(), commitment, [AGE]).unwrap();
    assert!(!statement.is_witness_valid(&forged));
    assert!(matches!(
        statement.prover_announce(&forged, &mut rng),
        Err(Error::InvalidInstanceWitnessPair)
    ));

    // a transcript checked against another issuer's statement is rejected
    let transcript = run_interactive(&statement, credential, &mut rng).unwrap();
    let other_issuer = IssuerKey::<G>::random("bank", 3, &mut rng).unwrap();
    let other = CredentialStatement::new(other_issuer, commitment, [AGE]).unwrap();
    assert!(matches!(
        other.verifier(&transcript.announcement, &transcript.challenge, &transcript.response),
        Err(Error::VerificationFailure)
    ));
}

#[test]
fn test_invalid_statements() {
    let mut rng = OsRng;
    assert!(IssuerKey::<G>::new("empty", vec![G::generator()]).is_err());
    assert!(IssuerKey::<G>::new("identity", vec![G::generator(), G::identity()]).is_err());

    let issuer = IssuerKey::<G>::random("gov", 2, &mut rng).unwrap();
    assert!(CredentialStatement::new(issuer.clone(), G::generator(), [2]).is_err());
    assert!(CredentialStatement::new(issuer.clone(), G::identity(), [0]).is_err());
    assert!(Credential::issue(&issuer, vec![Scalar::ONE], &mut rng).is_err());
}
