use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::Scalar;
use ff::{Field, PrimeField};
use rand::rngs::OsRng;

use super::test_relations::*;
use crate::composition::PartialKnowledge;
use crate::credential::{Credential, CredentialStatement, IssuerKey};
use crate::damgard::{CommitmentKey, Damgard};
use crate::errors::Error;
use crate::policy::PolicyTree;
use crate::session::run_interactive;
use crate::traits::{SigmaProtocol, SigmaProtocolSimulator};
use crate::witness::WitnessTable;

type G = RistrettoPoint;

const BUCKETS: usize = 16;
const SAMPLES: usize = 1600;
// 15 degrees of freedom; the 0.001 tail starts at 37.7.
const CHI_SQUARE_BOUND: f64 = 45.0;

/// Chi-square statistic of the low nibble of the scalars against the uniform distribution.
fn chi_square(samples: impl IntoIterator<Item = Scalar>) -> f64 {
    let mut counts = [0usize; BUCKETS];
    let mut total = 0;
    for scalar in samples {
        counts[(scalar.to_repr()[0] as usize) % BUCKETS] += 1;
        total += 1;
    }
    let expected = total as f64 / BUCKETS as f64;
    counts
        .iter()
        .map(|&c| (c as f64 - expected).powi(2) / expected)
        .sum()
}

fn check_simulator<P>(protocol: &P)
where
    P: SigmaProtocolSimulator<Challenge = Scalar>,
{
    let mut rng = OsRng;
    let transcript = protocol.simulate_transcript(&mut rng).unwrap();
    assert!(protocol
        .verifier(
            &transcript.announcement,
            &transcript.challenge,
            &transcript.response
        )
        .is_ok());

    let challenge = Scalar::random(&mut rng);
    let transcript = protocol.simulate(&challenge, &mut rng).unwrap();
    assert_eq!(transcript.challenge, challenge);
    assert!(protocol
        .verifier(&transcript.announcement, &challenge, &transcript.response)
        .is_ok());
}

#[test]
fn test_simulator_acceptance_linear() {
    let mut rng = OsRng;
    check_simulator(&discrete_logarithm::<G, _>(&mut rng).0);
    check_simulator(&dleq::<G, _>(&mut rng).0);
    check_simulator(&pedersen_commitment::<G, _>(&mut rng).0);
    check_simulator(&attribute_equality::<G, _>(&mut rng).0);
    check_simulator(&inequality::<G, _>(&mut rng).0);
    check_simulator(&shifted_representation::<G, _>(&mut rng).0);
    check_simulator(&weighted_dleq::<G, _>(&mut rng).0);
}

#[test]
fn test_simulator_acceptance_composed() {
    let mut rng = OsRng;
    let issuer = IssuerKey::<G>::random("gov", 2, &mut rng).unwrap();
    let (_, commitment) =
        Credential::issue(&issuer, vec![Scalar::ONE, Scalar::ONE], &mut rng).unwrap();
    let credential = CredentialStatement::new(issuer.clone(), commitment, [1]).unwrap();
    check_simulator(&credential);
    // disclosing leaves are only allowed below AND gates
    let credential = CredentialStatement::new(issuer, commitment, Vec::new()).unwrap();

    let policy = PolicyTree::threshold(
        2,
        vec![
            PolicyTree::leaf("dlog", discrete_logarithm::<G, _>(&mut rng).0),
            PolicyTree::and(vec![
                PolicyTree::leaf("dleq", dleq::<G, _>(&mut rng).0),
                PolicyTree::leaf("credential", credential),
            ])
            .unwrap(),
            PolicyTree::leaf("pedersen", pedersen_commitment::<G, _>(&mut rng).0),
        ],
    )
    .unwrap();
    let protocol = PartialKnowledge::new(policy);
    check_simulator(&protocol);

    let damgard = Damgard::new(protocol, CommitmentKey::<G>::random(&mut rng));
    check_simulator(&damgard);
}

#[test]
fn test_simulate_announcement_rejects_malformed_response() {
    let mut rng = OsRng;
    let (relation, _) = dleq::<G, _>(&mut rng);
    let mut response = relation.simulate_response(&mut rng);
    response.push(Scalar::ONE);
    assert!(relation
        .simulate_announcement(&Scalar::ONE, &response)
        .is_err());

    // the Damgård simulator cannot reuse a response for another challenge
    let damgard = Damgard::new(relation, CommitmentKey::<G>::random(&mut rng));
    let transcript = damgard.simulate_transcript(&mut rng).unwrap();
    assert!(matches!(
        damgard.simulate_announcement(&(transcript.challenge + Scalar::ONE), &transcript.response),
        Err(Error::SimulationPrecondition(_))
    ));
}

#[test]
fn test_response_uniformity() {
    let mut rng = OsRng;
    let (relation, witness) = discrete_logarithm::<G, _>(&mut rng);

    let real = (0..SAMPLES).map(|_| {
        let transcript = run_interactive(&relation, witness.clone(), &mut OsRng).unwrap();
        transcript.response[0]
    });
    let statistic = chi_square(real);
    assert!(statistic < CHI_SQUARE_BOUND, "real responses: {statistic}");

    let simulated = (0..SAMPLES).map(|_| relation.simulate_response(&mut OsRng)[0]);
    let statistic = chi_square(simulated);
    assert!(statistic < CHI_SQUARE_BOUND, "simulated responses: {statistic}");
}

#[test]
fn test_composed_share_uniformity() {
    let mut rng = OsRng;
    let (relation, witness) = discrete_logarithm::<G, _>(&mut rng);
    let policy = PolicyTree::or(vec![
        PolicyTree::leaf("real", relation),
        PolicyTree::leaf("fake", discrete_logarithm::<G, _>(&mut rng).0),
    ])
    .unwrap();
    let protocol = PartialKnowledge::new(policy);
    let table = WitnessTable::new().with("real", witness).unwrap();

    let real = (0..SAMPLES).map(|_| {
        let transcript = run_interactive(&protocol, table.clone(), &mut OsRng).unwrap();
        transcript.response.shares[0][0]
    });
    let statistic = chi_square(real);
    assert!(statistic < CHI_SQUARE_BOUND, "real shares: {statistic}");

    let simulated = (0..SAMPLES).map(|_| protocol.simulate_response(&mut OsRng).shares[0][0]);
    let statistic = chi_square(simulated);
    assert!(statistic < CHI_SQUARE_BOUND, "simulated shares: {statistic}");
}
