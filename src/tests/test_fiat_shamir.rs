use curve25519_dalek::ristretto::RistrettoPoint;
use curve25519_dalek::Scalar;
use ff::Field;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

use super::test_relations::{dleq, pedersen_commitment};
use crate::composition::PartialKnowledge;
use crate::duplex_sponge::shake::ShakeDuplexSponge;
use crate::errors::Error;
use crate::fiat_shamir::{FiatShamirContext, Nizk};
use crate::policy::PolicyTree;
use crate::traits::SigmaProtocol;
use crate::witness::WitnessTable;

type G = RistrettoPoint;

fn or_nizk(seed: u64) -> (Nizk<PartialKnowledge<G>>, WitnessTable<G>) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let (r1, w1) = dleq::<G, _>(&mut rng);
    let (r2, _) = pedersen_commitment::<G, _>(&mut rng);
    let policy =
        PolicyTree::or(vec![PolicyTree::leaf("dleq", r1), PolicyTree::leaf("pedersen", r2)])
            .unwrap();
    let witness = WitnessTable::new().with("dleq", w1).unwrap();
    (Nizk::new(b"fiat-shamir tests", PartialKnowledge::new(policy)), witness)
}

#[test]
fn test_deterministic_with_fixed_randomness() {
    let (nizk, witness) = or_nizk(7);
    let context = FiatShamirContext::new(b"verifier", b"message");
    let proof1 = nizk
        .prove_batchable(&witness, &context, &mut ChaCha20Rng::seed_from_u64(1))
        .unwrap();
    let proof2 = nizk
        .prove_batchable(&witness, &context, &mut ChaCha20Rng::seed_from_u64(1))
        .unwrap();
    assert_eq!(proof1, proof2);

    let proof3 = nizk
        .prove_batchable(&witness, &context, &mut ChaCha20Rng::seed_from_u64(2))
        .unwrap();
    assert_ne!(proof1, proof3);
    assert!(nizk.verify_batchable(&proof3, &context).is_ok());
}

#[test]
fn test_challenge_binds_context() {
    let (nizk, witness) = or_nizk(11);
    let mut rng = ChaCha20Rng::seed_from_u64(3);
    let context = FiatShamirContext::new(b"verifier", b"message");
    let transcript = nizk.prove(&witness, &context, &mut rng).unwrap();
    assert!(nizk.verify(&transcript, &context).is_ok());

    let others = [
        FiatShamirContext::new(b"verifier", b"other message"),
        FiatShamirContext::new(b"other verifier", b"message"),
        FiatShamirContext::new(b"verifiermessage", b""),
    ];
    for other in &others {
        assert_ne!(
            nizk.challenge_for(&transcript.announcement, other),
            transcript.challenge
        );
        assert!(matches!(
            nizk.verify(&transcript, other),
            Err(Error::VerificationFailure)
        ));
    }

    // same statement under another session identifier
    let other_session: Nizk<_> = Nizk::new(b"another session", nizk.interactive_proof);
    assert!(other_session.verify(&transcript, &context).is_err());
}

#[test]
fn test_tampered_transcript() {
    let (nizk, witness) = or_nizk(13);
    let mut rng = ChaCha20Rng::seed_from_u64(4);
    let context = FiatShamirContext::default();
    let transcript = nizk.prove(&witness, &context, &mut rng).unwrap();

    let mut tampered = transcript.clone();
    tampered.challenge += Scalar::ONE;
    assert!(nizk.verify(&tampered, &context).is_err());

    let mut tampered = transcript.clone();
    tampered.response.shares[0][0] += Scalar::ONE;
    assert!(nizk.verify(&tampered, &context).is_err());

    let mut tampered = transcript;
    tampered.announcement.swap(0, 1);
    assert!(nizk.verify(&tampered, &context).is_err());
}

#[test]
fn test_compact_proofs() {
    let (nizk, witness) = or_nizk(17);
    let mut rng = ChaCha20Rng::seed_from_u64(5);
    let context = FiatShamirContext::new(b"verifier", b"");
    let compact = nizk.prove_compact(&witness, &context, &mut rng).unwrap();
    let batchable = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
    assert!(compact.len() < batchable.len());
    assert!(nizk.verify_compact(&compact, &context).is_ok());

    let mut tampered = compact.clone();
    tampered[0] ^= 1;
    assert!(nizk.verify_compact(&tampered, &context).is_err());

    let mut tampered = compact.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 1;
    assert!(nizk.verify_compact(&tampered, &context).is_err());

    assert!(nizk
        .verify_compact(&compact, &FiatShamirContext::new(b"eve", b""))
        .is_err());
    assert!(nizk.verify_compact(&compact[1..], &context).is_err());
}

#[test]
fn test_signatures() {
    let (nizk, witness) = or_nizk(19);
    let mut rng = ChaCha20Rng::seed_from_u64(6);
    let signature = nizk.sign(&witness, b"pay 10 to bob", &mut rng).unwrap();
    assert!(nizk.verify_signature(&signature, b"pay 10 to bob").is_ok());
    assert!(nizk.verify_signature(&signature, b"pay 99 to eve").is_err());
}

#[test]
fn test_shake_sponge() {
    let mut rng = ChaCha20Rng::seed_from_u64(8);
    let (relation, witness) = dleq::<G, _>(&mut rng);
    let context = FiatShamirContext::default();
    let keccak = Nizk::<_>::new(b"sponge", relation.clone());
    let shake = Nizk::<_, ShakeDuplexSponge>::new(b"sponge", relation);

    let transcript = keccak.prove(&witness, &context, &mut rng).unwrap();
    assert!(keccak.verify(&transcript, &context).is_ok());
    assert_ne!(
        shake.challenge_for(&transcript.announcement, &context),
        transcript.challenge
    );

    let proof = shake.prove_batchable(&witness, &context, &mut rng).unwrap();
    assert!(shake.verify_batchable(&proof, &context).is_ok());
    assert!(keccak.verify_batchable(&proof, &context).is_err());
    assert_eq!(
        proof.len(),
        shake
            .interactive_proof
            .serialize_announcement(&transcript.announcement)
            .len()
            + shake
                .interactive_proof
                .serialize_response(&transcript.response)
                .len()
    );
}
