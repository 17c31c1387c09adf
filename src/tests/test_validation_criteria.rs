//! Validation criteria tests
//!
//! Malformed instances and malformed proofs must be rejected, never accepted and
//! never a panic.

#[cfg(test)]
mod instance_validation {
    use bls12_381::{G1Projective as G, Scalar};
    use ff::Field;
    use group::Group;

    use crate::errors::Error;
    use crate::linear_relation::expr::{EquationSystem, Expr};
    use crate::linear_relation::{CanonicalLinearRelation, LinearRelation};
    use crate::policy::{LeafProtocol, PolicyDescription, PolicyTree};
    use crate::predicates;

    #[test]
    fn test_unassigned_group_vars() {
        let mut relation = LinearRelation::<G>::new();
        let [var_x] = relation.allocate_scalars();
        let [var_g, var_x_g] = relation.allocate_elements::<2>();

        // var_g is never assigned
        relation.set_elements([(var_x_g, G::generator() * Scalar::from(42u64))]);
        relation.append_equation(var_x_g, var_x * var_g);

        assert!(CanonicalLinearRelation::try_from(&relation).is_err());
        assert!(matches!(
            relation.linear_map.evaluate(&[Scalar::ONE]),
            Err(Error::UnassignedGroupVar { .. })
        ));
    }

    #[test]
    fn test_identity_image_rejected() {
        let mut relation = LinearRelation::<G>::new();
        let var_x = relation.allocate_scalar();
        let var_g = relation.allocate_element();
        let var_zero = relation.allocate_eq(var_x * var_g);
        relation.set_elements([(var_g, G::generator()), (var_zero, G::identity())]);

        assert!(CanonicalLinearRelation::try_from(&relation).is_err());
    }

    #[test]
    fn test_empty_instance() {
        let relation = LinearRelation::<G>::new();
        assert!(CanonicalLinearRelation::try_from(&relation).is_err());
    }

    #[test]
    #[allow(non_snake_case)]
    fn test_degenerate_equation() {
        // 0·(x·B) = identity holds trivially and is dropped
        let mut relation = LinearRelation::<G>::new();
        let x = relation.allocate_scalar();
        let [B, X] = relation.allocate_elements();
        let trivial = relation.allocate_eq((x * B) * Scalar::ZERO);
        relation.append_equation(X, x * B);
        relation.set_elements([
            (B, G::generator()),
            (trivial, G::identity()),
            (X, G::generator() * Scalar::from(3u64)),
        ]);
        let canonical = CanonicalLinearRelation::try_from(&relation).unwrap();
        assert_eq!(canonical.num_equations(), 1);
        assert!(canonical.is_satisfied_by(&[Scalar::from(3u64)]));

        // a trivial equation with a non-identity image can never hold
        let mut relation = LinearRelation::<G>::new();
        let x = relation.allocate_scalar();
        let B = relation.allocate_element();
        let image = relation.allocate_eq((x * B) * Scalar::ZERO);
        relation.set_elements([(B, G::generator()), (image, G::generator())]);
        assert!(CanonicalLinearRelation::try_from(&relation).is_err());

        // only trivial equations
        let mut relation = LinearRelation::<G>::new();
        let x = relation.allocate_scalar();
        let B = relation.allocate_element();
        let image = relation.allocate_eq((x * B) * Scalar::ZERO);
        relation.set_elements([(B, G::generator()), (image, G::identity())]);
        assert!(CanonicalLinearRelation::try_from(&relation).is_err());
    }

    #[test]
    fn test_inconsistent_equation_count() {
        let mut relation = LinearRelation::<G>::new();
        let [var_x] = relation.allocate_scalars();
        let [var_g, var_h] = relation.allocate_elements::<2>();
        relation.set_elements([
            (var_g, G::generator()),
            (var_h, G::generator() * Scalar::from(2u64)),
        ]);
        relation
            .linear_map
            .append(crate::linear_relation::LinearCombination::<G>::from(vec![(var_x, var_g)]));
        relation
            .linear_map
            .append(crate::linear_relation::LinearCombination::<G>::from(vec![(var_x, var_h)]));
        relation.image.push(var_g);

        assert!(CanonicalLinearRelation::try_from(&relation).is_err());
    }

    #[test]
    fn test_nested_unknown_exponent_rejected() {
        let mut system = EquationSystem::<G>::new();
        system.equation(
            Expr::element(G::generator()),
            Expr::element(G::generator())
                .pow_unknown("x")
                .pow_unknown("y"),
        );
        assert!(system.compile().is_err());
    }

    #[test]
    fn test_missing_unknown_value() {
        let mut system = EquationSystem::<G>::new();
        system.equation(
            Expr::element(G::generator()),
            Expr::element(G::generator()).pow_unknown("x"),
        );
        let assignment = [("y".to_string(), Scalar::ONE)].into_iter().collect();
        assert!(matches!(
            system.witness_from_map(&assignment),
            Err(Error::UnknownVariable(name)) if name == "x"
        ));
    }

    #[test]
    fn test_policy_shapes() {
        let mut rng = rand::thread_rng();
        let leaf = |name: &str, rng: &mut rand::rngs::ThreadRng| {
            PolicyTree::leaf(
                name,
                predicates::discrete_log(G::generator(), G::random(rng)).unwrap(),
            )
        };

        assert!(matches!(
            PolicyTree::<G>::threshold(0, vec![leaf("a", &mut rng)]),
            Err(Error::MalformedPolicy(_))
        ));
        assert!(matches!(
            PolicyTree::<G>::threshold(3, vec![leaf("a", &mut rng), leaf("b", &mut rng)]),
            Err(Error::MalformedPolicy(_))
        ));
        assert!(matches!(
            PolicyTree::<G>::threshold(1, vec![]),
            Err(Error::MalformedPolicy(_))
        ));
        assert!(matches!(
            PolicyTree::<G>::or(vec![leaf("a", &mut rng), leaf("a", &mut rng)]),
            Err(Error::MalformedPolicy(_))
        ));

        let description: PolicyDescription = serde_json::from_str(
            r#"{"kind":"threshold","threshold":0,"children":[{"kind":"leaf","name":"a"}]}"#,
        )
        .unwrap();
        let statement = predicates::discrete_log(G::generator(), G::random(&mut rng)).unwrap();
        let leaves = [("a".to_string(), LeafProtocol::from(statement))]
            .into_iter()
            .collect();
        assert!(matches!(
            PolicyTree::<G>::from_description(&description, &leaves),
            Err(Error::MalformedPolicy(_))
        ));
    }
}

#[cfg(test)]
mod proof_validation {
    use bls12_381::{G1Projective as G, Scalar};
    use ff::Field;
    use group::Group;
    use rand::{thread_rng, RngCore};

    use crate::composition::PartialKnowledge;
    use crate::fiat_shamir::{FiatShamirContext, Nizk};
    use crate::policy::PolicyTree;
    use crate::predicates::{discrete_log, pedersen_opening};
    use crate::witness::WitnessTable;

    type TestNizk = Nizk<PartialKnowledge<G>>;

    /// A 1-of-2 policy proof where only the first leaf is known.
    fn create_valid_proof() -> (Vec<u8>, TestNizk, FiatShamirContext) {
        let mut rng = thread_rng();
        let H = G::random(&mut rng);
        let [x, r] = [Scalar::from(42u64), Scalar::random(&mut rng)];
        let policy = PolicyTree::or(vec![
            PolicyTree::leaf(
                "opening",
                pedersen_opening(G::generator(), H, G::generator() * x + H * r).unwrap(),
            ),
            PolicyTree::leaf(
                "dlog",
                discrete_log(G::generator(), G::random(&mut rng)).unwrap(),
            ),
        ])
        .unwrap();
        let witness = WitnessTable::new().with("opening", vec![x, r]).unwrap();

        let nizk = TestNizk::new(b"test_session", PartialKnowledge::new(policy));
        let context = FiatShamirContext::new(b"verifier", b"");
        let proof = nizk.prove_batchable(&witness, &context, &mut rng).unwrap();
        (proof, nizk, context)
    }

    #[test]
    fn test_proof_bitflip() {
        let (mut proof, nizk, context) = create_valid_proof();
        assert!(nizk.verify_batchable(&proof, &context).is_ok());

        let positions = [0, proof.len() / 2, proof.len() - 1];
        for &pos in &positions {
            let original_byte = proof[pos];
            for bit in 0..8 {
                proof[pos] = original_byte ^ (1 << bit);
                assert!(
                    nizk.verify_batchable(&proof, &context).is_err(),
                    "Proof verification should fail with bit {bit} flipped at position {pos}"
                );
                proof[pos] = original_byte;
            }
        }
    }

    #[test]
    fn test_proof_append_bytes() {
        let (mut proof, nizk, context) = create_valid_proof();
        for size in [1, 8, 32] {
            proof.extend(vec![0u8; size]);
            assert!(nizk.verify_batchable(&proof, &context).is_err());
            proof.truncate(proof.len() - size);
        }
        assert!(nizk.verify_batchable(&proof, &context).is_ok());
    }

    #[test]
    fn test_proof_prepend_bytes() {
        let (proof, nizk, context) = create_valid_proof();
        for size in [1, 8, 32] {
            let mut prepended = vec![0u8; size];
            prepended.extend(&proof);
            assert!(nizk.verify_batchable(&prepended, &context).is_err());
        }
    }

    #[test]
    fn test_proof_truncation() {
        let (proof, nizk, context) = create_valid_proof();
        for size in [1, 8, 32, proof.len() / 2] {
            assert!(nizk
                .verify_batchable(&proof[..proof.len() - size], &context)
                .is_err());
        }
    }

    #[test]
    fn test_empty_proof() {
        let (_, nizk, context) = create_valid_proof();
        let err = nizk.verify_batchable(&[], &context).unwrap_err();
        assert!(err.is_malformed_input());
    }

    #[test]
    fn test_random_bytes_as_proof() {
        let (proof, nizk, context) = create_valid_proof();
        let mut rng = thread_rng();
        for _ in 0..8 {
            let mut random = vec![0u8; proof.len()];
            rng.fill_bytes(&mut random);
            assert!(nizk.verify_batchable(&random, &context).is_err());
        }
    }

    #[test]
    fn test_wrong_context() {
        let (proof, nizk, _) = create_valid_proof();
        for context in [
            FiatShamirContext::new(b"another verifier", b""),
            FiatShamirContext::new(b"verifier", b"message"),
        ] {
            assert!(matches!(
                nizk.verify_batchable(&proof, &context),
                Err(crate::errors::Error::VerificationFailure)
            ));
        }
    }
}
