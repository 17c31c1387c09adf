//! Threshold sharing of challenges.
//!
//! A threshold node with `n` children and threshold `t` splits its challenge into `n`
//! child shares such that any `n - t` of them, together with the secret, determine the
//! rest. The prover fixes the shares of the children it cannot (or does not need to)
//! answer honestly and derives the others.
//!
//! - `t == 1`: additive sharing, the shares sum to the secret.
//! - `t > 1`: Shamir sharing with a polynomial of degree `n - t` through `(0, secret)`,
//!   child `i` receiving the evaluation at `x = i + 1`. For `t == n` the polynomial is
//!   constant and every child receives the secret.
//!
//! On the wire only a prefix of the shares is sent, see [`compressed_len`]; the verifier
//! rebuilds the full vector with [`expand_shares`].

use alloc::format;
use alloc::vec;
use alloc::vec::Vec;

use ff::PrimeField;

use crate::errors::Error;

/// The sharing used by a threshold node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SharingScheme {
    Additive,
    Shamir,
}

impl SharingScheme {
    pub fn for_threshold(threshold: usize) -> Self {
        if threshold == 1 {
            SharingScheme::Additive
        } else {
            SharingScheme::Shamir
        }
    }
}

fn check_params(threshold: usize, total: usize) -> Result<(), Error> {
    if threshold == 0 || threshold > total {
        return Err(Error::MalformedPolicy(format!(
            "threshold {threshold} out of range for {total} children"
        )));
    }
    Ok(())
}

/// Number of shares the prover fixes freely, which is also the number of shares sent.
pub fn compressed_len(threshold: usize, total: usize) -> usize {
    match SharingScheme::for_threshold(threshold) {
        SharingScheme::Additive => total - 1,
        SharingScheme::Shamir => total - threshold,
    }
}

fn threshold_x<F: PrimeField>(index: usize) -> F {
    F::from((index + 1) as u64)
}

fn poly_mul_linear<F: PrimeField>(coeffs: &[F], constant: F) -> Vec<F> {
    let mut out = vec![F::ZERO; coeffs.len() + 1];
    for (i, coeff) in coeffs.iter().enumerate() {
        out[i] += *coeff * constant;
        out[i + 1] += *coeff;
    }
    out
}

/// Lagrange interpolation through points with pairwise distinct abscissae.
fn interpolate_polynomial<F: PrimeField>(points: &[(F, F)]) -> Result<Vec<F>, Error> {
    if points.is_empty() {
        return Err(Error::MalformedProof("no interpolation points".into()));
    }

    let mut coeffs = vec![F::ZERO; points.len()];

    for (i, (x_i, y_i)) in points.iter().enumerate() {
        let mut basis = vec![F::ONE];
        let mut denom = F::ONE;

        for (j, (x_j, _)) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            denom *= *x_i - *x_j;
            basis = poly_mul_linear(&basis, -*x_j);
        }

        let denom_inv: Option<F> = denom.invert().into();
        let scale = *y_i
            * denom_inv.ok_or_else(|| Error::MalformedProof("repeated interpolation point".into()))?;
        for (coeff, basis_coeff) in coeffs.iter_mut().zip(basis.iter()) {
            *coeff += *basis_coeff * scale;
        }
    }

    Ok(coeffs)
}

fn evaluate_polynomial<F: PrimeField>(coeffs: &[F], x: F) -> F {
    coeffs
        .iter()
        .rev()
        .fold(F::ZERO, |acc, coeff| acc * x + coeff)
}

/// Completes a share vector from the secret and the freely chosen shares.
///
/// `fixed` holds `(child index, share)` pairs for exactly [`compressed_len`] distinct
/// children; the shares of the remaining children are derived.
pub fn complete_shares<F: PrimeField>(
    secret: F,
    threshold: usize,
    total: usize,
    fixed: &[(usize, F)],
) -> Result<Vec<F>, Error> {
    check_params(threshold, total)?;
    let expected = compressed_len(threshold, total);
    if fixed.len() != expected {
        return Err(Error::PolicyUnfulfillable);
    }
    if fixed.iter().any(|(i, _)| *i >= total) {
        return Err(Error::MalformedPolicy("share index out of range".into()));
    }

    match SharingScheme::for_threshold(threshold) {
        SharingScheme::Additive => {
            let mut shares = vec![None; total];
            for (i, share) in fixed {
                shares[*i] = Some(*share);
            }
            let rest = secret - fixed.iter().map(|(_, s)| *s).sum::<F>();
            Ok(shares.into_iter().map(|s| s.unwrap_or(rest)).collect())
        }
        SharingScheme::Shamir => {
            let mut points = Vec::with_capacity(expected + 1);
            points.push((F::ZERO, secret));
            points.extend(fixed.iter().map(|(i, s)| (threshold_x::<F>(*i), *s)));
            let coeffs = interpolate_polynomial(&points)?;
            Ok((0..total)
                .map(|i| evaluate_polynomial(&coeffs, threshold_x::<F>(i)))
                .collect())
        }
    }
}

/// Rebuilds all `total` shares from the secret and the transmitted prefix.
///
/// # Errors
/// - [`Error::MalformedProof`] if `compressed` does not have [`compressed_len`] entries.
pub fn expand_shares<F: PrimeField>(
    secret: F,
    threshold: usize,
    total: usize,
    compressed: &[F],
) -> Result<Vec<F>, Error> {
    check_params(threshold, total)?;
    let expected = compressed_len(threshold, total);
    if compressed.len() != expected {
        return Err(Error::MalformedProof(format!(
            "expected {expected} challenge shares, found {}",
            compressed.len()
        )));
    }
    let fixed = compressed.iter().copied().enumerate().collect::<Vec<_>>();
    complete_shares(secret, threshold, total, &fixed)
}

/// The prefix of `shares` that is sent on the wire.
pub fn compress_shares<F: PrimeField>(threshold: usize, shares: &[F]) -> Vec<F> {
    shares[..compressed_len(threshold, shares.len())].to_vec()
}

/// Checks that `shares` is a valid sharing of `secret`.
pub fn is_consistent<F: PrimeField>(secret: F, threshold: usize, shares: &[F]) -> bool {
    if check_params(threshold, shares.len()).is_err() {
        return false;
    }
    let compressed = compress_shares(threshold, shares);
    expand_shares(secret, threshold, shares.len(), &compressed).is_ok_and(|all| all == shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::Scalar;
    use ff::Field;

    #[test]
    fn additive_shares_sum_to_secret() {
        let mut rng = rand::thread_rng();
        let secret = Scalar::random(&mut rng);
        let fixed = [(0, Scalar::random(&mut rng)), (2, Scalar::random(&mut rng))];
        let shares = complete_shares(secret, 1, 3, &fixed).unwrap();
        assert_eq!(shares[0], fixed[0].1);
        assert_eq!(shares[2], fixed[1].1);
        assert_eq!(shares.iter().sum::<Scalar>(), secret);
        assert!(is_consistent(secret, 1, &shares));
    }

    #[test]
    fn shamir_shares_interpolate_to_secret() {
        let mut rng = rand::thread_rng();
        let secret = Scalar::random(&mut rng);
        // 2-of-4: degree 2, two free shares.
        let fixed = [(1, Scalar::random(&mut rng)), (3, Scalar::random(&mut rng))];
        let shares = complete_shares(secret, 2, 4, &fixed).unwrap();
        assert_eq!(shares[1], fixed[0].1);
        assert_eq!(shares[3], fixed[1].1);

        let compressed = compress_shares(2, &shares);
        assert_eq!(compressed.len(), 2);
        assert_eq!(expand_shares(secret, 2, 4, &compressed).unwrap(), shares);
        assert!(!is_consistent(secret + Scalar::ONE, 2, &shares));
    }

    #[test]
    fn full_threshold_copies_secret() {
        let secret = Scalar::from(99u64);
        let shares = complete_shares(secret, 3, 3, &[]).unwrap();
        assert_eq!(shares, vec![secret; 3]);
    }

    #[test]
    fn wrong_share_count() {
        let secret = Scalar::ONE;
        assert!(matches!(
            expand_shares(secret, 2, 3, &[]),
            Err(Error::MalformedProof(_))
        ));
        assert!(matches!(
            complete_shares(secret, 0, 3, &[]),
            Err(Error::MalformedPolicy(_))
        ));
    }
}
