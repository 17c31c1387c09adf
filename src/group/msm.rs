use group::prime::PrimeGroup;

/// Computes `Σ scalars[i] * bases[i]`.
///
/// Extra entries in the longer slice are ignored.
pub fn msm<G: PrimeGroup>(scalars: &[G::Scalar], bases: &[G]) -> G {
    core::iter::zip(bases, scalars).map(|(g, x)| *g * x).sum()
}
