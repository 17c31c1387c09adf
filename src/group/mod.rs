//! Group-level helpers shared by every protocol in the crate.

/// Multi-scalar multiplication over any [`group::prime::PrimeGroup`].
pub mod msm;

/// Batch serialization functions for scalars and points.
pub mod serialization;
