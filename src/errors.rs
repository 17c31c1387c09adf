//! # Error: Error Types for Policy Proofs.
//!
//! This module defines the [`Error`] enum, which enumerates the possible failure modes
//! encountered while building, proving, or verifying Sigma protocols and their
//! threshold compositions.
//!
//! Two families are distinguished so that callers can log or alert differently:
//! - malformed input at the API boundary (bad policy shape, wrong message arity,
//!   undecodable representation), see [`Error::is_malformed_input`];
//! - cryptographic rejection ([`Error::VerificationFailure`]).
//!
//! Both mean "do not trust this proof".

use alloc::string::String;

/// Represents an invalid instance error.
#[derive(Debug, thiserror::Error)]
#[error("Invalid instance: {message}")]
pub struct InvalidInstance {
    /// The error message describing what's invalid about the instance.
    pub message: String,
}

impl InvalidInstance {
    /// Create a new InvalidInstance error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<InvalidInstance> for Error {
    fn from(_err: InvalidInstance) -> Self {
        Error::InvalidInstanceWitnessPair
    }
}

/// Represents an error encountered during the execution of a Sigma protocol.
///
/// This may occur during policy construction, proof generation, response computation,
/// or verification.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The proof is invalid: verification failed.
    #[error("Verification failed.")]
    VerificationFailure,
    /// Indicates an invalid statement/witness pair
    #[error("Invalid instance/witness pair.")]
    InvalidInstanceWitnessPair,
    /// Uninitialized group element variable.
    #[error("Uninitialized group element variable: {var_debug}")]
    UnassignedGroupVar {
        /// Debug representation of the unassigned variable.
        var_debug: String,
    },
    /// The available witnesses cannot satisfy the top-level threshold.
    #[error("Policy cannot be fulfilled with the given witnesses.")]
    PolicyUnfulfillable,
    /// The policy tree contains an unsupported node or an invalid threshold.
    #[error("Malformed policy: {0}")]
    MalformedPolicy(String),
    /// A message does not have the shape expected by the protocol.
    #[error("Malformed proof: {0}")]
    MalformedProof(String),
    /// A simulator was invoked with a challenge it cannot use.
    #[error("Simulation precondition violated: {0}")]
    SimulationPrecondition(String),
    /// A prover session was driven out of order.
    #[error("Protocol state violation: {0}")]
    ProtocolState(String),
    /// An equation references an unknown that has no assigned value.
    #[error("No value for unknown `{0}`")]
    UnknownVariable(String),
    /// A witness was supplied twice for the same leaf.
    #[error("Duplicate witness for leaf `{0}`")]
    DuplicateWitness(String),
    /// A name does not refer to any leaf of the policy tree.
    #[error("Unknown leaf `{0}`")]
    UnknownLeaf(String),
    /// A representation could not be turned back into a protocol message.
    #[error("Invalid representation: {0}")]
    Representation(String),
}

impl Error {
    /// Returns `true` for errors caused by malformed input at the API boundary,
    /// as opposed to a cryptographically invalid proof or a prover-side failure.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            Error::MalformedPolicy(_)
                | Error::MalformedProof(_)
                | Error::Representation(_)
                | Error::UnknownLeaf(_)
                | Error::DuplicateWitness(_)
        )
    }
}
