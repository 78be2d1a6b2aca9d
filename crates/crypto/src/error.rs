//! Error types for the threshold encryption engine.

use thiserror::Error;

use crate::threshold::DecryptionState;

/// Errors that can occur during encryption or threshold decryption.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The engine is built atop the Pedersen variant and needs a generator
    /// pair.
    #[error("threshold encryption requires two generators, got {0}")]
    MissingSecondGenerator(usize),

    /// Recomputing the ciphertext challenge did not reproduce `e`.
    #[error("ciphertext rejected: challenge mismatch")]
    CiphertextInvalid,

    /// A decryption share's proof failed for the given participant.
    #[error("decryption share {0} rejected: proof mismatch")]
    ShareInvalid(usize),

    /// Reconstruction attempted with no qualified participants.
    #[error("no qualified participants for reconstruction")]
    EmptyQual,

    /// A stage method was called out of order.
    #[error("decryption step not valid in state {0:?}")]
    InvalidState(DecryptionState),

    /// A QUAL index with no matching participant or share.
    #[error("no participant at index {0}")]
    UnknownParticipant(usize),

    /// Group element with no inverse mod p.
    #[error("element not invertible modulo p")]
    NotInvertible,

    /// A participant's DKG state was not usable.
    #[error(transparent)]
    Dkg(#[from] pvss_dkg::DkgError),
}
