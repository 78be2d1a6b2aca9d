//! Threshold encryption over a mod-p Pedersen DKG.
//!
//! The scheme is a hybrid one:
//!
//! 1. **Encryption**: the message is XOR-masked with a hash pad derived from
//!    `Y^r`, and the ciphertext carries a Chaum-Pedersen binding of `r`
//!    under the generator pair, made non-interactive with Fiat-Shamir.
//! 2. **Decryption**: the ciphertext binding is checked first; every
//!    participant then produces a partial decryption `u^{x_i}` with a proof
//!    of correct computation; verified partials are Lagrange-combined at
//!    zero to rebuild the pad.
//!
//! Decryption is a staged state machine ([`Decryption`]); a failed check in
//! either verification stage moves it to the terminal `Rejected` state with
//! a recoverable error, never a wrong plaintext.

pub mod error;
pub mod threshold;

pub use error::CryptoError;
pub use threshold::{Decryption, DecryptionState, ThresholdCipher};
