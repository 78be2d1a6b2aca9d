//! Distributed Key Generation over a prime mod-p group.
//!
//! Implements a (t, n) threshold key generation protocol using Verifiable
//! Secret Sharing:
//!
//! 1. Each dealer samples a random polynomial of degree t-1
//! 2. Directed shares `f(1), ..., f(n)` are handed to the participants
//! 3. Participants verify the shares against polynomial commitments
//! 4. Each participant selects its qualified set (QUAL) and combines the
//!    qualified shares into its final secret share
//! 5. The joint public key is combined from the qualified commitments
//!
//! Both commitment variants are instances of one scheme parameterized by a
//! generator list: a single generator gives Feldman commitments, a generator
//! pair gives Pedersen commitments over two independent polynomials.
//!
//! # Security
//!
//! - Shares verify against commitments without revealing the dealt secret
//! - Privacy holds against up to t-1 colluding participants
//! - The Pedersen pair adds unconditional hiding of the secret

pub mod arith;
pub mod participant;
pub mod qual;
pub mod scheme;

use thiserror::Error;

pub use participant::{FinalState, Participant};
pub use qual::{
    aggregate_public_key, aggregate_share, build_qual, qualified_shares, refine_qual_opened,
};
pub use scheme::{Contribution, ShareScheme};

/// Errors during the QUAL and finalization phases.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DkgError {
    /// Aggregation attempted over an empty qualified set.
    #[error("no qualified contributions to aggregate")]
    EmptyQual,

    /// A QUAL index points past the collected contributions.
    #[error("contribution {0} missing from the collected set")]
    MissingContribution(usize),

    /// `finalize` called a second time on the same participant.
    #[error("participant {0} already finalized")]
    AlreadyFinalized(u32),

    /// Finalized state read before aggregation completed.
    #[error("participant {0} not finalized yet")]
    NotFinalized(u32),
}
