//! Per-party finalized DKG state.

use std::sync::OnceLock;

use num_bigint::BigUint;
use tracing::debug;

use crate::DkgError;

/// State fixed once QUAL selection and aggregation complete.
///
/// Written exactly once per run; the encryption engine reads it thereafter.
#[derive(Debug, Clone)]
pub struct FinalState {
    /// Aggregated share of the secret polynomial (generator 0).
    pub share: BigUint,
    /// Aggregated share of the blinding polynomial, when the scheme carries
    /// a second generator.
    pub blinding_share: Option<BigUint>,
    /// The joint public key.
    pub public_key: BigUint,
    /// The qualified directed shares that went into the aggregate, kept for
    /// the opened-phase audit checks.
    pub qualified_shares: Vec<BigUint>,
}

/// One party's view of a run: its index and, after aggregation, its
/// write-once finalized state.
///
/// The cell makes the single-writer invariant explicit: a second `finalize`
/// is an error, and readers can never observe a partially written value.
#[derive(Debug)]
pub struct Participant {
    pub index: u32,
    state: OnceLock<FinalState>,
}

impl Participant {
    pub fn new(index: u32) -> Self {
        Self { index, state: OnceLock::new() }
    }

    /// Set the finalized state. Callable exactly once, post-aggregation.
    pub fn finalize(&self, state: FinalState) -> Result<(), DkgError> {
        self.state
            .set(state)
            .map_err(|_| DkgError::AlreadyFinalized(self.index))?;
        debug!(participant = self.index, "final state set");
        Ok(())
    }

    /// The finalized state, once aggregation has completed.
    pub fn final_state(&self) -> Result<&FinalState, DkgError> {
        self.state.get().ok_or(DkgError::NotFinalized(self.index))
    }
}
