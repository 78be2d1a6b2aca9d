//! Core type definitions for the threshold DKG and encryption stack.
//!
//! This crate provides the shared data structures used across the system:
//! group and threshold parameters, coefficient sampling bounds, and the two
//! structures that cross party boundaries: the ciphertext and the partial
//! decryption share.

use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while validating protocol parameters.
///
/// All of these are rejected at construction, before any dealer exists.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("threshold {t} out of range for {n} participants")]
    InvalidThreshold { t: u32, n: u32 },

    #[error("modulus must be greater than 1")]
    InvalidModulus,

    #[error("at least one generator is required")]
    NoGenerators,

    #[error("empty coefficient range [{lower}, {upper})")]
    EmptyCoefficientRange { lower: u64, upper: u64 },
}

// =========================
// PROTOCOL PARAMETERS
// =========================

/// The working group: a prime modulus and an ordered list of generators.
///
/// One generator selects Feldman commitments, a generator pair selects
/// Pedersen commitments. The threshold encryption engine requires the pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupParams {
    /// Prime modulus; every group operation is exponentiation mod `p`.
    pub p: BigUint,
    /// Commitment generators, in scheme order (`g` first, then `h`).
    pub generators: Vec<BigUint>,
}

impl GroupParams {
    pub fn new(p: BigUint, generators: Vec<BigUint>) -> Result<Self, ParameterError> {
        if p <= BigUint::one() {
            return Err(ParameterError::InvalidModulus);
        }
        if generators.is_empty() {
            return Err(ParameterError::NoGenerators);
        }
        Ok(Self { p, generators })
    }
}

/// Threshold configuration for a (t, n) run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdParams {
    /// Reconstruction threshold: t commitments, polynomial degree t - 1.
    pub t: u32,
    /// Number of participants.
    pub n: u32,
}

impl ThresholdParams {
    pub fn new(t: u32, n: u32) -> Result<Self, ParameterError> {
        if t == 0 || t > n {
            return Err(ParameterError::InvalidThreshold { t, n });
        }
        Ok(Self { t, n })
    }
}

/// Half-open range `[lower, upper)` that dealer polynomial coefficients are
/// drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientBounds {
    pub lower: u64,
    pub upper: u64,
}

impl CoefficientBounds {
    pub fn new(lower: u64, upper: u64) -> Result<Self, ParameterError> {
        if lower >= upper {
            return Err(ParameterError::EmptyCoefficientRange { lower, upper });
        }
        Ok(Self { lower, upper })
    }
}

// =========================
// WIRE STRUCTURES
// =========================

/// A labeled hybrid ciphertext with its Fiat-Shamir binding.
///
/// The proof commitments `w`, `w̄` are not carried; verifiers recompute them
/// from `u`, `ū`, `e`, `f`. This is the only structure in the core intended
/// to cross a process boundary: a flat six-tuple of big integers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    /// Masked message: the hash pad of `Y^r` XORed with the plaintext.
    pub c: BigUint,
    /// Associated label, bound by the challenge.
    pub label: BigUint,
    /// `g^r mod p`.
    pub u: BigUint,
    /// `h^r mod p`.
    pub u_bar: BigUint,
    /// Fiat-Shamir challenge over `(c, L, u, w, ū, w̄)`.
    pub e: BigUint,
    /// Response `s + r·e`, over the integers.
    pub f: BigUint,
}

/// One participant's partial decryption with its Chaum-Pedersen proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionShare {
    /// 0-based participant index.
    pub index: usize,
    /// Partial decryption `u^{x_i} mod p`.
    pub u_i: BigUint,
    /// Proof challenge.
    pub e_i: BigUint,
    /// Proof response `s_i + x_i·e_i`, over the integers.
    pub f_i: BigUint,
}
