//! Arithmetic primitives: modular exponentiation, hashing to integers, and
//! randomness sampling.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use pvss_types::CoefficientBounds;

/// Modular exponentiation with the base reduced up front.
///
/// Callers may pass bases larger than `p`; reduction happens here, never in
/// the caller.
pub fn pow_mod(base: &BigUint, exp: &BigUint, p: &BigUint) -> BigUint {
    (base % p).modpow(exp, p)
}

/// Concatenate the big-endian bytes of `parts`, digest with SHA-256, and
/// read the digest back as an unsigned integer reduced mod `p`.
///
/// Every Fiat-Shamir challenge in the protocol is derived through this
/// function, on the proving and the verifying side alike.
pub fn hash_to_int(parts: &[&BigUint], p: &BigUint) -> BigUint {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.to_bytes_be());
    }
    BigUint::from_bytes_be(&hasher.finalize()) % p
}

/// Modular inverse via the extended Euclidean algorithm.
///
/// Returns `None` when `a` and `p` are not coprime.
pub fn mod_inverse(a: &BigUint, p: &BigUint) -> Option<BigUint> {
    let a = BigInt::from(a.clone());
    let m = BigInt::from(p.clone());
    let gcd = a.extended_gcd(&m);
    if !gcd.gcd.is_one() {
        return None;
    }
    gcd.x.mod_floor(&m).to_biguint()
}

/// Sample `count` polynomial coefficients uniformly from `[lower, upper)`.
pub fn sample_coefficients<R: RngCore + CryptoRng>(
    rng: &mut R,
    count: usize,
    bounds: &CoefficientBounds,
) -> Vec<BigUint> {
    let lower = BigUint::from(bounds.lower);
    let upper = BigUint::from(bounds.upper);
    (0..count)
        .map(|_| rng.gen_biguint_range(&lower, &upper))
        .collect()
}

/// Sample a blinding exponent uniformly from `[1, p)`.
pub fn sample_exponent<R: RngCore + CryptoRng>(rng: &mut R, p: &BigUint) -> BigUint {
    rng.gen_biguint_range(&BigUint::one(), p)
}
