//! Verifiable Secret Sharing: the dealer and the commitment verifier.
//!
//! One `ShareScheme` covers both commitment variants. With a single
//! generator it deals Feldman commitments `g^{a_i} mod p`; with a generator
//! pair it deals Pedersen commitments `g^{a_i} · h^{b_i} mod p` over two
//! independently sampled polynomials.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::warn;

use pvss_types::{CoefficientBounds, GroupParams, ThresholdParams};

use crate::arith;

/// Dealer-side configuration: group, threshold, and sampling bounds.
#[derive(Debug, Clone)]
pub struct ShareScheme {
    pub group: GroupParams,
    pub params: ThresholdParams,
    pub bounds: CoefficientBounds,
}

/// One dealer's output for a DKG run. Immutable once dealt.
#[derive(Debug, Clone)]
pub struct Contribution {
    /// Index of the dealer that produced this contribution.
    pub dealer: u32,
    /// Directed shares, one vector per generator polynomial:
    /// `shares[k][i]` is `f_k(i + 1)`, evaluated over the integers.
    shares: Vec<Vec<BigUint>>,
    /// Per-generator commitment vectors; row 0 is the g-component.
    pub generator_commitments: Vec<Vec<BigUint>>,
    /// Published commitments: the pointwise product of the per-generator
    /// rows mod p. Equal to row 0 under a single generator.
    pub commitments: Vec<BigUint>,
}

impl Contribution {
    /// The share of polynomial `poly` addressed to the 0-based `host`.
    pub fn directed_share(&self, poly: usize, host: usize) -> &BigUint {
        &self.shares[poly][host]
    }

    /// All shares addressed to `host`, one per polynomial.
    pub fn directed_shares(&self, host: usize) -> Vec<BigUint> {
        self.shares.iter().map(|row| row[host].clone()).collect()
    }
}

/// Evaluate `f(z) = Σ a_i · z^i` over the integers, by Horner's rule.
///
/// Shares are never reduced mod p; reduction happens only inside the modular
/// exponentiations that consume them.
fn evaluate_polynomial(coefficients: &[BigUint], z: &BigUint) -> BigUint {
    coefficients
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, a| acc * z + a)
}

impl ShareScheme {
    pub fn new(group: GroupParams, params: ThresholdParams, bounds: CoefficientBounds) -> Self {
        Self { group, params, bounds }
    }

    /// Deal one contribution: sample coefficients, evaluate the directed
    /// shares, and commit the coefficients under every generator.
    ///
    /// The coefficients never leave this function.
    pub fn deal<R: RngCore + CryptoRng>(&self, dealer: u32, rng: &mut R) -> Contribution {
        let t = self.params.t as usize;
        let n = self.params.n as usize;
        let p = &self.group.p;

        // One raw draw per participant; only the first t become polynomial
        // coefficients, so the dealt degree is exactly t - 1.
        let polynomials: Vec<Vec<BigUint>> = (0..self.group.generators.len())
            .map(|_| {
                let mut raw = arith::sample_coefficients(rng, n, &self.bounds);
                raw.truncate(t);
                raw
            })
            .collect();

        let shares: Vec<Vec<BigUint>> = polynomials
            .iter()
            .map(|coefficients| {
                (0..n)
                    .into_par_iter()
                    .map(|i| evaluate_polynomial(coefficients, &BigUint::from(i + 1)))
                    .collect()
            })
            .collect();

        let generator_commitments: Vec<Vec<BigUint>> = self
            .group
            .generators
            .iter()
            .zip(&polynomials)
            .map(|(generator, coefficients)| {
                coefficients
                    .par_iter()
                    .map(|a| arith::pow_mod(generator, a, p))
                    .collect()
            })
            .collect();

        let commitments: Vec<BigUint> = (0..t)
            .into_par_iter()
            .map(|i| {
                generator_commitments
                    .iter()
                    .map(|row| &row[i])
                    .fold(BigUint::one(), |acc, c| (acc * c) % p)
            })
            .collect();

        Contribution { dealer, shares, generator_commitments, commitments }
    }

    /// Check a directed share tuple against a dealer's published commitments.
    ///
    /// `j` is the 1-based evaluation point of the share; `shares` carries one
    /// value per generator polynomial. The check is
    /// `Π_k gen_k^{share_k} mod p == Π_i commitments[i]^{j^i} mod p`.
    ///
    /// Malformed input (out-of-range `j`, wrong vector lengths) yields
    /// `false` like a failed proof, with a structured warning to tell the
    /// two apart; the QUAL path relies on being able to continue past either.
    pub fn verify_share(&self, j: u32, shares: &[BigUint], commitments: &[BigUint]) -> bool {
        if !self.well_formed(j, commitments) {
            return false;
        }
        if shares.len() != self.group.generators.len() {
            warn!(
                got = shares.len(),
                expected = self.group.generators.len(),
                "share tuple arity mismatch"
            );
            return false;
        }

        let p = &self.group.p;
        let lhs = self
            .group
            .generators
            .iter()
            .zip(shares)
            .fold(BigUint::one(), |acc, (generator, share)| {
                (acc * arith::pow_mod(generator, share, p)) % p
            });

        lhs == self.commitment_evaluation(j, commitments)
    }

    /// g-component-only check used once a secret share has been opened in
    /// the final reconstruction phase. `g_commitments` is the generator-0
    /// commitment row of the dealer under audit.
    pub fn verify_opened_share(&self, j: u32, share: &BigUint, g_commitments: &[BigUint]) -> bool {
        if !self.well_formed(j, g_commitments) {
            return false;
        }
        let p = &self.group.p;
        let lhs = arith::pow_mod(&self.group.generators[0], share, p);
        lhs == self.commitment_evaluation(j, g_commitments)
    }

    fn well_formed(&self, j: u32, commitments: &[BigUint]) -> bool {
        if j == 0 || j > self.params.n {
            warn!(target_index = j, n = self.params.n, "share index out of range");
            return false;
        }
        if commitments.len() != self.params.t as usize {
            warn!(
                got = commitments.len(),
                expected = self.params.t,
                "commitment vector length mismatch"
            );
            return false;
        }
        true
    }

    /// `Π_i commitments[i]^{j^i} mod p`: the committed polynomial evaluated
    /// in the exponent at point `j`.
    fn commitment_evaluation(&self, j: u32, commitments: &[BigUint]) -> BigUint {
        let p = &self.group.p;
        let j = BigUint::from(j);
        let mut j_pow = BigUint::one();
        let mut acc = BigUint::one();
        for commitment in commitments {
            acc = (acc * arith::pow_mod(commitment, &j_pow, p)) % p;
            j_pow *= &j;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn feldman_scheme() -> ShareScheme {
        ShareScheme::new(
            GroupParams::new(BigUint::from(65537u32), vec![BigUint::from(42u32)]).unwrap(),
            ThresholdParams::new(5, 10).unwrap(),
            CoefficientBounds::new(10, 10000).unwrap(),
        )
    }

    fn pedersen_scheme() -> ShareScheme {
        ShareScheme::new(
            GroupParams::new(
                BigUint::from(65537u32),
                vec![BigUint::from(2u32), BigUint::from(3u32)],
            )
            .unwrap(),
            ThresholdParams::new(5, 10).unwrap(),
            CoefficientBounds::new(10, 10000).unwrap(),
        )
    }

    #[test]
    fn polynomial_evaluation() {
        // f(x) = 5 + 3x + 2x^2
        let coefficients = vec![
            BigUint::from(5u32),
            BigUint::from(3u32),
            BigUint::from(2u32),
        ];
        assert_eq!(
            evaluate_polynomial(&coefficients, &BigUint::zero()),
            BigUint::from(5u32)
        );
        assert_eq!(
            evaluate_polynomial(&coefficients, &BigUint::one()),
            BigUint::from(10u32)
        );
        assert_eq!(
            evaluate_polynomial(&coefficients, &BigUint::from(2u32)),
            BigUint::from(19u32)
        );
    }

    #[test]
    fn every_feldman_share_verifies() {
        let scheme = feldman_scheme();
        let contribution = scheme.deal(0, &mut OsRng);

        assert_eq!(contribution.commitments.len(), 5);
        for host in 0..10 {
            let shares = contribution.directed_shares(host);
            assert!(scheme.verify_share(host as u32 + 1, &shares, &contribution.commitments));
        }
    }

    #[test]
    fn every_pedersen_share_verifies() {
        let scheme = pedersen_scheme();
        let contribution = scheme.deal(0, &mut OsRng);

        for host in 0..10 {
            let shares = contribution.directed_shares(host);
            assert_eq!(shares.len(), 2);
            assert!(scheme.verify_share(host as u32 + 1, &shares, &contribution.commitments));
        }
    }

    #[test]
    fn feldman_combined_commitments_equal_g_row() {
        let scheme = feldman_scheme();
        let contribution = scheme.deal(0, &mut OsRng);
        assert_eq!(contribution.commitments, contribution.generator_commitments[0]);
    }

    #[test]
    fn tampered_share_fails_verification() {
        let scheme = pedersen_scheme();
        let contribution = scheme.deal(0, &mut OsRng);

        let mut shares = contribution.directed_shares(3);
        // Flip a single bit of the first share.
        let tampered = &shares[0] ^ BigUint::one();
        shares[0] = tampered;
        assert!(!scheme.verify_share(4, &shares, &contribution.commitments));
    }

    #[test]
    fn tampered_commitment_fails_verification() {
        let scheme = feldman_scheme();
        let contribution = scheme.deal(0, &mut OsRng);

        let mut commitments = contribution.commitments.clone();
        let tampered = &commitments[2] ^ BigUint::one();
        commitments[2] = tampered;
        let shares = contribution.directed_shares(0);
        assert!(!scheme.verify_share(1, &shares, &commitments));
    }

    #[test]
    fn malformed_input_is_rejected() {
        let scheme = pedersen_scheme();
        let contribution = scheme.deal(0, &mut OsRng);
        let shares = contribution.directed_shares(0);

        // Evaluation point out of range.
        assert!(!scheme.verify_share(0, &shares, &contribution.commitments));
        assert!(!scheme.verify_share(11, &shares, &contribution.commitments));
        // Truncated commitment vector.
        assert!(!scheme.verify_share(1, &shares, &contribution.commitments[..4]));
        // Missing blinding share.
        assert!(!scheme.verify_share(1, &shares[..1], &contribution.commitments));
    }

    #[test]
    fn opened_share_verifies_against_g_row() {
        let scheme = pedersen_scheme();
        let contribution = scheme.deal(0, &mut OsRng);

        for host in 0..10 {
            let share = contribution.directed_share(0, host);
            assert!(scheme.verify_opened_share(
                host as u32 + 1,
                share,
                &contribution.generator_commitments[0]
            ));
        }
        // The combined commitments carry the blinding component and must not
        // pass the opened check.
        assert!(!scheme.verify_opened_share(
            1,
            contribution.directed_share(0, 0),
            &contribution.commitments
        ));
    }
}
