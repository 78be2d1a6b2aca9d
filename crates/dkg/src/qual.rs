//! QUAL selection and contribution aggregation.
//!
//! A host verifies the share each dealer directed at it, keeps the dealers
//! whose shares verify, and folds the qualified contributions into its final
//! secret share and the joint public key.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::scheme::{Contribution, ShareScheme};
use crate::DkgError;

/// Select the contributors whose share directed at `host` verifies against
/// their own published commitments.
///
/// `host` is 0-based; the directed share is the evaluation at `host + 1`.
/// The result is in ascending contributor order and duplicate-free;
/// `cap` truncates it to the first `cap` successes. Verification across
/// contributors has no cross-index dependency and runs in parallel.
pub fn build_qual(
    scheme: &ShareScheme,
    contributions: &[Contribution],
    host: u32,
    cap: Option<usize>,
) -> Vec<usize> {
    if host >= scheme.params.n {
        warn!(host, n = scheme.params.n, "host index out of range");
        return Vec::new();
    }
    let point = host + 1;

    let mut qual: Vec<usize> = contributions
        .par_iter()
        .enumerate()
        .filter_map(|(index, contribution)| {
            let shares = contribution.directed_shares(host as usize);
            if scheme.verify_share(point, &shares, &contribution.commitments) {
                Some(index)
            } else {
                warn!(dealer = contribution.dealer, host, "contribution rejected");
                None
            }
        })
        .collect();

    if let Some(cap) = cap {
        qual.truncate(cap);
    }
    debug!(host, qualified = qual.len(), "qual set built");
    qual
}

/// Re-filter a QUAL set with the opened-share check (g component only),
/// once secrets have been opened for final reconstruction.
pub fn refine_qual_opened(
    scheme: &ShareScheme,
    qual: &[usize],
    contributions: &[Contribution],
    host: u32,
) -> Vec<usize> {
    let point = host + 1;
    qual.par_iter()
        .copied()
        .filter(|&j| match contributions.get(j) {
            Some(contribution) => scheme.verify_opened_share(
                point,
                contribution.directed_share(0, host as usize),
                &contribution.generator_commitments[0],
            ),
            None => false,
        })
        .collect()
}

/// Fold the qualified directed shares of polynomial `poly` into the host's
/// final share.
///
/// The sum is taken over the integers, never reduced mod p: share values
/// end up as exponents, which live mod the generator order rather than mod
/// p, so reducing here would corrupt reconstruction under small moduli.
pub fn aggregate_share(
    qual: &[usize],
    contributions: &[Contribution],
    host: u32,
    poly: usize,
) -> Result<BigUint, DkgError> {
    if qual.is_empty() {
        return Err(DkgError::EmptyQual);
    }
    let mut acc = BigUint::zero();
    for &j in qual {
        let contribution = contributions.get(j).ok_or(DkgError::MissingContribution(j))?;
        acc += contribution.directed_share(poly, host as usize);
    }
    Ok(acc)
}

/// The qualified directed shares themselves, in QUAL order; the audit record
/// a participant keeps alongside its aggregated share.
pub fn qualified_shares(
    qual: &[usize],
    contributions: &[Contribution],
    host: u32,
    poly: usize,
) -> Result<Vec<BigUint>, DkgError> {
    if qual.is_empty() {
        return Err(DkgError::EmptyQual);
    }
    qual.iter()
        .map(|&j| {
            contributions
                .get(j)
                .map(|c| c.directed_share(poly, host as usize).clone())
                .ok_or(DkgError::MissingContribution(j))
        })
        .collect()
}

/// Combine the qualified dealers' constant-term g-commitments into the
/// joint public key `Π_j g^{a_0^{(j)}} mod p`.
pub fn aggregate_public_key(
    qual: &[usize],
    contributions: &[Contribution],
    p: &BigUint,
) -> Result<BigUint, DkgError> {
    if qual.is_empty() {
        return Err(DkgError::EmptyQual);
    }
    let mut acc = BigUint::one();
    for &j in qual {
        let contribution = contributions.get(j).ok_or(DkgError::MissingContribution(j))?;
        acc = (acc * &contribution.generator_commitments[0][0]) % p;
    }
    Ok(acc)
}
