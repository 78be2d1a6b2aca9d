//! End-to-end tests for the DKG and threshold encryption stack.
//!
//! These exercise the full protocol lifecycle:
//! 1. Every party deals a contribution
//! 2. Hosts verify the shares directed at them and build QUAL
//! 3. Qualified shares and commitments are aggregated and finalized
//! 4. Messages are encrypted under the joint key and threshold-decrypted

use num_bigint::{BigInt, BigUint};
use num_traits::One;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};

use pvss_crypto::ThresholdCipher;
use pvss_dkg::arith::pow_mod;
use pvss_dkg::{
    aggregate_public_key, aggregate_share, build_qual, qualified_shares, refine_qual_opened,
    Contribution, FinalState, Participant, ShareScheme,
};
use pvss_types::{CoefficientBounds, GroupParams, ThresholdParams};

/// The prime from the reference parameter set, 1024+ bits.
const REFERENCE_PRIME: &str = "157754757658850164039820501368692494984638811981595753785726084071390339342949827166074468203116945260071420591948184266427919389750857419939387549499186051557325946160152109714671771886387784860670680481921786590260608186162263954672484772147274284399498187140357851764561666898851637006570752518678867635307";

fn reference_bounds() -> CoefficientBounds {
    CoefficientBounds::new(10, 10000).unwrap()
}

fn feldman_scheme() -> ShareScheme {
    ShareScheme::new(
        GroupParams::new(BigUint::from(65537u32), vec![BigUint::from(42u32)]).unwrap(),
        ThresholdParams::new(5, 10).unwrap(),
        reference_bounds(),
    )
}

fn pedersen_scheme(p: BigUint) -> ShareScheme {
    ShareScheme::new(
        GroupParams::new(p, vec![BigUint::from(2u32), BigUint::from(3u32)]).unwrap(),
        ThresholdParams::new(5, 10).unwrap(),
        reference_bounds(),
    )
}

/// Deal, verify, qualify, aggregate, and finalize a full n-party run.
fn run_dkg<R: RngCore + CryptoRng>(
    scheme: &ShareScheme,
    rng: &mut R,
) -> (Vec<Contribution>, Vec<Participant>, Vec<usize>, BigUint) {
    let n = scheme.params.n;
    let contributions: Vec<Contribution> =
        (0..n).map(|dealer| scheme.deal(dealer, rng)).collect();

    // Every host sees the same honest contributions, so every host derives
    // the same qualified set.
    let qual = build_qual(scheme, &contributions, 0, None);
    for host in 1..n {
        assert_eq!(build_qual(scheme, &contributions, host, None), qual);
    }

    let p = &scheme.group.p;
    let public_key = aggregate_public_key(&qual, &contributions, p).unwrap();

    let participants: Vec<Participant> = (0..n)
        .map(|host| {
            let share = aggregate_share(&qual, &contributions, host, 0).unwrap();
            let blinding_share = (scheme.group.generators.len() > 1)
                .then(|| aggregate_share(&qual, &contributions, host, 1).unwrap());
            let audit = qualified_shares(&qual, &contributions, host, 0).unwrap();

            let participant = Participant::new(host);
            participant
                .finalize(FinalState {
                    share,
                    blinding_share,
                    public_key: public_key.clone(),
                    qualified_shares: audit,
                })
                .unwrap();
            participant
        })
        .collect();

    (contributions, participants, qual, public_key)
}

/// Lagrange coefficient at zero over 1-based evaluation points, with the
/// protocol's truncating integer division.
fn lagrange_at_zero(points: &[usize], i: usize) -> BigInt {
    let mut numerator = BigInt::one();
    let mut denominator = BigInt::one();
    for &j in points {
        if j == i {
            continue;
        }
        numerator *= -BigInt::from(j as i64 + 1);
        denominator *= BigInt::from(i as i64) - BigInt::from(j as i64);
    }
    numerator / denominator
}

#[test]
fn feldman_scenario_qualifies_all_honest_dealers() {
    let scheme = feldman_scheme();
    let contributions: Vec<Contribution> =
        (0..10).map(|dealer| scheme.deal(dealer, &mut OsRng)).collect();

    // Every directed share against every dealer's commitments.
    for contribution in &contributions {
        for host in 0..10u32 {
            let shares = contribution.directed_shares(host as usize);
            assert!(
                scheme.verify_share(host + 1, &shares, &contribution.commitments),
                "share from dealer {} to host {} failed",
                contribution.dealer,
                host
            );
        }
    }

    let qual = build_qual(&scheme, &contributions, 0, None);
    assert!(qual.len() >= scheme.params.t as usize);
    assert_eq!(qual, (0..contributions.len()).collect::<Vec<_>>());

    // The joint public key is the product of the qualified dealers' first
    // commitments.
    let p = &scheme.group.p;
    let key = aggregate_public_key(&qual, &contributions, p).unwrap();
    let expected = qual.iter().fold(BigUint::one(), |acc, &j| {
        (acc * &contributions[j].commitments[0]) % p
    });
    assert_eq!(key, expected);
}

#[test]
fn qualified_subsets_reconstruct_the_joint_secret() {
    let scheme = feldman_scheme();
    let (_contributions, participants, qual, public_key) = run_dkg(&scheme, &mut OsRng);

    let p = &scheme.group.p;
    let g = &scheme.group.generators[0];

    // Any t consecutive finalized shares interpolate back to the combined
    // secret; check it in the exponent against the joint public key.
    for subset in [&qual[..5], &qual[5..]] {
        let joint: BigInt = subset
            .iter()
            .map(|&i| {
                let share = &participants[i].final_state().unwrap().share;
                lagrange_at_zero(subset, i) * BigInt::from(share.clone())
            })
            .sum();
        let joint = joint.to_biguint().expect("joint secret is non-negative");
        assert_eq!(pow_mod(g, &joint, p), public_key);
    }
}

#[test]
fn pedersen_roundtrip_small_modulus() {
    let scheme = pedersen_scheme(BigUint::from(65537u32));
    let (contributions, participants, qual, public_key) = run_dkg(&scheme, &mut OsRng);

    // The opened-phase re-check keeps every honest dealer.
    for host in 0..scheme.params.n {
        assert_eq!(
            refine_qual_opened(&scheme, &qual, &contributions, host),
            qual
        );
    }

    let engine = ThresholdCipher::new(scheme.group.clone()).unwrap();
    let m = BigUint::from(3735928559u64);
    let label = BigUint::from(30u32);

    let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);
    let recovered = engine
        .decrypt(ciphertext, &participants, &qual, &mut OsRng)
        .unwrap();
    assert_eq!(recovered, m);
}

#[test]
fn pedersen_roundtrip_reference_prime() {
    let p = BigUint::parse_bytes(REFERENCE_PRIME.as_bytes(), 10).unwrap();
    let scheme = pedersen_scheme(p);
    let (_contributions, participants, qual, public_key) = run_dkg(&scheme, &mut OsRng);

    let engine = ThresholdCipher::new(scheme.group.clone()).unwrap();
    let m = BigUint::from(203213123u32);
    let label = BigUint::from(30u32);

    let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);
    let recovered = engine
        .decrypt(ciphertext, &participants, &qual, &mut OsRng)
        .unwrap();
    assert_eq!(recovered, m);
}

#[test]
fn finalized_state_records_the_audit_shares() {
    let scheme = pedersen_scheme(BigUint::from(65537u32));
    let (contributions, participants, qual, _public_key) = run_dkg(&scheme, &mut OsRng);

    for (host, participant) in participants.iter().enumerate() {
        let state = participant.final_state().unwrap();
        assert!(state.blinding_share.is_some());
        assert_eq!(state.qualified_shares.len(), qual.len());
        for (slot, &dealer) in state.qualified_shares.iter().zip(&qual) {
            assert_eq!(slot, contributions[dealer].directed_share(0, host));
        }
    }
}
