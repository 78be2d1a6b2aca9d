//! Hybrid encryption with verifiable threshold decryption.
//!
//! Encryption masks the message with a hash pad of `Y^r` and binds the
//! ciphertext components with a Fiat-Shamir challenge over the Chaum-Pedersen
//! commitments `(w, w̄)`, which are recomputed by verifiers rather than
//! transmitted. Decryption walks four stages per ciphertext: challenge
//! verification, partial-decryption computation, share-proof verification,
//! and Lagrange reconstruction of the pad.

use num_bigint::{BigInt, BigUint};
use num_traits::{One, Signed};
use rand::{CryptoRng, RngCore};
use rayon::prelude::*;
use tracing::{debug, warn};

use pvss_dkg::arith::{hash_to_int, mod_inverse, pow_mod, sample_exponent};
use pvss_dkg::Participant;
use pvss_types::{Ciphertext, DecryptionShare, GroupParams};

use crate::error::CryptoError;

/// Threshold encryption engine bound to a Pedersen generator pair.
#[derive(Debug, Clone)]
pub struct ThresholdCipher {
    group: GroupParams,
}

impl ThresholdCipher {
    /// Create an engine over `group`, which must carry the generator pair.
    pub fn new(group: GroupParams) -> Result<Self, CryptoError> {
        if group.generators.len() < 2 {
            return Err(CryptoError::MissingSecondGenerator(group.generators.len()));
        }
        Ok(Self { group })
    }

    pub fn group(&self) -> &GroupParams {
        &self.group
    }

    fn modulus(&self) -> &BigUint {
        &self.group.p
    }

    fn g(&self) -> &BigUint {
        &self.group.generators[0]
    }

    fn h(&self) -> &BigUint {
        &self.group.generators[1]
    }

    /// Encrypt `m` under the joint public key with an associated label.
    pub fn encrypt<R: RngCore + CryptoRng>(
        &self,
        m: &BigUint,
        label: &BigUint,
        public_key: &BigUint,
        rng: &mut R,
    ) -> Ciphertext {
        let p = self.modulus();
        let r = sample_exponent(rng, p);
        let s = sample_exponent(rng, p);

        let pad = hash_to_int(&[&pow_mod(public_key, &r, p)], p);
        let c = pad ^ m;

        let u = pow_mod(self.g(), &r, p);
        let w = pow_mod(self.g(), &s, p);
        let u_bar = pow_mod(self.h(), &r, p);
        let w_bar = pow_mod(self.h(), &s, p);

        let e = hash_to_int(&[&c, label, &u, &w, &u_bar, &w_bar], p);
        // The response stays over the integers; it is never reduced.
        let f = s + &r * &e;

        debug!("ciphertext produced");
        Ciphertext { c, label: label.clone(), u, u_bar, e, f }
    }

    /// Run a full decryption: ciphertext check, share computation, share
    /// verification, reconstruction.
    pub fn decrypt<R: RngCore + CryptoRng>(
        &self,
        ciphertext: Ciphertext,
        participants: &[Participant],
        qual: &[usize],
        rng: &mut R,
    ) -> Result<BigUint, CryptoError> {
        let mut decryption = Decryption::new(ciphertext);
        decryption.verify_ciphertext(self)?;
        decryption.compute_shares(self, participants, rng)?;
        decryption.verify_shares(self, participants)?;
        decryption.reconstruct(self, qual)
    }
}

/// Stages of one threshold decryption attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptionState {
    /// Checking the ciphertext's Fiat-Shamir binding.
    VerifyingCiphertext,
    /// Producing proven partial decryptions.
    ComputingShares,
    /// Checking every share's Chaum-Pedersen proof.
    VerifyingShares,
    /// Lagrange-combining the qualified partials.
    Reconstructing,
    /// Plaintext recovered.
    Done,
    /// A verification stage failed; terminal.
    Rejected,
}

/// One decryption attempt, driven through the protocol stages in order.
#[derive(Debug)]
pub struct Decryption {
    ciphertext: Ciphertext,
    state: DecryptionState,
    shares: Vec<DecryptionShare>,
}

impl Decryption {
    pub fn new(ciphertext: Ciphertext) -> Self {
        Self {
            ciphertext,
            state: DecryptionState::VerifyingCiphertext,
            shares: Vec::new(),
        }
    }

    pub fn state(&self) -> DecryptionState {
        self.state
    }

    /// The partial decryptions computed so far.
    pub fn shares(&self) -> &[DecryptionShare] {
        &self.shares
    }

    fn expect_state(&self, expected: DecryptionState) -> Result<(), CryptoError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(CryptoError::InvalidState(self.state))
        }
    }

    /// Stage 1: recompute the proof commitments `(w, w̄)` from the response
    /// and check the challenge that binds the ciphertext.
    pub fn verify_ciphertext(&mut self, engine: &ThresholdCipher) -> Result<(), CryptoError> {
        self.expect_state(DecryptionState::VerifyingCiphertext)?;
        let p = engine.modulus();
        let ct = &self.ciphertext;

        let recombined = recombine(engine.g(), &ct.f, &ct.u, &ct.e, p)
            .zip(recombine(engine.h(), &ct.f, &ct.u_bar, &ct.e, p));
        let matches = match recombined {
            // A ciphertext whose components are not units is as invalid as
            // one whose challenge fails to reproduce.
            None => false,
            Some((w, w_bar)) => {
                hash_to_int(&[&ct.c, &ct.label, &ct.u, &w, &ct.u_bar, &w_bar], p) == ct.e
            }
        };

        if !matches {
            warn!("ciphertext challenge mismatch");
            self.state = DecryptionState::Rejected;
            return Err(CryptoError::CiphertextInvalid);
        }
        self.state = DecryptionState::ComputingShares;
        Ok(())
    }

    /// Stage 2: compute a proven partial decryption for every participant.
    ///
    /// Per-participant work has no cross-index dependency and runs in
    /// parallel; only the nonce draws are serialized on the caller's rng.
    pub fn compute_shares<R: RngCore + CryptoRng>(
        &mut self,
        engine: &ThresholdCipher,
        participants: &[Participant],
        rng: &mut R,
    ) -> Result<(), CryptoError> {
        self.expect_state(DecryptionState::ComputingShares)?;
        let p = engine.modulus();
        let u = &self.ciphertext.u;

        let nonces: Vec<BigUint> = participants
            .iter()
            .map(|_| sample_exponent(rng, p))
            .collect();

        let shares: Result<Vec<DecryptionShare>, CryptoError> = participants
            .par_iter()
            .zip(nonces.par_iter())
            .enumerate()
            .map(|(index, (participant, s_i))| {
                let x_i = &participant.final_state()?.share;
                let u_i = pow_mod(u, x_i, p);
                let u_bar_i = pow_mod(u, s_i, p);
                let h_bar_i = pow_mod(engine.g(), s_i, p);
                let e_i = hash_to_int(&[&u_i, &u_bar_i, &h_bar_i], p);
                let f_i = s_i + x_i * &e_i;
                Ok(DecryptionShare { index, u_i, e_i, f_i })
            })
            .collect();

        self.shares = shares?;
        debug!(shares = self.shares.len(), "decryption shares computed");
        self.state = DecryptionState::VerifyingShares;
        Ok(())
    }

    /// Stage 3: verify every share's Chaum-Pedersen proof.
    ///
    /// The check recomputes `h_i = g^{x_i}` from the verifier's own copy of
    /// participant i's finalized share; a hardened deployment must take
    /// `h_i` from a previously broadcast commitment instead.
    pub fn verify_shares(
        &mut self,
        engine: &ThresholdCipher,
        participants: &[Participant],
    ) -> Result<(), CryptoError> {
        self.expect_state(DecryptionState::VerifyingShares)?;
        let p = engine.modulus();
        let u = &self.ciphertext.u;

        let outcome = self.shares.par_iter().try_for_each(|share| {
            let participant = participants
                .get(share.index)
                .ok_or(CryptoError::UnknownParticipant(share.index))?;
            let x_i = &participant.final_state()?.share;
            let h_i = pow_mod(engine.g(), x_i, p);

            let recombined = recombine(u, &share.f_i, &share.u_i, &share.e_i, p)
                .zip(recombine(engine.g(), &share.f_i, &h_i, &share.e_i, p));
            let matches = match recombined {
                None => false,
                Some((u_bar, h_bar)) => {
                    hash_to_int(&[&share.u_i, &u_bar, &h_bar], p) == share.e_i
                }
            };

            if !matches {
                warn!(index = share.index, "decryption share proof mismatch");
                return Err(CryptoError::ShareInvalid(share.index));
            }
            Ok(())
        });

        if let Err(err) = outcome {
            self.state = DecryptionState::Rejected;
            return Err(err);
        }
        self.state = DecryptionState::Reconstructing;
        Ok(())
    }

    /// Stage 4: Lagrange-combine the qualified partials at zero and strip
    /// the pad, recomputing the same hash pad the encryptor applied.
    ///
    /// The Lagrange coefficients use plain truncating integer division, as
    /// the protocol defines them. The quotient is exact only when the
    /// qualified evaluation points make the products divide (consecutive
    /// indices do); reconstruction silently degrades otherwise.
    pub fn reconstruct(
        &mut self,
        engine: &ThresholdCipher,
        qual: &[usize],
    ) -> Result<BigUint, CryptoError> {
        self.expect_state(DecryptionState::Reconstructing)?;
        if qual.is_empty() {
            return Err(CryptoError::EmptyQual);
        }
        let p = engine.modulus();

        let mut combined = BigUint::one();
        for &i in qual {
            let share = self
                .shares
                .get(i)
                .ok_or(CryptoError::UnknownParticipant(i))?;
            let lambda = lagrange_at_zero(qual, i);
            combined = (combined * pow_signed(&share.u_i, &lambda, p)?) % p;
        }

        let pad = hash_to_int(&[&combined], p);
        let m = pad ^ &self.ciphertext.c;
        self.state = DecryptionState::Done;
        debug!("reconstruction complete");
        Ok(m)
    }
}

/// `base^f · other^{-e} mod p`: the verifier-side recombination shared by
/// the ciphertext check and the share-proof check.
///
/// `None` when `other` is not a unit mod p; the callers treat that exactly
/// like a failed challenge.
fn recombine(
    base: &BigUint,
    f: &BigUint,
    other: &BigUint,
    e: &BigUint,
    p: &BigUint,
) -> Option<BigUint> {
    let inverse = mod_inverse(&pow_mod(other, e, p), p)?;
    Some((pow_mod(base, f, p) * inverse) % p)
}

/// Lagrange coefficient at zero for participant `i` over the qualified set,
/// with 1-based evaluation points (`i` maps to the point `i + 1`):
/// `λ_i(0) = Π_{j≠i} (0 − (j+1)) / ((i+1) − (j+1))`, truncating division.
fn lagrange_at_zero(qual: &[usize], i: usize) -> BigInt {
    let mut numerator = BigInt::one();
    let mut denominator = BigInt::one();
    for &j in qual {
        if j == i {
            continue;
        }
        numerator *= -BigInt::from(j as i64 + 1);
        denominator *= BigInt::from(i as i64) - BigInt::from(j as i64);
    }
    numerator / denominator
}

/// `base^lambda mod p` for a signed exponent: a negative exponent raises
/// the modular inverse of the base, matching `BigInteger::modPow`.
fn pow_signed(base: &BigUint, lambda: &BigInt, p: &BigUint) -> Result<BigUint, CryptoError> {
    if lambda.is_negative() {
        let inverse = mod_inverse(base, p).ok_or(CryptoError::NotInvertible)?;
        Ok(pow_mod(&inverse, lambda.magnitude(), p))
    } else {
        Ok(pow_mod(base, lambda.magnitude(), p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pvss_dkg::FinalState;
    use pvss_types::GroupParams;
    use rand::rngs::OsRng;

    /// The secp256k1 field prime; wide enough that a truncated challenge
    /// comparison cannot collide by accident.
    const P: &str =
        "115792089237316195423570985008687907853269984665640564039457584007908834671663";

    fn modulus() -> BigUint {
        BigUint::parse_bytes(P.as_bytes(), 10).unwrap()
    }

    fn group() -> GroupParams {
        GroupParams::new(modulus(), vec![BigUint::from(2u32), BigUint::from(3u32)]).unwrap()
    }

    /// Three finalized participants holding shares of f(z) = a0 + a1·z, plus
    /// the matching public key g^{a0} mod p.
    fn fixture() -> (ThresholdCipher, Vec<Participant>, BigUint) {
        let engine = ThresholdCipher::new(group()).unwrap();
        let p = modulus();
        let a0 = BigUint::from(4211u32);
        let a1 = BigUint::from(917u32);

        let public_key = pow_mod(&BigUint::from(2u32), &a0, &p);
        let participants: Vec<Participant> = (0..3u32)
            .map(|i| {
                let x_i = &a0 + &a1 * BigUint::from(i + 1);
                let participant = Participant::new(i);
                participant
                    .finalize(FinalState {
                        share: x_i,
                        blinding_share: None,
                        public_key: public_key.clone(),
                        qualified_shares: Vec::new(),
                    })
                    .unwrap();
                participant
            })
            .collect();

        (engine, participants, public_key)
    }

    #[test]
    fn lagrange_coefficients_at_zero() {
        let qual = vec![0, 1, 2];
        // Points 1, 2, 3 interpolated at zero.
        assert_eq!(lagrange_at_zero(&qual, 0), BigInt::from(3));
        assert_eq!(lagrange_at_zero(&qual, 1), BigInt::from(-3));
        assert_eq!(lagrange_at_zero(&qual, 2), BigInt::from(1));

        // The coefficients of any interpolation at a polynomial point sum
        // to one.
        let sum: BigInt = qual.iter().map(|&i| lagrange_at_zero(&qual, i)).sum();
        assert_eq!(sum, BigInt::one());
    }

    #[test]
    fn pow_signed_matches_inverse_exponentiation() {
        let p = BigUint::from(65537u32);
        let base = BigUint::from(5u32);
        let positive = pow_signed(&base, &BigInt::from(3), &p).unwrap();
        assert_eq!(positive, BigUint::from(125u32));

        let negative = pow_signed(&base, &BigInt::from(-3), &p).unwrap();
        assert_eq!((positive * negative) % &p, BigUint::one());
    }

    #[test]
    fn roundtrip_recovers_message() {
        let (engine, participants, public_key) = fixture();
        let m = BigUint::from(48879u32);
        let label = BigUint::from(30u32);

        let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);
        let recovered = engine
            .decrypt(ciphertext, &participants, &[0, 1, 2], &mut OsRng)
            .unwrap();
        assert_eq!(recovered, m);
    }

    #[test]
    fn engine_requires_generator_pair() {
        let single = GroupParams::new(modulus(), vec![BigUint::from(2u32)]).unwrap();
        assert_eq!(
            ThresholdCipher::new(single).unwrap_err(),
            CryptoError::MissingSecondGenerator(1)
        );
    }

    #[test]
    fn tampered_ciphertext_is_rejected_fieldwise() {
        let (engine, _participants, public_key) = fixture();
        let m = BigUint::from(203213123u32);
        let label = BigUint::from(30u32);
        let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);

        let tampered: Vec<Ciphertext> = (0..6)
            .map(|field| {
                let mut ct = ciphertext.clone();
                let bit = BigUint::one();
                match field {
                    0 => ct.c = &ct.c ^ &bit,
                    1 => ct.label = &ct.label ^ &bit,
                    2 => ct.u = &ct.u ^ &bit,
                    3 => ct.u_bar = &ct.u_bar ^ &bit,
                    4 => ct.e = &ct.e ^ &bit,
                    _ => ct.f = &ct.f ^ &bit,
                }
                ct
            })
            .collect();

        for ct in tampered {
            let mut decryption = Decryption::new(ct);
            assert_eq!(
                decryption.verify_ciphertext(&engine).unwrap_err(),
                CryptoError::CiphertextInvalid
            );
            assert_eq!(decryption.state(), DecryptionState::Rejected);
        }
    }

    #[test]
    fn corrupted_share_is_rejected_with_index() {
        let (engine, participants, public_key) = fixture();
        let m = BigUint::from(1234567u32);
        let label = BigUint::from(7u32);
        let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);

        let mut decryption = Decryption::new(ciphertext);
        decryption.verify_ciphertext(&engine).unwrap();
        decryption
            .compute_shares(&engine, &participants, &mut OsRng)
            .unwrap();

        let bumped = &decryption.shares[1].u_i ^ BigUint::one();
        decryption.shares[1].u_i = bumped;

        assert_eq!(
            decryption.verify_shares(&engine, &participants).unwrap_err(),
            CryptoError::ShareInvalid(1)
        );
        assert_eq!(decryption.state(), DecryptionState::Rejected);
    }

    #[test]
    fn stages_enforce_order() {
        let (engine, participants, public_key) = fixture();
        let m = BigUint::from(99u32);
        let label = BigUint::from(1u32);
        let ciphertext = engine.encrypt(&m, &label, &public_key, &mut OsRng);

        let mut decryption = Decryption::new(ciphertext);
        assert_eq!(decryption.state(), DecryptionState::VerifyingCiphertext);

        // Skipping ahead is refused.
        assert_eq!(
            decryption.reconstruct(&engine, &[0, 1, 2]).unwrap_err(),
            CryptoError::InvalidState(DecryptionState::VerifyingCiphertext)
        );

        decryption.verify_ciphertext(&engine).unwrap();
        assert_eq!(decryption.state(), DecryptionState::ComputingShares);

        // Repeating a completed stage is refused.
        assert_eq!(
            decryption.verify_ciphertext(&engine).unwrap_err(),
            CryptoError::InvalidState(DecryptionState::ComputingShares)
        );

        decryption
            .compute_shares(&engine, &participants, &mut OsRng)
            .unwrap();
        decryption.verify_shares(&engine, &participants).unwrap();
        assert_eq!(decryption.state(), DecryptionState::Reconstructing);

        let recovered = decryption.reconstruct(&engine, &[0, 1, 2]).unwrap();
        assert_eq!(recovered, m);
        assert_eq!(decryption.state(), DecryptionState::Done);
    }

    #[test]
    fn empty_qual_is_rejected() {
        let (engine, participants, public_key) = fixture();
        let ciphertext =
            engine.encrypt(&BigUint::from(5u32), &BigUint::from(1u32), &public_key, &mut OsRng);

        let mut decryption = Decryption::new(ciphertext);
        decryption.verify_ciphertext(&engine).unwrap();
        decryption
            .compute_shares(&engine, &participants, &mut OsRng)
            .unwrap();
        decryption.verify_shares(&engine, &participants).unwrap();
        assert_eq!(
            decryption.reconstruct(&engine, &[]).unwrap_err(),
            CryptoError::EmptyQual
        );
    }

    #[test]
    fn unfinalized_participant_fails_share_computation() {
        let (engine, mut participants, public_key) = fixture();
        participants.push(Participant::new(3));

        let ciphertext =
            engine.encrypt(&BigUint::from(5u32), &BigUint::from(1u32), &public_key, &mut OsRng);
        let mut decryption = Decryption::new(ciphertext);
        decryption.verify_ciphertext(&engine).unwrap();
        assert_eq!(
            decryption
                .compute_shares(&engine, &participants, &mut OsRng)
                .unwrap_err(),
            CryptoError::Dkg(pvss_dkg::DkgError::NotFinalized(3))
        );
    }
}
