//! Ring signature and multisig co-signer signature verification.
//!
//! Key inputs are verified with the classic CryptoNote ring signature: `n`
//! `(c, r)` pairs closing a hash chain seeded by the transaction's
//! signature-prefix hash, binding the signer to one (unrevealed) member of
//! the ring via a key-image. Multisig inputs fall back to plain Schnorr
//! signatures checked against the output's co-signer key set.

use curve25519_dalek::{constants::ED25519_BASEPOINT_POINT, edwards::CompressedEdwardsY, scalar::Scalar};

use cryptonote_types::{Hash, RingSignature};

fn decompress(hash: &Hash) -> Option<curve25519_dalek::edwards::EdwardsPoint> {
    CompressedEdwardsY(hash.0).decompress()
}

fn canonical_scalar(hash: &Hash) -> Option<Scalar> {
    Option::from(Scalar::from_canonical_bytes(hash.0))
}

/// Deterministically maps a public key onto the curve via try-and-increment,
/// for use as the key-image's base point `Hp(P)`.
fn hash_to_point(pubkey: &Hash) -> curve25519_dalek::edwards::EdwardsPoint {
    let mut counter: u8 = 0;
    loop {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&pubkey.0);
        hasher.update(&[counter]);
        let digest = *hasher.finalize().as_bytes();
        if let Some(point) = CompressedEdwardsY(digest).decompress() {
            return point.mul_by_cofactor();
        }
        counter = counter.wrapping_add(1);
    }
}

fn hash_to_scalar(chunks: &[&[u8]]) -> Scalar {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    Scalar::from_bytes_mod_order(*hasher.finalize().as_bytes())
}

/// Verifies a key input's ring signature against the reconstructed ring of
/// one-time public keys. `ring_pubkeys` and `sig.members` must be the same
/// length and in the same order as the resolved ring; a length mismatch is
/// treated as an invalid signature rather than a panic.
#[must_use]
pub fn verify_ring_signature(prefix_hash: &Hash, key_image: &Hash, ring_pubkeys: &[Hash], sig: &RingSignature) -> bool {
    if ring_pubkeys.is_empty() || ring_pubkeys.len() != sig.members.len() {
        return false;
    }

    let Some(image_point) = decompress(key_image) else {
        return false;
    };
    if !image_point.is_torsion_free() {
        return false;
    }

    let mut buf = Vec::with_capacity(32 + ring_pubkeys.len() * 64);
    buf.extend_from_slice(&prefix_hash.0);

    let mut sum_c = Scalar::ZERO;
    for (pubkey, (c_bytes, r_bytes)) in ring_pubkeys.iter().zip(&sig.members) {
        let (Some(c), Some(r)) = (canonical_scalar(c_bytes), canonical_scalar(r_bytes)) else {
            return false;
        };
        let Some(pubkey_point) = decompress(pubkey) else {
            return false;
        };

        let l = ED25519_BASEPOINT_POINT * r + pubkey_point * c;
        let hp = hash_to_point(pubkey);
        let r_point = hp * r + image_point * c;

        buf.extend_from_slice(l.compress().as_bytes());
        buf.extend_from_slice(r_point.compress().as_bytes());
        sum_c += c;
    }

    hash_to_scalar(&[&buf]) == sum_c
}

fn verify_schnorr(prefix_hash: &Hash, pubkey: &Hash, c_bytes: &Hash, r_bytes: &Hash) -> bool {
    let (Some(c), Some(r)) = (canonical_scalar(c_bytes), canonical_scalar(r_bytes)) else {
        return false;
    };
    let Some(p) = decompress(pubkey) else {
        return false;
    };

    let r_point = ED25519_BASEPOINT_POINT * r + p * c;
    hash_to_scalar(&[&prefix_hash.0, r_point.compress().as_bytes()]) == c
}

/// Verifies a multisig input's signature set against the output's co-signer
/// keys, requiring at least `required` valid signatures from distinct
/// signers.
#[must_use]
pub fn verify_multisig_signature(prefix_hash: &Hash, signer_keys: &[Hash], required: u8, sig: &RingSignature) -> bool {
    if sig.members.len() < required as usize {
        return false;
    }

    let mut used = vec![false; signer_keys.len()];
    let mut valid = 0usize;
    for (c_bytes, r_bytes) in &sig.members {
        for (index, key) in signer_keys.iter().enumerate() {
            if used[index] {
                continue;
            }
            if verify_schnorr(prefix_hash, key, c_bytes, r_bytes) {
                used[index] = true;
                valid += 1;
                break;
            }
        }
    }

    valid >= required as usize
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn malformed_ring_signature_is_rejected() {
        let sig = RingSignature {
            members: vec![(Hash::ZERO, Hash::ZERO)],
        };
        assert!(!verify_ring_signature(&Hash::ZERO, &Hash::ZERO, &[Hash::ZERO], &sig));
    }

    #[test]
    fn mismatched_ring_lengths_are_rejected() {
        let sig = RingSignature {
            members: vec![(Hash::ZERO, Hash::ZERO), (Hash::ZERO, Hash::ZERO)],
        };
        assert!(!verify_ring_signature(&Hash::ZERO, &Hash::ZERO, &[Hash::ZERO], &sig));
    }

    #[test]
    fn empty_multisig_signature_set_fails_when_required() {
        let sig = RingSignature { members: vec![] };
        assert!(!verify_multisig_signature(&Hash::ZERO, &[Hash::ZERO], 1, &sig));
    }
}
