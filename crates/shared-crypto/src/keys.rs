//! # Curve Point Checks
//!
//! Validity checks over compressed Ed25519 points as they appear in
//! transactions: one-time output keys and key images.

use curve25519_dalek::constants::ED25519_BASEPOINT_POINT;
use curve25519_dalek::edwards::CompressedEdwardsY;
use curve25519_dalek::scalar::Scalar;

/// Result of checking a key image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyImageCheck {
    /// Decompresses and lies in the prime-order subgroup.
    Valid,
    /// Bytes are not the encoding of a curve point.
    NotAPoint,
    /// Point has a torsion component (`l * P != identity`).
    OutsideSubgroup,
}

/// Returns true if `bytes` is the canonical encoding of a curve point.
pub fn is_valid_point(bytes: &[u8; 32]) -> bool {
    CompressedEdwardsY(*bytes).decompress().is_some()
}

/// Checks that a key image lies in the prime-order subgroup.
///
/// Multiplying by the group order `l` must yield the identity element.
pub fn check_key_image(bytes: &[u8; 32]) -> KeyImageCheck {
    match CompressedEdwardsY(*bytes).decompress() {
        None => KeyImageCheck::NotAPoint,
        Some(point) if point.is_torsion_free() => KeyImageCheck::Valid,
        Some(_) => KeyImageCheck::OutsideSubgroup,
    }
}

/// Public key `a * G` for a secret scalar `a` (reduced mod `l`).
pub fn public_key_from_secret(secret: &[u8; 32]) -> [u8; 32] {
    (ED25519_BASEPOINT_POINT * Scalar::from_bytes_mod_order(*secret))
        .compress()
        .to_bytes()
}
