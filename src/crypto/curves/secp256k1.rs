//! secp256k1 Signature Math
//!
//! Used by: Bitcoin, Litecoin, Dogecoin, Dash, Bitcoin Cash, Ethereum and
//! every EVM chain, Tron.
//!
//! Features:
//! - Low-S canonicalisation
//! - Strict DER encoding and decoding
//! - Public key recovery from `(r, s, hash, recId)`
//! - Recovery id search against a known public key

use super::CurveError;
use crate::types::RawSignature;
use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::point::DecompressPoint;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::subtle::Choice;
use k256::elliptic_curve::{Field, PrimeField};
use k256::{AffinePoint, FieldBytes, ProjectivePoint, Scalar, U256};

/// Curve order `n` (big-endian)
pub const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

/// `n / 2` rounded down: the largest canonical `s`
pub const HALF_CURVE_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Field prime `p` (big-endian)
pub const FIELD_PRIME: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xff, 0xff, 0xfc, 0x2f,
];

// MARK: - Public Key Encoding

/// Whether a SEC1 public key is compressed.
///
/// 33 bytes with a 0x02/0x03 prefix is compressed, 65 bytes with 0x04 is
/// uncompressed. Anything else is rejected.
pub fn is_public_key_compressed(public_key: &[u8]) -> Result<bool, CurveError> {
    match (public_key.len(), public_key.first()) {
        (33, Some(0x02)) | (33, Some(0x03)) => Ok(true),
        (65, Some(0x04)) => Ok(false),
        (len, prefix) => Err(CurveError::InvalidPublicKey(format!(
            "unrecognised encoding: {} bytes, prefix {}",
            len,
            prefix.map(|p| format!("0x{:02x}", p)).unwrap_or_else(|| "none".to_string())
        ))),
    }
}

// MARK: - Canonical (Low-S) Form

/// True when `s <= n/2`
pub fn is_canonical(signature: &RawSignature) -> bool {
    signature.s <= HALF_CURVE_ORDER
}

/// Replace a high `s` with `n - s`.
///
/// Assumes `s < n`; device output is range-checked before it gets here.
pub fn canonicalise(signature: &RawSignature) -> RawSignature {
    if is_canonical(signature) {
        return *signature;
    }
    RawSignature {
        r: signature.r,
        s: sub_be(&CURVE_ORDER, &signature.s),
    }
}

// MARK: - DER

/// Encode `(r, s)` as a DER `SEQUENCE { INTEGER r, INTEGER s }`.
pub fn encode_der(r: &[u8; 32], s: &[u8; 32]) -> Vec<u8> {
    let r = der_integer(r);
    let s = der_integer(s);

    let mut der = Vec::with_capacity(6 + r.len() + s.len());
    der.push(0x30);
    der.push((4 + r.len() + s.len()) as u8);
    der.push(0x02);
    der.push(r.len() as u8);
    der.extend_from_slice(&r);
    der.push(0x02);
    der.push(s.len() as u8);
    der.extend_from_slice(&s);
    der
}

/// Minimal big-endian integer, with a 0x00 pad when the high bit is set
fn der_integer(value: &[u8; 32]) -> Vec<u8> {
    let start = value
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(value.len() - 1);
    let trimmed = &value[start..];

    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Strict DER decoding, the inverse of [`encode_der`].
pub fn decode_der(der: &[u8]) -> Result<RawSignature, CurveError> {
    let invalid = |msg: &str| CurveError::InvalidSignature(format!("DER: {}", msg));

    if der.len() < 8 || der.len() > 72 {
        return Err(invalid("bad length"));
    }
    if der[0] != 0x30 {
        return Err(invalid("missing SEQUENCE tag"));
    }
    if der[1] as usize != der.len() - 2 {
        return Err(invalid("SEQUENCE length mismatch"));
    }

    let (r, rest) = read_der_integer(&der[2..])?;
    let (s, rest) = read_der_integer(rest)?;
    if !rest.is_empty() {
        return Err(invalid("trailing bytes"));
    }

    Ok(RawSignature { r, s })
}

fn read_der_integer(input: &[u8]) -> Result<([u8; 32], &[u8]), CurveError> {
    let invalid = |msg: &str| CurveError::InvalidSignature(format!("DER: {}", msg));

    if input.len() < 2 || input[0] != 0x02 {
        return Err(invalid("missing INTEGER tag"));
    }
    let len = input[1] as usize;
    if len == 0 || len > 33 || input.len() < 2 + len {
        return Err(invalid("bad INTEGER length"));
    }
    let body = &input[2..2 + len];
    if body[0] & 0x80 != 0 {
        return Err(invalid("negative INTEGER"));
    }
    if len > 1 && body[0] == 0x00 && body[1] & 0x80 == 0 {
        return Err(invalid("non-minimal INTEGER"));
    }

    let digits = if body[0] == 0x00 && len > 1 { &body[1..] } else { body };
    if digits.len() > 32 {
        return Err(invalid("INTEGER wider than 256 bits"));
    }

    let mut value = [0u8; 32];
    value[32 - digits.len()..].copy_from_slice(digits);
    Ok((value, &input[2 + len..]))
}

// MARK: - Public Key Recovery

/// Recover the public key that produced `signature` over `message_hash`
/// for one recovery id candidate.
///
/// `Ok(None)` means this candidate does not yield a point and the next one
/// should be tried. An `Err` means the signature itself is unusable.
pub fn recover_public_key(
    message_hash: &[u8; 32],
    signature: &RawSignature,
    recovery_id: u8,
    compressed: bool,
) -> Result<Option<Vec<u8>>, CurveError> {
    if recovery_id > 3 {
        return Err(CurveError::InvalidSignature(format!(
            "recovery id {} out of range",
            recovery_id
        )));
    }

    let r = nonzero_scalar(&signature.r, "r")?;
    let s = nonzero_scalar(&signature.s, "s")?;

    // x = r + (recId / 2) * n, which must still be a field element
    let x = if recovery_id / 2 == 0 {
        signature.r
    } else {
        match add_be(&signature.r, &CURVE_ORDER) {
            Some(x) => x,
            None => return Ok(None),
        }
    };
    if x >= FIELD_PRIME {
        return Ok(None);
    }

    let y_is_odd = Choice::from(recovery_id & 1);
    let big_r = match Option::<AffinePoint>::from(AffinePoint::decompress(&FieldBytes::from(x), y_is_odd)) {
        Some(point) => ProjectivePoint::from(point),
        None => return Ok(None),
    };

    // R * n must be the point at infinity: R * (n - 1) + R
    if big_r * (-Scalar::ONE) + big_r != ProjectivePoint::IDENTITY {
        return Ok(None);
    }

    // Q = r^-1 * (s * R - e * G), with -e taken mod n
    let e = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*message_hash));
    let e_neg = Scalar::ZERO - e;
    let r_inv = Option::<Scalar>::from(r.invert())
        .ok_or_else(|| CurveError::InvalidSignature("r is not invertible".to_string()))?;

    let q = ProjectivePoint::GENERATOR * (r_inv * e_neg) + big_r * (r_inv * s);
    if q == ProjectivePoint::IDENTITY {
        return Ok(None);
    }

    let encoded = AffinePoint::from(q).to_encoded_point(compressed);
    Ok(Some(encoded.as_bytes().to_vec()))
}

/// Find the recovery id (0..=3) whose recovered key equals `expected_public_key`.
///
/// The candidate key is encoded the same way as the expected key
/// (compressed or uncompressed) before comparison.
pub fn recover_recovery_id(
    message_hash: &[u8; 32],
    signature: &RawSignature,
    expected_public_key: &[u8],
) -> Result<u8, CurveError> {
    let compressed = is_public_key_compressed(expected_public_key)?;

    for recovery_id in 0..4u8 {
        if let Some(candidate) = recover_public_key(message_hash, signature, recovery_id, compressed)? {
            if candidate.as_slice() == expected_public_key {
                return Ok(recovery_id);
            }
        }
    }

    Err(CurveError::RecoveryFailed)
}

/// Parse a scalar in `[1, n)`
fn nonzero_scalar(bytes: &[u8; 32], name: &str) -> Result<Scalar, CurveError> {
    let scalar = Option::<Scalar>::from(Scalar::from_repr(FieldBytes::from(*bytes)))
        .ok_or_else(|| CurveError::InvalidSignature(format!("{} is not below the curve order", name)))?;
    if bool::from(scalar.is_zero()) {
        return Err(CurveError::InvalidSignature(format!("{} is zero", name)));
    }
    Ok(scalar)
}

// MARK: - 256-bit Helpers

/// `a + b`, or `None` on overflow past 2^256
fn add_be(a: &[u8; 32], b: &[u8; 32]) -> Option<[u8; 32]> {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in (0..32).rev() {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    if carry != 0 {
        None
    } else {
        Some(out)
    }
}

/// `a - b` modulo 2^256
fn sub_be(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = a[i] as i16 - b[i] as i16 - borrow;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        } else {
            borrow = 0;
        }
        out[i] = diff as u8;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    const G_COMPRESSED: &str = "0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

    fn key_one() -> SigningKey {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        SigningKey::from_bytes(&FieldBytes::from(secret)).unwrap()
    }

    fn sign(key: &SigningKey, hash: &[u8; 32]) -> (RawSignature, u8) {
        let (sig, recid) = key.sign_prehash_recoverable(hash).unwrap();
        let bytes = sig.to_bytes();
        (RawSignature::from_bytes(&bytes).unwrap(), recid.to_byte())
    }

    #[test]
    fn test_half_order_constant() {
        // 2 * (n / 2) + 1 == n
        let doubled = add_be(&HALF_CURVE_ORDER, &HALF_CURVE_ORDER).unwrap();
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(add_be(&doubled, &one).unwrap(), CURVE_ORDER);
    }

    #[test]
    fn test_public_key_compression_detection() {
        assert!(is_public_key_compressed(&[0x02; 33]).unwrap());
        assert!(is_public_key_compressed(&[0x03; 33]).unwrap());

        let mut uncompressed = [0u8; 65];
        uncompressed[0] = 0x04;
        assert!(!is_public_key_compressed(&uncompressed).unwrap());

        assert!(is_public_key_compressed(&[0x04; 33]).is_err());
        assert!(is_public_key_compressed(&[0x02; 32]).is_err());
        assert!(is_public_key_compressed(&[]).is_err());
    }

    #[test]
    fn test_canonicalise_high_s() {
        let mut high = CURVE_ORDER;
        high[31] -= 1; // n - 1
        let sig = RawSignature { r: [1u8; 32], s: high };
        assert!(!is_canonical(&sig));

        let low = canonicalise(&sig);
        let mut one = [0u8; 32];
        one[31] = 1;
        assert_eq!(low.s, one);
        assert_eq!(low.r, sig.r);
        assert_eq!(canonicalise(&low), low);
    }

    #[test]
    fn test_canonicalise_boundary() {
        let sig = RawSignature { r: [1u8; 32], s: HALF_CURVE_ORDER };
        assert!(is_canonical(&sig));
        assert_eq!(canonicalise(&sig), sig);
    }

    #[test]
    fn test_der_padding_and_trimming() {
        let mut r = [0u8; 32];
        r[31] = 0x80;
        let mut s = [0u8; 32];
        s[31] = 0x01;

        let der = encode_der(&r, &s);
        assert_eq!(der, vec![0x30, 0x07, 0x02, 0x02, 0x00, 0x80, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_der_matches_libsecp256k1() {
        use bitcoin::secp256k1::{ecdsa, Message, Secp256k1, SecretKey};

        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let msg = Message::from_digest([0x11; 32]);
        let sig = secp.sign_ecdsa(&msg, &sk);
        let compact = sig.serialize_compact();

        let raw = RawSignature::from_bytes(&compact).unwrap();
        let ours = encode_der(&raw.r, &raw.s);
        assert_eq!(ours, sig.serialize_der().to_vec());

        let parsed = ecdsa::Signature::from_der(&ours).unwrap();
        assert_eq!(parsed, sig);
        assert_eq!(decode_der(&ours).unwrap(), raw);
    }

    #[test]
    fn test_decode_der_rejects_non_minimal() {
        let der = [0x30, 0x08, 0x02, 0x02, 0x00, 0x01, 0x02, 0x02, 0x00, 0x01];
        assert!(decode_der(&der).is_err());
        assert!(decode_der(&[0x31, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]).is_err());
    }

    #[test]
    fn test_recovery_id_for_private_key_one() {
        let key = key_one();
        let hash = [0xab; 32];
        let (sig, expected_recid) = sign(&key, &hash);

        let expected = hex::decode(G_COMPRESSED).unwrap();
        let recid = recover_recovery_id(&hash, &sig, &expected).unwrap();
        assert!(recid <= 3);
        assert_eq!(recid, expected_recid);

        let recovered = recover_public_key(&hash, &sig, recid, true).unwrap().unwrap();
        assert_eq!(recovered, expected);
        assert_eq!(recovered.len(), 33);
    }

    #[test]
    fn test_recovery_with_uncompressed_key() {
        let key = key_one();
        let hash = [0x01; 32];
        let (sig, expected_recid) = sign(&key, &hash);

        let uncompressed = key.verifying_key().to_encoded_point(false);
        let recid = recover_recovery_id(&hash, &sig, uncompressed.as_bytes()).unwrap();
        assert_eq!(recid, expected_recid);
    }

    #[test]
    fn test_recovery_wrong_key_fails() {
        let key = key_one();
        let hash = [0x07; 32];
        let (sig, _) = sign(&key, &hash);

        let other = SigningKey::from_bytes(&FieldBytes::from([0x42u8; 32])).unwrap();
        let other_pub = other.verifying_key().to_encoded_point(true);

        assert_eq!(
            recover_recovery_id(&hash, &sig, other_pub.as_bytes()),
            Err(CurveError::RecoveryFailed)
        );
    }

    #[test]
    fn test_recovery_wrong_hash_fails() {
        let key = key_one();
        let (sig, _) = sign(&key, &[0x07; 32]);
        let expected = hex::decode(G_COMPRESSED).unwrap();

        assert_eq!(
            recover_recovery_id(&[0x08; 32], &sig, &expected),
            Err(CurveError::RecoveryFailed)
        );
    }

    #[test]
    fn test_recovery_rejects_malformed_inputs() {
        let sig = RawSignature { r: [0u8; 32], s: [1u8; 32] };
        let expected = hex::decode(G_COMPRESSED).unwrap();
        assert!(matches!(
            recover_recovery_id(&[0u8; 32], &sig, &expected),
            Err(CurveError::InvalidSignature(_))
        ));

        let sig = RawSignature { r: [1u8; 32], s: [1u8; 32] };
        assert!(matches!(
            recover_recovery_id(&[0u8; 32], &sig, &[0x05; 33]),
            Err(CurveError::InvalidPublicKey(_))
        ));
    }

    #[test]
    fn test_sub_be_borrow() {
        let mut a = [0u8; 32];
        a[30] = 1;
        let mut b = [0u8; 32];
        b[31] = 1;
        let diff = sub_be(&a, &b);
        assert_eq!(diff[31], 0xff);
        assert_eq!(diff[30], 0x00);
    }
}
