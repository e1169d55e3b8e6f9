//! Ethereum address derivation from PEM-armored public keys.
//!
//! KMS back-ends hand out secp256k1 public keys as a PEM `SubjectPublicKeyInfo`.
//! For that key type the DER encoding is a fixed 24-byte header (algorithm
//! identifier, bit-string header and the SEC1 `0x04` tag) followed by the raw
//! 64-byte point:
//!
//! ```text
//! | 3056 3010 0607 2a8648ce3d0201 0605 2b8104000a 034200 04 | X (32) | Y (32) |
//! ```
//!
//! The address is the last 20 bytes of `keccak256(X‖Y)`, rendered with the
//! EIP-55 mixed-case checksum.
//!
//! [`derive_address`] skips the header by offset, which is what every KMS
//! integration we talk to expects. It silently yields a meaningless address
//! for any other key type. [`derive_address_strict`] parses the structure
//! instead and rejects anything that is not a secp256k1 key.

use alloy_primitives::{keccak256, Address};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use k256::{elliptic_curve::sec1::ToEncodedPoint, pkcs8::DecodePublicKey, PublicKey};
use thiserror::Error;
use tracing::debug;

/// Opening PEM marker of a public key block.
pub const PEM_HEADER: &str = "-----BEGIN PUBLIC KEY-----";
/// Closing PEM marker of a public key block.
pub const PEM_FOOTER: &str = "-----END PUBLIC KEY-----";
/// Length of the DER prefix preceding the raw point of a secp256k1 SPKI.
pub const SPKI_PREFIX_LEN: usize = 24;

/// Failure to turn a key or an address string into an [`Address`].
///
/// Variants only ever carry the length or shape of the input, never the
/// input itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// Missing or repeated PEM markers, or a payload that is not base64.
    #[error("malformed key encoding: {reason} (input is {len} bytes)")]
    MalformedEncoding { reason: &'static str, len: usize },
    /// The decoded key is too short to hold the DER prefix and a point.
    #[error("truncated key: decoded {len} bytes, need more than 24")]
    TruncatedKey { len: usize },
    /// DER decoded but does not describe a secp256k1 public key.
    #[error("unsupported public key: {0}")]
    UnsupportedKey(String),
    /// Not a 20-byte hex address.
    #[error("invalid address: expected 40 hex digits, got {len} characters")]
    InvalidHex { len: usize },
}

/// Extracts the DER bytes of the single `PUBLIC KEY` block in `pem`.
///
/// Whitespace inside the block is ignored so both `\n` and `\r\n` line
/// endings decode the same way.
pub fn decode_pem(pem: &str) -> Result<Vec<u8>, AddressError> {
    let len = pem.len();
    let malformed = |reason: &'static str| AddressError::MalformedEncoding { reason, len };

    let (Some(begin), Some(end)) = (pem.find(PEM_HEADER), pem.find(PEM_FOOTER)) else {
        return Err(malformed("missing PEM header or footer"));
    };
    if pem.matches(PEM_HEADER).count() != 1 || pem.matches(PEM_FOOTER).count() != 1 {
        return Err(malformed("expected exactly one PEM block"));
    }
    if end < begin {
        return Err(malformed("PEM footer precedes header"));
    }

    let body: String = pem[begin + PEM_HEADER.len()..end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(body.as_bytes()).map_err(|_| malformed("payload is not valid base64"))
}

/// Address of a raw public key point: last 20 bytes of its Keccak-256 hash.
///
/// `point` is hashed as given, callers strip a leading SEC1 tag themselves.
pub fn address_from_public_key(point: &[u8]) -> Address {
    Address::from_slice(&keccak256(point)[12..])
}

/// Derives the address of a PEM key by skipping the fixed secp256k1 DER prefix.
pub fn address_from_pem(pem: &str) -> Result<Address, AddressError> {
    let der = decode_pem(pem)?;
    if der.len() <= SPKI_PREFIX_LEN {
        return Err(AddressError::TruncatedKey { len: der.len() });
    }
    Ok(address_from_public_key(&der[SPKI_PREFIX_LEN..]))
}

/// Derives the address of a DER `SubjectPublicKeyInfo` by parsing it as a
/// secp256k1 key.
pub fn address_from_spki_der(der: &[u8]) -> Result<Address, AddressError> {
    let key = PublicKey::from_public_key_der(der)
        .map_err(|e| AddressError::UnsupportedKey(e.to_string()))?;
    let uncompressed = key.to_encoded_point(false);
    Ok(address_from_public_key(&uncompressed.as_bytes()[1..]))
}

/// PEM public key to `0x`-prefixed EIP-55 checksummed address.
pub fn derive_address(pem: &str) -> Result<String, AddressError> {
    address_from_pem(pem)
        .map(|address| address.to_checksum(None))
        .inspect_err(|err| debug!(target: "signer", %err, "address derivation failed"))
}

/// Like [`derive_address`], but parses the key structure instead of relying on
/// the fixed prefix offset.
pub fn derive_address_strict(pem: &str) -> Result<String, AddressError> {
    let der = decode_pem(pem)?;
    address_from_spki_der(&der)
        .map(|address| address.to_checksum(None))
        .inspect_err(|err| debug!(target: "signer", %err, der_len = der.len(), "strict derivation failed"))
}

/// Applies the EIP-55 casing to a 40-digit hex address, any input case, with
/// or without `0x`.
pub fn to_checksum(address: &str) -> Result<String, AddressError> {
    let parsed: Address =
        address.parse().map_err(|_| AddressError::InvalidHex { len: address.len() })?;
    Ok(parsed.to_checksum(None))
}

/// `true` only for the canonical EIP-55 casing of an address.
///
/// All-lowercase and all-uppercase spellings are rejected as well, unless they
/// happen to be the canonical form (no hex letters in the address).
pub fn is_valid_checksum(address: &str) -> bool {
    Address::parse_checksummed(address, None).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    // Public key of the secp256k1 private key `1` (the generator point).
    const GENERATOR_PEM: &str = "-----BEGIN PUBLIC KEY-----\n\
MFYwEAYHKoZIzj0CAQYFK4EEAAoDQgAEeb5mfvncu6xVoGKVzocLBwKb/NstzijZ\n\
WfKBWxb4F5hIOtp3JqPEZV2k+/wOEQio/Re0SKaFVBmcR9CP+xDUuA==\n\
-----END PUBLIC KEY-----\n";

    const KMS_PEM: &str = "-----BEGIN PUBLIC KEY-----\nMFYwEAYHKoZIzj0CAQYFK4EEAAoDQgAEjJaJh5wfZwvj8b3bQ4GYikqDTLXWUjMh\nkFs9lGj2N9B17zo37p4PSy99rDio0QHLadpso0rtTJDSISRW9MdOqA==\n-----END PUBLIC KEY-----\n";

    const ED25519_PEM: &str = "-----BEGIN PUBLIC KEY-----\nMCowBQYDK2VwAyEAnUV+ReQWxMZ3Z2pC/5aOPPjcc8jzOo0ZgSl7+j4AMLo=\n-----END PUBLIC KEY-----\n";

    fn wrap(b64: &str) -> String {
        format!("{PEM_HEADER}\n{b64}\n{PEM_FOOTER}\n")
    }

    #[test]
    fn generator_point_address() {
        assert_eq!(
            derive_address(GENERATOR_PEM).unwrap(),
            "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn kms_key_address() {
        assert_eq!(derive_address(KMS_PEM).unwrap(), "0xeeB8861f51B3f3F2204d64BBF7A7Eb25E1B4d6CD");
    }

    #[test]
    fn matches_hash_of_raw_point() {
        let der = decode_pem(GENERATOR_PEM).unwrap();
        assert_eq!(der.len(), 88);
        assert_eq!(der[SPKI_PREFIX_LEN - 1], 0x04);

        let point = &der[SPKI_PREFIX_LEN..];
        let expected = Address::from_slice(&keccak256(point)[12..]);
        assert_eq!(address_from_pem(GENERATOR_PEM).unwrap(), expected);
    }

    #[test]
    fn crlf_line_endings() {
        let crlf = GENERATOR_PEM.replace('\n', "\r\n");
        assert_eq!(derive_address(&crlf).unwrap(), derive_address(GENERATOR_PEM).unwrap());
    }

    #[test]
    fn single_line_body() {
        let joined = GENERATOR_PEM.replace('\n', "");
        assert_eq!(derive_address(&joined).unwrap(), derive_address(GENERATOR_PEM).unwrap());
    }

    #[test]
    fn missing_header() {
        let no_header = GENERATOR_PEM.replace(PEM_HEADER, "");
        assert!(matches!(
            derive_address(&no_header),
            Err(AddressError::MalformedEncoding { .. })
        ));
        assert!(matches!(derive_address("not-a-valid-pem"), Err(AddressError::MalformedEncoding { .. })));
    }

    #[test]
    fn two_blocks_rejected() {
        let doubled = format!("{GENERATOR_PEM}{KMS_PEM}");
        assert!(matches!(
            derive_address(&doubled),
            Err(AddressError::MalformedEncoding { reason: "expected exactly one PEM block", .. })
        ));
    }

    #[test]
    fn footer_before_header() {
        let flipped = format!("{PEM_FOOTER}\nAAAA\n{PEM_HEADER}\n");
        assert!(matches!(derive_address(&flipped), Err(AddressError::MalformedEncoding { .. })));
    }

    #[test]
    fn invalid_base64() {
        let err = derive_address(&wrap("MFYw!!!!")).unwrap_err();
        assert!(matches!(err, AddressError::MalformedEncoding { .. }));
    }

    #[test]
    fn truncated_key() {
        // 24 zero bytes: prefix only.
        let err = derive_address(&wrap("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")).unwrap_err();
        assert_eq!(err, AddressError::TruncatedKey { len: 24 });

        let err = derive_address(&wrap("")).unwrap_err();
        assert_eq!(err, AddressError::TruncatedKey { len: 0 });
    }

    #[test]
    fn one_byte_past_prefix() {
        // 25 zero bytes: keccak256([0x00]).
        assert_eq!(
            derive_address(&wrap("AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA==")).unwrap(),
            "0x828f817D6612f7b477D66591ff96a9E064bcc98A"
        );
    }

    #[test]
    fn errors_do_not_leak_key_material() {
        let broken = KMS_PEM.replace("MFYw", "MFY!");
        let message = derive_address(&broken).unwrap_err().to_string();
        assert!(!message.contains("EjJaJh5wfZwvj8b3bQ4GYik"));
        assert!(message.contains(&broken.len().to_string()));
    }

    #[test]
    fn strict_agrees_with_offset_for_secp256k1() {
        for pem in [GENERATOR_PEM, KMS_PEM] {
            assert_eq!(derive_address_strict(pem).unwrap(), derive_address(pem).unwrap());
        }
    }

    #[test]
    fn strict_rejects_other_curves() {
        assert!(matches!(derive_address_strict(ED25519_PEM), Err(AddressError::UnsupportedKey(_))));
        // The offset path cannot tell and hashes whatever follows the prefix.
        assert_eq!(
            derive_address(ED25519_PEM).unwrap(),
            "0xf98E434992E71a27A7ABeBC82f5241A08Ab7E6ee"
        );
    }

    #[test]
    fn checksum_vectors() {
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            assert_eq!(to_checksum(&expected.to_lowercase()).unwrap(), expected);
            assert_eq!(to_checksum(&expected[2..].to_uppercase()).unwrap(), expected);
            assert!(is_valid_checksum(expected));
        }
    }

    #[test]
    fn checksum_rejects_other_casings() {
        let canonical = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        assert!(!is_valid_checksum(&canonical.to_lowercase()));
        assert!(!is_valid_checksum(&format!("0x{}", canonical[2..].to_uppercase())));
        // flip the case of the first letter only
        assert!(!is_valid_checksum("0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"));
    }

    #[test]
    fn checksum_input_shape() {
        assert_eq!(to_checksum("0x1234"), Err(AddressError::InvalidHex { len: 6 }));
        assert!(to_checksum("0xzz000000000000000000000000000000000000zz").is_err());
    }
}
