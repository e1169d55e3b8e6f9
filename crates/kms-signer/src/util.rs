//! Shared signature utilities for the KMS backends.

use alloy_primitives::{Address, B256};
use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::{address::address_from_public_key, kms::SignerError};

/// Converts a DER signature returned by a KMS into the 65-byte Ethereum form.
///
/// KMS backends do not enforce low `s`, so the signature is normalised first
/// (EIP-2), then the recovery id is picked by matching `expected`.
pub(crate) fn der_to_eth_signature(
    hash: &B256,
    der: &[u8],
    expected: Address,
) -> Result<[u8; 65], SignerError> {
    let sig = Signature::from_der(der).map_err(|e| SignerError::Decode(e.to_string()))?;
    let sig = sig.normalize_s().unwrap_or(sig);
    let v = find_recovery_id(hash, &sig, expected).ok_or(SignerError::Recover)?;
    Ok(assemble_signature(&sig, v))
}

/// Recover the Ethereum recovery id (0/1) for `sig` such that the recovered
/// public key hashes to `expected`.
/// Returns `None` if no recovery id matches.
pub(crate) fn find_recovery_id(hash: &B256, sig: &Signature, expected: Address) -> Option<u8> {
    for recid in 0..=1u8 {
        let Some(rid) = RecoveryId::from_byte(recid) else { continue };
        let Ok(vk) = VerifyingKey::recover_from_prehash(hash.as_slice(), sig, rid) else {
            continue;
        };
        let uncompressed = vk.to_encoded_point(false);
        if address_from_public_key(&uncompressed.as_bytes()[1..]) == expected {
            return Some(recid);
        }
    }
    None
}

/// Assemble `(r,s,v)` into 65-byte array.
pub(crate) fn assemble_signature(sig: &Signature, v: u8) -> [u8; 65] {
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&sig.to_bytes());
    out[64] = v;
    out
}
