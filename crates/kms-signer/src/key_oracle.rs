//! Capability interface of a remote key custodian.
//!
//! A [`KeyOracle`] owns private keys we never see. It can hand out the public
//! half of a key as PEM and produce DER-encoded ECDSA signatures over a
//! caller-supplied digest. Turning those into an address and into Ethereum
//! signatures is done by [`crate::kms::KmsSigner`], which works with any
//! oracle.

use alloy_primitives::B256;
use async_trait::async_trait;

use crate::kms::SignerError;

/// Remote key custody: public key lookup and digest signing by key name.
#[async_trait]
pub trait KeyOracle: Send + Sync + 'static {
    /// PEM `SubjectPublicKeyInfo` of the key identified by `key_name`.
    async fn get_public_key(&self, key_name: &str) -> Result<String, SignerError>;

    /// DER-encoded ECDSA signature of `digest`. The digest is signed as-is,
    /// the oracle must not hash it again.
    async fn sign_digest(&self, key_name: &str, digest: B256) -> Result<Vec<u8>, SignerError>;
}
