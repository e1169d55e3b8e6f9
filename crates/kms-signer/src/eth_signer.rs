//! -----------------------------------------------------------------------------
//! Created by **Jonathan Okz – BaaS.sh corporate**
//! -----------------------------------------------------------------------------
//!
//! Trait for producing Ethereum ECDSA signatures over 32-byte digests.
//!
//! Every backend (remote KMS key, local dev key) is exposed through
//! [`EthSigner`] so callers such as [`crate::transfer`] and the
//! [`crate::kms::SignerRegistry`] never depend on where the key lives.
//!
//! Signatures use the compact Ethereum layout:
//!
//! ```text
//! | 32 bytes r | 32 bytes s (low half-order) | 1 byte recovery id (0 or 1) |
//! ```

use alloy_primitives::{Address, B256};
use async_trait::async_trait;

use crate::kms::SignerError;

/// A type that can sign a digest and expose its Ethereum address.
#[async_trait]
pub trait EthSigner: Send + Sync + 'static {
    /// Returns the 20-byte address corresponding to the signer public key.
    fn address(&self) -> Address;

    /// Signs the given Keccak-256 digest. Must return the **compact** 65-byte
    /// representation `r‖s‖v` with `v` in `{0, 1}`.
    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65], SignerError>;
}
