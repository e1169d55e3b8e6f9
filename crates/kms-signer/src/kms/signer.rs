//! -----------------------------------------------------------------------------
//! Created by **Jonathan Okz – BaaS.sh corporate**
//! -----------------------------------------------------------------------------
//!
//! Ethereum signer on top of any [`KeyOracle`].
//!
//! The public key is fetched once at construction and the address derived
//! from it. Every [`EthSigner::sign_hash`] call is a round trip to the oracle.

use core::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use tracing::{debug, info};

use super::SignerError;
use crate::{
    address::address_from_pem, eth_signer::EthSigner, key_oracle::KeyOracle,
    util::der_to_eth_signature,
};

/// Signer bound to one key of a [`KeyOracle`].
pub struct KmsSigner<O> {
    oracle: Arc<O>,
    key_name: String,
    address: Address,
}

impl<O: KeyOracle> KmsSigner<O> {
    /// Fetch the public key of `key_name` and derive the signer address.
    pub async fn new(oracle: O, key_name: impl Into<String>) -> Result<Self, SignerError> {
        Self::with_shared(Arc::new(oracle), key_name).await
    }

    /// Same as [`KmsSigner::new`] for an oracle shared between several keys.
    pub async fn with_shared(oracle: Arc<O>, key_name: impl Into<String>) -> Result<Self, SignerError> {
        let key_name = key_name.into();
        let pem = oracle.get_public_key(&key_name).await?;
        let address = address_from_pem(&pem)?;

        info!(target: "signer", key = %key_name, %address, "Initialized KMS signer");
        Ok(Self { oracle, key_name, address })
    }

    /// Resource name of the key inside the oracle.
    pub fn key_name(&self) -> &str {
        &self.key_name
    }
}

impl<O> Clone for KmsSigner<O> {
    fn clone(&self) -> Self {
        Self { oracle: Arc::clone(&self.oracle), key_name: self.key_name.clone(), address: self.address }
    }
}

impl<O> fmt::Debug for KmsSigner<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KmsSigner")
            .field("key_name", &self.key_name)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<O: KeyOracle> EthSigner for KmsSigner<O> {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65], SignerError> {
        let der = self.oracle.sign_digest(&self.key_name, hash).await?;
        debug!(target: "signer", key = %self.key_name, der_len = der.len(), "KMS signature received");
        der_to_eth_signature(&hash, &der, self.address)
    }
}
