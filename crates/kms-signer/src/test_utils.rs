//! In-memory [`KeyOracle`] standing in for a cloud KMS in tests.

use std::collections::HashMap;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use k256::{
    ecdsa::{signature::hazmat::PrehashSigner, Signature, SigningKey},
    pkcs8::{EncodePublicKey, LineEnding},
};

use crate::{address::address_from_public_key, key_oracle::KeyOracle, kms::SignerError};

/// Holds secp256k1 keys by name and signs like a KMS would: DER output,
/// optionally with the high `s` a real KMS is free to return.
#[derive(Debug, Clone, Default)]
pub struct InMemoryOracle {
    keys: HashMap<String, SigningKey>,
    pems: HashMap<String, String>,
    high_s: bool,
}

impl InMemoryOracle {
    /// Oracle holding a single key derived from `secret`.
    pub fn with_key(name: &str, secret: [u8; 32]) -> Self {
        Self::default().add_key(name, secret)
    }

    /// Adds a key. Panics on an out-of-range secret.
    pub fn add_key(mut self, name: &str, secret: [u8; 32]) -> Self {
        let key = SigningKey::from_slice(&secret).expect("valid secp256k1 secret");
        self.keys.insert(name.to_owned(), key);
        self
    }

    /// Serves `pem` as the public key of `name`, whatever key signs for it.
    pub fn with_pem(mut self, name: &str, pem: &str) -> Self {
        self.pems.insert(name.to_owned(), pem.to_owned());
        self
    }

    /// Return signatures with `s` in the upper half-order.
    pub fn with_high_s(mut self) -> Self {
        self.high_s = true;
        self
    }

    /// Address of the key stored under `name`. Panics if there is none.
    pub fn address_of(&self, name: &str) -> Address {
        let point = self.keys[name].verifying_key().to_encoded_point(false);
        address_from_public_key(&point.as_bytes()[1..])
    }
}

#[async_trait]
impl KeyOracle for InMemoryOracle {
    async fn get_public_key(&self, key_name: &str) -> Result<String, SignerError> {
        if let Some(pem) = self.pems.get(key_name) {
            return Ok(pem.clone());
        }
        let key = self.keys.get(key_name).ok_or_else(|| SignerError::KeyNotFound(key_name.to_owned()))?;
        key.verifying_key()
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| SignerError::Backend(e.to_string()))
    }

    async fn sign_digest(&self, key_name: &str, digest: B256) -> Result<Vec<u8>, SignerError> {
        let key = self.keys.get(key_name).ok_or_else(|| SignerError::KeyNotFound(key_name.to_owned()))?;
        let sig: Signature =
            key.sign_prehash(digest.as_slice()).map_err(|e| SignerError::Backend(e.to_string()))?;
        let sig = if self.high_s {
            Signature::from_scalars(sig.r().to_bytes(), (-sig.s()).to_bytes())
                .map_err(|e| SignerError::Backend(e.to_string()))?
        } else {
            sig
        };
        Ok(sig.to_der().as_bytes().to_vec())
    }
}
