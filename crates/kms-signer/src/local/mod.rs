//! Local signer backend.
//! WARNING: For development/testing only. Do **not** use in production.

use alloy_primitives::{Address, B256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;

use crate::eth_signer::EthSigner;
use crate::kms::SignerError;

/// Local signer backed by an in-memory secp256k1 private key.
#[derive(Clone, Debug)]
pub struct LocalSigner(PrivateKeySigner);

impl LocalSigner {
    /// Parses a 32-byte private key, `0x` prefix optional.
    pub fn from_hex(pk_hex: &str) -> Result<Self, SignerError> {
        let pk_hex = pk_hex.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner =
            pk_hex.parse().map_err(|_| SignerError::Decode("invalid private key hex".into()))?;
        Ok(Self(signer))
    }
}

impl From<PrivateKeySigner> for LocalSigner {
    fn from(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }
}

#[async_trait]
impl EthSigner for LocalSigner {
    fn address(&self) -> Address {
        self.0.address()
    }

    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65], SignerError> {
        let sig = self.0.sign_hash_sync(&hash).map_err(|e| SignerError::Backend(e.to_string()))?;
        let mut out: [u8; 65] = (&sig).into();
        // alloy encodes v as 27/28
        out[64] = u8::from(sig.v());
        Ok(out)
    }
}
