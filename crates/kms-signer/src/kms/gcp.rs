//! Google Cloud KMS key oracle.
//!
//! Enabled with the `gcp` crate feature. Uses the async `google-cloud-kms` SDK.
//! Keys must be `EC_SIGN_SECP256K1_SHA256` versions: the Keccak-256 digest is
//! passed in the `sha256` digest field and signed as-is.
#![cfg(feature = "gcp")]

use core::fmt;
use std::path::Path;

use alloy_primitives::B256;
use async_trait::async_trait;
use google_cloud_kms::client::google_cloud_auth::credentials::CredentialsFile;
use google_cloud_kms::client::{Client, ClientConfig};
use google_cloud_kms::grpc::kms::v1::{
    digest as gdigest, AsymmetricSignRequest, Digest, GetPublicKeyRequest,
};
use tracing::{debug, info};

use super::{GcpKeyRef, KmsSigner, SignerError};
use crate::key_oracle::KeyOracle;

fn backend(e: impl fmt::Display) -> SignerError {
    SignerError::Backend(e.to_string())
}

/// Cloud KMS client usable for any key the credentials can reach.
pub struct GcpKms {
    client: Client,
}

impl fmt::Debug for GcpKms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpKms").finish_non_exhaustive()
    }
}

impl GcpKms {
    /// Connect to Cloud KMS.
    ///
    /// If `credentials_file` is `None` the default GCP auth chain is used.
    pub async fn connect(credentials_file: Option<&Path>) -> Result<Self, SignerError> {
        let cfg = match credentials_file {
            Some(path) => {
                let cred: CredentialsFile = serde_json::from_str(&std::fs::read_to_string(path)?)?;
                ClientConfig::default().with_credentials(cred).await.map_err(backend)?
            }
            None => ClientConfig::default().with_auth().await.map_err(backend)?,
        };
        let client = Client::new(cfg).await.map_err(backend)?;
        info!(target: "signer", with_credentials_file = credentials_file.is_some(), "Connected to Cloud KMS");
        Ok(Self { client })
    }

    /// Connect and bind a signer to `key` in one go.
    pub async fn signer(
        key: &GcpKeyRef,
        credentials_file: Option<&Path>,
    ) -> Result<KmsSigner<Self>, SignerError> {
        let kms = Self::connect(credentials_file).await?;
        KmsSigner::new(kms, key.resource_name()).await
    }
}

#[async_trait]
impl KeyOracle for GcpKms {
    async fn get_public_key(&self, key_name: &str) -> Result<String, SignerError> {
        let req = GetPublicKeyRequest { name: key_name.to_owned(), ..Default::default() };
        let resp = self.client.get_public_key(req, None).await.map_err(backend)?;
        debug!(target: "signer", key = key_name, algorithm = resp.algorithm, "Fetched public key");
        Ok(resp.pem)
    }

    async fn sign_digest(&self, key_name: &str, digest: B256) -> Result<Vec<u8>, SignerError> {
        // Build digest proto (sha256 oneof)
        let digest = Digest { digest: Some(gdigest::Digest::Sha256(digest.to_vec())) };
        let req = AsymmetricSignRequest {
            name: key_name.to_owned(),
            digest: Some(digest),
            ..Default::default()
        };
        let resp = self.client.asymmetric_sign(req, None).await.map_err(backend)?;
        Ok(resp.signature)
    }
}
