#![allow(missing_docs)]
//! KMS-backed and local signers registry.
//!
//! All concrete back-ends implement the common [`EthSigner`] trait so they
//! can be plugged anywhere a signature is needed (transfers, tooling, etc.).
//!
//! Use [`SignerRegistry::from_config`] to load a JSON configuration at runtime,
//! or [`SignerRegistry::insert`] to register signers built in code.

use core::fmt;
use std::{collections::HashMap, fs, path::Path, sync::Arc};

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{address::AddressError, eth_signer::EthSigner};

mod config;
#[cfg(feature = "gcp")]
mod gcp;
mod signer;

pub use config::{
    GcpKeyRef, ENV_KEY_ID, ENV_KEY_RING_ID, ENV_LOCATION_ID, ENV_PROJECT_ID, ENV_VERSION_ID,
};
#[cfg(feature = "gcp")]
pub use gcp::GcpKms;
pub use signer::KmsSigner;

use config::{KeyConfig, SignerFile};

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error("unknown backend '{0}' (feature disabled)")]
    UnknownBackend(String),
    #[error("key '{0}' not found in registry")]
    KeyNotFound(String),
    #[error("duplicate key name '{0}' in config file")]
    DuplicateKey(String),
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("kms backend error: {0}")]
    Backend(String),
    #[error("signature decode error: {0}")]
    Decode(String),
    #[error("secp256k1 recovery failed")]
    Recover,
}

// === SignerKms =============================================================
/// Unified enum that wraps all supported signer implementations.
#[allow(clippy::large_enum_variant)]
pub enum SignerKms {
    Local(crate::local::LocalSigner),
    #[cfg(feature = "gcp")]
    Gcp(KmsSigner<GcpKms>),
}

impl fmt::Debug for SignerKms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(_) => f.write_str("SignerKms::Local"),
            #[cfg(feature = "gcp")]
            Self::Gcp(_) => f.write_str("SignerKms::Gcp"),
        }
    }
}

#[async_trait]
impl EthSigner for SignerKms {
    fn address(&self) -> Address {
        match self {
            Self::Local(s) => s.address(),
            #[cfg(feature = "gcp")]
            Self::Gcp(s) => s.address(),
        }
    }

    async fn sign_hash(&self, hash: B256) -> Result<[u8; 65], SignerError> {
        match self {
            Self::Local(s) => s.sign_hash(hash).await,
            #[cfg(feature = "gcp")]
            Self::Gcp(s) => s.sign_hash(hash).await,
        }
    }
}

impl KeyConfig {
    async fn build_signer(self) -> Result<SignerKms, SignerError> {
        match self {
            Self::Local { private_key_hex, env_var } => {
                let pk_hex = if let Some(hex) = private_key_hex {
                    Some(hex)
                } else if let Some(var) = env_var {
                    std::env::var(&var).ok()
                } else {
                    None
                }
                .ok_or_else(|| SignerError::InvalidConfig("no local key provided".into()))?;
                Ok(SignerKms::Local(crate::local::LocalSigner::from_hex(&pk_hex)?))
            }
            #[cfg(feature = "gcp")]
            Self::Gcp { project_id, location, key_ring, key, version, credentials_file } => {
                let key_ref = GcpKeyRef { project_id, location, key_ring, key, version };
                let kms = GcpKms::connect(credentials_file.as_deref().map(Path::new)).await?;
                Ok(SignerKms::Gcp(KmsSigner::new(kms, key_ref.resource_name()).await?))
            }
            #[allow(unreachable_patterns)]
            _ => Err(SignerError::UnknownBackend("gcp".into())),
        }
    }
}

// === Registry ==============================================================

/// Holds a map of KMS/local signers keyed by name.
pub struct SignerRegistry {
    signers: HashMap<String, Arc<dyn EthSigner>>,
    default: String,
}

impl fmt::Debug for SignerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&String> = self.signers.keys().collect();
        f.debug_struct("SignerRegistry")
            .field("keys", &keys)
            .field("default", &self.default)
            .finish()
    }
}

impl SignerRegistry {
    /// Registry holding a single signer, which is also the default.
    pub fn new(name: impl Into<String>, signer: Arc<dyn EthSigner>) -> Self {
        let name = name.into();
        info!(target: "signer", name = %name, address = %signer.address(), "Registered signer");
        Self { signers: HashMap::from([(name.clone(), signer)]), default: name }
    }

    /// Load the registry from a JSON configuration file.
    pub async fn from_config(path: impl AsRef<Path>) -> Result<Self, SignerError> {
        let text = fs::read_to_string(&path)?;
        let registry = Self::from_json(&text).await?;
        info!(target: "signer", "Loaded {} signer(s) from {:?}", registry.len(), path.as_ref());
        Ok(registry)
    }

    /// Build the registry from the JSON text of a configuration file.
    pub async fn from_json(text: &str) -> Result<Self, SignerError> {
        let file: SignerFile = serde_json::from_str(text)?;

        let mut signers: HashMap<String, Arc<dyn EthSigner>> = HashMap::with_capacity(file.keys.len());
        for entry in file.keys {
            if signers.contains_key(&entry.name) {
                return Err(SignerError::DuplicateKey(entry.name));
            }
            let is_local = matches!(&entry.cfg, KeyConfig::Local { .. });
            let signer: Arc<dyn EthSigner> = Arc::new(entry.cfg.build_signer().await?);
            if is_local {
                warn!(target: "signer", "Using local signer '{}' - DO NOT use in production", entry.name);
            }
            signers.insert(entry.name, signer);
        }

        if !signers.contains_key(&file.default_key) {
            return Err(SignerError::KeyNotFound(file.default_key));
        }
        Ok(Self { signers, default: file.default_key })
    }

    /// Registers an additional signer. Names are unique.
    pub fn insert(&mut self, name: impl Into<String>, signer: Arc<dyn EthSigner>) -> Result<(), SignerError> {
        let name = name.into();
        if self.signers.contains_key(&name) {
            return Err(SignerError::DuplicateKey(name));
        }
        info!(target: "signer", name = %name, address = %signer.address(), "Registered signer");
        self.signers.insert(name, signer);
        Ok(())
    }

    /// Returns the requested signer or the default one if `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<dyn EthSigner>, SignerError> {
        let key = name.unwrap_or(&self.default);
        self.signers
            .get(key)
            .cloned()
            .ok_or_else(|| SignerError::KeyNotFound(key.to_owned()))
    }

    /// Finds the signer controlling `address`.
    pub fn by_address(&self, address: Address) -> Option<Arc<dyn EthSigner>> {
        self.signers.values().find(|s| s.address() == address).cloned()
    }

    /// Name of the default signer.
    pub fn default_name(&self) -> &str {
        &self.default
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}
