//! Signer configuration: the JSON registry file and the Cloud KMS key
//! reference read from the environment.

use serde::Deserialize;

use super::SignerError;

/// Environment variables naming a Cloud KMS key version.
pub const ENV_PROJECT_ID: &str = "PROJECT_ID";
pub const ENV_LOCATION_ID: &str = "LOCATION_ID";
pub const ENV_KEY_RING_ID: &str = "KEY_RING_ID";
pub const ENV_KEY_ID: &str = "KEY_ID";
pub const ENV_VERSION_ID: &str = "VERSION_ID";

const fn default_version() -> u64 {
    1
}

/// Coordinates of a Cloud KMS `CryptoKeyVersion`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GcpKeyRef {
    pub project_id: String,
    pub location: String,
    pub key_ring: String,
    pub key: String,
    #[serde(default = "default_version")]
    pub version: u64,
}

impl GcpKeyRef {
    /// Full resource name, e.g.
    /// `projects/P/locations/L/keyRings/R/cryptoKeys/K/cryptoKeyVersions/1`.
    pub fn resource_name(&self) -> String {
        format!(
            "projects/{}/locations/{}/keyRings/{}/cryptoKeys/{}/cryptoKeyVersions/{}",
            self.project_id, self.location, self.key_ring, self.key, self.version
        )
    }

    /// Reads `PROJECT_ID`, `LOCATION_ID`, `KEY_RING_ID`, `KEY_ID` and the
    /// optional `VERSION_ID` (defaults to 1).
    pub fn from_env() -> Result<Self, SignerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// [`GcpKeyRef::from_env`] over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SignerError> {
        let required = |name: &'static str| {
            lookup(name).filter(|v| !v.is_empty()).ok_or(SignerError::MissingEnv(name))
        };
        let version = match lookup(ENV_VERSION_ID).filter(|v| !v.is_empty()) {
            Some(v) => v
                .parse()
                .map_err(|_| SignerError::InvalidConfig(format!("{ENV_VERSION_ID} must be a positive integer")))?,
            None => default_version(),
        };
        Ok(Self {
            project_id: required(ENV_PROJECT_ID)?,
            location: required(ENV_LOCATION_ID)?,
            key_ring: required(ENV_KEY_RING_ID)?,
            key: required(ENV_KEY_ID)?,
            version,
        })
    }
}

// === Registry file =========================================================
#[derive(Debug, Deserialize)]
pub(crate) struct SignerFile {
    pub(crate) default_key: String,
    pub(crate) keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyEntry {
    pub(crate) name: String,
    #[serde(flatten)]
    pub(crate) cfg: KeyConfig,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub(crate) enum KeyConfig {
    /// Local key stored on this host (no remote auth).
    /// One of the sources must be provided.
    Local {
        /// Raw hex string (0x…)
        #[serde(default)]
        private_key_hex: Option<String>,
        /// Name of an env var that contains the hex key
        #[serde(default)]
        env_var: Option<String>,
    },
    #[cfg(feature = "gcp")]
    Gcp {
        project_id: String,
        location: String,
        key_ring: String,
        key: String,
        #[serde(default = "default_version")]
        version: u64,
        #[serde(default)]
        credentials_file: Option<String>,
    },
    #[cfg(not(feature = "gcp"))]
    #[serde(other)]
    _Unsupported,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn resource_name_from_env() {
        let env = vars(&[
            ("PROJECT_ID", "acme"),
            ("LOCATION_ID", "europe-west1"),
            ("KEY_RING_ID", "eth"),
            ("KEY_ID", "treasury"),
            ("VERSION_ID", "3"),
        ]);
        let key = GcpKeyRef::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(
            key.resource_name(),
            "projects/acme/locations/europe-west1/keyRings/eth/cryptoKeys/treasury/cryptoKeyVersions/3"
        );
    }

    #[test]
    fn version_defaults_to_one() {
        let env = vars(&[("PROJECT_ID", "p"), ("LOCATION_ID", "l"), ("KEY_RING_ID", "r"), ("KEY_ID", "k")]);
        let key = GcpKeyRef::from_lookup(|k| env.get(k).cloned()).unwrap();
        assert_eq!(key.version, 1);
    }

    #[test]
    fn missing_and_invalid_vars() {
        let env = vars(&[("PROJECT_ID", "p"), ("LOCATION_ID", ""), ("KEY_RING_ID", "r"), ("KEY_ID", "k")]);
        let err = GcpKeyRef::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, SignerError::MissingEnv("LOCATION_ID")));

        let env = vars(&[
            ("PROJECT_ID", "p"),
            ("LOCATION_ID", "l"),
            ("KEY_RING_ID", "r"),
            ("KEY_ID", "k"),
            ("VERSION_ID", "latest"),
        ]);
        let err = GcpKeyRef::from_lookup(|k| env.get(k).cloned()).unwrap_err();
        assert!(matches!(err, SignerError::InvalidConfig(_)));
    }

    #[test]
    fn parse_local_config() {
        let json = r#"{
            "default_key": "dev",
            "keys": [
                { "name": "dev", "backend": "local", "private_key_hex": "0x01" }
            ]
        }"#;
        let file: SignerFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.default_key, "dev");
        assert_eq!(file.keys.len(), 1);
        assert!(matches!(file.keys[0].cfg, KeyConfig::Local { env_var: None, .. }));
    }

    #[cfg(feature = "gcp")]
    #[test]
    fn parse_gcp_config() {
        let json = r#"{
            "default_key": "treasury",
            "keys": [{
                "name": "treasury", "backend": "gcp", "project_id": "acme",
                "location": "global", "key_ring": "eth", "key": "treasury"
            }]
        }"#;
        let file: SignerFile = serde_json::from_str(json).unwrap();
        assert!(matches!(&file.keys[0].cfg, KeyConfig::Gcp { version: 1, credentials_file: None, .. }));
    }
}
