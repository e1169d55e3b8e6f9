//! Ethereum addresses and signatures for secp256k1 keys held in a KMS.
//!
//! Exposes:
//! * `address` - PEM public key to EIP-55 checksummed address
//! * `key_oracle` - capability trait of a remote key custodian
//! * `eth_signer` - trait for producing Ethereum `r‖s‖v` signatures
//! * `kms` - KMS-backed signer, Cloud KMS oracle (`gcp` feature), signer registry
//! * `transfer` - signing of plain value transfers

pub mod address;
pub mod eth_signer;
pub mod key_oracle;
pub mod kms;
pub mod local;
pub mod transfer;
mod util;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use address::{derive_address, derive_address_strict, AddressError};
pub use eth_signer::EthSigner;
pub use key_oracle::KeyOracle;
pub use kms::{KmsSigner, SignerError, SignerRegistry};
