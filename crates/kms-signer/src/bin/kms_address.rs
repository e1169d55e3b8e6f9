//! Prints the Ethereum address controlled by a Cloud KMS key.
//!
//! The key version is read from `PROJECT_ID`, `LOCATION_ID`, `KEY_RING_ID`,
//! `KEY_ID` and `VERSION_ID` (a `.env` file is honoured). `--pem` derives the
//! address offline from a saved public key instead.

use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;
use kms_signer::address::{derive_address, derive_address_strict};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kms-address", about = "Derive the Ethereum address of a KMS secp256k1 key")]
struct Args {
    /// Read the public key from a PEM file instead of Cloud KMS.
    #[arg(long)]
    pem: Option<PathBuf>,
    /// Parse the SubjectPublicKeyInfo instead of skipping the fixed DER header.
    #[arg(long)]
    strict: bool,
    /// Service account JSON, default GCP auth chain when absent.
    #[arg(long)]
    credentials: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let env_filter = EnvFilter::builder().with_default_directive(Level::INFO.into()).from_env_lossy();
    tracing_subscriber::fmt().with_writer(std::io::stderr).with_env_filter(env_filter).init();

    let args = Args::parse();
    let pem = match &args.pem {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?,
        None => fetch_pem(args.credentials.as_deref()).await?,
    };

    let derived = if args.strict { derive_address_strict(&pem) } else { derive_address(&pem) };
    let address = derived.context("deriving address from public key")?;
    println!("Checksum address: {address}");
    Ok(())
}

#[cfg(feature = "gcp")]
async fn fetch_pem(credentials: Option<&std::path::Path>) -> anyhow::Result<String> {
    use kms_signer::{kms::{GcpKeyRef, GcpKms}, KeyOracle};

    let key = GcpKeyRef::from_env().context("reading KMS key from environment")?;
    let kms = GcpKms::connect(credentials).await.context("connecting to Cloud KMS")?;
    kms.get_public_key(&key.resource_name()).await.context("fetching public key")
}

#[cfg(not(feature = "gcp"))]
async fn fetch_pem(_credentials: Option<&std::path::Path>) -> anyhow::Result<String> {
    anyhow::bail!("built without the `gcp` feature, pass --pem <FILE>")
}
