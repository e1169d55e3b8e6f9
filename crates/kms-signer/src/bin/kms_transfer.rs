//! Signs an ETH transfer with a Cloud KMS key and prints the raw transaction.
//!
//! Nonce and fees are taken from the command line, nothing is broadcast.
//! Submit the printed bytes with any `eth_sendRawTransaction` client.

use std::path::PathBuf;

use alloy_primitives::{hex, utils::parse_ether, Address};
use anyhow::Context;
use clap::Parser;
use kms_signer::{
    kms::{GcpKeyRef, GcpKms},
    transfer::{sign_transfer, TransferRequest, TRANSFER_GAS_LIMIT},
    EthSigner,
};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "kms-transfer", about = "Sign an ETH transfer with a KMS secp256k1 key")]
struct Args {
    /// Recipient address.
    #[arg(long)]
    to: Address,
    /// Amount in ether, e.g. `0.001`.
    #[arg(long)]
    value: String,
    #[arg(long, env = "CHAIN_ID")]
    chain_id: u64,
    #[arg(long)]
    nonce: u64,
    #[arg(long, default_value_t = TRANSFER_GAS_LIMIT)]
    gas_limit: u64,
    /// Max fee per gas in wei.
    #[arg(long)]
    max_fee_per_gas: u128,
    /// Max priority fee per gas in wei.
    #[arg(long)]
    max_priority_fee_per_gas: u128,
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
    let value = parse_ether(&args.value).with_context(|| format!("invalid ether amount '{}'", args.value))?;

    let key = GcpKeyRef::from_env().context("reading KMS key from environment")?;
    let signer = GcpKms::signer(&key, args.credentials.as_deref()).await.context("initializing KMS signer")?;
    info!(from = %signer.address(), to = %args.to, %value, "Signing transfer");

    let request = TransferRequest {
        chain_id: args.chain_id,
        nonce: args.nonce,
        to: args.to,
        value,
        gas_limit: args.gas_limit,
        max_fee_per_gas: args.max_fee_per_gas,
        max_priority_fee_per_gas: args.max_priority_fee_per_gas,
    };
    let signed = sign_transfer(&signer, request).await.context("signing transfer")?;

    println!("from: {}", signed.from);
    println!("hash: {}", signed.hash);
    println!("raw:  {}", hex::encode_prefixed(&signed.raw));
    Ok(())
}
