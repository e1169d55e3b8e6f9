//! Value transfers signed by an [`EthSigner`].
//!
//! Transactions are EIP-1559 calls with empty calldata. Signing happens here,
//! broadcasting does not: the raw EIP-2718 bytes are handed to whatever
//! [`TransactionSender`] the caller provides (an RPC client, a queue, stdout).

use alloy_consensus::{SignableTransaction, TxEip1559, TxEnvelope};
use alloy_eips::eip2718::Encodable2718;
use alloy_primitives::{Address, Bytes, ChainId, Signature, TxKind, B256, U256};
use async_trait::async_trait;
use tracing::{info, warn};

use crate::{eth_signer::EthSigner, kms::SignerError};

/// Gas used by a plain ETH transfer to an externally owned account.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// Parameters of a value transfer. Nonce and fees come from the caller, this
/// crate never queries a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub chain_id: ChainId,
    pub nonce: u64,
    pub to: Address,
    /// Amount in wei.
    pub value: U256,
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl TransferRequest {
    fn into_tx(self) -> TxEip1559 {
        TxEip1559 {
            chain_id: self.chain_id,
            nonce: self.nonce,
            gas_limit: self.gas_limit,
            max_fee_per_gas: self.max_fee_per_gas,
            max_priority_fee_per_gas: self.max_priority_fee_per_gas,
            to: TxKind::Call(self.to),
            value: self.value,
            input: Bytes::new(),
            ..Default::default()
        }
    }
}

/// A signed transfer ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransfer {
    pub from: Address,
    pub hash: B256,
    pub signature: Signature,
    /// EIP-2718 encoding (`0x02 ‖ rlp(...)`).
    pub raw: Bytes,
}

/// Sink for signed transactions, typically `eth_sendRawTransaction`.
#[async_trait]
pub trait TransactionSender: Send + Sync {
    /// Submit `raw` and return the transaction hash reported by the sink.
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256, SignerError>;
}

/// Builds the transfer described by `request` and signs it with `signer`.
pub async fn sign_transfer<S>(signer: &S, request: TransferRequest) -> Result<SignedTransfer, SignerError>
where
    S: EthSigner + ?Sized,
{
    if request.gas_limit < TRANSFER_GAS_LIMIT {
        return Err(SignerError::InvalidConfig(format!(
            "gas limit {} is below the {TRANSFER_GAS_LIMIT} needed for a transfer",
            request.gas_limit
        )));
    }
    if request.max_priority_fee_per_gas > request.max_fee_per_gas {
        return Err(SignerError::InvalidConfig("priority fee exceeds max fee per gas".into()));
    }

    let tx = request.into_tx();
    let raw_sig = signer.sign_hash(tx.signature_hash()).await?;
    let signature = Signature::new(
        U256::from_be_slice(&raw_sig[..32]),
        U256::from_be_slice(&raw_sig[32..64]),
        raw_sig[64] == 1,
    );

    let signed = tx.into_signed(signature);
    let hash = *signed.hash();
    let envelope = TxEnvelope::from(signed);
    Ok(SignedTransfer { from: signer.address(), hash, signature, raw: envelope.encoded_2718().into() })
}

/// Signs the transfer and submits it through `sender`.
pub async fn send_transfer<S, T>(
    signer: &S,
    sender: &T,
    request: TransferRequest,
) -> Result<SignedTransfer, SignerError>
where
    S: EthSigner + ?Sized,
    T: TransactionSender + ?Sized,
{
    let signed = sign_transfer(signer, request).await?;
    let reported = sender.send_raw_transaction(&signed.raw).await?;
    if reported != signed.hash {
        warn!(target: "signer", expected = %signed.hash, %reported, "Sender reported a different transaction hash");
    }
    info!(target: "signer", from = %signed.from, hash = %signed.hash, "Transfer submitted");
    Ok(signed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalSigner;
    use alloy_primitives::{address, keccak256};

    fn request() -> TransferRequest {
        TransferRequest {
            chain_id: 11155111,
            nonce: 7,
            to: address!("E94E130546485b928C9C9b9A5e69EB787172952e"),
            value: U256::from(1_000_000_000_000_000u64),
            gas_limit: TRANSFER_GAS_LIMIT,
            max_fee_per_gas: 30_000_000_000,
            max_priority_fee_per_gas: 1_000_000_000,
        }
    }

    fn signer() -> LocalSigner {
        LocalSigner::from_hex("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318").unwrap()
    }

    #[tokio::test]
    async fn typed_envelope_and_hash() {
        let signed = sign_transfer(&signer(), request()).await.unwrap();
        assert_eq!(signed.raw[0], 0x02);
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[tokio::test]
    async fn signature_recovers_sender() {
        let signer = signer();
        let signed = sign_transfer(&signer, request()).await.unwrap();
        let prehash = request().into_tx().signature_hash();
        assert_eq!(signed.signature.recover_address_from_prehash(&prehash).unwrap(), signer.address());
        assert_eq!(signed.from, signer.address());
    }

    #[tokio::test]
    async fn rejects_low_gas_and_inverted_fees() {
        let mut low_gas = request();
        low_gas.gas_limit = 20_000;
        assert!(matches!(sign_transfer(&signer(), low_gas).await, Err(SignerError::InvalidConfig(_))));

        let mut fees = request();
        fees.max_priority_fee_per_gas = fees.max_fee_per_gas + 1;
        assert!(matches!(sign_transfer(&signer(), fees).await, Err(SignerError::InvalidConfig(_))));
    }
}
