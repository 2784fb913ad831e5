/* This file is part of DarkFi (https://dark.fi)
 *
 * Copyright (C) 2020-2026 Dyne.org foundation
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

use std::{future::Future, time::Duration};

use alloy::{
    network::ReceiptResponse,
    providers::{
        DynProvider, PendingTransactionError, Provider as _, ProviderBuilder, WatchTxError,
    },
};
use async_trait::async_trait;
use log::{debug, info};
use tokio::runtime::Runtime;
use url::Url;

use super::{Address, Bytes, Provider, TransactionRequest, TxReceipt};
use crate::{Error, Result};

/// [`Provider`] backed by an Ethereum JSON-RPC endpoint. Transactions are
/// submitted with `eth_sendTransaction`, so the node (or the wallet relay
/// in front of it) holds the keys.
///
/// The alloy transport needs a tokio reactor, so requests run on a small
/// runtime owned by the provider and are awaited from the caller's executor.
pub struct RpcProvider {
    endpoint: Url,
    provider: DynProvider,
    runtime: Runtime,
}

impl RpcProvider {
    /// Connect to `endpoint`. Pending transactions are looked up every
    /// `poll_interval` until they are mined.
    pub fn new(endpoint: Url, poll_interval: Duration) -> Result<Self> {
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(Error::RpcClientError(format!(
                "Unsupported endpoint scheme: {}",
                endpoint.scheme()
            )))
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("dlp-rpc")
            .enable_all()
            .build()?;

        let provider = ProviderBuilder::new().connect_http(endpoint.clone());
        provider.client().set_poll_interval(poll_interval);

        Ok(Self { endpoint, provider: provider.erased(), runtime })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run `fut` on the provider's runtime and await its output.
    async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        match self.runtime.spawn(fut).await {
            Ok(res) => res,
            Err(e) => Err(Error::RpcClientError(format!("Request task failed: {e}"))),
        }
    }
}

/// Map a failed wait for a transaction receipt.
fn pending_error(err: PendingTransactionError, hash: String) -> Error {
    match err {
        PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
            Error::ConfirmationTimeout(hash)
        }
        PendingTransactionError::TransportError(e) => e.into(),
        e => Error::RpcClientError(e.to_string()),
    }
}

#[async_trait]
impl Provider for RpcProvider {
    async fn accounts(&self) -> Result<Vec<Address>> {
        debug!(target: "eth::rpc_provider", "[{}] eth_accounts", self.endpoint);
        let provider = self.provider.clone();
        self.run(async move { Ok(provider.get_accounts().await?) }).await
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        debug!(target: "eth::rpc_provider", "[{}] eth_call", self.endpoint);
        let provider = self.provider.clone();
        self.run(async move { Ok(provider.call(tx).await?) }).await
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        timeout: Option<Duration>,
    ) -> Result<TxReceipt> {
        debug!(target: "eth::rpc_provider", "[{}] eth_sendTransaction", self.endpoint);
        let provider = self.provider.clone();

        self.run(async move {
            let pending = provider.send_transaction(tx).await?;
            let hash = *pending.tx_hash();
            info!(target: "eth::rpc_provider", "Broadcast transaction {hash}");

            let receipt = match pending.with_timeout(timeout).get_receipt().await {
                Ok(receipt) => receipt,
                Err(e) => return Err(pending_error(e, hash.to_string())),
            };

            if !receipt.status() {
                return Err(Error::TransactionReverted(hash.to_string()))
            }

            Ok(TxReceipt {
                transaction_hash: receipt.transaction_hash,
                block_number: receipt.block_number,
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use alloy::transports::TransportErrorKind;

    use super::*;

    #[test]
    fn only_http_endpoints() {
        let endpoint = Url::parse("ws://127.0.0.1:8546").unwrap();
        assert!(RpcProvider::new(endpoint, Duration::from_secs(1)).is_err());

        let endpoint = Url::parse("http://127.0.0.1:8545").unwrap();
        let provider = RpcProvider::new(endpoint.clone(), Duration::from_secs(1)).unwrap();
        assert_eq!(provider.endpoint(), &endpoint);
    }

    #[test]
    fn receipt_wait_errors() {
        let hash = "0xabc".to_string();

        let err = pending_error(WatchTxError::Timeout.into(), hash.clone());
        assert!(matches!(err, Error::ConfirmationTimeout(h) if h == hash));

        let err = pending_error(TransportErrorKind::custom_str("connection refused").into(), hash);
        assert!(matches!(err, Error::RpcClientError(_)));
    }
}
