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

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::debug;

use super::{Address, Bytes, TransactionRequest, TxHash};
use crate::{Error, Result};

pub type ProviderPtr = Arc<dyn Provider>;

/// Wallet-provided RPC capability. Everything the tracker knows about
/// the chain goes through this trait, so hosts can plug in a node, a
/// wallet relay, or an in-memory double.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Accounts the wallet can sign for, preferred account first
    async fn accounts(&self) -> Result<Vec<Address>>;

    /// Execute a read-only call against the latest block and return the raw output
    async fn call(&self, tx: TransactionRequest) -> Result<Bytes>;

    /// Sign and broadcast a transaction, then wait for it to be mined.
    /// A reverted transaction is [`Error::TransactionReverted`]. Waiting
    /// longer than `timeout`, if given, is [`Error::ConfirmationTimeout`].
    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        timeout: Option<Duration>,
    ) -> Result<TxReceipt>;
}

/// Receipt of a successfully mined transaction
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
}

/// Signing context acquired from a [`Provider`]: the account that
/// transactions are sent from.
#[derive(Clone)]
pub struct Signer {
    provider: ProviderPtr,
    address: Address,
}

impl Signer {
    /// Ask the provider for its accounts and bind to the first one.
    pub async fn connect(provider: ProviderPtr) -> Result<Self> {
        let accounts = provider.accounts().await?;
        let Some(address) = accounts.first().copied() else { return Err(Error::NoWalletAccounts) };

        debug!(target: "eth::signer", "Using wallet account {address}");
        Ok(Self { provider, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> &ProviderPtr {
        &self.provider
    }
}
