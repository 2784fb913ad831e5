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

//! Ethereum-side plumbing: the wallet provider seam and the node-backed
//! provider. Primitive types come from `alloy`.

pub use alloy::{
    primitives::{Address, Bytes, TxHash, U256},
    rpc::types::{TransactionInput, TransactionRequest},
};

/// Wallet provider trait and signing context
pub mod provider;
pub use provider::{Provider, ProviderPtr, Signer, TxReceipt};

/// Ethereum JSON-RPC provider
#[cfg(feature = "rpc")]
pub mod rpc_provider;
#[cfg(feature = "rpc")]
pub use rpc_provider::RpcProvider;
