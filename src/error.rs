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

// Hello developer. Please add your error to the according subsection
// that is commented, or make a new subsection. Keep it clean.

/// Main result type used throughout the codebase.
pub type Result<T> = std::result::Result<T, Error>;

/// General library errors used throughout the codebase.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    // ==============
    // Parsing errors
    // ==============
    #[error(transparent)]
    ParseFloatError(#[from] std::num::ParseFloatError),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unit conversion failed: {0}")]
    UnitsError(String),

    // ===============
    // Encoding errors
    // ===============
    #[error("ABI decode failed: {0}")]
    AbiDecodeError(String),

    // ======================
    // Provider-related errors
    // ======================
    #[error("JSON-RPC client error: {0}")]
    RpcClientError(String),

    #[error("{0}")]
    JsonRpcError(String),

    #[error("Wallet exposes no accounts")]
    NoWalletAccounts,

    #[error("Transaction {0} reverted")]
    TransactionReverted(String),

    #[error("Timed out waiting for transaction {0} confirmation")]
    ConfirmationTimeout(String),

    // =====================
    // Tracker-related errors
    // =====================
    #[error("Wallet not connected, contract address not set, or file ID not available")]
    ContextNotReady,

    #[error("A reward claim is already in flight")]
    ClaimInProgress,

    // ===============
    // System errors
    // ===============
    #[error("Task stopped")]
    TaskStopped,

    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),

    #[cfg(feature = "async-daemonize")]
    #[error("Logger initialization failed: {0}")]
    SetLoggerError(String),

    // ==============================================
    // Catch-all for errors that carry their own text
    // ==============================================
    #[error("{0}")]
    Custom(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.kind())
    }
}

impl From<alloy::sol_types::Error> for Error {
    fn from(err: alloy::sol_types::Error) -> Self {
        Self::AbiDecodeError(err.to_string())
    }
}

impl From<alloy::primitives::utils::UnitsError> for Error {
    fn from(err: alloy::primitives::utils::UnitsError) -> Self {
        Self::UnitsError(err.to_string())
    }
}

#[cfg(feature = "rpc")]
impl From<alloy::transports::TransportError> for Error {
    fn from(err: alloy::transports::TransportError) -> Self {
        match err.as_error_resp() {
            Some(payload) => Self::JsonRpcError(payload.message.to_string()),
            None => Self::RpcClientError(err.to_string()),
        }
    }
}

#[cfg(feature = "async-daemonize")]
impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Self::SetLoggerError(err.to_string())
    }
}
