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

pub mod error;
pub use error::{Error, Result};

/// Async primitives: cancellable tasks and pub/sub
pub mod system;

/// Wallet provider seam and the Ethereum JSON-RPC provider
pub mod eth;

/// Bindings to deployed contracts
pub mod contract;

pub mod tracker;
pub use tracker::{FileStatusTracker, TrackerContext, TrackerSettings, TrackerState};

pub mod util;
