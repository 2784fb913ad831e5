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

use std::fmt;

use crate::{
    eth::{Address, U256},
    util::parse::{encode_base10, TOKEN_DECIMALS},
};

/// Observable state of a [`super::FileStatusTracker`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerState {
    /// Whether the record was finalized as of the last successful poll
    pub is_finalized: bool,
    /// Reward in display units (`reward_units / 10^18`)
    pub reward: f64,
    /// Reward in smallest token units
    pub reward_units: U256,
    /// Finalized and nothing withdrawn yet, as of the last successful poll.
    /// Cleared optimistically once a claim is confirmed.
    pub is_claimable: bool,
    /// A claim transaction is in flight
    pub is_claiming: bool,
    /// Failure message of the last operation, `None` if it succeeded
    pub error: Option<String>,
}

impl fmt::Display for TrackerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reward = encode_base10(self.reward_units, TOKEN_DECIMALS)
            .unwrap_or_else(|_| format!("{} units", self.reward_units));

        write!(
            f,
            "finalized={} reward={reward} claimable={} claiming={}",
            self.is_finalized,
            self.is_claimable,
            self.is_claiming,
        )?;

        if let Some(e) = &self.error {
            write!(f, " error=\"{e}\"")?;
        }

        Ok(())
    }
}

/// Network and wallet context the tracker runs against. Either address
/// may be missing while the host is still connecting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackerContext {
    /// Deployed `DataLiquidityPool` address
    pub contract: Option<Address>,
    /// Connected wallet address
    pub wallet: Option<Address>,
}

impl TrackerContext {
    pub fn new(contract: Option<Address>, wallet: Option<Address>) -> Self {
        Self { contract, wallet }
    }
}
