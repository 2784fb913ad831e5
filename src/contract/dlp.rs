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

use std::time::Duration;

use alloy::{sol, sol_types::SolCall};
use log::{debug, info};

use crate::{
    eth::{Address, Bytes, Signer, TransactionInput, TransactionRequest, TxReceipt, U256},
    Result,
};

sol! {
    interface IDataLiquidityPool {
        function files(uint256 fileId) external view returns (
            address ownerAddress,
            string url,
            string encryptedKey,
            uint256 addedTime,
            uint256 addedAtBlock,
            bool valid,
            bool finalized,
            uint256 reward,
            uint256 rewardWithdrawn
        );

        function claimContributionReward(uint256 fileId) external;
    }
}

pub use IDataLiquidityPool::{claimContributionRewardCall, filesCall, filesReturn};

/// Snapshot of a file's contribution record as stored by the contract
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub owner: Address,
    pub url: String,
    pub valid: bool,
    pub finalized: bool,
    /// Reward in smallest token units
    pub reward: U256,
    /// Already withdrawn reward in smallest token units
    pub reward_withdrawn: U256,
}

impl FileRecord {
    /// A reward can be claimed once the record is finalized and nothing
    /// was withdrawn yet.
    pub fn is_claimable(&self) -> bool {
        self.finalized && self.reward_withdrawn.is_zero()
    }

    /// Decode the return data of `files(uint256)`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Ok(filesCall::abi_decode_returns(data)?.into())
    }
}

impl From<filesReturn> for FileRecord {
    fn from(ret: filesReturn) -> Self {
        Self {
            owner: ret.ownerAddress,
            url: ret.url,
            valid: ret.valid,
            finalized: ret.finalized,
            reward: ret.reward,
            reward_withdrawn: ret.rewardWithdrawn,
        }
    }
}

/// Handle to a deployed `DataLiquidityPool` contract, bound to a signer.
pub struct DataLiquidityPool {
    address: Address,
    signer: Signer,
}

impl DataLiquidityPool {
    pub fn new(address: Address, signer: Signer) -> Self {
        Self { address, signer }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn request(&self, call: &impl SolCall) -> TransactionRequest {
        TransactionRequest::default()
            .from(self.signer.address())
            .to(self.address)
            .input(TransactionInput::new(Bytes::from(call.abi_encode())))
    }

    /// Read the contribution record of `file_id`.
    pub async fn files(&self, file_id: u64) -> Result<FileRecord> {
        let tx = self.request(&filesCall { fileId: U256::from(file_id) });
        let output = self.signer.provider().call(tx).await?;
        let record = FileRecord::decode(&output)?;
        debug!(target: "contract::dlp::files", "File {file_id}: {record:?}");
        Ok(record)
    }

    /// Submit the reward claim for `file_id` and wait until it is mined,
    /// giving up after `timeout` if set.
    pub async fn claim_contribution_reward(
        &self,
        file_id: u64,
        timeout: Option<Duration>,
    ) -> Result<TxReceipt> {
        let tx = self.request(&claimContributionRewardCall { fileId: U256::from(file_id) });
        let receipt = self.signer.provider().send_transaction(tx, timeout).await?;
        info!(
            target: "contract::dlp::claim_contribution_reward",
            "Reward claim for file {file_id} mined in block {:?}: {}",
            receipt.block_number, receipt.transaction_hash,
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(finalized: bool, withdrawn: u64) -> Vec<u8> {
        filesCall::abi_encode_returns(&filesReturn {
            ownerAddress: Address::repeat_byte(0x11),
            url: "https://storage.example/contrib/42.enc".to_string(),
            encryptedKey: "0xkey".to_string(),
            addedTime: U256::from(1_700_000_000u64),
            addedAtBlock: U256::from(812_001u64),
            valid: true,
            finalized,
            reward: U256::from(5_000_000_000_000_000_000u128),
            rewardWithdrawn: U256::from(withdrawn),
        })
    }

    #[test]
    fn claimable_truth_table() {
        let claimable = |f, w| FileRecord::decode(&output(f, w)).unwrap().is_claimable();
        assert!(claimable(true, 0));
        assert!(!claimable(true, 1));
        assert!(!claimable(false, 0));
        assert!(!claimable(false, 1));
    }

    #[test]
    fn decode_getter_output() {
        let record = FileRecord::decode(&output(true, 0)).unwrap();
        assert_eq!(record.owner, Address::repeat_byte(0x11));
        assert_eq!(record.url, "https://storage.example/contrib/42.enc");
        assert!(record.valid);
        assert_eq!(record.reward, U256::from(5_000_000_000_000_000_000u128));

        // Truncated output is rejected rather than zero-filled
        let data = output(true, 0);
        assert!(FileRecord::decode(&data[..data.len() / 2]).is_err());
    }

    #[test]
    fn call_selectors() {
        assert_eq!(filesCall::SIGNATURE, "files(uint256)");
        assert_eq!(claimContributionRewardCall::SIGNATURE, "claimContributionReward(uint256)");

        let data = claimContributionRewardCall { fileId: U256::from(42u64) }.abi_encode();
        assert_eq!(&data[..4], &claimContributionRewardCall::SELECTOR);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 42);
    }
}
