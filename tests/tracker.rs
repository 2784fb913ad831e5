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

use std::{
    collections::HashMap,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use alloy::sol_types::SolCall;
use async_trait::async_trait;
use smol::{channel, future, Executor, Timer};

use dlp::{
    contract::{
        dlp::{claimContributionRewardCall, filesCall, filesReturn},
        DataLiquidityPool, FileRecord,
    },
    eth::{Address, Bytes, Provider, ProviderPtr, Signer, TransactionRequest, TxHash, TxReceipt, U256},
    Error, FileStatusTracker, Result, TrackerContext, TrackerSettings,
};

/// A single pool contract holding one record per file. Claims are mined
/// only when `mine` is set.
struct Pool {
    accounts: Vec<Address>,
    records: Mutex<HashMap<u64, FileRecord>>,
    mine: bool,
}

impl Pool {
    fn new(accounts: Vec<Address>, mine: bool) -> Self {
        Self { accounts, records: Mutex::new(HashMap::new()), mine }
    }
}

fn calldata(tx: &TransactionRequest) -> &[u8] {
    tx.input.input().map(|b| b.as_ref()).unwrap_or_default()
}

#[async_trait]
impl Provider for Pool {
    async fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.accounts.clone())
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes> {
        let call = filesCall::abi_decode(calldata(&tx))?;
        match self.records.lock().unwrap().get(&call.fileId.to::<u64>()) {
            Some(record) => Ok(Bytes::from(filesCall::abi_encode_returns(&filesReturn {
                ownerAddress: record.owner,
                url: record.url.clone(),
                encryptedKey: String::new(),
                addedTime: U256::ZERO,
                addedAtBlock: U256::ZERO,
                valid: record.valid,
                finalized: record.finalized,
                reward: record.reward,
                rewardWithdrawn: record.reward_withdrawn,
            }))),
            None => Err(Error::JsonRpcError("execution reverted".to_string())),
        }
    }

    async fn send_transaction(
        &self,
        tx: TransactionRequest,
        timeout: Option<Duration>,
    ) -> Result<TxReceipt> {
        assert_eq!(tx.from, self.accounts.first().copied());
        let call = claimContributionRewardCall::abi_decode(calldata(&tx))?;

        let file_id = call.fileId.to::<u64>();
        let hash = TxHash::repeat_byte(file_id as u8);

        if !self.mine {
            Timer::after(timeout.unwrap_or(Duration::MAX)).await;
            return Err(Error::ConfirmationTimeout(hash.to_string()))
        }

        let mut records = self.records.lock().unwrap();
        let record = records.get_mut(&file_id).unwrap();
        record.reward_withdrawn = record.reward;

        Ok(TxReceipt { transaction_hash: hash, block_number: Some(100) })
    }
}

fn wallet() -> Address {
    Address::from_str("0x113b6648f34f4d0340d04ff171cbcf0b49d47827").unwrap()
}

fn contract() -> Address {
    Address::from_str("0xf3a8ef1b06c25c4d0d4d7e5a3c1f3c87d9c2e4b1").unwrap()
}

fn finalized_record(reward: U256) -> FileRecord {
    FileRecord {
        owner: wallet(),
        url: "https://storage.example/contrib/42.enc".to_string(),
        valid: true,
        finalized: true,
        reward,
        reward_withdrawn: U256::ZERO,
    }
}

fn init_logger() {
    let _ = simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        //simplelog::LevelFilter::Debug,
        simplelog::ConfigBuilder::new().build(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
}

#[test]
fn tracker_claims_finalized_reward() -> Result<()> {
    init_logger();

    let pool = Pool::new(vec![wallet()], true);
    let five = U256::from(5_000_000_000_000_000_000u128);
    pool.records.lock().unwrap().insert(42, finalized_record(five));
    let provider: ProviderPtr = Arc::new(pool);

    let ex = Arc::new(Executor::new());
    let ex_ = ex.clone();
    let (signal, shutdown) = channel::unbounded::<()>();

    let settings = TrackerSettings {
        confirmation_timeout: Some(Duration::from_secs(5)),
        ..Default::default()
    };
    let context = TrackerContext::new(Some(contract()), Some(wallet()));

    let (_, result) = easy_parallel::Parallel::new()
        .each(0..2, |_| future::block_on(ex.run(shutdown.recv())))
        .finish(|| {
            future::block_on(async move {
                let _signal = signal;

                let tracker = FileStatusTracker::new(provider, context, settings, ex_);
                let sub = tracker.subscribe().await;
                tracker.attach(Some(42)).await;

                let state = sub.receive().await?;
                assert!(state.is_finalized);
                assert_eq!(state.reward, 5.0);
                assert_eq!(state.reward_units, five);
                assert!(state.is_claimable);
                assert_eq!(state.error, None);
                assert_eq!(state.to_string(), "finalized=true reward=5 claimable=true claiming=false");

                tracker.claim_reward().await?;
                let state = tracker.state();
                assert!(!state.is_claimable);
                assert!(!state.is_claiming);
                assert_eq!(state.error, None);

                tracker.detach().await;
                Ok::<(), Error>(())
            })
        });

    result
}

#[test]
fn unmined_claim_times_out() -> Result<()> {
    init_logger();

    let pool = Pool::new(vec![wallet()], false);
    pool.records.lock().unwrap().insert(9, finalized_record(U256::from(1u64)));
    let provider: ProviderPtr = Arc::new(pool);

    future::block_on(async {
        let pool = DataLiquidityPool::new(contract(), Signer::connect(provider).await?);
        assert_eq!(pool.address(), contract());

        let record = pool.files(9).await?;
        assert!(record.is_claimable());

        let claimed = pool.claim_contribution_reward(9, Some(Duration::from_millis(50))).await;
        let hash = TxHash::repeat_byte(9).to_string();
        assert!(matches!(claimed, Err(Error::ConfirmationTimeout(h)) if h == hash));

        assert!(matches!(pool.files(10).await, Err(Error::JsonRpcError(_))));
        Ok(())
    })
}

#[test]
fn wallet_without_accounts() {
    let provider: ProviderPtr = Arc::new(Pool::new(vec![], true));
    let signer = future::block_on(Signer::connect(provider));
    assert!(matches!(signer, Err(Error::NoWalletAccounts)));
}
