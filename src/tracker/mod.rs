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

//! Contribution status tracking.
//!
//! A [`FileStatusTracker`] follows one file's record in a
//! `DataLiquidityPool` contract. Once attached to a file ID it refreshes
//! the record right away and then on a fixed interval, and it exposes
//! [`FileStatusTracker::claim_reward`] to withdraw the reward once the
//! record is finalized.
//!
//! Every attach, detach or context change starts a new epoch. Results of
//! operations started in an older epoch are dropped instead of being
//! written into the state, so a late reply can never overwrite the view
//! of a newer target.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex as SyncMutex, MutexGuard, PoisonError, RwLock, Weak,
    },
    time::Duration,
};

use log::{debug, error, info, warn};
use smol::{lock::Mutex, Timer};

use crate::{
    contract::{DataLiquidityPool, FileRecord},
    eth::{Address, ProviderPtr, Signer, TxReceipt},
    system::{ExecutorPtr, Publisher, PublisherPtr, StoppableTask, StoppableTaskPtr, Subscription},
    util::parse::{format_units, TOKEN_DECIMALS},
    Error, Result,
};

/// Tracker state and context types
pub mod state;
pub use state::{TrackerContext, TrackerState};

/// Tracker timing settings
pub mod settings;
pub use settings::TrackerSettings;
#[cfg(feature = "async-daemonize")]
pub use settings::TrackerSettingsOpt;


/// Error message shown when a status refresh fails
pub const REFRESH_FAILED: &str = "Failed to check file status";

/// Prefix of the error message shown when a claim fails
pub const CLAIM_FAILED: &str = "Failed to claim reward";

pub type FileStatusTrackerPtr = Arc<FileStatusTracker>;

pub struct FileStatusTracker {
    /// Wallet provider every chain access goes through
    provider: ProviderPtr,
    /// Timing settings
    settings: TrackerSettings,
    /// Contract and wallet addresses, read fresh by every operation
    context: RwLock<TrackerContext>,
    /// File the tracker is attached to
    file_id: RwLock<Option<u64>>,
    /// Observable state
    state: SyncMutex<TrackerState>,
    /// Attachment epoch, bumped on every retarget
    epoch: AtomicU64,
    /// Set while a claim is in flight
    claiming: AtomicBool,
    /// Background polling task, `None` while detached
    poll_task: Mutex<Option<StoppableTaskPtr>>,
    /// Publisher of state snapshots
    publisher: PublisherPtr<TrackerState>,
    /// Executor the polling task runs on
    executor: ExecutorPtr,
}

/// Resets the in-flight claim markers however the claim future ends,
/// including when it is dropped mid-flight.
struct ClaimGuard<'a> {
    tracker: &'a FileStatusTracker,
    released: bool,
}

impl ClaimGuard<'_> {
    /// Clear the in-flight markers and return the resulting state.
    fn reset(&self) -> TrackerState {
        let mut state = self.tracker.lock_state();
        state.is_claiming = false;
        self.tracker.claiming.store(false, Ordering::SeqCst);
        state.clone()
    }

    /// Clear the in-flight markers and publish the final state.
    async fn release(mut self) {
        self.released = true;
        let snapshot = self.reset();
        self.tracker.publisher.notify(snapshot).await;
    }
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return
        }

        // Claim future was cancelled, publish from a detached task
        let snapshot = self.reset();
        let publisher = self.tracker.publisher.clone();
        self.tracker.executor.spawn(async move { publisher.notify(snapshot).await }).detach();
    }
}

impl FileStatusTracker {
    /// Create a detached tracker. Intervals shorter than
    /// [`settings::MIN_INTERVAL`] are raised to it.
    pub fn new(
        provider: ProviderPtr,
        context: TrackerContext,
        settings: TrackerSettings,
        executor: ExecutorPtr,
    ) -> FileStatusTrackerPtr {
        Arc::new(Self {
            provider,
            settings: settings.clamped(),
            context: RwLock::new(context),
            file_id: RwLock::new(None),
            state: SyncMutex::new(TrackerState::default()),
            epoch: AtomicU64::new(0),
            claiming: AtomicBool::new(false),
            poll_task: Mutex::new(None),
            publisher: Publisher::new(),
            executor,
        })
    }

    /// Snapshot of the current state
    pub fn state(&self) -> TrackerState {
        self.lock_state().clone()
    }

    /// Current network and wallet context
    pub fn context(&self) -> TrackerContext {
        *self.context.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// File the tracker is attached to, if any
    pub fn file_id(&self) -> Option<u64> {
        *self.file_id.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Subscribe to state snapshots, one per state change.
    pub async fn subscribe(&self) -> Subscription<TrackerState> {
        self.publisher.clone().subscribe().await
    }

    /// Bind the tracker to `file_id` and start polling it: one refresh
    /// right away, then one per poll interval. Any previous polling is
    /// stopped first. `None` detaches.
    pub async fn attach(self: &Arc<Self>, file_id: Option<u64>) {
        let mut poll_task = self.poll_task.lock().await;

        // Publish the new target before bumping the epoch, so anything
        // observing the new epoch also observes the new file ID.
        *self.file_id.write().unwrap_or_else(PoisonError::into_inner) = file_id;
        let epoch = self.bump_epoch();

        if let Some(task) = poll_task.take() {
            task.stop().await;
        }

        let Some(file_id) = file_id else {
            debug!(target: "tracker::attach", "Detached, epoch {epoch}");
            return
        };

        info!(
            target: "tracker::attach",
            "Tracking file {file_id}, refreshing every {:?}", self.settings.poll_interval,
        );

        let task = StoppableTask::new();
        task.clone().start(
            Self::poll_loop(Arc::downgrade(self), self.settings.poll_interval),
            |res| async move {
                match res {
                    Ok(()) | Err(Error::TaskStopped) => { /* Do nothing */ }
                    Err(e) => error!(target: "tracker::poll_loop", "Polling task failed: {e}"),
                }
            },
            Error::TaskStopped,
            self.executor.clone(),
        );
        *poll_task = Some(task);
    }

    /// Stop polling and forget the file ID. Returns once the polling task
    /// has stopped; nothing started before this call writes state afterwards.
    pub async fn detach(self: &Arc<Self>) {
        self.attach(None).await
    }

    /// Replace the network and wallet context. If attached, the poll cycle
    /// restarts against the new context.
    pub async fn set_context(self: &Arc<Self>, context: TrackerContext) {
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = context;
        self.attach(self.file_id()).await
    }

    /// Read the file's record from the contract and update the state.
    /// Failures are logged and surfaced through [`TrackerState::error`],
    /// keeping the last known good values.
    pub async fn refresh_status(&self) -> Result<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let (contract, file_id) = match self.target() {
            Ok(v) => v,
            Err(e) => {
                self.update(epoch, |s| s.error = Some(e.to_string())).await;
                return Err(e)
            }
        };

        match self.fetch_record(contract, file_id).await {
            Ok((record, reward)) => {
                debug!(
                    target: "tracker::refresh_status",
                    "File {file_id}: finalized={} reward={reward}", record.finalized,
                );
                let is_claimable = record.is_claimable();
                self.update(epoch, |s| {
                    s.is_finalized = record.finalized;
                    s.reward = reward;
                    s.reward_units = record.reward;
                    s.is_claimable = is_claimable;
                    s.error = None;
                })
                .await;
                Ok(())
            }

            Err(e) => {
                error!(target: "tracker::refresh_status", "Error checking file {file_id} status: {e}");
                self.update(epoch, |s| s.error = Some(REFRESH_FAILED.to_string())).await;
                Err(e)
            }
        }
    }

    /// Submit the reward claim for the attached file, wait for its
    /// confirmation and refresh the status. Only one claim may be in
    /// flight; a concurrent call fails with [`Error::ClaimInProgress`].
    pub async fn claim_reward(&self) -> Result<()> {
        let epoch = self.epoch.load(Ordering::SeqCst);

        let (contract, file_id) = match self.target() {
            Ok(v) => v,
            Err(e) => {
                self.update(epoch, |s| s.error = Some(e.to_string())).await;
                return Err(e)
            }
        };

        if self.claiming.swap(true, Ordering::SeqCst) {
            warn!(target: "tracker::claim_reward", "Claim for file {file_id} already in flight");
            return Err(Error::ClaimInProgress)
        }

        let guard = ClaimGuard { tracker: self, released: false };
        self.lock_state().is_claiming = true;
        self.publish().await;

        let result = self.submit_claim(contract, file_id).await;
        match &result {
            Ok(receipt) => {
                info!(
                    target: "tracker::claim_reward",
                    "Reward for file {file_id} claimed in {}", receipt.transaction_hash,
                );

                self.update(epoch, |s| {
                    s.is_claimable = false;
                    s.error = None;
                })
                .await;

                // Authoritative post-claim state. Its failures end up in the state.
                if self.is_current(epoch) {
                    let _ = self.refresh_status().await;
                }
            }

            Err(e) => {
                error!(target: "tracker::claim_reward", "Error claiming reward for file {file_id}: {e}");
                let reason = match e.to_string() {
                    r if r.is_empty() => "Unknown error".to_string(),
                    r => r,
                };
                self.update(epoch, |s| s.error = Some(format!("{CLAIM_FAILED}: {reason}"))).await;
            }
        }

        guard.release().await;

        result.map(|_| ())
    }

    /// Main polling loop. Holds only a weak reference so dropping the
    /// tracker ends it too.
    async fn poll_loop(tracker: Weak<Self>, interval: Duration) -> Result<()> {
        loop {
            let Some(tracker) = tracker.upgrade() else {
                debug!(target: "tracker::poll_loop", "Tracker dropped, exiting");
                return Ok(())
            };

            // Failures are surfaced through the state
            let _ = tracker.refresh_status().await;
            drop(tracker);

            Timer::after(interval).await;
        }
    }

    async fn connect_signer(&self) -> Result<Signer> {
        let signer = Signer::connect(self.provider.clone()).await?;

        if let Some(wallet) = self.context().wallet {
            if wallet != signer.address() {
                warn!(
                    target: "tracker::connect_signer",
                    "Provider signs as {} but the connected wallet is {wallet}", signer.address(),
                );
            }
        }

        Ok(signer)
    }

    async fn fetch_record(&self, contract: Address, file_id: u64) -> Result<(FileRecord, f64)> {
        let pool = DataLiquidityPool::new(contract, self.connect_signer().await?);
        let record = pool.files(file_id).await?;
        let reward = format_units(record.reward, TOKEN_DECIMALS)?;
        Ok((record, reward))
    }

    async fn submit_claim(&self, contract: Address, file_id: u64) -> Result<TxReceipt> {
        let pool = DataLiquidityPool::new(contract, self.connect_signer().await?);
        pool.claim_contribution_reward(file_id, self.settings.confirmation_timeout).await
    }

    /// Contract address and file ID, provided the whole context is present.
    fn target(&self) -> Result<(Address, u64)> {
        let context = self.context();
        match (context.contract, context.wallet, self.file_id()) {
            (Some(contract), Some(_), Some(file_id)) => Ok((contract, file_id)),
            _ => Err(Error::ContextNotReady),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Advance the epoch under the state lock, so no update can
    /// interleave between its epoch check and its write.
    fn bump_epoch(&self) -> u64 {
        let _state = self.lock_state();
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply `f` to the state if `epoch` is still current and publish the
    /// result. Returns `false` if the update was discarded as stale.
    async fn update<F>(&self, epoch: u64, f: F) -> bool
    where
        F: FnOnce(&mut TrackerState) + Send,
    {
        let snapshot = {
            let mut state = self.lock_state();
            if !self.is_current(epoch) {
                None
            } else {
                f(&mut state);
                Some(state.clone())
            }
        };

        match snapshot {
            Some(snapshot) => {
                self.publisher.notify(snapshot).await;
                true
            }
            None => {
                debug!(target: "tracker::update", "Discarding result of stale epoch {epoch}");
                false
            }
        }
    }

    async fn publish(&self) {
        let snapshot = self.state();
        self.publisher.notify(snapshot).await;
    }
}
