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

use std::{str::FromStr, sync::Arc};

use dlp::{
    async_daemonize, cli_desc,
    eth::{Address, ProviderPtr, RpcProvider, Signer},
    system::{StoppableTask, Subscription},
    tracker::{
        FileStatusTracker, FileStatusTrackerPtr, TrackerContext, TrackerSettings,
        TrackerSettingsOpt, TrackerState,
    },
    util::cli::SignalHandler,
    Error, Result,
};
use log::{error, info, warn};
use serde::Deserialize;
use smol::Executor;
use structopt::StructOpt;
use structopt_toml::StructOptToml;
use url::Url;

const CONFIG_FILE: &str = "dlpwatch_config.toml";
const CONFIG_FILE_CONTENTS: &str = include_str!("../dlpwatch_config.toml");

#[derive(Clone, Debug, Deserialize, StructOpt, StructOptToml)]
#[serde(default)]
#[structopt(name = "dlpwatch", about = cli_desc!())]
struct Args {
    #[structopt(short, parse(from_occurrences))]
    /// Increase verbosity (-vvv supported)
    verbose: u8,

    #[structopt(short, long)]
    /// Configuration file to use
    config: Option<String>,

    #[structopt(long)]
    /// Set log file output
    log: Option<String>,

    #[structopt(long, default_value = "http://127.0.0.1:8545")]
    /// Ethereum JSON-RPC endpoint
    endpoint: Url,

    #[structopt(long)]
    /// DataLiquidityPool contract address
    contract: Option<String>,

    #[structopt(long)]
    /// Wallet address (defaults to the endpoint's first account)
    wallet: Option<String>,

    #[structopt(long)]
    /// File ID of the contribution to watch
    file_id: Option<u64>,

    #[structopt(long)]
    /// Claim the reward once it is claimable
    claim: bool,

    #[structopt(long)]
    /// Refresh once, print the status and exit
    once: bool,

    #[structopt(flatten)]
    /// Tracker settings
    tracker: TrackerSettingsOpt,
}

fn parse_address(addr: Option<&str>) -> Result<Option<Address>> {
    let Some(addr) = addr else { return Ok(None) };
    match Address::from_str(addr) {
        Ok(addr) => Ok(Some(addr)),
        Err(e) => Err(Error::InvalidAddress(format!("{addr}: {e}"))),
    }
}

/// Print every distinct snapshot published by the tracker.
async fn print_updates(sub: Subscription<TrackerState>, file_id: u64) -> Result<()> {
    let mut last = None;

    loop {
        let state = sub.receive().await?;
        if last.as_ref() != Some(&state) {
            println!("file {file_id}: {state}");
            last = Some(state);
        }
    }
}

/// Claim the reward if the last snapshot says it is claimable.
async fn claim_if_claimable(tracker: &FileStatusTrackerPtr, state: &TrackerState) -> Result<()> {
    if !state.is_claimable {
        info!(target: "dlpwatch", "No claimable reward, not claiming");
        return Ok(())
    }

    info!(target: "dlpwatch", "Claiming reward of {} tokens", state.reward);
    tracker.claim_reward().await
}

async_daemonize!(realmain);
async fn realmain(args: Args, ex: Arc<Executor<'static>>) -> Result<()> {
    let Some(file_id) = args.file_id else {
        error!(target: "dlpwatch", "No file ID given, use --file-id");
        return Err(Error::ContextNotReady)
    };

    let settings: TrackerSettings = args.tracker.into();

    info!(target: "dlpwatch", "Connecting to {}", args.endpoint);
    let provider: ProviderPtr =
        Arc::new(RpcProvider::new(args.endpoint, settings.confirmation_interval)?);

    let contract = parse_address(args.contract.as_deref())?;
    if contract.is_none() {
        warn!(target: "dlpwatch", "No contract address configured");
    }

    let wallet = match parse_address(args.wallet.as_deref())? {
        Some(wallet) => Some(wallet),
        None => match Signer::connect(provider.clone()).await {
            Ok(signer) => Some(signer.address()),
            Err(e) => {
                warn!(target: "dlpwatch", "Could not get a wallet account: {e}");
                None
            }
        },
    };

    let context = TrackerContext::new(contract, wallet);
    let tracker = FileStatusTracker::new(provider, context, settings, ex.clone());

    let sub = tracker.subscribe().await;
    tracker.attach(Some(file_id)).await;

    let state = sub.receive().await?;
    println!("file {file_id}: {state}");

    if args.once {
        let claimed = if args.claim { claim_if_claimable(&tracker, &state).await } else { Ok(()) };

        tracker.detach().await;
        sub.unsubscribe().await;

        let state = tracker.state();
        if args.claim {
            println!("file {file_id}: {state}");
        }

        claimed?;
        return match state.error {
            Some(e) => Err(Error::Custom(e)),
            None => Ok(()),
        }
    }

    info!(target: "dlpwatch", "Watching file {file_id}");
    let printer = StoppableTask::new();
    printer.clone().start(
        print_updates(sub, file_id),
        |res| async move {
            match res {
                Ok(()) | Err(Error::TaskStopped) => { /* Do nothing */ }
                Err(e) => error!(target: "dlpwatch", "Failed printing updates: {e}"),
            }
        },
        Error::TaskStopped,
        ex.clone(),
    );

    if args.claim {
        if let Err(e) = claim_if_claimable(&tracker, &state).await {
            error!(target: "dlpwatch", "Claim failed: {e}");
        }
    }

    // Signal handling for graceful termination.
    let (signals_handler, signals_task) = SignalHandler::new(ex)?;
    signals_handler.wait_termination(signals_task).await?;
    info!(target: "dlpwatch", "Caught termination signal, cleaning up and exiting...");

    tracker.detach().await;
    printer.stop().await;

    Ok(())
}
